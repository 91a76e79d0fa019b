use std::io::{Read, Write};
use std::time::Duration;

use tracing::info;

use crate::error::{Result, TransportError};
use crate::link::Link;

/// Serial line settings for an SR module.
///
/// The modules speak fixed 8N1 framing; only the baud rate and the polling
/// read timeout are worth configuring.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. The modules ship at 115200.
    pub baud_rate: u32,
    /// How long a blocking read waits before reporting `TimedOut`.
    ///
    /// This bounds how quickly a reader thread notices a close request; it is
    /// not a protocol timeout.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(50),
        }
    }
}

/// A physical serial port implementing [`Link`].
pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialLink {
    /// Open a serial device with default settings.
    pub fn open(port: &str) -> Result<Self> {
        Self::open_with_config(port, &SerialConfig::default())
    }

    /// Open a serial device with explicit settings.
    pub fn open_with_config(port: &str, config: &SerialConfig) -> Result<Self> {
        let handle = serialport::new(port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: port.to_string(),
                source,
            })?;

        info!(port, baud = config.baud_rate, "serial link opened");

        Ok(Self {
            port: handle,
            name: port.to_string(),
        })
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Link for SerialLink {
    fn try_clone(&self) -> Result<Box<dyn Link>> {
        let cloned = self
            .port
            .try_clone()
            .map_err(|err| TransportError::Clone(std::io::Error::other(err)))?;
        Ok(Box::new(SerialLink {
            port: cloned,
            name: self.name.clone(),
        }))
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("port", &self.name)
            .finish()
    }
}
