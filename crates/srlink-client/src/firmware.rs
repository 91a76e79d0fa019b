//! Firmware image transfer and activation.
//!
//! UPDATE_FIRMWARE multiplexes sub-commands inside one command id:
//! START announces version, size and checksum, WRITE carries one
//! 1024-byte block per request, CHECK asks the module to verify the
//! assembled image, and RESET reboots into it. Four blocks form a page;
//! blocks are addressed as (page, frame) pairs.

use bytes::Bytes;
use srlink_frame::{crc16, CommandId};
use tracing::{info, warn};

use crate::commands::expect_status;
use crate::device::Device;
use crate::error::{CommandError, UpdateError};

/// Transfer unit: one WRITE request carries this many image bytes.
pub const BLOCK_SIZE: usize = 1024;
const FRAMES_PER_PAGE: usize = 4;
const VERSION_LEN: usize = 12;

const SUB_START: u8 = 0x02;
const SUB_WRITE: u8 = 0x03;
const SUB_CHECK: u8 = 0x04;
const SUB_RESET: u8 = 0x05;

// Seconds the module waits before rebooting into the new image.
const RESET_WAIT: u16 = 1;

/// Where the sequencer is in the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Transferring,
    Completed,
    Failed,
}

/// Transfer progress, reported after every acknowledged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProgress {
    /// Image bytes the module has acknowledged so far.
    pub acknowledged: usize,
    /// Total image size.
    pub total: usize,
}

fn encode_request(sub: u8, seq_no: u16, body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(6 + body.len());
    payload.push(0x01);
    payload.push(sub);
    payload.extend_from_slice(&seq_no.to_be_bytes());
    payload.extend_from_slice(&(body.len() as u16).to_be_bytes());
    payload.extend_from_slice(body);
    payload
}

fn start_body(version: &str, size: u32, checksum: u16) -> Vec<u8> {
    let mut body = Vec::with_capacity(3 + VERSION_LEN + 6);
    body.extend_from_slice(&[0x00, 0x00, 0x05]);
    body.extend_from_slice(version.as_bytes());
    body.extend_from_slice(&size.to_be_bytes());
    body.extend_from_slice(&checksum.to_be_bytes());
    body
}

fn write_body(page_no: u16, frame_no: u8, frame: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + BLOCK_SIZE);
    body.push(0x00);
    body.extend_from_slice(&page_no.to_be_bytes());
    body.push(frame_no);
    body.extend_from_slice(frame);
    // Short tail blocks are padded up to a full frame with the flash
    // erase value.
    body.resize(4 + BLOCK_SIZE, 0xFF);
    body
}

fn check_body(last_page: u16) -> Vec<u8> {
    let mut body = vec![0x00];
    body.extend_from_slice(&last_page.to_be_bytes());
    body
}

/// Parse a firmware response, returning the sub-command status byte.
fn parse_response(sub: u8, payload: &Bytes) -> Result<u8, CommandError> {
    let id = CommandId::UpdateFirmwareResponse;
    let bad = |message: String| CommandError::BadResponse {
        id: id.as_u16(),
        message,
    };
    let body = expect_status(id, payload)?;
    if body.len() < 7 {
        return Err(bad("firmware response truncated".to_string()));
    }
    if body[0] != 0x02 {
        return Err(bad(format!("unexpected direction byte {:#04x}", body[0])));
    }
    if body[1] != sub {
        return Err(bad(format!(
            "sub-command mismatch: sent {sub:#04x}, got {:#04x}",
            body[1]
        )));
    }
    let length = u16::from_be_bytes([body[4], body[5]]) as usize;
    if length == 0 || body.len() < 6 + length {
        return Err(bad("firmware status truncated".to_string()));
    }
    Ok(body[6])
}

/// One firmware update attempt against a device.
///
/// The updater is single-shot: once it has left `Idle` it refuses to
/// run again, whether the transfer completed or failed.
pub struct FirmwareUpdate<'a> {
    device: &'a Device,
    state: UpdateState,
    seq_no: u16,
}

impl<'a> FirmwareUpdate<'a> {
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Transfer a firmware image and activate it.
    ///
    /// `version` is the 12-character version string embedded in the
    /// image header. `progress` is invoked after every acknowledged
    /// block. On success the module reboots into the new image, which
    /// closes the serial session.
    pub fn run(
        &mut self,
        version: &str,
        image: &[u8],
        mut progress: impl FnMut(UpdateProgress),
    ) -> Result<(), UpdateError> {
        if self.state != UpdateState::Idle {
            return Err(UpdateError::AlreadyRun);
        }
        if image.is_empty() {
            return Err(UpdateError::EmptyImage);
        }
        if version.len() != VERSION_LEN || !version.is_ascii() {
            return Err(UpdateError::BadVersion {
                expected: VERSION_LEN,
                found: version.len(),
            });
        }

        self.state = UpdateState::Transferring;
        match self.transfer(version, image, &mut progress) {
            Ok(()) => {
                self.state = UpdateState::Completed;
                info!(version, "firmware update completed, module rebooting");
                Ok(())
            }
            Err(err) => {
                self.state = UpdateState::Failed;
                Err(err)
            }
        }
    }

    fn transfer(
        &mut self,
        version: &str,
        image: &[u8],
        progress: &mut impl FnMut(UpdateProgress),
    ) -> Result<(), UpdateError> {
        let total = image.len();
        let checksum = crc16(image);

        info!(version, total, "firmware update starting");

        let body = start_body(version, total as u32, checksum);
        self.exchange(SUB_START, &body)
            .map_err(|source| UpdateError::Transfer { offset: 0, source })?;

        for (index, frame) in image.chunks(BLOCK_SIZE).enumerate() {
            let offset = index * BLOCK_SIZE;
            let page_no = (index / FRAMES_PER_PAGE + 1) as u16;
            let frame_no = (index % FRAMES_PER_PAGE + 1) as u8;

            let body = write_body(page_no, frame_no, frame);
            self.exchange(SUB_WRITE, &body).map_err(|source| {
                warn!(offset, "firmware transfer failed");
                UpdateError::Transfer { offset, source }
            })?;

            progress(UpdateProgress {
                acknowledged: offset + frame.len(),
                total,
            });
        }

        let blocks = total.div_ceil(BLOCK_SIZE);
        let last_page = blocks.div_ceil(FRAMES_PER_PAGE) as u16;

        self.exchange(SUB_CHECK, &check_body(last_page))
            .map_err(|source| UpdateError::ActivationFailed { source })?;
        self.exchange(SUB_RESET, &RESET_WAIT.to_be_bytes())
            .map_err(|source| UpdateError::ActivationFailed { source })?;

        Ok(())
    }

    fn exchange(&mut self, sub: u8, body: &[u8]) -> Result<(), CommandError> {
        let payload = encode_request(sub, self.seq_no, body);
        self.seq_no = self.seq_no.wrapping_add(1);
        let reply = self
            .device
            .execute(CommandId::UpdateFirmwareRequest, &payload)?;
        let status = parse_response(sub, &reply)?;
        if status != 0x00 {
            return Err(CommandError::Device {
                id: CommandId::UpdateFirmwareResponse.as_u16(),
                status,
            });
        }
        Ok(())
    }
}

impl Device {
    /// Begin a firmware update session.
    pub fn firmware_update(&self) -> FirmwareUpdate<'_> {
        FirmwareUpdate {
            device: self,
            state: UpdateState::Idle,
            seq_no: 1,
        }
    }

    /// Transfer and activate a firmware image in one call.
    pub fn start_firmware_update(
        &self,
        version: &str,
        image: &[u8],
        progress: impl FnMut(UpdateProgress),
    ) -> Result<(), UpdateError> {
        self.firmware_update().run(version, image, progress)
    }
}
