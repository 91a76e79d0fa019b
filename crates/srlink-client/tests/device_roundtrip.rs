//! End-to-end exchanges against a scripted module on an in-process link.

use std::io::ErrorKind;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use srlink_transport::Link;

use srlink_client::{
    CommandOptions, ConfigStore, Connection, Device, DispatchMode, Notification, ParamId,
};
use srlink_client::{CommandError, UpdateError, UpdateProgress};
use srlink_frame::{CommandId, FrameError, FrameReader, FrameWriter};
use srlink_transport::MemoryLink;

/// Spawn a fake module that answers each request frame with the frames
/// the script returns. The thread exits when the host side hangs up.
fn spawn_module<F>(link: MemoryLink, mut script: F) -> JoinHandle<()>
where
    F: FnMut(u16, &[u8]) -> Vec<(u16, Vec<u8>)> + Send + 'static,
{
    thread::spawn(move || {
        let read_half = link.try_clone().unwrap();
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(link);
        loop {
            match reader.read_frame() {
                Ok(frame) => {
                    for (id, payload) in script(frame.id, &frame.payload) {
                        writer.send(id, &payload).unwrap();
                    }
                }
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::TimedOut => continue,
                Err(_) => break,
            }
        }
    })
}

fn fast_options() -> CommandOptions {
    CommandOptions::default().timeout(Duration::from_millis(200))
}

#[test]
fn typed_version_roundtrip() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, _| {
        assert_eq!(id, CommandId::GetVersionRequest.as_u16());
        vec![(
            CommandId::GetVersionResponse.as_u16(),
            b"\x00SRMP02020005".to_vec(),
        )]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    assert_eq!(device.version().unwrap(), "SRMP.02.02.0005");

    drop(device);
    fake.join().unwrap();
}

#[test]
fn notification_interleaved_with_response() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, _| {
        assert_eq!(id, CommandId::GetTimeRequest.as_u16());
        vec![
            (
                CommandId::DataReceivedNotification.as_u16(),
                b"\x01\x00\x00\x10\x00\x00\x03\x0e\x1eping".to_vec(),
            ),
            (
                CommandId::GetTimeResponse.as_u16(),
                b"\x00\x00\x66\xee\x5f\x00\x00\x00\x00\x00\x00\x00\x00".to_vec(),
            ),
        ]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let sub = device.subscribe(None);

    let time = device.get_time().unwrap();
    assert_eq!(time, Duration::new(1_609_459_200, 0));

    let notification = sub.recv_timeout(Duration::from_secs(1)).unwrap();
    let Notification::DataReceived(data) = notification else {
        panic!("expected data notification");
    };
    assert_eq!(data.source, "0010");
    assert_eq!(&data.data[..], b"ping");

    drop(sub);
    drop(device);
    fake.join().unwrap();
}

#[test]
fn timed_out_request_is_retried() {
    let (host, module) = MemoryLink::pair();
    let mut calls = 0u32;
    let fake = spawn_module(module, move |id, _| {
        assert_eq!(id, CommandId::SaveConfigRequest.as_u16());
        calls += 1;
        if calls == 1 {
            // swallow the first attempt
            vec![]
        } else {
            vec![(CommandId::SaveConfigResponse.as_u16(), vec![0x00])]
        }
    });

    let connection = Connection::open(Box::new(host)).unwrap();
    let reply = connection
        .execute_with(CommandId::SaveConfigRequest, &[], fast_options())
        .unwrap();
    assert_eq!(&reply[..], &[0x00]);

    drop(connection);
    fake.join().unwrap();
}

#[test]
fn unanswered_request_times_out_after_retries() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |_, _| vec![]);

    let connection = Connection::open(Box::new(host)).unwrap();
    let err = connection
        .execute_with(CommandId::SaveConfigRequest, &[], fast_options().retries(1))
        .unwrap_err();
    assert!(matches!(
        err,
        CommandError::Timeout {
            id: 0x0784,
            attempts: 2
        }
    ));

    drop(connection);
    fake.join().unwrap();
}

#[test]
fn unexpected_frame_discarded_while_waiting() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, _| {
        assert_eq!(id, CommandId::SaveConfigRequest.as_u16());
        vec![
            // stale response from some earlier exchange
            (CommandId::GetTimeResponse.as_u16(), vec![0x00; 13]),
            (CommandId::SaveConfigResponse.as_u16(), vec![0x00]),
        ]
    });

    let connection = Connection::open(Box::new(host)).unwrap();
    let reply = connection
        .execute_with(CommandId::SaveConfigRequest, &[], fast_options())
        .unwrap();
    assert_eq!(&reply[..], &[0x00]);

    drop(connection);
    fake.join().unwrap();
}

#[test]
fn corrupt_frame_does_not_break_the_exchange() {
    let (host, mut module) = MemoryLink::pair();

    let fake = thread::spawn(move || {
        let read_half = module.try_clone().unwrap();
        let mut reader = FrameReader::new(read_half);
        loop {
            match reader.read_frame() {
                Ok(_) => {
                    use std::io::Write;
                    // line noise, then a frame with a broken checksum,
                    // then the real response
                    module.write_all(&[0x00, 0x13, 0x37]).unwrap();
                    module
                        .write_all(&[0x7E, 0x00, 0x03, 0x07, 0x85, 0x00, 0xDE, 0xAD])
                        .unwrap();
                    let mut writer = FrameWriter::new(module);
                    writer
                        .send(CommandId::SaveConfigResponse.as_u16(), &[0x00])
                        .unwrap();
                    break;
                }
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::TimedOut => continue,
                Err(_) => return,
            }
        }
    });

    let connection = Connection::open(Box::new(host)).unwrap();
    let reply = connection
        .execute_with(CommandId::SaveConfigRequest, &[], CommandOptions::default())
        .unwrap();
    assert_eq!(&reply[..], &[0x00]);

    drop(connection);
    fake.join().unwrap();
}

#[test]
fn fail_fast_reports_busy() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, _| {
        if id == CommandId::SaveConfigRequest.as_u16() {
            thread::sleep(Duration::from_millis(300));
            vec![(CommandId::SaveConfigResponse.as_u16(), vec![0x00])]
        } else {
            vec![(CommandId::ResetConfigResponse.as_u16(), vec![0x00])]
        }
    });

    let connection = Connection::open(Box::new(host)).unwrap();
    thread::scope(|scope| {
        let slow = scope.spawn(|| {
            connection.execute_with(
                CommandId::SaveConfigRequest,
                &[],
                CommandOptions::default(),
            )
        });
        thread::sleep(Duration::from_millis(50));

        let err = connection
            .execute_with(
                CommandId::ResetConfigRequest,
                &[],
                CommandOptions::default().mode(DispatchMode::FailFast),
            )
            .unwrap_err();
        assert!(matches!(err, CommandError::Busy));

        slow.join().unwrap().unwrap();
    });

    drop(connection);
    fake.join().unwrap();
}

#[test]
fn device_rejection_surfaces_status() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |_, _| {
        vec![(CommandId::SaveConfigResponse.as_u16(), vec![0x05])]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let err = device.save_config().unwrap_err();
    assert!(matches!(
        err,
        CommandError::Device {
            id: 0x0785,
            status: 0x05
        }
    ));

    drop(device);
    fake.join().unwrap();
}

#[test]
fn send_data_refused_without_network_address() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, _| {
        assert_eq!(id, CommandId::GetNetworkAddressRequest.as_u16());
        vec![(
            CommandId::GetNetworkAddressResponse.as_u16(),
            b"\x00\xff\xff\x23\x01\xff\xff".to_vec(),
        )]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let err = device.send_data(b"hello", "0001", 3, true, 30).unwrap_err();
    assert!(matches!(err, CommandError::NotConnected));

    drop(device);
    fake.join().unwrap();
}

#[test]
fn send_data_uses_assigned_source_address() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, payload| {
        if id == CommandId::GetNetworkAddressRequest.as_u16() {
            vec![(
                CommandId::GetNetworkAddressResponse.as_u16(),
                b"\x00\x10\x00\x23\x01\x01\x00".to_vec(),
            )]
        } else {
            assert_eq!(id, CommandId::SendDataRequest.as_u16());
            assert_eq!(payload, b"\x01\x00\x00\x10\x00\x00\x03\x0c\x1ehello");
            vec![(CommandId::SendDataResponse.as_u16(), vec![0x00])]
        }
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    device.send_data(b"hello", "0001", 3, true, 30).unwrap();

    drop(device);
    fake.join().unwrap();
}

#[test]
fn node_list_follows_continuation_pages() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, payload| {
        assert_eq!(id, CommandId::GetNodeListRequest.as_u16());
        let seq_no = u16::from_le_bytes([payload[1], payload[2]]);
        match seq_no {
            1 => vec![(
                CommandId::GetNodeListResponse.as_u16(),
                b"\x01\x01\x00\x10\x00\x67\x45\x00\x00\x00\x00\x00\x00".to_vec(),
            )],
            2 => vec![(
                CommandId::GetNodeListResponse.as_u16(),
                b"\x00\x02\x00\x11\x00\xab\x89\x00\x00\x00\x00\x00\x00".to_vec(),
            )],
            other => panic!("unexpected seq_no {other}"),
        }
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let nodes = device
        .node_list(srlink_client::NodeListKind::Connected)
        .unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].short_address, "0010");
    assert_eq!(nodes[1].mac_address, "00000000000089ab");

    drop(device);
    fake.join().unwrap();
}

#[test]
fn apply_config_writes_node_type_first() {
    let (host, module) = MemoryLink::pair();
    let order = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&order);
    let fake = spawn_module(module, move |id, payload| {
        assert_eq!(id, CommandId::WriteRamConfigRequest.as_u16());
        recorded.lock().unwrap().push(payload[0]);
        vec![(
            CommandId::WriteRamConfigResponse.as_u16(),
            vec![0x00, payload[0]],
        )]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let mapping: srlink_client::ConfigMap = [
        (ParamId::Channel, 33u32.into()),
        (ParamId::NodeType, "COORDINATOR".into()),
        (ParamId::TxPower, "TX_20MW".into()),
    ]
    .into_iter()
    .collect();

    let committed = device.apply_config(&mapping, ConfigStore::Ram).unwrap();
    assert_eq!(committed, 3);
    // NODE_TYPE (0xB1) first, then table order: TX_POWER, CHANNEL
    assert_eq!(*order.lock().unwrap(), vec![0xB1, 0x02, 0xC5]);

    drop(device);
    fake.join().unwrap();
}

#[test]
fn extract_config_skips_unreadable_parameters() {
    let (host, module) = MemoryLink::pair();
    let fake = spawn_module(module, |id, payload| {
        assert_eq!(id, CommandId::ReadRamConfigRequest.as_u16());
        let reply = match payload[0] {
            // NODE_TYPE = ROUTER
            0xB1 => vec![0x00, 0xB1, 0x02],
            // CHANNEL = 33
            0xC5 => vec![0x00, 0xC5, 0x21],
            // TX_POWER with a code no firmware revision defines
            0x02 => vec![0x00, 0x02, 0xFF],
            // everything else is rejected by the module
            _ => vec![0x05],
        };
        vec![(CommandId::ReadRamConfigResponse.as_u16(), reply)]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let config = device.extract_config(ConfigStore::Ram).unwrap();

    let expected: srlink_client::ConfigMap = [
        (ParamId::NodeType, "ROUTER".into()),
        (ParamId::Channel, 33u32.into()),
    ]
    .into_iter()
    .collect();
    assert_eq!(config, expected);

    drop(device);
    fake.join().unwrap();
}

#[test]
fn extract_config_aborts_when_link_drops() {
    let (host, module) = MemoryLink::pair();

    let fake = thread::spawn(move || {
        let read_half = module.try_clone().unwrap();
        let mut reader = FrameReader::new(read_half);
        let mut writer = FrameWriter::new(module);
        let mut served = 0u32;
        loop {
            match reader.read_frame() {
                Ok(frame) => {
                    if served > 0 {
                        // hang up mid-sweep
                        break;
                    }
                    served += 1;
                    writer
                        .send(
                            CommandId::ReadRamConfigResponse.as_u16(),
                            &[0x00, frame.payload[0], 0x02],
                        )
                        .unwrap();
                }
                Err(FrameError::Io(err)) if err.kind() == ErrorKind::TimedOut => continue,
                Err(_) => break,
            }
        }
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let err = device.extract_config(ConfigStore::Ram).unwrap_err();
    assert!(matches!(err, CommandError::LinkClosed));

    drop(device);
    fake.join().unwrap();
}

#[test]
fn firmware_update_walks_pages_and_frames() {
    let (host, module) = MemoryLink::pair();
    let sequence = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&sequence);
    let fake = spawn_module(module, move |id, payload| {
        assert_eq!(id, CommandId::UpdateFirmwareRequest.as_u16());
        let sub = payload[1];
        if sub == 0x03 {
            // (page, frame) of this WRITE
            let page = u16::from_be_bytes([payload[7], payload[8]]);
            recorded.lock().unwrap().push((sub, page, payload[9]));
            assert_eq!(payload.len(), 6 + 4 + 1024);
        } else {
            recorded.lock().unwrap().push((sub, 0, 0));
        }
        let mut reply = vec![0x00, 0x02, sub, payload[2], payload[3], 0x00, 0x03];
        reply.extend_from_slice(&[0x00, 0x00, 0x00]);
        vec![(CommandId::UpdateFirmwareResponse.as_u16(), reply)]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let image = vec![0xAA; 3 * 1024 + 512];
    let mut acked = Vec::new();
    device
        .start_firmware_update("SRMP02020005", &image, |p: UpdateProgress| {
            acked.push(p.acknowledged)
        })
        .unwrap();

    assert_eq!(acked, vec![1024, 2048, 3072, 3584]);
    assert_eq!(
        *sequence.lock().unwrap(),
        vec![
            (0x02, 0, 0),
            (0x03, 1, 1),
            (0x03, 1, 2),
            (0x03, 1, 3),
            (0x03, 1, 4),
            (0x04, 0, 0),
            (0x05, 0, 0),
        ]
    );

    drop(device);
    fake.join().unwrap();
}

#[test]
fn firmware_write_failure_reports_offset() {
    let (host, module) = MemoryLink::pair();
    let mut writes = 0u32;
    let fake = spawn_module(module, move |_, payload| {
        let sub = payload[1];
        let status = if sub == 0x03 {
            writes += 1;
            if writes == 3 {
                0x07
            } else {
                0x00
            }
        } else {
            0x00
        };
        let reply = vec![
            0x00, 0x02, sub, payload[2], payload[3], 0x00, 0x03, status, 0x00, 0x00,
        ];
        vec![(CommandId::UpdateFirmwareResponse.as_u16(), reply)]
    });

    let device = Device::from_link(Box::new(host)).unwrap();
    let image = vec![0xAA; 4 * 1024];
    let err = device
        .start_firmware_update("SRMP02020005", &image, |_| {})
        .unwrap_err();
    assert!(matches!(err, UpdateError::Transfer { offset: 2048, .. }));

    drop(device);
    fake.join().unwrap();
}
