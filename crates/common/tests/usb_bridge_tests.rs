//! USB Bridge Integration Tests
//!
//! Tests for the async channel bridge between Tokio runtime and USB thread.
//!
//! Run with: `cargo test -p common --test usb_bridge_tests`

use common::test_utils::{DEFAULT_TEST_TIMEOUT, create_mock_device_info, with_timeout};
use common::{LauncherCommand, LauncherEvent, create_usb_bridge};
use std::thread;
use tokio::sync::oneshot;

#[tokio::test]
async fn test_list_devices_roundtrip() {
    let (bridge, worker) = create_usb_bridge();

    let handle = thread::spawn(move || {
        if let Ok(LauncherCommand::ListDevices { response }) = worker.recv_command() {
            let _ = response.send(vec![create_mock_device_info(1, 4)]);
        }
    });

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(LauncherCommand::ListDevices { response: tx })
        .await
        .expect("Failed to send command");

    let devices = with_timeout(DEFAULT_TEST_TIMEOUT, rx)
        .await
        .expect("Timed out")
        .expect("Worker dropped response");

    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].location(), (1, 4));
    handle.join().unwrap();
}

#[tokio::test]
async fn test_status_none_when_unattached() {
    let (bridge, worker) = create_usb_bridge();

    let handle = thread::spawn(move || {
        if let Ok(LauncherCommand::Status { response }) = worker.recv_command() {
            let _ = response.send(None);
        }
    });

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(LauncherCommand::Status { response: tx })
        .await
        .unwrap();

    assert!(rx.await.unwrap().is_none());
    handle.join().unwrap();
}

#[tokio::test]
async fn test_events_flow_to_runtime() {
    let (bridge, worker) = create_usb_bridge();

    let handle = thread::spawn(move || {
        let mut device = create_mock_device_info(2, 7);
        device.attached = true;
        worker
            .send_event(LauncherEvent::Attached {
                device: device.clone(),
            })
            .unwrap();
        device.attached = false;
        worker.send_event(LauncherEvent::Detached { device }).unwrap();
    });

    let first = with_timeout(DEFAULT_TEST_TIMEOUT, bridge.recv_event())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(first, LauncherEvent::Attached { ref device } if device.attached));

    let second = bridge.recv_event().await.unwrap();
    assert!(matches!(second, LauncherEvent::Detached { .. }));
    handle.join().unwrap();
}

#[tokio::test]
async fn test_shutdown_reaches_worker() {
    let (bridge, worker) = create_usb_bridge();

    bridge.send_command(LauncherCommand::Shutdown).await.unwrap();

    let cmd = worker.try_recv_command();
    assert!(matches!(cmd, Some(LauncherCommand::Shutdown)));
    assert!(worker.try_recv_command().is_none());
}

#[tokio::test]
async fn test_send_fails_after_worker_dropped() {
    let (bridge, worker) = create_usb_bridge();
    drop(worker);

    let result = bridge.send_command(LauncherCommand::Shutdown).await;
    assert!(matches!(result, Err(common::Error::Channel(_))));
}
