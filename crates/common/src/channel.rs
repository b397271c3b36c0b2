//! Async channel bridge between Tokio runtime and USB thread

use async_channel::{Receiver, Sender, bounded};
use protocol::DeviceInfo;

/// Commands from Tokio runtime to USB thread
#[derive(Debug)]
pub enum LauncherCommand {
    /// List all matching launchers on the bus
    ListDevices {
        /// Channel to send response back
        response: tokio::sync::oneshot::Sender<Vec<DeviceInfo>>,
    },

    /// Report the launcher currently bound to a session
    Status {
        /// Channel to send response back
        response: tokio::sync::oneshot::Sender<Option<DeviceInfo>>,
    },

    /// Detach any live session and stop the USB thread
    Shutdown,
}

/// Events from the device manager
#[derive(Debug, Clone)]
pub enum LauncherEvent {
    /// Launcher opened and session installed
    Attached {
        /// Device that is now live
        device: DeviceInfo,
    },

    /// Session torn down (device unplugged or shutdown)
    Detached {
        /// Device that went away
        device: DeviceInfo,
    },

    /// A matching launcher appeared but could not be opened
    AttachFailed {
        /// Bus number
        bus_number: u8,
        /// Device address
        device_address: u8,
        /// Why the open failed
        reason: String,
    },
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct UsbBridge {
    cmd_tx: Sender<LauncherCommand>,
    event_rx: Receiver<LauncherEvent>,
}

impl UsbBridge {
    /// Send a command to the USB thread
    pub async fn send_command(&self, cmd: LauncherCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the USB thread
    pub async fn recv_event(&self) -> crate::Result<LauncherEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Handle for USB thread (blocking)
pub struct UsbWorker {
    pub(crate) cmd_rx: Receiver<LauncherCommand>,
    /// Event sender (public for USB worker thread to access)
    pub event_tx: Sender<LauncherEvent>,
}

impl UsbWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<LauncherCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<LauncherCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send an event to Tokio runtime (blocking)
    pub fn send_event(&self, event: LauncherEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and USB thread
///
/// Returns (UsbBridge for Tokio, UsbWorker for USB thread)
pub fn create_usb_bridge() -> (UsbBridge, UsbWorker) {
    let (cmd_tx, cmd_rx) = bounded(32);
    let (event_tx, event_rx) = bounded(32);

    (
        UsbBridge { cmd_tx, event_rx },
        UsbWorker { cmd_rx, event_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_bridge() {
        let (bridge, worker) = create_usb_bridge();

        // Spawn a thread to simulate USB worker
        let handle = std::thread::spawn(move || {
            let cmd = worker.recv_command().unwrap();
            matches!(cmd, LauncherCommand::ListDevices { .. })
        });

        // Send command from async context
        let (tx, _rx) = tokio::sync::oneshot::channel();
        bridge
            .send_command(LauncherCommand::ListDevices { response: tx })
            .await
            .unwrap();

        assert!(handle.join().unwrap());
    }
}
