//! USB worker thread
//!
//! Dedicated thread for libusb event handling and launcher attach/detach.
//! Runs the `handle_events()` loop and talks to the Tokio runtime over
//! channels. Attribute writes do not go through this thread; they run on the
//! caller's thread against the session installed in the bridge.

use crate::usb::device::DeviceFilter;
use crate::usb::manager::DeviceManager;
use crate::usb::transport::RusbTransport;
use common::{AttributeBridge, LauncherCommand, SessionOptions, UsbWorker};
use rusb::UsbContext;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How long one `handle_events` call may block
const EVENT_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings the USB thread needs from the daemon config
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub filter: DeviceFilter,
    pub interface: u8,
    pub session_options: SessionOptions,
    /// Rescan period when hot-plug is unavailable
    pub poll_interval: Duration,
}

/// USB worker thread
///
/// Owns the device manager and serves commands from the Tokio runtime.
pub struct UsbWorkerThread {
    manager: DeviceManager,
    worker: UsbWorker,
    poll_interval: Duration,
}

impl UsbWorkerThread {
    /// Create the manager and perform the initial scan
    pub fn new(
        worker: UsbWorker,
        settings: WorkerSettings,
        bridge: Arc<AttributeBridge<RusbTransport>>,
    ) -> Result<Self, rusb::Error> {
        let mut manager = DeviceManager::new(
            settings.filter,
            settings.interface,
            settings.session_options,
            bridge,
            worker.event_tx.clone(),
        )?;

        manager.initialize()?;

        Ok(Self {
            manager,
            worker,
            poll_interval: settings.poll_interval,
        })
    }

    /// Run the event loop until `Shutdown`
    ///
    /// Each iteration serves at most one command, handles USB events with a
    /// short timeout, then applies hot-plug notices (or rescans the bus when
    /// polling).
    pub fn run(mut self) -> Result<(), rusb::Error> {
        info!("USB worker thread started");
        let mut last_scan = Instant::now();

        loop {
            match self.worker.try_recv_command() {
                Some(LauncherCommand::Shutdown) => {
                    info!("USB worker shutting down");
                    break;
                }
                Some(cmd) => self.handle_command(cmd),
                None => {}
            }

            match self.manager.context().handle_events(Some(EVENT_TIMEOUT)) {
                Ok(()) => {}
                Err(rusb::Error::Interrupted) => {
                    debug!("USB event handling interrupted");
                }
                Err(e) => {
                    warn!("Error handling USB events: {}", e);
                    std::thread::sleep(EVENT_TIMEOUT);
                }
            }

            if self.manager.uses_hotplug() {
                self.manager.process_hotplug_notices();
            } else if last_scan.elapsed() >= self.poll_interval {
                if let Err(e) = self.manager.rescan() {
                    warn!("Launcher rescan failed: {}", e);
                }
                last_scan = Instant::now();
            }
        }

        // Drain in-flight writes and release the interface before libusb goes
        self.manager.shutdown();
        info!("USB worker thread stopped");
        Ok(())
    }

    fn handle_command(&mut self, cmd: LauncherCommand) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle_command_inner(cmd)
        }));

        if let Err(e) = result {
            error!("Panic in USB command handler: {:?}", e);
        }
    }

    fn handle_command_inner(&mut self, cmd: LauncherCommand) {
        match cmd {
            LauncherCommand::ListDevices { response } => {
                let devices = self.manager.list_devices();
                debug!("Listing {} launcher(s)", devices.len());
                let _ = response.send(devices);
            }
            LauncherCommand::Status { response } => {
                let _ = response.send(self.manager.status());
            }
            LauncherCommand::Shutdown => {
                // Handled by the main loop
            }
        }
    }
}

/// Spawn the USB worker thread
///
/// The thread runs until a `Shutdown` command arrives or the USB context
/// cannot be set up.
pub fn spawn_usb_worker(
    worker: UsbWorker,
    settings: WorkerSettings,
    bridge: Arc<AttributeBridge<RusbTransport>>,
) -> std::io::Result<std::thread::JoinHandle<Result<(), rusb::Error>>> {
    std::thread::Builder::new()
        .name("usb-worker".to_string())
        .spawn(move || {
            let worker_thread = UsbWorkerThread::new(worker, settings, bridge)?;
            worker_thread.run()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::create_usb_bridge;
    use protocol::{LAUNCHER_PRODUCT_ID, LAUNCHER_VENDOR_ID};

    fn settings() -> WorkerSettings {
        WorkerSettings {
            filter: DeviceFilter {
                vendor_id: LAUNCHER_VENDOR_ID,
                product_id: LAUNCHER_PRODUCT_ID,
            },
            interface: 0,
            session_options: SessionOptions::default(),
            poll_interval: Duration::from_millis(1000),
        }
    }

    #[test]
    fn test_usb_worker_creation() {
        let (_bridge, worker) = create_usb_bridge();

        // USB context creation may fail without permissions
        match UsbWorkerThread::new(worker, settings(), Arc::new(AttributeBridge::new())) {
            Ok(_) => {}
            Err(e) => eprintln!("USB worker creation failed: {}", e),
        }
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let (bridge, worker) = create_usb_bridge();
        let handle = spawn_usb_worker(worker, settings(), Arc::new(AttributeBridge::new()))
            .expect("spawn worker thread");

        bridge.send_command(LauncherCommand::Shutdown).await.unwrap();

        // Either a clean stop or a context error without USB access
        let _ = tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
            .expect("worker thread panicked");
    }
}
