//! Launcher device manager
//!
//! Tracks which launchers are on the bus, binds one of them to a
//! `DeviceSession` and installs that session in the attribute bridge. Runs
//! in the USB thread.

use crate::usb::device::{DeviceFilter, LauncherDevice};
use crate::usb::transport::RusbTransport;
use async_channel::{Receiver, Sender};
use common::{AttributeBridge, DeviceSession, LauncherEvent, SessionOptions};
use protocol::DeviceInfo;
use rusb::{Context, Device, Hotplug, HotplugBuilder, Registration, UsbContext};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Hot-plug notification forwarded from the libusb callback
enum HotplugNotice {
    Arrived(Device<Context>),
    Left { bus: u8, address: u8 },
}

/// Launcher device manager
///
/// Owns the USB context. At most one launcher is attached at a time; others
/// are tracked so they can take over when the attached one leaves.
pub struct DeviceManager {
    /// USB context for device operations
    context: Context,
    filter: DeviceFilter,
    /// Interface carrying the command reports
    interface: u8,
    session_options: SessionOptions,
    /// Matching launchers currently on the bus
    devices: HashMap<(u8, u8), LauncherDevice>,
    /// Location of the launcher bound to the bridge's session
    attached: Option<(u8, u8)>,
    bridge: Arc<AttributeBridge<RusbTransport>>,
    event_sender: Sender<LauncherEvent>,
    hotplug_rx: Option<Receiver<HotplugNotice>>,
    _hotplug_registration: Option<Registration<Context>>,
}

impl DeviceManager {
    pub fn new(
        filter: DeviceFilter,
        interface: u8,
        session_options: SessionOptions,
        bridge: Arc<AttributeBridge<RusbTransport>>,
        event_sender: Sender<LauncherEvent>,
    ) -> Result<Self, rusb::Error> {
        let context = Context::new()?;

        Ok(Self {
            context,
            filter,
            interface,
            session_options,
            devices: HashMap::new(),
            attached: None,
            bridge,
            event_sender,
            hotplug_rx: None,
            _hotplug_registration: None,
        })
    }

    /// Enumerate present launchers and register hot-plug callbacks
    ///
    /// This should be called once after creating the manager.
    pub fn initialize(&mut self) -> Result<(), rusb::Error> {
        self.rescan()?;

        if rusb::has_hotplug() {
            self.register_hotplug()?;
        } else {
            info!("Hot-plug not supported on this platform, polling for launchers");
        }

        info!(
            "Device manager initialized: {} launcher(s) matching {}",
            self.devices.len(),
            self.filter
        );
        Ok(())
    }

    /// Whether hot-plug callbacks are active (otherwise the worker polls)
    pub fn uses_hotplug(&self) -> bool {
        self._hotplug_registration.is_some()
    }

    /// Get USB context
    pub fn context(&self) -> &Context {
        &self.context
    }

    fn register_hotplug(&mut self) -> Result<(), rusb::Error> {
        let (tx, rx) = async_channel::unbounded();
        let callback: Box<dyn Hotplug<Context>> = Box::new(HotplugForwarder { notices: tx });

        let registration = HotplugBuilder::new()
            .vendor_id(self.filter.vendor_id)
            .product_id(self.filter.product_id)
            .enumerate(false) // We already enumerated
            .register(&self.context, callback)?;

        self.hotplug_rx = Some(rx);
        self._hotplug_registration = Some(registration);
        debug!("Hot-plug callbacks registered for {}", self.filter);
        Ok(())
    }

    /// Apply hot-plug notices queued by the callback
    pub fn process_hotplug_notices(&mut self) {
        let notices: Vec<HotplugNotice> = match &self.hotplug_rx {
            Some(rx) => std::iter::from_fn(|| rx.try_recv().ok()).collect(),
            None => return,
        };

        for notice in notices {
            match notice {
                HotplugNotice::Arrived(device) => self.handle_device_arrived(device),
                HotplugNotice::Left { bus, address } => self.handle_device_left(bus, address),
            }
        }
    }

    /// Reconcile tracked launchers with the bus
    ///
    /// Used at startup and as the polling fallback.
    pub fn rescan(&mut self) -> Result<(), rusb::Error> {
        let mut present = HashSet::new();

        for device in self.context.devices()?.iter() {
            let key = (device.bus_number(), device.address());
            match device.device_descriptor() {
                Ok(desc) if self.filter.matches(&desc) => {
                    present.insert(key);
                    if !self.devices.contains_key(&key) {
                        self.handle_device_arrived(device);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Skipping device at {:?}: {}", key, e),
            }
        }

        let gone: Vec<(u8, u8)> = self
            .devices
            .keys()
            .filter(|key| !present.contains(key))
            .copied()
            .collect();
        for (bus, address) in gone {
            self.handle_device_left(bus, address);
        }

        Ok(())
    }

    /// Handle device arrival (hot-plug or rescan)
    pub fn handle_device_arrived(&mut self, device: Device<Context>) {
        let launcher = match LauncherDevice::new(device) {
            Ok(launcher) => launcher,
            Err(e) => {
                warn!("Failed to read descriptor of arrived device: {}", e);
                return;
            }
        };

        if !self.filter.matches(launcher.descriptor()) {
            return;
        }

        let key = launcher.location();
        debug!("Launcher arrived: bus={}, addr={}", key.0, key.1);
        self.devices.insert(key, launcher);

        if self.attached.is_none() {
            self.try_attach(key);
        } else {
            info!(
                "Launcher at bus={}, addr={} ignored, one is already attached",
                key.0, key.1
            );
        }
    }

    /// Handle device removal (hot-plug or rescan)
    pub fn handle_device_left(&mut self, bus: u8, address: u8) {
        let key = (bus, address);
        let Some(launcher) = self.devices.remove(&key) else {
            return;
        };
        debug!("Launcher left: bus={}, addr={}", bus, address);

        if self.attached == Some(key) {
            self.detach_current(launcher.device_info(false));

            // Hand over to another launcher still on the bus
            let next = self.devices.keys().next().copied();
            if let Some(next) = next {
                self.try_attach(next);
            }
        }
    }

    /// Open the launcher at `key` and install a fresh session
    fn try_attach(&mut self, key: (u8, u8)) -> bool {
        let Some(launcher) = self.devices.get(&key) else {
            return false;
        };

        match launcher.open(self.interface) {
            Ok(transport) => {
                let session = DeviceSession::with_options(transport, self.session_options);
                self.bridge.attach(Arc::new(session));
                self.attached = Some(key);

                info!(
                    "USB Launcher device now attached (bus={}, addr={})",
                    key.0, key.1
                );
                let device = launcher.device_info(true);
                self.emit(LauncherEvent::Attached { device });
                true
            }
            Err(e) => {
                error!(
                    "Failed to attach launcher at bus={}, addr={}: {}",
                    key.0, key.1, e
                );
                self.emit(LauncherEvent::AttachFailed {
                    bus_number: key.0,
                    device_address: key.1,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Tear down the live session; blocks until in-flight writes drain
    fn detach_current(&mut self, device: DeviceInfo) {
        self.attached = None;
        if self.bridge.detach() {
            info!(
                "Missile Launcher disconnected (bus={}, addr={})",
                device.bus_number, device.device_address
            );
        }
        self.emit(LauncherEvent::Detached { device });
    }

    /// Detach before the USB thread exits
    pub fn shutdown(&mut self) {
        if let Some(key) = self.attached {
            let device = self
                .devices
                .get(&key)
                .map(|l| l.device_info(false))
                .unwrap_or_else(|| DeviceInfo {
                    bus_number: key.0,
                    device_address: key.1,
                    vendor_id: self.filter.vendor_id,
                    product_id: self.filter.product_id,
                    manufacturer: None,
                    product: None,
                    attached: false,
                });
            self.detach_current(device);
        }
    }

    /// List all tracked launchers
    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .devices
            .iter()
            .map(|(key, launcher)| launcher.device_info(self.attached == Some(*key)))
            .collect();
        devices.sort_by_key(|d| d.location());
        devices
    }

    /// The attached launcher, if any
    pub fn status(&self) -> Option<DeviceInfo> {
        let key = self.attached?;
        self.devices.get(&key).map(|l| l.device_info(true))
    }

    fn emit(&self, event: LauncherEvent) {
        if let Err(e) = self.event_sender.try_send(event) {
            // Nobody draining events is not fatal for the USB thread
            debug!("Dropped launcher event: {}", e);
        }
    }
}

/// Hot-plug callback handler
///
/// The callback runs inside `handle_events` and cannot reach the manager, so
/// it only queues notices for `process_hotplug_notices`.
struct HotplugForwarder {
    notices: Sender<HotplugNotice>,
}

impl Hotplug<Context> for HotplugForwarder {
    fn device_arrived(&mut self, device: Device<Context>) {
        debug!(
            "Hot-plug callback: device arrived (bus={}, addr={})",
            device.bus_number(),
            device.address()
        );
        let _ = self.notices.try_send(HotplugNotice::Arrived(device));
    }

    fn device_left(&mut self, device: Device<Context>) {
        debug!(
            "Hot-plug callback: device left (bus={}, addr={})",
            device.bus_number(),
            device.address()
        );
        let _ = self.notices.try_send(HotplugNotice::Left {
            bus: device.bus_number(),
            address: device.address(),
        });
    }
}
