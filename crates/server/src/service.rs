//! Systemd service integration
//!
//! Minimal sd-notify client: readiness, stopping and status messages plus
//! watchdog keepalives, all sent as datagrams to `NOTIFY_SOCKET`.

use anyhow::{Context, Result};
use std::env;
use std::os::unix::net::UnixDatagram;
use std::time::Duration;
use tracing::{debug, error, info};

/// Message understood by the service manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notify {
    Ready,
    Stopping,
    Watchdog,
    Status(String),
}

impl Notify {
    pub fn payload(&self) -> String {
        match self {
            Notify::Ready => "READY=1".to_string(),
            Notify::Stopping => "STOPPING=1".to_string(),
            Notify::Watchdog => "WATCHDOG=1".to_string(),
            Notify::Status(status) => format!("STATUS={}", status),
        }
    }
}

/// Send `message` to systemd
///
/// A no-op returning Ok when not running under systemd.
pub fn notify(message: Notify) -> Result<()> {
    let Ok(socket_path) = env::var("NOTIFY_SOCKET") else {
        if message != Notify::Watchdog {
            debug!("NOTIFY_SOCKET not set, skipping systemd notification");
        }
        return Ok(());
    };

    let socket = UnixDatagram::unbound().context("Failed to create Unix socket")?;
    let payload = message.payload();
    socket
        .send_to(payload.as_bytes(), &socket_path)
        .with_context(|| format!("Failed to send {} to systemd", payload))?;

    match message {
        Notify::Ready => info!("Notified systemd: service ready"),
        Notify::Stopping => info!("Notified systemd: service stopping"),
        _ => debug!("Notified systemd: {}", payload),
    }
    Ok(())
}

/// Get the watchdog timeout configured by systemd (in microseconds)
pub fn get_watchdog_timeout() -> Option<u64> {
    env::var("WATCHDOG_USEC").ok().and_then(|s| s.parse().ok())
}

/// Check if running under systemd
pub fn is_systemd() -> bool {
    env::var("NOTIFY_SOCKET").is_ok()
}

/// Keepalive period: half the watchdog timeout, at least one second
pub fn watchdog_interval(timeout_usec: u64) -> Duration {
    Duration::from_secs((timeout_usec / 1_000_000 / 2).max(1))
}

/// Spawn a task sending WATCHDOG=1 at half the configured interval
///
/// Returns None when the watchdog is not enabled.
pub fn spawn_watchdog_task() -> Option<tokio::task::JoinHandle<()>> {
    let Some(timeout_usec) = get_watchdog_timeout() else {
        debug!("Systemd watchdog not enabled, skipping watchdog task");
        return None;
    };

    let interval = watchdog_interval(timeout_usec);
    info!(
        "Systemd watchdog enabled, interval: {}s (timeout: {}s)",
        interval.as_secs(),
        timeout_usec / 1_000_000
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = notify(Notify::Watchdog) {
                error!("Failed to send watchdog keepalive: {:#}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads() {
        assert_eq!(Notify::Ready.payload(), "READY=1");
        assert_eq!(Notify::Stopping.payload(), "STOPPING=1");
        assert_eq!(Notify::Watchdog.payload(), "WATCHDOG=1");
        assert_eq!(
            Notify::Status("1 launcher attached".to_string()).payload(),
            "STATUS=1 launcher attached"
        );
    }

    #[test]
    fn test_watchdog_interval() {
        assert_eq!(watchdog_interval(30_000_000), Duration::from_secs(15));
        assert_eq!(watchdog_interval(500_000), Duration::from_secs(1));
    }

    #[test]
    fn test_notify_reaches_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.sock");
        let receiver = UnixDatagram::bind(&path).unwrap();

        // The only test touching NOTIFY_SOCKET
        unsafe {
            env::set_var("NOTIFY_SOCKET", &path);
        }
        assert!(is_systemd());
        notify(Notify::Ready).unwrap();
        unsafe {
            env::remove_var("NOTIFY_SOCKET");
        }

        let mut buf = [0u8; 64];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1");
    }
}
