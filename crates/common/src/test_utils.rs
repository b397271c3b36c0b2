//! Test utilities for the missile launcher
//!
//! Provides a recording mock transport and helper functions for testing
//! across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::MockTransport;
//! use common::DeviceSession;
//! use protocol::{Actuator, encode};
//!
//! let (transport, probe) = MockTransport::new();
//! let session = DeviceSession::new(transport);
//!
//! session.write(Actuator::Fire, true).unwrap();
//! assert_eq!(probe.sent(), vec![encode(Actuator::Fire, true)]);
//! ```

use protocol::{Command, DeviceInfo, LAUNCHER_PRODUCT_ID, LAUNCHER_VENDOR_ID};
use protocol::{TransportError, TransportPort};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct MockState {
    sent: Mutex<Vec<Command>>,
    timeouts: Mutex<Vec<Duration>>,
    failure: Mutex<Option<TransportError>>,
    delay: Mutex<Duration>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    released: AtomicBool,
}

/// Transport that records every command instead of touching hardware
///
/// Owned by the session under test. Dropping it marks the shared state as
/// released, and any send after release panics.
pub struct MockTransport {
    state: Arc<MockState>,
}

/// Test-side view of a [`MockTransport`]
#[derive(Clone)]
pub struct MockProbe {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Create a transport and the probe that observes it
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MockTransport, MockProbe) {
        let state = Arc::new(MockState::default());
        (
            MockTransport {
                state: state.clone(),
            },
            MockProbe { state },
        )
    }
}

impl TransportPort for MockTransport {
    fn send_control_message(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let state = &self.state;
        assert!(
            !state.released.load(Ordering::SeqCst),
            "send on released transport"
        );

        state.attempts.fetch_add(1, Ordering::SeqCst);
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *state.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        state.sent.lock().unwrap().push(*command);
        state.timeouts.lock().unwrap().push(timeout);
        let failure = state.failure.lock().unwrap().clone();

        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.released.store(true, Ordering::SeqCst);
    }
}

impl MockProbe {
    /// Every command handed to the transport, in order
    pub fn sent(&self) -> Vec<Command> {
        self.state.sent.lock().unwrap().clone()
    }

    /// Timeout passed with each command
    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.timeouts.lock().unwrap().clone()
    }

    /// Number of sends started
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Highest number of sends observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Make every following send fail with `err` (or succeed with `None`)
    pub fn fail_with(&self, err: Option<TransportError>) {
        *self.state.failure.lock().unwrap() = err;
    }

    /// Make every following send block for `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }

    /// Whether the owning session has dropped the transport
    pub fn is_released(&self) -> bool {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.state.sent.lock().unwrap().clear();
        self.state.timeouts.lock().unwrap().clear();
    }
}

/// Create a mock DeviceInfo for a launcher at `bus`/`address`
pub fn create_mock_device_info(bus_number: u8, device_address: u8) -> DeviceInfo {
    DeviceInfo {
        bus_number,
        device_address,
        vendor_id: LAUNCHER_VENDOR_ID,
        product_id: LAUNCHER_PRODUCT_ID,
        manufacturer: Some("Test Manufacturer".to_string()),
        product: Some(format!("Test Launcher {}", device_address)),
        attached: false,
    }
}

/// Run a future with a timeout
///
/// # Example
/// ```
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// # #[tokio::main]
/// # async fn main() {
/// let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await;
/// assert_eq!(result.unwrap(), 42);
/// # }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test operation times out
#[derive(Debug, Clone)]
pub struct TimeoutError {
    pub duration: Duration,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation timed out after {:?}", self.duration)
    }
}

impl std::error::Error for TimeoutError {}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Actuator, encode};

    #[test]
    fn test_mock_records_and_fails() {
        let (mut transport, probe) = MockTransport::new();

        transport
            .send_control_message(&encode(Actuator::Up, true), Duration::from_millis(5))
            .unwrap();
        probe.fail_with(Some(TransportError::Timeout));
        let err = transport
            .send_control_message(&encode(Actuator::Up, false), Duration::from_millis(5))
            .unwrap_err();

        assert_eq!(err, TransportError::Timeout);
        assert_eq!(probe.attempts(), 2);
        assert_eq!(probe.sent().len(), 2);
        assert_eq!(probe.max_in_flight(), 1);
    }

    #[test]
    fn test_drop_marks_released() {
        let (transport, probe) = MockTransport::new();
        assert!(!probe.is_released());
        drop(transport);
        assert!(probe.is_released());
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
        })
        .await;
        assert!(result.is_err());
    }
}
