//! Device session
//!
//! A [`DeviceSession`] exists for exactly one physical attachment. It owns the
//! transport handle and the six actuator flags, and serializes every write
//! through a single gate so that "encode, update flag, send" never interleaves
//! with another write.
//!
//! Lifecycle:
//!
//! ```text
//! Attached --detach()--> Detaching --(in-flight ops drain)--> Destroyed
//! ```
//!
//! The "unattached" state is the absence of a session; see
//! [`AttributeBridge`](crate::attributes::AttributeBridge).
//!
//! Flag updates are optimistic by default: the flag is set before the control
//! message is sent and is not rolled back when the send fails. Turning Stop
//! off clears the flag without talking to the device at all.
//! [`CommitPolicy::Confirmed`] is the stricter alternative.

use protocol::{Actuator, Command, DEFAULT_TIMEOUT, TransportError, TransportPort};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by session operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Operation issued outside the Attached phase
    #[error("session not attached")]
    NotAttached,

    /// Control message failed; the session stays usable
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// When a write commits its flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitPolicy {
    /// Set the flag before sending and keep it whatever the transport says.
    /// Stop-off skips the transport entirely.
    #[default]
    Optimistic,
    /// Send first, set the flag only if the send succeeded. Stop-off is sent
    /// like any other command.
    Confirmed,
}

/// Per-session tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Bound on a single control message
    pub timeout: Duration,
    pub commit_policy: CommitPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            commit_policy: CommitPolicy::Optimistic,
        }
    }
}

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Attached,
    Detaching,
    Destroyed,
}

/// Six independent on/off flags, all off at creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorState {
    flags: [bool; 6],
}

impl ActuatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, actuator: Actuator) -> bool {
        self.flags[actuator.index()]
    }

    pub fn set(&mut self, actuator: Actuator, on: bool) {
        self.flags[actuator.index()] = on;
    }

    /// (actuator, flag) pairs in attribute order
    pub fn iter(&self) -> impl Iterator<Item = (Actuator, bool)> + '_ {
        Actuator::ALL.into_iter().map(|a| (a, self.get(a)))
    }

    /// Whether any actuator is on
    pub fn any_on(&self) -> bool {
        self.flags.iter().any(|on| *on)
    }
}

/// Everything released on detach
struct Link<T> {
    /// Also the write gate: held for the whole write
    transport: Mutex<T>,
    state: RwLock<ActuatorState>,
}

/// State manager for one attached launcher
pub struct DeviceSession<T: TransportPort> {
    phase: Mutex<SessionPhase>,
    /// Read-held by every operation, write-held by detach
    link: RwLock<Option<Link<T>>>,
    options: SessionOptions,
}

impl<T: TransportPort> DeviceSession<T> {
    /// Start a session on a freshly available transport, all flags off
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, SessionOptions::default())
    }

    pub fn with_options(transport: T, options: SessionOptions) -> Self {
        debug!(
            "Session created: timeout={}ms, policy={:?}",
            options.timeout.as_millis(),
            options.commit_policy
        );

        Self {
            phase: Mutex::new(SessionPhase::Attached),
            link: RwLock::new(Some(Link {
                transport: Mutex::new(transport),
                state: RwLock::new(ActuatorState::new()),
            })),
            options,
        }
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn phase(&self) -> SessionPhase {
        *lock(&self.phase)
    }

    pub fn is_attached(&self) -> bool {
        self.phase() == SessionPhase::Attached
    }

    /// Current flag for `actuator`
    pub fn read(&self, actuator: Actuator) -> Result<bool, SessionError> {
        let guard = read_lock(&self.link);
        let link = self.live_link(&guard)?;
        let on = read_lock(&link.state).get(actuator);
        Ok(on)
    }

    /// Consistent copy of all six flags
    pub fn snapshot(&self) -> Result<ActuatorState, SessionError> {
        let guard = read_lock(&self.link);
        let link = self.live_link(&guard)?;
        let state = *read_lock(&link.state);
        Ok(state)
    }

    /// Drive `actuator` on or off
    ///
    /// Blocks for up to the configured timeout while the control message is
    /// in flight. Every call re-sends; there is no deduplication.
    pub fn write(&self, actuator: Actuator, turn_on: bool) -> Result<(), SessionError> {
        let guard = read_lock(&self.link);
        let link = self.live_link(&guard)?;

        let mut transport = lock(&link.transport);
        let command = Command::encode(actuator, turn_on);

        let result = match self.options.commit_policy {
            CommitPolicy::Optimistic => {
                // TODO: reconcile-on-failure. The flag is committed before the
                // send and never rolled back; stop-off never reaches the device.
                write_lock(&link.state).set(actuator, turn_on);

                if actuator == Actuator::Stop && !turn_on {
                    debug!("{} -> 0 (no control message)", actuator);
                    return Ok(());
                }

                transport.send_control_message(&command, self.options.timeout)
            }
            CommitPolicy::Confirmed => {
                let result = transport.send_control_message(&command, self.options.timeout);
                if result.is_ok() {
                    write_lock(&link.state).set(actuator, turn_on);
                }
                result
            }
        };

        match result {
            Ok(()) => {
                debug!("{} -> {} [{}]", actuator, u8::from(turn_on), command);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "error while ctrl transfer: {} -> {} [{}]: {}",
                    actuator,
                    u8::from(turn_on),
                    command,
                    e
                );
                Err(SessionError::Transport(e))
            }
        }
    }

    /// Stop accepting operations, wait for in-flight ones, release the
    /// transport
    ///
    /// Returns false if the session was already detaching or destroyed.
    pub fn detach(&self) -> bool {
        {
            let mut phase = lock(&self.phase);
            if *phase != SessionPhase::Attached {
                debug!("Detach ignored, session already {:?}", *phase);
                return false;
            }
            *phase = SessionPhase::Detaching;
        }

        // Blocks until every operation holding the link has returned
        let link = write_lock(&self.link).take();
        drop(link);

        *lock(&self.phase) = SessionPhase::Destroyed;
        info!("Session destroyed, transport released");
        true
    }

    fn live_link<'a>(
        &self,
        guard: &'a RwLockReadGuard<'_, Option<Link<T>>>,
    ) -> Result<&'a Link<T>, SessionError> {
        if !self.is_attached() {
            return Err(SessionError::NotAttached);
        }
        match &**guard {
            Some(link) => Ok(link),
            None => Err(SessionError::NotAttached),
        }
    }
}

impl<T: TransportPort> std::fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("phase", &self.phase())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
