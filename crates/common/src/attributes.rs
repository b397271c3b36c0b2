//! Attribute bridge
//!
//! Surfaces each actuator as a named attribute (`left`, `right`, `up`,
//! `down`, `fire`, `stop`). Reads render the flag as `0`/`1`; stores accept
//! exactly the tokens `0` and `1` and silently ignore anything else, always
//! reporting the full input as consumed.
//!
//! The bridge holds at most one [`DeviceSession`]. The device manager injects
//! it on attach and takes it back on detach; with no session installed every
//! access fails with [`SessionError::NotAttached`].

use crate::session::{DeviceSession, SessionError};
use protocol::{Actuator, AttributeRequest, AttributeResponse, TransportPort};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced to attribute callers
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl BridgeError {
    pub fn is_not_attached(&self) -> bool {
        matches!(self, BridgeError::Session(SessionError::NotAttached))
    }
}

/// Store token was neither `0` nor `1`
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unrecognized input")]
pub struct UnrecognizedInput;

/// Interpret a store token
///
/// Matches the kernel's `sysfs_streq`: the token must equal `0` or `1`
/// exactly, except that one trailing newline is ignored.
pub fn parse_flag(text: &str) -> Result<bool, UnrecognizedInput> {
    let token = text.strip_suffix('\n').unwrap_or(text);
    match token {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(UnrecognizedInput),
    }
}

/// Render a flag the way a read of the attribute shows it
pub fn render_flag(on: bool) -> String {
    u8::from(on).to_string()
}

/// Named-attribute front of the current device session
pub struct AttributeBridge<T: TransportPort> {
    slot: RwLock<Option<Arc<DeviceSession<T>>>>,
}

impl<T: TransportPort> Default for AttributeBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TransportPort> AttributeBridge<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Attribute names, in table order
    pub fn names(&self) -> &'static [Actuator] {
        &Actuator::ALL
    }

    /// Start forwarding to `session`
    ///
    /// A session that was still installed is detached first.
    pub fn attach(&self, session: Arc<DeviceSession<T>>) {
        let previous = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session);

        if let Some(previous) = previous {
            warn!("Replacing live session, detaching the previous one");
            previous.detach();
        }
        info!("Attributes live: {}", attribute_list());
    }

    /// Stop forwarding and tear the session down
    ///
    /// Waits for in-flight operations on the session. Returns false when no
    /// session was installed.
    pub fn detach(&self) -> bool {
        let session = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match session {
            Some(session) => {
                session.detach();
                true
            }
            None => {
                debug!("Detach with no session installed");
                false
            }
        }
    }

    /// Currently installed session, if any
    pub fn session(&self) -> Option<Arc<DeviceSession<T>>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_attached(&self) -> bool {
        self.session().is_some_and(|s| s.is_attached())
    }

    /// Read attribute `name` as `"0"` or `"1"`
    pub fn get(&self, name: &str) -> Result<String, BridgeError> {
        let actuator = resolve(name)?;
        self.read(actuator).map(render_flag)
    }

    /// Store `text` into attribute `name`
    ///
    /// Returns the number of bytes consumed, which is always `text.len()`,
    /// even when the token is unrecognized or the control message fails.
    pub fn set(&self, name: &str, text: &str) -> Result<usize, BridgeError> {
        let actuator = resolve(name)?;
        self.store(actuator, text)
    }

    pub fn read(&self, actuator: Actuator) -> Result<bool, BridgeError> {
        let session = self.current()?;
        Ok(session.read(actuator)?)
    }

    pub fn store(&self, actuator: Actuator, text: &str) -> Result<usize, BridgeError> {
        let session = self.current()?;

        let turn_on = match parse_flag(text) {
            Ok(on) => on,
            Err(e) => {
                debug!("{}: ignoring {:?}: {}", actuator, text, e);
                return Ok(text.len());
            }
        };

        match session.write(actuator, turn_on) {
            Ok(()) => {}
            // Logged by the session; the store itself still succeeds
            Err(SessionError::Transport(_)) => {}
            Err(e @ SessionError::NotAttached) => return Err(e.into()),
        }

        Ok(text.len())
    }

    /// Serve one line-protocol request
    pub fn handle(&self, request: &AttributeRequest) -> AttributeResponse {
        let result = match request {
            AttributeRequest::Get(actuator) => self.read(*actuator).map(AttributeResponse::Value),
            AttributeRequest::Set { actuator, value } => {
                self.store(*actuator, value).map(AttributeResponse::Stored)
            }
            AttributeRequest::List => Ok(AttributeResponse::Names(self.names().to_vec())),
            AttributeRequest::Status => Ok(AttributeResponse::Status {
                attached: self.is_attached(),
            }),
        };

        result.unwrap_or_else(|e| AttributeResponse::Error(e.to_string()))
    }

    fn current(&self) -> Result<Arc<DeviceSession<T>>, BridgeError> {
        self.session()
            .ok_or(BridgeError::Session(SessionError::NotAttached))
    }
}

fn resolve(name: &str) -> Result<Actuator, BridgeError> {
    name.parse()
        .map_err(|_| BridgeError::UnknownAttribute(name.to_string()))
}

fn attribute_list() -> String {
    Actuator::ALL
        .iter()
        .map(|a| a.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTransport;

    fn attached_bridge() -> (AttributeBridge<MockTransport>, crate::test_utils::MockProbe) {
        let (transport, probe) = MockTransport::new();
        let bridge = AttributeBridge::new();
        bridge.attach(Arc::new(DeviceSession::new(transport)));
        (bridge, probe)
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("0"), Ok(false));
        assert_eq!(parse_flag("1"), Ok(true));
        assert_eq!(parse_flag("1\n"), Ok(true));
        assert_eq!(parse_flag("1\n\n"), Err(UnrecognizedInput));
        assert_eq!(parse_flag(" 1"), Err(UnrecognizedInput));
        assert_eq!(parse_flag("true"), Err(UnrecognizedInput));
        assert_eq!(parse_flag(""), Err(UnrecognizedInput));
    }

    #[test]
    fn test_unattached_bridge() {
        let bridge: AttributeBridge<MockTransport> = AttributeBridge::new();
        assert!(!bridge.is_attached());
        assert!(bridge.get("left").unwrap_err().is_not_attached());
        assert!(bridge.set("left", "1").unwrap_err().is_not_attached());
        assert!(!bridge.detach());
    }

    #[test]
    fn test_unknown_attribute() {
        let (bridge, _probe) = attached_bridge();
        assert_eq!(
            bridge.get("sideways"),
            Err(BridgeError::UnknownAttribute("sideways".to_string()))
        );
    }

    #[test]
    fn test_unrecognized_token_is_noop() {
        let (bridge, probe) = attached_bridge();
        assert_eq!(bridge.set("fire", "bogus"), Ok(5));
        assert_eq!(bridge.get("fire").unwrap(), "0");
        assert_eq!(probe.attempts(), 0);
    }

    #[test]
    fn test_attach_replaces_and_detaches_previous() {
        let (bridge, first) = attached_bridge();
        let (transport, second) = MockTransport::new();
        bridge.attach(Arc::new(DeviceSession::new(transport)));

        assert!(first.is_released());
        assert!(!second.is_released());
        assert!(bridge.is_attached());
    }

    #[test]
    fn test_handle_dispatch() {
        let (bridge, _probe) = attached_bridge();
        assert_eq!(
            bridge.handle(&AttributeRequest::Set {
                actuator: Actuator::Up,
                value: "1".to_string()
            }),
            AttributeResponse::Stored(1)
        );
        assert_eq!(
            bridge.handle(&AttributeRequest::Get(Actuator::Up)),
            AttributeResponse::Value(true)
        );
        assert_eq!(
            bridge.handle(&AttributeRequest::Status),
            AttributeResponse::Status { attached: true }
        );

        bridge.detach();
        assert_eq!(
            bridge.handle(&AttributeRequest::Get(Actuator::Up)),
            AttributeResponse::Error("session not attached".to_string())
        );
    }
}
