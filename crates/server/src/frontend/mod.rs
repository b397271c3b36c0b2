//! Attribute front ends
//!
//! The Unix socket and the stdin console both speak the attribute line
//! protocol; each request line is answered with exactly one response line.

pub mod console;
pub mod socket;

use common::AttributeBridge;
use protocol::{AttributeRequest, AttributeResponse, TransportPort};
use tracing::debug;

pub use console::run_console;
pub use socket::AttributeSocket;

/// Answer one request line
///
/// Stores may block on the control transfer, so async callers run this on
/// the blocking pool.
pub fn respond<T: TransportPort>(bridge: &AttributeBridge<T>, line: &str) -> String {
    let response = match AttributeRequest::parse(line) {
        Ok(request) => {
            debug!("Attribute request: {}", request.to_line());
            bridge.handle(&request)
        }
        Err(e) => AttributeResponse::Error(e.to_string()),
    };
    response.to_line()
}
