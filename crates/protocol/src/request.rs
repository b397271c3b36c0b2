//! Attribute line protocol
//!
//! Requests and responses are single text lines, used both on the daemon's
//! Unix socket and on its stdin console.
//!
//! ```text
//! get left        -> 0
//! left            -> 0
//! set left 1      -> ok 1
//! left=1          -> ok 1
//! list            -> left right up down fire stop
//! status          -> attached
//! ```

use crate::actuator::Actuator;
use crate::error::RequestError;

/// A parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRequest {
    /// Read an attribute
    Get(Actuator),
    /// Store raw text into an attribute
    Set { actuator: Actuator, value: String },
    /// List attribute names
    List,
    /// Ask whether a device session is live
    Status,
}

impl AttributeRequest {
    /// Parse one request line (trailing newline allowed)
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(RequestError::Empty);
        }

        if let Some((name, value)) = line.split_once('=') {
            let actuator: Actuator = name.trim().parse()?;
            let value = value.trim();
            if value.is_empty() {
                return Err(RequestError::MissingValue(actuator.to_string()));
            }
            return Ok(AttributeRequest::Set {
                actuator,
                value: value.to_string(),
            });
        }

        let mut tokens = line.split_whitespace();
        // Non-empty after trim, so there is always a first token
        let verb = tokens.next().unwrap_or_default();

        let request = match verb {
            "list" => AttributeRequest::List,
            "status" => AttributeRequest::Status,
            "get" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| RequestError::MissingValue("get".to_string()))?;
                AttributeRequest::Get(name.parse()?)
            }
            "set" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| RequestError::MissingValue("set".to_string()))?;
                let actuator: Actuator = name.parse()?;
                let value = tokens
                    .next()
                    .ok_or_else(|| RequestError::MissingValue(actuator.to_string()))?;
                AttributeRequest::Set {
                    actuator,
                    value: value.to_string(),
                }
            }
            other => match other.parse::<Actuator>() {
                Ok(actuator) => AttributeRequest::Get(actuator),
                Err(_) => return Err(RequestError::UnknownVerb(other.to_string())),
            },
        };

        if let Some(extra) = tokens.next() {
            return Err(RequestError::UnexpectedArgument(extra.to_string()));
        }

        Ok(request)
    }

    /// Canonical request line, without newline
    pub fn to_line(&self) -> String {
        match self {
            AttributeRequest::Get(actuator) => format!("get {}", actuator),
            AttributeRequest::Set { actuator, value } => format!("set {} {}", actuator, value),
            AttributeRequest::List => "list".to_string(),
            AttributeRequest::Status => "status".to_string(),
        }
    }
}

/// A response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeResponse {
    /// Current flag value
    Value(bool),
    /// Bytes consumed by a store
    Stored(usize),
    /// Attribute names
    Names(Vec<Actuator>),
    /// Session liveness
    Status { attached: bool },
    /// Request failed
    Error(String),
}

impl AttributeResponse {
    /// Response line, without newline
    pub fn to_line(&self) -> String {
        match self {
            AttributeResponse::Value(on) => format!("{}", u8::from(*on)),
            AttributeResponse::Stored(count) => format!("ok {}", count),
            AttributeResponse::Names(names) => names
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(" "),
            AttributeResponse::Status { attached: true } => "attached".to_string(),
            AttributeResponse::Status { attached: false } => "detached".to_string(),
            AttributeResponse::Error(message) => format!("error: {}", message),
        }
    }

    /// Parse a response line
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(message) = line.strip_prefix("error: ") {
            return Ok(AttributeResponse::Error(message.to_string()));
        }

        match line {
            "0" => return Ok(AttributeResponse::Value(false)),
            "1" => return Ok(AttributeResponse::Value(true)),
            "attached" => return Ok(AttributeResponse::Status { attached: true }),
            "detached" => return Ok(AttributeResponse::Status { attached: false }),
            _ => {}
        }

        if let Some(count) = line.strip_prefix("ok ") {
            return count
                .parse()
                .map(AttributeResponse::Stored)
                .map_err(|_| RequestError::MalformedResponse(line.to_string()));
        }

        line.split_whitespace()
            .map(str::parse::<Actuator>)
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeResponse::Names)
            .map_err(|_| RequestError::MalformedResponse(line.to_string()))
    }
}
