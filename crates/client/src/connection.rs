//! Attribute socket connection
//!
//! One request line out, one response line back.

use anyhow::{Context, Result, anyhow, bail};
use protocol::{Actuator, AttributeRequest, AttributeResponse};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

/// Upper bound for one round trip; a store may spend the full control
/// transfer timeout on the device
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AttributeClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl AttributeClient {
    pub async fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await.with_context(|| {
            format!(
                "Failed to connect to launcherd at {} (is the daemon running?)",
                path.display()
            )
        })?;
        debug!("Connected to {}", path.display());

        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send one request and wait for its response
    ///
    /// `error:` responses are returned as values, not as Err.
    pub async fn request(&mut self, request: &AttributeRequest) -> Result<AttributeResponse> {
        let line = format!("{}\n", request.to_line());
        debug!("-> {}", line.trim_end());

        let exchange = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.lines.next_line().await
        };
        let reply = tokio::time::timeout(REQUEST_TIMEOUT, exchange)
            .await
            .map_err(|_| anyhow!("launcherd did not answer within {:?}", REQUEST_TIMEOUT))?
            .context("Failed to talk to launcherd")?
            .ok_or_else(|| anyhow!("launcherd closed the connection"))?;

        debug!("<- {}", reply);
        Ok(AttributeResponse::parse(&reply)?)
    }

    pub async fn get(&mut self, actuator: Actuator) -> Result<bool> {
        match self.request(&AttributeRequest::Get(actuator)).await? {
            AttributeResponse::Value(on) => Ok(on),
            other => unexpected(other),
        }
    }

    /// Store raw text; returns the byte count the daemon consumed
    pub async fn set(&mut self, actuator: Actuator, value: &str) -> Result<usize> {
        let request = AttributeRequest::Set {
            actuator,
            value: value.to_string(),
        };
        match self.request(&request).await? {
            AttributeResponse::Stored(count) => Ok(count),
            other => unexpected(other),
        }
    }

    pub async fn list(&mut self) -> Result<Vec<Actuator>> {
        match self.request(&AttributeRequest::List).await? {
            AttributeResponse::Names(names) => Ok(names),
            other => unexpected(other),
        }
    }

    pub async fn status(&mut self) -> Result<bool> {
        match self.request(&AttributeRequest::Status).await? {
            AttributeResponse::Status { attached } => Ok(attached),
            other => unexpected(other),
        }
    }
}

fn unexpected<T>(response: AttributeResponse) -> Result<T> {
    match response {
        AttributeResponse::Error(message) => bail!("launcherd: {}", message),
        other => bail!("unexpected response: {}", other.to_line()),
    }
}
