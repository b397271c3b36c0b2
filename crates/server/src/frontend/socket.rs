//! Unix socket serving the attribute line protocol

use super::respond;
use anyhow::{Context, Result};
use common::AttributeBridge;
use protocol::TransportPort;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Listening attribute socket
///
/// The socket file is removed when this is dropped.
pub struct AttributeSocket {
    listener: UnixListener,
    path: PathBuf,
}

impl AttributeSocket {
    /// Bind `path`, replacing a stale socket file, and apply `mode`
    pub fn bind(path: &Path, mode: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create socket directory: {}", parent.display())
            })?;
        }

        if path.exists() {
            debug!("Removing stale socket: {}", path.display());
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale socket: {}", path.display()))?;
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind attribute socket: {}", path.display()))?;

        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set socket mode {:o}", mode))?;

        info!("Attribute socket listening on {}", path.display());
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until the task is cancelled
    pub async fn serve<T>(&self, bridge: Arc<AttributeBridge<T>>) -> Result<()>
    where
        T: TransportPort + 'static,
    {
        loop {
            let (stream, _addr) = self
                .listener
                .accept()
                .await
                .context("Failed to accept attribute connection")?;

            let bridge = bridge.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, bridge).await {
                    warn!("Attribute connection error: {:#}", e);
                }
            });
        }
    }
}

impl Drop for AttributeSocket {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.path());
    }
}

async fn handle_connection<T>(stream: UnixStream, bridge: Arc<AttributeBridge<T>>) -> Result<()>
where
    T: TransportPort + 'static,
{
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let bridge = bridge.clone();
        let mut response = tokio::task::spawn_blocking(move || respond(&bridge, &line))
            .await
            .context("Attribute request task failed")?;
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
    }

    debug!("Attribute connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::DeviceSession;
    use common::test_utils::{DEFAULT_TEST_TIMEOUT, MockTransport, with_timeout};
    use protocol::{Actuator, encode};

    async fn exchange(path: &Path, requests: &[&str]) -> Vec<String> {
        let stream = UnixStream::connect(path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let mut responses = Vec::new();
        for request in requests {
            writer
                .write_all(format!("{}\n", request).as_bytes())
                .await
                .unwrap();
            responses.push(lines.next_line().await.unwrap().unwrap());
        }
        responses
    }

    #[tokio::test]
    async fn test_socket_serves_line_protocol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcherd.sock");

        let (transport, probe) = MockTransport::new();
        let bridge = Arc::new(AttributeBridge::new());
        bridge.attach(Arc::new(DeviceSession::new(transport)));

        let socket = AttributeSocket::bind(&path, 0o600).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let server_bridge = bridge.clone();
        let server = tokio::spawn(async move { socket.serve(server_bridge).await });

        let responses = with_timeout(
            DEFAULT_TEST_TIMEOUT,
            exchange(&path, &["status", "up=1", "up", "bogus"]),
        )
        .await
        .unwrap();

        assert_eq!(responses[0], "attached");
        assert_eq!(responses[1], "ok 1");
        assert_eq!(responses[2], "1");
        assert!(responses[3].starts_with("error: "));
        assert_eq!(probe.sent(), vec![encode(Actuator::Up, true)]);

        server.abort();
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("launcherd.sock");

        let first = AttributeSocket::bind(&path, 0o666).unwrap();
        // Leak the file as a crashed daemon would
        std::mem::forget(first);
        assert!(path.exists());

        let second = AttributeSocket::bind(&path, 0o666).unwrap();
        assert_eq!(second.path(), path.as_path());
        drop(second);
        assert!(!path.exists());
    }
}
