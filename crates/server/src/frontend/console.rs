//! Interactive stdin console

use super::respond;
use anyhow::Result;
use common::AttributeBridge;
use protocol::TransportPort;
use std::io::BufRead;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Forward stdin lines from a detached thread
///
/// A plain thread rather than `tokio::io::stdin`, so a pending read never
/// holds up runtime shutdown.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            debug!("Console input closed");
        })?;
    Ok(rx)
}

/// Serve request lines from `input` until it closes or `quit`
pub async fn run_console<T, W>(
    bridge: Arc<AttributeBridge<T>>,
    mut input: mpsc::Receiver<String>,
    mut output: W,
) -> Result<()>
where
    T: TransportPort + 'static,
    W: AsyncWrite + Unpin,
{
    info!("Console ready, type 'list' for attribute names or 'quit' to exit");

    while let Some(line) = input.recv().await {
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        let bridge = bridge.clone();
        let mut response = tokio::task::spawn_blocking(move || respond(&bridge, &line)).await?;
        response.push('\n');
        output.write_all(response.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}
