//! launcherctl
//!
//! Command-line client for launcherd. Reads and writes launcher attributes
//! over the daemon's Unix socket.

mod connection;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::setup_logging;
use connection::AttributeClient;
use protocol::Actuator;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "launcherctl")]
#[command(author, version, about = "Control a USB missile launcher through launcherd")]
#[command(long_about = "
Talks to launcherd over its attribute socket. Each actuator (left, right,
up, down, fire, stop) reads 0 or 1 and accepts 0 or 1.

EXAMPLES:
    # Is a launcher attached?
    launcherctl status

    # Turn right for 800 ms, then stop
    launcherctl move right --for-ms 800

    # Raw attribute access
    launcherctl set up 1
    launcherctl get up

    # Fire
    launcherctl fire
")]
struct Args {
    /// Attribute socket of the daemon
    #[arg(short, long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print an attribute (0 or 1)
    Get { name: Actuator },
    /// Store a value into an attribute
    Set { name: Actuator, value: String },
    /// List attribute names
    List,
    /// Report whether a launcher is attached
    Status,
    /// Fire
    Fire,
    /// Stop all movement
    Stop,
    /// Move in one direction, then stop
    Move {
        direction: Actuator,
        /// How long to move before stopping
        #[arg(long, value_name = "MS", default_value_t = 500)]
        for_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level).context("Failed to setup logging")?;

    let socket = args.socket.unwrap_or_else(common::default_socket_path);
    debug!("Using socket {}", socket.display());
    let mut client = AttributeClient::connect(&socket).await?;

    run(&mut client, args.command).await
}

async fn run(client: &mut AttributeClient, command: Command) -> Result<()> {
    match command {
        Command::Get { name } => {
            let on = client.get(name).await?;
            println!("{}", common::render_flag(on));
        }
        Command::Set { name, value } => {
            let consumed = client.set(name, &value).await?;
            println!("ok {}", consumed);
        }
        Command::List => {
            let names: Vec<&str> = client.list().await?.iter().map(|a| a.name()).collect();
            println!("{}", names.join(" "));
        }
        Command::Status => {
            let attached = client.status().await?;
            println!("{}", if attached { "attached" } else { "detached" });
        }
        Command::Fire => {
            client.set(Actuator::Fire, "1").await?;
        }
        Command::Stop => {
            client.set(Actuator::Stop, "1").await?;
        }
        Command::Move { direction, for_ms } => {
            if !direction.is_direction() {
                bail!("'{}' is not a direction (left, right, up, down)", direction);
            }
            client.set(direction, "1").await?;
            tokio::time::sleep(Duration::from_millis(for_ms)).await;
            client.set(Actuator::Stop, "1").await?;
        }
    }

    Ok(())
}
