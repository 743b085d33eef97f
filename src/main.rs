mod client;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::Client;
use seclab_shared::{Command, Response};
use std::path::{Path, PathBuf};
use tokio::net::UnixStream;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Send a signed command to the seclab status listener
#[derive(Debug, Parser)]
#[command(name = "seclab", version)]
struct Cli {
    /// File holding the shared secret
    #[arg(long)]
    key: PathBuf,

    /// Unix socket of the listener
    #[arg(long, default_value = "seclab.sock")]
    socket: PathBuf,

    /// Where to store a rotated key (defaults to --key)
    #[arg(long)]
    key_out: Option<PathBuf>,

    /// Print a rotated key as hex instead of storing it
    #[arg(long, conflicts_with = "key_out")]
    print_only: bool,

    #[command(subcommand)]
    action: Action,
}

impl Cli {
    /// File a rotated key is written to, or None when it is only printed
    fn rotated_key_path(&self) -> Option<&Path> {
        if self.print_only {
            return None;
        }
        Some(self.key_out.as_deref().unwrap_or(&self.key))
    }
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Action {
    /// Show "lab open"
    Open,
    /// Show "lab closed"
    Close,
    /// Show "out for coffee"
    Coffee,
    /// Show "lab is on fire"
    Fire,
    /// Replace the shared secret
    Rotate,
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Open => Command::Open,
            Action::Close => Command::Close,
            Action::Coffee => Command::Coffee,
            Action::Fire => Command::Fire,
            Action::Rotate => Command::KeyRotate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let key = client::load_key(&cli.key).await?;
    let stream = UnixStream::connect(&cli.socket)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.socket.display()))?;

    let command = Command::from(cli.action);
    let mut client = Client::new(stream, key);

    match client.send(command).await? {
        Response::AllGood => info!("Listener applied {}", command),
        Response::NewKey { timestamp, secret } => match cli.rotated_key_path() {
            Some(out) => {
                client::save_key(out, &secret).await?;
                info!("New key (issued at {}) stored in {}", timestamp, out.display());
            }
            None => {
                info!("New key issued at {}", timestamp);
                println!("{}", client::key_to_hex(&secret));
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("seclab").chain(args.iter().copied()))
    }

    #[test]
    fn test_rotate_stores_into_key_file_by_default() {
        let cli = parse(&["--key", "client.key", "rotate"]).expect("parse");
        assert_eq!(Command::from(cli.action), Command::KeyRotate);
        assert_eq!(cli.rotated_key_path(), Some(Path::new("client.key")));
    }

    #[test]
    fn test_key_out_overrides_destination() {
        let cli = parse(&["--key", "client.key", "--key-out", "next.key", "rotate"]).expect("parse");
        assert_eq!(cli.rotated_key_path(), Some(Path::new("next.key")));
    }

    #[test]
    fn test_print_only_stores_nothing() {
        let cli = parse(&["--key", "client.key", "--print-only", "rotate"]).expect("parse");
        assert_eq!(cli.rotated_key_path(), None);
    }

    #[test]
    fn test_print_only_conflicts_with_key_out() {
        assert!(parse(&["--key", "k", "--key-out", "o", "--print-only", "rotate"]).is_err());
    }

    #[test]
    fn test_subcommands_map_to_commands() {
        for (name, command) in [
            ("open", Command::Open),
            ("close", Command::Close),
            ("coffee", Command::Coffee),
            ("fire", Command::Fire),
        ] {
            let cli = parse(&["--key", "k", name]).expect("parse");
            assert_eq!(Command::from(cli.action), command);
        }
    }
}
