//! Command line configuration for the listener

use crate::backend::StatusFiles;
use anyhow::{bail, Result};
use clap::Parser;
use seclab_shared::protocol::DEFAULT_MAX_AGE_SECS;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Placeholder that disables an optional status for one display
const DISABLED: &str = "-";

/// Authenticated listener that publishes the lab status file
#[derive(Debug, Parser)]
#[command(name = "seclab-server", version)]
pub struct Cli {
    /// Unix socket to listen on
    #[arg(long, default_value = "seclab.sock")]
    pub socket: PathBuf,

    /// Maximum accepted message age in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_SECS)]
    pub max_age: u64,

    /// Permissions of the socket file, in octal
    #[arg(long, default_value = "770", value_parser = parse_mode)]
    pub socket_mode: u32,

    /// File holding the shared secret
    pub key: PathBuf,

    /// Displays, five paths each: LINK OPEN CLOSED COFFEE FIRE
    /// (use "-" for COFFEE or FIRE to disable them)
    #[arg(value_name = "LINK OPEN CLOSED COFFEE FIRE")]
    pub displays: Vec<PathBuf>,
}

fn parse_mode(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches("0o"), 8)
        .map_err(|e| format!("invalid octal mode {:?}: {}", s, e))
}

/// Validated listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Key file holding the shared secret
    pub key_path: PathBuf,
    /// Unix socket path
    pub socket_path: PathBuf,
    /// Permissions applied to the socket file
    pub socket_mode: u32,
    /// Replay window
    pub max_age: Duration,
    /// One entry per display, in registration order
    pub displays: Vec<StatusFiles>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("key"),
            socket_path: PathBuf::from("seclab.sock"),
            socket_mode: 0o770,
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
            displays: Vec::new(),
        }
    }
}

impl TryFrom<Cli> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        if cli.displays.len() % 5 != 0 {
            bail!(
                "displays take five paths each (LINK OPEN CLOSED COFFEE FIRE), got {}",
                cli.displays.len()
            );
        }

        let displays = cli
            .displays
            .chunks(5)
            .map(|paths| StatusFiles {
                link: paths[0].clone(),
                open: paths[1].clone(),
                closed: paths[2].clone(),
                coffee: optional(&paths[3]),
                fire: optional(&paths[4]),
            })
            .collect();

        Ok(Self {
            key_path: cli.key,
            socket_path: cli.socket,
            socket_mode: cli.socket_mode,
            max_age: Duration::from_secs(cli.max_age),
            displays,
        })
    }
}

fn optional(path: &Path) -> Option<PathBuf> {
    (path.as_os_str() != DISABLED).then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ServerConfig> {
        let cli = Cli::try_parse_from(std::iter::once("seclab-server").chain(args.iter().copied()))?;
        ServerConfig::try_from(cli)
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["key"]).expect("parse");
        let defaults = ServerConfig::default();
        assert_eq!(config.key_path, defaults.key_path);
        assert_eq!(config.socket_path, defaults.socket_path);
        assert_eq!(config.socket_mode, 0o770);
        assert_eq!(config.max_age, Duration::from_secs(10));
        assert!(config.displays.is_empty());
    }

    #[test]
    fn test_two_displays_in_order() {
        let config = parse(&[
            "--max-age", "30", "--socket", "/run/seclab.sock", "/etc/seclab/key",
            "a/status", "a/open", "a/closed", "a/coffee", "a/fire",
            "b/status", "b/open", "b/closed", "-", "-",
        ])
        .expect("parse");

        assert_eq!(config.max_age, Duration::from_secs(30));
        assert_eq!(config.socket_path, PathBuf::from("/run/seclab.sock"));
        assert_eq!(config.displays.len(), 2);
        assert_eq!(config.displays[0].link, PathBuf::from("a/status"));
        assert_eq!(config.displays[0].coffee, Some(PathBuf::from("a/coffee")));
        assert_eq!(config.displays[1].link, PathBuf::from("b/status"));
        assert_eq!(config.displays[1].coffee, None);
        assert_eq!(config.displays[1].fire, None);
    }

    #[test]
    fn test_incomplete_display_rejected() {
        let err = parse(&["key", "status", "open", "closed"]).unwrap_err();
        assert!(err.to_string().contains("five paths"));
    }

    #[test]
    fn test_socket_mode_is_octal() {
        let config = parse(&["--socket-mode", "0660", "key"]).expect("parse");
        assert_eq!(config.socket_mode, 0o660);
        assert!(parse(&["--socket-mode", "999", "key"]).is_err());
    }
}
