mod auth;
mod backend;
mod command;
mod config;
mod error;
mod report;
mod session;

use anyhow::{Context, Result};
use auth::{KeyStore, MessageAuthenticator};
use backend::FileBackend;
use clap::Parser;
use command::CommandDispatcher;
use config::{Cli, ServerConfig};
use report::ChannelReporter;
use session::{Listener, RequestHandler};
use std::path::Path;
use std::sync::Arc;
use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = ServerConfig::try_from(Cli::parse())?;

    let keys = Arc::new(KeyStore::new(config.key_path.clone()));
    let authenticator = MessageAuthenticator::new(keys.clone(), config.max_age);

    info!("Seclab listener starting");
    info!("  Key file: {}", keys.path().display());
    info!("  Max message age: {}s", authenticator.max_age().as_secs());

    let mut dispatcher = CommandDispatcher::new(keys);
    for files in &config.displays {
        info!("  Display: {}", files.link.display());
        dispatcher.add_backend(Arc::new(FileBackend::new(files.clone())));
    }

    let (reporter, reports) = ChannelReporter::new();
    tokio::spawn(report::forward_to_log(reports));

    let listener = Listener::new(Arc::new(RequestHandler::new(authenticator, dispatcher)))
        .with_reporter(Arc::new(reporter));

    let socket = open_socket(&config.socket_path, config.socket_mode)?;

    let result = tokio::select! {
        res = listener.serve(socket) => res,
        res = shutdown_signal() => {
            res?;
            info!("Shutdown requested");
            Ok(())
        }
    };

    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        warn!("Failed to remove {}: {}", config.socket_path.display(), e);
    }

    result
}

/// Bind the Unix socket, replacing a stale socket file, and restrict access
fn open_socket(path: &Path, mode: u32) -> Result<UnixListener> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to remove {}", path.display()));
        }
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind {}", path.display()))?;

    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("Failed to set permissions on {}", path.display()))?;

    info!("Listening on {} (mode {:o})", path.display(), mode);
    Ok(listener)
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() -> Result<()> {
    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("Failed to listen for SIGINT")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{FileTypeExt, PermissionsExt};

    #[tokio::test]
    async fn test_open_socket_replaces_stale_file_and_sets_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seclab.sock");
        std::fs::write(&path, b"stale").expect("write");

        let _listener = open_socket(&path, 0o660).expect("open socket");

        let meta = std::fs::metadata(&path).expect("metadata");
        assert!(meta.file_type().is_socket());
        assert_eq!(meta.permissions().mode() & 0o777, 0o660);
    }

    #[tokio::test]
    async fn test_open_socket_in_missing_directory_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope").join("seclab.sock");
        let err = open_socket(&path, 0o770).unwrap_err();
        assert!(err.to_string().contains("Failed to bind"), "{}", err);
    }
}
