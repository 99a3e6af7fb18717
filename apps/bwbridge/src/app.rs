//! Wiring between the command line, the config on disk and the bridge.

use crate::cli::{Cli, Command};
use crate::error::BwBridgeError;
use crate::logger;

use bridge_core::discovery::{LocalInstallation, StaticSelection, SysinfoRunningCheck};
use bridge_core::{BridgeConfig, BridgeHandle, Collaborators, FileKeyStore};

use common::ErrorLocation;

use models::ConnectionStatus;

use std::path::Path;
use std::time::Duration;

use humantime::format_duration;
use log::{debug, info, warn};
use url::Url;

/// Run one command end to end: load config, start the bridge, act, stop.
pub async fn run(cli: Cli) -> Result<(), BwBridgeError> {
    let config_dir = cli.config_dir()?;
    let log_dir = cli.log_dir()?;

    std::fs::create_dir_all(&log_dir).map_err(|e| {
        BwBridgeError::app(format!(
            "Failed to create log directory {}: {e}",
            log_dir.display()
        ))
    })?;
    logger::initialize(&log_dir, cli.log_level())?;

    info!("bwbridge starting");
    info!("Config directory: {}", config_dir.display());

    let config = BridgeConfig::load(&config_dir)?;
    if !config.enabled {
        return Err(BwBridgeError::app(format!(
            "Integration is disabled in {}",
            config_dir.join("config.json").display()
        )));
    }

    let collaborators = collaborators(&config, &config_dir);
    let (handle, task) = BridgeHandle::spawn(config, collaborators);

    let result = match cli.command() {
        Command::Status => settle(&handle, cli.timeout).await.map(|status| {
            println!("{status}");
        }),
        Command::Watch => watch(&handle).await,
        Command::Retrieve { url } => retrieve(&handle, url, cli.timeout).await,
    };

    if let Err(e) = handle.shutdown().await {
        debug!("Bridge already stopped: {e}");
    }
    if let Err(e) = task.await {
        warn!("Bridge task ended abnormally: {e}");
    }

    info!("bwbridge stopped");
    result
}

/// Local checks and the file-backed key store for `config`.
pub fn collaborators(config: &BridgeConfig, config_dir: &Path) -> Collaborators {
    Collaborators {
        installation: Box::new(LocalInstallation::from_config(&config.peer)),
        running: Box::new(SysinfoRunningCheck::new(config.peer.process_name.clone())),
        selection: Box::new(StaticSelection(config.enabled)),
        key_store: Box::new(FileKeyStore::new(config_dir)),
    }
}

/// Statuses that only change once the peer answers.
pub fn is_transient(status: &ConnectionStatus) -> bool {
    matches!(
        status,
        ConnectionStatus::Disabled
            | ConnectionStatus::MissingHandshake
            | ConnectionStatus::Connecting
            | ConnectionStatus::WaitingForStatusResponse
    )
}

/// Start communication and wait until the bridge leaves the transient
/// statuses. A missing shared key is answered with one handshake request,
/// which the user approves in the peer application.
pub async fn settle(
    handle: &BridgeHandle,
    timeout: Duration,
) -> Result<ConnectionStatus, BwBridgeError> {
    let mut status = handle.subscribe();
    handle.init_communication().await?;

    let settled = async {
        let mut handshake_sent = false;
        loop {
            status
                .changed()
                .await
                .map_err(|_| BwBridgeError::app("Bridge stopped before settling"))?;

            let current = status.borrow_and_update().clone();
            debug!("Status while settling: {current}");

            match current {
                ConnectionStatus::MissingHandshake if !handshake_sent => {
                    info!("No shared key yet, approve the request in the peer application");
                    handle.send_handshake().await?;
                    handshake_sent = true;
                }
                current if is_transient(&current) => {}
                current => return Ok::<_, BwBridgeError>(current),
            }
        }
    };

    tokio::time::timeout(timeout, settled)
        .await
        .map_err(|_| {
            BwBridgeError::app(format!(
                "Bridge did not settle within {}, status is {}",
                format_duration(timeout),
                handle.status()
            ))
        })?
}

async fn retrieve(handle: &BridgeHandle, url: Url, timeout: Duration) -> Result<(), BwBridgeError> {
    let status = settle(handle, timeout).await?;
    if !status.is_connected() {
        return Err(BwBridgeError::NotConnected {
            status: status.to_string(),
            location: ErrorLocation::caller(),
        });
    }

    let credentials = handle.retrieve_credentials(url.clone()).await?;
    info!("{} logins for {url}", credentials.len());

    for credential in credentials {
        println!(
            "{}\t{}\t{}",
            credential.credential_id.as_deref().unwrap_or("-"),
            credential.name.as_deref().unwrap_or("-"),
            credential.username.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Follow the status until Ctrl-C.
async fn watch(handle: &BridgeHandle) -> Result<(), BwBridgeError> {
    let mut status = handle.subscribe();
    handle.init_communication().await?;

    let follow = async {
        let mut handshake_sent = false;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            println!("{current}");

            if current != ConnectionStatus::MissingHandshake {
                handshake_sent = false;
            } else if !handshake_sent {
                if let Err(e) = handle.send_handshake().await {
                    warn!("Could not request a handshake: {e}");
                }
                handshake_sent = true;
            }
        }
    };

    tokio::select! {
        _ = follow => Err(BwBridgeError::app("Bridge stopped unexpectedly")),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| BwBridgeError::app(format!("Failed to listen for Ctrl-C: {e}")))?;
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
