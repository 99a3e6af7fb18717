//! Command line arguments.

use crate::error::BwBridgeError;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use url::Url;

/// Directory under the platform config dir used when `--config-dir` is absent.
pub const APP_DIR_NAME: &str = "bwbridge";

const DEFAULT_TIMEOUT: &str = "30s";

#[derive(Parser, Debug)]
#[command(author, version, about = "Talk to the Bitwarden desktop app through its proxy", long_about = None)]
pub struct Cli {
    /// Directory holding config.json and the shared key
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Directory for bwbridge.log, defaults to the config directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log at trace level
    #[arg(short, long)]
    pub verbose: bool,

    /// How long to wait for the connection to settle, e.g. "30s" or "2m"
    #[arg(long, default_value = DEFAULT_TIMEOUT, value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect and print the status the bridge settles in
    Status,
    /// Connect and log every status change until interrupted
    Watch,
    /// Print the logins stored for a URL
    Retrieve { url: Url },
}

impl Cli {
    /// `watch` when no subcommand was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }

    pub fn config_dir(&self) -> Result<PathBuf, BwBridgeError> {
        if let Some(ref dir) = self.config_dir {
            return Ok(dir.clone());
        }

        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| BwBridgeError::app("No platform config directory, pass --config-dir"))
    }

    pub fn log_dir(&self) -> Result<PathBuf, BwBridgeError> {
        match self.log_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => self.config_dir(),
        }
    }

    pub fn log_level(&self) -> Option<LevelFilter> {
        self.verbose.then_some(LevelFilter::Trace)
    }
}
