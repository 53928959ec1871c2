use anyhow::Error;
use clap::{ArgAction, Parser, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use fitsync_lib::{fitsync_config::FitsyncConfig, fitsync_sync::SyncOperation};

use crate::fitsync_cli::FitsyncCli;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitsyncCommand {
    /// List the weight points stored in Google Fit
    Get,
    /// Upload Fitbit weight logs to Google Fit
    Patch,
    /// Remove the weight points in the fetched window from Google Fit
    Delete,
}

impl From<FitsyncCommand> for SyncOperation {
    fn from(item: FitsyncCommand) -> Self {
        match item {
            FitsyncCommand::Get => Self::Get,
            FitsyncCommand::Patch => Self::Patch,
            FitsyncCommand::Delete => Self::Delete,
        }
    }
}

/// Sync weight logs from a Fitbit scale to Google Fit
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(name = "fitsync", version)]
pub struct FitsyncCliOpts {
    #[arg(value_enum)]
    pub command: FitsyncCommand,
    /// Increase log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,
    /// Google credentials file
    #[arg(short, long)]
    pub google_creds: Option<PathBuf>,
    /// Fitbit credentials file
    #[arg(short, long)]
    pub fitbit_creds: Option<PathBuf>,
    /// Alternate config.env file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl FitsyncCliOpts {
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        match self.debug {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }

    fn init_logging(&self) {
        env_logger::Builder::new()
            .filter_level(self.log_level())
            .parse_default_env()
            .try_init()
            .ok();
    }

    /// # Errors
    /// Return error if configuration is invalid or the sync fails
    pub async fn process_args() -> Result<(), Error> {
        let opts = Self::parse();
        opts.init_logging();

        let config = FitsyncConfig::get_config(opts.config.as_deref())?
            .with_credential_paths(opts.fitbit_creds.clone(), opts.google_creds.clone());
        let cli = FitsyncCli::new(config);

        let stdout_task = cli.stdout.spawn_stdout_task();
        let result = cli.run(opts.command.into()).await;
        cli.stdout.close().await?;
        stdout_task.await??;
        result.map(|_| ())
    }
}
