use anyhow::Error;
use log::debug;
use stack_string::StackString;
use stdout_channel::StdoutChannel;
use time_tz::Tz;

use fitbit_lib::fitbit_client::FitbitClient;
use fitsync_lib::{
    fitsync_config::FitsyncConfig,
    fitsync_sync::{FitsyncSync, SyncOperation, SyncReport},
    fitsync_util::{local_tz, DISPLAY_TIME_FORMAT},
};
use google_fit_lib::google_fit_client::GoogleFitClient;

#[derive(Debug, Default)]
pub struct FitsyncCli {
    pub config: FitsyncConfig,
    pub stdout: StdoutChannel<StackString>,
}

impl FitsyncCli {
    #[must_use]
    pub fn new(config: FitsyncConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// `LOCAL_TIMEZONE` if configured, the system timezone otherwise.
    ///
    /// # Errors
    /// Return error if `LOCAL_TIMEZONE` is not a valid timezone
    pub fn display_timezone(&self) -> Result<&'static Tz, Error> {
        Ok(match self.config.local_timezone()? {
            Some(tz) => tz.tz(),
            None => local_tz(),
        })
    }

    /// Run one operation and write its report to stdout.
    ///
    /// # Errors
    /// Return error if credentials can't be loaded or the sync fails
    pub async fn run(&self, operation: SyncOperation) -> Result<SyncReport, Error> {
        let display_timezone = self.display_timezone()?;
        let source = FitbitClient::from_file(self.config.clone()).await?;
        let sink = GoogleFitClient::from_file(self.config.clone()).await?;
        debug!(
            "{operation} using {} and {}",
            self.config.fitbit_creds.display(),
            self.config.google_creds.display()
        );

        let mut sync = FitsyncSync::new(source, sink, self.config.fitbit_period.clone())
            .with_display_timezone(display_timezone);
        let report = sync.run(operation).await?;
        for line in report.lines(DISPLAY_TIME_FORMAT)? {
            self.stdout.send(line);
        }
        Ok(report)
    }
}
