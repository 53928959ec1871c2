use serde::Deserialize;
use stack_string::StackString;
use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{errors::FitsyncError as Error, user_timezone::UserTimezone};

/// `FitsyncConfig` holds configuration information which can be set either
/// through environment variables or the config.env file, see the dotenvy crate
/// for more information about the config file format.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct FitsyncConfigInner {
    #[serde(default = "default_fitbit_creds")]
    pub fitbit_creds: PathBuf,
    #[serde(default = "default_google_creds")]
    pub google_creds: PathBuf,
    #[serde(default = "default_fitbit_period")]
    pub fitbit_period: StackString,
    #[serde(default = "default_fitbit_endpoint")]
    pub fitbit_endpoint: StackString,
    #[serde(default = "default_google_fit_endpoint")]
    pub google_fit_endpoint: StackString,
    pub local_timezone: Option<StackString>,
}

fn default_fitbit_creds() -> PathBuf {
    "fitbit.yaml".into()
}
fn default_google_creds() -> PathBuf {
    "google.json".into()
}
fn default_fitbit_period() -> StackString {
    "1m".into()
}
fn default_fitbit_endpoint() -> StackString {
    "https://api.fitbit.com".into()
}
fn default_google_fit_endpoint() -> StackString {
    "https://www.googleapis.com/fitness/v1".into()
}

impl Default for FitsyncConfigInner {
    fn default() -> Self {
        Self {
            fitbit_creds: default_fitbit_creds(),
            google_creds: default_google_creds(),
            fitbit_period: default_fitbit_period(),
            fitbit_endpoint: default_fitbit_endpoint(),
            google_fit_endpoint: default_google_fit_endpoint(),
            local_timezone: None,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct FitsyncConfig(Arc<FitsyncConfigInner>);

impl FitsyncConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_inner(inner: FitsyncConfigInner) -> Self {
        Self(Arc::new(inner))
    }

    /// Pull configuration from a file if it exists,
    /// first look for `fname`, then `${HOME}/.config/fitsync/config.env`,
    /// then a config.env file in the current directory,
    /// environment variables take precedence over all of them.
    ///
    /// # Errors
    /// Returns error if an environment variable fails to deserialize or the
    /// configured local timezone is invalid
    pub fn get_config(fname: Option<&Path>) -> Result<Self, Error> {
        let default_fname = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("fitsync")
            .join("config.env");

        let env_file = match fname {
            Some(fname) if fname.exists() => fname,
            _ => default_fname.as_path(),
        };

        dotenvy::dotenv().ok();

        if env_file.exists() {
            dotenvy::from_path(env_file).ok();
        } else if Path::new("config.env").exists() {
            dotenvy::from_filename("config.env").ok();
        }

        let conf: FitsyncConfigInner = envy::from_env()?;
        if let Some(tz) = &conf.local_timezone {
            let _: UserTimezone = tz.as_str().parse()?;
        }
        Ok(Self(Arc::new(conf)))
    }

    /// Override the credential file locations, e.g. from command line flags.
    #[must_use]
    pub fn with_credential_paths(
        self,
        fitbit_creds: Option<PathBuf>,
        google_creds: Option<PathBuf>,
    ) -> Self {
        if fitbit_creds.is_none() && google_creds.is_none() {
            return self;
        }
        let inner = &self.0;
        Self(Arc::new(FitsyncConfigInner {
            fitbit_creds: fitbit_creds.unwrap_or_else(|| inner.fitbit_creds.clone()),
            google_creds: google_creds.unwrap_or_else(|| inner.google_creds.clone()),
            fitbit_period: inner.fitbit_period.clone(),
            fitbit_endpoint: inner.fitbit_endpoint.clone(),
            google_fit_endpoint: inner.google_fit_endpoint.clone(),
            local_timezone: inner.local_timezone.clone(),
        }))
    }

    /// # Errors
    /// Returns `ConfigurationError` if `LOCAL_TIMEZONE` is not a valid timezone
    pub fn local_timezone(&self) -> Result<Option<UserTimezone>, Error> {
        self.0
            .local_timezone
            .as_ref()
            .map(|tz| tz.as_str().parse())
            .transpose()
    }
}

impl Deref for FitsyncConfig {
    type Target = FitsyncConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::fitsync_config::{FitsyncConfig, FitsyncConfigInner};

    #[test]
    fn test_fitsync_config_new() {
        let config = FitsyncConfig::new();
        assert_eq!(config.fitbit_creds, Path::new("fitbit.yaml"));
        assert_eq!(config.google_creds, Path::new("google.json"));
        assert_eq!(config.fitbit_period, "1m");
        assert_eq!(config.fitbit_endpoint, "https://api.fitbit.com");
        assert_eq!(
            config.google_fit_endpoint,
            "https://www.googleapis.com/fitness/v1"
        );
        assert!(config.local_timezone().unwrap().is_none());
    }

    #[test]
    fn test_with_credential_paths() {
        let config = FitsyncConfig::new()
            .with_credential_paths(Some("/tmp/fitbit_test.yaml".into()), None);
        assert_eq!(config.fitbit_creds, Path::new("/tmp/fitbit_test.yaml"));
        assert_eq!(config.google_creds, Path::new("google.json"));
    }

    #[test]
    fn test_invalid_local_timezone() {
        let config = FitsyncConfig::from_inner(FitsyncConfigInner {
            local_timezone: Some("Mars/Olympus".into()),
            ..FitsyncConfigInner::default()
        });
        assert!(config.local_timezone().is_err());
        let config = FitsyncConfig::from_inner(FitsyncConfigInner {
            local_timezone: Some("Europe/London".into()),
            ..FitsyncConfigInner::default()
        });
        assert_eq!(
            config.local_timezone().unwrap().unwrap().to_string(),
            "Europe/London"
        );
    }
}
