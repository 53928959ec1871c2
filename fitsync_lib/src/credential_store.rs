use log::debug;
use stack_string::format_sstr;
use std::path::{Path, PathBuf};
use tokio::{fs, fs::File, io::AsyncWriteExt};

use crate::errors::FitsyncError as Error;

/// On-disk encoding of one provider's OAuth credentials.
pub trait CredentialFormat: Clone + Send + Sync {
    /// # Errors
    /// Returns error if the buffer is not a valid credentials document
    fn decode(buf: &[u8]) -> Result<Self, Error>;

    /// # Errors
    /// Returns error if serialization fails
    fn encode(&self) -> Result<Vec<u8>, Error>;

    fn access_token(&self) -> &str;
    fn refresh_token(&self) -> &str;
}

/// Credentials file for a single provider. The file is read once and only
/// rewritten by `save` when the access or refresh token changed since.
#[derive(Debug, Clone)]
pub struct CredentialStore<T> {
    path: PathBuf,
    saved: T,
    current: T,
}

impl<T: CredentialFormat> CredentialStore<T> {
    /// # Errors
    /// Returns error if the file cannot be read or decoded
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let buf = fs::read(&path).await.map_err(|e| {
            Error::ConfigurationError(format_sstr!(
                "unable to read credentials {}: {e}",
                path.display()
            ))
        })?;
        let saved = T::decode(&buf).map_err(|e| {
            Error::ConfigurationError(format_sstr!(
                "invalid credentials {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            path,
            current: saved.clone(),
            saved,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn credentials(&self) -> &T {
        &self.current
    }

    pub fn update(&mut self, credentials: T) {
        self.current = credentials;
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.current.access_token() != self.saved.access_token()
            || self.current.refresh_token() != self.saved.refresh_token()
    }

    /// Returns `true` if the file was rewritten.
    ///
    /// # Errors
    /// Returns error if encoding or writing the file fails
    pub async fn save(&mut self) -> Result<bool, Error> {
        if !self.is_modified() {
            return Ok(false);
        }
        debug!("Updating credentials {}", self.path.display());
        let buf = self.current.encode()?;
        let mut f = File::create(&self.path).await?;
        f.write_all(&buf).await?;
        f.flush().await?;
        self.saved = self.current.clone();
        Ok(true)
    }
}
