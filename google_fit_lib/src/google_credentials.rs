use serde::{Deserialize, Serialize};
use stack_string::StackString;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use fitsync_lib::{credential_store::CredentialFormat, errors::FitsyncError as Error};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> StackString {
    DEFAULT_TOKEN_URI.into()
}

/// OAuth2 credentials as stored in `google.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GoogleCredentials {
    #[serde(default)]
    pub client_id: StackString,
    #[serde(default)]
    pub client_secret: StackString,
    #[serde(default)]
    pub access_token: StackString,
    #[serde(default)]
    pub refresh_token: StackString,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub token_expiry: Option<OffsetDateTime>,
    #[serde(default = "default_token_uri")]
    pub token_uri: StackString,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl GoogleCredentials {
    #[must_use]
    pub fn expired(&self) -> bool {
        self.token_expiry
            .is_some_and(|t| t <= OffsetDateTime::now_utc())
    }

    /// Cloud project number, the leading component of the OAuth client id.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if there is no client id
    pub fn project_number(&self) -> Result<StackString, Error> {
        self.client_id
            .split('-')
            .next()
            .filter(|s| !s.is_empty())
            .map(Into::into)
            .ok_or_else(|| Error::configuration("google credentials have no client_id"))
    }
}

impl CredentialFormat for GoogleCredentials {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(buf).map_err(Into::into)
    }

    fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(Into::into)
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}
