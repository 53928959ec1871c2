use serde::{Deserialize, Serialize};
use stack_string::StackString;
use std::collections::BTreeMap;
use time::OffsetDateTime;

use fitsync_lib::{credential_store::CredentialFormat, errors::FitsyncError as Error};

/// Contents of `fitbit.yaml`. Keys this client doesn't use are kept so that
/// rewriting the file after a token refresh doesn't drop them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FitbitCredentials {
    pub client_id: StackString,
    pub client_secret: StackString,
    pub access_token: StackString,
    pub refresh_token: StackString,
    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yml::Value>,
}

impl FitbitCredentials {
    #[must_use]
    pub fn expired(&self) -> bool {
        self.expires_at
            .is_some_and(|t| t <= OffsetDateTime::now_utc().unix_timestamp() as f64)
    }
}

impl CredentialFormat for FitbitCredentials {
    fn decode(buf: &[u8]) -> Result<Self, Error> {
        serde_yml::from_slice(buf).map_err(Into::into)
    }

    fn encode(&self) -> Result<Vec<u8>, Error> {
        serde_yml::to_string(self)
            .map(String::into_bytes)
            .map_err(Into::into)
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}
