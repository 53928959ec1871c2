use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info};
use maplit::hashmap;
use reqwest::{header::HeaderMap, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use stack_string::{format_sstr, StackString};
use time::{macros::format_description, Date, OffsetDateTime, Time};
use time_tz::OffsetDateTimeExt;

use fitsync_lib::{
    credential_store::CredentialStore,
    errors::FitsyncError as Error,
    fitsync_config::FitsyncConfig,
    sync_client::SourceClient,
    user_timezone::UserTimezone,
    weight_record::{SourceTimestamp, SourceWeightRecord, TrackerDevice},
};

use crate::fitbit_credentials::FitbitCredentials;

#[derive(Deserialize, Debug)]
struct AccessTokenResponse {
    access_token: StackString,
    refresh_token: StackString,
    expires_in: u64,
}

/// One entry of the weight log listing, `weight` is in pounds since requests
/// are sent with the `en_US` locale.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FitbitWeightEntry {
    pub date: Option<StackString>,
    pub time: Option<StackString>,
    #[serde(rename = "logId")]
    pub log_id: Option<i64>,
    pub weight: f64,
}

impl FitbitWeightEntry {
    /// Date and time are preferred over `logId` when both are present.
    ///
    /// # Errors
    /// Returns error if the entry carries no usable timestamp
    pub fn to_record(&self) -> Result<SourceWeightRecord, Error> {
        let timestamp = match (&self.date, &self.time, self.log_id) {
            (Some(date), Some(time), _) => {
                let date = Date::parse(date, format_description!("[year]-[month]-[day]"))?;
                let time = Time::parse(time, format_description!("[hour]:[minute]:[second]"))?;
                SourceTimestamp::LocalDateTime { date, time }
            }
            (_, _, Some(log_id)) => SourceTimestamp::LogId(log_id),
            _ => {
                return Err(Error::configuration(
                    "weight log without date+time or logId",
                ))
            }
        };
        Ok(SourceWeightRecord::pounds(timestamp, self.weight))
    }
}

pub struct FitbitClient {
    pub config: FitsyncConfig,
    client: Client,
    credentials: CredentialStore<FitbitCredentials>,
    user_timezone: Option<UserTimezone>,
}

impl FitbitClient {
    /// # Errors
    /// Returns error if the credentials file cannot be loaded
    pub async fn from_file(config: FitsyncConfig) -> Result<Self, Error> {
        let credentials = CredentialStore::load(&config.fitbit_creds).await?;
        Ok(Self {
            config,
            client: Client::new(),
            credentials,
            user_timezone: None,
        })
    }

    #[must_use]
    pub fn credentials(&self) -> &FitbitCredentials {
        self.credentials.credentials()
    }

    fn get_basic_headers(&self) -> Result<HeaderMap, Error> {
        let creds = self.credentials.credentials();
        let mut headers = HeaderMap::new();
        headers.insert("Content-type", "application/x-www-form-urlencoded".parse()?);
        headers.insert(
            "Authorization",
            format_sstr!(
                "Basic {}",
                STANDARD.encode(
                    format_sstr!("{}:{}", creds.client_id, creds.client_secret).as_bytes()
                )
            )
            .parse()?,
        );
        Ok(headers)
    }

    fn get_auth_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format_sstr!("Bearer {}", self.credentials.credentials().access_token).parse()?,
        );
        headers.insert("Accept-Language", "en_US".parse()?);
        headers.insert("Accept-Locale", "en_US".parse()?);
        Ok(headers)
    }

    async fn check_status(resp: Response) -> Result<Response, Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            let body = resp.text().await?;
            Err(Error::RemoteServiceError {
                status: status.as_u16(),
                body: body.into(),
            })
        }
    }

    /// # Errors
    /// Returns error if the token endpoint rejects the refresh token
    pub async fn refresh_fitbit_access_token(&mut self) -> Result<(), Error> {
        let headers = self.get_basic_headers()?;
        let mut creds = self.credentials.credentials().clone();
        let refresh_token = creds.refresh_token.clone();
        let data = hashmap! {
            "grant_type" => "refresh_token",
            "refresh_token" => refresh_token.as_str(),
        };
        let url = format_sstr!("{}/oauth2/token", self.config.fitbit_endpoint);
        let resp = self
            .client
            .post(url.as_str())
            .headers(headers)
            .form(&data)
            .send()
            .await?;
        let auth_resp: AccessTokenResponse = Self::check_status(resp).await?.json().await?;
        info!("refreshed fitbit access token");
        creds.access_token = auth_resp.access_token;
        creds.refresh_token = auth_resp.refresh_token;
        creds.expires_at = Some(
            (OffsetDateTime::now_utc().unix_timestamp() + auth_resp.expires_in as i64) as f64,
        );
        self.credentials.update(creds);
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&mut self, path: &str) -> Result<T, Error> {
        if self.credentials.credentials().expired() {
            debug!("fitbit access token expired");
            self.refresh_fitbit_access_token().await?;
        }
        let url = format_sstr!("{}{path}", self.config.fitbit_endpoint);
        let mut resp = self
            .client
            .get(url.as_str())
            .headers(self.get_auth_headers()?)
            .send()
            .await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("fitbit rejected access token");
            self.refresh_fitbit_access_token().await?;
            resp = self
                .client
                .get(url.as_str())
                .headers(self.get_auth_headers()?)
                .send()
                .await?;
        }
        Self::check_status(resp).await?.json().await.map_err(Into::into)
    }

    /// # Errors
    /// Returns error if the profile request fails or carries an invalid
    /// timezone
    pub async fn get_user_timezone(&mut self) -> Result<UserTimezone, Error> {
        #[derive(Deserialize)]
        struct UserObj {
            timezone: StackString,
        }
        #[derive(Deserialize)]
        struct UserResp {
            user: UserObj,
        }

        if let Some(tz) = self.user_timezone {
            return Ok(tz);
        }
        let resp: UserResp = self.get_json("/1/user/-/profile.json").await?;
        let tz: UserTimezone = resp.user.timezone.try_into()?;
        self.user_timezone = Some(tz);
        Ok(tz)
    }

    /// # Errors
    /// Returns error if the request fails
    pub async fn get_devices(&mut self) -> Result<Vec<TrackerDevice>, Error> {
        self.get_json("/1/user/-/devices.json").await
    }

    /// Weight logs for the `period` ending today in the user's timezone.
    ///
    /// # Errors
    /// Returns error if the request fails
    pub async fn get_bodyweight(&mut self, period: &str) -> Result<Vec<FitbitWeightEntry>, Error> {
        #[derive(Deserialize)]
        struct BodyWeight {
            weight: Vec<FitbitWeightEntry>,
        }

        let tz = self.get_user_timezone().await?;
        let date = OffsetDateTime::now_utc().to_timezone(tz.tz()).date();
        let path = format_sstr!("/1/user/-/body/log/weight/date/{date}/{period}.json");
        let body_weight: BodyWeight = self.get_json(&path).await?;
        debug!("{} weight logs ending {date}", body_weight.weight.len());
        Ok(body_weight.weight)
    }
}

#[async_trait]
impl SourceClient for FitbitClient {
    async fn get_user_timezone(&mut self) -> Result<UserTimezone, Error> {
        FitbitClient::get_user_timezone(self).await
    }

    async fn list_devices(&mut self) -> Result<Vec<TrackerDevice>, Error> {
        self.get_devices().await
    }

    async fn list_weight_entries(
        &mut self,
        period: &str,
    ) -> Result<Vec<SourceWeightRecord>, Error> {
        self.get_bodyweight(period)
            .await?
            .iter()
            .map(FitbitWeightEntry::to_record)
            .collect()
    }

    async fn save_credentials(&mut self) -> Result<bool, Error> {
        self.credentials.save().await
    }
}
