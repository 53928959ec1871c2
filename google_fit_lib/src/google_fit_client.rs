use async_trait::async_trait;
use log::{debug, info};
use maplit::hashmap;
use reqwest::{header::HeaderMap, Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use stack_string::{format_sstr, StackString};
use time::{Duration, OffsetDateTime};
use url::Url;

use fitsync_lib::{
    credential_store::CredentialStore,
    data_point::Dataset,
    data_source::DataSourceDescriptor,
    errors::{FitsyncError as Error, DATA_SOURCE_NOT_FOUND},
    fitsync_config::FitsyncConfig,
    sync_client::SinkClient,
};

use crate::google_credentials::GoogleCredentials;

#[derive(Deserialize, Debug)]
struct AccessTokenResponse {
    access_token: StackString,
    expires_in: Option<i64>,
    refresh_token: Option<StackString>,
}

pub struct GoogleFitClient {
    pub config: FitsyncConfig,
    client: Client,
    credentials: CredentialStore<GoogleCredentials>,
}

impl GoogleFitClient {
    /// # Errors
    /// Returns error if the credentials file cannot be loaded
    pub async fn from_file(config: FitsyncConfig) -> Result<Self, Error> {
        let credentials = CredentialStore::load(&config.google_creds).await?;
        Ok(Self {
            config,
            client: Client::new(),
            credentials,
        })
    }

    #[must_use]
    pub fn credentials(&self) -> &GoogleCredentials {
        self.credentials.credentials()
    }

    fn get_auth_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format_sstr!("Bearer {}", self.credentials.credentials().access_token).parse()?,
        );
        Ok(headers)
    }

    /// `{endpoint}/users/me/dataSources[/...]` with each segment escaped.
    fn data_sources_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url: Url = self.config.google_fit_endpoint.parse()?;
        url.path_segments_mut()
            .map_err(|()| Error::configuration("invalid GOOGLE_FIT_ENDPOINT"))?
            .pop_if_empty()
            .extend(["users", "me", "dataSources"])
            .extend(segments);
        Ok(url)
    }

    fn dataset_url(&self, data_source_id: &str, dataset_id: &str) -> Result<Url, Error> {
        self.data_sources_url(&[data_source_id, "datasets", dataset_id])
    }

    /// Only a body naming the missing data source is `NotFoundError`, a bare
    /// 404 from a wrong endpoint stays a `RemoteServiceError`.
    async fn check_status(resp: Response) -> Result<Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: StackString = resp.text().await?.into();
        if body.contains(DATA_SOURCE_NOT_FOUND) {
            Err(Error::NotFoundError(body))
        } else {
            Err(Error::RemoteServiceError {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// # Errors
    /// Returns error if the token endpoint rejects the refresh token
    pub async fn refresh_google_access_token(&mut self) -> Result<(), Error> {
        let mut creds = self.credentials.credentials().clone();
        let auth_resp: AccessTokenResponse = {
            let data = hashmap! {
                "grant_type" => "refresh_token",
                "client_id" => creds.client_id.as_str(),
                "client_secret" => creds.client_secret.as_str(),
                "refresh_token" => creds.refresh_token.as_str(),
            };
            let resp = self
                .client
                .post(creds.token_uri.as_str())
                .form(&data)
                .send()
                .await?;
            Self::check_status(resp).await?.json().await?
        };
        info!("refreshed google access token");
        creds.access_token = auth_resp.access_token;
        if let Some(refresh_token) = auth_resp.refresh_token {
            creds.refresh_token = refresh_token;
        }
        // oauth2client parses token_expiry without fractional seconds
        creds.token_expiry = auth_resp
            .expires_in
            .map(|s| (OffsetDateTime::now_utc() + Duration::seconds(s)).replace_nanosecond(0))
            .transpose()?;
        self.credentials.update(creds);
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
    ) -> Result<Response, Error> {
        let mut req = self
            .client
            .request(method, url.clone())
            .headers(self.get_auth_headers()?);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(Into::into)
    }

    /// Authorized request, refreshing the access token up front when it has
    /// expired and once more if the service answers 401.
    async fn request(
        &mut self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> Result<Response, Error> {
        if self.credentials.credentials().expired() {
            debug!("google access token expired");
            self.refresh_google_access_token().await?;
        }
        debug!("{method} {url}");
        let mut resp = self.send(method.clone(), &url, body.as_ref()).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("google rejected access token");
            self.refresh_google_access_token().await?;
            resp = self.send(method, &url, body.as_ref()).await?;
        }
        Self::check_status(resp).await
    }
}

#[async_trait]
impl SinkClient for GoogleFitClient {
    fn project_number(&self) -> Result<StackString, Error> {
        self.credentials.credentials().project_number()
    }

    async fn get_data_source(&mut self, data_source_id: &str) -> Result<(), Error> {
        let url = self.data_sources_url(&[data_source_id])?;
        self.request(Method::GET, url, None).await?;
        Ok(())
    }

    async fn create_data_source(
        &mut self,
        descriptor: &DataSourceDescriptor,
    ) -> Result<(), Error> {
        let url = self.data_sources_url(&[])?;
        let body = serde_json::to_value(descriptor)?;
        self.request(Method::POST, url, Some(body)).await?;
        Ok(())
    }

    async fn get_dataset(
        &mut self,
        data_source_id: &str,
        dataset_id: &str,
    ) -> Result<Dataset, Error> {
        let url = self.dataset_url(data_source_id, dataset_id)?;
        self.request(Method::GET, url, None)
            .await?
            .json()
            .await
            .map_err(Into::into)
    }

    async fn patch_dataset(
        &mut self,
        data_source_id: &str,
        dataset_id: &str,
        body: &Dataset,
    ) -> Result<(), Error> {
        let url = self.dataset_url(data_source_id, dataset_id)?;
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, url, Some(body)).await?;
        Ok(())
    }

    async fn delete_dataset(
        &mut self,
        data_source_id: &str,
        dataset_id: &str,
    ) -> Result<(), Error> {
        let url = self.dataset_url(data_source_id, dataset_id)?;
        self.request(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn save_credentials(&mut self) -> Result<bool, Error> {
        self.credentials.save().await
    }
}
