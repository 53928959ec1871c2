use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use wiremock::{
    matchers::{body_partial_json, body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use fitsync_lib::{
    data_point::{Dataset, DatasetWindow, SinkDataPoint},
    data_source::DataSourceDescriptor,
    errors::FitsyncError as Error,
    fitsync_config::{FitsyncConfig, FitsyncConfigInner},
    sync_client::SinkClient,
    weight_record::TrackerDevice,
};
use google_fit_lib::google_fit_client::GoogleFitClient;

const DATA_SOURCE_PATH: &str =
    "/users/me/dataSources/raw:com.google.weight:123456789012:unknown:unknown:222";
const DATASET_PATH: &str = "/users/me/dataSources/raw:com.google.weight:123456789012:unknown:unknown:222/datasets/1000-2000";

fn write_creds(server: &MockServer, token_expiry: &str) -> Result<NamedTempFile, Error> {
    let creds = json!({
        "_module": "oauth2client.client",
        "access_token": "old-access",
        "client_id": "123456789012-abcdefg.apps.googleusercontent.com",
        "client_secret": "s3cr3t",
        "refresh_token": "1/refresh",
        "token_expiry": token_expiry,
        "token_uri": format!("{}/token", server.uri()),
    });
    let mut f = NamedTempFile::new()?;
    f.write_all(&serde_json::to_vec(&creds)?)?;
    Ok(f)
}

async fn get_client(server: &MockServer, creds: &NamedTempFile) -> Result<GoogleFitClient, Error> {
    let config = FitsyncConfig::from_inner(FitsyncConfigInner {
        google_creds: creds.path().to_path_buf(),
        google_fit_endpoint: server.uri().into(),
        ..FitsyncConfigInner::default()
    });
    GoogleFitClient::from_file(config).await
}

fn descriptor() -> DataSourceDescriptor {
    DataSourceDescriptor::weight_scale(&TrackerDevice {
        device_type: "SCALE".into(),
        id: "222".into(),
        device_version: "Aria".into(),
    })
}

fn data_source_id(client: &GoogleFitClient) -> Result<String, Error> {
    Ok(descriptor()
        .data_source_id(&client.project_number()?)
        .to_string())
}

#[tokio::test]
async fn test_missing_data_source_is_not_found() -> Result<(), Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DATA_SOURCE_PATH))
        .and(header("Authorization", "Bearer old-access"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": 404,
                "message": "DataSourceId not found: raw:com.google.weight:123456789012:unknown:unknown:222",
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/me/dataSources"))
        .and(body_partial_json(json!({
            "type": "raw",
            "application": {"name": "fitsync"},
            "device": {"uid": "222", "version": "Aria"},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let creds = write_creds(&server, "2099-01-01T00:00:00Z")?;
    let mut client = get_client(&server, &creds).await?;
    let id = data_source_id(&client)?;

    let err = client.get_data_source(&id).await.unwrap_err();
    assert!(matches!(err, Error::NotFoundError(_)));
    assert!(err.is_not_found());

    client.create_data_source(&descriptor()).await?;
    assert!(!client.save_credentials().await?);
    Ok(())
}

#[tokio::test]
async fn test_dataset_round_trip() -> Result<(), Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DATASET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "minStartTimeNs": "1000",
            "maxEndTimeNs": "2000",
            "dataSourceId": "raw:com.google.weight:123456789012:unknown:unknown:222",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(DATASET_PATH))
        .and(body_partial_json(json!({
            "minStartTimeNs": "1000",
            "maxEndTimeNs": "2000",
            "point": [
                {"startTimeNanos": "1000", "endTimeNanos": "1000", "value": [{"fpVal": 80.0}]},
                {"startTimeNanos": "2000", "endTimeNanos": "2000", "value": [{"fpVal": 81.0}]},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATASET_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "minStartTimeNs": "1000",
            "maxEndTimeNs": "2000",
            "dataSourceId": "raw:com.google.weight:123456789012:unknown:unknown:222",
            "point": [
                {"startTimeNanos": "1000", "endTimeNanos": "1000",
                 "dataTypeName": "com.google.weight", "value": [{"fpVal": 80.0}]},
                {"startTimeNanos": "2000", "endTimeNanos": "2000",
                 "dataTypeName": "com.google.weight", "value": [{"fpVal": 81.0}]},
            ],
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(DATASET_PATH))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let creds = write_creds(&server, "2099-01-01T00:00:00Z")?;
    let mut client = get_client(&server, &creds).await?;
    let id = data_source_id(&client)?;
    let window = DatasetWindow::from_timestamps([1000, 2000])?;
    let dataset_id = window.dataset_id();

    let before = client.get_dataset(&id, &dataset_id).await?;
    assert!(before.point.is_empty());

    let body = Dataset::patch_body(
        &id,
        window,
        vec![SinkDataPoint::new(1000, 80.0), SinkDataPoint::new(2000, 81.0)],
    );
    client.patch_dataset(&id, &dataset_id, &body).await?;

    let after = client.get_dataset(&id, &dataset_id).await?;
    assert_eq!(after.point.len(), 2);
    assert_eq!(after.point[1], SinkDataPoint::new(2000, 81.0));

    client.delete_dataset(&id, &dataset_id).await?;
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_refreshed() -> Result<(), Error> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_secret=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-access",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_SOURCE_PATH))
        .and(header("Authorization", "Bearer new-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let creds = write_creds(&server, "2015-06-01T12:00:00Z")?;
    let mut client = get_client(&server, &creds).await?;
    let id = data_source_id(&client)?;
    client.get_data_source(&id).await?;
    assert_eq!(client.credentials().access_token, "new-access");
    assert_eq!(client.credentials().refresh_token, "1/refresh");
    assert!(!client.credentials().expired());

    assert!(client.save_credentials().await?);
    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(creds.path())?)?;
    assert_eq!(saved["access_token"], "new-access");
    assert_eq!(saved["_module"], "oauth2client.client");
    let expiry = saved["token_expiry"].as_str().unwrap();
    assert_eq!(expiry.len(), "2015-06-01T12:00:00Z".len());
    assert!(expiry.ends_with('Z'));
    assert!(!expiry.contains('.'));
    assert!(expiry.as_bytes().iter().enumerate().all(|(i, c)| match i {
        4 | 7 => *c == b'-',
        10 => *c == b'T',
        13 | 16 => *c == b':',
        19 => *c == b'Z',
        _ => c.is_ascii_digit(),
    }));
    Ok(())
}

#[tokio::test]
async fn test_plain_404_is_not_missing_data_source() -> Result<(), Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DATA_SOURCE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>Not Found</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let creds = write_creds(&server, "2099-01-01T00:00:00Z")?;
    let mut client = get_client(&server, &creds).await?;
    let id = data_source_id(&client)?;
    match client.get_data_source(&id).await {
        Err(e @ Error::RemoteServiceError { status: 404, .. }) => assert!(!e.is_not_found()),
        _ => panic!("expected RemoteServiceError"),
    }
    Ok(())
}

#[tokio::test]
async fn test_remote_error_is_reported() -> Result<(), Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(DATA_SOURCE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("Insufficient Permission"))
        .mount(&server)
        .await;

    let creds = write_creds(&server, "2099-01-01T00:00:00Z")?;
    let mut client = get_client(&server, &creds).await?;
    let id = data_source_id(&client)?;
    match client.get_data_source(&id).await {
        Err(e @ Error::RemoteServiceError { status: 403, .. }) => assert!(!e.is_not_found()),
        _ => panic!("expected RemoteServiceError"),
    }
    Ok(())
}
