use envy::Error as EnvyError;
use reqwest::{header::InvalidHeaderValue, Error as ReqwestError};
use serde_json::Error as SerdeJsonError;
use serde_yml::Error as YamlError;
use stack_string::StackString;
use std::num::TryFromIntError;
use thiserror::Error;
use time::error::{
    ComponentRange as TimeComponentRange, Format as TimeFormatError, Parse as TimeParseError,
};
use url::ParseError as UrlParseError;

/// Marker carried in the Google Fit error body when a data source lookup
/// misses.
pub const DATA_SOURCE_NOT_FOUND: &str = "DataSourceId not found";

#[derive(Error, Debug)]
pub enum FitsyncError {
    #[error("ConfigurationError {0}")]
    ConfigurationError(StackString),
    #[error("EmptyDatasetError no weight records in the requested period")]
    EmptyDatasetError,
    #[error("NotFoundError {0}")]
    NotFoundError(StackString),
    #[error("RemoteServiceError {status} {body}")]
    RemoteServiceError { status: u16, body: StackString },
    #[error("ReqwestError {0}")]
    ReqwestError(#[from] ReqwestError),
    #[error("InvalidHeaderValue {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
    #[error("SerdeJsonError {0}")]
    SerdeJsonError(#[from] SerdeJsonError),
    #[error("YamlError {0}")]
    YamlError(Box<YamlError>),
    #[error("EnvyError {0}")]
    EnvyError(#[from] EnvyError),
    #[error("UrlParseError {0}")]
    UrlParseError(#[from] UrlParseError),
    #[error("TryFromIntError {0}")]
    TryFromIntError(#[from] TryFromIntError),
    #[error("TimeComponentRange {0}")]
    TimeComponentRange(Box<TimeComponentRange>),
    #[error("TimeParseError {0}")]
    TimeParseError(Box<TimeParseError>),
    #[error("TimeFormatError {0}")]
    TimeFormatError(#[from] TimeFormatError),
    #[error("io Error {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    StaticCustomError(&'static str),
}

impl FitsyncError {
    /// True for an explicit `NotFoundError`, and for any remote failure whose
    /// body carries the Google Fit "DataSourceId not found" marker.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFoundError(_) => true,
            Self::RemoteServiceError { body, .. } => body.contains(DATA_SOURCE_NOT_FOUND),
            _ => false,
        }
    }

    #[must_use]
    pub fn configuration(msg: impl Into<StackString>) -> Self {
        Self::ConfigurationError(msg.into())
    }
}

impl From<YamlError> for FitsyncError {
    fn from(value: YamlError) -> Self {
        Self::YamlError(value.into())
    }
}

impl From<TimeComponentRange> for FitsyncError {
    fn from(value: TimeComponentRange) -> Self {
        Self::TimeComponentRange(value.into())
    }
}

impl From<TimeParseError> for FitsyncError {
    fn from(value: TimeParseError) -> Self {
        Self::TimeParseError(value.into())
    }
}
