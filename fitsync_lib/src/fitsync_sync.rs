use log::{debug, info};
use stack_string::{format_sstr, StackString};
use std::{fmt, str::FromStr};
use time::{format_description::FormatItem, OffsetDateTime};
use time_tz::{OffsetDateTimeExt, Tz};

use crate::{
    data_point::{points_difference, transform_records, Dataset, DatasetWindow, SinkDataPoint},
    data_source::DataSourceDescriptor,
    errors::FitsyncError as Error,
    fitsync_util::{local_tz, WeightConversion},
    sync_client::{SinkClient, SourceClient},
    weight_record::TrackerDevice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Get,
    Patch,
    Delete,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Patch => f.write_str("patch"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

impl FromStr for SyncOperation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Self::Get),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            _ => Err(Error::ConfigurationError(format_sstr!(
                "unrecognized command {s}, expected get, patch or delete"
            ))),
        }
    }
}

/// A stored data point converted back for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    pub weight_lbs: f64,
    pub weight_kgs: f64,
    pub time: OffsetDateTime,
}

impl DisplayPoint {
    /// # Errors
    /// Returns error if the point's timestamp is out of range or it carries
    /// no weight value
    pub fn from_point(
        point: &SinkDataPoint,
        conversion: WeightConversion,
        timezone: &Tz,
    ) -> Result<Self, Error> {
        let weight_kgs = point
            .value_kg
            .ok_or(Error::StaticCustomError("data point without fpVal"))?;
        let time = OffsetDateTime::from_unix_timestamp_nanos(i128::from(point.start_time_ns))?
            .to_timezone(timezone);
        Ok(Self {
            weight_lbs: conversion.kg_to_lbs(weight_kgs),
            weight_kgs,
            time,
        })
    }

    /// # Errors
    /// Returns error if formatting the time fails
    pub fn format(&self, time_format: &[FormatItem<'_>]) -> Result<StackString, Error> {
        let time = self.time.format(time_format)?;
        Ok(format_sstr!(
            "{:.1} lbs ( {:.2} kgs ), {time}",
            self.weight_lbs,
            self.weight_kgs
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport {
    Listed(Vec<DisplayPoint>),
    Deleted(usize),
    Added(usize),
}

impl SyncReport {
    /// # Errors
    /// Returns error if formatting a point fails
    pub fn lines(&self, time_format: &[FormatItem<'_>]) -> Result<Vec<StackString>, Error> {
        match self {
            Self::Listed(points) => {
                let mut lines = points
                    .iter()
                    .map(|p| p.format(time_format))
                    .collect::<Result<Vec<_>, Error>>()?;
                lines.push(format_sstr!(
                    "Total {} points (in Google Fit)",
                    points.len()
                ));
                Ok(lines)
            }
            Self::Deleted(n) => Ok(vec![format_sstr!("Deleted {n} points (from Google Fit)")]),
            Self::Added(n) => Ok(vec![format_sstr!("Added {n} points (to Google Fit)")]),
        }
    }
}

/// Everything read from the tracker in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSnapshot {
    pub scale: TrackerDevice,
    pub points: Vec<SinkDataPoint>,
    pub window: Option<DatasetWindow>,
}

pub struct FitsyncSync<S, K> {
    pub source: S,
    pub sink: K,
    pub period: StackString,
    pub conversion: WeightConversion,
    pub display_timezone: &'static Tz,
}

impl<S, K> FitsyncSync<S, K>
where
    S: SourceClient,
    K: SinkClient,
{
    pub fn new(source: S, sink: K, period: impl Into<StackString>) -> Self {
        Self {
            source,
            sink,
            period: period.into(),
            conversion: WeightConversion::default(),
            display_timezone: local_tz(),
        }
    }

    #[must_use]
    pub fn with_display_timezone(mut self, timezone: &'static Tz) -> Self {
        self.display_timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_conversion(mut self, conversion: WeightConversion) -> Self {
        self.conversion = conversion;
        self
    }

    /// Read the scale and its weight logs. Source credentials are persisted
    /// whether or not the fetch succeeds.
    ///
    /// # Errors
    /// Returns error if any source call fails or the timezone is invalid
    pub async fn fetch_source(&mut self) -> Result<SourceSnapshot, Error> {
        let result = self.fetch_source_records().await;
        let saved = self.source.save_credentials().await;
        let snapshot = result?;
        saved?;
        Ok(snapshot)
    }

    async fn fetch_source_records(&mut self) -> Result<SourceSnapshot, Error> {
        let timezone = self.source.get_user_timezone().await?;
        let devices = self.source.list_devices().await?;
        let scale = TrackerDevice::find_scale(&devices)?.clone();
        let records = self.source.list_weight_entries(&self.period).await?;
        let points = transform_records(&records, Some(timezone), self.conversion)?;
        let window = match DatasetWindow::from_points(&points) {
            Ok(window) => Some(window),
            Err(Error::EmptyDatasetError) => None,
            Err(e) => return Err(e),
        };
        debug!(
            "fetched {} weight logs for scale {} in {timezone}",
            points.len(),
            scale.id
        );
        Ok(SourceSnapshot {
            scale,
            points,
            window,
        })
    }

    /// Look the data source up and create it if it doesn't exist yet.
    ///
    /// # Errors
    /// Returns any lookup failure other than not-found, or a failed create
    pub async fn ensure_data_source(
        &mut self,
        descriptor: &DataSourceDescriptor,
    ) -> Result<StackString, Error> {
        let project_number = self.sink.project_number()?;
        let data_source_id = descriptor.data_source_id(&project_number);
        match self.sink.get_data_source(&data_source_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("creating data source {data_source_id}");
                self.sink.create_data_source(descriptor).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(data_source_id)
    }

    /// Run one operation end to end. Sink credentials are persisted whether
    /// or not the operation succeeds.
    ///
    /// # Errors
    /// Returns `EmptyDatasetError` for patch/delete without weight logs, or
    /// the first failing source/sink call
    pub async fn run(&mut self, operation: SyncOperation) -> Result<SyncReport, Error> {
        let snapshot = self.fetch_source().await?;
        let result = self.run_operation(operation, snapshot).await;
        let saved = self.sink.save_credentials().await;
        let report = result?;
        saved?;
        Ok(report)
    }

    async fn run_operation(
        &mut self,
        operation: SyncOperation,
        snapshot: SourceSnapshot,
    ) -> Result<SyncReport, Error> {
        let window = match (operation, snapshot.window) {
            (_, Some(window)) => window,
            (SyncOperation::Get, None) => return Ok(SyncReport::Listed(Vec::new())),
            (_, None) => return Err(Error::EmptyDatasetError),
        };
        let descriptor = DataSourceDescriptor::weight_scale(&snapshot.scale);
        let data_source_id = self.ensure_data_source(&descriptor).await?;
        let dataset_id = window.dataset_id();
        debug!("{operation} {data_source_id} {dataset_id}");

        match operation {
            SyncOperation::Get => {
                let data = self.sink.get_dataset(&data_source_id, &dataset_id).await?;
                let points = data
                    .point
                    .iter()
                    .map(|p| DisplayPoint::from_point(p, self.conversion, self.display_timezone))
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(SyncReport::Listed(points))
            }
            SyncOperation::Delete => {
                let before = self.sink.get_dataset(&data_source_id, &dataset_id).await?;
                self.sink
                    .delete_dataset(&data_source_id, &dataset_id)
                    .await?;
                let after = self.sink.get_dataset(&data_source_id, &dataset_id).await?;
                Ok(SyncReport::Deleted(points_difference(&before, &after)))
            }
            SyncOperation::Patch => {
                let before = self.sink.get_dataset(&data_source_id, &dataset_id).await?;
                let body = Dataset::patch_body(&data_source_id, window, snapshot.points);
                self.sink
                    .patch_dataset(&data_source_id, &dataset_id, &body)
                    .await?;
                let after = self.sink.get_dataset(&data_source_id, &dataset_id).await?;
                Ok(SyncReport::Added(points_difference(&after, &before)))
            }
        }
    }
}
