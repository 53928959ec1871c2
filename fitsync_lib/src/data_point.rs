use serde::{Deserialize, Serialize};
use stack_string::{format_sstr, StackString};
use std::{collections::HashSet, convert::TryFrom, fmt};

use crate::{
    errors::FitsyncError as Error,
    fitsync_util::WeightConversion,
    user_timezone::UserTimezone,
    weight_record::{normalize_timestamps, SourceWeightRecord},
};

pub const WEIGHT_DATA_TYPE: &str = "com.google.weight";

/// A single instantaneous weight reading in Google Fit's representation,
/// `start_time_ns == end_time_ns`. Points stored by other writers may lack
/// an `fpVal`, only listing them needs the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "DataPointWire", try_from = "DataPointWire")]
pub struct SinkDataPoint {
    pub start_time_ns: i64,
    pub end_time_ns: i64,
    pub value_kg: Option<f64>,
}

impl SinkDataPoint {
    #[must_use]
    pub fn new(time_ns: i64, value_kg: f64) -> Self {
        Self {
            start_time_ns: time_ns,
            end_time_ns: time_ns,
            value_kg: Some(value_kg),
        }
    }

    /// # Errors
    /// Returns error if the record timestamp cannot be normalized
    pub fn from_record(
        record: &SourceWeightRecord,
        timezone: Option<UserTimezone>,
        conversion: WeightConversion,
    ) -> Result<Self, Error> {
        let time_ns = record.timestamp.to_nanos(timezone)?;
        Ok(Self::new(time_ns, record.kilograms(conversion)))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct PointValue {
    #[serde(rename = "fpVal", default, skip_serializing_if = "Option::is_none")]
    fp_val: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct DataPointWire {
    #[serde(rename = "dataTypeName", default = "default_data_type")]
    data_type_name: StackString,
    #[serde(rename = "startTimeNanos")]
    start_time_nanos: StackString,
    #[serde(rename = "endTimeNanos")]
    end_time_nanos: StackString,
    #[serde(default)]
    value: Vec<PointValue>,
}

fn default_data_type() -> StackString {
    WEIGHT_DATA_TYPE.into()
}

impl From<SinkDataPoint> for DataPointWire {
    fn from(item: SinkDataPoint) -> Self {
        Self {
            data_type_name: WEIGHT_DATA_TYPE.into(),
            start_time_nanos: format_sstr!("{}", item.start_time_ns),
            end_time_nanos: format_sstr!("{}", item.end_time_ns),
            value: item
                .value_kg
                .map(|v| PointValue { fp_val: Some(v) })
                .into_iter()
                .collect(),
        }
    }
}

impl TryFrom<DataPointWire> for SinkDataPoint {
    type Error = Error;
    fn try_from(item: DataPointWire) -> Result<Self, Self::Error> {
        let start_time_ns = item
            .start_time_nanos
            .parse()
            .map_err(|_| Error::StaticCustomError("invalid startTimeNanos"))?;
        let end_time_ns = item
            .end_time_nanos
            .parse()
            .map_err(|_| Error::StaticCustomError("invalid endTimeNanos"))?;
        let value_kg = item.value.first().and_then(|v| v.fp_val);
        Ok(Self {
            start_time_ns,
            end_time_ns,
            value_kg,
        })
    }
}

/// Bounds of the fetched weight logs, which name the Google Fit dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetWindow {
    pub min_time_ns: i64,
    pub max_time_ns: i64,
}

impl DatasetWindow {
    /// # Errors
    /// Returns `EmptyDatasetError` when there are no timestamps
    pub fn from_timestamps(timestamps: impl IntoIterator<Item = i64>) -> Result<Self, Error> {
        timestamps
            .into_iter()
            .fold(None, |window: Option<Self>, t| {
                Some(match window {
                    Some(w) => Self {
                        min_time_ns: w.min_time_ns.min(t),
                        max_time_ns: w.max_time_ns.max(t),
                    },
                    None => Self {
                        min_time_ns: t,
                        max_time_ns: t,
                    },
                })
            })
            .ok_or(Error::EmptyDatasetError)
    }

    /// # Errors
    /// Returns `EmptyDatasetError` when there are no points
    pub fn from_points(points: &[SinkDataPoint]) -> Result<Self, Error> {
        Self::from_timestamps(points.iter().map(|p| p.start_time_ns))
    }

    #[must_use]
    pub fn dataset_id(&self) -> StackString {
        format_sstr!("{}-{}", self.min_time_ns, self.max_time_ns)
    }
}

impl fmt::Display for DatasetWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.min_time_ns, self.max_time_ns)
    }
}

/// Transform every fetched record into a data point.
///
/// # Errors
/// Returns `ConfigurationError` on mixed timestamp encodings or a missing
/// timezone
pub fn transform_records(
    records: &[SourceWeightRecord],
    timezone: Option<UserTimezone>,
    conversion: WeightConversion,
) -> Result<Vec<SinkDataPoint>, Error> {
    let timestamps = normalize_timestamps(records, timezone)?;
    Ok(records
        .iter()
        .zip(timestamps)
        .map(|(record, time_ns)| SinkDataPoint::new(time_ns, record.kilograms(conversion)))
        .collect())
}

/// Dataset as returned by `dataSources.datasets.get`, a missing `point`
/// member is an empty dataset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    #[serde(rename = "dataSourceId", default)]
    pub data_source_id: StackString,
    #[serde(rename = "minStartTimeNs", default)]
    pub min_start_time_ns: StackString,
    #[serde(rename = "maxEndTimeNs", default)]
    pub max_end_time_ns: StackString,
    #[serde(default)]
    pub point: Vec<SinkDataPoint>,
}

impl Dataset {
    /// Body of a `dataSources.datasets.patch` request.
    #[must_use]
    pub fn patch_body(
        data_source_id: &str,
        window: DatasetWindow,
        point: Vec<SinkDataPoint>,
    ) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            min_start_time_ns: format_sstr!("{}", window.min_time_ns),
            max_end_time_ns: format_sstr!("{}", window.max_time_ns),
            point,
        }
    }

    #[must_use]
    pub fn start_times(&self) -> HashSet<i64> {
        self.point.iter().map(|p| p.start_time_ns).collect()
    }
}

/// Number of start times present in `left` but not in `right`.
#[must_use]
pub fn points_difference(left: &Dataset, right: &Dataset) -> usize {
    let right = right.start_times();
    left.start_times().difference(&right).count()
}
