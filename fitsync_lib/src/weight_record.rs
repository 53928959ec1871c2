use serde::{Deserialize, Serialize};
use stack_string::{format_sstr, StackString};
use std::fmt;
use time::{Date, PrimitiveDateTime, Time};

use crate::{
    errors::FitsyncError as Error,
    fitsync_util::{WeightConversion, NANOS_PER_MILLI},
    user_timezone::UserTimezone,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightUnit {
    Pounds,
}

/// How the tracker API identified the moment a weight was logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTimestamp {
    /// Wall-clock date and time in the tracker owner's timezone.
    LocalDateTime { date: Date, time: Time },
    /// Milliseconds since the Unix epoch.
    LogId(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampEncoding {
    LocalDateTime,
    LogId,
}

impl fmt::Display for TimestampEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::LocalDateTime => f.write_str("date+time"),
            Self::LogId => f.write_str("logId"),
        }
    }
}

impl SourceTimestamp {
    #[must_use]
    pub fn encoding(&self) -> TimestampEncoding {
        match self {
            Self::LocalDateTime { .. } => TimestampEncoding::LocalDateTime,
            Self::LogId(_) => TimestampEncoding::LogId,
        }
    }

    /// Nanoseconds since the Unix epoch.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if a wall-clock timestamp is normalized
    /// without a timezone, or an error if the result overflows `i64`
    pub fn to_nanos(&self, timezone: Option<UserTimezone>) -> Result<i64, Error> {
        match self {
            Self::LocalDateTime { date, time } => {
                let timezone = timezone.ok_or_else(|| {
                    Error::configuration("user timezone required for date+time weight logs")
                })?;
                let utc = timezone.local_to_utc(PrimitiveDateTime::new(*date, *time));
                i64::try_from(utc.unix_timestamp_nanos()).map_err(Into::into)
            }
            Self::LogId(millis) => millis
                .checked_mul(NANOS_PER_MILLI)
                .ok_or(Error::StaticCustomError("logId overflows nanosecond range")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWeightRecord {
    pub timestamp: SourceTimestamp,
    pub weight_value: f64,
    pub weight_unit: WeightUnit,
}

impl SourceWeightRecord {
    #[must_use]
    pub fn pounds(timestamp: SourceTimestamp, weight_value: f64) -> Self {
        Self {
            timestamp,
            weight_value,
            weight_unit: WeightUnit::Pounds,
        }
    }

    #[must_use]
    pub fn kilograms(&self, conversion: WeightConversion) -> f64 {
        match self.weight_unit {
            WeightUnit::Pounds => conversion.lbs_to_kg(self.weight_value),
        }
    }
}

/// Normalize every record's timestamp, refusing batches that mix the
/// date+time and logId encodings.
///
/// # Errors
/// Returns `ConfigurationError` on mixed encodings or a missing timezone
pub fn normalize_timestamps(
    records: &[SourceWeightRecord],
    timezone: Option<UserTimezone>,
) -> Result<Vec<i64>, Error> {
    if let Some(first) = records.first() {
        let encoding = first.timestamp.encoding();
        if let Some(other) = records
            .iter()
            .map(|r| r.timestamp.encoding())
            .find(|e| *e != encoding)
        {
            return Err(Error::ConfigurationError(format_sstr!(
                "weight logs mix {encoding} and {other} timestamps"
            )));
        }
    }
    records
        .iter()
        .map(|r| r.timestamp.to_nanos(timezone))
        .collect()
}

/// Device entry as returned by the tracker's device listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerDevice {
    #[serde(rename = "type")]
    pub device_type: StackString,
    pub id: StackString,
    #[serde(rename = "deviceVersion")]
    pub device_version: StackString,
}

pub const SCALE_DEVICE_TYPE: &str = "SCALE";

impl TrackerDevice {
    /// The one device of type `SCALE`.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if there is no scale or more than one
    pub fn find_scale(devices: &[Self]) -> Result<&Self, Error> {
        let mut scales = devices
            .iter()
            .filter(|d| d.device_type == SCALE_DEVICE_TYPE);
        match (scales.next(), scales.next()) {
            (Some(scale), None) => Ok(scale),
            (None, _) => Err(Error::configuration("no SCALE device registered")),
            (Some(_), Some(_)) => Err(Error::configuration(
                "more than one SCALE device registered",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use time::macros::{date, time};

    use crate::{
        errors::FitsyncError as Error,
        fitsync_util::WeightConversion,
        weight_record::{
            normalize_timestamps, SourceTimestamp, SourceWeightRecord, TrackerDevice,
        },
    };

    fn device(device_type: &str, id: &str) -> TrackerDevice {
        TrackerDevice {
            device_type: device_type.into(),
            id: id.into(),
            device_version: "Aria".into(),
        }
    }

    #[test]
    fn test_log_id_to_nanos() {
        assert_eq!(SourceTimestamp::LogId(0).to_nanos(None).unwrap(), 0);
        assert_eq!(
            SourceTimestamp::LogId(1_705_321_800_000)
                .to_nanos(None)
                .unwrap(),
            1_705_321_800_000_000_000
        );
        assert!(SourceTimestamp::LogId(i64::MAX).to_nanos(None).is_err());
    }

    #[test]
    fn test_local_date_time_to_nanos() {
        let ts = SourceTimestamp::LocalDateTime {
            date: date!(2024 - 01 - 15),
            time: time!(07:30:00),
        };
        let tz = "America/New_York".parse().ok();
        assert_eq!(ts.to_nanos(tz).unwrap(), 1_705_321_800_000_000_000);
        assert!(matches!(ts.to_nanos(None), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_normalize_rejects_mixed_encodings() {
        let records = [
            SourceWeightRecord::pounds(SourceTimestamp::LogId(1000), 180.0),
            SourceWeightRecord::pounds(
                SourceTimestamp::LocalDateTime {
                    date: date!(2024 - 01 - 15),
                    time: time!(07:30:00),
                },
                181.0,
            ),
        ];
        let tz = "Europe/London".parse().ok();
        match normalize_timestamps(&records, tz) {
            Err(Error::ConfigurationError(msg)) => {
                assert_eq!(msg, "weight logs mix logId and date+time timestamps");
            }
            _ => panic!("expected ConfigurationError"),
        }
        assert_eq!(
            normalize_timestamps(&records[..1], None).unwrap(),
            vec![1_000_000_000]
        );
        assert!(normalize_timestamps(&[], None).unwrap().is_empty());
    }

    #[test]
    fn test_kilograms() {
        let record = SourceWeightRecord::pounds(SourceTimestamp::LogId(0), 220.462);
        assert_abs_diff_eq!(
            record.kilograms(WeightConversion::default()),
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_find_scale() {
        let devices = vec![device("TRACKER", "1"), device("SCALE", "2")];
        assert_eq!(TrackerDevice::find_scale(&devices).unwrap().id, "2");
        assert!(TrackerDevice::find_scale(&devices[..1]).is_err());
        let devices = vec![device("SCALE", "1"), device("SCALE", "2")];
        assert!(matches!(
            TrackerDevice::find_scale(&devices),
            Err(Error::ConfigurationError(_))
        ));
    }
}
