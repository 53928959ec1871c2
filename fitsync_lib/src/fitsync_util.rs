use log::warn;
use time::{format_description::FormatItem, macros::format_description};
use time_tz::{system::get_timezone, timezones::db::UTC, Tz};

pub const POUNDS_PER_KILOGRAM: f64 = 2.20462;
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// `%a, %d %b %Y %H:%M:%S`
pub const DISPLAY_TIME_FORMAT: &[FormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second]"
);

/// Pound/kilogram conversion, both directions share one factor so that a
/// value shown by `get` is the value that was uploaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightConversion {
    pounds_per_kilogram: f64,
}

impl Default for WeightConversion {
    fn default() -> Self {
        Self::new(POUNDS_PER_KILOGRAM)
    }
}

impl WeightConversion {
    #[must_use]
    pub fn new(pounds_per_kilogram: f64) -> Self {
        Self {
            pounds_per_kilogram,
        }
    }

    #[must_use]
    pub fn pounds_per_kilogram(self) -> f64 {
        self.pounds_per_kilogram
    }

    #[must_use]
    pub fn lbs_to_kg(self, pounds: f64) -> f64 {
        pounds / self.pounds_per_kilogram
    }

    #[must_use]
    pub fn kg_to_lbs(self, kilograms: f64) -> f64 {
        kilograms * self.pounds_per_kilogram
    }
}

/// System timezone, falling back to UTC when it cannot be determined.
#[must_use]
pub fn local_tz() -> &'static Tz {
    match get_timezone() {
        Ok(tz) => tz,
        Err(e) => {
            warn!("unable to determine local timezone, using UTC: {e:?}");
            UTC
        }
    }
}
