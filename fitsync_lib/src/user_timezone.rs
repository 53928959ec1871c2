use serde::{Deserialize, Serialize};
use stack_string::{format_sstr, StackString};
use std::{convert::TryFrom, fmt, ops::Deref, str::FromStr};
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use time_tz::{timezones::get_by_name, Offset, TimeZone, Tz};

use crate::errors::FitsyncError as Error;

/// IANA timezone of the tracker owner, as reported by the user profile.
#[derive(Debug, PartialEq, Copy, Clone, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "&str")]
pub struct UserTimezone(&'static Tz);

impl UserTimezone {
    #[must_use]
    pub fn tz(self) -> &'static Tz {
        self.0
    }

    /// Interpret a wall-clock reading in this zone and return the matching
    /// UTC instant.
    #[must_use]
    pub fn local_to_utc(self, datetime: PrimitiveDateTime) -> OffsetDateTime {
        let guess = datetime.assume_utc();
        let offset = self.0.get_offset_utc(&guess).to_utc();
        let offset = self
            .0
            .get_offset_utc(&datetime.assume_offset(offset))
            .to_utc();
        datetime.assume_offset(offset).to_offset(UtcOffset::UTC)
    }
}

impl Deref for UserTimezone {
    type Target = Tz;
    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl fmt::Display for UserTimezone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.name())
    }
}

impl From<UserTimezone> for String {
    fn from(item: UserTimezone) -> Self {
        item.0.name().to_string()
    }
}

impl From<&'static Tz> for UserTimezone {
    fn from(item: &'static Tz) -> Self {
        Self(item)
    }
}

impl FromStr for UserTimezone {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        get_by_name(s)
            .map(Self)
            .ok_or_else(|| Error::ConfigurationError(format_sstr!("{s} is not a valid timezone")))
    }
}

impl TryFrom<&str> for UserTimezone {
    type Error = Error;
    fn try_from(item: &str) -> Result<Self, Self::Error> {
        item.parse()
    }
}

impl TryFrom<StackString> for UserTimezone {
    type Error = Error;
    fn try_from(item: StackString) -> Result<Self, Self::Error> {
        item.as_str().parse()
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{datetime, offset};

    use crate::{errors::FitsyncError as Error, user_timezone::UserTimezone};

    #[test]
    fn test_parse_user_timezone() {
        let tz: UserTimezone = "America/New_York".parse().unwrap();
        assert_eq!(tz.to_string(), "America/New_York");
        let result: Result<UserTimezone, Error> = "Mars/Olympus".parse();
        match result {
            Err(Error::ConfigurationError(msg)) => {
                assert_eq!(msg, "Mars/Olympus is not a valid timezone");
            }
            _ => panic!("expected ConfigurationError"),
        }
    }

    #[test]
    fn test_local_to_utc() {
        let tz: UserTimezone = "America/New_York".parse().unwrap();
        let winter = tz.local_to_utc(datetime!(2024-01-15 07:30:00));
        assert_eq!(winter, datetime!(2024-01-15 12:30:00 UTC));
        assert_eq!(winter.offset(), offset!(UTC));
        let summer = tz.local_to_utc(datetime!(2024-07-15 07:30:00));
        assert_eq!(summer, datetime!(2024-07-15 11:30:00 UTC));

        let tz: UserTimezone = "Europe/London".parse().unwrap();
        assert_eq!(
            tz.local_to_utc(datetime!(2024-01-15 07:30:00)),
            datetime!(2024-01-15 07:30:00 UTC)
        );
    }
}
