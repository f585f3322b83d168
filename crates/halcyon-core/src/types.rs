use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
///
/// All persisted times use this newtype; in-process windows (rate limits,
/// consent caches) use `std::time::Instant` instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// Age of this timestamp in whole minutes, clamped at zero.
    pub fn age_minutes(&self) -> i64 {
        ((Timestamp::now().0 - self.0) / 60).max(0)
    }

    /// Hour of day (0-23) in UTC.
    pub fn hour(&self) -> u8 {
        self.to_datetime().hour() as u8
    }

    /// Day of week, `Mon` = 1 through `Sun` = 7.
    pub fn weekday(&self) -> u8 {
        self.to_datetime().weekday().number_from_monday() as u8
    }
}
