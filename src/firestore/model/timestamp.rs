use std::cmp::Ordering;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::firestore::error::{invalid_argument, FirestoreResult};

/// 0001-01-01T00:00:00Z
const MIN_SECONDS: i64 = -62_135_596_800;
/// 9999-12-31T23:59:59Z
const MAX_SECONDS: i64 = 253_402_300_799;

/// Point in time with nanosecond precision, normalized so `0 <= nanos < 1e9`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        let extra_seconds = nanos.div_euclid(1_000_000_000);
        Self {
            seconds: seconds + extra_seconds as i64,
            nanos: nanos.rem_euclid(1_000_000_000),
        }
    }

    /// Whether the timestamp falls in the years 0001 through 9999.
    pub fn is_in_range(&self) -> bool {
        (MIN_SECONDS..=MAX_SECONDS).contains(&self.seconds)
    }

    /// Renders the timestamp as RFC 3339 with nanosecond precision.
    ///
    /// Fails outside the years 0001 through 9999, which RFC 3339 cannot express.
    pub fn to_rfc3339(&self) -> FirestoreResult<String> {
        if !self.is_in_range() {
            return Err(invalid_argument(format!(
                "Timestamp out of range: {}s",
                self.seconds
            )));
        }
        Utc.timestamp_opt(self.seconds, self.nanos as u32)
            .single()
            .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .ok_or_else(|| invalid_argument(format!("Timestamp out of range: {}s", self.seconds)))
    }

    pub fn parse_rfc3339(value: &str) -> FirestoreResult<Self> {
        let datetime = DateTime::parse_from_rfc3339(value)
            .map_err(|err| invalid_argument(format!("Invalid timestamp: {err}")))?
            .with_timezone(&Utc);
        Ok(Self::new(
            datetime.timestamp(),
            datetime.timestamp_subsec_nanos() as i32,
        ))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds
            .cmp(&other.seconds)
            .then(self.nanos.cmp(&other.nanos))
    }
}
