//! Engine duration range and timestamp conversion.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

/// Smallest timeout the engine accepts. Engine timeouts are whole seconds.
pub const MIN_DURATION: Duration = Duration::from_secs(1);

/// Largest timeout the engine accepts.
pub const MAX_DURATION: Duration = Duration::from_secs(i32::MAX as u64);

/// Clamp a resolved duration into the engine's representable range.
pub fn clamp(duration: Duration) -> Duration {
    duration.clamp(MIN_DURATION, MAX_DURATION)
}

/// Zero durations count as unset.
pub fn non_zero(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|d| !d.is_zero())
}

/// Whole seconds as sent to the engine.
pub fn to_engine_seconds(duration: Duration) -> i32 {
    clamp(duration).as_secs() as i32
}

/// Convert Unix nanoseconds to a UTC timestamp.
pub fn unix_nanos_to_utc(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

/// Serde adapter for durations as integer nanoseconds.
pub mod duration_nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let nanos = i64::deserialize(deserializer)?;
        if nanos < 0 {
            return Err(serde::de::Error::custom("negative duration"));
        }
        Ok(Duration::from_nanos(nanos as u64))
    }

    /// Same encoding for optional durations.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(duration) => super::serialize(duration, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            match Option::<i64>::deserialize(deserializer)? {
                None => Ok(None),
                Some(nanos) if nanos < 0 => Err(serde::de::Error::custom("negative duration")),
                Some(nanos) => Ok(Some(Duration::from_nanos(nanos as u64))),
            }
        }
    }
}
