//! Serde helpers for `std::time::Duration`.

/// (De)serialize a duration as integer nanoseconds.
pub mod nanos {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as nanoseconds, saturating at `u64::MAX`.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        serializer.serialize_u64(nanos)
    }

    /// Deserialize from nanoseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_nanos(u64::deserialize(deserializer)?))
    }
}

/// (De)serialize a duration as integer milliseconds.
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize as milliseconds, saturating at `u64::MAX`.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    /// Deserialize from milliseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Elapsed time between two timestamps, clamped at zero.
pub fn between(from: crate::Time, to: crate::Time) -> std::time::Duration {
    (to - from).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "nanos")]
        elapsed: Duration,
        #[serde(with = "millis")]
        timeout: Duration,
    }

    #[test]
    fn test_duration_units() {
        let json = serde_json::to_value(Wrapper {
            elapsed: Duration::from_micros(286),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(json["elapsed"], 286_000);
        assert_eq!(json["timeout"], 1000);

        let back: Wrapper = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_between_clamps_negative() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::seconds(3);
        assert_eq!(between(earlier, now), Duration::from_secs(3));
        assert_eq!(between(now, earlier), Duration::ZERO);
    }
}
