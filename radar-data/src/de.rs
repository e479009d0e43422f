use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Deserialise a `String` as the desired type.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let data: String = Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

/// Deserialise an optional numeric `String` as an `f64`, mapping `null`, missing and empty
/// strings to `None`.
///
/// Exchanges publish empty strings for an absent top-of-book (eg/ an illiquid OKX pair).
pub fn de_opt_str_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Deserialise a `u64` milliseconds value as `DateTime<Utc>`.
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let epoch_ms: i64 = Deserialize::deserialize(deserializer)?;
    DateTime::from_timestamp_millis(epoch_ms)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid epoch ms: {epoch_ms}")))
}

/// Deserialise a numeric `String` milliseconds value as `DateTime<Utc>`.
pub fn de_str_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let epoch_ms: i64 = de_str(deserializer)?;
    DateTime::from_timestamp_millis(epoch_ms)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid epoch ms: {epoch_ms}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Quote {
        #[serde(default, deserialize_with = "de_opt_str_f64")]
        bid: Option<f64>,
        #[serde(deserialize_with = "de_str")]
        last: f64,
    }

    #[test]
    fn test_de_opt_str_f64() {
        struct TestCase {
            input: &'static str,
            expected: Option<f64>,
        }

        let tests = vec![
            TestCase {
                // TC0: numeric string
                input: r#"{"bid":"101.5","last":"101"}"#,
                expected: Some(101.5),
            },
            TestCase {
                // TC1: empty string
                input: r#"{"bid":"","last":"101"}"#,
                expected: None,
            },
            TestCase {
                // TC2: null
                input: r#"{"bid":null,"last":"101"}"#,
                expected: None,
            },
            TestCase {
                // TC3: missing field
                input: r#"{"last":"101"}"#,
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = serde_json::from_str::<Quote>(test.input).unwrap();
            assert_eq!(actual.bid, test.expected, "TC{} failed", index);
            assert_eq!(actual.last, 101.0, "TC{} failed", index);
        }
    }

    #[test]
    fn test_de_str_rejects_garbage() {
        assert!(serde_json::from_str::<Quote>(r#"{"last":"abc"}"#).is_err());
    }

    #[test]
    fn test_de_epoch_ms() {
        #[derive(Deserialize)]
        struct Event {
            #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
            time: DateTime<Utc>,
            #[serde(deserialize_with = "de_str_epoch_ms_as_datetime_utc")]
            ts: DateTime<Utc>,
        }

        let event = serde_json::from_str::<Event>(r#"{"time":1672515782136,"ts":"1672515782136"}"#)
            .unwrap();
        assert_eq!(event.time.timestamp_millis(), 1672515782136);
        assert_eq!(event.time, event.ts);
    }
}
