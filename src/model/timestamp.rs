use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, WebAgentError};

/// 仅限 UTC 的 ISO-8601 时间戳
///
/// 接受 `Z`、零偏移或无偏移（按 UTC 解析），其他偏移直接拒绝。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcTimestamp(DateTime<Utc>);

impl UtcTimestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            if parsed.offset().local_minus_utc() != 0 {
                return Err(WebAgentError::Timestamp {
                    value: value.to_string(),
                    reason: format!("offset {} is not UTC", parsed.offset()),
                });
            }
            return Ok(Self(parsed.with_timezone(&Utc)));
        }

        trimmed
            .parse::<NaiveDateTime>()
            .map(|naive| Self(naive.and_utc()))
            .map_err(|err| WebAgentError::Timestamp {
                value: value.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    pub fn is_before(&self, other: &UtcTimestamp) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for UtcTimestamp {
    type Err = WebAgentError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for UtcTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for UtcTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_utc_forms() {
        let zulu = UtcTimestamp::parse("2026-10-17T08:30:00Z").unwrap();
        let offset = UtcTimestamp::parse("2026-10-17T08:30:00+00:00").unwrap();
        let naive = UtcTimestamp::parse("2026-10-17T08:30:00").unwrap();
        assert_eq!(zulu, offset);
        assert_eq!(zulu, naive);
        assert_eq!(zulu.to_iso8601(), "2026-10-17T08:30:00Z");
    }

    #[test]
    fn keeps_fractional_seconds() {
        let ts = UtcTimestamp::parse("2026-10-17T08:30:00.250").unwrap();
        assert_eq!(ts.to_iso8601(), "2026-10-17T08:30:00.250Z");
    }

    #[test]
    fn rejects_other_offsets_and_garbage() {
        assert!(UtcTimestamp::parse("2026-10-17T08:30:00+08:00").is_err());
        assert!(UtcTimestamp::parse("yesterday").is_err());
    }

    #[test]
    fn serde_uses_iso_strings() {
        let ts: UtcTimestamp = serde_json::from_str("\"2026-01-02T03:04:05Z\"").unwrap();
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2026-01-02T03:04:05Z\"");
        assert!(serde_json::from_str::<UtcTimestamp>("\"2026-01-02T03:04:05-05:00\"").is_err());
    }
}
