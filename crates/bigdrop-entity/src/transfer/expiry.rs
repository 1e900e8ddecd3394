//! Expiry classes and absolute deadlines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Relative lifetime offered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpiryClass {
    /// `1h`
    OneHour,
    /// `24h`
    OneDay,
    /// `7d`
    SevenDays,
    /// `30d`
    ThirtyDays,
}

impl ExpiryClass {
    /// Wire form of the class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
        }
    }

    /// Lifetime measured from `created_at`.
    pub fn duration(&self) -> Duration {
        match self {
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::hours(24),
            Self::SevenDays => Duration::days(7),
            Self::ThirtyDays => Duration::days(30),
        }
    }
}

impl FromStr for ExpiryClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            "30d" => Ok(Self::ThirtyDays),
            other => Err(format!(
                "unknown expiry '{other}', expected one of 1h, 24h, 7d, 30d"
            )),
        }
    }
}

/// Expiry as sent by a client: a class or an RFC 3339 timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Expiry {
    /// Relative to the transfer's creation time.
    Class(ExpiryClass),
    /// Absolute deadline.
    At(DateTime<Utc>),
}

impl Expiry {
    /// Absolute deadline for a transfer created at `created_at`.
    pub fn resolve(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Class(class) => created_at + class.duration(),
            Self::At(at) => *at,
        }
    }
}

impl FromStr for Expiry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(class) = s.parse::<ExpiryClass>() {
            return Ok(Self::Class(class));
        }
        DateTime::parse_from_rfc3339(s.trim())
            .map(|at| Self::At(at.with_timezone(&Utc)))
            .map_err(|_| {
                format!("invalid expiry '{s}', expected 1h, 24h, 7d, 30d or an RFC 3339 timestamp")
            })
    }
}

impl TryFrom<String> for Expiry {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Expiry> for String {
    fn from(value: Expiry) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.write_str(class.as_str()),
            Self::At(at) => f.write_str(&at.to_rfc3339()),
        }
    }
}
