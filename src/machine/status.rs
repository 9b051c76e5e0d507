// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Machine status values and raw readings

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseStatusError;

/// Operational status of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Started,
    Running,
    Paused,
    Completed,
    Shutdown,
}

impl Status {
    /// Every status, in declaration order
    pub const ALL: [Status; 5] = [
        Status::Started,
        Status::Running,
        Status::Paused,
        Status::Completed,
        Status::Shutdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Started => "STARTED",
            Status::Running => "RUNNING",
            Status::Paused => "PAUSED",
            Status::Completed => "COMPLETED",
            Status::Shutdown => "SHUTDOWN",
        }
    }

    /// Comma separated list of accepted names, used in client error messages
    pub fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A single machine reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub speed: f64,
    pub status: Status,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, speed: f64, status: Status) -> Self {
        Self {
            timestamp,
            temperature,
            speed,
            status,
        }
    }

    /// Reading stamped with the current time
    pub fn now(temperature: f64, speed: f64, status: Status) -> Self {
        Self::new(Utc::now(), temperature, speed, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("running".parse::<Status>().unwrap(), Status::Running);
        assert_eq!(" Paused ".parse::<Status>().unwrap(), Status::Paused);
        assert!("idle".parse::<Status>().is_err());
    }

    #[test]
    fn test_reading_json_uses_upper_case_status() {
        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let reading = Reading::new(ts, 25.5, 1500.0, Status::Shutdown);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"status\":\"SHUTDOWN\""));
    }
}
