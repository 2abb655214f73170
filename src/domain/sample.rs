// Telemetry sample domain model
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque sample identifier, kept exactly as the backend sent it.
///
/// Used as the dedup key, so equality is on the raw value: the string `"1"`
/// and the number `1` are different timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(serde_json::Number),
    Text(String),
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Epoch(n) => write!(f, "{}", n),
            Timestamp::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Timestamp {
    fn from(value: &str) -> Self {
        Timestamp::Text(value.to_string())
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Timestamp::Epoch(value.into())
    }
}

impl From<i32> for Timestamp {
    fn from(value: i32) -> Self {
        Timestamp::Epoch(value.into())
    }
}

/// One telemetry reading. Every measurement may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    #[serde(default)]
    pub avg_voltage: Option<f64>,
    #[serde(default, rename = "avg_current_mA")]
    pub avg_current_ma: Option<f64>,
    #[serde(default)]
    pub avg_distance_m: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: impl Into<Timestamp>) -> Self {
        Self {
            timestamp: timestamp.into(),
            avg_voltage: None,
            avg_current_ma: None,
            avg_distance_m: None,
        }
    }

    pub fn with_voltage(mut self, volts: f64) -> Self {
        self.avg_voltage = Some(volts);
        self
    }

    pub fn with_current_ma(mut self, milliamps: f64) -> Self {
        self.avg_current_ma = Some(milliamps);
        self
    }

    pub fn with_distance_m(mut self, metres: f64) -> Self {
        self.avg_distance_m = Some(metres);
        self
    }
}
