// Render-time formatting. Stored samples are never rounded.
use super::sample::{Sample, Timestamp};
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NOT_AVAILABLE: &str = "N/A";

const TIME_FORMAT: &str = "%H:%M:%S";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayField {
    Voltage,
    Current,
    Distance,
}

impl DisplayField {
    pub fn label(self) -> &'static str {
        match self {
            DisplayField::Voltage => "Voltage (V)",
            DisplayField::Current => "Current (mA)",
            DisplayField::Distance => "Distance (m)",
        }
    }

    pub fn precision(self) -> usize {
        match self {
            DisplayField::Voltage => 4,
            DisplayField::Current => 2,
            DisplayField::Distance => 2,
        }
    }

    pub fn value(self, sample: &Sample) -> Option<f64> {
        match self {
            DisplayField::Voltage => sample.avg_voltage,
            DisplayField::Current => sample.avg_current_ma,
            DisplayField::Distance => sample.avg_distance_m,
        }
    }

    pub fn format(self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{:.*}", self.precision(), v),
            None => NOT_AVAILABLE.to_string(),
        }
    }
}

pub fn all_fields() -> Vec<DisplayField> {
    vec![
        DisplayField::Voltage,
        DisplayField::Current,
        DisplayField::Distance,
    ]
}

/// Wall-clock `HH:MM:SS` in local time.
///
/// Numbers are epoch milliseconds. Strings may be RFC 3339 or a naive ISO
/// date-time, which is taken as already local. Anything unparseable is shown
/// verbatim.
pub fn format_time(timestamp: &Timestamp) -> String {
    let parsed = match timestamp {
        Timestamp::Epoch(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|utc| utc.with_timezone(&Local).naive_local()),
        Timestamp::Text(s) => parse_text(s),
    };

    match parsed {
        Some(local) => local.format(TIME_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

fn parse_text(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
