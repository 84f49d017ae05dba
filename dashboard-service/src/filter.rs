use std::{fmt, str::FromStr};

use monitor_client::domain::SensorReading;
use serde::{Deserialize, Serialize};

/// Which metric family the history view is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Temperature,
    Vibration,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Vibration => "vibration",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(Self::Temperature),
            "vibration" => Ok(Self::Vibration),
            other => Err(format!("unknown metric kind '{other}'")),
        }
    }
}

/// Whether a reading carries a usable sample for the given metric family.
///
/// Rules:
/// - temperature: the temperature is present and > 0.
/// - vibration: RMS vibration > 0 or vibration velocity > 0.
pub fn is_valid(reading: &SensorReading, kind: MetricKind) -> bool {
    match kind {
        MetricKind::Temperature => reading.temperature_value().is_some(),
        MetricKind::Vibration => {
            reading.rms_vibration_value().is_some() || reading.vibration_velocity_value().is_some()
        }
    }
}

/// Keeps the readings that are valid for `kind`, preserving order.
pub fn filter_valid(readings: &[SensorReading], kind: MetricKind) -> Vec<SensorReading> {
    let valid: Vec<SensorReading> = readings
        .iter()
        .filter(|r| is_valid(r, kind))
        .cloned()
        .collect();

    let excluded = readings.len() - valid.len();
    if excluded > 0 {
        metrics::counter!("history_readings_excluded_total", "metric" => kind.as_str())
            .increment(excluded as u64);
    }
    valid
}
