//! Alert classification of a machine's latest reading against its history.

use monitor_client::domain::{positive, SensorReading};
use serde::Serialize;

/// Latest temperature above `average * 1.2` raises a temperature alert.
pub const TEMPERATURE_ALERT_FACTOR: f64 = 1.2;
/// Latest RMS vibration or velocity above `average * 1.4` raises a vibration alert.
pub const VIBRATION_ALERT_FACTOR: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Normal,
    Mid,
    High,
}

impl AlertLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Mid => "MID",
            Self::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricAverages {
    pub temperature: f64,
    pub rms_vibration: f64,
    pub vibration_velocity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlertFlags {
    pub temperature: bool,
    pub rms_vibration: bool,
    pub vibration_velocity: bool,
}

impl AlertFlags {
    /// Vibration alerts outrank temperature alerts regardless of magnitude.
    pub fn level(&self) -> AlertLevel {
        if self.rms_vibration || self.vibration_velocity {
            AlertLevel::High
        } else if self.temperature {
            AlertLevel::Mid
        } else {
            AlertLevel::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub averages: MetricAverages,
    pub latest: Option<SensorReading>,
    pub flags: AlertFlags,
    pub alert_level: AlertLevel,
    pub alarm_count: usize,
    pub normal_count: usize,
}

/// Mean of the strictly positive values; 0 when there are none.
pub fn average(values: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter_map(positive)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn exceeds(latest: Option<f64>, average: f64, factor: f64) -> bool {
    average > 0.0 && positive(latest).unwrap_or(0.0) > average * factor
}

/// Evaluates an already-filtered reading set in chronological order.
///
/// Averages cover all three metrics over the whole set. The last reading is
/// the latest one and is compared against those averages.
pub fn evaluate(readings: &[SensorReading]) -> Evaluation {
    let averages = MetricAverages {
        temperature: average(readings.iter().map(|r| r.temperature)),
        rms_vibration: average(readings.iter().map(|r| r.rms_vibration)),
        vibration_velocity: average(readings.iter().map(|r| r.vibration_velocity)),
    };

    let latest = readings.last().cloned();

    let flags = match &latest {
        Some(r) => AlertFlags {
            temperature: exceeds(r.temperature, averages.temperature, TEMPERATURE_ALERT_FACTOR),
            rms_vibration: exceeds(r.rms_vibration, averages.rms_vibration, VIBRATION_ALERT_FACTOR),
            vibration_velocity: exceeds(
                r.vibration_velocity,
                averages.vibration_velocity,
                VIBRATION_ALERT_FACTOR,
            ),
        },
        None => AlertFlags::default(),
    };

    let normal_count = readings.iter().filter(|r| r.is_normal()).count();
    let alert_level = flags.level();
    metrics::counter!("history_alert_level_total", "level" => alert_level.as_str()).increment(1);

    Evaluation {
        averages,
        latest,
        flags,
        alert_level,
        alarm_count: readings.len() - normal_count,
        normal_count,
    }
}
