use time::OffsetDateTime;

/// Alarm tag reported by a healthy device.
pub const NORMAL_ALARM: &str = "NORMAL";

/// One sensor sample for a machine, as stored under its sensor history.
///
/// Metric values are kept exactly as the device reported them. A value that is
/// absent, NaN or `<= 0` means the sensor is not fitted or sent no data; use
/// [`positive`] or the `*_value` accessors to read a metric.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReading {
    pub id: String,
    pub machine_id: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub ts: OffsetDateTime,
    pub temperature: Option<f64>,
    pub rms_vibration: Option<f64>,
    pub vibration_velocity: Option<f64>,
    pub alarm: Option<String>,
    pub free_heap: Option<i64>,
    pub wifi_rssi: Option<i32>,
    pub image_url: Option<String>,
}

/// Returns the value only when it is a real, strictly positive sample.
pub fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

impl SensorReading {
    pub fn temperature_value(&self) -> Option<f64> {
        positive(self.temperature)
    }

    pub fn rms_vibration_value(&self) -> Option<f64> {
        positive(self.rms_vibration)
    }

    pub fn vibration_velocity_value(&self) -> Option<f64> {
        positive(self.vibration_velocity)
    }

    /// `true` only for an alarm tag that is exactly `NORMAL`.
    pub fn is_normal(&self) -> bool {
        self.alarm.as_deref() == Some(NORMAL_ALARM)
    }

    pub fn alarm_tag(&self) -> AlarmTag {
        AlarmTag::classify(self.alarm.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmTag {
    Normal,
    Warning,
    /// Any other tag, including a missing one.
    Critical(String),
}

impl AlarmTag {
    pub fn classify(tag: Option<&str>) -> Self {
        match tag {
            Some("NORMAL") => Self::Normal,
            Some("WARNING") => Self::Warning,
            Some(other) => Self::Critical(other.to_string()),
            None => Self::Critical(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn reading(temperature: Option<f64>, alarm: Option<&str>) -> SensorReading {
        SensorReading {
            id: "r-1".to_string(),
            machine_id: "m-1".to_string(),
            ts: datetime!(2024-01-01 00:00:00 UTC),
            temperature,
            rms_vibration: None,
            vibration_velocity: None,
            alarm: alarm.map(str::to_string),
            free_heap: None,
            wifi_rssi: None,
            image_url: None,
        }
    }

    #[test]
    fn positive_rejects_zero_negative_and_nan() {
        assert_eq!(positive(Some(0.0)), None);
        assert_eq!(positive(Some(-3.5)), None);
        assert_eq!(positive(Some(f64::NAN)), None);
        assert_eq!(positive(None), None);
        assert_eq!(positive(Some(21.5)), Some(21.5));
    }

    #[test]
    fn missing_alarm_is_not_normal() {
        assert!(reading(Some(20.0), Some("NORMAL")).is_normal());
        assert!(!reading(Some(20.0), Some("normal")).is_normal());
        assert!(!reading(Some(20.0), None).is_normal());
    }

    #[test]
    fn alarm_tags_are_classified() {
        assert_eq!(reading(None, Some("WARNING")).alarm_tag(), AlarmTag::Warning);
        assert_eq!(
            reading(None, Some("OVERHEAT")).alarm_tag(),
            AlarmTag::Critical("OVERHEAT".to_string())
        );
    }
}
