use time::OffsetDateTime;

/// A device scan log entry (QR registration and similar actions).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceScan {
    pub id: String,
    pub action: String,
    pub company: Option<String>,
    pub device_id: String,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub scanned_at: Option<OffsetDateTime>,
    pub serial_number: Option<String>,
}
