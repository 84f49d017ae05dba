use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Company {
    pub id: String,
    pub company_code: String,
    pub company_name: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub gst_no: Option<String>,
    pub mobile_no: Option<String>,
    pub user_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub created_at: Option<OffsetDateTime>,
}
