use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Machine {
    pub id: String,
    pub name: String,
    /// Either a company code or a company name, depending on who registered it.
    pub company: String,
    pub company_code: Option<String>,
    pub is_active: bool,
    pub location: Option<String>,
    pub category: Option<String>,
    pub manufacturer_model: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub commissioning_date: Option<OffsetDateTime>,
    pub address: Option<String>,
    pub equipment_description: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub created_at: Option<OffsetDateTime>,
}
