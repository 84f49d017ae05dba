use time::OffsetDateTime;

/// Status given to a user moved back to the pending queue.
pub const PENDING_VERIFICATION: &str = "pending_verification";

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct User {
    pub id: String,
    pub company_code: String,
    pub company_id: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub full_name: String,
    pub mobile_no: Option<String>,
    pub user_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, with = "time::serde::rfc3339::option"))]
    pub created_at: Option<OffsetDateTime>,
}

/// Editable subset of a user's fields.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub mobile_no: Option<String>,
    pub user_type: Option<String>,
}

impl UserUpdate {
    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.full_name {
            user.full_name = v.clone();
        }
        if let Some(v) = &self.department {
            user.department = Some(v.clone());
        }
        if let Some(v) = &self.mobile_no {
            user.mobile_no = Some(v.clone());
        }
        if let Some(v) = &self.user_type {
            user.user_type = Some(v.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingUser {
    pub id: String,
    pub company_code: String,
    pub department: Option<String>,
    pub email: Option<String>,
    pub full_name: String,
    pub mobile_no: Option<String>,
    pub status: String,
    pub user_type: String,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

impl PendingUser {
    /// Pending-queue copy of a verified user. A missing user type falls back to
    /// `user` and a missing creation time to `now`.
    pub fn from_user(user: &User, id: String, now: OffsetDateTime) -> Self {
        Self {
            id,
            company_code: user.company_code.clone(),
            department: user.department.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            mobile_no: user.mobile_no.clone(),
            status: PENDING_VERIFICATION.to_string(),
            user_type: user.user_type.clone().unwrap_or_else(|| "user".to_string()),
            created_at: user.created_at.unwrap_or(now),
        }
    }
}
