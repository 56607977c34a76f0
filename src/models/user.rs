use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

/// Read-only view of an account held by the auth provider. The role is
/// derived locally from the admin allowlist; it is never stored upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub sign_in_count: u32,
    pub role: Role,
    #[serde(default)]
    pub banned_until: Option<DateTime<Utc>>,
}
