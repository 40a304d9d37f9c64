use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Generator,
    Picker,
}

/// Created once signup completes; only its owner may write it.
/// `pincode` and `is_available` are picker-only fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub role: UserRole,
    pub pincode: Option<String>,
    pub is_available: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
