use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::model::role::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    /// Name shown in admin listings and assignment dropdowns.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        if full.trim().is_empty() {
            self.username.clone()
        } else {
            full.trim().to_string()
        }
    }
}
