use std::env;

use crate::config::ConfigError;

/// Bootstrap credentials for the first admin account, created at startup if
/// no user with this email exists yet.
#[derive(Debug, Clone)]
pub struct AdminUserConfig {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl AdminUserConfig {
    /// Expected environment variables:
    /// - ADMIN_EMAIL, ADMIN_PASSWORD (required)
    /// - ADMIN_USERNAME (defaults to "admin")
    /// - ADMIN_FIRST_NAME / ADMIN_LAST_NAME (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let email = env::var("ADMIN_EMAIL")
            .map_err(|_| ConfigError::EnvVarNotFound("ADMIN_EMAIL".to_string()))?;
        let password = env::var("ADMIN_PASSWORD")
            .map_err(|_| ConfigError::EnvVarNotFound("ADMIN_PASSWORD".to_string()))?;

        if password.len() < 8 {
            return Err(ConfigError::ValidationError(
                "ADMIN_PASSWORD must be at least 8 characters long".to_string(),
            ));
        }

        Ok(AdminUserConfig {
            username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            first_name: env::var("ADMIN_FIRST_NAME").unwrap_or_default(),
            last_name: env::var("ADMIN_LAST_NAME").unwrap_or_default(),
            email,
            password,
        })
    }
}
