use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use validator::Validate;

use crate::dto::user_dto::{LoginRequest, RefreshTokenRequest, RegisterRequest};
use crate::model::role::UserRole;
use crate::model::user::User;
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::util::error::{HandlerError, HandlerErrorKind};

/// `POST /auth/register` — customer or technician self-registration.
pub async fn register_handler(
    State(service): State<Arc<UserServiceImpl>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let role = payload.role.unwrap_or(UserRole::Customer);
    if role == UserRole::Admin {
        return Err(HandlerError {
            error: HandlerErrorKind::Forbidden,
            message: "Admin accounts cannot be self-registered".to_string(),
            details: None,
        });
    }
    let user = User {
        id: None,
        username: payload.username,
        first_name: payload.first_name,
        last_name: payload.last_name,
        email: payload.email,
        password_hash: String::new(),
        role,
        created_at: None,
        updated_at: None,
    };
    let response = service
        .register(user, payload.password)
        .await
        .map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /auth/login`
pub async fn login_handler(
    State(service): State<Arc<UserServiceImpl>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let response = service
        .login(payload.email, payload.password)
        .await
        .map_err(|_| HandlerError {
            error: HandlerErrorKind::Unauthorized,
            message: "Invalid credentials".to_string(),
            details: None,
        })?;
    Ok(Json(response))
}

/// `POST /auth/refresh`
pub async fn refresh_handler(
    State(service): State<Arc<UserServiceImpl>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let tokens = service
        .refresh_token(payload.refresh_token)
        .await
        .map_err(|_| HandlerError {
            error: HandlerErrorKind::Unauthorized,
            message: "Invalid refresh token".to_string(),
            details: None,
        })?;
    Ok(Json(tokens))
}
