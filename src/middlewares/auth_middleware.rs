use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use bson::oid::ObjectId;
use std::sync::Arc;

use crate::model::role::UserRole;
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

pub struct AuthState {
    pub jwt_utils: Arc<JwtTokenUtilsImpl>,
}

/// Authenticated caller, attached to the request extensions by the auth
/// middleware and read by handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: UserRole,
}

fn authenticate(state: &AuthState, req: &Request<Body>) -> Result<AuthUser, StatusCode> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = state
        .jwt_utils
        .extract_token_from_header(auth_header)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let claims = state
        .jwt_utils
        .validate_access_token(&token)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let id = ObjectId::parse_str(&claims.sub).map_err(|_| StatusCode::UNAUTHORIZED)?;
    let role = claims.user_role().ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(AuthUser { id, role })
}

/// Requires a valid bearer token of any role.
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = authenticate(&state, &req)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = authenticate(&state, &req)?;
    if user.role != UserRole::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn require_technician(
    State(state): State<Arc<AuthState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = authenticate(&state, &req)?;
    if user.role != UserRole::Technician {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
