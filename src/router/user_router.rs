use axum::{routing::post, Router};
use std::sync::Arc;

use crate::handler::user_handler::{login_handler, refresh_handler, register_handler};
use crate::service::user_service::UserServiceImpl;

pub fn user_router(service: Arc<UserServiceImpl>) -> Router {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .with_state(service)
}
