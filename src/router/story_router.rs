use axum::{middleware, routing::{get, post}, Router};
use std::sync::Arc;

use crate::handler::story_handler::{add_story_handler, list_stories_handler};
use crate::middlewares::auth_middleware::{require_auth, AuthState};
use crate::service::Services;

pub fn story_router(services: Arc<Services>, auth_state: Arc<AuthState>) -> Router {
    let public = Router::new().route("/stories", get(list_stories_handler));

    let authed = Router::new()
        .route("/stories", post(add_story_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    public.merge(authed).with_state(services)
}
