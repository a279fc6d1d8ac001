use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::dto::billing_dto::AddStoryDto;
use crate::handler::repair_handler::{actor, parse_object_id};
use crate::middlewares::auth_middleware::AuthUser;
use crate::service::lifecycle_service::LifecycleService;
use crate::service::view_service::ViewService;
use crate::service::Services;
use crate::util::error::HandlerError;

const RECENT_STORIES_LIMIT: i64 = 20;

/// `POST /stories` — post-payment testimonial.
pub async fn add_story_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddStoryDto>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let quote_id = parse_object_id(&payload.quote_id, "quote")?;
    let story = services
        .lifecycle
        .add_story(actor(user), quote_id, payload.rating, payload.story, payload.image_url)
        .await
        .map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(story)))
}

/// `GET /stories` — public, newest first.
pub async fn list_stories_handler(
    State(services): State<Arc<Services>>,
) -> Result<impl IntoResponse, HandlerError> {
    let stories = services
        .views
        .recent_stories(RECENT_STORIES_LIMIT)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(stories))
}
