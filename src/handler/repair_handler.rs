use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bson::oid::ObjectId;
use std::sync::Arc;
use validator::Validate;

use crate::dto::repair_dto::{
    ApproveRequestDto, CreateRepairRequestRequest, RejectRequestDto, TechnicianAcceptDto,
    TechnicianReasonDto, UpdateRepairRequestRequest,
};
use crate::middlewares::auth_middleware::AuthUser;
use crate::service::lifecycle_service::{Actor, LifecycleService, NewRepairRequest};
use crate::service::view_service::ViewService;
use crate::service::Services;
use crate::util::error::HandlerError;

pub(crate) fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, HandlerError> {
    ObjectId::parse_str(raw).map_err(|_| HandlerError::bad_request(format!("Invalid {} id", what)))
}

pub(crate) fn actor(user: AuthUser) -> Actor {
    Actor {
        id: user.id,
        role: user.role,
    }
}

/// `POST /repair-requests` — the preserved public contract: 201 with the
/// created record, 400 on validation or store errors.
pub async fn create_repair_request_handler(
    State(services): State<Arc<Services>>,
    Json(payload): Json<CreateRepairRequestRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Invalid request data: {}", e)));
    }
    let user_id = parse_object_id(&payload.user_id, "user")?;
    let created = services
        .lifecycle
        .create_request(NewRepairRequest {
            user_id,
            device_type: payload.device_type,
            brand: payload.brand,
            model: payload.model,
            issue_description: payload.issue_description,
            urgency: payload.urgency,
        })
        .await
        .map_err(|e| HandlerError::bad_request(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /repair-requests/{userId}` — newest first, device joined.
pub async fn list_repair_requests_handler(
    State(services): State<Arc<Services>>,
    Path((user_id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let requests = services.views.customer_requests(user_id).await.map_err(HandlerError::from)?;
    Ok(Json(requests))
}

/// `GET /repair-requests/{userId}/{id}`
pub async fn get_repair_request_handler(
    State(services): State<Arc<Services>>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let id = parse_object_id(&id, "repair request")?;
    let request = services.views.customer_request(user_id, id).await.map_err(HandlerError::from)?;
    Ok(Json(request))
}

/// `PUT /repair-requests/{userId}/{id}` — customer edit while pending.
pub async fn update_repair_request_handler(
    State(services): State<Arc<Services>>,
    Path((user_id, id)): Path<(String, String)>,
    Json(payload): Json<UpdateRepairRequestRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let id = parse_object_id(&id, "repair request")?;
    let updated = services
        .lifecycle
        .update_request(user_id, id, payload.description, payload.urgency)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

/// `DELETE /repair-requests/{userId}/{id}` — customer delete while pending.
pub async fn delete_repair_request_handler(
    State(services): State<Arc<Services>>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, HandlerError> {
    let user_id = parse_object_id(&user_id, "user")?;
    let id = parse_object_id(&id, "repair request")?;
    services
        .lifecycle
        .delete_request(user_id, id)
        .await
        .map_err(HandlerError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

// Admin handlers

pub async fn admin_list_requests_handler(
    State(services): State<Arc<Services>>,
) -> Result<impl IntoResponse, HandlerError> {
    let requests = services.views.admin_requests().await.map_err(HandlerError::from)?;
    Ok(Json(requests))
}

pub async fn admin_list_technicians_handler(
    State(services): State<Arc<Services>>,
) -> Result<impl IntoResponse, HandlerError> {
    let technicians = services.views.technicians().await.map_err(HandlerError::from)?;
    Ok(Json(technicians))
}

pub async fn approve_request_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<ApproveRequestDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "repair request")?;
    let technician_id = payload
        .technician_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| parse_object_id(s, "technician"))
        .transpose()?;
    let updated = services
        .lifecycle
        .approve_request(actor(user), id, payload.admin_notes, technician_id)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

pub async fn reject_request_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<RejectRequestDto>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let id = parse_object_id(&id, "repair request")?;
    let updated = services
        .lifecycle
        .reject_request(actor(user), id, payload.reason)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

// Technician handlers

pub async fn technician_workspace_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let workspace = services
        .views
        .technician_workspace(user.id)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(workspace))
}

pub async fn claim_request_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "repair request")?;
    let claimed = services
        .lifecycle
        .claim_request(actor(user), id)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(claimed))
}

pub async fn technician_accept_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<TechnicianAcceptDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "repair request")?;
    let updated = services
        .lifecycle
        .technician_accept(actor(user), id, payload.notes)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

pub async fn technician_reject_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<TechnicianReasonDto>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let id = parse_object_id(&id, "repair request")?;
    let updated = services
        .lifecycle
        .technician_reject(actor(user), id, payload.reason)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

pub async fn technician_cancel_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<TechnicianReasonDto>,
) -> Result<impl IntoResponse, HandlerError> {
    if let Err(e) = payload.validate() {
        return Err(HandlerError::bad_request(format!("Validation error: {}", e)));
    }
    let id = parse_object_id(&id, "repair request")?;
    let updated = services
        .lifecycle
        .technician_cancel(actor(user), id, payload.reason)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(updated))
}

/// `GET /db/health` — store reachability probe counting repair requests.
pub async fn db_health_handler(State(services): State<Arc<Services>>) -> impl IntoResponse {
    match services.views.repair_request_count().await {
        Ok(count) => Json(serde_json::json!({
            "status": "ok",
            "table": "repair_requests",
            "count": count,
        })),
        Err(e) => Json(serde_json::json!({
            "status": "error",
            "error": e.to_string(),
        })),
    }
}
