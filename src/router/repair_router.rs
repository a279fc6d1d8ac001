use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::repair_handler::{
    admin_list_requests_handler, admin_list_technicians_handler, approve_request_handler,
    claim_request_handler, create_repair_request_handler, db_health_handler,
    delete_repair_request_handler, get_repair_request_handler, list_repair_requests_handler,
    reject_request_handler, technician_accept_handler, technician_cancel_handler,
    technician_reject_handler, technician_workspace_handler, update_repair_request_handler,
};
use crate::middlewares::auth_middleware::{require_admin, require_technician, AuthState};
use crate::service::Services;

pub fn repair_router(services: Arc<Services>, auth_state: Arc<AuthState>) -> Router {
    // Preserved public contract plus the customer edit/delete surface.
    let public = Router::new()
        .route("/repair-requests", post(create_repair_request_handler))
        .route("/repair-requests/{user_id}", get(list_repair_requests_handler))
        .route(
            "/repair-requests/{user_id}/{id}",
            get(get_repair_request_handler)
                .put(update_repair_request_handler)
                .delete(delete_repair_request_handler),
        )
        .route("/db/health", get(db_health_handler));

    let admin = Router::new()
        .route("/admin/repair-requests", get(admin_list_requests_handler))
        .route("/admin/technicians", get(admin_list_technicians_handler))
        .route("/admin/repair-requests/{id}/approve", put(approve_request_handler))
        .route("/admin/repair-requests/{id}/reject", put(reject_request_handler))
        .route_layer(middleware::from_fn_with_state(auth_state.clone(), require_admin));

    let technician = Router::new()
        .route("/technician/workspace", get(technician_workspace_handler))
        .route("/technician/repair-requests/{id}/claim", post(claim_request_handler))
        .route("/technician/repair-requests/{id}/accept", post(technician_accept_handler))
        .route("/technician/repair-requests/{id}/reject", post(technician_reject_handler))
        .route("/technician/repair-requests/{id}/cancel", post(technician_cancel_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_technician));

    public.merge(admin).merge(technician).with_state(services)
}
