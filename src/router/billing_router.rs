use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handler::billing_handler::{
    confirm_payment_handler, customer_payments_handler, customer_quotes_handler,
    delete_card_handler, edit_bill_handler, issue_bill_handler, list_cards_handler,
    save_card_handler, set_default_card_handler, technician_quotes_handler,
};
use crate::middlewares::auth_middleware::{require_auth, require_technician, AuthState};
use crate::service::Services;

pub fn billing_router(services: Arc<Services>, auth_state: Arc<AuthState>) -> Router {
    let technician = Router::new()
        .route("/technician/repair-requests/{id}/bill", post(issue_bill_handler))
        .route("/technician/quotes", get(technician_quotes_handler))
        .route("/technician/quotes/{id}", put(edit_bill_handler))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_technician,
        ));

    let customer = Router::new()
        .route("/quotes", get(customer_quotes_handler))
        .route("/quotes/{id}/pay", post(confirm_payment_handler))
        .route("/payments", get(customer_payments_handler))
        .route("/cards", get(list_cards_handler).post(save_card_handler))
        .route("/cards/{id}/default", put(set_default_card_handler))
        .route("/cards/{id}", axum::routing::delete(delete_card_handler))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth));

    technician.merge(customer).with_state(services)
}
