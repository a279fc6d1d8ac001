use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::dto::billing_dto::{
    ConfirmPaymentDto, EditBillDto, IssueBillDto, PaymentMethodKind, SaveCardDto,
};
use crate::handler::repair_handler::{actor, parse_object_id};
use crate::middlewares::auth_middleware::AuthUser;
use crate::model::quote::{LineItem, QuoteStatus};
use crate::service::lifecycle_service::{CardDetails, LifecycleService, PaymentMethod};
use crate::service::view_service::ViewService;
use crate::service::Services;
use crate::util::error::HandlerError;

fn to_line_items(items: Vec<crate::dto::billing_dto::LineItemDto>) -> Vec<LineItem> {
    items
        .into_iter()
        .map(|item| LineItem {
            description: item.description,
            amount: item.amount,
        })
        .collect()
}

/// `POST /technician/repair-requests/{id}/bill` — marks the repair done and
/// issues the bill in one step.
pub async fn issue_bill_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<IssueBillDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "repair request")?;
    let quote = services
        .lifecycle
        .issue_bill(actor(user), id, to_line_items(payload.items), payload.notes)
        .await
        .map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(quote)))
}

/// `PUT /technician/quotes/{id}` — edit a still-unpaid bill.
pub async fn edit_bill_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<EditBillDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quote")?;
    let quote = services
        .lifecycle
        .edit_bill(actor(user), id, to_line_items(payload.items), payload.notes)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(quote))
}

/// `GET /technician/quotes?status=sent|accepted`
pub async fn technician_quotes_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, HandlerError> {
    let status = match params.get("status").map(String::as_str) {
        None => None,
        Some("sent") => Some(QuoteStatus::Sent),
        Some("accepted") => Some(QuoteStatus::Accepted),
        Some(other) => {
            return Err(HandlerError::bad_request(format!("Unknown quote status: {}", other)))
        }
    };
    let quotes = services
        .views
        .technician_quotes(user.id, status)
        .await
        .map_err(HandlerError::from)?;
    Ok(Json(quotes))
}

/// `GET /quotes` — the caller's quotes with request context.
pub async fn customer_quotes_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let quotes = services.views.customer_quotes(user.id).await.map_err(HandlerError::from)?;
    Ok(Json(quotes))
}

/// `POST /quotes/{id}/pay` — simulated checkout confirmation.
pub async fn confirm_payment_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
    Json(payload): Json<ConfirmPaymentDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "quote")?;
    let saved_card_id = payload
        .saved_card_id
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| parse_object_id(s, "saved card"))
        .transpose()?;
    let method = match payload.method {
        PaymentMethodKind::Card => PaymentMethod::Card {
            saved_card_id,
            details: payload.card.map(|card| CardDetails {
                card_number: card.card_number,
                card_holder_name: card.card_holder_name,
                expiry: card.expiry,
                cvv: card.cvv,
            }),
            save_card: payload.save_card,
        },
        PaymentMethodKind::Upi => PaymentMethod::Upi {
            upi_id: payload.upi_id.unwrap_or_default(),
        },
        PaymentMethodKind::Netbanking => PaymentMethod::NetBanking,
        PaymentMethodKind::Wallet => PaymentMethod::Wallet,
    };
    let payment = services
        .lifecycle
        .confirm_payment(actor(user), id, payload.amount, payload.currency, method)
        .await
        .map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// `GET /payments` — the caller's payment history.
pub async fn customer_payments_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let payments = services.views.customer_payments(user.id).await.map_err(HandlerError::from)?;
    Ok(Json(payments))
}

/// `GET /cards` — default card first.
pub async fn list_cards_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HandlerError> {
    let cards = services.views.customer_cards(user.id).await.map_err(HandlerError::from)?;
    Ok(Json(cards))
}

/// `POST /cards`
pub async fn save_card_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SaveCardDto>,
) -> Result<impl IntoResponse, HandlerError> {
    let card = services
        .lifecycle
        .save_card(
            actor(user),
            CardDetails {
                card_number: payload.card_number,
                card_holder_name: payload.card_holder_name,
                expiry: payload.expiry,
                cvv: String::new(),
            },
        )
        .await
        .map_err(HandlerError::from)?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// `PUT /cards/{id}/default`
pub async fn set_default_card_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "saved card")?;
    services
        .lifecycle
        .set_default_card(actor(user), id)
        .await
        .map_err(HandlerError::from)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /cards/{id}`
pub async fn delete_card_handler(
    State(services): State<Arc<Services>>,
    Extension(user): Extension<AuthUser>,
    Path((id,)): Path<(String,)>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = parse_object_id(&id, "saved card")?;
    services
        .lifecycle
        .delete_card(actor(user), id)
        .await
        .map_err(HandlerError::from)?;
    Ok(StatusCode::NO_CONTENT)
}
