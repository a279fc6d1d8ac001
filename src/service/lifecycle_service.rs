use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tracing::{info, instrument, warn};

use crate::model::device::{Device, DeviceSummary};
use crate::model::payment::{Payment, PaymentStatus};
use crate::model::quote::{Breakdown, LineItem, Quote, QuoteStatus, QUOTE_CURRENCY};
use crate::model::repair_request::{RepairRequest, RepairStatus, Urgency};
use crate::model::role::{Action, UserRole};
use crate::model::saved_card::{CardBrand, SavedCard};
use crate::model::success_story::SuccessStory;
use crate::repository::device_repo::DeviceRepository;
use crate::repository::payment_repo::PaymentRepository;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::repair_request_repo::{AdminDecision, RepairRequestRepository};
use crate::repository::repository_error::RepositoryError;
use crate::repository::saved_card_repo::SavedCardRepository;
use crate::repository::success_story_repo::SuccessStoryRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;

/// Authenticated caller of a lifecycle operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: ObjectId,
    pub role: UserRole,
}

/// Input of the public create-request endpoint; the device row and the
/// request row are created together.
#[derive(Debug, Clone)]
pub struct NewRepairRequest {
    pub user_id: ObjectId,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub issue_description: String,
    pub urgency: Urgency,
}

/// Created request together with the device it was filed for.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CreatedRepairRequest {
    #[serde(flatten)]
    pub request: RepairRequest,
    pub device: DeviceSummary,
}

#[derive(Debug, Clone)]
pub struct CardDetails {
    pub card_number: String,
    pub card_holder_name: String,
    /// MM/YY
    pub expiry: String,
    pub cvv: String,
}

#[derive(Debug, Clone)]
pub enum PaymentMethod {
    Card {
        saved_card_id: Option<ObjectId>,
        details: Option<CardDetails>,
        save_card: bool,
    },
    Upi {
        upi_id: String,
    },
    NetBanking,
    Wallet,
}

#[async_trait]
pub trait LifecycleService: Send + Sync {
    async fn create_request(&self, input: NewRepairRequest) -> Result<CreatedRepairRequest, ServiceError>;
    async fn update_request(
        &self,
        user_id: ObjectId,
        id: ObjectId,
        description: Option<String>,
        urgency: Option<Urgency>,
    ) -> Result<RepairRequest, ServiceError>;
    async fn delete_request(&self, user_id: ObjectId, id: ObjectId) -> Result<(), ServiceError>;

    async fn approve_request(
        &self,
        actor: Actor,
        id: ObjectId,
        admin_notes: Option<String>,
        technician_id: Option<ObjectId>,
    ) -> Result<RepairRequest, ServiceError>;
    async fn reject_request(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError>;

    async fn claim_request(&self, actor: Actor, id: ObjectId) -> Result<RepairRequest, ServiceError>;
    async fn technician_accept(&self, actor: Actor, id: ObjectId, notes: Option<String>) -> Result<RepairRequest, ServiceError>;
    async fn technician_reject(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError>;
    async fn technician_cancel(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError>;

    async fn issue_bill(
        &self,
        actor: Actor,
        request_id: ObjectId,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Quote, ServiceError>;
    async fn edit_bill(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Quote, ServiceError>;

    async fn confirm_payment(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        amount: f64,
        currency: String,
        method: PaymentMethod,
    ) -> Result<Payment, ServiceError>;

    async fn save_card(&self, actor: Actor, details: CardDetails) -> Result<SavedCard, ServiceError>;
    async fn set_default_card(&self, actor: Actor, card_id: ObjectId) -> Result<(), ServiceError>;
    async fn delete_card(&self, actor: Actor, card_id: ObjectId) -> Result<(), ServiceError>;

    async fn add_story(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        rating: u8,
        story: String,
        image_url: Option<String>,
    ) -> Result<SuccessStory, ServiceError>;
}

pub struct LifecycleServiceImpl {
    pub repair_repo: Arc<dyn RepairRequestRepository>,
    pub device_repo: Arc<dyn DeviceRepository>,
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub card_repo: Arc<dyn SavedCardRepository>,
    pub story_repo: Arc<dyn SuccessStoryRepository>,
    pub user_repo: Arc<dyn UserRepository>,
}

impl LifecycleServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repair_repo: Arc<dyn RepairRequestRepository>,
        device_repo: Arc<dyn DeviceRepository>,
        quote_repo: Arc<dyn QuoteRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        card_repo: Arc<dyn SavedCardRepository>,
        story_repo: Arc<dyn SuccessStoryRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            repair_repo,
            device_repo,
            quote_repo,
            payment_repo,
            card_repo,
            story_repo,
            user_repo,
        }
    }

    fn ensure_permitted(&self, actor: Actor, action: Action) -> Result<(), ServiceError> {
        if actor.role.permits(action) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Role {} may not perform this action",
                actor.role
            )))
        }
    }

    fn require_reason(reason: &str) -> Result<String, ServiceError> {
        let trimmed = reason.trim();
        if trimmed.is_empty() {
            Err(ServiceError::Validation("A reason is required".to_string()))
        } else {
            Ok(trimmed.to_string())
        }
    }

    fn validate_breakdown(
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<(Breakdown, f64), ServiceError> {
        Breakdown::from_items(items, notes).ok_or_else(|| {
            ServiceError::Validation(
                "Provide at least one line item with a description and a positive amount"
                    .to_string(),
            )
        })
    }

    fn validate_card_details(details: &CardDetails) -> Result<(), ServiceError> {
        let digits: String = details.card_number.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::Validation(
                "Card number must be 16 digits".to_string(),
            ));
        }
        if details.card_holder_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Cardholder name is required".to_string(),
            ));
        }
        if !Self::is_valid_expiry(&details.expiry) {
            return Err(ServiceError::Validation(
                "Card expiry must be MM/YY".to_string(),
            ));
        }
        if details.cvv.len() < 3 || !details.cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::Validation("CVV is invalid".to_string()));
        }
        Ok(())
    }

    fn is_valid_expiry(expiry: &str) -> bool {
        let parts: Vec<&str> = expiry.split('/').collect();
        parts.len() == 2
            && parts
                .iter()
                .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit()))
    }

    async fn validate_payment_method(
        &self,
        actor: Actor,
        method: &PaymentMethod,
    ) -> Result<(), ServiceError> {
        match method {
            PaymentMethod::Card {
                saved_card_id: Some(card_id),
                ..
            } => {
                // Paying with a stored card: it must belong to the actor.
                self.card_repo.get_owned(*card_id, actor.id).await?;
                Ok(())
            }
            PaymentMethod::Card {
                saved_card_id: None,
                details: Some(details),
                ..
            } => Self::validate_card_details(details),
            PaymentMethod::Card {
                saved_card_id: None,
                details: None,
                ..
            } => Err(ServiceError::Validation(
                "Card details or a saved card are required".to_string(),
            )),
            PaymentMethod::Upi { upi_id } => {
                if upi_id.contains('@') {
                    Ok(())
                } else {
                    Err(ServiceError::Validation("UPI id is invalid".to_string()))
                }
            }
            PaymentMethod::NetBanking | PaymentMethod::Wallet => Ok(()),
        }
    }

    fn card_from_details(user_id: ObjectId, details: &CardDetails) -> SavedCard {
        let digits: String = details.card_number.chars().filter(|c| !c.is_whitespace()).collect();
        let last4 = digits.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        let (month, year) = details
            .expiry
            .split_once('/')
            .unwrap_or(("", ""));
        SavedCard {
            id: None,
            user_id,
            card_last4: last4,
            card_brand: CardBrand::detect(&digits),
            card_holder_name: details.card_holder_name.trim().to_string(),
            expiry_month: month.to_string(),
            expiry_year: year.to_string(),
            is_default: false,
            created_at: None,
        }
    }
}

#[async_trait]
impl LifecycleService for LifecycleServiceImpl {
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    async fn create_request(&self, input: NewRepairRequest) -> Result<CreatedRepairRequest, ServiceError> {
        if input.device_type.trim().is_empty() {
            return Err(ServiceError::Validation("Device type is required".to_string()));
        }
        if input.issue_description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Issue description is required".to_string(),
            ));
        }

        let device = self
            .device_repo
            .create(Device {
                id: None,
                user_id: input.user_id,
                device_type: input.device_type.clone(),
                brand: input.brand.clone(),
                model: input.model.clone(),
                created_at: None,
            })
            .await?;
        let device_id = device
            .id
            .ok_or_else(|| ServiceError::Upstream("Device id missing after insert".to_string()))?;

        let request = self
            .repair_repo
            .create(RepairRequest {
                id: None,
                user_id: input.user_id,
                device_id,
                title: RepairRequest::derive_title(&input.device_type, &input.issue_description),
                description: input.issue_description,
                status: RepairStatus::Pending,
                urgency: input.urgency,
                assigned_technician_id: None,
                admin_notes: None,
                technician_notes: None,
                created_at: None,
                updated_at: None,
            })
            .await?;

        info!(request_id = ?request.id, "Repair request filed");
        Ok(CreatedRepairRequest {
            request,
            device: DeviceSummary::from(&device),
        })
    }

    async fn update_request(
        &self,
        user_id: ObjectId,
        id: ObjectId,
        description: Option<String>,
        urgency: Option<Urgency>,
    ) -> Result<RepairRequest, ServiceError> {
        if let Some(ref description) = description {
            if description.trim().is_empty() {
                return Err(ServiceError::Validation(
                    "Issue description cannot be empty".to_string(),
                ));
            }
        }
        Ok(self
            .repair_repo
            .update_details(id, user_id, description, urgency)
            .await?)
    }

    async fn delete_request(&self, user_id: ObjectId, id: ObjectId) -> Result<(), ServiceError> {
        Ok(self.repair_repo.delete_pending(id, user_id).await?)
    }

    #[instrument(skip(self, admin_notes), fields(id = %id))]
    async fn approve_request(
        &self,
        actor: Actor,
        id: ObjectId,
        admin_notes: Option<String>,
        technician_id: Option<ObjectId>,
    ) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::ApproveRequest)?;
        if let Some(technician_id) = technician_id {
            let technician = self
                .user_repo
                .find_by_id(&technician_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Technician not found".to_string()))?;
            if technician.role != UserRole::Technician {
                return Err(ServiceError::Validation(
                    "Assigned user is not a technician".to_string(),
                ));
            }
        }
        let request = self
            .repair_repo
            .apply_admin_decision(
                id,
                RepairStatus::ADMIN_DECIDABLE,
                AdminDecision {
                    status: RepairStatus::Approved,
                    admin_notes: admin_notes.filter(|n| !n.trim().is_empty()),
                    technician_id,
                },
            )
            .await?;
        info!(status = %request.status, "Repair request approved");
        Ok(request)
    }

    #[instrument(skip(self, reason), fields(id = %id))]
    async fn reject_request(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::RejectRequest)?;
        let reason = Self::require_reason(&reason)?;
        Ok(self
            .repair_repo
            .apply_admin_decision(
                id,
                &[RepairStatus::Pending],
                AdminDecision {
                    status: RepairStatus::Rejected,
                    admin_notes: Some(reason),
                    technician_id: None,
                },
            )
            .await?)
    }

    #[instrument(skip(self), fields(id = %id, technician = %actor.id))]
    async fn claim_request(&self, actor: Actor, id: ObjectId) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::ClaimRequest)?;
        match self.repair_repo.claim(id, actor.id).await {
            Ok(request) => Ok(request),
            Err(RepositoryError::AlreadyExists(msg)) => Err(ServiceError::ClaimConflict(msg)),
            Err(err) => Err(err.into()),
        }
    }

    async fn technician_accept(&self, actor: Actor, id: ObjectId, notes: Option<String>) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::AcceptAssignment)?;
        Ok(self
            .repair_repo
            .apply_technician_decision(
                id,
                actor.id,
                RepairStatus::TECHNICIAN_DECIDABLE,
                RepairStatus::Accepted,
                notes.filter(|n| !n.trim().is_empty()),
            )
            .await?)
    }

    async fn technician_reject(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::DeclineAssignment)?;
        let reason = Self::require_reason(&reason)?;
        Ok(self
            .repair_repo
            .apply_technician_decision(
                id,
                actor.id,
                RepairStatus::TECHNICIAN_DECIDABLE,
                RepairStatus::TechnicianRejected,
                Some(reason),
            )
            .await?)
    }

    async fn technician_cancel(&self, actor: Actor, id: ObjectId, reason: String) -> Result<RepairRequest, ServiceError> {
        self.ensure_permitted(actor, Action::CancelRepair)?;
        let reason = Self::require_reason(&reason)?;
        Ok(self
            .repair_repo
            .apply_technician_decision(
                id,
                actor.id,
                RepairStatus::IN_REPAIR,
                RepairStatus::Cancelled,
                Some(reason),
            )
            .await?)
    }

    #[instrument(skip(self, items, notes), fields(request_id = %request_id))]
    async fn issue_bill(
        &self,
        actor: Actor,
        request_id: ObjectId,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Quote, ServiceError> {
        self.ensure_permitted(actor, Action::IssueBill)?;
        let (breakdown, total) = Self::validate_breakdown(items, notes)?;
        let quote = self
            .quote_repo
            .issue(Quote {
                id: None,
                repair_request_id: request_id,
                technician_id: actor.id,
                amount: total,
                currency: QUOTE_CURRENCY.to_string(),
                breakdown,
                status: QuoteStatus::Sent,
                created_at: None,
                updated_at: None,
            })
            .await?;
        info!(quote_id = ?quote.id, amount = quote.amount, "Bill issued");
        Ok(quote)
    }

    #[instrument(skip(self, items, notes), fields(quote_id = %quote_id))]
    async fn edit_bill(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Quote, ServiceError> {
        self.ensure_permitted(actor, Action::EditBill)?;
        let (breakdown, total) = Self::validate_breakdown(items, notes)?;
        Ok(self
            .quote_repo
            .update_if_sent(quote_id, actor.id, total, breakdown)
            .await?)
    }

    #[instrument(skip(self, method), fields(quote_id = %quote_id, user_id = %actor.id))]
    async fn confirm_payment(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        amount: f64,
        currency: String,
        method: PaymentMethod,
    ) -> Result<Payment, ServiceError> {
        self.ensure_permitted(actor, Action::ConfirmPayment)?;
        self.validate_payment_method(actor, &method).await?;

        let quote = self.quote_repo.get(quote_id).await?;
        if quote.status != QuoteStatus::Sent {
            return Err(ServiceError::InvalidState(format!(
                "Quote {} is {}, only sent quotes can be paid",
                quote_id, quote.status
            )));
        }
        if amount != quote.amount {
            return Err(ServiceError::Validation(format!(
                "Payment amount {} does not match quote amount {}",
                amount, quote.amount
            )));
        }
        if currency != quote.currency {
            return Err(ServiceError::Validation(format!(
                "Payment currency {} does not match quote currency {}",
                currency, quote.currency
            )));
        }

        // Card storage is best-effort: a failure here never blocks the charge.
        if let PaymentMethod::Card {
            saved_card_id: None,
            details: Some(ref details),
            save_card: true,
        } = method
        {
            if let Err(e) = self
                .card_repo
                .create(Self::card_from_details(actor.id, details))
                .await
            {
                warn!("Failed to save card during checkout: {}", e);
            }
        }

        let payment = self
            .payment_repo
            .record(Payment {
                id: None,
                user_id: actor.id,
                quote_id,
                amount: quote.amount,
                currency: quote.currency.clone(),
                status: PaymentStatus::Succeeded,
                created_at: None,
            })
            .await
            .map_err(|err| match err {
                RepositoryError::DatabaseError(msg) | RepositoryError::ConnectionError(msg) => {
                    ServiceError::Upstream(format!("Payment failed: {}", msg))
                }
                other => ServiceError::from(other),
            })?;
        info!(payment_id = ?payment.id, "Payment confirmed, quote accepted");
        Ok(payment)
    }

    async fn save_card(&self, actor: Actor, details: CardDetails) -> Result<SavedCard, ServiceError> {
        self.ensure_permitted(actor, Action::ManageCards)?;
        // CVV is checkout-only and never stored, so it is not validated here.
        let digits: String = details.card_number.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ServiceError::Validation(
                "Card number must be 16 digits".to_string(),
            ));
        }
        if details.card_holder_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Cardholder name is required".to_string(),
            ));
        }
        if !Self::is_valid_expiry(&details.expiry) {
            return Err(ServiceError::Validation(
                "Card expiry must be MM/YY".to_string(),
            ));
        }
        Ok(self
            .card_repo
            .create(Self::card_from_details(actor.id, &details))
            .await?)
    }

    async fn set_default_card(&self, actor: Actor, card_id: ObjectId) -> Result<(), ServiceError> {
        self.ensure_permitted(actor, Action::ManageCards)?;
        Ok(self.card_repo.set_default(actor.id, card_id).await?)
    }

    async fn delete_card(&self, actor: Actor, card_id: ObjectId) -> Result<(), ServiceError> {
        self.ensure_permitted(actor, Action::ManageCards)?;
        Ok(self.card_repo.delete(card_id, actor.id).await?)
    }

    async fn add_story(
        &self,
        actor: Actor,
        quote_id: ObjectId,
        rating: u8,
        story: String,
        image_url: Option<String>,
    ) -> Result<SuccessStory, ServiceError> {
        self.ensure_permitted(actor, Action::SubmitStory)?;
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        if story.trim().is_empty() {
            return Err(ServiceError::Validation("Story text is required".to_string()));
        }
        // Stories hang off a quote the customer actually paid.
        self.quote_repo.get(quote_id).await?;
        Ok(self
            .story_repo
            .create(SuccessStory {
                id: None,
                user_id: actor.id,
                quote_id,
                rating,
                story: story.trim().to_string(),
                image_url,
                created_at: None,
            })
            .await?)
    }
}
