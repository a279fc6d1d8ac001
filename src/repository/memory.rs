//! In-memory implementation of the repository traits.
//!
//! All tables live behind a single `RwLock`; composite operations hold the
//! write guard for their whole span, which gives them the same atomicity
//! the Mongo implementations get from transactions. State is lost on
//! restart. Used by the deterministic test suite.

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::model::device::Device;
use crate::model::payment::Payment;
use crate::model::quote::{Breakdown, Quote, QuoteStatus};
use crate::model::repair_request::{RepairRequest, RepairStatus, Urgency};
use crate::model::role::UserRole;
use crate::model::saved_card::SavedCard;
use crate::model::success_story::SuccessStory;
use crate::model::user::User;
use crate::repository::device_repo::DeviceRepository;
use crate::repository::payment_repo::PaymentRepository;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::repair_request_repo::{AdminDecision, RepairRequestRepository};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::saved_card_repo::SavedCardRepository;
use crate::repository::success_story_repo::SuccessStoryRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::time::now_rfc3339;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    devices: Vec<Device>,
    requests: Vec<RepairRequest>,
    quotes: Vec<Quote>,
    payments: Vec<Payment>,
    cards: Vec<SavedCard>,
    stories: Vec<SuccessStory>,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Insertion order is chronological, so newest-first is a reverse scan.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::already_exists(format!(
                "User already exists for email: {}",
                user.email
            )));
        }
        user.id = Some(ObjectId::new());
        let now = now_rfc3339();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id.as_ref() == Some(id)).cloned())
    }

    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.id.map(|id| ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn list_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().filter(|u| u.role == role).cloned().collect())
    }
}

#[async_trait]
impl DeviceRepository for MemoryStore {
    async fn create(&self, mut device: Device) -> RepositoryResult<Device> {
        let mut tables = self.tables.write().await;
        device.id = Some(ObjectId::new());
        device.created_at = Some(now_rfc3339());
        tables.devices.push(device.clone());
        Ok(device)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Device>> {
        let tables = self.tables.read().await;
        Ok(tables
            .devices
            .iter()
            .filter(|d| d.id.map(|id| ids.contains(&id)).unwrap_or(false))
            .cloned()
            .collect())
    }
}

fn invalid_transition(id: ObjectId, status: RepairStatus) -> RepositoryError {
    RepositoryError::invalid_state(format!(
        "Repair request {} is {}, transition not allowed",
        id, status
    ))
}

#[async_trait]
impl RepairRequestRepository for MemoryStore {
    async fn create(&self, mut request: RepairRequest) -> RepositoryResult<RepairRequest> {
        let mut tables = self.tables.write().await;
        request.id = Some(ObjectId::new());
        let now = now_rfc3339();
        request.created_at = Some(now.clone());
        request.updated_at = Some(now);
        tables.requests.push(request.clone());
        Ok(request)
    }

    async fn get(&self, id: ObjectId) -> RepositoryResult<RepairRequest> {
        let tables = self.tables.read().await;
        tables
            .requests
            .iter()
            .find(|r| r.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))
    }

    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<RepairRequest> {
        let tables = self.tables.read().await;
        tables
            .requests
            .iter()
            .find(|r| r.id == Some(id) && r.user_id == user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.requests.iter().filter(|r| r.user_id == user_id).cloned(),
        ))
    }

    async fn list_unassigned_pending(&self) -> RepositoryResult<Vec<RepairRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.requests.iter().filter(|r| {
            r.status == RepairStatus::Pending && r.assigned_technician_id.is_none()
        }).cloned()))
    }

    async fn list_by_technician(&self, technician_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .requests
                .iter()
                .filter(|r| r.assigned_technician_id == Some(technician_id))
                .cloned(),
        ))
    }

    async fn list_all(&self) -> RepositoryResult<Vec<RepairRequest>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.requests.iter().cloned()))
    }

    async fn count(&self) -> RepositoryResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.requests.len() as u64)
    }

    async fn update_details(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        description: Option<String>,
        urgency: Option<Urgency>,
    ) -> RepositoryResult<RepairRequest> {
        let mut tables = self.tables.write().await;
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == Some(id) && r.user_id == user_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))?;
        if request.status != RepairStatus::Pending {
            return Err(invalid_transition(id, request.status));
        }
        if let Some(description) = description {
            request.description = description;
        }
        if let Some(urgency) = urgency {
            request.urgency = urgency;
        }
        request.updated_at = Some(now_rfc3339());
        Ok(request.clone())
    }

    async fn delete_pending(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let position = tables
            .requests
            .iter()
            .position(|r| r.id == Some(id) && r.user_id == user_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))?;
        if tables.requests[position].status != RepairStatus::Pending {
            return Err(invalid_transition(id, tables.requests[position].status));
        }
        tables.requests.remove(position);
        Ok(())
    }

    async fn apply_admin_decision(
        &self,
        id: ObjectId,
        from: &'static [RepairStatus],
        decision: AdminDecision,
    ) -> RepositoryResult<RepairRequest> {
        let mut tables = self.tables.write().await;
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))?;
        if !from.contains(&request.status) {
            return Err(invalid_transition(id, request.status));
        }
        request.status = decision.status;
        request.admin_notes = decision.admin_notes;
        if let Some(technician_id) = decision.technician_id {
            request.assigned_technician_id = Some(technician_id);
        }
        request.updated_at = Some(now_rfc3339());
        Ok(request.clone())
    }

    async fn claim(&self, id: ObjectId, technician_id: ObjectId) -> RepositoryResult<RepairRequest> {
        let mut tables = self.tables.write().await;
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))?;
        if request.status != RepairStatus::Pending || request.assigned_technician_id.is_some() {
            return Err(RepositoryError::already_exists(format!(
                "Repair request {} is already assigned or no longer pending",
                id
            )));
        }
        request.assigned_technician_id = Some(technician_id);
        request.updated_at = Some(now_rfc3339());
        Ok(request.clone())
    }

    async fn apply_technician_decision(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        from: &'static [RepairStatus],
        to: RepairStatus,
        notes: Option<String>,
    ) -> RepositoryResult<RepairRequest> {
        let mut tables = self.tables.write().await;
        let request = tables
            .requests
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))?;
        if request.assigned_technician_id != Some(technician_id) {
            return Err(RepositoryError::not_found(format!(
                "Repair request not found: {}",
                id
            )));
        }
        if !from.contains(&request.status) {
            return Err(invalid_transition(id, request.status));
        }
        request.status = to;
        request.technician_notes = notes;
        request.updated_at = Some(now_rfc3339());
        Ok(request.clone())
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn issue(&self, mut quote: Quote) -> RepositoryResult<Quote> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;
        let billable = tables.requests.iter_mut().find(|r| {
            r.id == Some(quote.repair_request_id)
                && r.assigned_technician_id == Some(quote.technician_id)
                && RepairStatus::IN_REPAIR.contains(&r.status)
        });
        let request = billable.ok_or_else(|| {
            RepositoryError::invalid_state(format!(
                "Repair request {} is not billable by this technician",
                quote.repair_request_id
            ))
        })?;
        let now = now_rfc3339();
        request.status = RepairStatus::Completed;
        request.updated_at = Some(now.clone());
        quote.id = Some(ObjectId::new());
        quote.created_at = Some(now.clone());
        quote.updated_at = Some(now);
        tables.quotes.push(quote.clone());
        Ok(quote)
    }

    async fn get(&self, id: ObjectId) -> RepositoryResult<Quote> {
        let tables = self.tables.read().await;
        tables
            .quotes
            .iter()
            .find(|q| q.id == Some(id))
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", id)))
    }

    async fn update_if_sent(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        amount: f64,
        breakdown: Breakdown,
    ) -> RepositoryResult<Quote> {
        let mut tables = self.tables.write().await;
        let quote = tables
            .quotes
            .iter_mut()
            .find(|q| q.id == Some(id) && q.technician_id == technician_id)
            .ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", id)))?;
        if quote.status != QuoteStatus::Sent {
            return Err(RepositoryError::invalid_state(format!(
                "Quote {} is {}, edits are only allowed while sent",
                id, quote.status
            )));
        }
        quote.amount = amount;
        quote.breakdown = breakdown;
        quote.updated_at = Some(now_rfc3339());
        Ok(quote.clone())
    }

    async fn list_by_technician(
        &self,
        technician_id: ObjectId,
        statuses: &[QuoteStatus],
    ) -> RepositoryResult<Vec<Quote>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.quotes.iter().filter(|q| {
            q.technician_id == technician_id && statuses.contains(&q.status)
        }).cloned()))
    }

    async fn list_for_requests(&self, request_ids: &[ObjectId]) -> RepositoryResult<Vec<Quote>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .quotes
                .iter()
                .filter(|q| request_ids.contains(&q.repair_request_id))
                .cloned(),
        ))
    }

    async fn latest_for_request(&self, request_id: ObjectId) -> RepositoryResult<Option<Quote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quotes
            .iter()
            .rev()
            .find(|q| q.repair_request_id == request_id)
            .cloned())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record(&self, mut payment: Payment) -> RepositoryResult<Payment> {
        let mut tables = self.tables.write().await;
        let tables = &mut *tables;
        let quote = tables
            .quotes
            .iter_mut()
            .find(|q| q.id == Some(payment.quote_id))
            .ok_or_else(|| {
                RepositoryError::not_found(format!("Quote not found: {}", payment.quote_id))
            })?;
        if quote.status != QuoteStatus::Sent {
            return Err(RepositoryError::invalid_state(format!(
                "Quote {} is {}, only sent quotes can be paid",
                payment.quote_id, quote.status
            )));
        }
        let now = now_rfc3339();
        quote.status = QuoteStatus::Accepted;
        quote.updated_at = Some(now.clone());
        payment.id = Some(ObjectId::new());
        payment.created_at = Some(now);
        tables.payments.push(payment.clone());
        Ok(payment)
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.payments.iter().filter(|p| p.user_id == user_id).cloned(),
        ))
    }

    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments.iter().find(|p| p.quote_id == quote_id).cloned())
    }
}

#[async_trait]
impl SavedCardRepository for MemoryStore {
    async fn create(&self, mut card: SavedCard) -> RepositoryResult<SavedCard> {
        let mut tables = self.tables.write().await;
        card.id = Some(ObjectId::new());
        card.created_at = Some(now_rfc3339());
        card.is_default = !tables.cards.iter().any(|c| c.user_id == card.user_id);
        tables.cards.push(card.clone());
        Ok(card)
    }

    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<SavedCard> {
        let tables = self.tables.read().await;
        tables
            .cards
            .iter()
            .find(|c| c.id == Some(id) && c.user_id == user_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found(format!("Saved card not found: {}", id)))
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<SavedCard>> {
        let tables = self.tables.read().await;
        let mut cards: Vec<SavedCard> = newest_first(
            tables.cards.iter().filter(|c| c.user_id == user_id).cloned(),
        );
        cards.sort_by_key(|c| !c.is_default);
        Ok(cards)
    }

    async fn set_default(&self, user_id: ObjectId, card_id: ObjectId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        if !tables
            .cards
            .iter()
            .any(|c| c.id == Some(card_id) && c.user_id == user_id)
        {
            return Err(RepositoryError::not_found(format!(
                "Saved card not found: {}",
                card_id
            )));
        }
        for card in tables.cards.iter_mut().filter(|c| c.user_id == user_id) {
            card.is_default = card.id == Some(card_id);
        }
        Ok(())
    }

    async fn delete(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()> {
        let mut tables = self.tables.write().await;
        let before = tables.cards.len();
        tables.cards.retain(|c| !(c.id == Some(id) && c.user_id == user_id));
        if tables.cards.len() < before {
            Ok(())
        } else {
            Err(RepositoryError::not_found(format!("Saved card not found: {}", id)))
        }
    }
}

#[async_trait]
impl SuccessStoryRepository for MemoryStore {
    async fn create(&self, mut story: SuccessStory) -> RepositoryResult<SuccessStory> {
        let mut tables = self.tables.write().await;
        story.id = Some(ObjectId::new());
        story.created_at = Some(now_rfc3339());
        tables.stories.push(story.clone());
        Ok(story)
    }

    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<SuccessStory>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.stories.iter().cloned())
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }
}
