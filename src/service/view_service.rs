use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use serde::Serialize;

use crate::model::device::DeviceSummary;
use crate::model::payment::Payment;
use crate::model::quote::{Quote, QuoteStatus};
use crate::model::repair_request::{RepairRequest, RepairStatus};
use crate::model::role::UserRole;
use crate::model::saved_card::SavedCard;
use crate::model::success_story::SuccessStory;
use crate::repository::device_repo::DeviceRepository;
use crate::repository::payment_repo::PaymentRepository;
use crate::repository::quote_repo::QuoteRepository;
use crate::repository::repair_request_repo::RepairRequestRepository;
use crate::repository::saved_card_repo::SavedCardRepository;
use crate::repository::success_story_repo::SuccessStoryRepository;
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;

/// Repair request joined with its device, as the customer sees it.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRequestView {
    #[serde(flatten)]
    pub request: RepairRequest,
    pub device: Option<DeviceSummary>,
    pub latest_quote: Option<Quote>,
}

/// Quote joined with its repair request, for the checkout list.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteView {
    #[serde(flatten)]
    pub quote: Quote,
    pub request_title: Option<String>,
    pub request_status: Option<RepairStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub quote: Option<Quote>,
    pub request_title: Option<String>,
    pub device: Option<DeviceSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceCounts {
    pub assigned: usize,
    pub open: usize,
    pub bills_pending: usize,
    pub bills_paid: usize,
}

/// Everything on the technician dashboard: own workload, the open pool and
/// the billing counters.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicianWorkspace {
    pub counts: WorkspaceCounts,
    pub my_requests: Vec<CustomerRequestView>,
    pub open_requests: Vec<CustomerRequestView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminRequestView {
    #[serde(flatten)]
    pub request: RepairRequest,
    pub device: Option<DeviceSummary>,
    pub customer_name: Option<String>,
    pub technician_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechnicianSummary {
    pub id: ObjectId,
    pub display_name: String,
}

#[async_trait]
pub trait ViewService: Send + Sync {
    async fn customer_requests(&self, user_id: ObjectId) -> Result<Vec<CustomerRequestView>, ServiceError>;
    async fn customer_request(&self, user_id: ObjectId, id: ObjectId) -> Result<CustomerRequestView, ServiceError>;
    async fn customer_quotes(&self, user_id: ObjectId) -> Result<Vec<QuoteView>, ServiceError>;
    async fn customer_payments(&self, user_id: ObjectId) -> Result<Vec<PaymentView>, ServiceError>;
    async fn customer_cards(&self, user_id: ObjectId) -> Result<Vec<SavedCard>, ServiceError>;

    async fn technician_workspace(&self, technician_id: ObjectId) -> Result<TechnicianWorkspace, ServiceError>;
    async fn technician_quotes(
        &self,
        technician_id: ObjectId,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<Quote>, ServiceError>;

    async fn admin_requests(&self) -> Result<Vec<AdminRequestView>, ServiceError>;
    async fn technicians(&self) -> Result<Vec<TechnicianSummary>, ServiceError>;

    async fn recent_stories(&self, limit: i64) -> Result<Vec<SuccessStory>, ServiceError>;
    async fn repair_request_count(&self) -> Result<u64, ServiceError>;
}

pub struct ViewServiceImpl {
    pub repair_repo: Arc<dyn RepairRequestRepository>,
    pub device_repo: Arc<dyn DeviceRepository>,
    pub quote_repo: Arc<dyn QuoteRepository>,
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub card_repo: Arc<dyn SavedCardRepository>,
    pub story_repo: Arc<dyn SuccessStoryRepository>,
    pub user_repo: Arc<dyn UserRepository>,
}

impl ViewServiceImpl {
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

    async fn device_map(
        &self,
        requests: &[RepairRequest],
    ) -> Result<HashMap<ObjectId, DeviceSummary>, ServiceError> {
        let ids: Vec<ObjectId> = requests.iter().map(|r| r.device_id).collect();
        let devices = self.device_repo.find_many(&ids).await?;
        Ok(devices
            .iter()
            .filter_map(|d| d.id.map(|id| (id, DeviceSummary::from(d))))
            .collect())
    }

    /// Latest quote per request, in one query.
    async fn latest_quotes(
        &self,
        requests: &[RepairRequest],
    ) -> Result<HashMap<ObjectId, Quote>, ServiceError> {
        let ids: Vec<ObjectId> = requests.iter().filter_map(|r| r.id).collect();
        let quotes = self.quote_repo.list_for_requests(&ids).await?;
        let mut latest: HashMap<ObjectId, Quote> = HashMap::new();
        // Quotes arrive newest first, so the first one per request wins.
        for quote in quotes {
            latest.entry(quote.repair_request_id).or_insert(quote);
        }
        Ok(latest)
    }

    async fn request_views(
        &self,
        requests: Vec<RepairRequest>,
    ) -> Result<Vec<CustomerRequestView>, ServiceError> {
        let devices = self.device_map(&requests).await?;
        let mut latest = self.latest_quotes(&requests).await?;
        Ok(requests
            .into_iter()
            .map(|request| {
                let device = devices.get(&request.device_id).cloned();
                let latest_quote = request.id.and_then(|id| latest.remove(&id));
                CustomerRequestView {
                    request,
                    device,
                    latest_quote,
                }
            })
            .collect())
    }
}

#[async_trait]
impl ViewService for ViewServiceImpl {
    async fn customer_requests(&self, user_id: ObjectId) -> Result<Vec<CustomerRequestView>, ServiceError> {
        let requests = self.repair_repo.list_by_user(user_id).await?;
        self.request_views(requests).await
    }

    async fn customer_request(&self, user_id: ObjectId, id: ObjectId) -> Result<CustomerRequestView, ServiceError> {
        let request = self.repair_repo.get_owned(id, user_id).await?;
        let mut views = self.request_views(vec![request]).await?;
        views
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Repair request not found: {}", id)))
    }

    async fn customer_quotes(&self, user_id: ObjectId) -> Result<Vec<QuoteView>, ServiceError> {
        let requests = self.repair_repo.list_by_user(user_id).await?;
        let by_id: HashMap<ObjectId, &RepairRequest> =
            requests.iter().filter_map(|r| r.id.map(|id| (id, r))).collect();
        let ids: Vec<ObjectId> = by_id.keys().copied().collect();
        let quotes = self.quote_repo.list_for_requests(&ids).await?;
        Ok(quotes
            .into_iter()
            .map(|quote| {
                let request = by_id.get(&quote.repair_request_id);
                QuoteView {
                    request_title: request.map(|r| r.title.clone()),
                    request_status: request.map(|r| r.status),
                    quote,
                }
            })
            .collect())
    }

    async fn customer_payments(&self, user_id: ObjectId) -> Result<Vec<PaymentView>, ServiceError> {
        let payments = self.payment_repo.list_by_user(user_id).await?;
        let requests = self.repair_repo.list_by_user(user_id).await?;
        let devices = self.device_map(&requests).await?;
        let requests_by_id: HashMap<ObjectId, &RepairRequest> =
            requests.iter().filter_map(|r| r.id.map(|id| (id, r))).collect();

        let mut views = Vec::with_capacity(payments.len());
        for payment in payments {
            let quote = self.quote_repo.get(payment.quote_id).await.ok();
            let request = quote
                .as_ref()
                .and_then(|q| requests_by_id.get(&q.repair_request_id));
            views.push(PaymentView {
                request_title: request.map(|r| r.title.clone()),
                device: request.and_then(|r| devices.get(&r.device_id).cloned()),
                quote,
                payment,
            });
        }
        Ok(views)
    }

    async fn customer_cards(&self, user_id: ObjectId) -> Result<Vec<SavedCard>, ServiceError> {
        Ok(self.card_repo.list_by_user(user_id).await?)
    }

    async fn technician_workspace(&self, technician_id: ObjectId) -> Result<TechnicianWorkspace, ServiceError> {
        let assigned = self.repair_repo.list_by_technician(technician_id).await?;
        let open = self.repair_repo.list_unassigned_pending().await?;
        let pending = self
            .quote_repo
            .list_by_technician(technician_id, &[QuoteStatus::Sent])
            .await?;
        let paid = self
            .quote_repo
            .list_by_technician(technician_id, &[QuoteStatus::Accepted])
            .await?;

        let counts = WorkspaceCounts {
            assigned: assigned.len(),
            open: open.len(),
            bills_pending: pending.len(),
            bills_paid: paid.len(),
        };
        Ok(TechnicianWorkspace {
            counts,
            my_requests: self.request_views(assigned).await?,
            open_requests: self.request_views(open).await?,
        })
    }

    async fn technician_quotes(
        &self,
        technician_id: ObjectId,
        status: Option<QuoteStatus>,
    ) -> Result<Vec<Quote>, ServiceError> {
        let statuses: Vec<QuoteStatus> = match status {
            Some(status) => vec![status],
            None => vec![QuoteStatus::Sent, QuoteStatus::Accepted],
        };
        Ok(self
            .quote_repo
            .list_by_technician(technician_id, &statuses)
            .await?)
    }

    async fn admin_requests(&self) -> Result<Vec<AdminRequestView>, ServiceError> {
        let requests = self.repair_repo.list_all().await?;
        let devices = self.device_map(&requests).await?;

        let mut user_ids: Vec<ObjectId> = requests.iter().map(|r| r.user_id).collect();
        user_ids.extend(requests.iter().filter_map(|r| r.assigned_technician_id));
        let mut seen = std::collections::HashSet::new();
        user_ids.retain(|id| seen.insert(*id));
        let names: HashMap<ObjectId, String> = self
            .user_repo
            .find_many(&user_ids)
            .await?
            .iter()
            .filter_map(|u| u.id.map(|id| (id, u.display_name())))
            .collect();

        Ok(requests
            .into_iter()
            .map(|request| AdminRequestView {
                device: devices.get(&request.device_id).cloned(),
                customer_name: names.get(&request.user_id).cloned(),
                technician_name: request
                    .assigned_technician_id
                    .and_then(|id| names.get(&id).cloned()),
                request,
            })
            .collect())
    }

    async fn technicians(&self) -> Result<Vec<TechnicianSummary>, ServiceError> {
        let technicians = self.user_repo.list_by_role(UserRole::Technician).await?;
        Ok(technicians
            .into_iter()
            .filter_map(|user| {
                user.id.map(|id| TechnicianSummary {
                    id,
                    display_name: user.display_name(),
                })
            })
            .collect())
    }

    async fn recent_stories(&self, limit: i64) -> Result<Vec<SuccessStory>, ServiceError> {
        Ok(self.story_repo.list_recent(limit).await?)
    }

    async fn repair_request_count(&self) -> Result<u64, ServiceError> {
        Ok(self.repair_repo.count().await?)
    }
}
