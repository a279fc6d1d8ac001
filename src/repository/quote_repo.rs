use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use tracing::{error, info};

use crate::model::quote::{Breakdown, Quote, QuoteStatus};
use crate::model::repair_request::{RepairRequest, RepairStatus};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    /// Inserts the quote (`sent`) and flips the parent request to
    /// `completed` as one transactional unit. The request must be in repair
    /// (`accepted`/`in_progress`) and assigned to the issuing technician;
    /// otherwise nothing is written.
    async fn issue(&self, quote: Quote) -> RepositoryResult<Quote>;

    async fn get(&self, id: ObjectId) -> RepositoryResult<Quote>;

    /// Overwrites amount/breakdown; conditional on status `sent` and the
    /// issuing technician.
    async fn update_if_sent(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        amount: f64,
        breakdown: Breakdown,
    ) -> RepositoryResult<Quote>;

    async fn list_by_technician(
        &self,
        technician_id: ObjectId,
        statuses: &[QuoteStatus],
    ) -> RepositoryResult<Vec<Quote>>;

    /// Quotes attached to any of the given repair requests, newest first.
    async fn list_for_requests(&self, request_ids: &[ObjectId]) -> RepositoryResult<Vec<Quote>>;

    async fn latest_for_request(&self, request_id: ObjectId) -> RepositoryResult<Option<Quote>>;
}

pub struct MongoQuoteRepository {
    store: MongoStore,
    collection: mongodb::Collection<Quote>,
    requests: mongodb::Collection<RepairRequest>,
}

impl MongoQuoteRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoQuoteRepository {
            store: store.clone(),
            collection: store.collection(collections::QUOTES),
            requests: store.collection(collections::REPAIR_REQUESTS),
        }
    }

    fn newest_first() -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build()
    }
}

#[async_trait]
impl QuoteRepository for MongoQuoteRepository {
    #[tracing::instrument(skip(self, quote), fields(request_id = %quote.repair_request_id))]
    async fn issue(&self, mut quote: Quote) -> RepositoryResult<Quote> {
        quote.id = Some(ObjectId::new());
        let now = now_rfc3339();
        quote.created_at = Some(now.clone());
        quote.updated_at = Some(now.clone());

        let mut session = self.store.start_transaction().await?;

        if let Err(e) = self
            .collection
            .insert_one_with_session(quote.clone(), None, &mut session)
            .await
        {
            session.abort_transaction().await.ok();
            return Err(RepositoryError::database(format!("Failed to insert quote: {}", e)));
        }

        let request_filter = doc! {
            "_id": quote.repair_request_id,
            "assigned_technician_id": quote.technician_id,
            "status": { "$in": RepairStatus::IN_REPAIR
                .iter()
                .map(|s| Bson::String(s.as_str().to_string()))
                .collect::<Vec<_>>() },
        };
        let request_update = doc! {
            "$set": { "status": RepairStatus::Completed.as_str(), "updated_at": now }
        };
        let flipped = self
            .requests
            .update_one_with_session(request_filter, request_update, None, &mut session)
            .await;
        match flipped {
            Ok(result) if result.modified_count > 0 => {}
            Ok(_) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::invalid_state(format!(
                    "Repair request {} is not billable by this technician",
                    quote.repair_request_id
                )));
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::database(format!(
                    "Failed to complete repair request: {}",
                    e
                )));
            }
        }

        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit bill transaction: {}", e);
            return Err(RepositoryError::database(format!(
                "Failed to commit bill transaction: {}",
                e
            )));
        }
        info!(quote_id = ?quote.id, "Quote issued and request completed");
        Ok(quote)
    }

    async fn get(&self, id: ObjectId) -> RepositoryResult<Quote> {
        let found = self
            .collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch quote: {}", e)))?;
        found.ok_or_else(|| RepositoryError::not_found(format!("Quote not found: {}", id)))
    }

    async fn update_if_sent(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        amount: f64,
        breakdown: Breakdown,
    ) -> RepositoryResult<Quote> {
        let filter = doc! {
            "_id": id,
            "technician_id": technician_id,
            "status": QuoteStatus::Sent.as_str(),
        };
        let update = doc! {
            "$set": {
                "amount": amount,
                "breakdown": bson::to_bson(&breakdown)?,
                "updated_at": now_rfc3339(),
            }
        };
        let result = self
            .collection
            .update_one(filter, update, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update quote: {}", e)))?;
        if result.modified_count > 0 {
            return self.get(id).await;
        }
        match self.get(id).await {
            Ok(current) => Err(RepositoryError::invalid_state(format!(
                "Quote {} is {}, edits are only allowed while sent",
                id, current.status
            ))),
            Err(err) => Err(err),
        }
    }

    async fn list_by_technician(
        &self,
        technician_id: ObjectId,
        statuses: &[QuoteStatus],
    ) -> RepositoryResult<Vec<Quote>> {
        let status_values: Vec<Bson> = statuses
            .iter()
            .map(|s| Bson::String(s.as_str().to_string()))
            .collect();
        let filter = doc! {
            "technician_id": technician_id,
            "status": { "$in": status_values },
        };
        let cursor = self
            .collection
            .find(filter, Self::newest_first())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list quotes: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read quotes: {}", e)))
    }

    async fn list_for_requests(&self, request_ids: &[ObjectId]) -> RepositoryResult<Vec<Quote>> {
        let filter = doc! { "repair_request_id": { "$in": request_ids } };
        let cursor = self
            .collection
            .find(filter, Self::newest_first())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list quotes: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read quotes: {}", e)))
    }

    async fn latest_for_request(&self, request_id: ObjectId) -> RepositoryResult<Option<Quote>> {
        let filter = doc! { "repair_request_id": request_id };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(1)
            .build();
        let cursor = self
            .collection
            .find(filter, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch latest quote: {}", e)))?;
        let quotes: Vec<Quote> = cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read quotes: {}", e)))?;
        Ok(quotes.into_iter().next())
    }
}
