use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use tracing::{error, info};

use crate::model::payment::Payment;
use crate::model::quote::{Quote, QuoteStatus};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Flips the quote `sent -> accepted` and inserts the payment row as one
    /// transactional unit. If the quote is not `sent` (already paid, or
    /// missing) nothing is written: no orphan accepted quotes, no orphan
    /// payments.
    async fn record(&self, payment: Payment) -> RepositoryResult<Payment>;

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<Payment>>;

    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Payment>>;
}

pub struct MongoPaymentRepository {
    store: MongoStore,
    collection: mongodb::Collection<Payment>,
    quotes: mongodb::Collection<Quote>,
}

impl MongoPaymentRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoPaymentRepository {
            store: store.clone(),
            collection: store.collection(collections::PAYMENTS),
            quotes: store.collection(collections::QUOTES),
        }
    }
}

#[async_trait]
impl PaymentRepository for MongoPaymentRepository {
    #[tracing::instrument(skip(self, payment), fields(quote_id = %payment.quote_id))]
    async fn record(&self, mut payment: Payment) -> RepositoryResult<Payment> {
        payment.id = Some(ObjectId::new());
        let now = now_rfc3339();
        payment.created_at = Some(now.clone());

        let mut session = self.store.start_transaction().await?;

        let quote_filter = doc! {
            "_id": payment.quote_id,
            "status": QuoteStatus::Sent.as_str(),
        };
        let quote_update = doc! {
            "$set": { "status": QuoteStatus::Accepted.as_str(), "updated_at": now }
        };
        let flipped = self
            .quotes
            .update_one_with_session(quote_filter, quote_update, None, &mut session)
            .await;
        match flipped {
            Ok(result) if result.modified_count > 0 => {}
            Ok(_) => {
                session.abort_transaction().await.ok();
                let exists = self
                    .quotes
                    .find_one(doc! { "_id": payment.quote_id }, None)
                    .await
                    .map_err(|e| RepositoryError::database(format!("Failed to fetch quote: {}", e)))?;
                return Err(match exists {
                    Some(quote) => RepositoryError::invalid_state(format!(
                        "Quote {} is {}, only sent quotes can be paid",
                        payment.quote_id, quote.status
                    )),
                    None => RepositoryError::not_found(format!(
                        "Quote not found: {}",
                        payment.quote_id
                    )),
                });
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::database(format!(
                    "Failed to accept quote: {}",
                    e
                )));
            }
        }

        if let Err(e) = self
            .collection
            .insert_one_with_session(payment.clone(), None, &mut session)
            .await
        {
            session.abort_transaction().await.ok();
            return Err(RepositoryError::database(format!(
                "Failed to insert payment: {}",
                e
            )));
        }

        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit payment transaction: {}", e);
            return Err(RepositoryError::database(format!(
                "Failed to commit payment transaction: {}",
                e
            )));
        }
        info!(payment_id = ?payment.id, "Payment recorded, quote accepted");
        Ok(payment)
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<Payment>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id }, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list payments: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read payments: {}", e)))
    }

    async fn find_by_quote(&self, quote_id: ObjectId) -> RepositoryResult<Option<Payment>> {
        self.collection
            .find_one(doc! { "quote_id": quote_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch payment: {}", e)))
    }
}
