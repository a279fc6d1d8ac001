use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use tracing::error;

use crate::model::saved_card::SavedCard;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait SavedCardRepository: Send + Sync {
    /// Inserts the card; the user's first card becomes the default.
    async fn create(&self, card: SavedCard) -> RepositoryResult<SavedCard>;

    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<SavedCard>;

    /// Default card first, then newest.
    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<SavedCard>>;

    /// Clear-then-set inside one transaction, so two racing calls can never
    /// leave a user with zero or two defaults. Idempotent.
    async fn set_default(&self, user_id: ObjectId, card_id: ObjectId) -> RepositoryResult<()>;

    async fn delete(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()>;
}

pub struct MongoSavedCardRepository {
    store: MongoStore,
    collection: mongodb::Collection<SavedCard>,
}

impl MongoSavedCardRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoSavedCardRepository {
            store: store.clone(),
            collection: store.collection(collections::SAVED_CARDS),
        }
    }
}

#[async_trait]
impl SavedCardRepository for MongoSavedCardRepository {
    async fn create(&self, mut card: SavedCard) -> RepositoryResult<SavedCard> {
        card.id = Some(ObjectId::new());
        card.created_at = Some(now_rfc3339());

        let mut session = self.store.start_transaction().await?;

        let existing = self
            .collection
            .count_documents_with_session(doc! { "user_id": card.user_id }, None, &mut session)
            .await;
        match existing {
            Ok(count) => card.is_default = count == 0,
            Err(e) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::database(format!("Failed to count cards: {}", e)));
            }
        }

        if let Err(e) = self
            .collection
            .insert_one_with_session(card.clone(), None, &mut session)
            .await
        {
            session.abort_transaction().await.ok();
            return Err(RepositoryError::database(format!("Failed to save card: {}", e)));
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to commit card insert: {}", e)))?;
        Ok(card)
    }

    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<SavedCard> {
        let found = self
            .collection
            .find_one(doc! { "_id": id, "user_id": user_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch card: {}", e)))?;
        found.ok_or_else(|| RepositoryError::not_found(format!("Saved card not found: {}", id)))
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<SavedCard>> {
        let options = FindOptions::builder()
            .sort(doc! { "is_default": -1, "created_at": -1 })
            .build();
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id }, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list cards: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read cards: {}", e)))
    }

    #[tracing::instrument(skip(self), fields(user_id = %user_id, card_id = %card_id))]
    async fn set_default(&self, user_id: ObjectId, card_id: ObjectId) -> RepositoryResult<()> {
        let mut session = self.store.start_transaction().await?;

        if let Err(e) = self
            .collection
            .update_many_with_session(
                doc! { "user_id": user_id },
                doc! { "$set": { "is_default": false } },
                None,
                &mut session,
            )
            .await
        {
            session.abort_transaction().await.ok();
            return Err(RepositoryError::database(format!("Failed to clear defaults: {}", e)));
        }

        let set = self
            .collection
            .update_one_with_session(
                doc! { "_id": card_id, "user_id": user_id },
                doc! { "$set": { "is_default": true } },
                None,
                &mut session,
            )
            .await;
        match set {
            Ok(result) if result.matched_count > 0 => {}
            Ok(_) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::not_found(format!(
                    "Saved card not found: {}",
                    card_id
                )));
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                return Err(RepositoryError::database(format!("Failed to set default: {}", e)));
            }
        }

        if let Err(e) = session.commit_transaction().await {
            error!("Failed to commit default-card transaction: {}", e);
            return Err(RepositoryError::database(format!(
                "Failed to commit default-card transaction: {}",
                e
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id, "user_id": user_id }, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete card: {}", e)))?;
        if result.deleted_count > 0 {
            Ok(())
        } else {
            Err(RepositoryError::not_found(format!("Saved card not found: {}", id)))
        }
    }
}
