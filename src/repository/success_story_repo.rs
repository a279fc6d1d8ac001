use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::options::FindOptions;

use crate::model::success_story::SuccessStory;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait SuccessStoryRepository: Send + Sync {
    async fn create(&self, story: SuccessStory) -> RepositoryResult<SuccessStory>;
    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<SuccessStory>>;
}

pub struct MongoSuccessStoryRepository {
    collection: mongodb::Collection<SuccessStory>,
}

impl MongoSuccessStoryRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoSuccessStoryRepository {
            collection: store.collection(collections::SUCCESS_STORIES),
        }
    }
}

#[async_trait]
impl SuccessStoryRepository for MongoSuccessStoryRepository {
    async fn create(&self, mut story: SuccessStory) -> RepositoryResult<SuccessStory> {
        story.id = Some(ObjectId::new());
        story.created_at = Some(now_rfc3339());
        self.collection
            .insert_one(story.clone(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to create story: {}", e)))?;
        Ok(story)
    }

    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<SuccessStory>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .limit(limit)
            .build();
        let cursor = self
            .collection
            .find(doc! {}, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list stories: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read stories: {}", e)))
    }
}
