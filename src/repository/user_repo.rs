use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;

use crate::model::role::UserRole;
use crate::model::user::User;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>>;
    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<User>>;
    async fn list_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>>;
}

pub struct MongoUserRepository {
    collection: mongodb::Collection<User>,
}

impl MongoUserRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoUserRepository {
            collection: store.collection(collections::USERS),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, mut user: User) -> RepositoryResult<User> {
        if self.find_by_email(&user.email).await?.is_some() {
            return Err(RepositoryError::already_exists(format!(
                "User already exists for email: {}",
                user.email
            )));
        }
        user.id = Some(ObjectId::new());
        let now = now_rfc3339();
        user.created_at = Some(now.clone());
        user.updated_at = Some(now);
        self.collection
            .insert_one(user.clone(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to insert user: {}", e)))?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let filter = doc! { "email": email };
        let user = self
            .collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by email: {}", e)))?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &ObjectId) -> RepositoryResult<Option<User>> {
        let filter = doc! { "_id": id };
        let user = self
            .collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find user by id: {}", e)))?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<User>> {
        let filter = doc! { "_id": { "$in": ids } };
        let cursor = self
            .collection
            .find(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find users: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read users: {}", e)))
    }

    async fn list_by_role(&self, role: UserRole) -> RepositoryResult<Vec<User>> {
        let filter = doc! { "role": role.as_str() };
        let cursor = self
            .collection
            .find(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list users by role: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read users: {}", e)))
    }
}
