use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::TryStreamExt;

use crate::model::device::Device;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn create(&self, device: Device) -> RepositoryResult<Device>;
    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Device>>;
}

pub struct MongoDeviceRepository {
    collection: mongodb::Collection<Device>,
}

impl MongoDeviceRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoDeviceRepository {
            collection: store.collection(collections::DEVICES),
        }
    }
}

#[async_trait]
impl DeviceRepository for MongoDeviceRepository {
    async fn create(&self, mut device: Device) -> RepositoryResult<Device> {
        device.id = Some(ObjectId::new());
        device.created_at = Some(now_rfc3339());
        self.collection
            .insert_one(device.clone(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to create device: {}", e)))?;
        Ok(device)
    }

    async fn find_many(&self, ids: &[ObjectId]) -> RepositoryResult<Vec<Device>> {
        let filter = doc! { "_id": { "$in": ids } };
        let cursor = self
            .collection
            .find(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to find devices: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read devices: {}", e)))
    }
}
