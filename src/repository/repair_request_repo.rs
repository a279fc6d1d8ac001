use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson};
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use tracing::info;

use crate::model::repair_request::{RepairRequest, RepairStatus, Urgency};
use crate::repository::repository_error::{RepositoryError, RepositoryResult};
use crate::repository::store::{collections, MongoStore};
use crate::util::time::now_rfc3339;

/// Outcome of an admin arbitration over a pending request.
#[derive(Debug, Clone)]
pub struct AdminDecision {
    pub status: RepairStatus,
    pub admin_notes: Option<String>,
    pub technician_id: Option<ObjectId>,
}

#[async_trait]
pub trait RepairRequestRepository: Send + Sync {
    async fn create(&self, request: RepairRequest) -> RepositoryResult<RepairRequest>;
    async fn get(&self, id: ObjectId) -> RepositoryResult<RepairRequest>;
    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<RepairRequest>;
    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>>;
    async fn list_unassigned_pending(&self) -> RepositoryResult<Vec<RepairRequest>>;
    async fn list_by_technician(&self, technician_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>>;
    async fn list_all(&self) -> RepositoryResult<Vec<RepairRequest>>;
    async fn count(&self) -> RepositoryResult<u64>;

    /// Owner edit of description/urgency; conditional on status `pending`.
    async fn update_details(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        description: Option<String>,
        urgency: Option<Urgency>,
    ) -> RepositoryResult<RepairRequest>;

    /// Owner delete; conditional on status `pending`.
    async fn delete_pending(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()>;

    /// Admin approve/reject, conditional on the allowed source statuses.
    async fn apply_admin_decision(
        &self,
        id: ObjectId,
        from: &'static [RepairStatus],
        decision: AdminDecision,
    ) -> RepositoryResult<RepairRequest>;

    /// Technician self-assignment. Single compare-and-set on
    /// `status = pending AND assigned_technician_id = null`; the loser of a
    /// concurrent claim gets `AlreadyExists`, never a partial write.
    async fn claim(&self, id: ObjectId, technician_id: ObjectId) -> RepositoryResult<RepairRequest>;

    /// Technician accept/decline/cancel, conditional on assignment to the
    /// acting technician and the allowed source statuses.
    async fn apply_technician_decision(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        from: &'static [RepairStatus],
        to: RepairStatus,
        notes: Option<String>,
    ) -> RepositoryResult<RepairRequest>;
}

fn status_filter(from: &[RepairStatus]) -> Bson {
    Bson::Array(from.iter().map(|s| Bson::String(s.as_str().to_string())).collect())
}

pub struct MongoRepairRequestRepository {
    collection: mongodb::Collection<RepairRequest>,
}

impl MongoRepairRequestRepository {
    pub fn new(store: &MongoStore) -> Self {
        MongoRepairRequestRepository {
            collection: store.collection(collections::REPAIR_REQUESTS),
        }
    }

    fn newest_first() -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build()
    }

    fn return_updated() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    async fn find_list(&self, filter: bson::Document) -> RepositoryResult<Vec<RepairRequest>> {
        let cursor = self
            .collection
            .find(filter, Self::newest_first())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to list repair requests: {}", e)))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to read repair requests: {}", e)))
    }

    /// Distinguishes a missing row from a conditional-write refusal after a
    /// CAS came back empty.
    async fn explain_miss(&self, id: ObjectId) -> RepositoryError {
        match self.get(id).await {
            Ok(current) => RepositoryError::invalid_state(format!(
                "Repair request {} is {}, transition not allowed",
                id, current.status
            )),
            Err(err) => err,
        }
    }
}

#[async_trait]
impl RepairRequestRepository for MongoRepairRequestRepository {
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id))]
    async fn create(&self, mut request: RepairRequest) -> RepositoryResult<RepairRequest> {
        request.id = Some(ObjectId::new());
        let now = now_rfc3339();
        request.created_at = Some(now.clone());
        request.updated_at = Some(now);
        self.collection
            .insert_one(request.clone(), None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to create repair request: {}", e)))?;
        info!(request_id = ?request.id, "Repair request created");
        Ok(request)
    }

    async fn get(&self, id: ObjectId) -> RepositoryResult<RepairRequest> {
        let filter = doc! { "_id": id };
        let found = self
            .collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch repair request: {}", e)))?;
        found.ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))
    }

    async fn get_owned(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<RepairRequest> {
        let filter = doc! { "_id": id, "user_id": user_id };
        let found = self
            .collection
            .find_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to fetch repair request: {}", e)))?;
        found.ok_or_else(|| RepositoryError::not_found(format!("Repair request not found: {}", id)))
    }

    async fn list_by_user(&self, user_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>> {
        self.find_list(doc! { "user_id": user_id }).await
    }

    async fn list_unassigned_pending(&self) -> RepositoryResult<Vec<RepairRequest>> {
        self.find_list(doc! {
            "status": RepairStatus::Pending.as_str(),
            "assigned_technician_id": Bson::Null,
        })
        .await
    }

    async fn list_by_technician(&self, technician_id: ObjectId) -> RepositoryResult<Vec<RepairRequest>> {
        self.find_list(doc! { "assigned_technician_id": technician_id }).await
    }

    async fn list_all(&self) -> RepositoryResult<Vec<RepairRequest>> {
        self.find_list(doc! {}).await
    }

    async fn count(&self) -> RepositoryResult<u64> {
        self.collection
            .count_documents(None, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to count repair requests: {}", e)))
    }

    async fn update_details(
        &self,
        id: ObjectId,
        user_id: ObjectId,
        description: Option<String>,
        urgency: Option<Urgency>,
    ) -> RepositoryResult<RepairRequest> {
        let filter = doc! {
            "_id": id,
            "user_id": user_id,
            "status": RepairStatus::Pending.as_str(),
        };
        let mut set = doc! { "updated_at": now_rfc3339() };
        if let Some(description) = description {
            set.insert("description", description);
        }
        if let Some(urgency) = urgency {
            set.insert("urgency", bson::to_bson(&urgency)?);
        }
        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set }, Self::return_updated())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to update repair request: {}", e)))?;
        match updated {
            Some(request) => Ok(request),
            None => Err(self.explain_miss(id).await),
        }
    }

    async fn delete_pending(&self, id: ObjectId, user_id: ObjectId) -> RepositoryResult<()> {
        let filter = doc! {
            "_id": id,
            "user_id": user_id,
            "status": RepairStatus::Pending.as_str(),
        };
        let result = self
            .collection
            .delete_one(filter, None)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to delete repair request: {}", e)))?;
        if result.deleted_count > 0 {
            Ok(())
        } else {
            Err(self.explain_miss(id).await)
        }
    }

    #[tracing::instrument(skip(self, decision), fields(id = %id, to = %decision.status))]
    async fn apply_admin_decision(
        &self,
        id: ObjectId,
        from: &'static [RepairStatus],
        decision: AdminDecision,
    ) -> RepositoryResult<RepairRequest> {
        let filter = doc! { "_id": id, "status": { "$in": status_filter(from) } };
        let mut set = doc! {
            "status": decision.status.as_str(),
            "admin_notes": decision.admin_notes.map(Bson::String).unwrap_or(Bson::Null),
            "updated_at": now_rfc3339(),
        };
        if let Some(technician_id) = decision.technician_id {
            set.insert("assigned_technician_id", technician_id);
        }
        let updated = self
            .collection
            .find_one_and_update(filter, doc! { "$set": set }, Self::return_updated())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to apply admin decision: {}", e)))?;
        match updated {
            Some(request) => Ok(request),
            None => Err(self.explain_miss(id).await),
        }
    }

    #[tracing::instrument(skip(self), fields(id = %id, technician_id = %technician_id))]
    async fn claim(&self, id: ObjectId, technician_id: ObjectId) -> RepositoryResult<RepairRequest> {
        let filter = doc! {
            "_id": id,
            "status": RepairStatus::Pending.as_str(),
            "assigned_technician_id": Bson::Null,
        };
        let update = doc! {
            "$set": {
                "assigned_technician_id": technician_id,
                "updated_at": now_rfc3339(),
            }
        };
        let updated = self
            .collection
            .find_one_and_update(filter, update, Self::return_updated())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to claim repair request: {}", e)))?;
        match updated {
            Some(request) => {
                info!("Repair request claimed");
                Ok(request)
            }
            None => match self.get(id).await {
                Ok(_) => Err(RepositoryError::already_exists(format!(
                    "Repair request {} is already assigned or no longer pending",
                    id
                ))),
                Err(err) => Err(err),
            },
        }
    }

    #[tracing::instrument(skip(self, notes), fields(id = %id, to = %to))]
    async fn apply_technician_decision(
        &self,
        id: ObjectId,
        technician_id: ObjectId,
        from: &'static [RepairStatus],
        to: RepairStatus,
        notes: Option<String>,
    ) -> RepositoryResult<RepairRequest> {
        let filter = doc! {
            "_id": id,
            "assigned_technician_id": technician_id,
            "status": { "$in": status_filter(from) },
        };
        let update = doc! {
            "$set": {
                "status": to.as_str(),
                "technician_notes": notes.map(Bson::String).unwrap_or(Bson::Null),
                "updated_at": now_rfc3339(),
            }
        };
        let updated = self
            .collection
            .find_one_and_update(filter, update, Self::return_updated())
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to apply technician decision: {}", e)))?;
        match updated {
            Some(request) => Ok(request),
            None => Err(self.explain_miss(id).await),
        }
    }
}
