use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Declared payment vocabulary. Only `succeeded` is ever produced; the
/// other states are reserved for provider integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

/// One successful charge against an accepted quote. Immutable after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub quote_id: ObjectId,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: Option<String>,
}
