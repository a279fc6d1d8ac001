use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A customer-owned device. Immutable once created; repair requests point at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    /// Device kind, e.g. "phone", "laptop".
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub created_at: Option<String>,
}

/// Device fields as embedded in repair-request views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: Option<ObjectId>,
    pub device_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
}

impl From<&Device> for DeviceSummary {
    fn from(device: &Device) -> Self {
        DeviceSummary {
            id: device.id,
            device_type: device.device_type.clone(),
            brand: device.brand.clone(),
            model: device.model.clone(),
        }
    }
}
