use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::model::repair_request::Urgency;

/// Body of the public `POST /repair-requests` endpoint. CamelCase field
/// names are part of the preserved wire contract.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepairRequestRequest {
    #[validate(length(min = 1, max = 100))]
    pub device_type: String,

    pub brand: Option<String>,

    pub model: Option<String>,

    #[validate(length(min = 1, max = 2000))]
    pub issue_description: String,

    #[serde(default)]
    pub urgency: Urgency,

    /// Hex id of the owning user.
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRepairRequestRequest {
    pub description: Option<String>,
    pub urgency: Option<Urgency>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequestDto {
    pub admin_notes: Option<String>,
    /// Hex id of the technician to assign, if any.
    pub technician_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RejectRequestDto {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianAcceptDto {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TechnicianReasonDto {
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}
