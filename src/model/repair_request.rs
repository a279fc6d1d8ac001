use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Status vocabulary for a repair request. Narrowed to the states the
/// application actually produces; `in_progress` is reserved but remains a
/// valid source for cancel/complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Pending,
    Approved,
    Rejected,
    TechnicianRejected,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RepairStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairStatus::Pending => "pending",
            RepairStatus::Approved => "approved",
            RepairStatus::Rejected => "rejected",
            RepairStatus::TechnicianRejected => "technician_rejected",
            RepairStatus::Accepted => "accepted",
            RepairStatus::InProgress => "in_progress",
            RepairStatus::Completed => "completed",
            RepairStatus::Cancelled => "cancelled",
        }
    }

    /// States from which an admin decision (approve/reject) is legal.
    /// `technician_rejected` requests may be re-approved.
    pub const ADMIN_DECIDABLE: &'static [RepairStatus] =
        &[RepairStatus::Pending, RepairStatus::TechnicianRejected];

    /// States from which the assigned technician may accept or decline.
    pub const TECHNICIAN_DECIDABLE: &'static [RepairStatus] =
        &[RepairStatus::Approved, RepairStatus::TechnicianRejected];

    /// States during which repair work is underway: cancellable, billable.
    pub const IN_REPAIR: &'static [RepairStatus] =
        &[RepairStatus::Accepted, RepairStatus::InProgress];
}

impl std::fmt::Display for RepairStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Normal,
    High,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairRequest {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub device_id: ObjectId,
    pub title: String,
    pub description: String,
    pub status: RepairStatus,
    pub urgency: Urgency,
    pub assigned_technician_id: Option<ObjectId>,
    pub admin_notes: Option<String>,
    pub technician_notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RepairRequest {
    /// Listing title derived from the device type and the first 50
    /// characters of the issue description.
    pub fn derive_title(device_type: &str, description: &str) -> String {
        let head: String = description.chars().take(50).collect();
        format!("{} - {}", device_type, head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_truncates_description_at_fifty_chars() {
        let long = "x".repeat(80);
        let title = RepairRequest::derive_title("laptop", &long);
        assert_eq!(title, format!("laptop - {}", "x".repeat(50)));

        let short = RepairRequest::derive_title("phone", "screen cracked");
        assert_eq!(short, "phone - screen cracked");
    }

    #[test]
    fn status_wire_form_is_snake_case() {
        let json = serde_json::to_string(&RepairStatus::TechnicianRejected).unwrap();
        assert_eq!(json, "\"technician_rejected\"");
        let back: RepairStatus = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(back, RepairStatus::InProgress);
    }

    #[test]
    fn transition_source_sets_are_exact() {
        assert!(RepairStatus::ADMIN_DECIDABLE.contains(&RepairStatus::Pending));
        assert!(RepairStatus::ADMIN_DECIDABLE.contains(&RepairStatus::TechnicianRejected));
        assert!(!RepairStatus::ADMIN_DECIDABLE.contains(&RepairStatus::Completed));

        assert!(RepairStatus::TECHNICIAN_DECIDABLE.contains(&RepairStatus::Approved));
        assert!(!RepairStatus::TECHNICIAN_DECIDABLE.contains(&RepairStatus::Pending));

        assert!(RepairStatus::IN_REPAIR.contains(&RepairStatus::Accepted));
        assert!(RepairStatus::IN_REPAIR.contains(&RepairStatus::InProgress));
        assert!(!RepairStatus::IN_REPAIR.contains(&RepairStatus::Completed));
    }
}
