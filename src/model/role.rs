use serde::{Deserialize, Serialize};

/// Closed set of account roles. Stored and transmitted as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Technician,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Technician => "technician",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<UserRole> {
        match s {
            "customer" => Some(UserRole::Customer),
            "technician" => Some(UserRole::Technician),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an actor can ask the lifecycle coordinator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateRequest,
    EditRequest,
    DeleteRequest,
    ApproveRequest,
    RejectRequest,
    ClaimRequest,
    AcceptAssignment,
    DeclineAssignment,
    CancelRepair,
    IssueBill,
    EditBill,
    ConfirmPayment,
    ManageCards,
    SubmitStory,
}

impl UserRole {
    /// Capability table: which role may request which action. Checked once
    /// in the coordinator; handlers never compare role strings.
    pub fn permits(&self, action: Action) -> bool {
        use Action::*;
        matches!(
            (self, action),
            (UserRole::Customer, CreateRequest)
                | (UserRole::Customer, EditRequest)
                | (UserRole::Customer, DeleteRequest)
                | (UserRole::Customer, ConfirmPayment)
                | (UserRole::Customer, ManageCards)
                | (UserRole::Customer, SubmitStory)
                | (UserRole::Admin, ApproveRequest)
                | (UserRole::Admin, RejectRequest)
                | (UserRole::Technician, ClaimRequest)
                | (UserRole::Technician, AcceptAssignment)
                | (UserRole::Technician, DeclineAssignment)
                | (UserRole::Technician, CancelRepair)
                | (UserRole::Technician, IssueBill)
                | (UserRole::Technician, EditBill)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [UserRole::Customer, UserRole::Technician, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("superuser"), None);
    }

    #[test]
    fn capability_table_is_disjoint_per_role() {
        assert!(UserRole::Admin.permits(Action::ApproveRequest));
        assert!(!UserRole::Technician.permits(Action::ApproveRequest));
        assert!(!UserRole::Customer.permits(Action::ApproveRequest));

        assert!(UserRole::Technician.permits(Action::ClaimRequest));
        assert!(!UserRole::Admin.permits(Action::ClaimRequest));

        assert!(UserRole::Customer.permits(Action::ConfirmPayment));
        assert!(!UserRole::Technician.permits(Action::ConfirmPayment));
    }
}
