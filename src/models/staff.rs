use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: StaffRole,
    pub status: StaffStatus,
    pub status_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffRole {
    Chef,
    Cook,
    Server,
    Bartender,
    Coordinator,
    Driver,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Chef => "chef",
            StaffRole::Cook => "cook",
            StaffRole::Server => "server",
            StaffRole::Bartender => "bartender",
            StaffRole::Coordinator => "coordinator",
            StaffRole::Driver => "driver",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chef" => Some(StaffRole::Chef),
            "cook" => Some(StaffRole::Cook),
            "server" => Some(StaffRole::Server),
            "bartender" => Some(StaffRole::Bartender),
            "coordinator" => Some(StaffRole::Coordinator),
            "driver" => Some(StaffRole::Driver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StaffStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl StaffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffStatus::Pending => "pending",
            StaffStatus::Approved => "approved",
            StaffStatus::Rejected => "rejected",
            StaffStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StaffStatus::Pending),
            "approved" => Some(StaffStatus::Approved),
            "rejected" => Some(StaffStatus::Rejected),
            "suspended" => Some(StaffStatus::Suspended),
            _ => None,
        }
    }

    /// Suspended staff return to approved via reinstate.
    pub fn can_transition_to(&self, next: StaffStatus) -> bool {
        matches!(
            (self, next),
            (StaffStatus::Pending, StaffStatus::Approved)
                | (StaffStatus::Pending, StaffStatus::Rejected)
                | (StaffStatus::Approved, StaffStatus::Suspended)
                | (StaffStatus::Suspended, StaffStatus::Approved)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_transitions() {
        use StaffStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Approved));

        assert!(!Pending.can_transition_to(Suspended));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Suspended.can_transition_to(Rejected));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(StaffRole::parse("bartender"), Some(StaffRole::Bartender));
        assert_eq!(StaffRole::parse("Bartender"), None);
    }
}
