//! Team member model matching the frontend TeamMember interface.

use serde::{Deserialize, Serialize};

/// Membership status of a team member.
///
/// Only `accepted` and `pending` members are eligible for task assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Accepted,
    Pending,
    Rejected,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Pending => "pending",
            MembershipStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "accepted" => Some(MembershipStatus::Accepted),
            "pending" => Some(MembershipStatus::Pending),
            "rejected" => Some(MembershipStatus::Rejected),
            _ => None,
        }
    }

    /// Whether a member with this status can hold task assignments.
    pub fn is_active(&self) -> bool {
        matches!(self, MembershipStatus::Accepted | MembershipStatus::Pending)
    }
}

/// A team member who can be assigned tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub membership_status: MembershipStatus,
    pub updated_at: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl TeamMember {
    /// Display label used on assigned tasks: full name, falling back to
    /// username, then the raw id.
    pub fn display_label(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.username.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

/// Request body for creating a new team member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_status")]
    pub membership_status: MembershipStatus,
}

fn default_status() -> MembershipStatus {
    MembershipStatus::Pending
}

/// Request body for updating an existing team member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub membership_status: Option<MembershipStatus>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_status_round_trip() {
        for status in [
            MembershipStatus::Accepted,
            MembershipStatus::Pending,
            MembershipStatus::Rejected,
        ] {
            assert_eq!(MembershipStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(MembershipStatus::from_str("ghosted"), None);
    }

    #[test]
    fn test_only_rejected_is_inactive() {
        assert!(MembershipStatus::Accepted.is_active());
        assert!(MembershipStatus::Pending.is_active());
        assert!(!MembershipStatus::Rejected.is_active());
    }

    #[test]
    fn test_display_label_fallback() {
        let mut member = TeamMember {
            id: "u1".to_string(),
            username: Some("eva.m".to_string()),
            full_name: Some("Eva Martinez".to_string()),
            display_name: None,
            email: None,
            membership_status: MembershipStatus::Accepted,
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            version: 1,
        };
        assert_eq!(member.display_label(), "Eva Martinez");

        member.full_name = None;
        assert_eq!(member.display_label(), "eva.m");

        member.username = None;
        assert_eq!(member.display_label(), "u1");
    }
}
