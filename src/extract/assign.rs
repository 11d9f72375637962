//! Roster-aware assignee resolution.
//!
//! Matches a task's free-text assignee hint against the team roster using a
//! fixed precedence of strategies and computes an auditable disposition.
//! Never fails: the worst case is an unassigned disposition with a reason.

use crate::models::{AssignmentDisposition, TeamMember, UnassignedReason};

/// Resolve an assignee to a roster member.
///
/// Precedence: an already-resolved member id (from an upstream UI match)
/// wins; a hint that is syntactically a UUID is taken as a direct id
/// reference; otherwise the hint is substring-matched case-insensitively
/// against each member's username, full name, and display name, in that
/// order, in either direction.
pub fn resolve_assignment(
    resolved_member_id: Option<&str>,
    assignee_hint: Option<&str>,
    roster: &[TeamMember],
) -> AssignmentDisposition {
    let hint = assignee_hint.map(str::trim).filter(|h| !h.is_empty());

    let candidate_id: Option<String> = if let Some(id) = resolved_member_id {
        Some(id.to_string())
    } else if let Some(hint) = hint {
        if uuid::Uuid::parse_str(hint).is_ok() {
            Some(hint.to_string())
        } else {
            match_by_name(hint, roster).map(|member| member.id.clone())
        }
    } else {
        None
    };

    match candidate_id {
        None => {
            if hint.is_none() {
                AssignmentDisposition::unassigned(UnassignedReason::NoAssigneeSpecified)
            } else {
                // A name was given but matches nobody on this team.
                AssignmentDisposition::unassigned(UnassignedReason::NotATeamMember)
            }
        }
        Some(id) => match roster.iter().find(|member| member.id == id) {
            None => AssignmentDisposition::unassigned(UnassignedReason::NotATeamMember),
            Some(member) if !member.membership_status.is_active() => {
                AssignmentDisposition::unassigned(UnassignedReason::MembershipNotActive)
            }
            Some(member) => {
                AssignmentDisposition::assigned(member.id.clone(), member.display_label())
            }
        },
    }
}

fn match_by_name<'a>(hint: &str, roster: &'a [TeamMember]) -> Option<&'a TeamMember> {
    let needle = hint.to_lowercase();
    roster.iter().find(|member| {
        [&member.username, &member.full_name, &member.display_name]
            .into_iter()
            .flatten()
            .any(|field| {
                let value = field.to_lowercase();
                !value.is_empty() && (value.contains(&needle) || needle.contains(&value))
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MembershipStatus;

    fn member(id: &str, full_name: &str, status: MembershipStatus) -> TeamMember {
        TeamMember {
            id: id.to_string(),
            username: None,
            full_name: Some(full_name.to_string()),
            display_name: None,
            email: None,
            membership_status: status,
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            version: 1,
        }
    }

    #[test]
    fn test_substring_match_assigns() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Accepted)];
        let disposition = resolve_assignment(None, Some("eva"), &roster);
        assert_eq!(disposition.resolved_member_id.as_deref(), Some("u1"));
        assert_eq!(
            disposition.resolved_display_name.as_deref(),
            Some("Eva Martinez")
        );
        assert!(disposition.unassigned_reason.is_none());
    }

    #[test]
    fn test_match_works_in_both_directions() {
        // Hint longer than the stored field.
        let roster = [TeamMember {
            username: Some("eva".to_string()),
            full_name: None,
            ..member("u1", "", MembershipStatus::Accepted)
        }];
        let disposition = resolve_assignment(None, Some("Eva Martinez"), &roster);
        assert_eq!(disposition.resolved_member_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_username_takes_precedence_over_full_name() {
        let mut first = member("u1", "Someone Else", MembershipStatus::Accepted);
        first.username = Some("mark".to_string());
        let second = member("u2", "Mark Chen", MembershipStatus::Accepted);
        let disposition = resolve_assignment(None, Some("mark"), &[first, second]);
        assert_eq!(disposition.resolved_member_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_rejected_membership_is_not_active() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Rejected)];
        let disposition = resolve_assignment(None, Some("eva"), &roster);
        assert!(!disposition.is_assigned());
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::MembershipNotActive)
        );
    }

    #[test]
    fn test_pending_membership_can_be_assigned() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Pending)];
        let disposition = resolve_assignment(None, Some("eva"), &roster);
        assert!(disposition.is_assigned());
    }

    #[test]
    fn test_no_hint_means_no_assignee_specified() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Accepted)];
        let disposition = resolve_assignment(None, None, &roster);
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::NoAssigneeSpecified)
        );

        let disposition = resolve_assignment(None, Some("   "), &roster);
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::NoAssigneeSpecified)
        );
    }

    #[test]
    fn test_unknown_name_is_not_a_team_member() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Accepted)];
        let disposition = resolve_assignment(None, Some("Zachary"), &roster);
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::NotATeamMember)
        );
    }

    #[test]
    fn test_preresolved_id_wins() {
        let roster = [
            member("u1", "Eva Martinez", MembershipStatus::Accepted),
            member("u2", "Mark Chen", MembershipStatus::Accepted),
        ];
        // The hint would match u1; the UI already picked u2.
        let disposition = resolve_assignment(Some("u2"), Some("eva"), &roster);
        assert_eq!(disposition.resolved_member_id.as_deref(), Some("u2"));
    }

    #[test]
    fn test_preresolved_id_off_roster() {
        let roster = [member("u1", "Eva Martinez", MembershipStatus::Accepted)];
        let disposition = resolve_assignment(Some("gone"), None, &roster);
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::NotATeamMember)
        );
    }

    #[test]
    fn test_uuid_hint_is_a_direct_reference() {
        let id = "6f0f5c2e-8f7a-4b9e-9d7c-0a1b2c3d4e5f";
        let roster = [member(id, "Eva Martinez", MembershipStatus::Accepted)];
        let disposition = resolve_assignment(None, Some(id), &roster);
        assert_eq!(disposition.resolved_member_id.as_deref(), Some(id));

        // A UUID pointing at nobody is not resolved by name matching.
        let disposition = resolve_assignment(
            None,
            Some("00000000-0000-4000-8000-000000000000"),
            &roster,
        );
        assert_eq!(
            disposition.unassigned_reason,
            Some(UnassignedReason::NotATeamMember)
        );
    }

    #[test]
    fn test_disposition_is_exhaustive_and_exclusive() {
        let roster = [
            member("u1", "Eva Martinez", MembershipStatus::Accepted),
            member("u2", "Mark Chen", MembershipStatus::Rejected),
        ];
        let cases: [(Option<&str>, Option<&str>); 5] = [
            (None, None),
            (None, Some("eva")),
            (None, Some("mark")),
            (None, Some("nobody")),
            (Some("u1"), None),
        ];
        for (resolved, hint) in cases {
            let disposition = resolve_assignment(resolved, hint, &roster);
            let assigned = disposition.resolved_member_id.is_some();
            let reasoned = disposition.unassigned_reason.is_some();
            assert!(assigned != reasoned, "exactly one of assigned/reason: {resolved:?} {hint:?}");
            assert_eq!(disposition.resolved_display_name.is_some(), assigned);
        }
    }
}
