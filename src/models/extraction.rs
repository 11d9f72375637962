//! Extraction pipeline models.
//!
//! `CandidateTask` is the unvalidated output of an extractor; `ExtractedTask`
//! is the canonical shape every candidate is normalized into before review.

use serde::{Deserialize, Serialize};

/// Task priority classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Extractor confidence in a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Confidence::Low),
            "medium" => Some(Confidence::Medium),
            "high" => Some(Confidence::High),
            _ => None,
        }
    }
}

/// An unvalidated task record produced by an extractor.
///
/// Title is required; everything else is a hint the normalizer may coerce or
/// drop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assignee_hint: Option<String>,
    #[serde(default)]
    pub due_date_hint: Option<String>,
    #[serde(default)]
    pub priority_hint: Option<Priority>,
    #[serde(default)]
    pub confidence_hint: Option<Confidence>,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub inferred: bool,
    #[serde(default)]
    pub optional: bool,
}

/// The canonical task shape produced by the normalizer.
///
/// Invariants: `title` is trimmed and non-empty; `due_date`, if present,
/// matches `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub optional: bool,
    pub inferred: bool,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl From<ExtractedTask> for CandidateTask {
    fn from(task: ExtractedTask) -> Self {
        CandidateTask {
            title: task.title,
            description: task.description,
            assignee_hint: task.assignee,
            due_date_hint: task.due_date,
            priority_hint: Some(task.priority),
            confidence_hint: Some(task.confidence),
            source_text: task.source_text,
            inferred: task.inferred,
            optional: task.optional,
        }
    }
}

/// Why a task could not be assigned to a roster member.
///
/// Stored verbatim on the task row so a reviewer can distinguish "nobody was
/// named" from "named person isn't on this team" from "they're on the team
/// but haven't accepted yet".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnassignedReason {
    NoAssigneeSpecified,
    NotATeamMember,
    MembershipNotActive,
}

impl UnassignedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnassignedReason::NoAssigneeSpecified => "NO_ASSIGNEE_SPECIFIED",
            UnassignedReason::NotATeamMember => "NOT_A_TEAM_MEMBER",
            UnassignedReason::MembershipNotActive => "MEMBERSHIP_NOT_ACTIVE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NO_ASSIGNEE_SPECIFIED" => Some(UnassignedReason::NoAssigneeSpecified),
            "NOT_A_TEAM_MEMBER" => Some(UnassignedReason::NotATeamMember),
            "MEMBERSHIP_NOT_ACTIVE" => Some(UnassignedReason::MembershipNotActive),
            _ => None,
        }
    }
}

/// Outcome of matching a task's assignee hint against the roster.
///
/// Exactly one of `resolved_member_id` / `unassigned_reason` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentDisposition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_member_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unassigned_reason: Option<UnassignedReason>,
}

impl AssignmentDisposition {
    pub fn assigned(member_id: String, display_name: String) -> Self {
        Self {
            resolved_member_id: Some(member_id),
            resolved_display_name: Some(display_name),
            unassigned_reason: None,
        }
    }

    pub fn unassigned(reason: UnassignedReason) -> Self {
        Self {
            resolved_member_id: None,
            resolved_display_name: None,
            unassigned_reason: Some(reason),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.resolved_member_id.is_some()
    }
}

/// Metadata describing one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub processed_at: String,
    /// Model identifier, or "heuristic" when the pattern bank produced the
    /// result.
    pub model: String,
}

/// Result of one extraction pass over a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub tasks: Vec<ExtractedTask>,
    pub metadata: ExtractionMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_round_trip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_str(p.as_str()), Some(p));
        }
        assert_eq!(Priority::from_str("urgent"), None);
    }

    #[test]
    fn test_unassigned_reason_serializes_screaming_snake() {
        let json = serde_json::to_string(&UnassignedReason::NotATeamMember).unwrap();
        assert_eq!(json, "\"NOT_A_TEAM_MEMBER\"");
        for r in [
            UnassignedReason::NoAssigneeSpecified,
            UnassignedReason::NotATeamMember,
            UnassignedReason::MembershipNotActive,
        ] {
            assert_eq!(UnassignedReason::from_str(r.as_str()), Some(r));
        }
    }

    #[test]
    fn test_disposition_is_exclusive() {
        let assigned = AssignmentDisposition::assigned("u1".into(), "Eva Martinez".into());
        assert!(assigned.is_assigned());
        assert!(assigned.unassigned_reason.is_none());

        let unassigned = AssignmentDisposition::unassigned(UnassignedReason::NoAssigneeSpecified);
        assert!(!unassigned.is_assigned());
        assert!(unassigned.resolved_member_id.is_none());
        assert!(unassigned.resolved_display_name.is_none());
    }
}
