//! Rule-based task extraction.
//!
//! A fixed, ordered bank of phrase patterns is interpreted per line: the
//! first rule that matches a line wins and yields at most one candidate
//! task. Turns and bullet lines are independent sources; duplicates are
//! folded afterwards by [`dedupe_by_title`].

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use super::dates::resolve_due_date;
use super::segment::segment_turns;
use crate::models::{CandidateTask, Priority};

/// Lines that never become tasks: greetings, acknowledgements, and
/// status-only remarks. Compared against the trimmed, lower-cased line with
/// terminal punctuation removed.
const FILLER_LINES: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "thanks",
    "thank you",
    "thanks everyone",
    "bye",
    "goodbye",
    "see you",
    "okay",
    "ok",
    "yep",
    "yeah",
    "yes",
    "no",
    "sure",
    "sounds good",
    "got it",
    "will do",
    "makes sense",
    "agreed",
    "no blockers",
    "nothing from me",
    "nothing else",
    "on track",
    "all good",
    "done",
    "that's it",
    "any questions",
];

static SELF_COMMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^i(?:\s+can|\s+will|'ll)\s+(.+)$").expect("valid pattern"));

static QUESTION_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+),\s*(?:[Aa]fter\s+[^,]+,\s*)?[Cc]an you\s+(.+?)\s*\?*$")
        .expect("valid pattern")
});

static OPEN_NEED_WHO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^who'?s\s+(?:doing|updating|handling)\s+(.+?)\s*\?*$").expect("valid pattern")
});

static OPEN_NEED_WE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwe need\s+(.+?)\s*\.?\s*$").expect("valid pattern"));

static DEADLINE_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+)\s+to\s+(.+?)\s+by\s+\S+").expect("valid pattern")
});

static FUTURE_COMMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]+)\s+will\s+(.+)$").expect("valid pattern"));

static OBLIGATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][a-z]+)\s+needs?\s+to\s+(.+)$").expect("valid pattern"));

static REPORTED_COMMIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([A-Z][a-z]+)\s+(?:mentioned|said)\s+(?:he|she|they)(?:\s+will|'ll|\s+needs?\s+to)\s+(.+)$",
    )
    .expect("valid pattern")
});

static DELEGATED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[Tt]old\s+([A-Z][a-z]+)\s+to\s+(.+)$|\b[Aa]sked\s+([A-Z][a-z]+)\s+to\s+(.+)$")
        .expect("valid pattern")
});

static EXPLICIT_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+),\s*[Tt]his is your task\s*[-:]\s*(.+)$").expect("valid pattern")
});

static SOMEONE_SHOULD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^someone should\s+(.+)$").expect("valid pattern"));

/// Bullet list item anywhere in the transcript.
static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*•]\s+(.+)$").expect("valid pattern"));

/// Assigned bullet: `Name to/will/needs to/should <rest>`.
static BULLET_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][a-z]+)\s+(?:to|will|needs?\s+to|should)\s+(.+)$").expect("valid pattern")
});

/// How a matched rule derives assignee and title from its captures.
enum RuleOutcome {
    /// Assignee is the turn's speaker (self-commitments).
    SpeakerAssigned { title_group: usize },
    /// Assignee is a captured name. Alternations may capture the name/title
    /// in either group pair; the first non-empty pair wins.
    NameAssigned {
        name_groups: &'static [usize],
        title_groups: &'static [usize],
    },
    /// No assignee; the task is an open need.
    Unassigned { title_group: usize },
}

/// One entry of the ordered pattern bank.
struct LineRule {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    outcome: RuleOutcome,
}

/// The pattern bank, in priority order. The first rule matching a line wins;
/// a line never yields more than one candidate.
static RULES: &[LineRule] = &[
    LineRule {
        name: "self-commitment",
        pattern: &SELF_COMMIT_RE,
        outcome: RuleOutcome::SpeakerAssigned { title_group: 1 },
    },
    LineRule {
        name: "question-assignment",
        pattern: &QUESTION_ASSIGN_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "open-need-question",
        pattern: &OPEN_NEED_WHO_RE,
        outcome: RuleOutcome::Unassigned { title_group: 1 },
    },
    LineRule {
        name: "open-need-statement",
        pattern: &OPEN_NEED_WE_RE,
        outcome: RuleOutcome::Unassigned { title_group: 1 },
    },
    LineRule {
        name: "deadline-assignment",
        pattern: &DEADLINE_ASSIGN_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "future-commitment",
        pattern: &FUTURE_COMMIT_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "obligation",
        pattern: &OBLIGATION_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "reported-commitment",
        pattern: &REPORTED_COMMIT_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "delegated-instruction",
        pattern: &DELEGATED_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1, 3],
            title_groups: &[2, 4],
        },
    },
    LineRule {
        name: "explicit-label",
        pattern: &EXPLICIT_LABEL_RE,
        outcome: RuleOutcome::NameAssigned {
            name_groups: &[1],
            title_groups: &[2],
        },
    },
    LineRule {
        name: "unassigned-mandate",
        pattern: &SOMEONE_SHOULD_RE,
        outcome: RuleOutcome::Unassigned { title_group: 1 },
    },
];

/// Extract candidate tasks from a transcript using the pattern bank.
///
/// Never returns an empty list for a non-empty transcript: when nothing
/// matches, a single low-priority "Review meeting notes" task is emitted.
pub fn extract_heuristic(transcript: &str, today: NaiveDate) -> Vec<CandidateTask> {
    let mut candidates = Vec::new();

    for turn in segment_turns(transcript) {
        if is_filler(&turn.text) {
            continue;
        }
        if let Some(candidate) = apply_line_rules(&turn.text, turn.speaker.as_deref(), today) {
            candidates.push(candidate);
        }
    }

    for caps in BULLET_RE.captures_iter(transcript) {
        let text = caps[1].trim();
        if is_filler(text) {
            continue;
        }
        if let Some(candidate) = bullet_candidate(text, today) {
            candidates.push(candidate);
        }
    }

    if candidates.is_empty() && !transcript.trim().is_empty() {
        candidates.push(fallback_task(transcript));
    }

    candidates
}

/// Fold candidates whose normalized titles overlap, keeping the first-seen
/// record. A new item is dropped when any previously accepted title
/// (lower-cased) contains the first 20 lower-cased characters of its title.
pub fn dedupe_by_title<T>(items: Vec<T>, title_of: impl Fn(&T) -> &str) -> Vec<T> {
    let mut accepted: Vec<T> = Vec::new();
    for item in items {
        let key: String = title_of(&item).to_lowercase().chars().take(20).collect();
        let duplicate = accepted
            .iter()
            .any(|kept| title_of(kept).to_lowercase().contains(&key));
        if !duplicate {
            accepted.push(item);
        }
    }
    accepted
}

/// Evaluate the pattern bank against one line; first match wins.
fn apply_line_rules(text: &str, speaker: Option<&str>, today: NaiveDate) -> Option<CandidateTask> {
    for rule in RULES {
        let Some(caps) = rule.pattern.captures(text) else {
            continue;
        };

        let (assignee, raw_title) = match &rule.outcome {
            RuleOutcome::SpeakerAssigned { title_group } => (
                speaker.map(str::to_string),
                caps.get(*title_group).map(|m| m.as_str()),
            ),
            RuleOutcome::NameAssigned {
                name_groups,
                title_groups,
            } => {
                let name = name_groups
                    .iter()
                    .find_map(|g| caps.get(*g))
                    .map(|m| m.as_str().to_string());
                let title = title_groups.iter().find_map(|g| caps.get(*g));
                (name, title.map(|m| m.as_str()))
            }
            RuleOutcome::Unassigned { title_group } => {
                (None, caps.get(*title_group).map(|m| m.as_str()))
            }
        };

        let title = clean_title(raw_title.unwrap_or_default());
        if title.is_empty() {
            continue;
        }

        tracing::debug!(rule = rule.name, title = %title, "pattern matched");
        return Some(candidate_from_line(title, assignee, text, today));
    }
    None
}

/// Candidate from a bullet line: assigned when it names an owner, otherwise
/// carried verbatim if long enough to be meaningful.
fn bullet_candidate(text: &str, today: NaiveDate) -> Option<CandidateTask> {
    if let Some(caps) = BULLET_ASSIGN_RE.captures(text) {
        let title = clean_title(&caps[2]);
        if !title.is_empty() {
            return Some(candidate_from_line(
                title,
                Some(caps[1].to_string()),
                text,
                today,
            ));
        }
    }

    if text.len() > 10 {
        return Some(candidate_from_line(text.to_string(), None, text, today));
    }

    None
}

fn candidate_from_line(
    title: String,
    assignee: Option<String>,
    line: &str,
    today: NaiveDate,
) -> CandidateTask {
    CandidateTask {
        title,
        description: String::new(),
        assignee_hint: assignee,
        // The whole line is scanned so a deadline phrase anywhere on it is
        // picked up, not just a captured deadline token.
        due_date_hint: resolve_due_date(line, today),
        priority_hint: None,
        confidence_hint: None,
        source_text: Some(line.to_string()),
        inferred: false,
        optional: false,
    }
}

fn fallback_task(transcript: &str) -> CandidateTask {
    CandidateTask {
        title: "Review meeting notes".to_string(),
        description: transcript.chars().take(200).collect(),
        assignee_hint: None,
        due_date_hint: None,
        priority_hint: Some(Priority::Low),
        confidence_hint: None,
        source_text: None,
        inferred: true,
        optional: false,
    }
}

fn is_filler(line: &str) -> bool {
    let normalized = line
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .to_lowercase();
    FILLER_LINES.contains(&normalized.as_str())
}

fn clean_title(raw: &str) -> String {
    raw.trim().trim_end_matches(['.', '?', '!']).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn titles(candidates: &[CandidateTask]) -> Vec<&str> {
        candidates.iter().map(|c| c.title.as_str()).collect()
    }

    #[test]
    fn test_self_commitment_takes_speaker() {
        let candidates = extract_heuristic("Mark: I will implement rate limiting.", today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "implement rate limiting");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Mark"));
    }

    #[test]
    fn test_self_commitment_from_header_block() {
        let transcript = "00:00:23 — Mark\nI will implement rate limiting.\n\n00:00:32 — Jenna\nOkay, please complete that by March 5.";
        let candidates = extract_heuristic(transcript, today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "implement rate limiting");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Mark"));
    }

    #[test]
    fn test_self_commitment_contraction() {
        let candidates = extract_heuristic("Sarah: I'll draft the migration plan", today());
        assert_eq!(candidates[0].title, "draft the migration plan");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Sarah"));
    }

    #[test]
    fn test_question_assignment() {
        let candidates =
            extract_heuristic("Priya, can you set up the staging environment?", today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "set up the staging environment");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Priya"));
    }

    #[test]
    fn test_question_assignment_with_interjection() {
        let candidates = extract_heuristic(
            "Priya, after the standup, can you review the open incidents?",
            today(),
        );
        assert_eq!(candidates[0].title, "review the open incidents");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Priya"));
    }

    #[test]
    fn test_open_need_patterns_are_unassigned() {
        let candidates = extract_heuristic("who's updating the changelog?", today());
        assert_eq!(candidates[0].title, "the changelog");
        assert!(candidates[0].assignee_hint.is_none());

        let candidates = extract_heuristic("we need a rollback runbook.", today());
        assert_eq!(candidates[0].title, "a rollback runbook");
        assert!(candidates[0].assignee_hint.is_none());
    }

    #[test]
    fn test_deadline_assignment_resolves_date_from_line() {
        let candidates = extract_heuristic("Jenna to update the runbook by tomorrow", today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "update the runbook");
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Jenna"));
        assert_eq!(candidates[0].due_date_hint.as_deref(), Some("2025-03-05"));
    }

    #[test]
    fn test_future_commitment_and_obligation() {
        let candidates = extract_heuristic("Omar will prepare the demo", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Omar"));
        assert_eq!(candidates[0].title, "prepare the demo");

        let candidates = extract_heuristic("Dana needs to rotate the API keys", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Dana"));
        assert_eq!(candidates[0].title, "rotate the API keys");
    }

    #[test]
    fn test_reported_commitment() {
        let candidates = extract_heuristic("Lena said she will follow up with legal", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Lena"));
        assert_eq!(candidates[0].title, "follow up with legal");

        let candidates = extract_heuristic("Tom mentioned he'll fix the flaky test", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Tom"));
        assert_eq!(candidates[0].title, "fix the flaky test");
    }

    #[test]
    fn test_delegated_instruction() {
        let candidates = extract_heuristic("I asked Ravi to benchmark the cache", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Ravi"));
        assert_eq!(candidates[0].title, "benchmark the cache");

        let candidates = extract_heuristic("we told Mia to archive the old boards", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Mia"));
        assert_eq!(candidates[0].title, "archive the old boards");
    }

    #[test]
    fn test_explicit_label() {
        let candidates =
            extract_heuristic("Noah, this is your task: triage the support queue", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Noah"));
        assert_eq!(candidates[0].title, "triage the support queue");
    }

    #[test]
    fn test_unassigned_mandate() {
        let candidates = extract_heuristic("someone should document the release steps", today());
        assert_eq!(candidates[0].title, "document the release steps");
        assert!(candidates[0].assignee_hint.is_none());
    }

    #[test]
    fn test_one_candidate_per_line() {
        // Matches both the deadline and future-commitment shapes; only the
        // higher-priority deadline rule fires.
        let candidates = extract_heuristic("Kim to deploy the fix by Friday", today());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_filler_lines_are_suppressed() {
        let transcript = "okay\nno blockers.\nThanks everyone\nMark: I'll write the postmortem";
        let candidates = extract_heuristic(transcript, today());
        assert_eq!(titles(&candidates), vec!["write the postmortem"]);
    }

    #[test]
    fn test_assigned_bullet() {
        let candidates = extract_heuristic("- Amy to send the survey results", today());
        assert_eq!(candidates[0].assignee_hint.as_deref(), Some("Amy"));
        assert_eq!(candidates[0].title, "send the survey results");
    }

    #[test]
    fn test_unassigned_bullet_verbatim_over_10_chars() {
        let candidates = extract_heuristic("* refresh onboarding deck", today());
        assert_eq!(candidates[0].title, "refresh onboarding deck");
        assert!(candidates[0].assignee_hint.is_none());
    }

    #[test]
    fn test_short_bullet_is_ignored() {
        let candidates = extract_heuristic("- logs\nMark: I'll check the alerts", today());
        assert_eq!(titles(&candidates), vec!["check the alerts"]);
    }

    #[test]
    fn test_fallback_task_for_unrecognizable_input() {
        let candidates = extract_heuristic("lorem ipsum dolor sit amet", today());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Review meeting notes");
        assert_eq!(candidates[0].priority_hint, Some(Priority::Low));
        assert_eq!(candidates[0].description, "lorem ipsum dolor sit amet");
    }

    #[test]
    fn test_fallback_description_truncated_to_200_chars() {
        let long = "x".repeat(500);
        let candidates = extract_heuristic(&long, today());
        assert_eq!(candidates[0].description.chars().count(), 200);
    }

    #[test]
    fn test_empty_transcript_yields_nothing() {
        assert!(extract_heuristic("", today()).is_empty());
        assert!(extract_heuristic("   \n  ", today()).is_empty());
    }

    #[test]
    fn test_dedupe_drops_contained_prefix() {
        let a = CandidateTask {
            title: "update the deployment runbook".to_string(),
            ..Default::default()
        };
        let b = CandidateTask {
            title: "update the deployment".to_string(),
            ..Default::default()
        };
        let kept = dedupe_by_title(vec![a, b], |c| c.title.as_str());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "update the deployment runbook");
    }

    #[test]
    fn test_dedupe_keeps_first_seen() {
        let a = CandidateTask {
            title: "Review the PR".to_string(),
            assignee_hint: Some("Mark".to_string()),
            ..Default::default()
        };
        let b = CandidateTask {
            title: "review the pr".to_string(),
            assignee_hint: Some("Jenna".to_string()),
            ..Default::default()
        };
        let kept = dedupe_by_title(vec![a, b], |c| c.title.as_str());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].assignee_hint.as_deref(), Some("Mark"));
    }

    #[test]
    fn test_dedupe_known_limitation_different_leading_words() {
        // Near-duplicates with different leading words survive; this is the
        // documented trade-off of the prefix heuristic.
        let a = CandidateTask {
            title: "Review the PR".to_string(),
            ..Default::default()
        };
        let b = CandidateTask {
            title: "Take another look at the PR".to_string(),
            ..Default::default()
        };
        let kept = dedupe_by_title(vec![a, b], |c| c.title.as_str());
        assert_eq!(kept.len(), 2);
    }
}
