//! Transcript turn segmentation.
//!
//! Splits a raw transcript into ordered speech turns from a mixture of
//! timestamped and plain-line formats. Two speaker forms are recognized:
//!
//! - inline: `[HH:MM:SS] Name (role): text` (timestamp and role optional)
//! - header: `HH:MM:SS — Name` alone on a line; the next plain line becomes
//!   that speaker's turn
//!
//! Any other non-empty line is an unattributed narration turn. Multi-line
//! statements are never merged into a prior turn.

use once_cell::sync::Lazy;
use regex::Regex;

/// One attributed or unattributed unit of transcript text.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub speaker: Option<String>,
    pub text: String,
    /// Zero-based index among the transcript's non-empty lines.
    pub order: usize,
}

/// `[HH:MM:SS] Name (role): text` with optional timestamp and role.
static SPEAKER_INLINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\[?\d{1,2}:\d{2}(?::\d{2})?\]?\s+)?([A-Z][A-Za-z'\-]*)\s*(?:\([^)]*\))?:\s*(.*)$",
    )
    .expect("inline speaker pattern is valid")
});

/// `HH:MM:SS — Name (role)` alone on a line (no spoken text).
static SPEAKER_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\[?\d{1,2}:\d{2}(?::\d{2})?\]?\s*[—–-]?\s*([A-Z][A-Za-z'\-]*)\s*(?:\([^)]*\))?\s*$",
    )
    .expect("header speaker pattern is valid")
});

/// Split a transcript into ordered turns.
pub fn segment_turns(transcript: &str) -> Vec<Turn> {
    let mut turns = Vec::new();
    let mut pending_speaker: Option<String> = None;
    let mut order = 0usize;

    for raw_line in transcript.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = SPEAKER_INLINE_RE.captures(line) {
            turns.push(Turn {
                speaker: Some(caps[1].to_string()),
                text: caps[2].trim().to_string(),
                order,
            });
            pending_speaker = None;
        } else if let Some(caps) = SPEAKER_HEADER_RE.captures(line) {
            // Header line carries no text; it attributes the next plain line.
            pending_speaker = Some(caps[1].to_string());
        } else {
            turns.push(Turn {
                speaker: pending_speaker.take(),
                text: line.to_string(),
                order,
            });
        }

        order += 1;
    }

    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_speaker_line() {
        let turns = segment_turns("Sarah: I'll update the docs.");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker.as_deref(), Some("Sarah"));
        assert_eq!(turns[0].text, "I'll update the docs.");
        assert_eq!(turns[0].order, 0);
    }

    #[test]
    fn test_timestamped_inline_speaker_line() {
        let turns = segment_turns("[00:01:02] Mark: let's start");
        assert_eq!(turns[0].speaker.as_deref(), Some("Mark"));
        assert_eq!(turns[0].text, "let's start");

        let turns = segment_turns("10:15 Jenna (PM): status update");
        assert_eq!(turns[0].speaker.as_deref(), Some("Jenna"));
        assert_eq!(turns[0].text, "status update");
    }

    #[test]
    fn test_header_line_attributes_next_line() {
        let transcript = "00:00:23 — Mark\nI will implement rate limiting.";
        let turns = segment_turns(transcript);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker.as_deref(), Some("Mark"));
        assert_eq!(turns[0].text, "I will implement rate limiting.");
        // Header consumed line index 0, spoken line is index 1.
        assert_eq!(turns[0].order, 1);
    }

    #[test]
    fn test_header_attribution_does_not_carry_past_one_line() {
        let transcript = "00:00:23 — Mark\nFirst statement.\nSecond statement.";
        let turns = segment_turns(transcript);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker.as_deref(), Some("Mark"));
        assert_eq!(turns[1].speaker, None);
        assert_eq!(turns[1].text, "Second statement.");
    }

    #[test]
    fn test_plain_lines_are_unattributed() {
        let turns = segment_turns("we need a deployment checklist\nsomeone should own rollbacks");
        assert_eq!(turns.len(), 2);
        assert!(turns.iter().all(|t| t.speaker.is_none()));
    }

    #[test]
    fn test_blank_lines_are_skipped_and_order_is_dense() {
        let transcript = "Mark: one\n\n\nJenna: two";
        let turns = segment_turns(transcript);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].order, 0);
        assert_eq!(turns[1].order, 1);
    }

    #[test]
    fn test_mixed_formats_in_document_order() {
        let transcript = "00:00:23 — Mark\nI will implement rate limiting.\n\n00:00:32 — Jenna\nOkay, please complete that by March 5.";
        let turns = segment_turns(transcript);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker.as_deref(), Some("Mark"));
        assert_eq!(turns[1].speaker.as_deref(), Some("Jenna"));
        assert_eq!(turns[1].text, "Okay, please complete that by March 5.");
    }

    #[test]
    fn test_empty_transcript() {
        assert!(segment_turns("").is_empty());
        assert!(segment_turns("\n\n  \n").is_empty());
    }
}
