//! Transcript-to-task extraction pipeline.
//!
//! Raw text flows through one of two extractors (pattern bank or completion
//! service), then the normalizer; the heuristic path is additionally
//! de-duplicated. Assignee resolution happens later, at persistence time,
//! after human review.

pub mod assign;
pub mod dates;
pub mod heuristic;
pub mod model;
pub mod normalize;
pub mod repair;
pub mod segment;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ExtractionMetadata, ExtractionResult, TeamMember};

pub use assign::resolve_assignment;
pub use model::{CompletionClient, CompletionRequest, HttpCompletionClient};
pub use normalize::normalize;

/// Which extractor answers an extraction request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    Heuristic,
    Model,
    /// Model path with heuristic fallback on failure.
    #[default]
    Auto,
}

/// Label used in extraction metadata for the pattern-bank path.
const HEURISTIC_MODEL_LABEL: &str = "heuristic";

/// Stateless extraction front door. One instance is shared across requests;
/// invocations are independent and the roster is read-only per call.
pub struct ExtractionService {
    client: Option<Arc<dyn CompletionClient>>,
}

impl ExtractionService {
    /// The completion client is injected here; pass `None` to run
    /// heuristics-only (e.g. no API key configured).
    pub fn new(client: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { client }
    }

    pub fn has_completion_client(&self) -> bool {
        self.client.is_some()
    }

    /// Run one extraction pass over a transcript.
    ///
    /// A failed model path propagates as an error in `Model` mode (no
    /// partial results) and falls back to the pattern bank in `Auto` mode.
    pub async fn extract(
        &self,
        transcript: &str,
        roster: &[TeamMember],
        mode: ExtractionMode,
        today: NaiveDate,
    ) -> Result<ExtractionResult, AppError> {
        match mode {
            ExtractionMode::Heuristic => Ok(self.extract_heuristic(transcript, today)),
            ExtractionMode::Model => self.extract_model(transcript, roster, today).await,
            ExtractionMode::Auto => {
                if self.client.is_none() {
                    return Ok(self.extract_heuristic(transcript, today));
                }
                match self.extract_model(transcript, roster, today).await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        tracing::warn!("model extraction failed, falling back to heuristics: {}", e);
                        Ok(self.extract_heuristic(transcript, today))
                    }
                }
            }
        }
    }

    fn extract_heuristic(&self, transcript: &str, today: NaiveDate) -> ExtractionResult {
        let candidates = heuristic::extract_heuristic(transcript, today);
        let tasks: Vec<_> = candidates.into_iter().map(normalize::normalize).collect();
        let tasks = heuristic::dedupe_by_title(tasks, |task| task.title.as_str());

        ExtractionResult {
            tasks,
            metadata: self.metadata(HEURISTIC_MODEL_LABEL),
        }
    }

    async fn extract_model(
        &self,
        transcript: &str,
        roster: &[TeamMember],
        today: NaiveDate,
    ) -> Result<ExtractionResult, AppError> {
        let client = self.client.as_deref().ok_or_else(|| {
            AppError::ExternalService("No completion service configured".to_string())
        })?;

        let candidates = model::extract_via_model(client, transcript, roster, today).await?;
        let tasks = candidates.into_iter().map(normalize::normalize).collect();

        Ok(ExtractionResult {
            tasks,
            metadata: self.metadata(client.model_name()),
        })
    }

    fn metadata(&self, model: &str) -> ExtractionMetadata {
        ExtractionMetadata {
            processed_at: Utc::now().to_rfc3339(),
            model: model.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedClient {
        response: Result<String, String>,
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<String, AppError> {
            self.response
                .clone()
                .map_err(AppError::ExternalService)
        }

        fn model_name(&self) -> &str {
            "scripted-model"
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 4).unwrap()
    }

    fn heuristic_only() -> ExtractionService {
        ExtractionService::new(None)
    }

    fn with_response(response: &str) -> ExtractionService {
        ExtractionService::new(Some(Arc::new(ScriptedClient {
            response: Ok(response.to_string()),
        })))
    }

    #[tokio::test]
    async fn test_heuristic_end_to_end() {
        let transcript = "00:00:23 — Mark\nI will implement rate limiting.\n\n00:00:32 — Jenna\nOkay, please complete that by March 5.";
        let result = heuristic_only()
            .extract(transcript, &[], ExtractionMode::Heuristic, today())
            .await
            .unwrap();

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].title, "implement rate limiting");
        assert_eq!(result.tasks[0].assignee.as_deref(), Some("Mark"));
        assert_eq!(result.metadata.model, "heuristic");
    }

    #[tokio::test]
    async fn test_heuristic_path_dedupes() {
        let transcript = "Mark: I will update the deployment runbook\nJenna said she will update the deployment runbook";
        let result = heuristic_only()
            .extract(transcript, &[], ExtractionMode::Heuristic, today())
            .await
            .unwrap();
        assert_eq!(result.tasks.len(), 1);
        // First-seen record wins.
        assert_eq!(result.tasks[0].assignee.as_deref(), Some("Mark"));
    }

    #[tokio::test]
    async fn test_model_mode_parses_response() {
        let service = with_response(
            "{\"tasks\":[{\"title\":\"Fix bug\",\"assignee\":\"eva\",\"priority\":\"high\",\"dueDate\":\"2025-03-06\"}]}",
        );
        let result = service
            .extract("transcript", &[], ExtractionMode::Model, today())
            .await
            .unwrap();

        assert_eq!(result.tasks.len(), 1);
        assert_eq!(result.tasks[0].title, "Fix bug");
        assert_eq!(result.tasks[0].due_date.as_deref(), Some("2025-03-06"));
        assert_eq!(result.metadata.model, "scripted-model");
    }

    #[tokio::test]
    async fn test_model_mode_without_client_fails() {
        let err = heuristic_only()
            .extract("transcript", &[], ExtractionMode::Model, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_model_mode_propagates_failure_without_partial_results() {
        let service = ExtractionService::new(Some(Arc::new(ScriptedClient {
            response: Err("boom".to_string()),
        })));
        let err = service
            .extract("Mark: I'll do things", &[], ExtractionMode::Model, today())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_heuristics() {
        let service = ExtractionService::new(Some(Arc::new(ScriptedClient {
            response: Err("unreachable".to_string()),
        })));
        let result = service
            .extract(
                "Mark: I'll write the postmortem",
                &[],
                ExtractionMode::Auto,
                today(),
            )
            .await
            .unwrap();
        assert_eq!(result.metadata.model, "heuristic");
        assert_eq!(result.tasks[0].title, "write the postmortem");
    }

    #[tokio::test]
    async fn test_auto_without_client_uses_heuristics() {
        let result = heuristic_only()
            .extract("Mark: I'll triage the queue", &[], ExtractionMode::Auto, today())
            .await
            .unwrap();
        assert_eq!(result.metadata.model, "heuristic");
    }
}
