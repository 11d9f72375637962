//! Generative extraction adapter.
//!
//! Builds a structured-extraction prompt, invokes a text-completion service
//! through the injected [`CompletionClient`], and recovers a strict task
//! array from the unstructured response via [`super::repair`].
//!
//! The HTTP client speaks both the Anthropic and OpenAI-compatible chat
//! formats, selected by URL.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::repair::recover_json;
use crate::errors::AppError;
use crate::models::{CandidateTask, Confidence, Priority, TeamMember};

/// A single request to the text-completion service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Black-box text-completion service.
///
/// Injected at construction time so tests can substitute a scripted double.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError>;

    /// Model identifier reported in extraction metadata.
    fn model_name(&self) -> &str;
}

/// Titles worded as optional work force the optional flag.
static OPTIONAL_WORDING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:optional|nice to have|if possible|later|future)\b")
        .expect("valid pattern")
});

const EXTRACTION_PROMPT: &str = r#"You are extracting actionable tasks from a meeting transcript.

EXTRACTION RULES:
- Capture direct assignments ("X, can you...", "X to do Y by Z", "asked X to...").
- Capture commitments ("I will...", "I'll...", "X will...", "X needs to...").
- Capture explicit deadlines and resolve relative dates ("tomorrow", "by EOD",
  "by March 5") against today's date given below, as YYYY-MM-DD.
- Include implied tasks (e.g. "the docs are outdated" implies updating the
  docs) and mark them with "inferred": true.
- Priority: "high" for urgent/blocking work or tight deadlines, "low" for
  optional/nice-to-have items, otherwise "medium".
- Mark nice-to-have items with "optional": true.
- "confidence" reflects how certain you are the item is a real task.
- Do not invent tasks that have no support in the transcript.

OUTPUT FORMAT (a single JSON object, no explanation):
{"tasks": [{"title": "...", "description": "...", "assignee": "name or null", "priority": "low|medium|high", "dueDate": "YYYY-MM-DD or null", "optional": false, "inferred": false, "confidence": "low|medium|high", "sourceText": "the transcript line this came from"}]}
"#;

/// Assemble the extraction prompt: fixed instruction template, the anchor
/// date, an optional roster clause, then the transcript.
pub fn build_prompt(transcript: &str, roster: &[TeamMember], today: NaiveDate) -> String {
    let mut prompt = String::from(EXTRACTION_PROMPT);
    prompt.push_str(&format!("\nToday's date is {}.\n", today.format("%Y-%m-%d")));

    if !roster.is_empty() {
        let names: Vec<String> = roster.iter().map(TeamMember::display_label).collect();
        prompt.push_str(&format!(
            "\nTeam members available for assignment: {}. Use these exact names for \"assignee\" when a task belongs to one of them.\n",
            names.join(", ")
        ));
    }

    prompt.push_str("\nTRANSCRIPT:\n");
    prompt.push_str(transcript);
    prompt
}

/// Extract candidate tasks via the completion service.
///
/// Fails with [`AppError::ExternalService`] when the service is unreachable
/// or returns no usable text, and with [`AppError::MalformedResponse`] when
/// no JSON can be recovered after repair. No internal retries; the caller
/// decides whether to fall back to the heuristic extractor.
pub async fn extract_via_model(
    client: &dyn CompletionClient,
    transcript: &str,
    roster: &[TeamMember],
    today: NaiveDate,
) -> Result<Vec<CandidateTask>, AppError> {
    let request = CompletionRequest {
        prompt: build_prompt(transcript, roster, today),
        temperature: 0.2,
        max_output_tokens: 2048,
    };

    let response = client.complete(request).await?;
    if response.trim().is_empty() {
        return Err(AppError::ExternalService(
            "Completion service returned an empty response".to_string(),
        ));
    }

    let value = recover_json(&response).ok_or_else(|| {
        // The only place raw model output is retained, for offline diagnosis.
        tracing::error!(raw_response = %response, "no JSON recoverable from completion response");
        AppError::MalformedResponse(
            "No JSON object could be recovered from the completion response".to_string(),
        )
    })?;

    let tasks = value.get("tasks").and_then(|t| t.as_array()).ok_or_else(|| {
        tracing::error!(raw_response = %response, "recovered JSON has no tasks array");
        AppError::MalformedResponse("Recovered JSON carries no \"tasks\" array".to_string())
    })?;

    Ok(tasks
        .iter()
        .filter_map(|entry| serde_json::from_value::<ModelTask>(entry.clone()).ok())
        .map(ModelTask::into_candidate)
        .collect())
}

/// Lenient mirror of one element of the model's `tasks` array.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelTask {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    optional: Option<bool>,
    #[serde(default)]
    inferred: Option<bool>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    source_text: Option<String>,
}

impl ModelTask {
    fn into_candidate(self) -> CandidateTask {
        let mut title = self.title.unwrap_or_default();
        let priority_hint = self.priority.as_deref().and_then(Priority::from_str);

        let optional = self.optional.unwrap_or(false) || OPTIONAL_WORDING_RE.is_match(&title);
        if optional && !title.trim_start().starts_with("(optional)") {
            title = format!("(optional) {}", title.trim());
        }

        CandidateTask {
            title,
            description: self.description.unwrap_or_default(),
            assignee_hint: self.assignee.filter(|a| !a.trim().is_empty()),
            due_date_hint: self.due_date,
            // Without an explicit model priority, the optional flag drives
            // the normalizer to low.
            priority_hint,
            confidence_hint: self.confidence.as_deref().and_then(Confidence::from_str),
            source_text: self.source_text,
            inferred: self.inferred.unwrap_or(false),
            optional,
        }
    }
}

/// HTTP completion client speaking the Anthropic or OpenAI chat format.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    format: ApiFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiFormat {
    Anthropic,
    OpenAi,
}

impl HttpCompletionClient {
    /// Build a client with an explicit configuration and request timeout.
    /// The timeout bounds the pipeline's only suspension point.
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: std::time::Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(format!("HTTP client build failed: {}", e)))?;

        let format = if api_url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAi
        };

        Ok(Self {
            client,
            api_key,
            api_url,
            model,
            format,
        })
    }

    async fn complete_anthropic(&self, request: &CompletionRequest) -> Result<String, AppError> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Completion service returned {}: {}",
                status, text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid completion payload: {}", e)))?;

        completion
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| AppError::ExternalService("Empty completion response".to_string()))
    }

    async fn complete_openai(&self, request: &CompletionRequest) -> Result<String, AppError> {
        let body = OpenAiRequest {
            model: self.model.clone(),
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Completion service returned {}: {}",
                status, text
            )));
        }

        let completion: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid completion payload: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalService("Empty completion response".to_string()))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AppError> {
        match self.format {
            ApiFormat::Anthropic => self.complete_anthropic(&request).await,
            ApiFormat::OpenAi => self.complete_openai(&request).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}
