//! The reasoning backend the lifecycle calls out to.
//!
//! [`Analyzer`] abstracts over how a claim gets assessed so the lifecycle
//! doesn't depend on the transport. [`ChatCompletionsAnalyzer`] binds it to an
//! OpenAI-style chat-completions endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;

const ANALYSIS_PROMPT: &str = r#"You are a professional rumor checking expert. Assess the credibility of the user's claim with logic and evidence.

Return a strictly valid JSON object with this structure:
{
  "message": "A detailed diagnosis report in Markdown. Use bold text and a clear structure.",
  "isRumor": boolean,
  "graphData": {
    "nodes": [ { "id": "1", "label": "Origin name", "group": 1, "time": "Date" } ],
    "links": [ { "source": "1", "target": "2", "value": 1 } ]
  }
}

Graph rules:
- Describe how the claim propagated, or how the parties in the event relate.
- group 1: source or origin of the claim.
- group 2: spreader, media outlet or other key amplifier.
- group 3: official source, fact check or debunk.
- Every link source and target must match a node id."#;

const HEADLINES_PROMPT: &str = r#"You are a news aggregator for a rumor debunking platform.
Produce 5 representative examples of recent internet rumors or debunked news items from the China Internet Joint Rumor Debunking Platform (source name: 中国互联网联合辟谣平台), Toutiao (source name: 今日头条) and Weibo (source name: 微博).

Return a strictly valid JSON object with a key "items" holding an array. Each item has:
- title (string): the headline.
- source (string): exactly one of '中国互联网联合辟谣平台', '今日头条', '微博'.
- status (string): 'verified' for confirmed news or 'debunked' for rumors.
- timestamp (string): a relative time such as "10 minutes ago"."#;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no API key configured for the analysis backend")]
    MissingApiKey,
    #[error("analysis backend unreachable: {0}")]
    Transport(String),
    #[error("analysis backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("analysis backend returned a malformed payload: {0}")]
    MalformedPayload(String),
    #[error("analysis worker stopped before replying")]
    WorkerDisconnected,
}

impl AnalysisError {
    /// Text suitable for showing next to the user's query.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey => {
                "The analysis service is not configured: set an API key and try again.".to_owned()
            }
            Self::Http { status, .. } => {
                format!("The analysis service rejected the request (HTTP {status}). Please try again later.")
            }
            Self::Transport(_) | Self::WorkerDisconnected => {
                "The analysis service could not be reached. Please try again later.".to_owned()
            }
            Self::MalformedPayload(_) => {
                "The analysis service returned an unreadable answer. Please try again.".to_owned()
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingApiKey)
    }
}

/// Structured answer for one claim. `graph_raw` is untrusted.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisReply {
    pub message: String,
    pub is_rumor: bool,
    pub graph_raw: Value,
}

impl AnalysisReply {
    /// Reads the JSON document the model produced for a claim.
    pub fn from_content(content: &str) -> Result<Self, AnalysisError> {
        let parsed: Value = serde_json::from_str(content.trim())
            .map_err(|error| AnalysisError::MalformedPayload(format!("invalid JSON: {error}")))?;
        let object = parsed
            .as_object()
            .ok_or_else(|| AnalysisError::MalformedPayload("reply is not an object".to_owned()))?;

        let message = object
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| AnalysisError::MalformedPayload("reply has no message".to_owned()))?
            .to_owned();

        Ok(Self {
            message,
            is_rumor: object
                .get("isRumor")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            graph_raw: object.get("graphData").cloned().unwrap_or(Value::Null),
        })
    }
}

/// Blocking access to the reasoning backend. Called from worker threads.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, query: &str) -> Result<AnalysisReply, AnalysisError>;

    /// Raw ticker items; callers sanitize them before display.
    fn fetch_headlines(&self) -> Result<Vec<Value>, AnalysisError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct ChatCompletionsAnalyzer {
    config: AnalysisConfig,
    client: reqwest::blocking::Client,
}

impl ChatCompletionsAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|error| AnalysisError::Transport(error.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AnalysisError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "sending completion request");
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .map_err(|error| AnalysisError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "completion request failed");
            return Err(AnalysisError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .map_err(|error| AnalysisError::MalformedPayload(error.to_string()))?;
        Ok(reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_else(|| "{}".to_owned()))
    }
}

impl Analyzer for ChatCompletionsAnalyzer {
    fn analyze(&self, query: &str) -> Result<AnalysisReply, AnalysisError> {
        let content = self.complete(
            ANALYSIS_PROMPT,
            &format!("Analyze this information: \"{query}\""),
        )?;
        AnalysisReply::from_content(&content)
    }

    fn fetch_headlines(&self) -> Result<Vec<Value>, AnalysisError> {
        let content = self.complete(HEADLINES_PROMPT, "Generate the news list now.")?;
        let parsed: Value = serde_json::from_str(content.trim())
            .map_err(|error| AnalysisError::MalformedPayload(format!("invalid JSON: {error}")))?;
        let items = match parsed {
            Value::Object(mut object) => object.remove("items").unwrap_or(Value::Null),
            other => other,
        };
        match items {
            Value::Array(items) => Ok(items),
            _ => Err(AnalysisError::MalformedPayload(
                "headline reply has no item list".to_owned(),
            )),
        }
    }
}
