//! Structured field extraction from a single post.

use std::time::Duration;

use dealdb_core::AiSettings;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AiError;
use crate::http::{build_client, endpoint, post_json};
use crate::retry::RetryPolicy;
use crate::schema::response_schema;

const SYSTEM_PROMPT: &str = "You are an analyst screening online posts for businesses, \
apps and side projects that are being offered for sale. You answer with a single JSON \
object and nothing else.";

/// Builds the fixed instruction prompt for one post.
#[must_use]
pub fn build_prompt(title: &str, body: &str) -> String {
    format!(
        "Analyze the post below and return a JSON object with exactly these fields:\n\
         - isSale (boolean): true only if the author is offering a business, product or project for sale.\n\
         - lowQuality (boolean): true if the post is vague, spammy or lacks concrete details.\n\
         - professionalSummary (string): two to four neutral sentences describing what is offered.\n\
         - monthlyRevenue (string or null): revenue or MRR as stated, with currency.\n\
         - askingPrice (string or null): the asking price as stated.\n\
         - userCount (string or null): users, customers or subscribers as stated.\n\
         - link (array of strings): URLs in the post that relate to the offering.\n\
         - otherImportantStuff (string): tech stack, traffic, reason for selling and anything else a buyer should know.\n\
         Use null for figures the post does not state. Do not invent numbers.\n\n\
         Title: {title}\n\n\
         Post:\n{body}"
    )
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client constrained to the deal extraction schema.
pub struct ExtractionClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl ExtractionClient {
    /// Creates a client from AI settings, with a linear retry policy built
    /// from `max_attempts` and `backoff_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: &AiSettings) -> Result<Self, AiError> {
        Ok(Self {
            client: build_client(settings.request_timeout_secs)?,
            url: endpoint(&settings.base_url, "chat/completions"),
            api_key: settings.api_key.clone(),
            model: settings.extraction_model.clone(),
            retry: RetryPolicy::linear(
                settings.max_attempts,
                Duration::from_millis(settings.backoff_ms),
            ),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Extracts deal fields from a post.
    ///
    /// Every failure (transport, non-2xx, missing content, unparseable JSON)
    /// is logged and reported as `None`; the caller treats it as a skip.
    pub async fn extract(&self, title: &str, body: &str) -> Option<Value> {
        match self.try_extract(title, body).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, title, "deal extraction failed");
                None
            }
        }
    }

    /// Like [`extract`](Self::extract) but surfaces the error.
    ///
    /// # Errors
    ///
    /// - [`AiError::RateLimited`] or [`AiError::Http`] once retries are spent.
    /// - [`AiError::Status`] on any other non-2xx response.
    /// - [`AiError::MissingContent`] if the reply has no message content.
    /// - [`AiError::Deserialize`] if the envelope or content is not JSON.
    pub async fn try_extract(&self, title: &str, body: &str) -> Result<Value, AiError> {
        let prompt = build_prompt(title, body);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "deal_extraction",
                    "strict": true,
                    "schema": response_schema(),
                }
            }),
        };

        let raw = self
            .retry
            .run(|attempt| {
                tracing::debug!(attempt, model = %self.model, "requesting extraction");
                post_json(&self.client, &self.url, &self.api_key, &request)
            })
            .await?;

        let response: ChatResponse =
            serde_json::from_str(&raw).map_err(|e| AiError::Deserialize {
                context: "chat completion envelope".to_string(),
                source: e,
            })?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AiError::MissingContent)?;

        serde_json::from_str(strip_code_fence(&content)).map_err(|e| AiError::Deserialize {
            context: "extraction content".to_string(),
            source: e,
        })
    }
}

/// Some providers wrap JSON in a markdown fence even in structured mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}
