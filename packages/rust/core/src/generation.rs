//! Marketing copy generation.
//!
//! [`ContentGenerator`] asks a [`TextGenerator`] for copy when one is
//! configured and falls back to templates for whatever it cannot get. It
//! never returns an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use trendbrief_shared::{
    ContentOrigin, EnrichedRecord, MarketingContent, ProcessedRecord, Result, StageProgress,
    TrendBriefError,
};

use crate::fallback::{fallback_content, fill_blanks};
use crate::prompt::{SYSTEM_PROMPT, build_prompt, parse_reply};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("trendbrief/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Generative-text capability
// ---------------------------------------------------------------------------

/// A chat-style text model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> &str;

    /// One completion for `prompt` under the `system` role.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible `POST {api_base}/chat/completions`.
pub struct OpenAiChatGenerator {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiChatGenerator {
    /// The client carries no timeout of its own; [`ContentGenerator`] bounds
    /// each call.
    pub fn new(
        api_key: impl Into<String>,
        api_base: &str,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TrendBriefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: api_base.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            max_tokens,
        })
    }

    /// Point at a different host (used by tests).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(model = %self.model, "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| TrendBriefError::Generation(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(TrendBriefError::Generation(format!(
                "API error ({status}): {snippet}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TrendBriefError::Generation(format!("malformed response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| TrendBriefError::Generation("no choices in response".into()))
    }
}

// ---------------------------------------------------------------------------
// Content generator
// ---------------------------------------------------------------------------

/// Counts from one [`ContentGenerator::generate_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Every field came from the model.
    pub generated: usize,
    /// The model answered but some fields were templated.
    pub partial: usize,
    /// Entirely templated.
    pub fallback: usize,
}

impl GenerationStats {
    fn record(&mut self, origin: ContentOrigin) {
        match origin {
            ContentOrigin::Model => self.generated += 1,
            ContentOrigin::Partial => self.partial += 1,
            ContentOrigin::Fallback => self.fallback += 1,
        }
    }
}

/// Produces [`MarketingContent`] for every record, model or not.
pub struct ContentGenerator {
    generator: Option<Box<dyn TextGenerator>>,
    timeout: Duration,
    delay: Duration,
    prompt_readme_chars: usize,
}

impl ContentGenerator {
    /// `generator: None` means templates only.
    pub fn new(
        generator: Option<Box<dyn TextGenerator>>,
        timeout: Duration,
        delay: Duration,
        prompt_readme_chars: usize,
    ) -> Self {
        Self {
            generator,
            timeout,
            delay,
            prompt_readme_chars,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    /// Copy for one record and where it came from.
    ///
    /// The model call races a timer; if the timer wins, the call is dropped
    /// and the record gets template content, the same as for an error.
    #[instrument(skip_all, fields(repo = %record.candidate.name))]
    pub async fn generate(&self, record: &EnrichedRecord) -> (MarketingContent, ContentOrigin) {
        let candidate = &record.candidate;
        let Some(generator) = &self.generator else {
            debug!("no generator configured, using templates");
            return (fallback_content(candidate), ContentOrigin::Fallback);
        };

        let prompt = build_prompt(record, self.prompt_readme_chars);
        let reply =
            match tokio::time::timeout(self.timeout, generator.complete(SYSTEM_PROMPT, &prompt))
                .await
            {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!(error = %e, "generation failed, using templates");
                    return (fallback_content(candidate), ContentOrigin::Fallback);
                }
                Err(_) => {
                    warn!(
                        timeout_ms = self.timeout.as_millis() as u64,
                        "generation timed out, using templates"
                    );
                    return (fallback_content(candidate), ContentOrigin::Fallback);
                }
            };

        let Some(mut content) = parse_reply(&reply) else {
            warn!("reply had no JSON object, using templates");
            return (fallback_content(candidate), ContentOrigin::Fallback);
        };

        match fill_blanks(&mut content, candidate) {
            0 => (content, ContentOrigin::Model),
            6 => (content, ContentOrigin::Fallback),
            filled => {
                debug!(filled, "reply missing fields, templated them");
                (content, ContentOrigin::Partial)
            }
        }
    }

    /// Generate copy for every record, in order, pausing between model calls.
    #[instrument(skip_all, fields(records = records.len(), model = self.generator.as_ref().map(|g| g.model())))]
    pub async fn generate_all(
        &self,
        records: Vec<EnrichedRecord>,
        progress: &dyn StageProgress,
    ) -> (Vec<ProcessedRecord>, GenerationStats) {
        progress.phase("Generating marketing copy");
        let total = records.len();
        let mut stats = GenerationStats::default();
        let mut processed = Vec::with_capacity(total);

        for (i, record) in records.into_iter().enumerate() {
            progress.task_progress(i + 1, total, &record.candidate.name);

            let (marketing, origin) = self.generate(&record).await;
            stats.record(origin);
            processed.push(ProcessedRecord {
                enriched: record,
                marketing,
                origin,
            });

            if self.is_configured() && i + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            generated = stats.generated,
            partial = stats.partial,
            fallback = stats.fallback,
            "generation complete"
        );
        (processed, stats)
    }
}
