//! Completion collaborator: streaming chat completions over an
//! OpenAI-compatible API, with moderation-vs-transport error
//! classification.

pub mod prompts;
pub mod streaming;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;
use tracing::warn;

use crate::config::LlmConfig;
use crate::Result;
use crate::SolaceError;

pub use prompts::ComposedPrompt;
pub use streaming::StreamingResponse;

/// Streaming completion collaborator.
///
/// A `ModerationBlocked` error, from the initial call or an item of the
/// returned stream, is a content-policy classification; every other error
/// is transport-level and retried without prompt changes.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn stream(&self, prompt: &ComposedPrompt) -> Result<StreamingResponse>;
}

pub struct HttpCompletionService {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
}

impl HttpCompletionService {
    /// Create a client for the configured completion service.
    ///
    /// # Errors
    /// - HTTP client build errors (invalid configuration)
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SolaceError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            api_key: config.llm_key.clone(),
            model: config.llm_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Classify a failed completion call. Moderation rejections are 400/403
    /// responses whose body names the content policy; everything else is
    /// transport-level.
    fn classify_error(status: reqwest::StatusCode, body: &str) -> SolaceError {
        let lowered = body.to_lowercase();
        let policy_hit = lowered.contains("moderation")
            || lowered.contains("content policy")
            || lowered.contains("content_policy")
            || lowered.contains("flagged");
        if (status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::FORBIDDEN)
            && policy_hit
        {
            SolaceError::ModerationBlocked
        } else {
            SolaceError::HttpError(format!("completion returned {status}"))
        }
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn stream(&self, prompt: &ComposedPrompt) -> Result<StreamingResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Starting completion stream: model={}", self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_error(status, &body));
        }

        // Forward deltas as they arrive; never buffer the full completion.
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(32);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut line_buffer = String::new();

            'outer: while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(SolaceError::HttpError(format!(
                                "stream read failed: {e}"
                            ))))
                            .await;
                        return;
                    }
                };

                line_buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete lines from the buffer
                while let Some(newline_pos) = line_buffer.find('\n') {
                    let line = line_buffer[..newline_pos].trim().to_string();
                    line_buffer.drain(..=newline_pos);

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };

                    if data == "[DONE]" {
                        break 'outer;
                    }

                    let parsed: ChatChunk = match serde_json::from_str(data) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            warn!("Skipping unparseable stream frame: {}", e);
                            continue;
                        }
                    };

                    let Some(choice) = parsed.choices.into_iter().next() else {
                        continue;
                    };

                    if choice.finish_reason.as_deref() == Some("content_filter") {
                        let _ = tx.send(Err(SolaceError::ModerationBlocked)).await;
                        return;
                    }

                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                            // Caller went away; stop reading the upstream
                            return;
                        }
                    }
                }
            }
        });

        Ok(StreamingResponse::new(Box::pin(ReceiverStream::new(rx))))
    }
}
