use super::http_client::build_endpoint_client;
use super::scan::DeltaScanner;
use super::streaming::ChunkSink;
use super::types::{ContextEntry, GenerateContentRequest};
use crate::error::LlmError;
use futures_util::StreamExt;
use reqwest::Client;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Explicit engine configuration; nothing is read from globals.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl EngineConfig {
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Issues one streamed `generateContent` exchange and forwards text deltas
/// to a [`ChunkSink`] as the body arrives.
///
/// Failure surfacing: every error path emits one final human-readable chunk
/// through the sink before returning the error, so a transcript fed by the
/// sink always ends with a visible message instead of stalling silently.
/// No retries happen here.
pub struct GeminiEngine {
    config: EngineConfig,
    client: Client,
}

impl GeminiEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            client: build_endpoint_client(),
        }
    }

    /// Stream one model response for the given conversation context.
    ///
    /// Resolves `Ok(())` only when the transport finished with a success
    /// status; otherwise the error is both returned and echoed through the
    /// sink. A missing API key fails before any network call.
    pub async fn stream_response(
        &self,
        model: &str,
        contents: &[ContextEntry],
        sink: &dyn ChunkSink,
    ) -> Result<(), LlmError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(self.surface(LlmError::MissingApiKey, sink).await);
        };

        let url = format!(
            "{}/v1beta/models/{model}:streamGenerateContent?key={api_key}",
            self.config.base_url
        );
        let request = GenerateContentRequest { contents };

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(error) => {
                let error = LlmError::Transport(self.redact(&error.to_string()));
                return Err(self.surface(error, sink).await);
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::Status {
                status,
                message: self.redact(&truncate(&body, 300)),
            };
            return Err(self.surface(error, sink).await);
        }

        let mut scanner = DeltaScanner::new();
        let mut byte_stream = response.bytes_stream();
        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for delta in scanner.push_chunk(&bytes) {
                        sink.on_chunk(&delta).await;
                    }
                }
                Err(error) => {
                    let error = LlmError::Transport(self.redact(&error.to_string()));
                    return Err(self.surface(error, sink).await);
                }
            }
        }

        Ok(())
    }

    /// Emit the terminal error chunk, log, and hand the error back.
    async fn surface(&self, error: LlmError, sink: &dyn ChunkSink) -> LlmError {
        tracing::warn!("stream failed: {error}");
        sink.on_chunk(&format!("\n[error: {error}]")).await;
        error
    }

    /// The key travels in the URL query, so transport errors can echo it.
    fn redact(&self, message: &str) -> String {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => message.replace(key, "[redacted]"),
            _ => message.to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
