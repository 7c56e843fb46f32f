// Gemini API client (API-key authenticated generateContent)
// Author: kelexine (https://github.com/kelexine)

use crate::backend::{BackendError, GenerateOptions, GenerationBackend};
use crate::config::{ApiKey, GeminiConfig, PerformanceConfig};
use crate::error::{ProxyError, Result};
use crate::models::gemini::{
    ApiErrorResponse, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
    Part, SystemInstruction,
};
use crate::utils::logging::sanitize;
use crate::utils::retry::parse_retry_delay;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Client for the Google Gemini API.
///
/// Sends a single-turn `generateContent` request per call and turns the
/// upstream outcome into text or a typed [`BackendError`]:
/// - HTTP 429 or `RESOURCE_EXHAUSTED` becomes `RateLimited`, with the
///   `RetryInfo` delay when Google sends one
/// - 5xx and connection failures become `Unavailable`
/// - client-side deadline hits become `Timeout`
/// - everything else (other 4xx, blocked prompts, empty answers) is `Invalid`
pub struct GeminiClient {
    http_client: Client,
    config: GeminiConfig,
    api_key: ApiKey,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// Fails if no API key is configured or the HTTP client cannot be built.
    pub fn new(config: &GeminiConfig, performance: &PerformanceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_blank())
            .ok_or_else(|| ProxyError::Config("GEMINI_API_KEY is not set".to_string()))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_max_idle_per_host(performance.connection_pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .build()
            .map_err(|e| ProxyError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created Gemini HTTP client for model {}", config.model);

        Ok(Self {
            http_client,
            config: config.clone(),
            api_key,
        })
    }

    /// The model every request is sent to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the API base_url
    pub fn base_url(&self) -> &str {
        &self.config.api_base_url
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build the upstream request body for one prompt.
    pub fn build_request(&self, prompt: &str, options: &GenerateOptions) -> GenerateContentRequest {
        let instruction = options
            .system_instruction
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                Some(self.config.default_system_instruction.as_str())
                    .filter(|s| !s.trim().is_empty())
            });

        let generation_config = (options.temperature.is_some()
            || options.max_output_tokens.is_some())
        .then(|| GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        });

        GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            system_instruction: instruction.map(|text| SystemInstruction {
                parts: vec![Part::text(text)],
            }),
            generation_config,
        }
    }

    /// Map a non-2xx upstream response to a failure kind.
    fn classify_status(status: StatusCode, body: &str) -> BackendError {
        let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
        let rpc_status = parsed.as_ref().and_then(|e| e.error.status.clone());
        let message = parsed
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| body.to_string());
        let message = sanitize(&format!("HTTP {}: {}", status.as_u16(), message));

        if status == StatusCode::TOO_MANY_REQUESTS
            || rpc_status.as_deref() == Some("RESOURCE_EXHAUSTED")
        {
            return BackendError::rate_limited(parse_retry_delay(body), message);
        }

        match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                BackendError::timeout(message)
            }
            s if s.is_server_error() => BackendError::unavailable(message),
            _ => BackendError::invalid(message),
        }
    }

    /// Map a transport-level failure to a failure kind.
    fn classify_transport(err: reqwest::Error) -> BackendError {
        let message = sanitize(&err.to_string());
        if err.is_timeout() {
            BackendError::timeout(message)
        } else {
            BackendError::unavailable(message)
        }
    }

    /// Pull the answer out of a successful response body.
    fn extract_text(body: &str) -> std::result::Result<String, BackendError> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            BackendError::invalid(format!("Response parsing error: {}", e))
        })?;

        if let Some(text) = response.first_text() {
            return Ok(text);
        }

        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {}", r))
            .or_else(|| {
                response
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .map(|r| format!("no text, finish reason {}", r))
            })
            .unwrap_or_else(|| "no candidates returned".to_string());

        Err(BackendError::invalid(reason))
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> std::result::Result<String, BackendError> {
        let request = self.build_request(prompt, options);
        debug!("Calling generateContent for model: {}", self.config.model);

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(Self::classify_transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(Self::classify_transport)?;

        if !status.is_success() {
            let err = Self::classify_status(status, &body);
            warn!("Gemini API error ({}): {}", err.kind, err.message);
            return Err(err);
        }

        debug!(
            "Raw Gemini response (first 500 chars): {}",
            body.chars().take(500).collect::<String>()
        );

        Self::extract_text(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
