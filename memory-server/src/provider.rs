//! A `reqwest`-backed [`CompletionProvider`] for the LLM extractor: posts
//! the analysis prompt to a configured HTTP completion endpoint.

use std::time::Duration;

use memory_extract::{CompletionProvider, CompletionRequest, CompletionResponse, ProviderError};
use serde::{Deserialize, Serialize};

/// Calls an HTTP completion endpoint expecting `{prompt, max_tokens}` in
/// and `{text}` out.
#[derive(Debug, Clone)]
pub struct HttpCompletionProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpCompletionProvider {
    /// Construct a provider targeting `endpoint`, with an optional bearer
    /// token and request deadline.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { client, endpoint: endpoint.into(), api_key }
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct WireResponse {
    text: String,
}

impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let mut builder = self.client.post(&self.endpoint).json(&WireRequest { prompt: &request.prompt, max_tokens: request.max_tokens });
        if let Some(token) = &self.api_key {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(classify_error)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if response.status() == reqwest::StatusCode::UNAUTHORIZED || response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::AuthFailed(response.status().to_string()));
        }
        if !response.status().is_success() {
            return Err(ProviderError::RequestFailed(format!("status {}", response.status())));
        }

        let body: WireResponse = response.json().await.map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(CompletionResponse { text: body.text })
    }
}

fn classify_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::RequestFailed(e.to_string())
    }
}
