//! Capability interface for the LLM extractor's completion backend.
//!
//! [`CompletionProvider`] uses RPITIT and is intentionally NOT object-safe:
//! the extractor is generic over its provider rather than holding a trait
//! object, and the provider is always supplied by the caller — the
//! extractor never constructs one.

use std::future::Future;

use thiserror::Error;

/// A single completion request: the extraction prompt plus a budget.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// The full prompt text (task description, recent turns, graph view).
    pub prompt: String,
    /// Upper bound on response tokens the provider should allow.
    pub max_tokens: u32,
}

/// A provider's raw text completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The completion text, expected to contain a JSON `UpdatePlan`,
    /// possibly wrapped in prose or a code fence.
    pub text: String,
}

/// Errors from a completion backend.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider timed out before responding.
    #[error("request timed out")]
    Timeout,

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited | ProviderError::RequestFailed(_) | ProviderError::Timeout)
    }
}

/// Completion backend used by [`crate::llm_extractor::LlmExtractor`].
///
/// Not object-safe by design; callers hold a concrete `P: CompletionProvider`
/// rather than `dyn CompletionProvider`.
pub trait CompletionProvider: Send + Sync {
    /// Send a completion request to the backend.
    fn complete(&self, request: CompletionRequest) -> impl Future<Output = Result<CompletionResponse, ProviderError>> + Send;
}
