use crate::provider::ProviderId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Errors this layer surfaces to callers. Infrastructure faults reported by
/// collaborators (`SecretStoreError`, `KeyPoolError`) are logged and trigger
/// tier fallback instead of appearing here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The resolved provider is blacklisted. Not retryable.
    #[error("provider unavailable: {provider}")]
    UnavailableProvider { provider: ProviderId },

    /// The requested model is blacklisted. Not retryable.
    #[error("model unavailable: {model}")]
    UnavailableModel { model: String },

    /// No usable credential after exhausting every tier. Actionable: add a key.
    #[error("missing credential for {provider}/{model}: {reason}")]
    MissingCredential {
        provider: ProviderId,
        model: String,
        reason: String,
    },

    /// A vendor stream chunk could not be decoded. Terminates the stream;
    /// retry policy belongs to the caller.
    #[error("stream decode error ({provider}): {detail}")]
    StreamDecode { provider: ProviderId, detail: String },
}

impl OrchestratorError {
    pub fn stream_decode(provider: ProviderId, detail: impl Into<String>) -> Self {
        Self::StreamDecode {
            provider,
            detail: detail.into(),
        }
    }
}
