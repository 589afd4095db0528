//! Model name → provider resolution.

use crate::blacklist::Blacklist;
use crate::error::{OrchestratorError, Result};
use crate::provider::ProviderId;
use crate::registry::RegistrySnapshot;

/// Provider that takes any model name nothing else claimed.
const FALLBACK_PROVIDER: ProviderId = ProviderId::Ollama;

/// Resolve a model name to the provider serving it.
///
/// Lookup order: flattened exact index (registration order wins), then each
/// provider's patterns in registration order, then the self-hosted fallback.
/// Blacklist rules are applied after resolution, so they also cover the
/// fallback and models matched by more than one pattern.
#[tracing::instrument(level = "debug", skip(snapshot, blacklist))]
pub fn resolve_provider(
    snapshot: &RegistrySnapshot,
    blacklist: &Blacklist,
    model: &str,
) -> Result<ProviderId> {
    let folded = model.to_ascii_lowercase();

    let provider = snapshot
        .exact_match(&folded)
        .or_else(|| snapshot.pattern_match(&folded))
        .unwrap_or_else(|| {
            tracing::debug!(model = %folded, fallback = %FALLBACK_PROVIDER,
                "model matched no registration; routing to local fallback");
            FALLBACK_PROVIDER
        });

    if blacklist.blocks_provider(provider) {
        return Err(OrchestratorError::UnavailableProvider { provider });
    }
    if blacklist.blocks_model(&folded) {
        return Err(OrchestratorError::UnavailableModel {
            model: model.to_string(),
        });
    }

    Ok(provider)
}
