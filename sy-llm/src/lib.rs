//! Multi-provider LLM request orchestration for Switchyard.
//!
//! Resolves which backend serves a model, resolves the credential to use
//! under a tiered fallback policy, translates provider-agnostic tool
//! requests into vendor wire shapes, cycles forced tools across turns,
//! normalizes vendor streams, and prices token usage. Pure library: HTTP
//! transport, persistence, and secret encryption are external collaborators.

mod blacklist;
mod cost;
mod credentials;
mod cycle;
mod error;
mod policy;
mod provider;
mod registry;
mod resolve;
mod stream;

pub use blacklist::{BLACKLIST_MODELS_ENV, BLACKLIST_PROVIDERS_ENV, Blacklist};
pub use cost::{CostParams, CostResult, PricingSource, compute_cost};
pub use credentials::{
    CredentialEnv, CredentialRequest, CredentialResolution, KeyOrigin, KeyPoolError,
    RotatingKeyPool, SecretStore, SecretStoreError, resolve_credential,
};
pub use cycle::{CycleOutcome, advance_forced_tool_cycle};
pub use error::{OrchestratorError, Result};
pub use policy::{ToolChoice, ToolDescriptor, ToolPolicy, UsageControl, build_tool_policy};
pub use provider::{ProviderId, ToolChoiceFamily};
pub use registry::{
    Capabilities, ModelCatalogEntry, PricingEntry, RegistrySnapshot, SharedRegistry,
    default_pricing,
};
pub use resolve::resolve_provider;
pub use stream::{StreamChunk, TokenUsage, decode_stream};
