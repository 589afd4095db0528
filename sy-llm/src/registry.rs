//! Model catalog and pricing, published as immutable snapshots.
//!
//! Registration order encodes provider precedence: when two providers
//! enumerate the same model name, the earlier registration wins the exact
//! index. Refreshing a dynamically-discovered model list produces a whole
//! new snapshot swapped atomically; snapshots are never mutated in place.

use crate::provider::ProviderId;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Per-million-token USD prices. All prices are non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    pub input: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input: Option<f64>,
    pub output: f64,
    pub effective_date: NaiveDate,
}

impl PricingEntry {
    pub fn new(input: f64, cached_input: Option<f64>, output: f64, effective: NaiveDate) -> Self {
        debug_assert!(input >= 0.0 && output >= 0.0);
        debug_assert!(cached_input.is_none_or(|c| c >= 0.0));
        Self {
            input,
            cached_input,
            output,
            effective_date: effective,
        }
    }
}

/// Pricing applied when a model is absent from every table, so an unknown
/// model is never reported as free.
pub fn default_pricing() -> PricingEntry {
    PricingEntry::new(1.0, Some(0.5), 5.0, date(2025, 7, 1))
}

/// What a provider's models accept beyond plain sampling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    /// Inclusive (min, max) temperature range, when temperature is supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<(f32, f32)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning_effort_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbosity_levels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thinking_levels: Vec<String>,
    #[serde(default)]
    pub tool_usage_control: bool,
}

/// One provider's registration: enumerated models, dynamic-name patterns,
/// default model, and pricing.
#[derive(Debug, Clone)]
pub struct ModelCatalogEntry {
    pub provider: ProviderId,
    /// Ordered, unique, lowercase canonical names.
    pub models: Vec<String>,
    /// Tested in order against folded model names the exact index misses.
    pub patterns: Vec<Regex>,
    pub default_model: String,
    pub pricing: HashMap<String, PricingEntry>,
    pub capabilities: Capabilities,
    /// Accepts open-ended model names discovered at runtime.
    pub dynamic: bool,
}

impl ModelCatalogEntry {
    pub fn pricing_for(&self, folded_model: &str) -> Option<&PricingEntry> {
        self.pricing.get(folded_model)
    }
}

/// Immutable view of every registration, plus the flattened exact index.
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    entries: Vec<ModelCatalogEntry>,
    exact_index: HashMap<String, ProviderId>,
    embedding_pricing: HashMap<String, PricingEntry>,
}

impl RegistrySnapshot {
    pub fn new(
        entries: Vec<ModelCatalogEntry>,
        embedding_pricing: HashMap<String, PricingEntry>,
    ) -> Self {
        let mut exact_index = HashMap::new();
        for entry in &entries {
            for model in &entry.models {
                // First registration wins: order encodes precedence.
                exact_index
                    .entry(model.to_ascii_lowercase())
                    .or_insert(entry.provider);
            }
        }
        Self {
            entries,
            exact_index,
            embedding_pricing,
        }
    }

    pub fn entries(&self) -> &[ModelCatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, provider: ProviderId) -> Option<&ModelCatalogEntry> {
        self.entries.iter().find(|e| e.provider == provider)
    }

    pub fn exact_match(&self, folded_model: &str) -> Option<ProviderId> {
        self.exact_index.get(folded_model).copied()
    }

    /// First pattern match in registration order.
    pub fn pattern_match(&self, folded_model: &str) -> Option<ProviderId> {
        self.entries
            .iter()
            .find(|e| e.patterns.iter().any(|p| p.is_match(folded_model)))
            .map(|e| e.provider)
    }

    pub fn embedding_pricing(&self, folded_model: &str) -> Option<&PricingEntry> {
        self.embedding_pricing.get(folded_model)
    }

    pub fn model_pricing(&self, folded_model: &str) -> Option<&PricingEntry> {
        self.entries
            .iter()
            .find_map(|e| e.pricing_for(folded_model))
    }

    /// New snapshot with `provider`'s enumerated models replaced. Used to
    /// publish a refreshed dynamically-discovered list; everything else is
    /// carried over unchanged. Only dynamic providers are refreshable.
    pub fn with_models(&self, provider: ProviderId, models: Vec<String>) -> Self {
        if self.entry(provider).is_none_or(|e| !e.dynamic) {
            tracing::warn!(%provider, "refusing model-list refresh for a non-dynamic provider");
            return self.clone();
        }
        let entries = self
            .entries
            .iter()
            .map(|e| {
                if e.provider == provider {
                    let mut e = e.clone();
                    e.models = models
                        .iter()
                        .map(|m| m.to_ascii_lowercase())
                        .collect();
                    e
                } else {
                    e.clone()
                }
            })
            .collect();
        Self::new(entries, self.embedding_pricing.clone())
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self::new(builtin_entries(), embedding_table())
    }
}

/// Process-wide registry handle. Readers take a cheap `Arc` clone and keep
/// iterating their snapshot even while an admin refresh swaps in a new one.
#[derive(Debug)]
pub struct SharedRegistry {
    inner: RwLock<Arc<RegistrySnapshot>>,
}

impl SharedRegistry {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn builtin() -> Self {
        Self::new(RegistrySnapshot::builtin())
    }

    pub fn load(&self) -> Arc<RegistrySnapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Atomically replace the current snapshot.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn store(&self, snapshot: RegistrySnapshot) {
        let next = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(pattern = *p, %e, "dropping invalid model pattern");
                None
            }
        })
        .collect()
}

fn models(names: &[&str]) -> Vec<String> {
    names.iter().map(|m| m.to_ascii_lowercase()).collect()
}

struct PricingRow(&'static str, f64, Option<f64>, f64, NaiveDate);

fn pricing(rows: Vec<PricingRow>) -> HashMap<String, PricingEntry> {
    rows.into_iter()
        .map(|PricingRow(model, input, cached, output, eff)| {
            (
                model.to_ascii_lowercase(),
                PricingEntry::new(input, cached, output, eff),
            )
        })
        .collect()
}

fn levels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn builtin_entries() -> Vec<ModelCatalogEntry> {
    let d = date(2025, 6, 1);
    vec![
        ModelCatalogEntry {
            provider: ProviderId::OpenAi,
            models: models(&[
                "gpt-5",
                "gpt-4.1",
                "gpt-4o",
                "gpt-4o-mini",
                "o3",
                "o4-mini",
            ]),
            patterns: compile(&[r"^gpt-", r"^o\d"]),
            default_model: "gpt-4o".to_string(),
            pricing: pricing(vec![
                PricingRow("gpt-5", 1.25, Some(0.125), 10.0, d),
                PricingRow("gpt-4.1", 2.0, Some(0.5), 8.0, d),
                PricingRow("gpt-4o", 2.5, Some(1.25), 10.0, d),
                PricingRow("gpt-4o-mini", 0.15, Some(0.075), 0.6, d),
                PricingRow("o3", 2.0, Some(0.5), 8.0, d),
                PricingRow("o4-mini", 1.1, Some(0.275), 4.4, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                reasoning_effort_levels: levels(&["minimal", "low", "medium", "high"]),
                verbosity_levels: levels(&["low", "medium", "high"]),
                thinking_levels: Vec::new(),
                tool_usage_control: true,
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::Anthropic,
            models: models(&[
                "claude-sonnet-4-5",
                "claude-opus-4-1",
                "claude-3-7-sonnet",
                "claude-3-5-haiku",
            ]),
            patterns: compile(&[r"^claude-"]),
            default_model: "claude-sonnet-4-5".to_string(),
            pricing: pricing(vec![
                PricingRow("claude-sonnet-4-5", 3.0, Some(0.3), 15.0, d),
                PricingRow("claude-opus-4-1", 15.0, Some(1.5), 75.0, d),
                PricingRow("claude-3-7-sonnet", 3.0, Some(0.3), 15.0, d),
                PricingRow("claude-3-5-haiku", 0.8, Some(0.08), 4.0, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 1.0)),
                reasoning_effort_levels: Vec::new(),
                verbosity_levels: Vec::new(),
                thinking_levels: levels(&["none", "low", "medium", "high"]),
                tool_usage_control: true,
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::Google,
            models: models(&["gemini-2.5-pro", "gemini-2.5-flash", "gemini-2.0-flash"]),
            patterns: compile(&[r"^gemini-"]),
            default_model: "gemini-2.5-pro".to_string(),
            pricing: pricing(vec![
                PricingRow("gemini-2.5-pro", 1.25, Some(0.31), 10.0, d),
                PricingRow("gemini-2.5-flash", 0.3, Some(0.075), 2.5, d),
                PricingRow("gemini-2.0-flash", 0.1, Some(0.025), 0.4, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                reasoning_effort_levels: Vec::new(),
                verbosity_levels: Vec::new(),
                thinking_levels: levels(&["none", "low", "high"]),
                tool_usage_control: true,
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::AzureOpenAi,
            models: Vec::new(),
            patterns: compile(&[r"^azure/"]),
            default_model: "azure/gpt-4o".to_string(),
            pricing: HashMap::new(),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: true,
        },
        ModelCatalogEntry {
            provider: ProviderId::Groq,
            models: models(&["llama-3.3-70b-versatile", "llama-3.1-8b-instant"]),
            patterns: compile(&[r"^groq/"]),
            default_model: "llama-3.3-70b-versatile".to_string(),
            pricing: pricing(vec![
                PricingRow("llama-3.3-70b-versatile", 0.59, None, 0.79, d),
                PricingRow("llama-3.1-8b-instant", 0.05, None, 0.08, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::Mistral,
            models: models(&["mistral-large-latest", "mistral-small-latest"]),
            patterns: compile(&[r"^mistral-", r"^codestral-"]),
            default_model: "mistral-large-latest".to_string(),
            pricing: pricing(vec![
                PricingRow("mistral-large-latest", 2.0, None, 6.0, d),
                PricingRow("mistral-small-latest", 0.1, None, 0.3, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 1.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::DeepSeek,
            models: models(&["deepseek-chat", "deepseek-reasoner"]),
            patterns: compile(&[r"^deepseek-"]),
            default_model: "deepseek-chat".to_string(),
            pricing: pricing(vec![
                PricingRow("deepseek-chat", 0.27, Some(0.07), 1.1, d),
                PricingRow("deepseek-reasoner", 0.55, Some(0.14), 2.19, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::Xai,
            models: models(&["grok-4", "grok-3", "grok-3-mini"]),
            patterns: compile(&[r"^grok-"]),
            default_model: "grok-4".to_string(),
            pricing: pricing(vec![
                PricingRow("grok-4", 3.0, Some(0.75), 15.0, d),
                PricingRow("grok-3", 3.0, None, 15.0, d),
                PricingRow("grok-3-mini", 0.3, None, 0.5, d),
            ]),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                reasoning_effort_levels: levels(&["low", "high"]),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::Cerebras,
            models: models(&["cerebras/llama-3.3-70b"]),
            patterns: compile(&[r"^cerebras/"]),
            default_model: "cerebras/llama-3.3-70b".to_string(),
            pricing: pricing(vec![PricingRow("cerebras/llama-3.3-70b", 0.85, None, 1.2, d)]),
            capabilities: Capabilities {
                temperature: Some((0.0, 1.5)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: false,
        },
        ModelCatalogEntry {
            provider: ProviderId::OpenRouter,
            models: Vec::new(),
            patterns: compile(&[r"^openrouter/"]),
            default_model: "openrouter/auto".to_string(),
            pricing: HashMap::new(),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: true,
        },
        ModelCatalogEntry {
            provider: ProviderId::Bedrock,
            models: Vec::new(),
            patterns: compile(&[r"^bedrock/", r"^anthropic\.", r"^amazon\."]),
            default_model: "anthropic.claude-sonnet-4-5".to_string(),
            pricing: HashMap::new(),
            capabilities: Capabilities {
                temperature: Some((0.0, 1.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: true,
        },
        ModelCatalogEntry {
            provider: ProviderId::VertexAi,
            models: Vec::new(),
            patterns: compile(&[r"^vertex/"]),
            default_model: "vertex/gemini-2.5-pro".to_string(),
            pricing: HashMap::new(),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: true,
                ..Capabilities::default()
            },
            dynamic: true,
        },
        // Registered last: also the fallback for unmatched model names.
        ModelCatalogEntry {
            provider: ProviderId::Ollama,
            models: Vec::new(),
            patterns: compile(&[r"^ollama/"]),
            default_model: "llama3.1".to_string(),
            pricing: HashMap::new(),
            capabilities: Capabilities {
                temperature: Some((0.0, 2.0)),
                tool_usage_control: false,
                ..Capabilities::default()
            },
            dynamic: true,
        },
    ]
}

fn embedding_table() -> HashMap<String, PricingEntry> {
    let d = date(2025, 6, 1);
    pricing(vec![
        PricingRow("text-embedding-3-small", 0.02, None, 0.0, d),
        PricingRow("text-embedding-3-large", 0.13, None, 0.0, d),
        PricingRow("text-embedding-ada-002", 0.1, None, 0.0, d),
        PricingRow("gemini-embedding-001", 0.15, None, 0.0, d),
        PricingRow("mistral-embed", 0.1, None, 0.0, d),
    ])
}
