//! Availability rules: provider, exact-model, and prefix denials.

use crate::provider::ProviderId;
use std::collections::HashSet;

pub const BLACKLIST_PROVIDERS_ENV: &str = "SWITCHYARD_BLACKLIST_PROVIDERS";
pub const BLACKLIST_MODELS_ENV: &str = "SWITCHYARD_BLACKLIST_MODELS";

/// Deny rules, folded to lowercase. Model entries ending in `*` match as
/// prefixes (`claude-*` blocks `Claude-3-Opus` but not `my-claude-3-opus`).
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    providers: HashSet<ProviderId>,
    models: HashSet<String>,
    prefixes: Vec<String>,
}

impl Blacklist {
    pub fn new(
        providers: impl IntoIterator<Item = ProviderId>,
        model_rules: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut models = HashSet::new();
        let mut prefixes = Vec::new();
        for rule in model_rules {
            let rule = rule.trim().to_ascii_lowercase();
            if rule.is_empty() {
                continue;
            }
            if let Some(prefix) = rule.strip_suffix('*') {
                prefixes.push(prefix.to_string());
            } else {
                models.insert(rule);
            }
        }
        Self {
            providers: providers.into_iter().collect(),
            models,
            prefixes,
        }
    }

    /// Re-reads the blacklist env vars. Called per lookup so rule changes
    /// take effect without a process restart.
    pub fn from_env() -> Self {
        let providers = std::env::var(BLACKLIST_PROVIDERS_ENV)
            .unwrap_or_default()
            .split(',')
            .filter_map(|raw| {
                let raw = raw.trim().to_ascii_lowercase();
                if raw.is_empty() {
                    return None;
                }
                match raw.parse::<ProviderId>() {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::warn!(entry = %raw, %e, "ignoring unknown blacklisted provider");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        let models = std::env::var(BLACKLIST_MODELS_ENV)
            .unwrap_or_default()
            .split(',')
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self::new(providers, models)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.models.is_empty() && self.prefixes.is_empty()
    }

    pub fn blocks_provider(&self, provider: ProviderId) -> bool {
        self.providers.contains(&provider)
    }

    pub fn blocks_model(&self, model: &str) -> bool {
        let folded = model.to_ascii_lowercase();
        if self.models.contains(&folded) {
            return true;
        }
        self.prefixes.iter().any(|p| folded.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rules_fold_case() {
        let bl = Blacklist::new([], ["GPT-4o".to_string()]);
        assert!(bl.blocks_model("gpt-4o"));
        assert!(bl.blocks_model("GPT-4O"));
        assert!(!bl.blocks_model("gpt-4o-mini"));
    }

    #[test]
    fn prefix_rules_match_prefixes_only() {
        let bl = Blacklist::new([], ["claude-*".to_string()]);
        assert!(bl.blocks_model("claude-3-opus"));
        assert!(bl.blocks_model("Claude-3-Opus"));
        assert!(!bl.blocks_model("my-claude-3-opus"));
    }

    #[test]
    fn provider_rules() {
        let bl = Blacklist::new([ProviderId::Xai], []);
        assert!(bl.blocks_provider(ProviderId::Xai));
        assert!(!bl.blocks_provider(ProviderId::OpenAi));
    }

    #[test]
    fn blank_and_whitespace_rules_are_ignored() {
        let bl = Blacklist::new([], [" ".to_string(), String::new(), " grok-4 ".to_string()]);
        assert!(bl.blocks_model("grok-4"));
        assert!(!bl.blocks_model(""));
    }
}
