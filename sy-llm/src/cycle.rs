//! Cross-turn forced-tool cycling.
//!
//! Vendor APIs force at most one tool (or an allow-list) per call. When a
//! policy marks several tools as forced, this tracker walks them across
//! turns: each turn forces the first not-yet-used forced tool, and once all
//! have been invoked the directive reverts to auto. State is caller-owned
//! and threaded explicitly turn to turn; nothing is stored here.

use crate::policy::ToolChoice;
use crate::provider::{ProviderId, ToolChoiceFamily};

/// Result of advancing the cycle after one model response.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// A currently-forced tool was invoked this turn.
    pub satisfied: bool,
    /// Accumulated used set. Only ever grows.
    pub used: Vec<String>,
    /// Directive for the next turn.
    pub next: ToolChoice,
}

/// Advance the forced-tool cycle given the tools the model invoked this turn.
///
/// The used set is authoritative over the forced list: a tool that was
/// satisfied once is never forced again in the same loop, even if the
/// forced list re-names it. An unsatisfied turn returns the prior directive
/// unchanged, so a model that ignored the forced tool sees the same
/// constraint again rather than a regression to auto.
#[tracing::instrument(level = "debug", skip_all, fields(provider = %provider))]
pub fn advance_forced_tool_cycle(
    invoked: &[String],
    prior: &ToolChoice,
    forced_ids: &[String],
    used: &[String],
    provider: ProviderId,
) -> CycleOutcome {
    let family = provider.tool_choice_family();

    let mut updated_used: Vec<String> = used.to_vec();
    let mut satisfied = false;
    for name in prior.forced_names() {
        if invoked.iter().any(|inv| *inv == name) {
            satisfied = true;
            if !updated_used.contains(&name) {
                updated_used.push(name);
            }
        }
    }

    if !satisfied {
        return CycleOutcome {
            satisfied: false,
            used: updated_used,
            next: prior.clone(),
        };
    }

    let mut remaining: Vec<String> = Vec::new();
    for id in forced_ids {
        if !updated_used.contains(id) && !remaining.contains(id) {
            remaining.push(id.clone());
        }
    }

    let next = if remaining.is_empty() {
        tracing::debug!("forced-tool cycle complete; reverting to auto");
        match family {
            ToolChoiceFamily::ToolName => ToolChoice::Cleared,
            ToolChoiceFamily::FunctionCall | ToolChoiceFamily::AllowedFunctionNames => {
                ToolChoice::Auto
            }
        }
    } else {
        tracing::debug!(next = %remaining[0], remaining = remaining.len(), "forcing next tool");
        ToolChoice::for_forced(family, &remaining)
    };

    CycleOutcome {
        satisfied: true,
        used: updated_used,
        next,
    }
}
