//! Generic tool set → vendor tool-choice translation.
//!
//! Native APIs only force a single tool (or an allow-list) per call. This
//! module encodes the first forced tool per the provider family; the cycle
//! tracker (`cycle`) then walks the rest of the forced set across turns.

use crate::provider::{ProviderId, ToolChoiceFamily};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Per-tool usage directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageControl {
    /// Model may use the tool.
    Auto,
    /// Model must invoke the tool before free-form completion.
    Force,
    /// Tool is hidden from the model entirely.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// JSON Schema.
    pub schema: Value,
    pub usage_control: UsageControl,
}

/// Vendor tool-choice directive, one case per provider family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides freely.
    Auto,
    /// Tool-name family: force one tool by name.
    Tool { name: String },
    /// Function-call family: force one function by name.
    Function { name: String },
    /// Allowed-function-names family: ANY mode over an allow-list.
    AllowedFunctions { names: Vec<String> },
    /// Explicit null; how the tool-name family unsets a prior directive.
    Cleared,
}

impl ToolChoice {
    /// Encode the forced set for a family. Empty set means auto.
    pub fn for_forced(family: ToolChoiceFamily, forced: &[String]) -> Self {
        match forced.first() {
            None => Self::Auto,
            Some(first) => match family {
                ToolChoiceFamily::ToolName => Self::Tool { name: first.clone() },
                ToolChoiceFamily::FunctionCall => Self::Function { name: first.clone() },
                ToolChoiceFamily::AllowedFunctionNames => Self::AllowedFunctions {
                    names: forced.to_vec(),
                },
            },
        }
    }

    /// Family-specific extraction of the currently-forced tool name(s).
    pub fn forced_names(&self) -> Vec<String> {
        match self {
            Self::Auto | Self::Cleared => Vec::new(),
            Self::Tool { name } | Self::Function { name } => vec![name.clone()],
            Self::AllowedFunctions { names } => names.clone(),
        }
    }

    /// The exact JSON written into the vendor request.
    ///
    /// The allowed-function-names family keeps a wire asymmetry: exactly one
    /// forced tool serializes the id as a bare string, several as a list.
    pub fn to_wire(&self, family: ToolChoiceFamily) -> Value {
        match self {
            Self::Auto => match family {
                ToolChoiceFamily::AllowedFunctionNames => {
                    json!({"functionCallingConfig": {"mode": "AUTO"}})
                }
                ToolChoiceFamily::ToolName | ToolChoiceFamily::FunctionCall => json!("auto"),
            },
            Self::Cleared => Value::Null,
            Self::Tool { name } => json!({"type": "tool", "name": name}),
            Self::Function { name } => {
                json!({"type": "function", "function": {"name": name}})
            }
            Self::AllowedFunctions { names } => {
                let allowed = if names.len() == 1 {
                    json!(names[0])
                } else {
                    json!(names)
                };
                json!({
                    "functionCallingConfig": {
                        "mode": "ANY",
                        "allowedFunctionNames": allowed,
                    }
                })
            }
        }
    }
}

/// Per-turn tool policy. Caller-owned; threaded explicitly across turns.
#[derive(Debug, Clone)]
pub struct ToolPolicy {
    /// Tools visible to the model this turn, registration order preserved.
    pub active_tools: Vec<ToolDescriptor>,
    pub tool_choice: ToolChoice,
    /// Forced-tool cycle order (ids with `UsageControl::Force`).
    pub forced_queue: Vec<String>,
    /// Monotonically growing across turns; starts empty.
    pub used_forced: Vec<String>,
}

impl ToolPolicy {
    pub fn has_tools(&self) -> bool {
        !self.active_tools.is_empty()
    }
}

/// Build the vendor tool policy for one turn.
#[tracing::instrument(level = "debug", skip_all, fields(provider = %provider))]
pub fn build_tool_policy(descriptors: &[ToolDescriptor], provider: ProviderId) -> ToolPolicy {
    let active_tools: Vec<ToolDescriptor> = descriptors
        .iter()
        .filter(|d| d.usage_control != UsageControl::None)
        .cloned()
        .collect();

    if active_tools.is_empty() {
        if !descriptors.is_empty() {
            tracing::debug!(
                filtered = descriptors.len(),
                "usage control filtered every tool; proceeding without tool support"
            );
        }
        return ToolPolicy {
            active_tools,
            tool_choice: ToolChoice::Auto,
            forced_queue: Vec::new(),
            used_forced: Vec::new(),
        };
    }

    let forced_queue: Vec<String> = active_tools
        .iter()
        .filter(|d| d.usage_control == UsageControl::Force)
        .map(|d| d.id.clone())
        .collect();

    if forced_queue.len() > 1 {
        tracing::info!(
            count = forced_queue.len(),
            "multiple forced tools; they will cycle sequentially across turns"
        );
    }

    let tool_choice = ToolChoice::for_forced(provider.tool_choice_family(), &forced_queue);

    ToolPolicy {
        active_tools,
        tool_choice,
        forced_queue,
        used_forced: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(id: &str, control: UsageControl) -> ToolDescriptor {
        ToolDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: format!("{id} tool"),
            schema: json!({"type": "object", "properties": {}}),
            usage_control: control,
        }
    }

    #[test]
    fn none_tools_are_filtered_and_stay_out() {
        let tools = vec![
            descriptor("a", UsageControl::Auto),
            descriptor("b", UsageControl::Force),
            descriptor("c", UsageControl::None),
        ];
        let policy = build_tool_policy(&tools, ProviderId::OpenAi);
        let ids: Vec<&str> = policy.active_tools.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(policy.forced_queue, ["b"]);
        assert!(!policy.forced_queue.contains(&"c".to_string()));
    }

    #[test]
    fn all_filtered_yields_a_no_tools_policy() {
        let tools = vec![descriptor("a", UsageControl::None)];
        let policy = build_tool_policy(&tools, ProviderId::Anthropic);
        assert!(!policy.has_tools());
        assert_eq!(policy.tool_choice, ToolChoice::Auto);
        assert!(policy.forced_queue.is_empty());
    }

    #[test]
    fn forced_queue_preserves_registration_order() {
        let tools = vec![
            descriptor("first", UsageControl::Force),
            descriptor("middle", UsageControl::Auto),
            descriptor("second", UsageControl::Force),
        ];
        let policy = build_tool_policy(&tools, ProviderId::OpenAi);
        assert_eq!(policy.forced_queue, ["first", "second"]);
        assert_eq!(
            policy.tool_choice,
            ToolChoice::Function {
                name: "first".to_string()
            }
        );
    }

    #[test]
    fn tool_name_family_wire_shape() {
        let choice = ToolChoice::Tool {
            name: "search".to_string(),
        };
        assert_eq!(
            choice.to_wire(ToolChoiceFamily::ToolName),
            json!({"type": "tool", "name": "search"})
        );
    }

    #[test]
    fn function_call_family_wire_shape() {
        let choice = ToolChoice::Function {
            name: "search".to_string(),
        };
        assert_eq!(
            choice.to_wire(ToolChoiceFamily::FunctionCall),
            json!({"type": "function", "function": {"name": "search"}})
        );
        assert_eq!(
            ToolChoice::Auto.to_wire(ToolChoiceFamily::FunctionCall),
            json!("auto")
        );
    }

    #[test]
    fn allowed_function_names_single_id_is_a_bare_string() {
        let choice = ToolChoice::AllowedFunctions {
            names: vec!["search".to_string()],
        };
        assert_eq!(
            choice.to_wire(ToolChoiceFamily::AllowedFunctionNames),
            json!({
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": "search",
                }
            })
        );
    }

    #[test]
    fn allowed_function_names_multiple_ids_are_a_list() {
        let choice = ToolChoice::AllowedFunctions {
            names: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            choice.to_wire(ToolChoiceFamily::AllowedFunctionNames),
            json!({
                "functionCallingConfig": {
                    "mode": "ANY",
                    "allowedFunctionNames": ["a", "b"],
                }
            })
        );
    }

    #[test]
    fn allowed_function_names_auto_has_no_allow_list() {
        assert_eq!(
            ToolChoice::Auto.to_wire(ToolChoiceFamily::AllowedFunctionNames),
            json!({"functionCallingConfig": {"mode": "AUTO"}})
        );
    }

    #[test]
    fn cleared_is_an_explicit_null() {
        assert_eq!(
            ToolChoice::Cleared.to_wire(ToolChoiceFamily::ToolName),
            Value::Null
        );
    }

    #[test]
    fn forced_name_extraction_per_variant() {
        assert!(ToolChoice::Auto.forced_names().is_empty());
        assert_eq!(
            ToolChoice::Tool {
                name: "a".to_string()
            }
            .forced_names(),
            ["a"]
        );
        assert_eq!(
            ToolChoice::AllowedFunctions {
                names: vec!["a".to_string(), "b".to_string()]
            }
            .forced_names(),
            ["a", "b"]
        );
    }

    #[test]
    fn google_policy_forces_the_full_list() {
        let tools = vec![
            descriptor("a", UsageControl::Force),
            descriptor("b", UsageControl::Force),
        ];
        let policy = build_tool_policy(&tools, ProviderId::Google);
        assert_eq!(
            policy.tool_choice,
            ToolChoice::AllowedFunctions {
                names: vec!["a".to_string(), "b".to_string()]
            }
        );
    }
}
