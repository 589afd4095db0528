use serde::{Deserialize, Serialize};

/// Fixed set of backends this layer can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    OpenAi,
    AzureOpenAi,
    Anthropic,
    Google,
    Groq,
    Mistral,
    DeepSeek,
    Xai,
    Cerebras,
    OpenRouter,
    Bedrock,
    VertexAi,
    Ollama,
}

/// Group of vendors sharing an identical wire-level tool-calling shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoiceFamily {
    /// Anthropic-style `{"type":"tool","name":...}`.
    ToolName,
    /// OpenAI-compatible `{"type":"function","function":{"name":...}}`.
    FunctionCall,
    /// Gemini-style `functionCallingConfig` with an allow-list.
    AllowedFunctionNames,
}

impl ProviderId {
    pub const ALL: [ProviderId; 13] = [
        ProviderId::OpenAi,
        ProviderId::AzureOpenAi,
        ProviderId::Anthropic,
        ProviderId::Google,
        ProviderId::Groq,
        ProviderId::Mistral,
        ProviderId::DeepSeek,
        ProviderId::Xai,
        ProviderId::Cerebras,
        ProviderId::OpenRouter,
        ProviderId::Bedrock,
        ProviderId::VertexAi,
        ProviderId::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::AzureOpenAi => "azure-openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Groq => "groq",
            Self::Mistral => "mistral",
            Self::DeepSeek => "deepseek",
            Self::Xai => "xai",
            Self::Cerebras => "cerebras",
            Self::OpenRouter => "openrouter",
            Self::Bedrock => "bedrock",
            Self::VertexAi => "vertex-ai",
            Self::Ollama => "ollama",
        }
    }

    pub fn tool_choice_family(&self) -> ToolChoiceFamily {
        match self {
            Self::Anthropic | Self::Bedrock => ToolChoiceFamily::ToolName,
            Self::Google | Self::VertexAi => ToolChoiceFamily::AllowedFunctionNames,
            Self::OpenAi
            | Self::AzureOpenAi
            | Self::Groq
            | Self::Mistral
            | Self::DeepSeek
            | Self::Xai
            | Self::Cerebras
            | Self::OpenRouter
            | Self::Ollama => ToolChoiceFamily::FunctionCall,
        }
    }

    /// Self-hosted inference; no platform credential is required.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama)
    }

    /// Authenticates through the vendor's ambient credential chain
    /// (instance roles, ADC) rather than a key string.
    pub fn uses_native_credential_chain(&self) -> bool {
        matches!(self, Self::Bedrock | Self::VertexAi)
    }

    /// Whether the wire protocol tolerates an Authorization bearer token.
    /// Relevant for local providers fronted by an authenticating proxy.
    pub fn accepts_bearer_token(&self) -> bool {
        !self.uses_native_credential_chain()
    }

    /// Providers the managed offering holds rotating server keys for.
    pub fn is_credential_sensitive(&self) -> bool {
        matches!(self, Self::OpenAi | Self::Anthropic | Self::Google)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ProviderId::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown provider id: {s}"))
    }
}
