//! Provider/model resolution for a chat turn.
//!
//! Three tiers are layered field by field: the installation's default
//! provider, the assistant's override and the user's per-session choice.
//! Later tiers win, but only with non-empty values, so a session that only
//! picks a model keeps the provider chosen by the tiers below it.

use serde::{Deserialize, Serialize};

/// Provider configuration as returned by `/api/llm/provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    #[serde(default)]
    pub name: String,
    pub provider: String,
    pub default_model_name: String,
    #[serde(default)]
    pub fast_default_model_name: Option<String>,
    #[serde(default)]
    pub model_names: Vec<String>,
    #[serde(default)]
    pub is_default_provider: bool,
}

/// The assistant (persona) tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantOverride {
    pub llm_model_provider_override: Option<String>,
    pub llm_model_version_override: Option<String>,
}

/// Transient per-session choice; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOverride {
    pub provider: Option<String>,
    #[serde(rename = "modelName")]
    pub model_name: Option<String>,
}

/// Result of resolution. Empty strings mean nothing was configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePair {
    pub provider: String,
    pub model: String,
}

/// Override payload accepted by the chat endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmOverride {
    pub model_provider: Option<String>,
    pub model_version: Option<String>,
    pub temperature: Option<f32>,
}

impl EffectivePair {
    pub fn is_configured(&self) -> bool {
        !self.provider.is_empty() && !self.model.is_empty()
    }

    pub fn to_llm_override(&self, temperature: Option<f32>) -> LlmOverride {
        LlmOverride {
            model_provider: non_empty(&self.provider),
            model_version: non_empty(&self.model),
            temperature,
        }
    }
}

/// Pairs known to accept image input. Matching is exact and case-sensitive.
pub const MODELS_SUPPORTING_IMAGES: &[(&str, &str)] = &[
    ("openai", "gpt-4o"),
    ("openai", "gpt-4-vision-preview"),
    ("openai", "gpt-4-turbo"),
    ("openai", "gpt-4-1106-vision-preview"),
];

pub fn resolve_final_llm(
    providers: &[ProviderDescriptor],
    assistant: Option<&AssistantOverride>,
    session: Option<&SessionOverride>,
) -> EffectivePair {
    // First flagged entry wins if the backend reports several defaults.
    let default_provider = providers.iter().find(|p| p.is_default_provider);

    let mut provider = default_provider
        .map(|p| p.provider.clone())
        .unwrap_or_default();
    let mut model = default_provider
        .map(|p| p.default_model_name.clone())
        .unwrap_or_default();

    if let Some(assistant) = assistant {
        overlay(&mut provider, assistant.llm_model_provider_override.as_deref());
        overlay(&mut model, assistant.llm_model_version_override.as_deref());
    }

    if let Some(session) = session {
        overlay(&mut provider, session.provider.as_deref());
        overlay(&mut model, session.model_name.as_deref());
    }

    EffectivePair { provider, model }
}

pub fn supports_image_input(provider: &str, model: &str) -> bool {
    MODELS_SUPPORTING_IMAGES
        .iter()
        .any(|(p, m)| *p == provider && *m == model)
}

fn overlay(slot: &mut String, candidate: Option<&str>) {
    if let Some(value) = candidate.filter(|v| !v.is_empty()) {
        *slot = value.to_string();
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
