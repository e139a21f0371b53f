//! Chat-wide state handed explicitly to whatever needs it.
//!
//! A context is only obtainable through [`ChatContext::new`] or
//! [`ChatContext::load`], so code holding one can rely on the provider list
//! having been loaded.

use serde::Serialize;

use crate::assistants::{order_assistants_for_user, Persona, User};
use crate::backend::BackendApi;
use crate::document_sets::DocumentSet;
use crate::errors::DeskError;
use crate::llm::{resolve_final_llm, supports_image_input, EffectivePair, ProviderDescriptor, SessionOverride};
use crate::preferences::AssistantId;

/// Raw data a context is assembled from.
#[derive(Debug, Clone, Default)]
pub struct ChatSnapshot {
    pub user: Option<User>,
    pub personas: Vec<Persona>,
    pub document_sets: Vec<DocumentSet>,
    /// `None` means the provider list was never fetched.
    pub llm_providers: Option<Vec<ProviderDescriptor>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatContext {
    user: Option<User>,
    personas: Vec<Persona>,
    document_sets: Vec<DocumentSet>,
    llm_providers: Vec<ProviderDescriptor>,
    session_override: Option<SessionOverride>,
}

impl ChatContext {
    pub fn new(snapshot: ChatSnapshot) -> Result<Self, DeskError> {
        let llm_providers = snapshot
            .llm_providers
            .ok_or(DeskError::ContextIncomplete("llm providers"))?;
        Ok(Self {
            user: snapshot.user,
            personas: snapshot.personas,
            document_sets: snapshot.document_sets,
            llm_providers,
            session_override: None,
        })
    }

    /// Fetch everything a chat page needs in one go.
    pub async fn load(backend: &dyn BackendApi) -> Result<Self, DeskError> {
        let (providers, personas, user, document_sets) = tokio::try_join!(
            backend.list_llm_providers(),
            backend.list_personas(),
            backend.current_user(),
            backend.list_document_sets(),
        )?;
        Self::new(ChatSnapshot {
            user,
            personas,
            document_sets,
            llm_providers: Some(providers),
        })
    }

    pub fn with_session_override(mut self, session: Option<SessionOverride>) -> Self {
        self.session_override = session;
        self
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn document_sets(&self) -> &[DocumentSet] {
        &self.document_sets
    }

    pub fn llm_providers(&self) -> &[ProviderDescriptor] {
        &self.llm_providers
    }

    pub fn session_override(&self) -> Option<&SessionOverride> {
        self.session_override.as_ref()
    }

    pub fn persona(&self, id: AssistantId) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Assistant a new chat starts with: first in the user's order.
    pub fn default_persona(&self) -> Option<&Persona> {
        order_assistants_for_user(&self.personas, self.user.as_ref())
            .into_iter()
            .next()
    }

    /// Unknown ids resolve as if no assistant was selected.
    pub fn resolve_llm(&self, persona_id: Option<AssistantId>) -> EffectivePair {
        let assistant = persona_id
            .and_then(|id| self.persona(id))
            .map(Persona::llm_override);
        resolve_final_llm(
            &self.llm_providers,
            assistant.as_ref(),
            self.session_override.as_ref(),
        )
    }

    pub fn supports_images(&self, persona_id: Option<AssistantId>) -> bool {
        let pair = self.resolve_llm(persona_id);
        supports_image_input(&pair.provider, &pair.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistants::tests::{persona, user};
    use crate::backend::testing::RecordingBackend;

    fn openai_default() -> ProviderDescriptor {
        ProviderDescriptor {
            name: "OpenAI".into(),
            provider: "openai".into(),
            default_model_name: "gpt-3.5".into(),
            fast_default_model_name: None,
            model_names: vec!["gpt-3.5".into(), "gpt-4o".into()],
            is_default_provider: true,
        }
    }

    #[test]
    fn missing_providers_is_a_construction_error() {
        let err = ChatContext::new(ChatSnapshot::default()).unwrap_err();
        assert_eq!(err.code(), "CTX-1001");
    }

    #[test]
    fn persona_and_session_tiers_are_applied() {
        let mut vision = persona(5, "Vision", None);
        vision.llm_model_version_override = Some("gpt-4".into());
        let ctx = ChatContext::new(ChatSnapshot {
            personas: vec![vision],
            llm_providers: Some(vec![openai_default()]),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(ctx.resolve_llm(Some(5)).model, "gpt-4");
        assert_eq!(ctx.resolve_llm(Some(42)).model, "gpt-3.5");
        assert!(!ctx.supports_images(Some(5)));

        let ctx = ctx.with_session_override(Some(SessionOverride {
            provider: None,
            model_name: Some("gpt-4o".into()),
        }));
        assert_eq!(ctx.resolve_llm(Some(5)).model, "gpt-4o");
        assert!(ctx.supports_images(Some(5)));
    }

    #[test]
    fn default_persona_follows_user_order() {
        let ctx = ChatContext::new(ChatSnapshot {
            user: Some(user("u1", Some(vec![2, 1]))),
            personas: vec![persona(1, "One", None), persona(2, "Two", None)],
            llm_providers: Some(Vec::new()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.default_persona().map(|p| p.id), Some(2));
    }

    #[tokio::test]
    async fn load_pulls_every_collection() {
        let backend = RecordingBackend {
            providers: vec![openai_default()],
            personas: vec![persona(1, "One", None)],
            user: Some(user("u1", None)),
            ..Default::default()
        };
        let ctx = ChatContext::load(&backend).await.unwrap();
        assert_eq!(ctx.llm_providers().len(), 1);
        assert_eq!(ctx.personas().len(), 1);
        assert!(ctx.user().is_some());
        assert!(ctx.document_sets().is_empty());
        assert_eq!(
            ctx.resolve_llm(None),
            EffectivePair {
                provider: "openai".into(),
                model: "gpt-3.5".into()
            }
        );
    }
}
