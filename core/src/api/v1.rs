//! Version 1 of the command surface.
//!
//! Commands are thin wrappers: they read the latest state from the backend,
//! run the core logic, and return JSON-friendly payloads. Errors are turned
//! into strings at this boundary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tokio::task::spawn_blocking;

use crate::assistants::{edit_notice, live_chosen_assistants, AssistantListView};
use crate::backend::BackendApi;
use crate::config::{self, BackendSettingsSnapshot, BackendSettingsUpdate};
use crate::context::ChatContext;
use crate::db::DbPool;
use crate::document_sets::{self, DocumentSetTable};
use crate::llm::{EffectivePair, LlmOverride, ProviderDescriptor, SessionOverride};
use crate::logging::{self, log_event, EventRecord};
use crate::notice::Notice;
use crate::preferences::{effective_list, AssistantId, ListEdit, PreferenceEditor};
use crate::search_summary::{SearchSummary, ShowHideDocs};

/// Shared state handed to every command.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub backend: Arc<dyn BackendApi>,
    pub editor: PreferenceEditor,
}

impl ApiState {
    pub fn new(db: DbPool, backend: Arc<dyn BackendApi>) -> Self {
        let editor = PreferenceEditor::new(backend.clone()).with_event_log(db.clone());
        Self {
            db,
            backend,
            editor,
        }
    }
}

/// Simple health check.
pub fn ping() -> serde_json::Value {
    json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

/// Inspect the SQLite catalog to confirm the database is reachable.
pub fn db_status(state: &ApiState) -> Result<serde_json::Value, String> {
    let conn = state.db.get().map_err(|e| e.to_string())?;
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| e.to_string())?;
    let mut names = Vec::new();
    for r in rows {
        names.push(r.map_err(|e| e.to_string())?);
    }
    Ok(json!({ "ok": true, "tables": names }))
}

pub async fn settings_get(state: &ApiState) -> Result<BackendSettingsSnapshot, String> {
    let pool = state.db.clone();
    let settings = spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        config::effective_settings(&conn).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())??;
    Ok(BackendSettingsSnapshot::from(&settings))
}

/// Persist new backend settings. Takes effect on the next start.
pub async fn settings_update(
    state: &ApiState,
    input: BackendSettingsUpdate,
) -> Result<BackendSettingsSnapshot, String> {
    let pool = state.db.clone();
    let settings = spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        config::update_settings(&conn, input).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())??;
    Ok(BackendSettingsSnapshot::from(&settings))
}

pub async fn llm_list_providers(state: &ApiState) -> Result<Vec<ProviderDescriptor>, String> {
    state
        .backend
        .list_llm_providers()
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmResolveInput {
    pub persona_id: Option<AssistantId>,
    pub session: Option<SessionOverride>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct LlmResolution {
    #[serde(flatten)]
    pub pair: EffectivePair,
    pub configured: bool,
    pub supports_images: bool,
    pub llm_override: LlmOverride,
}

/// Resolve the provider/model a chat turn would use.
pub async fn llm_resolve(state: &ApiState, input: LlmResolveInput) -> Result<LlmResolution, String> {
    let context = ChatContext::load(state.backend.as_ref())
        .await
        .map_err(|e| e.to_string())?
        .with_session_override(input.session);
    let pair = context.resolve_llm(input.persona_id);
    Ok(LlmResolution {
        configured: pair.is_configured(),
        supports_images: context.supports_images(input.persona_id),
        llm_override: pair.to_llm_override(input.temperature),
        pair,
    })
}

pub fn llm_supports_images(provider: &str, model: &str) -> bool {
    crate::llm::supports_image_input(provider, model)
}

pub async fn assistants_view(state: &ApiState) -> Result<AssistantListView, String> {
    let (personas, user) = tokio::try_join!(
        state.backend.list_personas(),
        state.backend.current_user()
    )
    .map_err(|e| e.to_string())?;
    Ok(AssistantListView::build(&personas, user.as_ref()))
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantEditOp {
    MoveUp,
    MoveDown,
    Add,
    Remove,
    Reorder,
}

#[derive(Debug, Deserialize)]
pub struct AssistantEditInput {
    pub op: AssistantEditOp,
    pub id: AssistantId,
    /// Drop target for `reorder`.
    pub target: Option<AssistantId>,
}

#[derive(Debug, Serialize)]
pub struct AssistantEditOutcome {
    pub notice: Notice,
    /// Order that was persisted; absent when nothing changed.
    pub order: Option<Vec<AssistantId>>,
}

/// Apply one edit against the freshest known list.
pub async fn assistants_edit(
    state: &ApiState,
    input: AssistantEditInput,
) -> Result<AssistantEditOutcome, String> {
    let edit = match input.op {
        AssistantEditOp::MoveUp => ListEdit::MoveUp(input.id),
        AssistantEditOp::MoveDown => ListEdit::MoveDown(input.id),
        AssistantEditOp::Add => ListEdit::Add(input.id),
        AssistantEditOp::Remove => ListEdit::Remove(input.id),
        AssistantEditOp::Reorder => ListEdit::Reorder {
            from: input.id,
            to: input
                .target
                .ok_or_else(|| "reorder needs a target assistant".to_string())?,
        },
    };

    let (personas, user) = tokio::try_join!(
        state.backend.list_personas(),
        state.backend.current_user()
    )
    .map_err(|e| e.to_string())?;

    let name = personas
        .iter()
        .find(|p| p.id == input.id)
        .map(|p| p.name.clone())
        .ok_or_else(|| format!("Unknown assistant: {}", input.id))?;
    let all_ids: Vec<AssistantId> = personas.iter().map(|p| p.id).collect();
    let chosen = live_chosen_assistants(&personas, user.as_ref());
    let list = effective_list(&all_ids, chosen);

    let outcome = state.editor.apply(edit, list).await;
    let notice = edit_notice(&edit, &name, &outcome);
    Ok(AssistantEditOutcome {
        notice,
        order: outcome.ok(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchSummaryInput {
    pub query: String,
    /// Replacement query typed by the user; `None` leaves the summary as is.
    pub draft: Option<String>,
    pub editable: bool,
    pub has_docs: bool,
    pub showing_docs: bool,
}

#[derive(Debug, Serialize)]
pub struct SearchSummaryView {
    pub display: String,
    /// Query to re-run when the edit changed it.
    pub rerun_query: Option<String>,
    pub docs_toggle_label: Option<&'static str>,
}

/// Render the search header and apply an optional inline edit.
pub fn search_summary_edit(input: SearchSummaryInput) -> SearchSummaryView {
    let mut summary = SearchSummary::new(input.query, input.has_docs, None);
    if input.editable {
        summary = summary.editable();
    }
    let rerun_query = match input.draft {
        Some(draft) if summary.begin_edit() => {
            summary.set_draft(draft);
            summary.commit()
        }
        _ => None,
    };
    SearchSummaryView {
        display: summary.display(),
        rerun_query,
        docs_toggle_label: summary
            .has_docs()
            .then(|| ShowHideDocs::label(input.showing_docs)),
    }
}

pub async fn document_sets_table(state: &ApiState, page: Option<usize>) -> Result<DocumentSetTable, String> {
    let (sets, statuses) = tokio::try_join!(
        state.backend.list_document_sets(),
        state.backend.connector_indexing_status()
    )
    .map_err(|e| e.to_string())?;
    Ok(DocumentSetTable::build(sets, &statuses, page.unwrap_or(1)))
}

#[derive(Debug, Serialize)]
pub struct DocumentSetDeleteOutcome {
    pub notice: Notice,
    pub table: DocumentSetTable,
}

/// Schedule deletion, then return the refreshed table alongside the notice.
pub async fn document_set_delete(
    state: &ApiState,
    id: i64,
) -> Result<DocumentSetDeleteOutcome, String> {
    let sets = state
        .backend
        .list_document_sets()
        .await
        .map_err(|e| e.to_string())?;
    let set = sets
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| format!("Unknown document set: {id}"))?;

    let notice = document_sets::delete_document_set(state.backend.as_ref(), set).await;
    if let Ok(conn) = state.db.get() {
        let _ = log_event(
            &conn,
            if notice.is_success() { "info" } else { "warn" },
            Some(if notice.is_success() { "DOC-0001" } else { "DOC-0101" }),
            "document_sets",
            &notice.message,
            None,
            Some(json!({ "id": id })),
        );
    }

    let table = document_sets_table(state, None).await?;
    Ok(DocumentSetDeleteOutcome { notice, table })
}

pub fn list_events(
    state: &ApiState,
    module: Option<String>,
    limit: Option<usize>,
) -> Result<Vec<EventRecord>, String> {
    let conn = state.db.get().map_err(|e| e.to_string())?;
    logging::recent_events(&conn, module.as_deref(), limit).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistants::tests::{persona, user};
    use crate::backend::testing::RecordingBackend;
    use crate::db::init_memory_db;
    use crate::document_sets::tests::set;
    use crate::notice::NoticeKind;

    fn state_with(backend: RecordingBackend) -> (ApiState, Arc<RecordingBackend>) {
        let backend = Arc::new(backend);
        let state = ApiState::new(init_memory_db().unwrap(), backend.clone());
        (state, backend)
    }

    #[test]
    fn db_status_lists_tables() {
        let (state, _) = state_with(RecordingBackend::default());
        let status = db_status(&state).unwrap();
        let tables = status["tables"].as_array().unwrap();
        assert!(tables.iter().any(|t| t == "event_log"));
    }

    #[tokio::test]
    async fn edit_uses_catalogue_when_user_has_no_list() {
        let (state, backend) = state_with(RecordingBackend {
            personas: vec![persona(3, "Three", None), persona(1, "One", None), persona(2, "Two", None)],
            user: Some(user("u1", None)),
            ..Default::default()
        });

        let outcome = assistants_edit(
            &state,
            AssistantEditInput {
                op: AssistantEditOp::MoveDown,
                id: 3,
                target: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.notice.kind, NoticeKind::Success);
        assert_eq!(outcome.notice.message, "\"Three\" has been moved down.");
        assert_eq!(outcome.order, Some(vec![1, 3, 2]));
        assert_eq!(backend.chosen_updates(), vec![vec![1, 3, 2]]);
    }

    #[tokio::test]
    async fn edit_on_stale_list_targets_displayed_order() {
        let (state, backend) = state_with(RecordingBackend {
            personas: vec![
                persona(1, "Default", None),
                persona(3, "Mine", Some("u1")),
                persona(4, "Also mine", Some("u1")),
            ],
            user: Some(user("u1", Some(vec![99]))),
            ..Default::default()
        });

        let view = assistants_view(&state).await.unwrap();
        assert!(view.hidden.is_empty());

        let outcome = assistants_edit(
            &state,
            AssistantEditInput {
                op: AssistantEditOp::MoveDown,
                id: 1,
                target: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.notice.kind, NoticeKind::Success);
        assert_eq!(backend.chosen_updates(), vec![vec![3, 1, 4]]);
    }

    #[test]
    fn search_summary_edit_reports_rerun() {
        let view = search_summary_edit(SearchSummaryInput {
            query: "rust traits".into(),
            draft: Some("rust generics".into()),
            editable: true,
            has_docs: true,
            showing_docs: false,
        });
        assert_eq!(view.display, "Searching for: rust generics");
        assert_eq!(view.rerun_query.as_deref(), Some("rust generics"));
        assert_eq!(view.docs_toggle_label, Some("Show Docs"));

        let read_only = search_summary_edit(SearchSummaryInput {
            query: "rust traits".into(),
            draft: Some("ignored".into()),
            ..Default::default()
        });
        assert_eq!(read_only.display, "Searching for: rust traits");
        assert_eq!(read_only.rerun_query, None);
        assert_eq!(read_only.docs_toggle_label, None);
    }

    #[tokio::test]
    async fn removing_last_assistant_is_refused() {
        let (state, backend) = state_with(RecordingBackend {
            personas: vec![persona(1, "Solo", None), persona(2, "Other", None)],
            user: Some(user("u1", Some(vec![1]))),
            ..Default::default()
        });

        let outcome = assistants_edit(
            &state,
            AssistantEditInput {
                op: AssistantEditOp::Remove,
                id: 1,
                target: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome.notice.kind, NoticeKind::Error);
        assert!(outcome.notice.message.starts_with("Cannot remove \"Solo\""));
        assert!(outcome.order.is_none());
        assert!(backend.chosen_updates().is_empty());
    }

    #[tokio::test]
    async fn reorder_requires_target() {
        let (state, _) = state_with(RecordingBackend {
            personas: vec![persona(1, "One", None)],
            ..Default::default()
        });
        let err = assistants_edit(
            &state,
            AssistantEditInput {
                op: AssistantEditOp::Reorder,
                id: 1,
                target: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.contains("target"));
    }

    #[tokio::test]
    async fn delete_returns_notice_and_refreshed_table() {
        let (state, backend) = state_with(RecordingBackend {
            document_sets: vec![set(1, "Beta", true, 0), set(2, "Alpha", false, 1)],
            ..Default::default()
        });

        let outcome = document_set_delete(&state, 1).await.unwrap();
        assert!(outcome.notice.is_success());
        assert_eq!(backend.deleted_sets(), vec![1]);
        assert_eq!(outcome.table.rows[0].name, "Alpha");

        let events = list_events(&state, Some("document_sets".into()), None).unwrap();
        assert_eq!(events.len(), 1);

        assert!(document_set_delete(&state, 99).await.is_err());
    }

    #[tokio::test]
    async fn resolve_reports_capabilities() {
        let (state, _) = state_with(RecordingBackend {
            providers: vec![ProviderDescriptor {
                name: "OpenAI".into(),
                provider: "openai".into(),
                default_model_name: "gpt-4o".into(),
                fast_default_model_name: None,
                model_names: Vec::new(),
                is_default_provider: true,
            }],
            ..Default::default()
        });
        let resolution = llm_resolve(&state, LlmResolveInput::default()).await.unwrap();
        assert!(resolution.configured);
        assert!(resolution.supports_images);
        assert_eq!(resolution.llm_override.model_version.as_deref(), Some("gpt-4o"));
    }
}
