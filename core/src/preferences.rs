//! Per-user ordering and visibility of assistants.
//!
//! Every edit follows read-compute-send: the new order is computed from the
//! list the caller last saw, validated locally, and only then written to the
//! backend. Nothing is updated optimistically, so a failed write needs no
//! rollback; the caller refreshes from the backend instead.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::backend::BackendApi;
use crate::db::DbPool;
use crate::errors::DeskError;
use crate::logging::log_event;

pub type AssistantId = i64;

/// Why a list edit was refused before reaching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListRejection {
    #[error("assistant is not in the list")]
    NotFound,
    #[error("assistant is already first")]
    AtTop,
    #[error("assistant is already last")]
    AtBottom,
    #[error("assistant is already in the list")]
    AlreadyPresent,
    #[error("at least one assistant must remain")]
    LastRemaining,
    #[error("order is unchanged")]
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEdit {
    MoveUp(AssistantId),
    MoveDown(AssistantId),
    Add(AssistantId),
    Remove(AssistantId),
    /// Final order submitted after a drag: `from` takes the slot of `to`.
    Reorder { from: AssistantId, to: AssistantId },
}

impl ListEdit {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MoveUp(_) => "move_up",
            Self::MoveDown(_) => "move_down",
            Self::Add(_) => "add",
            Self::Remove(_) => "remove",
            Self::Reorder { .. } => "reorder",
        }
    }

    pub fn subject(&self) -> AssistantId {
        match *self {
            Self::MoveUp(id) | Self::MoveDown(id) | Self::Add(id) | Self::Remove(id) => id,
            Self::Reorder { from, .. } => from,
        }
    }

    /// Compute the list this edit produces without touching the backend.
    pub fn apply_to(&self, list: &[AssistantId]) -> Result<Vec<AssistantId>, ListRejection> {
        match *self {
            Self::MoveUp(id) => move_up(id, list),
            Self::MoveDown(id) => move_down(id, list),
            Self::Add(id) => add(id, list),
            Self::Remove(id) => remove(id, list),
            Self::Reorder { from, to } => reorder(list, from, to),
        }
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("edit rejected: {0}")]
    Rejected(ListRejection),
    #[error(transparent)]
    Remote(#[from] DeskError),
}

/// The user's chosen list, or the full catalogue when none was saved.
pub fn effective_list<'a>(
    all: &'a [AssistantId],
    chosen: Option<&'a [AssistantId]>,
) -> &'a [AssistantId] {
    chosen.unwrap_or(all)
}

pub fn move_up(id: AssistantId, list: &[AssistantId]) -> Result<Vec<AssistantId>, ListRejection> {
    let index = position(id, list)?;
    if index == 0 {
        return Err(ListRejection::AtTop);
    }
    let mut next = list.to_vec();
    next.swap(index - 1, index);
    Ok(next)
}

pub fn move_down(id: AssistantId, list: &[AssistantId]) -> Result<Vec<AssistantId>, ListRejection> {
    let index = position(id, list)?;
    if index + 1 >= list.len() {
        return Err(ListRejection::AtBottom);
    }
    let mut next = list.to_vec();
    next.swap(index, index + 1);
    Ok(next)
}

pub fn add(id: AssistantId, list: &[AssistantId]) -> Result<Vec<AssistantId>, ListRejection> {
    if list.contains(&id) {
        return Err(ListRejection::AlreadyPresent);
    }
    let mut next = list.to_vec();
    next.push(id);
    Ok(next)
}

pub fn remove(id: AssistantId, list: &[AssistantId]) -> Result<Vec<AssistantId>, ListRejection> {
    if list.len() == 1 && list[0] == id {
        return Err(ListRejection::LastRemaining);
    }
    let index = position(id, list)?;
    let mut next = list.to_vec();
    next.remove(index);
    Ok(next)
}

pub fn reorder(
    list: &[AssistantId],
    from: AssistantId,
    to: AssistantId,
) -> Result<Vec<AssistantId>, ListRejection> {
    let old_index = position(from, list)?;
    let new_index = position(to, list)?;
    if old_index == new_index {
        return Err(ListRejection::Unchanged);
    }
    let mut next = list.to_vec();
    let moved = next.remove(old_index);
    next.insert(new_index, moved);
    Ok(next)
}

fn position(id: AssistantId, list: &[AssistantId]) -> Result<usize, ListRejection> {
    list.iter()
        .position(|candidate| *candidate == id)
        .ok_or(ListRejection::NotFound)
}

/// Applies list edits and persists the result through the backend.
#[derive(Clone)]
pub struct PreferenceEditor {
    backend: Arc<dyn BackendApi>,
    pool: Option<DbPool>,
}

impl PreferenceEditor {
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        Self {
            backend,
            pool: None,
        }
    }

    /// Record every edit in the event log of `pool`.
    pub fn with_event_log(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub async fn move_up(&self, id: AssistantId, list: &[AssistantId]) -> bool {
        self.apply(ListEdit::MoveUp(id), list).await.is_ok()
    }

    pub async fn move_down(&self, id: AssistantId, list: &[AssistantId]) -> bool {
        self.apply(ListEdit::MoveDown(id), list).await.is_ok()
    }

    pub async fn add(&self, id: AssistantId, list: &[AssistantId]) -> bool {
        self.apply(ListEdit::Add(id), list).await.is_ok()
    }

    pub async fn remove(&self, id: AssistantId, list: &[AssistantId]) -> bool {
        self.apply(ListEdit::Remove(id), list).await.is_ok()
    }

    pub async fn reorder(&self, list: &[AssistantId], from: AssistantId, to: AssistantId) -> bool {
        self.apply(ListEdit::Reorder { from, to }, list).await.is_ok()
    }

    /// Validate locally, then write the full new order. Returns the order
    /// that was sent on success.
    pub async fn apply(
        &self,
        edit: ListEdit,
        list: &[AssistantId],
    ) -> Result<Vec<AssistantId>, EditError> {
        let next = match edit.apply_to(list) {
            Ok(next) => next,
            Err(rejection) => {
                self.record(
                    "warn",
                    "PREF-0101",
                    "Assistant list edit rejected locally",
                    json!({ "op": edit.name(), "id": edit.subject(), "reason": rejection }),
                );
                return Err(EditError::Rejected(rejection));
            }
        };

        if let Err(err) = self.backend.update_chosen_assistants(&next).await {
            self.record(
                "warn",
                err.code(),
                "Assistant list update failed",
                json!({ "op": edit.name(), "id": edit.subject(), "error": err.to_string() }),
            );
            return Err(EditError::Remote(err));
        }

        self.record(
            "info",
            "PREF-0001",
            "Assistant list updated",
            json!({ "op": edit.name(), "id": edit.subject(), "order": next }),
        );
        Ok(next)
    }

    fn record(&self, level: &str, code: &str, message: &str, data: serde_json::Value) {
        let Some(pool) = &self.pool else {
            log::debug!("{message}: {data}");
            return;
        };
        if let Ok(conn) = pool.get() {
            let _ = log_event(
                &conn,
                level,
                Some(code),
                "assistants.preferences",
                message,
                None,
                Some(data),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::RecordingBackend;
    use crate::db::init_memory_db;
    use crate::logging::recent_events;

    #[test]
    fn move_up_swaps_with_predecessor() {
        assert_eq!(move_up(2, &[3, 1, 2, 5]), Ok(vec![3, 2, 1, 5]));
        assert_eq!(move_up(3, &[3, 1, 2]), Err(ListRejection::AtTop));
        assert_eq!(move_up(9, &[3, 1, 2]), Err(ListRejection::NotFound));
    }

    #[test]
    fn move_down_swaps_with_successor() {
        assert_eq!(move_down(3, &[3, 1, 2]), Ok(vec![1, 3, 2]));
        assert_eq!(move_down(2, &[3, 1, 2]), Err(ListRejection::AtBottom));
        assert_eq!(move_down(9, &[3, 1, 2]), Err(ListRejection::NotFound));
        assert_eq!(move_down(4, &[]), Err(ListRejection::NotFound));
    }

    #[test]
    fn add_appends_unique_ids() {
        assert_eq!(add(4, &[1, 2]), Ok(vec![1, 2, 4]));
        assert_eq!(add(2, &[1, 2]), Err(ListRejection::AlreadyPresent));
        assert_eq!(add(1, &[]), Ok(vec![1]));
    }

    #[test]
    fn remove_keeps_one_assistant() {
        assert_eq!(remove(7, &[7]), Err(ListRejection::LastRemaining));
        assert_eq!(remove(7, &[7, 8]), Ok(vec![8]));
        assert_eq!(remove(2, &[1, 2, 3]), Ok(vec![1, 3]));
        assert_eq!(remove(5, &[1, 2]), Err(ListRejection::NotFound));
    }

    #[test]
    fn reorder_moves_into_target_slot() {
        assert_eq!(reorder(&[1, 2, 3, 4], 1, 3), Ok(vec![2, 3, 1, 4]));
        assert_eq!(reorder(&[1, 2, 3, 4], 4, 2), Ok(vec![1, 4, 2, 3]));
        assert_eq!(reorder(&[1, 2], 1, 1), Err(ListRejection::Unchanged));
        assert_eq!(reorder(&[1, 2], 1, 9), Err(ListRejection::NotFound));
    }

    #[test]
    fn effective_list_prefers_chosen() {
        let all = [1, 2, 3];
        let chosen = [3];
        assert_eq!(effective_list(&all, Some(&chosen[..])), &[3]);
        assert_eq!(effective_list(&all, None), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn successful_edit_persists_new_order() {
        let backend = Arc::new(RecordingBackend::default());
        let editor = PreferenceEditor::new(backend.clone());

        assert!(editor.move_down(3, &[3, 1, 2]).await);
        assert_eq!(backend.chosen_updates(), vec![vec![1, 3, 2]]);
    }

    #[tokio::test]
    async fn rejected_edit_never_calls_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let editor = PreferenceEditor::new(backend.clone());

        assert!(!editor.move_up(3, &[3, 1, 2]).await);
        assert!(!editor.remove(3, &[3]).await);
        assert!(!editor.add(1, &[3, 1, 2]).await);
        assert!(backend.chosen_updates().is_empty());
    }

    #[tokio::test]
    async fn remote_failure_is_reported() {
        let backend = Arc::new(RecordingBackend::failing_updates("boom"));
        let pool = init_memory_db().unwrap();
        let editor = PreferenceEditor::new(backend.clone()).with_event_log(pool.clone());

        match editor.apply(ListEdit::Add(9), &[1]).await {
            Err(EditError::Remote(DeskError::Remote { detail, .. })) => assert_eq!(detail, "boom"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        let conn = pool.get().unwrap();
        let events = recent_events(&conn, Some("assistants.preferences"), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, "warn");
    }

    #[tokio::test]
    async fn edits_are_logged() {
        let backend = Arc::new(RecordingBackend::default());
        let pool = init_memory_db().unwrap();
        let editor = PreferenceEditor::new(backend).with_event_log(pool.clone());

        assert!(editor.reorder(&[1, 2, 3], 3, 1).await);
        assert!(!editor.move_up(1, &[1, 2]).await);

        let conn = pool.get().unwrap();
        let events = recent_events(&conn, Some("assistants.preferences"), None).unwrap();
        let codes: Vec<_> = events.iter().filter_map(|e| e.code.clone()).collect();
        assert!(codes.contains(&"PREF-0001".to_string()));
        assert!(codes.contains(&"PREF-0101".to_string()));
    }
}
