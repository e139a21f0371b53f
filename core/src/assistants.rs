//! Assistant catalogue as seen by one user: ordering, ownership and the
//! active/hidden partition behind the "My Assistants" list.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::llm::AssistantOverride;
use crate::notice::Notice;
use crate::preferences::{AssistantId, EditError, ListEdit, ListRejection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalUserSnapshot {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSnapshot {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub id: AssistantId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub display_priority: Option<i64>,
    #[serde(default)]
    pub owner: Option<MinimalUserSnapshot>,
    #[serde(default)]
    pub users: Vec<MinimalUserSnapshot>,
    #[serde(default)]
    pub tools: Vec<ToolSnapshot>,
    #[serde(default)]
    pub llm_model_provider_override: Option<String>,
    #[serde(default)]
    pub llm_model_version_override: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Persona {
    pub fn llm_override(&self) -> AssistantOverride {
        AssistantOverride {
            llm_model_provider_override: self.llm_model_provider_override.clone(),
            llm_model_version_override: self.llm_model_version_override.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default)]
    pub chosen_assistants: Option<Vec<AssistantId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub preferences: UserPreferences,
}

impl User {
    pub fn chosen_assistants(&self) -> Option<&[AssistantId]> {
        self.preferences.chosen_assistants.as_deref()
    }
}

/// Without a user (auth disabled) every assistant counts as owned.
pub fn user_owns_assistant(user: Option<&User>, persona: &Persona) -> bool {
    match user {
        None => true,
        Some(user) => persona
            .owner
            .as_ref()
            .map(|owner| owner.id == user.id)
            .unwrap_or(false),
    }
}

/// The user's chosen list, or `None` when there is none or it names no
/// assistant in the catalogue. A stale list is treated as absent everywhere.
pub fn live_chosen_assistants<'a>(personas: &[Persona], user: Option<&'a User>) -> Option<&'a [AssistantId]> {
    let chosen = user.and_then(User::chosen_assistants)?;
    chosen
        .iter()
        .any(|id| personas.iter().any(|p| p.id == *id))
        .then_some(chosen)
}

/// Personas in the order the user sees them in the assistant selector.
pub fn order_assistants_for_user<'a>(personas: &'a [Persona], user: Option<&User>) -> Vec<&'a Persona> {
    let Some(chosen) = live_chosen_assistants(personas, user) else {
        return personas.iter().collect();
    };

    let positions: HashMap<AssistantId, usize> = chosen
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect();
    let mut ordered: Vec<&Persona> = personas
        .iter()
        .filter(|p| positions.contains_key(&p.id))
        .collect();
    ordered.sort_by_key(|p| positions.get(&p.id).copied().unwrap_or(usize::MAX));
    ordered
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantRow {
    pub id: AssistantId,
    pub name: String,
    pub description: String,
    pub is_first: bool,
    pub is_last: bool,
    pub is_visible: bool,
    pub owned_by_user: bool,
    pub shareable: bool,
    pub actions: Vec<RowAction>,
    pub action_labels: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    MoveUp,
    MoveDown,
    Hide,
    Remove,
    Add,
}

impl RowAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::MoveUp => "Move Up",
            Self::MoveDown => "Move Down",
            Self::Hide => "Hide",
            Self::Remove => "Remove",
            Self::Add => "Add",
        }
    }
}

/// Active and owned-but-hidden groups for one user.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantListView {
    pub active: Vec<AssistantRow>,
    pub hidden: Vec<AssistantRow>,
    pub all_assistant_ids: Vec<AssistantId>,
}

impl AssistantListView {
    pub fn build(personas: &[Persona], user: Option<&User>) -> Self {
        let ordered = order_assistants_for_user(personas, user);

        let hidden: Vec<&Persona> = match live_chosen_assistants(personas, user) {
            Some(chosen) => {
                let chosen: HashSet<AssistantId> = chosen.iter().copied().collect();
                personas
                    .iter()
                    .filter(|p| user_owns_assistant(user, p) && !chosen.contains(&p.id))
                    .collect()
            }
            None => Vec::new(),
        };

        Self {
            active: annotate(&ordered, user, true),
            hidden: annotate(&hidden, user, false),
            all_assistant_ids: personas.iter().map(|p| p.id).collect(),
        }
    }

    pub fn find(&self, id: AssistantId) -> Option<&AssistantRow> {
        self.active
            .iter()
            .chain(self.hidden.iter())
            .find(|row| row.id == id)
    }
}

fn annotate(group: &[&Persona], user: Option<&User>, is_visible: bool) -> Vec<AssistantRow> {
    let last = group.len().saturating_sub(1);
    group
        .iter()
        .enumerate()
        .map(|(index, persona)| {
            let owned = user_owns_assistant(user, persona);
            let is_first = index == 0;
            let is_last = index == last;
            let mut actions = Vec::new();
            // Hidden rows are not in the chosen list, so only adding applies.
            if is_visible && !is_first {
                actions.push(RowAction::MoveUp);
            }
            if is_visible && !is_last {
                actions.push(RowAction::MoveDown);
            }
            actions.push(match (is_visible, owned) {
                (true, true) => RowAction::Hide,
                (true, false) => RowAction::Remove,
                (false, _) => RowAction::Add,
            });
            AssistantRow {
                id: persona.id,
                name: persona.name.clone(),
                description: persona.description.clone(),
                is_first,
                is_last,
                is_visible,
                owned_by_user: owned,
                shareable: owned && !persona.is_public,
                action_labels: actions.iter().map(|action| action.label()).collect(),
                actions,
            }
        })
        .collect()
}

/// Popup text for the outcome of a list edit on the assistant called `name`.
pub fn edit_notice(edit: &ListEdit, name: &str, outcome: &Result<Vec<AssistantId>, EditError>) -> Notice {
    let (done, failed) = match edit {
        ListEdit::MoveUp(_) => ("has been moved up.", "could not be moved up."),
        ListEdit::MoveDown(_) => ("has been moved down.", "could not be moved down."),
        ListEdit::Add(_) => ("has been added to your list.", "could not be added to your list."),
        ListEdit::Remove(_) => (
            "has been removed from your list.",
            "could not be removed from your list.",
        ),
        ListEdit::Reorder { .. } => ("has been moved.", "could not be moved."),
    };
    match outcome {
        Ok(_) => Notice::success(format!("\"{name}\" {done}")),
        Err(EditError::Rejected(ListRejection::LastRemaining)) => Notice::error(format!(
            "Cannot remove \"{name}\" - you must have at least one assistant."
        )),
        Err(_) => Notice::error(format!("\"{name}\" {failed}")),
    }
}
