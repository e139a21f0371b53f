//! Document-set admin table: derived sync badges, name ordering, paging and
//! deletion with user-facing notices.

use serde::{Deserialize, Serialize};

use crate::backend::BackendApi;
use crate::errors::DeskError;
use crate::notice::Notice;

pub const PAGE_SIZE: usize = 50;

pub const SYNCING_EDIT_HINT: &str =
    "Cannot update while syncing! Wait for the sync to finish, then try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSnapshot {
    pub id: i64,
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSnapshot {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CcPairDescriptor {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub connector: ConnectorSnapshot,
    #[serde(default)]
    pub credential: Option<CredentialSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cc_pair_descriptors: Vec<CcPairDescriptor>,
    pub is_up_to_date: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<i64>,
}

/// Sync status of one connector-credential pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorIndexingStatus {
    pub cc_pair_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub connector: ConnectorSnapshot,
    #[serde(default)]
    pub credential: Option<CredentialSnapshot>,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub last_success: Option<String>,
    #[serde(default)]
    pub docs_indexed: i64,
    #[serde(default)]
    pub public_doc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBadge {
    UpToDate,
    Syncing,
    Deleting,
}

impl SyncBadge {
    pub fn for_set(set: &DocumentSet) -> Self {
        if set.is_up_to_date {
            Self::UpToDate
        } else if !set.cc_pair_descriptors.is_empty() {
            Self::Syncing
        } else {
            Self::Deleting
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UpToDate => "Up to Date",
            Self::Syncing => "Syncing",
            Self::Deleting => "Deleting",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::UpToDate => "green",
            Self::Syncing => "amber",
            Self::Deleting => "red",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectorCell {
    pub cc_pair_id: i64,
    pub name: Option<String>,
    pub source: String,
    pub last_status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSetRow {
    pub id: i64,
    pub name: String,
    pub connectors: Vec<ConnectorCell>,
    pub badge: SyncBadge,
    pub badge_label: &'static str,
    pub badge_color: &'static str,
    pub editable: bool,
    pub edit_hint: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSetTable {
    pub rows: Vec<DocumentSetRow>,
    pub page: usize,
    pub total_pages: usize,
    pub total_sets: usize,
}

pub fn total_pages(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE)
}

impl DocumentSetTable {
    /// Sort by name and cut out one page; `page` is 1-based and clamped.
    pub fn build(
        mut sets: Vec<DocumentSet>,
        statuses: &[ConnectorIndexingStatus],
        page: usize,
    ) -> Self {
        sets.sort_by(|a, b| a.name.cmp(&b.name));
        let total_sets = sets.len();
        let total_pages = total_pages(total_sets);
        let page = page.clamp(1, total_pages.max(1));

        let rows = sets
            .iter()
            .skip((page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|set| row_for(set, statuses))
            .collect();

        Self {
            rows,
            page,
            total_pages,
            total_sets,
        }
    }
}

fn row_for(set: &DocumentSet, statuses: &[ConnectorIndexingStatus]) -> DocumentSetRow {
    let badge = SyncBadge::for_set(set);
    let connectors = set
        .cc_pair_descriptors
        .iter()
        .map(|descriptor| ConnectorCell {
            cc_pair_id: descriptor.id,
            name: descriptor.name.clone(),
            source: descriptor.connector.source.clone(),
            last_status: statuses
                .iter()
                .find(|status| status.cc_pair_id == descriptor.id)
                .and_then(|status| status.last_status.clone()),
        })
        .collect();
    DocumentSetRow {
        id: set.id,
        name: set.name.clone(),
        connectors,
        badge,
        badge_label: badge.label(),
        badge_color: badge.color(),
        editable: set.is_up_to_date,
        edit_hint: (!set.is_up_to_date).then_some(SYNCING_EDIT_HINT),
    }
}

/// Schedule deletion and describe the outcome. Errors never propagate; the
/// caller refreshes the table regardless.
pub async fn delete_document_set(backend: &dyn BackendApi, set: &DocumentSet) -> Notice {
    match backend.delete_document_set(set.id).await {
        Ok(()) => {
            log::info!("document set {} scheduled for deletion", set.id);
            Notice::success(format!(
                "Document set \"{}\" scheduled for deletion",
                set.name
            ))
        }
        Err(err) => {
            log::warn!("deleting document set {} failed: {err}", set.id);
            Notice::error(delete_failure_message(&err))
        }
    }
}

pub fn delete_failure_message(err: &DeskError) -> String {
    format!(
        "Failed to schedule document set for deletion - {}",
        err.detail()
    )
}
