//! "Searching for: …" header above a chat answer, with inline query editing.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    query: String,
    draft: String,
    editing: bool,
    editable: bool,
    has_docs: bool,
    message_id: Option<i64>,
}

impl SearchSummary {
    pub fn new(query: impl Into<String>, has_docs: bool, message_id: Option<i64>) -> Self {
        let query = query.into();
        Self {
            draft: query.clone(),
            query,
            editing: false,
            editable: false,
            has_docs,
            message_id,
        }
    }

    /// Allow the query to be rewritten and re-run.
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn has_docs(&self) -> bool {
        self.has_docs
    }

    pub fn message_id(&self) -> Option<i64> {
        self.message_id
    }

    pub fn display(&self) -> String {
        format!("Searching for: {}", self.draft)
    }

    /// Returns false when editing is not supported for this message.
    pub fn begin_edit(&mut self) -> bool {
        if self.editable {
            self.editing = true;
        }
        self.editing
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        if self.editing {
            self.draft = text.into();
        }
    }

    /// Finish editing. Returns the query to re-run, if it changed.
    pub fn commit(&mut self) -> Option<String> {
        if !self.editing {
            return None;
        }
        self.editing = false;
        if self.draft.is_empty() {
            self.draft = self.query.clone();
            None
        } else if self.draft != self.query {
            Some(self.draft.clone())
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.draft = self.query.clone();
        self.editing = false;
    }

    /// The upstream query changed, e.g. after a re-run finished.
    pub fn sync_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        if !self.editing {
            self.draft = self.query.clone();
        }
    }
}

pub struct ShowHideDocs;

impl ShowHideDocs {
    pub fn label(currently_showing: bool) -> &'static str {
        if currently_showing {
            "Hide Docs"
        } else {
            "Show Docs"
        }
    }
}
