//! Core library for the assistant desk: the client-side logic behind the
//! knowledge-assistant admin pages and chat view.
//!
//! - [`llm`] resolves the effective provider/model pair for a chat turn.
//! - [`preferences`] edits a user's ordered list of visible assistants.
//! - [`assistants`] derives the per-user assistant list view.
//! - [`document_sets`] derives the document-set admin table and deletes sets.
//! - [`search_summary`] holds the query-editing state of a search header.
//! - [`context`] bundles chat-wide state into an explicit value.
//! - [`backend`] talks to the REST backend that owns all persistence.
//! - [`api`] exposes versioned commands over all of the above.
//! - [`config`], [`db`], [`errors`] and [`logging`] are the local plumbing.

pub mod api;
pub mod assistants;
pub mod backend;
pub mod config;
pub mod context;
pub mod db;
pub mod document_sets;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod notice;
pub mod preferences;
pub mod search_summary;
