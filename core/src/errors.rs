use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("Database unavailable")]
    DbUnavailable,
    #[error("Backend unreachable: {0}")]
    BackendUnavailable(String),
    #[error("Backend rejected the request ({status}): {detail}")]
    Remote { status: u16, detail: String },
    #[error("Unexpected backend payload: {0}")]
    Decode(String),
    #[error("Chat context is missing {0}")]
    ContextIncomplete(&'static str),
    #[error("Unknown error")]
    Unknown,
}

impl DeskError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DbUnavailable => "DB-1001",
            Self::BackendUnavailable(_) => "NET-1001",
            Self::Remote { .. } => "NET-1002",
            Self::Decode(_) => "NET-1003",
            Self::ContextIncomplete(_) => "CTX-1001",
            Self::Unknown => "GEN-1000",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::DbUnavailable => "The application could not access the SQLite database.",
            Self::BackendUnavailable(_) => "The knowledge backend could not be reached.",
            Self::Remote { .. } => "The backend answered with a non-success status; nothing changed server-side.",
            Self::Decode(_) => "The backend response did not match the expected shape.",
            Self::ContextIncomplete(_) => "A chat context was built before its required data was loaded.",
            Self::Unknown => "An unspecified error occurred.",
        }
    }

    /// Message suitable for a user-facing notice.
    pub fn detail(&self) -> String {
        match self {
            Self::Remote { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
