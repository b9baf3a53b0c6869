use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid source '{source_id}': {reason}")]
    InvalidSource { source_id: String, reason: String },

    #[error("Unsupported source host '{host}' for {source_id}")]
    UnsupportedHost { host: String, source_id: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Remote returned HTTP {status} for {resource}")]
    Remote { status: u16, resource: String },

    #[error("Lockfile is missing entries for: {}", .sources.join(", "))]
    FrozenMissingEntries { sources: Vec<String> },

    #[error(
        "Pinned ref for {source_id} changed from {} to {}; run without --frozen to update the lock",
        .locked.as_deref().unwrap_or("default branch"),
        .requested.as_deref().unwrap_or("default branch")
    )]
    FrozenRefMismatch {
        source_id: String,
        locked: Option<String>,
        requested: Option<String>,
    },

    #[error("Integrity mismatch for skill '{skill}' from {source_key}: locked {expected}, fetched {actual}")]
    FrozenIntegrityMismatch {
        source_key: String,
        skill: String,
        expected: String,
        actual: String,
    },
}

impl SpError {
    /// Errors that abort a whole install run instead of a single source.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FrozenMissingEntries { .. }
                | Self::FrozenRefMismatch { .. }
                | Self::FrozenIntegrityMismatch { .. }
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Remote { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, SpError>;
