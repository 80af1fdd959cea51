use thiserror::Error;

/// Errors raised while discovering or applying schema migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("cannot read migrations directory {0}: {1}")]
    UnreadableDirectory(String, std::io::Error),
    #[error("migration file name {0:?} has no version prefix")]
    MalformedName(String),
    #[error("migration file name {0:?} has an unparseable version")]
    UnparseableVersion(String),
    #[error("duplicate migration version {0}: {1:?} and {2:?}")]
    DuplicateVersion(i64, String, String),
    #[error("migration {version} ({name}) failed: {source}")]
    Apply {
        version: i64,
        name: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("migration tracking table error: {0}")]
    Tracking(#[from] rusqlite::Error),
}

/// Errors raised by the room store and message log.
///
/// Both components front the same `rooms`/`messages` tables and share this
/// taxonomy verbatim.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("room not found")]
    NotFound,
    #[error("room has expired")]
    RoomExpired,
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Protocol-level rejections surfaced to the offending sender as an `ERROR`
/// frame. Never closes the connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("invalid base64 in field: {0}")]
    InvalidBase64(&'static str),
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Short machine-readable code for the `ERROR` wire frame.
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::MissingField(_) => "MSG_REJECTED",
            ProtocolError::InvalidBase64(_) => "MSG_REJECTED",
            ProtocolError::Malformed(_) => "MSG_REJECTED",
        }
    }
}

