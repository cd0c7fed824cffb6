use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique or primary-key constraint rejected the write.
    #[error("constraint violated: {constraint}")]
    Conflict { constraint: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),

    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    #[error("corrupt value {value:?} in column {column}")]
    CorruptRow { column: &'static str, value: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Only uniqueness violations count as conflicts. Other constraint failures
/// (NOT NULL, CHECK, triggers) are plain store errors.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi, msg) = &err {
            if matches!(
                ffi.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ) {
                return Self::Conflict {
                    constraint: msg.clone().unwrap_or_else(|| ffi.to_string()),
                };
            }
        }
        Self::Sqlite(err)
    }
}
