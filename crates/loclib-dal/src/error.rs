use std::time::Duration;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Referential conflict: {0}")]
    ReferentialConflict(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Failures of the storage itself, the user may retry later
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::DatabaseError(_) | Error::Timeout(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db_error) if db_error.is_foreign_key_violation() => {
                Error::ReferentialConflict(db_error.message().to_string())
            }
            _ => Error::DatabaseError(e),
        }
    }
}
