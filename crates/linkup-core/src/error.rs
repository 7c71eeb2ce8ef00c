use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(#[from] linkup_db::DbError),
    #[error("internal error: {0}")]
    Internal(String),
}
