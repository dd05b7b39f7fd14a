use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("store rejected write to {table}: {reason}")]
    Rejected { table: String, reason: String }
}
