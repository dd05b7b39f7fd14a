use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("start.gg request timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("start.gg connection failed after {attempts} attempts")]
    Connection { attempts: u32 },

    #[error("start.gg transport error: {0}")]
    Transport(String),

    #[error("start.gg returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("start.gg query failed: {}", messages.join(", "))]
    GraphQl { messages: Vec<String> },

    #[error("start.gg response missing {0}")]
    MissingData(String),

    #[error("failed to decode start.gg response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("batch of {len} ids exceeds width {width}")]
    BatchTooWide { len: usize, width: usize },

    #[error("batch width must be between 1 and {max}, got {width}")]
    InvalidBatchWidth { width: usize, max: usize },

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error)
}
