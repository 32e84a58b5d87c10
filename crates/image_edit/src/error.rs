use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error(transparent)]
    Canvas(#[from] mask_canvas::CanvasError),

    #[error("Invalid edit request: {0}")]
    InvalidRequest(String),

    #[error("API key not provided. Set OPENAI_API_KEY or pass it explicitly")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Image API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UNAUTHORIZED")]
    Unauthorized,
}

pub type Result<T> = std::result::Result<T, EditError>;
