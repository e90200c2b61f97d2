use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `glimmer`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum GlimmerError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    #[error("session: {0}")]
    Session(#[from] SessionError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    // Generic fallthrough (wraps anyhow for interop)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── LLM / endpoint errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured; set GEMINI_API_KEY or add api_key to config.toml")]
    MissingApiKey,

    #[error("model endpoint returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

// ─── Session errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
}

// ─── Storage errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("read failed for key {key}: {message}")]
    Read { key: String, message: String },

    #[error("write failed for key {key}: {message}")]
    Write { key: String, message: String },
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, GlimmerError>;
