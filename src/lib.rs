#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod sessions;
pub mod storage;
pub mod voice;

pub use chat::ChatController;
pub use config::Config;
pub use error::{GlimmerError, Result};
pub use llm::{ChunkSink, CliChunkSink, EngineConfig, GeminiEngine};
pub use sessions::{ChatSession, Message, SessionManager};
pub use storage::{FileStore, MemoryStore, StoreAdapter};
