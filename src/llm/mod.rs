pub mod engine;
pub mod http_client;
pub mod scan;
pub mod streaming;
pub mod types;

pub use engine::{EngineConfig, GeminiEngine};
pub use scan::DeltaScanner;
pub use streaming::{ChunkSink, CliChunkSink, CollectSink};
pub use types::{ContextEntry, Part, Role};
