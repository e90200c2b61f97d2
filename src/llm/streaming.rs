use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Receiver for streamed text deltas, in arrival order. The engine pushes
/// every delta (and, on failure, one final human-readable error chunk)
/// through this seam.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn on_chunk(&self, text: &str);
}

/// Prints deltas as they arrive, without buffering a full response.
pub struct CliChunkSink {
    writer: Arc<dyn Fn(&str) + Send + Sync>,
}

impl CliChunkSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: Arc::new(|text| {
                print!("{text}");
                use std::io::Write;
                let _ = std::io::stdout().flush();
            }),
        }
    }

    #[cfg(test)]
    fn with_writer(writer: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        Self { writer }
    }
}

impl Default for CliChunkSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkSink for CliChunkSink {
    async fn on_chunk(&self, text: &str) {
        (self.writer)(text);
    }
}

/// Accumulates deltas into one string. Test and one-shot helper.
#[derive(Default)]
pub struct CollectSink {
    collected: Mutex<String>,
}

impl CollectSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.collected.into_inner()
    }

    pub async fn text(&self) -> String {
        self.collected.lock().await.clone()
    }
}

#[async_trait]
impl ChunkSink for CollectSink {
    async fn on_chunk(&self, text: &str) {
        self.collected.lock().await.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::{ChunkSink, CliChunkSink, CollectSink};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn collect_sink_concatenates_in_order() {
        let sink = CollectSink::new();
        sink.on_chunk("He").await;
        sink.on_chunk("llo").await;
        assert_eq!(sink.text().await, "Hello");
    }

    #[tokio::test]
    async fn cli_sink_forwards_every_chunk_to_writer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = CliChunkSink::with_writer(Arc::new(move |text| {
            seen_clone.lock().unwrap().push(text.to_string());
        }));

        sink.on_chunk("a").await;
        sink.on_chunk("b").await;
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b"]);
    }
}
