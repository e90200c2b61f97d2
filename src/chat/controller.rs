use crate::error::{Result, SessionError};
use crate::llm::{ChunkSink, ContextEntry, GeminiEngine, Role};
use crate::sessions::{Message, SessionManager};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// Fixed instruction wrapped around the raw user text in the request
/// context. The raw text alone is what lands in the transcript.
const MARKDOWN_INSTRUCTION: &str =
    "Reply to the following message using Markdown formatting where it helps readability.";

/// Send lifecycle. One send may be in flight system-wide; a second
/// `send_message` while `Sending` is dropped, not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendState {
    Idle,
    Sending,
}

/// Orchestrates one message turn: guards, bounded context construction,
/// user + placeholder append, delta folding, persistence.
pub struct ChatController {
    manager: Arc<Mutex<SessionManager>>,
    engine: Arc<GeminiEngine>,
    model: StdMutex<String>,
    context_window: usize,
    state: StdMutex<SendState>,
}

impl ChatController {
    #[must_use]
    pub fn new(
        manager: Arc<Mutex<SessionManager>>,
        engine: Arc<GeminiEngine>,
        model: String,
        context_window: usize,
    ) -> Self {
        Self {
            manager,
            engine,
            model: StdMutex::new(model),
            context_window,
            state: StdMutex::new(SendState::Idle),
        }
    }

    pub fn set_model(&self, model: String) {
        if let Ok(mut current) = self.model.lock() {
            *current = model;
        }
    }

    #[must_use]
    pub fn model(&self) -> String {
        self.model
            .lock()
            .map(|model| model.clone())
            .unwrap_or_default()
    }

    /// Send one user message into a session and stream the reply back into
    /// it. Whitespace-only text and sends issued while another is in flight
    /// are dropped silently; an unknown session id is reported.
    ///
    /// Engine failures do not bubble out: the engine has already folded its
    /// terminal error chunk into the placeholder, which is the user-visible
    /// surface. They are logged here.
    pub async fn send_message(
        &self,
        session_id: &str,
        raw_text: &str,
        sink: &dyn ChunkSink,
    ) -> Result<()> {
        if raw_text.trim().is_empty() {
            return Ok(());
        }

        let Some(_guard) = self.begin_send() else {
            tracing::debug!("send dropped: another send is in flight");
            return Ok(());
        };

        let context = {
            let manager = self.manager.lock().await;
            let session = manager
                .session(session_id)
                .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            build_context(&session.messages, raw_text, self.context_window)
        };

        {
            let mut manager = self.manager.lock().await;
            manager.append_messages(
                session_id,
                vec![Message::user(raw_text), Message::assistant_placeholder()],
            );
        }

        let folding = FoldingSink {
            manager: &self.manager,
            session_id,
            forward: sink,
        };
        let model = self.model();
        if let Err(error) = self
            .engine
            .stream_response(&model, &context, &folding)
            .await
        {
            tracing::warn!("send failed: {error}");
        }

        let manager = self.manager.lock().await;
        if let Err(error) = manager.persist() {
            tracing::warn!("persist after send failed: {error}");
        }
        Ok(())
    }

    /// Flip to `Sending`, or return `None` when a send is already running.
    /// The guard flips back to `Idle` on drop, success or failure.
    fn begin_send(&self) -> Option<InFlightGuard<'_>> {
        let mut state = self.state.lock().ok()?;
        if *state == SendState::Sending {
            return None;
        }
        *state = SendState::Sending;
        Some(InFlightGuard { state: &self.state })
    }
}

struct InFlightGuard<'a> {
    state: &'a StdMutex<SendState>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = SendState::Idle;
        }
    }
}

/// Folds every delta into the session's trailing message, then forwards it
/// to the presentation sink.
struct FoldingSink<'a> {
    manager: &'a Mutex<SessionManager>,
    session_id: &'a str,
    forward: &'a dyn ChunkSink,
}

#[async_trait]
impl ChunkSink for FoldingSink<'_> {
    async fn on_chunk(&self, text: &str) {
        {
            let mut manager = self.manager.lock().await;
            manager.update_last_message(self.session_id, |mut message| {
                message.text.push_str(text);
                message
            });
        }
        self.forward.on_chunk(text).await;
    }
}

/// Trailing `context_window` messages in chronological order, role-tagged,
/// plus the new user turn wrapped in the Markdown instruction.
fn build_context(messages: &[Message], raw_text: &str, context_window: usize) -> Vec<ContextEntry> {
    let start = messages.len().saturating_sub(context_window);
    let mut context: Vec<ContextEntry> = messages[start..]
        .iter()
        .map(|message| {
            let role = if message.from_user {
                Role::User
            } else {
                Role::Model
            };
            ContextEntry::new(role, message.text.clone())
        })
        .collect();
    context.push(ContextEntry::new(
        Role::User,
        format!("{MARKDOWN_INSTRUCTION}\n\n{raw_text}"),
    ));
    context
}
