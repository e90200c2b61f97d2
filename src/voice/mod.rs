//! Speech-to-text input seams.
//!
//! The platform speech recognizer and microphone permission prompt are
//! external collaborators; this module defines the capability traits they
//! are adapted behind, plus the input-buffer state machine the UI drives.

/// Microphone permission gate. One call before recording may start.
pub trait MicrophonePermission: Send + Sync {
    fn request_permission(&self) -> Permission;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Event surface of a platform speech recognizer. Adapters around the real
/// recognizer call these; `VoiceInput` is the stock implementation.
pub trait SpeechEvents {
    fn on_partial_result(&mut self, text: &str);
    fn on_final_result(&mut self, text: &str);
    fn on_end(&mut self);
    fn on_error(&mut self, message: &str);
}

/// Input buffer fed by recognition events. Partial and final results are
/// treated identically (replace the buffer); end and error both stop
/// recording.
#[derive(Debug, Default)]
pub struct VoiceInput {
    buffer: String,
    recording: bool,
}

impl VoiceInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a recording, gated on microphone permission.
    pub fn start_recording(&mut self, permission: &dyn MicrophonePermission) -> bool {
        match permission.request_permission() {
            Permission::Granted => {
                self.recording = true;
                true
            }
            Permission::Denied => {
                tracing::debug!("recording refused: microphone permission denied");
                false
            }
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Take the captured text, clearing the buffer.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

impl SpeechEvents for VoiceInput {
    fn on_partial_result(&mut self, text: &str) {
        self.buffer.clear();
        self.buffer.push_str(text);
    }

    fn on_final_result(&mut self, text: &str) {
        self.buffer.clear();
        self.buffer.push_str(text);
    }

    fn on_end(&mut self) {
        self.recording = false;
    }

    fn on_error(&mut self, message: &str) {
        tracing::debug!("speech recognition error: {message}");
        self.recording = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{MicrophonePermission, Permission, SpeechEvents, VoiceInput};

    struct FixedPermission(Permission);

    impl MicrophonePermission for FixedPermission {
        fn request_permission(&self) -> Permission {
            self.0
        }
    }

    #[test]
    fn denied_permission_refuses_recording() {
        let mut input = VoiceInput::new();
        assert!(!input.start_recording(&FixedPermission(Permission::Denied)));
        assert!(!input.is_recording());
    }

    #[test]
    fn granted_permission_starts_recording() {
        let mut input = VoiceInput::new();
        assert!(input.start_recording(&FixedPermission(Permission::Granted)));
        assert!(input.is_recording());
    }

    #[test]
    fn partial_and_final_results_both_replace_buffer() {
        let mut input = VoiceInput::new();
        input.on_partial_result("hel");
        input.on_partial_result("hello");
        assert_eq!(input.buffer(), "hello");

        input.on_final_result("hello world");
        assert_eq!(input.buffer(), "hello world");
    }

    #[test]
    fn end_and_error_both_stop_recording() {
        let mut input = VoiceInput::new();
        input.start_recording(&FixedPermission(Permission::Granted));
        input.on_end();
        assert!(!input.is_recording());

        input.start_recording(&FixedPermission(Permission::Granted));
        input.on_error("mic unavailable");
        assert!(!input.is_recording());
    }

    #[test]
    fn take_drains_the_buffer() {
        let mut input = VoiceInput::new();
        input.on_final_result("send this");
        assert_eq!(input.take(), "send this");
        assert!(input.buffer().is_empty());
    }
}
