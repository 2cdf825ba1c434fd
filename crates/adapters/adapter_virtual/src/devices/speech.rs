//! Scripted speech recognizer — "hears" whatever it is told to.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use lumibulb_app::ports::{ListenOptions, SpeechRecognizer};
use lumibulb_domain::error::BulbError;
use lumibulb_domain::speech::Transcription;

use super::lock;

/// A recognizer driven by [`hear`](Self::hear) instead of a microphone.
pub struct ScriptedSpeech {
    available: AtomicBool,
    grant_permission: AtomicBool,
    listener: Mutex<Option<mpsc::UnboundedSender<Transcription>>>,
    options: Mutex<Option<ListenOptions>>,
}

impl Default for ScriptedSpeech {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            grant_permission: AtomicBool::new(true),
            listener: Mutex::new(None),
            options: Mutex::new(None),
        }
    }
}

impl ScriptedSpeech {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A device without speech recognition.
    #[must_use]
    pub fn unavailable() -> Self {
        let speech = Self::default();
        speech.available.store(false, Ordering::SeqCst);
        speech
    }

    pub fn set_grant_permission(&self, grant: bool) {
        self.grant_permission.store(grant, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        lock(&self.listener).is_some()
    }

    /// Options of the last `start_listening` call.
    #[must_use]
    pub fn last_options(&self) -> Option<ListenOptions> {
        lock(&self.options).clone()
    }

    /// Deliver a result as if the user had said `text`.
    ///
    /// Returns `false` when nobody is listening.
    pub fn hear(&self, text: &str, finished: bool) -> bool {
        let transcription = if finished {
            Transcription::complete(text)
        } else {
            Transcription::partial(text)
        };
        lock(&self.listener)
            .as_ref()
            .is_some_and(|results| results.send(transcription).is_ok())
    }
}

impl SpeechRecognizer for ScriptedSpeech {
    async fn check_availability(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_permission(&self) -> bool {
        self.grant_permission.load(Ordering::SeqCst)
    }

    async fn start_listening(
        &self,
        options: ListenOptions,
        results: mpsc::UnboundedSender<Transcription>,
    ) -> Result<bool, BulbError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(BulbError::SpeechUnavailable);
        }
        tracing::debug!(locale = %options.locale, partial = options.partial_results, "scripted listening");
        *lock(&self.options) = Some(options);
        *lock(&self.listener) = Some(results);
        Ok(true)
    }

    async fn stop_listening(&self) -> Result<(), BulbError> {
        lock(&self.listener).take();
        Ok(())
    }
}
