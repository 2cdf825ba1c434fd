//! Speech port — the recognition engine as seen by the core.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use lumibulb_domain::error::BulbError;
use lumibulb_domain::speech::Transcription;

/// Options passed to [`SpeechRecognizer::start_listening`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenOptions {
    /// BCP-47 locale, e.g. `en-US`.
    pub locale: String,
    /// Deliver intermediate results while the user is still speaking.
    pub partial_results: bool,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            partial_results: true,
        }
    }
}

/// A speech-recognition engine.
pub trait SpeechRecognizer: Send + Sync {
    /// Whether recognition is supported on this device.
    fn check_availability(&self) -> impl Future<Output = bool> + Send;

    /// Ask the user for microphone access. Resolves to whether it was granted.
    fn request_permission(&self) -> impl Future<Output = bool> + Send;

    /// Start listening, pushing every result into `results`.
    ///
    /// Resolves to whether listening actually started.
    fn start_listening(
        &self,
        options: ListenOptions,
        results: mpsc::UnboundedSender<Transcription>,
    ) -> impl Future<Output = Result<bool, BulbError>> + Send;

    /// Stop listening. Results sent afterwards are ignored by the core.
    fn stop_listening(&self) -> impl Future<Output = Result<(), BulbError>> + Send;
}

impl<T: SpeechRecognizer> SpeechRecognizer for Arc<T> {
    fn check_availability(&self) -> impl Future<Output = bool> + Send {
        (**self).check_availability()
    }

    fn request_permission(&self) -> impl Future<Output = bool> + Send {
        (**self).request_permission()
    }

    fn start_listening(
        &self,
        options: ListenOptions,
        results: mpsc::UnboundedSender<Transcription>,
    ) -> impl Future<Output = Result<bool, BulbError>> + Send {
        (**self).start_listening(options, results)
    }

    fn stop_listening(&self) -> impl Future<Output = Result<(), BulbError>> + Send {
        (**self).stop_listening()
    }
}
