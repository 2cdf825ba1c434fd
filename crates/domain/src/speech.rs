//! Speech session — the transient state of one voice-recording run.

use serde::{Deserialize, Serialize};

/// One result delivered by the speech recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// `true` once the recognizer considers the utterance complete.
    pub finished: bool,
}

impl Transcription {
    #[must_use]
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finished: false,
        }
    }

    #[must_use]
    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finished: true,
        }
    }
}

/// Created when recording starts, discarded once stopped and consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechSession {
    recording: bool,
    last_transcription: Option<String>,
    finished: bool,
    consumed: bool,
}

impl SpeechSession {
    /// A fresh session that is recording and has heard nothing yet.
    #[must_use]
    pub fn start() -> Self {
        Self {
            recording: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    #[must_use]
    pub fn last_transcription(&self) -> Option<&str> {
        self.last_transcription.as_deref()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Store a recognizer result. Ignored once recording has stopped.
    ///
    /// New text makes the session consumable again.
    ///
    /// Returns whether the result was accepted.
    pub fn record(&mut self, transcription: Transcription) -> bool {
        if !self.recording {
            return false;
        }
        if self.last_transcription.as_deref() != Some(transcription.text.as_str()) {
            self.consumed = false;
        }
        self.last_transcription = Some(transcription.text);
        self.finished = transcription.finished;
        true
    }

    /// Stop accepting results.
    pub fn stop(&mut self) {
        self.recording = false;
    }

    /// Hand out the last transcription for resolution, at most once.
    ///
    /// Returns `None` if nothing was heard or the session was already
    /// consumed.
    pub fn consume(&mut self) -> Option<String> {
        if self.consumed {
            return None;
        }
        let text = self.last_transcription.clone()?;
        self.consumed = true;
        Some(text)
    }
}
