//! In-memory speech services for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{AudioUpload, SpeechError, SpeechToText, TextToSpeech};

/// Returns a fixed transcript and, if configured, fixed audio bytes.
pub struct MockSpeech {
    transcript: String,
    audio: Option<Vec<u8>>,
    synthesized: Mutex<Vec<String>>,
}

impl MockSpeech {
    pub fn new(transcript: &str, audio: Option<Vec<u8>>) -> Self {
        Self {
            transcript: transcript.to_string(),
            audio,
            synthesized: Mutex::new(Vec::new()),
        }
    }

    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechToText for MockSpeech {
    async fn transcribe(&self, _audio: &AudioUpload) -> Result<String, SpeechError> {
        Ok(self.transcript.clone())
    }
}

#[async_trait]
impl TextToSpeech for MockSpeech {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        self.synthesized.lock().unwrap().push(text.to_string());
        self.audio
            .clone()
            .map(Bytes::from)
            .ok_or_else(|| SpeechError::Api {
                status: 500,
                message: "tts down".into(),
            })
    }
}

/// Transcription backend that always fails.
pub struct BrokenTranscriber;

#[async_trait]
impl SpeechToText for BrokenTranscriber {
    async fn transcribe(&self, _audio: &AudioUpload) -> Result<String, SpeechError> {
        Err(SpeechError::Api {
            status: 401,
            message: "invalid api key".into(),
        })
    }
}
