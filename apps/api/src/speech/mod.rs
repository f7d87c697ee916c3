//! Speech services: transcription of recorded answers and synthesis of
//! interviewer replies. Backed by ElevenLabs in production.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

pub mod elevenlabs;

#[cfg(test)]
pub mod mock;

pub use elevenlabs::ElevenLabsClient;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid audio upload: {0}")]
    InvalidUpload(String),
}

/// A recorded audio file as received from the browser.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

impl AudioUpload {
    pub fn new(bytes: Bytes, mime_type: Option<&str>, file_name: Option<&str>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.unwrap_or("audio/webm").to_string(),
            file_name: file_name.unwrap_or("answer.webm").to_string(),
        }
    }
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String, SpeechError>;
}

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Returns the encoded audio (mp3) for `text`.
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError>;
}

/// Synthesizes `text` and base64-encodes the audio.
/// Synthesis failure is not fatal to a turn: it is logged and yields `None`.
pub async fn synthesize_base64(tts: &dyn TextToSpeech, text: &str) -> Option<String> {
    match tts.synthesize(text).await {
        Ok(audio) => Some(STANDARD.encode(&audio)),
        Err(e) => {
            warn!(error = %e, "Text-to-speech failed, continuing without audio");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockSpeech;

    #[tokio::test]
    async fn test_synthesize_base64_encodes_audio() {
        let speech = MockSpeech::new("unused", Some(b"mp3".to_vec()));
        assert_eq!(
            synthesize_base64(&speech, "hi").await.as_deref(),
            Some("bXAz")
        );
        assert_eq!(speech.synthesized(), vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn test_synthesize_base64_swallows_failures() {
        let speech = MockSpeech::new("unused", None);
        assert!(synthesize_base64(&speech, "hi").await.is_none());
    }

    #[test]
    fn test_audio_upload_defaults() {
        let upload = AudioUpload::new(Bytes::from_static(b"x"), None, None);
        assert_eq!(upload.mime_type, "audio/webm");
        assert_eq!(upload.file_name, "answer.webm");
    }
}
