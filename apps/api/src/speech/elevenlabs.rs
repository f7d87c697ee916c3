use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AudioUpload, SpeechError, SpeechToText, TextToSpeech};

const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";
const STT_MODEL: &str = "scribe_v2";
const STT_LANGUAGE: &str = "eng";
/// Low-latency voice model.
const TTS_MODEL: &str = "eleven_turbo_v2_5";
const TTS_OUTPUT_FORMAT: &str = "mp3_44100_128";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsError {
    detail: ElevenLabsErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ElevenLabsErrorDetail {
    Message { message: String },
    Text(String),
}

/// ElevenLabs client covering both speech-to-text and text-to-speech.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsClient {
    pub fn new(api_key: String, voice_id: String) -> Result<Self, SpeechError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            voice_id,
        })
    }

    async fn error_from(response: reqwest::Response) -> SpeechError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ElevenLabsError>(&body) {
            Ok(ElevenLabsError {
                detail: ElevenLabsErrorDetail::Message { message },
            }) => message,
            Ok(ElevenLabsError {
                detail: ElevenLabsErrorDetail::Text(text),
            }) => text,
            Err(_) => body,
        };
        SpeechError::Api { status, message }
    }
}

#[async_trait]
impl SpeechToText for ElevenLabsClient {
    async fn transcribe(&self, audio: &AudioUpload) -> Result<String, SpeechError> {
        if audio.bytes.is_empty() {
            return Err(SpeechError::InvalidUpload("audio file is empty".into()));
        }

        debug!(
            size = audio.bytes.len(),
            mime = %audio.mime_type,
            "Transcribing audio"
        );

        let file_part = multipart::Part::bytes(audio.bytes.to_vec())
            .file_name(audio.file_name.clone())
            .mime_str(&audio.mime_type)
            .map_err(|e| SpeechError::InvalidUpload(format!("mime: {e}")))?;

        let form = multipart::Form::new()
            .text("model_id", STT_MODEL)
            .text("tag_audio_events", "true")
            .text("language_code", STT_LANGUAGE)
            .part("file", file_part);

        let response = self
            .client
            .post(format!("{ELEVENLABS_API_URL}/speech-to-text"))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let transcript: TranscriptionResponse = response.json().await?;
        info!(chars = transcript.text.len(), "Transcription completed");

        Ok(transcript.text.trim().to_string())
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        let url = format!("{ELEVENLABS_API_URL}/text-to-speech/{}", self.voice_id);

        let response = self
            .client
            .post(&url)
            .query(&[("output_format", TTS_OUTPUT_FORMAT)])
            .header("xi-api-key", &self.api_key)
            .json(&SynthesisRequest {
                text,
                model_id: TTS_MODEL,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let audio = response.bytes().await?;
        debug!(bytes = audio.len(), "Speech synthesized");
        Ok(audio)
    }
}
