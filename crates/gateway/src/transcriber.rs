//! Audio transcription (§6's `transcribe(audio_buffer) -> text` interface).
//! A Whisper-compatible adapter sharing the LLM provider's base URL and
//! bearer token, since the reference deployment's model vendor also hosts
//! transcription.

use std::time::Duration;

use relay_domain::{Error, Result};
use relay_media::Transcriber;

pub struct WhisperTranscriber {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client with timeout always builds");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, audio_buffer: &[u8]) -> Result<String> {
        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let part = reqwest::multipart::Part::bytes(audio_buffer.to_vec()).file_name("audio.ogg");
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Provider {
                provider: "whisper".into(),
                message: format!("request failed: {e}"),
            })?;

        let status = resp.status();
        let payload: serde_json::Value = resp.json().await.map_err(|e| Error::Provider {
            provider: "whisper".into(),
            message: format!("invalid JSON response: {e}"),
        })?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: "whisper".into(),
                message: format!("HTTP {status}"),
            });
        }

        payload
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::Provider {
                provider: "whisper".into(),
                message: "missing 'text' field in response".into(),
            })
    }
}
