//! Chat provider client (§6) — the single HTTP collaborator for sending
//! replies, listing group participants, and fetching encrypted media.
//! Mirrors the OpenAI-compatible adapter's `reqwest::Client` idiom: one
//! timeout-bounded client, JSON in and out, provider errors wrapped as
//! `Error::Provider`.

use std::time::Duration;

use serde_json::Value;

use relay_authz::ChatProvider;
use relay_domain::{Error, Result};
use relay_media::MediaDownloader;

const PROVIDER_ID: &str = "chat";

pub struct ChatClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client with timeout always builds");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Deliver `text` to `chat_id`. Returns `false` on any failure; the
    /// caller logs and does not retry (§4.10).
    pub async fn send_message(&self, chat_id: &str, text: &str) -> bool {
        let url = format!("{}/message/sendText", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "number": chat_id, "text": text });

        match self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), chat_id, "chat provider rejected send");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, chat_id, "chat provider send failed");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl ChatProvider for ChatClient {
    async fn get_group_participants(&self, group_id: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/group/participants/{group_id}",
            self.base_url.trim_end_matches('/')
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("request failed: {e}"),
            })?;

        let payload: Value = resp.json().await.map_err(|e| Error::Provider {
            provider: PROVIDER_ID.into(),
            message: format!("invalid JSON response: {e}"),
        })?;

        let participants = payload
            .get("participants")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Provider {
                provider: PROVIDER_ID.into(),
                message: "missing participants array".into(),
            })?;

        Ok(participants
            .iter()
            .filter_map(|p| p.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .collect())
    }
}

#[async_trait::async_trait]
impl MediaDownloader for ChatClient {
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("media fetch failed: {e}"),
            })?;

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Provider {
                provider: PROVIDER_ID.into(),
                message: format!("media body read failed: {e}"),
            })
    }
}
