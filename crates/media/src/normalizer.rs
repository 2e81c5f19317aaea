//! Media Normalizer (§4.5) — classifies one inbound webhook envelope into
//! `ignore`, `text`, or `audio`, extracting the plain utterance plus the
//! two identities a downstream turn needs: where to reply, and who to
//! authorize.

use serde::Deserialize;

use relay_domain::{Error, Result};

use crate::crypto::decrypt_media;
use crate::transcribe::Transcriber;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub key: MessageKey,
    pub message: Option<MessageBody>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageKey {
    #[serde(rename = "remoteJid")]
    pub remote_jid: String,
    #[serde(rename = "remoteJidAlt", default)]
    pub remote_jid_alt: Option<String>,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(rename = "participantPn", default)]
    pub participant_pn: Option<String>,
    #[serde(rename = "fromMe", default)]
    pub from_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(rename = "extendedTextMessage", default)]
    pub extended_text_message: Option<ExtendedTextMessage>,
    #[serde(rename = "audioMessage", default)]
    pub audio_message: Option<AudioMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ExtendedTextMessage {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioMessage {
    pub url: String,
    #[serde(rename = "mediaKey")]
    pub media_key: String,
    pub mimetype: String,
}

/// The two identities extracted from one envelope: who to reply to, and
/// who to check against the authorized-group membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    pub chat_id: String,
    pub auth_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Ignore,
    Text(String),
    Audio(String),
}

/// Fetches the raw ciphertext for an `AudioMessage.url`. Kept separate from
/// `Transcriber` so a normalizer caller can swap either independently.
#[async_trait::async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Classify one webhook envelope. `own_account_id` is compared against the
/// sender's identities to detect outbound echoes.
pub async fn classify(
    envelope: &WebhookEnvelope,
    own_account_id: &str,
    downloader: &dyn MediaDownloader,
    transcriber: &dyn Transcriber,
) -> Classification {
    let key = &envelope.data.key;

    if key.from_me || key.participant.as_deref() == Some(own_account_id) {
        return Classification::Ignore;
    }

    let Some(message) = envelope.data.message.as_ref() else {
        return Classification::Ignore;
    };

    if let Some(text) = &message.conversation {
        if !text.trim().is_empty() {
            return Classification::Text(text.clone());
        }
    }
    if let Some(ext) = &message.extended_text_message {
        if !ext.text.trim().is_empty() {
            return Classification::Text(ext.text.clone());
        }
    }

    if let Some(audio) = &message.audio_message {
        return match transcribe_audio(audio, downloader, transcriber).await {
            Ok(text) => Classification::Audio(text),
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode/transcribe audio message");
                Classification::Ignore
            }
        };
    }

    Classification::Ignore
}

async fn transcribe_audio(
    audio: &AudioMessage,
    downloader: &dyn MediaDownloader,
    transcriber: &dyn Transcriber,
) -> Result<String> {
    let ciphertext = downloader.download(&audio.url).await?;
    let plaintext = decrypt_media(&ciphertext, &audio.media_key, &audio.mimetype)?;
    transcriber.transcribe(&plaintext).await
}

/// Extract the chat identity (where replies go) and the candidate
/// authorization identities (who the gate checks) from an envelope's key.
/// In a group, `remoteJid` is the group and `participant`/`participantPn`
/// are the actual sender; in a direct message there is no participant and
/// the remote JID itself is both identities, with `remoteJidAlt` (the same
/// chat in its other JID form) added as a second candidate, analogous to
/// `participantPn` supplementing `participant`.
pub fn extract_identity(envelope: &WebhookEnvelope) -> SenderIdentity {
    let key = &envelope.data.key;
    let chat_id = key.remote_jid.clone();

    let mut auth_ids = Vec::new();
    if let Some(p) = &key.participant {
        auth_ids.push(p.clone());
    }
    if let Some(p) = &key.participant_pn {
        auth_ids.push(p.clone());
    }
    if auth_ids.is_empty() {
        auth_ids.push(chat_id.clone());
        if let Some(alt) = &key.remote_jid_alt {
            auth_ids.push(alt.clone());
        }
    }

    SenderIdentity { chat_id, auth_ids }
}

pub fn parse_envelope(body: &[u8]) -> Result<WebhookEnvelope> {
    serde_json::from_slice(body).map_err(|e| Error::Json(e))
}
