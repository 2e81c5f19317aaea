//! Inbound webhook (§6): one HTTP endpoint, deserialize → dedupe →
//! classify → authorize → enqueue. Response codes: 200 accepted (queued
//! or ignored), 403 unauthorized, 400 malformed, 500 internal failure.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;

use relay_domain::trace::TraceEvent;
use relay_media::{classify, extract_identity, parse_envelope, Classification, WebhookEnvelope};

use crate::state::AppState;

pub async fn handle(State(state): State<Arc<AppState>>, body: axum::body::Bytes) -> StatusCode {
    let envelope = match parse_envelope(&body) {
        Ok(env) => env,
        Err(e) => {
            tracing::warn!(error = %e, "malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let dedupe_key = dedupe_key(&envelope);
    if !state.dedupe.first_sighting(&dedupe_key) {
        tracing::debug!(dedupe_key, "duplicate webhook delivery ignored");
        return StatusCode::OK;
    }

    let identity = extract_identity(&envelope);

    let classification = classify(
        &envelope,
        &state.config.chat.own_account_id,
        state.chat.as_ref(),
        state.transcriber.as_ref(),
    )
    .await;

    let utterance = match classification {
        Classification::Ignore => return StatusCode::OK,
        Classification::Text(text) => text,
        Classification::Audio(text) => text,
    };

    let auth_ids: Vec<&str> = identity.auth_ids.iter().map(String::as_str).collect();
    let authorized = state
        .authorization_gate()
        .authorize_any(&auth_ids, &state.config.groups.authorized_group_ids)
        .await;

    if !authorized {
        TraceEvent::AuthorizationDenied {
            sender: identity.chat_id.clone(),
        }
        .emit();
        return StatusCode::FORBIDDEN;
    }
    TraceEvent::AuthorizationGranted {
        sender: identity.chat_id.clone(),
        group_id: state.config.groups.authorized_group_ids.join(","),
    }
    .emit();

    state.debouncer.enqueue(identity.chat_id, utterance).await;
    StatusCode::OK
}

/// Synthesize a stable-enough dedupe key from the envelope's fields. The
/// provider's webhook carries no explicit message ID (§6); the content
/// plus sender identity stands in for one.
fn dedupe_key(envelope: &WebhookEnvelope) -> String {
    let key = &envelope.data.key;
    let content = envelope
        .data
        .message
        .as_ref()
        .map(message_fingerprint)
        .unwrap_or_default();
    format!(
        "{}:{}:{}:{}",
        key.remote_jid,
        key.participant.as_deref().unwrap_or(""),
        key.from_me,
        content
    )
}

fn message_fingerprint(message: &relay_media::MessageBody) -> String {
    if let Some(text) = &message.conversation {
        return text.clone();
    }
    if let Some(ext) = &message.extended_text_message {
        return ext.text.clone();
    }
    if let Some(audio) = &message.audio_message {
        return audio.url.clone();
    }
    String::new()
}
