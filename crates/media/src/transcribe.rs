//! Audio transcriber interface (§6): turns a decrypted in-memory audio
//! buffer into text. The concrete speech-to-text vendor is an external
//! collaborator, not specified here.

use relay_domain::Result;

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_buffer: &[u8]) -> Result<String>;
}
