pub mod crypto;
pub mod normalizer;
pub mod transcribe;

pub use normalizer::{
    classify, extract_identity, parse_envelope, Classification, MediaDownloader, MessageBody,
    SenderIdentity, WebhookEnvelope,
};
pub use transcribe::Transcriber;
