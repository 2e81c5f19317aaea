//! WhatsApp/Evolution-API media decryption: HKDF-SHA256 key derivation
//! followed by AES-256-CBC with PKCS7 padding. Fixed by the provider's
//! protocol — must match bit-exactly (§4.5) — ported from the reference
//! decoder rather than designed from scratch.

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use relay_domain::{Error, Result};

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Length of the expanded key material: 16 bytes IV + 32 bytes AES key +
/// 32 bytes MAC key + 16 bytes ref key, though only the first 48 bytes are
/// used here (IV and AES key).
const EXPANDED_KEY_LEN: usize = 112;

/// Trailing MAC bytes appended by the provider; stripped before decrypt.
const MAC_TRAILER_LEN: usize = 10;

/// Per-media-type HKDF info strings, straight from the provider's protocol.
fn app_info_for_mime(mime_type: &str) -> &'static [u8] {
    let lower = mime_type.to_ascii_lowercase();
    if lower.starts_with("image") {
        b"WhatsApp Image Keys"
    } else if lower.starts_with("video") {
        b"WhatsApp Video Keys"
    } else if lower.starts_with("document") {
        b"WhatsApp Document Keys"
    } else {
        // Covers "audio/*" (including the "audio/ogg" alias) and anything
        // unrecognized — the reference decoder defaults to audio too.
        b"WhatsApp Audio Keys"
    }
}

/// HKDF-SHA256 with a zero-salt extract phase, matching the provider's
/// hand-rolled derivation exactly (not the RFC 5869 default salt-less
/// behavior of some library implementations, which happens to coincide
/// here since a zero-filled salt of the hash length is what "no salt"
/// means under HMAC).
fn hkdf_sha256(ikm: &[u8], info: &[u8], length: usize) -> Vec<u8> {
    let zero_salt = [0u8; 32];
    let mut extractor =
        HmacSha256::new_from_slice(&zero_salt).expect("HMAC accepts any key length");
    extractor.update(ikm);
    let prk = extractor.finalize().into_bytes();

    let mut okm = Vec::with_capacity(length);
    let mut block: Vec<u8> = Vec::new();
    let mut counter: u8 = 1;
    while okm.len() < length {
        let mut expander =
            HmacSha256::new_from_slice(&prk).expect("HMAC accepts any key length");
        expander.update(&block);
        expander.update(info);
        expander.update(&[counter]);
        block = expander.finalize().into_bytes().to_vec();
        okm.extend_from_slice(&block);
        counter = counter.wrapping_add(1);
    }
    okm.truncate(length);
    okm
}

/// Decrypt a downloaded WhatsApp media payload. `media_key_base64` is the
/// base64-encoded media key from the webhook envelope; `mime_type` selects
/// the HKDF info string.
pub fn decrypt_media(ciphertext: &[u8], media_key_base64: &str, mime_type: &str) -> Result<Vec<u8>> {
    let media_key = BASE64
        .decode(media_key_base64)
        .map_err(|e| Error::Other(format!("invalid media key base64: {e}")))?;

    if ciphertext.len() <= MAC_TRAILER_LEN {
        return Err(Error::Other("ciphertext too short to contain a MAC trailer".into()));
    }

    let info = app_info_for_mime(mime_type);
    let expanded = hkdf_sha256(&media_key, info, EXPANDED_KEY_LEN);
    let iv = &expanded[0..16];
    let aes_key = &expanded[16..48];

    let encrypted = &ciphertext[..ciphertext.len() - MAC_TRAILER_LEN];

    let cipher = Aes256CbcDec::new_from_slices(aes_key, iv)
        .map_err(|e| Error::Other(format!("bad AES key/IV length: {e}")))?;
    let mut buf = encrypted.to_vec();
    let plaintext = cipher
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|e| Error::Other(format!("AES-CBC decryption failed: {e}")))?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::{BlockEncryptMut, KeyIvInit as _};

    type Aes256CbcEnc = cbc::Encryptor<Aes256>;

    fn encrypt_for_test(plaintext: &[u8], aes_key: &[u8], iv: &[u8]) -> Vec<u8> {
        let cipher = Aes256CbcEnc::new_from_slices(aes_key, iv).unwrap();
        cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    #[test]
    fn app_info_maps_known_mime_prefixes() {
        assert_eq!(app_info_for_mime("audio/ogg"), b"WhatsApp Audio Keys");
        assert_eq!(app_info_for_mime("image/jpeg"), b"WhatsApp Image Keys");
        assert_eq!(app_info_for_mime("video/mp4"), b"WhatsApp Video Keys");
        assert_eq!(
            app_info_for_mime("application/pdf"),
            b"WhatsApp Audio Keys" // unrecognized falls back to audio
        );
    }

    #[test]
    fn hkdf_output_length_matches_request() {
        let out = hkdf_sha256(b"some-32-byte-media-key-material", b"info", 112);
        assert_eq!(out.len(), 112);
    }

    #[test]
    fn hkdf_is_deterministic() {
        let a = hkdf_sha256(b"key", b"WhatsApp Audio Keys", 112);
        let b = hkdf_sha256(b"key", b"WhatsApp Audio Keys", 112);
        assert_eq!(a, b);
    }

    #[test]
    fn decrypt_media_round_trips_with_matching_derivation() {
        let media_key = b"0123456789abcdef0123456789abcdef"; // 33 bytes, arbitrary
        let media_key_b64 = BASE64.encode(media_key);
        let mime = "audio/ogg";

        let expanded = hkdf_sha256(media_key, app_info_for_mime(mime), EXPANDED_KEY_LEN);
        let iv = &expanded[0..16];
        let aes_key = &expanded[16..48];

        let plaintext = b"a plausible decrypted ogg opus payload";
        let mut encrypted = encrypt_for_test(plaintext, aes_key, iv);
        encrypted.extend_from_slice(&[0u8; MAC_TRAILER_LEN]); // fake MAC trailer

        let decrypted = decrypt_media(&encrypted, &media_key_b64, mime).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn decrypt_media_rejects_too_short_ciphertext() {
        let result = decrypt_media(&[0u8; 4], "AAAA", "audio/ogg");
        assert!(result.is_err());
    }
}
