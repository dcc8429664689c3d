//! Secret codec for Passfold.
//!
//! Credential and account secrets are encrypted field-by-field before they
//! reach storage, with AES-256-CBC and a fresh random IV per call. The
//! stored envelope is `hex(iv) ":" hex(ciphertext)`, so decryption is
//! self-contained given the stored string and the process-wide key.
//!
//! # Compatibility
//!
//! The envelope format (and the `:` delimiter heuristic used to classify a
//! value as already-encrypted) is inherited from earlier deployments and
//! must stay byte-compatible with existing stored data. The heuristic is
//! fragile — a plaintext secret containing `:` is misclassified — which is
//! why the strict [`SecretCipher::encrypt`]/[`SecretCipher::decrypt`] pair
//! never classifies, and the guard functions are the only place the
//! heuristic lives.

use std::fmt;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// IV length for AES-256-CBC (one block).
const IV_LEN: usize = 16;

/// AES block size in bytes.
const BLOCK_LEN: usize = 16;

/// Separator between the hex-encoded IV and ciphertext in the envelope.
const ENVELOPE_DELIMITER: char = ':';

/// A 256-bit encryption key that is zeroized on drop.
///
/// Sourced from configuration at startup; a wrong-length key is a fatal
/// configuration error, never a per-call error. The inner bytes are never
/// exposed in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key from its configuration form.
    ///
    /// Accepts either a 64-character hex string or a raw 32-byte string.
    /// Hex wins when both interpretations are possible.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for any other length.
    pub fn parse(config: &str) -> Result<Self, CryptoError> {
        if config.len() == 64 {
            if let Ok(decoded) = hex::decode(config) {
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&decoded);
                return Ok(Self(bytes));
            }
        }
        let raw = config.as_bytes();
        if raw.len() == 32 {
            let mut bytes = [0u8; 32];
            bytes.copy_from_slice(raw);
            return Ok(Self(bytes));
        }
        Err(CryptoError::InvalidKeyLength { actual: raw.len() })
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// Use with care — the caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The secret codec: field-level encrypt/decrypt for stored secrets.
pub struct SecretCipher {
    key: EncryptionKey,
}

impl SecretCipher {
    /// Create a codec with the given key.
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Encrypt a plaintext secret into its stored envelope form.
    ///
    /// Generates a fresh random IV per call, so two encryptions of the same
    /// plaintext produce different envelopes.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(self.key.as_bytes().into(), (&iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        format!(
            "{}{}{}",
            hex::encode(iv),
            ENVELOPE_DELIMITER,
            hex::encode(ciphertext)
        )
    }

    /// Decrypt a stored envelope back to the plaintext secret.
    ///
    /// # Errors
    ///
    /// Returns a decode-class [`CryptoError`] when the envelope is missing
    /// its delimiter, a segment is not valid hex, the IV has the wrong
    /// length, the ciphertext is truncated or was produced under a different
    /// key, or the plaintext is not UTF-8.
    pub fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let (iv_hex, ct_hex) = envelope
            .split_once(ENVELOPE_DELIMITER)
            .ok_or(CryptoError::MissingDelimiter)?;

        let iv = hex::decode(iv_hex).map_err(|e| CryptoError::InvalidHex {
            reason: e.to_string(),
        })?;
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidIvLength { actual: v.len() })?;

        let ciphertext = hex::decode(ct_hex).map_err(|e| CryptoError::InvalidHex {
            reason: e.to_string(),
        })?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::Decryption {
                reason: format!("ciphertext length {} is not a positive multiple of the block size", ciphertext.len()),
            });
        }

        let plaintext = Aes256CbcDec::new(self.key.as_bytes().into(), (&iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Decryption {
                reason: "bad padding (corrupted data or wrong key)".to_owned(),
            })?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::NotUtf8)
    }

    /// Classify a stored value as "already encrypted".
    ///
    /// The heuristic is presence of the envelope delimiter. A plaintext
    /// containing `:` is misclassified — callers that control the plaintext
    /// alphabet are unaffected; everything else goes through the guard
    /// functions below so the misclassification is at least contained.
    #[must_use]
    pub fn is_encrypted(value: &str) -> bool {
        value.contains(ENVELOPE_DELIMITER)
    }

    /// Encrypt a value unless it is already in envelope form.
    ///
    /// Prevents double-encryption when callers hand back a stored value
    /// unchanged (the bulk-replace save pattern does exactly this).
    #[must_use]
    pub fn encrypt_if_plain(&self, value: &str) -> String {
        if Self::is_encrypted(value) {
            value.to_owned()
        } else {
            self.encrypt(value)
        }
    }

    /// Decrypt a stored value, falling back to the raw stored form.
    ///
    /// Values without the delimiter are returned as-is (classified as
    /// plaintext). Values with the delimiter that fail to decode are also
    /// returned as-is, with a warning — one undecryptable record must never
    /// abort a whole batch read.
    #[must_use]
    pub fn decrypt_or_raw(&self, value: &str) -> String {
        if !Self::is_encrypted(value) {
            return value.to_owned();
        }
        match self.decrypt(value) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                tracing::warn!(error = %err, "stored secret failed to decrypt, surfacing raw value");
                value.to_owned()
            }
        }
    }
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::new(EncryptionKey::generate())
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let c = cipher();
        let envelope = c.encrypt("s3cr3t");
        assert_eq!(c.decrypt(&envelope).unwrap(), "s3cr3t");
    }

    #[test]
    fn roundtrip_full_character_set() {
        let c = cipher();
        let plaintext = "pä55wörd — 密码 🔑 \\ \" \n tab\t";
        let envelope = c.encrypt(plaintext);
        assert_eq!(c.decrypt(&envelope).unwrap(), plaintext);
    }

    #[test]
    fn roundtrip_empty_string() {
        let c = cipher();
        let envelope = c.encrypt("");
        assert_eq!(c.decrypt(&envelope).unwrap(), "");
    }

    #[test]
    fn envelope_is_delimited_hex() {
        let c = cipher();
        let envelope = c.encrypt("value");
        let (iv_hex, ct_hex) = envelope.split_once(':').unwrap();
        assert_eq!(iv_hex.len(), 32);
        assert!(ct_hex.len() >= 32);
        assert!(iv_hex.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert!(ct_hex.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn stored_form_differs_from_plaintext() {
        let c = cipher();
        let envelope = c.encrypt("s3cr3t");
        assert_ne!(envelope, "s3cr3t");
    }

    #[test]
    fn two_encryptions_produce_different_envelopes() {
        let c = cipher();
        // Fresh IV per call.
        assert_ne!(c.encrypt("same"), c.encrypt("same"));
    }

    #[test]
    fn decrypt_missing_delimiter_fails() {
        let c = cipher();
        let result = c.decrypt("no delimiter here");
        assert!(matches!(result, Err(CryptoError::MissingDelimiter)));
    }

    #[test]
    fn decrypt_bad_hex_fails() {
        let c = cipher();
        let result = c.decrypt("zzzz:zzzz");
        assert!(matches!(result, Err(CryptoError::InvalidHex { .. })));
    }

    #[test]
    fn decrypt_wrong_iv_length_fails() {
        let c = cipher();
        let result = c.decrypt("aabb:00112233445566778899aabbccddeeff");
        assert!(matches!(
            result,
            Err(CryptoError::InvalidIvLength { actual: 2 })
        ));
    }

    #[test]
    fn decrypt_truncated_ciphertext_fails() {
        let c = cipher();
        let envelope = c.encrypt("some secret value");
        // Chop one hex pair off the ciphertext so it is no longer a block
        // multiple.
        let truncated = &envelope[..envelope.len() - 2];
        assert!(matches!(
            c.decrypt(truncated),
            Err(CryptoError::Decryption { .. })
        ));
    }

    #[test]
    fn is_encrypted_heuristic() {
        let c = cipher();
        assert!(SecretCipher::is_encrypted(&c.encrypt("x")));
        assert!(!SecretCipher::is_encrypted("plain"));
        // The documented fragility: plaintext containing the delimiter is
        // misclassified as already encrypted.
        assert!(SecretCipher::is_encrypted("plain:with:colons"));
    }

    #[test]
    fn encrypt_if_plain_never_double_encrypts() {
        let c = cipher();
        let envelope = c.encrypt("s3cr3t");
        let again = c.encrypt_if_plain(&envelope);
        assert_eq!(again, envelope);
        assert_eq!(c.decrypt(&again).unwrap(), "s3cr3t");
    }

    #[test]
    fn decrypt_or_raw_passes_plaintext_through() {
        let c = cipher();
        assert_eq!(c.decrypt_or_raw("plain"), "plain");
    }

    #[test]
    fn decrypt_or_raw_surfaces_undecryptable_value() {
        let c = cipher();
        // Delimiter present but not a valid envelope: the raw stored value
        // comes back instead of an error.
        assert_eq!(c.decrypt_or_raw("plain:with:colons"), "plain:with:colons");
    }

    #[test]
    fn parse_raw_32_byte_key() {
        let key = EncryptionKey::parse("12345678901234567890123456789012").unwrap();
        assert_eq!(key.as_bytes().len(), 32);
    }

    #[test]
    fn parse_hex_64_char_key() {
        let hex_key = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";
        let key = EncryptionKey::parse(hex_key).unwrap();
        assert_eq!(key.as_bytes()[0], 0x00);
        assert_eq!(key.as_bytes()[1], 0x11);
    }

    #[test]
    fn parse_wrong_length_key_fails() {
        let result = EncryptionKey::parse("too short");
        assert!(matches!(
            result,
            Err(CryptoError::InvalidKeyLength { actual: 9 })
        ));
    }

    #[test]
    fn hex_and_raw_keys_interoperate() {
        // The same 32 bytes, provided raw and as hex, must decrypt each
        // other's output.
        let raw = "12345678901234567890123456789012";
        let hex_form = hex::encode(raw.as_bytes());
        let c1 = SecretCipher::new(EncryptionKey::parse(raw).unwrap());
        let c2 = SecretCipher::new(EncryptionKey::parse(&hex_form).unwrap());
        let envelope = c1.encrypt("shared");
        assert_eq!(c2.decrypt(&envelope).unwrap(), "shared");
    }

    #[test]
    fn encryption_key_debug_redacts_bytes() {
        let key = EncryptionKey::generate();
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
    }
}
