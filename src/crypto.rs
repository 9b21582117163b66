//! Refresh-token envelopes.
//!
//! Refresh tokens leave the server only inside an envelope the client cannot read or forge:
//!
//! ```text
//! base64url( version (1) || salt (16) || nonce (12) || AES-256-GCM ciphertext + tag )
//! ```
//!
//! The AES key is derived per envelope with HKDF-SHA256 from the configured secret and the
//! random salt, and the version byte is bound as associated data. Fresh salt and nonce make two
//! envelopes of the same token differ; the layout carries everything needed to open them.

// crates.io
use aes_gcm::{
	Aes256Gcm, Key, Nonce,
	aead::{Aead, KeyInit, Payload},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

const ENVELOPE_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const HEADER_LEN: usize = 1 + SALT_LEN + NONCE_LEN;
const MIN_ENVELOPE_LEN: usize = HEADER_LEN + TAG_LEN;
const HKDF_INFO: &[u8] = b"spotify-token-broker/refresh-token/v1";

/// Failures raised while opening an envelope. Never carries partial plaintext.
#[derive(Debug, ThisError)]
pub enum DecryptionError {
	/// Envelope is not valid unpadded base64url.
	#[error("Encrypted token is not valid base64.")]
	Encoding(#[from] base64::DecodeError),
	/// Envelope was produced by an unknown layout.
	#[error("Encrypted token uses unsupported envelope version {version}.")]
	UnsupportedVersion {
		/// Version byte found in the envelope.
		version: u8,
	},
	/// Envelope is shorter than the fixed header plus tag.
	#[error("Encrypted token is truncated ({len} bytes).")]
	Truncated {
		/// Decoded length.
		len: usize,
	},
	/// Wrong secret or tampered envelope.
	#[error("Encrypted token failed authentication.")]
	Authentication,
	/// Authenticated plaintext is not UTF-8.
	#[error("Decrypted token is not valid UTF-8.")]
	Utf8(#[from] std::string::FromUtf8Error),
}

/// Sealing failed inside the cipher.
#[derive(Debug, ThisError)]
#[error("Token could not be encrypted.")]
pub struct EncryptionError;

/// Cipher bound to the process-wide encryption secret.
#[derive(Clone)]
pub struct TokenCipher {
	secret: TokenSecret,
}
impl TokenCipher {
	/// Creates a cipher for `secret`; empty secrets are rejected.
	pub fn new(secret: TokenSecret) -> Result<Self, ConfigError> {
		if secret.is_blank() {
			return Err(ConfigError::EmptyValue { key: "encryption_secret" });
		}

		Ok(Self { secret })
	}

	/// Seals `plaintext` into a fresh envelope.
	pub fn seal(&self, plaintext: &str) -> Result<String, EncryptionError> {
		encrypt(plaintext, self.secret.expose())
	}

	/// Opens an envelope produced by [`TokenCipher::seal`] with the same secret.
	pub fn open(&self, envelope: &str) -> Result<TokenSecret, DecryptionError> {
		decrypt(envelope, self.secret.expose()).map(TokenSecret::new)
	}
}
impl Debug for TokenCipher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenCipher(..)")
	}
}

/// Encrypts `plaintext` with a key derived from `secret`.
pub fn encrypt(plaintext: &str, secret: &str) -> Result<String, EncryptionError> {
	let mut header = [0_u8; HEADER_LEN];

	header[0] = ENVELOPE_VERSION;
	rand::rng().fill_bytes(&mut header[1..]);

	let (salt, nonce) = header[1..].split_at(SALT_LEN);
	let cipher = derive_cipher(secret, salt).ok_or(EncryptionError)?;
	let sealed = cipher
		.encrypt(
			Nonce::from_slice(nonce),
			Payload { msg: plaintext.as_bytes(), aad: &[ENVELOPE_VERSION] },
		)
		.map_err(|_| EncryptionError)?;
	let mut envelope = Vec::with_capacity(HEADER_LEN + sealed.len());

	envelope.extend_from_slice(&header);
	envelope.extend_from_slice(&sealed);

	Ok(URL_SAFE_NO_PAD.encode(envelope))
}

/// Decrypts an envelope produced by [`encrypt`] with the same `secret`.
pub fn decrypt(envelope: &str, secret: &str) -> Result<String, DecryptionError> {
	let raw = URL_SAFE_NO_PAD.decode(envelope.trim())?;

	if raw.len() < MIN_ENVELOPE_LEN {
		return Err(DecryptionError::Truncated { len: raw.len() });
	}
	if raw[0] != ENVELOPE_VERSION {
		return Err(DecryptionError::UnsupportedVersion { version: raw[0] });
	}

	let (salt, rest) = raw[1..].split_at(SALT_LEN);
	let (nonce, sealed) = rest.split_at(NONCE_LEN);
	let cipher = derive_cipher(secret, salt).ok_or(DecryptionError::Authentication)?;
	let plaintext = cipher
		.decrypt(Nonce::from_slice(nonce), Payload { msg: sealed, aad: &[ENVELOPE_VERSION] })
		.map_err(|_| DecryptionError::Authentication)?;

	Ok(String::from_utf8(plaintext)?)
}

fn derive_cipher(secret: &str, salt: &[u8]) -> Option<Aes256Gcm> {
	let mut okm = [0_u8; KEY_LEN];

	Hkdf::<Sha256>::new(Some(salt), secret.as_bytes()).expand(HKDF_INFO, &mut okm).ok()?;

	Some(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&okm)))
}
