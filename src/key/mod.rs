//! Lazily decoded host keys.
//!
//! Scanning a known_hosts file only splits lines; the base64 key blob of a
//! line is kept as text until a verifier actually asks for the key. The
//! first successful [`HostKeyEntry::resolve`] decodes and memoizes it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use ssh_key::PublicKey;
use thiserror::Error;

/// Errors from decoding a host key blob
#[derive(Debug, Error)]
pub enum KeyDecodeError {
    #[error("invalid base64 key data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid SSH key blob: {0}")]
    Blob(#[from] ssh_key::Error),

    #[error("key type mismatch: line says {expected}, blob contains {actual}")]
    AlgorithmMismatch { expected: String, actual: String },
}

/// Result type for key decoding
pub type HostKeyDecodeResult<T> = Result<T, KeyDecodeError>;

enum KeyState {
    Unresolved(String),
    Resolved(Arc<PublicKey>),
}

/// One public key recorded in a known_hosts file.
///
/// A line listing several hosts produces a single entry shared (via `Arc`)
/// by every host it names.
pub struct HostKeyEntry {
    key_type: String,
    state: Mutex<KeyState>,
    decodes: AtomicUsize,
}

impl HostKeyEntry {
    /// Wrap the key type token and base64 blob of a known_hosts line.
    pub fn new(key_type: impl Into<String>, key_data: impl Into<String>) -> Self {
        Self {
            key_type: key_type.into(),
            state: Mutex::new(KeyState::Unresolved(key_data.into())),
            decodes: AtomicUsize::new(0),
        }
    }

    /// Key type token from the known_hosts line (e.g. `ssh-ed25519`).
    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    /// Decode the key, or return the already decoded key.
    ///
    /// Failures are not memoized: a later call decodes again.
    pub fn resolve(&self) -> HostKeyDecodeResult<Arc<PublicKey>> {
        let mut state = self.state.lock();
        let encoded = match &*state {
            KeyState::Resolved(key) => return Ok(Arc::clone(key)),
            KeyState::Unresolved(encoded) => encoded,
        };

        self.decodes.fetch_add(1, Ordering::Relaxed);
        let key = Arc::new(decode_blob(&self.key_type, encoded)?);
        *state = KeyState::Resolved(Arc::clone(&key));
        Ok(key)
    }

    /// Whether a decode has succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), KeyState::Resolved(_))
    }

    /// Number of decode attempts made so far.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for HostKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostKeyEntry")
            .field("key_type", &self.key_type)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

fn decode_blob(key_type: &str, encoded: &str) -> HostKeyDecodeResult<PublicKey> {
    let blob = STANDARD.decode(encoded.trim())?;
    let key = PublicKey::from_bytes(&blob)?;

    let actual = key.algorithm().to_string();
    if actual != key_type {
        return Err(KeyDecodeError::AlgorithmMismatch {
            expected: key_type.to_string(),
            actual,
        });
    }
    Ok(key)
}
