//! OpenSSH known_hosts line format.
//!
//! Pure parsing for known_hosts files: splitting a line into its host
//! patterns, key type and key data, and matching hashed (`|1|salt|hmac`)
//! host patterns against candidate host names. No file I/O happens here.

mod hashed;
mod line;

pub use hashed::{match_hashed, HashedHost, HASH_MAGIC};
pub use line::{parse_line, HostLine, LineSkip};

/// SSH public key type identifiers accepted in known_hosts lines.
///
/// Lines naming any other type are skipped, not rejected.
pub const SUPPORTED_KEY_TYPES: &[&str] = &[
    "ssh-rsa",
    "ssh-dss",
    "ssh-ed25519",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

/// Whether `key_type` is one of [`SUPPORTED_KEY_TYPES`].
pub fn is_supported_key_type(key_type: &str) -> bool {
    SUPPORTED_KEY_TYPES.contains(&key_type)
}
