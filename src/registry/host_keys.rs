//! Lookup result handed to a handshake verifier.

use std::sync::Arc;

use ssh_key::PublicKey;

use super::{KnownHostsRegistry, RegistryError};
use crate::key::{HostKeyDecodeResult, HostKeyEntry};

/// Keys on record for one host, still lazily decoded.
#[derive(Debug)]
pub struct HostKeys<'r> {
    host: String,
    keys: Vec<Arc<HostKeyEntry>>,
    registry: &'r KnownHostsRegistry,
}

impl<'r> HostKeys<'r> {
    pub(super) fn new(
        host: &str,
        keys: Vec<Arc<HostKeyEntry>>,
        registry: &'r KnownHostsRegistry,
    ) -> Self {
        Self {
            host: host.to_string(),
            keys,
            registry,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HostKeyEntry>> {
        self.keys.iter()
    }

    /// Decode every key. Stops at the first entry that fails to decode.
    pub fn resolve_all(&self) -> HostKeyDecodeResult<Vec<Arc<PublicKey>>> {
        self.keys.iter().map(|k| k.resolve()).collect()
    }

    /// Whether `offered` is among the recorded keys.
    ///
    /// Only entries with the offered key's type are decoded. A decode error
    /// on one of those fails the check instead of being skipped.
    pub fn contains(&self, offered: &PublicKey) -> HostKeyDecodeResult<bool> {
        let algorithm = offered.algorithm().to_string();
        for entry in self.keys.iter().filter(|k| k.key_type() == algorithm) {
            if entry.resolve()?.key_data() == offered.key_data() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Always fails, like [`KnownHostsRegistry::add`].
    pub fn add_host_key(&self, key: &PublicKey) -> Result<(), RegistryError> {
        self.registry.add(&self.host, key)
    }
}
