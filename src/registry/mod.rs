//! Known hosts registry
//!
//! Owns one [`FileScanner`] per configured known_hosts file and answers
//! "which keys are on record for this host" across all of them. This is the
//! secure strategy only: an unknown host yields no keys, and adding keys is
//! refused. Provisioning happens out of band.
//!
//! Meant to be created once and shared (e.g. behind an `Arc`) by everything
//! that verifies host keys, then closed explicitly to release file handles.

mod host_keys;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ssh_key::PublicKey;
use thiserror::Error;
use tracing::debug;

use crate::config::{KnownHostsConfig, Scope};
use crate::key::HostKeyEntry;
use crate::scanner::{FileScanner, ScanError};

pub use host_keys::HostKeys;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{0}")]
    Unsupported(&'static str),
}

const ADD_UNSUPPORTED: &str =
    "adding host keys is not supported; known_hosts files must be managed out of band";

/// Ordered set of known_hosts scanners (global files first).
#[derive(Debug)]
pub struct KnownHostsRegistry {
    scanners: Vec<FileScanner>,
}

impl KnownHostsRegistry {
    /// Build a registry for the files `config` selects under `scope`.
    ///
    /// No file is opened here.
    pub fn new(config: &KnownHostsConfig, scope: Scope) -> Self {
        Self::from_paths(config.files_for(scope))
    }

    /// Build a registry over explicit paths, consulted in the given order.
    pub fn from_paths<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Self {
        let scanners: Vec<FileScanner> = paths.into_iter().map(FileScanner::new).collect();
        debug!(files = scanners.len(), "known hosts registry created");
        Self { scanners }
    }

    /// One-shot lookup: build, search, close.
    ///
    /// Re-reads every file from the top on each call. For tests and tools
    /// doing a single lookup; long-lived callers share one registry instead.
    pub fn lookup_once(
        config: &KnownHostsConfig,
        scope: Scope,
        host: &str,
        aliases: &[&str],
    ) -> Result<Vec<Arc<HostKeyEntry>>, RegistryError> {
        let registry = Self::new(config, scope);
        let result = registry.search(host, aliases);
        registry.close();
        result
    }

    /// All keys on record for `host`, across every file in order.
    ///
    /// `aliases` are the names the host may be recorded under (for example
    /// `name` and `[name]:port`). When empty, `host` itself is split on `,`.
    /// The caller decides whether the returned keys accept a handshake.
    pub fn search(
        &self,
        host: &str,
        aliases: &[&str],
    ) -> Result<Vec<Arc<HostKeyEntry>>, RegistryError> {
        let split: Vec<&str>;
        let candidates = if aliases.is_empty() {
            split = host.split(',').filter(|h| !h.is_empty()).collect();
            &split[..]
        } else {
            aliases
        };

        let mut keys = Vec::new();
        for scanner in &self.scanners {
            keys.extend(scanner.keys_for(candidates)?);
        }
        debug!(host, keys = keys.len(), "known hosts search");
        Ok(keys)
    }

    /// Like [`search`](Self::search), wrapped for a handshake verifier.
    pub fn search_for(&self, host: &str, aliases: &[&str]) -> Result<HostKeys<'_>, RegistryError> {
        let keys = self.search(host, aliases)?;
        Ok(HostKeys::new(host, keys, self))
    }

    /// Always fails: keys are never added by the verification path.
    pub fn add(&self, _host: &str, _key: &PublicKey) -> Result<(), RegistryError> {
        Err(RegistryError::Unsupported(ADD_UNSUPPORTED))
    }

    /// Close every scanner, releasing file handles. Idempotent.
    ///
    /// Later searches fail with [`ScanError::Closed`].
    pub fn close(&self) {
        for scanner in &self.scanners {
            scanner.close();
        }
    }

    /// Configured files in consultation order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.scanners.iter().map(|s| s.path().to_path_buf()).collect()
    }

    pub fn scanners(&self) -> &[FileScanner] {
        &self.scanners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const ED_A: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIHsKyOxRUVMjoOidnqfTRQtlPP5f6Cs6lwlI/v8hbyDB";
    const ED_B: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIN5P01zdfmKtKiIxeu6/vcB4WY3yg2vNTZ1fzpwnoe+o";

    fn hosts_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_global_results_before_user() {
        let global = hosts_file(&format!("alpha ssh-ed25519 {ED_A}\n"));
        let user = hosts_file(&format!("alpha ssh-ed25519 {ED_B}\n"));
        let config = KnownHostsConfig {
            global_known_hosts_files: Some(vec![global.path().display().to_string()]),
            user_known_hosts_files: Some(vec![user.path().display().to_string()]),
            ..Default::default()
        };

        let registry = KnownHostsRegistry::new(&config, Scope::All);
        let keys = registry.search("alpha", &["alpha"]).unwrap();
        assert_eq!(keys.len(), 2);
        let global_key = keys[0].resolve().unwrap();
        let user_key = keys[1].resolve().unwrap();
        assert_ne!(global_key.key_data(), user_key.key_data());
        assert_eq!(registry.paths(), vec![global.path().to_path_buf(), user.path().to_path_buf()]);

        let user_only = KnownHostsRegistry::new(&config, Scope::User);
        let keys = user_only.search("alpha", &[]).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].resolve().unwrap().key_data(), user_key.key_data());
    }

    #[test]
    fn test_host_string_split_when_no_aliases() {
        let file = hosts_file(&format!("alpha,10.0.0.9 ssh-ed25519 {ED_A}\n"));
        let registry = KnownHostsRegistry::from_paths([file.path()]);

        assert_eq!(registry.search("alpha,10.0.0.9", &[]).unwrap().len(), 1);
        assert_eq!(registry.scanners()[0].stats().lines_read, 1);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let file = hosts_file(&format!("alpha ssh-ed25519 {ED_A}\n"));
        let registry = KnownHostsRegistry::from_paths([
            dir.path().join("absent"),
            file.path().to_path_buf(),
        ]);

        assert_eq!(registry.search("alpha", &[]).unwrap().len(), 1);
        assert_eq!(registry.scanners()[0].stats().open_attempts, 0);
    }

    #[test]
    fn test_unknown_host_returns_empty() {
        let file = hosts_file(&format!("alpha ssh-ed25519 {ED_A}\n"));
        let registry = KnownHostsRegistry::from_paths([file.path()]);
        assert!(registry.search("beta", &["beta"]).unwrap().is_empty());
    }

    #[test]
    fn test_add_is_unsupported() {
        let registry = KnownHostsRegistry::from_paths(Vec::<PathBuf>::new());
        let key = PublicKey::from_openssh(&format!("ssh-ed25519 {ED_A}")).unwrap();

        assert!(matches!(
            registry.add("alpha", &key),
            Err(RegistryError::Unsupported(_))
        ));
        assert!(matches!(
            registry.add("", &key),
            Err(RegistryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent_and_final() {
        let dir = TempDir::new().unwrap();
        let file = hosts_file(&format!("alpha ssh-ed25519 {ED_A}\n"));
        let registry = KnownHostsRegistry::from_paths([
            file.path().to_path_buf(),
            dir.path().join("never-opened"),
        ]);
        registry.search("alpha", &[]).unwrap();

        registry.close();
        registry.close();

        assert!(registry.scanners().iter().all(|s| s.is_closed()));
        assert!(matches!(
            registry.search("alpha", &[]),
            Err(RegistryError::Scan(ScanError::Closed { .. }))
        ));
        assert_eq!(registry.scanners()[0].stats().open_attempts, 1);
    }

    #[test]
    fn test_lookup_once() {
        let file = hosts_file(&format!("alpha ssh-ed25519 {ED_A}\n"));
        let config = KnownHostsConfig {
            global_known_hosts_files: Some(vec![]),
            user_known_hosts_files: Some(vec![file.path().display().to_string()]),
            ..Default::default()
        };

        let keys = KnownHostsRegistry::lookup_once(&config, Scope::All, "alpha", &[]).unwrap();
        assert_eq!(keys.len(), 1);
        // Entries stay usable after the registry is gone.
        assert!(keys[0].resolve().is_ok());
    }
}
