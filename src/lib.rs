//! strict-hosts - fail-closed SSH known_hosts lookups
//!
//! This crate answers "which host keys are on record for this host" from
//! OpenSSH known_hosts files, for verifiers that reject unknown hosts. Files
//! are scanned incrementally behind one open handle each, so repeated
//! lookups from a busy event loop cost as few blocking reads as possible.

pub mod config;
pub mod key;
pub mod registry;
pub mod scanner;
pub mod timeout;

pub use config::{ConfigError, KnownHostsConfig, Scope};
pub use key::{HostKeyEntry, KeyDecodeError};
pub use registry::{HostKeys, KnownHostsRegistry, RegistryError};
pub use scanner::{FileScanner, ScanError, ScanStats};
pub use timeout::{search_with_budget, LookupBudget, TimedLookupError};
