//! Built-in defaults
//!
//! The same file locations OpenSSH consults when nothing is configured.

/// System-wide known_hosts files
pub const DEFAULT_GLOBAL_FILES: &[&str] = &["/etc/ssh/ssh_known_hosts", "/etc/ssh/ssh_known_hosts2"];

/// Per-user known_hosts files
pub const DEFAULT_USER_FILES: &[&str] = &["~/.ssh/known_hosts", "~/.ssh/known_hosts2"];

/// Lookup budget in seconds (default: 10)
pub const DEFAULT_LOOKUP_TIMEOUT_SECONDS: u64 = 10;

/// Config file location relative to the home directory
pub const CONFIG_RELATIVE_PATH: &str = ".config/strict-hosts/config.toml";
