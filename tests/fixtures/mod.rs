//! Shared known_hosts fixtures for integration tests
//!
//! - `known_hosts/mixed`: comments, blank and junk lines, a marker line, a
//!   multi-host RSA line and two hashed entries
//! - `known_hosts/config.toml`: config that points at `mixed` only

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

pub const ED_A: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIHsKyOxRUVMjoOidnqfTRQtlPP5f6Cs6lwlI/v8hbyDB";
pub const ED_B: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIN5P01zdfmKtKiIxeu6/vcB4WY3yg2vNTZ1fzpwnoe+o";
pub const ECDSA_P256: &str = "AAAAE2VjZHNhLXNoYTItbmlzdHAyNTYAAAAIbmlzdHAyNTYAAABBBLgKI8z4cJOY14I9A/MAM0z9DMO5DBkqaGBBBGu3+0GYQyKFy0sUS27pwbYVsLmXE4M5JaaCrx4pVcav72QL1Gs=";
pub const RSA_1024: &str = "AAAAB3NzaC1yc2EAAAADAQABAAAAgQDm6onixCdgIWuaQGLR7PgHMvkMGAbxdcfAUgcMo04h9CzY4aZrjN7xSWvqWd+bRdZL1wSgaX32fMSuDdyFADW+TuEVM2wIZFz8FzhPYY+0cDYmdZVmGdfUHhNuCzlAPusSMZDjU4DvxFiWsxpGIXFbypgC00VFnIuIv7VEfxDapw==";

/// `10.0.0.1` hashed with salt "saltsaltsaltsaltsalt"
pub const HASHED_10_0_0_1: &str = "|1|c2FsdHNhbHRzYWx0c2FsdHNhbHQ=|DKCd2aZ6N8wHVulOBaAUxyEqlEE=";
/// `example.com` hashed with salt "0123456789abcdefghij"
pub const HASHED_EXAMPLE_COM: &str = "|1|MDEyMzQ1Njc4OWFiY2RlZmdoaWo=|jaHXoMQTU/+rEgquOJTQzPGCF4I=";

/// Lines in `known_hosts/mixed`, blank and skipped lines included
pub const MIXED_LINE_COUNT: usize = 9;

pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/known_hosts")
}

pub fn mixed_known_hosts_path() -> PathBuf {
    fixture_dir().join("mixed")
}

pub fn config_path() -> PathBuf {
    fixture_dir().join("config.toml")
}

/// Write `content` to a fresh temporary known_hosts file.
pub fn hosts_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn ed25519_line(hosts: &str, key: &str) -> String {
    format!("{} ssh-ed25519 {}\n", hosts, key)
}
