//! known_hosts line parser.
//!
//! A usable line has the shape `hostpattern[,hostpattern...] keytype base64key [comment]`.
//! Everything else is reported as a [`LineSkip`] so the caller can move on to
//! the next line.

use std::fmt;

use crate::hashed::HashedHost;
use crate::is_supported_key_type;

/// One parsed known_hosts line, borrowing from the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLine<'a> {
    /// Comma-separated host patterns from the first field.
    pub hosts: Vec<&'a str>,
    /// Key type token (always one of the supported types).
    pub key_type: &'a str,
    /// Base64 key blob. A trailing comment is not included.
    pub key_data: &'a str,
}

impl<'a> HostLine<'a> {
    /// The hashed host token, when it is the only host pattern on the line.
    ///
    /// A hashed token mixed with plain names is not treated as hashed.
    pub fn hashed_token(&self) -> Option<&'a str> {
        match self.hosts.as_slice() {
            [only] if HashedHost::is_hashed(only) => Some(only),
            _ => None,
        }
    }

    /// Whether every candidate appears verbatim among the host patterns.
    pub fn lists_all<S: AsRef<str>>(&self, candidates: &[S]) -> bool {
        candidates
            .iter()
            .all(|c| self.hosts.contains(&c.as_ref()))
    }
}

/// Why a line produced no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSkip {
    /// Empty or whitespace-only line.
    Blank,
    /// First non-whitespace character is `#`.
    Comment,
    /// Missing fields or an empty host list.
    Malformed,
    /// Key type is not in the supported set (this includes `@marker` lines).
    UnsupportedKeyType(String),
}

impl fmt::Display for LineSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSkip::Blank => write!(f, "blank line"),
            LineSkip::Comment => write!(f, "comment"),
            LineSkip::Malformed => write!(f, "malformed line"),
            LineSkip::UnsupportedKeyType(t) => write!(f, "unsupported key type '{}'", t),
        }
    }
}

/// Parse a single known_hosts line.
pub fn parse_line(line: &str) -> Result<HostLine<'_>, LineSkip> {
    let line = line.trim_start();
    if line.trim_end().is_empty() {
        return Err(LineSkip::Blank);
    }
    if line.starts_with('#') {
        return Err(LineSkip::Comment);
    }

    let mut fields = line.split_whitespace();
    let host_field = fields.next().ok_or(LineSkip::Malformed)?;
    let key_type = fields.next().ok_or(LineSkip::Malformed)?;
    if !is_supported_key_type(key_type) {
        return Err(LineSkip::UnsupportedKeyType(key_type.to_string()));
    }
    let key_data = fields.next().ok_or(LineSkip::Malformed)?;

    let hosts: Vec<&str> = host_field.split(',').filter(|h| !h.is_empty()).collect();
    if hosts.is_empty() {
        return Err(LineSkip::Malformed);
    }

    Ok(HostLine {
        hosts,
        key_type,
        key_data,
    })
}
