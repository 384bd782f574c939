//! In-memory host → keys index for one known_hosts file.

use std::collections::HashMap;
use std::sync::Arc;

use strict_hosts_format::HashedHost;

use crate::key::HostKeyEntry;

/// Keys seen so far, indexed by host pattern as written in the file.
///
/// Hashed patterns are indexed under the raw token and also remembered in
/// file order with their decoded salt, so later lookups can test them
/// without rescanning. Each candidate records how many of those tokens it
/// has already been tested against, so one host name costs at most one
/// HMAC per hashed line over the whole session.
#[derive(Default)]
pub(crate) struct HostIndex {
    by_host: HashMap<String, Vec<Arc<HostKeyEntry>>>,
    hashed: Vec<(String, HashedHost)>,
    // candidate -> no token in hashed[..n] matches it
    hashed_checked: HashMap<String, usize>,
}

impl HostIndex {
    /// Index `entry` under a plain host pattern.
    pub(crate) fn insert(&mut self, host: &str, entry: Arc<HostKeyEntry>) {
        self.by_host.entry(host.to_string()).or_default().push(entry);
    }

    /// Index `entry` under a hashed token that was the sole pattern of its line.
    pub(crate) fn insert_hashed(&mut self, token: &str, entry: Arc<HostKeyEntry>) {
        if !self.by_host.contains_key(token) {
            if let Some(hashed) = HashedHost::parse(token) {
                self.hashed.push((token.to_string(), hashed));
            }
        }
        self.insert(token, entry);
    }

    /// Keys for the first candidate that is indexed verbatim.
    pub(crate) fn literal(&self, candidates: &[&str]) -> Option<Vec<Arc<HostKeyEntry>>> {
        candidates
            .iter()
            .find_map(|c| self.by_host.get(*c))
            .cloned()
    }

    /// Keys for the first indexed hashed token (in file order) matching any
    /// candidate. Tokens a candidate was already tested against are skipped.
    pub(crate) fn hashed(&mut self, candidates: &[&str]) -> Option<Vec<Arc<HostKeyEntry>>> {
        if self.hashed.is_empty() {
            return None;
        }

        let mut first: Option<usize> = None;
        for candidate in candidates {
            let end = first.unwrap_or(self.hashed.len());
            let start = self.hashed_checked.get(*candidate).copied().unwrap_or(0);
            if start >= end {
                continue;
            }
            let found = self.hashed[start..end]
                .iter()
                .position(|(_, hashed)| hashed.matches(candidate))
                .map(|offset| start + offset);
            self.hashed_checked
                .insert(candidate.to_string(), found.unwrap_or(end));
            if found.is_some() {
                first = found;
            }
        }

        first
            .and_then(|i| self.by_host.get(&self.hashed[i].0))
            .cloned()
    }

    pub(crate) fn get(&self, host: &str) -> Option<Vec<Arc<HostKeyEntry>>> {
        self.by_host.get(host).cloned()
    }

    /// Literal hit first, then hashed.
    pub(crate) fn lookup(&mut self, candidates: &[&str]) -> Option<Vec<Arc<HostKeyEntry>>> {
        self.literal(candidates).or_else(|| self.hashed(candidates))
    }

    pub(crate) fn len(&self) -> usize {
        self.by_host.len()
    }

    pub(crate) fn clear(&mut self) {
        self.by_host.clear();
        self.hashed.clear();
        self.hashed_checked.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_COM: &str = "|1|MDEyMzQ1Njc4OWFiY2RlZmdoaWo=|jaHXoMQTU/+rEgquOJTQzPGCF4I=";
    const TEN_0_0_1: &str = "|1|c2FsdHNhbHRzYWx0c2FsdHNhbHQ=|DKCd2aZ6N8wHVulOBaAUxyEqlEE=";
    const OTHER_COM: &str = "|1|b3RoZXJzYWx0b3RoZXJzYWx0MTI=|ryineN7P7l50+QV9cOTaCzr/2WA=";

    fn entry() -> Arc<HostKeyEntry> {
        Arc::new(HostKeyEntry::new("ssh-ed25519", "AAAA"))
    }

    #[test]
    fn test_shared_entry_under_aliases() {
        let mut index = HostIndex::default();
        let key = entry();
        index.insert("a", Arc::clone(&key));
        index.insert("b", Arc::clone(&key));

        let a = index.literal(&["a"]).unwrap();
        let b = index.literal(&["b"]).unwrap();
        assert!(Arc::ptr_eq(&a[0], &b[0]));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_literal_prefers_first_candidate() {
        let mut index = HostIndex::default();
        index.insert("second", entry());
        index.insert("first", entry());
        index.insert("first", entry());

        assert_eq!(index.literal(&["first", "second"]).unwrap().len(), 2);
        assert_eq!(index.literal(&["missing", "second"]).unwrap().len(), 1);
        assert!(index.literal(&["missing"]).is_none());
    }

    #[test]
    fn test_hashed_lookup() {
        let mut index = HostIndex::default();
        index.insert_hashed(EXAMPLE_COM, entry());

        assert!(index.literal(&["example.com"]).is_none());
        assert_eq!(index.hashed(&["example.com"]).unwrap().len(), 1);
        assert_eq!(index.lookup(&["example.com"]).unwrap().len(), 1);
        assert!(index.lookup(&["other.com"]).is_none());
    }

    #[test]
    fn test_clear() {
        let mut index = HostIndex::default();
        index.insert("a", entry());
        index.insert_hashed(EXAMPLE_COM, entry());
        index.lookup(&["other.com"]);
        index.clear();
        assert_eq!(index.len(), 0);
        assert!(index.hashed_checked.is_empty());
        assert!(index.lookup(&["a", "example.com"]).is_none());
    }

    #[test]
    fn test_plain_insert_is_never_hashed() {
        let mut index = HostIndex::default();
        index.insert(EXAMPLE_COM, entry());
        assert!(index.hashed(&["example.com"]).is_none());
    }

    #[test]
    fn test_hashed_tokens_tested_once_per_candidate() {
        let mut index = HostIndex::default();
        index.insert_hashed(EXAMPLE_COM, entry());
        index.insert_hashed(TEN_0_0_1, entry());

        assert!(index.hashed(&["other.com"]).is_none());
        assert_eq!(index.hashed_checked["other.com"], 2);
        assert!(index.hashed(&["other.com"]).is_none());
        assert_eq!(index.hashed_checked["other.com"], 2);

        // Only tokens indexed since the last miss are tested.
        index.insert_hashed(OTHER_COM, entry());
        assert_eq!(index.hashed(&["other.com"]).unwrap().len(), 1);
        assert_eq!(index.hashed_checked["other.com"], 2);
    }

    #[test]
    fn test_hashed_returns_earliest_token_in_file_order() {
        let mut index = HostIndex::default();
        let example = entry();
        let ten = entry();
        index.insert_hashed(EXAMPLE_COM, Arc::clone(&example));
        index.insert_hashed(TEN_0_0_1, Arc::clone(&ten));

        assert!(Arc::ptr_eq(&index.hashed(&["10.0.0.1"]).unwrap()[0], &ten));
        let keys = index.hashed(&["10.0.0.1", "example.com"]).unwrap();
        assert!(Arc::ptr_eq(&keys[0], &example));
        // A repeated match is found again from the recorded position.
        assert!(Arc::ptr_eq(&index.hashed(&["10.0.0.1"]).unwrap()[0], &ten));
    }
}
