//! Lookup time budget
//!
//! A registry lookup blocks for as long as the scan to the matching line
//! takes. Callers that work against their own deadline (a handshake, a
//! reactor tick) run the lookup through [`search_with_budget`]:
//! - the whole registry call runs on a helper thread
//! - the caller waits at most the budget
//! - on expiry the scan is NOT cancelled; it runs to match-or-EOF in the
//!   background and whatever it indexed is there for the next lookup

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::config::DEFAULT_LOOKUP_TIMEOUT_SECONDS;
use crate::key::HostKeyEntry;
use crate::registry::{KnownHostsRegistry, RegistryError};

/// Upper bound accepted for a lookup budget, in seconds
pub const MAX_LOOKUP_TIMEOUT_SECONDS: u64 = 300;

/// Time allowed for one registry lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupBudget {
    /// Seconds to wait for the lookup (default: 10)
    pub timeout_seconds: u64,
}

impl Default for LookupBudget {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_LOOKUP_TIMEOUT_SECONDS,
        }
    }
}

impl LookupBudget {
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_seconds }
    }

    /// `timeout_seconds` must be in (0, 300]
    pub fn validate(&self) -> Result<(), BudgetValidationError> {
        if self.timeout_seconds == 0 || self.timeout_seconds > MAX_LOOKUP_TIMEOUT_SECONDS {
            return Err(BudgetValidationError::OutOfBounds {
                value: self.timeout_seconds,
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Budget validation errors
#[derive(Debug, thiserror::Error)]
pub enum BudgetValidationError {
    #[error("timeout_seconds must be in (0, 300], got {value}")]
    OutOfBounds { value: u64 },
}

/// Errors from a budgeted lookup
#[derive(Debug, thiserror::Error)]
pub enum TimedLookupError {
    #[error("known hosts lookup did not finish within {0:?}")]
    Elapsed(Duration),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to start lookup thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("lookup thread exited without a result")]
    Aborted,
}

/// Run [`KnownHostsRegistry::search`] with a time budget.
pub fn search_with_budget(
    registry: &Arc<KnownHostsRegistry>,
    host: &str,
    aliases: &[&str],
    budget: LookupBudget,
) -> Result<Vec<Arc<HostKeyEntry>>, TimedLookupError> {
    let (tx, rx) = mpsc::channel();
    let worker_registry = Arc::clone(registry);
    let worker_host = host.to_string();
    let worker_aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();

    thread::Builder::new()
        .name("known-hosts-lookup".to_string())
        .spawn(move || {
            let aliases: Vec<&str> = worker_aliases.iter().map(String::as_str).collect();
            // The receiver is gone if the caller already gave up.
            let _ = tx.send(worker_registry.search(&worker_host, &aliases));
        })
        .map_err(TimedLookupError::Spawn)?;

    match rx.recv_timeout(budget.duration()) {
        Ok(result) => Ok(result?),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                host,
                timeout_seconds = budget.timeout_seconds,
                "known hosts lookup exceeded its budget"
            );
            Err(TimedLookupError::Elapsed(budget.duration()))
        }
        Err(RecvTimeoutError::Disconnected) => Err(TimedLookupError::Aborted),
    }
}
