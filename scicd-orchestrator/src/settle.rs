//! Waiting for deleted objects to disappear
//!
//! The cluster removes objects asynchronously. Reusing a name right after a
//! delete can fail or bind to the old object, so the orchestrator polls until
//! the name is free before creating again.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cluster::ClusterError;
use crate::error::{OrchestrationError, Result};

/// How long and how often to poll for a deleted object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlePolicy {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay before the second lookup
    pub initial_delay: Duration,
    /// Upper bound for the doubling delay
    pub max_delay: Duration,
}

impl SettlePolicy {
    /// Creates a policy with the default backoff bounds
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Polls `is_present` until it reports the object gone
///
/// `is_present` returns `true` while the object still exists. Lookup errors end
/// the wait immediately.
pub async fn wait_until_absent<F, Fut>(
    policy: &SettlePolicy,
    kind: &'static str,
    name: &str,
    mut is_present: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, ClusterError>>,
{
    let started = Instant::now();
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        if !is_present().await? {
            if attempt > 1 {
                info!(
                    "{} '{}' gone after {} lookup(s) ({:?})",
                    kind,
                    name,
                    attempt,
                    started.elapsed()
                );
            }
            return Ok(());
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return Err(OrchestrationError::SettleTimeout {
                kind,
                name: name.to_string(),
                waited: elapsed,
            });
        }

        let sleep_for = delay.min(policy.timeout - elapsed);
        debug!(
            "{} '{}' still terminating (attempt {}), checking again in {:?}",
            kind, name, attempt, sleep_for
        );
        tokio::time::sleep(sleep_for).await;

        delay = (delay * 2).min(policy.max_delay);
    }
}
