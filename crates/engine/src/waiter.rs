use crate::error::ScenarioError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

/// Polls `condition` until it reports `true`, a hard error, or `timeout` passes.
///
/// The condition is checked before the deadline, so a condition that already
/// holds succeeds without sleeping. Polls are spaced by a constant `interval`,
/// except that the last sleep is cut short at the deadline. A poll still
/// running at the deadline is dropped, so the wait never outlasts `timeout`.
pub async fn wait_until<F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    mut condition: F,
) -> Result<(), ScenarioError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ScenarioError>>,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempts: u32 = 0;

    let timed_out = |attempts: u32| {
        tracing::warn!(what, attempts, "condition not met before deadline");
        ScenarioError::Timeout {
            what: what.to_string(),
            after: started.elapsed(),
        }
    };

    loop {
        attempts += 1;
        let met = match timeout_at(deadline, condition()).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out(attempts)),
        };
        if met {
            tracing::debug!(what, attempts, elapsed = ?started.elapsed(), "condition met");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out(attempts));
        }
        tracing::trace!(what, attempts, "condition not met yet");
        sleep(interval.min(deadline - now)).await;
    }
}
