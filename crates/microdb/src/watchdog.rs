//! Soft and hard statement timeouts.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::warn;

use crate::config::ConnectorConfig;

/// Outcome of a watched statement.
#[derive(Debug)]
pub(crate) enum Watched<T> {
    /// The statement finished in time.
    Done(T),
    /// The hard timeout expired after the given time.
    Abandoned(Duration),
}

/// Awaits `work`, warning once past the soft timeout and giving up at the
/// hard timeout. The work future is dropped when abandoned.
pub(crate) async fn watch<F: Future>(config: &ConnectorConfig, what: &str, work: F) -> Watched<F::Output> {
    let started = Instant::now();
    tokio::pin!(work);

    let soft = config.soft_timeout.min(config.hard_timeout);
    if let Ok(output) = timeout(soft, &mut work).await {
        return Watched::Done(output);
    }
    warn!(
        statement = %what,
        elapsed = ?started.elapsed(),
        "Statement exceeded soft timeout"
    );

    let remaining = config.hard_timeout.saturating_sub(started.elapsed());
    match timeout(remaining, &mut work).await {
        Ok(output) => Watched::Done(output),
        Err(_) => Watched::Abandoned(started.elapsed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(soft_ms: u64, hard_ms: u64) -> ConnectorConfig {
        ConnectorConfig::default()
            .statement_timeouts(Duration::from_millis(soft_ms), Duration::from_millis(hard_ms))
    }

    #[tokio::test]
    async fn test_fast_work_is_done() {
        let out = watch(&config(50, 100), "fast", async { 7 }).await;
        assert!(matches!(out, Watched::Done(7)));
    }

    #[tokio::test]
    async fn test_slow_work_past_soft_still_finishes() {
        let work = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            "late"
        };
        let out = watch(&config(10, 2_000), "slow", work).await;
        assert!(matches!(out, Watched::Done("late")));
    }

    #[tokio::test]
    async fn test_stuck_work_is_abandoned() {
        let out = watch(&config(10, 30), "stuck", std::future::pending::<()>()).await;
        assert!(matches!(out, Watched::Abandoned(_)));
    }
}
