//! Register once, then keep the entry alive until shutdown.

use std::time::Duration;

use anyhow::{Context, Result};
use etcd_coordination::{Coordination, CoordinationError};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Register `node`, then refresh it every `interval` until `token` is
/// cancelled. Returns the number of refresh attempts made.
pub async fn join<C>(
    coordination: &C,
    node: &C::Node,
    ttl: Duration,
    interval: Duration,
    token: CancellationToken,
) -> Result<u64>
where
    C: Coordination,
{
    coordination
        .register_self(node, ttl)
        .await
        .context("failed to register self")?;
    info!(?ttl, ?interval, "registered self");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // first tick completes immediately and we just registered
    ticker.tick().await;

    let mut attempts = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(attempts, "refresh loop stopping");
                return Ok(attempts);
            }
            _ = ticker.tick() => {
                attempts += 1;
                match coordination.refresh_self(node, ttl).await {
                    Ok(outcome) => debug!(?outcome, "refreshed self"),
                    Err(err @ CoordinationError::UnexpectedStatusCode(_)) => {
                        // a 201 means the entry had lapsed and the store recreated it
                        warn!(%err, "refresh did not hit an existing entry");
                    }
                    Err(err) => warn!(?err, "failed to refresh self"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use etcd_coordination::{CoordinationResult, LockResult, RegistrationOutcome};
    use tokio::time::sleep;
    use tracing_test::traced_test;

    use super::*;

    #[derive(Debug, Default)]
    struct Recording {
        registers: AtomicUsize,
        refreshes: AtomicUsize,
        fail_first_refresh: bool,
        fail_register: bool,
    }

    #[async_trait]
    impl Coordination for Recording {
        type Node = SocketAddr;

        async fn list_nodes(&self) -> CoordinationResult<Vec<SocketAddr>> {
            Ok(Vec::new())
        }

        async fn acquire_lock(&self, _ttl: Duration) -> CoordinationResult<LockResult> {
            Ok(LockResult::Success)
        }

        async fn register_self(
            &self,
            _node: &SocketAddr,
            _ttl: Duration,
        ) -> CoordinationResult<RegistrationOutcome> {
            self.registers.fetch_add(1, Ordering::SeqCst);
            if self.fail_register {
                return Err(CoordinationError::Transport("connection refused".into()));
            }
            Ok(RegistrationOutcome::SelfAdded)
        }

        async fn refresh_self(
            &self,
            _node: &SocketAddr,
            _ttl: Duration,
        ) -> CoordinationResult<RegistrationOutcome> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.fail_first_refresh && n == 0 {
                return Err(CoordinationError::Transport("timed out".into()));
            }
            Ok(RegistrationOutcome::Refreshed)
        }
    }

    fn node() -> SocketAddr {
        "10.0.0.1:2552".parse().unwrap()
    }

    /// Run `join` until `after` has elapsed, then cancel it.
    async fn join_for(
        coordination: &Recording,
        ttl: Duration,
        interval: Duration,
        after: Duration,
    ) -> Result<u64> {
        let token = CancellationToken::new();
        let node = node();
        let (attempts, _) = tokio::join!(
            join(coordination, &node, ttl, interval, token.clone()),
            async {
                sleep(after).await;
                token.cancel();
            }
        );
        attempts
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_until_cancelled() {
        let coordination = Recording::default();
        let attempts = join_for(
            &coordination,
            Duration::from_secs(30),
            Duration::from_secs(10),
            Duration::from_secs(35),
        )
        .await
        .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(coordination.registers.load(Ordering::SeqCst), 1);
        assert_eq!(coordination.refreshes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_refresh_failure_keeps_looping() {
        let coordination = Recording {
            fail_first_refresh: true,
            ..Default::default()
        };
        let attempts = join_for(
            &coordination,
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(12),
        )
        .await
        .unwrap();

        assert_eq!(attempts, 2);
        assert!(logs_contain("failed to refresh self"));
    }

    #[tokio::test]
    async fn test_register_failure_aborts() {
        let coordination = Recording {
            fail_register: true,
            ..Default::default()
        };
        let err = join(
            &coordination,
            &node(),
            Duration::from_secs(10),
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to register self"));
        assert_eq!(coordination.refreshes.load(Ordering::SeqCst), 0);
    }
}
