use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{config::AppConfig, relay::Cycle};

/// Time left for in-flight work after a termination signal
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Armed,
    Stopped,
}

/// Uniformly random delay between polls, both bounds included
#[derive(Debug, Clone, Copy)]
pub struct Jitter {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Jitter {
    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }
}

/// Runs a cycle right away, then again after each random delay, until the
/// shutdown token is cancelled
pub struct Scheduler {
    jitter: Jitter,
    shutdown: CancellationToken,
    state: SchedulerState,
}

impl Scheduler {
    #[must_use]
    pub fn new(config: &AppConfig, shutdown: CancellationToken) -> Self {
        Self {
            jitter: Jitter {
                min_ms: config.min_interval_ms,
                max_ms: config.max_interval_ms,
            },
            shutdown,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Poll until shutdown. A cycle that is already running when the token
    /// is cancelled completes; a pending delay is cut short.
    pub async fn run<C: Cycle>(&mut self, cycle: &mut C) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            self.state = SchedulerState::Running;
            if let Err(e) = cycle.run_cycle().await {
                tracing::error!("Feed request or parsing failed: {e}");
            }

            if self.shutdown.is_cancelled() {
                break;
            }

            let delay = self.jitter.next_delay(&mut rand::thread_rng());
            tracing::info!(
                "Next poll in {} seconds",
                (delay.as_millis() + 500) / 1000
            );
            self.state = SchedulerState::Armed;

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => break,
            }
        }

        self.state = SchedulerState::Stopped;
        tracing::info!("Scheduler stopped");
    }

    /// Poll until `signal` resolves, then stop scheduling and give a cycle
    /// that is still running until `grace` has passed. Returns the deadline
    /// the remaining sends should also respect.
    pub async fn run_until<C: Cycle>(
        &mut self,
        cycle: &mut C,
        signal: impl Future<Output = ()>,
        grace: Duration,
    ) -> Instant {
        let shutdown = self.shutdown.clone();
        let run = self.run(cycle);
        tokio::pin!(run);

        tokio::select! {
            () = &mut run => Instant::now(),
            () = signal => {
                tracing::info!("Received termination signal, stopping");
                shutdown.cancel();
                let deadline = Instant::now() + grace;
                if tokio::time::timeout_at(deadline, &mut run).await.is_err() {
                    tracing::warn!("Abandoning the running poll");
                }
                deadline
            }
        }
    }
}

/// Run a single cycle and return how many items it pushed
pub async fn run_once<C: Cycle>(cycle: &mut C) -> usize {
    match cycle.run_cycle().await {
        Ok(new_ids) => {
            tracing::info!("Fetched new items: {}", new_ids.len());
            new_ids.len()
        }
        Err(e) => {
            tracing::error!("Feed request or parsing failed: {e}");
            0
        }
    }
}

/// Resolves once `listener` reports its signal. A listener that can't be
/// installed never resolves, so it can't stop the process on its own.
pub async fn signal_or_pending<F>(listener: F, name: &str)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        tracing::error!("Cannot listen for {name}: {e}");
        std::future::pending::<()>().await;
    }
}
