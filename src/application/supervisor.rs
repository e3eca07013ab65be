//! Reconciliation loop.
//!
//! Runs one cycle, waits the configured pause, runs the next. A failing
//! cycle is logged and the loop carries on; only a shutdown request ends it,
//! and only between cycles.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::domain::{CycleReport, Result};

use super::formatter::format_notice;

/// Something the supervisor can run once per interval.
#[async_trait]
pub trait Cycle: Send {
    async fn run_cycle(&mut self) -> Result<CycleReport>;
}

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub failures: u64,
}

/// Drives a [`Cycle`] with a fixed pause between runs.
pub struct Supervisor<C> {
    cycle: C,
    interval: Duration,
}

impl<C: Cycle> Supervisor<C> {
    #[must_use]
    pub const fn new(cycle: C, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Loop until `shutdown` resolves.
    ///
    /// The pause is measured from the end of one cycle to the start of the
    /// next, so a slow adb call delays everything after it.
    pub async fn run_until<F>(mut self, shutdown: F) -> LoopStats
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut stats = LoopStats::default();

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Reconciliation loop started"
        );

        loop {
            stats.cycles += 1;
            match self.cycle.run_cycle().await {
                Ok(report) => {
                    for notice in &report.notices {
                        println!("{}", format_notice(notice));
                    }
                    tracing::debug!(
                        outcome = %report.outcome,
                        resets = report.resets,
                        finished_at = %report.finished_at.format("%H:%M:%S"),
                        "Cycle finished"
                    );
                }
                Err(e) => {
                    stats.failures += 1;
                    tracing::error!(
                        error = %e,
                        transport = e.is_transport(),
                        "Reconciliation cycle failed"
                    );
                }
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        tracing::info!(
            cycles = stats.cycles,
            failures = stats.failures,
            "Reconciliation loop stopped"
        );
        stats
    }
}

/// Wait for `signal` on its own task and turn it into a `quit` notification.
///
/// Spawning arms the listener right away, so an interrupt during the first
/// cycle still ends the loop gracefully.
pub fn forward_signal<F>(signal: F, quit: Arc<Notify>) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("Interrupt received, stopping after this cycle");
                quit.notify_one();
            }
            Err(e) => tracing::warn!(error = %e, "Ctrl-C handler unavailable"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AbortReason, AppError, CycleOutcome};

    /// Fails every other cycle, optionally taking a while.
    struct Flaky {
        runs: u32,
        duration: Duration,
    }

    #[async_trait]
    impl Cycle for Flaky {
        async fn run_cycle(&mut self) -> Result<CycleReport> {
            self.runs += 1;
            tokio::time::sleep(self.duration).await;
            if self.runs % 2 == 1 {
                Err(AppError::transport("adb exploded"))
            } else {
                Ok(CycleReport::new(
                    CycleOutcome::Aborted(AbortReason::NoAddressAvailable),
                    Vec::new(),
                    0,
                ))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_the_loop() {
        let flaky = Flaky {
            runs: 0,
            duration: Duration::ZERO,
        };
        let supervisor = Supervisor::new(flaky, Duration::from_secs(5));

        let stats = supervisor
            .run_until(tokio::time::sleep(Duration::from_secs(12)))
            .await;

        // Cycles start at t=0, 5 and 10.
        assert_eq!(stats, LoopStats { cycles: 3, failures: 2 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_counts_from_cycle_end() {
        let slow = Flaky {
            runs: 0,
            duration: Duration::from_secs(4),
        };
        let supervisor = Supervisor::new(slow, Duration::from_secs(5));

        let stats = supervisor
            .run_until(tokio::time::sleep(Duration::from_secs(20)))
            .await;

        // Cycles start at t=0, 9 and 18; the third ends at t=22, after the
        // shutdown at t=20.
        assert_eq!(stats.cycles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_in_flight_is_not_cancelled() {
        let slow = Flaky {
            runs: 1,
            duration: Duration::from_secs(10),
        };
        let supervisor = Supervisor::new(slow, Duration::from_secs(5));

        let stats = supervisor
            .run_until(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert_eq!(stats, LoopStats { cycles: 1, failures: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_during_first_cycle_stops_loop() {
        let quit = Arc::new(Notify::new());
        forward_signal(
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            },
            Arc::clone(&quit),
        );
        let slow = Flaky {
            runs: 1,
            duration: Duration::from_secs(10),
        };

        let stats = Supervisor::new(slow, Duration::from_secs(5))
            .run_until(async move { quit.notified().await })
            .await;

        assert_eq!(stats, LoopStats { cycles: 1, failures: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_signal_does_not_quit() {
        let quit = Arc::new(Notify::new());
        forward_signal(
            async { Err(std::io::Error::other("no signal support")) },
            Arc::clone(&quit),
        )
        .await
        .unwrap();

        let waited = tokio::time::timeout(Duration::from_secs(60), quit.notified()).await;
        assert!(waited.is_err());
    }
}
