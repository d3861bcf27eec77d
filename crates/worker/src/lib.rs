//! Poll-loop host for the delivery scheduler.
//!
//! The engine itself never loops; this worker is the external trigger. On
//! every tick it drains the ready queue one item at a time until nothing
//! is due, then sleeps until the next tick. The loop exits gracefully when
//! the provided [`CancellationToken`] is cancelled.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use courier_scheduler::DeliveryScheduler;

/// Consecutive infrastructure failures after which a drain pass stops
/// early instead of hammering a broken database.
const MAX_CONSECUTIVE_FAILURES: u32 = 2;

/// Run the polling loop until cancelled.
pub async fn run(
    scheduler: &DeliveryScheduler,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Delivery worker cancelled");
                break;
            }
            _ = interval.tick() => {
                drain(scheduler).await;
            }
        }
    }
}

/// Drain the ready queue: one send per iteration until nothing is due.
///
/// Returns the number of items processed. Per-item delivery failures are
/// already absorbed into item state by the scheduler; only storage faults
/// reach this loop, and two in a row end the pass.
pub async fn drain(scheduler: &DeliveryScheduler) -> usize {
    let mut processed = 0;
    let mut failures: u32 = 0;

    loop {
        match scheduler.send_next_ready().await {
            Ok(Some(report)) => {
                processed += 1;
                failures = 0;
                tracing::debug!(?report, "Processed ready item");
            }
            Ok(None) => break,
            Err(e) => {
                failures += 1;
                tracing::error!(error = %e, "Scheduler pass failed");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    tracing::error!("Stopping drain pass after repeated failures");
                    break;
                }
            }
        }
    }

    if processed > 0 {
        tracing::info!(processed, "Drained ready notifications");
    }
    processed
}
