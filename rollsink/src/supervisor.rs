//! Periodic driver for the storage policy and error fan-out.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::errors::SinkError;
use crate::storage::{PolicyContext, StoragePolicy};

/// Channels registered through `RollSink::notify_on_error`.
pub(crate) type ObserverList = Arc<Mutex<Vec<mpsc::Sender<Arc<SinkError>>>>>;

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Start the policy loop, the error fan-out, and the ticker.
///
/// The ticker pulses the policy once per `tick_interval`; a full run
/// channel means the previous cycle is still in flight and the pulse is
/// dropped. The shutdown signal stops the ticker, which closes the run
/// channel, which ends the policy loop after its current cycle. The error
/// fan-out drains until the policy drops its sender.
pub(crate) fn spawn_supervisor(
    policy: StoragePolicy,
    ctx: PolicyContext,
    tick_interval: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
    observers: ObserverList,
) -> JoinHandle<()> {
    let (run_tx, run_rx) = mpsc::channel::<()>(1);
    let (err_tx, mut err_rx) = mpsc::channel::<SinkError>(ERROR_CHANNEL_CAPACITY);

    tokio::spawn(policy.start(ctx, run_rx, err_tx));

    tokio::spawn(async move {
        while let Some(err) = err_rx.recv().await {
            warn!("storage policy error: {err}");
            let err = Arc::new(err);
            let observers = observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            for observer in observers {
                // Best-effort: a slow observer loses the notification.
                let _ = observer.try_send(Arc::clone(&err));
            }
        }
    });

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let _ = run_tx.try_send(());
                }
                _ = &mut shutdown_rx => {
                    debug!("sink closed, stopping storage supervisor");
                    break;
                }
            }
        }
    })
}
