// ── Periodic full refresh ──

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::HubApi;
use crate::engine::{RefreshOutcome, SyncEngine};

/// Drives [`SyncEngine::refresh`] on a fixed period.
pub struct Scheduler<C: HubApi> {
    engine: SyncEngine<C>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<C: HubApi> Scheduler<C> {
    /// The scheduler stops when either its own token or the engine's
    /// cancellation fires.
    pub fn new(engine: SyncEngine<C>) -> Self {
        let cancel = engine.cancellation().child_token();
        Self {
            engine,
            cancel,
            handle: Mutex::new(None),
        }
    }

    /// Run one cycle now, then keep refreshing every `interval` in the
    /// background. Returns the outcome of the first cycle.
    pub async fn start(&self, interval: Duration) -> RefreshOutcome {
        let first = self.engine.refresh().await;

        if interval.is_zero() {
            info!("periodic refresh disabled");
            return first;
        }
        let task = tokio::spawn(refresh_task(
            self.engine.clone(),
            interval,
            self.cancel.clone(),
        ));
        if let Some(previous) = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task)
        {
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "periodic refresh scheduled");
        first
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the timer and wait for the task to wind down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn refresh_task<C: HubApi>(
    engine: SyncEngine<C>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Failures are logged by the engine; the timer keeps going.
                if let RefreshOutcome::Coalesced = engine.refresh().await {
                    debug!("scheduled refresh coalesced into a running cycle");
                }
            }
        }
    }
    debug!("refresh task stopped");
}
