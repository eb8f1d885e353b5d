// ── Sync engine ──
//
// Owns the device state, the routing preferences and the reentrancy
// bookkeeping for full refresh cycles. Cheaply cloneable; the scheduler,
// the ingest endpoint and the HTTP layer all hold clones.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hubsync_api::DeviceInventory;

use crate::client::HubApi;
use crate::config::EngineConfig;
use crate::convert::{preferences_from_location, records_from_inventory};
use crate::error::CoreError;
use crate::host::AccessoryHost;
use crate::model::{
    DeviceRecord, IncomingAttributeChange, PreferenceUpdate, RoutingPreferences,
};
use crate::reconcile::ReconcileReport;
use crate::store::SyncState;
use crate::stream::DeviceStream;

type Snapshot = Arc<Vec<Arc<DeviceRecord>>>;

/// Result of [`SyncEngine::refresh`].
#[derive(Debug)]
pub enum RefreshOutcome {
    Completed(ReconcileReport),
    /// The fetch failed; the cache was left untouched.
    Failed(CoreError),
    /// Another cycle was already running; a follow-up was queued.
    Coalesced,
}

/// Result of [`SyncEngine::apply_attribute_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied { observers: usize },
    UnknownDevice,
    Excluded,
}

pub struct SyncEngine<C: HubApi> {
    inner: Arc<EngineInner<C>>,
}

impl<C: HubApi> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<C> {
    client: Arc<C>,
    host: Arc<dyn AccessoryHost>,
    config: EngineConfig,
    state: Mutex<SyncState>,
    snapshot: watch::Sender<Snapshot>,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
    preferences: ArcSwap<RoutingPreferences>,
    unknown_capabilities: Mutex<BTreeSet<String>>,
    cycle_lock: tokio::sync::Mutex<()>,
    rerun_requested: AtomicBool,
    cancel: CancellationToken,
    restart: CancellationToken,
}

impl<C: HubApi> SyncEngine<C> {
    pub fn new(client: Arc<C>, host: Arc<dyn AccessoryHost>, config: EngineConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (last_full_refresh, _) = watch::channel(None);

        Self {
            inner: Arc::new(EngineInner {
                client,
                host,
                config,
                state: Mutex::new(SyncState::new()),
                snapshot,
                last_full_refresh,
                preferences: ArcSwap::from_pointee(RoutingPreferences::default()),
                unknown_capabilities: Mutex::new(BTreeSet::new()),
                cycle_lock: tokio::sync::Mutex::new(()),
                rerun_requested: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                restart: CancellationToken::new(),
            }),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.inner.client
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    // ── Full refresh ─────────────────────────────────────────────────

    /// Apply a fetched inventory: location preferences first, then the
    /// three reconciliation passes under the state lock.
    ///
    /// An inventory without a device list is a failed fetch: the location
    /// block is still applied but the cache is left untouched.
    pub fn reconcile(&self, inventory: DeviceInventory) -> Result<ReconcileReport, CoreError> {
        let started = Instant::now();

        if let Some(location) = &inventory.location {
            self.apply_location(location);
        }
        let Some(devices) = inventory.device_list else {
            return Err(CoreError::FetchFailed {
                reason: "hub response carried no deviceList".into(),
                transient: true,
            });
        };

        let records = records_from_inventory(devices, &self.inner.config);
        let report = {
            let mut state = self.lock_state();
            let report = state.reconcile(records, self.inner.host.as_ref());
            self.publish(&state);
            report
        };
        self.inner.last_full_refresh.send_replace(Some(Utc::now()));

        if !report.unknown_capabilities.is_empty() {
            let mut seen = self
                .inner
                .unknown_capabilities
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let new: Vec<&String> = report
                .unknown_capabilities
                .iter()
                .filter(|c| !seen.contains(*c))
                .collect();
            if !new.is_empty() {
                warn!(capabilities = ?new, "ignoring unrecognized capabilities");
            }
            seen.extend(report.unknown_capabilities.iter().cloned());
        }

        info!(
            removed = report.removed.len(),
            updated = report.updated.len(),
            created = report.created.len(),
            skipped = report.skipped,
            cache_size = report.cache_size,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "device sync complete"
        );
        Ok(report)
    }

    /// Fetch the inventory and reconcile it. A failed fetch leaves the
    /// cache untouched.
    pub async fn run_cycle(&self) -> Result<ReconcileReport, CoreError> {
        debug!("fetching device inventory");
        let inventory = self.inner.client.get_devices().await?;
        self.reconcile(inventory)
    }

    /// Run a full cycle unless one is already in flight.
    ///
    /// Requests that arrive while a cycle runs collapse into a single
    /// follow-up cycle once it finishes.
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut finished: Option<RefreshOutcome> = None;
        loop {
            let guard = match self.inner.cycle_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    if let Some(outcome) = finished {
                        return outcome;
                    }
                    self.inner.rerun_requested.store(true, Ordering::SeqCst);
                    // The holder may have released and read the flag before
                    // the store above; in that case the lock is free now.
                    let Ok(guard) = self.inner.cycle_lock.try_lock() else {
                        debug!("refresh already in flight, queued a follow-up");
                        return RefreshOutcome::Coalesced;
                    };
                    guard
                }
            };
            // Cleared before fetching: every request queued so far is
            // covered by this cycle.
            self.inner.rerun_requested.store(false, Ordering::SeqCst);

            let outcome = match self.run_cycle().await {
                Ok(report) => RefreshOutcome::Completed(report),
                Err(e) => {
                    warn!(error = %e, "device refresh failed");
                    RefreshOutcome::Failed(e)
                }
            };
            drop(guard);

            if !self.inner.rerun_requested.load(Ordering::SeqCst) {
                return outcome;
            }
            debug!("running queued follow-up refresh");
            finished = Some(outcome);
        }
    }

    /// Start a refresh in the background and return immediately.
    pub fn trigger_refresh(&self) {
        let engine = self.clone();
        tokio::spawn(async move {
            engine.refresh().await;
        });
    }

    // ── Incremental updates ──────────────────────────────────────────

    /// Write one attribute and notify its observers. Never fetches.
    pub fn apply_attribute_change(&self, change: &IncomingAttributeChange) -> ChangeOutcome {
        if self.inner.config.is_attribute_excluded(&change.attribute) {
            debug!(attribute = %change.attribute, "ignoring change to excluded attribute");
            return ChangeOutcome::Excluded;
        }

        let mut state = self.lock_state();
        match state.apply_change(change) {
            Some(observers) => {
                self.publish(&state);
                debug!(
                    device_id = %change.device_id,
                    name = change.display_name.as_deref().unwrap_or_default(),
                    attribute = %change.attribute,
                    value = %change.value,
                    at = ?change.timestamp,
                    observers,
                    "attribute updated"
                );
                ChangeOutcome::Applied { observers }
            }
            None => {
                debug!(device_id = %change.device_id, "change for unknown device ignored");
                ChangeOutcome::UnknownDevice
            }
        }
    }

    // ── Preferences ──────────────────────────────────────────────────

    pub fn preferences(&self) -> Arc<RoutingPreferences> {
        self.inner.preferences.load_full()
    }

    /// Apply a partial preference change. Returns `true` if anything
    /// changed, in which case the client's routing is updated too.
    pub fn apply_preference_update(&self, update: &PreferenceUpdate) -> bool {
        let current = self.preferences();
        let Some(next) = update.apply_to(&current) else {
            return false;
        };
        info!(
            before_local = current.local_commands,
            now_local = next.local_commands,
            before_ip = ?current.local_hub_ip,
            now_ip = ?next.local_hub_ip,
            "routing preferences updated"
        );
        self.store_preferences(next);
        true
    }

    fn apply_location(&self, location: &hubsync_api::InventoryLocation) {
        let current = self.preferences();
        let next = preferences_from_location(location, &current);
        if next == *current {
            return;
        }
        let routing_changed = next.local_commands != current.local_commands
            || next.local_hub_ip != current.local_hub_ip;
        if routing_changed {
            self.store_preferences(next);
        } else {
            self.inner.preferences.store(Arc::new(next));
        }
    }

    fn store_preferences(&self, next: RoutingPreferences) {
        self.inner
            .client
            .update_globals(next.local_hub_ip.as_deref(), next.local_commands);
        self.inner.preferences.store(Arc::new(next));
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send a command to a cached device through the current routing.
    pub async fn send_command(
        &self,
        device_id: &str,
        command: &str,
        values: &[Value],
    ) -> Result<(), CoreError> {
        let device = self.device(device_id).ok_or_else(|| CoreError::CommandFailed {
            message: format!("unknown device {device_id}"),
        })?;
        if !device.commands.is_empty() && !device.commands.contains(command) {
            return Err(CoreError::CommandFailed {
                message: format!("{} does not support {command}", device.display_name()),
            });
        }
        self.inner
            .client
            .send_device_command(device_id, command, values)
            .await
            .map_err(|e| match CoreError::from(e) {
                e @ (CoreError::CommandFailed { .. } | CoreError::Config { .. }) => e,
                other => CoreError::CommandFailed {
                    message: other.to_string(),
                },
            })
    }

    // ── Restart & shutdown ───────────────────────────────────────────

    /// Fire the restart signal after the configured delay.
    pub fn schedule_restart(&self) {
        let delay = self.inner.config.restart_delay;
        let restart = self.inner.restart.clone();
        let cancel = self.inner.cancel.clone();
        warn!(delay_secs = delay.as_secs(), "restart requested");
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => restart.cancel(),
            }
        });
    }

    /// Cancelled once a scheduled restart comes due.
    pub fn restart_signal(&self) -> CancellationToken {
        self.inner.restart.clone()
    }

    /// Cancelled on [`shutdown`](Self::shutdown); background tasks watch it.
    pub fn cancellation(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    // ── Read access ──────────────────────────────────────────────────

    pub fn device(&self, device_id: &str) -> Option<Arc<DeviceRecord>> {
        self.lock_state().cache.get(device_id)
    }

    pub fn devices(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn device_count(&self) -> usize {
        self.lock_state().cache.len()
    }

    pub fn observer_count(&self, device_id: &str) -> usize {
        self.lock_state().index.observer_count(device_id)
    }

    /// Every unrecognized capability tag seen since startup.
    pub fn unknown_capabilities(&self) -> BTreeSet<String> {
        self.inner
            .unknown_capabilities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_full_refresh.borrow()
    }

    pub fn subscribe_devices(&self) -> DeviceStream {
        DeviceStream::new(self.inner.snapshot.subscribe())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SyncState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &SyncState) {
        self.inner
            .snapshot
            .send_replace(Arc::new(state.cache.snapshot()));
    }
}
