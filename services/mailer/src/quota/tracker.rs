use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::dispatch::SendLedger;

use super::error::QuotaError;
use super::record::{UsageRecord, UsageSnapshot};

struct QuotaTable {
    records: HashMap<String, UsageRecord>,
    epoch: u64,
    epoch_started_at: DateTime<Utc>,
}

/// Per-sender usage counters, wiped wholesale once per epoch.
///
/// Every read, write and reset goes through a single mutex over the whole
/// table, so a reset can never interleave with a reserve or a commit.
#[derive(Clone)]
pub struct QuotaTracker {
    table: Arc<Mutex<QuotaTable>>,
    cap: u64,
}

impl QuotaTracker {
    pub fn new(cap: u64) -> Self {
        Self {
            table: Arc::new(Mutex::new(QuotaTable {
                records: HashMap::new(),
                epoch: 0,
                epoch_started_at: Utc::now(),
            })),
            cap,
        }
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Reserves up to `requested` sends for `identity`.
    ///
    /// The reservation grants `min(requested, remaining)`. Sends are moved
    /// from reserved to used as they are committed. Whatever is still
    /// outstanding goes back to the pool when the reservation is dropped.
    pub fn reserve(&self, identity: &str, requested: u64) -> Result<QuotaReservation, QuotaError> {
        let mut table = self.lock();
        let epoch = table.epoch;
        let record = table.records.entry(identity.to_string()).or_default();

        let remaining = record.remaining(self.cap);
        if remaining == 0 {
            return Err(QuotaError::LimitExceeded {
                identity: identity.to_string(),
                limit: self.cap,
                used: record.count,
            });
        }

        let granted = requested.min(remaining);
        record.reserved = record.reserved.saturating_add(granted);

        debug!(
            identity,
            requested,
            granted,
            used = record.count,
            reserved = record.reserved,
            "reserved sender quota"
        );

        Ok(QuotaReservation {
            tracker: self.clone(),
            identity: identity.to_string(),
            granted,
            outstanding: AtomicU64::new(granted),
            epoch,
        })
    }

    pub fn used(&self, identity: &str) -> u64 {
        self.lock()
            .records
            .get(identity)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    pub fn remaining(&self, identity: &str) -> u64 {
        self.lock()
            .records
            .get(identity)
            .map(|record| record.remaining(self.cap))
            .unwrap_or(self.cap)
    }

    pub fn is_exhausted(&self, identity: &str) -> bool {
        self.lock()
            .records
            .get(identity)
            .is_some_and(|record| record.is_exhausted(self.cap))
    }

    pub fn snapshot(&self, identity: &str) -> UsageSnapshot {
        let table = self.lock();
        let record = table.records.get(identity).cloned().unwrap_or_default();

        UsageSnapshot {
            identity: identity.to_string(),
            used: record.count,
            limit: self.cap,
            remaining: record.remaining(self.cap),
            epoch_started_at: table.epoch_started_at,
        }
    }

    pub fn consecutive_failures(&self, identity: &str) -> u32 {
        self.lock()
            .records
            .get(identity)
            .map(|record| record.consecutive_failures)
            .unwrap_or(0)
    }

    /// Adds one failed send to the sender's current streak and returns it.
    ///
    /// The streak always lands in the current epoch, so a failure observed
    /// after a reset starts counting from zero.
    pub fn record_failure(&self, identity: &str) -> u32 {
        let mut table = self.lock();
        let record = table.records.entry(identity.to_string()).or_default();
        record.consecutive_failures = record.consecutive_failures.saturating_add(1);
        record.consecutive_failures
    }

    /// Clears every usage record and starts a new epoch.
    pub fn reset_all(&self) -> usize {
        let mut table = self.lock();
        let cleared = table.records.len();
        table.records.clear();
        table.epoch += 1;
        table.epoch_started_at = Utc::now();

        info!(cleared, epoch = table.epoch, "sender quota epoch reset");
        cleared
    }

    /// Spawns the epoch timer. The first reset fires one full `period` after
    /// the call.
    pub fn start_reset_task(&self, period: Duration) -> JoinHandle<()> {
        let tracker = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                tracker.reset_all();
            }
        })
    }

    fn record_delivery(&self, reservation: &QuotaReservation) -> u64 {
        let mut table = self.lock();
        let used = settle(&mut table, reservation, 1);
        if let Some(record) = table.records.get_mut(&reservation.identity) {
            record.consecutive_failures = 0;
        }
        used
    }

    fn commit(&self, reservation: &QuotaReservation, sent: u64) -> u64 {
        let mut table = self.lock();
        settle(&mut table, reservation, sent)
    }

    fn release(&self, reservation: &QuotaReservation) -> u64 {
        let mut table = self.lock();
        let released = reservation.outstanding.swap(0, Ordering::Relaxed);

        if table.epoch == reservation.epoch {
            if let Some(record) = table.records.get_mut(&reservation.identity) {
                record.reserved = record.reserved.saturating_sub(released);
            }
        }

        table
            .records
            .get(&reservation.identity)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, QuotaTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Moves up to `sent` of the reservation's outstanding sends into usage and
/// returns the sender's usage. Must be called with the table locked.
fn settle(table: &mut QuotaTable, reservation: &QuotaReservation, sent: u64) -> u64 {
    let outstanding = reservation.outstanding.load(Ordering::Relaxed);
    let settled = sent.min(outstanding);
    reservation
        .outstanding
        .store(outstanding - settled, Ordering::Relaxed);

    if table.epoch != reservation.epoch {
        debug!(
            identity = reservation.identity.as_str(),
            reservation_epoch = reservation.epoch,
            current_epoch = table.epoch,
            settled,
            "dropping sends reserved in a previous epoch"
        );
        return table
            .records
            .get(&reservation.identity)
            .map(|record| record.count)
            .unwrap_or(0);
    }

    let record = table
        .records
        .entry(reservation.identity.clone())
        .or_default();
    record.reserved = record.reserved.saturating_sub(settled);
    record.count = record.count.saturating_add(settled);
    record.count
}

/// Quota held for an in-flight dispatch.
#[must_use = "dropping a reservation releases it"]
pub struct QuotaReservation {
    tracker: QuotaTracker,
    identity: String,
    granted: u64,
    // Only touched with the table locked.
    outstanding: AtomicU64,
    epoch: u64,
}

impl QuotaReservation {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn granted(&self) -> u64 {
        self.granted
    }

    /// Sends still held by this reservation and not yet committed.
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::Relaxed)
    }

    /// Counts `sent` confirmed sends as used right away. Never counts more
    /// than the reservation still holds. Returns the sender's usage.
    pub fn commit(&self, sent: u64) -> u64 {
        self.tracker.commit(self, sent)
    }

    /// Releases whatever was not committed and returns the sender's usage.
    pub fn finish(self) -> u64 {
        self.tracker.release(&self)
    }

    pub fn release(self) {}
}

impl SendLedger for QuotaReservation {
    fn record_success(&self) {
        self.tracker.record_delivery(self);
    }

    fn record_failure(&self) -> u32 {
        self.tracker.record_failure(&self.identity)
    }
}

impl Drop for QuotaReservation {
    fn drop(&mut self) {
        self.tracker.release(self);
    }
}

impl std::fmt::Debug for QuotaReservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaReservation")
            .field("identity", &self.identity)
            .field("granted", &self.granted)
            .field("outstanding", &self.outstanding())
            .field("epoch", &self.epoch)
            .finish()
    }
}
