//! Process-wide leak-detection counters.
//!
//! A [`ResourceLedger`] counts how many tracked resources are currently
//! allocated (`live`) and how many have not been explicitly released yet
//! (`undisposed`). A healthy probe keeps `undisposed` near zero between
//! scopes; a `live` count that keeps growing means reclamation is lagging.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{Counter, ProbeError, ProbeResult};

static GLOBAL_LEDGER: Lazy<Arc<ResourceLedger>> = Lazy::new(ResourceLedger::new_shared);

/// Point-in-time copy of the ledger counters.
///
/// Fields are loaded one at a time, so a snapshot taken while other threads
/// mutate the ledger is consistent per field only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSnapshot {
    pub live: usize,
    pub undisposed: usize,
    pub created_total: u64,
    pub released_total: u64,
    pub reclaimed_total: u64,
    pub abandoned: u64,
}

impl LedgerSnapshot {
    /// Resources released but not yet reclaimed.
    pub fn pending_reclamation(&self) -> usize {
        self.live.saturating_sub(self.undisposed)
    }

    /// True when nothing is outstanding at all.
    pub fn is_quiescent(&self) -> bool {
        self.live == 0 && self.undisposed == 0
    }
}

/// Atomic live/undisposed counters shared by every [`TrackedResource`].
///
/// [`TrackedResource`]: crate::TrackedResource
#[derive(Debug, Default)]
pub struct ResourceLedger {
    live: AtomicUsize,
    undisposed: AtomicUsize,
    created_total: AtomicU64,
    released_total: AtomicU64,
    reclaimed_total: AtomicU64,
    abandoned: AtomicU64,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger behind an `Arc`, ready to hand to resources.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The process-wide ledger, initialised on first use and never torn down.
    pub fn global() -> Arc<ResourceLedger> {
        Arc::clone(&GLOBAL_LEDGER)
    }

    /// Records a newly constructed resource.
    pub fn record_created(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.undisposed.fetch_add(1, Ordering::SeqCst);
        self.created_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an explicit release. Underflow is reported, not propagated.
    pub fn record_released(&self) {
        report_violation(self.try_record_released());
    }

    /// Records the reclamation of a resource. Underflow is reported, not propagated.
    pub fn record_reclaimed(&self) {
        report_violation(self.try_record_reclaimed());
    }

    /// Checked form of [`record_released`](Self::record_released).
    pub fn try_record_released(&self) -> ProbeResult<()> {
        checked_decrement(&self.undisposed, Counter::Undisposed)?;
        self.released_total.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Checked form of [`record_reclaimed`](Self::record_reclaimed).
    pub fn try_record_reclaimed(&self) -> ProbeResult<()> {
        checked_decrement(&self.live, Counter::Live)?;
        self.reclaimed_total.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads every counter for reporting.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let undisposed = self.undisposed.load(Ordering::SeqCst);
        let live = self.live.load(Ordering::SeqCst);
        LedgerSnapshot {
            live,
            undisposed,
            created_total: self.created_total.load(Ordering::Relaxed),
            released_total: self.released_total.load(Ordering::Relaxed),
            reclaimed_total: self.reclaimed_total.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Checks the `undisposed <= live` relationship on a snapshot.
    pub fn check_invariants(snapshot: &LedgerSnapshot) -> ProbeResult<()> {
        if snapshot.undisposed > snapshot.live {
            return Err(ProbeError::InvariantViolation {
                counter: Counter::Undisposed,
                detail: "more undisposed than live resources",
            });
        }
        Ok(())
    }
}

fn checked_decrement(counter: &AtomicUsize, which: Counter) -> ProbeResult<()> {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .map(|_| ())
        .map_err(|_| ProbeError::InvariantViolation {
            counter: which,
            detail: "decrement below zero",
        })
}

fn report_violation(result: ProbeResult<()>) {
    if let Err(err) = result {
        tracing::error!(error = %err, "resource ledger double decrement");
        debug_assert!(false, "{}", err);
    }
}
