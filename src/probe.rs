//! The probe driver: a tight loop of nested scopes with periodic reporting.
//!
//! Each iteration begins a nested [`LifetimeScope`] under a per-thread outer
//! scope, resolves a [`ProbeService`] in it, performs one operation, and ends
//! the nested scope. Every `report_every` iterations the ledger snapshot is
//! logged so a growing `live` or `undisposed` count shows up while the probe
//! is still running.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::ProbeConfig;
use crate::error::{ProbeError, ProbeResult};
use crate::ledger::{LedgerSnapshot, ResourceLedger};
use crate::lifetime::LifecyclePolicy;
use crate::scope::LifetimeScope;
use crate::service::ProbeService;
use crate::source::PolicySource;

/// Callback receiving `(completed_iterations, snapshot)` at each report point.
pub type ReportHook = Box<dyn Fn(u64, &LedgerSnapshot) + Send + Sync>;

/// Summary of a finished probe run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub policy: LifecyclePolicy,
    pub threads: usize,
    /// Iterations completed across all threads.
    pub iterations: u64,
    /// Operations rejected because the resource had already been released.
    pub failed_operations: u64,
    pub elapsed: Duration,
    /// Ledger state after every scope and the source have been torn down.
    pub snapshot: LedgerSnapshot,
}

impl ProbeReport {
    pub fn iterations_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.iterations as f64 / secs
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    iterations: u64,
    failed: u64,
}

/// Runs the acquire/operate/release loop described by a [`ProbeConfig`].
///
/// # Examples
///
/// ```
/// use scope_probe::{LifecyclePolicy, ProbeConfig, ProbeRunner, ResourceLedger};
///
/// let config = ProbeConfig {
///     iterations: Some(1_000),
///     report_every: 0,
///     policy: LifecyclePolicy::PerScope,
///     threads: 2,
/// };
/// let report = ProbeRunner::new(config, ResourceLedger::new_shared()).run().unwrap();
///
/// assert_eq!(report.iterations, 2_000);
/// assert!(report.snapshot.is_quiescent());
/// ```
pub struct ProbeRunner {
    config: ProbeConfig,
    ledger: Arc<ResourceLedger>,
    stop: Arc<AtomicBool>,
    on_report: Option<ReportHook>,
}

impl ProbeRunner {
    pub fn new(config: ProbeConfig, ledger: Arc<ResourceLedger>) -> Self {
        Self {
            config,
            ledger,
            stop: Arc::new(AtomicBool::new(false)),
            on_report: None,
        }
    }

    /// Installs a callback invoked at every report point, after logging.
    pub fn with_report_hook(mut self, hook: ReportHook) -> Self {
        self.on_report = Some(hook);
        self
    }

    /// Flag that stops every driver thread at its next iteration boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn run(&self) -> ProbeResult<ProbeReport> {
        self.config.validate()?;
        tracing::info!(
            policy = %self.config.policy,
            threads = self.config.threads,
            iterations = ?self.config.iterations,
            "starting scope probe"
        );
        if !self.config.policy.is_scope_owned() {
            tracing::warn!(
                policy = %self.config.policy,
                "scoped acquisition releases the shared instance; later operations will be rejected"
            );
        }

        let source = PolicySource::new(self.config.policy, Arc::clone(&self.ledger));
        let started = Instant::now();

        let tallies: ProbeResult<Vec<ProbeResult<Tally>>> = thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.config.threads);
            for worker in 0..self.config.threads {
                let source = &source;
                let spawned = thread::Builder::new()
                    .name(format!("scope-probe-{}", worker))
                    .spawn_scoped(s, move || self.drive(worker, source));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        // workers already running are joined when the scope closes
                        self.stop.store(true, Ordering::Relaxed);
                        return Err(ProbeError::spawn(worker, &err));
                    }
                }
            }
            Ok(handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|payload| std::panic::resume_unwind(payload)))
                .collect())
        });

        let mut total = Tally::default();
        for tally in tallies? {
            let tally = tally?;
            total.iterations += tally.iterations;
            total.failed += tally.failed;
        }
        drop(source);

        let report = ProbeReport {
            policy: self.config.policy,
            threads: self.config.threads,
            iterations: total.iterations,
            failed_operations: total.failed,
            elapsed: started.elapsed(),
            snapshot: self.ledger.snapshot(),
        };
        tracing::info!(
            iterations = report.iterations,
            failed = report.failed_operations,
            live = report.snapshot.live,
            undisposed = report.snapshot.undisposed,
            abandoned = report.snapshot.abandoned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "scope probe finished"
        );
        Ok(report)
    }

    fn drive(&self, worker: usize, source: &PolicySource) -> ProbeResult<Tally> {
        let outer = LifetimeScope::root(Arc::clone(&self.ledger));
        let mut tally = Tally::default();

        while !self.stop.load(Ordering::Relaxed) {
            if self.config.iterations.is_some_and(|limit| tally.iterations >= limit) {
                break;
            }

            {
                let inner = outer.begin_nested();
                let service = ProbeService::resolve(&inner, source);
                if let Err(err) = service.do_something() {
                    if !err.is_recoverable() {
                        return Err(err);
                    }
                    tally.failed += 1;
                    if tally.failed == 1 {
                        tracing::warn!(worker, error = %err, "probe operation rejected");
                    }
                }
            }
            tally.iterations += 1;

            if worker == 0
                && self.config.report_every > 0
                && tally.iterations % self.config.report_every == 0
            {
                self.report(tally.iterations);
            }
        }

        outer.end();
        Ok(tally)
    }

    fn report(&self, iterations: u64) {
        let snapshot = self.ledger.snapshot();
        tracing::info!(
            iterations,
            live = snapshot.live,
            undisposed = snapshot.undisposed,
            pending_reclamation = snapshot.pending_reclamation(),
            abandoned = snapshot.abandoned,
            "ledger report"
        );
        if let Err(err) = ResourceLedger::check_invariants(&snapshot) {
            tracing::error!(error = %err, "ledger invariant violated");
        }
        if let Some(hook) = &self.on_report {
            hook(iterations, &snapshot);
        }
    }
}

impl fmt::Debug for ProbeRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRunner")
            .field("config", &self.config)
            .field("stopped", &self.stop.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn config(policy: LifecyclePolicy, iterations: u64) -> ProbeConfig {
        ProbeConfig {
            iterations: Some(iterations),
            report_every: 0,
            policy,
            threads: 1,
        }
    }

    #[test]
    fn scope_owned_policies_leave_nothing_behind() {
        for policy in [LifecyclePolicy::PerCall, LifecyclePolicy::PerScope] {
            let ledger = ResourceLedger::new_shared();
            let report = ProbeRunner::new(config(policy, 250), ledger).run().unwrap();

            assert_eq!(report.iterations, 250);
            assert_eq!(report.failed_operations, 0);
            assert!(report.snapshot.is_quiescent());
            assert_eq!(report.snapshot.created_total, 250);
            assert_eq!(report.snapshot.abandoned, 0);
        }
    }

    #[test]
    fn singleton_is_spent_by_first_scope() {
        let ledger = ResourceLedger::new_shared();
        let report = ProbeRunner::new(config(LifecyclePolicy::Singleton, 10), ledger)
            .run()
            .unwrap();

        assert_eq!(report.iterations, 10);
        assert_eq!(report.failed_operations, 9);
        assert_eq!(report.snapshot.created_total, 1);
        assert!(report.snapshot.is_quiescent());
    }

    #[test]
    fn report_hook_fires_on_cadence() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut cfg = config(LifecyclePolicy::PerScope, 100);
        cfg.report_every = 25;

        ProbeRunner::new(cfg, ResourceLedger::new_shared())
            .with_report_hook(Box::new(move |n: u64, snap: &LedgerSnapshot| {
                sink.lock().unwrap().push((n, snap.undisposed))
            }))
            .run()
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(25, 0), (50, 0), (75, 0), (100, 0)]);
    }

    #[test]
    fn zero_iteration_limit_is_rejected_before_running() {
        let ledger = ResourceLedger::new_shared();
        let err = ProbeRunner::new(config(LifecyclePolicy::PerCall, 0), ledger.clone())
            .run()
            .unwrap_err();

        assert!(matches!(err, ProbeError::Config { ref key, .. } if key == "iterations"));
        assert_eq!(ledger.snapshot().created_total, 0);
    }

    #[test]
    fn stop_handle_ends_unbounded_run() {
        let mut cfg = config(LifecyclePolicy::PerCall, 1);
        cfg.iterations = None;
        let runner = ProbeRunner::new(cfg, ResourceLedger::new_shared());
        runner.stop_handle().store(true, Ordering::Relaxed);

        let report = runner.run().unwrap();
        assert_eq!(report.iterations, 0);
    }
}
