use std::process::ExitCode;

use clap::Parser;
use scope_probe::{LifecyclePolicy, ProbeConfig, ProbeResult, ProbeRunner, ResourceLedger};

/// Loop nested lifetime scopes and watch the resource ledger for leaks.
#[derive(Debug, Parser)]
#[command(name = "scope-probe", version, about)]
struct Cli {
    /// Iterations per thread (0 or absent runs until interrupted)
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Log a ledger report every N iterations (0 disables)
    #[arg(short, long)]
    report_every: Option<u64>,

    /// Lifecycle policy of the probed resource: per-call, per-scope or singleton
    #[arg(short, long)]
    policy: Option<LifecyclePolicy>,

    /// Number of driver threads
    #[arg(short, long)]
    threads: Option<usize>,

    /// Emit logs and the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Environment settings first, flags on top.
    fn resolve_config(&self) -> ProbeResult<ProbeConfig> {
        let mut config = ProbeConfig::from_env()?;
        if let Some(n) = self.iterations {
            config.iterations = (n > 0).then_some(n);
        }
        if let Some(every) = self.report_every {
            config.report_every = every;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let report = match ProbeRunner::new(config, ResourceLedger::global()).run() {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "probe failed");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize report");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!(
            "{} iterations ({} rejected) in {:.2?} [{:.0}/s], live={} undisposed={} abandoned={}",
            report.iterations,
            report.failed_operations,
            report.elapsed,
            report.iterations_per_sec(),
            report.snapshot.live,
            report.snapshot.undisposed,
            report.snapshot.abandoned,
        );
    }

    if report.snapshot.is_quiescent() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
