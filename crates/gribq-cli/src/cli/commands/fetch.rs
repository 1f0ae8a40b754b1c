//! `gribq fetch` – fetch the newest available run per preset and store it.

use anyhow::{bail, Result};
use gribq_core::config::GribqConfig;
use gribq_core::cycle::ForecastCycle;
use gribq_core::model::ModelRegistry;
use gribq_core::retrieve::{
    CurlTransport, FailureKind, FetchAttempt, FetchPolicy, FetchResult, RetrievalEngine,
};
use gribq_core::storage::{LocalState, LocalStatus, RunStore, StoreRequest, StoredFile};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::resolve::{resolve, PresetPlan};
use crate::cli::QueryArgs;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub output_dir: Option<PathBuf>,
    pub force: bool,
    pub new_only: bool,
    pub check_only: bool,
    pub jobs: usize,
}

enum SessionOutcome {
    Stored {
        cycle: ForecastCycle,
        file: StoredFile,
    },
    Failed(FailureKind),
    StoreFailed(anyhow::Error),
}

struct SessionReport {
    preset: String,
    outcome: SessionOutcome,
    attempts: Vec<FetchAttempt>,
    elapsed: Duration,
}

pub async fn run_fetch(
    cfg: &GribqConfig,
    registry: &ModelRegistry,
    query: &QueryArgs,
    opts: FetchOptions,
) -> Result<()> {
    let resolution = resolve(query, cfg, registry)?;
    let Some(newest) = resolution.newest_cycle() else {
        bail!("no candidate cycles to try");
    };
    let root = match opts.output_dir {
        Some(dir) => dir,
        None => cfg.resolved_output_dir()?,
    };
    let store = Arc::new(RunStore::new(root, cfg.backup_policy()));
    let model = resolution.model.name().to_string();
    let forecast_hour = resolution.forecast_hour;

    println!(
        "newest candidate cycle: {newest} (f{forecast_hour:03}), storing under {}",
        store.root().display()
    );

    let mut pending = Vec::new();
    for plan in resolution.plans {
        let status = store.status(&model, &plan.preset.name, newest, forecast_hour);
        if opts.check_only {
            print_status(&plan.preset.name, &status);
            continue;
        }
        if opts.new_only && !opts.force {
            match &status.state {
                LocalState::Complete { .. } => {
                    println!(
                        "{}: {} exists, skipping (--new-only)",
                        plan.preset.name,
                        status.path.display()
                    );
                    continue;
                }
                LocalState::Damaged { reason, .. } => {
                    println!("{}: existing file is incomplete ({reason}), fetching again", plan.preset.name);
                }
                LocalState::Missing => {}
            }
        }
        pending.push(plan);
    }
    if pending.is_empty() {
        return Ok(());
    }

    let total = pending.len();
    let policy = cfg.fetch_policy();
    let product = resolution.product;
    let failures = run_sessions(
        pending,
        opts.jobs,
        move |plan| run_session(plan, &store, &model, &product, policy),
        |report| print_report(&report, newest),
    )
    .await;

    if failures > 0 {
        bail!("{failures} of {total} preset fetch(es) failed");
    }
    Ok(())
}

/// Runs `work` for every item on the blocking pool with up to
/// `max_concurrent` in flight. `report` returns whether an item succeeded.
/// A panicked session counts as a failure; the others still run to the end.
/// Returns the number of failures.
pub(crate) async fn run_sessions<I, R, W, F>(
    items: Vec<I>,
    max_concurrent: usize,
    work: W,
    mut report: F,
) -> usize
where
    I: Send + 'static,
    R: Send + 'static,
    W: Fn(I) -> R + Send + Sync + 'static,
    F: FnMut(R) -> bool,
{
    let max_concurrent = max_concurrent.max(1);
    let work = Arc::new(work);
    let mut queue = items.into_iter();
    let mut join_set = tokio::task::JoinSet::new();
    let mut failures = 0usize;

    loop {
        while join_set.len() < max_concurrent {
            let Some(item) = queue.next() else {
                break;
            };
            let work = Arc::clone(&work);
            join_set.spawn_blocking(move || work(item));
        }
        let Some(joined) = join_set.join_next().await else {
            break;
        };
        match joined {
            Ok(result) => {
                if !report(result) {
                    failures += 1;
                }
            }
            Err(err) => {
                tracing::error!("fetch session panicked: {err}");
                println!("a fetch session panicked: {err}");
                failures += 1;
            }
        }
    }
    failures
}

/// One engine session on the blocking pool, then persistence.
fn run_session(
    plan: PresetPlan,
    store: &RunStore,
    model: &str,
    product: &str,
    policy: FetchPolicy,
) -> SessionReport {
    let preset = plan.preset.name.clone();
    tracing::info!(preset = %preset, candidates = plan.candidates.len(), "starting fetch session");
    let engine = RetrievalEngine::new(CurlTransport::new(), policy);

    match engine.fetch(&plan.candidates) {
        FetchResult::Success {
            body,
            cycle,
            url,
            attempts,
            elapsed,
        } => {
            let request = StoreRequest {
                model: model.to_string(),
                product: product.to_string(),
                preset: preset.clone(),
                cycle,
                forecast_hour: plan.fields.forecast_hour,
                url,
                bbox: plan.fields.bbox,
                variables: plan.fields.variables,
                levels: plan.fields.levels,
                attempts: attempts.len(),
            };
            let outcome = match store.store(&request, &body) {
                Ok(file) => SessionOutcome::Stored { cycle, file },
                Err(err) => SessionOutcome::StoreFailed(err),
            };
            SessionReport {
                preset,
                outcome,
                attempts,
                elapsed,
            }
        }
        FetchResult::Failure {
            kind,
            attempts,
            elapsed,
        } => SessionReport {
            preset,
            outcome: SessionOutcome::Failed(kind),
            attempts,
            elapsed,
        },
    }
}

fn print_status(preset: &str, status: &LocalStatus) {
    let path = status.path.display();
    match &status.state {
        LocalState::Complete { bytes } => println!("{preset}: present ({bytes} bytes) {path}"),
        LocalState::Damaged { bytes, reason } => {
            println!("{preset}: incomplete ({bytes} bytes, {reason}) {path}")
        }
        LocalState::Missing => println!("{preset}: missing {path}"),
    }
}

/// Print the session summary; returns whether it succeeded.
fn print_report(report: &SessionReport, newest: ForecastCycle) -> bool {
    let secs = report.elapsed.as_secs_f64();
    match &report.outcome {
        SessionOutcome::Stored { cycle, file } => {
            println!(
                "{}: stored {} ({} bytes, {} request(s), {:.1}s)",
                report.preset,
                file.path.display(),
                file.bytes,
                report.attempts.len(),
                secs
            );
            if *cycle != newest {
                println!("  fell back to {cycle}: newer runs not published yet");
            }
            if let Some(backup) = &file.backup {
                println!("  previous file kept as {}", backup.display());
            }
            true
        }
        SessionOutcome::Failed(kind) => {
            println!("{}: failed, {kind} after {secs:.1}s", report.preset);
            print_trail(&report.attempts);
            false
        }
        SessionOutcome::StoreFailed(err) => {
            println!("{}: fetched but could not store: {err:#}", report.preset);
            false
        }
    }
}

fn print_trail(attempts: &[FetchAttempt]) {
    for a in attempts {
        let backoff = a
            .backoff
            .map(|d| format!(", retry in {:.1}s", d.as_secs_f64()))
            .unwrap_or_default();
        println!(
            "  {} {} #{}: {}{}",
            a.timestamp.format("%H:%M:%S"),
            a.cycle,
            a.attempt,
            a.outcome,
            backoff
        );
    }
}
