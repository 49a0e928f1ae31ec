//! Sweep orchestration: prepare outputs, then launch every combination in
//! order, one at a time.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::{FailurePolicy, SweepConfig},
    error::{Result, SweepError},
    invoke::{Invocation, Launcher, PathTranslation, RunOutcome},
    manifest::{self, Manifest},
    printer::TextPrinter,
    results,
    sweep::{combinations, Combination},
};

/// Outcome of one combination after all attempts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub combination: Combination,
    pub outcome: RunOutcome,
    pub attempts: u32,
    pub animation_file: String,
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub results_file: PathBuf,
    pub tool_out_file: PathBuf,
    pub total: usize,
    pub runs: Vec<RunRecord>,
    pub aborted: bool,
}

impl SweepReport {
    pub fn attempted(&self) -> usize {
        self.runs.len()
    }

    pub fn succeeded(&self) -> usize {
        self.runs.iter().filter(|r| r.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }

    /// The error to surface when the abort policy stopped the sweep.
    pub fn abort_error(&self) -> Option<SweepError> {
        if !self.aborted {
            return None;
        }
        self.runs.last().map(|r| SweepError::Aborted {
            index: r.combination.index,
            total: r.combination.total,
            outcome: r.outcome.clone(),
        })
    }
}

/// Command lines the sweep would run, without touching the filesystem.
pub fn plan(config: &SweepConfig, now: NaiveDateTime) -> Result<Vec<Invocation>> {
    let results_file = config.output.results_dir.join(results::results_file_name(now));
    let out_file = translate(config, &results_file)?;
    Ok(combinations(&config.sweep)
        .map(|combo| Invocation::build(&config.launcher, &combo, &out_file))
        .collect())
}

/// Run the whole sweep.
///
/// Setup failures are returned as errors before anything is launched. Run
/// failures are recorded in the report; under [`FailurePolicy::Abort`] the
/// first one ends the sweep with `aborted` set.
pub async fn run_sweep<L: Launcher>(
    config: &SweepConfig,
    launcher: &mut L,
    printer: &TextPrinter,
    started_at: NaiveDateTime,
) -> Result<SweepReport> {
    let output = &config.output;
    results::prepare_dirs(&[output.results_dir.as_path(), output.animations_dir.as_path()])?;
    let results_file = results::init_results_file(&output.results_dir, started_at)?;
    let tool_out_file = translate(config, &results_file)?;

    let total = config.sweep.combination_count();
    info!(
        total,
        results = %results_file.display(),
        out_file = %tool_out_file.display(),
        "starting sweep"
    );

    let mut report = SweepReport {
        results_file,
        tool_out_file,
        total,
        runs: Vec::with_capacity(total),
        aborted: false,
    };

    for combo in combinations(&config.sweep) {
        printer.banner(&combo);
        let invocation = Invocation::build(&config.launcher, &combo, &report.tool_out_file);
        info!(
            index = combo.index,
            total = combo.total,
            hello_ms = combo.hello_interval,
            nodes = combo.mobile_nodes,
            range_m = combo.propagation_range,
            seed = combo.seed,
            "launching"
        );
        debug!(command = %invocation, animation = %combo.animation_file_name(), "invocation");

        let (outcome, attempts) =
            launch_with_retries(launcher, &invocation, &combo, config.launcher.retries).await;
        let failed = !outcome.is_success();
        if failed {
            warn!(index = combo.index, total = combo.total, attempts, %outcome, "run failed");
        }

        report.runs.push(RunRecord {
            combination: combo,
            outcome,
            attempts,
            animation_file: combo.animation_file_name(),
        });

        if failed && config.launcher.on_failure == FailurePolicy::Abort {
            report.aborted = true;
            break;
        }
    }

    write_manifest(config, &report, started_at);
    info!(
        attempted = report.attempted(),
        succeeded = report.succeeded(),
        failed = report.failed(),
        aborted = report.aborted,
        "sweep finished"
    );
    Ok(report)
}

async fn launch_with_retries<L: Launcher>(
    launcher: &mut L,
    invocation: &Invocation,
    combo: &Combination,
    retries: u32,
) -> (RunOutcome, u32) {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = launcher.launch(invocation).await;
        if outcome.is_success() || attempts > retries {
            return (outcome, attempts);
        }
        warn!(index = combo.index, attempt = attempts, %outcome, "run failed, retrying");
    }
}

fn translate(config: &SweepConfig, results_file: &Path) -> Result<PathBuf> {
    PathTranslation::from_config(&config.launcher)
        .translate(results_file)
        .map_err(|e| SweepError::setup(results_file, e))
}

fn write_manifest(config: &SweepConfig, report: &SweepReport, started_at: NaiveDateTime) {
    let path = manifest::manifest_path(&report.results_file);
    let manifest = Manifest {
        config,
        results_file: &report.results_file,
        tool_out_file: &report.tool_out_file,
        started_at,
        finished_at: Local::now().naive_local(),
        aborted: report.aborted,
        runs: &report.runs,
    };
    match manifest::write(&path, &manifest) {
        Ok(()) => debug!(path = %path.display(), "wrote manifest"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write manifest"),
    }
}
