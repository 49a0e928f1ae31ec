use std::path::PathBuf;

use clap::{ArgGroup, Parser};

use crate::config::{ConfigLayer, FailurePolicy, LauncherLayer, OutputLayer, SweepLayer};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "simsweep",
    about = "Parameter sweep launcher for the DisasterRecovery ns-3 scenario",
    version
)]
#[command(group(ArgGroup::new("mode").args(["dry_run", "print_config"]).multiple(false)))]
pub struct Cli {
    /// TOML config file (default: ./simsweep.toml, then the user config dir).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Hello intervals to sweep, in milliseconds (comma separated).
    #[arg(long = "hello-intervals", value_delimiter = ',', value_name = "MS")]
    pub hello_intervals: Vec<u64>,

    /// Mobile node counts to sweep (comma separated).
    #[arg(long = "mobile-nodes", value_delimiter = ',', value_name = "N")]
    pub mobile_nodes: Vec<u32>,

    /// Propagation ranges to sweep, in meters (comma separated).
    #[arg(long = "propagation-ranges", value_delimiter = ',', value_name = "METERS")]
    pub propagation_ranges: Vec<f64>,

    /// RNG seeds to sweep (comma separated).
    #[arg(long, value_delimiter = ',', value_name = "SEED")]
    pub seeds: Vec<u32>,

    /// Side of the square scenario area, in meters.
    #[arg(long = "scenario-side", value_name = "METERS")]
    pub scenario_side: Option<f64>,

    /// Simulated time per run, in seconds.
    #[arg(long = "simulation-time", value_name = "SECS")]
    pub simulation_time: Option<f64>,

    /// Directory for the results CSV.
    #[arg(long = "results-dir", value_name = "DIR")]
    pub results_dir: Option<PathBuf>,

    /// Directory the simulator writes animation traces to.
    #[arg(long = "animations-dir", value_name = "DIR")]
    pub animations_dir: Option<PathBuf>,

    /// Simulator build/run wrapper (default: ../waf).
    #[arg(long)]
    pub wrapper: Option<String>,

    /// Simulator target passed to --run (default: DisasterRecovery).
    #[arg(long)]
    pub target: Option<String>,

    /// Directory the wrapper resolves --outFile from, relative to ours (default: ./scratch/).
    #[arg(long = "tool-base-dir", value_name = "DIR")]
    pub tool_base_dir: Option<PathBuf>,

    /// Pass the simulator an absolute results path instead of prefixing the tool base dir.
    #[arg(long = "absolute-out-file", conflicts_with = "tool_base_dir")]
    pub absolute_out_file: bool,

    /// What to do when a run fails: continue or abort.
    #[arg(long = "on-failure", value_name = "POLICY")]
    pub on_failure: Option<FailurePolicy>,

    /// Extra attempts for a failed run before the failure policy applies.
    #[arg(long)]
    pub retries: Option<u32>,

    /// Kill a run that takes longer than this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the command of every run without launching anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long = "print-config")]
    pub print_config: bool,

    /// Disable colored output.
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Flags given on the command line, as the top configuration layer.
    pub fn overrides(&self) -> ConfigLayer {
        ConfigLayer {
            sweep: SweepLayer {
                hello_intervals: non_empty(&self.hello_intervals),
                mobile_nodes: non_empty(&self.mobile_nodes),
                propagation_ranges: non_empty(&self.propagation_ranges),
                seeds: non_empty(&self.seeds),
                scenario_side: self.scenario_side,
                simulation_time: self.simulation_time,
            },
            launcher: LauncherLayer {
                wrapper: self.wrapper.clone(),
                target: self.target.clone(),
                tool_base_dir: self.tool_base_dir.clone(),
                absolute_out_file: self.absolute_out_file.then_some(true),
                on_failure: self.on_failure,
                retries: self.retries,
                timeout_secs: self.timeout,
            },
            output: OutputLayer {
                results_dir: self.results_dir.clone(),
                animations_dir: self.animations_dir.clone(),
            },
        }
    }
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}
