//! Sweep configuration: built-in defaults, optional TOML file, environment
//! overlay and CLI overrides, merged once at startup.

use std::{
    env,
    ffi::OsString,
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SweepError};

pub const CONFIG_FILE_NAME: &str = "simsweep.toml";
const ENV_PREFIX: &str = "SIMSWEEP_";

/// What to do when an external run fails after all retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and move on to the next combination.
    #[default]
    Continue,
    /// Stop the sweep at the first failed combination.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(Self::Continue),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown failure policy '{other}' (expected 'continue' or 'abort')"
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Abort => f.write_str("abort"),
        }
    }
}

/// The swept parameter lists and the two fixed scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepParams {
    /// Hello intervals in milliseconds.
    pub hello_intervals: Vec<u64>,
    pub mobile_nodes: Vec<u32>,
    /// Propagation ranges in meters.
    pub propagation_ranges: Vec<f64>,
    pub seeds: Vec<u32>,
    /// Side of the square scenario area in meters.
    pub scenario_side: f64,
    /// Simulated time in seconds.
    pub simulation_time: f64,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            hello_intervals: vec![5000],
            mobile_nodes: vec![10, 20, 30],
            propagation_ranges: vec![100.0],
            seeds: vec![123456],
            scenario_side: 500.0,
            simulation_time: 20.0,
        }
    }
}

impl SweepParams {
    /// Number of combinations the sweep will produce.
    pub fn combination_count(&self) -> usize {
        self.hello_intervals.len()
            * self.mobile_nodes.len()
            * self.propagation_ranges.len()
            * self.seeds.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Build/run wrapper of the simulator, e.g. `../waf`.
    pub wrapper: String,
    /// Simulator target passed to `--run`.
    pub target: String,
    /// Directory the wrapper resolves `--outFile` from, relative to ours.
    pub tool_base_dir: PathBuf,
    /// Hand the tool an absolute results path instead of prefixing `tool_base_dir`.
    pub absolute_out_file: bool,
    pub on_failure: FailurePolicy,
    /// Extra attempts for a failed combination before the policy applies.
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            wrapper: "../waf".into(),
            target: "DisasterRecovery".into(),
            tool_base_dir: PathBuf::from("./scratch/"),
            absolute_out_file: false,
            on_failure: FailurePolicy::Continue,
            retries: 0,
            timeout_secs: None,
        }
    }
}

impl LauncherConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub results_dir: PathBuf,
    pub animations_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(".Results"),
            animations_dir: PathBuf::from(".Animations"),
        }
    }
}

/// Effective, validated configuration. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub sweep: SweepParams,
    pub launcher: LauncherConfig,
    pub output: OutputConfig,
}

impl SweepConfig {
    /// Merge defaults, config file, environment and `overrides` (highest
    /// precedence), then validate.
    pub fn load(explicit: Option<&Path>, overrides: ConfigLayer) -> Result<Self> {
        Self::load_with_env(explicit, env::vars_os(), overrides)
    }

    /// [`SweepConfig::load`] with the environment supplied by the caller.
    pub fn load_with_env<I>(explicit: Option<&Path>, vars: I, overrides: ConfigLayer) -> Result<Self>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut cfg = Self::default();

        if let Some(path) = locate_config_file(explicit)? {
            debug!(path = %path.display(), "loading config file");
            ConfigLayer::from_file(&path)?.apply_to(&mut cfg);
        }

        env_layer(vars)?.apply_to(&mut cfg);
        overrides.apply_to(&mut cfg);

        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects empty lists and non-positive values before any launch.
    pub fn validate(&self) -> Result<()> {
        let p = &self.sweep;
        non_empty("hello_intervals", &p.hello_intervals)?;
        non_empty("mobile_nodes", &p.mobile_nodes)?;
        non_empty("propagation_ranges", &p.propagation_ranges)?;
        non_empty("seeds", &p.seeds)?;

        if p.hello_intervals.contains(&0) {
            return Err(SweepError::Config("hello_intervals must be > 0".into()));
        }
        if p.mobile_nodes.contains(&0) {
            return Err(SweepError::Config("mobile_nodes must be > 0".into()));
        }
        for &range in &p.propagation_ranges {
            positive("propagation_ranges", range)?;
        }
        positive("scenario_side", p.scenario_side)?;
        positive("simulation_time", p.simulation_time)?;

        if self.launcher.timeout_secs == Some(0) {
            return Err(SweepError::Config("timeout_secs must be > 0".into()));
        }

        if self.launcher.wrapper.trim().is_empty() {
            return Err(SweepError::Config("wrapper must not be empty".into()));
        }
        if self.launcher.target.trim().is_empty() {
            return Err(SweepError::Config("target must not be empty".into()));
        }
        Ok(())
    }
}

fn non_empty<T>(name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(SweepError::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(SweepError::Config(format!(
            "{name} must be a positive finite number, got {value}"
        )));
    }
    Ok(())
}

/// A partial configuration; every field left `None` keeps the lower layer's value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub sweep: SweepLayer,
    pub launcher: LauncherLayer,
    pub output: OutputLayer,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepLayer {
    pub hello_intervals: Option<Vec<u64>>,
    pub mobile_nodes: Option<Vec<u32>>,
    pub propagation_ranges: Option<Vec<f64>>,
    pub seeds: Option<Vec<u32>>,
    pub scenario_side: Option<f64>,
    pub simulation_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LauncherLayer {
    pub wrapper: Option<String>,
    pub target: Option<String>,
    pub tool_base_dir: Option<PathBuf>,
    pub absolute_out_file: Option<bool>,
    pub on_failure: Option<FailurePolicy>,
    pub retries: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputLayer {
    pub results_dir: Option<PathBuf>,
    pub animations_dir: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SweepError::setup(path, e))?;
        Self::from_toml(&text).map_err(|source| SweepError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply_to(self, cfg: &mut SweepConfig) {
        let Self {
            sweep,
            launcher,
            output,
        } = self;

        let p = &mut cfg.sweep;
        set(&mut p.hello_intervals, sweep.hello_intervals);
        set(&mut p.mobile_nodes, sweep.mobile_nodes);
        set(&mut p.propagation_ranges, sweep.propagation_ranges);
        set(&mut p.seeds, sweep.seeds);
        set(&mut p.scenario_side, sweep.scenario_side);
        set(&mut p.simulation_time, sweep.simulation_time);

        let l = &mut cfg.launcher;
        set(&mut l.wrapper, launcher.wrapper);
        set(&mut l.target, launcher.target);
        set(&mut l.tool_base_dir, launcher.tool_base_dir);
        set(&mut l.absolute_out_file, launcher.absolute_out_file);
        set(&mut l.on_failure, launcher.on_failure);
        set(&mut l.retries, launcher.retries);
        if launcher.timeout_secs.is_some() {
            l.timeout_secs = launcher.timeout_secs;
        }

        let o = &mut cfg.output;
        set(&mut o.results_dir, output.results_dir);
        set(&mut o.animations_dir, output.animations_dir);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Build a layer from `SIMSWEEP_*` variables; unrelated keys, including
/// ones that are not valid UTF-8, are ignored.
pub fn env_layer<I>(vars: I) -> Result<ConfigLayer>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut layer = ConfigLayer::default();
    for (key, value) in vars {
        let Some(key) = key.to_str() else {
            continue;
        };
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        if name == "TOOL_BASE_DIR" {
            layer.launcher.tool_base_dir = Some(PathBuf::from(value));
            continue;
        }
        let text = || {
            value
                .to_str()
                .map(str::to_owned)
                .ok_or_else(|| SweepError::Config(format!("{key} is not valid UTF-8")))
        };
        match name {
            "WRAPPER" => layer.launcher.wrapper = Some(text()?),
            "TARGET" => layer.launcher.target = Some(text()?),
            "ON_FAILURE" => {
                let policy = text()?
                    .parse::<FailurePolicy>()
                    .map_err(|e| SweepError::Config(format!("{key}: {e}")))?;
                layer.launcher.on_failure = Some(policy);
            }
            _ => {}
        }
    }
    Ok(layer)
}

fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(SweepError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Ok(Some(local));
    }
    Ok(default_config_path().filter(|p| p.is_file()))
}

fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|b| b.config_dir().join("simsweep").join(CONFIG_FILE_NAME))
}
