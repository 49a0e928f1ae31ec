//! External simulator invocation: command construction, results path
//! translation and the process launcher.

use std::{
    borrow::Cow,
    env, fmt, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use tokio::{process::Command, time::timeout};
use tracing::debug;

use crate::{config::LauncherConfig, sweep::Combination};

/// How the orchestrator's results path is handed to the simulator, which
/// resolves relative paths from its own working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathTranslation {
    /// Join the path onto the tool's base directory (e.g. `./scratch/`).
    Prefix(PathBuf),
    /// Resolve the path against our working directory.
    Absolute,
}

impl PathTranslation {
    pub fn from_config(launcher: &LauncherConfig) -> Self {
        if launcher.absolute_out_file {
            Self::Absolute
        } else {
            Self::Prefix(launcher.tool_base_dir.clone())
        }
    }

    pub fn translate(&self, path: &Path) -> io::Result<PathBuf> {
        match self {
            Self::Prefix(base) => Ok(base.join(path)),
            Self::Absolute if path.is_absolute() => Ok(path.to_path_buf()),
            Self::Absolute => Ok(env::current_dir()?.join(path)),
        }
    }
}

/// A fully rendered wrapper call: `<program> --run "<target> --flag=value ..."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn build(launcher: &LauncherConfig, combo: &Combination, out_file: &Path) -> Self {
        let run = format!(
            "{} --helloInterval={} --mobileNodes={} --outFile={} --propagationRange={} --rngSeed={} --scenarioSide={} --simulationTime={}",
            launcher.target,
            combo.hello_interval,
            combo.mobile_nodes,
            shell_quote(&out_file.display().to_string()),
            combo.propagation_range,
            combo.seed,
            combo.scenario_side,
            combo.simulation_time,
        );
        Self {
            program: launcher.wrapper.clone(),
            args: vec!["--run".into(), run],
        }
    }
}

/// The wrapper splits the `--run` string shell-style, so a value holding
/// whitespace, quotes or backslashes is wrapped in single quotes.
fn shell_quote(value: &str) -> Cow<'_, str> {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if plain {
        return Cow::Borrowed(value);
    }
    Cow::Owned(format!("'{}'", value.replace('\'', r"'\''")))
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Result of one external run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    Exited { code: i32 },
    /// Terminated by a signal, no exit code.
    Killed,
    TimedOut { after_ms: u64 },
    LaunchFailed { reason: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Exited { code } => write!(f, "exited with status {code}"),
            Self::Killed => f.write_str("terminated by signal"),
            Self::TimedOut { after_ms } => write!(f, "timed out after {after_ms} ms"),
            Self::LaunchFailed { reason } => write!(f, "could not be launched: {reason}"),
        }
    }
}

/// Runs one invocation to completion.
#[allow(async_fn_in_trait)]
pub trait Launcher {
    async fn launch(&mut self, invocation: &Invocation) -> RunOutcome;
}

/// Spawns the wrapper as a child process with inherited stdio and waits for it.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn from_config(launcher: &LauncherConfig) -> Self {
        Self::new(launcher.timeout())
    }
}

impl Launcher for ProcessLauncher {
    async fn launch(&mut self, invocation: &Invocation) -> RunOutcome {
        debug!(program = %invocation.program, args = ?invocation.args, "spawning");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RunOutcome::LaunchFailed {
                    reason: format!("{}: {}", invocation.program, e),
                }
            }
        };

        let status = match self.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let _ = child.kill().await;
                    return RunOutcome::TimedOut {
                        after_ms: limit.as_millis() as u64,
                    };
                }
            },
            None => child.wait().await,
        };

        match status {
            Ok(s) if s.success() => RunOutcome::Succeeded,
            Ok(s) => match s.code() {
                Some(code) => RunOutcome::Exited { code },
                None => RunOutcome::Killed,
            },
            Err(e) => RunOutcome::LaunchFailed {
                reason: format!("waiting on {}: {}", invocation.program, e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SweepParams, sweep::combinations};

    fn first_combo() -> Combination {
        combinations(&SweepParams::default()).next().unwrap()
    }

    #[test]
    fn prefix_translation_reproduces_scratch_path() {
        let t = PathTranslation::from_config(&LauncherConfig::default());
        let out = t
            .translate(Path::new(".Results/Simulation20240307_120000.csv"))
            .unwrap();
        assert_eq!(out, PathBuf::from("./scratch/.Results/Simulation20240307_120000.csv"));
    }

    #[test]
    fn absolute_translation_resolves_against_cwd() {
        let launcher = LauncherConfig {
            absolute_out_file: true,
            ..LauncherConfig::default()
        };
        let t = PathTranslation::from_config(&launcher);
        assert_eq!(t, PathTranslation::Absolute);
        let out = t.translate(Path::new(".Results/a.csv")).unwrap();
        assert!(out.is_absolute());
        assert!(out.ends_with(".Results/a.csv"));
    }

    #[test]
    fn run_argument_keeps_flag_contract() {
        let inv = Invocation::build(
            &LauncherConfig::default(),
            &first_combo(),
            Path::new("./scratch/.Results/Simulation20240307_120000.csv"),
        );
        assert_eq!(inv.program, "../waf");
        assert_eq!(
            inv.args,
            vec![
                "--run".to_string(),
                "DisasterRecovery --helloInterval=5000 --mobileNodes=10 --outFile=./scratch/.Results/Simulation20240307_120000.csv --propagationRange=100 --rngSeed=123456 --scenarioSide=500 --simulationTime=20".to_string(),
            ]
        );
    }

    #[test]
    fn fractional_values_are_not_rounded() {
        let mut combo = first_combo();
        combo.propagation_range = 87.5;
        combo.simulation_time = 0.25;
        let inv = Invocation::build(&LauncherConfig::default(), &combo, Path::new("r.csv"));
        assert!(inv.args[1].contains("--propagationRange=87.5 "));
        assert!(inv.args[1].ends_with("--simulationTime=0.25"));
    }

    #[test]
    fn out_file_with_spaces_stays_one_token() {
        let inv = Invocation::build(
            &LauncherConfig::default(),
            &first_combo(),
            Path::new("/home/me/ns 3/scratch/.Results/S.csv"),
        );
        assert!(inv.args[1].contains(" --outFile='/home/me/ns 3/scratch/.Results/S.csv' "));
        let outside_quotes: String = inv.args[1].split('\'').step_by(2).collect();
        assert_eq!(outside_quotes.split_whitespace().count(), 8);
    }

    #[test]
    fn single_quotes_in_out_file_are_escaped() {
        assert_eq!(shell_quote("a.csv"), "a.csv");
        assert_eq!(shell_quote("it's.csv"), r"'it'\''s.csv'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn display_quotes_the_run_argument() {
        let inv = Invocation {
            program: "../waf".into(),
            args: vec!["--run".into(), "DisasterRecovery --mobileNodes=10".into()],
        };
        assert_eq!(inv.to_string(), "../waf --run \"DisasterRecovery --mobileNodes=10\"");
    }

    #[test]
    fn only_success_counts_as_success() {
        assert!(RunOutcome::Succeeded.is_success());
        assert!(!RunOutcome::Exited { code: 1 }.is_success());
        assert!(!RunOutcome::TimedOut { after_ms: 10 }.is_success());
        assert_eq!(
            RunOutcome::Exited { code: 3 }.to_string(),
            "exited with status 3"
        );
    }
}
