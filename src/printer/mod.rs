//! Console output: per-run banner, dry-run command lines, sweep summary.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::{invoke::Invocation, orchestrator::SweepReport, sweep::Combination};

pub struct TextPrinter {
    pub color: bool,
}

impl TextPrinter {
    /// Color only when stdout is a terminal and the user did not opt out.
    pub fn detect(no_color: bool) -> Self {
        Self {
            color: !no_color && std::io::stdout().is_terminal(),
        }
    }

    pub fn banner(&self, combo: &Combination) {
        println!("{}", self.render_banner(combo));
    }

    pub fn render_banner(&self, combo: &Combination) -> String {
        let rows = [
            ("Hello Granularity (Milliseconds)", combo.hello_interval.to_string()),
            ("Number of Nodes", combo.mobile_nodes.to_string()),
            ("Propagation Range (Meters)", combo.propagation_range.to_string()),
            ("Scenario Side Length (Meters)", combo.scenario_side.to_string()),
            ("Seed", combo.seed.to_string()),
        ];

        let title = format!("Run {}/{}", combo.index, combo.total);
        let mut out = String::from("\n");
        if self.color {
            out.push_str(&format!("{}\n", title.magenta()));
        } else {
            out.push_str(&format!("{title}\n"));
        }
        for (label, value) in rows {
            if self.color {
                out.push_str(&format!("{}: {}\n", label.cyan(), value));
            } else {
                out.push_str(&format!("{label}: {value}\n"));
            }
        }
        out
    }

    pub fn command(&self, invocation: &Invocation) {
        if self.color {
            println!("{}", invocation.to_string().green());
        } else {
            println!("{invocation}");
        }
    }

    pub fn summary(&self, report: &SweepReport) {
        let line = format!(
            "{} of {} runs succeeded, {} failed{}",
            report.succeeded(),
            report.total,
            report.failed(),
            if report.aborted { " (aborted)" } else { "" }
        );
        let results = format!("Results: {}", report.results_file.display());
        if !self.color {
            println!("\n{line}\n{results}");
        } else if report.failed() == 0 {
            println!("\n{}\n{}", line.green(), results);
        } else {
            println!("\n{}\n{}", line.yellow(), results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SweepParams, sweep::combinations};

    #[test]
    fn plain_banner_lists_parameters() {
        let combo = combinations(&SweepParams::default()).nth(1).unwrap();
        let text = TextPrinter { color: false }.render_banner(&combo);
        assert_eq!(
            text,
            "\nRun 2/3\n\
             Hello Granularity (Milliseconds): 5000\n\
             Number of Nodes: 20\n\
             Propagation Range (Meters): 100\n\
             Scenario Side Length (Meters): 500\n\
             Seed: 123456\n"
        );
    }
}
