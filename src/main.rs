use anyhow::{Context, Result};
use chrono::Local;
use simsweep::{
    cli::Cli,
    config::SweepConfig,
    invoke::ProcessLauncher,
    orchestrator,
    printer::TextPrinter,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simsweep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = SweepConfig::load(args.config.as_deref(), args.overrides())
        .context("loading sweep configuration")?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let printer = TextPrinter::detect(args.no_color);
    let started_at = Local::now().naive_local();

    if args.dry_run {
        for invocation in orchestrator::plan(&cfg, started_at)? {
            printer.command(&invocation);
        }
        return Ok(());
    }

    let mut launcher = ProcessLauncher::from_config(&cfg.launcher);
    let report = orchestrator::run_sweep(&cfg, &mut launcher, &printer, started_at)
        .await
        .context("preparing sweep outputs")?;
    printer.summary(&report);

    if let Some(err) = report.abort_error() {
        return Err(err.into());
    }
    Ok(())
}
