use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use panelkit::cli::{CliArgs, OutputFormat};
use panelkit::script::Scenario;

fn main() -> Result<()> {
    panelkit::tracing::init();

    let args = CliArgs::parse();
    let config = args.load_config();

    let source = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read scenario {}", args.script.display()))?;
    let scenario = Scenario::from_yaml(&source)
        .with_context(|| format!("Failed to parse scenario {}", args.script.display()))?;

    tracing::info!(
        "Running {} ({} panels, {} steps)",
        args.script.display(),
        scenario.panels.len(),
        scenario.steps.len()
    );
    let report = scenario.run(&config);

    if args.quiet {
        print(&report.snapshot, args.output_format())
    } else {
        print(&report, args.output_format())
    }
}

fn print<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize report as JSON")?
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).context("Failed to serialize report as YAML")?
        }
    };
    println!("{}", output);
    Ok(())
}

