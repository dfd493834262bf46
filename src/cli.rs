//! Command-line argument parsing for the scenario runner
//!
//! Supports:
//! - Running a YAML scenario script
//! - Overriding the config file
//! - JSON or YAML snapshot output

use clap::Parser;
use std::path::PathBuf;

use crate::config::PanelConfig;

/// Run panel manager scenarios against a headless render tree
#[derive(Parser, Debug)]
#[command(
    name = "panelkit",
    version,
    about = "Run panel manager scenarios against a headless render tree"
)]
pub struct CliArgs {
    /// Scenario script to run (YAML)
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Config file to use instead of ~/.config/panelkit/config.yaml
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON instead of YAML
    #[arg(long)]
    pub json: bool,

    /// Only print the final snapshot, without the hook journal and events
    #[arg(short, long)]
    pub quiet: bool,
}

/// How the report is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl CliArgs {
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Yaml
        }
    }

    /// Config from `--config` when given, else the user config file
    pub fn load_config(&self) -> PanelConfig {
        match &self.config {
            Some(path) => PanelConfig::load_from(path),
            None => PanelConfig::load(),
        }
    }
}
