use super::Host;
use super::common::{LogLevel, init_logging, parse_inputs};
use crate::Result;
use crate::profile::ProfileDoc;
use crate::reports::{generate_console, generate_json};
use crate::resource::InventoryProvider;
use crate::runner::{RunOptions, run};
use camino::Utf8PathBuf;
use clap::Parser;
use core::time::Duration;
use std::io::Write;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the profile to evaluate
    #[arg(long, short = 'p', value_name = "PATH")]
    pub profile: Utf8PathBuf,

    /// Path to the resource inventory backing the provider
    #[arg(long, value_name = "PATH")]
    pub inventory: Utf8PathBuf,

    /// Input overrides as name=value, repeatable
    #[arg(long, short = 'i', value_name = "NAME=VALUE")]
    pub input: Vec<String>,

    /// Run deadline in seconds; controls still in flight become errors
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Maximum controls evaluated concurrently
    #[arg(long, value_name = "N", default_value_t = 4)]
    pub concurrency: usize,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

/// Evaluate a profile and emit the report: JSON to standard output, human
/// summary to standard error. Exits 1 when any control fails or errors.
pub async fn run_profile<H: Host>(host: &mut H, args: &RunArgs) -> Result<()> {
    init_logging(args.log_level);

    let inputs = parse_inputs(&args.input)?;
    let profile = ProfileDoc::load(&args.profile)?.bind(&inputs)?;
    let provider = InventoryProvider::load(&args.inventory)?;

    let options = RunOptions {
        concurrency: args.concurrency,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let report = run(&profile, Arc::new(provider), &options).await;

    let mut json = String::new();
    generate_json(&report, &mut json)?;
    let _ = write!(host.output(), "{json}");

    let mut summary = String::new();
    generate_console(&report, &mut summary)?;
    let _ = write!(host.error(), "{summary}");

    if !report.clean() {
        host.exit(1);
    }
    Ok(())
}
