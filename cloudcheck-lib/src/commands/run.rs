//! Command dispatch logic for cloudcheck

use super::{InitArgs, RunArgs, ValidateArgs, init_profile, run_profile, validate_profile};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "cloudcheck", version, author, long_about = None)]
#[command(about = "Evaluate compliance controls against cloud infrastructure")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: CloudcheckSubcommand,
}

#[derive(Subcommand, Debug)]
enum CloudcheckSubcommand {
    /// Evaluate a profile and emit the report
    Run(Box<RunArgs>),
    /// Load and bind a profile without running it
    Validate(ValidateArgs),
    /// Generate a commented sample profile
    Init(InitArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// Parses the command-line arguments and executes the corresponding
/// subcommand. Designed to be called from main.rs with the program
/// arguments.
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);

    match &cli.command {
        CloudcheckSubcommand::Run(run_args) => run_profile(host, run_args).await,
        CloudcheckSubcommand::Validate(validate_args) => validate_profile(host, validate_args),
        CloudcheckSubcommand::Init(init_args) => init_profile(host, init_args),
    }
}
