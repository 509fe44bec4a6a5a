use super::Host;
use crate::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

/// A commented starter profile demonstrating inputs, templates, predicate
/// kinds, `only_if`, and `absent`.
const SAMPLE_PROFILE: &str = include_str!("sample_profile.toml");

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output profile path
    #[arg(value_name = "PATH", default_value = "profile.toml")]
    pub output: Utf8PathBuf,
}

pub fn init_profile<H: Host>(host: &mut H, args: &InitArgs) -> Result<()> {
    fs::write(&args.output, SAMPLE_PROFILE).into_app_err_with(|| format!("unable to write profile '{}'", args.output))?;
    let _ = writeln!(host.output(), "Generated sample profile: {}", args.output);
    Ok(())
}
