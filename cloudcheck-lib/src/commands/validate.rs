use super::Host;
use super::common::parse_inputs;
use crate::Result;
use crate::profile::ProfileDoc;
use camino::Utf8PathBuf;
use clap::Parser;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the profile to validate
    #[arg(long, short = 'p', value_name = "PATH")]
    pub profile: Utf8PathBuf,

    /// Input overrides as name=value, repeatable
    #[arg(long, short = 'i', value_name = "NAME=VALUE")]
    pub input: Vec<String>,
}

/// Load and bind a profile without running it: parse errors, unknown
/// version, unbound inputs, duplicate control ids, out-of-range impacts,
/// and malformed predicates all surface here.
pub fn validate_profile<H: Host>(host: &mut H, args: &ValidateArgs) -> Result<()> {
    let result = parse_inputs(&args.input).and_then(|inputs| ProfileDoc::load(&args.profile)?.bind(&inputs));

    match result {
        Ok(profile) => {
            let _ = writeln!(
                host.output(),
                "Profile '{}' is valid: {} controls, {} inputs bound",
                profile.name,
                profile.controls.len(),
                profile.inputs.len()
            );
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "Profile validation failed: {e}");
            host.exit(1);
            Err(e)
        }
    }
}
