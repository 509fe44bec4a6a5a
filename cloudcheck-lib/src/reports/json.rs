use crate::Result;
use crate::runner::Report;
use core::fmt::Write;

/// Emit the machine-readable report. Outcomes are already sorted by control
/// id, so two runs against identical infrastructure differ only in
/// `generated_at`.
pub fn generate<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(report)?)?;
    Ok(())
}
