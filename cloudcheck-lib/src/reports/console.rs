use crate::Result;
use crate::runner::{Report, Status};
use core::fmt::Write;

/// Emit the human summary: one line per control plus aggregate counts and
/// the impact-weighted score.
pub fn generate<W: Write>(report: &Report, writer: &mut W) -> Result<()> {
    writeln!(writer, "Profile: {}", report.profile)?;

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    let mut errored = 0;
    for outcome in &report.outcomes {
        let mark = match outcome.status {
            Status::Pass => {
                passed += 1;
                "✔️"
            }
            Status::Fail => {
                failed += 1;
                "🗙"
            }
            Status::Skip => {
                skipped += 1;
                "-"
            }
            Status::Error => {
                errored += 1;
                "!"
            }
        };

        match &outcome.message {
            Some(message) => writeln!(writer, "  {mark} {}: {message}", outcome.control_id)?,
            None => writeln!(writer, "  {mark} {}", outcome.control_id)?,
        }
    }

    writeln!(writer)?;
    writeln!(writer, "{passed} passed, {failed} failed, {errored} errored, {skipped} skipped")?;
    writeln!(writer, "Score: {:.4}", report.summary_score)?;
    Ok(())
}
