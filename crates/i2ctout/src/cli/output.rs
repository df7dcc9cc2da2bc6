//! Result formatting.

use crate::error::Result;
use crate::run::Outcome;

/// Render `outcome` as the single line printed on success.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(outcome: &Outcome, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(&outcome.report())?)
    } else {
        Ok(format!("OK {}.TOUT = {}", outcome.register, outcome.tout))
    }
}
