//! JSON report rendering and the file side effect.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::core::types::RunOutcome;

/// Render the outcome as indented UTF-8 JSON: a record list on success, a
/// single `{"error": ...}` object on a fatal run.
pub fn render_outcome(outcome: &RunOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("serializing run outcome")
}

/// Write the rendered report. The caller also prints it to stdout.
pub fn write_report(path: &Path, json: &str) -> Result<()> {
    std::fs::write(path, json)
        .with_context(|| format!("writing report to {}", path.display()))?;
    info!("Data saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{JobRecord, RunOutcome};

    #[test]
    fn report_is_indented_json() {
        let outcome = RunOutcome::Jobs(vec![JobRecord {
            title: "Analyst".into(),
            location: "Toronto, ON".into(),
            description: "Numbers.".into(),
        }]);
        let json = render_outcome(&outcome).unwrap();
        assert!(json.starts_with("[\n"));
        assert!(json.contains("\"Job title\": \"Analyst\""));
    }

    #[test]
    fn report_lands_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        let json = render_outcome(&RunOutcome::failure("nope")).unwrap();
        write_report(&path, &json).unwrap();

        let round_trip = std::fs::read_to_string(&path).unwrap();
        assert_eq!(round_trip, json);
        let value: serde_json::Value = serde_json::from_str(&round_trip).unwrap();
        assert_eq!(value["error"], "nope");
    }
}
