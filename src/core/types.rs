use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One visible posting scraped from the careers page.
///
/// Field names mirror the exported JSON contract consumed downstream;
/// do not rename without bumping the output format.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JobRecord {
    #[serde(rename = "Job title")]
    pub title: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Role description")]
    pub description: String,
}

impl JobRecord {
    /// Placeholder record emitted when a single posting fails to extract.
    /// The run continues; the error travels in the description field.
    pub fn extraction_failure(reason: &str) -> Self {
        Self {
            title: "Error: Could not extract".to_string(),
            location: "Error: Could not extract".to_string(),
            description: format!("Error: {}", reason),
        }
    }
}

/// Run-fatal outcome, serialized as `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RunFailure {
    pub error: String,
}

/// Final output of one run: either the full job list or a single error object.
/// `untagged` keeps the wire shape identical to the historical exporter.
#[derive(Debug, Serialize, Clone)]
#[serde(untagged)]
pub enum RunOutcome {
    Jobs(Vec<JobRecord>),
    Failure(RunFailure),
}

impl RunOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(RunFailure {
            error: message.into(),
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Everything that can sink a step of the scrape.
///
/// Only two severities exist at the run level: fatal (page load, both filter
/// strategies dead) and per-record (handled inside extraction). Everything
/// else is caught at the nearest step and feeds the next fallback tier.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No browser found. Install Brave, Chrome, or Chromium. Set CHROME_EXECUTABLE if installed in a non-standard location.")]
    NoBrowser,

    #[error("Failed to launch browser ({exe}): {reason}")]
    BrowserLaunch { exe: String, reason: String },

    #[error("Failed to load page: {0}")]
    PageLoad(String),

    #[error("Option index {0} is outside the allowed range of 0 to 99")]
    OptionIndexOutOfRange(usize),

    #[error("Option index {index} out of bounds for '{select_id}' dropdown (has {count} options)")]
    OptionOutOfBounds {
        select_id: String,
        index: usize,
        count: usize,
    },

    #[error("All click methods failed for '{0}' dropdown button")]
    AllClickMethodsFailed(String),

    #[error("Dropdown for '{select_id}' did not open after button click: {reason}")]
    DropdownNeverOpened { select_id: String, reason: String },

    #[error("Failed to select option at index {index} for '{select_id}': {reason}")]
    OptionSelect {
        select_id: String,
        index: usize,
        reason: String,
    },

    #[error("Timed out after {waited_ms}ms waiting for '{selector}'")]
    WaitTimeout { selector: String, waited_ms: u64 },

    #[error("Job list never settled: neither job entries nor a no-jobs indicator appeared")]
    ListingsNeverSettled,

    #[error("Failed to apply filters using any method (UI or Direct URL). Last error: {0}")]
    FiltersFailed(String),

    #[error("CDP error: {0}")]
    Cdp(String),
}

impl ScrapeError {
    /// Wrap a chromiumoxide error at a step boundary.
    pub fn cdp(e: impl std::fmt::Display) -> Self {
        Self::Cdp(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_record_uses_export_field_names() {
        let record = JobRecord {
            title: "Platform Engineer".into(),
            location: "Toronto, ON".into(),
            description: "Builds things.".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Job title"], "Platform Engineer");
        assert_eq!(json["Location"], "Toronto, ON");
        assert_eq!(json["Role description"], "Builds things.");
    }

    #[test]
    fn outcome_serializes_as_list_or_error_object() {
        let ok = RunOutcome::Jobs(vec![JobRecord {
            title: "A".into(),
            location: "B".into(),
            description: "C".into(),
        }]);
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.is_array());
        assert_eq!(json.as_array().unwrap().len(), 1);

        let bad = RunOutcome::failure("Failed to load page: boom");
        let json = serde_json::to_value(&bad).unwrap();
        assert!(json.is_object());
        assert_eq!(json["error"], "Failed to load page: boom");
    }

    #[test]
    fn extraction_failure_record_carries_reason() {
        let record = JobRecord::extraction_failure("toggle detached");
        assert_eq!(record.title, "Error: Could not extract");
        assert_eq!(record.description, "Error: toggle detached");
    }
}
