//! Filter application: UI interaction first, direct URL navigation second.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::{info, warn};

use crate::core::config::{ScoutConfig, StepTimeouts};
use crate::core::types::ScrapeError;
use crate::scraping::browser_manager::{is_visible, wait_for_visible, wait_until_stable};
use crate::scraping::dropdown::select_option_by_index;
use crate::scraping::session::CareersSession;

const FILTER_BOX_SELECTOR: &str = "div.filter-box";
const DEPARTMENT_BUTTON_SELECTOR: &str = r#"button[data-id="filter_dep"]"#;
const JOB_CONTAINER_SELECTOR: &str = "div.all_jobs";
const JOB_SELECTOR: &str = "div.job";
const NO_JOB_SELECTOR: &str = "div.nojob";

// Spaces and reserved query characters; matches how the page itself encodes
// its filter links ("CA ON - Toronto" → "CA%20ON%20-%20Toronto").
const QUERY_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'&')
    .add(b'=')
    .add(b'+');

/// One dropdown to drive: which control, which ordinal option, and the label
/// we expect to find there (advisory, see `select_option_by_index`).
#[derive(Debug, Clone)]
pub struct FilterSelection {
    pub control_id: &'static str,
    pub option_index: usize,
    pub expected_label: &'static str,
}

/// The three filters this page exposes, with the production selection baked in.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    pub department: FilterSelection,
    pub office: FilterSelection,
    pub employment_type: FilterSelection,
}

impl Default for FilterPlan {
    fn default() -> Self {
        Self {
            department: FilterSelection {
                control_id: "filter_dep",
                option_index: 0,
                expected_label: "All Departments",
            },
            office: FilterSelection {
                control_id: "filter_office",
                option_index: 1,
                expected_label: "CA ON - Toronto",
            },
            employment_type: FilterSelection {
                control_id: "filter_emp_type",
                option_index: 1,
                expected_label: "Full-time",
            },
        }
    }
}

impl FilterPlan {
    fn selections(&self) -> [&FilterSelection; 3] {
        [&self.department, &self.office, &self.employment_type]
    }
}

/// Build the pre-filtered URL used by the direct-navigation fallback.
/// Department is absent on purpose: "All Departments" is the page default.
pub fn direct_filtered_url(careers_url: &str, plan: &FilterPlan) -> String {
    let base = careers_url.trim_end_matches('?');
    format!(
        "{}?office={}&emp_type={}",
        base,
        utf8_percent_encode(plan.office.expected_label, QUERY_SET),
        utf8_percent_encode(plan.employment_type.expected_label, QUERY_SET),
    )
}

/// Wait for the job container, then insist on either visible job entries or an
/// explicit no-jobs indicator. Neither appearing is a hard failure: an empty
/// list must never be reported silently.
///
/// Returns `true` when job entries are present.
async fn verify_listings(
    session: &CareersSession,
    timeouts: &StepTimeouts,
) -> Result<bool, ScrapeError> {
    let page = session.page();
    wait_for_visible(page, JOB_CONTAINER_SELECTOR, timeouts.job_list_ms).await?;
    wait_until_stable(page, 1_000, timeouts.network_idle_ms).await;

    match wait_for_visible(page, JOB_SELECTOR, timeouts.job_list_ms).await {
        Ok(()) => Ok(true),
        Err(_) => {
            if is_visible(page, NO_JOB_SELECTOR).await {
                info!("No job listings found for the applied filters.");
                Ok(false)
            } else {
                Err(ScrapeError::ListingsNeverSettled)
            }
        }
    }
}

async fn apply_via_ui(
    session: &CareersSession,
    plan: &FilterPlan,
    timeouts: &StepTimeouts,
) -> Result<bool, ScrapeError> {
    let page = session.page();

    wait_for_visible(page, FILTER_BOX_SELECTOR, timeouts.filter_box_ms).await?;
    info!("Filter box is visible. Now waiting for specific filter buttons.");
    wait_for_visible(page, DEPARTMENT_BUTTON_SELECTOR, timeouts.filter_box_ms).await?;
    info!("Department filter button is visible.");

    for selection in plan.selections() {
        select_option_by_index(
            page,
            selection.control_id,
            selection.option_index,
            Some(selection.expected_label),
            timeouts,
        )
        .await?;
    }

    info!("Filters applied via UI. Waiting for job listings to update...");
    verify_listings(session, timeouts).await
}

async fn apply_via_direct_url(
    session: &CareersSession,
    cfg: &ScoutConfig,
    plan: &FilterPlan,
    timeouts: &StepTimeouts,
) -> Result<bool, ScrapeError> {
    let url = cfg
        .resolve_fallback_url()
        .unwrap_or_else(|| direct_filtered_url(&cfg.resolve_careers_url(), plan));

    info!("Navigating directly to: {}", url);
    session.navigate(&url, timeouts).await?;
    verify_listings(session, timeouts).await
}

/// Apply the filter plan: UI interaction first, and when that dies anywhere
/// along the chain, one direct navigation to the pre-filtered URL. Both
/// failing is run-fatal.
///
/// Returns `true` when job entries are visible afterwards (`false` means the
/// filters applied cleanly but matched nothing).
pub async fn apply_filters(
    session: &CareersSession,
    cfg: &ScoutConfig,
    plan: &FilterPlan,
    timeouts: &StepTimeouts,
) -> Result<bool, ScrapeError> {
    info!("--- Attempting Method A: Apply Filters via UI Interaction ---");
    match apply_via_ui(session, plan, timeouts).await {
        Ok(has_jobs) => {
            info!("Job listings updated via UI and ready for scraping.");
            return Ok(has_jobs);
        }
        Err(e) => {
            warn!("Method A (UI interaction) failed: {}", e);
        }
    }

    info!("--- Attempting Method B: Direct URL Navigation (Fallback) ---");
    match apply_via_direct_url(session, cfg, plan, timeouts).await {
        Ok(has_jobs) => {
            info!("Direct URL: job listings ready for scraping.");
            Ok(has_jobs)
        }
        Err(e) => {
            warn!("Method B (Direct URL Navigation) failed: {}", e);
            Err(ScrapeError::FiltersFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_matches_production_filters() {
        let plan = FilterPlan::default();
        assert_eq!(plan.department.control_id, "filter_dep");
        assert_eq!(plan.department.option_index, 0);
        assert_eq!(plan.office.option_index, 1);
        assert_eq!(plan.office.expected_label, "CA ON - Toronto");
        assert_eq!(plan.employment_type.expected_label, "Full-time");
    }

    #[test]
    fn direct_url_encodes_filter_labels() {
        let url = direct_filtered_url("https://icapital.com/careers/", &FilterPlan::default());
        assert_eq!(
            url,
            "https://icapital.com/careers/?office=CA%20ON%20-%20Toronto&emp_type=Full-time"
        );
    }
}
