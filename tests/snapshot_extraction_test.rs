//! End-to-end checks over a captured-page snapshot: parsing, normalization,
//! and the JSON output contract, without needing a live browser.

use career_scout::extract::{parse_visible_jobs, DESC_PLACEHOLDER_MISSING};
use career_scout::filters::{direct_filtered_url, FilterPlan};
use career_scout::output::render_outcome;
use career_scout::types::RunOutcome;

/// Markup shaped like the real careers page after filtering: a filter box,
/// the all_jobs container, and a mix of visible/hidden job nodes.
const FILTERED_PAGE: &str = r##"<!DOCTYPE html>
<html><body>
<div class="filter-box">
  <button data-id="filter_dep" class="btn dropdown-toggle" title="All Departments"></button>
  <button data-id="filter_office" class="btn dropdown-toggle" title="CA ON - Toronto"></button>
  <button data-id="filter_emp_type" class="btn dropdown-toggle" title="Full-time"></button>
</div>
<div class="all_jobs">
  <div class="job">
    <h2 class="job_title">Senior Software Engineer</h2>
    <div class="display_location">Location:   Toronto,  ON</div>
    <a class="job_read_full" href="#">Read Full Description</a>
    <div class="job_description">
      <div class="display_description">
        Design and ship services.
        Partner with product teams.
      </div>
    </div>
  </div>
  <div class="job" style="display: none">
    <h2 class="job_title">Filtered Out Role</h2>
    <div class="display_location">Location: New York, NY</div>
  </div>
  <div class="job">
    <h2 class="job_title">Fund Accountant</h2>
    <div class="display_location">Location: Toronto, ON</div>
  </div>
</div>
</body></html>"##;

#[test]
fn snapshot_extraction_matches_visible_dom_order() {
    let records = parse_visible_jobs(FILTERED_PAGE);

    assert_eq!(records.len(), 2, "hidden job node must not be counted");

    assert_eq!(records[0].title, "Senior Software Engineer");
    assert_eq!(records[0].location, "Toronto, ON");
    assert_eq!(
        records[0].description,
        "Design and ship services. Partner with product teams."
    );

    assert_eq!(records[1].title, "Fund Accountant");
    assert_eq!(records[1].description, DESC_PLACEHOLDER_MISSING);
}

#[test]
fn success_report_round_trips_with_exported_field_names() {
    let records = parse_visible_jobs(FILTERED_PAGE);
    let json = render_outcome(&RunOutcome::Jobs(records)).unwrap();

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let list = value.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["Job title"], "Senior Software Engineer");
    assert_eq!(list[0]["Location"], "Toronto, ON");
    assert!(list[1]["Role description"]
        .as_str()
        .unwrap()
        .starts_with("N/A"));
}

#[test]
fn fatal_run_reports_error_object_not_empty_list() {
    let outcome = RunOutcome::failure(
        "Failed to apply filters using any method (UI or Direct URL). Last error: \
         Job list never settled: neither job entries nor a no-jobs indicator appeared",
    );
    let json = render_outcome(&outcome).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert!(value.is_object(), "fatal runs must not serialize as a list");
    assert!(value["error"].as_str().unwrap().contains("UI or Direct URL"));
}

#[test]
fn fallback_url_matches_the_page_link_encoding() {
    let url = direct_filtered_url("https://icapital.com/careers/", &FilterPlan::default());
    assert_eq!(
        url,
        "https://icapital.com/careers/?office=CA%20ON%20-%20Toronto&emp_type=Full-time"
    );
}

#[test]
fn page_with_no_job_markup_yields_no_records() {
    let html = r#"<html><body><div class="all_jobs"><div class="nojob">No jobs found.</div></div></body></html>"#;
    assert!(parse_visible_jobs(html).is_empty());
}
