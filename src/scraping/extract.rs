//! Job record extraction.
//!
//! Two layers: a live pass that walks the rendered `div.job` nodes over CDP
//! (clicking "read more" toggles to surface full descriptions), and a pure
//! snapshot layer that parses captured HTML with the `scraper` crate. The
//! pure layer does the text work so it stays testable without a browser.

use chromiumoxide::element::Element;
use chromiumoxide::Page;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::StepTimeouts;
use crate::core::types::{JobRecord, ScrapeError};
use crate::scraping::browser_manager::{element_enabled, element_outer_html, element_visible};

const JOB_SELECTOR: &str = "div.job";
const TITLE_SELECTOR: &str = "h2.job_title";
const LOCATION_SELECTOR: &str = "div.display_location";
const READ_MORE_SELECTOR: &str = "a.job_read_full";
const DESCRIPTION_SELECTOR: &str = "div.job_description div.display_description";

pub const DESC_PLACEHOLDER_MISSING: &str = "N/A (Could not extract or link not found)";
pub const DESC_PLACEHOLDER_ERROR: &str = "N/A (Error extracting full description)";

// ── Pure text helpers ────────────────────────────────────────────────────────

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s.trim(), " ").trim().to_string()
}

/// Strip the `Location:` label the page prepends and collapse whitespace.
/// `"Location: Toronto,  ON"` → `"Toronto, ON"`.
pub fn normalize_location(raw: &str) -> String {
    collapse_whitespace(&raw.replacen("Location:", "", 1))
}

// ── Snapshot parsing (scraper crate) ─────────────────────────────────────────

/// Fields readable from one job node's HTML without any interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNodeFields {
    pub title: String,
    pub location: String,
    /// Description text, only when the panel is present and not inline-hidden.
    pub visible_description: Option<String>,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid css selector")
}

fn node_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Inline-hidden check for snapshot HTML. Rendered visibility was already
/// settled by the live pass; captured markup only carries inline styles.
fn node_hidden(el: ElementRef<'_>) -> bool {
    el.value()
        .attr("style")
        .map(|s| {
            let s = s.replace(' ', "");
            s.contains("display:none") || s.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

/// Parse title/location/description out of a single job node's outer HTML.
/// Returns `None` when the title or location node is missing entirely.
pub fn parse_job_fields(html: &str) -> Option<JobNodeFields> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();

    let title = root.select(&selector(TITLE_SELECTOR)).next()?;
    let location = root.select(&selector(LOCATION_SELECTOR)).next()?;

    let visible_description = root
        .select(&selector(DESCRIPTION_SELECTOR))
        .find(|el| !node_hidden(*el))
        .map(node_text)
        .filter(|t| !t.is_empty());

    Some(JobNodeFields {
        title: node_text(title),
        location: normalize_location(&node_text(location)),
        visible_description,
    })
}

/// Parse every visible job node out of a full page snapshot, in DOM order.
/// Hidden nodes are skipped; nodes missing mandatory fields become error
/// placeholder records rather than sinking the run.
pub fn parse_visible_jobs(html: &str) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let job_sel = selector(JOB_SELECTOR);

    document
        .select(&job_sel)
        .filter(|el| !node_hidden(*el))
        .map(|el| match parse_job_fields(&el.html()) {
            Some(fields) => JobRecord {
                title: fields.title,
                location: fields.location,
                description: fields
                    .visible_description
                    .unwrap_or_else(|| DESC_PLACEHOLDER_MISSING.to_string()),
            },
            None => JobRecord::extraction_failure("job node missing title or location"),
        })
        .collect()
}

// ── Live extraction ──────────────────────────────────────────────────────────

async fn wait_descendant_visible(
    parent: &Element,
    css: &str,
    timeout_ms: u64,
) -> Result<Element, ScrapeError> {
    let start = std::time::Instant::now();
    loop {
        if let Ok(el) = parent.find_element(css).await {
            if element_visible(&el).await {
                return Ok(el);
            }
        }
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            return Err(ScrapeError::WaitTimeout {
                selector: css.to_string(),
                waited_ms: timeout_ms,
            });
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

async fn wait_descendant_hidden(parent: &Element, css: &str, timeout_ms: u64) {
    let start = std::time::Instant::now();
    loop {
        let still_visible = match parent.find_element(css).await {
            Ok(el) => element_visible(&el).await,
            Err(_) => false,
        };
        if !still_visible || start.elapsed().as_millis() as u64 >= timeout_ms {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Map a capture attempt onto the record's description field: the text on
/// success, the fixed error placeholder when the toggle or panel misbehaved.
/// The failure never propagates past this point.
fn resolve_captured_description(captured: Result<String, ScrapeError>, title: &str) -> String {
    match captured {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "  Warning: Could not expand or extract description for '{}': {}",
                title, e
            );
            DESC_PLACEHOLDER_ERROR.to_string()
        }
    }
}

/// Expand the "read more" panel, capture its text, and collapse it again.
/// Collapsing is best-effort; capture failure yields the error placeholder.
async fn expand_and_capture(
    job_element: &Element,
    toggle: &Element,
    title: &str,
    timeouts: &StepTimeouts,
) -> String {
    let captured: Result<String, ScrapeError> = async {
        toggle.click().await.map_err(ScrapeError::cdp)?;
        let panel =
            wait_descendant_visible(job_element, DESCRIPTION_SELECTOR, timeouts.description_ms)
                .await?;
        let text = panel
            .inner_text()
            .await
            .map_err(ScrapeError::cdp)?
            .unwrap_or_default();
        Ok(collapse_whitespace(&text))
    }
    .await;

    if captured.is_ok() {
        // Collapse so the next node's toggle is back in view.
        if toggle.click().await.is_ok() {
            wait_descendant_hidden(job_element, DESCRIPTION_SELECTOR, timeouts.description_ms)
                .await;
        }
    }

    resolve_captured_description(captured, title)
}

async fn extract_one(
    job_element: &Element,
    timeouts: &StepTimeouts,
) -> Result<JobRecord, ScrapeError> {
    let html = element_outer_html(job_element)
        .await
        .ok_or_else(|| ScrapeError::Cdp("could not capture job node HTML".to_string()))?;
    let fields = parse_job_fields(&html)
        .ok_or_else(|| ScrapeError::Cdp("job node missing title or location".to_string()))?;

    let description = match job_element.find_element(READ_MORE_SELECTOR).await {
        Ok(toggle) if element_visible(&toggle).await && element_enabled(&toggle).await => {
            expand_and_capture(job_element, &toggle, &fields.title, timeouts).await
        }
        _ => fields
            .visible_description
            .unwrap_or_else(|| DESC_PLACEHOLDER_MISSING.to_string()),
    };

    Ok(JobRecord {
        title: fields.title,
        location: fields.location,
        description,
    })
}

/// Walk every visible job node in DOM order and build its record. A single
/// node failing becomes a placeholder record; the run continues.
pub async fn extract_jobs(page: &Page, timeouts: &StepTimeouts) -> Vec<JobRecord> {
    info!("Extracting job data...");

    let elements = match page.find_elements(JOB_SELECTOR).await {
        Ok(els) => els,
        Err(e) => {
            warn!("No job nodes found: {}", e);
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    let mut visible_count = 0usize;

    for (i, element) in elements.iter().enumerate() {
        if !element_visible(element).await {
            continue;
        }
        visible_count += 1;

        match extract_one(element, timeouts).await {
            Ok(record) => {
                info!("  - Extracted: '{}' at '{}'", record.title, record.location);
                records.push(record);
            }
            Err(e) => {
                warn!("  Error extracting data from job listing {}: {}", i + 1, e);
                records.push(JobRecord::extraction_failure(&e.to_string()));
            }
        }
    }

    if visible_count == 0 {
        info!("No visible job listings found after applying filters.");
    } else {
        info!("Found {} visible job listings.", visible_count);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_label_stripped_and_whitespace_collapsed() {
        assert_eq!(normalize_location("Location: Toronto,  ON"), "Toronto, ON");
        assert_eq!(normalize_location("  Location:\n  Remote \t US "), "Remote US");
        assert_eq!(normalize_location("Toronto, ON"), "Toronto, ON");
    }

    #[test]
    fn whitespace_collapse_handles_newlines_and_tabs() {
        assert_eq!(collapse_whitespace("a\n\n b\t\tc  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    fn job_node(title: &str, location: &str, description: Option<&str>) -> String {
        let desc = description
            .map(|d| {
                format!(
                    r#"<div class="job_description"><div class="display_description">{}</div></div>"#,
                    d
                )
            })
            .unwrap_or_default();
        format!(
            r#"<div class="job"><h2 class="job_title">{}</h2><div class="display_location">Location: {}</div>{}</div>"#,
            title, location, desc
        )
    }

    #[test]
    fn parse_job_fields_reads_all_three_columns() {
        let html = job_node("Data Engineer", "Toronto,  ON", Some("Pipelines &amp; SQL."));
        let fields = parse_job_fields(&html).unwrap();
        assert_eq!(fields.title, "Data Engineer");
        assert_eq!(fields.location, "Toronto, ON");
        assert_eq!(fields.visible_description.as_deref(), Some("Pipelines & SQL."));
    }

    #[test]
    fn hidden_description_panel_is_not_captured() {
        let html = r#"<div class="job">
            <h2 class="job_title">VP, Engineering</h2>
            <div class="display_location">Location: Toronto, ON</div>
            <div class="job_description" >
                <div class="display_description" style="display: none">Secret text</div>
            </div>
        </div>"#;
        let fields = parse_job_fields(html).unwrap();
        assert_eq!(fields.visible_description, None);
    }

    #[test]
    fn snapshot_yields_one_record_per_visible_node_in_dom_order() {
        let html = format!(
            "<html><body><div class=\"all_jobs\">{}{}{}{}</div></body></html>",
            job_node("First Role", "Toronto, ON", Some("One.")),
            // Hidden node must be skipped, not counted.
            r#"<div class="job" style="display:none"><h2 class="job_title">Ghost</h2><div class="display_location">Location: Nowhere</div></div>"#,
            job_node("Second Role", "Toronto, ON", None),
            job_node("Third Role", "New York,   NY", Some("Three.")),
        );

        let records = parse_visible_jobs(&html);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "First Role");
        assert_eq!(records[1].title, "Second Role");
        assert_eq!(records[1].description, DESC_PLACEHOLDER_MISSING);
        assert_eq!(records[2].title, "Third Role");
        assert_eq!(records[2].location, "New York, NY");
    }

    #[test]
    fn failed_description_toggle_yields_fixed_placeholder() {
        // A toggle that throws on click must surface as the placeholder
        // string in the record, never as a propagated error.
        let captured = Err(ScrapeError::Cdp("node detached during click".to_string()));
        assert_eq!(
            resolve_captured_description(captured, "Senior Software Engineer"),
            DESC_PLACEHOLDER_ERROR
        );

        let captured = Ok("Full description text.".to_string());
        assert_eq!(
            resolve_captured_description(captured, "Senior Software Engineer"),
            "Full description text."
        );
    }

    #[test]
    fn malformed_node_becomes_placeholder_record_not_a_panic() {
        let html = r#"<html><body>
            <div class="job"><span>no title markup at all</span></div>
        </body></html>"#;
        let records = parse_visible_jobs(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Error: Could not extract");
        assert!(records[0].description.starts_with("Error:"));
    }
}
