//! Bootstrap-select dropdown driving.
//!
//! The filter widgets are bootstrap-select buttons (`button[data-id="..."]`)
//! that open a `div.inner.open` panel with an `ul.dropdown-menu.inner` option
//! list. Options are chosen by ordinal index, not by label; the page reorders
//! labels occasionally but keeps the index contract stable.

use chromiumoxide::Page;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::StepTimeouts;
use crate::core::types::ScrapeError;
use crate::scraping::browser_manager::{
    element_enabled, element_visible, wait_for_visible, wait_until_stable,
};

const OPEN_PANEL_SELECTOR: &str = "div.inner.open";
const OPTION_LIST_SELECTOR: &str = "div.inner.open ul.dropdown-menu.inner li";

/// One way of clicking the dropdown toggle. Strategies are tried in the
/// declared order; the first success wins, and only when all four fail does
/// the selection fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    /// Scroll into view (plus a nudge for sticky headers), wait for
    /// visible + enabled, then a real CDP mouse click.
    Standard,
    /// `document.querySelector(sel).click()` from page context.
    Script,
    /// Synthesized mousedown/mouseup/click events dispatched straight on the
    /// element, bypassing hit-testing entirely.
    Forced,
    /// Raw mouse click at the element's clickable center point.
    Coordinate,
}

impl ClickStrategy {
    pub const CHAIN: [ClickStrategy; 4] = [
        ClickStrategy::Standard,
        ClickStrategy::Script,
        ClickStrategy::Forced,
        ClickStrategy::Coordinate,
    ];

    fn label(&self) -> &'static str {
        match self {
            ClickStrategy::Standard => "standard click with scrolling",
            ClickStrategy::Script => "script click",
            ClickStrategy::Forced => "forced event dispatch",
            ClickStrategy::Coordinate => "coordinate click",
        }
    }
}

async fn attempt_click(
    page: &Page,
    selector: &str,
    strategy: ClickStrategy,
    timeouts: &StepTimeouts,
) -> Result<(), ScrapeError> {
    // Handles can go stale between attempts; re-resolve per strategy.
    match strategy {
        ClickStrategy::Standard => {
            let element = page.find_element(selector).await.map_err(ScrapeError::cdp)?;
            element.scroll_into_view().await.map_err(ScrapeError::cdp)?;
            // Nudge past sticky headers that cover the scrolled-to position.
            page.evaluate("window.scrollBy(0, 100);")
                .await
                .map_err(ScrapeError::cdp)?;
            tokio::time::sleep(Duration::from_millis(500)).await;

            let start = std::time::Instant::now();
            loop {
                if element_visible(&element).await && element_enabled(&element).await {
                    break;
                }
                if start.elapsed().as_millis() as u64 >= timeouts.click_ms {
                    return Err(ScrapeError::WaitTimeout {
                        selector: selector.to_string(),
                        waited_ms: timeouts.click_ms,
                    });
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            element.click().await.map_err(ScrapeError::cdp)?;
            Ok(())
        }
        ClickStrategy::Script => {
            let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
            page.evaluate(format!("document.querySelector({sel}).click()"))
                .await
                .map_err(ScrapeError::cdp)?;
            Ok(())
        }
        ClickStrategy::Forced => {
            let element = page.find_element(selector).await.map_err(ScrapeError::cdp)?;
            element
                .call_js_fn(
                    r#"function() {
                        const rect = this.getBoundingClientRect();
                        const opts = {
                            bubbles: true, cancelable: true, view: window,
                            clientX: rect.left + rect.width / 2,
                            clientY: rect.top + rect.height / 2,
                        };
                        this.dispatchEvent(new MouseEvent('mousedown', opts));
                        this.dispatchEvent(new MouseEvent('mouseup', opts));
                        this.dispatchEvent(new MouseEvent('click', opts));
                        return true;
                    }"#,
                    false,
                )
                .await
                .map_err(ScrapeError::cdp)?;
            Ok(())
        }
        ClickStrategy::Coordinate => {
            let element = page.find_element(selector).await.map_err(ScrapeError::cdp)?;
            let point = element.clickable_point().await.map_err(ScrapeError::cdp)?;
            page.click(point).await.map_err(ScrapeError::cdp)?;
            Ok(())
        }
    }
}

/// Click the toggle for `select_id` through the strategy chain.
async fn open_dropdown(
    page: &Page,
    select_id: &str,
    timeouts: &StepTimeouts,
) -> Result<(), ScrapeError> {
    let selector = format!(r#"button[data-id="{}"]"#, select_id);

    let mut clicked = false;
    for strategy in ClickStrategy::CHAIN {
        info!("    Attempting {} for '{}'...", strategy.label(), select_id);
        match attempt_click(page, &selector, strategy, timeouts).await {
            Ok(()) => {
                info!("    {} successful for '{}'.", strategy.label(), select_id);
                clicked = true;
                break;
            }
            Err(e) => {
                warn!("    {} failed for '{}': {}", strategy.label(), select_id, e);
            }
        }
    }

    if !clicked {
        return Err(ScrapeError::AllClickMethodsFailed(select_id.to_string()));
    }

    // A click that lands but never opens the panel still fails the operation.
    wait_for_visible(page, OPEN_PANEL_SELECTOR, timeouts.dropdown_open_ms)
        .await
        .map_err(|e| ScrapeError::DropdownNeverOpened {
            select_id: select_id.to_string(),
            reason: e.to_string(),
        })?;

    info!("  - Dropdown for '{}' opened.", select_id);
    Ok(())
}

/// Index window precheck. Runs before any click attempt, so a wildly wrong
/// index never touches the page.
fn validate_index_window(option_index: usize) -> Result<(), ScrapeError> {
    if option_index > 99 {
        return Err(ScrapeError::OptionIndexOutOfRange(option_index));
    }
    Ok(())
}

/// Select the option at `option_index` inside the `select_id` dropdown.
///
/// `expected_label` is advisory only: a mismatch is logged as a warning and
/// selection proceeds by index, so label drift on the page does not abort the
/// run (it shows up in the logs instead).
pub async fn select_option_by_index(
    page: &Page,
    select_id: &str,
    option_index: usize,
    expected_label: Option<&str>,
    timeouts: &StepTimeouts,
) -> Result<(), ScrapeError> {
    validate_index_window(option_index)?;

    info!("  - Clicking dropdown button for '{}'...", select_id);
    open_dropdown(page, select_id, timeouts).await?;

    let options = page
        .find_elements(OPTION_LIST_SELECTOR)
        .await
        .map_err(ScrapeError::cdp)?;

    if option_index >= options.len() {
        return Err(ScrapeError::OptionOutOfBounds {
            select_id: select_id.to_string(),
            index: option_index,
            count: options.len(),
        });
    }

    let target = options[option_index]
        .find_element("a")
        .await
        .map_err(|e| ScrapeError::OptionSelect {
            select_id: select_id.to_string(),
            index: option_index,
            reason: format!("option anchor not found: {}", e),
        })?;

    let current_label = target
        .inner_text()
        .await
        .ok()
        .flatten()
        .map(|t| t.trim().to_string())
        .unwrap_or_default();

    if let Some(expected) = expected_label {
        if current_label != expected.trim() {
            warn!(
                "  Warning: Expected label '{}' at index {} but found '{}' for '{}'. Proceeding with index anyway.",
                expected, option_index, current_label, select_id
            );
        }
    }

    info!(
        "  - Selecting index {} ('{}') within '{}'...",
        option_index, current_label, select_id
    );

    let select_result: Result<(), ScrapeError> = async {
        target.scroll_into_view().await.map_err(ScrapeError::cdp)?;

        let start = std::time::Instant::now();
        while !element_visible(&target).await {
            if start.elapsed().as_millis() as u64 >= timeouts.option_select_ms {
                return Err(ScrapeError::WaitTimeout {
                    selector: OPTION_LIST_SELECTOR.to_string(),
                    waited_ms: timeouts.option_select_ms,
                });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        target.click().await.map_err(ScrapeError::cdp)?;
        Ok(())
    }
    .await;

    select_result.map_err(|e| ScrapeError::OptionSelect {
        select_id: select_id.to_string(),
        index: option_index,
        reason: e.to_string(),
    })?;

    info!(
        "  - Selected index {} ('{}') for '{}'.",
        option_index, current_label, select_id
    );
    wait_until_stable(page, 1_000, timeouts.network_idle_ms).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_chain_order_is_fixed() {
        assert_eq!(
            ClickStrategy::CHAIN,
            [
                ClickStrategy::Standard,
                ClickStrategy::Script,
                ClickStrategy::Forced,
                ClickStrategy::Coordinate,
            ]
        );
    }

    #[test]
    fn out_of_range_index_rejected_before_any_click() {
        // 100 is the first index past the allowed 0..=99 window.
        assert!(matches!(
            validate_index_window(100),
            Err(ScrapeError::OptionIndexOutOfRange(100))
        ));
        assert!(validate_index_window(0).is_ok());
        assert!(validate_index_window(99).is_ok());
    }
}
