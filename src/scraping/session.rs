//! One live browser session against the careers page.

use chromiumoxide::{Browser, Page};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::config::{ScoutConfig, StepTimeouts};
use crate::core::types::ScrapeError;
use crate::scraping::browser_manager;

/// Consent / overlay dismiss candidates, tried in order. First visible match
/// wins; everything here is best-effort.
///
/// CSS entries are straight selectors; `text:` entries match button text
/// case-insensitively anywhere on the page, and `dialog-text:` entries only
/// match buttons inside a `div[role="dialog"]`. The bare "Accept" / "Got it"
/// / "Agree" needles stay dialog-scoped so an unrelated on-page button never
/// gets clicked.
const OVERLAY_CANDIDATES: &[&str] = &[
    r#"button[data-tag="accept-button"]"#,
    "text:Accept All",
    "text:Accept Cookies",
    r#"button[aria-label="Accept cookies"]"#,
    "#onetrust-accept-btn-handler",
    ".cc-btn.cc-allow",
    r#"button[data-qa="accept-cookies"]"#,
    "dialog-text:Accept",
    "dialog-text:Got it",
    "dialog-text:Agree",
];

pub struct CareersSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl CareersSession {
    /// Discover a browser, launch it against the configured profile dir, and
    /// open a blank tab.
    pub async fn launch(cfg: &ScoutConfig) -> Result<Self, ScrapeError> {
        let exe = browser_manager::find_chrome_executable().ok_or(ScrapeError::NoBrowser)?;
        let profile_dir = cfg.resolve_profile_dir();
        let (browser, handler_task) =
            browser_manager::launch(&exe, &profile_dir, cfg.resolve_headless()).await?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::PageLoad(format!("failed to open tab: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler_task,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate and wait for the network to settle, with a short settle pause
    /// afterwards so late rendering (filter widgets) completes.
    pub async fn navigate(&self, url: &str, timeouts: &StepTimeouts) -> Result<(), ScrapeError> {
        info!("🌐 Navigating to: {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| ScrapeError::PageLoad(e.to_string()))?;

        browser_manager::wait_until_stable(&self.page, 1_000, timeouts.network_idle_ms).await;
        tokio::time::sleep(Duration::from_millis(settle_jitter_ms())).await;
        info!("Page loaded successfully.");
        Ok(())
    }

    /// Try to dismiss a cookie/consent overlay. Candidates are tried in fixed
    /// order inside the page; the first visible one gets clicked and the rest
    /// are skipped. Every failure here is non-fatal.
    pub async fn dismiss_overlays(&self, timeouts: &StepTimeouts) {
        info!("Checking for and dismissing overlays...");
        let candidates = serde_json::to_string(OVERLAY_CANDIDATES)
            .unwrap_or_else(|_| "[]".to_string());
        let js = format!(
            r#"(() => {{
                const candidates = {candidates};
                const isVisible = (el) => {{
                    if (!el || el.disabled) return false;
                    const style = window.getComputedStyle(el);
                    if (!style || style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
                    const rect = el.getBoundingClientRect();
                    return rect.width > 1 && rect.height > 1;
                }};
                const byText = (needle, dialogOnly) => {{
                    const scope = dialogOnly
                        ? document.querySelectorAll('div[role="dialog"] button')
                        : document.querySelectorAll('button');
                    const t = needle.toLowerCase();
                    for (const el of scope) {{
                        const text = (el.innerText || '').trim().toLowerCase();
                        if (text === t || text.startsWith(t + ' ')) return el;
                    }}
                    return null;
                }};
                for (const candidate of candidates) {{
                    let el = null;
                    if (candidate.startsWith('dialog-text:')) el = byText(candidate.slice(12), true);
                    else if (candidate.startsWith('text:')) el = byText(candidate.slice(5), false);
                    else el = document.querySelector(candidate);
                    if (!isVisible(el)) continue;
                    try {{
                        el.click();
                        return candidate;
                    }} catch (_) {{
                        // Click threw; keep walking the candidate list.
                    }}
                }}
                return null;
            }})()"#
        );

        match self.page.evaluate(js).await {
            Ok(val) => match val.into_value::<Option<String>>() {
                Ok(Some(candidate)) => {
                    info!("  - Overlay dismissed via '{}'", candidate);
                    browser_manager::wait_until_stable(&self.page, 1_000, timeouts.network_idle_ms)
                        .await;
                }
                _ => info!("  - No overlay found."),
            },
            Err(e) => warn!("  - Overlay dismissal script failed (non-fatal): {}", e),
        }

        // Small pause after dismissal so filters hidden behind the overlay render.
        tokio::time::sleep(Duration::from_millis(settle_jitter_ms())).await;
    }

    /// Gracefully close the tab and browser.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser close error (non-fatal): {}", e);
        }
        self.handler_task.abort();
    }
}

/// Human-ish settle pause (the page finishes rendering in bursts).
fn settle_jitter_ms() -> u64 {
    use rand::distr::{Distribution, Uniform};
    let mut rng = rand::rng();
    match Uniform::new(700u64, 1_400) {
        Ok(dist) => dist.sample(&mut rng),
        Err(_) => 1_000,
    }
}
