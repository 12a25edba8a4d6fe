//! Native browser management using `chromiumoxide`.
//!
//! Single source of truth for:
//! * Finding a usable browser executable (Brave → Chrome → Chromium, cross-platform).
//! * Building a launch config with a persistent user-data dir (cookies survive runs).
//! * `wait_until_stable` — Playwright-style networkidle heuristic.
//! * Selector / element visibility probes used by the dropdown and extraction steps.

use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::config;
use crate::core::types::ScrapeError;

// ── Browser executable discovery ─────────────────────────────────────────────

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan – finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Some(p) = config::chrome_executable_override() {
        return Some(p);
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "brave-browser",
            "brave",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/brave-browser",
            "/usr/bin/brave",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

// ── Launch config + session plumbing ─────────────────────────────────────────

/// Build a `BrowserConfig` bound to a persistent profile dir.
///
/// Flags chosen for compatibility with CI / restricted environments
/// (`--no-sandbox`, `--disable-dev-shm-usage`). The user-data dir keeps
/// cookies and consent state between runs.
pub fn build_profile_config(
    exe: &str,
    profile_dir: &Path,
    headless: bool,
) -> Result<BrowserConfig, ScrapeError> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .user_data_dir(profile_dir)
        .viewport(Viewport {
            width: 1920,
            height: 1080,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(1920, 1080)
        .arg("--disable-gpu")
        .arg("--no-sandbox")
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    if !headless {
        builder = builder.with_head();
    }

    builder.build().map_err(|e| ScrapeError::BrowserLaunch {
        exe: exe.to_string(),
        reason: format!("config build failed: {}", e),
    })
}

/// Launch the browser and spawn a task draining its CDP event stream.
pub async fn launch(
    exe: &str,
    profile_dir: &Path,
    headless: bool,
) -> Result<(Browser, JoinHandle<()>), ScrapeError> {
    if let Err(e) = std::fs::create_dir_all(profile_dir) {
        warn!(
            "Could not create profile dir {} ({}); continuing without persistence",
            profile_dir.display(),
            e
        );
    }

    let config = build_profile_config(exe, profile_dir, headless)?;
    info!(
        "🚀 Launching browser: {} (headless={}, profile={})",
        exe,
        headless,
        profile_dir.display()
    );

    let (browser, mut handler) =
        Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch {
                exe: exe.to_string(),
                reason: e.to_string(),
            })?;

    let handle = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                warn!("CDP handler error: {}", e);
            }
        }
    });

    Ok((browser, handle))
}

// ── Smart wait / networkidle ─────────────────────────────────────────────────

/// Wait until the page network goes idle (no new resource entries for `quiet_ms`
/// consecutive ms) or until `timeout_ms` has elapsed.
///
/// Polls `performance.getEntriesByType("resource").length` every 250 ms —
/// a Playwright-style networkidle heuristic that works without CDP Network events.
pub async fn wait_until_stable(page: &Page, quiet_ms: u64, timeout_ms: u64) {
    let poll_ms = 250u64;
    let start = std::time::Instant::now();
    let mut last_count: u64 = 0;
    let mut stable_since = std::time::Instant::now();

    loop {
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            info!("wait_until_stable: timeout after {}ms", timeout_ms);
            break;
        }

        let count: u64 = page
            .evaluate("performance.getEntriesByType('resource').length")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_u64())
            .unwrap_or(0);

        let ready_complete: bool = page
            .evaluate("document.readyState")
            .await
            .ok()
            .and_then(|v| v.into_value::<serde_json::Value>().ok())
            .and_then(|j| j.as_str().map(|s| s == "complete"))
            .unwrap_or(false);

        if !ready_complete {
            // DOM not fully loaded; keep waiting and do not allow "idle" to trigger.
            stable_since = std::time::Instant::now();
            last_count = count;
        } else if count != last_count {
            last_count = count;
            stable_since = std::time::Instant::now();
        } else if stable_since.elapsed().as_millis() as u64 >= quiet_ms {
            break;
        }

        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }
}

// ── Visibility probes ────────────────────────────────────────────────────────

/// In-page probe over every node matching `selector`: true when any of them
/// is visible. First-match-only would lie on this page, which keeps
/// filtered-out nodes hidden in the DOM ahead of the visible ones.
fn any_visible_probe_js(selector: &str) -> String {
    let sel = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
            for (const el of document.querySelectorAll({sel})) {{
                const style = window.getComputedStyle(el);
                if (!style || style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') continue;
                const rect = el.getBoundingClientRect();
                if (rect.width > 1 && rect.height > 1) return true;
            }}
            return false;
        }})()"#
    )
}

/// One-shot probe: does `selector` match a visible element right now?
pub async fn is_visible(page: &Page, selector: &str) -> bool {
    page.evaluate(any_visible_probe_js(selector))
        .await
        .ok()
        .and_then(|v| v.into_value::<bool>().ok())
        .unwrap_or(false)
}

/// Poll until `selector` matches a visible element, failing with a
/// `WaitTimeout` once `timeout_ms` has elapsed.
pub async fn wait_for_visible(
    page: &Page,
    selector: &str,
    timeout_ms: u64,
) -> Result<(), ScrapeError> {
    let poll_ms = 200u64;
    let start = std::time::Instant::now();
    loop {
        if is_visible(page, selector).await {
            return Ok(());
        }
        if start.elapsed().as_millis() as u64 >= timeout_ms {
            return Err(ScrapeError::WaitTimeout {
                selector: selector.to_string(),
                waited_ms: timeout_ms,
            });
        }
        tokio::time::sleep(Duration::from_millis(poll_ms)).await;
    }
}

const ELEMENT_VISIBLE_FN: &str = r#"function() {
    const style = window.getComputedStyle(this);
    if (!style || style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    const rect = this.getBoundingClientRect();
    return rect.width > 1 && rect.height > 1;
}"#;

const ELEMENT_ENABLED_FN: &str = r#"function() { return !this.disabled; }"#;

async fn element_js_bool(element: &Element, function: &str) -> bool {
    element
        .call_js_fn(function, false)
        .await
        .ok()
        .and_then(|ret| ret.result.value)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Element-handle visibility check (computed style + bounding rect).
pub async fn element_visible(element: &Element) -> bool {
    element_js_bool(element, ELEMENT_VISIBLE_FN).await
}

/// Element-handle enabled check (`disabled` attribute absent).
pub async fn element_enabled(element: &Element) -> bool {
    element_js_bool(element, ELEMENT_ENABLED_FN).await
}

/// Capture an element's outer HTML for snapshot parsing.
pub async fn element_outer_html(element: &Element) -> Option<String> {
    element
        .call_js_fn("function() { return this.outerHTML; }", false)
        .await
        .ok()
        .and_then(|ret| ret.result.value)
        .and_then(|v| v.as_str().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_probe_scans_every_match() {
        let js = any_visible_probe_js("div.job");
        // Any-match semantics: the probe must iterate all nodes, not stop at
        // the first (a hidden filtered-out node can sit ahead of visible ones).
        assert!(js.contains("document.querySelectorAll(\"div.job\")"));
        assert!(!js.contains("document.querySelector(\""));
        assert!(js.contains("continue"));
        assert!(js.contains("return true"));
    }

    #[test]
    fn visibility_probe_quotes_selectors_safely() {
        let js = any_visible_probe_js(r#"button[data-id="filter_dep"]"#);
        assert!(js.contains(r#"document.querySelectorAll("button[data-id=\"filter_dep\"]")"#));
    }
}
