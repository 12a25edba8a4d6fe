use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ScoutConfig — file-based config loader (career-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "CAREER_SCOUT_CONFIG";
pub const ENV_CAREERS_URL: &str = "CAREER_SCOUT_URL";
pub const ENV_FALLBACK_URL: &str = "CAREER_SCOUT_FALLBACK_URL";
pub const ENV_OUTPUT_PATH: &str = "CAREER_SCOUT_OUTPUT";
pub const ENV_HEADLESS: &str = "CAREER_SCOUT_HEADLESS";
pub const ENV_PROFILE_DIR: &str = "CAREER_SCOUT_PROFILE_DIR";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

pub const DEFAULT_CAREERS_URL: &str = "https://icapital.com/careers/";
pub const DEFAULT_OUTPUT_PATH: &str = "icapital_filtered_jobs.json";

/// Optional per-step timeout overrides (mirrors the `timeouts` key in
/// career-scout.json). All values in milliseconds.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct TimeoutOverrides {
    pub click_ms: Option<u64>,
    pub dropdown_open_ms: Option<u64>,
    pub option_select_ms: Option<u64>,
    pub filter_box_ms: Option<u64>,
    pub job_list_ms: Option<u64>,
    pub description_ms: Option<u64>,
    pub network_idle_ms: Option<u64>,
}

/// Per-step wait budgets. Defaults match the values the page was tuned
/// against; every interaction blocks until its own timeout, nothing retries
/// beyond the explicit fallback chains.
#[derive(Clone, Debug)]
pub struct StepTimeouts {
    pub click_ms: u64,
    pub dropdown_open_ms: u64,
    pub option_select_ms: u64,
    pub filter_box_ms: u64,
    pub job_list_ms: u64,
    pub description_ms: u64,
    pub network_idle_ms: u64,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            click_ms: 5_000,
            dropdown_open_ms: 10_000,
            option_select_ms: 10_000,
            filter_box_ms: 20_000,
            job_list_ms: 15_000,
            description_ms: 5_000,
            network_idle_ms: 15_000,
        }
    }
}

impl StepTimeouts {
    fn with_overrides(overrides: &TimeoutOverrides) -> Self {
        let d = Self::default();
        Self {
            click_ms: overrides.click_ms.unwrap_or(d.click_ms),
            dropdown_open_ms: overrides.dropdown_open_ms.unwrap_or(d.dropdown_open_ms),
            option_select_ms: overrides.option_select_ms.unwrap_or(d.option_select_ms),
            filter_box_ms: overrides.filter_box_ms.unwrap_or(d.filter_box_ms),
            job_list_ms: overrides.job_list_ms.unwrap_or(d.job_list_ms),
            description_ms: overrides.description_ms.unwrap_or(d.description_ms),
            network_idle_ms: overrides.network_idle_ms.unwrap_or(d.network_idle_ms),
        }
    }
}

/// Top-level config loaded from `career-scout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// Careers page to scrape.
    pub careers_url: Option<String>,
    /// Pre-filtered URL used when UI filter interaction fails entirely.
    pub fallback_url: Option<String>,
    /// Where the JSON report lands. Relative paths resolve against the cwd.
    pub output_path: Option<String>,
    /// Run the browser headless. Flip to `false` to watch the clicks.
    pub headless: Option<bool>,
    /// Persistent browser profile dir (cookies/session survive across runs).
    pub profile_dir: Option<String>,
    pub timeouts: Option<TimeoutOverrides>,
}

impl ScoutConfig {
    /// Careers URL: JSON field → `CAREER_SCOUT_URL` env var → the iCapital page.
    pub fn resolve_careers_url(&self) -> String {
        if let Some(u) = &self.careers_url {
            if !u.trim().is_empty() {
                return u.clone();
            }
        }
        std::env::var(ENV_CAREERS_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CAREERS_URL.to_string())
    }

    /// Explicit fallback URL override, if any. When unset the fallback URL is
    /// built from the filter plan (see `scraping::filters::direct_filtered_url`).
    pub fn resolve_fallback_url(&self) -> Option<String> {
        if let Some(u) = &self.fallback_url {
            if !u.trim().is_empty() {
                return Some(u.clone());
            }
        }
        std::env::var(ENV_FALLBACK_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Output path: JSON field → `CAREER_SCOUT_OUTPUT` env var → fixed default.
    pub fn resolve_output_path(&self) -> String {
        if let Some(p) = &self.output_path {
            if !p.trim().is_empty() {
                return p.clone();
            }
        }
        std::env::var(ENV_OUTPUT_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string())
    }

    /// Headless: JSON field → `CAREER_SCOUT_HEADLESS` env var → `true`.
    /// Env values `0`/`false`/`no`/`off` run the browser with a head.
    pub fn resolve_headless(&self) -> bool {
        if let Some(b) = self.headless {
            return b;
        }
        let Ok(v) = std::env::var(ENV_HEADLESS) else {
            return true;
        };
        let v = v.trim().to_ascii_lowercase();
        if v.is_empty() {
            return true;
        }
        !matches!(v.as_str(), "0" | "false" | "no" | "off")
    }

    /// Profile dir: JSON field → `CAREER_SCOUT_PROFILE_DIR` env var →
    /// `~/.career-scout/profile`. Reused across runs to retain cookies, so a
    /// once-dismissed consent banner usually stays dismissed.
    pub fn resolve_profile_dir(&self) -> PathBuf {
        if let Some(p) = &self.profile_dir {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        if let Ok(p) = std::env::var(ENV_PROFILE_DIR) {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".career-scout")
            .join("profile")
    }

    pub fn resolve_timeouts(&self) -> StepTimeouts {
        match &self.timeouts {
            Some(overrides) => StepTimeouts::with_overrides(overrides),
            None => StepTimeouts::default(),
        }
    }
}

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `scraping::browser_manager::find_chrome_executable()`).
/// This function only returns a value when `CHROME_EXECUTABLE` is set to an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}

/// Load `career-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `CAREER_SCOUT_CONFIG` env var path
/// 2. `./career-scout.json`  (process cwd)
/// 3. `../career-scout.json` (one level up, when running from a subdir)
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<PathBuf> = {
        let mut v = vec![
            PathBuf::from("career-scout.json"),
            PathBuf::from("../career-scout.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ScoutConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("career-scout.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "career-scout.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ScoutConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    ScoutConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_careers_page() {
        let cfg = ScoutConfig::default();
        assert_eq!(cfg.resolve_careers_url(), DEFAULT_CAREERS_URL);
        assert_eq!(cfg.resolve_output_path(), DEFAULT_OUTPUT_PATH);
        assert!(cfg.resolve_headless());
        assert!(cfg.resolve_fallback_url().is_none());
    }

    #[test]
    fn json_fields_win_over_defaults() {
        let cfg: ScoutConfig = serde_json::from_str(
            r#"{
                "careers_url": "https://example.com/jobs/",
                "output_path": "out.json",
                "headless": false,
                "timeouts": { "click_ms": 1234 }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.resolve_careers_url(), "https://example.com/jobs/");
        assert_eq!(cfg.resolve_output_path(), "out.json");
        assert!(!cfg.resolve_headless());

        let timeouts = cfg.resolve_timeouts();
        assert_eq!(timeouts.click_ms, 1234);
        // Untouched budgets keep their defaults.
        assert_eq!(timeouts.dropdown_open_ms, 10_000);
        assert_eq!(timeouts.filter_box_ms, 20_000);
    }

    #[test]
    fn blank_json_fields_fall_through() {
        let cfg: ScoutConfig =
            serde_json::from_str(r#"{ "careers_url": "  ", "output_path": "" }"#).unwrap();
        assert_eq!(cfg.resolve_careers_url(), DEFAULT_CAREERS_URL);
        assert_eq!(cfg.resolve_output_path(), DEFAULT_OUTPUT_PATH);
    }

    #[test]
    fn step_timeouts_default_to_tuned_budgets() {
        let t = StepTimeouts::default();
        assert_eq!(t.click_ms, 5_000);
        assert_eq!(t.job_list_ms, 15_000);
        assert_eq!(t.description_ms, 5_000);
    }
}
