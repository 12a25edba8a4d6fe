use std::path::Path;
use tracing::{error, info};

use career_scout::config::{self, ScoutConfig};
use career_scout::output;
use career_scout::scraping::extract;
use career_scout::scraping::filters::{self, FilterPlan};
use career_scout::scraping::session::CareersSession;
use career_scout::types::{JobRecord, RunOutcome, ScrapeError};

#[derive(Default)]
struct CliOverrides {
    headed: bool,
    url: Option<String>,
    out: Option<String>,
}

fn parse_cli_overrides() -> CliOverrides {
    let mut overrides = CliOverrides::default();
    let mut args = std::env::args().skip(1).peekable();
    while let Some(a) = args.next() {
        if a == "--headed" {
            overrides.headed = true;
        } else if a == "--url" {
            overrides.url = args.next();
        } else if let Some(rest) = a.strip_prefix("--url=") {
            overrides.url = Some(rest.to_string());
        } else if a == "--out" {
            overrides.out = args.next();
        } else if let Some(rest) = a.strip_prefix("--out=") {
            overrides.out = Some(rest.to_string());
        }
    }
    overrides
}

/// Full scrape: launch → navigate → dismiss overlays → filter → extract.
/// The session is closed on every exit path so no zombie browsers linger.
async fn scrape_jobs(cfg: &ScoutConfig) -> Result<Vec<JobRecord>, ScrapeError> {
    let timeouts = cfg.resolve_timeouts();
    let session = CareersSession::launch(cfg).await?;

    let result: Result<Vec<JobRecord>, ScrapeError> = async {
        session
            .navigate(&cfg.resolve_careers_url(), &timeouts)
            .await?;
        session.dismiss_overlays(&timeouts).await;

        let plan = FilterPlan::default();
        let has_jobs = filters::apply_filters(&session, cfg, &plan, &timeouts).await?;

        if has_jobs {
            Ok(extract::extract_jobs(session.page(), &timeouts).await)
        } else {
            // Filters applied cleanly, nothing matched. An honest empty list.
            Ok(Vec::new())
        }
    }
    .await;

    session.close().await;
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let overrides = parse_cli_overrides();
    let mut cfg = config::load_scout_config();
    if let Some(url) = overrides.url {
        cfg.careers_url = Some(url);
    }
    if let Some(out) = overrides.out {
        cfg.output_path = Some(out);
    }
    if overrides.headed {
        cfg.headless = Some(false);
    }

    let careers_url = cfg.resolve_careers_url();
    let outcome = match url::Url::parse(&careers_url) {
        Err(e) => RunOutcome::failure(format!("Invalid careers URL '{}': {}", careers_url, e)),
        Ok(_) => {
            info!("career-scout starting against {}", careers_url);
            match scrape_jobs(&cfg).await {
                Ok(jobs) => {
                    info!("✅ Scrape finished: {} record(s)", jobs.len());
                    RunOutcome::Jobs(jobs)
                }
                Err(e) => {
                    error!("Run failed: {}", e);
                    RunOutcome::failure(e.to_string())
                }
            }
        }
    };

    let json = output::render_outcome(&outcome)?;
    println!("{json}");
    output::write_report(Path::new(&cfg.resolve_output_path()), &json)?;

    if outcome.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}
