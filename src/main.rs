//! # AP News Scraper
//!
//! Searches AP News for a phrase, keeps the articles published inside a date
//! window and writes them to a spreadsheet.
//!
//! ## Features
//!
//! - Reads the search phrase, category and month count from an input work item,
//!   with defaults when none is available
//! - Drives the site search in Chromium, or fetches the results page directly
//! - Counts search phrase occurrences and flags articles that mention money
//! - Downloads article images next to the report
//!
//! ## Usage
//!
//! ```sh
//! apnews_scraper --work-item devdata/work-items.json -o ./output
//! ```
//!
//! ## Architecture
//!
//! One sequential run:
//! 1. **Parameters**: Resolve the search parameters from the work item
//! 2. **Search**: Open the site and submit the search
//! 3. **Extraction**: Read each result card, skipping the ones that fail
//! 4. **Filtering**: Keep cards inside the date window, compute metrics, save images
//! 5. **Output**: Write the spreadsheet

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod browser;
mod cli;
mod config;
mod dates;
mod images;
mod models;
mod outputs;
mod scrapers;
mod utils;
mod workitems;

use browser::{ChromeBrowser, StaticBrowser};
use cli::Cli;
use config::{Driver, Settings};
use dates::DateWindow;
use images::ImageStore;
use models::ArticleRecord;
use outputs::xlsx;
use scrapers::apnews::{self, ExtractContext};
use utils::ensure_writable_dir;
use workitems::{FileWorkItems, resolve_parameters};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("apnews_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref()).await?;
    settings.apply_cli(&args);
    debug!(?settings, "Effective settings");

    // ---- Parameters ----
    let params = resolve_parameters(&FileWorkItems::new(args.work_item.clone()));
    let window = DateWindow::for_months(params.months, Local::now().date_naive());
    info!(
        search_phrase = %params.search_phrase,
        category = %params.category,
        start = %window.start_label(),
        end = %window.end_label(),
        "Search parameters"
    );

    // ---- Output directories ----
    if let Err(e) = ensure_writable_dir(&settings.output_dir).await {
        error!(
            path = %settings.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let images = match image_store(&settings).await {
        Ok(store) => store,
        Err(e) => {
            warn!(path = %settings.image_dir, error = %e, "Image directory unusable; skipping image downloads");
            None
        }
    };
    let include_images = settings.download_images;

    // ---- Search and extract ----
    let ctx = ExtractContext {
        search_phrase: &params.search_phrase,
        window,
        images: images.as_ref(),
    };
    let records = run_search(&settings, ctx).await;
    info!(count = records.len(), "Articles kept");

    // ---- Report ----
    let timestamp = settings
        .timestamped_report
        .then(|| Local::now().naive_local());
    let report = xlsx::report_path(&settings.output_dir, &settings.report_name, timestamp);
    if let Err(e) = xlsx::write_report(&records, &params.search_phrase, include_images, &report) {
        error!(path = %report.display(), error = %e, "Failed writing spreadsheet");
        return Err(e);
    }
    info!(path = %report.display(), "Wrote report");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Image store for the run, or `None` when downloads are disabled.
async fn image_store(settings: &Settings) -> Result<Option<ImageStore>, Box<dyn Error>> {
    if !settings.download_images {
        return Ok(None);
    }
    ensure_writable_dir(&settings.image_dir).await?;
    let base = Url::parse(&settings.site_url)?;
    let store = ImageStore::new(
        base,
        &settings.image_dir,
        settings.title_chars(),
        settings.wait_timeout(),
    )?;
    Ok(Some(store))
}

/// Launch the configured backend and scrape. Every failure here degrades to
/// an empty record set.
#[instrument(level = "info", skip_all, fields(driver = ?settings.driver))]
async fn run_search(settings: &Settings, ctx: ExtractContext<'_>) -> Vec<ArticleRecord> {
    let site = match Url::parse(&settings.site_url) {
        Ok(site) => site,
        Err(e) => {
            error!(site_url = %settings.site_url, error = %e, "Invalid site URL");
            return Vec::new();
        }
    };
    let timeout = settings.wait_timeout();

    match settings.driver {
        Driver::Chrome => match ChromeBrowser::launch(settings.headless).await {
            Ok(browser) => apnews::scrape(browser, &site, ctx, timeout).await,
            Err(e) => {
                error!(error = %e, "Could not launch browser");
                Vec::new()
            }
        },
        Driver::Static => match StaticBrowser::new(timeout) {
            Ok(browser) => apnews::scrape(browser, &site, ctx, timeout).await,
            Err(e) => {
                error!(error = %e, "Could not build HTTP client");
                Vec::new()
            }
        },
    }
}
