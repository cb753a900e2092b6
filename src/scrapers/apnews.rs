//! AP News search scraper.
//!
//! Runs a site search for the search phrase and reads the result cards of the
//! standard page list:
//!
//! ```text
//! .PageListStandardD .PageList-items
//! └── .PageList-items-item
//!     ├── .PagePromo-title .PagePromoContentIcons-text        title
//!     ├── .PagePromo-description .PagePromoContentIcons-text  description
//!     ├── .PagePromo-date .Timestamp-template                 "September 3"
//!     └── .PagePromo-media .Image[src]                        optional image
//! ```
//!
//! Cards outside the date window are dropped. A card that cannot be read is
//! logged and skipped; the rest of the page is still processed.

use crate::browser::{Browser, BrowserError, PageNode};
use crate::dates::{DateWindow, month_day, normalize_date};
use crate::images::ImageStore;
use crate::models::{ArticleRecord, IMAGE_NOT_AVAILABLE};
use crate::utils::truncate_for_log;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

const SEARCH_BUTTON: &str = "button[class*='SearchOverlay-search-button']";
const SEARCH_INPUT: &str = "input[class*='SearchOverlay-search-input']";
const SEARCH_SUBMIT: &str = "button[class*='SearchOverlay-search-submit']";

const RESULTS_CONTAINER: &str = ".PageListStandardD .PageList-items";
const RESULT_ITEM: &str = ".PageList-items-item";
const TITLE: &str = ".PagePromo-title .PagePromoContentIcons-text";
const DESCRIPTION: &str = ".PagePromo-description .PagePromoContentIcons-text";
const DATE: &str = ".PagePromo-date .Timestamp-template";
const IMAGE: &str = ".PagePromo-media .Image";

/// `$1,200.50`, `500 dollars`, `20 USD`.
static MONEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\$\d+(?:,\d{3})*(?:\.\d+)?|\d+(?:,\d{3})*(?:\.\d+)?\s?(?:dollars|USD)")
        .unwrap()
});

/// Whether `text` mentions an amount of money.
pub fn contains_money(text: &str) -> bool {
    MONEY.is_match(text)
}

/// Case-insensitive, non-overlapping occurrences of `phrase` in `text`.
pub fn count_phrase(text: &str, phrase: &str) -> usize {
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(phrase.as_str()).count()
}

/// Everything the per-card extraction needs besides the card itself.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub search_phrase: &'a str,
    pub window: DateWindow,
    /// `None` disables image downloads.
    pub images: Option<&'a ImageStore>,
}

/// Open the site and submit a search for `phrase`.
///
/// Interactive backends go through the search overlay; the others load the
/// results URL directly.
#[instrument(level = "info", skip(browser, site))]
pub async fn submit_search<B: Browser>(
    browser: &mut B,
    site: &Url,
    phrase: &str,
    timeout: Duration,
) -> Result<(), BrowserError> {
    if !browser.interactive() {
        let url = search_url(site, phrase)?;
        info!(%url, "Loading search results directly");
        browser.navigate(url.as_str()).await?;
        return Ok(());
    }

    browser.navigate(site.as_str()).await?;
    browser.wait_visible(SEARCH_BUTTON, timeout).await?;
    browser.click(SEARCH_BUTTON).await?;
    browser.wait_visible(SEARCH_INPUT, timeout).await?;
    browser.input_text(SEARCH_INPUT, phrase).await?;
    browser.click(SEARCH_SUBMIT).await?;
    browser.wait_for_text(phrase, timeout).await?;
    info!("Search results loaded");
    Ok(())
}

/// `{site}/search?q={phrase}`
pub fn search_url(site: &Url, phrase: &str) -> Result<Url, url::ParseError> {
    let mut url = site.join("search")?;
    url.query_pairs_mut().append_pair("q", phrase);
    Ok(url)
}

/// Read every result card on the current page.
///
/// A missing results container is logged and yields no records.
#[instrument(level = "info", skip_all)]
pub async fn extract_articles<B: Browser>(
    browser: &mut B,
    ctx: ExtractContext<'_>,
    timeout: Duration,
) -> Vec<ArticleRecord> {
    let nodes = match browser.find_all(RESULTS_CONTAINER, RESULT_ITEM, timeout).await {
        Ok(nodes) => nodes,
        Err(e) => {
            error!(error = %e, "Error locating articles");
            return Vec::new();
        }
    };
    info!(count = nodes.len(), "Found result cards");

    let mut records = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        match extract_article(node, ctx).await {
            Ok(Some(record)) => {
                debug!(index, title = %record.title, date = %record.date, "Kept article");
                records.push(record);
            }
            Ok(None) => {}
            Err(e) => warn!(index, error = %e, "Error extracting details from article"),
        }
    }

    info!(
        found = nodes.len(),
        kept = records.len(),
        start = %ctx.window.start_label(),
        end = %ctx.window.end_label(),
        "Extraction finished"
    );
    records
}

/// Turn one result card into a record, or `None` when it falls outside the window.
pub async fn extract_article<N: PageNode>(
    node: &N,
    ctx: ExtractContext<'_>,
) -> Result<Option<ArticleRecord>, Box<dyn Error>> {
    let title = node.text(TITLE).await?;
    let description = node.text(DESCRIPTION).await?;
    let raw_date = node.text(DATE).await?;

    let date = normalize_date(&raw_date, ctx.window.end)?;
    if !ctx.window.contains(date) {
        debug!(
            title = %truncate_for_log(&title, 60),
            %raw_date,
            "Article outside date window"
        );
        return Ok(None);
    }

    let phrase_count =
        count_phrase(&title, ctx.search_phrase) + count_phrase(&description, ctx.search_phrase);
    let contains_money = contains_money(&format!("{title} {description}"));

    let image_filename = match ctx.images {
        Some(store) => {
            let src = image_reference(node).await;
            store.save(&title, src.as_deref()).await
        }
        None => IMAGE_NOT_AVAILABLE.to_string(),
    };

    Ok(Some(ArticleRecord {
        title,
        date: month_day(date),
        description,
        image_filename,
        phrase_count,
        contains_money,
    }))
}

async fn image_reference<N: PageNode>(node: &N) -> Option<String> {
    for attr in ["src", "data-src"] {
        match node.attribute(IMAGE, attr).await {
            Ok(Some(src)) if !src.trim().is_empty() => return Some(src),
            Ok(_) => {}
            Err(BrowserError::ElementNotFound(_)) => return None,
            Err(e) => {
                debug!(error = %e, "Could not read image reference");
                return None;
            }
        }
    }
    None
}

/// Search the site and collect the records, closing the browser afterwards.
///
/// Navigation failures are logged and produce an empty result.
#[instrument(level = "info", skip_all, fields(search_phrase = %ctx.search_phrase))]
pub async fn scrape<B: Browser>(
    mut browser: B,
    site: &Url,
    ctx: ExtractContext<'_>,
    timeout: Duration,
) -> Vec<ArticleRecord> {
    let records = match submit_search(&mut browser, site, ctx.search_phrase, timeout).await {
        Ok(()) => extract_articles(&mut browser, ctx, timeout).await,
        Err(e) => {
            error!(error = %e, "Search failed");
            Vec::new()
        }
    };

    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser");
    }
    records
}
