//! Site scrapers.
//!
//! | Source | Module | Method |
//! |--------|--------|--------|
//! | AP News | [`apnews`] | Site search, result cards of the standard page list |
//!
//! A scraper exports:
//! - `submit_search(browser, site, phrase, timeout)`: drive the site to its results page
//! - `extract_articles(browser, ctx, timeout)`: read the result cards into records
//! - `scrape(browser, site, ctx, timeout)`: both of the above, then close the browser
//!
//! Scrapers are generic over [`crate::browser::Browser`] so any backend can run them.

pub mod apnews;
