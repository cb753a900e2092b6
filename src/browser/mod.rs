//! Browser capabilities used by the scraper.
//!
//! The search and extraction code only talks to the [`Browser`] and
//! [`PageNode`] traits, so the backend can be swapped:
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | Chromium | [`chrome`] | Drives the real search UI over CDP |
//! | Static HTML | [`html`] | Fetches the results page over HTTP; also the test fake |

use std::time::Duration;
use thiserror::Error;

pub mod chrome;
pub mod html;

pub use chrome::ChromeBrowser;
pub use html::StaticBrowser;

/// Interval between polls while waiting for the page.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid selector {0:?}")]
    InvalidSelector(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

/// A browser session owned by one run.
pub trait Browser {
    type Node: PageNode;

    /// Whether the backend can click and type. Non-interactive backends are
    /// pointed straight at the results URL instead.
    fn interactive(&self) -> bool {
        true
    }

    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Wait until an element matching `selector` is visible.
    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError>;

    async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), BrowserError>;

    /// Wait until the page contains `text`.
    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Wait for the first `container` element, then return every `item` inside it.
    async fn find_all(
        &mut self,
        container: &str,
        item: &str,
        timeout: Duration,
    ) -> Result<Vec<Self::Node>, BrowserError>;

    async fn close(self) -> Result<(), BrowserError>;
}

/// One element on the page, queried relative to itself.
pub trait PageNode {
    /// Text of the first descendant matching `selector`.
    async fn text(&self, selector: &str) -> Result<String, BrowserError>;

    /// Attribute `name` of the first descendant matching `selector`.
    ///
    /// `Ok(None)` means the element exists without that attribute.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError>;
}

/// Collapse runs of whitespace the way rendered text reads.
pub(crate) fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
