//! Chromium backend over the DevTools protocol.
//!
//! Launches a local Chromium with `chromiumoxide`, keeps one page open for the
//! run and polls the DOM for the waits the search flow needs.

use super::{Browser, BrowserError, POLL_INTERVAL, PageNode, normalize_text};
use chromiumoxide::{Browser as CdpBrowser, BrowserConfig, Element, Page};
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const IS_VISIBLE_JS: &str = "function() { \
    const rect = this.getBoundingClientRect(); \
    const style = window.getComputedStyle(this); \
    return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; \
}";

pub struct ChromeBrowser {
    browser: CdpBrowser,
    page: Page,
    handler: JoinHandle<()>,
}

impl std::fmt::Debug for ChromeBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeBrowser").finish_non_exhaustive()
    }
}

impl ChromeBrowser {
    /// Launch Chromium and open a blank page.
    #[instrument(level = "info")]
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder().window_size(1366, 768).args([
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--no-first-run",
        ]);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler event error");
                }
            }
            debug!("CDP handler finished");
        });

        let page = browser.new_page("about:blank").await?;
        info!(headless, "Browser launched");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    async fn element_visible(&self, selector: &str) -> bool {
        let Ok(element) = self.page.find_element(selector).await else {
            return false;
        };
        match element.call_js_fn(IS_VISIBLE_JS, false).await {
            Ok(ret) => ret.result.value.and_then(|v| v.as_bool()).unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl Browser for ChromeBrowser {
    type Node = ChromeNode;

    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.page.goto(url).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.element_visible(selector).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: selector.to_string(),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn input_text(&mut self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        let needle = text.to_lowercase();
        loop {
            match self.page.content().await {
                Ok(html) if html.to_lowercase().contains(&needle) => return Ok(()),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Page content not readable yet"),
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout {
                    what: format!("page text {text:?}"),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    #[instrument(level = "info", skip(self))]
    async fn find_all(
        &mut self,
        container: &str,
        item: &str,
        timeout: Duration,
    ) -> Result<Vec<ChromeNode>, BrowserError> {
        let deadline = Instant::now() + timeout;
        let root = loop {
            match self.page.find_element(container).await {
                Ok(element) => break element,
                Err(e) if Instant::now() >= deadline => {
                    debug!(error = %e, "Container lookup failed");
                    return Err(BrowserError::Timeout {
                        what: container.to_string(),
                        timeout,
                    });
                }
                Err(_) => sleep(POLL_INTERVAL).await,
            }
        };

        let nodes: Vec<ChromeNode> = root
            .find_elements(item)
            .await?
            .into_iter()
            .map(ChromeNode)
            .collect();
        debug!(count = nodes.len(), "Found result items");
        Ok(nodes)
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        closed?;
        info!("Browser closed");
        Ok(())
    }
}

/// A result item element inside the live page.
pub struct ChromeNode(Element);

impl ChromeNode {
    async fn child(&self, selector: &str) -> Result<Element, BrowserError> {
        self.0
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))
    }
}

impl PageNode for ChromeNode {
    async fn text(&self, selector: &str) -> Result<String, BrowserError> {
        let text = self.child(selector).await?.inner_text().await?;
        Ok(normalize_text(&text.unwrap_or_default()))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.child(selector).await?.attribute(name).await?)
    }
}
