//! Browser backend over plain HTML.
//!
//! Pages are fetched with `reqwest` and queried with `scraper`. There is no
//! JavaScript and no UI, so the search form cannot be driven; callers check
//! [`Browser::interactive`] and navigate to the results URL directly.
//!
//! [`StaticBrowser::from_html`] builds a session over a fixed document, which
//! is how the extraction code is exercised in tests.

use super::{Browser, BrowserError, PageNode, normalize_text};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

fn parse_selector(selector: &str) -> Result<Selector, BrowserError> {
    Selector::parse(selector).map_err(|_| BrowserError::InvalidSelector(selector.to_string()))
}

#[derive(Debug)]
pub struct StaticBrowser {
    client: Option<Client>,
    html: String,
}

impl StaticBrowser {
    /// Live session; every page fetch is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client: Some(client),
            html: String::new(),
        })
    }

    /// Session over a fixed document. Navigation is unavailable.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            client: None,
            html: html.into(),
        }
    }

    fn select_first(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(&self.html);
        Ok(document.select(&selector).next().map(|el| el.html()))
    }
}

impl Browser for StaticBrowser {
    type Node = HtmlNode;

    fn interactive(&self) -> bool {
        false
    }

    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let client = self.client.as_ref().ok_or(BrowserError::Unsupported("navigation"))?;
        let response = client.get(url).send().await?.error_for_status()?;
        self.html = response.text().await?;
        info!(bytes = self.html.len(), "Fetched page");
        Ok(())
    }

    async fn wait_visible(&mut self, selector: &str, _timeout: Duration) -> Result<(), BrowserError> {
        match self.select_first(selector)? {
            Some(_) => Ok(()),
            None => Err(BrowserError::ElementNotFound(selector.to_string())),
        }
    }

    async fn click(&mut self, _selector: &str) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported("click"))
    }

    async fn input_text(&mut self, _selector: &str, _text: &str) -> Result<(), BrowserError> {
        Err(BrowserError::Unsupported("text input"))
    }

    async fn wait_for_text(&mut self, text: &str, timeout: Duration) -> Result<(), BrowserError> {
        if self.html.to_lowercase().contains(&text.to_lowercase()) {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                what: format!("page text {text:?}"),
                timeout,
            })
        }
    }

    async fn find_all(
        &mut self,
        container: &str,
        item: &str,
        _timeout: Duration,
    ) -> Result<Vec<HtmlNode>, BrowserError> {
        let container_selector = parse_selector(container)?;
        let item_selector = parse_selector(item)?;
        let document = Html::parse_document(&self.html);
        let root = document
            .select(&container_selector)
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(container.to_string()))?;

        let nodes: Vec<HtmlNode> = root
            .select(&item_selector)
            .map(|el| HtmlNode { html: el.html() })
            .collect();
        debug!(count = nodes.len(), container, item, "Found result items");
        Ok(nodes)
    }

    async fn close(self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// A detached copy of one element's outer HTML.
#[derive(Debug, Clone)]
pub struct HtmlNode {
    html: String,
}

impl HtmlNode {
    fn with_first<T>(
        &self,
        selector: &str,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T, BrowserError> {
        let parsed = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.html);
        fragment
            .select(&parsed)
            .next()
            .map(f)
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))
    }
}

impl PageNode for HtmlNode {
    async fn text(&self, selector: &str) -> Result<String, BrowserError> {
        self.with_first(selector, |el| normalize_text(&el.text().collect::<String>()))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        self.with_first(selector, |el| el.value().attr(name).map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    const PAGE: &str = r#"
        <html><body>
          <div class="Results">
            <ul class="Items">
              <li class="Item"><h3 class="Title">First <b>story</b></h3><img class="Image" src="/a.jpg"></li>
              <li class="Item"><h3 class="Title">Second story</h3><img class="Image"></li>
            </ul>
          </div>
        </body></html>
    "#;

    const WAIT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_find_all_and_query_nodes() {
        let mut browser = StaticBrowser::from_html(PAGE);
        let nodes = browser.find_all(".Results .Items", ".Item", WAIT).await.unwrap();
        assert_eq!(nodes.len(), 2);

        assert_eq!(nodes[0].text(".Title").await.unwrap(), "First story");
        assert_eq!(
            nodes[0].attribute(".Image", "src").await.unwrap(),
            Some("/a.jpg".to_string())
        );
        assert_eq!(nodes[1].attribute(".Image", "src").await.unwrap(), None);
        assert!(matches!(
            nodes[1].text(".Missing").await,
            Err(BrowserError::ElementNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_container() {
        let mut browser = StaticBrowser::from_html(PAGE);
        let result = browser.find_all(".Nope", ".Item", WAIT).await;
        assert!(matches!(result, Err(BrowserError::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let mut browser = StaticBrowser::from_html(PAGE);
        let result = browser.wait_visible("[[", WAIT).await;
        assert!(matches!(result, Err(BrowserError::InvalidSelector(_))));
    }

    #[tokio::test]
    async fn test_page_text_and_interaction() {
        let mut browser = StaticBrowser::from_html(PAGE);
        assert!(!browser.interactive());
        assert!(browser.wait_for_text("second STORY", WAIT).await.is_ok());
        assert!(matches!(
            browser.wait_for_text("cricket", WAIT).await,
            Err(BrowserError::Timeout { .. })
        ));
        assert!(matches!(
            browser.click(".Item").await,
            Err(BrowserError::Unsupported(_))
        ));
        assert!(matches!(
            browser.navigate("https://apnews.com/").await,
            Err(BrowserError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_fetch_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let mut browser = StaticBrowser::new(Duration::from_millis(200)).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            browser.navigate(&format!("http://{addr}/search?q=cricket")),
        )
        .await
        .expect("client timeout should fire first");
        assert!(matches!(result, Err(BrowserError::Http(_))));
    }
}
