//! Run settings loaded from an optional YAML file and overridden from the CLI.
//!
//! ```yaml
//! site_url: https://apnews.com/
//! output_dir: output
//! image_dir: output/news_images
//! wait_timeout_secs: 10
//! driver: chrome
//! download_images: true
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use crate::cli::Cli;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Browser backend used to run the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Chromium driven over the DevTools protocol.
    Chrome,
    /// Plain HTTP fetch of the results page, parsed without a browser.
    Static,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub site_url: String,
    pub output_dir: String,
    pub image_dir: String,
    /// Spreadsheet name without extension.
    pub report_name: String,
    /// Append a `_YYYYMMDD_HHMMSS` suffix so runs never overwrite each other.
    pub timestamped_report: bool,
    pub wait_timeout_secs: u64,
    pub driver: Driver,
    pub headless: bool,
    pub download_images: bool,
    /// Number of title characters used for image filenames, clamped to 15..=30.
    pub image_title_chars: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site_url: "https://apnews.com/".to_string(),
            output_dir: "output".to_string(),
            image_dir: "output/news_images".to_string(),
            report_name: "news_articles".to_string(),
            timestamped_report: true,
            wait_timeout_secs: 10,
            driver: Driver::Chrome,
            headless: true,
            download_images: true,
            image_title_chars: 30,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&raw)?;
        info!(path, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply command-line overrides on top of the file settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(driver) = cli.driver {
            self.driver = driver;
        }
        if let Some(secs) = cli.timeout {
            self.wait_timeout_secs = secs;
        }
        if cli.headed {
            self.headless = false;
        }
        if cli.no_images {
            self.download_images = false;
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn title_chars(&self) -> usize {
        self.image_title_chars.clamp(15, 30)
    }
}
