//! Command-line interface definitions.
//!
//! Every option can also be set in the YAML settings file; values given here
//! win over the file.

use crate::config::Driver;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for a single scraping run.
///
/// # Examples
///
/// ```sh
/// # Defaults: headless Chromium, parameters from the work item if any
/// apnews_scraper
///
/// # Explicit work item and output directory
/// apnews_scraper --work-item devdata/work-items.json -o ./output
///
/// # No Chromium available
/// apnews_scraper --driver static --no-images
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    /// JSON file holding the input work item
    #[arg(short, long, env = "RPA_INPUT_WORKITEM_PATH")]
    pub work_item: Option<PathBuf>,

    /// Directory the spreadsheet is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Browser backend used to run the search
    #[arg(short, long, value_enum)]
    pub driver: Option<Driver>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Skip image downloads and leave the Image Filename column out
    #[arg(long)]
    pub no_images: bool,

    /// Seconds to wait for page elements
    #[arg(short, long)]
    pub timeout: Option<u64>,
}
