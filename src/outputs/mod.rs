//! Report generation.
//!
//! - [`xlsx`]: writes the article records to a spreadsheet
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── news_articles_20261019_093000.xlsx
//! └── news_images/
//!     ├── Cricket_news_today.jpg
//!     └── ...
//! ```

pub mod xlsx;
