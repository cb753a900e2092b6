//! Data models for scraped articles and run parameters.
//!
//! - [`SearchParameters`]: what to search for, resolved from the work item
//! - [`ArticleRecord`]: one article that survived date filtering, ready to be
//!   written as a spreadsheet row

/// Filename recorded when an article has no image or its download failed.
pub const IMAGE_NOT_AVAILABLE: &str = "Not Available";

/// Parameters for a single run.
///
/// Resolved once at startup from the input work item, falling back to
/// defaults for anything missing (see [`crate::workitems::resolve_parameters`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParameters {
    /// Phrase typed into the site search and counted in each article.
    pub search_phrase: String,
    /// News category requested by the work item. Logged only; the site search
    /// does not filter on it.
    pub category: String,
    /// How many months to look back. `0` and `1` both mean the current month.
    pub months: i64,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            search_phrase: "cricket news".to_string(),
            category: "sports".to_string(),
            months: 1,
        }
    }
}

/// A single article extracted from the search results.
///
/// Field order matches the spreadsheet columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    /// The article headline.
    pub title: String,
    /// Publication date normalized to `MM-DD`.
    pub date: String,
    /// The promo description shown under the headline.
    pub description: String,
    /// Name of the saved image file, or [`IMAGE_NOT_AVAILABLE`].
    pub image_filename: String,
    /// Case-insensitive occurrences of the search phrase in title and description.
    pub phrase_count: usize,
    /// Whether title or description mention an amount of money.
    pub contains_money: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = SearchParameters::default();
        assert_eq!(params.search_phrase, "cricket news");
        assert_eq!(params.category, "sports");
        assert_eq!(params.months, 1);
    }
}
