//! Spreadsheet output.
//!
//! One worksheet named after the search phrase, a bold header row and one
//! row per article in extraction order:
//!
//! | Title | Date | Description | Image Filename | Search Phrase Count | Contains Money |
//! |-------|------|-------------|----------------|---------------------|----------------|
//!
//! The `Image Filename` column is only written when image downloads are on.

use crate::models::ArticleRecord;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Sheet name used when the search phrase leaves nothing usable.
pub const FALLBACK_SHEET_NAME: &str = "News Data";

const MAX_SHEET_NAME_CHARS: usize = 31;

/// Column headers in output order.
pub fn headers(include_images: bool) -> Vec<&'static str> {
    let mut headers = vec!["Title", "Date", "Description"];
    if include_images {
        headers.push("Image Filename");
    }
    headers.extend(["Search Phrase Count", "Contains Money"]);
    headers
}

/// Make a search phrase acceptable as an Excel worksheet name.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sheet_name("cricket news"), "cricket news");
/// assert_eq!(sheet_name("[]:*?"), "News Data");
/// ```
pub fn sheet_name(search_phrase: &str) -> String {
    let cleaned: String = search_phrase
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let truncated: String = cleaned
        .trim()
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let name = truncated.trim().trim_matches('\'');
    if name.is_empty() || name.eq_ignore_ascii_case("history") {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Path of the report inside `output_dir`.
///
/// With a timestamp the name becomes `{report_name}_YYYYMMDD_HHMMSS.xlsx`.
pub fn report_path(output_dir: &str, report_name: &str, timestamp: Option<NaiveDateTime>) -> PathBuf {
    let file_name = match timestamp {
        Some(ts) => format!("{}_{}.xlsx", report_name, ts.format("%Y%m%d_%H%M%S")),
        None => format!("{report_name}.xlsx"),
    };
    Path::new(output_dir).join(file_name)
}

/// Write the records to `path`. Zero records still produce a header-only sheet.
#[instrument(level = "info", skip(records, path), fields(count = records.len(), path = %path.display()))]
pub fn write_report(
    records: &[ArticleRecord],
    search_phrase: &str,
    include_images: bool,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(search_phrase))?;

    for (col, header) in headers(include_images).into_iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &bold)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        let mut col: u16 = 0;
        worksheet.write_string(row, col, &record.title)?;
        col += 1;
        worksheet.write_string(row, col, &record.date)?;
        col += 1;
        worksheet.write_string(row, col, &record.description)?;
        col += 1;
        if include_images {
            worksheet.write_string(row, col, &record.image_filename)?;
            col += 1;
        }
        worksheet.write_number(row, col, record.phrase_count as f64)?;
        col += 1;
        worksheet.write_boolean(row, col, record.contains_money)?;
    }
    worksheet.autofit();

    workbook.save(path)?;
    info!("Wrote spreadsheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use chrono::NaiveDate;

    fn record(title: &str) -> ArticleRecord {
        ArticleRecord {
            title: title.to_string(),
            date: "10-12".to_string(),
            description: "more cricket".to_string(),
            image_filename: "Not Available".to_string(),
            phrase_count: 2,
            contains_money: false,
        }
    }

    #[test]
    fn test_headers_with_and_without_images() {
        assert_eq!(
            headers(true),
            vec![
                "Title",
                "Date",
                "Description",
                "Image Filename",
                "Search Phrase Count",
                "Contains Money"
            ]
        );
        assert_eq!(
            headers(false),
            vec!["Title", "Date", "Description", "Search Phrase Count", "Contains Money"]
        );
    }

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name("cricket news"), "cricket news");
        assert_eq!(sheet_name("Q3: profits/losses?"), "Q3 profitslosses");
        assert_eq!(sheet_name("'quoted'"), "quoted");
        assert_eq!(sheet_name("[]:*?"), FALLBACK_SHEET_NAME);
        assert_eq!(sheet_name(""), FALLBACK_SHEET_NAME);
        assert_eq!(sheet_name("history"), FALLBACK_SHEET_NAME);
        assert_eq!(sheet_name(&"x".repeat(40)).chars().count(), 31);
    }

    #[test]
    fn test_report_path() {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        assert_eq!(
            report_path("output", "news_articles", Some(ts)),
            PathBuf::from("output/news_articles_20261019_093005.xlsx")
        );
        assert_eq!(
            report_path("output", "news_articles", None),
            PathBuf::from("output/news_articles.xlsx")
        );
    }

    /// Sheet names and cell values of a written report.
    fn read_back(path: &Path) -> (Vec<String>, Vec<Vec<Data>>) {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let names = workbook.sheet_names();
        let range = workbook.worksheet_range(&names[0]).unwrap();
        (names, range.rows().map(|row| row.to_vec()).collect())
    }

    fn header_row(include_images: bool) -> Vec<Data> {
        headers(include_images)
            .into_iter()
            .map(|h| Data::String(h.to_string()))
            .collect()
    }

    fn text(s: &str) -> Data {
        Data::String(s.to_string())
    }

    #[test]
    fn test_empty_report_has_header_row_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news_articles.xlsx");
        write_report(&[], "cricket news", true, &path).unwrap();

        let (sheets, rows) = read_back(&path);
        assert_eq!(sheets, vec!["cricket news"]);
        assert_eq!(rows, vec![header_row(true)]);
    }

    #[test]
    fn test_report_rows_with_image_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let mut first = record("Cricket news today");
        first.image_filename = "Cricket_news_today.jpg".to_string();
        first.contains_money = true;
        write_report(&[first, record("Second story")], "cricket", true, &path).unwrap();

        let (_, rows) = read_back(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header_row(true));
        assert_eq!(
            rows[1],
            vec![
                text("Cricket news today"),
                text("10-12"),
                text("more cricket"),
                text("Cricket_news_today.jpg"),
                Data::Float(2.0),
                Data::Bool(true),
            ]
        );
        assert_eq!(rows[2][0], text("Second story"));
        assert_eq!(rows[2][3], text("Not Available"));
        assert_eq!(rows[2][5], Data::Bool(false));
    }

    #[test]
    fn test_report_rows_without_image_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let records = vec![record("Cricket news today"), record("Second story")];
        write_report(&records, "Q3: results?", false, &path).unwrap();

        let (sheets, rows) = read_back(&path);
        assert_eq!(sheets, vec!["Q3 results"]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], header_row(false));
        assert_eq!(
            rows[2],
            vec![
                text("Second story"),
                text("10-12"),
                text("more cricket"),
                Data::Float(2.0),
                Data::Bool(false),
            ]
        );
    }
}
