//! HTML parser for release-list pages
//!
//! This module handles decoding a raw listing page into:
//! - The ordered entries of its results table
//! - The total page count advertised by its pagination control
//!
//! Both functions are pure and tolerate missing structure: an absent table is
//! reported as [`ParseError::MissingTable`], an absent pagination control reads
//! as a page count of 0.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// The first table inside the release container holds the results
const RESULTS_TABLE: &str = ".showrelease_tb > table";

/// Items of the pagination list
const PAGINATION_ITEMS: &str = r#"div[class="pagination"] > ul > li"#;

/// Labels (lowercased) of the pagination item that jumps to the last page
const LAST_PAGE_LABELS: [&str; 2] = ["ultima", "last"];

/// Attribute of the last-page item carrying the page number
const PAGE_ATTRIBUTE: &str = "p";

// Column positions within a result row
const COL_TORRENT: usize = 0;
const COL_MAGNET: usize = 1;
const COL_LEECHES: usize = 3;
const COL_SEEDERS: usize = 4;
const COL_DOWNLOADED: usize = 5;
const COL_TITLE: usize = 6;
const EXPECTED_COLUMNS: usize = COL_TITLE + 1;

/// One decoded result record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Link to the .torrent file
    pub torrent_link: String,

    /// Magnet URI
    pub magnet_link: String,

    /// Release title
    pub title: String,

    /// Peers currently downloading
    pub leech_count: u64,

    /// Peers currently seeding
    pub seeder_count: u64,

    /// Completed downloads
    pub download_count: u64,
}

/// Page-scoped decode failures; none of them abort a crawl
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("results table not found")]
    MissingTable,

    #[error("row {row}: expected {expected} columns, found {found}")]
    MissingColumns {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: column {column} has no link")]
    MissingLink { row: usize, column: usize },

    #[error("row {row}: column {column} is not a count: '{value}'")]
    InvalidCount {
        row: usize,
        column: usize,
        value: String,
    },
}

/// Entries decoded from one page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Entries in table order
    pub entries: Vec<Entry>,

    /// Rows that could not be decoded and were skipped
    pub rejected: Vec<ParseError>,
}

/// Decodes the results table of a listing page
///
/// The first row of the table is a header and is skipped. Every other row is
/// decoded by fixed column position; rows that do not match are collected in
/// [`ParsedPage::rejected`] while the rest of the table still decodes.
///
/// # Returns
///
/// * `Ok(ParsedPage)` - The page had a results table
/// * `Err(ParseError::MissingTable)` - No results table was found
///
/// # Example
///
/// ```
/// use tnt_crawler::crawler::extract_entries;
///
/// let html = r#"<div class="showrelease_tb"><table>
///   <tr><th>header</th></tr>
///   <tr><td><a href="/t.torrent">T</a></td><td><a href="magnet:?xt=1">M</a></td>
///       <td></td><td>1</td><td>2</td><td>3</td><td><a href="/r/1">Title</a></td></tr>
/// </table></div>"#;
/// let parsed = extract_entries(html).unwrap();
/// assert_eq!(parsed.entries[0].title, "Title");
/// ```
pub fn extract_entries(html: &str) -> Result<ParsedPage, ParseError> {
    let document = Html::parse_document(html);

    let table = Selector::parse(RESULTS_TABLE)
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .ok_or(ParseError::MissingTable)?;

    let mut parsed = ParsedPage::default();

    let Ok(row_selector) = Selector::parse("tr") else {
        return Ok(parsed);
    };

    for (index, row) in table.select(&row_selector).enumerate().skip(1) {
        match decode_row(index, row) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => parsed.rejected.push(e),
        }
    }

    Ok(parsed)
}

/// Reads the total page count from the pagination control of page 1
///
/// Returns 0 when there is no last-page item or its page attribute is not a
/// number, meaning the listing has a single page.
pub fn read_page_count(html: &str) -> u32 {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse(PAGINATION_ITEMS) else {
        return 0;
    };

    for item in document.select(&selector) {
        let label = item.text().collect::<String>().trim().to_lowercase();
        if !LAST_PAGE_LABELS.contains(&label.as_str()) {
            continue;
        }

        let attribute = item.value().attr(PAGE_ATTRIBUTE);
        return match attribute.and_then(|value| value.trim().parse::<u32>().ok()) {
            Some(count) => count,
            None => {
                tracing::debug!(?attribute, "Last-page item has no usable page number");
                0
            }
        };
    }

    0
}

/// Decodes one table row into an entry
fn decode_row(row_index: usize, row: ElementRef<'_>) -> Result<Entry, ParseError> {
    let cells: Vec<ElementRef<'_>> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name() == "td")
        .collect();

    if cells.len() < EXPECTED_COLUMNS {
        return Err(ParseError::MissingColumns {
            row: row_index,
            expected: EXPECTED_COLUMNS,
            found: cells.len(),
        });
    }

    let title = first_link(cells[COL_TITLE])
        .map(|link| link.text().collect::<String>().trim().to_string())
        .ok_or(ParseError::MissingLink {
            row: row_index,
            column: COL_TITLE,
        })?;

    Ok(Entry {
        torrent_link: link_href(row_index, &cells, COL_TORRENT)?,
        magnet_link: link_href(row_index, &cells, COL_MAGNET)?,
        title,
        leech_count: cell_count(row_index, &cells, COL_LEECHES)?,
        seeder_count: cell_count(row_index, &cells, COL_SEEDERS)?,
        download_count: cell_count(row_index, &cells, COL_DOWNLOADED)?,
    })
}

fn first_link(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("a").ok()?;
    cell.select(&selector).next()
}

fn link_href(row: usize, cells: &[ElementRef<'_>], column: usize) -> Result<String, ParseError> {
    first_link(cells[column])
        .and_then(|link| link.value().attr("href"))
        .map(|href| href.trim().to_string())
        .ok_or(ParseError::MissingLink { row, column })
}

fn cell_count(row: usize, cells: &[ElementRef<'_>], column: usize) -> Result<u64, ParseError> {
    let value = cells[column].text().collect::<String>();
    let value = value.trim();
    value.parse::<u64>().map_err(|_| ParseError::InvalidCount {
        row,
        column,
        value: value.to_string(),
    })
}
