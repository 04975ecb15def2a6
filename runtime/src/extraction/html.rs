//! Last-resort extraction from the page markup.
//!
//! Two tiers: header-driven table parsing first, then class-name driven div
//! rows when no table produced anything.

use crate::model::{now_stamp, IndexRecord};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

/// Header keywords that mark a table as an indices listing.
const TABLE_KEYWORDS: &[&str] = &["index", "price", "change"];

/// Minimum number of `td` cells for a data row.
const MIN_ROW_CELLS: usize = 3;

/// Kind of data a table column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    /// Recognised so price headers are not misread; never emitted.
    Price,
    Change,
    High,
    Low,
    Open,
    PrevClose,
}

/// Header classification, first matching rule wins: (kind, any-of, none-of).
const HEADER_RULES: &[(Column, &[&str], &[&str])] = &[
    (Column::Name, &["index", "name"], &[]),
    (Column::Price, &["price", "value", "ltp"], &[]),
    (Column::Change, &["change"], &["percent"]),
    (Column::High, &["high", "day high"], &[]),
    (Column::Low, &["low", "day low"], &[]),
    (Column::Open, &["open", "opening"], &[]),
    (Column::PrevClose, &["prev", "previous", "close"], &[]),
];

/// Div rows and the per-field class lists searched inside each.
const DIV_ROWS: &str = "div.index-row, div.table-row, div.list-item";
const DIV_NAME: &str = ".name, .index-name, .title";
const DIV_CHANGE: &str = ".change, .absolute-change";
const DIV_HIGH: &str = ".high, .day-high";
const DIV_LOW: &str = ".low, .day-low";
const DIV_OPEN: &str = ".open, .open-price";
const DIV_PREV_CLOSE: &str = ".prev-close, .previous-close, .prev-day";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Extract index records from tables, falling back to div rows.
pub fn extract_from_html(document: &Html) -> Vec<IndexRecord> {
    let records = extract_from_tables(document);
    if !records.is_empty() {
        info!(count = records.len(), "extracted indices from tables");
        return records;
    }

    let records = extract_from_divs(document);
    if !records.is_empty() {
        info!(count = records.len(), "extracted indices from div rows");
    }
    records
}

// ── Table tier ──────────────────────────────────────────────────────────────

/// Column positions per kind. A later header of the same kind replaces an
/// earlier one.
#[derive(Debug, Default)]
struct ColumnMap {
    columns: Vec<(Column, usize)>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        let mut map = Self::default();
        for (i, header) in headers.iter().enumerate() {
            let kind = HEADER_RULES.iter().find_map(|(kind, any, none)| {
                let hit = any.iter().any(|kw| header.contains(kw))
                    && !none.iter().any(|kw| header.contains(kw));
                hit.then_some(*kind)
            });
            if let Some(kind) = kind {
                map.columns.retain(|(k, _)| *k != kind);
                map.columns.push((kind, i));
            }
        }
        map
    }

    fn get(&self, kind: Column) -> Option<usize> {
        self.columns
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, i)| *i)
    }
}

fn extract_from_tables(document: &Html) -> Vec<IndexRecord> {
    let table_sel = selector("table");
    let row_sel = selector("tr");
    let header_sel = selector("th, td");
    let cell_sel = selector("td");
    let div_sel = selector("div");

    let mut records = Vec::new();
    for table in document.select(&table_sel) {
        let rows: Vec<ElementRef<'_>> = table.select(&row_sel).collect();
        if rows.len() <= 1 {
            continue;
        }

        let headers: Vec<String> = rows[0]
            .select(&header_sel)
            .map(|c| element_text(&c).to_lowercase())
            .collect();
        let joined = headers.join(" ");
        if !TABLE_KEYWORDS.iter().any(|kw| joined.contains(kw)) {
            debug!(headers = %joined, "skipping table without index headers");
            continue;
        }

        let columns = ColumnMap::from_headers(&headers);
        for row in &rows[1..] {
            let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
            if cells.len() < MIN_ROW_CELLS {
                continue;
            }

            let name = cells
                .get(columns.get(Column::Name).unwrap_or(0))
                .map(|cell| {
                    cell.select(&div_sel)
                        .next()
                        .map(|inner| element_text(&inner))
                        .unwrap_or_else(|| element_text(cell))
                })
                .unwrap_or_default();
            if name.is_empty() {
                continue;
            }

            let cell_at = |kind: Column| -> String {
                columns
                    .get(kind)
                    .and_then(|i| cells.get(i))
                    .map(element_text)
                    .unwrap_or_default()
            };

            records.push(IndexRecord {
                name,
                change: cell_at(Column::Change),
                high: cell_at(Column::High),
                low: cell_at(Column::Low),
                open: cell_at(Column::Open),
                prev_close: cell_at(Column::PrevClose),
                timestamp: now_stamp(),
            });
        }
    }
    records
}

// ── Div tier ────────────────────────────────────────────────────────────────

fn extract_from_divs(document: &Html) -> Vec<IndexRecord> {
    let row_sel = selector(DIV_ROWS);
    let name_sel = selector(DIV_NAME);
    let change_sel = selector(DIV_CHANGE);
    let high_sel = selector(DIV_HIGH);
    let low_sel = selector(DIV_LOW);
    let open_sel = selector(DIV_OPEN);
    let prev_close_sel = selector(DIV_PREV_CLOSE);

    let mut records = Vec::new();
    for row in document.select(&row_sel) {
        let Some(name_el) = row.select(&name_sel).next() else {
            continue;
        };
        let first_text = |sel: &Selector| {
            row.select(sel)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default()
        };

        records.push(IndexRecord {
            name: element_text(&name_el),
            change: first_text(&change_sel),
            high: first_text(&high_sel),
            low: first_text(&low_sel),
            open: first_text(&open_sel),
            prev_close: first_text(&prev_close_sel),
            timestamp: now_stamp(),
        });
    }
    records
}

/// All descendant text, trimmed.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
