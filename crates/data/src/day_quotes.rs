//! Parser for the exchange's daily quotes page.
//!
//! The page is an HTML document with one quotes table whose header row names
//! the contract column `合约名称` and the close column `收盘价`. Only those two
//! columns are read.

use std::collections::HashMap;

use regex::Regex;
use tracing::trace;

use crate::error::DceError;

/// Title every genuine daily quotes page carries. The two spaces are part of it.
pub const PAGE_TITLE: &str = "大连商品交易所  日行情表";
pub const CONTRACT_COLUMN: &str = "合约名称";
pub const CLOSE_COLUMN: &str = "收盘价";

/// Close prices of one trading day keyed by lower-cased contract code.
///
/// `None` means the contract was listed without a usable close.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayQuotes {
    closes: HashMap<String, Option<f64>>,
}

impl DayQuotes {
    /// Close for `code`, matched case-insensitively after trimming.
    #[must_use]
    pub fn close(&self, code: &str) -> Option<f64> {
        self.closes
            .get(&code.trim().to_lowercase())
            .copied()
            .flatten()
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.closes.contains_key(&code.trim().to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Compiled patterns for picking the quotes table apart.
#[derive(Debug, Clone)]
pub struct DayQuotesParser {
    table_tag: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
}

impl DayQuotesParser {
    /// # Errors
    /// Returns [`DceError::Pattern`] if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, DceError> {
        Ok(Self {
            table_tag: Regex::new(r"(?i)<(/?)table\b[^>]*>")?,
            row: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>")?,
            cell: Regex::new(r"(?is)<t[hd][^>]*>(.*?)</t[hd]>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
        })
    }

    /// Parses a daily quotes page.
    ///
    /// The first table whose header row has both the contract and close
    /// columns is used; a table nested in another one is checked before its
    /// parent. Close cells that are empty, `-` or not numeric are
    /// recorded as listed without a price. Thousands separators are ignored.
    ///
    /// # Errors
    /// Returns [`DceError::NotDayQuotes`] when the page title is absent and
    /// [`DceError::MissingColumns`] when no table has the expected header.
    pub fn parse(&self, html: &str) -> Result<DayQuotes, DceError> {
        if !html.contains(PAGE_TITLE) {
            return Err(DceError::NotDayQuotes);
        }

        for table in self.tables(html) {
            let mut rows = self
                .row
                .captures_iter(&table)
                .map(|row| self.cells(&row[1]))
                .filter(|cells| !cells.is_empty());

            let Some(header) = rows.next() else {
                continue;
            };
            let contract_idx = header.iter().position(|c| c == CONTRACT_COLUMN);
            let close_idx = header.iter().position(|c| c == CLOSE_COLUMN);
            let (Some(contract_idx), Some(close_idx)) = (contract_idx, close_idx) else {
                continue;
            };

            let mut closes = HashMap::new();
            for cells in rows {
                let Some(code) = cells.get(contract_idx) else {
                    continue;
                };
                if code.is_empty() {
                    continue;
                }
                let close = cells.get(close_idx).and_then(|raw| parse_price(raw));
                // First listing wins when a code repeats.
                closes.entry(code.to_lowercase()).or_insert(close);
            }

            trace!(contracts = closes.len(), "Parsed daily quotes table");
            return Ok(DayQuotes { closes });
        }

        Err(DceError::MissingColumns)
    }

    /// Contents of every closed table in closing order, so a table nested in
    /// a layout table comes before its parent. Nested tables are cut out of
    /// their parent's contents.
    fn tables(&self, html: &str) -> Vec<String> {
        struct Open {
            tag_start: usize,
            content_start: usize,
            children: Vec<(usize, usize)>,
        }

        let mut open: Vec<Open> = Vec::new();
        let mut tables = Vec::new();

        for tag in self.table_tag.captures_iter(html) {
            let Some(whole) = tag.get(0) else {
                continue;
            };
            if tag[1].is_empty() {
                open.push(Open {
                    tag_start: whole.start(),
                    content_start: whole.end(),
                    children: Vec::new(),
                });
                continue;
            }
            // A stray closing tag has nothing to close.
            let Some(table) = open.pop() else {
                continue;
            };

            let mut content = String::new();
            let mut cursor = table.content_start;
            for (start, end) in table.children {
                content.push_str(&html[cursor..start]);
                cursor = end;
            }
            content.push_str(&html[cursor..whole.start()]);
            tables.push(content);

            if let Some(parent) = open.last_mut() {
                parent.children.push((table.tag_start, whole.end()));
            }
        }
        tables
    }

    fn cells(&self, row: &str) -> Vec<String> {
        self.cell
            .captures_iter(row)
            .map(|cell| clean_text(&self.tag.replace_all(&cell[1], "")))
            .collect()
    }
}

fn clean_text(raw: &str) -> String {
    raw.replace("&nbsp;", " ")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}
