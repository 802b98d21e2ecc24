//! In-memory dashboard page: one table body plus a few text elements looked
//! up by id, serialized to a standalone HTML document on publish.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::render::{Cell, Column, RenderedRow};

pub const TABLE_ID: &str = "token-table";
pub const UTC_NOW_ID: &str = "utc-now";
pub const LAST_REFRESH_ID: &str = "last-refresh";
pub const NEXT_REFRESH_ID: &str = "next-refresh";

pub const CLOCK_ELEMENT_IDS: [&str; 3] = [UTC_NOW_ID, LAST_REFRESH_ID, NEXT_REFRESH_ID];

#[derive(Debug, Clone, Default)]
pub struct Page {
    title: String,
    tbody: Vec<RenderedRow>,
    elements: BTreeMap<&'static str, String>,
    /// Bumped on every table rebuild.
    generation: u64,
}

impl Page {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Page carrying the refresh clock elements.
    pub fn with_clock(title: &str) -> Self {
        let mut page = Self::new(title);
        for id in CLOCK_ELEMENT_IDS {
            page.add_element(id);
        }
        page
    }

    pub fn add_element(&mut self, id: &'static str) {
        self.elements.entry(id).or_default();
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Write text into an element. Returns false (and does nothing) when the
    /// page has no such element.
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        match self.elements.get_mut(id) {
            Some(slot) => {
                slot.clear();
                slot.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(String::as_str)
    }

    /// Clear the table body and fill it with `rows`.
    pub fn replace_rows(&mut self, rows: Vec<RenderedRow>) {
        self.tbody.clear();
        self.tbody.extend(rows);
        self.generation += 1;
    }

    pub fn rows(&self) -> &[RenderedRow] {
        &self.tbody
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `<tbody>` contents only.
    pub fn tbody_html(&self) -> String {
        let mut out = String::new();
        for row in &self.tbody {
            out.push_str("<tr>");
            for cell in &row.cells {
                write_cell(&mut out, cell);
            }
            out.push_str("</tr>\n");
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::with_capacity(4096 + self.tbody.len() * 1024);
        out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(out, "<title>{}</title>", escape_html(&self.title));
        out.push_str(STYLE);
        out.push_str("</head>\n<body>\n");
        let _ = writeln!(out, "<h1>{}</h1>", escape_html(&self.title));

        if !self.elements.is_empty() {
            out.push_str("<div class=\"clock\">\n");
            for (id, text) in &self.elements {
                let _ = writeln!(
                    out,
                    "<span class=\"label\">{}</span> <span id=\"{}\">{}</span>",
                    element_label(id),
                    id,
                    escape_html(text)
                );
            }
            out.push_str("</div>\n");
        }

        let _ = writeln!(out, "<table id=\"{}\">", TABLE_ID);
        out.push_str("<thead><tr>");
        for column in Column::ALL {
            let _ = write!(out, "<th>{}</th>", escape_html(column.title()));
        }
        out.push_str("</tr></thead>\n<tbody>\n");
        out.push_str(&self.tbody_html());
        out.push_str("</tbody>\n</table>\n</body>\n</html>\n");
        out
    }
}

fn write_cell(out: &mut String, cell: &Cell) {
    let mut classes = Vec::new();
    if cell.style.highlight {
        classes.push("highlight");
    }
    if cell.style.overvalued {
        classes.push("overvalued");
    }
    if classes.is_empty() {
        out.push_str("<td>");
    } else {
        let _ = write!(out, "<td class=\"{}\">", classes.join(" "));
    }
    match &cell.href {
        Some(href) => {
            let _ = write!(
                out,
                "<a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a>",
                escape_html(href),
                escape_html(&cell.text)
            );
        }
        None => out.push_str(&escape_html(&cell.text)),
    }
    out.push_str("</td>");
}

fn element_label(id: &str) -> &'static str {
    match id {
        UTC_NOW_ID => "UTC now:",
        LAST_REFRESH_ID => "Last refresh:",
        NEXT_REFRESH_ID => "Next refresh:",
        _ => "",
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 16px; }
table { border-collapse: collapse; font-size: 13px; }
th, td { border: 1px solid #ddd; padding: 4px 8px; white-space: nowrap; }
th { background: #f4f4f4; }
td.highlight { background: #fff7d6; }
td.overvalued { color: #c00; font-weight: bold; }
.clock { margin-bottom: 12px; font-family: monospace; }
.clock .label { color: #666; margin-left: 12px; }
</style>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;
    use crate::render::Renderer;

    #[test]
    fn test_set_text_missing_element_is_noop() {
        let mut page = Page::new("t");
        assert!(!page.set_text(UTC_NOW_ID, "12:00:00"));
        assert!(page.text(UTC_NOW_ID).is_none());

        let mut page = Page::with_clock("t");
        assert!(page.set_text(UTC_NOW_ID, "12:00:00"));
        assert_eq!(page.text(UTC_NOW_ID), Some("12:00:00"));
        assert_eq!(page.text(LAST_REFRESH_ID), Some(""));
    }

    #[test]
    fn test_replace_rows_bumps_generation() {
        let mut page = Page::new("t");
        let rows = Renderer::default().render(&[Row::default()]);
        page.replace_rows(rows.clone());
        page.replace_rows(rows);
        assert_eq!(page.generation(), 2);
        assert_eq!(page.rows().len(), 1);
    }

    #[test]
    fn test_html_escapes_cell_text() {
        let mut page = Page::new("t");
        let r = Row {
            coin_id: Some("x".into()),
            coin_name: Some("<script>".into()),
            tokenomics: Some("a & b".into()),
            ..Row::default()
        };
        page.replace_rows(Renderer::default().render(&[r]));
        let html = page.tbody_html();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_document_structure() {
        let mut page = Page::with_clock("Token Valuations");
        page.set_text(UTC_NOW_ID, "2023-11-14 22:13:20");
        let html = page.to_html();
        assert!(html.contains("<table id=\"token-table\">"));
        assert!(html.contains("<span id=\"utc-now\">2023-11-14 22:13:20</span>"));
        assert!(html.contains("<th>Financing-based Price</th>"));
        assert!(html.contains("<tbody>\n</tbody>"));
    }
}
