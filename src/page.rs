//! Queryable view over a fetched wiki page
//!
//! [`Page`] wraps the parsed document and exposes exactly what discovery and
//! extraction need: headings, normalized text, recipe-table snapshots with the
//! text that precedes them, infobox rows, category links and in-content links.
//! Both Fandom portable infoboxes and classic `table.infobox` layouts are read.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

mod selectors {
    use super::*;

    fn parse(css: &str) -> Selector {
        Selector::parse(css).expect("static selector must parse")
    }

    pub static HEADING: LazyLock<Selector> =
        LazyLock::new(|| parse("h1#firstHeading, h1.page-header__title, h1"));
    pub static CONTENT: LazyLock<Selector> = LazyLock::new(|| parse("div.mw-parser-output"));
    pub static BODY: LazyLock<Selector> = LazyLock::new(|| parse("body"));
    pub static TABLE: LazyLock<Selector> = LazyLock::new(|| parse("table"));
    pub static ROW: LazyLock<Selector> = LazyLock::new(|| parse("tr"));
    pub static CELL: LazyLock<Selector> = LazyLock::new(|| parse("th, td"));
    pub static HEADER_CELL: LazyLock<Selector> = LazyLock::new(|| parse("th"));
    pub static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| parse("td"));
    pub static CAPTION: LazyLock<Selector> = LazyLock::new(|| parse("caption"));
    pub static LINK: LazyLock<Selector> = LazyLock::new(|| parse("a"));
    pub static HREF_LINK: LazyLock<Selector> = LazyLock::new(|| parse("a[href]"));
    pub static PORTABLE_ITEM: LazyLock<Selector> =
        LazyLock::new(|| parse("aside.portable-infobox .pi-item"));
    pub static PORTABLE_LABEL: LazyLock<Selector> = LazyLock::new(|| parse(".pi-data-label"));
    pub static PORTABLE_VALUE: LazyLock<Selector> = LazyLock::new(|| parse(".pi-data-value"));
    pub static CLASSIC_INFOBOX_ROW: LazyLock<Selector> =
        LazyLock::new(|| parse("table.infobox tr, div.infobox tr"));
    pub static CATEGORY_LINK: LazyLock<Selector> = LazyLock::new(|| {
        parse("#catlinks a, .page-header__categories a, a[href*=\"/wiki/Category:\"]")
    });
    pub static META_DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| {
        parse("meta[name=\"description\"], meta[property=\"og:description\"]")
    });
    pub static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| parse("div.mw-parser-output > p"));
    pub static MEMBER_LINK: LazyLock<Selector> = LazyLock::new(|| {
        parse("a.category-page__member-link, #mw-pages li a, #mw-pages a")
    });
    pub static NEXT_LINK: LazyLock<Selector> = LazyLock::new(|| {
        parse("a.category-page__pagination-next, a[rel=\"next\"], .mw-allpages-nav a, #mw-pages > a")
    });
}

/// Number of preceding sibling elements scanned for a table's context text
const CONTEXT_SIBLINGS: usize = 3;

/// A hyperlink in the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
    pub title: Option<String>,
}

/// One table cell
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// Normalized visible text
    pub text: String,
    /// `title` attributes of the links inside the cell
    pub link_titles: Vec<String>,
}

/// Snapshot of a `<table>` element
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Lowercased header labels of the first header row
    pub headers: Vec<String>,
    /// Data rows (rows with at least one `td`)
    pub rows: Vec<Vec<Cell>>,
    /// Caption plus the text of the elements just before the table
    pub context: String,
}

/// A label/value row from an infobox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoboxRow {
    pub label: String,
    pub value: String,
    /// Link texts inside the value, when the value is a list of links
    pub links: Vec<String>,
}

impl InfoboxRow {
    /// Link texts if present, otherwise the comma-separated value
    pub fn values(&self) -> Vec<String> {
        if !self.links.is_empty() {
            return self.links.clone();
        }
        self.value
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Parsed HTML document
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Main content root, falling back to `<body>` and then the whole document
    fn content_root(&self) -> ElementRef<'_> {
        self.document
            .select(&selectors::CONTENT)
            .next()
            .or_else(|| self.document.select(&selectors::BODY).next())
            .unwrap_or_else(|| self.document.root_element())
    }

    /// Primary on-page heading
    pub fn heading(&self) -> Option<String> {
        self.document
            .select(&selectors::HEADING)
            .map(element_text)
            .find(|t| !t.is_empty())
    }

    /// Whitespace-normalized text of the main content
    pub fn text(&self) -> String {
        element_text(self.content_root())
    }

    /// All tables in the main content, in document order
    pub fn tables(&self) -> Vec<Table> {
        self.content_root()
            .select(&selectors::TABLE)
            .map(snapshot_table)
            .collect()
    }

    /// Infobox label/value rows from portable and classic infoboxes
    pub fn infobox_rows(&self) -> Vec<InfoboxRow> {
        let mut rows = Vec::new();

        for item in self.document.select(&selectors::PORTABLE_ITEM) {
            let label = item.select(&selectors::PORTABLE_LABEL).next();
            let value = item.select(&selectors::PORTABLE_VALUE).next();
            if let (Some(label), Some(value)) = (label, value) {
                rows.push(infobox_row(element_text(label), value));
            }
        }

        for row in self.document.select(&selectors::CLASSIC_INFOBOX_ROW) {
            let label = row.select(&selectors::HEADER_CELL).next();
            let value = row.select(&selectors::DATA_CELL).next();
            if let (Some(label), Some(value)) = (label, value) {
                rows.push(infobox_row(element_text(label), value));
            }
        }

        rows.retain(|r| !r.label.is_empty());
        rows
    }

    /// Visible text of the page's category links
    pub fn category_links(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for link in self.document.select(&selectors::CATEGORY_LINK) {
            let text = element_text(link);
            if text.is_empty() || text.eq_ignore_ascii_case("categories") {
                continue;
            }
            if !categories.contains(&text) {
                categories.push(text);
            }
        }
        categories
    }

    /// Page summary from meta tags
    pub fn meta_description(&self) -> Option<String> {
        self.document
            .select(&selectors::META_DESCRIPTION)
            .filter_map(|m| m.value().attr("content"))
            .map(normalize_whitespace)
            .find(|d| !d.is_empty())
    }

    /// First content paragraph with at least `min_len` characters
    pub fn first_paragraph(&self, min_len: usize) -> Option<String> {
        self.document
            .select(&selectors::PARAGRAPH)
            .map(element_text)
            .find(|p| p.chars().count() >= min_len)
    }

    /// Links inside the main content
    pub fn content_links(&self) -> Vec<Link> {
        self.content_root()
            .select(&selectors::HREF_LINK)
            .filter_map(to_link)
            .collect()
    }

    /// Member links of a rendered category page
    pub fn category_member_links(&self) -> Vec<Link> {
        let mut links: Vec<Link> = Vec::new();
        for link in self.document.select(&selectors::MEMBER_LINK).filter_map(to_link) {
            if !links.iter().any(|l| l.href == link.href) {
                links.push(link);
            }
        }
        links
    }

    /// Target of the listing's "next page" link, if any
    pub fn next_page_href(&self) -> Option<String> {
        self.document
            .select(&selectors::NEXT_LINK)
            .filter_map(to_link)
            .find(|l| {
                let text = l.text.to_lowercase();
                text.contains("next") || l.href.contains("from=") || l.href.contains("pagefrom=")
            })
            .map(|l| l.href)
    }
}

fn to_link(element: ElementRef<'_>) -> Option<Link> {
    let href = element.value().attr("href")?.trim().to_string();
    if href.is_empty() {
        return None;
    }
    Some(Link {
        href,
        text: element_text(element),
        title: element.value().attr("title").map(str::to_string),
    })
}

fn infobox_row(label: String, value: ElementRef<'_>) -> InfoboxRow {
    let links = value
        .select(&selectors::LINK)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    InfoboxRow {
        label,
        value: element_text(value),
        links,
    }
}

fn snapshot_table(table: ElementRef<'_>) -> Table {
    let mut headers = Vec::new();
    let mut rows = Vec::new();

    for row in table.select(&selectors::ROW) {
        let has_data = row.select(&selectors::DATA_CELL).next().is_some();
        if !has_data {
            if headers.is_empty() {
                headers = row
                    .select(&selectors::HEADER_CELL)
                    .map(|th| element_text(th).to_lowercase())
                    .collect();
            }
            continue;
        }

        let cells = row
            .select(&selectors::CELL)
            .map(|cell| Cell {
                text: element_text(cell),
                link_titles: cell
                    .select(&selectors::LINK)
                    .filter_map(|a| a.value().attr("title"))
                    .map(normalize_whitespace)
                    .filter(|t| !t.is_empty())
                    .collect(),
            })
            .collect();
        rows.push(cells);
    }

    Table {
        headers,
        rows,
        context: table_context(table),
    }
}

/// Caption and preceding-sibling text of a table. Tables wrapped in a
/// container without preceding siblings borrow the container's siblings.
fn table_context(table: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = table
        .select(&selectors::CAPTION)
        .map(element_text)
        .collect();

    let mut anchor = *table;
    for _ in 0..3 {
        let before: Vec<String> = anchor
            .prev_siblings()
            .take_while(|n| !n.descendants().any(|d| is_table(d.value())))
            .filter_map(|n| match n.value() {
                Node::Text(text) => Some(normalize_whitespace(text)),
                Node::Element(_) => ElementRef::wrap(n).map(element_text),
                _ => None,
            })
            .filter(|t| !t.is_empty())
            .take(CONTEXT_SIBLINGS)
            .collect();

        if !before.is_empty() {
            parts.extend(before.into_iter().rev());
            break;
        }

        match anchor.parent() {
            Some(parent) if ElementRef::wrap(parent).is_some() => anchor = parent,
            _ => break,
        }
    }

    parts.join(" ")
}

fn is_table(node: &Node) -> bool {
    matches!(node, Node::Element(e) if e.name() == "table")
}

/// Text content with whitespace collapsed
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
