use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use sieve_core::config::DEFAULT_MAX_CONTENT_CHARS;
use sieve_core::error::AppError;
use sieve_core::models::{ExtractionCandidate, RenderedPage, truncate_chars};
use sieve_core::quality::looks_like_error_page;
use sieve_core::traits::ContentExtractor;

/// A main-content match must carry more text than this to win.
const MIN_MAIN_CONTENT_CHARS: usize = 100;

const MAX_HEADINGS: usize = 10;

const UNTITLED: &str = "Untitled";

/// Main-content containers, most specific first.
const MAIN_SELECTORS: [&str; 10] = [
    "main",
    "article",
    "[role='main']",
    ".main-content",
    ".content",
    "#content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".page-content",
];

/// Never contribute text.
const HIDDEN_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Page chrome dropped from the body fallback.
const CHROME_TAGS: [&str; 4] = ["header", "footer", "nav", "aside"];

struct Selectors {
    main: Vec<Selector>,
    h1: Selector,
    headings: Selector,
    title: Selector,
    body: Selector,
    meta_description: Selector,
    og_description: Selector,
}

/// Markup extractor built on `scraper`.
///
/// Selectors are parsed once at construction and shared across clones.
#[derive(Clone)]
pub struct ScraperExtractor {
    selectors: Arc<Selectors>,
    max_content_chars: usize,
}

fn parse(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector)
        .map_err(|e| AppError::ConfigError(format!("Invalid selector '{selector}': {e}")))
}

impl ScraperExtractor {
    pub fn new() -> Result<Self, AppError> {
        let main = MAIN_SELECTORS
            .iter()
            .map(|s| parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            selectors: Arc::new(Selectors {
                main,
                h1: parse("h1")?,
                headings: parse("h1, h2, h3")?,
                title: parse("title")?,
                body: parse("body")?,
                meta_description: parse("meta[name='description']")?,
                og_description: parse("meta[property='og:description']")?,
            }),
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        })
    }

    pub fn with_max_content_chars(mut self, max: usize) -> Self {
        self.max_content_chars = max;
        self
    }

    fn title(&self, doc: &Html, page: &RenderedPage, domain: &str) -> String {
        let from_h1 = doc
            .select(&self.selectors.h1)
            .map(|h| inline_text(&h))
            .find(|t| t.chars().count() > 3 && !t.eq_ignore_ascii_case(domain));

        from_h1
            .or_else(|| non_empty(page.metadata.title.as_deref()))
            .or_else(|| non_empty(page.metadata.og_title.as_deref()))
            .or_else(|| {
                doc.select(&self.selectors.title)
                    .next()
                    .map(|t| inline_text(&t))
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    fn description(&self, doc: &Html, page: &RenderedPage) -> String {
        let meta_content = |selector: &Selector| {
            doc.select(selector)
                .filter_map(|m| m.value().attr("content"))
                .map(str::trim)
                .find(|c| !c.is_empty())
                .map(str::to_string)
        };

        non_empty(page.metadata.description.as_deref())
            .or_else(|| non_empty(page.metadata.og_description.as_deref()))
            .or_else(|| meta_content(&self.selectors.meta_description))
            .or_else(|| meta_content(&self.selectors.og_description))
            .unwrap_or_default()
    }

    fn main_content(&self, doc: &Html) -> String {
        for selector in &self.selectors.main {
            if let Some(el) = doc.select(selector).next() {
                let text = block_text(&el, &[]);
                if text.chars().count() > MIN_MAIN_CONTENT_CHARS {
                    return text;
                }
            }
        }

        doc.select(&self.selectors.body)
            .next()
            .map(|body| block_text(&body, &CHROME_TAGS))
            .unwrap_or_default()
    }

    fn headings(&self, doc: &Html) -> String {
        doc.select(&self.selectors.headings)
            .filter_map(|h| {
                let text = inline_text(&h);
                if text.is_empty() {
                    return None;
                }
                Some(format!("{}: {text}", h.value().name().to_uppercase()))
            })
            .take(MAX_HEADINGS)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ContentExtractor for ScraperExtractor {
    fn extract(&self, page: &RenderedPage, domain: &str) -> Result<ExtractionCandidate, AppError> {
        let doc = Html::parse_document(&page.html);

        let title = self.title(&doc, page, domain);
        let content = self.main_content(&doc);
        let is_error_page = looks_like_error_page(&title, &content);
        let text_size = content.len();

        Ok(ExtractionCandidate {
            description: self.description(&doc, page),
            headings: self.headings(&doc),
            content: truncate_chars(&content, self.max_content_chars).to_string(),
            html_size: page.html.len(),
            text_size,
            is_error_page,
            title,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// All text under `el` collapsed onto one line.
fn inline_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed text nodes under `el`, one per line, skipping hidden and `skip` subtrees.
fn block_text(el: &ElementRef<'_>, skip: &[&str]) -> String {
    let mut lines = Vec::new();
    collect_text(el, skip, &mut lines);
    lines.join("\n")
}

fn collect_text<'a>(el: &ElementRef<'a>, skip: &[&str], out: &mut Vec<&'a str>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let text = text.trim();
            if !text.is_empty() {
                out.push(text);
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if HIDDEN_TAGS.contains(&name) || skip.contains(&name) {
                continue;
            }
            collect_text(&child_el, skip, out);
        }
    }
}
