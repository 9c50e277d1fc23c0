//! Free-text page selection: `"1, 3-5, 8"` → a validated page set.
//!
//! The selection field in a request is free text typed by a person, and
//! people mistype — `"1, abc, 3-2"` is normal input, not an attack. The
//! parser therefore never fails: every token either contributes validated
//! page numbers or is dropped silently, and an input with nothing valid in
//! it degrades to "all pages". Page numbering is 1-based, so `0` is never a
//! valid page — a lone `0` token is dropped and a range starting at `0`
//! discards the *whole* range, not just its first element.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Largest page number the parser will accept.
///
/// Ranges are clipped to this bound before expansion so a hostile
/// `1-4294967295` cannot allocate gigabytes; single tokens above it are
/// dropped like any other invalid token. Real documents sit far below it.
pub const MAX_PAGE_NUMBER: u32 = 100_000;

static RE_RANGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)-(\d+)$").unwrap());
static RE_SINGLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Which pages of the document the engine should OCR.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// No restriction — OCR every page (default).
    #[default]
    All,
    /// Specific 1-based pages: non-empty, strictly ascending, deduplicated.
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Parse a free-text page-range expression.
    ///
    /// Grammar: comma-separated segments, each either a single integer
    /// (`"7"`) or an inclusive range (`"3-5"`). Whitespace around segments
    /// is ignored. Invalid segments — junk text, `0`, ranges with
    /// `start == 0` or `start > end` — are dropped without error. An input
    /// with no surviving pages parses as [`PageSelection::All`].
    pub fn parse(input: &str) -> Self {
        let mut pages: Vec<u32> = Vec::new();

        for segment in input.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            if let Some(caps) = RE_RANGE.captures(segment) {
                let (Ok(start), Ok(end)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>())
                else {
                    continue;
                };
                // 0 is not a page; a zero start invalidates the whole range.
                if start == 0 || start > end {
                    continue;
                }
                let end = end.min(MAX_PAGE_NUMBER);
                if start > end {
                    continue;
                }
                pages.extend(start..=end);
            } else if RE_SINGLE.is_match(segment) {
                if let Ok(page) = segment.parse::<u32>() {
                    if page >= 1 && page <= MAX_PAGE_NUMBER {
                        pages.push(page);
                    }
                }
            }
        }

        Self::from_pages(pages)
    }

    /// Build a selection from already-numeric pages, applying the same
    /// validation as [`PageSelection::parse`]: non-positive and
    /// out-of-bound values are dropped, the rest sorted and deduplicated,
    /// and an empty result degrades to [`PageSelection::All`].
    pub fn from_pages(pages: impl IntoIterator<Item = u32>) -> Self {
        let mut pages: Vec<u32> = pages
            .into_iter()
            .filter(|&p| p >= 1 && p <= MAX_PAGE_NUMBER)
            .collect();
        if pages.is_empty() {
            return PageSelection::All;
        }
        pages.sort_unstable();
        pages.dedup();
        PageSelection::Pages(pages)
    }

    /// Whether this selection places no restriction on pages.
    pub fn is_all(&self) -> bool {
        matches!(self, PageSelection::All)
    }

    /// The selected 1-based pages, or `None` for "all pages".
    pub fn as_pages(&self) -> Option<&[u32]> {
        match self {
            PageSelection::All => None,
            PageSelection::Pages(pages) => Some(pages),
        }
    }

    /// The selection converted to the engine's 0-based page indices.
    pub fn to_zero_based(&self) -> Option<Vec<u32>> {
        self.as_pages()
            .map(|pages| pages.iter().map(|p| p - 1).collect())
    }
}

/// Serde adapter mapping [`PageSelection`] to the wire shape: an optional
/// array of positive integers, where absence (or anything that is not an
/// array) means "all pages".
///
/// Use with `#[serde(with = "docrelay::selection::wire")]`.
pub mod wire {
    use super::*;

    pub fn serialize<S>(selection: &PageSelection, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match selection.as_pages() {
            Some(pages) => pages.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PageSelection, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Tolerate any shape: a non-array page list is malformed user
        // input and normalizes to "all pages" rather than failing the
        // whole request body.
        let value = serde_json::Value::deserialize(deserializer)?;
        let Some(items) = value.as_array() else {
            return Ok(PageSelection::All);
        };
        let pages = items
            .iter()
            .filter_map(|v| v.as_u64())
            .filter_map(|n| u32::try_from(n).ok());
        Ok(PageSelection::from_pages(pages))
    }
}
