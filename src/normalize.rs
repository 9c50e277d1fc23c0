//! Normalization of loosely-typed engine OCR responses.
//!
//! ## Why a separate display model?
//!
//! The document-intelligence engine's response shape is not under our
//! control and drifts between models and versions: page numbers arrive as
//! `pageNumber` (1-based), as `index` (0-based), or not at all; block
//! arrays contain `null` holes; `markdown` may be absent, empty, or
//! padded with whitespace. Rendering code built directly on that shape
//! breaks on every drift. [`normalize`] is a *total* mapping from the
//! untrusted [`RawOcrPage`] to [`DisplayPage`], where every field is
//! guaranteed present: a 1-based page number, a hole-free block list, and
//! a markdown string (synthesized from blocks when the engine supplies
//! none). Bad data degrades to a safe default; it never becomes an error.
//!
//! ## Fallback order for the page number
//!
//! 1. engine `pageNumber`, if finite and ≥ 1
//! 2. engine `index` + 1, if finite and the result is ≥ 1
//! 3. the page's position in the array + 1

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Untrusted engine shapes ──────────────────────────────────────────────

/// One page as the engine sent it. Every field is optional and
/// wrong-typed fields decode as absent — deserializing a page never fails.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOcrPage {
    /// Engine-assigned 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<f64>,
    /// Engine-assigned 0-based page index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<f64>,
    /// Engine-rendered markdown for the page, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    /// Recognized content blocks. `None` entries are `null` holes in the
    /// engine's array, preserved here so the normalizer owns the dropping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_blocks: Option<Vec<Option<OcrBlock>>>,
    /// Table blocks, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<Option<OcrBlock>>>,
    /// Key-value blocks, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_values: Option<Vec<Option<OcrBlock>>>,
}

impl<'de> Deserialize<'de> for RawOcrPage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(RawOcrPage::from_value(&value))
    }
}

impl RawOcrPage {
    /// Decode a page from arbitrary JSON. Non-objects decode to the empty
    /// page; within an object, each field decodes independently so one bad
    /// field cannot poison the rest.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            page_number: obj.get("pageNumber").and_then(Value::as_f64),
            index: obj.get("index").and_then(Value::as_f64),
            markdown: obj
                .get("markdown")
                .and_then(Value::as_str)
                .map(str::to_owned),
            text_blocks: obj.get("textBlocks").and_then(Value::as_array).map(|a| {
                a.iter().map(block_from_value).collect()
            }),
            tables: obj.get("tables").and_then(Value::as_array).map(|a| {
                a.iter().map(block_from_value).collect()
            }),
            key_values: obj.get("keyValues").and_then(Value::as_array).map(|a| {
                a.iter().map(block_from_value).collect()
            }),
        }
    }
}

fn block_from_value(value: &Value) -> Option<OcrBlock> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// A unit of recognized content: a paragraph, a title, a table cell, a
/// key-value pair. Leaf or composite; nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrBlock {
    /// Opaque engine identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-text classification, e.g. "paragraph", "title", "table".
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    /// Plain recognized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Key of a key-value pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Value of a key-value pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Recognition confidence in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Location of the block on the page, when the engine reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Nested child blocks.
    #[serde(
        deserialize_with = "lenient_block_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<OcrBlock>,
    /// Tabular content: a matrix of cell blocks.
    #[serde(
        deserialize_with = "lenient_block_matrix",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub rows: Vec<Vec<OcrBlock>>,
}

impl OcrBlock {
    /// Human-readable one-line label for the block.
    ///
    /// Falls back through text → label/value pair → type, and renders
    /// `"Unknown block"` when none of those carry content. Never panics.
    pub fn describe(&self) -> String {
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        if let (Some(label), Some(value)) = (self.label.as_deref(), self.value.as_deref()) {
            return format!("{}: {}", label.trim(), value.trim());
        }
        if let Some(kind) = self
            .block_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            return format!("[{kind}]");
        }
        "Unknown block".to_string()
    }
}

/// Four optional page coordinates, `(x0, y0)` top-left to `(x1, y1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingBox {
    pub x0: Option<f64>,
    pub y0: Option<f64>,
    pub x1: Option<f64>,
    pub y1: Option<f64>,
}

fn lenient_block_list<'de, D>(deserializer: D) -> Result<Vec<OcrBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|a| a.iter().filter_map(block_from_value).collect())
        .unwrap_or_default())
}

fn lenient_block_matrix<'de, D>(deserializer: D) -> Result<Vec<Vec<OcrBlock>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|a| a.iter().filter_map(block_from_value).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default())
}

/// Lenient decoder for a `pages` field: anything that is not an array
/// decodes to an empty page list instead of failing the envelope.
///
/// Use with `#[serde(default, deserialize_with = "...")]`.
pub fn lenient_pages<'de, D>(deserializer: D) -> Result<Vec<RawOcrPage>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|a| a.iter().map(RawOcrPage::from_value).collect())
        .unwrap_or_default())
}

// ── Trusted display shape ────────────────────────────────────────────────

/// A page ready for rendering: every field present, every hole filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPage {
    /// 1-based page number, always ≥ 1.
    pub page_number: u32,
    /// Sanitized blocks — never null entries, possibly empty.
    pub blocks: Vec<OcrBlock>,
    /// Markdown for the page: engine-supplied (trimmed), synthesized from
    /// blocks, or empty — never absent.
    pub markdown: String,
}

/// Map engine pages to display pages.
///
/// Output order matches input order; repeated or out-of-order page numbers
/// in the source are passed through untouched — the engine may legitimately
/// produce them and reordering here would hide that from the caller.
pub fn normalize(pages: &[RawOcrPage]) -> Vec<DisplayPage> {
    pages
        .iter()
        .enumerate()
        .map(|(position, page)| {
            let blocks: Vec<OcrBlock> = page
                .text_blocks
                .as_deref()
                .map(|blocks| blocks.iter().flatten().cloned().collect())
                .unwrap_or_default();

            let markdown = match page
                .markdown
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
            {
                Some(markdown) => markdown.to_string(),
                None => synthesize_markdown(&blocks),
            };

            DisplayPage {
                page_number: resolve_page_number(page, position),
                blocks,
                markdown,
            }
        })
        .collect()
}

fn resolve_page_number(page: &RawOcrPage, position: usize) -> u32 {
    if let Some(n) = page.page_number.filter(|n| n.is_finite() && *n >= 1.0) {
        return n as u32;
    }
    // `index` is 0-based; only use it when the 1-based result is valid.
    if let Some(n) = page.index.filter(|n| n.is_finite() && *n >= 0.0) {
        return n as u32 + 1;
    }
    position as u32 + 1
}

/// Build markdown out of blocks when the engine supplied none.
///
/// Per block with non-empty trimmed text: title/header/heading types become
/// a level-1 heading, labelled values become a bullet line, everything else
/// a paragraph. Blocks with no usable text contribute nothing.
fn synthesize_markdown(blocks: &[OcrBlock]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for block in blocks {
        let Some(text) = block.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
        else {
            continue;
        };
        if block.block_type.as_deref().is_some_and(is_heading_type) {
            parts.push(format!("# {text}"));
        } else if let (Some(label), Some(value)) =
            (block.label.as_deref(), block.value.as_deref())
        {
            parts.push(format!("- **{}:** {}", label.trim(), value.trim()));
        } else {
            parts.push(text.to_string());
        }
    }
    parts.join("\n\n")
}

fn is_heading_type(block_type: &str) -> bool {
    let t = block_type.to_ascii_lowercase();
    t.contains("title") || t.contains("header") || t.contains("heading")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> RawOcrPage {
        RawOcrPage::from_value(&value)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn non_array_pages_decode_empty() {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default, deserialize_with = "lenient_pages")]
            pages: Vec<RawOcrPage>,
        }

        let missing: Envelope = serde_json::from_value(json!({})).unwrap();
        assert!(missing.pages.is_empty());

        let wrong: Envelope = serde_json::from_value(json!({"pages": "not an array"})).unwrap();
        assert!(wrong.pages.is_empty());
    }

    #[test]
    fn index_converts_to_one_based() {
        let pages = normalize(&[page(json!({"index": 0, "markdown": "Summary paragraph."}))]);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].blocks.is_empty());
        assert_eq!(pages[0].markdown, "Summary paragraph.");
    }

    #[test]
    fn page_number_takes_priority_over_index() {
        let pages = normalize(&[page(json!({"pageNumber": 7, "index": 2}))]);
        assert_eq!(pages[0].page_number, 7);
    }

    #[test]
    fn position_fallback_when_nothing_supplied() {
        let pages = normalize(&[page(json!({})), page(json!({}))]);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[1].page_number, 2);
    }

    #[test]
    fn non_positive_engine_numbers_fall_through() {
        // pageNumber 0 is below the 1-based floor; index -3 likewise.
        let pages = normalize(&[page(json!({"pageNumber": 0, "index": -3}))]);
        assert_eq!(pages[0].page_number, 1);
    }

    #[test]
    fn wrong_typed_page_number_falls_through() {
        let pages = normalize(&[page(json!({"pageNumber": "five", "index": 3}))]);
        assert_eq!(pages[0].page_number, 4);
    }

    #[test]
    fn null_blocks_dropped_and_markdown_synthesized() {
        let pages = normalize(&[page(json!({
            "pageNumber": 5,
            "textBlocks": [null, {"type": "title", "text": "Hi"}],
        }))]);
        assert_eq!(pages[0].page_number, 5);
        assert_eq!(pages[0].blocks.len(), 1);
        assert_eq!(pages[0].blocks[0].block_type.as_deref(), Some("title"));
        assert_eq!(pages[0].markdown, "# Hi");
    }

    #[test]
    fn non_array_text_blocks_yield_empty_list() {
        let pages = normalize(&[page(json!({"textBlocks": "garbage"}))]);
        assert!(pages[0].blocks.is_empty());
        assert_eq!(pages[0].markdown, "");
    }

    #[test]
    fn engine_markdown_wins_over_synthesis() {
        let pages = normalize(&[page(json!({
            "markdown": "  Engine text.  ",
            "textBlocks": [{"type": "title", "text": "Ignored"}],
        }))]);
        assert_eq!(pages[0].markdown, "Engine text.");
    }

    #[test]
    fn whitespace_markdown_treated_as_absent() {
        let pages = normalize(&[page(json!({
            "markdown": "   \n  ",
            "textBlocks": [{"text": "Body."}],
        }))]);
        assert_eq!(pages[0].markdown, "Body.");
    }

    #[test]
    fn synthesis_covers_heading_kv_and_paragraph() {
        let pages = normalize(&[page(json!({
            "textBlocks": [
                {"type": "SectionHeading", "text": "Intro"},
                {"text": "Total", "label": "Total", "value": "42 €"},
                {"text": "  Plain body text.  "},
                {"type": "figure"},
            ],
        }))]);
        assert_eq!(
            pages[0].markdown,
            "# Intro\n\n- **Total:** 42 €\n\nPlain body text."
        );
    }

    #[test]
    fn heading_type_is_case_insensitive() {
        for kind in ["TITLE", "page-header", "Heading2"] {
            let pages = normalize(&[page(json!({
                "textBlocks": [{"type": kind, "text": "T"}],
            }))]);
            assert_eq!(pages[0].markdown, "# T", "type {kind:?}");
        }
    }

    #[test]
    fn order_and_duplicates_pass_through() {
        let pages = normalize(&[
            page(json!({"pageNumber": 9})),
            page(json!({"pageNumber": 2})),
            page(json!({"pageNumber": 9})),
        ]);
        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![9, 2, 9]);
    }

    #[test]
    fn renormalizing_minimal_page_is_deterministic() {
        let first = normalize(&[page(json!({"pageNumber": 3}))]);
        let again = normalize(&[page(json!({"pageNumber": first[0].page_number}))]);
        assert_eq!(first, again);
        assert_eq!(again[0].markdown, "");
        assert!(again[0].blocks.is_empty());
    }

    #[test]
    fn describe_falls_back_to_unknown() {
        assert_eq!(OcrBlock::default().describe(), "Unknown block");

        let confident_only = OcrBlock {
            confidence: Some(0.4),
            ..OcrBlock::default()
        };
        assert_eq!(confident_only.describe(), "Unknown block");

        let kv = OcrBlock {
            label: Some("Invoice".into()),
            value: Some("INV-7".into()),
            ..OcrBlock::default()
        };
        assert_eq!(kv.describe(), "Invoice: INV-7");

        let typed = OcrBlock {
            block_type: Some("table".into()),
            ..OcrBlock::default()
        };
        assert_eq!(typed.describe(), "[table]");
    }

    #[test]
    fn nested_children_and_rows_decode_with_holes_removed() {
        let block: OcrBlock = serde_json::from_value(json!({
            "type": "table",
            "rows": [[{"text": "a"}, null], "junk", [{"text": "b"}]],
            "children": [null, {"text": "child"}],
        }))
        .unwrap();
        assert_eq!(block.rows.len(), 3);
        assert_eq!(block.rows[0].len(), 1);
        assert!(block.rows[1].is_empty());
        assert_eq!(block.children.len(), 1);
    }

    #[test]
    fn wrong_typed_block_entry_dropped() {
        let raw = page(json!({"textBlocks": [42, {"text": "kept"}]}));
        let pages = normalize(&[raw]);
        assert_eq!(pages[0].blocks.len(), 1);
        assert_eq!(pages[0].blocks[0].text.as_deref(), Some("kept"));
    }
}
