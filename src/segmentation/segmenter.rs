/*!
 * Splitting documents into translation units.
 *
 * Each page is segmented independently: short blocks are merged into one
 * unit up to the page's size limit, long blocks are cut at sentence or clause
 * boundaries. Units never span two pages.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::document::html::{extract_page, TextBlock};
use crate::document::model::Document;

use super::classifier::{Register, ScriptClassifier};
use super::cut_point::{byte_offset, find_cut};

/// Separator inserted between merged blocks
pub const BLOCK_SEPARATOR: &str = "\n";

/// Handle to a block element of a page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// Page the block lives in
    pub part_id: String,
    /// Position among the page's block elements
    pub index: usize,
    /// Lowercase tag name
    pub tag: String,
}

/// A bounded span of text sent to a backend as one request.
///
/// The text is never blank. A slice of a long block may exceed the limit only
/// by a trailing whitespace run that was itself longer than the limit.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    /// Page the text came from
    pub part_id: String,
    /// Text to translate
    pub text: String,
    /// The block this text comes from; empty when several blocks were merged
    pub source_elements: Vec<ElementRef>,
    /// Length of `text` in characters
    pub length: usize,
    /// Register of the page
    pub register: Register,
}

impl TranslationUnit {
    fn new(part_id: &str, text: String, source_elements: Vec<ElementRef>, register: Register) -> Self {
        let length = text.chars().count();
        Self {
            part_id: part_id.to_string(),
            text,
            source_elements,
            length,
            register,
        }
    }
}

/// Unit size limits per register, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPolicy {
    /// Limit for archaic pages
    pub archaic_limit: usize,
    /// Limit for every other page
    pub default_limit: usize,
}

impl Default for SegmentPolicy {
    fn default() -> Self {
        Self {
            archaic_limit: 300,
            default_limit: 1000,
        }
    }
}

impl SegmentPolicy {
    /// Limit that applies to a page of the given register
    pub fn limit_for(&self, register: Register) -> usize {
        match register {
            Register::Archaic => self.archaic_limit,
            Register::Standard => self.default_limit,
        }
        .max(1)
    }
}

/// Turns documents into ordered translation units
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    policy: SegmentPolicy,
    classifier: ScriptClassifier,
}

impl Segmenter {
    /// Create a segmenter
    pub fn new(policy: SegmentPolicy, classifier: ScriptClassifier) -> Self {
        Self { policy, classifier }
    }

    /// Size policy in use
    pub fn policy(&self) -> SegmentPolicy {
        self.policy
    }

    /// Segment every page of `document` in reading order
    pub fn segment(&self, document: &Document) -> Vec<TranslationUnit> {
        let mut units = Vec::new();
        for page in document.pages() {
            match page.text() {
                Some(markup) => units.extend(self.segment_page(page.id(), markup)),
                None => warn!("Page {} is not valid UTF-8, skipping it", page.id()),
            }
        }
        debug!("Segmented {} into {} units", document.name(), units.len());
        units
    }

    /// Segment a single page
    pub fn segment_page(&self, part_id: &str, markup: &str) -> Vec<TranslationUnit> {
        let page = extract_page(markup);
        if let Some(error) = &page.parse_error {
            warn!("Malformed markup in {}: {}", part_id, error);
        }
        if page.is_empty() {
            return Vec::new();
        }

        let register = self.classifier.classify(&page.full_text);
        self.segment_blocks(part_id, &page.blocks, register)
    }

    /// Segment already extracted blocks of one page
    pub fn segment_blocks(
        &self,
        part_id: &str,
        blocks: &[TextBlock],
        register: Register,
    ) -> Vec<TranslationUnit> {
        let limit = self.policy.limit_for(register);
        let mut units = Vec::new();
        let mut buffer = Buffer::default();

        for block in blocks {
            let text = block.text.trim();
            if text.is_empty() {
                continue;
            }
            let length = text.chars().count();
            let element = ElementRef {
                part_id: part_id.to_string(),
                index: block.index,
                tag: block.tag.clone(),
            };

            if length > limit {
                buffer.flush_into(&mut units, part_id, register);
                let first = units.len();
                let mut rest = text;
                while !rest.is_empty() {
                    let mut cut = find_cut(rest, limit);
                    if is_blank(&rest[..byte_offset(rest, cut)]) {
                        // A break inside a whitespace run; cut hard instead
                        cut = limit.min(rest.chars().count());
                    }
                    let (head, tail) = rest.split_at(byte_offset(rest, cut));
                    rest = tail;

                    // Whitespace runs longer than the limit stay with the previous slice
                    if is_blank(head) && units.len() > first {
                        if let Some(previous) = units.last_mut() {
                            previous.text.push_str(head);
                            previous.length += cut;
                            continue;
                        }
                    }
                    units.push(TranslationUnit::new(
                        part_id,
                        head.to_string(),
                        vec![element.clone()],
                        register,
                    ));
                }
                continue;
            }

            if !buffer.is_empty() && buffer.length + BLOCK_SEPARATOR.len() + length > limit {
                buffer.flush_into(&mut units, part_id, register);
            }
            buffer.push(text, length, element);
        }

        buffer.flush_into(&mut units, part_id, register);
        units
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

#[derive(Default)]
struct Buffer {
    text: String,
    length: usize,
    elements: Vec<ElementRef>,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn push(&mut self, text: &str, length: usize, element: ElementRef) {
        if !self.is_empty() {
            self.text.push_str(BLOCK_SEPARATOR);
            self.length += BLOCK_SEPARATOR.len();
        }
        self.text.push_str(text);
        self.length += length;
        self.elements.push(element);
    }

    fn flush_into(&mut self, units: &mut Vec<TranslationUnit>, part_id: &str, register: Register) {
        if self.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let mut elements = std::mem::take(&mut self.elements);
        self.length = 0;
        if elements.len() > 1 {
            elements.clear();
        }
        units.push(TranslationUnit::new(part_id, text, elements, register));
    }
}
