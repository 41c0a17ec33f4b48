/*!
 * Merging translations back into a document.
 *
 * Replacements are literal substring substitutions on the raw page markup,
 * collected in an overlay keyed by part id. The document itself is only
 * touched by [`ReintegrationSession::commit`].
 */

use std::collections::BTreeMap;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use regex::Regex;

use crate::document::model::{Document, DocumentWriter, PartKind};
use crate::errors::DocumentError;

/// Separates the original from its translation in bilingual output
pub const BILINGUAL_MARKER: &str = "\n【译文】";

static CHARACTER_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// What a translated passage turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReintegrationMode {
    /// The translation replaces the original
    #[default]
    Replace,
    /// The original is kept, followed by the marker and the translation
    Bilingual,
}

/// Pending page rewrites for one document
#[derive(Debug, Default)]
pub struct ReintegrationSession {
    mode: ReintegrationMode,
    overlay: BTreeMap<String, String>,
    replacements: usize,
}

impl ReintegrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: ReintegrationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> ReintegrationMode {
        self.mode
    }

    /// Replace every occurrence of `original` in the text parts of
    /// `document`, recording the results in the overlay.
    ///
    /// Both strings are plain text; they are escaped before matching against
    /// the markup. Later calls see the content produced by earlier ones, and
    /// occurrences that already carry this translation are left alone, so
    /// applying the same pair twice changes nothing.
    /// Returns the number of parts changed.
    pub fn apply_translation(&mut self, document: &Document, original: &str, translated: &str) -> usize {
        if original.is_empty() || original == translated {
            return 0;
        }

        let needle = partial_escape(original);
        let replacement = self.replacement(original, translated);
        let mut changed = 0;

        for part in document.parts_of_kind(PartKind::Text) {
            let Some(current) = self.current_content(document, part.id()) else {
                continue;
            };
            if !current.contains(&*needle) {
                continue;
            }

            let updated = substitute(current, &needle, &replacement);
            if updated == current {
                continue;
            }
            debug!("Replaced text in {}", part.id());
            self.overlay.insert(part.id().to_string(), updated);
            changed += 1;
        }

        self.replacements += changed;
        changed
    }

    /// Whether some text part already holds the result of applying this pair
    pub fn is_applied(&self, document: &Document, original: &str, translated: &str) -> bool {
        if original.is_empty() || original == translated {
            return false;
        }
        let replacement = self.replacement(original, translated);
        document
            .parts_of_kind(PartKind::Text)
            .filter_map(|part| self.current_content(document, part.id()))
            .any(|content| content.contains(&replacement))
    }

    /// Escaped markup that stands in for `original`
    fn replacement(&self, original: &str, translated: &str) -> String {
        match self.mode {
            ReintegrationMode::Replace => partial_escape(translated).into_owned(),
            ReintegrationMode::Bilingual => {
                partial_escape(&format!("{}{}{}", original, BILINGUAL_MARKER, translated)).into_owned()
            }
        }
    }

    fn current_content<'a>(&'a self, document: &'a Document, part_id: &str) -> Option<&'a str> {
        match self.overlay.get(part_id) {
            Some(content) => Some(content.as_str()),
            None => document.part(part_id).and_then(|part| part.text()),
        }
    }

    /// Parts with pending changes
    pub fn pending_parts(&self) -> impl Iterator<Item = &str> + '_ {
        self.overlay.keys().map(String::as_str)
    }

    /// Pending content of one part
    pub fn pending_content(&self, part_id: &str) -> Option<&str> {
        self.overlay.get(part_id).map(String::as_str)
    }

    /// Whether there is nothing to commit
    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty()
    }

    /// Total part replacements made so far
    pub fn replacements(&self) -> usize {
        self.replacements
    }

    /// Write the overlay into `document` and persist it with `writer`.
    ///
    /// On a write failure the overlay is kept, so the commit can be retried.
    /// Returns the number of parts rewritten.
    pub fn commit(&mut self, document: &mut Document, writer: &dyn DocumentWriter) -> Result<usize, DocumentError> {
        for (part_id, content) in &self.overlay {
            let part = document
                .part_mut(part_id)
                .ok_or_else(|| DocumentError::UnknownPart(part_id.clone()))?;
            part.set_content(content.as_bytes());
        }

        if let Err(e) = writer.write(document) {
            warn!("Failed to save {}: {}", document.name(), e);
            return Err(e);
        }

        let written = self.overlay.len();
        self.overlay.clear();
        info!("Saved {} with {} rewritten pages", document.name(), written);
        Ok(written)
    }
}

/// Replace `needle` with `replacement`, skipping spans that already are `replacement`
fn substitute(content: &str, needle: &str, replacement: &str) -> String {
    if replacement.contains(needle) {
        content
            .split(replacement)
            .map(|piece| piece.replace(needle, replacement))
            .collect::<Vec<_>>()
            .join(replacement)
    } else {
        content.replace(needle, replacement)
    }
}

/// Whether `markup` spells text with character references other than `&amp;`, `&lt;` and `&gt;`.
///
/// Text written that way never matches its plain-text form.
pub fn has_character_references(markup: &str) -> bool {
    CHARACTER_REFERENCE
        .captures_iter(markup)
        .any(|caps| !matches!(&caps[1], "amp" | "lt" | "gt"))
}
