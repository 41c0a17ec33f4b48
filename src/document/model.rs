/*!
 * In-memory document model.
 *
 * A document is an ordered list of parts (archive entries). Text parts are
 * the pages; everything else (images, stylesheets, metadata) is carried
 * through untouched.
 */

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::DocumentError;

/// Kind of content held by a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    /// (X)HTML page
    Text,
    /// Raster or vector image
    Image,
    /// Stylesheet
    Style,
    /// Anything else (package files, fonts, ...)
    Other,
}

impl PartKind {
    /// Kind from a manifest media type
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        match media_type.as_str() {
            "application/xhtml+xml" | "text/html" => Self::Text,
            "text/css" => Self::Style,
            m if m.starts_with("image/") => Self::Image,
            _ => Self::Other,
        }
    }

    /// Kind guessed from a file name
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "xhtml" | "html" | "htm" => Self::Text,
            "css" => Self::Style,
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "webp" | "bmp" => Self::Image,
            _ => Self::Other,
        }
    }
}

/// Archive metadata kept so untouched entries are written back as they were read
#[derive(Debug, Clone)]
pub struct EntryMeta {
    pub compression: zip::CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

/// One part of a document
#[derive(Debug, Clone)]
pub struct DocumentPart {
    id: String,
    kind: PartKind,
    content: Vec<u8>,
    pub(crate) entry: Option<EntryMeta>,
}

impl DocumentPart {
    /// Create a part that did not come from an archive
    pub fn new(id: impl Into<String>, kind: PartKind, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
            entry: None,
        }
    }

    /// Part id (the archive entry name)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Kind of content
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// Raw content
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Replace the raw content
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) {
        self.content = content.into();
    }

    /// Content as UTF-8 text, if it is valid UTF-8
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub(crate) fn with_kind(mut self, kind: PartKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Persists a whole document
pub trait DocumentWriter {
    /// Write `document` to stable storage
    fn write(&self, document: &Document) -> Result<(), DocumentError>;
}

/// A structured document made of parts
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    parts: Vec<DocumentPart>,
    /// Indexes into `parts` of the text parts, in reading order
    reading_order: Vec<usize>,
}

impl Document {
    /// Create a document; pages are the text parts in the given order
    pub fn new(name: impl Into<String>, parts: Vec<DocumentPart>) -> Self {
        let reading_order = parts
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == PartKind::Text)
            .map(|(i, _)| i)
            .collect();
        Self {
            name: name.into(),
            parts,
            reading_order,
        }
    }

    /// Order pages by `ids`; text parts not listed follow in archive order
    pub fn with_reading_order(mut self, ids: &[String]) -> Self {
        let mut order: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.parts.iter().position(|p| &p.id == id))
            .filter(|&i| self.parts[i].kind == PartKind::Text)
            .collect();
        order.dedup();
        for (i, part) in self.parts.iter().enumerate() {
            if part.kind == PartKind::Text && !order.contains(&i) {
                order.push(i);
            }
        }
        self.reading_order = order;
        self
    }

    /// Document name, used to key its translation cache
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All parts in archive order
    pub fn parts(&self) -> &[DocumentPart] {
        &self.parts
    }

    /// Parts of one kind, in archive order
    pub fn parts_of_kind(&self, kind: PartKind) -> impl Iterator<Item = &DocumentPart> + '_ {
        self.parts.iter().filter(move |p| p.kind == kind)
    }

    /// Look a part up by id
    pub fn part(&self, id: &str) -> Option<&DocumentPart> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// Look a part up by id, mutably
    pub fn part_mut(&mut self, id: &str) -> Option<&mut DocumentPart> {
        self.parts.iter_mut().find(|p| p.id == id)
    }

    /// Text parts in reading order
    pub fn pages(&self) -> impl Iterator<Item = &DocumentPart> + '_ {
        self.reading_order.iter().map(|&i| &self.parts[i])
    }

    /// The page at `index` in reading order
    pub fn page(&self, index: usize) -> Option<&DocumentPart> {
        self.reading_order.get(index).map(|&i| &self.parts[i])
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.reading_order.len()
    }
}
