/*!
 * EPUB container I/O.
 *
 * Reading keeps every archive entry with its original metadata; the package
 * document (OPF) is only consulted to classify parts and order the pages.
 * Writing replays the entries in their original order so untouched parts
 * come out byte-identical.
 */

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use percent_encoding::percent_decode_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::errors::DocumentError;

use super::model::{Document, DocumentPart, DocumentWriter, EntryMeta, PartKind};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const MIMETYPE_ENTRY: &str = "mimetype";
const MAX_PREALLOCATION: usize = 16 * 1024 * 1024;

/// Manifest entry of the package document
#[derive(Debug, Clone)]
struct ManifestItem {
    path: String,
    media_type: String,
}

/// Reads EPUB files into a [`Document`]
pub struct EpubArchive;

impl EpubArchive {
    /// Read the EPUB at `path`
    pub fn read(path: &Path) -> Result<Document, DocumentError> {
        let file = File::open(path).map_err(|e| DocumentError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut zip = ZipArchive::new(file)?;

        let mut parts = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let mut data = Vec::with_capacity(preallocation(entry.size()));
            entry.read_to_end(&mut data).map_err(|e| DocumentError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            let name = entry.name().to_string();
            let kind = PartKind::from_file_name(&name);
            let mut part = DocumentPart::new(name, kind, data);
            part.entry = Some(EntryMeta {
                compression: entry.compression(),
                last_modified: entry.last_modified().unwrap_or_default(),
                unix_mode: entry.unix_mode(),
                is_dir: entry.is_dir(),
            });
            parts.push(part);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let package = match read_package(&parts) {
            Ok(package) => package,
            Err(e) => {
                warn!("Could not read package document of {:?}, using archive order: {}", path, e);
                None
            }
        };

        let document = match package {
            Some((manifest, spine)) => {
                let kinds: HashMap<&str, PartKind> = manifest
                    .values()
                    .map(|item| (item.path.as_str(), PartKind::from_media_type(&item.media_type)))
                    .collect();
                let parts = parts
                    .into_iter()
                    .map(|part| match kinds.get(part.id()) {
                        Some(&kind) => part.with_kind(kind),
                        None => part,
                    })
                    .collect();
                let order: Vec<String> = spine
                    .iter()
                    .filter_map(|idref| manifest.get(idref).map(|item| item.path.clone()))
                    .collect();
                Document::new(name, parts).with_reading_order(&order)
            }
            None => Document::new(name, parts),
        };

        debug!(
            "Read {:?}: {} parts, {} pages",
            path,
            document.parts().len(),
            document.page_count()
        );
        Ok(document)
    }
}

/// Manifest by id and spine idrefs, or `None` when the archive has no container file
type Package = Option<(HashMap<String, ManifestItem>, Vec<String>)>;

fn read_package(parts: &[DocumentPart]) -> Result<Package, DocumentError> {
    let Some(container) = parts.iter().find(|p| p.id() == CONTAINER_PATH) else {
        return Ok(None);
    };
    let Some(opf_path) = find_rootfile(container)? else {
        return Ok(None);
    };
    let Some(opf) = parts.iter().find(|p| p.id() == opf_path) else {
        return Err(DocumentError::UnknownPart(opf_path));
    };
    let base = match opf_path.rfind('/') {
        Some(pos) => &opf_path[..=pos],
        None => "",
    };
    parse_opf(opf, base).map(Some)
}

fn find_rootfile(container: &DocumentPart) -> Result<Option<String>, DocumentError> {
    let mut reader = Reader::from_reader(container.content());
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(None),
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rootfile" {
                    if let Some(path) = attribute(&e, "full-path") {
                        return Ok(Some(path));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Markup {
                    part: container.id().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }
}

fn parse_opf(
    opf: &DocumentPart,
    base: &str,
) -> Result<(HashMap<String, ManifestItem>, Vec<String>), DocumentError> {
    let mut reader = Reader::from_reader(opf.content());
    let mut buf = Vec::new();
    let mut manifest = HashMap::new();
    let mut spine = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"item" => {
                    let (Some(id), Some(href)) = (attribute(&e, "id"), attribute(&e, "href")) else {
                        continue;
                    };
                    let media_type = attribute(&e, "media-type").unwrap_or_default();
                    manifest.insert(
                        id,
                        ManifestItem {
                            path: resolve_href(base, &href),
                            media_type,
                        },
                    );
                }
                b"itemref" => {
                    if let Some(idref) = attribute(&e, "idref") {
                        spine.push(idref);
                    }
                }
                _ => {}
            },
            Ok(_) => {}
            Err(e) => {
                return Err(DocumentError::Markup {
                    part: opf.id().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok((manifest, spine))
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Resolve a manifest href against the package directory
fn resolve_href(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = percent_decode(href);
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Buffer capacity for an entry whose header claims `declared` bytes; header sizes are untrusted
fn preallocation(declared: u64) -> usize {
    usize::try_from(declared).map_or(MAX_PREALLOCATION, |size| size.min(MAX_PREALLOCATION))
}

fn percent_decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

/// Writes a [`Document`] back out as an EPUB archive
#[derive(Debug, Clone)]
pub struct EpubWriter {
    path: PathBuf,
}

impl EpubWriter {
    /// Writer targeting `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> DocumentError {
        DocumentError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DocumentWriter for EpubWriter {
    fn write(&self, document: &Document) -> Result<(), DocumentError> {
        let directory = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = tempfile::NamedTempFile::new_in(&directory).map_err(|e| self.io_error(e))?;
        let file = temp.reopen().map_err(|e| self.io_error(e))?;
        let mut zout = ZipWriter::new(file);

        // The mimetype entry must come first and be stored uncompressed
        let mut parts: Vec<&DocumentPart> = document.parts().iter().collect();
        if let Some(pos) = parts.iter().position(|p| p.id() == MIMETYPE_ENTRY) {
            let mimetype = parts.remove(pos);
            parts.insert(0, mimetype);
        }

        for part in parts {
            let mut options = match &part.entry {
                Some(meta) => {
                    let mut options = SimpleFileOptions::default()
                        .compression_method(meta.compression)
                        .last_modified_time(meta.last_modified);
                    if let Some(mode) = meta.unix_mode {
                        options = options.unix_permissions(mode);
                    }
                    options
                }
                None => SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            };
            if part.id() == MIMETYPE_ENTRY {
                options = options.compression_method(CompressionMethod::Stored);
            }

            let is_dir = part.entry.as_ref().is_some_and(|m| m.is_dir) || part.id().ends_with('/');
            if is_dir {
                zout.add_directory(part.id(), options)?;
            } else {
                zout.start_file(part.id(), options)?;
                zout.write_all(part.content()).map_err(|e| self.io_error(e))?;
            }
        }
        zout.finish()?;

        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        debug!("Wrote {:?}", self.path);
        Ok(())
    }
}
