/*!
 * Document handling.
 *
 * This module contains the document model shared by segmentation and
 * reintegration, text extraction from pages, and EPUB container I/O.
 */

pub mod epub;
pub mod html;
pub mod model;

pub use epub::{EpubArchive, EpubWriter};
pub use html::{extract_page, PageText, TextBlock};
pub use model::{Document, DocumentPart, DocumentWriter, PartKind};
