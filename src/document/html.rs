/*!
 * Text extraction from (X)HTML pages.
 *
 * A page is read as a flat stream of markup events; text is collected into
 * the block element (`p`, `div`, `h1`..`h6`) that most closely encloses it.
 */

use log::warn;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

/// Element names whose text forms a block
pub const BLOCK_TAGS: &[&str] = &["p", "div", "h1", "h2", "h3", "h4", "h5", "h6"];

/// Elements whose content is never text for translation
const SKIPPED_TAGS: &[&str] = &["script", "style"];

/// Text of one block element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// Position of the element among all block elements on the page
    pub index: usize,
    /// Lowercase tag name
    pub tag: String,
    /// Trimmed, unescaped text directly owned by this block
    pub text: String,
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageText {
    /// Non-empty blocks in document order
    pub blocks: Vec<TextBlock>,
    /// All visible text of the page, used for register detection
    pub full_text: String,
    /// Set when the markup could not be parsed to the end
    pub parse_error: Option<String>,
}

impl PageText {
    /// Whether the page holds no block text
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

struct OpenBlock {
    index: usize,
    tag: String,
    text: String,
}

/// Extract the block texts of a page.
///
/// Malformed markup does not fail the page: blocks read before the error are
/// kept and the error is reported in [`PageText::parse_error`].
pub fn extract_page(markup: &str) -> PageText {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;

    let mut page = PageText::default();
    let mut open: Vec<OpenBlock> = Vec::new();
    let mut finished: Vec<TextBlock> = Vec::new();
    let mut next_index = 0usize;
    let mut skip_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                let name = local_name(start.local_name().as_ref());
                if SKIPPED_TAGS.contains(&name.as_str()) {
                    skip_depth += 1;
                } else if BLOCK_TAGS.contains(&name.as_str()) {
                    open.push(OpenBlock {
                        index: next_index,
                        tag: name,
                        text: String::new(),
                    });
                    next_index += 1;
                }
            }
            Ok(Event::Empty(start)) => {
                let name = local_name(start.local_name().as_ref());
                if BLOCK_TAGS.contains(&name.as_str()) {
                    next_index += 1;
                }
            }
            Ok(Event::End(end)) => {
                let name = local_name(end.local_name().as_ref());
                if SKIPPED_TAGS.contains(&name.as_str()) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if BLOCK_TAGS.contains(&name.as_str()) {
                    close_block(&mut open, &mut finished, &name);
                }
            }
            Ok(Event::Text(text)) => {
                if skip_depth == 0 {
                    push_text(&mut page.full_text, &mut open, &unescape(&text));
                }
            }
            Ok(Event::CData(data)) => {
                if skip_depth == 0 {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    push_text(&mut page.full_text, &mut open, &text);
                }
            }
            Ok(_) => {}
            Err(e) => {
                let message = format!("at byte {}: {}", reader.error_position(), e);
                warn!("Stopped reading page markup {}", message);
                page.parse_error = Some(message);
                break;
            }
        }
    }

    // Unclosed blocks at the end still own their text
    while let Some(block) = open.pop() {
        finish(&mut finished, block);
    }

    finished.sort_by_key(|b| b.index);
    page.blocks = finished;
    page
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn unescape(text: &BytesText<'_>) -> String {
    match text.unescape_with(resolve_entity) {
        Ok(cow) => cow.into_owned(),
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}

fn resolve_entity(entity: &str) -> Option<&'static str> {
    resolve_predefined_entity(entity).or(match entity {
        "nbsp" => Some("\u{a0}"),
        "ensp" => Some("\u{2002}"),
        "emsp" => Some("\u{2003}"),
        "thinsp" => Some("\u{2009}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "hellip" => Some("\u{2026}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "middot" => Some("\u{b7}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    })
}

fn push_text(full_text: &mut String, open: &mut [OpenBlock], text: &str) {
    full_text.push_str(text);
    if let Some(block) = open.last_mut() {
        block.text.push_str(text);
    }
}

fn close_block(open: &mut Vec<OpenBlock>, finished: &mut Vec<TextBlock>, tag: &str) {
    // A stray end tag closes nothing
    let Some(position) = open.iter().rposition(|b| b.tag == tag) else {
        return;
    };
    while open.len() > position {
        if let Some(block) = open.pop() {
            finish(finished, block);
        }
    }
}

fn finish(finished: &mut Vec<TextBlock>, block: OpenBlock) {
    let text = block.text.trim();
    if !text.is_empty() {
        finished.push(TextBlock {
            index: block.index,
            tag: block.tag,
            text: text.to_string(),
        });
    }
}
