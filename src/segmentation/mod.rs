/*!
 * Segmentation of documents into translation units.
 *
 * - `classifier`: picks the register of a page (archaic or standard)
 * - `cut_point`: finds safe split positions inside long text
 * - `segmenter`: walks pages and produces ordered units
 */

pub mod classifier;
pub mod cut_point;
pub mod segmenter;

pub use classifier::{Register, ScriptClassifier};
pub use cut_point::find_cut;
pub use segmenter::{ElementRef, SegmentPolicy, Segmenter, TranslationUnit};
