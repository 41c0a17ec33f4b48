/*!
 * Translation of documents through AI backends.
 *
 * - `cache`: Persistent original -> translation tables per document and backend
 * - `pipeline`: Single-worker FIFO queue dispatching units to a backend
 * - `reintegration`: Overlay of translated page content, committed on save
 * - `book`: Whole-document and single-page translation runs
 */

// Re-export main types for easier usage
pub use self::book::{BookProgress, BookReport, BookTranslator, ProgressCallback, TranslationScope};
pub use self::cache::TranslationCache;
pub use self::pipeline::{
    PipelineConfig, PipelineResult, PipelineRun, PipelineState, PipelineTask, ResultCallback, ResultSource,
    TranslationPipeline,
};
pub use self::reintegration::{ReintegrationMode, ReintegrationSession};

// Submodules
pub mod book;
pub mod cache;
pub mod pipeline;
pub mod reintegration;
