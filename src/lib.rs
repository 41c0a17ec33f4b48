/*!
 * # YAETwAI - Yet Another EPUB Translator with AI
 *
 * A Rust library for translating EPUB books with AI backends.
 *
 * ## Features
 *
 * - Split pages into bounded translation units, sized by script register
 * - Translate units through interchangeable backends:
 *   - Ollama (local LLM)
 *   - DeepSeek API
 * - Single-worker translation pipeline with retry and cooperative stop
 * - Persistent translation cache per book and backend
 * - Merge translations back into the book without touching other content
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `document`: EPUB container and (X)HTML page text
 * - `segmentation`: Register classification, cut points and unit building
 * - `translation`: Cache, pipeline, reintegration and whole-book runs
 * - `providers`: Backend implementations and the retry policy
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod segmentation;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Document, DocumentWriter, EpubArchive, EpubWriter};
pub use errors::{AppError, BackendError, CacheError, DocumentError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use providers::Backend;
pub use segmentation::{Segmenter, TranslationUnit};
pub use translation::{BookTranslator, TranslationCache, TranslationPipeline};
