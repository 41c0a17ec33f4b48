/*!
 * Whole-book and single-page translation runs.
 *
 * A run segments the document, serves what it can from the cache, sends the
 * rest through the pipeline, merges every translation into a reintegration
 * overlay and finally commits the document through a writer.
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::document::model::{Document, DocumentWriter};
use crate::errors::{AppError, DocumentError};
use crate::providers::Backend;
use crate::segmentation::{Segmenter, TranslationUnit};

use super::cache::TranslationCache;
use super::pipeline::{
    PipelineConfig, PipelineResult, PipelineRun, PipelineTask, ResultCallback, ResultSource, TranslationPipeline,
};
use super::reintegration::{has_character_references, ReintegrationMode, ReintegrationSession};

/// What part of a document a run translates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationScope {
    /// Every page
    WholeDocument,
    /// One page, by reading-order index
    Page(usize),
}

/// Running totals reported while a run progresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookProgress {
    pub total: usize,
    pub completed: usize,
    pub from_cache: usize,
    pub failed: usize,
}

/// Progress listener
pub type ProgressCallback = Arc<dyn Fn(&BookProgress) + Send + Sync>;

/// Summary of a finished run
#[derive(Debug, Clone, Default)]
pub struct BookReport {
    /// Units in scope
    pub units: usize,
    /// Units served from the cache
    pub cached: usize,
    /// Units translated by the backend
    pub translated: usize,
    /// Units whose translation failed
    pub failed: usize,
    /// Units sharing their text with an earlier unit, translated once
    pub duplicates: usize,
    /// Translations that could not be placed in the markup
    pub unplaced: usize,
    /// Pages rewritten in the saved document
    pub pages_written: usize,
    /// Non-fatal cache save problems
    pub cache_warnings: Vec<String>,
    /// Original text and error of every failed unit
    pub failures: Vec<(String, String)>,
}

/// Drives translation runs over documents
pub struct BookTranslator {
    segmenter: Segmenter,
    backend: Arc<dyn Backend>,
    cache: Option<TranslationCache>,
    pipeline_config: PipelineConfig,
    progress: Option<ProgressCallback>,
    mode: ReintegrationMode,
}

impl BookTranslator {
    /// Translator without a cache
    pub fn new(segmenter: Segmenter, backend: Arc<dyn Backend>) -> Self {
        Self {
            segmenter,
            backend,
            cache: None,
            pipeline_config: PipelineConfig::default(),
            progress: None,
            mode: ReintegrationMode::Replace,
        }
    }

    /// Use `cache`, switching it to this translator's backend table
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        if cache.backend_id() != self.backend.id() {
            cache.switch_backend(self.backend.id());
        }
        self.cache = Some(cache);
        self
    }

    pub fn with_pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = config;
        self
    }

    /// Replace the original text, or keep it next to the translation
    pub fn with_mode(mut self, mode: ReintegrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Report progress to `callback` after every unit
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn cache(&self) -> Option<&TranslationCache> {
        self.cache.as_ref()
    }

    /// Units of `document` within `scope`, in order
    pub fn units(&self, document: &Document, scope: TranslationScope) -> Result<Vec<TranslationUnit>, DocumentError> {
        match scope {
            TranslationScope::WholeDocument => Ok(self.segmenter.segment(document)),
            TranslationScope::Page(index) => {
                let page = document.page(index).ok_or_else(|| {
                    DocumentError::UnknownPart(format!("page {} of {}", index, document.page_count()))
                })?;
                let markup = page.text().ok_or_else(|| DocumentError::Markup {
                    part: page.id().to_string(),
                    message: "page is not valid UTF-8".to_string(),
                })?;
                Ok(self.segmenter.segment_page(page.id(), markup))
            }
        }
    }

    /// Translate `scope` of `document` and save it with `writer`.
    ///
    /// With `retranslate`, cached translations of the units in scope are
    /// discarded first. For a single page, cached translations of the other
    /// pages are merged as well so the saved document keeps them.
    pub async fn translate(
        &self,
        document: &mut Document,
        writer: &dyn DocumentWriter,
        scope: TranslationScope,
        retranslate: bool,
    ) -> Result<BookReport, AppError> {
        let started = Instant::now();
        let units: Vec<TranslationUnit> = self
            .units(document, scope)?
            .into_iter()
            .filter(|unit| !unit.text.trim().is_empty())
            .collect();
        info!(
            "Translating {} ({} units) with {}",
            document.name(),
            units.len(),
            self.backend.id()
        );

        let mut report = BookReport {
            units: units.len(),
            ..Default::default()
        };
        let mut progress = BookProgress {
            total: units.len(),
            ..Default::default()
        };
        let mut session = ReintegrationSession::with_mode(self.mode);

        if retranslate {
            if let Some(cache) = &self.cache {
                match cache.remove_many(units.iter().map(|u| u.text.as_str())) {
                    Ok(removed) => debug!("Discarded {} cached translations", removed),
                    Err(e) => {
                        warn!("{}", e);
                        report.cache_warnings.push(e.to_string());
                    }
                }
            }
        }

        if let (TranslationScope::Page(_), Some(cache)) = (scope, &self.cache) {
            let in_scope: HashSet<&str> = units.iter().map(|u| u.text.as_str()).collect();
            for unit in self.segmenter.segment(document) {
                if in_scope.contains(unit.text.as_str()) {
                    continue;
                }
                if let Some(translated) = cache.get(&unit.text) {
                    apply_unit(&mut session, document, &unit.text, &translated);
                }
            }
        }

        // Cache hits are merged directly, the rest goes to the backend once per distinct text
        let mut pending: Vec<&TranslationUnit> = Vec::new();
        let mut queued: HashSet<&str> = HashSet::new();
        for unit in &units {
            if let Some(translated) = self.cache.as_ref().and_then(|c| c.get(&unit.text)) {
                if !apply_unit(&mut session, document, &unit.text, &translated) {
                    warn_unplaced(document, &unit.part_id, &unit.text);
                    report.unplaced += 1;
                }
                report.cached += 1;
                progress.completed += 1;
                progress.from_cache += 1;
                self.notify(&progress);
            } else if queued.insert(unit.text.as_str()) {
                pending.push(unit);
            } else {
                // Duplicate of a queued unit; its result replaces every occurrence
                progress.completed += 1;
                report.duplicates += 1;
                self.notify(&progress);
            }
        }

        if !pending.is_empty() {
            self.run_pipeline(document, &pending, &mut session, &mut report, &mut progress)
                .await?;
        }

        report.pages_written = session.commit(document, writer)?;
        info!(
            "Finished {} in {:.1}s: {} translated, {} cached, {} failed",
            document.name(),
            started.elapsed().as_secs_f64(),
            report.translated,
            report.cached,
            report.failed
        );
        Ok(report)
    }

    async fn run_pipeline(
        &self,
        document: &Document,
        pending: &[&TranslationUnit],
        session: &mut ReintegrationSession,
        report: &mut BookReport,
        progress: &mut BookProgress,
    ) -> Result<(), AppError> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callback: ResultCallback = Arc::new(move |result| {
            let _ = tx.send(result);
        });
        let mut run = PipelineRun::new(Arc::clone(&self.backend), callback);
        if let Some(cache) = &self.cache {
            run = run.with_cache(cache.clone());
        }

        let pipeline = TranslationPipeline::new(self.pipeline_config);
        if !pipeline.start(run) {
            return Err(AppError::Pipeline("translation worker could not be started".to_string()));
        }
        let pages: HashMap<&str, &str> = pending
            .iter()
            .map(|unit| (unit.text.as_str(), unit.part_id.as_str()))
            .collect();
        let rejected = submit_all(&pipeline, pending);
        for text in &rejected {
            report.failed += 1;
            report.failures.push((text.clone(), REJECTED_MESSAGE.to_string()));
            progress.failed += 1;
            progress.completed += 1;
            self.notify(progress);
        }

        let expected = pending.len() - rejected.len();
        let mut received = 0;
        while received < expected {
            let Some(result) = rx.recv().await else {
                warn!("Translation worker ended before all results arrived");
                break;
            };
            received += 1;

            match result {
                PipelineResult::Success {
                    translated_text,
                    original_text,
                    source,
                    cache_warning,
                    ..
                } => {
                    if !apply_unit(session, document, &original_text, &translated_text) {
                        let part_id = pages.get(original_text.as_str()).copied().unwrap_or("?");
                        warn_unplaced(document, part_id, &original_text);
                        report.unplaced += 1;
                    }
                    if source == ResultSource::Cache {
                        report.cached += 1;
                        progress.from_cache += 1;
                    } else {
                        report.translated += 1;
                    }
                    if let Some(warning) = cache_warning {
                        report.cache_warnings.push(warning);
                    }
                }
                PipelineResult::Failure { error, original_text } => {
                    report.failed += 1;
                    progress.failed += 1;
                    report.failures.push((original_text, error.to_string()));
                }
            }
            progress.completed += 1;
            self.notify(progress);
        }

        if !pipeline.stop().await {
            warn!("Translation worker did not stop in time");
        }
        Ok(())
    }

    fn notify(&self, progress: &BookProgress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

fn warn_unplaced(document: &Document, part_id: &str, original: &str) {
    let hint = match document.part(part_id).and_then(|part| part.text()) {
        Some(markup) if has_character_references(markup) => " (its markup uses character references)",
        _ => "",
    };
    warn!("Translation could not be placed in {}{}: {}", part_id, hint, original);
}

const REJECTED_MESSAGE: &str = "translation pipeline rejected the task";

/// Queue every unit; returns the texts the pipeline refused
fn submit_all(pipeline: &TranslationPipeline, units: &[&TranslationUnit]) -> Vec<String> {
    let mut rejected = Vec::new();
    for unit in units {
        if !pipeline.submit(PipelineTask::for_text(unit.text.clone()).bypass_cache()) {
            warn!("{}: {}", REJECTED_MESSAGE, unit.text);
            rejected.push(unit.text.clone());
        }
    }
    rejected
}

/// Merge one unit's translation into the overlay.
///
/// Units made of several blocks are not contiguous in the markup; when the
/// whole text is not found they are placed line by line, provided the
/// translation has as many lines as the original.
pub fn apply_unit(session: &mut ReintegrationSession, document: &Document, original: &str, translated: &str) -> bool {
    let original = original.trim();
    let translated = translated.trim();
    if session.apply_translation(document, original, translated) > 0
        || session.is_applied(document, original, translated)
    {
        return true;
    }

    let original_lines: Vec<&str> = original.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if original_lines.len() < 2 {
        debug!("Translation target not found in markup: {}", original);
        return false;
    }

    let translated_lines: Vec<&str> = translated.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if translated_lines.len() != original_lines.len() {
        debug!(
            "Translation has {} lines, expected {}; leaving the original text in place",
            translated_lines.len(),
            original_lines.len()
        );
        return false;
    }

    let mut placed = false;
    for (source, target) in original_lines.iter().zip(&translated_lines) {
        placed |= session.apply_translation(document, source, target) > 0
            || session.is_applied(document, source, target);
    }
    placed
}
