use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::document::{EpubArchive, EpubWriter};
use crate::file_utils::{FileManager, FileType};
use crate::providers::{build_backend, Backend};
use crate::segmentation::Segmenter;
use crate::translation::{BookReport, BookTranslator, ProgressCallback, TranslationCache, TranslationScope};

// @module: Application controller for EPUB translation

/// Main application controller for book translation
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Backend override, built from the config when absent
    backend: Option<Arc<dyn Backend>>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config, backend: None })
    }

    /// Controller that sends every request to `backend` instead of the configured one
    pub fn with_backend(config: Config, backend: Arc<dyn Backend>) -> Self {
        Self {
            config,
            backend: Some(backend),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn backend(&self) -> Result<Arc<dyn Backend>> {
        match &self.backend {
            Some(backend) => Ok(Arc::clone(backend)),
            None => build_backend(&self.config).context("Failed to create translation backend"),
        }
    }

    fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.config.segment_policy(), self.config.classifier())
    }

    fn open_cache(&self, input_file: &Path, backend_id: &str) -> TranslationCache {
        let name = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        TranslationCache::open(self.config.cache_directory(), &name, backend_id)
    }

    /// Translate a single EPUB or every EPUB under a directory
    pub async fn run(&self, input: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<()> {
        match FileManager::detect_file_type(&input)? {
            FileType::Directory => self.run_folder(input, output_dir, force_overwrite).await,
            FileType::Epub | FileType::Archive => {
                let multi_progress = MultiProgress::new();
                self.translate_file(&input, output_dir.as_deref(), force_overwrite, &multi_progress)
                    .await
                    .map(|_| ())
            }
            FileType::Unknown => Err(anyhow!("Not an EPUB file: {:?}", input)),
        }
    }

    /// Translate every EPUB under `input_dir`; files that fail are reported and skipped
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<()> {
        let start_time = std::time::Instant::now();
        let books = FileManager::find_epubs(&input_dir, &self.config.target_language)?;
        if books.is_empty() {
            return Err(anyhow!("No EPUB files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(books.len() as u64));
        folder_pb.set_style(Self::bar_style("books"));
        folder_pb.set_message("Processing files");

        let mut failed = 0;
        for book in &books {
            let file_name = book.file_name().unwrap_or_default().to_string_lossy().to_string();
            folder_pb.set_message(format!("Processing: {}", file_name));
            if let Err(e) = self
                .translate_file(book, output_dir.as_deref(), force_overwrite, &multi_progress)
                .await
            {
                warn!("Failed to translate {}: {:#}", file_name, e);
                failed += 1;
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Processed {} books ({} failed) in {}",
            books.len(),
            failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(())
    }

    /// Translate one EPUB into `{stem}.{lang}.epub`.
    ///
    /// Returns `None` when the output exists and `force_overwrite` is off.
    pub async fn translate_file(
        &self,
        input_file: &Path,
        output_dir: Option<&Path>,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<Option<BookReport>> {
        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }
        if let Some(parent) = output_path.parent() {
            FileManager::ensure_dir(parent)?;
        }

        let report = self
            .translate_scope(input_file, &output_path, TranslationScope::WholeDocument, false, multi_progress)
            .await?;
        Ok(Some(report))
    }

    /// Translate one page of `input_file` into its output file.
    ///
    /// Translations of the other pages already in the cache are kept.
    pub async fn translate_page(
        &self,
        input_file: &Path,
        page: usize,
        retranslate: bool,
        output_dir: Option<&Path>,
    ) -> Result<BookReport> {
        let output_path = FileManager::generate_output_path(input_file, output_dir, &self.config.target_language);
        if let Some(parent) = output_path.parent() {
            FileManager::ensure_dir(parent)?;
        }
        let multi_progress = MultiProgress::new();
        self.translate_scope(input_file, &output_path, TranslationScope::Page(page), retranslate, &multi_progress)
            .await
    }

    async fn translate_scope(
        &self,
        input_file: &Path,
        output_path: &Path,
        scope: TranslationScope,
        retranslate: bool,
        multi_progress: &MultiProgress,
    ) -> Result<BookReport> {
        let start_time = std::time::Instant::now();
        let mut document =
            EpubArchive::read(input_file).with_context(|| format!("Failed to read EPUB: {:?}", input_file))?;
        let backend = self.backend()?;
        let cache = self.open_cache(input_file, backend.id());

        info!(
            "YAETwAI: {} - {} -> {}",
            self.config.translation.backend.display_name(),
            self.config.translation.get_model(),
            self.config.target_language
        );

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(Self::bar_style("units"));
        progress_bar.set_message(document.name().to_string());
        let pb = progress_bar.clone();
        let on_progress: ProgressCallback = Arc::new(move |progress| {
            pb.set_length(progress.total as u64);
            pb.set_position(progress.completed as u64);
        });

        let translator = BookTranslator::new(self.segmenter(), backend)
            .with_cache(cache)
            .with_pipeline_config(self.config.pipeline_config())
            .with_mode(self.config.reintegration_mode())
            .with_progress(on_progress);
        let writer = EpubWriter::new(output_path);
        let result = translator.translate(&mut document, &writer, scope, retranslate).await;
        progress_bar.finish_and_clear();

        let report = result.with_context(|| format!("Failed to translate {:?}", input_file))?;
        for (original, error) in &report.failures {
            warn!("Untranslated: {} ({})", preview(original), error);
        }
        for warning in &report.cache_warnings {
            warn!("{}", warning);
        }
        info!(
            "Saved {:?} ({} translated, {} cached, {} failed) in {}",
            output_path,
            report.translated,
            report.cached,
            report.failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(report)
    }

    /// Print the translation units of a book
    pub fn print_segments(&self, input_file: &Path) -> Result<usize> {
        let document =
            EpubArchive::read(input_file).with_context(|| format!("Failed to read EPUB: {:?}", input_file))?;
        let units = self.segmenter().segment(&document);
        for (i, unit) in units.iter().enumerate() {
            println!(
                "{:>5}  {:<30} {:<8} {:>5}  {}",
                i,
                unit.part_id,
                format!("{:?}", unit.register),
                unit.length,
                preview(&unit.text)
            );
        }
        Ok(units.len())
    }

    /// Delete the cached translations of a book for the active backend
    pub fn clear_cache(&self, input_file: &Path) -> Result<usize> {
        let backend_id = match &self.backend {
            Some(backend) => backend.id().to_string(),
            None => self.config.translation.backend.to_lowercase_string(),
        };
        let cache = self.open_cache(input_file, &backend_id);
        let removed = cache.len();
        cache.clear().context("Failed to clear translation cache")?;
        info!("Removed {} cached translations from {:?}", removed, cache.path());
        Ok(removed)
    }

    fn bar_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

/// First line of `text`, shortened for log output
fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > 60 || text.contains('\n') {
        format!("{}…", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}
