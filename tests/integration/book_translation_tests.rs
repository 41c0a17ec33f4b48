/*!
 * End-to-end book translation tests with a mock backend
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use yaetwai::document::{EpubArchive, EpubWriter};
use yaetwai::providers::mock::MockBackend;
use yaetwai::segmentation::Segmenter;
use yaetwai::translation::reintegration::BILINGUAL_MARKER;
use yaetwai::translation::{
    BookProgress, BookTranslator, PipelineConfig, ProgressCallback, ReintegrationMode, TranslationCache,
    TranslationScope,
};

use crate::common;

fn fast_pipeline() -> PipelineConfig {
    PipelineConfig {
        poll_interval: Duration::from_millis(10),
        stop_timeout: Duration::from_secs(2),
    }
}

fn shout(text: &str) -> String {
    text.to_uppercase()
}

fn sample_book(dir: &std::path::Path) -> std::path::PathBuf {
    common::create_test_epub(
        dir,
        "story.epub",
        &[
            (
                "ch1.xhtml",
                "<h1>Chapter one</h1>\n<p>It was a dark night.</p>\n<img src=\"../Images/cover.png\"/>",
            ),
            ("ch2.xhtml", "<p>The end came quickly.</p>\n<p>It was a dark night.</p>"),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_translate_wholeDocument_shouldTranslateCacheAndSave() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("story.zh.epub");
    let cache_dir = dir.path().join("cache");

    let mock = MockBackend::working().with_custom_response(shout);
    let cache = TranslationCache::open(&cache_dir, "story", "mock");
    let progress = Arc::new(Mutex::new(Vec::<BookProgress>::new()));
    let sink = Arc::clone(&progress);
    let on_progress: ProgressCallback = Arc::new(move |p| sink.lock().push(*p));

    let translator = BookTranslator::new(Segmenter::default(), Arc::new(mock.clone()))
        .with_cache(cache.clone())
        .with_pipeline_config(fast_pipeline())
        .with_progress(on_progress);

    let mut document = EpubArchive::read(&input).unwrap();
    let report = translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::WholeDocument, false)
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(report.pages_written, 2);
    assert_eq!(report.translated + report.duplicates + report.cached, report.units);

    let ch1 = common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap();
    assert!(ch1.contains("<h1>CHAPTER ONE</h1>"), "{}", ch1);
    assert!(ch1.contains("<p>IT WAS A DARK NIGHT.</p>"), "{}", ch1);
    assert!(ch1.contains("<img src=\"../Images/cover.png\"/>"));
    let ch2 = common::read_entry(&output, "OEBPS/Text/ch2.xhtml").unwrap();
    assert!(ch2.contains("<p>THE END CAME QUICKLY.</p>"), "{}", ch2);

    // Every distinct text is sent once
    let calls = mock.calls();
    let mut distinct = calls.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(calls.len(), distinct.len());

    let last = *progress.lock().last().unwrap();
    assert_eq!(last.completed, last.total);
    assert_eq!(cache.len(), calls.len());
}

#[tokio::test]
async fn test_translate_secondRun_shouldBeServedFromCache() {
    let dir = common::create_temp_dir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("story.zh.epub");
    let cache_dir = dir.path().join("cache");

    let first = MockBackend::working().with_custom_response(shout);
    let translator = BookTranslator::new(Segmenter::default(), Arc::new(first.clone()))
        .with_cache(TranslationCache::open(&cache_dir, "story", "mock"))
        .with_pipeline_config(fast_pipeline());
    let mut document = EpubArchive::read(&input).unwrap();
    translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::WholeDocument, false)
        .await
        .unwrap();

    let second = MockBackend::working();
    let translator = BookTranslator::new(Segmenter::default(), Arc::new(second.clone()))
        .with_cache(TranslationCache::open(&cache_dir, "story", "mock"))
        .with_pipeline_config(fast_pipeline());
    let mut document = EpubArchive::read(&input).unwrap();
    let report = translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::WholeDocument, false)
        .await
        .unwrap();

    assert_eq!(second.request_count(), 0);
    assert_eq!(report.cached, report.units);
    let ch2 = common::read_entry(&output, "OEBPS/Text/ch2.xhtml").unwrap();
    assert!(ch2.contains("THE END CAME QUICKLY."));
}

#[tokio::test]
async fn test_translate_pageWithRetranslate_shouldRefreshOnlyThatPage() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(
        dir.path(),
        "story.epub",
        &[("ch1.xhtml", "<p>Alpha.</p>"), ("ch2.xhtml", "<p>Beta.</p>")],
    )
    .unwrap();
    let output = dir.path().join("story.zh.epub");
    let cache = TranslationCache::open(dir.path().join("cache"), "story", "mock");
    cache.put("Alpha.", "old alpha").unwrap();
    cache.put("Beta.", "old beta").unwrap();

    let mock = MockBackend::working().with_custom_response(shout);
    let translator = BookTranslator::new(Segmenter::default(), Arc::new(mock.clone()))
        .with_cache(cache.clone())
        .with_pipeline_config(fast_pipeline());

    // Spine is reversed: page 0 is ch2
    let mut document = EpubArchive::read(&input).unwrap();
    let report = translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::Page(0), true)
        .await
        .unwrap();

    assert_eq!(report.units, 1);
    assert_eq!(report.translated, 1);
    assert_eq!(mock.calls(), vec!["Beta.".to_string()]);
    assert_eq!(cache.get("Beta."), Some("BETA.".to_string()));

    assert!(common::read_entry(&output, "OEBPS/Text/ch2.xhtml").unwrap().contains("<p>BETA.</p>"));
    // The other page keeps its cached translation
    assert!(common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap().contains("<p>old alpha</p>"));
}

#[tokio::test]
async fn test_translate_inBilingualMode_shouldKeepEachOriginalOnce() {
    let dir = common::create_temp_dir().unwrap();
    let input = sample_book(dir.path());
    let output = dir.path().join("story.zh.epub");

    let mock = MockBackend::working().with_custom_response(shout);
    let translator = BookTranslator::new(Segmenter::default(), Arc::new(mock))
        .with_pipeline_config(fast_pipeline())
        .with_mode(ReintegrationMode::Bilingual);
    let mut document = EpubArchive::read(&input).unwrap();
    let report = translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::WholeDocument, false)
        .await
        .unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(report.unplaced, 0);

    let night = format!("It was a dark night.{}IT WAS A DARK NIGHT.", BILINGUAL_MARKER);
    let ch1 = common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap();
    assert!(ch1.contains(&format!("<h1>Chapter one{}CHAPTER ONE</h1>", BILINGUAL_MARKER)), "{}", ch1);
    assert_eq!(ch1.matches(&night).count(), 1, "{}", ch1);

    // The repeated sentence is merged once even though two units carry it
    let ch2 = common::read_entry(&output, "OEBPS/Text/ch2.xhtml").unwrap();
    assert_eq!(ch2.matches(&night).count(), 1, "{}", ch2);
    assert_eq!(ch2.matches("It was a dark night.").count(), 1, "{}", ch2);
    assert_eq!(ch2.matches(BILINGUAL_MARKER).count(), 2, "{}", ch2);
}

#[tokio::test]
async fn test_translate_withTerminalBackend_shouldReportFailuresAndKeepOriginal() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "story.epub", &[("ch1.xhtml", "<p>Stay as is.</p>")]).unwrap();
    let output = dir.path().join("story.zh.epub");

    let translator = BookTranslator::new(Segmenter::default(), Arc::new(MockBackend::terminal()))
        .with_pipeline_config(fast_pipeline());
    let mut document = EpubArchive::read(&input).unwrap();
    let report = translator
        .translate(&mut document, &EpubWriter::new(&output), TranslationScope::WholeDocument, false)
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].0, "Stay as is.");
    assert_eq!(report.pages_written, 0);
    assert!(common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap().contains("<p>Stay as is.</p>"));
}

#[tokio::test]
async fn test_translate_withPageOutOfRange_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "story.epub", &[("ch1.xhtml", "<p>Only page.</p>")]).unwrap();
    let translator = BookTranslator::new(Segmenter::default(), Arc::new(MockBackend::working()));

    let mut document = EpubArchive::read(&input).unwrap();
    let result = translator
        .translate(
            &mut document,
            &EpubWriter::new(dir.path().join("out.epub")),
            TranslationScope::Page(3),
            false,
        )
        .await;
    assert!(result.is_err());
}
