/*!
 * Controller tests: files in, translated books out
 */

use std::sync::Arc;

use indicatif::MultiProgress;
use yaetwai::app_config::Config;
use yaetwai::app_controller::Controller;
use yaetwai::providers::mock::MockBackend;

use crate::common;

fn test_config(cache_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.cache_dir = Some(cache_dir.to_path_buf());
    config.pipeline.poll_interval_ms = 10;
    config
}

#[tokio::test]
async fn test_translateFile_shouldWriteOutputNextToInput() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "book.epub", &[("ch1.xhtml", "<p>Good morning.</p>")]).unwrap();
    let mock = MockBackend::working();
    let controller = Controller::with_backend(test_config(&dir.path().join("cache")), Arc::new(mock.clone()));

    let report = controller
        .translate_file(&input, None, false, &MultiProgress::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.translated, 1);
    let output = dir.path().join("book.zh.epub");
    let page = common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap();
    assert!(page.contains(&MockBackend::translated("Good morning.")), "{}", page);
}

#[tokio::test]
async fn test_translateFile_withExistingOutput_shouldSkipUnlessForced() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "book.epub", &[("ch1.xhtml", "<p>Again.</p>")]).unwrap();
    common::create_test_file(dir.path(), "book.zh.epub", "placeholder").unwrap();
    let mock = MockBackend::working();
    let controller = Controller::with_backend(test_config(&dir.path().join("cache")), Arc::new(mock.clone()));

    let skipped = controller
        .translate_file(&input, None, false, &MultiProgress::new())
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(mock.request_count(), 0);

    let forced = controller
        .translate_file(&input, None, true, &MultiProgress::new())
        .await
        .unwrap();
    assert!(forced.is_some());
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_run_withFolder_shouldTranslateEveryBookIntoOutputDir() {
    let dir = common::create_temp_dir().unwrap();
    let books = dir.path().join("books");
    std::fs::create_dir_all(&books).unwrap();
    common::create_test_epub(&books, "one.epub", &[("a.xhtml", "<p>First book.</p>")]).unwrap();
    common::create_test_epub(&books, "two.epub", &[("a.xhtml", "<p>Second book.</p>")]).unwrap();
    let out = dir.path().join("out");

    let controller = Controller::with_backend(test_config(&dir.path().join("cache")), Arc::new(MockBackend::working()));
    controller.run(books.clone(), Some(out.clone()), false).await.unwrap();

    assert!(out.join("one.zh.epub").exists());
    assert!(out.join("two.zh.epub").exists());
}

#[tokio::test]
async fn test_clearCache_shouldForceBackendOnNextRun() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "book.epub", &[("ch1.xhtml", "<p>Cached line.</p>")]).unwrap();
    let mock = MockBackend::working();
    let controller = Controller::with_backend(test_config(&dir.path().join("cache")), Arc::new(mock.clone()));

    controller.translate_page(&input, 0, false, None).await.unwrap();
    controller.translate_page(&input, 0, false, None).await.unwrap();
    assert_eq!(mock.request_count(), 1);

    assert_eq!(controller.clear_cache(&input).unwrap(), 1);
    controller.translate_page(&input, 0, false, None).await.unwrap();
    assert_eq!(mock.request_count(), 2);
}

#[test]
fn test_printSegments_shouldCountUnits() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(
        dir.path(),
        "book.epub",
        &[("a.xhtml", "<p>One.</p>"), ("b.xhtml", "<p>Two.</p>")],
    )
    .unwrap();
    let controller = Controller::with_backend(test_config(dir.path()), Arc::new(MockBackend::working()));
    assert_eq!(controller.print_segments(&input).unwrap(), 2);
}
