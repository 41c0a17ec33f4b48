/*!
 * EPUB read/write round-trip tests
 */

use yaetwai::document::{DocumentWriter, EpubArchive, EpubWriter, PartKind};

use crate::common;

#[test]
fn test_read_shouldClassifyPartsAndFollowSpine() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(
        dir.path(),
        "novel.epub",
        &[("a.xhtml", "<p>A</p>"), ("b.xhtml", "<p>B</p>"), ("c.xhtml", "<p>C</p>")],
    )
    .unwrap();

    let document = EpubArchive::read(&input).unwrap();
    assert_eq!(document.name(), "novel");
    assert_eq!(document.page_count(), 3);

    // The test spine lists pages in reverse
    let pages: Vec<&str> = document.pages().map(|p| p.id()).collect();
    assert_eq!(
        pages,
        vec!["OEBPS/Text/c.xhtml", "OEBPS/Text/b.xhtml", "OEBPS/Text/a.xhtml"]
    );
    assert_eq!(document.part("OEBPS/Styles/style.css").unwrap().kind(), PartKind::Style);
    assert_eq!(document.part("OEBPS/Images/cover.png").unwrap().kind(), PartKind::Image);
    assert_eq!(document.part("mimetype").unwrap().kind(), PartKind::Other);
}

#[test]
fn test_write_withoutChanges_shouldReproduceEveryEntry() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "novel.epub", &[("a.xhtml", "<p>Unchanged.</p>")]).unwrap();
    let output = dir.path().join("copy.epub");

    let document = EpubArchive::read(&input).unwrap();
    EpubWriter::new(&output).write(&document).unwrap();

    assert_eq!(common::read_entries(&input).unwrap(), common::read_entries(&output).unwrap());
    let reread = EpubArchive::read(&output).unwrap();
    assert_eq!(reread.page_count(), 1);
}

#[test]
fn test_write_shouldPutStoredMimetypeFirst() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "novel.epub", &[("a.xhtml", "<p>x</p>")]).unwrap();
    let output = dir.path().join("copy.epub");

    let document = EpubArchive::read(&input).unwrap();
    EpubWriter::new(&output).write(&document).unwrap();

    let mut archive = zip::ZipArchive::new(std::fs::File::open(&output).unwrap()).unwrap();
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
}

#[test]
fn test_read_withoutPackage_shouldFallBackToArchiveOrder() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("bare.epub");
    {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("2.html", options).unwrap();
        zip.write_all(b"<p>two</p>").unwrap();
        zip.start_file("1.html", options).unwrap();
        zip.write_all(b"<p>one</p>").unwrap();
        zip.finish().unwrap();
    }

    let document = EpubArchive::read(&path).unwrap();
    let pages: Vec<&str> = document.pages().map(|p| p.id()).collect();
    assert_eq!(pages, vec!["2.html", "1.html"]);
}

#[test]
fn test_read_withMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    assert!(EpubArchive::read(&dir.path().join("nope.epub")).is_err());
}
