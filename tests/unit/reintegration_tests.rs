/*!
 * Tests for merging translations back into EPUB documents
 */

use yaetwai::document::{EpubArchive, EpubWriter};
use yaetwai::translation::ReintegrationSession;

use crate::common;

#[test]
fn test_commit_shouldRewriteOnlyTouchedEntries() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(
        dir.path(),
        "book.epub",
        &[
            ("ch1.xhtml", "<p>The cat sat on the mat.</p>"),
            ("ch2.xhtml", "<p>Nothing to see here.</p>"),
        ],
    )
    .unwrap();
    let output = dir.path().join("book.fr.epub");

    let mut document = EpubArchive::read(&input).unwrap();
    let mut session = ReintegrationSession::new();
    assert_eq!(session.apply_translation(&document, "The cat sat on the mat.", "Le chat était assis."), 1);
    assert_eq!(session.commit(&mut document, &EpubWriter::new(&output)).unwrap(), 1);

    let before = common::read_entries(&input).unwrap();
    let after = common::read_entries(&output).unwrap();
    assert_eq!(before.len(), after.len());
    for ((name_before, data_before), (name_after, data_after)) in before.iter().zip(&after) {
        assert_eq!(name_before, name_after);
        if name_before == "OEBPS/Text/ch1.xhtml" {
            let text = String::from_utf8(data_after.clone()).unwrap();
            assert!(text.contains("<p>Le chat était assis.</p>"));
            assert!(text.contains("<link rel=\"stylesheet\""));
        } else {
            assert_eq!(data_before, data_after, "{} changed", name_before);
        }
    }
}

#[test]
fn test_applyTranslation_twice_shouldMatchSingleApplication() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "book.epub", &[("ch1.xhtml", "<p>Once.</p><p>Once.</p>")])
        .unwrap();
    let document = EpubArchive::read(&input).unwrap();

    let mut once = ReintegrationSession::new();
    once.apply_translation(&document, "Once.", "Une fois.");

    let mut twice = ReintegrationSession::new();
    twice.apply_translation(&document, "Once.", "Une fois.");
    twice.apply_translation(&document, "Once.", "Une fois.");

    let id = "OEBPS/Text/ch1.xhtml";
    assert_eq!(once.pending_content(id), twice.pending_content(id));
    assert!(once.pending_content(id).unwrap().contains("<p>Une fois.</p><p>Une fois.</p>"));
}

#[test]
fn test_commit_afterWriteFailure_shouldSucceedOnRetry() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_epub(dir.path(), "book.epub", &[("ch1.xhtml", "<p>Retry me.</p>")]).unwrap();
    let mut document = EpubArchive::read(&input).unwrap();

    let mut session = ReintegrationSession::new();
    session.apply_translation(&document, "Retry me.", "Réessaie-moi.");

    let unreachable = EpubWriter::new(dir.path().join("missing").join("out.epub"));
    assert!(session.commit(&mut document, &unreachable).is_err());
    assert!(!session.is_empty());

    let output = dir.path().join("out.epub");
    assert_eq!(session.commit(&mut document, &EpubWriter::new(&output)).unwrap(), 1);
    let page = common::read_entry(&output, "OEBPS/Text/ch1.xhtml").unwrap();
    assert!(page.contains("Réessaie-moi."));
}
