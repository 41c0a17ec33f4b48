/*!
 * Tests for segmentation: cut points, register classification and unit building
 */

use yaetwai::document::html::TextBlock;
use yaetwai::document::{Document, DocumentPart, PartKind};
use yaetwai::segmentation::classifier::Register;
use yaetwai::segmentation::cut_point::find_cut;
use yaetwai::segmentation::segmenter::BLOCK_SEPARATOR;
use yaetwai::segmentation::{ScriptClassifier, SegmentPolicy, Segmenter};

fn block(index: usize, text: &str) -> TextBlock {
    TextBlock {
        index,
        tag: "p".to_string(),
        text: text.to_string(),
    }
}

#[test]
fn test_findCut_withManyLimits_shouldStayInBounds() {
    let samples = [
        "The quick brown fox. Jumps over; the lazy dog! Again?",
        "天地玄黄，宇宙洪荒。日月盈昃，辰宿列张。寒来暑往，秋收冬藏。",
        "nobreaksatallinthistextwhatsoever",
        "mixed 中文 and English. 还有标点！",
        "a",
    ];
    for text in samples {
        let len = text.chars().count();
        for limit in 1..=len + 2 {
            let cut = find_cut(text, limit);
            assert!(cut >= 1, "cut {} for limit {} in {:?}", cut, limit, text);
            assert!(cut <= limit.min(len), "cut {} for limit {} in {:?}", cut, limit, text);
        }
    }
}

#[test]
fn test_segmentBlocks_with1200CharsAndTerminatorAt950_shouldCutAfterTerminator() {
    let mut text = "a".repeat(950);
    text.push('。');
    text.push_str(&"b".repeat(249));
    assert_eq!(text.chars().count(), 1200);

    let segmenter = Segmenter::default();
    let units = segmenter.segment_blocks("page.xhtml", &[block(0, &text)], Register::Standard);

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].length, 951);
    assert!(units[0].text.ends_with('。'));
    assert_eq!(units[1].length, 249);
    assert_eq!(units[0].source_elements, units[1].source_elements);
}

#[test]
fn test_segmentBlocks_shouldConserveEveryCharacter() {
    let blocks = vec![
        block(0, "Chapter One"),
        block(1, "It was a bright cold day in April, and the clocks were striking thirteen."),
        block(2, "短い段落。"),
        block(3, &"Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(12)),
        block(4, "End."),
    ];
    let expected: usize = blocks.iter().map(|b| b.text.trim().chars().count()).sum();

    for limit in [5, 12, 30, 80, 1000] {
        let segmenter = Segmenter::new(
            SegmentPolicy {
                archaic_limit: limit,
                default_limit: limit,
            },
            ScriptClassifier::default(),
        );
        let units = segmenter.segment_blocks("p.xhtml", &blocks, Register::Standard);

        let merged_separators: usize = units
            .iter()
            .filter(|u| u.source_elements.len() != 1)
            .map(|u| u.text.matches(BLOCK_SEPARATOR).count())
            .sum();
        let total: usize = units.iter().map(|u| u.length).sum();
        assert_eq!(total, expected + merged_separators, "limit {}", limit);

        for unit in &units {
            assert!(unit.length <= limit, "unit of {} chars over limit {}", unit.length, limit);
            assert_eq!(unit.length, unit.text.chars().count());
        }
    }
}

#[test]
fn test_segment_shouldFollowReadingOrderAndKeepPagesApart() {
    let document = Document::new(
        "book",
        vec![
            DocumentPart::new("b.xhtml", PartKind::Text, "<html><body><p>Second page.</p></body></html>"),
            DocumentPart::new("a.xhtml", PartKind::Text, "<html><body><p>First page.</p></body></html>"),
            DocumentPart::new("c.css", PartKind::Style, "p {}"),
        ],
    )
    .with_reading_order(&["a.xhtml".to_string(), "b.xhtml".to_string()]);

    let units = Segmenter::default().segment(&document);
    let texts: Vec<_> = units.iter().map(|u| (u.part_id.as_str(), u.text.as_str())).collect();
    assert_eq!(texts, vec![("a.xhtml", "First page."), ("b.xhtml", "Second page.")]);
}

#[test]
fn test_segment_withArchaicPage_shouldUseSmallerLimit() {
    let classical = "子曰學而時習之不亦說乎有朋自遠方來不亦樂乎人不知而不慍不亦君子乎。".repeat(20);
    let markup = format!("<html><body><p>{}</p></body></html>", classical);

    let segmenter = Segmenter::default();
    let units = segmenter.segment_page("analects.xhtml", &markup);

    assert!(units.len() > 1);
    assert!(units.iter().all(|u| u.register == Register::Archaic));
    assert!(units.iter().all(|u| u.length <= 300));
}

#[test]
fn test_classify_withModernText_shouldBeStandard() {
    let classifier = ScriptClassifier::default();
    assert_eq!(
        classifier.classify("这是一个关于现代城市生活的故事，主人公每天坐地铁去上班。"),
        Register::Standard
    );
    assert_eq!(
        classifier.classify("A perfectly ordinary English sentence about nothing."),
        Register::Standard
    );
    assert_eq!(classifier.classify(""), Register::Standard);
}
