/*!
 * Safe cut points for long text.
 *
 * Positions are counted in characters, never bytes, so a cut can not land
 * inside a multi-byte character.
 */

/// Wide (CJK) sentence terminators; the cut goes right after the character.
pub const WIDE_TERMINATORS: &[char] = &[
    '。', '！', '？', '…', '”', '」', '』', '）', '】', '》', '；',
];

/// Latin sentence terminators; they only count when followed by a space,
/// and the cut goes after that space.
pub const LATIN_TERMINATORS: &[&str] = &[
    ". ", "! ", "? ", "... ", "\" ", ") ", "] ", "} ", "> ", "; ",
];

/// Clause punctuation and whitespace, used when no sentence ends in range.
pub const SECONDARY_BREAKS: &[char] = &[',', '，', '、', '；', '：', ';', ':', ' ', '\n'];

/// Find where to split `text` so that the head holds at most `limit` characters.
///
/// Returns the number of characters that belong to the head. For non-empty
/// text the result is always in `1..=min(limit, len)`; text that already fits
/// is returned whole.
pub fn find_cut(text: &str, limit: usize) -> usize {
    let limit = limit.max(1);
    let total = text.chars().count();
    if total <= limit {
        return total;
    }

    let window = &text[..byte_offset(text, limit)];

    let sentence_end = WIDE_TERMINATORS
        .iter()
        .filter_map(|c| window.rfind(*c).map(|pos| pos + c.len_utf8()))
        .chain(
            LATIN_TERMINATORS
                .iter()
                .filter_map(|seq| window.rfind(seq).map(|pos| pos + seq.len())),
        )
        .max();

    let cut = sentence_end.or_else(|| {
        SECONDARY_BREAKS
            .iter()
            .filter_map(|c| window.rfind(*c).map(|pos| pos + c.len_utf8()))
            .max()
    });

    match cut {
        Some(end) => window[..end].chars().count(),
        None => limit,
    }
}

/// Byte offset of the character at `char_index`, or the text length past the end.
pub fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}
