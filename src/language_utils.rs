use anyhow::{anyhow, Result};
use isolang::Language;

/// Language code helpers for target-language settings and prompts.
///
/// Accepts ISO 639-1 and ISO 639-2 (T and B) codes, optionally followed by a
/// region or script subtag (`zh-TW`, `pt_BR`, `zh-Hans`).
///
/// Kind of code a target language was given as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("tib", "bod"),
    ("wel", "cym"),
];

/// Subtags that select traditional Chinese characters
const TRADITIONAL_CHINESE_SUBTAGS: &[&str] = &["tw", "hk", "mo", "hant"];

/// Subtags that select simplified Chinese characters
const SIMPLIFIED_CHINESE_SUBTAGS: &[&str] = &["cn", "sg", "hans"];

/// Split `zh-TW` / `zh_TW` into the lowercase primary code and subtag
fn split_tag(code: &str) -> (String, Option<String>) {
    let code = code.trim().to_lowercase();
    match code.split_once(['-', '_']) {
        Some((primary, subtag)) => (primary.to_string(), Some(subtag.to_string())),
        None => (code, None),
    }
}

fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminology)| *terminology)
}

fn lookup(primary: &str) -> Option<Language> {
    match primary.len() {
        2 => Language::from_639_1(primary),
        3 => Language::from_639_3(bibliographic_to_terminology(primary).unwrap_or(primary)),
        _ => None,
    }
}

/// Validate a language code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let (primary, _) = split_tag(code);

    match primary.len() {
        2 if Language::from_639_1(&primary).is_some() => Ok(LanguageCodeType::Part1),
        3 if bibliographic_to_terminology(&primary).is_some() => Ok(LanguageCodeType::Part2B),
        3 if Language::from_639_3(&primary).is_some() => Ok(LanguageCodeType::Part2T),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let (primary, _) = split_tag(code);
    lookup(&primary)
        .map(|lang| lang.to_639_3().to_string())
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 if one exists, ISO 639-2/T otherwise
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let (primary, _) = split_tag(code);
    let lang = lookup(&primary).ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang
        .to_639_1()
        .map(str::to_string)
        .unwrap_or_else(|| lang.to_639_3().to_string()))
}

/// Check if two language codes name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// English name of a language, as used in translation prompts.
///
/// Chinese subtags pick the character set: `zh-TW` is "Traditional Chinese",
/// `zh-CN` is "Simplified Chinese".
pub fn get_language_name(code: &str) -> Result<String> {
    let (primary, subtag) = split_tag(code);
    let lang = lookup(&primary).ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;

    if lang == Language::Zho {
        if let Some(subtag) = subtag.as_deref() {
            if TRADITIONAL_CHINESE_SUBTAGS.contains(&subtag) {
                return Ok("Traditional Chinese".to_string());
            }
            if SIMPLIFIED_CHINESE_SUBTAGS.contains(&subtag) {
                return Ok("Simplified Chinese".to_string());
            }
        }
    }

    Ok(lang.to_name().to_string())
}
