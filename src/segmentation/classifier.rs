/*!
 * Register classification for segment sizing.
 *
 * Classical Chinese packs far more meaning per character than modern prose,
 * so pages written in it get a much smaller unit size.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use whatlang::Lang;

/// Function characters typical of classical Chinese.
pub const CLASSICAL_MARKERS: &[char] = &[
    '之', '乎', '也', '矣', '焉', '哉', '耳', '夫', '盖', '诚', '而', '若', '其', '或', '所',
    '以', '故', '曰', '且', '者', '何', '不', '然', '已', '于', '此', '无', '有', '亦',
];

/// Marker density above which a Chinese text counts as archaic.
pub const DEFAULT_ARCHAIC_THRESHOLD: f64 = 0.1;

/// Writing register of a span of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Register {
    /// Classical/archaic register, translated in small units
    Archaic,
    /// Everything else
    Standard,
}

/// Classifies text into a [`Register`]
#[derive(Debug, Clone)]
pub struct ScriptClassifier {
    threshold: f64,
}

impl ScriptClassifier {
    /// Create a classifier with the given marker density threshold
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Classify `text`.
    ///
    /// Detection never fails outward: text that is empty, too short or
    /// otherwise undetectable is `Standard`.
    pub fn classify(&self, text: &str) -> Register {
        let Some(lang) = whatlang::detect_lang(text) else {
            debug!("Language detection gave no answer, using standard register");
            return Register::Standard;
        };

        if lang != Lang::Cmn {
            return Register::Standard;
        }

        let density = marker_density(text);
        if density > self.threshold {
            debug!("Classical marker density {:.3} > {:.3}, archaic register", density, self.threshold);
            Register::Archaic
        } else {
            Register::Standard
        }
    }

    /// The configured threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHAIC_THRESHOLD)
    }
}

/// Share of characters in `text` that are classical markers.
pub fn marker_density(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    let markers = text.chars().filter(|c| CLASSICAL_MARKERS.contains(c)).count();
    markers as f64 / total as f64
}
