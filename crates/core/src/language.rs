//! Language definitions
//!
//! Covers English plus the South Asian languages users of the form agent
//! are expected to answer in.

use serde::{Deserialize, Serialize};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Nepali,
    Hindi,
    Marathi,
    Maithili,
    Bengali,
}

impl Language {
    /// Get ISO 639-1/639-3 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Nepali => "ne",
            Self::Hindi => "hi",
            Self::Marathi => "mr",
            Self::Maithili => "mai",
            Self::Bengali => "bn",
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Nepali => "Nepali",
            Self::Hindi => "Hindi",
            Self::Marathi => "Marathi",
            Self::Maithili => "Maithili",
            Self::Bengali => "Bengali",
        }
    }

    /// Get the primary script
    pub fn script(&self) -> Script {
        match self {
            Self::Nepali | Self::Hindi | Self::Marathi | Self::Maithili => Script::Devanagari,
            Self::Bengali => Script::Bengali,
            Self::English => Script::Latin,
        }
    }

    pub fn is_english(&self) -> bool {
        matches!(self, Self::English)
    }

    /// Parse from a code or name (case-insensitive)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "ne" | "nep" | "nepali" => Some(Self::Nepali),
            "hi" | "hin" | "hindi" => Some(Self::Hindi),
            "mr" | "mar" | "marathi" => Some(Self::Marathi),
            "mai" | "maithili" => Some(Self::Maithili),
            "bn" | "ben" | "bengali" | "bangla" => Some(Self::Bengali),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Writing systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Devanagari,
    Bengali,
}

impl Script {
    /// Get Unicode range for this script (first block only)
    pub fn unicode_range(&self) -> (u32, u32) {
        match self {
            Self::Latin => (0x0000, 0x007F),
            Self::Devanagari => (0x0900, 0x097F),
            Self::Bengali => (0x0980, 0x09FF),
        }
    }

    /// Check if a character belongs to this script
    pub fn contains_char(&self, c: char) -> bool {
        let code = c as u32;
        let (start, end) = self.unicode_range();
        code >= start && code <= end
    }

    /// True as soon as any character of `text` falls in this script's block
    pub fn appears_in(&self, text: &str) -> bool {
        text.chars().any(|c| self.contains_char(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code() {
        assert_eq!(Language::Nepali.code(), "ne");
        assert_eq!(Language::English.code(), "en");
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(Language::from_str_loose(" NE "), Some(Language::Nepali));
        assert_eq!(Language::from_str_loose("nepali"), Some(Language::Nepali));
        assert_eq!(Language::from_str_loose("english"), Some(Language::English));
        assert_eq!(Language::from_str_loose("klingon"), None);
    }

    #[test]
    fn test_script() {
        assert_eq!(Language::Nepali.script(), Script::Devanagari);
        assert_eq!(Language::English.script(), Script::Latin);
    }

    #[test]
    fn test_devanagari_detection() {
        assert!(Script::Devanagari.appears_in("ट्र्याक्टर"));
        assert!(Script::Devanagari.appears_in("my tool is ट्र्याक्टर"));
        assert!(!Script::Devanagari.appears_in("Tractor"));
        assert!(!Script::Devanagari.appears_in(""));
    }

    #[test]
    fn test_serde_lowercase() {
        let lang: Language = serde_json::from_str("\"nepali\"").unwrap();
        assert_eq!(lang, Language::Nepali);
    }
}
