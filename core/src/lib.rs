//! librewrite-core
//!
//! Data model, configuration and character-form rules shared by the
//! post-conversion rewriters in the `librewrite` crate.
//!
//! Public API:
//! - `Candidate` / `CandidateAttributes` - One conversion choice and its flags
//! - `Segment` / `Segments` - Ranked candidates per input span, history + conversion
//! - `CharacterFormManager` - Half/full-width rules, conversion and learning
//! - `FormHistory` - Learned width preferences (in-memory or redb)
//! - `Config` - Configuration snapshot (TOML)
use serde::{Deserialize, Serialize};

pub mod candidate;
pub use candidate::{Candidate, CandidateAttributes};

pub mod segment;
pub use segment::{Segment, SegmentType, Segments};

pub mod width;
pub use width::FormType;

pub mod form_history;
pub use form_history::{FormHistory, InMemoryFormHistory, RedbFormHistory};

pub mod character_form;
pub use character_form::{CharacterForm, CharacterFormManager, FormTable, DEFAULT_RULES};

/// One character-form rule group as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CharacterFormRule {
    /// Characters sharing the preference (e.g. "(){}[]")
    pub group: String,
    /// Form used while composing
    pub preedit_character_form: CharacterForm,
    /// Form used for the finalized conversion
    pub conversion_character_form: CharacterForm,
}

/// Configuration snapshot consumed by the rewriters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Insert calculation results for arithmetic input
    pub use_calculator: bool,

    /// Character-form rule groups, in registration order
    pub character_form_rules: Vec<CharacterFormRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_calculator: true,
            character_form_rules: DEFAULT_RULES
                .iter()
                .map(|&(group, preedit, conversion)| CharacterFormRule {
                    group: group.to_string(),
                    preedit_character_form: preedit,
                    conversion_character_form: conversion,
                })
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Enable or disable the calculator.
    pub fn set_use_calculator(&mut self, enabled: bool) {
        self.use_calculator = enabled;
    }

    /// Append a rule group.
    pub fn add_character_form_rule(
        &mut self,
        group: &str,
        preedit: CharacterForm,
        conversion: CharacterForm,
    ) {
        self.character_form_rules.push(CharacterFormRule {
            group: group.to_string(),
            preedit_character_form: preedit,
            conversion_character_form: conversion,
        });
    }
}

/// Utility helpers.
pub mod utils {
    /// Compatibility-fold input (NFKC) and trim whitespace.
    ///
    /// Full-width ASCII becomes ASCII and half-width katakana becomes
    /// full-width katakana.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfkc().collect::<String>().trim().to_string()
    }

    /// Length of `s` in characters.
    pub fn chars_len(s: &str) -> usize {
        s.chars().count()
    }
}
