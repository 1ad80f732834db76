//! Candidate types for post-conversion rewriting.
//!
//! This module provides:
//! - `Candidate`: one conversion choice for a segment, with the scoring
//!   metadata rewriters copy between neighbors
//! - `CandidateAttributes`: bit flags steering downstream rewriters

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Markers on a candidate controlling downstream behavior.
    ///
    /// A flag set by one rewriter stays set; later rewriters only clear
    /// flags whose semantics they own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CandidateAttributes: u32 {
        /// Never produce half-width / full-width variants of this candidate.
        const NO_VARIANTS_EXPANSION = 1 << 0;
        /// Never feed this candidate back into adaptive learning.
        const NO_LEARNING = 1 << 1;
    }
}

/// A single conversion choice.
///
/// Costs are on the converter's scale; lower is better. `lid`/`rid` are the
/// left/right connection ids the scoring model uses to join neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Reading consumed by this candidate
    pub key: String,
    /// Reading without functional suffixes
    pub content_key: String,
    /// Surface text shown to the user
    pub value: String,
    /// Surface text without functional suffixes
    pub content_value: String,
    pub cost: i32,
    pub lid: u16,
    pub rid: u16,
    /// Human-readable annotation shown next to the value
    pub description: String,
    pub attributes: CandidateAttributes,
}

impl Candidate {
    /// Build a candidate whose content fields mirror its key/value.
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V, cost: i32) -> Self {
        let key = key.into();
        let value = value.into();
        Candidate {
            content_key: key.clone(),
            content_value: value.clone(),
            key,
            value,
            cost,
            ..Default::default()
        }
    }

    /// Set `value` and `content_value` together.
    pub fn set_value<V: Into<String>>(&mut self, value: V) {
        let value = value.into();
        self.content_value = value.clone();
        self.value = value;
    }

    pub fn has_attribute(&self, attr: CandidateAttributes) -> bool {
        self.attributes.contains(attr)
    }

    /// Add flags without touching the ones already set.
    pub fn add_attributes(&mut self, attr: CandidateAttributes) {
        self.attributes.insert(attr);
    }

    /// Append an annotation, separated by a space from any existing one.
    pub fn push_description(&mut self, text: &str) {
        if text.is_empty() || self.description.split(' ').any(|d| d == text) {
            return;
        }
        if !self.description.is_empty() {
            self.description.push(' ');
        }
        self.description.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mirrors_content_fields() {
        let c = Candidate::new("きょう", "今日", 300);
        assert_eq!(c.content_key, "きょう");
        assert_eq!(c.content_value, "今日");
        assert_eq!(c.cost, 300);
        assert!(c.attributes.is_empty());
    }

    #[test]
    fn attributes_accumulate() {
        let mut c = Candidate::new("a", "a", 0);
        c.add_attributes(CandidateAttributes::NO_LEARNING);
        c.add_attributes(CandidateAttributes::NO_VARIANTS_EXPANSION);
        assert!(c.has_attribute(CandidateAttributes::NO_LEARNING));
        assert!(c.has_attribute(
            CandidateAttributes::NO_LEARNING | CandidateAttributes::NO_VARIANTS_EXPANSION
        ));
        c.attributes.remove(CandidateAttributes::NO_LEARNING);
        assert!(!c.has_attribute(CandidateAttributes::NO_LEARNING));
        assert!(c.has_attribute(CandidateAttributes::NO_VARIANTS_EXPANSION));
    }

    #[test]
    fn descriptions_are_deduplicated() {
        let mut c = Candidate::new("a", "ａ", 0);
        c.push_description("[全]");
        c.push_description("[全]");
        c.push_description("アルファベット");
        assert_eq!(c.description, "[全] アルファベット");
    }
}
