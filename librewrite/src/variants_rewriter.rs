//! Width variants of conversion candidates.
//!
//! Every candidate is rendered through the conversion rule table of the
//! `CharacterFormManager`. When a `LastForm` group makes the other width a
//! reasonable choice too, that rendering is inserted right below the
//! candidate, and both get a `[全]` / `[半]` annotation.

use crate::request::ConversionRequest;
use crate::rewriter::{Capability, Rewriter};
use librewrite_core::{
    Candidate, CandidateAttributes, CharacterFormManager, FormType, Segment, Segments,
};
use std::sync::Arc;

pub const FULL_WIDTH_DESCRIPTION: &str = "[全]";
pub const HALF_WIDTH_DESCRIPTION: &str = "[半]";

fn width_description(form: FormType) -> &'static str {
    match form {
        FormType::FullWidth => FULL_WIDTH_DESCRIPTION,
        FormType::HalfWidth => HALF_WIDTH_DESCRIPTION,
        FormType::Unknown => "",
    }
}

pub struct VariantsRewriter {
    manager: Arc<CharacterFormManager>,
}

impl VariantsRewriter {
    pub fn new(manager: Arc<CharacterFormManager>) -> Self {
        Self { manager }
    }

    /// Expand the candidate at `index`; returns how many candidates now
    /// occupy its place (1 or 2), or `None` if nothing changed.
    fn expand(&self, segment: &mut Segment, index: usize) -> Option<usize> {
        let original = segment.candidate(index)?;
        if original.has_attribute(CandidateAttributes::NO_VARIANTS_EXPANSION) {
            return None;
        }

        let (value, alt_value) = self
            .manager
            .convert_conversion_string_with_alternative(&original.value);
        let (content_value, alt_content) = self
            .manager
            .convert_conversion_string_with_alternative(&original.content_value);
        if value == original.value && content_value == original.content_value && alt_value.is_none() {
            return None;
        }

        let alternative = alt_value
            .filter(|alt| {
                !segment
                    .candidates()
                    .iter()
                    .enumerate()
                    .any(|(i, c)| i != index && c.value == *alt)
            })
            .map(|alt| {
                let mut c: Candidate = original.clone();
                c.value = alt;
                c.content_value = alt_content.unwrap_or_else(|| content_value.clone());
                c
            });

        let mut primary = original.clone();
        primary.value = value;
        primary.content_value = content_value;
        primary.add_attributes(CandidateAttributes::NO_VARIANTS_EXPANSION);

        let mut alternative = alternative;
        if let Some(alt) = alternative.as_mut() {
            alt.add_attributes(CandidateAttributes::NO_VARIANTS_EXPANSION);
            if let Some((form1, form2)) =
                CharacterFormManager::get_form_types_from_string_pair(&primary.value, &alt.value)
            {
                primary.push_description(width_description(form1));
                alt.push_description(width_description(form2));
            }
        }

        *segment.mutable_candidate(index)? = primary;
        match alternative {
            Some(alt) => {
                segment.insert_candidate(index + 1, alt)?;
                Some(2)
            }
            None => Some(1),
        }
    }
}

impl Rewriter for VariantsRewriter {
    fn capability(&self, _request: &ConversionRequest) -> Capability {
        Capability::All
    }

    fn rewrite(&self, _request: &ConversionRequest, segments: &mut Segments) -> bool {
        let mut modified = false;
        for segment in segments.mutable_conversion_segments() {
            let mut index = 0;
            while index < segment.candidates_size() {
                match self.expand(segment, index) {
                    Some(step) => {
                        modified = true;
                        index += step;
                    }
                    None => index += 1,
                }
            }
        }
        modified
    }

    fn name(&self) -> &'static str {
        "VariantsRewriter"
    }
}
