//! Inserts calculation results for arithmetic conversion keys.
//!
//! With a single conversion segment the key is evaluated and the result is
//! spliced into the candidate list. With several segments the concatenated
//! key is evaluated first; on success the segments are merged through the
//! converter, whose resize re-runs the rewriter chain on the merged segment
//! and lands back in the single-segment case.

use crate::calculator::{ArithmeticCalculator, Calculator};
use crate::converter::SegmentResizer;
use crate::request::ConversionRequest;
use crate::rewriter::{Capability, Rewriter};
use librewrite_core::width::fullwidth_ascii_to_halfwidth;
use librewrite_core::{utils, Candidate, CandidateAttributes, Segment, Segments};
use std::sync::{Arc, Weak};

/// Description attached to inserted results.
pub const CALCULATION_DESCRIPTION: &str = "計算結果";

pub struct CalculatorRewriter {
    resizer: Weak<dyn SegmentResizer>,
    calculator: Arc<dyn Calculator>,
}

impl CalculatorRewriter {
    /// Rewriter merging segments through `resizer` and evaluating with the
    /// built-in arithmetic calculator.
    pub fn new(resizer: Weak<dyn SegmentResizer>) -> Self {
        Self::with_calculator(resizer, Arc::new(ArithmeticCalculator::new()))
    }

    pub fn with_calculator(
        resizer: Weak<dyn SegmentResizer>,
        calculator: Arc<dyn Calculator>,
    ) -> Self {
        Self {
            resizer,
            calculator,
        }
    }

    /// Insert `value` and `value` combined with the expression at
    /// `insert_pos` (clamped to the list length) and the slot after it.
    ///
    /// Fails without touching `segment` when it has no candidates.
    pub fn insert_candidate(&self, value: &str, insert_pos: usize, segment: &mut Segment) -> bool {
        let Some(base) = segment.candidate(0).cloned() else {
            tracing::warn!("cannot insert calculation result: segment has no candidates");
            return false;
        };

        let source = if base.content_key.is_empty() {
            segment.key()
        } else {
            base.content_key.as_str()
        };
        let expression = fullwidth_ascii_to_halfwidth(source)
            .replace('・', "/")
            .replace('ー', "-");
        let with_expression = if expression.starts_with('=') {
            format!("{}{}", value, expression)
        } else {
            format!("{}{}", expression, value)
        };

        let offset = insert_pos.min(segment.candidates_size());
        for (n, text) in [value.to_string(), with_expression].into_iter().enumerate() {
            let current = offset + n;
            let size = segment.candidates_size();
            // The candidate that will sit right below (or, at the end, above) the new one.
            let reference_index = if current < size { current } else { current - 1 };
            let Some(reference) = segment.candidate(reference_index) else {
                tracing::error!("no reference candidate at {}", reference_index);
                Self::rollback(segment, offset, n);
                return false;
            };

            let mut candidate = Candidate {
                key: base.key.clone(),
                content_key: base.content_key.clone(),
                lid: reference.lid,
                rid: reference.rid,
                cost: reference.cost,
                description: CALCULATION_DESCRIPTION.to_string(),
                attributes: CandidateAttributes::NO_VARIANTS_EXPANSION
                    | CandidateAttributes::NO_LEARNING,
                ..Default::default()
            };
            candidate.set_value(text);

            if segment.insert_candidate(current, candidate).is_none() {
                tracing::error!("cannot insert candidate at {}", current);
                Self::rollback(segment, offset, n);
                return false;
            }
        }
        true
    }

    fn rollback(segment: &mut Segment, offset: usize, inserted: usize) {
        for _ in 0..inserted {
            segment.erase_candidate(offset);
        }
    }

    fn already_inserted(segment: &Segment, result: &str) -> bool {
        segment
            .candidates()
            .iter()
            .any(|c| c.value == result && c.description == CALCULATION_DESCRIPTION)
    }
}

impl Rewriter for CalculatorRewriter {
    fn capability(&self, request: &ConversionRequest) -> Capability {
        if request.mixed_conversion() {
            Capability::All
        } else {
            Capability::Conversion
        }
    }

    fn rewrite(&self, request: &ConversionRequest, segments: &mut Segments) -> bool {
        if !request.config().use_calculator {
            return false;
        }

        let segments_size = segments.conversion_segments_size();
        if segments_size == 0 {
            return false;
        }

        if segments_size == 1 {
            let Some(segment) = segments.mutable_conversion_segment(0) else {
                return false;
            };
            if segment.key().is_empty() {
                return false;
            }
            let Some(result) = self.calculator.calculate(segment.key()) else {
                return false;
            };
            if Self::already_inserted(segment, &result) {
                return false;
            }
            return self.insert_candidate(&result, 0, segment);
        }

        let merged_key = segments.conversion_key();
        if self.calculator.calculate(&merged_key).is_none() {
            return false;
        }
        let first_len = segments
            .conversion_segment(0)
            .map(|s| s.key_len())
            .unwrap_or(0);
        let offset = (utils::chars_len(&merged_key) - first_len) as i32;

        let Some(resizer) = self.resizer.upgrade() else {
            tracing::error!("converter dropped; cannot merge conversion segments");
            return false;
        };
        // The resize re-runs the chain, so this rewriter sees the merged segment.
        if !resizer.resize_segment(segments, request, 0, offset) {
            tracing::error!("failed to merge conversion segments");
            return false;
        }
        true
    }

    fn name(&self) -> &'static str {
        "CalculatorRewriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librewrite_core::Config;

    struct NoResize;

    impl SegmentResizer for NoResize {
        fn resize_segment(&self, _: &mut Segments, _: &ConversionRequest, _: usize, _: i32) -> bool {
            false
        }
    }

    fn rewriter(resizer: &Arc<NoResize>) -> CalculatorRewriter {
        let resizer: Arc<dyn SegmentResizer> = resizer.clone();
        CalculatorRewriter::new(Arc::downgrade(&resizer))
    }

    fn segment(key: &str, values: &[(&str, i32, u16)]) -> Segment {
        Segment::with_candidates(
            key,
            values
                .iter()
                .map(|&(v, cost, id)| {
                    let mut c = Candidate::new(key, v, cost);
                    c.lid = id;
                    c.rid = id;
                    c
                })
                .collect(),
        )
    }

    #[test]
    fn insert_copies_neighbor_and_top_fields() {
        let resizer = Arc::new(NoResize);
        let rw = rewriter(&resizer);
        let mut seg = segment("１＋１＝", &[("１＋１＝", 100, 7), ("1+1=", 200, 8)]);

        assert!(rw.insert_candidate("2", 1, &mut seg));
        assert_eq!(seg.candidates_size(), 4);

        let result = seg.candidate(1).unwrap();
        assert_eq!(result.value, "2");
        assert_eq!(result.content_value, "2");
        assert_eq!(result.key, "１＋１＝");
        assert_eq!((result.lid, result.cost), (8, 200));
        assert_eq!(result.description, CALCULATION_DESCRIPTION);

        let combined = seg.candidate(2).unwrap();
        assert_eq!(combined.value, "1+1=2");
        assert_eq!((combined.lid, combined.cost), (8, 200));
        assert!(combined.has_attribute(
            CandidateAttributes::NO_LEARNING | CandidateAttributes::NO_VARIANTS_EXPANSION
        ));
        assert_eq!(seg.candidate(3).unwrap().value, "1+1=");
    }

    #[test]
    fn insert_at_end_uses_previous_neighbor() {
        let resizer = Arc::new(NoResize);
        let rw = rewriter(&resizer);
        let mut seg = segment("=8・2", &[("=8・2", 50, 3)]);

        assert!(rw.insert_candidate("4", 10, &mut seg));
        assert_eq!(seg.candidates_size(), 3);
        assert_eq!(seg.candidate(1).unwrap().value, "4");
        assert_eq!(seg.candidate(1).unwrap().cost, 50);
        // Leading "=" puts the result in front of the expression.
        assert_eq!(seg.candidate(2).unwrap().value, "4=8/2");
    }

    #[test]
    fn insert_normalizes_long_vowel_mark() {
        let resizer = Arc::new(NoResize);
        let rw = rewriter(&resizer);
        let mut seg = segment("5ー3=", &[("5ー3=", 0, 1)]);
        assert!(rw.insert_candidate("2", 0, &mut seg));
        assert_eq!(seg.candidate(1).unwrap().value, "5-3=2");
    }

    #[test]
    fn insert_into_empty_segment_fails() {
        let resizer = Arc::new(NoResize);
        let rw = rewriter(&resizer);
        let mut seg = Segment::new("1+1=");
        assert!(!rw.insert_candidate("2", 0, &mut seg));
        assert_eq!(seg.candidates_size(), 0);
    }

    #[test]
    fn failed_merge_leaves_segments_unchanged() {
        let resizer = Arc::new(NoResize);
        let rw = rewriter(&resizer);
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::from_conversion_segments(vec![
            segment("1+", &[("1+", 0, 1)]),
            segment("1=", &[("1=", 0, 1)]),
        ]);
        let before = segments.clone();
        assert!(!rw.rewrite(&request, &mut segments));
        assert_eq!(segments, before);
    }

    #[test]
    fn dropped_converter_is_a_failure() {
        let rw = {
            let resizer = Arc::new(NoResize);
            rewriter(&resizer)
        };
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::from_conversion_segments(vec![
            segment("2*", &[("2*", 0, 1)]),
            segment("3=", &[("3=", 0, 1)]),
        ]);
        assert!(!rw.rewrite(&request, &mut segments));
    }
}
