//! Converter seam: segment resizing and candidate lookup.
//!
//! The lattice converter proper is an external collaborator. This module
//! defines the two capabilities the rewriters consume from it
//! (`SegmentResizer`, `CandidateSource`) and a `Converter` that implements
//! the resize protocol over any `CandidateSource`: it recomputes the
//! boundaries, regenerates candidates for the changed span and re-runs its
//! rewriter chain on the new layout before returning.

use crate::request::ConversionRequest;
use crate::rewriter::{Rewriter, RewriterChain};
use librewrite_core::{Candidate, Segment, SegmentType, Segments};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Deepest allowed nesting of resize-triggered rewrite passes.
pub const MAX_RESIZE_DEPTH: usize = 2;

/// Re-derives conversion segment boundaries and re-runs the rewriters.
pub trait SegmentResizer: Send + Sync {
    /// Grow (positive `offset_length`) or shrink the conversion segment at
    /// `segment_index` by a number of characters.
    ///
    /// On failure returns false and leaves `segments` unchanged.
    fn resize_segment(
        &self,
        segments: &mut Segments,
        request: &ConversionRequest,
        segment_index: usize,
        offset_length: i32,
    ) -> bool;
}

/// Produces ranked candidates for a reading.
pub trait CandidateSource: Send + Sync {
    fn lookup(&self, key: &str) -> Vec<Candidate>;
}

/// In-memory reading -> candidates table.
///
/// Unknown readings yield a single as-is candidate so every span stays
/// convertible.
#[derive(Debug, Clone, Default)]
pub struct DictionarySource {
    entries: HashMap<String, Vec<Candidate>>,
}

impl DictionarySource {
    /// Cost given to as-is candidates for unknown readings.
    pub const UNKNOWN_COST: i32 = 10_000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` for `key`; candidates are kept sorted by cost.
    pub fn insert(&mut self, key: &str, value: &str, cost: i32) {
        let list = self.entries.entry(key.to_string()).or_default();
        list.push(Candidate::new(key, value, cost));
        list.sort_by_key(|c| c.cost);
    }
}

impl CandidateSource for DictionarySource {
    fn lookup(&self, key: &str) -> Vec<Candidate> {
        if key.is_empty() {
            return Vec::new();
        }
        match self.entries.get(key) {
            Some(list) => list.clone(),
            None => vec![Candidate::new(key, key, Self::UNKNOWN_COST)],
        }
    }
}

/// Builds segments from a `CandidateSource` and owns the rewriter chain.
pub struct Converter {
    source: Box<dyn CandidateSource>,
    rewriter: RewriterChain,
}

impl Converter {
    pub fn new(source: Box<dyn CandidateSource>, rewriter: RewriterChain) -> Self {
        Self { source, rewriter }
    }

    /// Build a shared converter whose chain may hold a handle back to it.
    ///
    /// `build_chain` receives the resizer handle rewriters such as
    /// `CalculatorRewriter` need.
    pub fn new_shared<F>(source: Box<dyn CandidateSource>, build_chain: F) -> Arc<Self>
    where
        F: FnOnce(Weak<dyn SegmentResizer>) -> RewriterChain,
    {
        Arc::new_cyclic(|weak: &Weak<Converter>| {
            let resizer: Weak<dyn SegmentResizer> = weak.clone();
            Converter::new(source, build_chain(resizer))
        })
    }

    pub fn rewriter(&self) -> &RewriterChain {
        &self.rewriter
    }

    fn make_segment(&self, key: &str, segment_type: SegmentType) -> Option<Segment> {
        let candidates = self.source.lookup(key);
        if candidates.is_empty() {
            return None;
        }
        let mut segment = Segment::with_candidates(key, candidates);
        segment.set_segment_type(segment_type);
        Some(segment)
    }

    /// Replace the conversion segments with one segment per key and run
    /// the rewriter chain. Returns false if a key yields no candidates.
    pub fn start_conversion(
        &self,
        request: &ConversionRequest,
        segments: &mut Segments,
        keys: &[&str],
    ) -> bool {
        let mut built = Vec::with_capacity(keys.len());
        for key in keys {
            match self.make_segment(key, SegmentType::Free) {
                Some(segment) => built.push(segment),
                None => {
                    tracing::warn!("no candidates for {:?}", key);
                    return false;
                }
            }
        }
        if built.is_empty() {
            return false;
        }
        segments.clear_conversion_segments();
        for segment in built {
            segments.push_back_segment(segment);
        }
        self.rewriter.rewrite(request, segments);
        true
    }
}

impl SegmentResizer for Converter {
    fn resize_segment(
        &self,
        segments: &mut Segments,
        request: &ConversionRequest,
        segment_index: usize,
        offset_length: i32,
    ) -> bool {
        if segments.resize_depth() >= MAX_RESIZE_DEPTH {
            tracing::error!(
                "resize nested {} levels deep; refusing to recurse further",
                segments.resize_depth()
            );
            return false;
        }
        if offset_length == 0 {
            return false;
        }

        let conversion = segments.conversion_segments();
        let Some(target) = conversion.get(segment_index) else {
            tracing::warn!("resize target {} out of range", segment_index);
            return false;
        };
        let new_len = target.key_len() as i64 + i64::from(offset_length);
        if new_len <= 0 {
            return false;
        }
        let new_len = new_len as usize;

        // Smallest run of segments covering the new boundary.
        let mut covered = 0;
        let mut end = segment_index;
        while end < conversion.len() && covered < new_len {
            covered += conversion[end].key_len();
            end += 1;
        }
        if covered < new_len {
            tracing::warn!("resize offset {} exceeds the remaining key", offset_length);
            return false;
        }

        let span: String = conversion[segment_index..end]
            .iter()
            .map(|s| s.key())
            .collect();
        let new_key: String = span.chars().take(new_len).collect();
        let remainder: String = span.chars().skip(new_len).collect();

        let Some(resized) = self.make_segment(&new_key, SegmentType::FixedBoundary) else {
            return false;
        };
        let mut replacement = vec![resized];
        if !remainder.is_empty() {
            let Some(rest) = self.make_segment(&remainder, SegmentType::Free) else {
                return false;
            };
            replacement.push(rest);
        }
        if !segments.replace_conversion_segments(segment_index, end - segment_index, replacement) {
            return false;
        }

        segments.enter_resize();
        self.rewriter.rewrite(request, segments);
        segments.leave_resize();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librewrite_core::Config;

    fn converter() -> Converter {
        let mut dict = DictionarySource::new();
        dict.insert("きょう", "今日", 100);
        dict.insert("きょう", "京", 300);
        Converter::new(Box::new(dict), RewriterChain::new())
    }

    fn keys(segments: &Segments) -> Vec<String> {
        segments
            .conversion_segments()
            .iter()
            .map(|s| s.key().to_string())
            .collect()
    }

    #[test]
    fn dictionary_orders_by_cost_and_falls_back() {
        let mut dict = DictionarySource::new();
        dict.insert("a", "x", 20);
        dict.insert("a", "y", 10);
        let values: Vec<_> = dict.lookup("a").into_iter().map(|c| c.value).collect();
        assert_eq!(values, vec!["y", "x"]);
        let unknown = dict.lookup("zz");
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].cost, DictionarySource::UNKNOWN_COST);
        assert!(dict.lookup("").is_empty());
    }

    #[test]
    fn grow_consumes_following_segments() {
        let conv = converter();
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::new();
        assert!(conv.start_conversion(&request, &mut segments, &["きょ", "うは", "いい"]));

        assert!(conv.resize_segment(&mut segments, &request, 0, 1));
        assert_eq!(keys(&segments), vec!["きょう", "は", "いい"]);
        let first = segments.conversion_segment(0).unwrap();
        assert_eq!(first.segment_type(), SegmentType::FixedBoundary);
        assert_eq!(first.candidate(0).unwrap().value, "今日");
        assert_eq!(segments.resize_depth(), 0);
    }

    #[test]
    fn shrink_splits_off_remainder() {
        let conv = converter();
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::new();
        assert!(conv.start_conversion(&request, &mut segments, &["きょうは"]));
        assert!(conv.resize_segment(&mut segments, &request, 0, -1));
        assert_eq!(keys(&segments), vec!["きょう", "は"]);
    }

    #[test]
    fn invalid_resizes_leave_segments_unchanged() {
        let conv = converter();
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::new();
        assert!(conv.start_conversion(&request, &mut segments, &["1+", "1="]));
        let before = segments.clone();

        assert!(!conv.resize_segment(&mut segments, &request, 0, 0));
        assert!(!conv.resize_segment(&mut segments, &request, 0, 3));
        assert!(!conv.resize_segment(&mut segments, &request, 0, -2));
        assert!(!conv.resize_segment(&mut segments, &request, 5, 1));
        assert_eq!(segments, before);
    }

    #[test]
    fn depth_guard_rejects_deep_nesting() {
        let conv = converter();
        let request = ConversionRequest::new(Arc::new(Config::default()));
        let mut segments = Segments::new();
        assert!(conv.start_conversion(&request, &mut segments, &["1+", "1="]));
        segments.enter_resize();
        segments.enter_resize();
        assert!(!conv.resize_segment(&mut segments, &request, 0, 2));
        assert_eq!(segments.conversion_segments_size(), 2);
    }
}
