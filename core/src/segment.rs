//! Segments and their ranked candidate lists.
//!
//! A `Segments` value is the lattice the rewriters mutate: a history prefix
//! (already committed text kept for context) followed by the conversion
//! segments the user is still editing. Rewriters only ever address the
//! conversion suffix, through zero-based conversion indices.

use crate::candidate::Candidate;
use serde::{Deserialize, Serialize};

/// How a segment's boundary and value were decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentType {
    /// Boundary chosen by the converter
    #[default]
    Free,
    /// Boundary fixed by a resize; candidates may still change
    FixedBoundary,
    /// Committed earlier in the session
    Submitted,
    /// Context carried over from previous conversions
    History,
}

impl SegmentType {
    fn is_history(self) -> bool {
        matches!(self, SegmentType::History | SegmentType::Submitted)
    }
}

/// One input span and its candidates, index 0 being the top-ranked one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    key: String,
    segment_type: SegmentType,
    candidates: Vec<Candidate>,
}

impl Segment {
    /// Create an empty free segment for `key`.
    pub fn new<K: Into<String>>(key: K) -> Self {
        Self {
            key: key.into(),
            segment_type: SegmentType::Free,
            candidates: Vec::new(),
        }
    }

    /// Create a segment with the given candidates.
    pub fn with_candidates<K: Into<String>>(key: K, candidates: Vec<Candidate>) -> Self {
        Self {
            key: key.into(),
            segment_type: SegmentType::Free,
            candidates,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Length of the key in characters.
    pub fn key_len(&self) -> usize {
        self.key.chars().count()
    }

    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    pub fn set_segment_type(&mut self, segment_type: SegmentType) {
        self.segment_type = segment_type;
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidates_size(&self) -> usize {
        self.candidates.len()
    }

    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn mutable_candidate(&mut self, index: usize) -> Option<&mut Candidate> {
        self.candidates.get_mut(index)
    }

    /// Insert at `index`, shifting later candidates down.
    ///
    /// Returns `None` when `index` is past the end of the list.
    pub fn insert_candidate(&mut self, index: usize, candidate: Candidate) -> Option<&mut Candidate> {
        if index > self.candidates.len() {
            return None;
        }
        self.candidates.insert(index, candidate);
        self.candidates.get_mut(index)
    }

    /// Remove and return the candidate at `index`.
    pub fn erase_candidate(&mut self, index: usize) -> Option<Candidate> {
        if index < self.candidates.len() {
            Some(self.candidates.remove(index))
        } else {
            None
        }
    }
}

/// Ordered segments: history prefix, then conversion suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    segments: Vec<Segment>,
    /// Nesting level of rewrite passes triggered by segment resizes
    resize_depth: usize,
}

impl Segments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a `Segments` holding only conversion segments.
    pub fn from_conversion_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            resize_depth: 0,
        }
    }

    pub fn segments_size(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Append a segment; history segments must be pushed before conversion ones.
    pub fn push_back_segment(&mut self, segment: Segment) -> &mut Segment {
        let index = self.segments.len();
        self.segments.push(segment);
        &mut self.segments[index]
    }

    /// Number of leading history/submitted segments.
    pub fn history_segments_size(&self) -> usize {
        self.segments
            .iter()
            .take_while(|s| s.segment_type().is_history())
            .count()
    }

    pub fn history_segments(&self) -> &[Segment] {
        &self.segments[..self.history_segments_size()]
    }

    pub fn conversion_segments_size(&self) -> usize {
        self.segments.len() - self.history_segments_size()
    }

    pub fn conversion_segments(&self) -> &[Segment] {
        &self.segments[self.history_segments_size()..]
    }

    pub fn mutable_conversion_segments(&mut self) -> &mut [Segment] {
        let start = self.history_segments_size();
        &mut self.segments[start..]
    }

    pub fn conversion_segment(&self, index: usize) -> Option<&Segment> {
        self.conversion_segments().get(index)
    }

    pub fn mutable_conversion_segment(&mut self, index: usize) -> Option<&mut Segment> {
        self.mutable_conversion_segments().get_mut(index)
    }

    /// Concatenated keys of all conversion segments.
    pub fn conversion_key(&self) -> String {
        self.conversion_segments()
            .iter()
            .map(|s| s.key())
            .collect::<String>()
    }

    /// Replace `count` conversion segments starting at `start` with
    /// `replacement`.
    ///
    /// The history prefix is never touched; returns false (and changes
    /// nothing) if the range falls outside the conversion suffix.
    pub fn replace_conversion_segments(
        &mut self,
        start: usize,
        count: usize,
        replacement: Vec<Segment>,
    ) -> bool {
        let base = self.history_segments_size();
        let conversion_len = self.segments.len() - base;
        if start > conversion_len || count > conversion_len - start {
            return false;
        }
        if replacement.iter().any(|s| s.segment_type().is_history()) {
            return false;
        }
        let from = base + start;
        self.segments.splice(from..from + count, replacement);
        true
    }

    /// Drop every conversion segment, keeping history.
    pub fn clear_conversion_segments(&mut self) {
        let base = self.history_segments_size();
        self.segments.truncate(base);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.resize_depth = 0;
    }

    pub fn resize_depth(&self) -> usize {
        self.resize_depth
    }

    /// Mark the start of a rewrite pass triggered by a resize.
    pub fn enter_resize(&mut self) -> usize {
        self.resize_depth += 1;
        self.resize_depth
    }

    /// Mark the end of a resize-triggered rewrite pass.
    pub fn leave_resize(&mut self) {
        self.resize_depth = self.resize_depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(key: &str) -> Segment {
        let mut s = Segment::with_candidates(key, vec![Candidate::new(key, key, 0)]);
        s.set_segment_type(SegmentType::History);
        s
    }

    #[test]
    fn insert_shifts_following_candidates() {
        let mut seg = Segment::with_candidates(
            "a",
            vec![Candidate::new("a", "A", 10), Candidate::new("a", "B", 20)],
        );
        assert!(seg.insert_candidate(1, Candidate::new("a", "X", 15)).is_some());
        let values: Vec<_> = seg.candidates().iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["A", "X", "B"]);
        assert!(seg.insert_candidate(3, Candidate::new("a", "Z", 0)).is_some());
        assert!(seg.insert_candidate(9, Candidate::new("a", "Q", 0)).is_none());
        assert_eq!(seg.candidates_size(), 4);
    }

    #[test]
    fn conversion_indices_skip_history() {
        let mut segments = Segments::new();
        segments.push_back_segment(history("きのう"));
        segments.push_back_segment(Segment::new("1+"));
        segments.push_back_segment(Segment::new("1="));
        assert_eq!(segments.history_segments_size(), 1);
        assert_eq!(segments.conversion_segments_size(), 2);
        assert_eq!(segments.conversion_segment(0).map(|s| s.key()), Some("1+"));
        assert_eq!(segments.conversion_key(), "1+1=");
    }

    #[test]
    fn replace_never_touches_history() {
        let mut segments = Segments::new();
        segments.push_back_segment(history("きのう"));
        segments.push_back_segment(Segment::new("1+"));
        segments.push_back_segment(Segment::new("1="));

        assert!(segments.replace_conversion_segments(0, 2, vec![Segment::new("1+1=")]));
        assert_eq!(segments.segments_size(), 2);
        assert_eq!(segments.history_segments()[0].key(), "きのう");
        assert_eq!(segments.conversion_key(), "1+1=");

        assert!(!segments.replace_conversion_segments(0, 2, vec![]));
        assert!(!segments.replace_conversion_segments(0, 1, vec![history("x")]));
        assert_eq!(segments.segments_size(), 2);
    }

    #[test]
    fn resize_depth_is_balanced() {
        let mut segments = Segments::new();
        assert_eq!(segments.enter_resize(), 1);
        assert_eq!(segments.enter_resize(), 2);
        segments.leave_resize();
        segments.leave_resize();
        segments.leave_resize();
        assert_eq!(segments.resize_depth(), 0);
    }
}
