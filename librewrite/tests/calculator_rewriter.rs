// librewrite/tests/calculator_rewriter.rs
//
// Integration tests for CalculatorRewriter running inside a real Converter.
//
// Tests cover:
// - Single-segment insertion of the result and the "expression + result" pair
// - No-op cases (no conversion segments, history only, calculator disabled,
//   not an expression)
// - Multi-segment merge through the converter and the nested chain pass
// - Idempotence of a second pass
// - History segments left alone
// - Capability gating for mixed suggestion requests
// - Interaction with VariantsRewriter in the stock chain

use librewrite::{
    default_converter, CalculatorRewriter, Candidate, CandidateAttributes, CharacterFormManager,
    Config, ConversionRequest, Converter, DictionarySource, RequestType, Rewriter, RewriterChain,
    Segment, SegmentType, Segments, CALCULATION_DESCRIPTION, FULL_WIDTH_DESCRIPTION,
    HALF_WIDTH_DESCRIPTION,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how often the chain reaches it; never modifies anything.
struct PassCounter {
    passes: Arc<AtomicUsize>,
}

impl Rewriter for PassCounter {
    fn rewrite(&self, _request: &ConversionRequest, _segments: &mut Segments) -> bool {
        self.passes.fetch_add(1, Ordering::SeqCst);
        false
    }

    fn name(&self) -> &'static str {
        "PassCounter"
    }
}

fn counting_converter() -> (Arc<Converter>, Arc<AtomicUsize>) {
    let passes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&passes);
    let converter = Converter::new_shared(Box::new(DictionarySource::new()), move |resizer| {
        RewriterChain::new()
            .with_rewriter(Box::new(PassCounter { passes: counter }))
            .with_rewriter(Box::new(CalculatorRewriter::new(resizer)))
    });
    (converter, passes)
}

fn request() -> ConversionRequest {
    ConversionRequest::new(Arc::new(Config::default()))
}

fn values(segment: &Segment) -> Vec<String> {
    segment.candidates().iter().map(|c| c.value.clone()).collect()
}

#[test]
fn single_segment_gets_result_and_expression() {
    let (converter, _) = counting_converter();
    let mut segments = Segments::from_conversion_segments(vec![Segment::with_candidates(
        "1+1=",
        vec![
            Candidate::new("1+1=", "1+1=", 100),
            Candidate::new("1+1=", "１＋１＝", 200),
        ],
    )]);

    assert!(converter.rewriter().rewrite(&request(), &mut segments));
    let segment = segments.conversion_segment(0).unwrap();
    assert_eq!(values(segment), vec!["2", "1+1=2", "1+1=", "１＋１＝"]);

    for inserted in &segment.candidates()[..2] {
        assert_eq!(inserted.description, CALCULATION_DESCRIPTION);
        assert_eq!(inserted.key, "1+1=");
        assert_eq!(inserted.cost, 100);
        assert!(inserted.has_attribute(CandidateAttributes::NO_LEARNING));
        assert!(inserted.has_attribute(CandidateAttributes::NO_VARIANTS_EXPANSION));
    }
}

#[test]
fn nothing_happens_without_conversion_segments() {
    let (converter, _) = counting_converter();
    let mut segments = Segments::new();
    assert!(!converter.rewriter().rewrite(&request(), &mut segments));
    assert_eq!(segments.segments_size(), 0);
}

#[test]
fn history_only_segments_count_as_no_conversion_segments() {
    let (converter, _) = counting_converter();
    let mut segments = Segments::new();
    for key in ["1+1=", "2*3="] {
        let mut history = Segment::with_candidates(key, vec![Candidate::new(key, key, 0)]);
        history.set_segment_type(SegmentType::History);
        segments.push_back_segment(history);
    }
    assert_eq!(segments.conversion_segments_size(), 0);
    let before = segments.clone();

    assert!(!converter.rewriter().rewrite(&request(), &mut segments));
    assert_eq!(segments, before);
}

#[test]
fn disabled_calculator_leaves_segments_alone() {
    let (converter, _) = counting_converter();
    let mut config = Config::default();
    config.set_use_calculator(false);
    let request = ConversionRequest::new(Arc::new(config));

    let mut segments = Segments::new();
    assert!(converter.start_conversion(&request, &mut segments, &["1+", "1="]));
    assert_eq!(segments.conversion_segments_size(), 2);
    assert_eq!(values(segments.conversion_segment(0).unwrap()), vec!["1+"]);
}

#[test]
fn non_expression_keys_are_not_merged() {
    let (converter, passes) = counting_converter();
    let mut segments = Segments::new();
    assert!(converter.start_conversion(&request(), &mut segments, &["きょ", "う="]));
    assert_eq!(segments.conversion_segments_size(), 2);
    assert_eq!(passes.load(Ordering::SeqCst), 1);
}

#[test]
fn two_segments_merge_and_rerun_the_chain_once() {
    let (converter, passes) = counting_converter();
    let mut segments = Segments::new();
    assert!(converter.start_conversion(&request(), &mut segments, &["1+", "1="]));

    // Outer pass plus exactly one nested pass triggered by the resize.
    assert_eq!(passes.load(Ordering::SeqCst), 2);
    assert_eq!(segments.resize_depth(), 0);
    assert_eq!(segments.conversion_segments_size(), 1);

    let merged = segments.conversion_segment(0).unwrap();
    assert_eq!(merged.key(), "1+1=");
    assert_eq!(merged.segment_type(), SegmentType::FixedBoundary);
    assert_eq!(values(merged), vec!["2", "1+1=2", "1+1="]);
}

#[test]
fn second_pass_is_a_no_op() {
    let (converter, _) = counting_converter();
    let mut segments = Segments::new();
    assert!(converter.start_conversion(&request(), &mut segments, &["3*", "4="]));
    let before = segments.clone();

    assert!(!converter.rewriter().rewrite(&request(), &mut segments));
    assert_eq!(segments, before);
}

#[test]
fn history_segments_are_untouched() {
    let (converter, _) = counting_converter();
    let mut segments = Segments::new();
    let mut history = Segment::with_candidates("2*3=", vec![Candidate::new("2*3=", "2*3=", 0)]);
    history.set_segment_type(SegmentType::History);
    segments.push_back_segment(history.clone());

    assert!(converter.start_conversion(&request(), &mut segments, &["2*3="]));
    assert_eq!(segments.history_segments_size(), 1);
    assert_eq!(segments.history_segments()[0], history);
    assert_eq!(
        values(segments.conversion_segment(0).unwrap()),
        vec!["6", "2*3=6", "2*3="]
    );
}

#[test]
fn suggestions_only_calculate_when_mixed() {
    let (converter, _) = counting_converter();
    let suggestion = request().with_request_type(RequestType::Suggestion);

    let mut segments = Segments::new();
    assert!(converter.start_conversion(&suggestion, &mut segments, &["5-2="]));
    assert_eq!(values(segments.conversion_segment(0).unwrap()), vec!["5-2="]);

    let mixed = suggestion.with_mixed_conversion(true);
    let mut segments = Segments::new();
    assert!(converter.start_conversion(&mixed, &mut segments, &["5-2="]));
    assert_eq!(values(segments.conversion_segment(0).unwrap())[0], "3");
}

#[test]
fn stock_chain_expands_only_the_original_candidate() {
    let manager = Arc::new(CharacterFormManager::new());
    manager.set_default_rule();
    let converter = default_converter(Box::new(DictionarySource::new()), manager);

    let mut segments = Segments::new();
    assert!(converter.start_conversion(&request(), &mut segments, &["1+", "1="]));
    let merged = segments.conversion_segment(0).unwrap();
    assert_eq!(values(merged), vec!["2", "1+1=2", "１＋１＝", "1+1="]);
    assert_eq!(merged.candidate(0).unwrap().description, CALCULATION_DESCRIPTION);
    assert_eq!(merged.candidate(2).unwrap().description, FULL_WIDTH_DESCRIPTION);
    assert_eq!(merged.candidate(3).unwrap().description, HALF_WIDTH_DESCRIPTION);
}
