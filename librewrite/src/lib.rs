//! librewrite crate root
//!
//! This crate provides the post-conversion rewriter chain that runs over the
//! `Segments` produced by a converter, plus the converter seam it needs for
//! segment resizing.
//!
//! Public API exported here:
//! - `Rewriter` and `RewriterChain` from `rewriter`
//! - `CalculatorRewriter` from `calculator_rewriter`
//! - `VariantsRewriter` from `variants_rewriter`
//! - `Converter`, `SegmentResizer`, `CandidateSource` from `converter`
//! - `SessionObserverHandler` and `CharacterFormObserver` from `observer`

pub mod calculator;
pub mod calculator_rewriter;
pub mod converter;
pub mod observer;
pub mod request;
pub mod rewriter;
pub mod variants_rewriter;

// Core data model, re-exported for callers that only depend on this crate.
pub use librewrite_core::{
    Candidate, CandidateAttributes, CharacterForm, CharacterFormManager, Config, FormHistory,
    FormType, Segment, SegmentType, Segments,
};

pub use calculator::{ArithmeticCalculator, Calculator};
pub use calculator_rewriter::{CalculatorRewriter, CALCULATION_DESCRIPTION};
pub use converter::{CandidateSource, Converter, DictionarySource, SegmentResizer, MAX_RESIZE_DEPTH};
pub use observer::{CharacterFormObserver, SessionCommand, SessionObserver, SessionObserverHandler};
pub use request::{ConversionRequest, RequestType};
pub use rewriter::{Capability, Rewriter, RewriterChain};
pub use variants_rewriter::{VariantsRewriter, FULL_WIDTH_DESCRIPTION, HALF_WIDTH_DESCRIPTION};

use std::sync::Arc;

/// Build a converter with the stock chain: calculator first, then width
/// variants. Whether the calculator fires is decided per request by
/// `Config::use_calculator`.
pub fn default_converter(
    source: Box<dyn CandidateSource>,
    manager: Arc<CharacterFormManager>,
) -> Arc<Converter> {
    Converter::new_shared(source, move |resizer| {
        RewriterChain::new()
            .with_rewriter(Box::new(CalculatorRewriter::new(resizer)))
            .with_rewriter(Box::new(VariantsRewriter::new(manager)))
    })
}
