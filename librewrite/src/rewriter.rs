//! Rewriter trait and the ordered rewriter chain.
//!
//! Each rewriter declares which request phases it takes part in through
//! `capability`, then mutates the `Segments` it is handed in `rewrite`. A
//! rewriter that has nothing to do returns false and leaves the segments
//! untouched; it never reports "nothing to do" as an error.

use crate::request::{ConversionRequest, RequestType};
use librewrite_core::Segments;

/// Request phases a rewriter participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Never runs
    None,
    /// Finalized conversion only
    Conversion,
    /// Every phase, including incremental prediction/suggestion
    All,
}

impl Capability {
    /// Whether a rewriter with this capability runs for `request_type`.
    pub fn allows(self, request_type: RequestType) -> bool {
        match self {
            Capability::None => false,
            Capability::Conversion => request_type == RequestType::Conversion,
            Capability::All => true,
        }
    }
}

/// A post-conversion rewriter.
///
/// Implementations must not keep the `Segments` they are given, and a
/// second call with nothing left to change must return false.
pub trait Rewriter: Send + Sync {
    /// Phases this rewriter runs in.
    fn capability(&self, _request: &ConversionRequest) -> Capability {
        Capability::Conversion
    }

    /// Mutate `segments` in place; returns whether anything changed.
    fn rewrite(&self, request: &ConversionRequest, segments: &mut Segments) -> bool;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// Ordered set of rewriters, consulted front to back.
#[derive(Default)]
pub struct RewriterChain {
    rewriters: Vec<Box<dyn Rewriter>>,
}

impl RewriterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rewriter; composition happens once at startup.
    pub fn add_rewriter(&mut self, rewriter: Box<dyn Rewriter>) {
        self.rewriters.push(rewriter);
    }

    pub fn with_rewriter(mut self, rewriter: Box<dyn Rewriter>) -> Self {
        self.add_rewriter(rewriter);
        self
    }

    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }
}

impl Rewriter for RewriterChain {
    fn capability(&self, request: &ConversionRequest) -> Capability {
        let mut result = Capability::None;
        for rewriter in &self.rewriters {
            match rewriter.capability(request) {
                Capability::All => return Capability::All,
                Capability::Conversion => result = Capability::Conversion,
                Capability::None => {}
            }
        }
        result
    }

    fn rewrite(&self, request: &ConversionRequest, segments: &mut Segments) -> bool {
        let mut modified = false;
        for rewriter in &self.rewriters {
            if !rewriter.capability(request).allows(request.request_type()) {
                continue;
            }
            if rewriter.rewrite(request, segments) {
                tracing::debug!(
                    "{} modified segments (resize depth {})",
                    rewriter.name(),
                    segments.resize_depth()
                );
                modified = true;
            }
        }
        modified
    }

    fn name(&self) -> &'static str {
        "RewriterChain"
    }
}
