//! Conversion request passed down the rewriter chain.
//!
//! Like the session context, this is plain data: a configuration snapshot
//! plus what kind of conversion is being asked for.

use librewrite_core::Config;
use std::sync::Arc;

/// Phase of the conversion being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestType {
    /// Finalized conversion (user pressed convert)
    #[default]
    Conversion,
    /// Incremental prediction while typing
    Prediction,
    /// Incremental suggestion while typing
    Suggestion,
}

/// Configuration snapshot and request parameters for one conversion.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    config: Arc<Config>,
    request_type: RequestType,
    /// Conversion results are mixed into the incremental suggestions
    mixed_conversion: bool,
}

impl ConversionRequest {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            request_type: RequestType::Conversion,
            mixed_conversion: false,
        }
    }

    pub fn with_request_type(mut self, request_type: RequestType) -> Self {
        self.request_type = request_type;
        self
    }

    pub fn with_mixed_conversion(mut self, mixed_conversion: bool) -> Self {
        self.mixed_conversion = mixed_conversion;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn mixed_conversion(&self) -> bool {
        self.mixed_conversion
    }
}
