//! Error types.
//!
//! User input never fails: out-of-range values are clamped and invalid timer
//! transitions are ignored. What remains are configuration mistakes caught when
//! the pickers are built, and offline-cache failures.

use crate::quantity::QuantityKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    #[error("{kind} picker has inverted bounds [{min}, {max}]")]
    InvertedBounds { kind: QuantityKind, min: u32, max: u32 },

    #[error("{kind} initial value {initial} is outside [{min}, {max}]")]
    InitialOutOfRange {
        kind: QuantityKind,
        initial: u32,
        min: u32,
        max: u32,
    },

    #[error("ratio picker must not allow zero")]
    ZeroRatio,

    #[error("no picker configured for {0}")]
    MissingQuantity(QuantityKind),

    #[error("{0} picker configured more than once")]
    DuplicateQuantity(QuantityKind),

    #[error("unknown quantity '{0}'")]
    UnknownQuantity(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfflineError {
    #[error("failed to populate cache '{cache}': {reason}")]
    Populate { cache: String, reason: String },

    #[error("network fetch for {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("cache storage unavailable: {0}")]
    Backend(String),
}
