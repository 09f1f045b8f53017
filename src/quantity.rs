//! The three brew quantities and their bounds.

use crate::config::*;
use crate::error::PickerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityKind {
    Coffee,
    Ratio,
    Water,
}

impl QuantityKind {
    pub const ALL: [QuantityKind; 3] = [QuantityKind::Coffee, QuantityKind::Ratio, QuantityKind::Water];

    pub fn as_str(self) -> &'static str {
        match self {
            QuantityKind::Coffee => "coffee",
            QuantityKind::Ratio => "ratio",
            QuantityKind::Water => "water",
        }
    }

    /// Label shown above the picker column.
    pub fn label(self) -> &'static str {
        match self {
            QuantityKind::Coffee => "Coffee (g)",
            QuantityKind::Ratio => "Ratio (1:x)",
            QuantityKind::Water => "Water (ml)",
        }
    }

    /// The quantity recomputed when this one is edited.
    ///
    /// Coffee and ratio drive water; water drives coffee and leaves ratio alone.
    pub fn dependent(self) -> QuantityKind {
        match self {
            QuantityKind::Coffee | QuantityKind::Ratio => QuantityKind::Water,
            QuantityKind::Water => QuantityKind::Coffee,
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityKind {
    type Err = PickerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "coffee" => Ok(QuantityKind::Coffee),
            "ratio" => Ok(QuantityKind::Ratio),
            "water" => Ok(QuantityKind::Water),
            other => Err(PickerError::UnknownQuantity(other.to_string())),
        }
    }
}

/// Construction parameters for one picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerSpec {
    pub kind: QuantityKind,
    pub min: u32,
    pub max: u32,
    pub initial: u32,
}

impl PickerSpec {
    pub fn new(kind: QuantityKind, min: u32, max: u32, initial: u32) -> Self {
        Self { kind, min, max, initial }
    }

    pub fn defaults() -> [PickerSpec; 3] {
        [
            PickerSpec::new(QuantityKind::Coffee, MIN_COFFEE_G, MAX_COFFEE_G, DEFAULT_COFFEE_G),
            PickerSpec::new(QuantityKind::Ratio, MIN_RATIO, MAX_RATIO, DEFAULT_RATIO),
            PickerSpec::new(QuantityKind::Water, MIN_WATER_ML, MAX_WATER_ML, DEFAULT_WATER_ML),
        ]
    }
}

/// A bounded integer quantity.
///
/// Values set from user input are clamped into `[min, max]`. A value derived
/// from the other two quantities is stored as computed, so water can sit off
/// its own rail (1 g at 1:1 is 1 ml).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    value: u32,
    min: u32,
    max: u32,
}

impl Quantity {
    pub fn from_spec(spec: &PickerSpec) -> Result<Self, PickerError> {
        if spec.min > spec.max {
            return Err(PickerError::InvertedBounds {
                kind: spec.kind,
                min: spec.min,
                max: spec.max,
            });
        }
        if spec.kind == QuantityKind::Ratio && spec.min == 0 {
            return Err(PickerError::ZeroRatio);
        }
        if !(spec.min..=spec.max).contains(&spec.initial) {
            return Err(PickerError::InitialOutOfRange {
                kind: spec.kind,
                initial: spec.initial,
                min: spec.min,
                max: spec.max,
            });
        }
        Ok(Self {
            value: spec.initial,
            min: spec.min,
            max: spec.max,
        })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn clamp(&self, raw: i64) -> u32 {
        raw.clamp(self.min as i64, self.max as i64) as u32
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Number of slots on this quantity's rail.
    pub fn slot_count(&self) -> usize {
        (self.max - self.min) as usize + 1
    }

    /// Rail slot for `value`, pinned to the nearest rail end when off-rail.
    pub fn slot_of(&self, value: u32) -> usize {
        (value.clamp(self.min, self.max) - self.min) as usize
    }

    pub fn value_at(&self, slot: usize) -> u32 {
        let slot = slot.min(self.slot_count() - 1);
        self.min + slot as u32
    }

    pub(crate) fn store(&mut self, value: u32) {
        self.value = value;
    }
}

/// Snapshot of the three brew quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrewState {
    pub coffee: u32,
    pub ratio: u32,
    pub water: u32,
}

/// Integer `round(numerator / denominator)` with halves rounded up.
pub fn round_div(numerator: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let (n, d) = (numerator as u64, denominator as u64);
    ((2 * n + d) / (2 * d)) as u32
}
