#![forbid(unsafe_code)]

//! Width and depth units for pans and cases.
//!
//! Everything here is pure and stateless. Widths are abstract case units;
//! the allowed pan widths form a small closed set, and only the two smallest
//! widths may be split front-to-back into stacked slots.

use serde::{Deserialize, Serialize};

/// Allowed pan widths, ascending.
pub const PAN_WIDTHS: [u32; 4] = [3, 6, 8, 12];

/// Case width used when nothing has been persisted yet.
pub const DEFAULT_CASE_WIDTH: u32 = 81;

/// Upper bound for user edits and capacity-conflict expansion.
pub const MAX_CASE_WIDTH: u32 = 150;

/// Physical case depth in depth units.
pub const CASE_DEPTH: u32 = 12;

/// How a pan's depth is divided into slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// One slot spanning the full depth.
    #[default]
    Full,
    /// Two stacked slots (front, back).
    Half,
    /// Three stacked slots (front, mid, back).
    Third,
}

impl DepthMode {
    /// All modes, in split order.
    pub const ALL: [Self; 3] = [Self::Full, Self::Half, Self::Third];

    /// Whether this mode subdivides the pan.
    #[must_use]
    pub const fn is_split(self) -> bool {
        !matches!(self, Self::Full)
    }

    /// Depth units covered by each slot.
    #[must_use]
    pub const fn depth_units(self) -> u32 {
        CASE_DEPTH / slot_count(self) as u32
    }

    /// Wire name, as used in case files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Half => "half",
            Self::Third => "third",
        }
    }
}

/// Pan orientation: shallow or deep pan hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Shallow,
    Deep,
}

impl Orientation {
    /// The other orientation.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Shallow => Self::Deep,
            Self::Deep => Self::Shallow,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shallow => "shallow",
            Self::Deep => "deep",
        }
    }
}

/// Number of slots implied by a depth mode.
#[must_use]
pub const fn slot_count(depth: DepthMode) -> usize {
    match depth {
        DepthMode::Full => 1,
        DepthMode::Half => 2,
        DepthMode::Third => 3,
    }
}

/// True if `width` is one of [`PAN_WIDTHS`].
#[must_use]
pub fn is_allowed_width(width: u32) -> bool {
    PAN_WIDTHS.contains(&width)
}

/// True only for the two smallest allowed widths.
#[must_use]
pub fn is_splittable(width: u32) -> bool {
    PAN_WIDTHS[..2].contains(&width)
}

/// Whether `depth` may be used on a pan of `width`.
#[must_use]
pub fn depth_allowed(width: u32, depth: DepthMode) -> bool {
    !depth.is_split() || is_splittable(width)
}

/// Presentational label for a slot position.
///
/// Full-depth pans have a single unlabeled slot.
#[must_use]
pub fn slot_label(depth: DepthMode, index: usize) -> &'static str {
    match (depth, index) {
        (DepthMode::Full, _) => "",
        (DepthMode::Half, 0) | (DepthMode::Third, 0) => "Front",
        (DepthMode::Third, 1) => "Mid",
        _ => "Back",
    }
}

/// Allowed widths in `min..=max`, ascending.
#[must_use]
pub fn widths_between(min: u32, max: u32) -> Vec<u32> {
    PAN_WIDTHS
        .iter()
        .copied()
        .filter(|w| *w >= min && *w <= max)
        .collect()
}

/// The largest allowed width strictly below `width` and at least `floor`.
#[must_use]
pub fn next_smaller_width(width: u32, floor: u32) -> Option<u32> {
    PAN_WIDTHS
        .iter()
        .rev()
        .copied()
        .find(|w| *w < width && *w >= floor)
}
