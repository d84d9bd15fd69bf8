#![forbid(unsafe_code)]

//! Errors returned by layout operations.
//!
//! Every rejected operation leaves the layout exactly as it was. A capacity
//! conflict is carried as a value the caller can confirm later rather than a
//! terminal failure.

use std::fmt;

use crate::geometry::DepthMode;
use crate::ids::{PanId, ProductId};
use crate::mutation::CapacityConflict;

/// Result type for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors that can occur when mutating or validating a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// No pan with this id exists in the case.
    UnknownPan(PanId),
    /// No product with this id exists in the catalog.
    UnknownProduct(ProductId),
    /// Slot index is past the end of the pan's slots.
    SlotOutOfRange {
        pan: PanId,
        index: usize,
        slots: usize,
    },
    /// Width is not one of the allowed pan widths.
    InvalidWidth(u32),
    /// Case width outside `1..=MAX_CASE_WIDTH`.
    InvalidCaseWidth(u32),
    /// Split depth requested on a width that cannot be split.
    SplitNotAllowed { width: u32, depth: DepthMode },
    /// Adding a pan would exceed the remaining width.
    InsufficientWidth { requested: u32, remaining: i64 },
    /// The change needs the case to grow; see [`CapacityConflict::confirm`].
    CapacityConflict(Box<CapacityConflict>),
    /// A pan's slot vector does not match its depth mode.
    SlotCountMismatch {
        pan: PanId,
        expected: usize,
        actual: usize,
    },
    /// Two pans share an id.
    DuplicatePan(PanId),
}

impl LayoutError {
    /// The pending conflict, if this error is one.
    #[must_use]
    pub fn into_conflict(self) -> Option<CapacityConflict> {
        match self {
            Self::CapacityConflict(conflict) => Some(*conflict),
            _ => None,
        }
    }
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPan(id) => write!(f, "pan {id} not found"),
            Self::UnknownProduct(id) => write!(f, "product {id} not found"),
            Self::SlotOutOfRange { pan, index, slots } => {
                write!(f, "slot {index} out of range for pan {pan} ({slots} slots)")
            }
            Self::InvalidWidth(w) => write!(f, "width {w} is not an allowed pan width"),
            Self::InvalidCaseWidth(w) => write!(f, "case width {w} is out of range"),
            Self::SplitNotAllowed { width, depth } => {
                write!(f, "pan width {width} cannot use depth '{}'", depth.as_str())
            }
            Self::InsufficientWidth {
                requested,
                remaining,
            } => write!(
                f,
                "pan width {requested} exceeds remaining case width {remaining}"
            ),
            Self::CapacityConflict(c) => write!(
                f,
                "case needs {} units but is {} wide",
                c.required_width(),
                c.case_width()
            ),
            Self::SlotCountMismatch {
                pan,
                expected,
                actual,
            } => write!(f, "pan {pan} has {actual} slots, expected {expected}"),
            Self::DuplicatePan(id) => write!(f, "duplicate pan id {id}"),
        }
    }
}

impl std::error::Error for LayoutError {}

impl From<CapacityConflict> for LayoutError {
    fn from(conflict: CapacityConflict) -> Self {
        Self::CapacityConflict(Box::new(conflict))
    }
}
