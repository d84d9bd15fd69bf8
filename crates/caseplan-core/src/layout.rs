#![forbid(unsafe_code)]

//! Authoritative layout state: case width and the ordered pan sequence.
//!
//! `CaseLayout` exposes read accessors only. Every structural change goes
//! through the methods in [`crate::mutation`], which either apply completely
//! or return an error with the layout untouched.
//!
//! # Invariants
//!
//! 1. Every pan satisfies [`Pan::check_invariants`].
//! 2. Pan ids are unique within the case.
//! 3. `case_width >= 1`.
//!
//! `remaining_width` may be negative. That is a displayed warning state and
//! not a violation.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::DEFAULT_CASE_WIDTH;
use crate::ids::{PanId, ProductId};
use crate::pan::Pan;

/// Case width plus the pans placed left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutRecord", into = "LayoutRecord")]
pub struct CaseLayout {
    pub(crate) case_width: u32,
    pub(crate) pans: Vec<Pan>,
}

impl Default for CaseLayout {
    fn default() -> Self {
        Self::new(DEFAULT_CASE_WIDTH)
    }
}

impl CaseLayout {
    /// An empty case. A zero width is raised to 1.
    #[must_use]
    pub fn new(case_width: u32) -> Self {
        Self {
            case_width: case_width.max(1),
            pans: Vec::new(),
        }
    }

    /// Build a layout from loaded parts, checking every invariant.
    ///
    /// # Errors
    ///
    /// The first invariant violation found.
    pub fn from_parts(case_width: u32, pans: Vec<Pan>) -> LayoutResult<Self> {
        let layout = Self { case_width, pans };
        layout.check_invariants()?;
        Ok(layout)
    }

    #[must_use]
    pub fn case_width(&self) -> u32 {
        self.case_width
    }

    #[must_use]
    pub fn pans(&self) -> &[Pan] {
        &self.pans
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pans.is_empty()
    }

    /// Sum of pan widths.
    #[must_use]
    pub fn used_width(&self) -> u32 {
        self.pans.iter().map(Pan::width).sum()
    }

    /// `case_width - used_width`; negative when the case is overfilled.
    #[must_use]
    pub fn remaining_width(&self) -> i64 {
        i64::from(self.case_width) - i64::from(self.used_width())
    }

    #[must_use]
    pub fn pan(&self, id: &PanId) -> Option<&Pan> {
        self.pans.iter().find(|p| p.id() == id)
    }

    #[must_use]
    pub fn pan_index(&self, id: &PanId) -> Option<usize> {
        self.pans.iter().position(|p| p.id() == id)
    }

    /// Occupant of a slot.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownPan`] or [`LayoutError::SlotOutOfRange`].
    pub fn slot(&self, pan: &PanId, index: usize) -> LayoutResult<Option<&ProductId>> {
        let pan = self.require_pan(pan)?;
        pan.check_slot(index)?;
        Ok(pan.slot(index))
    }

    /// Distinct products placed anywhere in the case, in first-seen order.
    #[must_use]
    pub fn products_in_use(&self) -> Vec<&ProductId> {
        let mut seen: Vec<&ProductId> = Vec::new();
        for id in self.pans.iter().flat_map(Pan::products) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    /// Number of slots holding `product`.
    #[must_use]
    pub fn placements(&self, product: &ProductId) -> usize {
        self.pans
            .iter()
            .flat_map(Pan::products)
            .filter(|p| *p == product)
            .count()
    }

    /// Verify every layout invariant.
    ///
    /// # Errors
    ///
    /// The first violation found, in pan order.
    pub fn check_invariants(&self) -> LayoutResult<()> {
        if self.case_width == 0 {
            return Err(LayoutError::InvalidCaseWidth(0));
        }
        for (i, pan) in self.pans.iter().enumerate() {
            pan.check_invariants()?;
            if self.pans[..i].iter().any(|p| p.id() == pan.id()) {
                return Err(LayoutError::DuplicatePan(pan.id().clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn require_pan(&self, id: &PanId) -> LayoutResult<&Pan> {
        self.pan(id).ok_or_else(|| LayoutError::UnknownPan(id.clone()))
    }

    pub(crate) fn require_pan_mut(&mut self, id: &PanId) -> LayoutResult<&mut Pan> {
        self.pans
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| LayoutError::UnknownPan(id.clone()))
    }

    pub(crate) fn fresh_pan_id(&self) -> PanId {
        PanId::fresh(self.pans.iter().map(Pan::id))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutRecord {
    case_width: u32,
    pans: Vec<Pan>,
}

impl TryFrom<LayoutRecord> for CaseLayout {
    type Error = LayoutError;

    fn try_from(record: LayoutRecord) -> Result<Self, Self::Error> {
        Self::from_parts(record.case_width, record.pans)
    }
}

impl From<CaseLayout> for LayoutRecord {
    fn from(layout: CaseLayout) -> Self {
        Self {
            case_width: layout.case_width,
            pans: layout.pans,
        }
    }
}
