#![forbid(unsafe_code)]

//! A single pan: width, depth split, orientation and slot assignments.
//!
//! # Invariants
//!
//! 1. `slots.len() == slot_count(depth)`.
//! 2. A width that is not splittable always has depth [`DepthMode::Full`].
//! 3. Slot indices are contiguous from 0 (guaranteed by the `Vec`).
//! 4. Per-slot orientation overrides only name existing slots; an empty
//!    override map is stored as `None`.
//!
//! Fields are private. Structural changes go through [`crate::CaseLayout`],
//! and deserialization rebuilds the slot vector so that loaded pans satisfy
//! the invariants before first use.
//!
//! # Wire shape
//!
//! ```json
//! { "id": "k3j9x0aa", "width": 6, "depth": "half", "panType": "shallow",
//!   "slots": { "0": "p1", "1": null }, "slotTypes": { "1": "deep" } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{self, DepthMode, Orientation};
use crate::ids::{PanId, ProductId};

/// A container placed in the case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PanRecord", into = "PanRecord")]
pub struct Pan {
    id: PanId,
    width: u32,
    depth: DepthMode,
    orientation: Orientation,
    slots: Vec<Option<ProductId>>,
    slot_orientations: Option<BTreeMap<usize, Orientation>>,
}

impl Pan {
    /// An empty pan.
    ///
    /// # Errors
    ///
    /// [`LayoutError::InvalidWidth`] for a width outside the allowed set and
    /// [`LayoutError::SplitNotAllowed`] for a split depth on a wide pan.
    pub fn new(
        id: PanId,
        width: u32,
        depth: DepthMode,
        orientation: Orientation,
    ) -> LayoutResult<Self> {
        if !geometry::is_allowed_width(width) {
            return Err(LayoutError::InvalidWidth(width));
        }
        if !geometry::depth_allowed(width, depth) {
            return Err(LayoutError::SplitNotAllowed { width, depth });
        }
        Ok(Self {
            id,
            width,
            depth,
            orientation,
            slots: vec![None; geometry::slot_count(depth)],
            slot_orientations: None,
        })
    }

    /// A full-depth pan holding `product` in its only slot.
    pub fn single(
        id: PanId,
        width: u32,
        orientation: Orientation,
        product: ProductId,
    ) -> LayoutResult<Self> {
        let mut pan = Self::new(id, width, DepthMode::Full, orientation)?;
        pan.slots[0] = Some(product);
        Ok(pan)
    }

    #[must_use]
    pub fn id(&self) -> &PanId {
        &self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn depth(&self) -> DepthMode {
        self.depth
    }

    /// Pan-level orientation, used for slots without an override.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<ProductId>] {
        &self.slots
    }

    /// Occupant of slot `index`; `None` when empty or out of range.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&ProductId> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn slot_overrides(&self) -> Option<&BTreeMap<usize, Orientation>> {
        self.slot_orientations.as_ref()
    }

    /// Effective orientation of a slot.
    #[must_use]
    pub fn slot_orientation(&self, index: usize) -> Orientation {
        self.slot_orientations
            .as_ref()
            .and_then(|m| m.get(&index).copied())
            .unwrap_or(self.orientation)
    }

    #[must_use]
    pub fn slot_label(&self, index: usize) -> &'static str {
        geometry::slot_label(self.depth, index)
    }

    /// Products placed in this pan, front to back.
    pub fn products(&self) -> impl Iterator<Item = &ProductId> {
        self.slots.iter().flatten()
    }

    /// True when no slot holds a product.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Check invariants 1, 2 and 4.
    pub fn check_invariants(&self) -> LayoutResult<()> {
        if !geometry::is_allowed_width(self.width) {
            return Err(LayoutError::InvalidWidth(self.width));
        }
        if !geometry::depth_allowed(self.width, self.depth) {
            return Err(LayoutError::SplitNotAllowed {
                width: self.width,
                depth: self.depth,
            });
        }
        let expected = geometry::slot_count(self.depth);
        if self.slots.len() != expected {
            return Err(LayoutError::SlotCountMismatch {
                pan: self.id.clone(),
                expected,
                actual: self.slots.len(),
            });
        }
        if let Some(overrides) = &self.slot_orientations
            && (overrides.is_empty() || overrides.keys().any(|i| *i >= expected))
        {
            return Err(LayoutError::SlotOutOfRange {
                pan: self.id.clone(),
                index: overrides.keys().copied().max().unwrap_or(0),
                slots: expected,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Crate-internal edits (callers validate ids and indices first)
    // -----------------------------------------------------------------------

    pub(crate) fn check_slot(&self, index: usize) -> LayoutResult<()> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(LayoutError::SlotOutOfRange {
                pan: self.id.clone(),
                index,
                slots: self.slots.len(),
            })
        }
    }

    pub(crate) fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub(crate) fn set_slot(&mut self, index: usize, product: Option<ProductId>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = product;
        }
    }

    pub(crate) fn set_slot_orientation(&mut self, index: usize, orientation: Orientation) {
        if index < self.slots.len() {
            self.slot_orientations
                .get_or_insert_with(BTreeMap::new)
                .insert(index, orientation);
        }
    }

    /// Change the width; a wide pan collapses to one slot keeping slot 0.
    pub(crate) fn set_width(&mut self, width: u32) {
        self.width = width;
        if !geometry::is_splittable(width) && self.depth.is_split() {
            self.depth = DepthMode::Full;
            self.slots.truncate(1);
            self.slot_orientations = None;
        }
    }

    /// Resize the slot vector, keeping entries whose index survives.
    pub(crate) fn set_depth(&mut self, depth: DepthMode) {
        let count = geometry::slot_count(depth);
        self.depth = depth;
        self.slots.resize(count, None);
        if let Some(overrides) = &mut self.slot_orientations {
            overrides.retain(|i, _| *i < count);
            if overrides.is_empty() {
                self.slot_orientations = None;
            }
        }
    }

    /// Clear every slot that holds `product`. Returns how many were cleared.
    pub(crate) fn clear_product(&mut self, product: &ProductId) -> usize {
        let mut cleared = 0;
        for slot in &mut self.slots {
            if slot.as_ref() == Some(product) {
                *slot = None;
                cleared += 1;
            }
        }
        cleared
    }
}

// ---------------------------------------------------------------------------
// Wire record
// ---------------------------------------------------------------------------

/// Serialized form of a [`Pan`], as stored in case files and local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanRecord {
    id: PanId,
    width: u32,
    #[serde(default)]
    depth: DepthMode,
    #[serde(default)]
    pan_type: Orientation,
    #[serde(default)]
    slots: BTreeMap<usize, Option<ProductId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    slot_types: Option<BTreeMap<usize, Orientation>>,
}

impl TryFrom<PanRecord> for Pan {
    type Error = LayoutError;

    fn try_from(record: PanRecord) -> Result<Self, Self::Error> {
        let mut pan = Pan::new(record.id, record.width, record.depth, record.pan_type)?;
        let mut slots = record.slots;
        for (index, slot) in pan.slots.iter_mut().enumerate() {
            *slot = slots.remove(&index).flatten();
        }
        if let Some(types) = record.slot_types {
            for (index, orientation) in types {
                pan.set_slot_orientation(index, orientation);
            }
        }
        Ok(pan)
    }
}

impl From<Pan> for PanRecord {
    fn from(pan: Pan) -> Self {
        Self {
            id: pan.id,
            width: pan.width,
            depth: pan.depth,
            pan_type: pan.orientation,
            slots: pan.slots.into_iter().enumerate().collect(),
            slot_types: pan.slot_orientations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s)
    }

    fn pan(width: u32, depth: DepthMode) -> Pan {
        Pan::new(PanId::new("a"), width, depth, Orientation::Shallow).unwrap()
    }

    #[test]
    fn new_rejects_bad_width_and_split() {
        assert_eq!(
            Pan::new(PanId::new("a"), 5, DepthMode::Full, Orientation::Shallow),
            Err(LayoutError::InvalidWidth(5))
        );
        assert!(matches!(
            Pan::new(PanId::new("a"), 8, DepthMode::Half, Orientation::Shallow),
            Err(LayoutError::SplitNotAllowed { width: 8, .. })
        ));
    }

    #[test]
    fn new_has_empty_slots() {
        let p = pan(6, DepthMode::Third);
        assert_eq!(p.slot_count(), 3);
        assert!(p.is_empty());
        p.check_invariants().unwrap();
    }

    #[test]
    fn depth_change_keeps_surviving_slots() {
        let mut p = pan(6, DepthMode::Third);
        p.set_slot(0, Some(pid("a")));
        p.set_slot(2, Some(pid("c")));
        p.set_slot_orientation(2, Orientation::Deep);
        p.set_depth(DepthMode::Half);
        assert_eq!(p.slots(), &[Some(pid("a")), None]);
        assert_eq!(p.slot_overrides(), None);
        p.check_invariants().unwrap();
    }

    #[test]
    fn widening_collapses_split() {
        let mut p = pan(3, DepthMode::Half);
        p.set_slot(0, Some(pid("front")));
        p.set_slot(1, Some(pid("back")));
        p.set_slot_orientation(1, Orientation::Deep);
        p.set_width(12);
        assert_eq!(p.depth(), DepthMode::Full);
        assert_eq!(p.slots(), &[Some(pid("front"))]);
        assert_eq!(p.slot_overrides(), None);
        p.check_invariants().unwrap();
    }

    #[test]
    fn slot_orientation_falls_back_to_pan() {
        let mut p = pan(6, DepthMode::Half);
        p.set_orientation(Orientation::Deep);
        p.set_slot_orientation(0, Orientation::Shallow);
        assert_eq!(p.slot_orientation(0), Orientation::Shallow);
        assert_eq!(p.slot_orientation(1), Orientation::Deep);
    }

    #[test]
    fn wire_shape_uses_index_keys() {
        let mut p = pan(6, DepthMode::Half);
        p.set_slot(0, Some(pid("p1")));
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["panType"], "shallow");
        assert_eq!(json["slots"]["0"], "p1");
        assert!(json["slots"]["1"].is_null());
        assert!(json.get("slotTypes").is_none());
    }

    #[test]
    fn deserialize_rebuilds_slot_vector() {
        let p: Pan = serde_json::from_str(
            r#"{"id":"x","width":6,"depth":"half","panType":"deep",
                "slots":{"0":"p1","4":"ghost"},"slotTypes":{"1":"shallow","7":"deep"}}"#,
        )
        .unwrap();
        assert_eq!(p.slots(), &[Some(pid("p1")), None]);
        assert_eq!(p.slot_orientation(1), Orientation::Shallow);
        assert_eq!(p.slot_overrides().map(BTreeMap::len), Some(1));
        p.check_invariants().unwrap();
    }

    #[test]
    fn deserialize_rejects_split_wide_pan() {
        let err = serde_json::from_str::<Pan>(
            r#"{"id":"x","width":12,"depth":"third","panType":"deep","slots":{}}"#,
        );
        assert!(err.is_err());
    }
}
