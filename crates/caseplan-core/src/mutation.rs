#![forbid(unsafe_code)]

//! Layout mutation API.
//!
//! Each operation either applies completely or returns a [`LayoutError`]
//! with the layout untouched. None of these methods prompt: confirmation of
//! destructive edits and undo snapshots are the caller's policy.
//!
//! # Capacity conflicts
//!
//! Widening a pan or inserting a pan from a product may need more width than
//! the case has left. Instead of truncating, the operation returns
//! [`LayoutError::CapacityConflict`] carrying a [`CapacityConflict`]. Calling
//! [`CapacityConflict::confirm`] applies the change and the case-width
//! expansion together; dropping the conflict rejects it.
//!
//! Expansion is capped at [`MAX_CASE_WIDTH`]. When the cap is below what the
//! change needs, the change still applies and the remaining width goes
//! negative.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{self, DepthMode, MAX_CASE_WIDTH, Orientation};
use crate::ids::{PanId, ProductId};
use crate::layout::CaseLayout;
use crate::pan::Pan;
use crate::product::Product;

/// Which side of a target pan a moved pan lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// A change held back by a capacity conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    /// Resize an existing pan.
    SetPanWidth { pan: PanId, width: u32 },
    /// Insert a prepared pan at `index`.
    InsertPan { pan: Pan, index: usize },
}

/// A change that needs the case to grow before it fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityConflict {
    change: PendingChange,
    case_width: u32,
    required_width: u32,
}

impl CapacityConflict {
    #[must_use]
    pub fn change(&self) -> &PendingChange {
        &self.change
    }

    /// Case width when the conflict was detected.
    #[must_use]
    pub fn case_width(&self) -> u32 {
        self.case_width
    }

    /// Used width after the change.
    #[must_use]
    pub fn required_width(&self) -> u32 {
        self.required_width
    }

    /// Case width that confirming would set.
    #[must_use]
    pub fn expand_to(&self) -> u32 {
        expansion(self.case_width, self.required_width)
    }

    /// True when the cap keeps the case narrower than the change needs.
    #[must_use]
    pub fn is_capped(&self) -> bool {
        self.expand_to() < self.required_width
    }

    /// Apply the held change and expand the case as one edit.
    ///
    /// The expansion is recomputed against `layout` as it is now, so a
    /// conflict confirmed after other edits still leaves a consistent case.
    ///
    /// # Errors
    ///
    /// [`LayoutError::UnknownPan`] if the pan being resized no longer exists.
    pub fn confirm(self, layout: &mut CaseLayout) -> LayoutResult<PanId> {
        match self.change {
            PendingChange::SetPanWidth { pan, width } => {
                let old = layout.require_pan(&pan)?.width();
                let required = layout.used_width() - old + width;
                layout.case_width = expansion(layout.case_width, required);
                layout.require_pan_mut(&pan)?.set_width(width);
                debug!(
                    pan = %pan,
                    width,
                    case_width = layout.case_width,
                    remaining = layout.remaining_width(),
                    "pan resized with case expansion"
                );
                Ok(pan)
            }
            PendingChange::InsertPan { mut pan, index } => {
                if layout.pan(pan.id()).is_some() {
                    pan = rekey(pan, layout.fresh_pan_id());
                }
                let required = layout.used_width() + pan.width();
                layout.case_width = expansion(layout.case_width, required);
                let id = pan.id().clone();
                let index = index.min(layout.pans.len());
                layout.pans.insert(index, pan);
                debug!(
                    pan = %id,
                    index,
                    case_width = layout.case_width,
                    remaining = layout.remaining_width(),
                    "pan inserted with case expansion"
                );
                Ok(id)
            }
        }
    }
}

fn expansion(case_width: u32, required: u32) -> u32 {
    case_width.max(required.min(MAX_CASE_WIDTH))
}

fn rekey(pan: Pan, id: PanId) -> Pan {
    let mut fresh = match Pan::new(id, pan.width(), pan.depth(), pan.orientation()) {
        Ok(fresh) => fresh,
        Err(_) => return pan,
    };
    for (i, slot) in pan.slots().iter().enumerate() {
        fresh.set_slot(i, slot.clone());
    }
    if let Some(overrides) = pan.slot_overrides() {
        for (i, o) in overrides {
            fresh.set_slot_orientation(*i, *o);
        }
    }
    fresh
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl CaseLayout {
    /// Append an empty pan.
    ///
    /// # Errors
    ///
    /// [`LayoutError::InsufficientWidth`] when `width` exceeds the remaining
    /// width, plus the validation errors of [`Pan::new`].
    pub fn add_pan(
        &mut self,
        width: u32,
        depth: DepthMode,
        orientation: Orientation,
    ) -> LayoutResult<PanId> {
        let remaining = self.remaining_width();
        if i64::from(width) > remaining {
            return Err(LayoutError::InsufficientWidth {
                requested: width,
                remaining,
            });
        }
        let pan = Pan::new(self.fresh_pan_id(), width, depth, orientation)?;
        let id = pan.id().clone();
        self.pans.push(pan);
        debug!(pan = %id, width, remaining = self.remaining_width(), "pan added");
        Ok(id)
    }

    /// Remove a pan. Products placed there simply leave the layout.
    pub fn remove_pan(&mut self, id: &PanId) -> LayoutResult<Pan> {
        let index = self
            .pan_index(id)
            .ok_or_else(|| LayoutError::UnknownPan(id.clone()))?;
        let pan = self.pans.remove(index);
        debug!(pan = %id, remaining = self.remaining_width(), "pan removed");
        Ok(pan)
    }

    /// Set the pan-level orientation. Per-slot overrides are kept.
    pub fn set_pan_orientation(&mut self, id: &PanId, orientation: Orientation) -> LayoutResult<()> {
        self.require_pan_mut(id)?.set_orientation(orientation);
        Ok(())
    }

    /// Override the orientation of one slot.
    pub fn set_slot_orientation(
        &mut self,
        id: &PanId,
        index: usize,
        orientation: Orientation,
    ) -> LayoutResult<()> {
        let pan = self.require_pan_mut(id)?;
        pan.check_slot(index)?;
        pan.set_slot_orientation(index, orientation);
        Ok(())
    }

    /// Resize a pan.
    ///
    /// A width that cannot be split forces the pan to full depth, keeping
    /// only slot 0 and dropping overrides.
    ///
    /// # Errors
    ///
    /// [`LayoutError::CapacityConflict`] when growing the pan would overflow
    /// the case; [`LayoutError::InvalidWidth`] or
    /// [`LayoutError::UnknownPan`] otherwise.
    pub fn set_pan_width(&mut self, id: &PanId, width: u32) -> LayoutResult<()> {
        if !geometry::is_allowed_width(width) {
            return Err(LayoutError::InvalidWidth(width));
        }
        let old = self.require_pan(id)?.width();
        let required = self.used_width() - old + width;
        if width > old && required > self.case_width {
            return Err(CapacityConflict {
                change: PendingChange::SetPanWidth {
                    pan: id.clone(),
                    width,
                },
                case_width: self.case_width,
                required_width: required,
            }
            .into());
        }
        self.require_pan_mut(id)?.set_width(width);
        debug!(pan = %id, width, remaining = self.remaining_width(), "pan resized");
        Ok(())
    }

    /// Change the depth split, keeping slots and overrides whose index survives.
    ///
    /// # Errors
    ///
    /// [`LayoutError::SplitNotAllowed`] for a split on a wide pan.
    pub fn set_pan_depth(&mut self, id: &PanId, depth: DepthMode) -> LayoutResult<()> {
        let pan = self.require_pan_mut(id)?;
        if !geometry::depth_allowed(pan.width(), depth) {
            return Err(LayoutError::SplitNotAllowed {
                width: pan.width(),
                depth,
            });
        }
        pan.set_depth(depth);
        debug!(pan = %id, depth = depth.as_str(), "pan depth changed");
        Ok(())
    }

    /// Put `product` into a slot, returning the previous occupant.
    pub fn assign_product(
        &mut self,
        id: &PanId,
        index: usize,
        product: ProductId,
    ) -> LayoutResult<Option<ProductId>> {
        let pan = self.require_pan_mut(id)?;
        pan.check_slot(index)?;
        let previous = pan.slot(index).cloned();
        debug!(pan = %id, slot = index, product = %product, "product assigned");
        pan.set_slot(index, Some(product));
        Ok(previous)
    }

    /// Empty a slot, returning the previous occupant.
    pub fn clear_slot(&mut self, id: &PanId, index: usize) -> LayoutResult<Option<ProductId>> {
        let pan = self.require_pan_mut(id)?;
        pan.check_slot(index)?;
        let previous = pan.slot(index).cloned();
        pan.set_slot(index, None);
        debug!(pan = %id, slot = index, "slot cleared");
        Ok(previous)
    }

    /// Insert a full-depth pan sized to `product.min_pan`, holding the product.
    ///
    /// `index` past the end appends.
    ///
    /// # Errors
    ///
    /// [`LayoutError::CapacityConflict`] when the product's minimum width
    /// exceeds the remaining width.
    pub fn insert_pan_from_product(&mut self, product: &Product, index: usize) -> LayoutResult<PanId> {
        let pan = Pan::single(
            self.fresh_pan_id(),
            product.min_pan,
            product.depth_preference,
            product.id.clone(),
        )?;
        let index = index.min(self.pans.len());
        if i64::from(product.min_pan) > self.remaining_width() {
            return Err(CapacityConflict {
                case_width: self.case_width,
                required_width: self.used_width() + pan.width(),
                change: PendingChange::InsertPan { pan, index },
            }
            .into());
        }
        let id = pan.id().clone();
        self.pans.insert(index, pan);
        debug!(
            pan = %id,
            product = %product.id,
            index,
            remaining = self.remaining_width(),
            "pan inserted from product"
        );
        Ok(id)
    }

    /// Move `id` to sit immediately left or right of `target`.
    ///
    /// Returns `false` when nothing moved (self-drop).
    pub fn reorder_pan(&mut self, id: &PanId, target: &PanId, side: Side) -> LayoutResult<bool> {
        if id == target {
            return Ok(false);
        }
        let from = self
            .pan_index(id)
            .ok_or_else(|| LayoutError::UnknownPan(id.clone()))?;
        if self.pan_index(target).is_none() {
            return Err(LayoutError::UnknownPan(target.clone()));
        }
        let pan = self.pans.remove(from);
        let mut to = self
            .pan_index(target)
            .ok_or_else(|| LayoutError::UnknownPan(target.clone()))?;
        if side == Side::Right {
            to += 1;
        }
        self.pans.insert(to, pan);
        debug!(pan = %id, target = %target, ?side, from, to, "pan reordered");
        Ok(from != to)
    }

    /// Remove every pan, returning them.
    pub fn clear_all_pans(&mut self) -> Vec<Pan> {
        let removed = std::mem::take(&mut self.pans);
        debug!(count = removed.len(), "case cleared");
        removed
    }

    /// Set the case width, clamped to `max(used, 1)..=MAX_CASE_WIDTH`.
    ///
    /// When the pans already exceed the cap, the used width wins. Returns the
    /// width actually applied.
    pub fn set_case_width(&mut self, width: u32) -> u32 {
        let floor = self.used_width().max(1);
        let applied = width.min(MAX_CASE_WIDTH).max(floor);
        self.case_width = applied;
        debug!(requested = width, case_width = applied, "case width set");
        applied
    }

    /// Empty every slot holding `product`. Returns how many slots changed.
    pub fn remove_product_references(&mut self, product: &ProductId) -> usize {
        let cleared: usize = self.pans.iter_mut().map(|p| p.clear_product(product)).sum();
        if cleared > 0 {
            debug!(product = %product, cleared, "product references removed");
        }
        cleared
    }

    /// Swap in a whole new layout (generate, load, import).
    pub fn replace(&mut self, other: CaseLayout) {
        *self = other;
        debug!(
            pans = self.pans.len(),
            case_width = self.case_width,
            "layout replaced"
        );
    }
}
