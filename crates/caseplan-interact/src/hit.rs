#![forbid(unsafe_code)]

//! Hit-test registry of drop targets and overlays.
//!
//! The presentation layer registers one rectangle per interactive element
//! each frame: slots, insertion gaps, the empty-case region, whole pans, and
//! any overlays (drag proxy, modal backdrop). Queries walk every entry under
//! the point from topmost down, so an overlay can sit above a target without
//! hiding it.
//!
//! # Invariants
//!
//! 1. Scans visit entries by descending z-order; ties go to the entry
//!    registered later.
//! 2. Overlay entries are never returned as targets.
//! 3. [`HitRegistry::clear`] resets registration order.

use std::cmp::Ordering;

use caseplan_core::PanId;

use crate::geometry::{Point, Rect};

/// What a registered rectangle represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// A single slot of a pan.
    Slot { pan: PanId, slot: usize },
    /// Zone before, between or after pans; `index` is the insert position.
    InsertGap { index: usize },
    /// The drop area shown when the case has no pans.
    EmptyCase,
    /// A whole pan, for reordering.
    Pan { pan: PanId },
}

/// A target found under a point.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<'a> {
    pub target: &'a DropTarget,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
struct HitEntry {
    rect: Rect,
    z: i32,
    order: u32,
    target: Option<DropTarget>,
}

impl HitEntry {
    fn cmp_z_order(&self, other: &Self) -> Ordering {
        match self.z.cmp(&other.z) {
            Ordering::Equal => self.order.cmp(&other.order),
            ord => ord,
        }
    }
}

/// Rectangles registered for the current frame.
#[derive(Debug, Clone, Default)]
pub struct HitRegistry {
    entries: Vec<HitEntry>,
    next_order: u32,
}

impl HitRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a drop target.
    pub fn register(&mut self, rect: Rect, z: i32, target: DropTarget) {
        self.push(rect, z, Some(target));
    }

    /// Register an element that covers targets without being one.
    pub fn register_overlay(&mut self, rect: Rect, z: i32) {
        self.push(rect, z, None);
    }

    fn push(&mut self, rect: Rect, z: i32, target: Option<DropTarget>) {
        self.entries.push(HitEntry {
            rect,
            z,
            order: self.next_order,
            target,
        });
        self.next_order = self.next_order.wrapping_add(1);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_order = 0;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every target under `point`, topmost first. Overlays are skipped.
    #[must_use]
    pub fn targets_at(&self, point: Point) -> Vec<Hit<'_>> {
        let mut under: Vec<&HitEntry> = self
            .entries
            .iter()
            .filter(|e| e.rect.contains(point))
            .collect();
        under.sort_by(|a, b| b.cmp_z_order(a));
        under
            .into_iter()
            .filter_map(|e| {
                e.target.as_ref().map(|target| Hit {
                    target,
                    rect: e.rect,
                })
            })
            .collect()
    }

    /// Topmost target under `point` accepted by `pred`.
    pub fn topmost_where<F>(&self, point: Point, mut pred: F) -> Option<Hit<'_>>
    where
        F: FnMut(&DropTarget) -> bool,
    {
        self.targets_at(point).into_iter().find(|h| pred(h.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(pan: &str, slot: usize) -> DropTarget {
        DropTarget::Slot {
            pan: PanId::new(pan),
            slot,
        }
    }

    #[test]
    fn higher_z_wins() {
        let mut reg = HitRegistry::new();
        reg.register(Rect::new(0.0, 0.0, 100.0, 100.0), 0, DropTarget::Pan { pan: PanId::new("a") });
        reg.register(Rect::new(0.0, 0.0, 50.0, 50.0), 1, slot("a", 0));
        let hits = reg.targets_at(Point::new(10.0, 10.0));
        assert_eq!(hits[0].target, &slot("a", 0));
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn ties_go_to_later_registration() {
        let mut reg = HitRegistry::new();
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        reg.register(r, 0, slot("a", 0));
        reg.register(r, 0, slot("b", 0));
        assert_eq!(reg.targets_at(Point::new(1.0, 1.0))[0].target, &slot("b", 0));
    }

    #[test]
    fn overlays_never_shadow_targets() {
        let mut reg = HitRegistry::new();
        reg.register(Rect::new(0.0, 0.0, 40.0, 40.0), 0, slot("a", 0));
        reg.register_overlay(Rect::new(0.0, 0.0, 400.0, 400.0), 9_999);
        let hit = reg.topmost_where(Point::new(5.0, 5.0), |_| true).unwrap();
        assert_eq!(hit.target, &slot("a", 0));
        assert!(reg.topmost_where(Point::new(100.0, 100.0), |_| true).is_none());
    }

    #[test]
    fn predicate_skips_unwanted_kinds() {
        let mut reg = HitRegistry::new();
        reg.register(Rect::new(0.0, 0.0, 10.0, 10.0), 0, DropTarget::Pan { pan: PanId::new("a") });
        reg.register(Rect::new(0.0, 0.0, 4.0, 10.0), 5, DropTarget::InsertGap { index: 0 });
        let hit = reg
            .topmost_where(Point::new(2.0, 2.0), |t| matches!(t, DropTarget::Pan { .. }))
            .unwrap();
        assert_eq!(hit.target, &DropTarget::Pan { pan: PanId::new("a") });
    }

    #[test]
    fn clear_resets() {
        let mut reg = HitRegistry::new();
        reg.register_overlay(Rect::new(0.0, 0.0, 1.0, 1.0), 0);
        reg.clear();
        assert!(reg.is_empty());
    }
}
