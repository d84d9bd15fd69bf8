#![forbid(unsafe_code)]

//! Adapter for touch gestures emulating drag-and-drop.
//!
//! Touch has no native drag events, so this adapter drives the protocol from
//! raw `touchstart` / `touchmove` / `touchend` / `touchcancel`:
//!
//! - Nothing happens until the finger travels [`TouchConfig::drag_threshold_px`]
//!   from where it landed; a tap never starts a drag.
//! - Once started, a proxy rectangle follows the finger.
//! - Every move scans the [`HitRegistry`] at the finger position, topmost
//!   first and skipping overlays, and highlights the accepted candidate.
//! - Release re-runs that scan at the release point, highlights the result and
//!   drops on exactly that candidate.
//! - Cancel drops nothing and clears every transient visual.
//!
//! # Invariants
//!
//! 1. The candidate that receives the drop is the highlight at release.
//! 2. After `touch_end` or `touch_cancel`, [`DragVisuals::is_clear`] holds.
//! 3. `touch_cancel` never calls the sink.

use tracing::trace;

use crate::drag::{DragPayload, DragSession, DragVisuals, DropOutcome, DropSink};
use crate::geometry::{Point, Rect};
use crate::hit::HitRegistry;

/// Thresholds for touch drags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchConfig {
    /// Euclidean travel in pixels before a drag starts (default: 8).
    pub drag_threshold_px: f32,
    /// Proxy size relative to the source element (default: 1.05).
    pub proxy_scale: f32,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 8.0,
            proxy_scale: 1.05,
        }
    }
}

impl TouchConfig {
    #[must_use]
    pub fn with_threshold(mut self, px: f32) -> Self {
        self.drag_threshold_px = px;
        self
    }

    #[must_use]
    pub fn with_proxy_scale(mut self, scale: f32) -> Self {
        self.proxy_scale = scale;
        self
    }
}

/// A touch that landed on a draggable but has not yet travelled far enough.
#[derive(Debug, Clone)]
struct PendingTouch {
    payload: DragPayload,
    start: Point,
    source: Rect,
}

/// Touch-driven drag adapter.
#[derive(Debug, Clone, Default)]
pub struct TouchDrag {
    config: TouchConfig,
    pending: Option<PendingTouch>,
    session: DragSession,
    visuals: DragVisuals,
}

impl TouchDrag {
    #[must_use]
    pub fn new(config: TouchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &TouchConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    #[must_use]
    pub fn visuals(&self) -> &DragVisuals {
        &self.visuals
    }

    /// Whether the threshold has been crossed.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.session.is_dragging()
    }

    /// Whether a touch is being tracked, started or not.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.pending.is_some() || self.session.is_dragging()
    }

    /// `touchstart` on a draggable whose on-screen box is `source`.
    pub fn touch_start(&mut self, payload: DragPayload, point: Point, source: Rect) {
        self.reset();
        self.pending = Some(PendingTouch {
            payload,
            start: point,
            source,
        });
    }

    /// `touchmove`. Returns `true` once the gesture is a drag, meaning the
    /// caller should suppress scrolling.
    pub fn touch_move(&mut self, point: Point, registry: &HitRegistry) -> bool {
        if !self.session.is_dragging() {
            let Some(pending) = &self.pending else {
                return false;
            };
            if pending.start.distance(point) < self.config.drag_threshold_px {
                return false;
            }
            let Some(pending) = self.pending.take() else {
                return false;
            };
            self.session.begin(pending.payload);
            let size = pending.source.scaled(self.config.proxy_scale);
            self.visuals.proxy = Some(Rect::centered_on(point, size.width, size.height));
        }
        self.track(point, registry);
        true
    }

    /// `touchend`. Drops on the candidate under `point` if a drag started.
    pub fn touch_end(&mut self, point: Point, registry: &HitRegistry, sink: &mut dyn DropSink) -> DropOutcome {
        if !self.session.is_dragging() {
            self.reset();
            return DropOutcome::NoOp;
        }
        self.track(point, registry);
        let outcome = self.session.drop_on(sink);
        self.reset();
        outcome
    }

    /// `touchcancel`: abandon without mutation.
    pub fn touch_cancel(&mut self) {
        self.reset();
    }

    fn track(&mut self, point: Point, registry: &HitRegistry) {
        if let Some(proxy) = &mut self.visuals.proxy {
            *proxy = Rect::centered_on(point, proxy.width, proxy.height);
        }
        let candidate = self.session.resolve(registry, point);
        self.visuals.highlight = self.session.hover(candidate).cloned();
        trace!(x = point.x, y = point.y, highlight = ?self.visuals.highlight, "touch drag moved");
    }

    fn reset(&mut self) {
        self.pending = None;
        self.session.cancel();
        self.visuals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::{Hover, LayoutSink, SlotRef};
    use crate::hit::DropTarget;
    use caseplan_core::{CaseLayout, Catalog, DepthMode, Orientation, ProductId};

    fn scene() -> (CaseLayout, Catalog, HitRegistry) {
        let mut layout = CaseLayout::new(81);
        let a = layout.add_pan(6, DepthMode::Half, Orientation::Shallow).unwrap();
        let mut reg = HitRegistry::new();
        reg.register(Rect::new(0.0, 0.0, 60.0, 200.0), 0, DropTarget::Pan { pan: a.clone() });
        reg.register(Rect::new(0.0, 0.0, 60.0, 100.0), 1, DropTarget::Slot { pan: a.clone(), slot: 0 });
        reg.register(Rect::new(0.0, 100.0, 60.0, 100.0), 1, DropTarget::Slot { pan: a, slot: 1 });
        reg.register(Rect::new(60.0, 0.0, 200.0, 200.0), 0, DropTarget::InsertGap { index: 1 });
        (layout, Catalog::starter(), reg)
    }

    fn pool(id: &str) -> DragPayload {
        DragPayload::PoolProduct { product: ProductId::new(id) }
    }

    #[test]
    fn below_threshold_is_a_tap() {
        let (mut layout, catalog, reg) = scene();
        let before = layout.clone();
        let mut touch = TouchDrag::new(TouchConfig::default());
        touch.touch_start(pool("p1"), Point::new(10.0, 10.0), Rect::new(0.0, 0.0, 40.0, 20.0));
        assert!(!touch.touch_move(Point::new(14.0, 14.0), &reg));
        assert!(!touch.is_dragging());
        let out = touch.touch_end(Point::new(14.0, 14.0), &reg, &mut LayoutSink::new(&mut layout, &catalog));
        assert_eq!(out, DropOutcome::NoOp);
        assert_eq!(layout, before);
    }

    #[test]
    fn proxy_follows_finger_and_highlight_tracks() {
        let (_, _, mut reg) = scene();
        let mut touch = TouchDrag::new(TouchConfig::default().with_proxy_scale(1.0));
        touch.touch_start(pool("p1"), Point::new(300.0, 300.0), Rect::new(290.0, 290.0, 40.0, 20.0));
        assert!(touch.touch_move(Point::new(30.0, 50.0), &reg));
        assert_eq!(touch.visuals().proxy, Some(Rect::new(10.0, 40.0, 40.0, 20.0)));
        let proxy = touch.visuals().proxy.unwrap();
        reg.register_overlay(proxy, 9_999);
        touch.touch_move(Point::new(30.0, 50.0), &reg);
        let slot0 = Hover::Slot(SlotRef::new(reg_pan(&reg), 0));
        assert_eq!(touch.visuals().highlight, Some(slot0));
    }

    fn reg_pan(reg: &HitRegistry) -> caseplan_core::PanId {
        match reg.targets_at(Point::new(1.0, 150.0)).last().map(|h| h.target) {
            Some(DropTarget::Pan { pan }) => pan.clone(),
            other => panic!("no pan at sample point: {other:?}"),
        }
    }

    #[test]
    fn release_drops_on_highlighted_target() {
        let (mut layout, catalog, reg) = scene();
        let pan = reg_pan(&reg);
        let mut touch = TouchDrag::new(TouchConfig::default());
        touch.touch_start(pool("p3"), Point::new(100.0, 100.0), Rect::new(90.0, 90.0, 40.0, 20.0));
        touch.touch_move(Point::new(30.0, 150.0), &reg);
        assert_eq!(
            touch.visuals().highlight,
            Some(Hover::Slot(SlotRef::new(pan.clone(), 1)))
        );
        let out = touch.touch_end(Point::new(30.0, 150.0), &reg, &mut LayoutSink::new(&mut layout, &catalog));
        assert!(out.is_applied());
        assert_eq!(layout.slot(&pan, 1), Ok(Some(&ProductId::new("p3"))));
        assert!(touch.visuals().is_clear());
        assert!(!touch.is_active());
    }

    #[test]
    fn pool_product_over_gap_inserts() {
        let (mut layout, catalog, reg) = scene();
        let mut touch = TouchDrag::new(TouchConfig::default());
        touch.touch_start(pool("p6"), Point::new(0.0, 300.0), Rect::default());
        touch.touch_move(Point::new(120.0, 50.0), &reg);
        assert_eq!(touch.visuals().highlight, Some(Hover::Gap(1)));
        let out = touch.touch_end(Point::new(120.0, 50.0), &reg, &mut LayoutSink::new(&mut layout, &catalog));
        assert!(out.is_applied());
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.pans()[1].slot(0), Some(&ProductId::new("p6")));
    }

    #[test]
    fn cancel_mid_gesture_changes_nothing() {
        let (layout, _, reg) = scene();
        let before = layout.clone();
        let mut touch = TouchDrag::new(TouchConfig::default());
        touch.touch_start(pool("p1"), Point::new(100.0, 100.0), Rect::new(90.0, 90.0, 40.0, 20.0));
        touch.touch_move(Point::new(30.0, 50.0), &reg);
        assert!(touch.visuals().highlight.is_some());
        assert!(touch.visuals().proxy.is_some());
        touch.touch_cancel();
        assert_eq!(layout, before);
        assert!(touch.visuals().is_clear());
        assert!(!touch.is_active());
    }
}
