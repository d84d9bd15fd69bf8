#![forbid(unsafe_code)]

//! Adapter for native pointer drag events.
//!
//! Native drag-and-drop delivers each `dragover` and `drop` to the element
//! under the pointer, so no scan is needed: the caller passes the target the
//! event fired on. The adapter keeps the insert indicator in step with the
//! protocol's candidate.

use caseplan_core::PanId;

use crate::drag::{
    DragPayload, DragSession, DragVisuals, DropOutcome, DropSink, Hover, target_kind_accepted,
};
use crate::geometry::{Point, Rect};
use crate::hit::{DropTarget, HitRegistry};

/// Native drag-event adapter.
#[derive(Debug, Clone, Default)]
pub struct PointerDrag {
    session: DragSession,
    visuals: DragVisuals,
}

impl PointerDrag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    #[must_use]
    pub fn visuals(&self) -> &DragVisuals {
        &self.visuals
    }

    /// Pan currently being dragged, for dimming its source.
    #[must_use]
    pub fn dragged_pan(&self) -> Option<&PanId> {
        match self.session.payload() {
            Some(DragPayload::Pan { pan }) => Some(pan),
            _ => None,
        }
    }

    /// `dragstart` on a product, slot or pan.
    pub fn drag_start(&mut self, payload: DragPayload) {
        self.visuals.clear();
        self.session.begin(payload);
    }

    /// `dragover` on `target`. Returns `true` when the element accepts the
    /// drop, i.e. the caller should allow it.
    pub fn drag_over(&mut self, target: &DropTarget, rect: Rect, point: Point) -> bool {
        let Some(payload) = self.session.payload() else {
            return false;
        };
        let candidate = target_kind_accepted(payload, target)
            .then(|| Hover::from_target(target, rect.center().x, point));
        let accepted = self.session.hover(candidate).cloned();
        let ok = accepted.is_some();
        self.visuals.highlight = accepted;
        ok
    }

    /// `dragover` resolved by scanning a registry instead of a delivered target.
    pub fn drag_over_at(&mut self, registry: &HitRegistry, point: Point) -> bool {
        let candidate = self.session.resolve(registry, point);
        let accepted = self.session.hover(candidate).cloned();
        let ok = accepted.is_some();
        self.visuals.highlight = accepted;
        ok
    }

    /// `dragleave`: the pointer left every accepting element.
    pub fn drag_leave(&mut self) {
        self.session.hover(None);
        self.visuals.highlight = None;
    }

    /// `drop` on the current candidate.
    pub fn drop(&mut self, sink: &mut dyn DropSink) -> DropOutcome {
        self.visuals.clear();
        self.session.drop_on(sink)
    }

    /// `dragend`: fires after `drop`, or alone when the drag was aborted.
    pub fn drag_end(&mut self) {
        self.session.cancel();
        self.visuals.clear();
    }
}
