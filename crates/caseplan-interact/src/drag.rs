#![forbid(unsafe_code)]

//! Drag-and-drop protocol shared by every input modality.
//!
//! [`DragSession`] is the state machine `Idle -> Dragging -> Idle`. Input
//! adapters ([`crate::pointer::PointerDrag`], [`crate::touch::TouchDrag`])
//! translate raw events into [`DragSession::begin`], [`DragSession::hover`],
//! [`DragSession::drop_on`] and [`DragSession::cancel`]; the effect of a drop
//! is decided here and applied through a [`DropSink`].
//!
//! # Drop table
//!
//! | payload        | hover               | effect                                 |
//! |----------------|---------------------|----------------------------------------|
//! | pool product   | slot                | assign                                 |
//! | pool product   | insert gap `i`      | insert pan from product at `i`         |
//! | pool product   | empty case          | insert pan from product at 0           |
//! | slot product   | slot                | swap with occupant, or move            |
//! | pan            | pan (left/right)    | reorder                                |
//!
//! # Invariants
//!
//! 1. Only pool-product drags accept insert gaps and the empty case.
//! 2. Pan drags only see whole pans; slots and gaps under them are ignored.
//! 3. A pan hovering itself, or a slot product over its own source slot, is
//!    never a candidate, so dropping there does nothing.
//! 4. Cancelling never calls the sink.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Outcome |
//! |---------|-------|---------|
//! | Drop with no candidate | Released over nothing droppable | `DropOutcome::NoOp` |
//! | Pan overflows case | Product's minimum width exceeds remaining width | `DropOutcome::NeedsConfirmation` |
//! | Sink rejects the edit | Target vanished between hover and drop | `DropOutcome::Rejected`, sink told to roll back |

use caseplan_core::{
    CapacityConflict, CaseLayout, Catalog, LayoutError, PanId, ProductId, Side,
};
use tracing::{debug, warn};

use crate::geometry::Point;
use crate::hit::{DropTarget, HitRegistry};

// ---------------------------------------------------------------------------
// Payload and hover
// ---------------------------------------------------------------------------

/// A slot position within the case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub pan: PanId,
    pub slot: usize,
}

impl SlotRef {
    #[must_use]
    pub fn new(pan: impl Into<PanId>, slot: usize) -> Self {
        Self {
            pan: pan.into(),
            slot,
        }
    }
}

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    /// An unplaced product from the pool.
    PoolProduct { product: ProductId },
    /// A product already placed in `source`.
    SlotProduct { product: ProductId, source: SlotRef },
    /// A whole pan being reordered.
    Pan { pan: PanId },
}

impl DragPayload {
    #[must_use]
    pub fn kind(&self) -> DragKind {
        match self {
            Self::PoolProduct { .. } => DragKind::PoolProduct,
            Self::SlotProduct { .. } => DragKind::SlotProduct,
            Self::Pan { .. } => DragKind::Pan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragKind {
    PoolProduct,
    SlotProduct,
    Pan,
}

/// A resolved drop candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hover {
    Slot(SlotRef),
    Gap(usize),
    EmptyCase,
    PanSide { pan: PanId, side: Side },
}

impl Hover {
    /// Resolve a registered target at `point`; pans split at their centre line.
    #[must_use]
    pub fn from_target(target: &DropTarget, rect_center_x: f32, point: Point) -> Self {
        match target {
            DropTarget::Slot { pan, slot } => Self::Slot(SlotRef::new(pan.clone(), *slot)),
            DropTarget::InsertGap { index } => Self::Gap(*index),
            DropTarget::EmptyCase => Self::EmptyCase,
            DropTarget::Pan { pan } => Self::PanSide {
                pan: pan.clone(),
                side: if point.x < rect_center_x {
                    Side::Left
                } else {
                    Side::Right
                },
            },
        }
    }
}

/// Whether `payload` may be dropped on `target` at all, ignoring self-drops.
#[must_use]
pub fn target_kind_accepted(payload: &DragPayload, target: &DropTarget) -> bool {
    match (payload, target) {
        (DragPayload::Pan { .. }, DropTarget::Pan { .. }) => true,
        (DragPayload::Pan { .. }, _) => false,
        (_, DropTarget::Slot { .. }) => true,
        (DragPayload::PoolProduct { .. }, DropTarget::InsertGap { .. } | DropTarget::EmptyCase) => {
            true
        }
        _ => false,
    }
}

/// Whether `hover` is a real candidate for `payload`.
#[must_use]
pub fn accepts(payload: &DragPayload, hover: &Hover) -> bool {
    match (payload, hover) {
        (DragPayload::Pan { pan }, Hover::PanSide { pan: target, .. }) => pan != target,
        (DragPayload::Pan { .. }, _) => false,
        (DragPayload::SlotProduct { source, .. }, Hover::Slot(target)) => source != target,
        (DragPayload::SlotProduct { .. }, _) => false,
        (DragPayload::PoolProduct { .. }, Hover::PanSide { .. }) => false,
        (DragPayload::PoolProduct { .. }, _) => true,
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Receiver of drop mutations.
///
/// `begin_drop` is called once before the first mutation of a drop and
/// `end_drop` once after, with `committed = false` when the drop failed
/// partway so the sink can restore what it had.
pub trait DropSink {
    fn slot_occupant(&self, slot: &SlotRef) -> Result<Option<ProductId>, LayoutError>;
    fn assign_product(&mut self, slot: &SlotRef, product: ProductId) -> Result<(), LayoutError>;
    fn clear_slot(&mut self, slot: &SlotRef) -> Result<(), LayoutError>;
    fn insert_pan_from_product(
        &mut self,
        product: &ProductId,
        index: usize,
    ) -> Result<PanId, LayoutError>;
    fn reorder_pan(&mut self, pan: &PanId, target: &PanId, side: Side) -> Result<bool, LayoutError>;

    fn begin_drop(&mut self) {}
    fn end_drop(&mut self, _committed: bool) {}
}

/// [`DropSink`] over a bare layout and the catalog used to size new pans.
#[derive(Debug)]
pub struct LayoutSink<'a> {
    pub layout: &'a mut CaseLayout,
    pub catalog: &'a Catalog,
    before: Option<CaseLayout>,
}

impl<'a> LayoutSink<'a> {
    pub fn new(layout: &'a mut CaseLayout, catalog: &'a Catalog) -> Self {
        Self {
            layout,
            catalog,
            before: None,
        }
    }
}

impl DropSink for LayoutSink<'_> {
    fn slot_occupant(&self, slot: &SlotRef) -> Result<Option<ProductId>, LayoutError> {
        self.layout.slot(&slot.pan, slot.slot).map(|p| p.cloned())
    }

    fn assign_product(&mut self, slot: &SlotRef, product: ProductId) -> Result<(), LayoutError> {
        self.layout.assign_product(&slot.pan, slot.slot, product).map(|_| ())
    }

    fn clear_slot(&mut self, slot: &SlotRef) -> Result<(), LayoutError> {
        self.layout.clear_slot(&slot.pan, slot.slot).map(|_| ())
    }

    fn insert_pan_from_product(
        &mut self,
        product: &ProductId,
        index: usize,
    ) -> Result<PanId, LayoutError> {
        let product = self
            .catalog
            .get(product)
            .ok_or_else(|| LayoutError::UnknownProduct(product.clone()))?;
        self.layout.insert_pan_from_product(product, index)
    }

    fn reorder_pan(&mut self, pan: &PanId, target: &PanId, side: Side) -> Result<bool, LayoutError> {
        self.layout.reorder_pan(pan, target, side)
    }

    fn begin_drop(&mut self) {
        self.before = Some(self.layout.clone());
    }

    fn end_drop(&mut self, committed: bool) {
        if let Some(before) = self.before.take()
            && !committed
        {
            *self.layout = before;
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What a drop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropEffect {
    Assigned(SlotRef),
    /// Product moved from `from` to `to`; `displaced` went back to `from`.
    Moved {
        from: SlotRef,
        to: SlotRef,
        displaced: Option<ProductId>,
    },
    PanInserted { pan: PanId, index: usize },
    PanReordered { pan: PanId },
}

/// Result of releasing a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Applied(DropEffect),
    /// Nothing droppable under the release point, or a self-drop.
    NoOp,
    /// The insert needs a wider case; confirm or drop the conflict.
    NeedsConfirmation(CapacityConflict),
    Rejected(LayoutError),
}

impl DropOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

// ---------------------------------------------------------------------------
// DragSession
// ---------------------------------------------------------------------------

/// Protocol state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        payload: DragPayload,
        hover: Option<Hover>,
    },
}

/// The drag state machine.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    #[must_use]
    pub fn payload(&self) -> Option<&DragPayload> {
        match &self.state {
            DragState::Dragging { payload, .. } => Some(payload),
            DragState::Idle => None,
        }
    }

    /// Current candidate, if any.
    #[must_use]
    pub fn candidate(&self) -> Option<&Hover> {
        match &self.state {
            DragState::Dragging { hover, .. } => hover.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Start dragging, replacing any drag already in progress.
    pub fn begin(&mut self, payload: DragPayload) {
        debug!(kind = ?payload.kind(), "drag started");
        self.state = DragState::Dragging {
            payload,
            hover: None,
        };
    }

    /// Offer a hover candidate; rejected candidates clear the hover.
    ///
    /// Returns the accepted candidate.
    pub fn hover(&mut self, candidate: Option<Hover>) -> Option<&Hover> {
        let DragState::Dragging { payload, hover } = &mut self.state else {
            return None;
        };
        *hover = candidate.filter(|h| accepts(payload, h));
        hover.as_ref()
    }

    /// Topmost acceptable candidate under `point`.
    #[must_use]
    pub fn resolve(&self, registry: &HitRegistry, point: Point) -> Option<Hover> {
        let payload = self.payload()?;
        let hit = registry.topmost_where(point, |t| target_kind_accepted(payload, t))?;
        let hover = Hover::from_target(hit.target, hit.rect.center().x, point);
        accepts(payload, &hover).then_some(hover)
    }

    /// Leave the dragging state without touching the layout.
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            debug!("drag cancelled");
        }
        self.state = DragState::Idle;
    }

    /// Release over the current candidate and apply the drop table.
    pub fn drop_on(&mut self, sink: &mut dyn DropSink) -> DropOutcome {
        let DragState::Dragging { payload, hover } = std::mem::take(&mut self.state) else {
            return DropOutcome::NoOp;
        };
        let Some(hover) = hover else {
            return DropOutcome::NoOp;
        };
        sink.begin_drop();
        let result = apply(&payload, &hover, sink);
        let outcome = match result {
            Ok(Some(effect)) => DropOutcome::Applied(effect),
            Ok(None) => DropOutcome::NoOp,
            Err(LayoutError::CapacityConflict(conflict)) => DropOutcome::NeedsConfirmation(*conflict),
            Err(e) => {
                warn!(error = %e, "drop rejected");
                DropOutcome::Rejected(e)
            }
        };
        sink.end_drop(outcome.is_applied());
        debug!(?outcome, "drop resolved");
        outcome
    }
}

/// Transient feedback an adapter wants drawn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragVisuals {
    /// Where the drag proxy is drawn, if one is shown.
    pub proxy: Option<crate::geometry::Rect>,
    /// The highlighted candidate.
    pub highlight: Option<Hover>,
}

impl DragVisuals {
    /// True when nothing is left on screen.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.proxy.is_none() && self.highlight.is_none()
    }

    pub fn clear(&mut self) {
        self.proxy = None;
        self.highlight = None;
    }
}

fn apply(
    payload: &DragPayload,
    hover: &Hover,
    sink: &mut dyn DropSink,
) -> Result<Option<DropEffect>, LayoutError> {
    let effect = match (payload, hover) {
        (DragPayload::PoolProduct { product }, Hover::Slot(slot)) => {
            sink.assign_product(slot, product.clone())?;
            DropEffect::Assigned(slot.clone())
        }
        (DragPayload::PoolProduct { product }, Hover::Gap(index)) => {
            let pan = sink.insert_pan_from_product(product, *index)?;
            DropEffect::PanInserted { pan, index: *index }
        }
        (DragPayload::PoolProduct { product }, Hover::EmptyCase) => {
            let pan = sink.insert_pan_from_product(product, 0)?;
            DropEffect::PanInserted { pan, index: 0 }
        }
        (DragPayload::SlotProduct { product, source }, Hover::Slot(target)) => {
            let displaced = sink.slot_occupant(target)?;
            sink.slot_occupant(source)?;
            sink.assign_product(target, product.clone())?;
            match &displaced {
                Some(other) => sink.assign_product(source, other.clone())?,
                None => sink.clear_slot(source)?,
            }
            DropEffect::Moved {
                from: source.clone(),
                to: target.clone(),
                displaced,
            }
        }
        (DragPayload::Pan { pan }, Hover::PanSide { pan: target, side }) => {
            if !sink.reorder_pan(pan, target, *side)? {
                return Ok(None);
            }
            DropEffect::PanReordered { pan: pan.clone() }
        }
        _ => return Ok(None),
    };
    Ok(Some(effect))
}
