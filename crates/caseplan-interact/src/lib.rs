#![forbid(unsafe_code)]

//! Drag-and-drop for Case Planner.
//!
//! One protocol core ([`drag::DragSession`]) decides what a drop means; two
//! thin adapters feed it: [`pointer::PointerDrag`] for native drag events and
//! [`touch::TouchDrag`] for touch gestures. Both resolve targets through the
//! same acceptance rules, so a gesture has the same effect in either
//! modality.

pub mod drag;
pub mod geometry;
pub mod hit;
pub mod pointer;
pub mod touch;

pub use drag::{
    DragKind, DragPayload, DragSession, DragState, DragVisuals, DropEffect, DropOutcome, DropSink,
    Hover, LayoutSink, SlotRef,
};
pub use geometry::{Point, Rect};
pub use hit::{DropTarget, Hit, HitRegistry};
pub use pointer::PointerDrag;
pub use touch::{TouchConfig, TouchDrag};
