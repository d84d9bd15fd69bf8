#![forbid(unsafe_code)]

//! Confirmation policy for destructive or case-expanding edits.
//!
//! Guarded session operations do not mutate straight away when they would
//! lose placements or grow the case. They return
//! [`Decision::NeedsConfirmation`] holding a [`PendingAction`]; the caller
//! shows [`PendingAction::prompt`] and either hands the action back to
//! [`PlannerSession::confirm`](crate::session::PlannerSession::confirm) or
//! drops it. Dropping is the cancel path and changes nothing.
//!
//! | Action | Guarded when |
//! |--------|--------------|
//! | remove pan | the pan holds at least one product |
//! | clear slot | the slot is occupied |
//! | clear all pans | the case has any pan |
//! | delete product | always |
//! | expand case | always (capacity conflict) |

use caseplan_core::{CapacityConflict, PanId, PendingChange, ProductId};

/// Which confirmations a session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmPolicy {
    /// Ask before removing a pan that holds products, clearing an occupied
    /// slot, clearing the case or deleting a product (default: true).
    pub confirm_destructive: bool,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
        }
    }
}

impl ConfirmPolicy {
    /// Never ask, except for capacity conflicts which always need a decision.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            confirm_destructive: false,
        }
    }
}

/// An edit waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    RemovePan { pan: PanId },
    ClearSlot { pan: PanId, slot: usize },
    ClearAll,
    DeleteProduct { product: ProductId, name: String },
    Expand(Box<CapacityConflict>),
}

impl PendingAction {
    /// Question to put to the user.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::RemovePan { .. } => "Remove this pan and the products in it?".into(),
            Self::ClearSlot { .. } => {
                "Remove product from this slot? Consider editing instead if this was a mistake."
                    .into()
            }
            Self::ClearAll => "Clear all pans from the case?".into(),
            Self::DeleteProduct { name, .. } => format!(
                "Delete \"{name}\"? This removes it from all pans. Consider editing instead."
            ),
            Self::Expand(conflict) => {
                let subject = match conflict.change() {
                    PendingChange::SetPanWidth { width, .. } => format!("a {width}-unit pan"),
                    PendingChange::InsertPan { pan, .. } => format!("a {}-unit pan", pan.width()),
                };
                format!(
                    "No room for {subject}: the case needs {} units but is {} wide. Expand the case to {}?",
                    conflict.required_width(),
                    conflict.case_width(),
                    conflict.expand_to()
                )
            }
        }
    }

    /// Label for the confirming button.
    #[must_use]
    pub fn confirm_label(&self) -> &'static str {
        match self {
            Self::RemovePan { .. } | Self::ClearSlot { .. } => "Remove",
            Self::ClearAll => "Clear",
            Self::DeleteProduct { .. } => "Delete",
            Self::Expand(_) => "Add & Expand",
        }
    }
}

/// Result of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Decision<T> {
    Done(T),
    NeedsConfirmation(PendingAction),
}

impl<T> Decision<T> {
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingAction> {
        match self {
            Self::NeedsConfirmation(action) => Some(action),
            Self::Done(_) => None,
        }
    }

    /// The completed value, if no confirmation was needed.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(v) => Some(v),
            Self::NeedsConfirmation(_) => None,
        }
    }
}

impl<T> From<CapacityConflict> for Decision<T> {
    fn from(conflict: CapacityConflict) -> Self {
        Self::NeedsConfirmation(PendingAction::Expand(Box::new(conflict)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseplan_core::{CaseLayout, DepthMode, LayoutError, Orientation};

    #[test]
    fn expand_prompt_names_the_target_width() {
        let mut layout = CaseLayout::new(10);
        let a = layout.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        layout.add_pan(3, DepthMode::Full, Orientation::Shallow).unwrap();
        let conflict = match layout.set_pan_width(&a, 12) {
            Err(LayoutError::CapacityConflict(c)) => *c,
            other => panic!("expected conflict, got {other:?}"),
        };
        let decision: Decision<()> = conflict.into();
        let action = decision.pending().unwrap();
        assert_eq!(action.confirm_label(), "Add & Expand");
        assert_eq!(
            action.prompt(),
            "No room for a 12-unit pan: the case needs 15 units but is 10 wide. Expand the case to 15?"
        );
    }

    #[test]
    fn delete_prompt_quotes_the_product() {
        let action = PendingAction::DeleteProduct {
            product: ProductId::new("p1"),
            name: "Atlantic Fillet".into(),
        };
        assert_eq!(
            action.prompt(),
            "Delete \"Atlantic Fillet\"? This removes it from all pans. Consider editing instead."
        );
    }

    #[test]
    fn decision_accessors() {
        let done: Decision<u8> = Decision::Done(3);
        assert!(done.is_done());
        assert_eq!(done.done(), Some(3));
        let pending: Decision<u8> = Decision::NeedsConfirmation(PendingAction::ClearAll);
        assert!(pending.pending().is_some());
        assert_eq!(pending.done(), None);
    }
}
