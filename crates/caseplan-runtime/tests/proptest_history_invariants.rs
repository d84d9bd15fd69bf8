#![forbid(unsafe_code)]

//! Property tests for session undo/redo.
//!
//! Validates, against a plain past/future model:
//! - Undo restores a layout deep-equal to the one before the edit.
//! - Redo restores the layout that was undone.
//! - A new edit after undo discards the redo branch.
//! - Only the configured number of undo steps is retained.
//! - Rejected and no-op edits never create history.

use proptest::prelude::*;

use caseplan_core::{CaseLayout, DepthMode, Orientation, PAN_WIDTHS, ProductId, Side};
use caseplan_runtime::{ConfirmPolicy, HistoryConfig, PlannerSession, SessionConfig};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { width: usize, depth: usize },
    Remove { pan: usize },
    Assign { pan: usize, slot: usize, product: usize },
    Clear { pan: usize, slot: usize },
    Width { pan: usize, width: usize },
    Depth { pan: usize, depth: usize },
    Flip { pan: usize },
    Reorder { pan: usize, target: usize, right: bool },
    CaseWidth(u32),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..4usize, 0..3usize).prop_map(|(width, depth)| Op::Add { width, depth }),
        1 => (0..8usize).prop_map(|pan| Op::Remove { pan }),
        3 => (0..8usize, 0..3usize, 0..11usize).prop_map(|(pan, slot, product)| Op::Assign { pan, slot, product }),
        1 => (0..8usize, 0..3usize).prop_map(|(pan, slot)| Op::Clear { pan, slot }),
        1 => (0..8usize, 0..4usize).prop_map(|(pan, width)| Op::Width { pan, width }),
        1 => (0..8usize, 0..3usize).prop_map(|(pan, depth)| Op::Depth { pan, depth }),
        1 => (0..8usize).prop_map(|pan| Op::Flip { pan }),
        1 => (0..8usize, 0..8usize, any::<bool>()).prop_map(|(pan, target, right)| Op::Reorder { pan, target, right }),
        1 => (0u32..160).prop_map(Op::CaseWidth),
        3 => Just(Op::Undo),
        2 => Just(Op::Redo),
    ]
}

fn depth(i: usize) -> DepthMode {
    DepthMode::ALL[i % DepthMode::ALL.len()]
}

/// Apply an edit, ignoring rejections and pending confirmations.
fn apply_edit(s: &mut PlannerSession, op: &Op) {
    let ids: Vec<_> = s.layout().pans().iter().map(|p| p.id().clone()).collect();
    let pick = |i: usize| ids.get(i % ids.len().max(1)).cloned();
    match *op {
        Op::Add { width, depth: d } => {
            let _ = s.add_pan(PAN_WIDTHS[width], depth(d), Orientation::Shallow);
        }
        Op::Remove { pan } => {
            if let Some(id) = pick(pan) {
                let _ = s.remove_pan(&id);
            }
        }
        Op::Assign { pan, slot, product } => {
            if let Some(id) = pick(pan) {
                let _ = s.assign_product(&id, slot, &ProductId::new(format!("p{}", product + 1)));
            }
        }
        Op::Clear { pan, slot } => {
            if let Some(id) = pick(pan) {
                let _ = s.clear_slot(&id, slot);
            }
        }
        Op::Width { pan, width } => {
            if let Some(id) = pick(pan) {
                let _ = s.set_pan_width(&id, PAN_WIDTHS[width]);
            }
        }
        Op::Depth { pan, depth: d } => {
            if let Some(id) = pick(pan) {
                let _ = s.set_pan_depth(&id, depth(d));
            }
        }
        Op::Flip { pan } => {
            if let Some(id) = pick(pan) {
                let o = s.layout().pan(&id).map(|p| p.orientation().toggled());
                if let Some(o) = o {
                    let _ = s.set_pan_orientation(&id, o);
                }
            }
        }
        Op::Reorder { pan, target, right } => {
            if let (Some(a), Some(b)) = (pick(pan), pick(target)) {
                let side = if right { Side::Right } else { Side::Left };
                let _ = s.reorder_pan(&a, &b, side);
            }
        }
        Op::CaseWidth(w) => {
            s.set_case_width(w);
        }
        Op::Undo | Op::Redo => {}
    }
}

fn session(max_depth: usize) -> PlannerSession {
    PlannerSession::new(
        SessionConfig::default()
            .with_history(HistoryConfig::new(max_depth))
            .with_policy(ConfirmPolicy::permissive()),
    )
}

// ============================================================================
// Model check
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn session_history_matches_model(
        ops in prop::collection::vec(op_strategy(), 1..80),
        max_depth in 1usize..25,
    ) {
        let mut s = session(max_depth);
        let mut past: Vec<CaseLayout> = Vec::new();
        let mut future: Vec<CaseLayout> = Vec::new();

        for op in &ops {
            match op {
                Op::Undo => {
                    let present = s.layout().clone();
                    match past.pop() {
                        Some(previous) => {
                            prop_assert!(s.undo());
                            prop_assert_eq!(s.layout(), &previous);
                            future.push(present);
                        }
                        None => prop_assert!(!s.undo()),
                    }
                }
                Op::Redo => {
                    let present = s.layout().clone();
                    match future.pop() {
                        Some(next) => {
                            prop_assert!(s.redo());
                            prop_assert_eq!(s.layout(), &next);
                            past.push(present);
                        }
                        None => prop_assert!(!s.redo()),
                    }
                }
                edit => {
                    let before = s.layout().clone();
                    apply_edit(&mut s, edit);
                    if s.layout() != &before {
                        past.push(before);
                        if past.len() > max_depth {
                            past.remove(0);
                        }
                        future.clear();
                    }
                }
            }
            prop_assert_eq!(s.can_undo(), !past.is_empty());
            prop_assert_eq!(s.can_redo(), !future.is_empty());
            prop_assert!(s.layout().check_invariants().is_ok());
        }
    }

    #[test]
    fn undo_all_then_redo_all_round_trips(
        ops in prop::collection::vec(op_strategy(), 1..40),
    ) {
        let mut s = session(usize::MAX - 1);
        let start = s.layout().clone();
        for op in &ops {
            apply_edit(&mut s, op);
        }
        let end = s.layout().clone();
        while s.undo() {}
        prop_assert_eq!(s.layout(), &start);
        while s.redo() {}
        prop_assert_eq!(s.layout(), &end);
    }
}

#[test]
fn default_history_keeps_twenty_steps() {
    let mut s = session(HistoryConfig::default().max_depth);
    for w in 1..=30 {
        s.set_case_width(100 + w);
    }
    let mut steps = 0;
    while s.undo() {
        steps += 1;
    }
    assert_eq!(steps, 20);
    assert_eq!(s.layout().case_width(), 110);
}
