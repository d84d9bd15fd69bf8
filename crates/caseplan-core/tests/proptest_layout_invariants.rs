#![forbid(unsafe_code)]

//! Property tests for [`CaseLayout`] invariants under random edit sequences.
//!
//! Validates:
//! - Slot count always matches depth mode; wide pans are always full depth.
//! - `add_pan` is a no-op when the width does not fit, else adds exactly `w`.
//! - Remove then re-add of the same pan shape restores used width.
//! - Deleting a product empties exactly the slots that held it.
//! - Reorder left then right leaves the moved pan just right of the target.
//! - Rejected edits leave the layout deep-equal to before.

use proptest::prelude::*;

use caseplan_core::{
    CaseLayout, DepthMode, LayoutError, Orientation, PAN_WIDTHS, PanId, ProductId, Side,
};

// ============================================================================
// Strategy helpers
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add(u32, DepthMode, Orientation),
    Remove(usize),
    SetWidth(usize, u32),
    SetDepth(usize, DepthMode),
    SetOrientation(usize, Orientation),
    SetSlotOrientation(usize, usize, Orientation),
    Assign(usize, usize, u8),
    Clear(usize, usize),
    Reorder(usize, usize, Side),
    DeleteProduct(u8),
    CaseWidth(u32),
    ClearAll,
}

fn width() -> impl Strategy<Value = u32> {
    prop::sample::select(PAN_WIDTHS.to_vec())
}

fn depth() -> impl Strategy<Value = DepthMode> {
    prop::sample::select(DepthMode::ALL.to_vec())
}

fn orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![Just(Orientation::Shallow), Just(Orientation::Deep)]
}

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Left), Just(Side::Right)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (width(), depth(), orientation()).prop_map(|(w, d, o)| Op::Add(w, d, o)),
        1 => (0usize..12).prop_map(Op::Remove),
        2 => (0usize..12, width()).prop_map(|(i, w)| Op::SetWidth(i, w)),
        2 => (0usize..12, depth()).prop_map(|(i, d)| Op::SetDepth(i, d)),
        1 => (0usize..12, orientation()).prop_map(|(i, o)| Op::SetOrientation(i, o)),
        1 => (0usize..12, 0usize..3, orientation()).prop_map(|(i, s, o)| Op::SetSlotOrientation(i, s, o)),
        3 => (0usize..12, 0usize..3, 0u8..5).prop_map(|(i, s, p)| Op::Assign(i, s, p)),
        1 => (0usize..12, 0usize..3).prop_map(|(i, s)| Op::Clear(i, s)),
        2 => (0usize..12, 0usize..12, side()).prop_map(|(a, b, s)| Op::Reorder(a, b, s)),
        1 => (0u8..5).prop_map(Op::DeleteProduct),
        1 => (0u32..200).prop_map(Op::CaseWidth),
        1 => Just(Op::ClearAll),
    ]
}

fn product(n: u8) -> ProductId {
    ProductId::new(format!("p{n}"))
}

fn pan_at(layout: &CaseLayout, i: usize) -> Option<PanId> {
    if layout.is_empty() {
        return None;
    }
    Some(layout.pans()[i % layout.len()].id().clone())
}

fn apply(layout: &mut CaseLayout, op: &Op) {
    let before = layout.clone();
    let result: Result<(), LayoutError> = match op {
        Op::Add(w, d, o) => layout.add_pan(*w, *d, *o).map(|_| ()),
        Op::Remove(i) => match pan_at(layout, *i) {
            Some(id) => layout.remove_pan(&id).map(|_| ()),
            None => Ok(()),
        },
        Op::SetWidth(i, w) => match pan_at(layout, *i) {
            Some(id) => match layout.set_pan_width(&id, *w) {
                Err(LayoutError::CapacityConflict(c)) => c.confirm(layout).map(|_| ()),
                other => other,
            },
            None => Ok(()),
        },
        Op::SetDepth(i, d) => match pan_at(layout, *i) {
            Some(id) => layout.set_pan_depth(&id, *d),
            None => Ok(()),
        },
        Op::SetOrientation(i, o) => match pan_at(layout, *i) {
            Some(id) => layout.set_pan_orientation(&id, *o),
            None => Ok(()),
        },
        Op::SetSlotOrientation(i, s, o) => match pan_at(layout, *i) {
            Some(id) => layout.set_slot_orientation(&id, *s, *o),
            None => Ok(()),
        },
        Op::Assign(i, s, p) => match pan_at(layout, *i) {
            Some(id) => layout.assign_product(&id, *s, product(*p)).map(|_| ()),
            None => Ok(()),
        },
        Op::Clear(i, s) => match pan_at(layout, *i) {
            Some(id) => layout.clear_slot(&id, *s).map(|_| ()),
            None => Ok(()),
        },
        Op::Reorder(a, b, s) => match (pan_at(layout, *a), pan_at(layout, *b)) {
            (Some(a), Some(b)) => layout.reorder_pan(&a, &b, *s).map(|_| ()),
            _ => Ok(()),
        },
        Op::DeleteProduct(p) => {
            layout.remove_product_references(&product(*p));
            Ok(())
        }
        Op::CaseWidth(w) => {
            layout.set_case_width(*w);
            Ok(())
        }
        Op::ClearAll => {
            layout.clear_all_pans();
            Ok(())
        }
    };
    if result.is_err() {
        assert_eq!(*layout, before, "rejected {op:?} mutated the layout");
    }
}

// ============================================================================
// Invariant 1: slot count and split rule hold after any edit sequence
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn invariants_hold_after_random_edits(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut layout = CaseLayout::new(81);
        for op in &ops {
            apply(&mut layout, op);
            prop_assert!(layout.check_invariants().is_ok(), "after {:?}: {:?}", op, layout.check_invariants());
            for pan in layout.pans() {
                prop_assert_eq!(pan.slot_count(), caseplan_core::geometry::slot_count(pan.depth()));
                if !caseplan_core::geometry::is_splittable(pan.width()) {
                    prop_assert_eq!(pan.depth(), DepthMode::Full);
                }
            }
        }
    }
}

// ============================================================================
// Invariant 2: add_pan accounting
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn add_pan_is_exact_or_noop(
        case_width in 1u32..=150,
        widths in prop::collection::vec(width(), 1..30),
    ) {
        let mut layout = CaseLayout::new(case_width);
        for w in widths {
            let before = layout.clone();
            let remaining = layout.remaining_width();
            match layout.add_pan(w, DepthMode::Full, Orientation::Shallow) {
                Ok(_) => {
                    prop_assert!(i64::from(w) <= remaining);
                    prop_assert_eq!(layout.used_width(), before.used_width() + w);
                }
                Err(_) => {
                    prop_assert!(i64::from(w) > remaining);
                    prop_assert_eq!(&layout, &before);
                }
            }
        }
    }

    #[test]
    fn remove_then_add_restores_used_width(
        widths in prop::collection::vec(width(), 1..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut layout = CaseLayout::new(150);
        for w in &widths {
            layout.add_pan(*w, DepthMode::Full, Orientation::Shallow).unwrap();
        }
        let used = layout.used_width();
        let victim = layout.pans()[pick.index(layout.len())].clone();
        layout.remove_pan(victim.id()).unwrap();
        layout.add_pan(victim.width(), victim.depth(), victim.orientation()).unwrap();
        prop_assert_eq!(layout.used_width(), used);
    }
}

// ============================================================================
// Invariant 3: product deletion empties exactly its slots
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn deleting_product_clears_only_its_slots(
        fills in prop::collection::vec(prop::collection::vec(prop::option::of(0u8..4), 3), 1..12),
        victim in 0u8..4,
    ) {
        let mut layout = CaseLayout::new(150);
        for slots in &fills {
            let id = layout.add_pan(3, DepthMode::Third, Orientation::Shallow).unwrap();
            for (i, p) in slots.iter().enumerate() {
                if let Some(p) = p {
                    layout.assign_product(&id, i, product(*p)).unwrap();
                }
            }
        }
        let before = layout.clone();
        let target = product(victim);
        let expected = before.placements(&target);
        prop_assert_eq!(layout.remove_product_references(&target), expected);
        for (old, new) in before.pans().iter().zip(layout.pans()) {
            for (a, b) in old.slots().iter().zip(new.slots()) {
                if a.as_ref() == Some(&target) {
                    prop_assert_eq!(b, &None);
                } else {
                    prop_assert_eq!(a, b);
                }
            }
        }
    }
}

// ============================================================================
// Invariant 4: reorder round trip
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn reorder_left_then_right_round_trips(
        n in 2usize..10,
        a in any::<prop::sample::Index>(),
        b in any::<prop::sample::Index>(),
    ) {
        let mut layout = CaseLayout::new(150);
        for _ in 0..n {
            layout.add_pan(3, DepthMode::Full, Orientation::Shallow).unwrap();
        }
        let a = layout.pans()[a.index(n)].id().clone();
        let b = layout.pans()[b.index(n)].id().clone();
        prop_assume!(a != b);
        let others: Vec<PanId> = layout
            .pans()
            .iter()
            .map(|p| p.id().clone())
            .filter(|id| *id != a)
            .collect();

        layout.reorder_pan(&a, &b, Side::Left).unwrap();
        let ia = layout.pan_index(&a).unwrap();
        prop_assert_eq!(ia + 1, layout.pan_index(&b).unwrap());

        layout.reorder_pan(&a, &b, Side::Right).unwrap();
        let ia = layout.pan_index(&a).unwrap();
        prop_assert_eq!(ia, layout.pan_index(&b).unwrap() + 1);

        let rest: Vec<PanId> = layout
            .pans()
            .iter()
            .map(|p| p.id().clone())
            .filter(|id| *id != a)
            .collect();
        prop_assert_eq!(rest, others);
    }
}
