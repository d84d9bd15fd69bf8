#![forbid(unsafe_code)]

//! Adjacent-pan color conflict scan.
//!
//! Read-only. Recompute after every committed edit to pans or products.

use std::fmt;

use crate::ids::{PanId, ProductId};
use crate::layout::CaseLayout;
use crate::product::{Catalog, ColorCategory};

/// Two warm-group products in neighbouring pans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorConflict {
    pub left_pan: PanId,
    pub right_pan: PanId,
    pub left_product: ProductId,
    pub right_product: ProductId,
    pub left_name: String,
    pub right_name: String,
    pub left_color: ColorCategory,
    pub right_color: ColorCategory,
}

impl fmt::Display for ColorConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" & \"{}\" adjacent — both {}/{}",
            self.left_name,
            self.right_name,
            self.left_color.label(),
            self.right_color.label()
        )
    }
}

/// Every warm-group pairing across adjacent pans, left to right.
///
/// Slots referencing products missing from `catalog` are ignored.
#[must_use]
pub fn check(layout: &CaseLayout, catalog: &Catalog) -> Vec<ColorConflict> {
    let mut out = Vec::new();
    for pair in layout.pans().windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        for a in left.products().filter_map(|id| catalog.get(id)) {
            if !a.color.is_warm_group() {
                continue;
            }
            for b in right.products().filter_map(|id| catalog.get(id)) {
                if b.color.is_warm_group() {
                    out.push(ColorConflict {
                        left_pan: left.id().clone(),
                        right_pan: right.id().clone(),
                        left_product: a.id.clone(),
                        right_product: b.id.clone(),
                        left_name: a.name.clone(),
                        right_name: b.name.clone(),
                        left_color: a.color,
                        right_color: b.color,
                    });
                }
            }
        }
    }
    out
}

/// Human-readable warnings for [`check`].
#[must_use]
pub fn warnings(layout: &CaseLayout, catalog: &Catalog) -> Vec<String> {
    check(layout, catalog).iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{DepthMode, Orientation};
    use crate::product::{ColorCategory, Product};

    fn catalog() -> Catalog {
        Catalog::from_products([
            Product::with_id("salmon", "Salmon").color(ColorCategory::Warm),
            Product::with_id("tuna", "Tuna").color(ColorCategory::Red),
            Product::with_id("cod", "Cod").color(ColorCategory::Cool),
        ])
    }

    fn case(products: &[&[&str]]) -> CaseLayout {
        let mut layout = CaseLayout::new(81);
        for slots in products {
            let depth = match slots.len() {
                1 => DepthMode::Full,
                2 => DepthMode::Half,
                _ => DepthMode::Third,
            };
            let id = layout.add_pan(6, depth, Orientation::Shallow).unwrap();
            for (i, p) in slots.iter().enumerate() {
                layout.assign_product(&id, i, ProductId::new(*p)).unwrap();
            }
        }
        layout
    }

    #[test]
    fn warm_next_to_red_is_flagged() {
        let w = warnings(&case(&[&["salmon"], &["tuna"]]), &catalog());
        assert_eq!(w, vec!["\"Salmon\" & \"Tuna\" adjacent — both Warm/Red"]);
    }

    #[test]
    fn warning_names_each_products_own_color() {
        let w = warnings(&case(&[&["tuna"], &["salmon"], &["salmon"]]), &catalog());
        assert_eq!(
            w,
            vec![
                "\"Tuna\" & \"Salmon\" adjacent — both Red/Warm",
                "\"Salmon\" & \"Salmon\" adjacent — both Warm/Warm",
            ]
        );
    }

    #[test]
    fn warm_next_to_cool_is_clean() {
        assert!(check(&case(&[&["salmon"], &["cod"], &["tuna"]]), &catalog()).is_empty());
    }

    #[test]
    fn split_pans_cross_every_product() {
        let found = check(&case(&[&["salmon", "tuna"], &["tuna", "cod"]]), &catalog());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn unknown_products_are_skipped() {
        assert!(check(&case(&[&["ghost"], &["salmon"]]), &catalog()).is_empty());
    }
}
