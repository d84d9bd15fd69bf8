#![forbid(unsafe_code)]

//! Demand-driven layout generation.
//!
//! Given selected products (each optionally on sale) and a case width,
//! propose a full replacement pan sequence:
//!
//! 1. Score each item: `demand + 4` when on sale, else `demand`.
//! 2. Stable sort by score, highest first.
//! 3. Pick a target width from the score: `>= 10` takes `max_pan`; `>= 7`
//!    takes the allowed width at index `min(len - 1, floor(len * 0.75))`
//!    between `min_pan` and `max_pan`; `>= 4` takes the middle one; anything
//!    lower takes `min_pan`.
//! 4. While the total exceeds the case, walk from the lowest score upwards
//!    and step each target down to the next smaller allowed width that is
//!    still at least `min_pan`.
//! 5. Alternate warm-group and other colors where possible.
//! 6. Keep the longest prefix of that arrangement that fits the case.
//! 7. Emit one full-depth pan per kept item, oriented by its depth
//!    preference.
//!
//! Structure is deterministic for a given input order. Pan ids are fresh.

use tracing::debug;

use crate::geometry::{self, Orientation};
use crate::ids::{PanId, ProductId};
use crate::layout::CaseLayout;
use crate::pan::Pan;
use crate::product::{Catalog, Product};

/// Score bonus for products on sale.
pub const SALE_BOOST: u32 = 4;

/// One selected product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandItem {
    pub product: ProductId,
    pub on_sale: bool,
}

impl DemandItem {
    #[must_use]
    pub fn new(product: impl Into<ProductId>) -> Self {
        Self {
            product: product.into(),
            on_sale: false,
        }
    }

    #[must_use]
    pub fn on_sale(mut self) -> Self {
        self.on_sale = true;
        self
    }
}

/// A product with its chosen width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub product: ProductId,
    pub score: u32,
    pub width: u32,
    pub warm: bool,
    pub orientation: Orientation,
}

/// Color-arranged assignments plus how many of them fit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    pub arranged: Vec<Assignment>,
    pub included: usize,
}

impl Plan {
    /// The prefix of [`Plan::arranged`] that fits the case.
    #[must_use]
    pub fn kept(&self) -> &[Assignment] {
        &self.arranged[..self.included]
    }

    #[must_use]
    pub fn total_width(&self) -> u32 {
        self.kept().iter().map(|a| a.width).sum()
    }
}

fn score(product: &Product, on_sale: bool) -> u32 {
    u32::from(product.demand) + if on_sale { SALE_BOOST } else { 0 }
}

fn target_width(product: &Product, score: u32) -> u32 {
    let sizes = geometry::widths_between(product.min_pan, product.max_pan);
    if score >= 10 {
        product.max_pan
    } else if score >= 7 {
        let idx = (sizes.len() * 3 / 4).min(sizes.len().saturating_sub(1));
        sizes.get(idx).copied().unwrap_or(product.max_pan)
    } else if score >= 4 {
        sizes.get(sizes.len() / 2).copied().unwrap_or(product.min_pan)
    } else {
        product.min_pan
    }
}

fn shrink(assignments: &mut [(Assignment, u32)], case_width: u32) {
    let mut total: u32 = assignments.iter().map(|(a, _)| a.width).sum();
    for (a, min_pan) in assignments.iter_mut().rev() {
        if total <= case_width {
            break;
        }
        let old = a.width;
        a.width = geometry::next_smaller_width(old, *min_pan).unwrap_or(*min_pan);
        total = total + a.width - old;
    }
}

fn alternate(mut pool: Vec<Assignment>) -> Vec<Assignment> {
    let mut arranged = Vec::with_capacity(pool.len());
    let mut last_warm = false;
    while !pool.is_empty() {
        let idx = pool.iter().position(|a| a.warm != last_warm).unwrap_or(0);
        let next = pool.remove(idx);
        last_warm = next.warm;
        arranged.push(next);
    }
    arranged
}

/// Run steps 1 to 6 without building pans.
///
/// Items naming products missing from `catalog` are skipped.
#[must_use]
pub fn plan(items: &[DemandItem], catalog: &Catalog, case_width: u32) -> Plan {
    let mut scored: Vec<(Assignment, u32)> = items
        .iter()
        .filter_map(|item| {
            let product = catalog.get(&item.product)?;
            let score = score(product, item.on_sale);
            Some((
                Assignment {
                    product: product.id.clone(),
                    score,
                    width: target_width(product, score),
                    warm: product.color.is_warm_group(),
                    orientation: product.depth_preference,
                },
                product.min_pan,
            ))
        })
        .collect();
    // `sort_by` is stable, so equal scores keep selection order.
    scored.sort_by(|(a, _), (b, _)| b.score.cmp(&a.score));
    shrink(&mut scored, case_width);

    let arranged = alternate(scored.into_iter().map(|(a, _)| a).collect());
    let mut used = 0u32;
    let included = arranged
        .iter()
        .take_while(|a| {
            if used + a.width <= case_width {
                used += a.width;
                true
            } else {
                false
            }
        })
        .count();
    Plan { arranged, included }
}

/// Generate the pan sequence for `items`.
#[must_use]
pub fn generate(items: &[DemandItem], catalog: &Catalog, case_width: u32) -> Vec<Pan> {
    let plan = plan(items, catalog, case_width);
    let mut pans: Vec<Pan> = Vec::with_capacity(plan.included);
    for a in plan.kept() {
        let id = PanId::fresh(pans.iter().map(Pan::id));
        match Pan::single(id, a.width, a.orientation, a.product.clone()) {
            Ok(pan) => pans.push(pan),
            Err(e) => debug!(product = %a.product, error = %e, "skipping generated pan"),
        }
    }
    debug!(
        selected = items.len(),
        arranged = plan.arranged.len(),
        kept = pans.len(),
        case_width,
        "layout generated"
    );
    pans
}

/// [`generate`] wrapped into a layout of `case_width`.
#[must_use]
pub fn generate_layout(items: &[DemandItem], catalog: &Catalog, case_width: u32) -> CaseLayout {
    let mut layout = CaseLayout::new(case_width);
    layout.pans = generate(items, catalog, case_width);
    layout
}
