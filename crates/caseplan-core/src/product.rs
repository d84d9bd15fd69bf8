#![forbid(unsafe_code)]

//! Products and the product catalog.
//!
//! Pans never own products; they hold [`ProductId`]s that resolve through a
//! [`Catalog`]. Products are edited by an outer collaborator (a product form)
//! and only enter the layout by reference.
//!
//! Field names serialize in the camelCase shape used by `.fishcase` files
//! (`plu`, `cookType`, `fishType`, `minPan`, `maxPan`, `deepShallow`), so a
//! catalog written by this crate loads in older planners and vice versa.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{self, Orientation};
use crate::ids::ProductId;

/// Maximum digits in a lookup code.
pub const LOOKUP_CODE_MAX_DIGITS: usize = 5;

/// Demand score bounds.
pub const DEMAND_MIN: u8 = 1;
pub const DEMAND_MAX: u8 = 10;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Color category, used only for adjacency-conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorCategory {
    Warm,
    #[default]
    Cool,
    Red,
}

impl ColorCategory {
    pub const ALL: [Self; 3] = [Self::Warm, Self::Cool, Self::Red];

    /// Colors that clash when placed in adjacent pans.
    #[must_use]
    pub const fn is_warm_group(self) -> bool {
        matches!(self, Self::Warm | Self::Red)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warm => "Warm",
            Self::Cool => "Cool",
            Self::Red => "Red",
        }
    }

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Warm => "warm",
            Self::Cool => "cool",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for ColorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the product is sold raw or cooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum CookState {
    Raw,
    Cooked,
    #[default]
    Unassigned,
}

/// Broad species grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Species {
    Finfish,
    Shellfish,
    #[default]
    Unassigned,
}

impl Species {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Finfish => "Finfish",
            Self::Shellfish => "Shellfish",
            Self::Unassigned => "Unassigned",
        }
    }
}

/// Descriptive label from the fixed label catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLabel {
    PreviouslyFrozen,
    Fresh,
    Msc,
    Wild,
    YellowRated,
    GreenRated,
    FarmRaised,
}

impl ProductLabel {
    pub const ALL: [Self; 7] = [
        Self::PreviouslyFrozen,
        Self::Fresh,
        Self::Msc,
        Self::Wild,
        Self::YellowRated,
        Self::GreenRated,
        Self::FarmRaised,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PreviouslyFrozen => "Previously Frozen",
            Self::Fresh => "Fresh",
            Self::Msc => "MSC",
            Self::Wild => "Wild",
            Self::YellowRated => "Yellow Rated",
            Self::GreenRated => "Green Rated",
            Self::FarmRaised => "Farm Raised",
        }
    }

    #[must_use]
    pub const fn abbr(self) -> &'static str {
        match self {
            Self::PreviouslyFrozen => "PF",
            Self::Fresh => "Fr",
            Self::Msc => "MSC",
            Self::Wild => "Wild",
            Self::YellowRated => "YR",
            Self::GreenRated => "GR",
            Self::FarmRaised => "Frm",
        }
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

fn default_min_pan() -> u32 {
    3
}

fn default_max_pan() -> u32 {
    8
}

fn default_demand() -> u8 {
    5
}

/// An item that can be placed into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Numeric lookup code; empty when the product has none.
    #[serde(default, rename = "plu")]
    pub lookup_code: String,
    #[serde(default)]
    pub color: ColorCategory,
    #[serde(default, rename = "cookType")]
    pub cook_state: CookState,
    #[serde(default, rename = "fishType")]
    pub species: Species,
    #[serde(default = "default_min_pan")]
    pub min_pan: u32,
    #[serde(default = "default_max_pan")]
    pub max_pan: u32,
    #[serde(default, rename = "deepShallow")]
    pub depth_preference: Orientation,
    #[serde(default = "default_demand")]
    pub demand: u8,
    #[serde(default)]
    pub preferred_position: String,
    #[serde(default)]
    pub labels: Vec<ProductLabel>,
}

impl Product {
    /// A product with a fresh id and the product form's defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ProductId::random(), name)
    }

    /// A product with the given id and the product form's defaults.
    #[must_use]
    pub fn with_id(id: impl Into<ProductId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lookup_code: String::new(),
            color: ColorCategory::Cool,
            cook_state: CookState::Unassigned,
            species: Species::Unassigned,
            min_pan: default_min_pan(),
            max_pan: default_max_pan(),
            depth_preference: Orientation::Shallow,
            demand: default_demand(),
            preferred_position: String::new(),
            labels: Vec::new(),
        }
    }

    #[must_use]
    pub fn color(mut self, color: ColorCategory) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn pan_range(mut self, min_pan: u32, max_pan: u32) -> Self {
        self.min_pan = min_pan;
        self.max_pan = max_pan;
        self
    }

    #[must_use]
    pub fn demand(mut self, demand: u8) -> Self {
        self.demand = demand;
        self
    }

    #[must_use]
    pub fn depth_preference(mut self, orientation: Orientation) -> Self {
        self.depth_preference = orientation;
        self
    }

    #[must_use]
    pub fn lookup_code(mut self, code: &str) -> Self {
        self.lookup_code = sanitize_lookup_code(code);
        self
    }

    #[must_use]
    pub fn species(mut self, species: Species) -> Self {
        self.species = species;
        self
    }

    #[must_use]
    pub fn cook_state(mut self, cook_state: CookState) -> Self {
        self.cook_state = cook_state;
        self
    }

    #[must_use]
    pub fn preferred_position(mut self, hint: impl Into<String>) -> Self {
        self.preferred_position = hint.into();
        self
    }

    #[must_use]
    pub fn label(mut self, label: ProductLabel) -> Self {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
        self
    }

    /// Lookup code, if the product has one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        (!self.lookup_code.is_empty()).then_some(self.lookup_code.as_str())
    }

    /// Clamp fields into their documented ranges.
    ///
    /// Demand is clamped to 1..=10, pan bounds snap to allowed widths with
    /// `min_pan <= max_pan`, the lookup code keeps at most five digits, and
    /// duplicate labels are dropped.
    pub fn normalize(&mut self) {
        self.demand = self.demand.clamp(DEMAND_MIN, DEMAND_MAX);
        self.lookup_code = sanitize_lookup_code(&self.lookup_code);
        self.min_pan = snap_width(self.min_pan);
        self.max_pan = snap_width(self.max_pan);
        if self.max_pan < self.min_pan {
            self.max_pan = self.min_pan;
        }
        let mut seen = Vec::with_capacity(self.labels.len());
        self.labels.retain(|l| {
            if seen.contains(l) {
                false
            } else {
                seen.push(*l);
                true
            }
        });
    }
}

/// Keep digits only, at most [`LOOKUP_CODE_MAX_DIGITS`].
#[must_use]
pub fn sanitize_lookup_code(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(LOOKUP_CODE_MAX_DIGITS)
        .collect()
}

fn snap_width(width: u32) -> u32 {
    if geometry::is_allowed_width(width) {
        return width;
    }
    geometry::PAN_WIDTHS
        .iter()
        .copied()
        .find(|w| *w >= width)
        .unwrap_or(geometry::PAN_WIDTHS[geometry::PAN_WIDTHS.len() - 1])
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Sort order for the product pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolSort {
    #[default]
    Name,
    /// Highest demand first.
    Demand,
    Color,
    Species,
}

/// Filter for browsing the catalog as an unplaced-product pool.
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    /// Case-insensitive substring of the name, or substring of the lookup code.
    pub search: String,
    pub color: Option<ColorCategory>,
    pub cook_state: Option<CookState>,
    pub species: Option<Species>,
    pub depth_preference: Option<Orientation>,
    pub sort: PoolSort,
}

impl PoolFilter {
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let search = self.search.trim();
        if !search.is_empty() {
            let needle = search.to_lowercase();
            let by_name = product.name.to_lowercase().contains(&needle);
            let by_code = product.lookup_code.contains(search);
            if !by_name && !by_code {
                return false;
            }
        }
        self.color.is_none_or(|c| product.color == c)
            && self.cook_state.is_none_or(|c| product.cook_state == c)
            && self.species.is_none_or(|s| product.species == s)
            && self.depth_preference.is_none_or(|d| product.depth_preference == d)
    }

    fn compare(&self, a: &Product, b: &Product) -> Ordering {
        match self.sort {
            PoolSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            PoolSort::Demand => b.demand.cmp(&a.demand),
            PoolSort::Color => a.color.key().cmp(b.color.key()),
            PoolSort::Species => a.species.as_str().cmp(b.species.as_str()),
        }
    }
}

/// Ordered collection of products keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog, keeping the first product for any repeated id.
    /// Every product is normalized on the way in.
    #[must_use]
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::new();
        catalog.merge(products);
        catalog
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == *id)
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.get(id).is_some()
    }

    /// Insert or replace by id. Returns `true` when the product was new.
    pub fn upsert(&mut self, mut product: Product) -> bool {
        product.normalize();
        match self.products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => {
                *existing = product;
                false
            }
            None => {
                self.products.push(product);
                true
            }
        }
    }

    /// Remove a product from the catalog.
    ///
    /// Slot references are not touched here; the owning session cascades
    /// the delete into the layout.
    pub fn remove(&mut self, id: &ProductId) -> Option<Product> {
        let idx = self.products.iter().position(|p| p.id == *id)?;
        Some(self.products.remove(idx))
    }

    /// Add products whose ids are not already present, normalized. Returns
    /// how many were added.
    pub fn merge(&mut self, products: impl IntoIterator<Item = Product>) -> usize {
        let mut added = 0;
        for mut product in products {
            if !self.contains(&product.id) {
                product.normalize();
                self.products.push(product);
                added += 1;
            }
        }
        added
    }

    /// Filtered and sorted view for the product pool.
    #[must_use]
    pub fn pool(&self, filter: &PoolFilter) -> Vec<&Product> {
        let mut out: Vec<&Product> = self.products.iter().filter(|p| filter.matches(p)).collect();
        out.sort_by(|a, b| filter.compare(a, b));
        out
    }

    /// The built-in starter catalog.
    #[must_use]
    pub fn starter() -> Self {
        use ColorCategory::{Cool, Warm};
        let finfish = |id: &str, name: &str, code: &str, color, min, max, demand, hint: &str| {
            Product::with_id(id, name)
                .lookup_code(code)
                .color(color)
                .cook_state(CookState::Raw)
                .species(Species::Finfish)
                .pan_range(min, max)
                .demand(demand)
                .preferred_position(hint)
        };
        Self {
            products: vec![
                finfish("p1", "Atlantic Fillet", "92003", Warm, 6, 12, 9, "2-3 pans from left"),
                finfish("p2", "Atlantic Centers", "12969", Warm, 6, 6, 6, "2-3 pans from right"),
                finfish("p3", "King Salmon", "96120", Warm, 3, 8, 7, ""),
                finfish("p4", "Sockeye Salmon", "92034", Warm, 6, 12, 6, ""),
                finfish("p5", "Cod", "94717", Cool, 6, 8, 7, ""),
                finfish("p6", "Halibut", "92107", Cool, 3, 6, 5, ""),
                finfish("p7", "Catfish", "92028", Cool, 3, 8, 6, ""),
                finfish("p8", "Orange Roughy", "99254", Cool, 3, 6, 4, ""),
                finfish("p9", "Chilean Seabass", "92012", Cool, 3, 6, 5, "Far right, next to swordfish/tuna"),
                finfish("p10", "Whitefish", "92110", Cool, 3, 6, 3, ""),
                finfish("p11", "Dover Sole", "99249", Cool, 3, 6, 4, ""),
            ],
        }
    }
}

impl FromIterator<Product> for Catalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self::from_products(iter)
    }
}
