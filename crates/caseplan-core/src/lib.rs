#![forbid(unsafe_code)]

//! Case layout engine for Case Planner.
//!
//! A case is an ordered run of pans. Each pan has an allowed width, may be
//! split front-to-back into two or three slots, and holds product ids
//! resolved through a [`Catalog`].
//!
//! - [`geometry`]: allowed widths, depth splits, slot labels
//! - [`layout`]: [`CaseLayout`] read model
//! - [`mutation`]: every structural edit, including capacity conflicts
//! - [`autogen`]: demand-driven layout proposal
//! - [`conflicts`]: adjacent warm-group color check

pub mod autogen;
pub mod conflicts;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod layout;
pub mod mutation;
pub mod pan;
pub mod product;

pub use autogen::{DemandItem, Plan};
pub use conflicts::ColorConflict;
pub use error::{LayoutError, LayoutResult};
pub use geometry::{
    CASE_DEPTH, DEFAULT_CASE_WIDTH, DepthMode, MAX_CASE_WIDTH, Orientation, PAN_WIDTHS,
};
pub use ids::{PanId, ProductId};
pub use layout::CaseLayout;
pub use mutation::{CapacityConflict, PendingChange, Side};
pub use pan::Pan;
pub use product::{
    Catalog, ColorCategory, CookState, PoolFilter, PoolSort, Product, ProductLabel, Species,
};
