#![forbid(unsafe_code)]

//! The planner session: the one owner and mutator of planner state.
//!
//! [`PlannerSession`] wraps the layout engine with everything an editing
//! surface needs around it:
//!
//! - every successful layout edit is recorded in a bounded
//!   [`SnapshotStore`], so undo and redo restore whole layouts;
//! - guarded edits go through the [`ConfirmPolicy`] and may come back as
//!   [`Decision::NeedsConfirmation`];
//! - every change is written through to the [`StorageBackend`], if any.
//!
//! # Invariants
//!
//! 1. Outside a drop, the layout equals the history's present snapshot,
//!    less any slots naming products deleted since it was recorded.
//! 2. A rejected or unconfirmed edit changes neither layout nor history.
//! 3. A drop that mutates several slots is one undo step.
//! 4. A new edit after undo discards the redo branch.
//! 5. Every filled slot names a product in the catalog. Product deletes
//!    are not undone, so undo, redo and whole-layout loads clear slots
//!    naming products that are gone.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Layout rule violated | `Err(SessionError::Layout)`, state untouched |
//! | Capacity conflict | `Decision::NeedsConfirmation(PendingAction::Expand)` |
//! | Storage write fails | `warn!`, in-memory state kept |
//! | Invalid case file | `Err(SessionError::CaseFile)`, state untouched |

use std::fmt;

use tracing::{debug, info, warn};

use caseplan_core::autogen::{self, DemandItem};
use caseplan_core::conflicts::{self, ColorConflict};
use caseplan_core::{
    CaseLayout, Catalog, DepthMode, LayoutError, LayoutResult, MAX_CASE_WIDTH, Orientation, PanId,
    PoolFilter, Product, ProductId, Side,
};
use caseplan_interact::{DropSink, SlotRef};

use crate::case_file::CaseFile;
use crate::error::{SessionError, SessionResult};
use crate::persistence::{
    self, PersistedState, StorageBackend, StorageKeys, save_catalog, save_layout, save_saved,
};
use crate::policy::{ConfirmPolicy, Decision, PendingAction};
use crate::saved::{SavedLayout, SavedLayouts};
use crate::share::{self, NewShare, ShareBackend, SharedLayout};
use crate::undo::{HistoryConfig, SnapshotStore};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub history: HistoryConfig,
    pub keys: StorageKeys,
    pub policy: ConfirmPolicy,
}

impl SessionConfig {
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_keys(mut self, keys: StorageKeys) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.policy = policy;
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct PlannerSession {
    config: SessionConfig,
    layout: CaseLayout,
    catalog: Catalog,
    saved: SavedLayouts,
    history: SnapshotStore<CaseLayout>,
    storage: Option<Box<dyn StorageBackend>>,
    // Layout as it was when the current drop began.
    drop_base: Option<CaseLayout>,
}

impl fmt::Debug for PlannerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlannerSession")
            .field("pans", &self.layout.len())
            .field("case_width", &self.layout.case_width())
            .field("products", &self.catalog.len())
            .field("saved", &self.saved.len())
            .field("history", &self.history)
            .field("storage", &self.storage.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Default for PlannerSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl PlannerSession {
    /// Session with the default catalog and an empty case, not persisted.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::from_state(config, PersistedState::default(), None)
    }

    /// Session restored from `storage`, writing every change back to it.
    #[must_use]
    pub fn open(config: SessionConfig, storage: Box<dyn StorageBackend>) -> Self {
        let state = persistence::load_state(storage.as_ref(), &config.keys);
        Self::from_state(config, state, Some(storage))
    }

    /// Session over explicit state, not persisted.
    #[must_use]
    pub fn with_state(config: SessionConfig, state: PersistedState) -> Self {
        Self::from_state(config, state, None)
    }

    fn from_state(
        config: SessionConfig,
        state: PersistedState,
        storage: Option<Box<dyn StorageBackend>>,
    ) -> Self {
        let history = SnapshotStore::with_initial(config.history.clone(), state.layout.clone());
        Self {
            config,
            layout: state.layout,
            catalog: state.catalog,
            saved: state.saved,
            history,
            storage,
            drop_base: None,
        }
    }

    // ====================================================================
    // Read model
    // ====================================================================

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> &CaseLayout {
        &self.layout
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn saved(&self) -> &SavedLayouts {
        &self.saved
    }

    /// Case width minus the sum of pan widths. Negative means overfull.
    #[must_use]
    pub fn remaining_width(&self) -> i64 {
        self.layout.remaining_width()
    }

    #[must_use]
    pub fn conflicts(&self) -> Vec<ColorConflict> {
        conflicts::check(&self.layout, &self.catalog)
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        conflicts::warnings(&self.layout, &self.catalog)
    }

    /// Products for the pool sidebar.
    #[must_use]
    pub fn pool(&self, filter: &PoolFilter) -> Vec<&Product> {
        self.catalog.pool(filter)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ====================================================================
    // History
    // ====================================================================

    /// Restore the layout before the last edit. Returns `false` when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.undo() else {
            return false;
        };
        self.layout = (*previous).clone();
        self.clear_deleted_products();
        debug!(
            undo_steps = self.history.undo_steps(),
            redo_steps = self.history.redo_steps(),
            "undo"
        );
        self.persist_layout();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.redo() else {
            return false;
        };
        self.layout = (*next).clone();
        self.clear_deleted_products();
        debug!(
            undo_steps = self.history.undo_steps(),
            redo_steps = self.history.redo_steps(),
            "redo"
        );
        self.persist_layout();
        true
    }

    /// Empty slots whose product is no longer in the catalog.
    fn clear_deleted_products(&mut self) {
        let mut gone: Vec<ProductId> = self
            .layout
            .products_in_use()
            .into_iter()
            .filter(|id| !self.catalog.contains(id))
            .cloned()
            .collect();
        gone.sort();
        gone.dedup();
        for id in &gone {
            self.layout.remove_product_references(id);
        }
    }

    /// Record the layout as a new history step if it differs from the
    /// present snapshot, then persist it.
    fn commit(&mut self) {
        if self.history.current().is_some_and(|c| **c == self.layout) {
            return;
        }
        self.history.push(self.layout.clone());
        self.persist_layout();
    }

    fn edit<T>(&mut self, op: impl FnOnce(&mut CaseLayout) -> LayoutResult<T>) -> SessionResult<T> {
        let out = op(&mut self.layout)?;
        self.commit();
        Ok(out)
    }

    /// Like [`edit`](Self::edit) but a capacity conflict becomes a pending
    /// expansion instead of an error.
    fn edit_or_expand<T>(
        &mut self,
        op: impl FnOnce(&mut CaseLayout) -> LayoutResult<T>,
    ) -> SessionResult<Decision<T>> {
        match op(&mut self.layout) {
            Ok(out) => {
                self.commit();
                Ok(Decision::Done(out))
            }
            Err(LayoutError::CapacityConflict(conflict)) => {
                debug!(
                    required = conflict.required_width(),
                    case_width = conflict.case_width(),
                    "edit needs case expansion"
                );
                Ok(Decision::NeedsConfirmation(PendingAction::Expand(conflict)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn guard(&self, destructive: bool) -> bool {
        destructive && self.config.policy.confirm_destructive
    }

    // ====================================================================
    // Layout edits
    // ====================================================================

    pub fn add_pan(
        &mut self,
        width: u32,
        depth: DepthMode,
        orientation: Orientation,
    ) -> SessionResult<PanId> {
        self.edit(|l| l.add_pan(width, depth, orientation))
    }

    /// Remove a pan; asks first when it holds products.
    pub fn remove_pan(&mut self, id: &PanId) -> SessionResult<Decision<()>> {
        let pan = self
            .layout
            .pan(id)
            .ok_or_else(|| LayoutError::UnknownPan(id.clone()))?;
        if self.guard(!pan.is_empty()) {
            return Ok(Decision::NeedsConfirmation(PendingAction::RemovePan {
                pan: id.clone(),
            }));
        }
        self.edit(|l| l.remove_pan(id).map(|_| ()))?;
        Ok(Decision::Done(()))
    }

    pub fn set_pan_orientation(&mut self, id: &PanId, orientation: Orientation) -> SessionResult<()> {
        self.edit(|l| l.set_pan_orientation(id, orientation))
    }

    pub fn set_slot_orientation(
        &mut self,
        id: &PanId,
        slot: usize,
        orientation: Orientation,
    ) -> SessionResult<()> {
        self.edit(|l| l.set_slot_orientation(id, slot, orientation))
    }

    pub fn set_pan_width(&mut self, id: &PanId, width: u32) -> SessionResult<Decision<()>> {
        self.edit_or_expand(|l| l.set_pan_width(id, width))
    }

    pub fn set_pan_depth(&mut self, id: &PanId, depth: DepthMode) -> SessionResult<()> {
        self.edit(|l| l.set_pan_depth(id, depth))
    }

    /// Place a catalog product into a slot. Returns the displaced product.
    pub fn assign_product(
        &mut self,
        id: &PanId,
        slot: usize,
        product: &ProductId,
    ) -> SessionResult<Option<ProductId>> {
        if !self.catalog.contains(product) {
            return Err(LayoutError::UnknownProduct(product.clone()).into());
        }
        self.edit(|l| l.assign_product(id, slot, product.clone()))
    }

    /// Empty a slot; asks first when it is occupied.
    pub fn clear_slot(&mut self, id: &PanId, slot: usize) -> SessionResult<Decision<Option<ProductId>>> {
        let occupied = self.layout.slot(id, slot)?.is_some();
        if self.guard(occupied) {
            return Ok(Decision::NeedsConfirmation(PendingAction::ClearSlot {
                pan: id.clone(),
                slot,
            }));
        }
        self.edit(|l| l.clear_slot(id, slot)).map(Decision::Done)
    }

    /// Insert a pan sized for `product` at `index`.
    pub fn insert_pan_from_product(
        &mut self,
        product: &ProductId,
        index: usize,
    ) -> SessionResult<Decision<PanId>> {
        let product = self
            .catalog
            .get(product)
            .ok_or_else(|| LayoutError::UnknownProduct(product.clone()))?
            .clone();
        self.edit_or_expand(|l| l.insert_pan_from_product(&product, index))
    }

    pub fn reorder_pan(&mut self, id: &PanId, target: &PanId, side: Side) -> SessionResult<bool> {
        self.edit(|l| l.reorder_pan(id, target, side))
    }

    pub fn clear_all_pans(&mut self) -> Decision<()> {
        if self.guard(!self.layout.is_empty()) {
            return Decision::NeedsConfirmation(PendingAction::ClearAll);
        }
        self.layout.clear_all_pans();
        self.commit();
        Decision::Done(())
    }

    /// Set the case width, clamped to fit the pans and the maximum case.
    /// Returns the applied width.
    pub fn set_case_width(&mut self, width: u32) -> u32 {
        let applied = self.layout.set_case_width(width);
        self.commit();
        applied
    }

    /// Carry out a confirmed action.
    ///
    /// # Errors
    ///
    /// Whatever the underlying edit returns if the layout changed since the
    /// action was issued (for example the pan is gone).
    pub fn confirm(&mut self, action: PendingAction) -> SessionResult<()> {
        debug!(?action, "action confirmed");
        match action {
            PendingAction::RemovePan { pan } => self.edit(|l| l.remove_pan(&pan).map(|_| ())),
            PendingAction::ClearSlot { pan, slot } => self.edit(|l| l.clear_slot(&pan, slot).map(|_| ())),
            PendingAction::ClearAll => {
                self.layout.clear_all_pans();
                self.commit();
                Ok(())
            }
            PendingAction::DeleteProduct { product, .. } => self.delete_product_now(&product).map(|_| ()),
            PendingAction::Expand(conflict) => self.edit(|l| (*conflict).confirm(l).map(|_| ())),
        }
    }

    // ====================================================================
    // Catalog
    // ====================================================================

    /// Add or replace a product. Returns `true` if it is new.
    pub fn upsert_product(&mut self, product: Product) -> bool {
        let added = self.catalog.upsert(product);
        self.persist_catalog();
        added
    }

    /// Delete a product from the catalog and every slot; always asks first
    /// unless the policy is permissive.
    pub fn delete_product(&mut self, id: &ProductId) -> SessionResult<Decision<usize>> {
        let product = self
            .catalog
            .get(id)
            .ok_or_else(|| LayoutError::UnknownProduct(id.clone()))?;
        if self.guard(true) {
            return Ok(Decision::NeedsConfirmation(PendingAction::DeleteProduct {
                product: id.clone(),
                name: product.name.clone(),
            }));
        }
        self.delete_product_now(id).map(Decision::Done)
    }

    fn delete_product_now(&mut self, id: &ProductId) -> SessionResult<usize> {
        if self.catalog.remove(id).is_none() {
            return Err(LayoutError::UnknownProduct(id.clone()).into());
        }
        let cleared = self.layout.remove_product_references(id);
        self.commit();
        self.persist_catalog();
        info!(product = %id, cleared, "product deleted");
        Ok(cleared)
    }

    // ====================================================================
    // Generation and whole-layout loads
    // ====================================================================

    /// Replace the case with an auto-generated one of `case_width`
    /// (clamped to `1..=MAX_CASE_WIDTH`). Returns the number of pans.
    pub fn generate(&mut self, items: &[DemandItem], case_width: u32) -> usize {
        let case_width = case_width.clamp(1, MAX_CASE_WIDTH);
        let generated = autogen::generate_layout(items, &self.catalog, case_width);
        let pans = generated.len();
        self.layout.replace(generated);
        self.commit();
        info!(selected = items.len(), pans, case_width, "case generated");
        pans
    }

    fn load_layout(&mut self, layout: CaseLayout) {
        self.layout.replace(layout);
        self.clear_deleted_products();
        self.commit();
    }

    // ====================================================================
    // Saved layouts
    // ====================================================================

    /// Save the working layout under `name`. Returns its index.
    pub fn save_current(&mut self, name: &str) -> SessionResult<usize> {
        let index = self.saved.append(SavedLayout::capture(name, &self.layout))?;
        self.persist_saved();
        Ok(index)
    }

    pub fn load_saved(&mut self, index: usize) -> SessionResult<()> {
        let layout = self
            .saved
            .get(index)
            .ok_or(SessionError::UnknownSavedLayout { index })?
            .to_layout()?;
        self.load_layout(layout);
        info!(index, "saved layout loaded");
        Ok(())
    }

    /// Overwrite saved entry `index` with the working layout.
    pub fn update_saved(&mut self, index: usize) -> SessionResult<()> {
        self.saved.update(index, &self.layout)?;
        self.persist_saved();
        Ok(())
    }

    pub fn rename_saved(&mut self, index: usize, name: &str) -> SessionResult<()> {
        self.saved.rename(index, name)?;
        self.persist_saved();
        Ok(())
    }

    pub fn delete_saved(&mut self, index: usize) -> SessionResult<SavedLayout> {
        let removed = self.saved.delete(index)?;
        self.persist_saved();
        Ok(removed)
    }

    // ====================================================================
    // Case files
    // ====================================================================

    #[must_use]
    pub fn export_current(&self, name: &str) -> CaseFile {
        CaseFile::export_current(name, &self.layout, &self.catalog)
    }

    pub fn export_saved(&self, index: usize) -> SessionResult<CaseFile> {
        let saved = self
            .saved
            .get(index)
            .ok_or(SessionError::UnknownSavedLayout { index })?;
        Ok(CaseFile::export(saved, &self.catalog))
    }

    /// Import a `.fishcase` document as a new saved layout, adding any
    /// products not already in the catalog. Returns the saved index.
    ///
    /// # Errors
    ///
    /// [`SessionError::CaseFile`] with the first validation failure; the
    /// session is unchanged.
    pub fn import_case_file(&mut self, text: &str) -> SessionResult<usize> {
        let file = self.parse_case_file(text)?;
        self.merge_products(file.products.iter().cloned());
        let index = self.saved.append(file.to_saved_layout())?;
        self.persist_saved();
        info!(name = %file.case.name, index, "case file imported");
        Ok(index)
    }

    /// Open a `.fishcase` document straight into the working layout.
    pub fn open_case_file(&mut self, text: &str) -> SessionResult<()> {
        let file = self.parse_case_file(text)?;
        let layout = file.layout()?;
        self.merge_products(file.products.iter().cloned());
        self.load_layout(layout);
        info!(name = %file.case.name, "case file opened");
        Ok(())
    }

    fn parse_case_file(&self, text: &str) -> SessionResult<CaseFile> {
        CaseFile::parse(text).map_err(|e| {
            warn!(error = %e, "case file rejected");
            e.into()
        })
    }

    fn merge_products(&mut self, products: impl IntoIterator<Item = Product>) {
        let added = self.catalog.merge(products);
        if added > 0 {
            debug!(added, "products merged into catalog");
            self.persist_catalog();
        }
    }

    // ====================================================================
    // Sharing
    // ====================================================================

    /// Publish the working layout.
    pub fn publish(
        &self,
        backend: &dyn ShareBackend,
        name: &str,
        author: &str,
    ) -> SessionResult<SharedLayout> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        let share = NewShare::from_layout(name, author, &self.layout, &self.catalog);
        Ok(share::publish(backend, &share)?)
    }

    /// Load a published layout, adding its products to the catalog.
    pub fn load_shared(&mut self, shared: &SharedLayout) -> SessionResult<()> {
        let layout = shared.layout()?;
        self.merge_products(shared.products.iter().cloned());
        self.load_layout(layout);
        info!(code = %shared.short_code, "shared layout loaded");
        Ok(())
    }

    /// Fetch by user-typed code and load it.
    pub fn load_share_code(&mut self, backend: &dyn ShareBackend, code: &str) -> SessionResult<SharedLayout> {
        let shared = share::fetch(backend, code)?;
        self.load_shared(&shared)?;
        Ok(shared)
    }

    // ====================================================================
    // Persistence
    // ====================================================================

    /// Write everything to storage, reporting the first failure.
    pub fn flush(&self) -> SessionResult<()> {
        if let Some(storage) = &self.storage {
            let keys = &self.config.keys;
            save_catalog(storage.as_ref(), keys, &self.catalog)?;
            save_layout(storage.as_ref(), keys, &self.layout)?;
            save_saved(storage.as_ref(), keys, &self.saved)?;
            info!(backend = storage.name(), "planner state saved");
        }
        Ok(())
    }

    fn persist_layout(&self) {
        if let Some(storage) = &self.storage
            && let Err(e) = save_layout(storage.as_ref(), &self.config.keys, &self.layout)
        {
            warn!(backend = storage.name(), error = %e, "failed to persist layout");
        }
    }

    fn persist_catalog(&self) {
        if let Some(storage) = &self.storage
            && let Err(e) = save_catalog(storage.as_ref(), &self.config.keys, &self.catalog)
        {
            warn!(backend = storage.name(), error = %e, "failed to persist catalog");
        }
    }

    fn persist_saved(&self) {
        if let Some(storage) = &self.storage
            && let Err(e) = save_saved(storage.as_ref(), &self.config.keys, &self.saved)
        {
            warn!(backend = storage.name(), error = %e, "failed to persist saved layouts");
        }
    }
}

// ---------------------------------------------------------------------------
// Drops
// ---------------------------------------------------------------------------

/// Drops mutate the live layout directly; the whole drop is committed as
/// one history step in `end_drop`, or rolled back.
impl DropSink for PlannerSession {
    fn slot_occupant(&self, slot: &SlotRef) -> Result<Option<ProductId>, LayoutError> {
        self.layout.slot(&slot.pan, slot.slot).map(|p| p.cloned())
    }

    fn assign_product(&mut self, slot: &SlotRef, product: ProductId) -> Result<(), LayoutError> {
        if !self.catalog.contains(&product) {
            return Err(LayoutError::UnknownProduct(product));
        }
        self.layout
            .assign_product(&slot.pan, slot.slot, product)
            .map(|_| ())
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
        self.drop_base = Some(self.layout.clone());
    }

    fn end_drop(&mut self, committed: bool) {
        let Some(base) = self.drop_base.take() else {
            return;
        };
        if committed {
            self.commit();
        } else {
            self.layout = base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    fn session() -> PlannerSession {
        PlannerSession::default()
    }

    #[test]
    fn edits_are_undoable_one_at_a_time() {
        let mut s = session();
        let a = s.add_pan(6, DepthMode::Half, Orientation::Shallow).unwrap();
        s.assign_product(&a, 0, &ProductId::new("p1")).unwrap();
        let after_assign = s.layout().clone();
        s.set_pan_orientation(&a, Orientation::Deep).unwrap();

        assert!(s.undo());
        assert_eq!(s.layout(), &after_assign);
        assert!(s.undo());
        assert_eq!(s.layout().slot(&a, 0), Ok(None));
        assert!(s.undo());
        assert!(s.layout().is_empty());
        assert!(!s.undo());
        assert!(s.redo());
        assert_eq!(s.layout().len(), 1);
    }

    #[test]
    fn rejected_edit_records_nothing() {
        let mut s = session();
        let a = s.add_pan(12, DepthMode::Full, Orientation::Shallow).unwrap();
        let err = s.set_pan_depth(&a, DepthMode::Half).unwrap_err();
        assert!(matches!(err, SessionError::Layout(LayoutError::SplitNotAllowed { .. })));
        assert!(s.undo());
        assert!(s.layout().is_empty());
        assert!(!s.can_undo());
    }

    #[test]
    fn unknown_product_cannot_be_assigned() {
        let mut s = session();
        let a = s.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        let err = s.assign_product(&a, 0, &ProductId::new("nope")).unwrap_err();
        assert!(matches!(err, SessionError::Layout(LayoutError::UnknownProduct(_))));
    }

    #[test]
    fn empty_pan_removal_needs_no_confirmation() {
        let mut s = session();
        let a = s.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        assert_eq!(s.remove_pan(&a).unwrap(), Decision::Done(()));
        assert!(s.layout().is_empty());
    }

    #[test]
    fn occupied_pan_removal_waits_for_confirmation() {
        let mut s = session();
        let a = s.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        s.assign_product(&a, 0, &ProductId::new("p2")).unwrap();
        let before = s.layout().clone();

        let decision = s.remove_pan(&a).unwrap();
        let action = decision.pending().cloned().unwrap();
        assert_eq!(s.layout(), &before);

        s.confirm(action).unwrap();
        assert!(s.layout().is_empty());
        assert!(s.undo());
        assert_eq!(s.layout(), &before);
    }

    #[test]
    fn permissive_policy_skips_prompts() {
        let mut s = PlannerSession::new(SessionConfig::default().with_policy(ConfirmPolicy::permissive()));
        let a = s.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        s.assign_product(&a, 0, &ProductId::new("p2")).unwrap();
        assert_eq!(s.clear_slot(&a, 0).unwrap(), Decision::Done(Some(ProductId::new("p2"))));
        assert_eq!(s.clear_all_pans(), Decision::Done(()));
        assert!(s.layout().is_empty());
    }

    #[test]
    fn expansion_is_one_undo_step() {
        let mut s = session();
        s.set_case_width(10);
        let a = s.add_pan(6, DepthMode::Full, Orientation::Shallow).unwrap();
        let before = s.layout().clone();

        let decision = s.insert_pan_from_product(&ProductId::new("p1"), 0).unwrap();
        let action = decision.pending().cloned().unwrap();
        assert!(matches!(action, PendingAction::Expand(_)));
        assert_eq!(s.layout(), &before);

        s.confirm(action).unwrap();
        assert_eq!(s.layout().len(), 2);
        assert_eq!(s.layout().case_width(), 12);
        assert_eq!(s.layout().pans()[1].id(), &a);

        assert!(s.undo());
        assert_eq!(s.layout(), &before);
    }

    #[test]
    fn product_delete_cascades_and_undoes_layout() {
        let mut s = session();
        let a = s.add_pan(6, DepthMode::Half, Orientation::Shallow).unwrap();
        s.assign_product(&a, 0, &ProductId::new("p3")).unwrap();
        s.assign_product(&a, 1, &ProductId::new("p3")).unwrap();

        let action = s.delete_product(&ProductId::new("p3")).unwrap().pending().cloned().unwrap();
        assert!(s.catalog().contains(&ProductId::new("p3")));
        s.confirm(action).unwrap();

        assert!(!s.catalog().contains(&ProductId::new("p3")));
        assert_eq!(s.layout().pans()[0].slots(), &[None, None]);
    }

    #[test]
    fn generate_replaces_layout_and_width() {
        let mut s = session();
        s.add_pan(3, DepthMode::Full, Orientation::Shallow).unwrap();
        let pans = s.generate(&[DemandItem::new("p1"), DemandItem::new("p3")], 40);
        assert_eq!(pans, s.layout().len());
        assert_eq!(s.layout().case_width(), 40);
        assert!(s.layout().used_width() <= 40);
        assert!(s.undo());
        assert_eq!(s.layout().len(), 1);
    }

    #[test]
    fn changes_write_through_to_storage() {
        let storage = std::sync::Arc::new(MemoryStorage::new());
        let mut s = PlannerSession::open(SessionConfig::default(), Box::new(SharedStorage(storage.clone())));
        s.add_pan(8, DepthMode::Full, Orientation::Deep).unwrap();
        s.set_case_width(60);
        s.save_current("Tuesday").unwrap();

        let reopened = PlannerSession::open(SessionConfig::default(), Box::new(SharedStorage(storage)));
        assert_eq!(reopened.layout(), s.layout());
        assert_eq!(reopened.saved().len(), 1);
        assert!(!reopened.can_undo());
    }

    /// Lets a test reopen the same in-memory store.
    struct SharedStorage(std::sync::Arc<MemoryStorage>);

    impl StorageBackend for SharedStorage {
        fn name(&self) -> &str {
            "SharedStorage"
        }
        fn load(&self, key: &str) -> crate::persistence::StorageResult<Option<String>> {
            self.0.load(key)
        }
        fn save(&self, key: &str, json: &str) -> crate::persistence::StorageResult<()> {
            self.0.save(key, json)
        }
        fn remove(&self, key: &str) -> crate::persistence::StorageResult<()> {
            self.0.remove(key)
        }
    }
}
