#![forbid(unsafe_code)]

//! Bounded snapshot history with undo and redo.
//!
//! [`SnapshotStore`] keeps every state the session has been in as an
//! immutable [`Arc`]. The present state sits at the back of the undo stack;
//! undo moves it to the redo stack and exposes the one before it.
//!
//! # Architecture
//!
//! ```text
//! reset(s0), push(s1), push(s2)
//! ┌────────────────────────────────────────┐
//! │ Undo Stack:  [s0, s1, s2]              │
//! │ Redo Stack:  []                        │
//! │ Present:     s2                        │
//! └────────────────────────────────────────┘
//!
//! undo()
//! ┌────────────────────────────────────────┐
//! │ Undo Stack:  [s0, s1]                  │
//! │ Redo Stack:  [s2]                      │
//! │ Present:     s1                        │
//! └────────────────────────────────────────┘
//!
//! push(s3): a new edit drops the redo branch
//! ┌────────────────────────────────────────┐
//! │ Undo Stack:  [s0, s1, s3]              │
//! │ Redo Stack:  []                        │
//! │ Present:     s3                        │
//! └────────────────────────────────────────┘
//! ```
//!
//! # Memory Model
//!
//! Snapshots are never mutated after being pushed, so a restored state is
//! equal to the state that was recorded regardless of what happened to the
//! live copy in between. Only the last [`HistoryConfig::max_depth`] undo
//! steps are retained; older ones are evicted from the front.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Configuration for the layout history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Number of undo steps retained (default: 20).
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 20 }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// No eviction. Intended for tests.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX - 1,
        }
    }
}

/// Snapshot history around a present state.
///
/// # Invariants
///
/// 1. After [`reset`](Self::reset) the undo stack is never empty; its back
///    is the present.
/// 2. At most `max_depth` undo steps exist (`undo_stack.len() <= max_depth + 1`).
/// 3. The redo stack is cleared on every [`push`](Self::push).
pub struct SnapshotStore<T> {
    undo_stack: VecDeque<Arc<T>>,
    redo_stack: VecDeque<Arc<T>>,
    config: HistoryConfig,
}

impl<T: fmt::Debug> fmt::Debug for SnapshotStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("undo_steps", &self.undo_steps())
            .field("redo_steps", &self.redo_stack.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> SnapshotStore<T> {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
        }
    }

    /// Store whose present is `initial`, with nothing to undo.
    #[must_use]
    pub fn with_initial(config: HistoryConfig, initial: T) -> Self {
        let mut store = Self::new(config);
        store.reset(initial);
        store
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Record `state` as the new present. Clears redo.
    pub fn push(&mut self, state: T) {
        self.redo_stack.clear();
        self.undo_stack.push_back(Arc::new(state));
        self.enforce_depth();
    }

    /// Forget all history; `state` becomes the only snapshot.
    pub fn reset(&mut self, state: T) {
        self.clear();
        self.undo_stack.push_back(Arc::new(state));
    }

    /// Step back. Returns the restored present, or `None` at the oldest
    /// retained state.
    pub fn undo(&mut self) -> Option<Arc<T>> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let present = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(present);
        self.undo_stack.back().cloned()
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self) -> Option<Arc<T>> {
        let snapshot = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(snapshot);
        self.undo_stack.back().cloned()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Arc<T>> {
        self.undo_stack.back()
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo steps available.
    #[must_use]
    pub fn undo_steps(&self) -> usize {
        self.undo_stack.len().saturating_sub(1)
    }

    /// Number of redo steps available.
    #[must_use]
    pub fn redo_steps(&self) -> usize {
        self.redo_stack.len()
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn enforce_depth(&mut self) {
        let limit = self.config.max_depth.saturating_add(1);
        while self.undo_stack.len() > limit {
            self.undo_stack.pop_front();
        }
    }
}
