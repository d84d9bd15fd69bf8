#![forbid(unsafe_code)]

//! Named snapshots of the case the user chose to keep.
//!
//! A [`SavedLayout`] is a deep copy taken at save time; later edits to the
//! working layout never reach it. Entries are addressed by position in
//! [`SavedLayouts`], which keeps insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use caseplan_core::{CaseLayout, LayoutResult, Pan, ProductId};

use crate::error::{SessionError, SessionResult};

/// A named, timestamped layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedLayout {
    pub name: String,
    pub pans: Vec<Pan>,
    pub case_width: u32,
    pub saved_at: DateTime<Utc>,
}

impl SavedLayout {
    /// Capture `layout` now under `name`.
    #[must_use]
    pub fn capture(name: impl Into<String>, layout: &CaseLayout) -> Self {
        Self::capture_at(name, layout, Utc::now())
    }

    #[must_use]
    pub fn capture_at(name: impl Into<String>, layout: &CaseLayout, saved_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            pans: layout.pans().to_vec(),
            case_width: layout.case_width(),
            saved_at,
        }
    }

    /// Rebuild the working layout this entry describes.
    ///
    /// # Errors
    ///
    /// The validation errors of [`CaseLayout::from_parts`].
    pub fn to_layout(&self) -> LayoutResult<CaseLayout> {
        CaseLayout::from_parts(self.case_width, self.pans.clone())
    }

    /// Product ids referenced by any slot, first-seen order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut out: Vec<ProductId> = Vec::new();
        for id in self.pans.iter().flat_map(Pan::products) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }
}

/// Ordered list of saved layouts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedLayouts {
    entries: Vec<SavedLayout>,
}

impl SavedLayouts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_entries(entries: Vec<SavedLayout>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn list(&self) -> &[SavedLayout] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&SavedLayout> {
        self.entries.get(index)
    }

    /// Append `layout`. Returns its index.
    ///
    /// # Errors
    ///
    /// [`SessionError::EmptyName`] if the name is blank after trimming.
    pub fn append(&mut self, mut layout: SavedLayout) -> SessionResult<usize> {
        layout.name = checked_name(&layout.name)?;
        debug!(name = %layout.name, pans = layout.pans.len(), "layout saved");
        self.entries.push(layout);
        Ok(self.entries.len() - 1)
    }

    /// Replace the pans and width of entry `index` with `layout`, refreshing
    /// its timestamp. The name is kept.
    pub fn update(&mut self, index: usize, layout: &CaseLayout) -> SessionResult<()> {
        let entry = self.require_mut(index)?;
        entry.pans = layout.pans().to_vec();
        entry.case_width = layout.case_width();
        entry.saved_at = Utc::now();
        debug!(index, name = %entry.name, "saved layout updated");
        Ok(())
    }

    pub fn rename(&mut self, index: usize, name: &str) -> SessionResult<()> {
        let name = checked_name(name)?;
        let entry = self.require_mut(index)?;
        debug!(index, from = %entry.name, to = %name, "saved layout renamed");
        entry.name = name;
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> SessionResult<SavedLayout> {
        if index >= self.entries.len() {
            return Err(SessionError::UnknownSavedLayout { index });
        }
        let removed = self.entries.remove(index);
        debug!(index, name = %removed.name, "saved layout deleted");
        Ok(removed)
    }

    fn require_mut(&mut self, index: usize) -> SessionResult<&mut SavedLayout> {
        self.entries
            .get_mut(index)
            .ok_or(SessionError::UnknownSavedLayout { index })
    }
}

fn checked_name(name: &str) -> SessionResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SessionError::EmptyName);
    }
    Ok(trimmed.to_owned())
}
