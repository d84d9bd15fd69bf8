#![forbid(unsafe_code)]

//! Publishing layouts under short share codes.
//!
//! A published layout is looked up by a six-character code drawn from an
//! alphabet without the look-alikes `I`, `O`, `0` and `1`, so codes survive
//! being read aloud or retyped. Transport is abstracted behind
//! [`ShareBackend`]; [`MemoryShareBackend`] keeps everything in process.
//!
//! # Invariants
//!
//! 1. A code names at most one published layout.
//! 2. [`publish`] tries at most [`PUBLISH_ATTEMPTS`] codes before giving up.
//! 3. Lookups normalize input (trim, uppercase) before matching.

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use caseplan_core::{CaseLayout, Catalog, LayoutResult, Pan, Product};

use crate::error::ShareError;

pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;
pub const PAGE_SIZE: usize = 20;
pub const PUBLISH_ATTEMPTS: usize = 3;

pub type ShareResult<T> = Result<T, ShareError>;

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// Short public identifier of a published layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(String);

impl ShareCode {
    /// Normalize user input: surrounding whitespace dropped, letters
    /// uppercased.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    #[must_use]
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    #[must_use]
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(
            (0..CODE_LEN)
                .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
                .collect(),
        )
    }

    /// Whether this could have been issued by [`ShareCode::random`].
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == CODE_LEN && self.0.bytes().all(|b| CODE_ALPHABET.contains(&b))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// What the user submits for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShare {
    pub name: String,
    pub author: String,
    pub case_width: u32,
    pub pans: Vec<Pan>,
    pub products: Vec<Product>,
}

impl NewShare {
    /// Share `layout`, carrying only the products its slots reference.
    #[must_use]
    pub fn from_layout(name: &str, author: &str, layout: &CaseLayout, catalog: &Catalog) -> Self {
        let used = layout.products_in_use();
        Self {
            name: name.trim().to_owned(),
            author: author.trim().to_owned(),
            case_width: layout.case_width(),
            pans: layout.pans().to_vec(),
            products: catalog
                .iter()
                .filter(|p| used.contains(&&p.id))
                .cloned()
                .collect(),
        }
    }
}

/// A published layout as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLayout {
    pub short_code: ShareCode,
    pub name: String,
    #[serde(default)]
    pub author: String,
    pub case_width: u32,
    pub pans: Vec<Pan>,
    #[serde(default)]
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
}

impl SharedLayout {
    pub fn layout(&self) -> LayoutResult<CaseLayout> {
        CaseLayout::from_parts(self.case_width, self.pans.clone())
    }
}

/// One page of browse results, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub layouts: Vec<SharedLayout>,
    pub has_more: bool,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Storage for published layouts.
pub trait ShareBackend: Send + Sync {
    /// Store `share` under `code`.
    ///
    /// # Errors
    ///
    /// [`ShareError::CodeTaken`] when `code` is already in use.
    fn insert(&self, code: &ShareCode, share: &NewShare) -> ShareResult<SharedLayout>;

    fn fetch(&self, code: &ShareCode) -> ShareResult<Option<SharedLayout>>;

    /// Page `page` (zero-based) of layouts whose name or author contains
    /// `query`, case-insensitively. `None` matches everything.
    fn browse(&self, page: usize, query: Option<&str>) -> ShareResult<Page>;

    /// Returns whether anything was removed.
    fn delete(&self, code: &ShareCode) -> ShareResult<bool>;
}

/// Publish under a fresh random code, retrying on collision.
pub fn publish(backend: &dyn ShareBackend, share: &NewShare) -> ShareResult<SharedLayout> {
    publish_with(backend, share, ShareCode::random)
}

/// [`publish`] with a caller-supplied code generator.
pub fn publish_with(
    backend: &dyn ShareBackend,
    share: &NewShare,
    mut next_code: impl FnMut() -> ShareCode,
) -> ShareResult<SharedLayout> {
    for attempt in 1..=PUBLISH_ATTEMPTS {
        let code = next_code();
        match backend.insert(&code, share) {
            Ok(published) => {
                info!(code = %published.short_code, name = %published.name, "layout published");
                return Ok(published);
            }
            Err(ShareError::CodeTaken { code }) => {
                warn!(code = %code, attempt, "share code collision, retrying");
            }
            Err(e) => return Err(e),
        }
    }
    Err(ShareError::CodeExhausted)
}

/// Look up a layout by the code as the user typed it.
///
/// # Errors
///
/// [`ShareError::NotFound`] quoting `input` when nothing matches.
pub fn fetch(backend: &dyn ShareBackend, input: &str) -> ShareResult<SharedLayout> {
    let code = ShareCode::normalize(input);
    backend.fetch(&code)?.ok_or_else(|| ShareError::NotFound {
        code: input.to_owned(),
    })
}

/// In-process [`ShareBackend`].
#[derive(Debug, Default)]
pub struct MemoryShareBackend {
    // Oldest first.
    layouts: RwLock<Vec<SharedLayout>>,
}

impl MemoryShareBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.read().map(|g| g.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> ShareError {
    ShareError::Backend {
        message: "share store lock poisoned".into(),
    }
}

impl ShareBackend for MemoryShareBackend {
    fn insert(&self, code: &ShareCode, share: &NewShare) -> ShareResult<SharedLayout> {
        let mut guard = self.layouts.write().map_err(poisoned)?;
        if guard.iter().any(|l| &l.short_code == code) {
            return Err(ShareError::CodeTaken {
                code: code.to_string(),
            });
        }
        let published = SharedLayout {
            short_code: code.clone(),
            name: share.name.clone(),
            author: share.author.clone(),
            case_width: share.case_width,
            pans: share.pans.clone(),
            products: share.products.clone(),
            created_at: Utc::now(),
        };
        guard.push(published.clone());
        Ok(published)
    }

    fn fetch(&self, code: &ShareCode) -> ShareResult<Option<SharedLayout>> {
        let guard = self.layouts.read().map_err(poisoned)?;
        Ok(guard.iter().find(|l| &l.short_code == code).cloned())
    }

    fn browse(&self, page: usize, query: Option<&str>) -> ShareResult<Page> {
        let guard = self.layouts.read().map_err(poisoned)?;
        let needle = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let matching: Vec<&SharedLayout> = guard
            .iter()
            .rev()
            .filter(|l| {
                needle.as_deref().is_none_or(|q| {
                    l.name.to_lowercase().contains(q) || l.author.to_lowercase().contains(q)
                })
            })
            .collect();
        let start = page.saturating_mul(PAGE_SIZE);
        let layouts: Vec<SharedLayout> = matching
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|l| (*l).clone())
            .collect();
        Ok(Page {
            has_more: matching.len() > start.saturating_add(PAGE_SIZE),
            layouts,
        })
    }

    fn delete(&self, code: &ShareCode) -> ShareResult<bool> {
        let mut guard = self.layouts.write().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|l| &l.short_code != code);
        Ok(guard.len() != before)
    }
}
