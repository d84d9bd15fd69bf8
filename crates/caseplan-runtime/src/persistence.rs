#![forbid(unsafe_code)]

//! Durable planner state: catalog, working layout and saved layouts.
//!
//! State lives under four keys in a [`StorageBackend`], each holding one
//! JSON document, so files written by earlier planner versions stay readable.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ load_state / save_*                                    │
//! │   - per-key JSON documents                             │
//! │   - product migration on load                          │
//! │   - corrupt or missing entries fall back to defaults   │
//! └────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌────────────────────────────────────────────────────────┐
//! │ StorageBackend                                         │
//! │   - MemoryStorage: in-process map                      │
//! │   - FileStorage: one JSON file, write-then-rename      │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Missing key | First run | Default value |
//! | Unparseable entry | Corrupt or hand-edited storage | `warn!`, default value |
//! | Invalid pan / saved layout | Out-of-range width, bad split | `warn!`, entry skipped |
//! | `StorageError::Io` on save | Disk full, permissions | Returned to caller |

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use caseplan_core::{CaseLayout, Catalog, DEFAULT_CASE_WIDTH, Pan, Product};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::saved::{SavedLayout, SavedLayouts};

pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Storage keys for each persisted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub products: String,
    pub pans: String,
    pub case_width: String,
    pub saved: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            products: "fcp3_products".into(),
            pans: "fcp3_pans".into(),
            case_width: "fcp3_cw".into(),
            saved: "fcp3_sc".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Key/value store for serialized planner documents.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Raw JSON text stored under `key`, or `None` if absent.
    fn load(&self, key: &str) -> StorageResult<Option<String>>;

    fn save(&self, key: &str, json: &str) -> StorageResult<()>;

    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// In-process storage. Lost when dropped.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `(key, json)` entries.
    #[must_use]
    pub fn with_entries<K: Into<String>, V: Into<String>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            data: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self.data.read().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.get(key).cloned())
    }

    fn save(&self, key: &str, json: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| StorageError::Poisoned)?;
        guard.insert(key.to_owned(), json.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut guard = self.data.write().map_err(|_| StorageError::Poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("entries", &count)
            .finish()
    }
}

/// On-disk layout of [`FileStorage`].
#[derive(Serialize, Deserialize)]
struct StoreFile {
    format_version: u32,
    entries: BTreeMap<String, String>,
}

impl StoreFile {
    const FORMAT_VERSION: u32 = 1;

    fn empty() -> Self {
        Self {
            format_version: Self::FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

/// All keys in one JSON file.
///
/// ```json
/// { "format_version": 1, "entries": { "fcp3_cw": "81", "fcp3_pans": "[...]" } }
/// ```
///
/// Writes go to `{path}.tmp`, are synced, then renamed over `{path}`, so a
/// crash mid-write leaves the previous file intact.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    fn read_file(&self) -> StorageResult<StoreFile> {
        if !self.path.exists() {
            return Ok(StoreFile::empty());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let file: StoreFile = serde_json::from_reader(reader)?;
        if file.format_version != StoreFile::FORMAT_VERSION {
            return Err(StorageError::Corruption {
                message: format!(
                    "format version {} (expected {})",
                    file.format_version,
                    StoreFile::FORMAT_VERSION
                ),
            });
        }
        Ok(file)
    }

    /// Current file contents, or an empty file if the existing one is
    /// unreadable. Used before writes so one bad file does not block saving.
    fn read_for_update(&self) -> StorageResult<StoreFile> {
        match self.read_file() {
            Ok(file) => Ok(file),
            Err(StorageError::Io(e)) => Err(StorageError::Io(e)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "replacing unreadable state file");
                Ok(StoreFile::empty())
            }
        }
    }

    fn write_file(&self, file: &StoreFile) -> StorageResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, file)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), entries = file.entries.len(), "state file written");
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn load(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_file()?.entries.remove(key))
    }

    fn save(&self, key: &str, json: &str) -> StorageResult<()> {
        let mut file = self.read_for_update()?;
        file.entries.insert(key.to_owned(), json.to_owned());
        self.write_file(&file)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut file = self.read_for_update()?;
        if file.entries.remove(key).is_some() {
            self.write_file(&file)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// Map retired color names onto the current categories.
#[must_use]
pub fn migrate_color(color: &str) -> &str {
    match color {
        "orange" => "warm",
        "white" | "blue" => "cool",
        other => other,
    }
}

/// Bring stored product records up to the current shape, in place.
///
/// Renames retired colors and fills `preferredPosition` and `labels` where
/// they are missing or null. Non-object entries are left for the decoder to
/// reject.
pub fn migrate_products(products: &mut Value) {
    let Some(items) = products.as_array_mut() else {
        return;
    };
    for item in items.iter_mut() {
        let Some(obj) = item.as_object_mut() else {
            continue;
        };
        if let Some(Value::String(color)) = obj.get_mut("color") {
            let migrated = migrate_color(color.as_str()).to_owned();
            if migrated != *color {
                *color = migrated;
            }
        }
        if !matches!(obj.get("preferredPosition"), Some(Value::String(_))) {
            obj.insert("preferredPosition".into(), Value::String(String::new()));
        }
        if !matches!(obj.get("labels"), Some(Value::Array(_))) {
            obj.insert("labels".into(), Value::Array(Vec::new()));
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Everything the planner restores at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub catalog: Catalog,
    pub layout: CaseLayout,
    pub saved: SavedLayouts,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            catalog: Catalog::starter(),
            layout: CaseLayout::new(DEFAULT_CASE_WIDTH),
            saved: SavedLayouts::new(),
        }
    }
}

/// Parsed JSON under `key`, or `None` if missing or unreadable.
fn load_value(backend: &dyn StorageBackend, key: &str) -> Option<Value> {
    let raw = match backend.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(backend = backend.name(), key, error = %e, "failed to read entry, using default");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(backend = backend.name(), key, error = %e, "corrupt entry, using default");
            None
        }
    }
}

/// Decode each array element independently, skipping the ones that fail.
fn decode_each<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Option<Vec<T>> {
    let Value::Array(items) = value else {
        warn!(key, "entry is not an array, using default");
        return None;
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(v) => out.push(v),
            Err(e) => warn!(key, index, error = %e, "skipping invalid entry"),
        }
    }
    Some(out)
}

fn load_catalog(backend: &dyn StorageBackend, keys: &StorageKeys) -> Catalog {
    let Some(mut value) = load_value(backend, &keys.products) else {
        return Catalog::starter();
    };
    migrate_products(&mut value);
    match decode_each::<Product>(&keys.products, value) {
        Some(products) => Catalog::from_products(products),
        None => Catalog::starter(),
    }
}

fn load_layout(backend: &dyn StorageBackend, keys: &StorageKeys) -> CaseLayout {
    let case_width = load_value(backend, &keys.case_width)
        .and_then(|v| v.as_u64())
        .and_then(|w| u32::try_from(w).ok())
        .filter(|w| *w >= 1)
        .unwrap_or(DEFAULT_CASE_WIDTH);
    let pans: Vec<Pan> = load_value(backend, &keys.pans)
        .and_then(|v| decode_each(&keys.pans, v))
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let pans: Vec<Pan> = pans
        .into_iter()
        .filter(|p| {
            let fresh = seen.insert(p.id().clone());
            if !fresh {
                warn!(pan = %p.id(), "skipping duplicate pan id");
            }
            fresh
        })
        .collect();

    match CaseLayout::from_parts(case_width, pans) {
        Ok(layout) => layout,
        Err(e) => {
            warn!(error = %e, "stored layout rejected, using empty case");
            CaseLayout::new(case_width)
        }
    }
}

fn load_saved(backend: &dyn StorageBackend, keys: &StorageKeys) -> SavedLayouts {
    let entries: Vec<SavedLayout> = load_value(backend, &keys.saved)
        .and_then(|v| decode_each(&keys.saved, v))
        .unwrap_or_default();
    SavedLayouts::from_entries(entries)
}

/// Restore everything from `backend`. Never fails; see the module docs for
/// how each failure degrades.
#[must_use]
pub fn load_state(backend: &dyn StorageBackend, keys: &StorageKeys) -> PersistedState {
    let state = PersistedState {
        catalog: load_catalog(backend, keys),
        layout: load_layout(backend, keys),
        saved: load_saved(backend, keys),
    };
    info!(
        backend = backend.name(),
        products = state.catalog.len(),
        pans = state.layout.len(),
        case_width = state.layout.case_width(),
        saved = state.saved.len(),
        "planner state loaded"
    );
    state
}

fn save_json<T: Serialize + ?Sized>(
    backend: &dyn StorageBackend,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    let json = serde_json::to_string(value)?;
    backend.save(key, &json)
}

pub fn save_catalog(
    backend: &dyn StorageBackend,
    keys: &StorageKeys,
    catalog: &Catalog,
) -> StorageResult<()> {
    save_json(backend, &keys.products, catalog)
}

/// Pans and case width are stored under separate keys.
pub fn save_layout(
    backend: &dyn StorageBackend,
    keys: &StorageKeys,
    layout: &CaseLayout,
) -> StorageResult<()> {
    save_json(backend, &keys.pans, layout.pans())?;
    save_json(backend, &keys.case_width, &layout.case_width())
}

pub fn save_saved(
    backend: &dyn StorageBackend,
    keys: &StorageKeys,
    saved: &SavedLayouts,
) -> StorageResult<()> {
    save_json(backend, &keys.saved, saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseplan_core::{ColorCategory, DepthMode, Orientation, ProductId};
    use serde_json::json;

    #[test]
    fn empty_backend_yields_defaults() {
        let state = load_state(&MemoryStorage::new(), &StorageKeys::default());
        assert_eq!(state, PersistedState::default());
        assert_eq!(state.catalog.len(), 11);
    }

    #[test]
    fn colors_and_missing_fields_migrate() {
        let mut products = json!([
            {"id": "a", "name": "A", "color": "orange"},
            {"id": "b", "name": "B", "color": "white", "labels": null},
            {"id": "c", "name": "C", "color": "blue", "preferredPosition": "front"},
            {"id": "d", "name": "D", "color": "red", "labels": ["msc"]},
        ]);
        migrate_products(&mut products);
        assert_eq!(products[0]["color"], "warm");
        assert_eq!(products[1]["color"], "cool");
        assert_eq!(products[2]["color"], "cool");
        assert_eq!(products[3]["color"], "red");
        assert_eq!(products[0]["preferredPosition"], "");
        assert_eq!(products[2]["preferredPosition"], "front");
        assert_eq!(products[1]["labels"], json!([]));
        assert_eq!(products[3]["labels"], json!(["msc"]));
    }

    #[test]
    fn legacy_products_load_through_migration() {
        let legacy = r#"[{"id":"p1","name":"Atlantic Fillet","plu":"12345","color":"orange",
            "cookType":"Raw","fishType":"Finfish","maxPan":12,"minPan":6,
            "deepShallow":"shallow","demand":9}]"#;
        let storage = MemoryStorage::with_entries([("fcp3_products", legacy)]);
        let state = load_state(&storage, &StorageKeys::default());
        let product = state.catalog.get(&ProductId::new("p1")).unwrap();
        assert_eq!(product.color, ColorCategory::Warm);
        assert!(product.labels.is_empty());
        assert_eq!(product.preferred_position, "");
    }

    #[test]
    fn corrupt_entries_fall_back_independently() {
        let storage = MemoryStorage::with_entries([
            ("fcp3_products", "{not json"),
            ("fcp3_cw", "64"),
            ("fcp3_pans", r#"[{"id":"x","width":6,"depth":"half","panType":"deep","slots":{"0":"p1","1":null}},
                              {"id":"y","width":7,"depth":"full","panType":"deep","slots":{}}]"#),
        ]);
        let state = load_state(&storage, &StorageKeys::default());
        assert_eq!(state.catalog, Catalog::starter());
        assert_eq!(state.layout.case_width(), 64);
        assert_eq!(state.layout.len(), 1);
        assert_eq!(state.layout.pans()[0].depth(), DepthMode::Half);
        assert_eq!(state.layout.pans()[0].orientation(), Orientation::Deep);
    }

    #[test]
    fn zero_case_width_uses_default() {
        let storage = MemoryStorage::with_entries([("fcp3_cw", "0")]);
        let state = load_state(&storage, &StorageKeys::default());
        assert_eq!(state.layout.case_width(), DEFAULT_CASE_WIDTH);
    }

    #[test]
    fn layout_round_trips_through_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("state.json"));
        let keys = StorageKeys::default();

        let mut layout = CaseLayout::new(40);
        let pan = layout.add_pan(6, DepthMode::Third, Orientation::Deep).unwrap();
        layout.assign_product(&pan, 2, ProductId::new("p3")).unwrap();
        save_layout(&storage, &keys, &layout).unwrap();
        save_catalog(&storage, &keys, &Catalog::starter()).unwrap();

        let reopened = FileStorage::new(storage.path());
        let state = load_state(&reopened, &keys);
        assert_eq!(state.layout, layout);
        assert_eq!(state.catalog, Catalog::starter());
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn file_storage_remove_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("state.json"));
        assert_eq!(storage.load("fcp3_cw").unwrap(), None);
        storage.save("fcp3_cw", "70").unwrap();
        assert_eq!(storage.load("fcp3_cw").unwrap().as_deref(), Some("70"));
        storage.remove("fcp3_cw").unwrap();
        assert_eq!(storage.load("fcp3_cw").unwrap(), None);
    }

    #[test]
    fn unreadable_file_is_replaced_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "garbage").unwrap();
        let storage = FileStorage::new(&path);
        assert!(storage.load("fcp3_cw").is_err());
        let state = load_state(&storage, &StorageKeys::default());
        assert_eq!(state.layout.case_width(), DEFAULT_CASE_WIDTH);
        storage.save("fcp3_cw", "12").unwrap();
        assert_eq!(storage.load("fcp3_cw").unwrap().as_deref(), Some("12"));
    }
}
