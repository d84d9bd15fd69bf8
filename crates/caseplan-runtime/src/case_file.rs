#![forbid(unsafe_code)]

//! `.fishcase` export and import.
//!
//! A case file carries one layout plus the products its slots reference,
//! so it can be opened on a planner that has never seen those products.
//!
//! ```json
//! {
//!   "version": 1,
//!   "exportedAt": "2026-03-02T14:00:00Z",
//!   "case": { "name": "Weekend", "caseWidth": 81, "pans": [...], "savedAt": "..." },
//!   "products": [ { "id": "p1", "name": "Atlantic Fillet", ... } ]
//! }
//! ```
//!
//! # Failure Modes
//!
//! Import validates the raw document before decoding anything and stops at
//! the first problem, returning a message meant for the user. Nothing is
//! partially imported.
//!
//! | Check (in order) | Message |
//! |------------------|---------|
//! | JSON syntax | `Could not parse file. Make sure it's a valid .fishcase file.` |
//! | top level is an object | `File is not valid JSON.` |
//! | numeric `version` | `Missing file version.` |
//! | `case` present | `Missing case data.` |
//! | `case.name` non-empty string | `Case is missing a name.` |
//! | `case.caseWidth` integer ≥ 1 | `Invalid case width.` |
//! | `case.pans` array | `Case is missing pans array.` |
//! | pan id + allowed width | `Pan N has an invalid width.` |
//! | pan depth | `Pan N has an invalid depth.` |
//! | pan type | `Pan N has an invalid pan type.` |
//! | pan slots object | `Pan N is missing slots.` |
//! | `products` array | `Missing products array.` |
//! | product id + name | `Product N is missing id or name.` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use caseplan_core::geometry::{is_allowed_width, is_splittable};
use caseplan_core::{CaseLayout, Catalog, LayoutResult, Pan, Product};

use crate::error::CaseFileError;
use crate::persistence::migrate_products;
use crate::saved::SavedLayout;

pub const FILE_VERSION: u32 = 1;
pub const FILE_EXTENSION: &str = ".fishcase";

const DEPTHS: [&str; 3] = ["full", "half", "third"];
const PAN_TYPES: [&str; 2] = ["deep", "shallow"];

/// The `case` object of a case file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub name: String,
    pub case_width: u32,
    pub pans: Vec<Pan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// A whole `.fishcase` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFile {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub case: CaseRecord,
    pub products: Vec<Product>,
}

impl CaseFile {
    /// Package a saved layout with the catalog entries it references.
    #[must_use]
    pub fn export(saved: &SavedLayout, catalog: &Catalog) -> Self {
        let used = saved.product_ids();
        let products = catalog
            .iter()
            .filter(|p| used.contains(&p.id))
            .cloned()
            .collect();
        Self {
            version: FILE_VERSION,
            exported_at: Some(Utc::now()),
            case: CaseRecord {
                name: saved.name.clone(),
                case_width: saved.case_width,
                pans: saved.pans.clone(),
                saved_at: Some(saved.saved_at),
            },
            products,
        }
    }

    /// Package the working layout under `name`, stamped now.
    #[must_use]
    pub fn export_current(name: &str, layout: &CaseLayout, catalog: &Catalog) -> Self {
        Self::export(&SavedLayout::capture(name, layout), catalog)
    }

    /// Pretty-printed JSON, as written to disk.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested file name for this case.
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name(&self.case.name)
    }

    /// Validate and decode a case file.
    ///
    /// # Errors
    ///
    /// The first failed check, see the module docs.
    pub fn parse(text: &str) -> Result<Self, CaseFileError> {
        let value: Value = serde_json::from_str(text).map_err(|_| CaseFileError::Parse)?;
        validate(&value)?;
        decode(value)
    }

    /// The working layout this file describes.
    pub fn layout(&self) -> LayoutResult<CaseLayout> {
        CaseLayout::from_parts(self.case.case_width, self.case.pans.clone())
    }

    /// The case as a saved-layout entry, keeping its original timestamp
    /// when it has one.
    #[must_use]
    pub fn to_saved_layout(&self) -> SavedLayout {
        SavedLayout {
            name: self.case.name.clone(),
            pans: self.case.pans.clone(),
            case_width: self.case.case_width,
            saved_at: self.case.saved_at.unwrap_or_else(Utc::now),
        }
    }
}

/// `name` stripped to `[A-Za-z0-9_ -]` plus the extension.
#[must_use]
pub fn file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '-'))
        .collect();
    format!("{stem}{FILE_EXTENSION}")
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// JavaScript truthiness, which older planners used for presence checks.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Integer value, accepting `81.0` the way a JSON number check would.
fn as_integer(value: Option<&Value>) -> Option<i64> {
    let Value::Number(n) = value? else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.abs() < 9.0e15).then_some(f as i64)
}

fn field_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn validate(data: &Value) -> Result<(), CaseFileError> {
    let Some(data) = data.as_object() else {
        return Err(CaseFileError::invalid("File is not valid JSON."));
    };
    if !data.get("version").is_some_and(Value::is_number) {
        return Err(CaseFileError::invalid("Missing file version."));
    }
    if !truthy(data.get("case")) {
        return Err(CaseFileError::invalid("Missing case data."));
    }
    let empty = Map::new();
    let case = data.get("case").and_then(Value::as_object).unwrap_or(&empty);
    if field_str(case, "name").is_none_or(str::is_empty) {
        return Err(CaseFileError::invalid("Case is missing a name."));
    }
    match as_integer(case.get("caseWidth")) {
        Some(w) if w >= 1 && u32::try_from(w).is_ok() => {}
        _ => return Err(CaseFileError::invalid("Invalid case width.")),
    }
    let Some(pans) = case.get("pans").and_then(Value::as_array) else {
        return Err(CaseFileError::invalid("Case is missing pans array."));
    };
    for (i, pan) in pans.iter().enumerate() {
        let n = i + 1;
        let pan = pan.as_object().unwrap_or(&empty);
        let width_ok = as_integer(pan.get("width"))
            .and_then(|w| u32::try_from(w).ok())
            .is_some_and(is_allowed_width);
        if !truthy(pan.get("id")) || !width_ok {
            return Err(CaseFileError::invalid(format!("Pan {n} has an invalid width.")));
        }
        if !field_str(pan, "depth").is_some_and(|d| DEPTHS.contains(&d)) {
            return Err(CaseFileError::invalid(format!("Pan {n} has an invalid depth.")));
        }
        if !field_str(pan, "panType").is_some_and(|t| PAN_TYPES.contains(&t)) {
            return Err(CaseFileError::invalid(format!("Pan {n} has an invalid pan type.")));
        }
        if !pan.get("slots").is_some_and(Value::is_object) {
            return Err(CaseFileError::invalid(format!("Pan {n} is missing slots.")));
        }
    }
    let Some(products) = data.get("products").and_then(Value::as_array) else {
        return Err(CaseFileError::invalid("Missing products array."));
    };
    for (i, product) in products.iter().enumerate() {
        let product = product.as_object().unwrap_or(&empty);
        if !truthy(product.get("id")) || !truthy(product.get("name")) {
            return Err(CaseFileError::invalid(format!(
                "Product {} is missing id or name.",
                i + 1
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Collapse a split on a width that cannot take one, keeping slot 0.
fn normalize_pan(pan: &mut Value) {
    let Some(obj) = pan.as_object_mut() else {
        return;
    };
    let width = as_integer(obj.get("width"))
        .and_then(|w| u32::try_from(w).ok())
        .unwrap_or(0);
    if let Some(w) = as_integer(obj.get("width")) {
        obj.insert("width".into(), Value::from(w));
    }
    if !is_splittable(width) && field_str(obj, "depth") != Some("full") {
        obj.insert("depth".into(), Value::from("full"));
        obj.remove("slotTypes");
    }
}

fn decode(mut value: Value) -> Result<CaseFile, CaseFileError> {
    if let Some(pans) = value.pointer_mut("/case/pans").and_then(Value::as_array_mut) {
        pans.iter_mut().for_each(normalize_pan);
    }
    if let Some(w) = as_integer(value.pointer("/case/caseWidth"))
        && let Some(case) = value.pointer_mut("/case").and_then(Value::as_object_mut)
    {
        case.insert("caseWidth".into(), Value::from(w));
    }
    if let Some(products) = value.get_mut("products") {
        migrate_products(products);
    }
    if let Some(version) = as_integer(value.get("version")) {
        value["version"] = Value::from(version.max(0));
    }
    lenient_timestamp(&mut value, "/exportedAt");
    lenient_timestamp(&mut value, "/case/savedAt");

    let file: CaseFile = serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "case file passed validation but failed to decode");
        CaseFileError::Parse
    })?;
    if let Err(e) = file.layout() {
        warn!(error = %e, "case file describes an inconsistent layout");
        return Err(CaseFileError::invalid(e.to_string()));
    }
    Ok(file)
}

/// Drop a timestamp that is not RFC 3339 instead of rejecting the file.
fn lenient_timestamp(value: &mut Value, pointer: &str) {
    let keep = match value.pointer(pointer) {
        None => return,
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s).is_ok(),
        Some(_) => false,
    };
    if keep {
        return;
    }
    if let Some(slot) = value.pointer_mut(pointer) {
        *slot = Value::Null;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseplan_core::{ColorCategory, DepthMode, Orientation, ProductId};
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "version": 1,
            "exportedAt": "2026-03-02T14:00:00Z",
            "case": {
                "name": "Weekend",
                "caseWidth": 40,
                "pans": [
                    {"id": "a", "width": 6, "depth": "half", "panType": "shallow",
                     "slots": {"0": "p1", "1": null}},
                    {"id": "b", "width": 12, "depth": "full", "panType": "deep", "slots": {"0": "zz"}}
                ],
                "savedAt": "2026-03-01T09:30:00Z"
            },
            "products": [
                {"id": "p1", "name": "Atlantic Fillet", "color": "orange", "minPan": 6, "maxPan": 12},
                {"id": "zz", "name": "Mystery"}
            ]
        })
    }

    fn reject(value: Value) -> String {
        match CaseFile::parse(&value.to_string()) {
            Err(e) => e.to_string(),
            Ok(_) => panic!("expected rejection"),
        }
    }

    #[test]
    fn valid_file_decodes() {
        let file = CaseFile::parse(&valid().to_string()).unwrap();
        assert_eq!(file.case.name, "Weekend");
        let layout = file.layout().unwrap();
        assert_eq!(layout.case_width(), 40);
        assert_eq!(layout.pans()[0].depth(), DepthMode::Half);
        assert_eq!(layout.pans()[1].orientation(), Orientation::Deep);
        assert_eq!(file.products[0].color, ColorCategory::Warm);
        assert_eq!(file.to_saved_layout().saved_at.to_rfc3339(), "2026-03-01T09:30:00+00:00");
    }

    #[test]
    fn syntax_error_uses_generic_message() {
        assert_eq!(
            CaseFile::parse("{\"version\": 1,").unwrap_err(),
            CaseFileError::Parse
        );
    }

    #[test]
    fn checks_run_in_order() {
        assert_eq!(reject(json!(7)), "File is not valid JSON.");
        assert_eq!(reject(json!({"case": {}})), "Missing file version.");
        assert_eq!(reject(json!({"version": 1, "case": null})), "Missing case data.");
        assert_eq!(reject(json!({"version": 1, "case": {"name": ""}})), "Case is missing a name.");

        let mut v = valid();
        v["case"]["caseWidth"] = json!(0);
        assert_eq!(reject(v), "Invalid case width.");

        let mut v = valid();
        v["case"]["caseWidth"] = json!(40.5);
        assert_eq!(reject(v), "Invalid case width.");

        let mut v = valid();
        v["case"].as_object_mut().unwrap().remove("pans");
        assert_eq!(reject(v), "Case is missing pans array.");

        let mut v = valid();
        v["case"]["pans"][1]["width"] = json!(7);
        assert_eq!(reject(v), "Pan 2 has an invalid width.");

        let mut v = valid();
        v["case"]["pans"][0]["id"] = json!("");
        assert_eq!(reject(v), "Pan 1 has an invalid width.");

        let mut v = valid();
        v["case"]["pans"][0]["depth"] = json!("quarter");
        assert_eq!(reject(v), "Pan 1 has an invalid depth.");

        let mut v = valid();
        v["case"]["pans"][0]["panType"] = json!("tall");
        assert_eq!(reject(v), "Pan 1 has an invalid pan type.");

        let mut v = valid();
        v["case"]["pans"][1].as_object_mut().unwrap().remove("slots");
        assert_eq!(reject(v), "Pan 2 is missing slots.");

        let mut v = valid();
        v.as_object_mut().unwrap().remove("products");
        assert_eq!(reject(v), "Missing products array.");

        let mut v = valid();
        v["products"][1]["name"] = json!("");
        assert_eq!(reject(v), "Product 2 is missing id or name.");
    }

    #[test]
    fn unsplittable_pans_are_collapsed() {
        let mut v = valid();
        v["case"]["pans"][1]["depth"] = json!("third");
        v["case"]["pans"][1]["slots"] = json!({"0": "zz", "1": "p1", "2": null});
        let file = CaseFile::parse(&v.to_string()).unwrap();
        let pan = &file.case.pans[1];
        assert_eq!(pan.depth(), DepthMode::Full);
        assert_eq!(pan.slots(), &[Some(ProductId::new("zz"))]);
    }

    #[test]
    fn bad_timestamps_are_dropped() {
        let mut v = valid();
        v["exportedAt"] = json!("yesterday");
        v["case"]["savedAt"] = json!(12);
        let file = CaseFile::parse(&v.to_string()).unwrap();
        assert!(file.exported_at.is_none());
        assert!(file.case.saved_at.is_none());
    }

    #[test]
    fn export_keeps_only_referenced_products() {
        let mut layout = CaseLayout::new(81);
        let pan = layout.add_pan(6, DepthMode::Half, Orientation::Shallow).unwrap();
        layout.assign_product(&pan, 0, ProductId::new("p4")).unwrap();
        layout.assign_product(&pan, 1, ProductId::new("p4")).unwrap();
        let file = CaseFile::export_current("Mon: A/B *", &layout, &Catalog::starter());
        assert_eq!(file.version, FILE_VERSION);
        assert_eq!(file.products.len(), 1);
        assert_eq!(file.products[0].id, ProductId::new("p4"));
        assert_eq!(file.file_name(), "Mon AB .fishcase");

        let reread = CaseFile::parse(&file.to_json().unwrap()).unwrap();
        assert_eq!(reread.layout().unwrap(), layout);
        assert_eq!(reread.products, file.products);
    }
}
