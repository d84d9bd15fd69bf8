#![forbid(unsafe_code)]

//! Subcommand implementations.
//!
//! Every command reads its inputs in full before writing anything, so a
//! rejected input never leaves a half-written output file behind.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde_json::Value;
use tracing::{debug, info};

use caseplan_core::{CaseLayout, Catalog, DemandItem, MAX_CASE_WIDTH, Product, autogen, conflicts};
use caseplan_runtime::persistence::migrate_products;
use caseplan_runtime::{CaseFile, FileStorage, PlannerSession, SessionConfig};

use crate::error::{CliError, Result};

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    /// Write to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// Product catalog JSON (defaults to the built-in catalog).
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Products to place, as `ID` or `ID:sale`, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub select: Vec<String>,

    /// Case width in units.
    #[arg(long, default_value_t = caseplan_core::DEFAULT_CASE_WIDTH)]
    pub width: u32,

    /// Case name stored in the file.
    #[arg(long, default_value = "Generated case")]
    pub name: String,

    /// Write the `.fishcase` here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// `.fishcase` file to validate.
    pub file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct ImportArgs {
    /// `.fishcase` file to import.
    pub file: PathBuf,

    /// Planner state file; created when missing.
    #[arg(long)]
    pub state: PathBuf,

    /// Replace the working layout instead of adding a saved layout.
    #[arg(long)]
    pub open: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Planner state file.
    #[arg(long)]
    pub state: PathBuf,

    /// Export this saved layout (0-based) instead of the working layout.
    #[arg(long)]
    pub saved: Option<usize>,

    /// Case name for the working layout.
    #[arg(long, default_value = "Current case")]
    pub name: String,

    /// Output file or directory; a directory gets the derived file name.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

pub fn run_catalog(args: &CatalogArgs) -> Result<()> {
    let json = serde_json::to_string_pretty(&Catalog::starter())?;
    emit(args.out.as_deref(), &json)
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

/// Parse one `--select` entry.
pub fn parse_selection(raw: &str) -> Result<DemandItem> {
    let raw = raw.trim();
    let (id, on_sale) = match raw.split_once(':') {
        None => (raw, false),
        Some((id, flag)) if flag.eq_ignore_ascii_case("sale") => (id, true),
        Some((_, flag)) => {
            return Err(CliError::invalid(format!(
                "unknown selection flag `{flag}` in `{raw}` (expected `ID` or `ID:sale`)"
            )));
        }
    };
    if id.is_empty() {
        return Err(CliError::invalid(format!("empty product id in `{raw}`")));
    }
    let item = DemandItem::new(id);
    Ok(if on_sale { item.on_sale() } else { item })
}

/// Read a catalog file, upgrading legacy color names.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = read(path)?;
    let mut value: Value = serde_json::from_str(&text)?;
    migrate_products(&mut value);
    let products: Vec<Product> = serde_json::from_value(value)?;
    Ok(Catalog::from_products(products))
}

/// Build the generated case file without writing it.
pub fn generate_case(args: &GenerateArgs) -> Result<CaseFile> {
    if !(1..=MAX_CASE_WIDTH).contains(&args.width) {
        return Err(CliError::invalid(format!(
            "width must be between 1 and {MAX_CASE_WIDTH}, got {}",
            args.width
        )));
    }
    let catalog = match &args.catalog {
        Some(path) => load_catalog(path)?,
        None => Catalog::starter(),
    };
    let items = args
        .select
        .iter()
        .map(|raw| parse_selection(raw))
        .collect::<Result<Vec<_>>>()?;
    if let Some(unknown) = items.iter().find(|i| !catalog.contains(&i.product)) {
        return Err(CliError::invalid(format!("unknown product `{}`", unknown.product)));
    }
    let layout = autogen::generate_layout(&items, &catalog, args.width);
    info!(
        selected = items.len(),
        placed = layout.len(),
        used = layout.used_width(),
        case_width = layout.case_width(),
        "case generated"
    );
    Ok(CaseFile::export_current(&args.name, &layout, &catalog))
}

pub fn run_generate(args: &GenerateArgs) -> Result<()> {
    let file = generate_case(args)?;
    emit(args.out.as_deref(), &file.to_json()?)
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

/// Summary of a valid case file.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub name: String,
    pub layout: CaseLayout,
    pub catalog: Catalog,
    pub warnings: Vec<String>,
}

impl CheckReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layout = &self.layout;
        writeln!(f, "{}", self.name)?;
        writeln!(
            f,
            "  {} pans, {}/{} units used, {} remaining",
            layout.len(),
            layout.used_width(),
            layout.case_width(),
            layout.remaining_width()
        )?;
        for (i, pan) in layout.pans().iter().enumerate() {
            let names: Vec<&str> = pan
                .slots()
                .iter()
                .map(|slot| match slot {
                    Some(id) => self.catalog.get(id).map_or(id.as_str(), |p| p.name.as_str()),
                    None => "(empty)",
                })
                .collect();
            writeln!(
                f,
                "  {:>2}. {:>2}u {:<5} {:<7} {}",
                i + 1,
                pan.width(),
                pan.depth().as_str(),
                pan.orientation().as_str(),
                names.join(" / ")
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

pub fn check_file(path: &Path) -> Result<CheckReport> {
    let text = read(path)?;
    let file = CaseFile::parse(&text).map_err(|source| CliError::CaseFile {
        path: path.to_path_buf(),
        source,
    })?;
    let layout = file.layout().map_err(|e| CliError::CaseFile {
        path: path.to_path_buf(),
        source: caseplan_runtime::CaseFileError::invalid(e.to_string()),
    })?;
    let catalog = Catalog::from_products(file.products);
    let warnings = conflicts::warnings(&layout, &catalog);
    debug!(path = %path.display(), warnings = warnings.len(), "case file checked");
    Ok(CheckReport {
        name: file.case.name,
        layout,
        catalog,
        warnings,
    })
}

pub fn run_check(args: &CheckArgs) -> Result<()> {
    let report = check_file(&args.file)?;
    print!("{report}");
    Ok(())
}

// ---------------------------------------------------------------------------
// import / export
// ---------------------------------------------------------------------------

fn open_state(path: &Path) -> PlannerSession {
    PlannerSession::open(SessionConfig::default(), Box::new(FileStorage::new(path)))
}

pub fn run_import(args: &ImportArgs) -> Result<()> {
    let text = read(&args.file)?;
    let mut session = open_state(&args.state);
    if args.open {
        session.open_case_file(&text)?;
        session.flush()?;
        println!("opened {} as the working layout", args.file.display());
    } else {
        let index = session.import_case_file(&text)?;
        session.flush()?;
        println!("imported {} as saved layout {index}", args.file.display());
    }
    Ok(())
}

/// Build the exported case file without writing it.
pub fn export_case(args: &ExportArgs) -> Result<CaseFile> {
    let session = open_state(&args.state);
    match args.saved {
        Some(index) => Ok(session.export_saved(index)?),
        None => Ok(session.export_current(&args.name)),
    }
}

pub fn run_export(args: &ExportArgs) -> Result<()> {
    let file = export_case(args)?;
    let json = file.to_json()?;
    match &args.out {
        Some(out) if out.is_dir() => emit(Some(&out.join(file.file_name())), &json),
        out => emit(out.as_deref(), &json),
    }
}

// ---------------------------------------------------------------------------
// I/O helpers
// ---------------------------------------------------------------------------

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn emit(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, format!("{text}\n"))?;
            info!(path = %path.display(), bytes = text.len() + 1, "output written");
        }
        None => println!("{text}"),
    }
    Ok(())
}
