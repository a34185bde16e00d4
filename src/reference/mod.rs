//! Reference route tables (roteiros).
//!
//! Two authoritative spreadsheets map street codes to route and locality
//! identifiers. They are loaded once per batch, concatenated, and turned
//! into a first-match lookup keyed by the normalized street code. Loaded
//! tables are read-only for the rest of the batch; concurrent batches load
//! their own copy.

use calamine::{open_workbook_auto, Data, Reader};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{ReferenceError, ReferenceResult};
use crate::progress::{log_info, log_success};
use crate::transform::normalize::normalize_street_code;

/// Route spreadsheets expected in the reference directory.
pub const ROUTE_FILES: &[&str] = &["roteiro_aparecida.xlsx", "roteiro_goiania.xlsx"];

/// One row of a route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRoute {
    /// Normalized street code (digits only, max 10).
    pub cod_lograd: String,
    /// Route identifier.
    pub id: String,
    /// Locality identifier.
    pub id_localidade: String,
}

/// The concatenated route tables.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    pub routes: Vec<ReferenceRoute>,
    /// Whether any sheet carried the `cod_lograd` join column. When false
    /// the merge downgrades to skip mode.
    pub has_join_column: bool,
}

/// Load and concatenate the route tables from the reference directory.
///
/// A missing file is an error; a sheet without the join column only
/// disables the merge.
pub fn load_reference_tables(dir: &Path) -> ReferenceResult<ReferenceTable> {
    let mut table = ReferenceTable::default();

    for name in ROUTE_FILES {
        let path = dir.join(name);
        if !path.exists() {
            return Err(ReferenceError::NotFound(path));
        }
        let sheet = load_sheet(&path)?;
        log_info(format!("   - {}: {} registros", name, sheet.routes.len()));
        table.has_join_column |= sheet.has_join_column;
        table.routes.extend(sheet.routes);
    }

    log_success("Roteiros carregados com sucesso");
    Ok(table)
}

/// Load one route sheet: find the `cod_lograd`/`id`/`id_localidade` columns
/// by header (case-insensitive) and normalize every cell to a comparable
/// string form.
fn load_sheet(path: &Path) -> ReferenceResult<ReferenceTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ReferenceError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReferenceError::Spreadsheet(format!("{}: no sheets", path.display())))?
        .map_err(|e| ReferenceError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .map(|c| cell_to_string(c).trim().to_lowercase())
            .collect(),
        None => return Ok(ReferenceTable::default()),
    };

    let col = |name: &str| headers.iter().position(|h| h == name);
    let (cod_idx, id_idx, loc_idx) = (col("cod_lograd"), col("id"), col("id_localidade"));

    let Some(cod_idx) = cod_idx else {
        return Ok(ReferenceTable::default());
    };

    let field = |row: &[Data], idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(cell_to_string)
            .unwrap_or_default()
    };

    let routes = rows
        .map(|row| ReferenceRoute {
            cod_lograd: normalize_street_code(&field(row, Some(cod_idx))),
            id: strip_numeric_suffix(&field(row, id_idx)),
            id_localidade: strip_numeric_suffix(&field(row, loc_idx)),
        })
        .collect();

    Ok(ReferenceTable {
        routes,
        has_join_column: true,
    })
}

/// Render a spreadsheet cell as a string.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

/// Strip the `.0` numeric-coercion artifact from identifier strings.
pub fn strip_numeric_suffix(s: &str) -> String {
    s.strip_suffix(".0").unwrap_or(s).to_string()
}

/// First-match route lookup keyed by normalized street code.
#[derive(Debug, Clone)]
pub struct RouteLookup {
    map: HashMap<String, ReferenceRoute>,
    /// False when the join column was absent everywhere; the merge is then
    /// skipped entirely.
    pub enabled: bool,
}

impl RouteLookup {
    pub fn build(table: &ReferenceTable) -> Self {
        let mut map = HashMap::new();
        for route in &table.routes {
            map.entry(route.cod_lograd.clone())
                .or_insert_with(|| route.clone());
        }
        Self {
            map,
            enabled: table.has_join_column,
        }
    }

    /// Build directly from routes, join column assumed present.
    pub fn from_routes(routes: Vec<ReferenceRoute>) -> Self {
        Self::build(&ReferenceTable {
            routes,
            has_join_column: true,
        })
    }

    /// An empty, disabled lookup (merge-skip mode).
    pub fn disabled() -> Self {
        Self {
            map: HashMap::new(),
            enabled: false,
        }
    }

    pub fn get(&self, cod_lograd: &str) -> Option<&ReferenceRoute> {
        self.map.get(cod_lograd)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
