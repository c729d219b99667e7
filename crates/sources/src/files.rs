//! Uploaded spreadsheet storage.

use crate::sheet::Sheet;
use bulksms_core::types::number_text;
use bulksms_core::{BulkSmsError, BulkSmsResult};
use calamine::{open_workbook_auto, Data, Reader};
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Blocking access to uploaded files. Callers on the async runtime go
/// through `RecipientSourceAdapter`, which moves these calls off the reactor.
pub trait FileStore: Send + Sync {
    /// Persist an upload and return the sanitised name it is stored under.
    fn save(&self, name: &str, bytes: &[u8]) -> BulkSmsResult<String>;

    fn read(&self, name: &str) -> BulkSmsResult<Vec<u8>>;

    fn sheet_names(&self, name: &str) -> BulkSmsResult<Vec<String>>;

    fn open_sheet(&self, name: &str, sheet: &str) -> BulkSmsResult<Sheet>;
}

/// Strip path components and anything outside `[A-Za-z0-9._-]`.
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn require_name(name: &str) -> BulkSmsResult<String> {
    sanitize_filename(name)
        .ok_or_else(|| BulkSmsError::InputValidation(format!("invalid file name '{name}'")))
}

// ─── Upload directory (calamine) ─────────────────────────────────────────────

/// Spreadsheets stored in a directory on local disk, read with calamine
/// (`.xlsx`, `.xlsm`, `.xls`, `.ods`).
pub struct UploadDirStore {
    dir: PathBuf,
}

impl UploadDirStore {
    /// Create the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> BulkSmsResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Upload directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn existing_path(&self, name: &str) -> BulkSmsResult<PathBuf> {
        let path = self.dir.join(require_name(name)?);
        if !path.is_file() {
            return Err(BulkSmsError::SourceNotFound(format!("file '{name}'")));
        }
        Ok(path)
    }

    fn open(&self, name: &str) -> BulkSmsResult<calamine::Sheets<std::io::BufReader<std::fs::File>>> {
        let path = self.existing_path(name)?;
        open_workbook_auto(&path)
            .map_err(|e| BulkSmsError::Store(format!("cannot read workbook '{name}': {e}")))
    }
}

impl FileStore for UploadDirStore {
    fn save(&self, name: &str, bytes: &[u8]) -> BulkSmsResult<String> {
        let stored = require_name(name)?;
        std::fs::write(self.dir.join(&stored), bytes)?;
        debug!(file = %stored, bytes = bytes.len(), "Upload stored");
        Ok(stored)
    }

    fn read(&self, name: &str) -> BulkSmsResult<Vec<u8>> {
        let path = self.existing_path(name)?;
        Ok(std::fs::read(path)?)
    }

    fn sheet_names(&self, name: &str) -> BulkSmsResult<Vec<String>> {
        Ok(self.open(name)?.sheet_names())
    }

    fn open_sheet(&self, name: &str, sheet: &str) -> BulkSmsResult<Sheet> {
        let mut workbook = self.open(name)?;
        if !workbook.sheet_names().iter().any(|s| s == sheet) {
            return Err(BulkSmsError::SourceNotFound(format!(
                "sheet '{sheet}' in file '{name}'"
            )));
        }
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| BulkSmsError::Store(format!("cannot read sheet '{sheet}': {e}")))?;

        // The used range may start below/right of A1; index absolutely from A1.
        let Some((last_row, last_col)) = range.end() else {
            return Ok(Sheet::default());
        };
        let rows = (0..=last_row)
            .map(|r| {
                (0..=last_col)
                    .map(|c| range.get_value((r, c)).and_then(cell_text))
                    .collect()
            })
            .collect();
        Ok(Sheet::new(rows))
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) | Data::Bool(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => serde_json::Number::from_f64(*f).map(|n| number_text(&n)),
        other => Some(other.to_string()),
    }
}

// ─── In-memory ───────────────────────────────────────────────────────────────

/// In-memory file store for tests and demos. Workbooks are registered as
/// already-parsed sheets; raw uploads are kept as bytes.
#[derive(Default)]
pub struct MemoryFileStore {
    workbooks: DashMap<String, Vec<(String, Sheet)>>,
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workbook; sheet order is preserved.
    pub fn insert_workbook(&self, name: &str, sheets: Vec<(&str, Sheet)>) {
        let sheets = sheets
            .into_iter()
            .map(|(sheet_name, sheet)| (sheet_name.to_string(), sheet))
            .collect();
        self.workbooks.insert(name.to_string(), sheets);
    }

    fn sheets_of(&self, name: &str) -> BulkSmsResult<Vec<(String, Sheet)>> {
        self.workbooks
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BulkSmsError::SourceNotFound(format!("file '{name}'")))
    }
}

impl FileStore for MemoryFileStore {
    fn save(&self, name: &str, bytes: &[u8]) -> BulkSmsResult<String> {
        let stored = require_name(name)?;
        self.blobs.insert(stored.clone(), bytes.to_vec());
        Ok(stored)
    }

    fn read(&self, name: &str) -> BulkSmsResult<Vec<u8>> {
        self.blobs
            .get(name)
            .map(|b| b.value().clone())
            .ok_or_else(|| BulkSmsError::SourceNotFound(format!("file '{name}'")))
    }

    fn sheet_names(&self, name: &str) -> BulkSmsResult<Vec<String>> {
        Ok(self.sheets_of(name)?.into_iter().map(|(n, _)| n).collect())
    }

    fn open_sheet(&self, name: &str, sheet: &str) -> BulkSmsResult<Sheet> {
        let sheets: HashMap<String, Sheet> = self.sheets_of(name)?.into_iter().collect();
        sheets.get(sheet).cloned().ok_or_else(|| {
            BulkSmsError::SourceNotFound(format!("sheet '{sheet}' in file '{name}'"))
        })
    }
}
