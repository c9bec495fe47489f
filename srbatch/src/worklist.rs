//! The worklist: rows of record ids, action codes, modifiers and outcome status.

use crate::errors::BatchError;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

pub const ID_COLUMN: &str = "ID";
pub const ACTION_COLUMN: &str = "Ação";
pub const STATUS_COLUMN: &str = "Status";
const MODIFIER_PREFIX: &str = "Mod";

/// Outcome recorded for a row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowStatus {
    #[default]
    Pending,
    Completed,
    /// Nothing had to change
    CompletedNoChange,
    Failed,
    /// A label we do not recognise. Kept verbatim, processed like `Pending`.
    Other(String),
}

impl RowStatus {
    /// Matching ignores case and Unicode composition form.
    pub fn parse(label: &str) -> Self {
        let trimmed = label.trim();
        let folded: String = trimmed.nfc().collect::<String>().to_lowercase();
        match folded.as_str() {
            "" => RowStatus::Pending,
            "concluída" | "concluida" | "completed" => RowStatus::Completed,
            "concluída (valor já correto)"
            | "concluida (valor ja correto)"
            | "completed (value already correct)" => RowStatus::CompletedNoChange,
            "falha" | "failed" => RowStatus::Failed,
            _ => RowStatus::Other(trimmed.to_string()),
        }
    }

    /// Label written back to the worklist file.
    pub fn label(&self) -> &str {
        match self {
            RowStatus::Pending => "",
            RowStatus::Completed => "Concluída",
            RowStatus::CompletedNoChange => "Concluída (valor já correto)",
            RowStatus::Failed => "Falha",
            RowStatus::Other(label) => label,
        }
    }

    /// Rows in a done state are never touched again.
    pub fn is_done(&self) -> bool {
        matches!(self, RowStatus::Completed | RowStatus::CompletedNoChange)
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Pending => f.write_str("pending"),
            other => f.write_str(other.label()),
        }
    }
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorklistRow {
    /// Record id with any spreadsheet float suffix removed
    pub id: String,
    /// Action code as written in the file
    pub action: String,
    /// `ModN` values keyed by N
    pub modifiers: BTreeMap<usize, String>,
    pub status: RowStatus,
    cells: Vec<String>,
}

impl WorklistRow {
    /// Value of the `ModN` column, `None` when blank or absent.
    pub fn modifier(&self, n: usize) -> Option<&str> {
        self.modifiers
            .get(&n)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn is_eligible(&self) -> bool {
        !self.id.is_empty() && !self.status.is_done()
    }
}

/// Spreadsheets hand integer ids back as "1234.0".
pub fn normalize_record_id(raw: &str) -> String {
    raw.trim()
        .split('.')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// The whole worklist, held in memory for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worklist {
    headers: Vec<String>,
    rows: Vec<WorklistRow>,
    status_col: usize,
}

impl Worklist {
    /// Build from a header row and records. Missing cells become empty strings;
    /// a `Status` column is appended when absent.
    pub fn from_records(
        mut headers: Vec<String>,
        records: Vec<Vec<String>>,
    ) -> Result<Self, BatchError> {
        if let Some(first) = headers.first_mut() {
            *first = first.trim_start_matches('\u{feff}').to_string();
        }
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let id_col = position(ID_COLUMN).ok_or_else(|| {
            BatchError::Configuration(format!("Worklist has no '{ID_COLUMN}' column"))
        })?;
        let action_col = position(ACTION_COLUMN).ok_or_else(|| {
            BatchError::Configuration(format!("Worklist has no '{ACTION_COLUMN}' column"))
        })?;
        let (status_col, appended) = match position(STATUS_COLUMN) {
            Some(col) => (col, false),
            None => {
                headers.push(STATUS_COLUMN.to_string());
                (headers.len() - 1, true)
            }
        };
        let modifier_cols: Vec<(usize, usize)> = headers
            .iter()
            .enumerate()
            .filter_map(|(col, h)| {
                h.trim()
                    .strip_prefix(MODIFIER_PREFIX)
                    .and_then(|n| n.parse::<usize>().ok())
                    .map(|n| (n, col))
            })
            .collect();

        let width = headers.len();
        let rows = records
            .into_iter()
            .map(|mut cells| {
                if appended {
                    // Stray cells past the original header stay data, not status.
                    if cells.len() < status_col {
                        cells.resize(status_col, String::new());
                    }
                    cells.insert(status_col, String::new());
                }
                cells.resize(width.max(cells.len()), String::new());
                WorklistRow {
                    id: normalize_record_id(&cells[id_col]),
                    action: cells[action_col].trim().to_string(),
                    modifiers: modifier_cols
                        .iter()
                        .map(|&(n, col)| (n, cells[col].clone()))
                        .collect(),
                    status: RowStatus::parse(&cells[status_col]),
                    cells,
                }
            })
            .collect();

        Ok(Self {
            headers,
            rows,
            status_col,
        })
    }

    pub fn from_csv<R: Read>(reader: R, delimiter: u8) -> Result<Self, BatchError> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);
        let headers = csv
            .headers()
            .map_err(|e| BatchError::Configuration(format!("Unreadable worklist header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut records = Vec::new();
        for record in csv.records() {
            let record =
                record.map_err(|e| BatchError::Configuration(format!("Unreadable worklist: {e}")))?;
            records.push(record.iter().map(str::to_string).collect());
        }
        Self::from_records(headers, records)
    }

    pub fn write_csv<W: Write>(&self, writer: W, delimiter: u8) -> Result<(), csv::Error> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(writer);
        csv.write_record(&self.headers)?;
        for row in &self.rows {
            let mut cells = row.cells.clone();
            cells[self.status_col] = row.status.label().to_string();
            csv.write_record(&cells)?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[WorklistRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn set_status(&mut self, index: usize, status: RowStatus) {
        if let Some(row) = self.rows.get_mut(index) {
            row.status = status;
        }
    }

    /// Indices of rows still needing work, in file order.
    ///
    /// A record id appearing more than once is only scheduled the first time.
    pub fn pending_indices(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            if !row.is_eligible() {
                continue;
            }
            if !seen.insert(row.id.as_str()) {
                warn!(
                    "Record {} appears more than once; skipping the repeat on line {}",
                    row.id,
                    index + 2
                );
                continue;
            }
            pending.push(index);
        }
        pending
    }
}

/// Where the worklist lives between runs.
pub trait WorklistStore: Send + Sync {
    fn load(&self) -> Result<Worklist, BatchError>;

    fn save(&self, worklist: &Worklist) -> Result<(), BatchError>;

    /// Human-readable location, for log lines.
    fn describe(&self) -> String;
}

/// CSV file on local disk, rewritten atomically.
#[derive(Debug, Clone)]
pub struct CsvWorklistStore {
    path: PathBuf,
    delimiter: u8,
}

impl CsvWorklistStore {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    fn persistence_error(&self, message: impl fmt::Display) -> BatchError {
        BatchError::Persistence {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }
}

impl WorklistStore for CsvWorklistStore {
    fn load(&self) -> Result<Worklist, BatchError> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            BatchError::Configuration(format!("Cannot open worklist {}: {e}", self.path.display()))
        })?;
        let worklist = Worklist::from_csv(std::io::BufReader::new(file), self.delimiter)?;
        info!(
            "📊 Loaded {} worklist rows from {}",
            worklist.len(),
            self.path.display()
        );
        Ok(worklist)
    }

    fn save(&self, worklist: &Worklist) -> Result<(), BatchError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.persistence_error(e))?;
        worklist
            .write_csv(&mut tmp, self.delimiter)
            .map_err(|e| self.persistence_error(e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.persistence_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.persistence_error(e.error))?;
        debug!("Worklist written to {}", self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
