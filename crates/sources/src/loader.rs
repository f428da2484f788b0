//! Streaming reader for the delimited voter-registration extract.
//!
//! Rows are read into one reused [`ByteRecord`]; only the mapped fields and
//! the configured pass-through columns survive a row. Fields that are not
//! valid UTF-8 are decoded as Windows-1252.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ByteRecord;
use rollcheck_linkage::config::{ColumnRef, RegistrationConfig};
use rollcheck_linkage::model::{
    Checked, DiagnosticKind, Diagnostics, RegistrationStatus, VoterRecord,
};
use rollcheck_linkage::{normalize_parts, LinkError, LinkageConfig};

/// A registration extract on disk. Every call to [`records`](Self::records)
/// reopens the file and starts a fresh pass.
#[derive(Debug, Clone)]
pub struct RegistrationLoader {
    path: PathBuf,
    config: RegistrationConfig,
    reference_year: i32,
    sample_limit: usize,
}

impl RegistrationLoader {
    /// Opens the file once to check it is readable and that every named
    /// column is in the header.
    pub fn open(path: impl AsRef<Path>, config: &LinkageConfig) -> Result<Self, LinkError> {
        let loader = Self {
            path: path.as_ref().to_path_buf(),
            config: config.registration.clone(),
            reference_year: config.matching.effective_reference_year(),
            sample_limit: config.extraction.sample_limit,
        };
        loader.records()?;
        Ok(loader)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Result<VoterRows<File>, LinkError> {
        let file = File::open(&self.path)
            .map_err(|e| LinkError::Io(format!("cannot open {}: {e}", self.path.display())))?;
        VoterRows::new(file, &self.config, self.reference_year, self.sample_limit)
    }

    /// One pass over an in-memory or piped extract.
    pub fn from_reader<R: Read>(reader: R, config: &LinkageConfig) -> Result<VoterRows<R>, LinkError> {
        VoterRows::new(
            reader,
            &config.registration,
            config.matching.effective_reference_year(),
            config.extraction.sample_limit,
        )
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ColumnMap {
    voter_id: usize,
    given: usize,
    middle: Option<usize>,
    family: usize,
    suffix: Option<usize>,
    birth_year: usize,
    status: Option<usize>,
    /// (residual key, position)
    passthrough: Vec<(String, usize)>,
    width: Option<usize>,
}

impl ColumnMap {
    fn resolve(config: &RegistrationConfig, header: Option<&[String]>) -> Result<Self, LinkError> {
        let cols = &config.columns;
        let find = |column: &ColumnRef| resolve_column(column, header);
        let find_opt = |column: &Option<ColumnRef>| column.as_ref().map(find).transpose();

        let passthrough = config
            .passthrough
            .iter()
            .map(|column| {
                let idx = find(column)?;
                let key = match (column, header) {
                    (ColumnRef::Name(name), _) => name.clone(),
                    (ColumnRef::Index(_), Some(h)) => h[idx].clone(),
                    (ColumnRef::Index(i), None) => format!("column_{i}"),
                };
                Ok((key, idx))
            })
            .collect::<Result<Vec<_>, LinkError>>()?;

        Ok(Self {
            voter_id: find(&cols.voter_id)?,
            given: find(&cols.given)?,
            middle: find_opt(&cols.middle)?,
            family: find(&cols.family)?,
            suffix: find_opt(&cols.suffix)?,
            birth_year: find(&cols.birth_year)?,
            status: find_opt(&cols.status)?,
            passthrough,
            width: config.expected_columns.or(header.map(<[String]>::len)),
        })
    }

    /// Build a voter from one row, or describe why the row is malformed.
    fn build(&self, record: &ByteRecord, reference_year: i32) -> Result<VoterRecord, String> {
        if let Some(width) = self.width {
            if record.len() != width {
                return Err(format!("expected {width} columns, found {}", record.len()));
            }
        }
        let required = |idx: usize| {
            record
                .get(idx)
                .map(decode_field)
                .ok_or_else(|| format!("missing column {idx}"))
        };
        let optional = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(decode_field)
                .unwrap_or(Cow::Borrowed(""))
        };

        let voter_id = required(self.voter_id)?.trim().to_string();
        if voter_id.is_empty() {
            return Err("blank voter id".into());
        }

        let raw_year = required(self.birth_year)?;
        let raw_year = raw_year.trim();
        let birth_year = if raw_year.is_empty() {
            Checked::Unknown
        } else {
            let year: i64 = raw_year
                .parse()
                .map_err(|_| format!("birth year {raw_year:?} is not a number"))?;
            Checked::<i32>::birth_year(year, reference_year)
        };

        let name = normalize_parts(
            &required(self.given)?,
            &optional(self.middle),
            &required(self.family)?,
            &optional(self.suffix),
        );

        let mut residual = BTreeMap::new();
        for (key, idx) in &self.passthrough {
            if let Some(value) = record.get(*idx) {
                residual.insert(key.clone(), decode_field(value).trim().to_string());
            }
        }

        Ok(VoterRecord {
            voter_id,
            name,
            birth_year,
            registration_status: RegistrationStatus::from_code(&optional(self.status)),
            residual,
        })
    }
}

fn resolve_column(column: &ColumnRef, header: Option<&[String]>) -> Result<usize, LinkError> {
    match (column, header) {
        (ColumnRef::Name(name), Some(h)) => h
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| LinkError::MissingColumn { column: name.clone() }),
        (ColumnRef::Name(name), None) => Err(LinkError::MissingColumn { column: name.clone() }),
        (ColumnRef::Index(i), Some(h)) if *i >= h.len() => Err(LinkError::MissingColumn {
            column: format!("#{i}"),
        }),
        (ColumnRef::Index(i), _) => Ok(*i),
    }
}

/// UTF-8 when possible, Windows-1252 otherwise (common for county exports).
fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

// ---------------------------------------------------------------------------
// Row iterator
// ---------------------------------------------------------------------------

/// Lazy voter records from one pass over an extract. Malformed rows are
/// counted in [`diagnostics`](Self::diagnostics) and skipped.
pub struct VoterRows<R> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    columns: ColumnMap,
    reference_year: i32,
    diagnostics: Diagnostics,
    loaded: usize,
    done: bool,
}

impl<R: Read> VoterRows<R> {
    fn new(
        source: R,
        config: &RegistrationConfig,
        reference_year: i32,
        sample_limit: usize,
    ) -> Result<Self, LinkError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter_byte())
            .has_headers(config.has_header)
            .flexible(true)
            .from_reader(source);

        let header = if config.has_header {
            let raw = reader
                .byte_headers()
                .map_err(|e| LinkError::Io(format!("cannot read extract header: {e}")))?;
            Some(raw.iter().map(|f| decode_field(f).trim().to_string()).collect::<Vec<_>>())
        } else {
            None
        };
        let columns = ColumnMap::resolve(config, header.as_deref())?;

        Ok(Self {
            reader,
            record: ByteRecord::new(),
            columns,
            reference_year,
            diagnostics: Diagnostics::with_sample_limit(sample_limit),
            loaded: 0,
            done: false,
        })
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Records yielded so far.
    pub fn loaded(&self) -> usize {
        self.loaded
    }

    fn finish(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        log::info!(
            "registration extract: {} voters loaded, {} rows skipped",
            self.loaded,
            self.diagnostics.skipped_rows
        );
        if self.diagnostics.skipped_rows > 0 {
            log::warn!(
                "registration extract: {} malformed rows skipped",
                self.diagnostics.skipped_rows
            );
        }
    }

    fn location(&self) -> String {
        match self.record.position() {
            Some(pos) => format!("line {}", pos.line()),
            None => "line ?".to_string(),
        }
    }
}

impl<R: Read> Iterator for VoterRows<R> {
    type Item = VoterRecord;

    fn next(&mut self) -> Option<VoterRecord> {
        while !self.done {
            match self.reader.read_byte_record(&mut self.record) {
                Ok(false) => self.finish(),
                Ok(true) => match self.columns.build(&self.record, self.reference_year) {
                    Ok(voter) => {
                        if voter.name.is_degraded() {
                            let location = self.location();
                            self.diagnostics.record(
                                DiagnosticKind::ParseDegraded,
                                location,
                                format!("name {:?}", voter.name.raw_text),
                            );
                        }
                        self.loaded += 1;
                        return Some(voter);
                    }
                    Err(detail) => {
                        let location = self.location();
                        self.diagnostics.record(DiagnosticKind::RowMalformed, location, detail);
                    }
                },
                Err(e) if e.is_io_error() => {
                    let location = self.location();
                    self.diagnostics.record(DiagnosticKind::RowMalformed, location, e.to_string());
                    log::warn!("registration extract: read failed, stopping pass: {e}");
                    self.finish();
                }
                Err(e) => {
                    let location = e
                        .position()
                        .map(|p| format!("line {}", p.line()))
                        .unwrap_or_else(|| self.location());
                    self.diagnostics.record(DiagnosticKind::RowMalformed, location, e.to_string());
                }
            }
        }
        None
    }
}
