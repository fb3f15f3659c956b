//! Generic BDPM file parser.
//!
//! Provides a streaming parser for the tab-delimited BDPM files. The files
//! have no header row and no quoting; a row is valid when it carries at least
//! the schema's columns, every required column is non-empty and every
//! numeric column parses. Invalid rows are counted and skipped.

use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

use csv::{Reader, ReaderBuilder, StringRecord};

use crate::types::{BdpmError, BdpmResult, ParseStats, SourceKind};

/// Trait for types that can be parsed from a BDPM row.
pub trait BdpmRecord: Sized {
    /// Source file this record comes from.
    const KIND: SourceKind;

    /// Column names of the schema, in file order. Rows with fewer columns are
    /// skipped; extra trailing columns are ignored.
    const EXPECTED_COLUMNS: &'static [&'static str];

    /// Parses a record from a row that has at least the expected columns.
    fn from_record(record: &StringRecord) -> BdpmResult<Self>;
}

/// Records parsed from one source, with the statistics of the parse.
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    /// Valid records in file order.
    pub records: Vec<T>,
    /// Row counters.
    pub stats: ParseStats,
}

/// A streaming parser for BDPM files.
///
/// Iterating yields one result per non-blank row: row-level errors are
/// recoverable (see [`BdpmError::is_row_level`]), anything else means the
/// underlying reader failed.
pub struct TsvParser<R: Read, T: BdpmRecord> {
    reader: Reader<R>,
    records_read: usize,
    _marker: PhantomData<T>,
}

impl<T: BdpmRecord> TsvParser<BufReader<File>, T> {
    /// Creates a new parser from a file path.
    ///
    /// # Errors
    /// Returns [`BdpmError::ParseFile`] if the file cannot be opened.
    pub fn from_path<P: AsRef<Path>>(path: P) -> BdpmResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| BdpmError::ParseFile {
            kind: T::KIND,
            path: path.display().to_string(),
            error,
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: Read, T: BdpmRecord> TsvParser<R, T> {
    /// Creates a new parser from a reader.
    pub fn from_reader(reader: R) -> Self {
        let reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::None)
            .from_reader(reader);

        Self {
            reader,
            records_read: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of non-blank rows read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Parses every row, skipping and counting invalid ones.
    ///
    /// # Errors
    /// Fails only when the underlying reader fails.
    pub fn parse_all(mut self) -> BdpmResult<Parsed<T>> {
        let start = Instant::now();
        let mut records = Vec::new();
        let mut skipped = 0;

        while let Some(result) = self.next() {
            match result {
                Ok(record) => records.push(record),
                Err(e) if e.is_row_level() => {
                    skipped += 1;
                    tracing::debug!(
                        "Skipping {} row {}: {}",
                        T::KIND,
                        self.records_read,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let stats = ParseStats {
            total_records: self.records_read,
            parsed_records: records.len(),
            skipped_records: skipped,
            parse_time_ms: start.elapsed().as_millis() as u64,
        };

        Ok(Parsed { records, stats })
    }
}

impl<R: Read, T: BdpmRecord> Iterator for TsvParser<R, T> {
    type Item = BdpmResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    // Blank lines are not rows
                    if record.is_empty() || record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }
                    self.records_read += 1;

                    let expected = T::EXPECTED_COLUMNS.len();
                    if record.len() < expected {
                        return Some(Err(BdpmError::ColumnCount {
                            expected,
                            found: record.len(),
                        }));
                    }

                    return Some(T::from_record(&record));
                }
                Ok(false) => return None,
                Err(e) => {
                    if !e.is_io_error() {
                        self.records_read += 1;
                    }
                    return Some(Err(e.into()));
                }
            }
        }
    }
}

/// Parses one scratch file, logging the outcome.
///
/// I/O failures are reported as [`BdpmError::ParseFile`] for the record's
/// source.
pub fn parse_source<T: BdpmRecord, P: AsRef<Path>>(path: P) -> BdpmResult<Parsed<T>> {
    let path = path.as_ref();
    let parsed = TsvParser::<_, T>::from_path(path)?
        .parse_all()
        .map_err(|e| match e {
            BdpmError::Csv(e) => BdpmError::ParseFile {
                kind: T::KIND,
                path: path.display().to_string(),
                error: e.into(),
            },
            other => other,
        })?;

    tracing::info!(
        "Parsed {} {} rows ({} skipped) in {} ms",
        parsed.stats.parsed_records,
        T::KIND,
        parsed.stats.skipped_records,
        parsed.stats.parse_time_ms
    );

    Ok(parsed)
}

/// Helper functions for reading BDPM field values.
pub mod parse {
    use csv::StringRecord;

    use crate::types::{BdpmError, BdpmResult};

    /// Returns column `index` trimmed, or an empty string past the row end.
    pub fn field(record: &StringRecord, index: usize) -> &str {
        record.get(index).map(str::trim).unwrap_or("")
    }

    /// Returns column `index` trimmed, failing when it is empty.
    pub fn required<'r>(
        record: &'r StringRecord,
        index: usize,
        column: &'static str,
    ) -> BdpmResult<&'r str> {
        let value = field(record, index);
        if value.is_empty() {
            return Err(BdpmError::EmptyField { column });
        }
        Ok(value)
    }

    /// Parses a required integer column.
    pub fn integer<T: std::str::FromStr>(
        record: &StringRecord,
        index: usize,
        column: &'static str,
    ) -> BdpmResult<T> {
        let value = required(record, index, column)?;
        value.parse::<T>().map_err(|_| BdpmError::InvalidInteger {
            column,
            value: value.to_string(),
        })
    }

    /// Parses an optional integer column; empty or invalid values are `None`.
    pub fn optional_integer<T: std::str::FromStr>(record: &StringRecord, index: usize) -> Option<T> {
        field(record, index).parse::<T>().ok()
    }

    /// Parses a price written in French notation ("1 234,56", "12,3").
    ///
    /// Older files group thousands with a comma ("1,234,56"); only the last
    /// comma is the decimal separator.
    pub fn french_decimal(value: &str) -> Option<f64> {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
            .collect();
        if compact.is_empty() {
            return None;
        }

        let normalized = match compact.rfind(',') {
            Some(pos) => {
                let (int_part, frac_part) = compact.split_at(pos);
                format!("{}.{}", int_part.replace(',', ""), &frac_part[1..])
            }
            None => compact,
        };
        normalized.parse::<f64>().ok()
    }

    /// Splits a list column on `separator`, dropping empty items.
    pub fn list(value: &str, separator: char) -> Vec<String> {
        value
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parses a French yes/no column ("Oui"/"Non"); anything else is `false`.
    pub fn oui_non(value: &str) -> bool {
        value.trim().eq_ignore_ascii_case("oui")
    }
}
