//! Delimited-text coordinate reader.

use crate::{Error, Result};
use ripley_core::point::GeoCoord;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Row counts from one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    /// Data records after the header.
    pub rows: usize,
    /// Records with usable coordinates.
    pub kept: usize,
    /// Records skipped for empty or unparsable coordinates.
    pub skipped: usize,
}

/// Reads longitude/latitude pairs from a CSV file with a header row.
///
/// Columns are located by name (case-insensitive). Fields may be wrapped in
/// double quotes, in which case they can contain the delimiter, line breaks
/// and doubled quotes.
#[derive(Debug, Clone)]
pub struct CoordinateReader {
    lon_column: String,
    lat_column: String,
    delimiter: char,
}

impl Default for CoordinateReader {
    fn default() -> Self {
        Self {
            lon_column: "Longitude".to_string(),
            lat_column: "Latitude".to_string(),
            delimiter: ',',
        }
    }
}

impl CoordinateReader {
    /// Creates a reader for `Longitude`/`Latitude` columns in comma-separated
    /// input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the column names.
    #[must_use]
    pub fn with_columns(mut self, lon: impl Into<String>, lat: impl Into<String>) -> Self {
        self.lon_column = lon.into();
        self.lat_column = lat.into();
        self
    }

    /// Sets the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Reads coordinates from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header lacks a
    /// coordinate column.
    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> Result<(Vec<GeoCoord>, ReadSummary)> {
        let file = File::open(path)?;
        self.read(BufReader::new(file))
    }

    /// Reads coordinates from any buffered source.
    ///
    /// # Errors
    /// [`Error::InvalidFormat`] without a header row, [`Error::MissingColumn`]
    /// if a coordinate column is absent, [`Error::Io`] on read failure.
    pub fn read<R: BufRead>(&self, reader: R) -> Result<(Vec<GeoCoord>, ReadSummary)> {
        let mut records = Records {
            lines: reader.lines(),
        };

        let header = records
            .next_record()?
            .ok_or_else(|| Error::InvalidFormat("input has no header row".to_string()))?;
        let header = header.strip_prefix('\u{feff}').unwrap_or(&header).to_string();
        let names = split_record(&header, self.delimiter);
        let lon_idx = find_column(&names, &self.lon_column)?;
        let lat_idx = find_column(&names, &self.lat_column)?;

        let mut coords = Vec::new();
        let mut summary = ReadSummary::default();
        while let Some(record) = records.next_record()? {
            if record.trim().is_empty() {
                continue;
            }
            summary.rows += 1;
            let fields = split_record(&record, self.delimiter);
            match (
                fields.get(lon_idx).and_then(|f| parse_coordinate(f)),
                fields.get(lat_idx).and_then(|f| parse_coordinate(f)),
            ) {
                (Some(lon), Some(lat)) => {
                    coords.push(GeoCoord::new(lon, lat));
                    summary.kept += 1;
                }
                _ => summary.skipped += 1,
            }
        }

        Ok((coords, summary))
    }
}

/// Joins physical lines until the quotes of a record are balanced.
struct Records<L> {
    lines: L,
}

impl<L: Iterator<Item = std::io::Result<String>>> Records<L> {
    fn next_record(&mut self) -> Result<Option<String>> {
        let Some(first) = self.lines.next() else {
            return Ok(None);
        };
        let mut record = first?;
        while record.matches('"').count() % 2 == 1 {
            match self.lines.next() {
                Some(line) => {
                    record.push('\n');
                    record.push_str(&line?);
                }
                None => {
                    return Err(Error::InvalidFormat(
                        "unterminated quoted field at end of input".to_string(),
                    ))
                }
            }
        }
        Ok(Some(record))
    }
}

fn find_column(names: &[String], wanted: &str) -> Result<usize> {
    names
        .iter()
        .position(|name| name.trim().eq_ignore_ascii_case(wanted.trim()))
        .ok_or_else(|| Error::MissingColumn(wanted.to_string()))
}

fn parse_coordinate(field: &str) -> Option<f64> {
    let value = field.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Splits one record into fields, honouring double-quoted fields.
pub(crate) fn split_record(record: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = record.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' {
            in_quotes = true;
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field));
        } else if c != '\r' {
            field.push(c);
        }
    }
    fields.push(field);
    fields
}
