//! CSV format reader
//!
//! Supports loading datasets from CSV files where:
//! - The last column is the class label, any text
//! - All other columns are numeric features
//! - First row can be headers (automatically detected)
//!
//! Class values are ordered by first appearance.

use crate::core::{Header, Result, SVMError};
use crate::data::instances::{assemble, assemble_with_header, RawRow};
use crate::data::Instances;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reader for comma separated files
pub struct CSVReader;

/// Rows plus the column names, if the file had a header line
struct Parsed {
    rows: Vec<RawRow>,
    column_names: Option<Vec<String>>,
    num_features: usize,
}

impl CSVReader {
    /// Load a dataset from a CSV file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Instances> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader, detecting a header line
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Instances> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        auto_detect_header: bool,
    ) -> Result<Instances> {
        let parsed = Self::read_rows(reader, auto_detect_header)?;

        let mut class_values: Vec<String> = Vec::new();
        for row in &parsed.rows {
            if !class_values.contains(&row.label) {
                class_values.push(row.label.clone());
            }
        }
        let feature_names = match parsed.column_names {
            Some(names) => names.into_iter().take(parsed.num_features).collect(),
            None => (1..=parsed.num_features).map(|i| format!("attr{i}")).collect(),
        };

        assemble(parsed.rows, feature_names, class_values)
    }

    /// Load a file laid out like an existing header, e.g. test data
    pub fn from_file_with_header<P: AsRef<Path>>(path: P, header: &Header) -> Result<Instances> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader_with_header(BufReader::new(file), header)
    }

    pub fn from_reader_with_header<R: BufRead>(reader: R, header: &Header) -> Result<Instances> {
        let parsed = Self::read_rows(reader, true)?;
        assemble_with_header(parsed.rows, header)
    }

    fn read_rows<R: BufRead>(reader: R, auto_detect_header: bool) -> Result<Parsed> {
        let mut rows = Vec::new();
        let mut column_names = None;
        let mut num_features = None;
        let mut seen_content = false;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if !seen_content {
                seen_content = true;
                if auto_detect_header && Self::is_header_line(line) {
                    column_names = Some(line.split(',').map(|f| f.trim().to_string()).collect());
                    continue;
                }
            }

            let (row, width) = Self::parse_data_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            match num_features {
                None => num_features = Some(width),
                Some(expected) if expected != width => {
                    return Err(SVMError::ParseError(format!(
                        "Error parsing line {}: expected {} feature columns, found {}",
                        line_num + 1,
                        expected,
                        width
                    )))
                }
                Some(_) => {}
            }
            rows.push(row);
        }

        match num_features {
            Some(num_features) => Ok(Parsed {
                rows,
                column_names,
                num_features,
            }),
            None => Err(SVMError::EmptyDataset),
        }
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() < 2 {
            return false;
        }

        // Data rows must parse completely, so any non-numeric feature
        // column marks a line of names
        fields[..fields.len() - 1]
            .iter()
            .any(|field| field.trim().parse::<f64>().is_err())
    }

    /// Parse a CSV data line; returns the row and its number of feature columns
    fn parse_data_line(line: &str) -> Result<(RawRow, usize)> {
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();

        if fields.len() < 2 {
            return Err(SVMError::ParseError(format!(
                "Line has too few fields: {line}"
            )));
        }

        let (label, feature_fields) = fields.split_last().ok_or(SVMError::EmptyDataset)?;
        if label.is_empty() {
            return Err(SVMError::ParseError("Empty class label".to_string()));
        }

        let mut features = Vec::new();
        for (idx, field) in feature_fields.iter().enumerate() {
            let value = field.parse::<f64>().map_err(|_| {
                SVMError::ParseError(format!("Invalid feature value at column {}: {}", idx + 1, field))
            })?;
            // Only store non-zero values for sparsity
            if value != 0.0 {
                features.push((idx, value));
            }
        }

        let row = RawRow {
            features,
            label: label.to_string(),
        };
        Ok((row, feature_fields.len()))
    }
}
