//! LibSVM format reader
//!
//! Supports loading datasets in the libsvm format:
//! label index:value index:value ...
//!
//! Example:
//! 1 1:0.5 3:1.2 7:0.8
//! 3 2:0.3 5:2.1
//!
//! Every distinct label becomes a nominal class value, ordered numerically.

use crate::core::{Header, Result, SVMError};
use crate::data::instances::{assemble, assemble_with_header, RawRow};
use crate::data::Instances;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reader for LibSVM format files
pub struct LibSVMReader;

impl LibSVMReader {
    /// Load a dataset from a LibSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Instances> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Instances> {
        let (rows, labels, max_dimension) = Self::read_rows(reader)?;

        let mut distinct = labels;
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let class_values = distinct.into_iter().map(format_label).collect();
        let feature_names = (1..=max_dimension).map(|i| format!("attr{i}")).collect();

        assemble(rows, feature_names, class_values)
    }

    /// Load a file laid out like an existing header, e.g. test data
    pub fn from_file_with_header<P: AsRef<Path>>(path: P, header: &Header) -> Result<Instances> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader_with_header(BufReader::new(file), header)
    }

    pub fn from_reader_with_header<R: BufRead>(reader: R, header: &Header) -> Result<Instances> {
        let (rows, _, _) = Self::read_rows(reader)?;
        assemble_with_header(rows, header)
    }

    fn read_rows<R: BufRead>(reader: R) -> Result<(Vec<RawRow>, Vec<f64>, usize)> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut max_dimension = 0;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, features) = Self::parse_line(line).map_err(|e| {
                SVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            if let Some(&(max_idx, _)) = features.iter().max_by_key(|(i, _)| *i) {
                max_dimension = max_dimension.max(max_idx + 1);
            }
            labels.push(label);
            rows.push(RawRow {
                features,
                label: format_label(label),
            });
        }

        if rows.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        Ok((rows, labels, max_dimension))
    }

    /// Parse a single line in libsvm format
    fn parse_line(line: &str) -> Result<(f64, Vec<(usize, f64)>)> {
        let mut parts = line.split_whitespace();

        let label_str = parts
            .next()
            .ok_or_else(|| SVMError::ParseError("Empty line".to_string()))?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| SVMError::ParseError(format!("Invalid label: {label_str}")))?;
        if !label.is_finite() {
            return Err(SVMError::ParseError(format!("Invalid label: {label_str}")));
        }

        let mut features = Vec::new();
        for feature_str in parts {
            let (index, value) = feature_str.split_once(':').ok_or_else(|| {
                SVMError::ParseError(format!("Invalid feature format: {feature_str}"))
            })?;

            let index = index
                .parse::<usize>()
                .map_err(|_| SVMError::ParseError(format!("Invalid feature index: {index}")))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| SVMError::ParseError(format!("Invalid feature value: {value}")))?;

            // libsvm uses 1-based indexing, convert to 0-based
            if index == 0 {
                return Err(SVMError::ParseError(
                    "Feature index must be positive: 0".to_string(),
                ));
            }
            features.push((index - 1, value));
        }

        Ok((label, features))
    }
}

/// Canonical text of a numeric label: integers without a fraction
fn format_label(label: f64) -> String {
    if label.fract() == 0.0 && label.abs() < 1e15 {
        format!("{}", label as i64)
    } else {
        label.to_string()
    }
}
