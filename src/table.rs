// SYNOID Kinematics - Frame Table
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Column-oriented per-frame table backing every stage. One row per video
// frame, one named f64 column per value. Missing cells are NaN on read and
// empty on write, so landmark gaps survive a round trip.

use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Ordered set of equally long, named numeric columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    names: Vec<String>,
    data: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl FrameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs, checking lengths and names.
    pub fn from_columns<I>(columns: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            if table.has_column(&name) {
                return Err(PipelineError::schema(name, 0, "duplicate column"));
            }
            table.set_column(&name, values)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], PipelineError> {
        self.index
            .get(name)
            .map(|&i| self.data[i].as_slice())
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    pub fn column_at(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<f64>, PipelineError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.data[i]),
            None => Err(PipelineError::MissingColumn(name.to_string())),
        }
    }

    /// Append a column, or replace it in place if the name already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), PipelineError> {
        if !self.names.is_empty() && values.len() != self.n_rows() {
            return Err(PipelineError::schema(
                name,
                values.len(),
                format!("column has {} rows, table has {}", values.len(), self.n_rows()),
            ));
        }
        match self.index.get(name) {
            Some(&i) => self.data[i] = values,
            None => {
                self.index.insert(name.to_string(), self.names.len());
                self.names.push(name.to_string());
                self.data.push(values);
            }
        }
        Ok(())
    }

    /// Values of one row in column order.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.data.iter().map(|col| col[i]).collect()
    }

    /// New table holding the given rows, in the order given.
    pub fn select_rows(&self, rows: &[usize]) -> FrameTable {
        let data = self
            .data
            .iter()
            .map(|col| rows.iter().map(|&r| col[r]).collect())
            .collect();
        FrameTable {
            names: self.names.clone(),
            data,
            index: self.index.clone(),
        }
    }

    /// Read a CSV file with a header row.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)
            .map_err(PipelineError::from)
            .with_context(|| format!("Opening table {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Reading table {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut data: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(PipelineError::schema(
                    headers.last().cloned().unwrap_or_default(),
                    row,
                    format!("expected {} fields, found {}", headers.len(), record.len()),
                )
                .into());
            }
            for (col, cell) in record.iter().enumerate() {
                let value = parse_cell(cell).ok_or_else(|| {
                    PipelineError::schema(&headers[col], row, format!("non-numeric value '{cell}'"))
                })?;
                data[col].push(value);
            }
        }

        Ok(Self::from_columns(headers.into_iter().zip(data))?)
    }

    /// Write the table as CSV. The file appears only once fully written.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating output dir {}", parent.display()))?;
        }

        let tmp = temp_path(path);
        let written = fs::File::create(&tmp)
            .map_err(anyhow::Error::from)
            .and_then(|file| self.to_writer(file));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.context(format!("Writing table {}", path.display())));
        }
        fs::rename(&tmp, path).with_context(|| format!("Finalizing table {}", path.display()))?;
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.names)?;
        let mut record = Vec::with_capacity(self.n_cols());
        for i in 0..self.n_rows() {
            record.clear();
            record.extend(self.data.iter().map(|col| format_cell(col[i])));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table.csv".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

/// Parse one CSV cell. Empty and null literals become NaN, booleans 1/0.
pub fn parse_cell(cell: &str) -> Option<f64> {
    match cell.trim() {
        "" | "None" | "none" | "null" | "nan" | "NaN" => Some(f64::NAN),
        "True" | "true" => Some(1.0),
        "False" | "false" => Some(0.0),
        other => other.parse().ok(),
    }
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameTable {
        FrameTable::from_columns(vec![
            ("frame".to_string(), vec![0.0, 1.0, 2.0]),
            ("nose_x".to_string(), vec![0.5, f64::NAN, 0.123456789012345]),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_cell_literals() {
        assert!(parse_cell("").unwrap().is_nan());
        assert!(parse_cell("None").unwrap().is_nan());
        assert_eq!(parse_cell("True"), Some(1.0));
        assert_eq!(parse_cell(" -0.25 "), Some(-0.25));
        assert_eq!(parse_cell("abc"), None);
    }

    #[test]
    fn test_round_trip_through_csv() {
        let table = sample();
        let mut buf = Vec::new();
        table.to_writer(&mut buf).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("frame,nose_x\n"));
        assert!(text.contains("1,\n"));

        let back = FrameTable::from_reader(buf.as_slice()).unwrap();
        assert_eq!(back.columns(), table.columns());
        let nose = back.column("nose_x").unwrap();
        assert_eq!(nose[0], 0.5);
        assert!(nose[1].is_nan());
        assert_eq!(nose[2], 0.123456789012345);
    }

    #[test]
    fn test_non_numeric_cell_is_schema_error() {
        let csv = "frame,label\n0,1.0\n1,jump\n";
        let err = FrameTable::from_reader(csv.as_bytes()).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::Schema { column, row, .. }) => {
                assert_eq!(column, "label");
                assert_eq!(*row, 1);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_ragged_row_is_rejected() {
        let csv = "a,b\n1,2\n3\n";
        assert!(FrameTable::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_set_column_checks_length() {
        let mut table = sample();
        assert!(table.set_column("short", vec![1.0]).is_err());
        table.set_column("nose_x", vec![9.0, 9.0, 9.0]).unwrap();
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.column("nose_x").unwrap(), &[9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_select_rows_keeps_order_and_columns() {
        let table = sample();
        let picked = table.select_rows(&[0, 2]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.column("frame").unwrap(), &[0.0, 2.0]);
        assert!(matches!(
            picked.column("missing"),
            Err(PipelineError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_write_csv_is_atomic_and_creates_dirs() {
        let dir = std::env::temp_dir().join("synoid_kinematics_table_write");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("clip.csv");

        sample().write_csv(&path).unwrap();
        assert!(path.exists());
        assert!(!dir.join("nested").join(".clip.csv.tmp").exists());

        let back = FrameTable::read_csv(&path).unwrap();
        assert_eq!(back.n_rows(), 3);

        let _ = fs::remove_dir_all(dir);
    }
}
