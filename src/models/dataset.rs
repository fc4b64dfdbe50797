// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::columns::{resolve_columns, ColumnCandidates, ResolvedColumns, Role};
use crate::error::DashboardError;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, Trim};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Cell spellings read as a missing value.
const NA_TOKENS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

fn is_na(cell: &str) -> bool {
    NA_TOKENS.contains(&cell.trim())
}

/// Finite numbers only; `inf` and friends are not numeric.
fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(dt) if dt.time() == NaiveTime::MIN => write!(f, "{}", dt.format("%Y-%m-%d")),
            Value::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Parse a timestamp or a plain date (which lands on midnight).
///
/// RFC 3339 values with an offset keep their wall-clock time.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Row-major table as read from the CSV. Never mutated after loading;
/// filters build new datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    #[cfg(test)]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom. Empty when the column is absent.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Finite numeric cells of one column.
    pub fn numbers(&self, name: &str) -> Vec<f64> {
        self.column_values(name)
            .filter_map(Value::as_f64)
            .filter(|n| n.is_finite())
            .collect()
    }

    /// New dataset holding only rows matching `keep`, original order preserved.
    pub fn retain_rows<F>(&self, keep: F) -> Dataset
    where
        F: Fn(&[Value]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Load a CSV file. A missing file surfaces as `DashboardError::DatasetNotFound`.
    pub fn from_path(
        path: &Path,
        candidates: &ColumnCandidates,
    ) -> Result<(Dataset, ResolvedColumns)> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DashboardError::DatasetNotFound {
                    path: path.to_path_buf(),
                }
                .into())
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open CSV file: {}", path.display()))
            }
        };
        Self::from_reader(file, candidates)
            .with_context(|| format!("Failed to load dataset from {}", path.display()))
    }

    /// Read a CSV with a header row, resolve column roles and type the cells.
    pub fn from_reader<R: Read>(
        reader: R,
        candidates: &ColumnCandidates,
    ) -> Result<(Dataset, ResolvedColumns)> {
        let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut raw_rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            raw_rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let resolved = resolve_columns(&columns, candidates);
        let mut rows: Vec<Vec<Value>> = vec![Vec::with_capacity(columns.len()); raw_rows.len()];

        for (col_idx, name) in columns.iter().enumerate() {
            let cells = raw_rows.iter().map(|r| r.get(col_idx).map(String::as_str).unwrap_or(""));
            let typed = if resolved.date.as_deref() == Some(name.as_str()) {
                parse_date_column(name, cells)?
            } else {
                infer_column(cells)
            };
            if let Some(role) = numeric_role(&resolved, name) {
                ensure_numeric(name, role, &raw_rows, col_idx, &typed)?;
            }
            for (row, value) in rows.iter_mut().zip(typed) {
                row.push(value);
            }
        }

        tracing::info!(rows = rows.len(), columns = columns.len(), "dataset loaded");
        Ok((Dataset { columns, rows }, resolved))
    }
}

fn numeric_role(resolved: &ResolvedColumns, name: &str) -> Option<Role> {
    [Role::Amount, Role::Quantity]
        .into_iter()
        .find(|role| resolved.get(*role) == Some(name))
}

fn parse_date_column<'a>(
    column: &str,
    cells: impl Iterator<Item = &'a str>,
) -> Result<Vec<Value>, DashboardError> {
    cells
        .enumerate()
        .map(|(i, cell)| {
            if is_na(cell) {
                return Ok(Value::Missing);
            }
            parse_datetime(cell)
                .map(Value::Date)
                .ok_or_else(|| DashboardError::InvalidDate {
                    column: column.to_string(),
                    row: i + 1,
                    value: cell.to_string(),
                })
        })
        .collect()
}

/// Numeric when every non-missing cell is a finite float, text otherwise.
fn infer_column<'a>(cells: impl Iterator<Item = &'a str>) -> Vec<Value> {
    let cells: Vec<&str> = cells.collect();
    let numeric = cells.iter().all(|c| is_na(c) || parse_number(c).is_some());

    cells
        .into_iter()
        .map(|cell| {
            if is_na(cell) {
                Value::Missing
            } else if numeric {
                parse_number(cell).map(Value::Number).unwrap_or(Value::Missing)
            } else {
                Value::Text(cell.to_string())
            }
        })
        .collect()
}

fn ensure_numeric(
    column: &str,
    role: Role,
    raw_rows: &[Vec<String>],
    col_idx: usize,
    typed: &[Value],
) -> Result<(), DashboardError> {
    if !typed.iter().any(|v| matches!(v, Value::Text(_))) {
        return Ok(());
    }
    let offending = raw_rows.iter().enumerate().find_map(|(i, row)| {
        let cell = row.get(col_idx).map(String::as_str).unwrap_or("");
        (!is_na(cell) && parse_number(cell).is_none()).then(|| (i, cell.to_string()))
    });
    let (row, value) = offending.unwrap_or_default();
    tracing::warn!(%role, column, "role column holds non-numeric values");
    Err(DashboardError::NonNumericColumn {
        column: column.to_string(),
        row: row + 1,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Order Date,Product Category,Amount,Qty,Note
2024-01-05,Shoes,120.50,2,first
2024-01-05 14:30:00,Bags,80,1,
01/20/2024,Shoes,,3,late
";

    #[test]
    fn test_load_types_cells_by_role() -> Result<()> {
        let (ds, roles) = Dataset::from_reader(SAMPLE.as_bytes(), &ColumnCandidates::default())?;

        assert_eq!(roles.date.as_deref(), Some("Order Date"));
        assert_eq!(roles.amount.as_deref(), Some("Amount"));
        assert_eq!(roles.category.as_deref(), Some("Product Category"));
        assert_eq!(roles.quantity.as_deref(), Some("Qty"));
        assert_eq!(ds.len(), 3);

        let dates: Vec<_> = ds.column_values("Order Date").filter_map(Value::as_datetime).collect();
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_time(NaiveTime::MIN));
        assert_eq!(
            dates[1],
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap().and_hms_opt(14, 30, 0).unwrap()
        );
        assert_eq!(dates[2].date(), NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());

        assert_eq!(ds.numbers("Amount"), vec![120.5, 80.0]);
        assert_eq!(ds.rows()[1][4], Value::Missing);
        assert_eq!(ds.rows()[0][4], Value::Text("first".to_string()));
        Ok(())
    }

    #[test]
    fn test_bad_date_cell_is_reported() {
        let csv = "Date,Amount\n2024-13-45,10\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default()).unwrap_err();
        match err.downcast_ref::<DashboardError>() {
            Some(DashboardError::InvalidDate { column, row, .. }) => {
                assert_eq!(column, "Date");
                assert_eq!(*row, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let csv = "Date,Amount\n2024-01-01,10\n2024-01-02,$12\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashboardError>(),
            Some(DashboardError::NonNumericColumn { row: 2, .. })
        ));
    }

    #[test]
    fn test_non_numeric_error_names_offending_cell() {
        let csv = "Date,Amount\n2024-01-01,10\n2024-01-02,NA\n2024-01-03,inf\n2024-01-04,12\n";
        let err = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default()).unwrap_err();
        match err.downcast_ref::<DashboardError>() {
            Some(DashboardError::NonNumericColumn { row, value, .. }) => {
                assert_eq!(*row, 3);
                assert_eq!(value, "inf");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_na_tokens_load_as_missing() -> Result<()> {
        let csv = "Date,Category,Amount\n2024-01-01,Shoes,10\nNA,null,NaN\n2024-01-03,N/A,#N/A\n2024-01-04,Bags,20\n";
        let (ds, _) = Dataset::from_reader(csv.as_bytes(), &ColumnCandidates::default())?;

        assert_eq!(ds.numbers("Amount"), vec![10.0, 20.0]);
        assert_eq!(ds.rows()[1], vec![Value::Missing, Value::Missing, Value::Missing]);
        assert_eq!(ds.rows()[2][1], Value::Missing);
        assert_eq!(ds.rows()[3][1], Value::Text("Bags".to_string()));
        Ok(())
    }

    #[test]
    fn test_fractional_and_offset_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            parse_datetime("2024-01-05T14:30:00.123Z"),
            Some(day.and_hms_milli_opt(14, 30, 0, 123).unwrap())
        );
        assert_eq!(
            parse_datetime("2024-01-05 14:30:00.5"),
            Some(day.and_hms_milli_opt(14, 30, 0, 500).unwrap())
        );
        assert_eq!(
            parse_datetime("2024-01-05T14:30:00+02:00"),
            Some(day.and_hms_opt(14, 30, 0).unwrap())
        );
        assert_eq!(parse_datetime("2024-01-05"), Some(day.and_time(NaiveTime::MIN)));
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_missing_file_maps_to_dataset_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");
        let err = Dataset::from_path(&path, &ColumnCandidates::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DashboardError>(),
            Some(DashboardError::DatasetNotFound { .. })
        ));
    }

    #[test]
    fn test_retain_rows_builds_new_dataset() -> Result<()> {
        let (ds, _) = Dataset::from_reader(SAMPLE.as_bytes(), &ColumnCandidates::default())?;
        let shoes = ds.retain_rows(|row| row[1] == Value::Text("Shoes".to_string()));
        assert_eq!(shoes.len(), 2);
        assert_eq!(ds.len(), 3);
        assert_eq!(shoes.columns(), ds.columns());
        Ok(())
    }

    #[test]
    fn test_value_display() {
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_time(NaiveTime::MIN);
        assert_eq!(Value::Date(midnight).to_string(), "2024-03-01");
        assert_eq!(Value::Number(12.0).to_string(), "12");
        assert_eq!(Value::Number(12.5).to_string(), "12.5");
        assert_eq!(Value::Missing.to_string(), "");
    }
}
