// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::PathBuf;
use thiserror::Error;

/// Conditions the CLI branches on. Everything else travels as `anyhow::Error`.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dataset not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("column '{column}' row {row}: cannot parse '{value}' as a date")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column '{column}' must be numeric (row {row} holds '{value}')")]
    NonNumericColumn {
        column: String,
        row: usize,
        value: String,
    },

    #[error("no {column} values in the current selection, average is undefined")]
    EmptySelection { column: String },
}
