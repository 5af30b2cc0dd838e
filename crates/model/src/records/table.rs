use crate::{core::data_type::DataType, records::row::Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("row {row_index} columns {actual:?} do not match table columns {expected:?}")]
    ColumnMismatch {
        row_index: usize,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("cannot infer a schema from an empty row set")]
    NoRows,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Column {
            name: name.to_string(),
            data_type,
        }
    }
}

/// An ordered set of columns plus the rows that share them.
///
/// Invariant: every row carries exactly the table's columns, in the table's
/// column order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from rows, inferring each column's type from the first
    /// row's values.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, TableError> {
        let first = rows.first().ok_or(TableError::NoRows)?;
        let columns = first
            .field_values
            .iter()
            .map(|f| Column::new(&f.name, f.value.data_type()))
            .collect();
        Self::from_parts(columns, rows)
    }

    pub fn from_parts(columns: Vec<Column>, rows: Vec<Row>) -> Result<Self, TableError> {
        let expected: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        for (row_index, row) in rows.iter().enumerate() {
            if row.column_names() != expected {
                return Err(TableError::ColumnMismatch {
                    row_index,
                    expected: expected.iter().map(|s| s.to_string()).collect(),
                    actual: row.column_names().iter().map(|s| s.to_string()).collect(),
                });
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn push_row(&mut self, row: Row) -> Result<(), TableError> {
        let expected: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        if row.column_names() != expected {
            return Err(TableError::ColumnMismatch {
                row_index: self.rows.len(),
                expected: expected.iter().map(|s| s.to_string()).collect(),
                actual: row.column_names().iter().map(|s| s.to_string()).collect(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
