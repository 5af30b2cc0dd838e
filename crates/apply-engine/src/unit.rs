use model::records::{row::Row, table::Table};

/// One independent piece of work: a single row or a consecutive group of rows.
///
/// `index` is the unit's position in submission order; results are collected
/// in completion order and re-aligned by index during assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkUnit {
    Row { index: usize, row: Row },
    Batch { index: usize, rows: Vec<Row> },
}

impl WorkUnit {
    pub fn index(&self) -> usize {
        match self {
            WorkUnit::Row { index, .. } => *index,
            WorkUnit::Batch { index, .. } => *index,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            WorkUnit::Row { .. } => 1,
            WorkUnit::Batch { rows, .. } => rows.len(),
        }
    }
}

/// Split a table into work units, in input order.
///
/// Row mode yields one unit per row. Batch mode groups rows into consecutive
/// chunks of at most `size`; the last chunk may be smaller.
pub fn build_units(table: &Table, batch_size: Option<usize>) -> Vec<WorkUnit> {
    match batch_size {
        Some(size) => table
            .rows()
            .chunks(size)
            .enumerate()
            .map(|(index, rows)| WorkUnit::Batch {
                index,
                rows: rows.to_vec(),
            })
            .collect(),
        None => table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| WorkUnit::Row {
                index,
                row: row.clone(),
            })
            .collect(),
    }
}
