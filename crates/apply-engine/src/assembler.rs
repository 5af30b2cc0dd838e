use crate::{
    columns::OutputColumns, config::ErrorHandling, error::ApplyError, invoker::UnitResult,
};
use model::{
    core::{data_type::DataType, value::Value},
    records::{
        row::Row,
        table::{Column, Table},
    },
};

/// The merged output table plus the sentinel-derived failure count.
#[derive(Debug)]
pub struct AssembledTable {
    pub table: Table,
    pub failed_rows: usize,
}

/// Merge unit results back into one table aligned with the input.
///
/// Results arrive in completion order; sorting by unit index restores input
/// order (intra-batch order is preserved by the parser contract). Output
/// columns are appended after the input columns and coerced to a uniform
/// textual type, while input columns keep their original types.
pub fn assemble(
    input: &Table,
    mut results: Vec<UnitResult>,
    columns: &OutputColumns,
    error_handling: ErrorHandling,
    verbose: bool,
) -> Result<AssembledTable, ApplyError> {
    results.sort_by_key(|r| r.index);
    let flattened: Vec<Row> = results.into_iter().flat_map(|r| r.rows).collect();
    if flattened.len() != input.len() {
        return Err(ApplyError::RowCountMismatch {
            expected: input.len(),
            actual: flattened.len(),
        });
    }

    let retained = retained_output_columns(columns, error_handling, verbose);
    let mut output_columns = input.columns().to_vec();
    output_columns.extend(
        retained
            .iter()
            .map(|name| Column::new(name, DataType::String)),
    );

    let mut failed_rows = 0;
    let mut output_rows = Vec::with_capacity(flattened.len());
    for row in &flattened {
        let mut cells = Vec::with_capacity(output_columns.len());
        for column in input.columns() {
            cells.push((column.name.as_str(), row.get_value(&column.name)));
        }
        for name in &retained {
            cells.push((*name, Value::String(row.get_value(name).to_string())));
        }

        let out = Row::from_pairs(cells);
        if out.get_value(&columns.response) == Value::String(String::new()) {
            failed_rows += 1;
        }
        output_rows.push(out);
    }

    let table = Table::from_parts(output_columns, output_rows)?;
    Ok(AssembledTable { table, failed_rows })
}

/// Output columns that survive into the final table. Fail mode never
/// populates error columns, so they are dropped entirely; the raw error
/// column exists only for verbose debugging.
fn retained_output_columns<'a>(
    columns: &'a OutputColumns,
    error_handling: ErrorHandling,
    verbose: bool,
) -> Vec<&'a str> {
    match error_handling {
        ErrorHandling::Fail => vec![columns.response.as_str()],
        ErrorHandling::Log if verbose => columns.iter().collect(),
        ErrorHandling::Log => vec![
            columns.response.as_str(),
            columns.error_message.as_str(),
            columns.error_type.as_str(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input_table() -> Table {
        Table::from_rows(
            (0..3)
                .map(|i| Row::from_pairs(vec![("id", Value::Int(i))]))
                .collect(),
        )
        .unwrap()
    }

    fn columns() -> OutputColumns {
        OutputColumns::unique(&["id"], "output")
    }

    fn result_row(id: i64, response: &str, error: &str) -> Row {
        Row::from_pairs(vec![
            ("id", Value::Int(id)),
            ("output_response", Value::String(response.to_string())),
            ("output_error_message", Value::String(error.to_string())),
            ("output_error_type", Value::String(String::new())),
            ("output_error_raw", Value::String(String::new())),
        ])
    }

    fn completion_order_results() -> Vec<UnitResult> {
        vec![
            UnitResult {
                index: 1,
                rows: vec![result_row(1, "", "boom")],
            },
            UnitResult {
                index: 2,
                rows: vec![result_row(2, "ok-2", "")],
            },
            UnitResult {
                index: 0,
                rows: vec![result_row(0, "ok-0", "")],
            },
        ]
    }

    #[test]
    fn restores_input_order_and_counts_failures() {
        let assembled = assemble(
            &input_table(),
            completion_order_results(),
            &columns(),
            ErrorHandling::Log,
            false,
        )
        .unwrap();

        let ids: Vec<Value> = assembled
            .table
            .rows()
            .iter()
            .map(|r| r.get_value("id"))
            .collect();
        assert_eq!(ids, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert_eq!(assembled.failed_rows, 1);
    }

    #[test]
    fn flattens_batches_preserving_intra_batch_order() {
        let results = vec![
            UnitResult {
                index: 1,
                rows: vec![result_row(2, "ok-2", "")],
            },
            UnitResult {
                index: 0,
                rows: vec![result_row(0, "ok-0", ""), result_row(1, "ok-1", "")],
            },
        ];
        let assembled = assemble(
            &input_table(),
            results,
            &columns(),
            ErrorHandling::Log,
            false,
        )
        .unwrap();

        let ids: Vec<Value> = assembled
            .table
            .rows()
            .iter()
            .map(|r| r.get_value("id"))
            .collect();
        assert_eq!(ids, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn output_schema_appends_textual_columns_after_input_columns() {
        let assembled = assemble(
            &input_table(),
            completion_order_results(),
            &columns(),
            ErrorHandling::Log,
            false,
        )
        .unwrap();

        let table = &assembled.table;
        assert_eq!(
            table.column_names(),
            vec![
                "id",
                "output_response",
                "output_error_message",
                "output_error_type"
            ]
        );
        assert_eq!(table.columns()[0].data_type, DataType::Int);
        assert!(
            table.columns()[1..]
                .iter()
                .all(|c| c.data_type == DataType::String)
        );
    }

    #[test]
    fn verbose_keeps_the_raw_error_column() {
        let assembled = assemble(
            &input_table(),
            completion_order_results(),
            &columns(),
            ErrorHandling::Log,
            true,
        )
        .unwrap();
        assert!(
            assembled
                .table
                .column_names()
                .contains(&"output_error_raw")
        );
    }

    #[test]
    fn fail_mode_drops_every_error_column() {
        let results = vec![
            UnitResult {
                index: 0,
                rows: vec![result_row(0, "ok-0", "")],
            },
            UnitResult {
                index: 1,
                rows: vec![result_row(1, "ok-1", "")],
            },
            UnitResult {
                index: 2,
                rows: vec![result_row(2, "ok-2", "")],
            },
        ];
        let assembled = assemble(
            &input_table(),
            results,
            &columns(),
            ErrorHandling::Fail,
            false,
        )
        .unwrap();

        assert_eq!(
            assembled.table.column_names(),
            vec!["id", "output_response"]
        );
        assert_eq!(assembled.failed_rows, 0);
    }

    #[test]
    fn row_count_mismatch_is_detected() {
        let results = vec![UnitResult {
            index: 0,
            rows: vec![result_row(0, "ok-0", "")],
        }];
        let err = assemble(
            &input_table(),
            results,
            &columns(),
            ErrorHandling::Log,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ApplyError::RowCountMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }
}
