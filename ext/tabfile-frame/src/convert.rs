//! Conversion between host frames and core tables
//!
//! Schema inference looks at the non-null cells of each column:
//!
//! | cells                          | column type |
//! |--------------------------------|-------------|
//! | only `Int` / `UInt`            | Int64       |
//! | only `Float`                   | Float64     |
//! | only `Bool`                    | Boolean     |
//! | anything else, or no cells     | Utf8        |
//!
//! Converting a Utf8 column is lossy: every non-null cell that is not a string
//! is stored as null. The one exception is a column whose only non-null cells
//! are timestamps, which has no usable representation and is rejected.

use log::debug;

use tabfile_core::{
    Column, ColumnType, Field, Result, Schema, TabfileError, Table, ValidationError, Value,
};

use crate::frame::{Cell, Frame, Index, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Integer,
    Float,
    Boolean,
    Other,
}

fn cell_kind(cell: &Cell) -> Option<CellKind> {
    match cell {
        Cell::Null => None,
        Cell::Int(_) | Cell::UInt(_) => Some(CellKind::Integer),
        Cell::Float(_) => Some(CellKind::Float),
        Cell::Bool(_) => Some(CellKind::Boolean),
        Cell::Str(_) | Cell::Timestamp(_) => Some(CellKind::Other),
    }
}

/// Infer the storage type of a column from its cells
pub fn infer_column_type(cells: &[Cell]) -> ColumnType {
    let mut kinds = cells.iter().filter_map(cell_kind);
    let first = match kinds.next() {
        Some(kind) => kind,
        None => return ColumnType::Utf8,
    };
    if kinds.any(|kind| kind != first) {
        return ColumnType::Utf8;
    }
    match first {
        CellKind::Integer => ColumnType::Int64,
        CellKind::Float => ColumnType::Float64,
        CellKind::Boolean => ColumnType::Boolean,
        CellKind::Other => ColumnType::Utf8,
    }
}

fn column_name(series: &Series) -> Result<&str> {
    series.label.as_str().ok_or_else(|| {
        ValidationError::InvalidColumnNames {
            inferred: format!("label {}", series.label),
        }
        .into()
    })
}

fn derive_field(name: &str, cells: &[Cell]) -> Field {
    let column_type = infer_column_type(cells);
    let nullable = match column_type {
        // every non-string cell is stored as null
        ColumnType::Utf8 => cells.iter().any(|c| !matches!(c, Cell::Str(_))),
        _ => cells.iter().any(Cell::is_null),
    };
    Field::new(name, column_type, nullable)
}

/// Derive the schema a frame is written with
///
/// Expects a frame that passed [`crate::validate_for_write`]; a non-text
/// column label is reported as `InvalidColumnNames`.
pub fn derive_schema(frame: &Frame) -> Result<Schema> {
    let fields = frame
        .columns()
        .iter()
        .map(|series| Ok(derive_field(column_name(series)?, &series.cells)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema { fields })
}

fn convert_cells(field: &Field, cells: &[Cell]) -> Result<Vec<Value>> {
    let unsupported = |row: usize, cell: &Cell| {
        TabfileError::unsupported_value(
            &field.name,
            row,
            field.column_type.type_name(),
            cell.type_name(),
        )
    };

    // a text or mixed column, as opposed to one holding only timestamps
    let coerce_others = cells
        .iter()
        .any(|c| !matches!(c, Cell::Null | Cell::Timestamp(_)));
    let mut coerced = 0usize;

    let values = cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            Ok(match (field.column_type, cell) {
                (_, Cell::Null) => Value::Null,
                (ColumnType::Int64, Cell::Int(v)) => Value::Int64(*v),
                (ColumnType::Int64, Cell::UInt(v)) => {
                    let v = i64::try_from(*v).map_err(|_| {
                        TabfileError::unsupported_value(
                            &field.name,
                            row,
                            "Int64",
                            format!("uint {} out of range", v),
                        )
                    })?;
                    Value::Int64(v)
                }
                (ColumnType::Float64, Cell::Float(v)) => Value::Float64(*v),
                (ColumnType::Boolean, Cell::Bool(v)) => Value::Boolean(*v),
                (ColumnType::Utf8, Cell::Str(s)) => Value::String(s.clone()),
                (ColumnType::Utf8, _) if coerce_others => {
                    coerced += 1;
                    Value::Null
                }
                (_, other) => return Err(unsupported(row, other)),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if coerced > 0 {
        debug!(
            "Column '{}': stored {} non-string cells as null",
            field.name, coerced
        );
    }
    Ok(values)
}

/// Convert a validated frame into a core table
pub fn frame_to_table(frame: &Frame) -> Result<Table> {
    let schema = derive_schema(frame)?;
    let columns = schema
        .fields
        .into_iter()
        .zip(frame.columns())
        .map(|(field, series)| {
            let values = convert_cells(&field, &series.cells)?;
            Ok(Column::new(field, values))
        })
        .collect::<Result<Vec<_>>>()?;
    Table::try_new(columns)
}

fn value_to_cell(value: Value) -> Cell {
    match value {
        Value::Int64(v) => Cell::Int(v),
        Value::Float64(v) => Cell::Float(v),
        Value::Boolean(v) => Cell::Bool(v),
        Value::String(s) => Cell::Str(s),
        Value::Null => Cell::Null,
    }
}

/// Convert a core table into a frame with the default index
pub fn table_to_frame(table: Table) -> Result<Frame> {
    let rows = table.num_rows();
    let columns = table
        .into_columns()
        .into_iter()
        .map(|column| {
            let (field, values) = column.into_parts();
            Series {
                label: field.name.into(),
                cells: values.into_iter().map(value_to_cell).collect(),
            }
        })
        .collect();
    Frame::new(Index::range(rows), columns)
}
