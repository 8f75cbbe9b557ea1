//! Host-side table model: a data frame with a row index, labeled columns and
//! loosely typed cells

use ordered_float::OrderedFloat;
use std::fmt;
use std::sync::Arc;

use tabfile_core::{Result, TabfileError};

/// A single cell as the host application holds it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(OrderedFloat<f64>),
    Str(Arc<str>),
    /// Microseconds since the Unix epoch
    Timestamp(i64),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "bool",
            Cell::Int(_) => "int",
            Cell::UInt(_) => "uint",
            Cell::Float(_) => "float",
            Cell::Str(_) => "str",
            Cell::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<u64> for Cell {
    fn from(v: u64) -> Self {
        Cell::UInt(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(OrderedFloat(v))
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Str(Arc::from(v))
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Str(Arc::from(v))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// A column label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    Str(String),
    Int(i64),
    /// One entry per level of a multi-level column index
    Tuple(Vec<Label>),
}

impl Label {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Label::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Str(s) => f.write_str(s),
            Label::Int(i) => write!(f, "{}", i),
            Label::Tuple(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<&str> for Label {
    fn from(v: &str) -> Self {
        Label::Str(v.to_string())
    }
}

impl From<String> for Label {
    fn from(v: String) -> Self {
        Label::Str(v)
    }
}

impl From<i64> for Label {
    fn from(v: i64) -> Self {
        Label::Int(v)
    }
}

impl<A: Into<Label>, B: Into<Label>> From<(A, B)> for Label {
    fn from((a, b): (A, B)) -> Self {
        Label::Tuple(vec![a.into(), b.into()])
    }
}

/// Row index of a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    /// Evenly spaced integers `start, start + step, ...` below (or above,
    /// for a negative step) `stop`
    Range {
        start: i64,
        stop: i64,
        step: i64,
        name: Option<String>,
    },
    Int64 {
        values: Vec<i64>,
        name: Option<String>,
    },
    Labels {
        values: Vec<String>,
        name: Option<String>,
    },
    /// Microseconds since the Unix epoch
    Datetime {
        values: Vec<i64>,
        name: Option<String>,
    },
    /// One tuple of labels per row, one name per level
    Multi {
        values: Vec<Vec<Label>>,
        names: Vec<Option<String>>,
    },
}

impl Index {
    /// The default index `0..len`, unnamed
    pub fn range(len: usize) -> Self {
        Index::Range {
            start: 0,
            stop: len as i64,
            step: 1,
            name: None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Index::Range {
                start, stop, step, ..
            } => {
                let (start, stop, step) = (*start as i128, *stop as i128, *step as i128);
                if step > 0 && stop > start {
                    ((stop - start + step - 1) / step) as usize
                } else if step < 0 && stop < start {
                    ((start - stop - step - 1) / -step) as usize
                } else {
                    0
                }
            }
            Index::Int64 { values, .. } => values.len(),
            Index::Labels { values, .. } => values.len(),
            Index::Datetime { values, .. } => values.len(),
            Index::Multi { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the index kind, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Index::Range { .. } => "RangeIndex",
            Index::Int64 { .. } => "Int64Index",
            Index::Labels { .. } => "Index",
            Index::Datetime { .. } => "DatetimeIndex",
            Index::Multi { .. } => "MultiIndex",
        }
    }

    /// The index name; for a multi-level index, the first named level
    pub fn name(&self) -> Option<&str> {
        match self {
            Index::Range { name, .. }
            | Index::Int64 { name, .. }
            | Index::Labels { name, .. }
            | Index::Datetime { name, .. } => name.as_deref(),
            Index::Multi { names, .. } => names.iter().flatten().next().map(String::as_str),
        }
    }

    pub fn with_name<S: Into<String>>(mut self, new_name: S) -> Self {
        let new_name = Some(new_name.into());
        match &mut self {
            Index::Range { name, .. }
            | Index::Int64 { name, .. }
            | Index::Labels { name, .. }
            | Index::Datetime { name, .. } => *name = new_name,
            Index::Multi { names, .. } => {
                if let Some(first) = names.first_mut() {
                    *first = new_name;
                }
            }
        }
        self
    }
}

impl Default for Index {
    fn default() -> Self {
        Index::range(0)
    }
}

/// A labeled column of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub label: Label,
    pub cells: Vec<Cell>,
}

impl Series {
    pub fn new<L, I, C>(label: L, cells: I) -> Self
    where
        L: Into<Label>,
        I: IntoIterator<Item = C>,
        C: Into<Cell>,
    {
        Self {
            label: label.into(),
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A data frame: a row index plus equally long labeled columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    index: Index,
    columns: Vec<Series>,
}

impl Frame {
    /// Build a frame with the default index
    pub fn from_columns(columns: Vec<Series>) -> Result<Self> {
        let rows = columns.first().map(Series::len).unwrap_or(0);
        Self::new(Index::range(rows), columns)
    }

    pub fn new(index: Index, columns: Vec<Series>) -> Result<Self> {
        let rows = index.len();
        if let Some(column) = columns.iter().find(|c| c.len() != rows) {
            return Err(TabfileError::invalid_argument(format!(
                "Column '{}' has {} rows but the index has {}",
                column.label,
                column.len(),
                rows
            )));
        }
        Ok(Self { index, columns })
    }

    /// Replace the row index
    pub fn set_index(self, index: Index) -> Result<Self> {
        Self::new(index, self.columns)
    }

    /// Replace every column label, keeping the cells
    pub fn set_labels<L: Into<Label>>(mut self, labels: Vec<L>) -> Result<Self> {
        if labels.len() != self.columns.len() {
            return Err(TabfileError::invalid_argument(format!(
                "Got {} labels for {} columns",
                labels.len(),
                self.columns.len()
            )));
        }
        for (column, label) in self.columns.iter_mut().zip(labels) {
            column.label = label.into();
        }
        Ok(self)
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.columns.iter().map(|c| &c.label)
    }

    /// Cells of the first column with a text label equal to `name`
    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .iter()
            .find(|c| c.label.as_str() == Some(name))
            .map(|c| c.cells.as_slice())
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Any host value a caller may try to write
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Frame(Frame),
    Series(Series),
    Scalar(Cell),
    Array(Vec<Cell>),
}

impl Input {
    pub fn kind(&self) -> &'static str {
        match self {
            Input::Frame(_) => "frame",
            Input::Series(_) => "series",
            Input::Scalar(_) => "scalar",
            Input::Array(_) => "array",
        }
    }
}

impl From<Frame> for Input {
    fn from(v: Frame) -> Self {
        Input::Frame(v)
    }
}

impl From<Series> for Input {
    fn from(v: Series) -> Self {
        Input::Series(v)
    }
}

impl From<Cell> for Input {
    fn from(v: Cell) -> Self {
        Input::Scalar(v)
    }
}

impl From<Vec<Cell>> for Input {
    fn from(v: Vec<Cell>) -> Self {
        Input::Array(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_len() {
        assert_eq!(Index::range(3).len(), 3);
        let stepped = Index::Range {
            start: 1,
            stop: 10,
            step: 3,
            name: None,
        };
        assert_eq!(stepped.len(), 3);
        let backwards = Index::Range {
            start: 5,
            stop: 0,
            step: -2,
            name: None,
        };
        assert_eq!(backwards.len(), 3);
        let empty = Index::Range {
            start: 4,
            stop: 1,
            step: 1,
            name: None,
        };
        assert!(empty.is_empty());
    }

    #[test]
    fn test_frame_length_checked() {
        let err = Frame::new(Index::range(2), vec![Series::new("a", [1i64, 2, 3])]).unwrap_err();
        assert_eq!(err.kind(), tabfile_core::ErrorKind::InvalidArgument);

        let frame = Frame::from_columns(vec![Series::new("a", [1i64, 2, 3])]).unwrap();
        assert_eq!(frame.num_rows(), 3);
        assert_eq!(frame.index(), &Index::range(3));
        assert!(frame.clone().set_index(Index::range(4)).is_err());
    }

    #[test]
    fn test_set_labels() {
        let frame = Frame::from_columns(vec![
            Series::new("a", [1i64]),
            Series::new("b", [2i64]),
        ])
        .unwrap()
        .set_labels(vec![("x", 1i64), ("x", 2i64)])
        .unwrap();

        let labels: Vec<String> = frame.labels().map(ToString::to_string).collect();
        assert_eq!(labels, vec!["(x, 1)", "(x, 2)"]);
        assert!(frame.column("x").is_none());
    }

    #[test]
    fn test_index_name() {
        let index = Index::Int64 {
            values: vec![0, 1, 2],
            name: None,
        }
        .with_name("foo");
        assert_eq!(index.name(), Some("foo"));

        let multi = Index::Multi {
            values: vec![vec![Label::from("a"), Label::from(1i64)]],
            names: vec![None, Some("second".to_string())],
        };
        assert_eq!(multi.name(), Some("second"));
    }
}
