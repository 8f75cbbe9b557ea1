//! Data-frame bridge for tabfile-core
//!
//! This crate accepts the table-shaped values a host application works with
//! and stores them through `tabfile-core`.
//!
//! # Overview
//!
//! ## Host Model
//!
//! [`Frame`] is a row [`Index`] plus labeled [`Series`] of loosely typed
//! [`Cell`]s. [`Input`] covers everything a caller might hand to [`write`],
//! including values that are not tables at all.
//!
//! ## Validation
//!
//! [`validate_for_write`] accepts only frames with the default row index and
//! unique text column labels:
//!
//! - Non-frames fail with `NotATable`
//! - Non-default, reordered or named indexes fail with `UnsupportedIndex`
//! - Non-text labels fail with `InvalidColumnNames`
//! - Repeated labels fail with `DuplicateColumnNames`
//!
//! ## Conversion
//!
//! [`derive_schema`] infers one storage type per column. Columns mixing text
//! with other values are stored as text, with the non-text cells replaced by
//! nulls. See [`convert`] for the full rules.

pub mod convert;
pub use convert::{derive_schema, frame_to_table, infer_column_type, table_to_frame};

pub mod frame;
pub use frame::{Cell, Frame, Index, Input, Label, Series};

pub mod io;
pub use io::{read, read_columns, write};

pub mod validate;
pub use validate::{validate_for_write, validated_frame};

pub use tabfile_core::{
    Compression, ErrorKind, IndexProperty, Result, TabfileError, ValidationError, WriteOptions,
};
