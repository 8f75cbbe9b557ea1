//! Language-agnostic core functionality for tabfile tables
//!
//! `tabfile-core` stores a columnar table in a single self-describing file.
//! Host integrations (such as `tabfile-frame`) translate their own table types
//! into a [`Table`] and hand it to this crate for encoding.
//!
//! # Key Components
//!
//! - **Writer**: Column-at-a-time file writer
//!   - Encodes every column before any byte is written
//!   - Optional per-block compression (snappy, gzip, lz4, zstd)
//!   - Atomic replacement of the destination through [`writer::write_table`]
//!
//! - **Reader**: Footer-driven file reader
//!   - Validates the magic header and block layout on open
//!   - Reads only the blocks of the requested columns
//!   - Works over any `Read + Seek` source
//!
//! - **Codec**: Per-column block encodings
//!   - Plain little-endian integers and floats with a null bitmap
//!   - Run-length booleans with a bit-packed fallback
//!   - Dictionary-encoded strings with a null sentinel
//!
//! - **Schema**: Flat list of named, typed, nullable columns
//!   - Builder API that rejects duplicate names
//!   - Introspection through the [`traits::SchemaInspector`] trait
//!
//! # File layout
//!
//! See [`format`] for the byte-level layout of the footer and blocks.

pub mod codec;
pub mod compression;
mod cursor;
pub mod error;
pub mod format;
pub mod reader;
pub mod schema;
pub mod table;
pub mod traits;
pub mod value;
pub mod writer;

pub use codec::{EncodedBlock, Encoding};
pub use compression::Compression;
pub use error::{ErrorContext, ErrorKind, IndexProperty, Result, TabfileError, ValidationError};
pub use reader::{read_table, Reader};
pub use schema::{ColumnType, Field, Schema, SchemaBuilder};
pub use table::{Column, Table};
pub use value::Value;
pub use writer::{write_table, write_table_to_vec, WriteOptions, Writer, WriterBuilder};
