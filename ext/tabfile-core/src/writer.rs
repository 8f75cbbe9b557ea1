//! Core tabfile writing functionality

use bytes::Bytes;
use log::debug;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use crate::{
    codec::{self, Encoding},
    compression::Compression,
    format::{BlockRecord, FileFooter, MAGIC, MAGIC_LEN},
    Column, ErrorContext, Field, Result, Schema, TabfileError, Table, ValidationError,
};

/// Settings shared by every write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub compression: Compression,
    /// Level for gzip (0-9) and zstd; `None` picks the codec default
    pub compression_level: Option<i32>,
}

impl WriteOptions {
    pub fn with_compression(compression: Compression) -> Self {
        Self {
            compression,
            ..Self::default()
        }
    }
}

/// Builder for creating a configured Writer
#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    options: WriteOptions,
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    /// Set the compression level
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.options.compression_level = Some(level);
        self
    }

    /// Build a Writer with the configured settings
    pub fn build<W: Write>(self, writer: W) -> Writer<W> {
        Writer::with_options(writer, self.options)
    }
}

/// A column block ready to be written: encoded and, if it helped, compressed
struct PreparedBlock {
    field: Field,
    encoding: Encoding,
    compression: Compression,
    data: Bytes,
    row_count: u64,
}

fn prepare(column: &Column, options: &WriteOptions) -> Result<PreparedBlock> {
    let block = codec::encode(column)?;

    let (compression, data) = match options.compression {
        Compression::None => (Compression::None, block.data),
        requested => {
            let packed = requested.compress(&block.data, options.compression_level)?;
            if packed.len() < block.len() {
                (requested, Bytes::from(packed))
            } else {
                debug!(
                    "{} did not shrink column '{}' ({} -> {} bytes), storing uncompressed",
                    requested,
                    column.name(),
                    block.len(),
                    packed.len()
                );
                (Compression::None, block.data)
            }
        }
    };

    Ok(PreparedBlock {
        field: column.field().clone(),
        encoding: block.encoding,
        compression,
        data,
        row_count: column.len() as u64,
    })
}

/// Core tabfile writer that works with any type implementing Write
///
/// Columns are written as they arrive; the footer is written by
/// [`Writer::close`], which must be called to produce a readable file.
pub struct Writer<W: Write> {
    inner: W,
    options: WriteOptions,
    fields: Vec<Field>,
    blocks: Vec<BlockRecord>,
    offset: u64,
}

impl<W: Write> Writer<W> {
    /// Create a new writer with default settings
    pub fn new(writer: W) -> Self {
        WriterBuilder::new().build(writer)
    }

    pub fn with_options(writer: W, options: WriteOptions) -> Self {
        Self {
            inner: writer,
            options,
            fields: Vec::new(),
            blocks: Vec::new(),
            offset: 0,
        }
    }

    /// Write every column of a table
    ///
    /// All columns are encoded before the first byte is written, so an
    /// unsupported value leaves the output untouched.
    pub fn write_table(&mut self, table: &Table) -> Result<()> {
        let prepared = table
            .columns()
            .iter()
            .map(|c| prepare(c, &self.options))
            .collect::<Result<Vec<_>>>()?;
        for block in prepared {
            self.append(block)?;
        }
        Ok(())
    }

    /// Write a single column
    pub fn write_column(&mut self, column: &Column) -> Result<()> {
        let block = prepare(column, &self.options)?;
        self.append(block)
    }

    /// Schema of the columns written so far
    pub fn schema(&self) -> Schema {
        Schema {
            fields: self.fields.clone(),
        }
    }

    fn ensure_magic(&mut self) -> Result<()> {
        if self.offset == 0 {
            self.inner.write_all(&MAGIC)?;
            self.offset = MAGIC_LEN;
        }
        Ok(())
    }

    fn append(&mut self, block: PreparedBlock) -> Result<()> {
        if self.fields.iter().any(|f| f.name == block.field.name) {
            return Err(ValidationError::DuplicateColumnNames {
                names: vec![block.field.name],
            }
            .into());
        }
        if let Some(first) = self.blocks.first() {
            if first.row_count != block.row_count {
                return Err(TabfileError::invalid_argument(format!(
                    "Column '{}' has {} rows but earlier columns have {}",
                    block.field.name, block.row_count, first.row_count
                )));
            }
        }

        self.ensure_magic()?;
        self.inner.write_all(&block.data)?;

        let record = BlockRecord {
            offset: self.offset,
            length: block.data.len() as u64,
            encoding: block.encoding,
            compression: block.compression,
            row_count: block.row_count,
        };
        debug!(
            "Wrote column '{}' at offset {}: {} bytes, {:?}, {}",
            block.field.name, record.offset, record.length, record.encoding, record.compression
        );

        self.offset += record.length;
        self.fields.push(block.field);
        self.blocks.push(record);
        Ok(())
    }

    /// Write the footer and return the underlying writer
    pub fn close(mut self) -> Result<W> {
        self.ensure_magic()?;

        let footer = FileFooter {
            schema: Schema {
                fields: std::mem::take(&mut self.fields),
            },
            blocks: std::mem::take(&mut self.blocks),
        };
        let bytes = footer.serialize()?;
        self.inner.write_all(&bytes)?;
        self.inner.write_all(&(bytes.len() as u64).to_le_bytes())?;
        self.inner.flush()?;

        debug!(
            "Closed tabfile: {} columns, {} rows, {} bytes",
            footer.schema.len(),
            footer.num_rows(),
            self.offset + bytes.len() as u64 + 8
        );
        Ok(self.inner)
    }
}

/// Write `table` to `path` atomically
///
/// The file is assembled in a temporary file next to `path` and renamed into
/// place only once complete. On any error the destination is left as it was.
pub fn write_table<P: AsRef<Path>>(table: &Table, path: P, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();

    let prepared = table
        .columns()
        .iter()
        .map(|c| prepare(c, options))
        .collect::<Result<Vec<_>>>()?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Creating temporary file in {}", dir.display()))?;

    let mut writer = Writer::with_options(BufWriter::new(temp), *options);
    for block in prepared {
        writer.append(block)?;
    }
    let temp = writer
        .close()?
        .into_inner()
        .map_err(|e| TabfileError::Io(e.into_error()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Syncing {}", temp.path().display()))?;
    temp.persist(path)
        .map_err(|e| TabfileError::Io(e.error))
        .map(|_| ())
}

/// Encode `table` into an in-memory tabfile
pub fn write_table_to_vec(table: &Table, options: &WriteOptions) -> Result<Vec<u8>> {
    let mut writer = Writer::with_options(Vec::new(), *options);
    writer.write_table(table)?;
    writer.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{format::FOOTER_LEN_SIZE, ColumnType, ErrorKind};

    fn sample_table() -> Table {
        Table::try_new(vec![
            Column::from_values("id", ColumnType::Int64, [1i64, 2, 3]),
            Column::from_values("name", ColumnType::Utf8, [Some("a"), None, Some("a")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_writer_creation() {
        let writer = Writer::new(Vec::new());
        let bytes = writer.close().unwrap();
        // magic, empty footer, footer length
        assert_eq!(bytes.len(), 8 + 4 + 8);
        assert_eq!(&bytes[..8], &MAGIC);
    }

    #[test]
    fn test_writer_builder() {
        let mut writer = WriterBuilder::new()
            .with_compression(Compression::Zstd)
            .with_compression_level(9)
            .build(Vec::new());
        writer.write_table(&sample_table()).unwrap();
        assert_eq!(writer.schema().len(), 2);
        writer.close().unwrap();
    }

    #[test]
    fn test_layout() {
        let bytes = write_table_to_vec(&sample_table(), &WriteOptions::default()).unwrap();
        let len = bytes.len();
        let mut footer_len = [0u8; 8];
        footer_len.copy_from_slice(&bytes[len - 8..]);
        let footer_len = u64::from_le_bytes(footer_len) as usize;

        let footer_start = len - FOOTER_LEN_SIZE as usize - footer_len;
        let footer = FileFooter::parse(&bytes[footer_start..len - 8]).unwrap();
        footer.check_layout(footer_start as u64).unwrap();
        assert_eq!(footer.blocks[0].offset, 8);
        assert_eq!(footer.blocks[0].length, 24);
        assert_eq!(footer.blocks[1].encoding, Encoding::Dictionary);
        assert_eq!(footer.num_rows(), 3);
    }

    #[test]
    fn test_incompressible_block_stored_plain() {
        let table = Table::try_new(vec![Column::from_values("x", ColumnType::Int64, [42i64])]).unwrap();
        let bytes = write_table_to_vec(&table, &WriteOptions::with_compression(Compression::Gzip)).unwrap();
        // a gzip header alone is larger than one 8-byte value
        assert_eq!(&bytes[8..16], &42i64.to_le_bytes());
    }

    #[test]
    fn test_unsupported_value_writes_nothing() {
        let table = Table::try_new(vec![
            Column::from_values("ok", ColumnType::Int64, [1i64]),
            Column::new(
                Field::new("bad", ColumnType::Int64, false),
                vec![crate::Value::from("x")],
            ),
        ])
        .unwrap();

        let mut writer = Writer::new(Vec::new());
        let err = writer.write_table(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        assert!(writer.inner.is_empty());
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_column(&Column::from_values("a", ColumnType::Int64, [1i64, 2]))
            .unwrap();

        let err = writer
            .write_column(&Column::from_values("b", ColumnType::Int64, [1i64]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = writer
            .write_column(&Column::from_values("a", ColumnType::Int64, [3i64, 4]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateColumnNames);
    }

    #[test]
    fn test_write_to_path_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tab");
        std::fs::write(&path, b"previous contents").unwrap();

        let bad = Table::try_new(vec![Column::new(
            Field::new("bad", ColumnType::Boolean, false),
            vec![crate::Value::Null],
        )])
        .unwrap();
        assert!(write_table(&bad, &path, &WriteOptions::default()).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous contents");
        // no temporary files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        write_table(&sample_table(), &path, &WriteOptions::default()).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(
            written,
            write_table_to_vec(&sample_table(), &WriteOptions::default()).unwrap()
        );
    }
}
