//! Core tabfile reading functionality

use log::debug;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::{
    codec::{self, EncodedBlock},
    format::{BlockRecord, FileFooter, FOOTER_LEN_SIZE, MAGIC, MAGIC_LEN, MIN_FILE_LEN},
    traits::SchemaInspector,
    Column, ErrorContext, Field, Result, Schema, TabfileError, Table,
};

/// Core tabfile reader that works with any source implementing Read + Seek
///
/// The footer is parsed and the magic header verified when the reader is
/// created; column blocks are only read when requested.
pub struct Reader<R> {
    inner: R,
    footer: FileFooter,
}

impl Reader<BufReader<File>> {
    /// Open the tabfile at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Opening {}", path.display()))?;
        Self::new(BufReader::new(file))
    }
}

impl<R> Reader<R>
where
    R: Read + Seek,
{
    /// Create a new reader, validating the file's framing and footer
    pub fn new(mut inner: R) -> Result<Self> {
        let file_len = inner.seek(SeekFrom::End(0))?;
        if file_len < MAGIC_LEN {
            return Err(TabfileError::truncated(format!(
                "file is {} bytes, too short for the magic header",
                file_len
            )));
        }

        let mut magic = [0u8; 8];
        inner.seek(SeekFrom::Start(0))?;
        inner.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(TabfileError::BadMagic {
                expected: MAGIC,
                found: magic.to_vec(),
            });
        }

        if file_len < MIN_FILE_LEN {
            return Err(TabfileError::truncated(format!(
                "file is {} bytes, a tabfile needs at least {}",
                file_len, MIN_FILE_LEN
            )));
        }

        let mut footer_len = [0u8; 8];
        inner.seek(SeekFrom::End(-(FOOTER_LEN_SIZE as i64)))?;
        inner.read_exact(&mut footer_len)?;
        let footer_len = u64::from_le_bytes(footer_len);

        let available = file_len - MAGIC_LEN - FOOTER_LEN_SIZE;
        if footer_len > available {
            return Err(TabfileError::truncated(format!(
                "footer length {} exceeds the {} bytes after the header",
                footer_len, available
            )));
        }
        let footer_start = file_len - FOOTER_LEN_SIZE - footer_len;

        let mut footer_bytes = vec![0u8; footer_len as usize];
        inner.seek(SeekFrom::Start(footer_start))?;
        inner.read_exact(&mut footer_bytes)?;
        let footer = FileFooter::parse(&footer_bytes)?;
        footer.check_layout(footer_start)?;

        debug!(
            "Opened tabfile: {} columns, {} rows, footer at {} ({} bytes)",
            footer.schema.len(),
            footer.num_rows(),
            footer_start,
            footer_len
        );
        Ok(Self { inner, footer })
    }

    /// Get the file footer
    pub fn footer(&self) -> &FileFooter {
        &self.footer
    }

    pub fn schema(&self) -> &Schema {
        &self.footer.schema
    }

    /// Rows in the table
    pub fn num_rows(&self) -> Result<usize> {
        row_count(self.footer.num_rows(), "footer")
    }

    /// Read every column
    pub fn read_table(&mut self) -> Result<Table> {
        let columns = (0..self.footer.blocks.len())
            .map(|i| self.read_column_at(i))
            .collect::<Result<Vec<_>>>()?;
        Table::try_new(columns)
    }

    /// Read a single column by name
    pub fn read_column(&mut self, name: &str) -> Result<Column> {
        let idx = self.column_index(name)?;
        self.read_column_at(idx)
    }

    /// Read only the named columns, in the order given
    ///
    /// Only the requested columns' blocks are read from the source, and none
    /// are read if any name is missing from the file.
    pub fn read_columns(&mut self, names: &[&str]) -> Result<Table> {
        if let Some(missing) = names.iter().find(|name| !self.schema().has_field(name)) {
            return Err(missing_column(missing));
        }
        let columns = names
            .iter()
            .map(|name| self.read_column(name))
            .collect::<Result<Vec<_>>>()?;
        Table::try_new(columns)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.footer
            .schema
            .index_of(name)
            .ok_or_else(|| missing_column(name))
    }

    fn read_column_at(&mut self, idx: usize) -> Result<Column> {
        let field: &Field = &self.footer.schema.fields[idx];
        let record: BlockRecord = self.footer.blocks[idx];
        let location = format!("column '{}'", field.name);

        let mut raw = vec![0u8; record.length as usize];
        self.inner.seek(SeekFrom::Start(record.offset))?;
        self.inner.read_exact(&mut raw)?;

        let data = record.compression.decompress(&raw, &location)?;
        let block = EncodedBlock::new(record.encoding, data);
        let column = codec::decode(&block, field, row_count(record.row_count, &location)?)?;

        debug!(
            "Read column '{}' at offset {}: {} bytes, {:?}, {}",
            field.name, record.offset, record.length, record.encoding, record.compression
        );
        Ok(column)
    }
}

fn missing_column(name: &str) -> TabfileError {
    TabfileError::invalid_argument(format!("No column named '{}' in file", name))
}

fn row_count(rows: u64, location: &str) -> Result<usize> {
    usize::try_from(rows)
        .map_err(|_| TabfileError::corrupt(location, format!("row count {} is too large", rows)))
}

/// Read the whole table stored at `path`
pub fn read_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    Reader::open(path)?.read_table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{writer::write_table_to_vec, ColumnType, ErrorKind, WriteOptions};
    use std::io::Cursor;

    fn sample_bytes() -> Vec<u8> {
        let table = Table::try_new(vec![
            Column::from_values("id", ColumnType::Int64, 0..10i64),
            Column::from_values("flag", ColumnType::Boolean, (0..10).map(|i| i < 6)),
        ])
        .unwrap();
        write_table_to_vec(&table, &WriteOptions::default()).unwrap()
    }

    #[test]
    fn test_reader_creation() {
        let reader = Reader::new(Cursor::new(sample_bytes())).unwrap();
        assert_eq!(reader.schema().len(), 2);
        assert_eq!(reader.num_rows().unwrap(), 10);
    }

    #[test]
    fn test_read_single_column() {
        let mut reader = Reader::new(Cursor::new(sample_bytes())).unwrap();
        let flag = reader.read_column("flag").unwrap();
        assert_eq!(flag.values()[5], crate::Value::Boolean(true));
        assert_eq!(flag.values()[6], crate::Value::Boolean(false));
        assert_eq!(
            reader.read_column("nope").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample_bytes();
        bytes[0] = b'X';
        let err = Reader::new(Cursor::new(bytes)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::BadMagic);
    }

    #[test]
    fn test_empty_source() {
        let err = Reader::new(Cursor::new(Vec::new())).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::TruncatedFile);
    }

    #[test]
    fn test_oversized_footer_length() {
        let mut bytes = sample_bytes();
        let len = bytes.len();
        bytes[len - 8..].copy_from_slice(&u64::MAX.to_le_bytes());
        let err = Reader::new(Cursor::new(bytes)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::TruncatedFile);
    }

    #[test]
    fn test_corrupt_block_bytes() {
        let mut bytes = sample_bytes();
        // the run-length flag block starts after the 80-byte id block;
        // its first run value follows the run count
        bytes[8 + 80 + 4] = 7;
        let mut reader = Reader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            reader.read_table().unwrap_err().kind(),
            ErrorKind::CorruptBlock
        );
    }
}
