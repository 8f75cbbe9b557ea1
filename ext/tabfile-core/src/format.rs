//! On-disk layout of a tabfile
//!
//! ```text
//! [8-byte magic][column blocks ...][footer][8-byte LE footer length]
//! ```
//!
//! The footer holds the schema followed by one [`BlockRecord`] per column:
//!
//! ```text
//! u32 column count C
//! C x (u32 name length, UTF-8 name, u8 type tag, u8 nullable)
//! C x (u64 offset, u64 length, u8 encoding tag, u8 compression tag, u64 row count)
//! ```
//!
//! All integers are little-endian.

use bytes::{BufMut, BytesMut};

use crate::{
    codec::Encoding, compression::Compression, cursor::ByteCursor, ColumnType, Field, Result,
    Schema, TabfileError,
};

pub const MAGIC: [u8; 8] = *b"TABFILE1";
pub const MAGIC_LEN: u64 = MAGIC.len() as u64;
pub const FOOTER_LEN_SIZE: u64 = 8;
/// Smallest well-formed file: magic, an empty footer, and the footer length
pub const MIN_FILE_LEN: u64 = MAGIC_LEN + 4 + FOOTER_LEN_SIZE;

const BLOCK_RECORD_LEN: usize = 8 + 8 + 1 + 1 + 8;

/// Location and encoding of one column's block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    pub offset: u64,
    pub length: u64,
    pub encoding: Encoding,
    pub compression: Compression,
    pub row_count: u64,
}

impl BlockRecord {
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }
}

/// Trailing metadata describing every column block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFooter {
    pub schema: Schema,
    pub blocks: Vec<BlockRecord>,
}

impl FileFooter {
    /// Rows in the table, zero when there are no columns
    pub fn num_rows(&self) -> u64 {
        self.blocks.first().map(|b| b.row_count).unwrap_or(0)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        if self.schema.fields.len() != self.blocks.len() {
            return Err(TabfileError::internal(format!(
                "Footer has {} fields but {} blocks",
                self.schema.fields.len(),
                self.blocks.len()
            )));
        }

        let mut buf = BytesMut::new();
        buf.put_u32_le(self.schema.fields.len() as u32);
        for field in &self.schema.fields {
            let name_len = u32::try_from(field.name.len()).map_err(|_| {
                TabfileError::invalid_argument(format!(
                    "Column name of {} bytes is too long",
                    field.name.len()
                ))
            })?;
            buf.put_u32_le(name_len);
            buf.put_slice(field.name.as_bytes());
            buf.put_u8(field.column_type.tag());
            buf.put_u8(field.nullable as u8);
        }
        for block in &self.blocks {
            buf.put_u64_le(block.offset);
            buf.put_u64_le(block.length);
            buf.put_u8(block.encoding.tag());
            buf.put_u8(block.compression.tag());
            buf.put_u64_le(block.row_count);
        }
        Ok(buf.to_vec())
    }

    /// Parse a footer, rejecting anything but an exact, well-formed encoding
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut parser = ByteCursor::new(data, FOOTER_LOCATION);

        let count = parser.u32()? as usize;
        // each column needs at least six schema bytes and one block record
        if count > parser.remaining() / (6 + BLOCK_RECORD_LEN) {
            return Err(footer_corrupt(format!(
                "declares {} columns in {} bytes",
                count,
                data.len()
            )));
        }

        let mut fields = Vec::with_capacity(count);
        for _ in 0..count {
            let name_len = parser.u32()? as usize;
            let name = std::str::from_utf8(parser.take(name_len)?)
                .map_err(|e| footer_corrupt(format!("column name is not UTF-8: {}", e)))?
                .to_string();
            let type_tag = parser.u8()?;
            let column_type = ColumnType::from_tag(type_tag)
                .ok_or_else(|| footer_corrupt(format!("unknown type tag {}", type_tag)))?;
            let nullable = match parser.u8()? {
                0 => false,
                1 => true,
                other => return Err(footer_corrupt(format!("invalid nullable flag {}", other))),
            };
            if fields.iter().any(|f: &Field| f.name == name) {
                return Err(footer_corrupt(format!("duplicate column name '{}'", name)));
            }
            fields.push(Field::new(name, column_type, nullable));
        }

        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let offset = parser.u64()?;
            let length = parser.u64()?;
            let encoding_tag = parser.u8()?;
            let encoding = Encoding::from_tag(encoding_tag)
                .ok_or_else(|| footer_corrupt(format!("unknown encoding tag {}", encoding_tag)))?;
            let compression_tag = parser.u8()?;
            let compression = Compression::from_tag(compression_tag).ok_or_else(|| {
                footer_corrupt(format!("unknown compression tag {}", compression_tag))
            })?;
            let row_count = parser.u64()?;
            blocks.push(BlockRecord {
                offset,
                length,
                encoding,
                compression,
                row_count,
            });
        }

        parser.finish()?;
        if let Some(first) = blocks.first() {
            if blocks.iter().any(|b| b.row_count != first.row_count) {
                return Err(footer_corrupt("columns disagree on row count"));
            }
        }

        Ok(Self {
            schema: Schema { fields },
            blocks,
        })
    }

    /// Check that the blocks tile `[MAGIC_LEN, footer_start)` exactly, in order
    pub fn check_layout(&self, footer_start: u64) -> Result<()> {
        let mut expected = MAGIC_LEN;
        for (field, block) in self.schema.fields.iter().zip(&self.blocks) {
            let end = block.end().ok_or_else(|| {
                TabfileError::truncated(format!("block of column '{}' overflows", field.name))
            })?;
            if end > footer_start {
                return Err(TabfileError::truncated(format!(
                    "block of column '{}' ends at {} but data ends at {}",
                    field.name, end, footer_start
                )));
            }
            if block.offset != expected {
                return Err(footer_corrupt(format!(
                    "block of column '{}' starts at {}, expected {}",
                    field.name, block.offset, expected
                )));
            }
            expected = end;
        }
        if expected != footer_start {
            return Err(footer_corrupt(format!(
                "{} unaccounted bytes before the footer",
                footer_start - expected
            )));
        }
        Ok(())
    }
}

const FOOTER_LOCATION: &str = "footer";

fn footer_corrupt<S: Into<String>>(reason: S) -> TabfileError {
    TabfileError::corrupt(FOOTER_LOCATION, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, SchemaBuilder};

    fn sample_footer() -> FileFooter {
        FileFooter {
            schema: SchemaBuilder::new()
                .with_column("id", ColumnType::Int64, false)
                .with_column("name", ColumnType::Utf8, true)
                .build()
                .unwrap(),
            blocks: vec![
                BlockRecord {
                    offset: 8,
                    length: 24,
                    encoding: Encoding::Plain,
                    compression: Compression::None,
                    row_count: 3,
                },
                BlockRecord {
                    offset: 32,
                    length: 17,
                    encoding: Encoding::Dictionary,
                    compression: Compression::Zstd,
                    row_count: 3,
                },
            ],
        }
    }

    #[test]
    fn test_footer_layout_bytes() {
        let bytes = sample_footer().serialize().unwrap();
        // count + ("id" entry) + ("name" entry) + two block records
        assert_eq!(bytes.len(), 4 + (4 + 2 + 2) + (4 + 4 + 2) + 2 * BLOCK_RECORD_LEN);
        assert_eq!(&bytes[..4], &2u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..10], b"id");
        assert_eq!(bytes[10], ColumnType::Int64.tag());
        assert_eq!(bytes[11], 0);
    }

    #[test]
    fn test_footer_parse() {
        let footer = sample_footer();
        let parsed = FileFooter::parse(&footer.serialize().unwrap()).unwrap();
        assert_eq!(parsed, footer);
        assert_eq!(parsed.num_rows(), 3);
        parsed.check_layout(49).unwrap();
    }

    #[test]
    fn test_footer_trailing_bytes() {
        let mut bytes = sample_footer().serialize().unwrap();
        bytes.push(0);
        assert_eq!(
            FileFooter::parse(&bytes).unwrap_err().kind(),
            ErrorKind::CorruptBlock
        );
    }

    #[test]
    fn test_footer_unknown_tag() {
        let mut bytes = sample_footer().serialize().unwrap();
        bytes[10] = 99;
        assert_eq!(
            FileFooter::parse(&bytes).unwrap_err().kind(),
            ErrorKind::CorruptBlock
        );
    }

    #[test]
    fn test_footer_every_prefix_rejected() {
        let bytes = sample_footer().serialize().unwrap();
        for len in 0..bytes.len() {
            assert!(FileFooter::parse(&bytes[..len]).is_err(), "prefix {}", len);
        }
    }

    #[test]
    fn test_layout_checks() {
        let footer = sample_footer();
        assert_eq!(
            footer.check_layout(40).unwrap_err().kind(),
            ErrorKind::TruncatedFile
        );
        assert_eq!(
            footer.check_layout(60).unwrap_err().kind(),
            ErrorKind::CorruptBlock
        );

        let mut gap = footer.clone();
        gap.blocks[1].offset = 33;
        gap.blocks[1].length = 16;
        assert_eq!(
            gap.check_layout(49).unwrap_err().kind(),
            ErrorKind::CorruptBlock
        );
    }

    #[test]
    fn test_empty_footer() {
        let footer = FileFooter {
            schema: Schema { fields: vec![] },
            blocks: vec![],
        };
        let bytes = footer.serialize().unwrap();
        assert_eq!(bytes, 0u32.to_le_bytes());
        let parsed = FileFooter::parse(&bytes).unwrap();
        assert_eq!(parsed.num_rows(), 0);
        parsed.check_layout(MAGIC_LEN).unwrap();
    }
}
