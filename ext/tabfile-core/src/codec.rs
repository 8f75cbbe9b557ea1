//! Per-column block encodings
//!
//! Every column is encoded into a single self-contained block:
//!
//! - **Int64 / Float64**: plain little-endian 8-byte values
//! - **Boolean**: run-length `(value, length)` pairs, or plain bit-packing when
//!   the data has too many runs for run-length encoding to pay off
//! - **Utf8**: a first-seen-order dictionary followed by one fixed-width index
//!   per row
//!
//! Nullable numeric and boolean blocks start with a null bitmap (bit set means
//! null, least significant bit first). Dictionary blocks mark nulls with a
//! reserved sentinel index instead.

use bytes::{BufMut, Bytes, BytesMut};
use indexmap::IndexSet;
use log::{debug, trace};
use ordered_float::OrderedFloat;
use std::sync::Arc;

use crate::{cursor::ByteCursor, Column, ColumnType, Field, Result, TabfileError, Value};

/// How a column's values are laid out inside its block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Plain,
    Dictionary,
    RunLength,
}

impl Encoding {
    /// The one-byte tag stored in the footer
    pub fn tag(&self) -> u8 {
        match self {
            Encoding::Plain => 0,
            Encoding::Dictionary => 1,
            Encoding::RunLength => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Encoding::Plain),
            1 => Some(Encoding::Dictionary),
            2 => Some(Encoding::RunLength),
            _ => None,
        }
    }
}

/// The encoded bytes of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBlock {
    pub encoding: Encoding,
    pub data: Bytes,
}

impl EncodedBlock {
    pub fn new(encoding: Encoding, data: impl Into<Bytes>) -> Self {
        Self {
            encoding,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encode a column into a block
///
/// Fails with `UnsupportedValue` if any value does not match the column's
/// declared type, or is null in a non-nullable column.
pub fn encode(column: &Column) -> Result<EncodedBlock> {
    check_values(column)?;

    let field = column.field();
    let values = column.values();
    let block = match field.column_type {
        ColumnType::Int64 | ColumnType::Float64 => encode_fixed_width(field, values),
        ColumnType::Boolean => encode_boolean(field, values),
        ColumnType::Utf8 => encode_dictionary(field, values)?,
    };

    debug!(
        "Encoded column '{}' ({}, {} rows) as {:?}: {} bytes",
        field.name,
        field.column_type.type_name(),
        values.len(),
        block.encoding,
        block.len()
    );
    Ok(block)
}

/// Decode a block produced by [`encode`] back into a column
///
/// Decoding is strict: the block must hold exactly `row_count` rows and no
/// trailing bytes.
pub fn decode(block: &EncodedBlock, field: &Field, row_count: usize) -> Result<Column> {
    let mut cursor = ByteCursor::new(&block.data, format!("column '{}'", field.name));

    let values = match (field.column_type, block.encoding) {
        (ColumnType::Int64, Encoding::Plain) => {
            let nulls = null_bitmap(&mut cursor, field.nullable, row_count)?;
            let raw = cursor.take_rows(row_count, 8)?;
            (0..row_count)
                .map(|i| {
                    if is_null(nulls, i) {
                        Value::Null
                    } else {
                        Value::Int64(i64::from_le_bytes(word(raw, i)))
                    }
                })
                .collect()
        }
        (ColumnType::Float64, Encoding::Plain) => {
            let nulls = null_bitmap(&mut cursor, field.nullable, row_count)?;
            let raw = cursor.take_rows(row_count, 8)?;
            (0..row_count)
                .map(|i| {
                    if is_null(nulls, i) {
                        Value::Null
                    } else {
                        let bits = u64::from_le_bytes(word(raw, i));
                        Value::Float64(OrderedFloat(f64::from_bits(bits)))
                    }
                })
                .collect()
        }
        (ColumnType::Boolean, Encoding::Plain) => {
            let nulls = null_bitmap(&mut cursor, field.nullable, row_count)?;
            let packed = cursor.take(row_count.div_ceil(8))?;
            (0..row_count)
                .map(|i| {
                    if is_null(nulls, i) {
                        Value::Null
                    } else {
                        Value::Boolean(bit(packed, i))
                    }
                })
                .collect()
        }
        (ColumnType::Boolean, Encoding::RunLength) => {
            let nulls = null_bitmap(&mut cursor, field.nullable, row_count)?;
            decode_runs(&mut cursor, nulls, row_count)?
        }
        (ColumnType::Utf8, Encoding::Dictionary) => {
            decode_dictionary(&mut cursor, field.nullable, row_count)?
        }
        (column_type, encoding) => {
            return Err(cursor.corrupt(format!(
                "{:?} encoding is not valid for {} columns",
                encoding,
                column_type.type_name()
            )))
        }
    };
    cursor.finish()?;

    trace!(
        "Decoded column '{}' from {} bytes ({:?})",
        field.name,
        block.len(),
        block.encoding
    );
    Ok(Column::new(field.clone(), values))
}

fn check_values(column: &Column) -> Result<()> {
    let field = column.field();
    for (row, value) in column.values().iter().enumerate() {
        if value.is_null() {
            if !field.nullable {
                return Err(TabfileError::unsupported_value(
                    &field.name,
                    row,
                    format!("non-null {}", field.column_type.type_name()),
                    value.type_name(),
                ));
            }
        } else if !value.matches(field.column_type) {
            return Err(TabfileError::unsupported_value(
                &field.name,
                row,
                field.column_type.type_name(),
                value.type_name(),
            ));
        }
    }
    Ok(())
}

fn put_null_bitmap(buf: &mut BytesMut, values: &[Value]) {
    let mut bitmap = vec![0u8; values.len().div_ceil(8)];
    for (i, value) in values.iter().enumerate() {
        if value.is_null() {
            bitmap[i / 8] |= 1 << (i % 8);
        }
    }
    buf.put_slice(&bitmap);
}

fn encode_fixed_width(field: &Field, values: &[Value]) -> EncodedBlock {
    let mut buf = BytesMut::with_capacity(values.len() * 8 + values.len().div_ceil(8));
    if field.nullable {
        put_null_bitmap(&mut buf, values);
    }
    for value in values {
        match value {
            Value::Int64(v) => buf.put_i64_le(*v),
            Value::Float64(v) => buf.put_u64_le(v.to_bits()),
            // null slots are zero-filled so output stays deterministic
            _ => buf.put_u64_le(0),
        }
    }
    EncodedBlock::new(Encoding::Plain, buf.freeze())
}

fn encode_boolean(field: &Field, values: &[Value]) -> EncodedBlock {
    let bits: Vec<bool> = values
        .iter()
        .map(|v| matches!(v, Value::Boolean(true)))
        .collect();

    let mut runs: Vec<(bool, u32)> = Vec::new();
    for &b in &bits {
        match runs.last_mut() {
            Some((value, len)) if *value == b && *len < u32::MAX => *len += 1,
            _ => runs.push((b, 1)),
        }
    }

    let mut buf = BytesMut::new();
    if field.nullable {
        put_null_bitmap(&mut buf, values);
    }

    if runs.len() > bits.len() / 2 {
        trace!(
            "Column '{}' has {} runs over {} rows, bit-packing instead",
            field.name,
            runs.len(),
            bits.len()
        );
        let mut packed = vec![0u8; bits.len().div_ceil(8)];
        for (i, &b) in bits.iter().enumerate() {
            if b {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        buf.put_slice(&packed);
        return EncodedBlock::new(Encoding::Plain, buf.freeze());
    }

    buf.put_u32_le(runs.len() as u32);
    for (value, len) in runs {
        buf.put_u8(value as u8);
        buf.put_u32_le(len);
    }
    EncodedBlock::new(Encoding::RunLength, buf.freeze())
}

/// Width in bytes of dictionary indices for a dictionary of `size` entries.
/// Indices run `0..size`; the largest value of the chosen width is reserved
/// for nulls.
fn index_width(size: usize) -> Option<usize> {
    if size <= u8::MAX as usize {
        Some(1)
    } else if size <= u16::MAX as usize {
        Some(2)
    } else if size <= u32::MAX as usize {
        Some(4)
    } else {
        None
    }
}

fn null_sentinel(width: usize) -> u32 {
    match width {
        1 => u8::MAX as u32,
        2 => u16::MAX as u32,
        _ => u32::MAX,
    }
}

fn encode_dictionary(field: &Field, values: &[Value]) -> Result<EncodedBlock> {
    let mut dictionary: IndexSet<&str> = IndexSet::new();
    let mut indices: Vec<Option<usize>> = Vec::with_capacity(values.len());
    for value in values {
        indices.push(match value {
            Value::String(s) => Some(dictionary.insert_full(s.as_ref()).0),
            _ => None,
        });
    }

    let width = index_width(dictionary.len()).ok_or_else(|| {
        TabfileError::invalid_argument(format!(
            "Column '{}' has too many distinct values ({})",
            field.name,
            dictionary.len()
        ))
    })?;
    let sentinel = null_sentinel(width);

    let dict_bytes: usize = dictionary.iter().map(|s| s.len() + 4).sum();
    let mut buf = BytesMut::with_capacity(4 + dict_bytes + values.len() * width);
    buf.put_u32_le(dictionary.len() as u32);
    for entry in &dictionary {
        let len = u32::try_from(entry.len()).map_err(|_| {
            TabfileError::invalid_argument(format!(
                "Value in column '{}' is longer than 4 GiB",
                field.name
            ))
        })?;
        buf.put_u32_le(len);
        buf.put_slice(entry.as_bytes());
    }
    for index in indices {
        let index = index.map(|i| i as u32).unwrap_or(sentinel);
        match width {
            1 => buf.put_u8(index as u8),
            2 => buf.put_u16_le(index as u16),
            _ => buf.put_u32_le(index),
        }
    }

    trace!(
        "Column '{}': {} distinct values, {}-byte indices",
        field.name,
        dictionary.len(),
        width
    );
    Ok(EncodedBlock::new(Encoding::Dictionary, buf.freeze()))
}

fn decode_runs(
    cursor: &mut ByteCursor<'_>,
    nulls: Option<&[u8]>,
    row_count: usize,
) -> Result<Vec<Value>> {
    let run_count = cursor.u32()? as usize;
    // each run takes five bytes; reject impossible counts before allocating
    let raw = cursor.take_rows(run_count, 5)?;

    let mut runs = Vec::with_capacity(run_count);
    let mut total: usize = 0;
    for chunk in raw.chunks_exact(5) {
        let value = match chunk[0] {
            0 => false,
            1 => true,
            other => return Err(cursor.corrupt(format!("invalid boolean run value {}", other))),
        };
        let len = u32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]) as usize;
        if len == 0 {
            return Err(cursor.corrupt("zero-length run"));
        }
        total = total.saturating_add(len);
        runs.push((value, len));
    }
    if total != row_count {
        return Err(cursor.corrupt(format!(
            "runs cover {} rows, expected {}",
            total, row_count
        )));
    }

    // runs can describe far more rows than the block holds bytes
    let mut values = Vec::new();
    values.try_reserve_exact(row_count).map_err(|e| {
        cursor.corrupt(format!("cannot allocate {} rows: {}", row_count, e))
    })?;
    for (value, len) in runs {
        for _ in 0..len {
            let row = values.len();
            values.push(if is_null(nulls, row) {
                Value::Null
            } else {
                Value::Boolean(value)
            });
        }
    }
    Ok(values)
}

fn decode_dictionary(
    cursor: &mut ByteCursor<'_>,
    nullable: bool,
    row_count: usize,
) -> Result<Vec<Value>> {
    let size = cursor.u32()? as usize;
    let width = index_width(size)
        .ok_or_else(|| cursor.corrupt(format!("dictionary size {} is too large", size)))?;
    let sentinel = null_sentinel(width);

    // every entry needs at least its four-byte length prefix
    let mut dictionary: Vec<Arc<str>> = Vec::with_capacity(size.min(cursor.remaining() / 4));
    for _ in 0..size {
        let len = cursor.u32()? as usize;
        let bytes = cursor.take(len)?;
        let s = std::str::from_utf8(bytes)
            .map_err(|e| cursor.corrupt(format!("dictionary entry is not UTF-8: {}", e)))?;
        dictionary.push(Arc::from(s));
    }

    let raw = cursor.take_rows(row_count, width)?;
    let mut values = Vec::with_capacity(row_count);
    for chunk in raw.chunks_exact(width) {
        let index = match width {
            1 => chunk[0] as u32,
            2 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
            _ => u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
        };
        if index == sentinel {
            if !nullable {
                return Err(cursor.corrupt("null index in a non-nullable column"));
            }
            values.push(Value::Null);
        } else {
            let entry = dictionary.get(index as usize).ok_or_else(|| {
                cursor.corrupt(format!(
                    "dictionary index {} out of range for {} entries",
                    index, size
                ))
            })?;
            values.push(Value::String(entry.clone()));
        }
    }
    Ok(values)
}

fn word(raw: &[u8], i: usize) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(&raw[i * 8..i * 8 + 8]);
    out
}

fn bit(packed: &[u8], i: usize) -> bool {
    packed[i / 8] & (1 << (i % 8)) != 0
}

fn is_null(nulls: Option<&[u8]>, i: usize) -> bool {
    nulls.map(|bitmap| bit(bitmap, i)).unwrap_or(false)
}

fn null_bitmap<'a>(
    cursor: &mut ByteCursor<'a>,
    nullable: bool,
    row_count: usize,
) -> Result<Option<&'a [u8]>> {
    if nullable {
        cursor.take(row_count.div_ceil(8)).map(Some)
    } else {
        Ok(None)
    }
}
