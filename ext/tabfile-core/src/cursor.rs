//! Bounds-checked reads over an in-memory byte slice

use crate::{Result, TabfileError};

/// Reads little-endian integers and byte runs from a slice
///
/// Every failure is a `CorruptBlock` error tagged with `location`.
pub(crate) struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    location: String,
}

impl<'a> ByteCursor<'a> {
    pub(crate) fn new<L: Into<String>>(data: &'a [u8], location: L) -> Self {
        Self {
            data,
            pos: 0,
            location: location.into(),
        }
    }

    pub(crate) fn corrupt<S: Into<String>>(&self, reason: S) -> TabfileError {
        TabfileError::corrupt(self.location.clone(), reason)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.corrupt(format!(
                "needs {} bytes at offset {} but only {} remain",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Take `rows` fixed-width items
    pub(crate) fn take_rows(&mut self, rows: usize, width: usize) -> Result<&'a [u8]> {
        let len = rows
            .checked_mul(width)
            .ok_or_else(|| self.corrupt(format!("row count {} overflows", rows)))?;
        self.take(len)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    /// Fail unless every byte has been consumed
    pub(crate) fn finish(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(self.corrupt(format!("{} trailing bytes", self.remaining())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_reads_little_endian() {
        let mut data = vec![7u8];
        data.extend_from_slice(&0x0102_0304u32.to_le_bytes());
        data.extend_from_slice(&u64::MAX.to_le_bytes());
        let mut cursor = ByteCursor::new(&data, "test");
        assert_eq!(cursor.u8().unwrap(), 7);
        assert_eq!(cursor.u32().unwrap(), 0x0102_0304);
        assert_eq!(cursor.u64().unwrap(), u64::MAX);
        cursor.finish().unwrap();
    }

    #[test]
    fn test_overrun_is_corrupt() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data, "column 'x'");
        let err = cursor.u32().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptBlock);
        assert!(err.to_string().contains("column 'x'"));
        // a failed read consumes nothing
        assert_eq!(cursor.remaining(), 3);
        assert!(cursor.take_rows(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_trailing_bytes() {
        let data = [0u8; 2];
        let mut cursor = ByteCursor::new(&data, "footer");
        cursor.take(1).unwrap();
        assert_eq!(cursor.finish().unwrap_err().kind(), ErrorKind::CorruptBlock);
    }
}
