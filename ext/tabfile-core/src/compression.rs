//! General-purpose block compression applied on top of column encodings

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use crate::{Result, TabfileError};

pub const DEFAULT_GZIP_LEVEL: u32 = 6;
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Byte compressor applied to each encoded column block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    #[default]
    None,
    Snappy,
    Gzip,
    Lz4,
    Zstd,
}

impl Compression {
    /// Every supported option, `None` first
    pub const ALL: [Compression; 5] = [
        Compression::None,
        Compression::Snappy,
        Compression::Gzip,
        Compression::Lz4,
        Compression::Zstd,
    ];

    /// The one-byte tag stored in the footer
    pub fn tag(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Snappy => 1,
            Compression::Gzip => 2,
            Compression::Lz4 => 3,
            Compression::Zstd => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Compression::None),
            1 => Some(Compression::Snappy),
            2 => Some(Compression::Gzip),
            3 => Some(Compression::Lz4),
            4 => Some(Compression::Zstd),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Snappy => "snappy",
            Compression::Gzip => "gzip",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }

    /// Compress `data`. `level` applies to gzip and zstd only.
    pub fn compress(&self, data: &[u8], level: Option<i32>) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map_err(|e| TabfileError::internal(format!("Snappy compress failed: {}", e))),
            Compression::Gzip => {
                let level = level
                    .map(|l| l.clamp(0, 9) as u32)
                    .unwrap_or(DEFAULT_GZIP_LEVEL);
                let mut encoder = flate2::write::GzEncoder::new(
                    Vec::with_capacity(data.len() / 2),
                    flate2::Compression::new(level),
                );
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compression::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
            Compression::Zstd => {
                let level = level.unwrap_or(DEFAULT_ZSTD_LEVEL);
                Ok(zstd::stream::encode_all(std::io::Cursor::new(data), level)?)
            }
        }
    }

    /// Reverse [`Compression::compress`]. Malformed input is a corrupt block.
    pub fn decompress(&self, data: &[u8], location: &str) -> Result<Vec<u8>> {
        let corrupt = |e: &dyn fmt::Display| {
            TabfileError::corrupt(location, format!("{} decompress failed: {}", self, e))
        };

        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Snappy => snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| corrupt(&e)),
            Compression::Gzip => {
                let mut decoded = Vec::new();
                flate2::read::GzDecoder::new(data)
                    .read_to_end(&mut decoded)
                    .map_err(|e| corrupt(&e))?;
                Ok(decoded)
            }
            Compression::Lz4 => {
                lz4_flex::decompress_size_prepended(data).map_err(|e| corrupt(&e))
            }
            Compression::Zstd => {
                zstd::stream::decode_all(std::io::Cursor::new(data)).map_err(|e| corrupt(&e))
            }
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = TabfileError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Compression::None,
            "snappy" => Compression::Snappy,
            "gzip" => Compression::Gzip,
            "lz4" => Compression::Lz4,
            "zstd" => Compression::Zstd,
            _ => {
                return Err(TabfileError::invalid_argument(format!(
                    "Invalid compression: {}",
                    s
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        (0..4096u32).flat_map(|i| (i % 17).to_le_bytes()).collect()
    }

    #[test]
    fn test_all_compressions_reverse() {
        let data = sample();
        for compression in Compression::ALL {
            let packed = compression.compress(&data, None).unwrap();
            let unpacked = compression.decompress(&packed, "test").unwrap();
            assert_eq!(unpacked, data, "{} did not reverse", compression);
        }
    }

    #[test]
    fn test_repetitive_data_shrinks() {
        let data = sample();
        for compression in &Compression::ALL[1..] {
            let packed = compression.compress(&data, None).unwrap();
            assert!(packed.len() < data.len(), "{} did not shrink", compression);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("ZSTD".parse::<Compression>().unwrap(), Compression::Zstd);
        assert_eq!("snappy".parse::<Compression>().unwrap(), Compression::Snappy);
        assert_eq!(
            "uncompressed".parse::<Compression>().unwrap(),
            Compression::None
        );
        assert!("brotli".parse::<Compression>().is_err());
    }

    #[test]
    fn test_tags() {
        for compression in Compression::ALL {
            assert_eq!(Compression::from_tag(compression.tag()), Some(compression));
        }
        assert_eq!(Compression::from_tag(9), None);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let garbage = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02];
        for compression in [Compression::Gzip, Compression::Zstd] {
            let err = compression.decompress(&garbage, "column 'x'").unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::CorruptBlock);
        }
    }
}
