//! The 16-byte Blosc1 chunk header.
//!
//! Every compressed chunk is self-describing: its own uncompressed size,
//! block size and total compressed size live in the header. The read path
//! sizes its buffers from here and from nowhere else.

use crate::constants::*;
use crate::error::CodecError;

/// Decoded Blosc1 chunk header.
///
/// Layout (all multi-byte fields little-endian):
///
/// | offset | field                                          |
/// |--------|------------------------------------------------|
/// | 0      | chunk format version                           |
/// | 1      | inner codec format version                     |
/// | 2      | flags: shuffle bits, raw-copy bit, compressor format in bits 5-7 |
/// | 3      | element size                                   |
/// | 4..8   | `nbytes`: uncompressed payload size            |
/// | 8..12  | `blocksize`                                    |
/// | 12..16 | `cbytes`: total stream size including this header |
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub version: u8,
    pub codec_version: u8,
    pub flags: u8,
    pub typesize: u8,
    pub nbytes: u32,
    pub blocksize: u32,
    pub cbytes: u32,
}

impl ChunkHeader {
    /// Compressor format code (bits 5-7 of the flags byte).
    pub fn compressor_format(&self) -> u8 {
        self.flags >> 5
    }

    /// Whether the payload is a raw copy of the original bytes.
    pub fn memcpyed(&self) -> bool {
        self.flags & FLAG_MEMCPYED != 0
    }

    /// Whether byte-wise shuffle was applied before compression.
    pub fn byte_shuffled(&self) -> bool {
        self.flags & FLAG_DOSHUFFLE != 0
    }

    /// Whether bit-wise shuffle was applied before compression.
    pub fn bit_shuffled(&self) -> bool {
        self.flags & FLAG_DOBITSHUFFLE != 0
    }

    /// Serialize to exactly [`BLOSC_HEADER_LENGTH`] bytes.
    pub fn to_bytes(&self) -> [u8; BLOSC_HEADER_LENGTH] {
        let mut buf = [0u8; BLOSC_HEADER_LENGTH];
        buf[0] = self.version;
        buf[1] = self.codec_version;
        buf[2] = self.flags;
        buf[3] = self.typesize;
        buf[4..8].copy_from_slice(&self.nbytes.to_le_bytes());
        buf[8..12].copy_from_slice(&self.blocksize.to_le_bytes());
        buf[12..16].copy_from_slice(&self.cbytes.to_le_bytes());
        buf
    }

    /// Parse and validate a header from the start of `src`.
    pub fn from_bytes(src: &[u8]) -> Result<Self, CodecError> {
        if src.len() < BLOSC_HEADER_LENGTH {
            return Err(CodecError::TruncatedHeader(src.len()));
        }

        let header = ChunkHeader {
            version: src[0],
            codec_version: src[1],
            flags: src[2],
            typesize: src[3],
            nbytes: u32::from_le_bytes(src[4..8].try_into().unwrap()),
            blocksize: u32::from_le_bytes(src[8..12].try_into().unwrap()),
            cbytes: u32::from_le_bytes(src[12..16].try_into().unwrap()),
        };

        if header.version > BLOSC_VERSION_FORMAT {
            return Err(CodecError::VersionSupport(header.version));
        }
        if (header.cbytes as usize) < BLOSC_HEADER_LENGTH {
            return Err(CodecError::InvalidHeader(
                "cbytes smaller than the header itself",
            ));
        }
        if header.nbytes > 0 && (header.blocksize == 0 || header.blocksize > header.nbytes) {
            return Err(CodecError::InvalidHeader(
                "block size inconsistent with nbytes",
            ));
        }
        if header.typesize == 0 {
            return Err(CodecError::InvalidHeader("zero typesize"));
        }
        if header.byte_shuffled() && header.bit_shuffled() {
            return Err(CodecError::InvalidHeader("conflicting shuffle flags"));
        }

        Ok(header)
    }
}

/// Read `(nbytes, cbytes, blocksize)` from a compressed stream's own header.
///
/// This is the only legitimate source for sizing a decompression buffer:
/// hints recorded before storage can be stale if other pipeline stages
/// changed the logical chunk size.
pub fn chunk_sizes(cbuffer: &[u8]) -> Result<(usize, usize, usize), CodecError> {
    let header = ChunkHeader::from_bytes(cbuffer)?;
    Ok((
        header.nbytes as usize,
        header.cbytes as usize,
        header.blocksize as usize,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChunkHeader {
        ChunkHeader {
            version: BLOSC_VERSION_FORMAT,
            codec_version: BLOSC_CODEC_VERSION_FORMAT,
            flags: FLAG_DOSHUFFLE | (FORMAT_LZ4 << 5),
            typesize: 8,
            nbytes: 800,
            blocksize: 800,
            cbytes: 120,
        }
    }

    #[test]
    fn header_roundtrip() {
        let header = sample();
        let parsed = ChunkHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.compressor_format(), FORMAT_LZ4);
        assert!(parsed.byte_shuffled());
        assert!(!parsed.memcpyed());
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            ChunkHeader::from_bytes(&bytes[..10]),
            Err(CodecError::TruncatedHeader(10))
        ));
    }

    #[test]
    fn rejects_future_version() {
        let mut bytes = sample().to_bytes();
        bytes[0] = BLOSC_VERSION_FORMAT + 1;
        assert!(matches!(
            ChunkHeader::from_bytes(&bytes),
            Err(CodecError::VersionSupport(_))
        ));
    }

    #[test]
    fn rejects_undersized_cbytes() {
        let mut header = sample();
        header.cbytes = 8;
        assert!(matches!(
            ChunkHeader::from_bytes(&header.to_bytes()),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn rejects_zero_typesize() {
        let mut header = sample();
        header.typesize = 0;
        assert!(matches!(
            ChunkHeader::from_bytes(&header.to_bytes()),
            Err(CodecError::InvalidHeader(_))
        ));
    }

    #[test]
    fn sizes_come_from_the_stream() {
        let (nbytes, cbytes, blocksize) = chunk_sizes(&sample().to_bytes()).unwrap();
        assert_eq!((nbytes, cbytes, blocksize), (800, 120, 800));
    }
}
