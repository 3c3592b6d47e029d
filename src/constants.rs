//! Protocol constants for the chunk filter and the Blosc1 chunk format.

// Filter identity

/// Filter identifier registered with the host pipeline's dispatch table.
pub const FILTER_BLOSC: u32 = 32001;
/// Revision of the filter's slot protocol, stamped into slot 0.
pub const FILTER_BLOSC_VERSION: u32 = 2;
/// Version string reported to the host at registration time.
pub const BLOSC_VERSION_STRING: &str = env!("CARGO_PKG_VERSION");
/// Release date reported alongside the version string.
pub const BLOSC_VERSION_DATE: &str = "2026-08-23";

// Chunk format

/// Blosc1 chunk format version, stamped into slot 1 and header byte 0.
pub const BLOSC_VERSION_FORMAT: u8 = 2;
/// Internal format version of the inner codec streams (header byte 1).
pub const BLOSC_CODEC_VERSION_FORMAT: u8 = 1;

/// Length of the Blosc1 chunk header in bytes.
pub const BLOSC_HEADER_LENGTH: usize = 16;
/// Framing overhead added to a compressed chunk; destination buffers must
/// allow for this on top of the payload.
pub const BLOSC_MAX_OVERHEAD: usize = BLOSC_HEADER_LENGTH;

/// Maximum element size the shuffle step will operate on. Larger types are
/// treated as a raw byte stream (typesize 1); shuffling them is
/// counterproductive.
pub const BLOSC_MAX_TYPESIZE: usize = 255;

/// Buffers smaller than this are never worth compressing and take the
/// raw-copy path instead.
pub const BLOSC_MIN_BUFFERSIZE: usize = 32;

/// Maximum source buffer size the 32-bit header fields can describe.
pub const BLOSC_MAX_BUFFERSIZE: usize = i32::MAX as usize - BLOSC_MAX_OVERHEAD;

/// Maximum number of chunk dimensions accepted at configuration time.
pub const BLOSC_MAX_CHUNK_RANK: usize = 32;

// Parameter slots (see `slots`)

/// Slot 0: filter revision.
pub const SLOT_FILTER_VERSION: usize = 0;
/// Slot 1: chunk format version.
pub const SLOT_FORMAT_VERSION: usize = 1;
/// Slot 2: element size in bytes (base component for array types).
pub const SLOT_TYPESIZE: usize = 2;
/// Slot 3: precomputed uncompressed chunk size; a hint only, never trusted
/// for buffer sizing on the read path.
pub const SLOT_CHUNKSIZE: usize = 3;
/// Slot 4 (optional): compression level.
pub const SLOT_CLEVEL: usize = 4;
/// Slot 5 (optional): shuffle mode.
pub const SLOT_SHUFFLE: usize = 5;
/// Slot 6 (optional): compressor code.
pub const SLOT_COMPCODE: usize = 6;
/// The first four slots are reserved and always populated.
pub const RESERVED_SLOTS: usize = 4;

/// Compression level used when slot 4 is absent.
pub const DEFAULT_CLEVEL: u32 = 5;
/// Shuffle mode used when slot 5 is absent.
pub const DEFAULT_SHUFFLE: u32 = SHUFFLE_BYTE;

// Shuffle modes (slot 5 values)

/// No shuffle preprocessing.
pub const SHUFFLE_NONE: u32 = 0;
/// Byte-wise shuffle: rearranges bytes by significance across elements.
pub const SHUFFLE_BYTE: u32 = 1;
/// Bit-wise shuffle: rearranges individual bits, for data with low
/// bit-entropy.
pub const SHUFFLE_BIT: u32 = 2;

// Header flag bits (byte 2 of the chunk header)

/// Byte-wise shuffle was applied before compression.
pub const FLAG_DOSHUFFLE: u8 = 0x1;
/// Payload was stored as a raw copy (not compressed).
pub const FLAG_MEMCPYED: u8 = 0x2;
/// Bit-wise shuffle was applied before compression.
pub const FLAG_DOBITSHUFFLE: u8 = 0x4;

// Compressor codes (slot 6 values, Blosc numbering)

/// BloscLZ. Recognized but not linked in this build.
pub const COMPCODE_BLOSCLZ: u32 = 0;
/// LZ4 (the baseline compressor when slot 6 is absent).
pub const COMPCODE_LZ4: u32 = 1;
/// LZ4HC. Recognized but not linked in this build.
pub const COMPCODE_LZ4HC: u32 = 2;
/// Snappy.
pub const COMPCODE_SNAPPY: u32 = 3;
/// Zlib (deflate).
pub const COMPCODE_ZLIB: u32 = 4;
/// Zstandard.
pub const COMPCODE_ZSTD: u32 = 5;

// Compressor format codes, stored in bits 5-7 of the header flags byte so a
// stream identifies the library that produced it.

/// Header format code for LZ4.
pub const FORMAT_LZ4: u8 = 1;
/// Header format code for Snappy.
pub const FORMAT_SNAPPY: u8 = 2;
/// Header format code for Zlib.
pub const FORMAT_ZLIB: u8 = 3;
/// Header format code for Zstd.
pub const FORMAT_ZSTD: u8 = 4;
