use thiserror::Error;

/// Errors from the Blosc1 chunk codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream is shorter than the 16-byte chunk header.
    #[error("compressed stream too short for the chunk header ({0} bytes)")]
    TruncatedHeader(usize),

    /// The stream was written by a newer chunk format.
    #[error("chunk format version {0} is newer than this codec supports")]
    VersionSupport(u8),

    /// A header field failed validation.
    #[error("invalid chunk header: {0}")]
    InvalidHeader(&'static str),

    /// The buffer handed in does not match the size its own header records.
    #[error("stream is {actual} bytes but its header records {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The header names a compressor format this build does not know.
    #[error("unknown compressor format code {0} in chunk header")]
    UnknownFormat(u8),

    /// The inner codec rejected the payload.
    #[error("{name} backend error: {reason}")]
    Backend { name: &'static str, reason: String },

    /// The inner codec produced a different size than the header promised.
    #[error("decoded {actual} bytes where the header promised {expected}")]
    DecodedSize { expected: usize, actual: usize },

    /// The destination cannot hold the chunk's uncompressed payload.
    #[error("destination holds {got} bytes, chunk needs {needed}")]
    OutputTooSmall { needed: usize, got: usize },

    /// The source exceeds what the 32-bit header fields can describe.
    #[error("input of {0} bytes exceeds the chunk format's 32-bit limit")]
    BufferTooLarge(usize),

    /// Codec scratch space could not be allocated.
    #[error("cannot allocate {0} bytes of codec scratch")]
    Allocation(usize),
}

/// Errors reported to the host pipeline.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Configuration failure: chunk rank over the supported limit of 32.
    #[error("chunk rank {0} exceeds the supported limit of 32")]
    ChunkRankExceeded(usize),

    /// Configuration failure: the element type reports zero size.
    #[error("element type reports zero size")]
    ZeroSizedType,

    /// Configuration failure: the chunk byte size does not fit a u32 slot.
    #[error("chunk byte size overflows the 32-bit parameter slot")]
    ChunkSizeOverflow,

    /// The requested compressor is not linked into this build.
    #[error("this filter does not have support for the '{requested}' compressor, but only for: {available}")]
    UnsupportedCompressor {
        requested: String,
        available: &'static str,
    },

    /// An output buffer could not be obtained.
    #[error("cannot allocate output buffer of {bytes} bytes")]
    Allocation { bytes: usize },

    /// The compressed stream could not be reversed. Always fatal for the
    /// chunk being read; there is no fallback.
    #[error("blosc decompression error")]
    Decompression(#[source] CodecError),

    /// The filter could not be added to the host dispatch table.
    #[error("cannot register filter {0}: {1}")]
    CantRegister(u32, &'static str),
}
