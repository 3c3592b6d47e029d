//! The Blosc1 chunk codec: single-block compress/decompress with optional
//! shuffle preprocessing, dispatching to the linked inner codecs.
//!
//! Compression never writes past the destination it is given; a stream that
//! would not fit (including the raw-copy fallback for incompressible data)
//! is reported as `Ok(None)` and left to the caller to decline.

pub mod header;
pub mod shuffle;

use std::io::{Read, Write};

use crate::constants::*;
use crate::context::CodecContext;
use crate::error::CodecError;
use header::ChunkHeader;

/// Inner compressors selectable through parameter slot 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compressor {
    Lz4,
    Snappy,
    Zlib,
    Zstd,
}

/// Comma-separated list of the compressors linked into this build, for
/// diagnostics.
pub const AVAILABLE_COMPRESSORS: &str = "lz4, snappy, zlib, zstd";

/// Name for any compressor code in the Blosc numbering, including codes
/// this build does not link.
pub fn compressor_name(code: u32) -> Option<&'static str> {
    match code {
        COMPCODE_BLOSCLZ => Some("blosclz"),
        COMPCODE_LZ4 => Some("lz4"),
        COMPCODE_LZ4HC => Some("lz4hc"),
        COMPCODE_SNAPPY => Some("snappy"),
        COMPCODE_ZLIB => Some("zlib"),
        COMPCODE_ZSTD => Some("zstd"),
        _ => None,
    }
}

impl Compressor {
    /// Compressor used when slot 6 is absent.
    pub const DEFAULT: Compressor = Compressor::Lz4;

    /// Resolve a slot-6 compressor code to a linked codec.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            COMPCODE_LZ4 => Some(Compressor::Lz4),
            COMPCODE_SNAPPY => Some(Compressor::Snappy),
            COMPCODE_ZLIB => Some(Compressor::Zlib),
            COMPCODE_ZSTD => Some(Compressor::Zstd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Compressor::Lz4 => "lz4",
            Compressor::Snappy => "snappy",
            Compressor::Zlib => "zlib",
            Compressor::Zstd => "zstd",
        }
    }

    /// Format code stored in header flag bits 5-7.
    fn format_code(self) -> u8 {
        match self {
            Compressor::Lz4 => FORMAT_LZ4,
            Compressor::Snappy => FORMAT_SNAPPY,
            Compressor::Zlib => FORMAT_ZLIB,
            Compressor::Zstd => FORMAT_ZSTD,
        }
    }

    fn from_format(code: u8) -> Option<Self> {
        match code {
            FORMAT_LZ4 => Some(Compressor::Lz4),
            FORMAT_SNAPPY => Some(Compressor::Snappy),
            FORMAT_ZLIB => Some(Compressor::Zlib),
            FORMAT_ZSTD => Some(Compressor::Zstd),
            _ => None,
        }
    }

    /// Staging room the codec insists on before it will compress at all.
    /// LZ4 and Snappy refuse any destination smaller than their worst case,
    /// so they compress into scratch and the result is copied out only if
    /// it fits; Zlib and Zstd stream into the destination directly and fail
    /// gracefully when it fills.
    fn staging_len(self, nbytes: usize) -> usize {
        match self {
            Compressor::Lz4 => lz4_flex::block::get_maximum_output_size(nbytes),
            Compressor::Snappy => snap::raw::max_compress_len(nbytes),
            Compressor::Zlib | Compressor::Zstd => 0,
        }
    }
}

/// Resolved per-chunk compression parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    /// Compression level, 0-9. Level 0 stores a raw copy.
    pub clevel: u32,
    /// Requested shuffle mode (`SHUFFLE_NONE`/`SHUFFLE_BYTE`/`SHUFFLE_BIT`).
    pub shuffle: u32,
    /// Element size in bytes.
    pub typesize: usize,
    pub compressor: Compressor,
}

/// Compress `src` into `dest` as a single Blosc1 block.
///
/// Returns the total framed stream size, or `Ok(None)` when neither the
/// compressed stream nor the raw-copy fallback fits in `dest`. The fit
/// check lives here, not in the caller: this function never writes past
/// `dest.len()`, and refuses rather than overflows.
pub fn compress_chunk(
    ctx: &mut CodecContext,
    params: &ChunkParams,
    src: &[u8],
    dest: &mut [u8],
) -> Result<Option<usize>, CodecError> {
    let nbytes = src.len();
    if nbytes > BLOSC_MAX_BUFFERSIZE {
        return Err(CodecError::BufferTooLarge(nbytes));
    }
    if dest.len() < BLOSC_HEADER_LENGTH {
        return Ok(None);
    }

    let typesize = if params.typesize == 0 || params.typesize > BLOSC_MAX_TYPESIZE {
        1
    } else {
        params.typesize
    };

    if params.clevel == 0 || nbytes < BLOSC_MIN_BUFFERSIZE {
        return Ok(store_uncompressed(params.compressor, typesize, src, dest));
    }

    let stage_len = params.compressor.staging_len(nbytes);
    let mut flags = params.compressor.format_code() << 5;
    let encoded = match effective_shuffle(params.shuffle, typesize, nbytes) {
        SHUFFLE_BYTE => {
            let (tmp, stage) = ctx.scratch_pair(nbytes, stage_len)?;
            shuffle::shuffle(typesize, src, tmp);
            flags |= FLAG_DOSHUFFLE;
            encode(
                params.compressor,
                params.clevel,
                tmp,
                &mut dest[BLOSC_HEADER_LENGTH..],
                stage,
            )
        }
        SHUFFLE_BIT => {
            // The staging buffer doubles as the bit-transpose intermediate.
            let (tmp, stage) = ctx.scratch_pair(nbytes, stage_len.max(nbytes))?;
            shuffle::bitshuffle(typesize, src, tmp, &mut stage[..nbytes]);
            flags |= FLAG_DOBITSHUFFLE;
            encode(
                params.compressor,
                params.clevel,
                tmp,
                &mut dest[BLOSC_HEADER_LENGTH..],
                stage,
            )
        }
        _ => {
            let stage = ctx.scratch(stage_len)?;
            encode(
                params.compressor,
                params.clevel,
                src,
                &mut dest[BLOSC_HEADER_LENGTH..],
                stage,
            )
        }
    };

    let csize = match encoded {
        // Only keep the compressed form when it actually shrinks the chunk.
        Some(n) if n > 0 && n + BLOSC_HEADER_LENGTH < nbytes => n,
        _ => return Ok(store_uncompressed(params.compressor, typesize, src, dest)),
    };

    let cbytes = csize + BLOSC_HEADER_LENGTH;
    let chunk_header = ChunkHeader {
        version: BLOSC_VERSION_FORMAT,
        codec_version: BLOSC_CODEC_VERSION_FORMAT,
        flags,
        typesize: typesize as u8,
        nbytes: nbytes as u32,
        blocksize: nbytes as u32,
        cbytes: cbytes as u32,
    };
    dest[..BLOSC_HEADER_LENGTH].copy_from_slice(&chunk_header.to_bytes());
    Ok(Some(cbytes))
}

/// Decompress a self-describing stream into `dest`, returning the payload
/// size. Sizing comes from the stream's header; `dest` must already hold at
/// least that many bytes.
pub fn decompress_chunk(
    ctx: &mut CodecContext,
    src: &[u8],
    dest: &mut [u8],
) -> Result<usize, CodecError> {
    let chunk_header = ChunkHeader::from_bytes(src)?;
    let nbytes = chunk_header.nbytes as usize;

    if chunk_header.cbytes as usize != src.len() {
        return Err(CodecError::LengthMismatch {
            expected: chunk_header.cbytes as usize,
            actual: src.len(),
        });
    }
    if dest.len() < nbytes {
        return Err(CodecError::OutputTooSmall {
            needed: nbytes,
            got: dest.len(),
        });
    }

    let payload = &src[BLOSC_HEADER_LENGTH..];

    if chunk_header.memcpyed() {
        if payload.len() != nbytes {
            return Err(CodecError::InvalidHeader("raw-copy payload size mismatch"));
        }
        dest[..nbytes].copy_from_slice(payload);
        return Ok(nbytes);
    }

    let compressor = Compressor::from_format(chunk_header.compressor_format())
        .ok_or(CodecError::UnknownFormat(chunk_header.compressor_format()))?;
    let typesize = chunk_header.typesize as usize;

    if chunk_header.bit_shuffled() && nbytes % (typesize * 8) != 0 {
        return Err(CodecError::InvalidHeader(
            "bit-shuffled payload not divisible into bit planes",
        ));
    }

    if chunk_header.byte_shuffled() {
        let tmp = ctx.scratch(nbytes)?;
        decode(compressor, payload, tmp)?;
        shuffle::unshuffle(typesize, tmp, &mut dest[..nbytes]);
    } else if chunk_header.bit_shuffled() {
        let (tmp, tmp2) = ctx.scratch_pair(nbytes, nbytes)?;
        decode(compressor, payload, tmp)?;
        shuffle::bitunshuffle(typesize, tmp, &mut dest[..nbytes], tmp2);
    } else {
        decode(compressor, payload, &mut dest[..nbytes])?;
    }
    Ok(nbytes)
}

/// The filter actually applied for a request. Single-byte elements make the
/// byte shuffle an identity, and the bit shuffle needs whole 8-element
/// groups per byte lane.
fn effective_shuffle(requested: u32, typesize: usize, nbytes: usize) -> u32 {
    match requested {
        SHUFFLE_BIT if nbytes > 0 && nbytes % (typesize * 8) == 0 => SHUFFLE_BIT,
        SHUFFLE_BIT | SHUFFLE_BYTE if typesize > 1 => SHUFFLE_BYTE,
        _ => SHUFFLE_NONE,
    }
}

/// Frame `src` unmodified. Used for level 0, tiny buffers, and
/// incompressible data; returns `None` when `dest` lacks room for the
/// header overhead, which is exactly the "store the original bytes" signal.
fn store_uncompressed(
    compressor: Compressor,
    typesize: usize,
    src: &[u8],
    dest: &mut [u8],
) -> Option<usize> {
    let cbytes = src.len() + BLOSC_HEADER_LENGTH;
    if cbytes > dest.len() {
        return None;
    }
    let chunk_header = ChunkHeader {
        version: BLOSC_VERSION_FORMAT,
        codec_version: BLOSC_CODEC_VERSION_FORMAT,
        flags: FLAG_MEMCPYED | (compressor.format_code() << 5),
        typesize: typesize as u8,
        nbytes: src.len() as u32,
        blocksize: src.len() as u32,
        cbytes: cbytes as u32,
    };
    dest[..BLOSC_HEADER_LENGTH].copy_from_slice(&chunk_header.to_bytes());
    dest[BLOSC_HEADER_LENGTH..cbytes].copy_from_slice(src);
    Some(cbytes)
}

/// Run the inner codec. `None` means the output did not fit (or the backend
/// refused); the caller falls back to the raw-copy path. `stage` is scratch
/// of at least [`Compressor::staging_len`] bytes for the codecs that need
/// worst-case room up front.
fn encode(
    compressor: Compressor,
    clevel: u32,
    src: &[u8],
    dest: &mut [u8],
    stage: &mut [u8],
) -> Option<usize> {
    match compressor {
        Compressor::Lz4 => {
            let n = lz4_flex::block::compress_into(src, stage).ok()?;
            copy_if_fits(stage, n, dest)
        }
        Compressor::Snappy => {
            let n = snap::raw::Encoder::new().compress(src, stage).ok()?;
            copy_if_fits(stage, n, dest)
        }
        Compressor::Zlib => encode_zlib(clevel, src, dest),
        Compressor::Zstd => encode_zstd(clevel, src, dest),
    }
}

fn copy_if_fits(stage: &[u8], n: usize, dest: &mut [u8]) -> Option<usize> {
    if n <= dest.len() {
        dest[..n].copy_from_slice(&stage[..n]);
        Some(n)
    } else {
        None
    }
}

fn encode_zlib(clevel: u32, src: &[u8], dest: &mut [u8]) -> Option<usize> {
    let cursor = std::io::Cursor::new(dest);
    let mut encoder =
        flate2::write::ZlibEncoder::new(cursor, flate2::Compression::new(clevel.min(9)));
    encoder.write_all(src).ok()?;
    let cursor = encoder.finish().ok()?;
    Some(cursor.position() as usize)
}

fn encode_zstd(clevel: u32, src: &[u8], dest: &mut [u8]) -> Option<usize> {
    let cursor = std::io::Cursor::new(dest);
    let mut encoder = zstd::stream::write::Encoder::new(cursor, clevel as i32).ok()?;
    encoder.write_all(src).ok()?;
    let cursor = encoder.finish().ok()?;
    Some(cursor.position() as usize)
}

/// Run the inner codec in reverse, filling `dest` exactly. Any backend
/// complaint or size disagreement is a hard error: a compressed stream that
/// does not reproduce its promised payload is corrupt.
fn decode(compressor: Compressor, src: &[u8], dest: &mut [u8]) -> Result<(), CodecError> {
    match compressor {
        Compressor::Lz4 => {
            let n = lz4_flex::block::decompress_into(src, dest).map_err(|e| {
                CodecError::Backend {
                    name: "lz4",
                    reason: e.to_string(),
                }
            })?;
            expect_full(n, dest.len())
        }
        Compressor::Snappy => {
            let n = snap::raw::Decoder::new()
                .decompress(src, dest)
                .map_err(|e| CodecError::Backend {
                    name: "snappy",
                    reason: e.to_string(),
                })?;
            expect_full(n, dest.len())
        }
        Compressor::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(src);
            decoder.read_exact(dest).map_err(|e| CodecError::Backend {
                name: "zlib",
                reason: e.to_string(),
            })?;
            expect_eof("zlib", &mut decoder)
        }
        Compressor::Zstd => {
            let mut decoder =
                zstd::stream::read::Decoder::new(src).map_err(|e| CodecError::Backend {
                    name: "zstd",
                    reason: e.to_string(),
                })?;
            decoder.read_exact(dest).map_err(|e| CodecError::Backend {
                name: "zstd",
                reason: e.to_string(),
            })?;
            expect_eof("zstd", &mut decoder)
        }
    }
}

fn expect_full(actual: usize, expected: usize) -> Result<(), CodecError> {
    if actual != expected {
        return Err(CodecError::DecodedSize { expected, actual });
    }
    Ok(())
}

/// A stream that keeps decoding past the size its header declares is
/// corrupt, even when the prefix decoded cleanly.
fn expect_eof(name: &'static str, reader: &mut impl Read) -> Result<(), CodecError> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte) {
        Ok(0) => Ok(()),
        Ok(_) => Err(CodecError::Backend {
            name,
            reason: "payload decodes past the size the header declares".to_string(),
        }),
        Err(e) => Err(CodecError::Backend {
            name,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::with_context;

    fn params(compressor: Compressor) -> ChunkParams {
        ChunkParams {
            clevel: 5,
            shuffle: SHUFFLE_BYTE,
            typesize: 4,
            compressor,
        }
    }

    #[test]
    fn incompressible_chunk_reports_none_when_dest_is_input_sized() {
        // High-entropy bytes through lz4 cannot shrink; with dest exactly
        // input-sized even the raw-copy fallback lacks header room.
        let src: Vec<u8> = (0..4096u32)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        let mut dest = vec![0u8; src.len()];
        let result = with_context(|ctx| {
            compress_chunk(ctx, &params(Compressor::Lz4), &src, &mut dest)
        })
        .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn compressible_chunk_fits_in_input_sized_dest() {
        // The filter hands the codec a destination no larger than the
        // input; every linked codec must still manage to compress
        // redundant data under that bound.
        let src: Vec<u8> = (0..8192u32).map(|i| (i % 16) as u8).collect();
        for compressor in [
            Compressor::Lz4,
            Compressor::Snappy,
            Compressor::Zlib,
            Compressor::Zstd,
        ] {
            let mut dest = vec![0u8; src.len()];
            let cbytes = with_context(|ctx| {
                compress_chunk(ctx, &params(compressor), &src, &mut dest)
            })
            .unwrap()
            .unwrap_or_else(|| panic!("{} declined a compressible chunk", compressor.name()));
            assert!(cbytes < src.len(), "{}", compressor.name());
            let parsed = ChunkHeader::from_bytes(&dest[..cbytes]).unwrap();
            assert!(!parsed.memcpyed(), "{}", compressor.name());
        }
    }

    #[test]
    fn decode_rejects_streams_longer_than_declared() {
        // A zlib payload for 64 bytes framed as a 32-byte chunk: the prefix
        // decodes cleanly but the stream does not end where the header says.
        let data = vec![7u8; 64];
        let mut payload = Vec::new();
        let mut encoder =
            flate2::write::ZlibEncoder::new(&mut payload, flate2::Compression::new(5));
        encoder.write_all(&data).unwrap();
        encoder.finish().unwrap();

        let chunk_header = ChunkHeader {
            version: BLOSC_VERSION_FORMAT,
            codec_version: BLOSC_CODEC_VERSION_FORMAT,
            flags: FORMAT_ZLIB << 5,
            typesize: 1,
            nbytes: 32,
            blocksize: 32,
            cbytes: (BLOSC_HEADER_LENGTH + payload.len()) as u32,
        };
        let mut stream = chunk_header.to_bytes().to_vec();
        stream.extend_from_slice(&payload);

        let mut out = vec![0u8; 32];
        let err =
            with_context(|ctx| decompress_chunk(ctx, &stream, &mut out)).unwrap_err();
        assert!(matches!(err, CodecError::Backend { name: "zlib", .. }));
    }

    #[test]
    fn tiny_chunk_takes_raw_copy_path_when_room_allows() {
        let src = [7u8; 16];
        let mut dest = vec![0u8; 16 + BLOSC_MAX_OVERHEAD];
        let cbytes = with_context(|ctx| {
            compress_chunk(ctx, &params(Compressor::Zstd), &src, &mut dest)
        })
        .unwrap()
        .expect("raw copy fits");
        assert_eq!(cbytes, 16 + BLOSC_HEADER_LENGTH);
        let parsed = ChunkHeader::from_bytes(&dest).unwrap();
        assert!(parsed.memcpyed());

        let mut restored = vec![0u8; 16];
        let n = with_context(|ctx| decompress_chunk(ctx, &dest[..cbytes], &mut restored)).unwrap();
        assert_eq!(n, 16);
        assert_eq!(restored, src);
    }

    #[test]
    fn bit_shuffle_falls_back_when_not_divisible() {
        // 4-byte elements, 9 of them: 36 bytes, not divisible by 4*8.
        let src: Vec<u8> = (0..36).map(|i| (i * 3) as u8).collect();
        let mut dest = vec![0u8; src.len() + BLOSC_MAX_OVERHEAD];
        let p = ChunkParams {
            clevel: 5,
            shuffle: SHUFFLE_BIT,
            typesize: 4,
            compressor: Compressor::Lz4,
        };
        with_context(|ctx| compress_chunk(ctx, &p, &src, &mut dest)).unwrap();
        let parsed = ChunkHeader::from_bytes(&dest).unwrap();
        assert!(!parsed.bit_shuffled());
    }

    #[test]
    fn oversized_typesize_degrades_to_byte_stream() {
        let src = vec![0u8; 2048];
        let mut dest = vec![0u8; src.len() + BLOSC_MAX_OVERHEAD];
        let p = ChunkParams {
            clevel: 5,
            shuffle: SHUFFLE_BYTE,
            typesize: 600,
            compressor: Compressor::Lz4,
        };
        let cbytes = with_context(|ctx| compress_chunk(ctx, &p, &src, &mut dest))
            .unwrap()
            .unwrap();
        let parsed = ChunkHeader::from_bytes(&dest[..cbytes]).unwrap();
        assert_eq!(parsed.typesize, 1);
    }
}
