//! The per-chunk transform engine and its host-facing callback adapter.
//!
//! The host pipeline calls [`blosc_filter`] for every chunk write (forward)
//! or read (reverse), on whatever thread it likes; each call borrows the
//! calling thread's codec context and shares nothing else.

use tracing::{debug, error, trace};

use crate::codec::{self, ChunkParams, Compressor};
use crate::constants::*;
use crate::context;
use crate::error::{CodecError, FilterError};
use crate::slots::SlotArray;

/// Which way the host pipeline is moving chunk data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Chunk write: compress.
    Forward,
    /// Chunk read: decompress.
    Reverse,
}

/// Result of a successful transform call.
#[derive(Debug, PartialEq, Eq)]
pub enum Transformed {
    /// A replacement buffer the host should store (or return) instead of
    /// the input, which it must release.
    Produced(Vec<u8>),
    /// Compression would not shrink the chunk; the host should keep the
    /// original bytes. Only the forward direction declines.
    Declined,
}

/// Transform one chunk according to the dataset's parameter slots.
///
/// Forward failures of the codec itself degrade to [`Transformed::Declined`]
/// because the filter is optional on the write path; reverse failures are
/// always hard errors, since the original bytes are irrecoverable without
/// the compressed form.
pub fn transform(
    direction: Direction,
    slots: &SlotArray,
    input: &[u8],
) -> Result<Transformed, FilterError> {
    // Slot validation applies to both directions: an unsupported slot-6
    // code is a configuration error even when the read path takes its
    // compressor from the stream header.
    let params = resolve(slots)?;
    match direction {
        Direction::Forward => compress(&params, input),
        Direction::Reverse => decompress(input),
    }
}

/// Resolve codec parameters from the slot array. Slots 4-6 are optional and
/// fall back to the documented defaults; slot 3 is a pre-storage hint and
/// deliberately ignored here.
fn resolve(slots: &SlotArray) -> Result<ChunkParams, FilterError> {
    let typesize = slots.get(SLOT_TYPESIZE).unwrap_or(0) as usize;
    let clevel = slots.get(SLOT_CLEVEL).unwrap_or(DEFAULT_CLEVEL).min(9);
    let shuffle = slots.get(SLOT_SHUFFLE).unwrap_or(DEFAULT_SHUFFLE);
    let compressor = match slots.get(SLOT_COMPCODE) {
        None => Compressor::DEFAULT,
        Some(code) => {
            Compressor::from_code(code).ok_or_else(|| FilterError::UnsupportedCompressor {
                requested: codec::compressor_name(code)
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("#{code}")),
                available: codec::AVAILABLE_COMPRESSORS,
            })?
        }
    };
    Ok(ChunkParams {
        clevel,
        shuffle,
        typesize,
        compressor,
    })
}

fn alloc_output(bytes: usize) -> Result<Vec<u8>, FilterError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(bytes)
        .map_err(|_| FilterError::Allocation { bytes })?;
    buf.resize(bytes, 0);
    Ok(buf)
}

fn compress(params: &ChunkParams, input: &[u8]) -> Result<Transformed, FilterError> {
    // The output is strictly bounded by the input's size; the codec
    // declines rather than overflow.
    let mut output = alloc_output(input.len())?;
    let result =
        context::with_context(|ctx| codec::compress_chunk(ctx, params, input, &mut output));
    match result {
        Ok(Some(cbytes)) => {
            output.truncate(cbytes);
            trace!(
                nbytes = input.len(),
                cbytes,
                compressor = params.compressor.name(),
                "compressed chunk"
            );
            Ok(Transformed::Produced(output))
        }
        Ok(None) => {
            debug!(nbytes = input.len(), "chunk incompressible, declining");
            Ok(Transformed::Declined)
        }
        Err(CodecError::Allocation(bytes)) => Err(FilterError::Allocation { bytes }),
        Err(err) => {
            // The filter is optional on the write path: the host stores the
            // original bytes instead of failing the chunk.
            debug!(%err, "compression declined after codec error");
            Ok(Transformed::Declined)
        }
    }
}

fn decompress(input: &[u8]) -> Result<Transformed, FilterError> {
    // Size the output from the stream's own header, never from slot 3:
    // earlier pipeline stages can have changed the logical chunk size after
    // the slots were stamped.
    let (nbytes, cbytes, blocksize) =
        codec::header::chunk_sizes(input).map_err(FilterError::Decompression)?;
    trace!(nbytes, cbytes, blocksize, "decompressing chunk");

    let mut output = alloc_output(nbytes)?;
    let written = context::with_context(|ctx| codec::decompress_chunk(ctx, input, &mut output))
        .map_err(|err| match err {
            CodecError::Allocation(bytes) => FilterError::Allocation { bytes },
            other => FilterError::Decompression(other),
        })?;
    output.truncate(written);
    Ok(Transformed::Produced(output))
}

/// Host-facing transform callback.
///
/// On success the caller's buffer is replaced with the transform's output
/// and the new size returned; the previous buffer is released here, exactly
/// once. A return of 0 means the operation declined (forward) or failed
/// (either direction): the caller's buffer is left untouched and remains
/// the caller's to manage, and diagnostics go to the log.
pub fn blosc_filter(direction: Direction, slots: &SlotArray, buf: &mut Vec<u8>) -> usize {
    match transform(direction, slots, buf) {
        Ok(Transformed::Produced(output)) => {
            let size = output.len();
            *buf = output;
            size
        }
        Ok(Transformed::Declined) => 0,
        Err(err) => {
            error!(%err, ?direction, "blosc filter failed");
            0
        }
    }
}
