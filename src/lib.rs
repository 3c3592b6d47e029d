//! Blosc chunk filter for chunked-dataset pipelines.
//!
//! The filter compresses dataset chunks with a shuffle preprocessing stage
//! and one of several inner codecs (lz4, snappy, zlib, zstd), framing each
//! compressed chunk with a self-describing 16-byte header so reads never
//! depend on stored configuration to size their output.
//!
//! Entry points:
//! - [`register_blosc`] wires the filter into a host dispatch table.
//! - [`configure_slots`] stamps the reserved parameter slots when a dataset
//!   is configured.
//! - [`blosc_filter`] / [`transform`] run the per-chunk transform.

pub mod codec;
pub mod constants;
pub mod context;
pub mod error;
pub mod filter;
pub mod registry;
pub mod slots;

pub use codec::{compressor_name, ChunkParams, Compressor, AVAILABLE_COMPRESSORS};
pub use constants::{FILTER_BLOSC, FILTER_BLOSC_VERSION};
pub use context::with_context;
pub use error::{CodecError, FilterError};
pub use filter::{blosc_filter, transform, Direction, Transformed};
pub use registry::{register_blosc, FilterClass, FilterTable};
pub use slots::{configure_slots, Datatype, SlotArray};
