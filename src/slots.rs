//! Parameter-slot negotiation with the host pipeline.
//!
//! The host persists an ordered array of unsigned values alongside every
//! dataset that uses this filter; [`configure_slots`] fills the reserved
//! slots once, at dataset-configuration time, so that every later chunk
//! transform (possibly in another process) sees the same parameters.

use tracing::debug;

use crate::constants::*;
use crate::error::FilterError;

/// Ordered, fixed-layout array of configuration values persisted by the
/// host alongside a filtered dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotArray {
    values: Vec<u32>,
}

impl SlotArray {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<u32> {
        self.values.get(slot).copied()
    }

    /// The first four slots are reserved; an array declared shorter is
    /// widened with zeros before use.
    pub fn widen_reserved(&mut self) {
        if self.values.len() < RESERVED_SLOTS {
            self.values.resize(RESERVED_SLOTS, 0);
        }
    }

    fn set(&mut self, slot: usize, value: u32) {
        self.values[slot] = value;
    }
}

impl From<Vec<u32>> for SlotArray {
    fn from(values: Vec<u32>) -> Self {
        Self::new(values)
    }
}

/// Element type descriptor, as reported by the host's type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    /// Scalar type of a fixed size in bytes.
    Fixed { size: usize },
    /// Array type. The shuffle-relevant size is the base component's, found
    /// by recursing through nested array levels.
    Array { base: Box<Datatype>, nelems: usize },
}

impl Datatype {
    /// Total size in bytes of one element of this type.
    pub fn size(&self) -> usize {
        match self {
            Datatype::Fixed { size } => *size,
            Datatype::Array { base, nelems } => base.size() * nelems,
        }
    }

    /// Size of the underlying scalar component.
    pub fn base_size(&self) -> usize {
        match self {
            Datatype::Fixed { size } => *size,
            Datatype::Array { base, .. } => base.base_size(),
        }
    }
}

/// Compute and stamp the reserved slots at dataset-configuration time.
///
/// Slots 0 and 1 are always overwritten with the current filter revision
/// and chunk format version; slot 2 receives the base element size (clamped
/// to 1 beyond the shuffle-friendly maximum); slot 3 the uncompressed chunk
/// byte size. Optional slots beyond the reserved four pass through
/// untouched.
///
/// Returns the updated array for the host to persist. On error the existing
/// slots are left exactly as they were; no partial state escapes.
pub fn configure_slots(
    existing: &SlotArray,
    datatype: &Datatype,
    chunk_dims: &[u64],
) -> Result<SlotArray, FilterError> {
    if chunk_dims.len() > BLOSC_MAX_CHUNK_RANK {
        return Err(FilterError::ChunkRankExceeded(chunk_dims.len()));
    }

    let typesize = datatype.size();
    if typesize == 0 {
        return Err(FilterError::ZeroSizedType);
    }

    let mut base_size = datatype.base_size();
    if base_size > BLOSC_MAX_TYPESIZE {
        // Large element types shuffle poorly; store them as a byte stream.
        base_size = 1;
    }

    let mut chunk_bytes =
        u32::try_from(typesize).map_err(|_| FilterError::ChunkSizeOverflow)?;
    for &extent in chunk_dims {
        chunk_bytes = u32::try_from(extent)
            .ok()
            .and_then(|extent| chunk_bytes.checked_mul(extent))
            .ok_or(FilterError::ChunkSizeOverflow)?;
    }

    let mut slots = existing.clone();
    slots.widen_reserved();
    slots.set(SLOT_FILTER_VERSION, FILTER_BLOSC_VERSION);
    slots.set(SLOT_FORMAT_VERSION, BLOSC_VERSION_FORMAT as u32);
    slots.set(SLOT_TYPESIZE, base_size as u32);
    slots.set(SLOT_CHUNKSIZE, chunk_bytes);

    debug!(chunk_bytes, typesize = base_size, "configured filter slots");
    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_reserved_slots() {
        let slots = configure_slots(
            &SlotArray::default(),
            &Datatype::Fixed { size: 8 },
            &[10, 10],
        )
        .unwrap();
        assert_eq!(
            slots.values(),
            &[FILTER_BLOSC_VERSION, BLOSC_VERSION_FORMAT as u32, 8, 800]
        );
    }

    #[test]
    fn array_types_use_the_base_component_size() {
        let dtype = Datatype::Array {
            base: Box::new(Datatype::Array {
                base: Box::new(Datatype::Fixed { size: 4 }),
                nelems: 3,
            }),
            nelems: 2,
        };
        let slots = configure_slots(&SlotArray::default(), &dtype, &[5]).unwrap();
        assert_eq!(slots.get(SLOT_TYPESIZE), Some(4));
        // Slot 3 uses the full element size: 4 * 3 * 2 * 5.
        assert_eq!(slots.get(SLOT_CHUNKSIZE), Some(120));
    }

    #[test]
    fn oversized_types_clamp_to_one() {
        let dtype = Datatype::Fixed { size: 300 };
        let slots = configure_slots(&SlotArray::default(), &dtype, &[4]).unwrap();
        assert_eq!(slots.get(SLOT_TYPESIZE), Some(1));
        assert_eq!(slots.get(SLOT_CHUNKSIZE), Some(1200));
    }

    #[test]
    fn preserves_optional_slots_and_widens_short_arrays() {
        let existing = SlotArray::new(vec![0, 0, 0, 0, 9, 2, 5]);
        let slots =
            configure_slots(&existing, &Datatype::Fixed { size: 2 }, &[16]).unwrap();
        assert_eq!(&slots.values()[4..], &[9, 2, 5]);

        let short = SlotArray::new(vec![1]);
        let widened =
            configure_slots(&short, &Datatype::Fixed { size: 2 }, &[16]).unwrap();
        assert_eq!(widened.len(), RESERVED_SLOTS);
    }

    #[test]
    fn rank_over_limit_fails_without_mutation() {
        let existing = SlotArray::new(vec![1, 2, 3, 4]);
        let err = configure_slots(&existing, &Datatype::Fixed { size: 4 }, &[1u64; 33])
            .unwrap_err();
        assert!(matches!(err, FilterError::ChunkRankExceeded(33)));
        assert_eq!(existing.values(), &[1, 2, 3, 4]);
    }

    #[test]
    fn zero_sized_type_fails() {
        let err = configure_slots(&SlotArray::default(), &Datatype::Fixed { size: 0 }, &[4])
            .unwrap_err();
        assert!(matches!(err, FilterError::ZeroSizedType));
    }

    #[test]
    fn chunk_size_overflow_fails() {
        let err = configure_slots(
            &SlotArray::default(),
            &Datatype::Fixed { size: 8 },
            &[1 << 20, 1 << 20],
        )
        .unwrap_err();
        assert!(matches!(err, FilterError::ChunkSizeOverflow));
    }

    #[test]
    fn reconfiguration_is_idempotent() {
        let dtype = Datatype::Fixed { size: 4 };
        let once = configure_slots(&SlotArray::default(), &dtype, &[32, 8]).unwrap();
        let twice = configure_slots(&once, &dtype, &[32, 8]).unwrap();
        assert_eq!(once, twice);
    }
}
