//! Registration with the host pipeline's filter dispatch table.
//!
//! The host side of this interface is out of scope; [`FilterTable`] models
//! the dispatch table at its seam only, so the registration contract and
//! the callback signatures stay testable.

use crate::constants::*;
use crate::error::FilterError;
use crate::filter::{blosc_filter, Direction};
use crate::slots::{configure_slots, Datatype, SlotArray};

/// Callback invoked when a dataset's filter chain is finalized. Receives
/// the current slot values, the declared element type and the chunk
/// dimension extents, and returns the slot values the host must persist.
pub type SetLocalFn = fn(&SlotArray, &Datatype, &[u64]) -> Result<SlotArray, FilterError>;

/// Per-chunk transform callback. Returns the produced size, with 0
/// signalling "keep the original bytes" (forward) or hard failure
/// (reverse).
pub type FilterFn = fn(Direction, &SlotArray, &mut Vec<u8>) -> usize;

/// One entry in the host's filter dispatch table.
pub struct FilterClass {
    pub id: u32,
    pub name: &'static str,
    pub set_local: SetLocalFn,
    pub filter: FilterFn,
}

/// Minimal stand-in for the host's dispatch table, keyed by filter id.
#[derive(Default)]
pub struct FilterTable {
    classes: Vec<FilterClass>,
}

impl FilterTable {
    /// Add or replace the entry for `class.id`. Re-registering the same
    /// filter is allowed and idempotent.
    pub fn register(&mut self, class: FilterClass) -> Result<(), FilterError> {
        if class.id < 256 {
            return Err(FilterError::CantRegister(
                class.id,
                "filter ids below 256 are reserved for the pipeline",
            ));
        }
        if let Some(existing) = self.classes.iter_mut().find(|c| c.id == class.id) {
            *existing = class;
        } else {
            self.classes.push(class);
        }
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&FilterClass> {
        self.classes.iter().find(|c| c.id == id)
    }
}

/// Register the blosc filter with the host table.
///
/// Returns the version and date strings for the host to log. The
/// thread-local context machinery needs no explicit initialization beyond
/// this call; first use on each thread sets it up.
pub fn register_blosc(
    table: &mut FilterTable,
) -> Result<(&'static str, &'static str), FilterError> {
    table.register(FilterClass {
        id: FILTER_BLOSC,
        name: "blosc",
        set_local: configure_slots,
        filter: blosc_filter,
    })?;
    Ok((BLOSC_VERSION_STRING, BLOSC_VERSION_DATE))
}
