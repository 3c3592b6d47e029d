//! Thread-scoped codec execution contexts.
//!
//! Every thread that runs a chunk transform gets its own [`CodecContext`],
//! created lazily on first use and released when the thread exits. Keeping
//! shuffle and decode scratch per thread means concurrent chunk transforms
//! share no codec state and need no lock on the hot path.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::CodecError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Codec execution state owned by a single thread.
pub struct CodecContext {
    id: u64,
    /// Shuffle / decode staging buffer.
    tmp: Vec<u8>,
    /// Second staging buffer for two-stage transforms (bit shuffle).
    tmp2: Vec<u8>,
}

impl CodecContext {
    fn new() -> Self {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, thread = ?std::thread::current().id(), "created codec context");
        Self {
            id,
            tmp: Vec::new(),
            tmp2: Vec::new(),
        }
    }

    /// Stable identity of this context: constant within a thread, distinct
    /// across threads.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// A scratch slice of `len` bytes, reusing capacity across calls.
    pub(crate) fn scratch(&mut self, len: usize) -> Result<&mut [u8], CodecError> {
        grow(&mut self.tmp, len)?;
        Ok(&mut self.tmp[..len])
    }

    /// Two independent scratch slices, `len` and `len2` bytes long.
    pub(crate) fn scratch_pair(
        &mut self,
        len: usize,
        len2: usize,
    ) -> Result<(&mut [u8], &mut [u8]), CodecError> {
        grow(&mut self.tmp, len)?;
        grow(&mut self.tmp2, len2)?;
        Ok((&mut self.tmp[..len], &mut self.tmp2[..len2]))
    }
}

impl Drop for CodecContext {
    fn drop(&mut self) {
        // Runs once per thread at exit. Threads that never transformed a
        // chunk have no context to release.
        debug!(id = self.id, "releasing codec context");
    }
}

fn grow(buf: &mut Vec<u8>, len: usize) -> Result<(), CodecError> {
    if buf.len() < len {
        buf.try_reserve(len - buf.len())
            .map_err(|_| CodecError::Allocation(len))?;
        buf.resize(len, 0);
    }
    Ok(())
}

thread_local! {
    // The key itself is initialized exactly once process-wide by the
    // runtime, no matter how many threads race to first use.
    static CODEC_CONTEXT: RefCell<Option<CodecContext>> = const { RefCell::new(None) };
}

/// Run `f` with the calling thread's codec context, creating it on first
/// use. Repeated calls on one thread observe the same context.
pub fn with_context<R>(f: impl FnOnce(&mut CodecContext) -> R) -> R {
    CODEC_CONTEXT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let ctx = slot.get_or_insert_with(CodecContext::new);
        f(ctx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_context_within_a_thread() {
        let first = with_context(|ctx| ctx.id());
        let second = with_context(|ctx| ctx.id());
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_contexts_across_threads() {
        let here = with_context(|ctx| ctx.id());
        let there = std::thread::spawn(|| with_context(|ctx| ctx.id()))
            .join()
            .unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn scratch_reuses_capacity() {
        with_context(|ctx| {
            let ptr = {
                let s = ctx.scratch(1024).unwrap();
                s[0] = 7;
                s.as_ptr()
            };
            let again = ctx.scratch(512).unwrap();
            assert_eq!(again.as_ptr(), ptr);
        });
    }
}
