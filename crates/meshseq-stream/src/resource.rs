//! Decoded geometry payloads owned by the frame store.

/// A decoded mesh with an explicit release operation.
///
/// The store calls `release` exactly once on every resource it evicts,
/// replaces, or discards unused, and drops it afterwards.
pub trait GeometryResource {
    /// Free any backing memory (GPU buffers, decoder allocations).
    fn release(&mut self);

    /// Encoded size in bytes, if known. Informational only.
    fn byte_size(&self) -> Option<u64> {
        None
    }
}

/// Release `resource` and drop it.
#[inline]
pub(crate) fn dispose<R: GeometryResource>(mut resource: R) {
    resource.release();
}
