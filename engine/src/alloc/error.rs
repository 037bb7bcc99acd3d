use thiserror::Error;

/// Fatal allocator failures. `OutOfMemory` is the only condition callers are
/// expected to recover from (by propagating it); double-free and
/// unrecognized-pointer conditions are checked with `debug_assert!` at the
/// call site instead of being represented here, matching the contract that
/// they are a fatal assertion in safety-checked builds and undefined
/// behavior in release builds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// No free block large enough to satisfy the request exists in the pool.
    #[error("allocator out of memory: requested {requested} bytes, pool has {available} bytes free")]
    OutOfMemory { requested: usize, available: usize },
}
