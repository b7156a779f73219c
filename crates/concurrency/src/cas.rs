//! Compare-and-set discipline shared by the metadata store and the queue
//! (spec: "CAS counter (`__ver`)" — a per-record monotonically increasing
//! integer used for optimistic concurrency).

use vkv_core::{Error, Result};

/// Check that `expected` matches `found`, otherwise fail with `Conflict`.
///
/// Every mutating backend method loads a record, checks its `cas` against
/// the value it read before the mutation began, and calls this on mismatch
/// rather than re-deriving the same error text at every call site.
pub fn check(expected: u64, found: u64) -> Result<()> {
    if expected != found {
        return Err(Error::conflict(format!(
            "cas mismatch: expected {expected}, found {found}"
        )));
    }
    Ok(())
}

/// The next counter value after a successful write.
pub fn advance(current: u64) -> u64 {
    current + 1
}
