//! Implementation-chosen constants the spec leaves to the implementer.

use std::time::Duration;

/// `put-many` / `load-entries` refuses batches larger than this (spec §4.2:
/// "typically 1000").
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default queue lease duration (spec §4.3: "default ~60s").
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// A lease short enough to exercise expiry in tests (spec §4.3: "testable
/// value ~1s").
pub const TESTABLE_LEASE: Duration = Duration::from_secs(1);

/// TTL of the `get-dataset` cache in front of the active-version lookup
/// path (spec Design Notes: "a tiny TTL cache (≈10s)").
pub const ACTIVE_VERSION_CACHE_TTL: Duration = Duration::from_secs(10);

/// How many of the earliest-timestamp candidates `reserve-next` considers
/// before giving up (spec §4.3: "suggested N=10").
pub const RESERVE_CANDIDATE_WINDOW: usize = 10;
