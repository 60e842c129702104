//! Notification identifier allocation.
//!
//! The allocator owns the band `[1000, 1_000_000)` and hands out
//! monotonically advancing identifiers, skipping ranges reserved by other
//! notification producers and ids of currently live scheduled nudges. Both
//! the cursor and the reserved ranges persist, so restarts and background
//! contexts never re-issue recent ids.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result, ValidationError};
use crate::storage::StateStore;

/// First id the allocator may hand out.
pub const ID_BAND_START: u32 = 1_000;
/// One past the last id the allocator may hand out.
pub const ID_BAND_END: u32 = 1_000_000;

/// Whether an id falls inside the allocator's band.
pub fn in_band(id: u32) -> bool {
    (ID_BAND_START..ID_BAND_END).contains(&id)
}

/// An identifier band claimed by another producer. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedIdRange {
    pub start: u32,
    pub end: u32,
    pub owner: String,
}

impl ReservedIdRange {
    pub fn contains(&self, id: u32) -> bool {
        self.start <= id && id <= self.end
    }
}

/// Allocates unique notification identifiers.
///
/// The range list stays small (a handful of producers), so the per-call
/// containment check is a linear scan.
pub struct IdAllocator {
    cursor: u32,
    ranges: Vec<ReservedIdRange>,
}

impl IdAllocator {
    /// Load the persisted cursor and reserved ranges.
    pub fn load(store: &StateStore) -> Result<Self, crate::error::StoreError> {
        let cursor = store.allocator_cursor()?.unwrap_or(ID_BAND_START);
        let ranges = store.reserved_ranges()?;
        Ok(Self { cursor, ranges })
    }

    pub fn ranges(&self) -> &[ReservedIdRange] {
        &self.ranges
    }

    pub fn is_reserved(&self, id: u32) -> bool {
        self.ranges.iter().any(|r| r.contains(id))
    }

    /// Register a band claimed by another producer. Idempotent: an already
    /// known (start, end) pair is not duplicated. Returns whether the range
    /// was newly added.
    pub fn register_reserved_range(
        &mut self,
        store: &StateStore,
        start: u32,
        end: u32,
        owner: &str,
    ) -> Result<bool> {
        if start > end {
            return Err(ValidationError::InvalidRange { start, end }.into());
        }
        if self.ranges.iter().any(|r| r.start == start && r.end == end) {
            return Ok(false);
        }
        self.ranges.push(ReservedIdRange {
            start,
            end,
            owner: owner.to_string(),
        });
        store.save_reserved_ranges(&self.ranges)?;
        debug!(start, end, owner, "registered reserved id range");
        Ok(true)
    }

    /// Allocate the next identifier, skipping reserved ranges and `live`
    /// ids. The cursor wraps at the band end; a full sweep without a free
    /// id reports exhaustion.
    pub fn allocate(&mut self, store: &StateStore, live: &[u32]) -> Result<u32> {
        let span = ID_BAND_END - ID_BAND_START;
        let mut candidate = self.cursor;
        for _ in 0..span {
            if candidate >= ID_BAND_END {
                candidate = ID_BAND_START;
            }
            if !self.is_reserved(candidate) && !live.contains(&candidate) {
                self.cursor = candidate + 1;
                store.save_allocator_cursor(self.cursor)?;
                return Ok(candidate);
            }
            candidate += 1;
        }
        Err(CoreError::Validation(ValidationError::IdSpaceExhausted))
    }
}
