//! Streaming cursor for one in-flight block read or write.

use crate::bits::BitStream;

/// What the cursor runs against: the backing store, or a synthetic
/// register snapshot bound in its place. The two are mutually exclusive
/// by construction.
#[derive(Debug)]
enum Target {
    /// Byte cursor into the backing store.
    Store { offset: u64, remaining: u32 },
    /// Bit cursor into a bound register; remaining bytes derive from
    /// the cursor position, there is no separate counter.
    Bound { data: BitStream, cursor: usize },
}

impl Default for Target {
    fn default() -> Self {
        Target::Store { offset: 0, remaining: 0 }
    }
}

/// Tracks position and remaining length of an in-progress transfer.
/// Owned per direction by the card; reset discards whatever was in
/// flight.
#[derive(Debug, Default)]
pub struct IoContext {
    target: Target,
}

impl IoContext {
    pub fn reset(&mut self) {
        self.target = Target::default();
    }

    /// Point the cursor into the store. Unbinds any bound register.
    pub fn set_offset(&mut self, offset: u64) {
        match &mut self.target {
            Target::Store { offset: current, .. } => *current = offset,
            Target::Bound { .. } => self.target = Target::Store { offset, remaining: 0 },
        }
    }

    /// Bind a register snapshot as the transfer source; the cursor
    /// restarts at the beginning of the data.
    pub fn bind(&mut self, data: BitStream) {
        self.target = Target::Bound { data, cursor: 0 };
    }

    /// Force the remaining-byte counter.
    ///
    /// # Panics
    ///
    /// On a bound context that still has bytes pending; the remaining
    /// length of bound data is positional, and overriding it means the
    /// dispatcher lost track of a transfer.
    pub fn set_bytes_left(&mut self, count: u32) {
        if let Target::Bound { .. } = self.target {
            assert_eq!(self.bytes_left(), 0, "byte counter forced on a bound context with data pending");
            self.target = Target::Store { offset: 0, remaining: count };
            return;
        }
        if let Target::Store { remaining, .. } = &mut self.target {
            *remaining = count;
        }
    }

    pub fn bytes_left(&self) -> u32 {
        match &self.target {
            Target::Store { remaining, .. } => *remaining,
            Target::Bound { data, cursor } => ((data.bit_len() - cursor) / 8) as u32,
        }
    }

    pub fn is_active(&self) -> bool {
        self.bytes_left() > 0
    }

    pub fn can_accept(&self, count: u32) -> bool {
        self.bytes_left() >= count
    }

    /// Move the cursor forward by `count` bytes. Clamps at the end of
    /// the transfer instead of underflowing.
    pub fn advance(&mut self, count: u32) {
        match &mut self.target {
            Target::Store { offset, remaining } => {
                *offset += count as u64;
                *remaining = remaining.saturating_sub(count);
            }
            Target::Bound { data, cursor } => {
                *cursor = (*cursor + count as usize * 8).min(data.bit_len());
            }
        }
    }

    /// Store byte offset, or the byte position within bound data.
    pub fn offset(&self) -> u64 {
        match &self.target {
            Target::Store { offset, .. } => *offset,
            Target::Bound { cursor, .. } => (cursor / 8) as u64,
        }
    }

    /// Slice `count` bytes at the cursor of a bound context; `None` for
    /// store-backed contexts.
    pub fn bound_bytes(&self, count: u32) -> Option<Vec<u8>> {
        match &self.target {
            Target::Bound { data, cursor } => Some(data.bytes_at(*cursor, count as usize)),
            Target::Store { .. } => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.target, Target::Bound { .. })
    }
}
