//! Bit-field register composer.
//!
//! SD registers are fixed-width bit-packed words read out most
//! significant byte first. Each register is declared once as a list of
//! named fragments at SD-specification bit offsets (counted from the
//! least significant bit) and serialized on demand, so fields that
//! mirror live card state are sampled at read time.

pub mod cid;
pub mod csd;
pub mod ocr;
pub mod scr;
pub mod status;

use bit_field::BitField;

use crate::bits::BitStream;
use crate::card::RuntimeState;

/// Where a fragment's value comes from: fixed at composition time, or
/// sampled from the runtime state on every read.
pub enum Source {
    Const(u64),
    Sample(fn(&RuntimeState) -> u64),
}

struct Fragment {
    offset: usize,
    width: usize,
    source: Source,
}

/// A fixed-width register assembled from fragments. Unnamed bits read
/// as zero; overlapping fragments OR together.
pub struct Register {
    width: usize,
    fragments: Vec<Fragment>,
}

impl Register {
    /// `width` is the total register width in bits, byte aligned.
    pub fn new(width: usize) -> Self {
        assert_eq!(width % 8, 0);
        Self { width, fragments: Vec::new() }
    }

    pub fn constant(mut self, offset: usize, width: usize, value: u64) -> Self {
        self.push(offset, width, Source::Const(value));
        self
    }

    pub fn sample(mut self, offset: usize, width: usize, get: fn(&RuntimeState) -> u64) -> Self {
        self.push(offset, width, Source::Sample(get));
        self
    }

    fn push(&mut self, offset: usize, width: usize, source: Source) {
        assert!(width >= 1 && width <= 64);
        assert!(offset + width <= self.width, "fragment exceeds register width");
        self.fragments.push(Fragment { offset, width, source });
    }

    /// Serialize the register, most significant byte first. Free of
    /// side effects beyond whatever the sampled sources read.
    pub fn read(&self, state: &RuntimeState) -> BitStream {
        let mut raw = vec![0u8; self.width / 8];
        for fragment in &self.fragments {
            let value = match fragment.source {
                Source::Const(value) => value,
                Source::Sample(get) => get(state),
            };
            for bit in 0..fragment.width {
                if value.get_bit(bit) {
                    let position = fragment.offset + bit;
                    let index = raw.len() - 1 - position / 8;
                    raw[index].set_bit(position % 8, true);
                }
            }
        }
        BitStream::from_bytes(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RuntimeState {
        RuntimeState::new(0x0001)
    }

    #[test]
    fn fragments_land_at_their_bit_offsets() {
        let register = Register::new(16).constant(0, 1, 1).constant(12, 4, 0b1010);
        assert_eq!(register.read(&state()).bytes(), &[0xA0, 0x01]);
    }

    #[test]
    fn values_are_masked_to_their_width() {
        let register = Register::new(8).constant(0, 4, 0xFF);
        assert_eq!(register.read(&state()).bytes(), &[0x0F]);
    }

    #[test]
    fn sampled_fragments_follow_state() {
        let register = Register::new(8).sample(0, 1, |state| state.app_cmd as u64);
        let mut state = state();
        assert_eq!(register.read(&state).to_u8(), 0x00);
        state.app_cmd = true;
        assert_eq!(register.read(&state).to_u8(), 0x01);
    }

    #[test]
    fn reads_are_idempotent() {
        let register = Register::new(32).constant(5, 9, 0x155).sample(20, 2, |_| 0b11);
        let state = state();
        assert_eq!(register.read(&state), register.read(&state));
    }

    #[test]
    #[should_panic(expected = "fragment exceeds register width")]
    fn oversized_fragments_are_rejected() {
        let _ = Register::new(8).constant(4, 8, 0);
    }
}
