//! Operating Conditions Register.

use super::Register;

/// 32-bit OCR: full 2.7-3.6V window, standard capacity. The power-up
/// bit tracks the idle flag, so it reads set once ACMD41 has ended the
/// idle phase.
pub fn build() -> Register {
    Register::new(32)
        .constant(15, 9, 0x1FF) // VDD window 2.7-3.6V
        .sample(31, 1, |state| !state.is_idle as u64) // power-up complete
}
