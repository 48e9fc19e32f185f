//! SD Configuration Register.

use super::Register;

/// 64-bit SCR: physical layer 1.10, 1-bit and 4-bit bus widths, no
/// erase fill, no extended security.
pub fn build() -> Register {
    Register::new(64)
        .constant(60, 4, 0) // SCR_STRUCTURE
        .constant(56, 4, 1) // SD_SPEC: 1.10
        .constant(48, 4, 0b0101) // SD_BUS_WIDTHS: 1 and 4 bit
}
