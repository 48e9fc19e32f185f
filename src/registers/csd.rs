//! Card-Specific Data, CSD structure version 1.0 (standard capacity).

use crate::capacity::CapacityParameters;

use super::Register;

/// Compose the 128-bit CSD for the given geometry. The low byte holds
/// the CRC7 stub and end bit, which never reach the bus.
pub fn build(capacity: &CapacityParameters) -> Register {
    Register::new(128)
        .constant(126, 2, 0) // CSD_STRUCTURE: version 1.0
        .constant(112, 8, 0x0E) // TAAC: 1ms read access time
        .constant(104, 8, 0x00) // NSAC
        .constant(96, 8, 0x32) // TRAN_SPEED: 25MHz
        .constant(84, 12, 0x5B5) // CCC: classes 0, 2, 4, 5, 7, 8, 10
        .constant(80, 4, capacity.block_len as u64) // READ_BL_LEN
        .constant(79, 1, 1) // READ_BL_PARTIAL
        .constant(62, 12, capacity.device_size as u64) // C_SIZE
        .constant(47, 3, capacity.multiplier as u64) // C_SIZE_MULT
        .constant(46, 1, 1) // ERASE_BLK_EN
        .constant(39, 7, 0x7F) // SECTOR_SIZE
        .constant(26, 3, 0b100) // R2W_FACTOR: 16x
        .constant(22, 4, capacity.block_len as u64) // WRITE_BL_LEN
        .constant(0, 1, 1) // end bit
}
