//! Card Identification register.

use super::Register;

/// 128-bit CID with a fixed fake manufacturer identity; only the serial
/// number varies per card. Low byte is the CRC7 stub.
pub fn build(serial: u32) -> Register {
    Register::new(128)
        .constant(120, 8, 0x03) // MID
        .constant(104, 16, 0x5344) // OID: "SD"
        .constant(64, 40, 0x5344_5349_4D) // PNM: "SDSIM"
        .constant(56, 8, 0x10) // PRV: revision 1.0
        .constant(24, 32, serial as u64) // PSN
        .constant(8, 12, 0x14A) // MDT: October 2020
        .constant(0, 1, 1) // end bit
}
