//! Card status and SD status registers.

use super::Register;

/// 32-bit card status. Fault bits for conditions the model never
/// produces (CRC, erase, address errors) stay hard zero.
pub fn card_status() -> Register {
    Register::new(32)
        .sample(9, 4, |state| if state.is_idle { 0 } else { 4 }) // CURRENT_STATE: idle / tran
        .constant(8, 1, 1) // READY_FOR_DATA
        .sample(5, 1, |state| state.app_cmd as u64) // APP_CMD
}

/// 512-bit SD status, as streamed by ACMD13: 1-bit bus, regular-type
/// card, speed class 2.
pub fn sd_status() -> Register {
    Register::new(512)
        .constant(510, 2, 0) // DAT_BUS_WIDTH
        .constant(464, 16, 0x0000) // SD_CARD_TYPE: regular SD
        .constant(424, 8, 0x01) // SPEED_CLASS: class 2
        .constant(412, 4, 0x1) // AU_SIZE: 16KB
}
