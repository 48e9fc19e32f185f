//! Reverse of the CSD v1 capacity decode: find register codes for a
//! requested byte length.
//!
//! Capacity is encoded as
//! `BLOCKNR * BLOCK_LEN` where `BLOCKNR = (C_SIZE + 1) * 2^(C_SIZE_MULT + 2)`
//! and `BLOCK_LEN = 2^READ_BL_LEN`, with C_SIZE_MULT 3 bits wide, C_SIZE
//! 12 bits and READ_BL_LEN limited to the standard-capacity block sizes
//! of 512, 1024 and 2048 bytes.

use crate::error::Error;

/// Smallest READ_BL_LEN code a standard-capacity card may report (512B).
const MIN_BLOCK_LEN_CODE: u8 = 9;
/// Largest READ_BL_LEN code (2048B blocks).
const MAX_BLOCK_LEN_CODE: u8 = 11;
/// C_SIZE is a 12-bit field.
const MAX_DEVICE_SIZE: u64 = 1 << 12;
/// C_SIZE_MULT is a 3-bit field.
const MULTIPLIER_CODES: u8 = 1 << 3;

/// One legal point in the CSD geometry space, plus its decoded length.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CapacityParameters {
    /// C_SIZE_MULT code
    pub multiplier: u8,
    /// C_SIZE code
    pub device_size: u16,
    /// READ_BL_LEN code
    pub block_len: u8,
    /// Decoded capacity in bytes
    pub bytes: u64,
}

impl CapacityParameters {
    pub fn decode(multiplier: u8, device_size: u16, block_len: u8) -> u64 {
        (device_size as u64 + 1) << (multiplier as u32 + 2) << block_len as u32
    }
}

/// Pick the geometry whose decoded length is the smallest legal value
/// `>= requested`. Requests beyond the encodable maximum are a
/// configuration error, not a clamp.
pub fn derive_capacity(requested: u64) -> Result<CapacityParameters, Error> {
    let mut best: Option<CapacityParameters> = None;
    for block_len in MIN_BLOCK_LEN_CODE..=MAX_BLOCK_LEN_CODE {
        for multiplier in 0..MULTIPLIER_CODES {
            let unit = 1u64 << (multiplier as u32 + 2) << block_len as u32;
            let blocks = ((requested + unit - 1) / unit).max(1);
            if blocks > MAX_DEVICE_SIZE {
                continue;
            }
            let device_size = (blocks - 1) as u16;
            let bytes = CapacityParameters::decode(multiplier, device_size, block_len);
            if best.map_or(true, |found| bytes < found.bytes) {
                best = Some(CapacityParameters { multiplier, device_size, block_len, bytes });
            }
        }
    }
    best.ok_or(Error::CapacityNotEncodable { requested })
}
