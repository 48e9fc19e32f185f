//! SPI byte framing.
//!
//! One byte in, one byte out per exchange: a command frame is the
//! `01`-tagged command byte, four big-endian argument bytes and a CRC
//! byte (accepted, never verified); the response bytes then drain one
//! exchange at a time.

use std::collections::VecDeque;

use log::{error, warn};

use crate::store::BackingStore;

use super::SdCard;

/// Idle filler on the SPI bus.
const FILLER: u8 = 0xFF;

/// CRC7 over a command frame, shifted left with the end bit set, as
/// appended by SPI hosts. The card ignores inbound CRCs but hosts and
/// tests need well-formed frames.
pub fn crc7(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data.iter() {
        for bit in 0..8 {
            crc <<= 1;
            if ((byte << bit) & 0x80) ^ (crc & 0x80) != 0 {
                crc ^= 0x09;
            }
        }
    }
    (crc << 1) | 1
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum FrameState {
    /// Between frames; filler bytes answer with a ready R1.
    WaitCommand,
    /// Accumulating the four argument bytes.
    WaitArgument,
    /// One byte left to swallow before dispatching.
    WaitCrc,
    /// Draining the queued response.
    Respond,
}

/// Per-card SPI framing state. Reset drops everything and returns to
/// awaiting a command byte.
#[derive(Debug)]
pub(crate) struct SpiFrame {
    pub(crate) state: FrameState,
    command: u8,
    argument: u32,
    argument_bytes: u8,
    response: VecDeque<u8>,
}

impl Default for SpiFrame {
    fn default() -> Self {
        Self {
            state: FrameState::WaitCommand,
            command: 0,
            argument: 0,
            argument_bytes: 0,
            response: VecDeque::new(),
        }
    }
}

impl SpiFrame {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

impl<S: BackingStore> SdCard<S> {
    /// Exchange one byte over SPI. Calling this on a card wired for the
    /// native bus is a host defect: nothing changes and zero comes back.
    pub fn transmit(&mut self, byte: u8) -> u8 {
        if !self.spi_mode {
            error!("SPI byte {:#04x} received while the SPI interface is disabled", byte);
            return 0;
        }
        match self.frame.state {
            FrameState::WaitCommand => {
                if byte == FILLER {
                    // Keep the bus fed while idle
                    return self.r1_byte(false);
                }
                if byte >> 6 != 0b01 {
                    warn!("malformed SPI command byte {:#04x}", byte);
                    return self.r1_byte(true);
                }
                self.frame.command = byte & 0x3F;
                self.frame.argument = 0;
                self.frame.argument_bytes = 0;
                self.frame.state = FrameState::WaitArgument;
                0
            }
            FrameState::WaitArgument => {
                self.frame.argument = self.frame.argument << 8 | byte as u32;
                self.frame.argument_bytes += 1;
                if self.frame.argument_bytes == 4 {
                    self.frame.state = FrameState::WaitCrc;
                }
                0
            }
            FrameState::WaitCrc => {
                // The CRC byte itself is discarded unchecked
                let (command, argument) = (self.frame.command, self.frame.argument);
                let response = self.dispatch(command, argument, true);
                if response.is_empty() {
                    warn!("CMD{} produced no SPI response bytes", command);
                    self.frame.state = FrameState::WaitCommand;
                    return 0;
                }
                self.frame.response.clear();
                self.frame.response.extend(response.bytes().iter().copied());
                self.frame.state = FrameState::Respond;
                self.frame.response.pop_front().unwrap_or(0)
            }
            FrameState::Respond => match self.frame.response.pop_front() {
                Some(byte) => byte,
                // The exhausting exchange carries no payload; the next
                // byte starts a fresh frame.
                None => {
                    self.frame.state = FrameState::WaitCommand;
                    0
                }
            },
        }
    }

    /// Chip deselect: abandon whatever frame was in flight.
    pub fn finish_transmission(&mut self) {
        self.frame.reset();
    }
}
