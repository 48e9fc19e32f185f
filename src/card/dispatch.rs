use core::mem;

use bit_field::BitField;
use log::{debug, warn};

use crate::bits::{BitStream, BitStreamBuilder};
use crate::commands::{AppCommand, Command};
use crate::store::BackingStore;

use super::SdCard;

/// Token preceding block data in an SPI read response.
pub(crate) const DATA_START_TOKEN: u8 = 0xFE;

impl<S: BackingStore> SdCard<S> {
    /// Native bus entry point: one command in, one response stream out.
    /// Unsupported traffic degrades to a logged empty response.
    pub fn handle_command(&mut self, index: u32, argument: u32) -> BitStream {
        self.dispatch((index & 0x3F) as u8, argument, false)
    }

    pub(crate) fn dispatch(&mut self, index: u8, argument: u32, spi: bool) -> BitStream {
        // CMD55 arms the flag for exactly one following command,
        // recognized or not.
        let app_pending = mem::take(&mut self.state.app_cmd);
        if app_pending {
            if let Some(command) = AppCommand::from_index(index) {
                return self.dispatch_app(command, argument, spi);
            }
            debug!("CMD{} is not application specific, trying the standard set", index);
        }
        match Command::from_index(index) {
            Some(command) => self.dispatch_standard(command, argument, spi),
            None => {
                warn!("unrecognized CMD{} (arg {:#010x})", index, argument);
                if spi { self.respond_r1(true) } else { BitStream::empty() }
            }
        }
    }

    fn dispatch_standard(&mut self, command: Command, argument: u32, spi: bool) -> BitStream {
        match command {
            Command::GoIdleState => {
                self.reset();
                if spi { self.respond_r1(false) } else { BitStream::empty() }
            }
            Command::AllSendCid => {
                if spi {
                    return self.unsupported_in_spi("CMD2");
                }
                Self::register_on_wire(self.cid())
            }
            Command::SendRelativeAddr => {
                if spi {
                    return self.unsupported_in_spi("CMD3");
                }
                // R6: published RCA over the interesting status bits
                let status = self.card_status().to_u32();
                let packed = (status >> 8 & 0xC000) | (status >> 6 & 0x2000) | (status & 0x1FFF);
                let mut response = BitStreamBuilder::new();
                response.push_bits((self.state.rca as u32) << 16 | packed, 32);
                response.finish()
            }
            Command::SelectCard => {
                if spi {
                    return self.unsupported_in_spi("CMD7");
                }
                self.card_status()
            }
            Command::SendIfCond => {
                if spi { self.respond_r7() } else { self.card_status() }
            }
            Command::SendCsd => {
                if spi { self.respond_r1(false) } else { Self::register_on_wire(self.csd()) }
            }
            Command::StopTransmission => {
                self.read_context.reset();
                self.write_context.reset();
                if spi { self.respond_r1(false) } else { self.card_status() }
            }
            Command::SendStatus => {
                if spi { self.respond_r2() } else { self.card_status() }
            }
            Command::SetBlocklen => {
                debug!("block length set to {} bytes", argument);
                self.state.block_len = argument;
                if spi { self.respond_r1(false) } else { self.card_status() }
            }
            Command::ReadSingleBlock => {
                let block_len = self.state.block_len;
                self.read_context.set_offset(argument as u64 * block_len as u64);
                self.read_context.set_bytes_left(block_len);
                if spi {
                    // SPI carries the data in the response itself
                    let data = self.read_data(block_len);
                    let mut response = BitStreamBuilder::new();
                    response.push_byte(self.r1_byte(false));
                    response.push_byte(DATA_START_TOKEN);
                    response.push_bytes(&data);
                    response.finish()
                } else {
                    // Native streaming is pulled later through read_data
                    self.card_status()
                }
            }
            Command::ReadMultipleBlock => {
                if spi {
                    return self.unsupported_in_spi("CMD18");
                }
                // Only the cursor moves here; the controller bounds the
                // pull with set_read_limit.
                let block_len = self.state.block_len;
                self.read_context.set_offset(argument as u64 * block_len as u64);
                self.card_status()
            }
            Command::WriteBlock => {
                if spi {
                    return self.unsupported_in_spi("CMD24");
                }
                let block_len = self.state.block_len;
                self.write_context.set_offset(argument as u64 * block_len as u64);
                self.write_context.set_bytes_left(block_len);
                self.card_status()
            }
            Command::AppCmd => {
                self.state.app_cmd = true;
                if spi { self.respond_r1(false) } else { self.card_status() }
            }
            Command::ReadOcr => {
                if spi { self.respond_r3() } else { BitStream::empty() }
            }
        }
    }

    fn dispatch_app(&mut self, command: AppCommand, _argument: u32, spi: bool) -> BitStream {
        match command {
            AppCommand::SdStatus => {
                let snapshot = self.sd_status();
                self.read_context.bind(snapshot);
                if spi { self.respond_r2() } else { self.card_status() }
            }
            AppCommand::SdSendOpCond => {
                // Querying the operating conditions is what ends the
                // power-up idle phase.
                self.state.is_idle = false;
                if spi { self.respond_r1(false) } else { self.ocr() }
            }
            AppCommand::SendScr => {
                let snapshot = self.scr();
                self.read_context.bind(snapshot);
                if spi { self.respond_r1(false) } else { self.card_status() }
            }
        }
    }

    fn unsupported_in_spi(&self, name: &str) -> BitStream {
        warn!("{} has no SPI implementation", name);
        BitStream::empty()
    }

    /// R1 flag byte. Fault bits for erase, CRC, address and parameter
    /// errors are never modeled and stay zero.
    pub(crate) fn r1_byte(&self, illegal_command: bool) -> u8 {
        let mut byte = 0u8;
        byte.set_bit(0, self.state.is_idle);
        byte.set_bit(2, illegal_command);
        byte
    }

    pub(crate) fn respond_r1(&self, illegal_command: bool) -> BitStream {
        BitStream::from_bytes(&[self.r1_byte(illegal_command)])
    }

    fn respond_r2(&self) -> BitStream {
        BitStream::from_bytes(&[self.r1_byte(false), 0x00])
    }

    /// R3: the OCR payload is not modeled on the SPI side.
    fn respond_r3(&self) -> BitStream {
        BitStream::from_bytes(&[self.r1_byte(false), 0, 0, 0, 0])
    }

    /// R7: the echo-back payload is not modeled.
    fn respond_r7(&self) -> BitStream {
        BitStream::from_bytes(&[self.r1_byte(false), 0, 0, 0, 0])
    }

    /// CSD and CID go out without their trailing CRC byte; controllers
    /// latch 120 bits.
    fn register_on_wire(register: BitStream) -> BitStream {
        let bytes = register.bytes();
        BitStream::from_bytes(&bytes[..bytes.len() - 1])
    }
}
