mod data;
mod dispatch;
mod spi;

pub use spi::crc7;

use log::debug;

use crate::bits::BitStream;
use crate::capacity::{derive_capacity, CapacityParameters};
use crate::error::Error;
use crate::io::IoContext;
use crate::registers::{cid, csd, ocr, scr, status};
use crate::registers::Register;
use crate::store::BackingStore;
use crate::SD_BLOCK_SIZE;

use spi::SpiFrame;

/// Fixed relative card address published by CMD3. Multi-card
/// addressing is out of scope, so one value serves every instance.
const CARD_ADDRESS: u16 = 0x4567;

/// Protocol flags scoped to one card instance, mutated only by the
/// command dispatcher and sampled by the register file.
#[derive(Debug)]
pub struct RuntimeState {
    /// Power-up state; cleared by the first ACMD41, restored by reset.
    pub is_idle: bool,
    /// One-shot flag armed by CMD55, consumed by the next command.
    pub app_cmd: bool,
    /// Relative card address.
    pub rca: u16,
    /// Negotiated block length in bytes.
    pub block_len: u32,
}

impl RuntimeState {
    pub fn new(rca: u16) -> Self {
        Self { is_idle: true, app_cmd: false, rca, block_len: SD_BLOCK_SIZE }
    }

    fn reset(&mut self) {
        self.is_idle = true;
        self.app_cmd = false;
        self.block_len = SD_BLOCK_SIZE;
    }
}

/// Registers composed once at construction, serialized on demand.
struct RegisterFile {
    csd: Register,
    cid: Register,
    ocr: Register,
    scr: Register,
    status: Register,
    sd_status: Register,
}

/// One emulated SD card over a backing store.
///
/// Native-bus hosts call [`SdCard::handle_command`] and move block data
/// with [`SdCard::read_data`] / [`SdCard::write_data`]; SPI hosts
/// exchange bytes through [`SdCard::transmit`].
pub struct SdCard<S> {
    store: S,
    capacity: CapacityParameters,
    state: RuntimeState,
    read_context: IoContext,
    write_context: IoContext,
    frame: SpiFrame,
    spi_mode: bool,
    registers: RegisterFile,
}

impl<S: BackingStore> SdCard<S> {
    /// Build a card of (at least) `requested_bytes`, resizing the store
    /// to the nearest capacity the CSD geometry can encode. Requests
    /// beyond the encodable range fail here rather than clamp.
    pub fn new(mut store: S, requested_bytes: u64, spi_mode: bool) -> Result<Self, Error> {
        let capacity = derive_capacity(requested_bytes)?;
        store.set_len(capacity.bytes)?;
        debug!(
            "sd card: requested {} bytes, allocated {} ({} mode)",
            requested_bytes,
            capacity.bytes,
            if spi_mode { "spi" } else { "native" }
        );
        let registers = RegisterFile {
            csd: csd::build(&capacity),
            cid: cid::build(0x0000_1234),
            ocr: ocr::build(),
            scr: scr::build(),
            status: status::card_status(),
            sd_status: status::sd_status(),
        };
        Ok(Self {
            store,
            capacity,
            state: RuntimeState::new(CARD_ADDRESS),
            read_context: IoContext::default(),
            write_context: IoContext::default(),
            frame: SpiFrame::default(),
            spi_mode,
            registers,
        })
    }

    /// Back to power-up state: idle, no pending transfers, SPI framing
    /// awaiting a command, default block length.
    pub fn reset(&mut self) {
        self.state.reset();
        self.read_context.reset();
        self.write_context.reset();
        self.frame.reset();
    }

    /// Usable capacity in bytes; may exceed what was requested.
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity.bytes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn card_status(&self) -> BitStream {
        self.registers.status.read(&self.state)
    }

    pub fn ocr(&self) -> BitStream {
        self.registers.ocr.read(&self.state)
    }

    pub fn csd(&self) -> BitStream {
        self.registers.csd.read(&self.state)
    }

    pub fn cid(&self) -> BitStream {
        self.registers.cid.read(&self.state)
    }

    pub fn scr(&self) -> BitStream {
        self.registers.scr.read(&self.state)
    }

    pub fn sd_status(&self) -> BitStream {
        self.registers.sd_status.read(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::store::MemoryStore;

    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|index| (index % 251) as u8).collect()
    }

    fn native_card() -> SdCard<MemoryStore> {
        let store = MemoryStore::from_vec(image(16 * MIB as usize));
        SdCard::new(store, 16 * MIB, false).unwrap()
    }

    fn spi_card() -> SdCard<MemoryStore> {
        let store = MemoryStore::from_vec(image(16 * MIB as usize));
        SdCard::new(store, 16 * MIB, true).unwrap()
    }

    /// Feed a whole SPI command frame, returning the byte answered on
    /// the CRC exchange (the first response byte).
    fn spi_command(card: &mut SdCard<MemoryStore>, index: u8, argument: u32) -> u8 {
        let mut frame = vec![0x40 | index];
        frame.extend_from_slice(&argument.to_be_bytes());
        let crc = crc7(&frame);
        for &byte in &frame {
            assert_eq!(card.transmit(byte), 0);
        }
        card.transmit(crc)
    }

    #[test]
    fn single_block_read_streams_the_store() {
        let mut card = native_card();
        card.handle_command(16, 512);
        card.handle_command(17, 0);
        let data = card.read_data(512);
        assert_eq!(data, card.store().contents()[..512].to_vec());
        // the transfer is spent; one more byte is an over-read
        assert_eq!(card.read_data(1), Vec::<u8>::new());
    }

    #[test]
    fn block_length_scales_the_read_offset() {
        let mut card = native_card();
        card.handle_command(16, 16);
        card.handle_command(17, 2);
        let data = card.read_data(16);
        assert_eq!(data, card.store().contents()[32..48].to_vec());
    }

    #[test]
    fn spi_go_idle_answers_with_the_idle_bit() {
        let mut card = spi_card();
        assert_eq!(spi_command(&mut card, 0, 0), 0x01);
    }

    #[test]
    fn acmd41_ends_the_idle_phase() {
        let mut card = native_card();
        assert_eq!(card.ocr().to_u32() >> 31, 0);
        card.handle_command(55, 0);
        let response = card.handle_command(41, 0);
        // the native ACMD41 response is the OCR itself
        assert_eq!(response.to_u32() >> 31, 1);
        assert!(!card.state.is_idle);
        assert_eq!(card.ocr().to_u32() >> 31, 1);
    }

    #[test]
    fn unencodable_capacity_fails_construction() {
        let oversized = 8 * 1024 * MIB;
        match SdCard::new(MemoryStore::new(), oversized, false) {
            Err(Error::CapacityNotEncodable { requested }) => assert_eq!(requested, oversized),
            _ => panic!("construction must fail, not clamp"),
        }
    }

    #[test]
    fn store_is_sized_to_the_derived_capacity() {
        let card = SdCard::new(MemoryStore::new(), 10 * MIB + 3, false).unwrap();
        assert_eq!(card.store().len(), card.capacity_bytes());
        assert!(card.capacity_bytes() >= 10 * MIB + 3);
    }

    #[test]
    fn app_command_flag_is_single_shot() {
        let mut card = native_card();
        card.handle_command(55, 0);
        // an unknown command still consumes the flag
        assert!(card.handle_command(1, 0).is_empty());
        // 41 alone is not a standard command; idle must survive
        assert!(card.handle_command(41, 0).is_empty());
        assert!(card.state.is_idle);
    }

    #[test]
    fn reset_restores_power_up_state() {
        let mut card = native_card();
        card.handle_command(55, 0);
        card.handle_command(41, 0);
        card.handle_command(16, 16);
        card.handle_command(17, 0);
        assert!(card.read_context.is_active());

        card.handle_command(0, 0);
        assert!(card.state.is_idle);
        assert!(!card.state.app_cmd);
        assert_eq!(card.state.block_len, SD_BLOCK_SIZE);
        assert!(!card.read_context.is_active());
        assert!(!card.write_context.is_active());
        assert_eq!(card.read_data(1), Vec::<u8>::new());
    }

    #[test]
    fn spi_filler_keeps_the_bus_fed() {
        let mut card = spi_card();
        for _ in 0..4 {
            assert_eq!(card.transmit(0xFF), 0x01);
        }
    }

    #[test]
    fn spi_rejects_unframed_command_bytes() {
        let mut card = spi_card();
        // framing bits must be 01
        assert_eq!(card.transmit(0x00), 0x05);
        assert_eq!(card.transmit(0xC1), 0x05);
        // still between frames
        assert_eq!(card.transmit(0xFF), 0x01);
    }

    #[test]
    fn spi_send_status_drains_as_r2() {
        let mut card = spi_card();
        assert_eq!(spi_command(&mut card, 13, 0), 0x01);
        assert_eq!(card.transmit(0xFF), 0x00); // second R2 byte
        assert_eq!(card.transmit(0xFF), 0x00); // exhausting exchange, no payload
        assert_eq!(card.transmit(0xFF), 0x01); // back between frames
    }

    #[test]
    fn spi_single_block_read_carries_the_data() {
        let mut card = spi_card();
        assert_eq!(spi_command(&mut card, 16, 512), 0x01);
        while card.transmit(0xFF) != 0x01 {} // drain + refeed until idle filler
        assert_eq!(spi_command(&mut card, 17, 0), 0x01);
        assert_eq!(card.transmit(0xFF), dispatch::DATA_START_TOKEN);
        let data: Vec<u8> = (0..512).map(|_| card.transmit(0xFF)).collect();
        assert_eq!(data, card.store().contents()[..512].to_vec());
    }

    #[test]
    fn spi_write_block_is_unsupported_and_drops_the_frame() {
        let mut card = spi_card();
        // zero-length dispatcher response: transitional zero byte, then
        // straight back to awaiting a command
        assert_eq!(spi_command(&mut card, 24, 0), 0x00);
        assert_eq!(card.transmit(0xFF), 0x01);
    }

    #[test]
    fn finish_transmission_abandons_a_partial_frame() {
        let mut card = spi_card();
        card.transmit(0x40 | 13);
        card.transmit(0x00);
        card.finish_transmission();
        assert_eq!(card.transmit(0xFF), 0x01);
    }

    #[test]
    fn transmit_without_spi_wiring_is_inert() {
        let mut card = native_card();
        assert_eq!(card.transmit(0x40), 0);
        assert_eq!(card.transmit(0xFF), 0);
    }

    #[test]
    fn multi_block_read_is_bounded_by_the_controller() {
        let mut card = native_card();
        card.handle_command(16, 512);
        card.handle_command(18, 2);
        card.set_read_limit(1024);
        let data = card.read_data(1024);
        assert_eq!(data, card.store().contents()[1024..2048].to_vec());
    }

    #[test]
    fn single_block_write_round_trips() {
        let mut card = native_card();
        card.handle_command(16, 512);
        card.handle_command(24, 3);
        let block = vec![0xA5u8; 512];
        card.write_data(&block);
        assert_eq!(&card.store().contents()[1536..2048], &block[..]);

        card.handle_command(17, 3);
        assert_eq!(card.read_data(512), block);
    }

    #[test]
    fn oversized_writes_are_rejected_whole() {
        let mut card = native_card();
        card.handle_command(16, 512);
        card.handle_command(24, 0);
        let before = card.store().contents()[..4].to_vec();
        card.write_data(&vec![0xFFu8; 513]);
        assert_eq!(card.store().contents()[..4].to_vec(), before);
    }

    #[test]
    fn sd_status_streams_from_the_bound_register() {
        let mut card = native_card();
        card.handle_command(55, 0);
        card.handle_command(13, 0);
        let expected = card.sd_status().bytes().to_vec();
        assert_eq!(card.read_data(64), expected);
        assert_eq!(card.read_data(1), Vec::<u8>::new());
    }

    #[test]
    fn scr_streams_from_the_bound_register() {
        let mut card = native_card();
        card.handle_command(55, 0);
        card.handle_command(51, 0);
        let expected = card.scr().bytes().to_vec();
        assert_eq!(card.read_data(8), expected);
    }

    #[test]
    fn stop_transmission_discards_both_transfers() {
        let mut card = native_card();
        card.handle_command(16, 512);
        card.handle_command(17, 0);
        card.handle_command(24, 1);
        card.handle_command(12, 0);
        assert_eq!(card.read_data(512), Vec::<u8>::new());
        let before = card.store().contents()[512..516].to_vec();
        card.write_data(&[1, 2, 3, 4]);
        assert_eq!(card.store().contents()[512..516].to_vec(), before);
    }

    #[test]
    fn identification_registers_drop_the_crc_byte() {
        let mut card = native_card();
        let cid = card.handle_command(2, 0);
        assert_eq!(cid.bit_len(), 120);
        assert_eq!(cid.bytes(), &card.cid().bytes()[..15]);
        let csd = card.handle_command(9, 0);
        assert_eq!(csd.bit_len(), 120);
        assert_eq!(csd.bytes(), &card.csd().bytes()[..15]);
    }

    #[test]
    fn relative_address_publishes_the_card_address() {
        let mut card = native_card();
        let response = card.handle_command(3, 0);
        assert_eq!(response.bit_len(), 32);
        assert_eq!(response.to_u32() >> 16, CARD_ADDRESS as u32);
    }

    #[test]
    fn register_reads_are_idempotent() {
        let card = native_card();
        assert_eq!(card.card_status(), card.card_status());
        assert_eq!(card.csd(), card.csd());
        assert_eq!(card.cid(), card.cid());
        assert_eq!(card.ocr(), card.ocr());
        assert_eq!(card.scr(), card.scr());
        assert_eq!(card.sd_status(), card.sd_status());
    }

    #[test]
    fn unrecognized_native_commands_answer_empty() {
        let mut card = native_card();
        assert!(card.handle_command(37, 0).is_empty());
        assert!(card.handle_command(63, 0xDEAD_BEEF).is_empty());
    }

    #[test]
    fn unrecognized_spi_commands_answer_illegal_r1() {
        let mut card = spi_card();
        assert_eq!(spi_command(&mut card, 37, 0), 0x05);
        // queue drained on the next exchange, frame closes
        assert_eq!(card.transmit(0xFF), 0x00);
        assert_eq!(card.transmit(0xFF), 0x01);
    }
}
