use bit_field::BitField;

/// Finite bit sequence in on-wire order: earlier bits are transmitted
/// first, most significant bit first within each byte.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitStream {
    data: Vec<u8>,
    bit_len: usize,
}

impl BitStream {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: bytes.to_vec(), bit_len: bytes.len() * 8 }
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Whole-byte view of the stream. Streams consumed as bytes are
    /// always byte aligned.
    pub fn bytes(&self) -> &[u8] {
        debug_assert_eq!(self.bit_len % 8, 0);
        &self.data
    }

    /// First byte of the stream, or zero when empty.
    pub fn to_u8(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }

    /// First 32 bits as a big-endian word. Shorter streams read as if
    /// zero padded.
    pub fn to_u32(&self) -> u32 {
        let mut word = [0u8; 4];
        let take = self.data.len().min(4);
        word[..take].copy_from_slice(&self.data[..take]);
        u32::from_be_bytes(word)
    }

    /// Copy up to `len` bytes starting at a byte-aligned bit position,
    /// clipped to the end of the stream.
    pub fn bytes_at(&self, bit_offset: usize, len: usize) -> Vec<u8> {
        debug_assert_eq!(bit_offset % 8, 0);
        let start = (bit_offset / 8).min(self.data.len());
        let end = (start + len).min(self.data.len());
        self.data[start..end].to_vec()
    }
}

/// Append-only builder for [`BitStream`].
#[derive(Debug, Default)]
pub struct BitStreamBuilder {
    data: Vec<u8>,
    bit_len: usize,
}

impl BitStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bit(&mut self, bit: bool) -> &mut Self {
        let index = self.bit_len / 8;
        if index == self.data.len() {
            self.data.push(0);
        }
        self.data[index].set_bit(7 - self.bit_len % 8, bit);
        self.bit_len += 1;
        self
    }

    /// Append the low `width` bits of `value`, most significant first.
    pub fn push_bits(&mut self, value: u32, width: usize) -> &mut Self {
        for bit in (0..width).rev() {
            self.push_bit(value.get_bit(bit));
        }
        self
    }

    pub fn push_byte(&mut self, byte: u8) -> &mut Self {
        self.push_bits(byte as u32, 8)
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for &byte in bytes {
            self.push_byte(byte);
        }
        self
    }

    pub fn finish(self) -> BitStream {
        BitStream { data: self.data, bit_len: self.bit_len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_land_most_significant_first() {
        let mut builder = BitStreamBuilder::new();
        builder.push_bit(true).push_bit(false).push_bit(true);
        let stream = builder.finish();
        assert_eq!(stream.bit_len(), 3);
        assert_eq!(stream.to_u8(), 0b1010_0000);
    }

    #[test]
    fn push_bits_takes_the_low_range() {
        let mut builder = BitStreamBuilder::new();
        builder.push_bits(0x1A5, 8); // only the low 8 bits survive
        assert_eq!(builder.finish().to_u8(), 0xA5);
    }

    #[test]
    fn word_extraction_is_big_endian() {
        let stream = BitStream::from_bytes(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(stream.to_u32(), 0x1234_5678);
    }

    #[test]
    fn short_streams_read_zero_padded() {
        let stream = BitStream::from_bytes(&[0xAB]);
        assert_eq!(stream.to_u32(), 0xAB00_0000);
        assert_eq!(BitStream::empty().to_u8(), 0);
    }

    #[test]
    fn byte_slices_clip_to_the_stream() {
        let stream = BitStream::from_bytes(&[1, 2, 3, 4]);
        assert_eq!(stream.bytes_at(8, 2), vec![2, 3]);
        assert_eq!(stream.bytes_at(24, 4), vec![4]);
        assert_eq!(stream.bytes_at(64, 1), Vec::<u8>::new());
    }
}
