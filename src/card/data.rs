use log::warn;

use crate::store::BackingStore;

use super::SdCard;

impl<S: BackingStore> SdCard<S> {
    /// Pull `count` bytes from the active read transfer. Oversized or
    /// unsolicited requests yield an empty buffer, never a partial one.
    pub fn read_data(&mut self, count: u32) -> Vec<u8> {
        if !self.read_context.is_active() {
            warn!("data read of {} bytes with no read in progress", count);
            return Vec::new();
        }
        if !self.read_context.can_accept(count) {
            warn!(
                "data read of {} bytes exceeds the {} remaining",
                count,
                self.read_context.bytes_left()
            );
            return Vec::new();
        }
        let data = match self.read_context.bound_bytes(count) {
            Some(bytes) => bytes,
            None => {
                // Short store reads are clipped and warned; the tail of
                // the buffer stays zero so the cursor math holds.
                let mut buffer = vec![0u8; count as usize];
                self.store.seek(self.read_context.offset());
                match self.store.read(&mut buffer) {
                    Ok(read) if (read as u32) < count => {
                        warn!("backing store returned {} of {} bytes", read, count)
                    }
                    Ok(_) => {}
                    Err(error) => warn!("backing store read failed: {}", error),
                }
                buffer
            }
        };
        self.read_context.advance(count);
        data
    }

    /// Push bytes through the active write transfer into the store.
    /// Writes never grow the store; overhang is clipped and warned.
    pub fn write_data(&mut self, data: &[u8]) {
        let count = data.len() as u32;
        if !self.write_context.is_active() {
            warn!("data write of {} bytes with no write in progress", count);
            return;
        }
        if !self.write_context.can_accept(count) {
            warn!(
                "data write of {} bytes exceeds the {} remaining",
                count,
                self.write_context.bytes_left()
            );
            return;
        }
        let offset = self.write_context.offset();
        let available = self.store.len().saturating_sub(offset);
        let writable = (count as u64).min(available) as usize;
        if writable < data.len() {
            warn!("write of {} bytes clipped to {} by card geometry", data.len(), writable);
        }
        self.store.seek(offset);
        if let Err(error) = self.store.write(&data[..writable]) {
            warn!("backing store write failed: {}", error);
        }
        self.write_context.advance(count);
    }

    /// Bound how much of the pending read the controller will actually
    /// pull. This is how multi-block reads are sized from outside.
    pub fn set_read_limit(&mut self, count: u32) {
        self.read_context.set_bytes_left(count);
    }
}
