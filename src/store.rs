//! Backing byte store behind the card.
//!
//! The card only sees this seam: a seekable, resizable run of bytes. The
//! emulator supplies a memory buffer for throwaway cards or a file for
//! cards that persist across runs.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub trait BackingStore {
    /// Current store length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink the store to exactly `len` bytes.
    fn set_len(&mut self, len: u64) -> Result<(), Error>;

    /// Position the cursor for the next read or write.
    fn seek(&mut self, offset: u64);

    /// Read at the cursor; returns how many bytes were actually
    /// available. Short reads are legal and reported, not failed.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Write at the cursor. Callers clip to the store length first;
    /// the store itself never grows on write.
    fn write(&mut self, data: &[u8]) -> Result<(), Error>;
}

/// Volatile store over a plain byte vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Vec<u8>,
    position: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing content, e.g. a disk image.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl BackingStore for MemoryStore {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn set_len(&mut self, len: u64) -> Result<(), Error> {
        self.data.resize(len as usize, 0);
        Ok(())
    }

    fn seek(&mut self, offset: u64) {
        self.position = offset;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let start = (self.position as usize).min(self.data.len());
        let available = (self.data.len() - start).min(buf.len());
        buf[..available].copy_from_slice(&self.data[start..start + available]);
        self.position += available as u64;
        Ok(available)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let start = (self.position as usize).min(self.data.len());
        let writable = (self.data.len() - start).min(data.len());
        self.data[start..start + writable].copy_from_slice(&data[..writable]);
        self.position += writable as u64;
        Ok(())
    }
}

/// File-backed store. Non-persistent stores remove their file on drop,
/// which is the card's dispose path.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    path: PathBuf,
    persistent: bool,
}

impl FileStore {
    pub fn create<P: AsRef<Path>>(path: P, persistent: bool) -> Result<Self, Error> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path.as_ref())?;
        Ok(Self { file, path: path.as_ref().to_path_buf(), persistent })
    }
}

impl BackingStore for FileStore {
    fn len(&self) -> u64 {
        self.file.metadata().map(|meta| meta.len()).unwrap_or(0)
    }

    fn set_len(&mut self, len: u64) -> Result<(), Error> {
        self.file.set_len(len)?;
        Ok(())
    }

    fn seek(&mut self, offset: u64) {
        let _ = self.file.seek(SeekFrom::Start(offset));
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..])? {
                0 => break,
                count => total += count,
            }
        }
        Ok(total)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.file.write_all(data)?;
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if !self.persistent {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
