//! In-memory byte source for container readers
//!
//! A part arrives as one owned blob. Container readers pull from it through
//! the same two primitives a demuxer's custom I/O hooks expect: a bounded
//! `read` and a `seek` that can also report the total size. The std
//! `Read`/`Seek` impls on top of those make it a symphonia [`MediaSource`].

use std::io::{self, Read, Seek, SeekFrom};
use symphonia::core::io::MediaSource;

/// Largest chunk served per `Read::read` call
pub const IO_PAGE_SIZE: usize = 4 * 1024;

/// Seek behaviour requested by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Move the cursor to an absolute offset, clamped into `[0, len]`
    Absolute,
    /// Report the blob length without moving the cursor
    ReportSize,
}

/// Result of a bounded read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied and the cursor advanced by as much
    Data(usize),
    /// Nothing left to read
    EndOfData,
}

/// Owned byte blob with a read cursor
#[derive(Debug, Default)]
pub struct PartByteSource {
    data: Vec<u8>,
    position: usize,
}

impl PartByteSource {
    /// Wrap an encoded part
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Blob length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current cursor
    pub fn position(&self) -> usize {
        self.position
    }

    /// Copy up to `buf.len()` bytes from the cursor
    ///
    /// Signals `EndOfData` instead of a zero-length read.
    pub fn read(&mut self, buf: &mut [u8]) -> ReadOutcome {
        let available = self.data.len().saturating_sub(self.position);
        let count = buf.len().min(available);
        if count == 0 {
            return ReadOutcome::EndOfData;
        }

        buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        ReadOutcome::Data(count)
    }

    /// Reposition the cursor, or report the size
    pub fn seek(&mut self, offset: i64, mode: SeekMode) -> i64 {
        match mode {
            SeekMode::ReportSize => self.data.len() as i64,
            SeekMode::Absolute => {
                let target = offset.clamp(0, self.data.len() as i64);
                self.position = target as usize;
                target
            }
        }
    }
}

impl Read for PartByteSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let page = buf.len().min(IO_PAGE_SIZE);
        match PartByteSource::read(self, &mut buf[..page]) {
            ReadOutcome::Data(count) => Ok(count),
            ReadOutcome::EndOfData => Ok(0),
        }
    }
}

impl Seek for PartByteSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => offset.min(i64::MAX as u64) as i64,
            SeekFrom::Current(delta) => (self.position as i64).saturating_add(delta),
            SeekFrom::End(delta) => (self.data.len() as i64).saturating_add(delta),
        };
        Ok(PartByteSource::seek(self, target, SeekMode::Absolute) as u64)
    }
}

impl MediaSource for PartByteSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}
