//! Physical backing store: the owned flat array and the optional custom backend.

#![allow(clippy::cast_possible_truncation)]

use crate::Width;

/// Default size of the flat backing array (64 KiB).
pub const DEFAULT_MEMORY_BYTES: usize = 0x1_0000;

/// Kind of access presented to a custom backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessKind {
    /// Data read.
    Read,
    /// Data write.
    Write,
    /// Instruction fetch.
    Fetch,
}

/// Custom physical memory that replaces the flat array for translated accesses.
///
/// Page-table walks and host-side raw accesses always use the flat array.
pub trait MemoryBackend {
    /// Reads `width` bytes at physical address `addr`.
    fn read(&mut self, addr: u32, width: Width, kind: AccessKind) -> u32;

    /// Writes the low `width` bytes of `value` at physical address `addr`.
    fn write(&mut self, addr: u32, value: u32, width: Width);
}

/// Owned, contiguous, little-endian physical memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalMemory {
    bytes: Vec<u8>,
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_BYTES)
    }
}

impl PhysicalMemory {
    /// Allocates a zeroed array of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Size of the array in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-sized array.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Resizes the array; grown bytes are zero.
    pub fn resize(&mut self, size: usize) {
        self.bytes.resize(size, 0);
    }

    /// Borrows the raw bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    fn index(&self, addr: u64, len: usize) -> Option<usize> {
        let start = usize::try_from(addr).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start)
    }

    /// Reads one byte, or `None` past the end.
    #[must_use]
    pub fn get(&self, addr: u64) -> Option<u8> {
        self.index(addr, 1).map(|i| self.bytes[i])
    }

    /// Reads one byte; out-of-range reads return `0xFF`.
    #[must_use]
    pub fn read8(&self, addr: u64) -> u8 {
        self.get(addr).unwrap_or(0xFF)
    }

    /// Writes one byte; out-of-range writes are dropped.
    pub fn write8(&mut self, addr: u64, value: u8) {
        if let Some(i) = self.index(addr, 1) {
            self.bytes[i] = value;
        }
    }

    /// Reads `width` bytes little-endian; a range that runs off the end reads all-ones.
    #[must_use]
    pub fn read(&self, addr: u64, width: Width) -> u32 {
        let len = width.bytes() as usize;
        self.index(addr, len).map_or(width.mask(), |i| {
            self.bytes[i..i + len]
                .iter()
                .rev()
                .fold(0, |acc, byte| (acc << 8) | u32::from(*byte))
        })
    }

    /// Writes the low `width` bytes little-endian; a range that runs off the end is dropped.
    pub fn write(&mut self, addr: u64, value: u32, width: Width) {
        let len = width.bytes() as usize;
        if let Some(i) = self.index(addr, len) {
            self.bytes[i..i + len].copy_from_slice(&value.to_le_bytes()[..len]);
        }
    }

    /// Reads a 64-bit little-endian word; out-of-range reads as zero (a non-present entry).
    #[must_use]
    pub fn read_u64(&self, addr: u64) -> u64 {
        self.index(addr, 8).map_or(0, |i| {
            let mut word = [0; 8];
            word.copy_from_slice(&self.bytes[i..i + 8]);
            u64::from_le_bytes(word)
        })
    }

    /// Copies `data` to `addr`, truncating at the end of the array; returns bytes copied.
    pub fn write_block(&mut self, addr: u32, data: &[u8]) -> usize {
        let start = addr as usize;
        if start >= self.bytes.len() {
            return 0;
        }
        let count = data.len().min(self.bytes.len() - start);
        self.bytes[start..start + count].copy_from_slice(&data[..count]);
        count
    }

    /// Copies from `addr` into `out`, truncating at the end of the array; returns bytes copied.
    pub fn read_block(&self, addr: u32, out: &mut [u8]) -> usize {
        let start = addr as usize;
        if start >= self.bytes.len() {
            return 0;
        }
        let count = out.len().min(self.bytes.len() - start);
        out[..count].copy_from_slice(&self.bytes[start..start + count]);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::{PhysicalMemory, DEFAULT_MEMORY_BYTES};
    use crate::Width;

    #[test]
    fn default_array_is_64kib_and_zeroed() {
        let mem = PhysicalMemory::default();
        assert_eq!(mem.len(), DEFAULT_MEMORY_BYTES);
        assert!(mem.as_slice().iter().all(|b| *b == 0));
    }

    #[test]
    fn out_of_range_reads_are_all_ones() {
        let mem = PhysicalMemory::new(16);
        assert_eq!(mem.read8(16), 0xFF);
        assert_eq!(mem.read(15, Width::Word), 0xFFFF);
        assert_eq!(mem.read(14, Width::Long), 0xFFFF_FFFF);
        assert_eq!(mem.read_u64(12), 0);
    }

    #[test]
    fn multi_byte_accesses_are_little_endian() {
        let mut mem = PhysicalMemory::new(16);
        mem.write(4, 0xDEAD_BEEF, Width::Long);
        assert_eq!(mem.read8(4), 0xEF);
        assert_eq!(mem.read(6, Width::Word), 0xDEAD);
        mem.write(8, 0x0403_0201, Width::Long);
        assert_eq!(mem.read_u64(4), 0x0403_0201_DEAD_BEEF);
    }

    #[test]
    fn block_copies_truncate_at_the_end() {
        let mut mem = PhysicalMemory::new(8);
        assert_eq!(mem.write_block(6, &[1, 2, 3, 4]), 2);
        let mut out = [0u8; 4];
        assert_eq!(mem.read_block(5, &mut out), 3);
        assert_eq!(out, [0, 1, 2, 0]);
        assert_eq!(mem.write_block(8, &[9]), 0);
    }

    #[test]
    fn resize_zero_fills_grown_region() {
        let mut mem = PhysicalMemory::new(4);
        mem.write8(3, 0xAA);
        mem.resize(8);
        assert_eq!(mem.read8(3), 0xAA);
        assert_eq!(mem.read8(7), 0);
    }
}
