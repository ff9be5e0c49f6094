//! Bit-level I/O for the DEFLATE bitstream.
//!
//! DEFLATE packs bits LSB-first within bytes. Huffman codes are stored
//! bit-reversed so that they can be written with the same LSB-first routine
//! as every other field.
//!
//! - [`BitWriter`] is the compressor's pending-output buffer: bits accumulate
//!   in a 64-bit register, complete bytes move to an internal byte queue and
//!   the caller drains the queue into whatever output space it has.
//! - [`BitAccumulator`] is the decompressor's `hold`/`bits` register. It pulls
//!   input one byte at a time so that a call can stop anywhere and resume
//!   later with the same state.
//!
//! # Example
//!
//! ```
//! use oxizlib_core::bitstream::{BitAccumulator, BitWriter};
//! use oxizlib_core::stream::StreamBuffers;
//!
//! let mut writer = BitWriter::new();
//! writer.write_bits(0b101, 3);
//! writer.write_bits(0b1100, 4);
//! writer.align_to_byte();
//!
//! let mut out = [0u8; 4];
//! let n = writer.drain_into(&mut out);
//! assert_eq!(n, 1);
//!
//! let mut sink = [0u8; 0];
//! let mut bufs = StreamBuffers::new(&out[..n], &mut sink);
//! let mut acc = BitAccumulator::new();
//! assert!(acc.need_bits(&mut bufs, 7));
//! assert_eq!(acc.bits(3), 0b101);
//! acc.drop_bits(3);
//! assert_eq!(acc.bits(4), 0b1100);
//! ```

use crate::stream::StreamBuffers;

/// Pending-output bit writer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// Complete bytes waiting to be drained.
    pending: Vec<u8>,
    /// Read offset into `pending`.
    pending_out: usize,
    /// Bit register (LSB-first).
    buffer: u64,
    /// Valid bits in `buffer`.
    bits_in_buffer: u32,
    /// Total bits written since creation or reset.
    total_bits_written: u64,
}

impl BitWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with room for `capacity` pending bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Discard everything buffered.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_out = 0;
        self.buffer = 0;
        self.bits_in_buffer = 0;
        self.total_bits_written = 0;
    }

    /// Total bits written since creation or reset.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Write the low `count` bits of `value` (count ≤ 32).
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= 32);
        if count == 0 {
            return;
        }
        let mask = if count == 32 {
            u32::MAX
        } else {
            (1u32 << count) - 1
        };
        self.buffer |= u64::from(value & mask) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += u64::from(count);

        if self.bits_in_buffer >= 32 {
            self.flush_bits();
        }
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.write_bits(u32::from(bit), 1);
    }

    /// Move all complete bytes from the register to the queue, leaving at
    /// most 7 bits behind.
    pub fn flush_bits(&mut self) {
        while self.bits_in_buffer >= 8 {
            self.pending.push(self.buffer as u8);
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
    }

    /// Pad with zero bits to the next byte boundary and flush the register.
    pub fn align_to_byte(&mut self) {
        let pad = (8 - self.bits_in_buffer % 8) % 8;
        self.total_bits_written += u64::from(pad);
        self.bits_in_buffer += pad;
        self.flush_bits();
        self.buffer = 0;
    }

    /// Whether the register holds no partial byte.
    pub fn is_aligned(&self) -> bool {
        self.bits_in_buffer % 8 == 0
    }

    /// Queue a byte. The register must be byte aligned.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.flush_bits();
        debug_assert_eq!(self.bits_in_buffer, 0);
        self.pending.push(byte);
        self.total_bits_written += 8;
    }

    /// Queue bytes. The register must be byte aligned.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.flush_bits();
        debug_assert_eq!(self.bits_in_buffer, 0);
        self.pending.extend_from_slice(bytes);
        self.total_bits_written += 8 * bytes.len() as u64;
    }

    /// Queue bytes ahead of whatever bits the register still holds.
    ///
    /// Stream headers use this so that bits inserted before the first
    /// block follow the header.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        self.total_bits_written += 8 * bytes.len() as u64;
    }

    /// Queue a 16-bit value most significant byte first.
    pub fn write_u16_msb(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Queue a 32-bit value most significant byte first.
    pub fn write_u32_msb(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Queue a 32-bit value least significant byte first.
    pub fn write_u32_lsb(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Queued bytes not yet drained (excluding the register).
    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_out
    }

    /// Queued bytes as a slice.
    pub fn pending_bytes(&self) -> &[u8] {
        &self.pending[self.pending_out..]
    }

    /// Bits sitting in the register.
    pub fn pending_bits(&self) -> u32 {
        self.bits_in_buffer
    }

    /// Whether nothing at all is buffered.
    pub fn is_empty(&self) -> bool {
        self.pending_len() == 0 && self.bits_in_buffer == 0
    }

    /// Flush complete bytes from the register, then copy as much of the
    /// queue as fits into `out`. Returns the number of bytes copied.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        self.flush_bits();
        let available = &self.pending[self.pending_out..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pending_out += n;
        if self.pending_out == self.pending.len() {
            self.pending.clear();
            self.pending_out = 0;
        }
        n
    }
}

/// Decoder bit register (`hold`, `bits`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitAccumulator {
    hold: u64,
    bits: u32,
}

impl BitAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all held bits.
    #[inline]
    pub fn clear(&mut self) {
        self.hold = 0;
        self.bits = 0;
    }

    /// Number of valid bits held.
    #[inline]
    pub fn count(&self) -> u32 {
        self.bits
    }

    /// Raw register contents.
    #[inline]
    pub fn hold(&self) -> u64 {
        self.hold
    }

    /// Replace the register contents.
    #[inline]
    pub fn load(&mut self, hold: u64, bits: u32) {
        self.hold = hold;
        self.bits = bits;
    }

    /// Pull one input byte into the register. Returns `false` on empty input.
    #[inline]
    pub fn pull_byte(&mut self, bufs: &mut StreamBuffers<'_>) -> bool {
        match bufs.next_byte() {
            Some(byte) => {
                self.hold |= u64::from(byte) << self.bits;
                self.bits += 8;
                true
            }
            None => false,
        }
    }

    /// Ensure at least `n` bits are held (n ≤ 32), pulling bytes as needed.
    #[inline]
    pub fn need_bits(&mut self, bufs: &mut StreamBuffers<'_>, n: u32) -> bool {
        while self.bits < n {
            if !self.pull_byte(bufs) {
                return false;
            }
        }
        true
    }

    /// Low `n` bits of the register.
    #[inline]
    pub fn bits(&self, n: u32) -> u32 {
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    /// Discard the low `n` bits.
    #[inline]
    pub fn drop_bits(&mut self, n: u32) {
        debug_assert!(n <= self.bits);
        self.hold >>= n;
        self.bits -= n;
    }

    /// Discard bits up to the next byte boundary.
    #[inline]
    pub fn byte_align(&mut self) {
        let extra = self.bits & 7;
        self.drop_bits(extra);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitwriter_basic() {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_bit(false);
        writer.write_bit(true);
        writer.write_bit(true);
        writer.align_to_byte();

        let mut out = [0u8; 2];
        assert_eq!(writer.drain_into(&mut out), 1);
        assert_eq!(out[0], 0b0000_1101);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_bitwriter_pending_accounting() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x3FF, 10);
        assert_eq!(writer.pending_len(), 0);
        assert_eq!(writer.pending_bits(), 10);
        writer.flush_bits();
        assert_eq!(writer.pending_len(), 1);
        assert_eq!(writer.pending_bits(), 2);
        assert_eq!(writer.bits_written(), 10);
    }

    #[test]
    fn test_bitwriter_partial_drain() {
        let mut writer = BitWriter::new();
        writer.write_bytes(&[1, 2, 3, 4, 5]);
        let mut out = [0u8; 2];
        assert_eq!(writer.drain_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(writer.pending_bytes(), &[3, 4, 5]);
        let mut rest = [0u8; 8];
        assert_eq!(writer.drain_into(&mut rest), 3);
        assert_eq!(&rest[..3], &[3, 4, 5]);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_bitwriter_msb_helpers() {
        let mut writer = BitWriter::new();
        writer.write_u16_msb(0x789C);
        writer.write_u32_lsb(0x0403_0201);
        assert_eq!(writer.pending_bytes(), &[0x78, 0x9C, 1, 2, 3, 4]);
    }

    #[test]
    fn test_accumulator_stops_on_empty_input() {
        let input = [0xABu8];
        let mut sink = [0u8; 0];
        let mut bufs = StreamBuffers::new(&input, &mut sink);
        let mut acc = BitAccumulator::new();

        assert!(!acc.need_bits(&mut bufs, 12));
        assert_eq!(acc.count(), 8);
        assert_eq!(acc.bits(4), 0xB);
        acc.drop_bits(4);
        acc.byte_align();
        assert_eq!(acc.count(), 0);
    }

    #[test]
    fn test_roundtrip() {
        let mut writer = BitWriter::new();
        writer.write_bits(0x1, 1);
        writer.write_bits(0x12345, 17);
        writer.write_bits(0x3, 2);
        writer.align_to_byte();
        let mut out = [0u8; 8];
        let n = writer.drain_into(&mut out);

        let mut sink = [0u8; 0];
        let mut bufs = StreamBuffers::new(&out[..n], &mut sink);
        let mut acc = BitAccumulator::new();
        assert!(acc.need_bits(&mut bufs, 20));
        assert_eq!(acc.bits(1), 1);
        acc.drop_bits(1);
        assert_eq!(acc.bits(17), 0x12345 & 0x1FFFF);
        acc.drop_bits(17);
        assert_eq!(acc.bits(2), 3);
    }
}
