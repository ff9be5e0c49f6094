//! Stream cursors and per-stream bookkeeping.
//!
//! A streaming call borrows its input and output for the duration of the call
//! through [`StreamBuffers`]; everything that must survive between calls
//! (totals, running checksum, last error message) lives in [`StreamContext`].

use crate::adler::Adler32;
use crate::crc::Crc32;

/// Which checksum a stream maintains over its uncompressed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChecksumKind {
    /// Raw deflate: no checksum.
    #[default]
    None,
    /// zlib framing.
    Adler32,
    /// gzip framing.
    Crc32,
}

impl ChecksumKind {
    /// Initial checksum value for this kind.
    pub fn initial(self) -> u32 {
        match self {
            Self::Adler32 => 1,
            Self::None | Self::Crc32 => 0,
        }
    }
}

/// Persistent state shared by the compressor and decompressor.
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    /// Total input bytes consumed since the last reset.
    pub total_in: u64,
    /// Total output bytes produced since the last reset.
    pub total_out: u64,
    checksum: u32,
    kind: ChecksumKind,
    msg: Option<&'static str>,
}

impl StreamContext {
    /// Create a context maintaining the given checksum.
    pub fn new(kind: ChecksumKind) -> Self {
        Self {
            total_in: 0,
            total_out: 0,
            checksum: kind.initial(),
            kind,
            msg: None,
        }
    }

    /// Checksum kind in use.
    pub fn kind(&self) -> ChecksumKind {
        self.kind
    }

    /// Switch checksum kind and restart the checksum.
    pub fn set_kind(&mut self, kind: ChecksumKind) {
        self.kind = kind;
        self.checksum = kind.initial();
    }

    /// Current running checksum.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Overwrite the running checksum.
    pub fn set_checksum(&mut self, value: u32) {
        self.checksum = value;
    }

    /// Restart the checksum at its initial value.
    pub fn reset_checksum(&mut self) {
        self.checksum = self.kind.initial();
    }

    /// Fold `data` into the running checksum.
    pub fn update_checksum(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.checksum = match self.kind {
            ChecksumKind::None => self.checksum,
            ChecksumKind::Adler32 => {
                let mut adler = Adler32::from_value(self.checksum);
                adler.update(data);
                adler.value()
            }
            ChecksumKind::Crc32 => {
                let mut crc = Crc32::from_value(self.checksum);
                crc.update(data);
                crc.value()
            }
        };
    }

    /// Last error message, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.msg
    }

    /// Record an error message.
    pub fn set_message(&mut self, msg: &'static str) {
        self.msg = Some(msg);
    }

    /// Clear totals, message and checksum.
    pub fn reset(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.msg = None;
        self.checksum = self.kind.initial();
    }
}

/// Input and output cursors for one streaming call.
#[derive(Debug)]
pub struct StreamBuffers<'a> {
    input: &'a [u8],
    in_pos: usize,
    output: &'a mut [u8],
    out_pos: usize,
}

impl<'a> StreamBuffers<'a> {
    /// Wrap the caller's buffers with both cursors at zero.
    pub fn new(input: &'a [u8], output: &'a mut [u8]) -> Self {
        Self {
            input,
            in_pos: 0,
            output,
            out_pos: 0,
        }
    }

    /// Bytes of input not yet consumed.
    #[inline]
    pub fn avail_in(&self) -> usize {
        self.input.len() - self.in_pos
    }

    /// Bytes of output space left.
    #[inline]
    pub fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Input consumed so far in this call.
    #[inline]
    pub fn in_pos(&self) -> usize {
        self.in_pos
    }

    /// Output produced so far in this call.
    #[inline]
    pub fn out_pos(&self) -> usize {
        self.out_pos
    }

    /// Unconsumed input.
    #[inline]
    pub fn input(&self) -> &'a [u8] {
        &self.input[self.in_pos..]
    }

    /// Take one input byte.
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.input.get(self.in_pos)?;
        self.in_pos += 1;
        Some(byte)
    }

    /// Mark `n` input bytes consumed.
    #[inline]
    pub fn advance_input(&mut self, n: usize) {
        debug_assert!(n <= self.avail_in());
        self.in_pos += n;
    }

    /// Copy up to `dst.len()` input bytes into `dst`, returning the count.
    pub fn read_input(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.avail_in());
        dst[..n].copy_from_slice(&self.input[self.in_pos..self.in_pos + n]);
        self.in_pos += n;
        n
    }

    /// Append as much of `src` to the output as fits, returning the count.
    pub fn write_output(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.avail_out());
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(&src[..n]);
        self.out_pos += n;
        n
    }

    /// Unused output space.
    #[inline]
    pub fn output_mut(&mut self) -> &mut [u8] {
        &mut self.output[self.out_pos..]
    }

    /// Mark `n` bytes of [`StreamBuffers::output_mut`] as written.
    #[inline]
    pub fn advance_output(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.out_pos += n;
    }

    /// Append one byte. The caller must have checked `avail_out`.
    #[inline]
    pub fn push_output(&mut self, byte: u8) {
        self.output[self.out_pos] = byte;
        self.out_pos += 1;
    }

    /// Copy `len` bytes from `dist` bytes behind the output cursor.
    ///
    /// The ranges may overlap; the copy proceeds forward so that short
    /// distances replicate. The caller guarantees `dist <= out_pos` and
    /// `len <= avail_out`.
    #[inline]
    pub fn copy_within_output(&mut self, dist: usize, len: usize) {
        let start = self.out_pos - dist;
        if dist >= len {
            self.output.copy_within(start..start + len, self.out_pos);
        } else {
            for i in 0..len {
                self.output[self.out_pos + i] = self.output[start + i];
            }
        }
        self.out_pos += len;
    }

    /// Output bytes written in this call starting at `from`.
    pub fn written_since(&self, from: usize) -> &[u8] {
        &self.output[from..self.out_pos]
    }

    /// Split borrow for tight loops: (input, in_pos, output, out_pos).
    ///
    /// Write the cursors back with [`StreamBuffers::set_positions`].
    pub fn raw_parts(&mut self) -> (&'a [u8], usize, &mut [u8], usize) {
        (self.input, self.in_pos, &mut *self.output, self.out_pos)
    }

    /// Move both cursors.
    pub fn set_positions(&mut self, in_pos: usize, out_pos: usize) {
        debug_assert!(in_pos <= self.input.len() && out_pos <= self.output.len());
        self.in_pos = in_pos;
        self.out_pos = out_pos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_checksums() {
        let mut ctx = StreamContext::new(ChecksumKind::Adler32);
        assert_eq!(ctx.checksum(), 1);
        ctx.update_checksum(b"Hel");
        ctx.update_checksum(b"lo");
        assert_eq!(ctx.checksum(), Adler32::checksum(b"Hello"));

        ctx.set_kind(ChecksumKind::Crc32);
        ctx.update_checksum(b"123456789");
        assert_eq!(ctx.checksum(), 0xCBF43926);

        ctx.set_kind(ChecksumKind::None);
        ctx.update_checksum(b"ignored");
        assert_eq!(ctx.checksum(), 0);
    }

    #[test]
    fn test_context_reset() {
        let mut ctx = StreamContext::new(ChecksumKind::Adler32);
        ctx.total_in = 10;
        ctx.total_out = 20;
        ctx.set_message("invalid block type");
        ctx.update_checksum(b"x");
        ctx.reset();
        assert_eq!(ctx.total_in, 0);
        assert_eq!(ctx.total_out, 0);
        assert_eq!(ctx.message(), None);
        assert_eq!(ctx.checksum(), 1);
    }

    #[test]
    fn test_buffers_cursors() {
        let input = [1u8, 2, 3, 4, 5];
        let mut output = [0u8; 4];
        let mut bufs = StreamBuffers::new(&input, &mut output);

        assert_eq!(bufs.next_byte(), Some(1));
        let mut tmp = [0u8; 2];
        assert_eq!(bufs.read_input(&mut tmp), 2);
        assert_eq!(tmp, [2, 3]);
        assert_eq!(bufs.avail_in(), 2);

        assert_eq!(bufs.write_output(&[9, 8, 7, 6, 5]), 4);
        assert_eq!(bufs.avail_out(), 0);
        assert_eq!(bufs.written_since(1), &[8, 7, 6]);
    }

    #[test]
    fn test_direct_output_access() {
        let mut output = [0u8; 4];
        let mut bufs = StreamBuffers::new(&[], &mut output);
        bufs.push_output(1);
        bufs.output_mut()[..2].copy_from_slice(&[2, 3]);
        bufs.advance_output(2);
        assert_eq!(bufs.avail_out(), 1);
        assert_eq!(bufs.written_since(0), &[1, 2, 3]);
    }

    #[test]
    fn test_overlapping_copy() {
        let mut output = [0u8; 8];
        let mut bufs = StreamBuffers::new(&[], &mut output);
        bufs.write_output(b"ab");
        bufs.copy_within_output(2, 6);
        assert_eq!(bufs.written_since(0), b"abababab");
    }
}
