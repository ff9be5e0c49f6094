//! Fast decoding loop for literal/length and distance codes.
//!
//! The loop runs while at least 6 input bytes and 258 output bytes are
//! available, which is enough for one complete length/distance pair
//! (at most 48 bits) and the longest match. Under those conditions it can
//! skip every per-field input and output check that the mode machine in
//! [`crate::inflate`] has to make.
//!
//! It stops at the end of a block, on an invalid code, or when either
//! buffer drops below its margin. Whole bytes still in the bit register on
//! exit are handed back to the input.

use crate::decode_table::{Code, OP_BASE, OP_END_OF_BLOCK, OP_INVALID};
use oxizlib_core::bitstream::BitAccumulator;
use oxizlib_core::ringbuffer::HistoryWindow;
use oxizlib_core::stream::StreamBuffers;

/// Input bytes the loop needs in hand to decode one symbol pair.
pub(crate) const FAST_MIN_INPUT: usize = 6;

/// Output space the loop needs to write the longest match.
pub(crate) const FAST_MIN_OUTPUT: usize = 258;

/// Why the fast loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FastExit {
    /// Ran out of margin in the middle of a block.
    Continue,
    /// Decoded the end-of-block code.
    EndOfBlock,
    /// Hit corrupt data.
    Bad(&'static str),
}

/// Tables for the block being decoded.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DecodeTables<'t> {
    pub lencode: &'t [Code],
    pub lenbits: u32,
    pub distcode: &'t [Code],
    pub distbits: u32,
}

/// Copy `len` bytes within `buf` from `from` to `to`, front to back.
///
/// The ranges may overlap with `from < to`; each byte is copied after the
/// ones before it, so a short distance repeats its pattern.
#[inline]
pub(crate) fn copy_match(buf: &mut [u8], from: usize, to: usize, len: usize) {
    debug_assert!(from < to);
    if to - from >= len {
        buf.copy_within(from..from + len, to);
    } else {
        for i in 0..len {
            buf[to + i] = buf[from + i];
        }
    }
}

/// Copy up to `len` bytes of history, starting `back` bytes before the end
/// of the window, into `dst`. Returns the number of bytes copied, at most
/// `back`.
#[inline]
pub(crate) fn copy_from_window(
    window: &HistoryWindow,
    back: usize,
    dst: &mut [u8],
    len: usize,
) -> usize {
    let n = len.min(back);
    let (older, newer) = window.history_spans(back);
    let first = n.min(older.len());
    dst[..first].copy_from_slice(&older[..first]);
    dst[first..n].copy_from_slice(&newer[..n - first]);
    n
}

/// Decode symbols until a margin is reached or the block ends.
///
/// The caller guarantees at least [`FAST_MIN_INPUT`] input bytes and
/// [`FAST_MIN_OUTPUT`] bytes of output space on entry, and that the tables
/// are complete.
pub(crate) fn inflate_fast(
    bufs: &mut StreamBuffers<'_>,
    acc: &mut BitAccumulator,
    tables: &DecodeTables<'_>,
    window: &HistoryWindow,
) -> FastExit {
    let (input, start_in, output, start_out) = bufs.raw_parts();
    debug_assert!(input.len() - start_in >= FAST_MIN_INPUT);
    debug_assert!(output.len() - start_out >= FAST_MIN_OUTPUT);

    let mut in_pos = start_in;
    let mut out_pos = start_out;
    let in_last = input.len() - (FAST_MIN_INPUT - 1);
    let out_last = output.len() - (FAST_MIN_OUTPUT - 1);
    let lmask = (1u64 << tables.lenbits) - 1;
    let dmask = (1u64 << tables.distbits) - 1;

    let mut hold = acc.hold();
    let mut bits = acc.count();

    let exit = 'symbols: loop {
        while bits < 48 {
            hold |= u64::from(input[in_pos]) << bits;
            in_pos += 1;
            bits += 8;
        }

        let mut here = tables.lencode[(hold & lmask) as usize];
        loop {
            hold >>= here.bits;
            bits -= u32::from(here.bits);
            let op = here.op;

            if op == 0 {
                output[out_pos] = here.val as u8;
                out_pos += 1;
                break;
            }
            if op & OP_BASE != 0 {
                let extra = u32::from(op & 15);
                let mut len = usize::from(here.val) + (hold & ((1u64 << extra) - 1)) as usize;
                hold >>= extra;
                bits -= extra;

                let mut here = tables.distcode[(hold & dmask) as usize];
                let dist = loop {
                    hold >>= here.bits;
                    bits -= u32::from(here.bits);
                    let op = here.op;
                    if op & OP_BASE != 0 {
                        let extra = u32::from(op & 15);
                        let dist = usize::from(here.val) + (hold & ((1u64 << extra) - 1)) as usize;
                        hold >>= extra;
                        bits -= extra;
                        break dist;
                    }
                    if op & OP_INVALID == 0 {
                        // Second-level table
                        here = tables.distcode
                            [usize::from(here.val) + (hold & ((1u64 << op) - 1)) as usize];
                        continue;
                    }
                    break 'symbols FastExit::Bad("invalid distance code");
                };

                // Everything written before `out_pos` in this call is history
                let produced = out_pos;
                if dist > produced {
                    let back = dist - produced;
                    if back > window.have() {
                        break 'symbols FastExit::Bad("invalid distance too far back");
                    }
                    let copied = copy_from_window(window, back, &mut output[out_pos..], len);
                    out_pos += copied;
                    len -= copied;
                }
                if len > 0 {
                    copy_match(output, out_pos - dist, out_pos, len);
                    out_pos += len;
                }
                break;
            }
            if op & OP_INVALID == 0 {
                // Second-level table
                here = tables.lencode[usize::from(here.val) + (hold & ((1u64 << op) - 1)) as usize];
                continue;
            }
            if op & OP_END_OF_BLOCK != 0 {
                break 'symbols FastExit::EndOfBlock;
            }
            break 'symbols FastExit::Bad("invalid literal/length code");
        }

        if in_pos >= in_last || out_pos >= out_last {
            break FastExit::Continue;
        }
    };

    // Hand back whole bytes that were read ahead
    let unused = ((bits >> 3) as usize).min(in_pos - start_in);
    in_pos -= unused;
    bits -= (unused as u32) << 3;
    hold &= (1u64 << bits) - 1;

    acc.load(hold, bits);
    bufs.set_positions(in_pos, out_pos);
    exit
}
