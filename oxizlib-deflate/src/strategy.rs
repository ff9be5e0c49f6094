//! Block compression routines.
//!
//! Each routine consumes input through the window, tallies symbols into the
//! block encoder and closes blocks as they fill. The routine is picked from
//! the level and strategy when the compressor is created or reconfigured,
//! never per call.
//!
//! | routine | used for                        | matching                    |
//! |---------|---------------------------------|-----------------------------|
//! | Stored  | level 0                         | none, stored blocks only    |
//! | Fast    | levels 1-3                      | greedy                      |
//! | Slow    | levels 4-9                      | lazy, one position deferred |
//! | Rle     | `CompressionStrategy::Rle`      | distance 1 only             |
//! | Huffman | `CompressionStrategy::HuffmanOnly` | none, literals only      |

use crate::block::BlockEncoder;
use crate::config::{CompressionStrategy, LevelConfig};
use crate::lz77::{MatchFinder, TOO_FAR};
use crate::tables::{MAX_MATCH, MIN_LOOKAHEAD, MIN_MATCH};
use oxizlib_core::stream::{StreamBuffers, StreamContext};
use oxizlib_core::traits::FlushMode;

/// Block compression routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockStrategy {
    /// Copy input into stored blocks.
    Stored,
    /// Greedy matching.
    Fast,
    /// Lazy matching.
    Slow,
    /// Run-length matching.
    Rle,
    /// Literals only.
    HuffmanOnly,
}

impl BlockStrategy {
    /// Routine for a level and strategy.
    pub fn select(level: u8, strategy: CompressionStrategy) -> Self {
        if level == 0 {
            return Self::Stored;
        }
        match strategy {
            CompressionStrategy::HuffmanOnly => Self::HuffmanOnly,
            CompressionStrategy::Rle => Self::Rle,
            _ => LevelConfig::for_level(level).func,
        }
    }

    pub(crate) fn run(self, c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
        match self {
            Self::Stored => deflate_stored(c, flush),
            Self::Fast => deflate_fast(c, flush),
            Self::Slow => deflate_slow(c, flush),
            Self::Rle => deflate_rle(c, flush),
            Self::HuffmanOnly => deflate_huff(c, flush),
        }
    }
}

/// Where a routine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Out of input or output space.
    NeedMore,
    /// The requested flush reached a block boundary.
    BlockDone,
    /// The last block was started but not all of it is out yet.
    FinishStarted,
    /// The last block is complete.
    FinishDone,
}

/// Everything a routine touches during one call.
pub(crate) struct Compress<'a, 'b> {
    pub mf: &'a mut MatchFinder,
    pub enc: &'a mut BlockEncoder,
    pub bufs: &'a mut StreamBuffers<'b>,
    pub ctx: &'a mut StreamContext,
}

impl Compress<'_, '_> {
    #[inline]
    fn fill_window(&mut self) {
        self.mf.fill_window(self.bufs, Some(self.ctx));
    }

    /// Close the block ending at `strstart` and push out what fits.
    fn flush_block_only(&mut self, last: bool) {
        let mf = &*self.mf;
        let stored_len = (mf.strstart as isize - mf.block_start) as usize;
        let stored = (mf.block_start >= 0)
            .then(|| &mf.window[mf.block_start as usize..mf.strstart]);
        self.enc.flush_block(stored, stored_len, last);
        self.mf.block_start = self.mf.strstart as isize;
        self.enc.flush_pending(self.bufs);
    }
}

/// Close the current block; stop the routine if the output is full.
macro_rules! flush_block {
    ($c:expr, $last:expr) => {
        $c.flush_block_only($last);
        if $c.bufs.avail_out() == 0 {
            return if $last {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            };
        }
    };
}

/// Close the final block or the flushed partial block.
macro_rules! finish_blocks {
    ($c:expr, $flush:expr) => {
        if $flush == FlushMode::Finish {
            flush_block!($c, true);
            return BlockState::FinishDone;
        }
        if $c.enc.has_symbols() {
            flush_block!($c, false);
        }
        return BlockState::BlockDone;
    };
}

/// Copy input to stored blocks without compression.
///
/// Blocks are cut at 64 KiB, at the size of the pending buffer, and before
/// the window would slide past their start.
fn deflate_stored(c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
    let max_block_size = 0xFFFF.min(c.enc.pending_buf_size() - 5) as isize;

    loop {
        if c.mf.lookahead <= 1 {
            c.fill_window();
            if c.mf.lookahead == 0 {
                if flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                break;
            }
        }

        c.mf.strstart += c.mf.lookahead;
        c.mf.lookahead = 0;

        let max_start = c.mf.block_start + max_block_size;
        if c.mf.strstart as isize >= max_start {
            c.mf.lookahead = (c.mf.strstart as isize - max_start) as usize;
            c.mf.strstart = max_start as usize;
            flush_block!(c, false);
        }
        if c.mf.strstart as isize - c.mf.block_start >= c.mf.max_dist() as isize {
            flush_block!(c, false);
        }
    }

    c.mf.insert = 0;
    if flush == FlushMode::Finish {
        flush_block!(c, true);
        return BlockState::FinishDone;
    }
    if c.mf.strstart as isize > c.mf.block_start {
        flush_block!(c, false);
    }
    BlockState::BlockDone
}

/// Greedy matching: take the longest match at each position.
///
/// Matches up to `max_lazy_match` long have all their strings inserted in
/// the hash table; longer ones only have their end rehashed.
fn deflate_fast(c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
    loop {
        if c.mf.lookahead < MIN_LOOKAHEAD {
            c.fill_window();
            if c.mf.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                return BlockState::NeedMore;
            }
            if c.mf.lookahead == 0 {
                break;
            }
        }

        let mut hash_head = 0;
        if c.mf.lookahead >= MIN_MATCH {
            hash_head = c.mf.insert_string(c.mf.strstart);
        }
        if hash_head != 0 && c.mf.strstart - hash_head <= c.mf.max_dist() {
            c.mf.match_length = c.mf.longest_match(hash_head);
        }

        let bflush;
        let mf = &mut *c.mf;
        if mf.match_length >= MIN_MATCH {
            bflush = c
                .enc
                .tally_dist(mf.strstart - mf.match_start, mf.match_length);
            mf.lookahead -= mf.match_length;

            if mf.match_length <= mf.max_lazy_match && mf.lookahead >= MIN_MATCH {
                mf.match_length -= 1;
                while mf.match_length > 0 {
                    mf.strstart += 1;
                    mf.insert_string(mf.strstart);
                    mf.match_length -= 1;
                }
                mf.strstart += 1;
            } else {
                mf.strstart += mf.match_length;
                mf.match_length = 0;
                mf.reset_hash_at(mf.strstart);
            }
        } else {
            bflush = c.enc.tally_lit(mf.window[mf.strstart]);
            mf.lookahead -= 1;
            mf.strstart += 1;
        }
        if bflush {
            flush_block!(c, false);
        }
    }

    c.mf.insert = c.mf.strstart.min(MIN_MATCH - 1);
    finish_blocks!(c, flush);
}

/// Lazy matching: a match is only taken if the next position does not
/// yield a longer one.
fn deflate_slow(c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
    loop {
        if c.mf.lookahead < MIN_LOOKAHEAD {
            c.fill_window();
            if c.mf.lookahead < MIN_LOOKAHEAD && flush == FlushMode::None {
                return BlockState::NeedMore;
            }
            if c.mf.lookahead == 0 {
                break;
            }
        }

        let mut hash_head = 0;
        if c.mf.lookahead >= MIN_MATCH {
            hash_head = c.mf.insert_string(c.mf.strstart);
        }

        let mf = &mut *c.mf;
        mf.prev_length = mf.match_length;
        mf.prev_match = mf.match_start;
        mf.match_length = MIN_MATCH - 1;

        if hash_head != 0
            && mf.prev_length < mf.max_lazy_match
            && mf.strstart - hash_head <= mf.max_dist()
        {
            mf.match_length = mf.longest_match(hash_head);

            // Short matches that are far away or filtered are worth less
            // than their literals
            if mf.match_length <= 5
                && (c.enc.strategy == CompressionStrategy::Filtered
                    || (mf.match_length == MIN_MATCH && mf.strstart - mf.match_start > TOO_FAR))
            {
                mf.match_length = MIN_MATCH - 1;
            }
        }

        if mf.prev_length >= MIN_MATCH && mf.match_length <= mf.prev_length {
            // The previous match wins: emit it and skip over its strings
            let max_insert = mf.strstart + mf.lookahead - MIN_MATCH;
            let bflush = c
                .enc
                .tally_dist(mf.strstart - 1 - mf.prev_match, mf.prev_length);

            mf.lookahead -= mf.prev_length - 1;
            mf.prev_length -= 2;
            while mf.prev_length > 0 {
                mf.strstart += 1;
                if mf.strstart <= max_insert {
                    mf.insert_string(mf.strstart);
                }
                mf.prev_length -= 1;
            }
            mf.match_available = false;
            mf.match_length = MIN_MATCH - 1;
            mf.strstart += 1;

            if bflush {
                flush_block!(c, false);
            }
        } else if mf.match_available {
            // No better match here: emit the deferred literal
            let bflush = c.enc.tally_lit(mf.window[mf.strstart - 1]);
            if bflush {
                c.flush_block_only(false);
            }
            c.mf.strstart += 1;
            c.mf.lookahead -= 1;
            if c.bufs.avail_out() == 0 {
                return BlockState::NeedMore;
            }
        } else {
            // Defer this position to compare with the next one
            mf.match_available = true;
            mf.strstart += 1;
            mf.lookahead -= 1;
        }
    }

    if c.mf.match_available {
        c.enc.tally_lit(c.mf.window[c.mf.strstart - 1]);
        c.mf.match_available = false;
    }
    c.mf.insert = c.mf.strstart.min(MIN_MATCH - 1);
    finish_blocks!(c, flush);
}

/// Run-length matching: only look for repeats of the previous byte.
fn deflate_rle(c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
    loop {
        // Keep enough lookahead for the longest run
        if c.mf.lookahead <= MAX_MATCH {
            c.fill_window();
            if c.mf.lookahead <= MAX_MATCH && flush == FlushMode::None {
                return BlockState::NeedMore;
            }
            if c.mf.lookahead == 0 {
                break;
            }
        }

        let mf = &mut *c.mf;
        mf.match_length = 0;
        if mf.lookahead >= MIN_MATCH && mf.strstart > 0 {
            let prev = mf.window[mf.strstart - 1];
            let run = mf.window[mf.strstart..mf.strstart + MAX_MATCH]
                .iter()
                .take_while(|&&b| b == prev)
                .count();
            if run >= MIN_MATCH {
                mf.match_length = run.min(mf.lookahead);
            }
        }

        let bflush = if mf.match_length >= MIN_MATCH {
            let bflush = c.enc.tally_dist(1, mf.match_length);
            mf.lookahead -= mf.match_length;
            mf.strstart += mf.match_length;
            mf.match_length = 0;
            bflush
        } else {
            let bflush = c.enc.tally_lit(mf.window[mf.strstart]);
            mf.lookahead -= 1;
            mf.strstart += 1;
            bflush
        };
        if bflush {
            flush_block!(c, false);
        }
    }

    c.mf.insert = 0;
    finish_blocks!(c, flush);
}

/// Huffman coding only: every byte is a literal.
fn deflate_huff(c: &mut Compress<'_, '_>, flush: FlushMode) -> BlockState {
    loop {
        if c.mf.lookahead == 0 {
            c.fill_window();
            if c.mf.lookahead == 0 {
                if flush == FlushMode::None {
                    return BlockState::NeedMore;
                }
                break;
            }
        }

        c.mf.match_length = 0;
        let bflush = c.enc.tally_lit(c.mf.window[c.mf.strstart]);
        c.mf.lookahead -= 1;
        c.mf.strstart += 1;
        if bflush {
            flush_block!(c, false);
        }
    }

    c.mf.insert = 0;
    finish_blocks!(c, flush);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::Inflater;
    use oxizlib_core::ChecksumKind;
    use oxizlib_core::traits::Decompressor;

    /// Run one routine over `data` with ample output and return raw deflate.
    fn run_raw(func: BlockStrategy, level: u8, strategy: CompressionStrategy, data: &[u8]) -> Vec<u8> {
        let mut mf = MatchFinder::new(15, 8);
        mf.reset(&LevelConfig::for_level(level));
        let mut enc = BlockEncoder::new(1 << 14, level, strategy);
        let mut ctx = StreamContext::new(ChecksumKind::None);
        let mut out = vec![0u8; data.len() * 2 + 64];
        let mut bufs = StreamBuffers::new(data, &mut out);
        let state = {
            let mut c = Compress {
                mf: &mut mf,
                enc: &mut enc,
                bufs: &mut bufs,
                ctx: &mut ctx,
            };
            func.run(&mut c, FlushMode::Finish)
        };
        assert_eq!(state, BlockState::FinishDone);
        let n = bufs.out_pos();
        out.truncate(n);
        out
    }

    fn inflate_raw(data: &[u8]) -> Vec<u8> {
        Inflater::raw().decompress_all(data).unwrap()
    }

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..200u32 {
            data.extend_from_slice(format!("line {} of the sample, ", i % 17).as_bytes());
            data.extend(std::iter::repeat_n(b'z', (i % 9) as usize));
        }
        data
    }

    #[test]
    fn test_select() {
        use CompressionStrategy as S;
        assert_eq!(BlockStrategy::select(0, S::HuffmanOnly), BlockStrategy::Stored);
        assert_eq!(BlockStrategy::select(1, S::Default), BlockStrategy::Fast);
        assert_eq!(BlockStrategy::select(6, S::Filtered), BlockStrategy::Slow);
        assert_eq!(BlockStrategy::select(6, S::Rle), BlockStrategy::Rle);
        assert_eq!(BlockStrategy::select(9, S::HuffmanOnly), BlockStrategy::HuffmanOnly);
        assert_eq!(BlockStrategy::select(9, S::Fixed), BlockStrategy::Slow);
    }

    #[test]
    fn test_every_routine_roundtrips() {
        let data = sample();
        let cases = [
            (BlockStrategy::Stored, 0, CompressionStrategy::Default),
            (BlockStrategy::Fast, 1, CompressionStrategy::Default),
            (BlockStrategy::Fast, 3, CompressionStrategy::Default),
            (BlockStrategy::Slow, 6, CompressionStrategy::Default),
            (BlockStrategy::Slow, 9, CompressionStrategy::Filtered),
            (BlockStrategy::Slow, 6, CompressionStrategy::Fixed),
            (BlockStrategy::Rle, 6, CompressionStrategy::Rle),
            (BlockStrategy::HuffmanOnly, 6, CompressionStrategy::HuffmanOnly),
        ];
        for (func, level, strategy) in cases {
            let compressed = run_raw(func, level, strategy, &data);
            assert_eq!(inflate_raw(&compressed), data, "{func:?} level {level}");
        }
    }

    #[test]
    fn test_matching_beats_literals() {
        let data = sample();
        let huff = run_raw(BlockStrategy::HuffmanOnly, 6, CompressionStrategy::HuffmanOnly, &data);
        let slow = run_raw(BlockStrategy::Slow, 9, CompressionStrategy::Default, &data);
        assert!(slow.len() < huff.len());
    }

    #[test]
    fn test_rle_on_runs() {
        let mut data = vec![7u8; 5000];
        data.extend(vec![9u8; 3000]);
        let compressed = run_raw(BlockStrategy::Rle, 6, CompressionStrategy::Rle, &data);
        assert!(compressed.len() < 100);
        assert_eq!(inflate_raw(&compressed), data);
    }

    #[test]
    fn test_stored_respects_block_limit() {
        let data: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 256) as u8).collect();
        let compressed = run_raw(BlockStrategy::Stored, 0, CompressionStrategy::Default, &data);
        // Each stored block costs 5 header bytes
        let blocks = (compressed.len() - data.len()) / 5;
        assert!(blocks >= 2);
        assert_eq!(inflate_raw(&compressed), data);
    }
}
