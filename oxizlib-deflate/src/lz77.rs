//! LZ77 sliding window and hash-chain match finder.
//!
//! # Algorithm
//!
//! The window holds `2 * w_size` bytes. Input is appended after the current
//! position; once the position reaches the upper half the whole window slides
//! down by `w_size` and every stored position is rebased. Each 3-byte string
//! is hashed with a rolling hash into `head`, and `prev[pos & w_mask]` links
//! it to the previous position with the same hash, newest first. Position 0
//! doubles as the empty-chain marker, so a string at position 0 can never be
//! matched; this costs nothing measurable.
//!
//! The longest-match search walks that chain, bounded by `max_chain` and by
//! `nice_match`, and never reports a match longer than the bytes actually
//! available.

use crate::config::LevelConfig;
use crate::tables::{MAX_MATCH, MIN_LOOKAHEAD, MIN_MATCH};
use oxizlib_core::stream::{StreamBuffers, StreamContext};

/// Matches of exactly `MIN_MATCH` bytes farther back than this are not worth
/// their distance code.
pub const TOO_FAR: usize = 4096;

/// Bytes past the data that are kept zeroed so comparisons read defined
/// values.
const WIN_INIT: usize = MAX_MATCH;

/// Empty hash chain marker.
const NIL: u16 = 0;

/// Sliding window, hash chains and match-search state.
#[derive(Debug, Clone)]
pub struct MatchFinder {
    /// Window size (one half of the buffer).
    pub(crate) w_size: usize,
    w_bits: u32,
    w_mask: usize,
    /// Logical window length, `2 * w_size`.
    pub(crate) window_size: usize,
    /// Window bytes. Allocated with `MAX_MATCH` bytes of slack past
    /// `window_size` so comparisons near the end stay in bounds.
    pub(crate) window: Vec<u8>,
    prev: Vec<u16>,
    head: Vec<u16>,

    ins_h: usize,
    hash_bits: u32,
    hash_mask: usize,
    hash_shift: u32,

    /// Window position where the current block starts; negative once the
    /// block's first bytes have slid out of the window.
    pub(crate) block_start: isize,
    /// Position of the string being matched.
    pub(crate) strstart: usize,
    /// Start of the last match found.
    pub(crate) match_start: usize,
    /// Valid bytes ahead of `strstart`.
    pub(crate) lookahead: usize,
    /// Length of the last match found.
    pub(crate) match_length: usize,
    /// Lazy matcher: previous match length and start.
    pub(crate) prev_length: usize,
    pub(crate) prev_match: usize,
    /// Lazy matcher: a literal at `strstart - 1` is still owed.
    pub(crate) match_available: bool,
    /// Strings at the end of the data not yet inserted in the hash table.
    pub(crate) insert: usize,
    /// High water mark of initialized window bytes.
    high_water: usize,

    pub(crate) max_chain_length: usize,
    /// Lazy matcher: don't search when the previous match reached this.
    /// Greedy matcher: insert all strings of matches up to this length.
    pub(crate) max_lazy_match: usize,
    pub(crate) good_match: usize,
    pub(crate) nice_match: usize,
}

impl MatchFinder {
    /// Create a match finder with a `1 << w_bits` window and
    /// `1 << (mem_level + 7)` hash buckets.
    pub fn new(w_bits: u32, mem_level: u32) -> Self {
        let w_size = 1usize << w_bits;
        let hash_bits = mem_level + 7;
        let hash_size = 1usize << hash_bits;
        Self {
            w_size,
            w_bits,
            w_mask: w_size - 1,
            window_size: 2 * w_size,
            window: vec![0; 2 * w_size + MAX_MATCH],
            prev: vec![NIL; w_size],
            head: vec![NIL; hash_size],
            ins_h: 0,
            hash_bits,
            hash_mask: hash_size - 1,
            hash_shift: hash_bits.div_ceil(3),
            block_start: 0,
            strstart: 0,
            match_start: 0,
            lookahead: 0,
            match_length: MIN_MATCH - 1,
            prev_length: MIN_MATCH - 1,
            prev_match: 0,
            match_available: false,
            insert: 0,
            high_water: 0,
            max_chain_length: 0,
            max_lazy_match: 0,
            good_match: 0,
            nice_match: 0,
        }
    }

    /// log2 of the window size.
    pub fn w_bits(&self) -> u32 {
        self.w_bits
    }

    /// log2 of the number of hash buckets.
    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }

    /// Farthest distance a match may reach while keeping `MIN_LOOKAHEAD`
    /// bytes of lookahead in the window.
    #[inline]
    pub fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    /// Start a new stream: empty window and hash table.
    pub fn reset(&mut self, config: &LevelConfig) {
        self.clear_hash();
        self.set_config(config);
        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.insert = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
        self.ins_h = 0;
    }

    /// Load the matcher parameters of a level.
    pub fn set_config(&mut self, config: &LevelConfig) {
        self.max_lazy_match = usize::from(config.max_lazy);
        self.good_match = usize::from(config.good_length);
        self.nice_match = usize::from(config.nice_length);
        self.max_chain_length = usize::from(config.max_chain);
    }

    /// Forget all hash chains.
    pub fn clear_hash(&mut self) {
        self.head.fill(NIL);
    }

    /// Rebase the hash tables after the window slid down by `w_size`.
    fn slide_hash(&mut self) {
        let w_size = self.w_size;
        let rebase = |pos: &mut u16| {
            *pos = if usize::from(*pos) >= w_size {
                (usize::from(*pos) - w_size) as u16
            } else {
                NIL
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Roll `byte` into the running hash.
    #[inline]
    fn update_hash(&mut self, byte: u8) {
        self.ins_h = ((self.ins_h << self.hash_shift) ^ usize::from(byte)) & self.hash_mask;
    }

    /// Insert the string at `pos` and return the previous head of its chain.
    ///
    /// The running hash must already cover the two bytes at `pos`.
    #[inline]
    pub fn insert_string(&mut self, pos: usize) -> usize {
        self.update_hash(self.window[pos + MIN_MATCH - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        usize::from(head)
    }

    /// Restart the running hash at `pos` from its first two bytes.
    #[inline]
    pub fn reset_hash_at(&mut self, pos: usize) {
        self.ins_h = usize::from(self.window[pos]);
        self.update_hash(self.window[pos + 1]);
    }

    /// Slide the window if needed and read input until at least
    /// `MIN_LOOKAHEAD` bytes are ahead of `strstart` or the input runs out.
    ///
    /// Bytes read are folded into `ctx`'s checksum when a context is given.
    pub fn fill_window(
        &mut self,
        bufs: &mut StreamBuffers<'_>,
        mut ctx: Option<&mut StreamContext>,
    ) {
        let w_size = self.w_size;
        loop {
            let mut more = self.window_size - self.lookahead - self.strstart;

            if self.strstart >= w_size + self.max_dist() {
                self.window.copy_within(w_size..w_size + w_size - more, 0);
                self.match_start = self.match_start.saturating_sub(w_size);
                self.strstart -= w_size;
                self.block_start -= w_size as isize;
                if self.insert > self.strstart {
                    self.insert = self.strstart;
                }
                self.slide_hash();
                more += w_size;
                tracing::trace!(strstart = self.strstart, "window slid");
            }
            if bufs.avail_in() == 0 {
                break;
            }

            let start = self.strstart + self.lookahead;
            let n = bufs.read_input(&mut self.window[start..start + more]);
            if let Some(ctx) = ctx.as_deref_mut() {
                ctx.update_checksum(&self.window[start..start + n]);
            }
            self.lookahead += n;

            // Hash the strings left over from the previous fill
            if self.lookahead + self.insert >= MIN_MATCH {
                let mut s = self.strstart - self.insert;
                self.reset_hash_at(s);
                while self.insert > 0 {
                    self.insert_string(s);
                    s += 1;
                    self.insert -= 1;
                    if self.lookahead + self.insert < MIN_MATCH {
                        break;
                    }
                }
            }

            if self.lookahead >= MIN_LOOKAHEAD || bufs.avail_in() == 0 {
                break;
            }
        }

        self.zero_beyond_data();
    }

    /// Keep `WIN_INIT` bytes past the data initialized.
    fn zero_beyond_data(&mut self) {
        if self.high_water >= self.window_size {
            return;
        }
        let curr = self.strstart + self.lookahead;
        if self.high_water < curr {
            let init = (self.window_size - curr).min(WIN_INIT);
            self.window[curr..curr + init].fill(0);
            self.high_water = curr + init;
        } else if self.high_water < curr + WIN_INIT {
            let init = (curr + WIN_INIT - self.high_water).min(self.window_size - self.high_water);
            self.window[self.high_water..self.high_water + init].fill(0);
            self.high_water += init;
        }
    }

    /// Find the longest match for the string at `strstart`, starting the
    /// chain walk at `cur_match`.
    ///
    /// Only matches longer than `prev_length` are reported. On success
    /// `match_start` is set. The result never exceeds `lookahead`.
    pub fn longest_match(&mut self, mut cur_match: usize) -> usize {
        let mut chain_length = self.max_chain_length;
        let strstart = self.strstart;
        // The fast routine leaves a zero length behind; the scan needs two bytes
        let mut best_len = self.prev_length.max(MIN_MATCH - 1);
        let mut nice_match = self.nice_match;
        let limit = strstart.saturating_sub(self.max_dist());

        if self.prev_length >= self.good_match {
            chain_length >>= 2;
        }
        if nice_match > self.lookahead {
            nice_match = self.lookahead;
        }

        let window = &self.window;
        let scan = &window[strstart..strstart + MAX_MATCH];
        let mut scan_end1 = scan[best_len - 1];
        let mut scan_end = scan[best_len];

        loop {
            let candidate = &window[cur_match..cur_match + MAX_MATCH];

            // Reject on the bytes that would extend the best match first
            if candidate[best_len] == scan_end
                && candidate[best_len - 1] == scan_end1
                && candidate[0] == scan[0]
                && candidate[1] == scan[1]
            {
                let len = 2 + scan[2..]
                    .iter()
                    .zip(&candidate[2..])
                    .take_while(|(a, b)| a == b)
                    .count();

                if len > best_len {
                    self.match_start = cur_match;
                    best_len = len;
                    if len >= nice_match {
                        break;
                    }
                    scan_end1 = scan[best_len - 1];
                    scan_end = scan[best_len];
                }
            }

            cur_match = usize::from(self.prev[cur_match & self.w_mask]);
            if cur_match <= limit || chain_length <= 1 {
                break;
            }
            chain_length -= 1;
        }

        best_len.min(self.lookahead)
    }

    /// Install `dict` as history ahead of any input.
    ///
    /// Only the last `w_size` bytes are kept. The caller has checked that no
    /// input is pending in the window.
    pub fn load_dictionary(&mut self, dict: &[u8], fresh: bool) {
        let mut dict = dict;
        if dict.len() >= self.w_size {
            if fresh {
                self.clear_hash();
                self.strstart = 0;
                self.block_start = 0;
                self.insert = 0;
            }
            dict = &dict[dict.len() - self.w_size..];
        }

        let mut sink = [0u8; 0];
        let mut bufs = StreamBuffers::new(dict, &mut sink);
        self.fill_window(&mut bufs, None);
        while self.lookahead >= MIN_MATCH {
            let mut s = self.strstart;
            let mut n = self.lookahead - (MIN_MATCH - 1);
            while n > 0 {
                self.insert_string(s);
                s += 1;
                n -= 1;
            }
            self.strstart = s;
            self.lookahead = MIN_MATCH - 1;
            self.fill_window(&mut bufs, None);
        }
        self.strstart += self.lookahead;
        self.block_start = self.strstart as isize;
        self.insert = self.lookahead;
        self.lookahead = 0;
        self.match_length = MIN_MATCH - 1;
        self.prev_length = MIN_MATCH - 1;
        self.match_available = false;
    }

    /// Up to `w_size` most recent window bytes (dictionary plus data).
    pub fn dictionary(&self) -> &[u8] {
        let end = self.strstart + self.lookahead;
        let len = end.min(self.w_size);
        &self.window[end - len..end]
    }
}
