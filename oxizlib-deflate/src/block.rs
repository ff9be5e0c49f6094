//! Block encoder: symbol tally, block type selection and bit emission.
//!
//! The matcher records literals and matches here. When the symbol buffer
//! fills, or the caller flushes, the block is closed: dynamic trees are built
//! from the tallied frequencies and the cheapest of a stored, a static-tree
//! or a dynamic-tree block is written to the pending output.

use crate::config::CompressionStrategy;
use crate::huffman::{BlockCost, HuffmanBuilder, Tree, TreeKind};
use crate::tables::{
    BASE_DIST, BASE_LENGTH, BL_CODES, BL_ORDER, DYN_TREES, END_BLOCK, EXTRA_DBITS, EXTRA_LBITS,
    LENGTH_CODE, LITERALS, MIN_MATCH, REP_3_6, REPZ_3_10, REPZ_11_138, STATIC_DTREE, STATIC_LTREE,
    STATIC_TREES, STORED_BLOCK, StaticCode, d_code,
};
use oxizlib_core::bitstream::BitWriter;
use oxizlib_core::stream::StreamBuffers;

/// Best guess at the kind of data being compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    /// Contains control characters other than tab, newline and carriage return.
    Binary = 0,
    /// Printable text.
    Text = 1,
    /// No block has been examined yet.
    #[default]
    Unknown = 2,
}

impl DataType {
    /// Control characters that mark data as binary (bit n set for byte n).
    const BLOCK_MASK: u32 = 0xF3FF_C07F;

    /// Classify bytes directly, with the same rule the encoder applies to
    /// literal frequencies.
    pub fn detect(data: &[u8]) -> Self {
        let mut seen = [false; 256];
        for &b in data {
            seen[usize::from(b)] = true;
        }
        Self::classify(|byte| seen[byte])
    }

    fn classify(present: impl Fn(usize) -> bool) -> Self {
        if (0..32).any(|n| (Self::BLOCK_MASK >> n) & 1 != 0 && present(n)) {
            return Self::Binary;
        }
        if present(9) || present(10) || present(13) || (32..LITERALS).any(&present) {
            return Self::Text;
        }
        Self::Binary
    }
}

/// One tallied symbol: a literal (`dist == 0`) or a match.
#[derive(Debug, Clone, Copy, Default)]
struct Symbol {
    /// Match distance, 0 for a literal.
    dist: u16,
    /// Literal byte or match length minus `MIN_MATCH`.
    lc: u8,
}

/// Anything that maps a symbol to a bit-reversed code and its length.
trait CodeTable {
    fn code(&self, symbol: usize) -> (u32, u32);
}

impl CodeTable for [StaticCode] {
    #[inline]
    fn code(&self, symbol: usize) -> (u32, u32) {
        let c = self[symbol];
        (u32::from(c.code), u32::from(c.len))
    }
}

impl CodeTable for Tree {
    #[inline]
    fn code(&self, symbol: usize) -> (u32, u32) {
        (u32::from(self.code[symbol]), u32::from(self.len[symbol]))
    }
}

#[inline]
fn send_code(writer: &mut BitWriter, symbol: usize, table: &(impl CodeTable + ?Sized)) {
    let (code, len) = table.code(symbol);
    writer.write_bits(code, len);
}

/// Block-level encoder state.
#[derive(Debug, Clone)]
pub struct BlockEncoder {
    /// Pending output.
    pub(crate) writer: BitWriter,
    dyn_ltree: Tree,
    dyn_dtree: Tree,
    bl_tree: Tree,
    builder: HuffmanBuilder,
    syms: Vec<Symbol>,
    /// Symbols per block before a forced flush.
    sym_end: usize,
    cost: BlockCost,
    /// Matches in the current block.
    pub(crate) matches: usize,
    pub(crate) level: u8,
    pub(crate) strategy: CompressionStrategy,
    data_type: DataType,
}

impl BlockEncoder {
    /// Create an encoder whose symbol buffer holds `lit_bufsize - 1` symbols.
    pub fn new(lit_bufsize: usize, level: u8, strategy: CompressionStrategy) -> Self {
        let mut encoder = Self {
            writer: BitWriter::with_capacity(lit_bufsize * 4),
            dyn_ltree: Tree::new(TreeKind::LitLen),
            dyn_dtree: Tree::new(TreeKind::Distance),
            bl_tree: Tree::new(TreeKind::BitLength),
            builder: HuffmanBuilder::new(),
            syms: Vec::with_capacity(lit_bufsize),
            sym_end: lit_bufsize - 1,
            cost: BlockCost::default(),
            matches: 0,
            level,
            strategy,
            data_type: DataType::Unknown,
        };
        encoder.init_block();
        encoder
    }

    /// Discard pending output and start a fresh first block.
    pub fn reset(&mut self) {
        self.writer.reset();
        self.data_type = DataType::Unknown;
        self.init_block();
    }

    /// Data type detected from the first compressed block.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Clear the tallies for a new block.
    fn init_block(&mut self) {
        self.dyn_ltree.clear_freqs();
        self.dyn_dtree.clear_freqs();
        self.bl_tree.clear_freqs();
        self.dyn_ltree.freq[END_BLOCK] = 1;
        self.cost = BlockCost::default();
        self.syms.clear();
        self.matches = 0;
    }

    /// Whether any symbols are tallied in the current block.
    pub fn has_symbols(&self) -> bool {
        !self.syms.is_empty()
    }

    /// Tally a literal. Returns `true` when the block must be flushed.
    #[inline]
    pub fn tally_lit(&mut self, byte: u8) -> bool {
        self.syms.push(Symbol { dist: 0, lc: byte });
        self.dyn_ltree.freq[usize::from(byte)] += 1;
        self.syms.len() == self.sym_end
    }

    /// Tally a match of `len` bytes (3-258) at distance `dist`. Returns
    /// `true` when the block must be flushed.
    #[inline]
    pub fn tally_dist(&mut self, dist: usize, len: usize) -> bool {
        let lc = len - MIN_MATCH;
        self.syms.push(Symbol {
            dist: dist as u16,
            lc: lc as u8,
        });
        self.matches += 1;
        self.dyn_ltree.freq[usize::from(LENGTH_CODE[lc]) + LITERALS + 1] += 1;
        self.dyn_dtree.freq[d_code(dist - 1)] += 1;
        self.syms.len() == self.sym_end
    }

    /// Write a stored block holding `data`.
    pub fn stored_block(&mut self, data: &[u8], last: bool) {
        let len = data.len() as u16;
        self.writer.write_bits((STORED_BLOCK << 1) | u32::from(last), 3);
        self.writer.align_to_byte();
        self.writer.write_bytes(&len.to_le_bytes());
        self.writer.write_bytes(&(!len).to_le_bytes());
        self.writer.write_bytes(data);
    }

    /// Write an empty static block, giving the decoder enough lookahead to
    /// finish the previous block.
    pub fn align(&mut self) {
        self.writer.write_bits(STATIC_TREES << 1, 3);
        send_code(&mut self.writer, END_BLOCK, &STATIC_LTREE[..]);
        self.writer.flush_bits();
    }

    /// Close the current block.
    ///
    /// `stored` is the block's raw input when it is still in the window,
    /// `stored_len` its length. The smallest of the three encodings is
    /// chosen; with equal estimates static trees win over dynamic ones.
    pub fn flush_block(&mut self, stored: Option<&[u8]>, stored_len: usize, last: bool) {
        let mut max_blindex = 0;
        let (opt_lenb, static_lenb) = if self.level > 0 {
            if self.data_type == DataType::Unknown {
                let freq = &self.dyn_ltree.freq;
                self.data_type = DataType::classify(|n| freq[n] != 0);
            }

            self.builder.build(&mut self.dyn_ltree, &mut self.cost);
            self.builder.build(&mut self.dyn_dtree, &mut self.cost);
            max_blindex = self.build_bl_tree();

            let dynamic = ((self.cost.opt_len + 3 + 7) >> 3) as usize;
            let fixed = ((self.cost.static_len + 3 + 7) >> 3) as usize;
            if fixed <= dynamic || self.strategy == CompressionStrategy::Fixed {
                (fixed, fixed)
            } else {
                (dynamic, fixed)
            }
        } else {
            (stored_len + 5, stored_len + 5)
        };

        let kind = match stored {
            Some(data) if stored_len + 4 <= opt_lenb => {
                self.stored_block(data, last);
                "stored"
            }
            _ if static_lenb == opt_lenb => {
                self.writer.write_bits((STATIC_TREES << 1) | u32::from(last), 3);
                compress_block(&mut self.writer, &self.syms, &STATIC_LTREE[..], &STATIC_DTREE[..]);
                "static"
            }
            _ => {
                self.writer.write_bits((DYN_TREES << 1) | u32::from(last), 3);
                self.send_all_trees(
                    self.dyn_ltree.max_code + 1,
                    self.dyn_dtree.max_code + 1,
                    max_blindex + 1,
                );
                compress_block(&mut self.writer, &self.syms, &self.dyn_ltree, &self.dyn_dtree);
                "dynamic"
            }
        };
        tracing::debug!(
            block = kind,
            stored_len,
            static_len = static_lenb,
            opt_len = opt_lenb,
            last,
            "block emitted"
        );

        self.init_block();
        if last {
            self.writer.align_to_byte();
        }
    }

    /// Tally the run-length coded lengths of `tree` into the bit-length tree.
    fn scan_tree(bl_tree: &mut Tree, tree: &Tree) {
        for_each_run(&tree.len, tree.max_code, |run| match run {
            Run::Plain { len, count } => bl_tree.freq[len] += count as u32,
            Run::Repeat { len, emit_len, .. } => {
                if emit_len {
                    bl_tree.freq[len] += 1;
                }
                bl_tree.freq[REP_3_6] += 1;
            }
            Run::ShortZeros { .. } => bl_tree.freq[REPZ_3_10] += 1,
            Run::LongZeros { .. } => bl_tree.freq[REPZ_11_138] += 1,
        });
    }

    /// Send the run-length coded lengths of `tree` with the bit-length code.
    fn send_tree(writer: &mut BitWriter, bl_tree: &Tree, tree: &Tree) {
        for_each_run(&tree.len, tree.max_code, |run| match run {
            Run::Plain { len, count } => {
                for _ in 0..count {
                    send_code(writer, len, bl_tree);
                }
            }
            Run::Repeat {
                len,
                count,
                emit_len,
            } => {
                if emit_len {
                    send_code(writer, len, bl_tree);
                }
                send_code(writer, REP_3_6, bl_tree);
                writer.write_bits(count as u32 - 3, 2);
            }
            Run::ShortZeros { count } => {
                send_code(writer, REPZ_3_10, bl_tree);
                writer.write_bits(count as u32 - 3, 3);
            }
            Run::LongZeros { count } => {
                send_code(writer, REPZ_11_138, bl_tree);
                writer.write_bits(count as u32 - 11, 7);
            }
        });
    }

    /// Build the bit-length tree and return the index in `BL_ORDER` of the
    /// last length to transmit.
    fn build_bl_tree(&mut self) -> usize {
        Self::scan_tree(&mut self.bl_tree, &self.dyn_ltree);
        Self::scan_tree(&mut self.bl_tree, &self.dyn_dtree);
        self.builder.build(&mut self.bl_tree, &mut self.cost);

        // At least 4 bit-length codes are always sent
        let mut max_blindex = BL_CODES - 1;
        while max_blindex >= 3 && self.bl_tree.len[BL_ORDER[max_blindex]] == 0 {
            max_blindex -= 1;
        }
        self.cost.opt_len += 3 * (max_blindex as i64 + 1) + 5 + 5 + 4;
        max_blindex
    }

    /// Send the dynamic block header: counts, bit-length code, then the
    /// literal/length and distance code lengths.
    fn send_all_trees(&mut self, lcodes: usize, dcodes: usize, blcodes: usize) {
        let writer = &mut self.writer;
        writer.write_bits(lcodes as u32 - 257, 5);
        writer.write_bits(dcodes as u32 - 1, 5);
        writer.write_bits(blcodes as u32 - 4, 4);
        for &symbol in &BL_ORDER[..blcodes] {
            writer.write_bits(u32::from(self.bl_tree.len[symbol]), 3);
        }
        Self::send_tree(writer, &self.bl_tree, &self.dyn_ltree);
        Self::send_tree(writer, &self.bl_tree, &self.dyn_dtree);
    }

    /// Copy as much pending output as fits into `bufs`. Returns the number
    /// of bytes copied.
    pub fn flush_pending(&mut self, bufs: &mut StreamBuffers<'_>) -> usize {
        let n = self.writer.drain_into(bufs.output_mut());
        bufs.advance_output(n);
        n
    }

    /// Complete bytes waiting for output space.
    pub fn pending_bytes(&self) -> usize {
        self.writer.pending_len()
    }

    /// Size of the pending buffer a stored block must fit in.
    pub fn pending_buf_size(&self) -> usize {
        (self.sym_end + 1) * 4
    }
}

/// Emit every tallied symbol, then the end-of-block code.
fn compress_block(
    writer: &mut BitWriter,
    syms: &[Symbol],
    ltree: &(impl CodeTable + ?Sized),
    dtree: &(impl CodeTable + ?Sized),
) {
    for sym in syms {
        if sym.dist == 0 {
            send_code(writer, usize::from(sym.lc), ltree);
            continue;
        }

        let lc = usize::from(sym.lc);
        let code = usize::from(LENGTH_CODE[lc]);
        send_code(writer, code + LITERALS + 1, ltree);
        let extra = u32::from(EXTRA_LBITS[code]);
        if extra != 0 {
            writer.write_bits((lc - usize::from(BASE_LENGTH[code])) as u32, extra);
        }

        let dist = usize::from(sym.dist) - 1;
        let code = d_code(dist);
        send_code(writer, code, dtree);
        let extra = u32::from(EXTRA_DBITS[code]);
        if extra != 0 {
            writer.write_bits((dist - usize::from(BASE_DIST[code])) as u32, extra);
        }
    }
    send_code(writer, END_BLOCK, ltree);
}

/// A run of equal code lengths, as the bit-length alphabet encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    /// `count` lengths sent individually.
    Plain { len: usize, count: usize },
    /// Nonzero length repeated `count` (3-6) times with code 16, preceded by
    /// the length itself when it differs from the previous run.
    Repeat {
        len: usize,
        count: usize,
        emit_len: bool,
    },
    /// 3-10 zeros, code 17.
    ShortZeros { count: usize },
    /// 11-138 zeros, code 18.
    LongZeros { count: usize },
}

/// Split `lens[..=max_code]` into runs.
fn for_each_run(lens: &[u8], max_code: usize, mut f: impl FnMut(Run)) {
    let mut prevlen: i32 = -1;
    let mut nextlen = i32::from(lens[0]);
    let mut count = 0usize;
    let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

    for n in 0..=max_code {
        let curlen = nextlen;
        // Past the last code the sentinel never equals a real length
        nextlen = if n < max_code {
            i32::from(lens[n + 1])
        } else {
            -1
        };
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        }

        let len = curlen as usize;
        if count < min_count {
            f(Run::Plain { len, count });
        } else if curlen != 0 {
            let emit_len = curlen != prevlen;
            f(Run::Repeat {
                len,
                count: if emit_len { count - 1 } else { count },
                emit_len,
            });
        } else if count <= 10 {
            f(Run::ShortZeros { count });
        } else {
            f(Run::LongZeros { count });
        }

        count = 0;
        prevlen = curlen;
        (max_count, min_count) = if nextlen == 0 {
            (138, 3)
        } else if curlen == nextlen {
            (6, 3)
        } else {
            (7, 4)
        };
    }
}
