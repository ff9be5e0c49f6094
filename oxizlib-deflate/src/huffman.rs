//! Huffman tree construction for the compressor.
//!
//! Trees are built from symbol frequencies with a binary min-heap. Ties in
//! frequency are broken by subtree depth so that the resulting lengths are
//! as flat as possible. Lengths that exceed the alphabet's limit are
//! repaired afterwards by moving leaves (the classic zlib overflow fix),
//! which keeps the code complete while only slightly lengthening it. Codes
//! are then assigned canonically and stored bit-reversed.

use crate::tables::{
    BL_CODES, D_CODES, EXTRA_BLBITS, EXTRA_DBITS, EXTRA_LBITS, HEAP_SIZE, L_CODES, LITERALS,
    MAX_BITS, MAX_BL_BITS, STATIC_DTREE, STATIC_LTREE, StaticCode, bi_reverse,
};

/// The three alphabets a deflate block transmits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    /// Literal/length alphabet (286 symbols).
    LitLen,
    /// Distance alphabet (30 symbols).
    Distance,
    /// Bit-length alphabet (19 symbols).
    BitLength,
}

impl TreeKind {
    /// Number of symbols.
    pub fn elems(self) -> usize {
        match self {
            Self::LitLen => L_CODES,
            Self::Distance => D_CODES,
            Self::BitLength => BL_CODES,
        }
    }

    /// Maximum code length.
    pub fn max_length(self) -> usize {
        match self {
            Self::LitLen | Self::Distance => MAX_BITS,
            Self::BitLength => MAX_BL_BITS,
        }
    }

    fn extra_bits(self) -> &'static [u8] {
        match self {
            Self::LitLen => &EXTRA_LBITS,
            Self::Distance => &EXTRA_DBITS,
            Self::BitLength => &EXTRA_BLBITS,
        }
    }

    /// First symbol that carries extra bits.
    fn extra_base(self) -> usize {
        match self {
            Self::LitLen => LITERALS + 1,
            Self::Distance | Self::BitLength => 0,
        }
    }

    fn static_tree(self) -> Option<&'static [StaticCode]> {
        match self {
            Self::LitLen => Some(&STATIC_LTREE),
            Self::Distance => Some(&STATIC_DTREE),
            Self::BitLength => None,
        }
    }
}

/// A dynamic Huffman tree: per-node frequency, parent, length and code.
///
/// Nodes `0..elems` are leaves; internal nodes are numbered from `elems`.
#[derive(Debug, Clone)]
pub struct Tree {
    /// Frequency of each node.
    pub freq: Vec<u32>,
    /// Code length of each leaf.
    pub len: Vec<u8>,
    /// Bit-reversed code of each leaf.
    pub code: Vec<u16>,
    dad: Vec<u16>,
    /// Largest symbol with a nonzero frequency.
    pub max_code: usize,
    kind: TreeKind,
}

impl Tree {
    /// Create an empty tree for the given alphabet.
    pub fn new(kind: TreeKind) -> Self {
        let nodes = 2 * kind.elems() + 1;
        Self {
            freq: vec![0; nodes],
            len: vec![0; nodes],
            code: vec![0; nodes],
            dad: vec![0; nodes],
            max_code: 0,
            kind,
        }
    }

    /// Which alphabet this tree codes.
    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// Zero all leaf frequencies.
    pub fn clear_freqs(&mut self) {
        let elems = self.kind.elems();
        self.freq[..elems].fill(0);
    }
}

/// Estimated bit costs of the current block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCost {
    /// Bit length of the block with the dynamic trees.
    pub opt_len: i64,
    /// Bit length of the block with the static trees.
    pub static_len: i64,
}

/// Scratch space shared by all tree builds: heap, depths and length counts.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    heap: [usize; HEAP_SIZE],
    heap_len: usize,
    heap_max: usize,
    depth: [u8; HEAP_SIZE],
    bl_count: [u16; MAX_BITS + 1],
}

impl Default for HuffmanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self {
            heap: [0; HEAP_SIZE],
            heap_len: 0,
            heap_max: 0,
            depth: [0; HEAP_SIZE],
            bl_count: [0; MAX_BITS + 1],
        }
    }

    #[inline]
    fn smaller(tree: &Tree, depth: &[u8], n: usize, m: usize) -> bool {
        tree.freq[n] < tree.freq[m] || (tree.freq[n] == tree.freq[m] && depth[n] <= depth[m])
    }

    /// Restore the heap property by sifting node `k` down.
    fn pqdownheap(&mut self, tree: &Tree, mut k: usize) {
        let v = self.heap[k];
        let mut j = k << 1;
        while j <= self.heap_len {
            if j < self.heap_len
                && Self::smaller(tree, &self.depth, self.heap[j + 1], self.heap[j])
            {
                j += 1;
            }
            if Self::smaller(tree, &self.depth, v, self.heap[j]) {
                break;
            }
            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }
        self.heap[k] = v;
    }

    /// Build `tree` from its frequencies: set lengths and codes, update
    /// `tree.max_code` and add this tree's share to `cost`.
    pub fn build(&mut self, tree: &mut Tree, cost: &mut BlockCost) {
        let kind = tree.kind;
        let elems = kind.elems();
        let stree = kind.static_tree();
        let mut max_code: isize = -1;

        self.heap_len = 0;
        self.heap_max = HEAP_SIZE;

        for n in 0..elems {
            if tree.freq[n] != 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = n;
                max_code = n as isize;
                self.depth[n] = 0;
            } else {
                tree.len[n] = 0;
            }
        }

        // Force at least two codes of nonzero frequency
        while self.heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            self.heap_len += 1;
            self.heap[self.heap_len] = node;
            tree.freq[node] = 1;
            self.depth[node] = 0;
            cost.opt_len -= 1;
            if let Some(stree) = stree {
                cost.static_len -= i64::from(stree[node].len);
            }
        }
        let max_code = max_code as usize;
        tree.max_code = max_code;

        for n in (1..=self.heap_len / 2).rev() {
            self.pqdownheap(tree, n);
        }

        // Repeatedly combine the two least frequent nodes
        let mut node = elems;
        loop {
            let n = self.heap[1];
            self.heap[1] = self.heap[self.heap_len];
            self.heap_len -= 1;
            self.pqdownheap(tree, 1);
            let m = self.heap[1];

            self.heap_max -= 1;
            self.heap[self.heap_max] = n;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m;

            tree.freq[node] = tree.freq[n] + tree.freq[m];
            self.depth[node] = self.depth[n].max(self.depth[m]) + 1;
            tree.dad[n] = node as u16;
            tree.dad[m] = node as u16;

            self.heap[1] = node;
            node += 1;
            self.pqdownheap(tree, 1);

            if self.heap_len < 2 {
                break;
            }
        }

        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[1];

        self.gen_bitlen(tree, cost);
        gen_codes(tree, max_code, &self.bl_count);
    }

    /// Compute optimal bit lengths, limited to the alphabet's maximum.
    fn gen_bitlen(&mut self, tree: &mut Tree, cost: &mut BlockCost) {
        let kind = tree.kind;
        let max_length = kind.max_length();
        let extra = kind.extra_bits();
        let base = kind.extra_base();
        let stree = kind.static_tree();
        let max_code = tree.max_code;

        self.bl_count = [0; MAX_BITS + 1];

        // Walk from the root down, so every parent length is known
        tree.len[self.heap[self.heap_max]] = 0;
        let mut overflow = 0usize;

        for h in self.heap_max + 1..HEAP_SIZE {
            let n = self.heap[h];
            let mut bits = tree.len[tree.dad[n] as usize] as usize + 1;
            if bits > max_length {
                bits = max_length;
                overflow += 1;
            }
            tree.len[n] = bits as u8;

            if n > max_code {
                continue;
            }

            self.bl_count[bits] += 1;
            let xbits = if n >= base {
                extra[n - base] as usize
            } else {
                0
            };
            let f = i64::from(tree.freq[n]);
            cost.opt_len += f * (bits + xbits) as i64;
            if let Some(stree) = stree {
                cost.static_len += f * (stree[n].len as usize + xbits) as i64;
            }
        }
        if overflow == 0 {
            return;
        }

        tracing::trace!(?kind, overflow, "limiting huffman code lengths");

        // Move leaves from the deepest level up until the code fits
        loop {
            let mut bits = max_length - 1;
            while self.bl_count[bits] == 0 {
                bits -= 1;
            }
            self.bl_count[bits] -= 1;
            self.bl_count[bits + 1] += 2;
            self.bl_count[max_length] -= 1;
            overflow = overflow.saturating_sub(2);
            if overflow == 0 {
                break;
            }
        }

        // Reassign lengths to leaves in frequency order
        let mut h = HEAP_SIZE;
        for bits in (1..=max_length).rev() {
            let mut n = self.bl_count[bits];
            while n != 0 {
                h -= 1;
                let m = self.heap[h];
                if m > max_code {
                    continue;
                }
                if tree.len[m] as usize != bits {
                    let delta = bits as i64 - i64::from(tree.len[m]);
                    cost.opt_len += delta * i64::from(tree.freq[m]);
                    tree.len[m] = bits as u8;
                }
                n -= 1;
            }
        }
    }
}

/// Assign canonical codes to the leaves `0..=max_code` from their lengths.
fn gen_codes(tree: &mut Tree, max_code: usize, bl_count: &[u16; MAX_BITS + 1]) {
    let mut next_code = [0u16; MAX_BITS + 1];
    let mut code: u32 = 0;
    for bits in 1..=MAX_BITS {
        code = (code + u32::from(bl_count[bits - 1])) << 1;
        next_code[bits] = code as u16;
    }

    for n in 0..=max_code {
        let len = tree.len[n] as usize;
        if len == 0 {
            continue;
        }
        tree.code[n] = bi_reverse(u32::from(next_code[len]), len as u32);
        next_code[len] = next_code[len].wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft_sum(tree: &Tree) -> f64 {
        (0..=tree.max_code)
            .filter(|&n| tree.len[n] > 0)
            .map(|n| 2f64.powi(-i32::from(tree.len[n])))
            .sum()
    }

    #[test]
    fn test_frequent_symbols_get_short_codes() {
        let mut tree = Tree::new(TreeKind::Distance);
        tree.freq[0] = 100;
        tree.freq[1] = 50;
        tree.freq[2] = 25;
        tree.freq[3] = 25;

        let mut builder = HuffmanBuilder::new();
        let mut cost = BlockCost::default();
        builder.build(&mut tree, &mut cost);

        assert_eq!(tree.max_code, 3);
        assert_eq!(&tree.len[..4], &[1, 2, 3, 3]);
        assert_eq!(cost.opt_len, 100 + 50 * 2 + 25 * 3 + 25 * 3);
        assert!((kraft_sum(&tree) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_symbol_forces_second_leaf() {
        let mut tree = Tree::new(TreeKind::Distance);
        tree.freq[5] = 10;

        let mut builder = HuffmanBuilder::new();
        let mut cost = BlockCost::default();
        builder.build(&mut tree, &mut cost);

        let used: Vec<usize> = (0..D_CODES).filter(|&n| tree.len[n] > 0).collect();
        assert_eq!(used.len(), 2);
        assert_eq!(tree.len[5], 1);
        assert_eq!(tree.max_code, 5);
    }

    #[test]
    fn test_empty_tree_gets_two_leaves() {
        let mut tree = Tree::new(TreeKind::Distance);
        let mut builder = HuffmanBuilder::new();
        let mut cost = BlockCost::default();
        builder.build(&mut tree, &mut cost);

        assert_eq!(tree.len[0], 1);
        assert_eq!(tree.len[1], 1);
        assert_eq!(tree.max_code, 1);
    }

    #[test]
    fn test_length_limit_enforced() {
        // Fibonacci frequencies produce a maximally skewed tree
        let mut tree = Tree::new(TreeKind::BitLength);
        let (mut a, mut b) = (1u32, 1u32);
        for n in 0..BL_CODES {
            tree.freq[n] = a;
            let next = a + b;
            a = b;
            b = next;
        }

        let mut builder = HuffmanBuilder::new();
        let mut cost = BlockCost::default();
        builder.build(&mut tree, &mut cost);

        assert!((0..BL_CODES).all(|n| tree.len[n] as usize <= MAX_BL_BITS));
        assert!((0..BL_CODES).all(|n| tree.len[n] > 0));
        assert!((kraft_sum(&tree) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_codes_are_canonical_and_prefix_free() {
        let mut tree = Tree::new(TreeKind::LitLen);
        for (n, f) in tree.freq.iter_mut().take(L_CODES).enumerate() {
            *f = (n as u32 % 17) + 1;
        }

        let mut builder = HuffmanBuilder::new();
        let mut cost = BlockCost::default();
        builder.build(&mut tree, &mut cost);

        // Undo the bit reversal and check no code prefixes another
        let codes: Vec<(u32, u8)> = (0..L_CODES)
            .map(|n| {
                let len = tree.len[n];
                (u32::from(bi_reverse(u32::from(tree.code[n]), u32::from(len))), len)
            })
            .collect();
        for (i, &(ci, li)) in codes.iter().enumerate() {
            for (j, &(cj, lj)) in codes.iter().enumerate() {
                if i != j && li <= lj {
                    assert_ne!(cj >> (lj - li), ci, "code {i} prefixes code {j}");
                }
            }
        }
        assert!(cost.static_len > 0);
    }
}
