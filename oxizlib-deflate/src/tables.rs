//! Constant tables for DEFLATE (RFC 1951).
//!
//! Everything the encoder needs (static trees, length/distance code maps) is
//! computed at compile time. The fixed decode tables are built once on first
//! use and shared behind a `OnceLock`.

use crate::decode_table::{Code, CodeType, ENOUGH_DISTS, ENOUGH_LENS, inflate_table};
use std::sync::OnceLock;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;
/// Maximum match length.
pub const MAX_MATCH: usize = 258;
/// Lookahead required before a match search: the largest match plus the
/// bytes needed to hash the next string.
pub const MIN_LOOKAHEAD: usize = MAX_MATCH + MIN_MATCH + 1;

/// Number of length codes, not counting the special END_BLOCK code.
pub const LENGTH_CODES: usize = 29;
/// Number of literal bytes 0..255.
pub const LITERALS: usize = 256;
/// Number of literal or length codes, including END_BLOCK.
pub const L_CODES: usize = LITERALS + 1 + LENGTH_CODES;
/// Number of distance codes.
pub const D_CODES: usize = 30;
/// Number of codes used to transfer the bit lengths.
pub const BL_CODES: usize = 19;
/// Maximum heap size.
pub const HEAP_SIZE: usize = 2 * L_CODES + 1;
/// All codes must not exceed this many bits.
pub const MAX_BITS: usize = 15;
/// Bit length codes must not exceed this many bits.
pub const MAX_BL_BITS: usize = 7;

/// End of block literal code.
pub const END_BLOCK: usize = 256;
/// Repeat previous bit length 3-6 times (2 bits of repeat count).
pub const REP_3_6: usize = 16;
/// Repeat a zero length 3-10 times (3 bits of repeat count).
pub const REPZ_3_10: usize = 17;
/// Repeat a zero length 11-138 times (7 bits of repeat count).
pub const REPZ_11_138: usize = 18;

/// Block type: stored.
pub const STORED_BLOCK: u32 = 0;
/// Block type: fixed Huffman codes.
pub const STATIC_TREES: u32 = 1;
/// Block type: dynamic Huffman codes.
pub const DYN_TREES: u32 = 2;

/// Extra bits for each length code.
pub const EXTRA_LBITS: [u8; LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

/// Extra bits for each distance code.
pub const EXTRA_DBITS: [u8; D_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Extra bits for each bit length code.
pub const EXTRA_BLBITS: [u8; BL_CODES] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

/// Order in which bit length code lengths are transmitted.
pub const BL_ORDER: [usize; BL_CODES] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// A code of a static tree: bit-reversed code and its length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticCode {
    /// Bit-reversed code, ready for LSB-first output.
    pub code: u16,
    /// Code length in bits.
    pub len: u8,
}

/// Reverse the low `len` bits of `code`.
pub const fn bi_reverse(code: u32, len: u32) -> u16 {
    let mut res = 0u32;
    let mut code = code;
    let mut i = 0;
    while i < len {
        res = (res << 1) | (code & 1);
        code >>= 1;
        i += 1;
    }
    res as u16
}

/// Fixed literal/length code lengths (RFC 1951 section 3.2.6).
pub const fn fixed_litlen_length(symbol: usize) -> u8 {
    match symbol {
        0..=143 => 8,
        144..=255 => 9,
        256..=279 => 7,
        _ => 8,
    }
}

/// Static literal/length tree (288 codes; 286 and 287 complete the code).
pub const STATIC_LTREE: [StaticCode; L_CODES + 2] = {
    let mut tree = [StaticCode { code: 0, len: 0 }; L_CODES + 2];
    let mut bl_count = [0u32; MAX_BITS + 1];
    let mut n = 0;
    while n < L_CODES + 2 {
        let len = fixed_litlen_length(n);
        tree[n].len = len;
        bl_count[len as usize] += 1;
        n += 1;
    }

    let mut next_code = [0u32; MAX_BITS + 1];
    let mut code = 0u32;
    let mut bits = 1;
    while bits <= MAX_BITS {
        code = (code + bl_count[bits - 1]) << 1;
        next_code[bits] = code;
        bits += 1;
    }

    let mut n = 0;
    while n < L_CODES + 2 {
        let len = tree[n].len as usize;
        tree[n].code = bi_reverse(next_code[len], len as u32);
        next_code[len] += 1;
        n += 1;
    }
    tree
};

/// Static distance tree: 5-bit codes, simply bit-reversed indices.
pub const STATIC_DTREE: [StaticCode; D_CODES] = {
    let mut tree = [StaticCode { code: 0, len: 0 }; D_CODES];
    let mut n = 0;
    while n < D_CODES {
        tree[n] = StaticCode {
            code: bi_reverse(n as u32, 5),
            len: 5,
        };
        n += 1;
    }
    tree
};

/// First normalized length (length - 3) for each length code.
pub const BASE_LENGTH: [u8; LENGTH_CODES] = {
    let mut base = [0u8; LENGTH_CODES];
    let mut length = 0usize;
    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        base[code] = length as u8;
        length += 1 << EXTRA_LBITS[code];
        code += 1;
    }
    // Length 258 has its own code
    base[LENGTH_CODES - 1] = 255;
    base
};

/// Length code for each normalized match length (length - 3).
pub const LENGTH_CODE: [u8; MAX_MATCH - MIN_MATCH + 1] = {
    let mut table = [0u8; MAX_MATCH - MIN_MATCH + 1];
    let mut length = 0usize;
    let mut code = 0;
    while code < LENGTH_CODES - 1 {
        let mut n = 0;
        while n < (1 << EXTRA_LBITS[code]) {
            table[length] = code as u8;
            length += 1;
            n += 1;
        }
        code += 1;
    }
    // Normalized 255 (length 258) overrides the last slot of code 27
    table[length - 1] = code as u8;
    table
};

/// First normalized distance (distance - 1) for each distance code.
pub const BASE_DIST: [u16; D_CODES] = {
    let mut base = [0u16; D_CODES];
    let mut dist = 0usize;
    let mut code = 0;
    while code < D_CODES {
        base[code] = dist as u16;
        dist += 1 << EXTRA_DBITS[code];
        code += 1;
    }
    base
};

/// Distance codes: the first 256 entries map distances 0..255 directly,
/// the last 256 map the upper 8 bits of 15-bit distances.
pub const DIST_CODE: [u8; 512] = {
    let mut table = [0u8; 512];
    let mut dist = 0usize;
    let mut code = 0;
    while code < 16 {
        let mut n = 0;
        while n < (1 << EXTRA_DBITS[code]) {
            table[dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }
    dist >>= 7;
    while code < D_CODES {
        let mut n = 0;
        while n < (1 << (EXTRA_DBITS[code] - 7)) {
            table[256 + dist] = code as u8;
            dist += 1;
            n += 1;
        }
        code += 1;
    }
    table
};

/// Distance code for a normalized distance (distance - 1).
#[inline]
pub fn d_code(dist: usize) -> usize {
    if dist < 256 {
        DIST_CODE[dist] as usize
    } else {
        DIST_CODE[256 + (dist >> 7)] as usize
    }
}

/// Convert a match length (3-258) to `(code, extra_bits, extra_value)`,
/// where `code` is the literal/length symbol (257-285).
#[inline]
pub fn length_to_code(length: usize) -> (usize, u32, u32) {
    debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&length));
    let lc = length - MIN_MATCH;
    let code = LENGTH_CODE[lc] as usize;
    let extra = u32::from(EXTRA_LBITS[code]);
    (
        code + LITERALS + 1,
        extra,
        (lc - BASE_LENGTH[code] as usize) as u32,
    )
}

/// Convert a distance (1-32768) to `(code, extra_bits, extra_value)`.
#[inline]
pub fn distance_to_code(distance: usize) -> (usize, u32, u32) {
    debug_assert!((1..=32768).contains(&distance));
    let dist = distance - 1;
    let code = d_code(dist);
    (
        code,
        u32::from(EXTRA_DBITS[code]),
        (dist - BASE_DIST[code] as usize) as u32,
    )
}

/// Decode tables for fixed-code blocks.
#[derive(Debug)]
pub struct FixedDecodeTables {
    /// Literal/length table, 9 root bits.
    pub lencode: Vec<Code>,
    /// Distance table, 5 root bits.
    pub distcode: Vec<Code>,
}

/// Root bits of the fixed literal/length table.
pub const FIXED_LENBITS: u32 = 9;
/// Root bits of the fixed distance table.
pub const FIXED_DISTBITS: u32 = 5;

/// Get the fixed decode tables.
///
/// These are built on first use and cached for the life of the process.
pub fn fixed_decode_tables() -> &'static FixedDecodeTables {
    static TABLES: OnceLock<FixedDecodeTables> = OnceLock::new();

    TABLES.get_or_init(|| {
        let mut lens = [0u16; 288];
        for (sym, len) in lens.iter_mut().enumerate() {
            *len = u16::from(fixed_litlen_length(sym));
        }
        let mut lencode = vec![Code::default(); ENOUGH_LENS];
        let (used, bits) = inflate_table(CodeType::Lens, &lens, &mut lencode, FIXED_LENBITS)
            .expect("fixed literal/length code is complete");
        debug_assert_eq!(bits, FIXED_LENBITS);
        lencode.truncate(used);

        let dist_lens = [5u16; 32];
        let mut distcode = vec![Code::default(); ENOUGH_DISTS];
        let (used, bits) = inflate_table(CodeType::Dists, &dist_lens, &mut distcode, FIXED_DISTBITS)
            .expect("fixed distance code is complete");
        debug_assert_eq!(bits, FIXED_DISTBITS);
        distcode.truncate(used);

        FixedDecodeTables { lencode, distcode }
    })
}
