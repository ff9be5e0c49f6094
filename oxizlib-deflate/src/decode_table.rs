//! Huffman decoding tables.
//!
//! A table is a flat array of [`Code`] entries. The first `1 << root`
//! entries are indexed directly by the next `root` input bits. Codes longer
//! than `root` bits go through a second-level sub-table whose location and
//! index width are stored in the root entry, so every symbol resolves in at
//! most two lookups.
//!
//! `op` encodes what an entry means:
//!
//! | op            | meaning                                         |
//! |---------------|-------------------------------------------------|
//! | `0`           | literal, `val` is the byte                      |
//! | `0000tttt`    | link to sub-table of `tttt` bits at `val`       |
//! | `0001eeee`    | length or distance base `val`, `eeee` extra bits|
//! | `01100000`    | end of block                                    |
//! | `01000000`    | invalid code                                    |

use crate::tables::MAX_BITS;

/// Maximum table entries for literal/length codes with 9 root bits.
pub const ENOUGH_LENS: usize = 852;
/// Maximum table entries for distance codes with 6 root bits.
pub const ENOUGH_DISTS: usize = 592;
/// Space for a literal/length table followed by a distance table.
pub const ENOUGH: usize = ENOUGH_LENS + ENOUGH_DISTS;

/// Operation bits: end of block.
pub const OP_END_OF_BLOCK: u8 = 32;
/// Operation bits: invalid code.
pub const OP_INVALID: u8 = 64;
/// Operation bits: length or distance base.
pub const OP_BASE: u8 = 16;

/// One decoding table entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    /// Operation, extra bits or table bits.
    pub op: u8,
    /// Bits in this part of the code.
    pub bits: u8,
    /// Literal, base value or table offset.
    pub val: u16,
}

/// Which alphabet a table decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeType {
    /// Code length code lengths (19 symbols).
    Codes,
    /// Literal/length codes.
    Lens,
    /// Distance codes.
    Dists,
}

/// Why a set of code lengths was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// More codes than the lengths allow.
    OverSubscribed,
    /// Codes left unused where a complete code is required.
    Incomplete,
    /// The table would not fit in the reserved space.
    TooLarge,
}

/// Length base values for symbols 257..=287.
const LEN_BASE: [u16; 31] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258, 0, 0,
];

/// Length ops: 16 + extra bits; 286 and 287 decode as invalid.
const LEN_OP: [u8; 31] = [
    16, 16, 16, 16, 16, 16, 16, 16, 17, 17, 17, 17, 18, 18, 18, 18, 19, 19, 19, 19, 20, 20, 20, 20,
    21, 21, 21, 21, 16, 77, 202,
];

/// Distance base values for codes 0..=31.
const DIST_BASE: [u16; 32] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577, 0, 0,
];

/// Distance ops: 16 + extra bits; 30 and 31 decode as invalid.
const DIST_OP: [u8; 32] = [
    16, 16, 16, 16, 17, 17, 18, 18, 19, 19, 20, 20, 21, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26,
    27, 27, 28, 28, 29, 29, 64, 64,
];

/// Build a decoding table for the code lengths in `lens`.
///
/// `table` receives the entries starting at index 0. `root` is the
/// requested root table width; it is reduced to the longest code and
/// raised to the shortest. Returns `(entries used, root bits)`.
///
/// An empty code (no lengths at all) produces a two-entry table of invalid
/// codes so that any use of it fails at decode time. An incomplete code is
/// accepted only for a single code of length one outside the code-length
/// alphabet.
pub fn inflate_table(
    kind: CodeType,
    lens: &[u16],
    table: &mut [Code],
    root: u32,
) -> Result<(usize, u32), TableError> {
    let mut count = [0u16; MAX_BITS + 1];
    for &len in lens {
        count[len as usize] += 1;
    }

    // Bound code lengths
    let mut max = MAX_BITS;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }
    let mut root = root as usize;
    if root > max {
        root = max;
    }
    if max == 0 {
        let invalid = Code {
            op: OP_INVALID,
            bits: 1,
            val: 0,
        };
        table[0] = invalid;
        table[1] = invalid;
        return Ok((2, 1));
    }
    let mut min = 1;
    while min < max && count[min] == 0 {
        min += 1;
    }
    if root < min {
        root = min;
    }

    // Check for an over-subscribed or incomplete set of lengths
    let mut left: i32 = 1;
    for &c in &count[1..] {
        left <<= 1;
        left -= i32::from(c);
        if left < 0 {
            return Err(TableError::OverSubscribed);
        }
    }
    if left > 0 && (kind == CodeType::Codes || max != 1) {
        return Err(TableError::Incomplete);
    }

    // Sort symbols by length, by symbol order within each length
    let mut offs = [0u16; MAX_BITS + 1];
    for len in 1..MAX_BITS {
        offs[len + 1] = offs[len] + count[len];
    }
    let mut work = [0u16; 320];
    for (sym, &len) in lens.iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let (base, extra, match_start): (&[u16], &[u8], usize) = match kind {
        CodeType::Codes => (&[], &[], 20),
        CodeType::Lens => (&LEN_BASE, &LEN_OP, 257),
        CodeType::Dists => (&DIST_BASE, &DIST_OP, 0),
    };

    let mut huff: usize = 0;
    let mut sym: usize = 0;
    let mut len = min;
    let mut next: usize = 0;
    let mut curr = root;
    let mut drop: usize = 0;
    let mut low = usize::MAX;
    let mut used: usize = 1 << root;
    let mask = used - 1;

    let too_large = |used: usize| match kind {
        CodeType::Lens => used > ENOUGH_LENS,
        CodeType::Dists => used > ENOUGH_DISTS,
        CodeType::Codes => false,
    };
    if too_large(used) {
        return Err(TableError::TooLarge);
    }

    loop {
        // Create the entry for the current symbol
        let symbol = work[sym] as usize;
        let here = if symbol + 1 < match_start {
            Code {
                op: 0,
                bits: (len - drop) as u8,
                val: symbol as u16,
            }
        } else if symbol >= match_start {
            Code {
                op: extra[symbol - match_start],
                bits: (len - drop) as u8,
                val: base[symbol - match_start],
            }
        } else {
            Code {
                op: OP_END_OF_BLOCK + OP_INVALID,
                bits: (len - drop) as u8,
                val: 0,
            }
        };

        // Replicate for every index whose low bits match this code
        let incr = 1usize << (len - drop);
        let mut fill = 1usize << curr;
        let step = fill;
        loop {
            fill -= incr;
            table[next + (huff >> drop) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // Backwards increment the len-bit code huff
        let mut incr = 1usize << (len - 1);
        while huff & incr != 0 {
            incr >>= 1;
        }
        if incr != 0 {
            huff &= incr - 1;
            huff += incr;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        // Start a new sub-table when the root bits change
        if len > root && (huff & mask) != low {
            if drop == 0 {
                drop = root;
            }
            next += step;

            curr = len - drop;
            let mut left: i32 = 1 << curr;
            while curr + drop < max {
                left -= i32::from(count[curr + drop]);
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            used += 1 << curr;
            if too_large(used) {
                return Err(TableError::TooLarge);
            }

            low = huff & mask;
            table[low] = Code {
                op: curr as u8,
                bits: root as u8,
                val: next as u16,
            };
        }
    }

    // Fill the one remaining entry of an incomplete code
    if huff != 0 {
        table[next + huff] = Code {
            op: OP_INVALID,
            bits: (len - drop) as u8,
            val: 0,
        };
    }

    Ok((used, root as u32))
}
