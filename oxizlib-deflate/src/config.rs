//! Compressor and decompressor configuration.
//!
//! Options follow zlib's conventions: the sign and range of `window_bits`
//! select the framing, `level` -1 means the default level, and the per-level
//! matcher parameters come from a fixed table.

use crate::gzip::GzipHeader;
use crate::strategy::BlockStrategy;
use oxizlib_core::error::{OxizError, Result};

/// Match-finder tuning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionStrategy {
    /// Normal LZ77 plus Huffman coding.
    #[default]
    Default = 0,
    /// Discard short matches; for data produced by a filter or predictor.
    Filtered = 1,
    /// Huffman coding only, no string matching.
    HuffmanOnly = 2,
    /// Matches of distance one only (run-length encoding).
    Rle = 3,
    /// Never emit dynamic trees.
    Fixed = 4,
}

impl CompressionStrategy {
    /// Parse zlib's integer strategy value.
    pub fn from_i32(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::Default,
            1 => Self::Filtered,
            2 => Self::HuffmanOnly,
            3 => Self::Rle,
            4 => Self::Fixed,
            other => {
                return Err(OxizError::invalid_option(format!(
                    "unknown compression strategy {other}"
                )));
            }
        })
    }

    /// Whether string matching is skipped entirely.
    pub fn skips_matching(self) -> bool {
        matches!(self, Self::HuffmanOnly | Self::Rle)
    }
}

/// Stream framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wrap {
    /// Bare DEFLATE data.
    Raw,
    /// zlib header and Adler-32 trailer.
    #[default]
    Zlib,
    /// gzip header and CRC-32/ISIZE trailer.
    Gzip,
    /// Decompression only: accept zlib or gzip.
    Auto,
}

impl Wrap {
    /// Encode `bits` (8-15) as zlib-style window bits for this framing.
    pub fn window_bits(self, bits: u32) -> i32 {
        let bits = bits as i32;
        match self {
            Self::Raw => -bits,
            Self::Zlib => bits,
            Self::Gzip => bits + 16,
            Self::Auto => bits + 32,
        }
    }
}

/// Matcher parameters for one compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Reduce lazy search above this match length.
    pub good_length: u16,
    /// Do not perform lazy search above this match length.
    pub max_lazy: u16,
    /// Quit search above this match length.
    pub nice_length: u16,
    /// Maximum hash chain entries visited.
    pub max_chain: u16,
    /// Block compression routine for the level.
    pub func: BlockStrategy,
}

impl LevelConfig {
    const fn new(good: u16, lazy: u16, nice: u16, chain: u16, func: BlockStrategy) -> Self {
        Self {
            good_length: good,
            max_lazy: lazy,
            nice_length: nice,
            max_chain: chain,
            func,
        }
    }

    /// Parameters for `level` (0-9).
    pub fn for_level(level: u8) -> Self {
        CONFIGURATION_TABLE[usize::from(level.min(9))]
    }
}

/// Per-level matcher parameters, indexed by level.
///
/// Levels 1-3 use the greedy matcher, where `max_lazy` is reused as the
/// longest match for which all positions are inserted in the hash table.
pub const CONFIGURATION_TABLE: [LevelConfig; 10] = [
    LevelConfig::new(0, 0, 0, 0, BlockStrategy::Stored),
    LevelConfig::new(4, 4, 8, 4, BlockStrategy::Fast),
    LevelConfig::new(4, 5, 16, 8, BlockStrategy::Fast),
    LevelConfig::new(4, 6, 32, 32, BlockStrategy::Fast),
    LevelConfig::new(4, 4, 16, 16, BlockStrategy::Slow),
    LevelConfig::new(8, 16, 32, 32, BlockStrategy::Slow),
    LevelConfig::new(8, 16, 128, 128, BlockStrategy::Slow),
    LevelConfig::new(8, 32, 128, 256, BlockStrategy::Slow),
    LevelConfig::new(32, 128, 258, 1024, BlockStrategy::Slow),
    LevelConfig::new(32, 258, 258, 4096, BlockStrategy::Slow),
];

/// Compressor options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeflateOptions {
    /// Compression level 0-9, or -1 for the default (6).
    pub level: i32,
    /// Window bits: 8..=15 for zlib, -15..=-8 for raw, 24..=31 for gzip.
    pub window_bits: i32,
    /// Memory level 1-9; sets the hash table and symbol buffer sizes.
    pub mem_level: u8,
    /// Matcher strategy.
    pub strategy: CompressionStrategy,
    /// Preset dictionary (zlib and raw only).
    pub dictionary: Option<Vec<u8>>,
    /// gzip header to write instead of the minimal one.
    pub gzip_header: Option<GzipHeader>,
}

impl DeflateOptions {
    /// zlib defaults: level 6, 32 KiB window, zlib framing.
    pub const DEFAULT: Self = Self {
        level: 6,
        window_bits: 15,
        mem_level: 8,
        strategy: CompressionStrategy::Default,
        dictionary: None,
        gzip_header: None,
    };

    /// Fastest compression.
    pub const FAST: Self = Self {
        level: 1,
        ..Self::DEFAULT
    };

    /// Best compression, largest hash table.
    pub const BEST: Self = Self {
        level: 9,
        mem_level: 9,
        ..Self::DEFAULT
    };

    /// zlib framing at `level`.
    pub fn zlib(level: i32) -> Self {
        Self {
            level,
            ..Self::DEFAULT
        }
    }

    /// gzip framing at `level`.
    pub fn gzip(level: i32) -> Self {
        Self {
            level,
            window_bits: 31,
            ..Self::DEFAULT
        }
    }

    /// Raw DEFLATE at `level`.
    pub fn raw(level: i32) -> Self {
        Self {
            level,
            window_bits: -15,
            ..Self::DEFAULT
        }
    }

    /// Set the level.
    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Set zlib-style window bits (sign and offset select the framing).
    pub fn with_window_bits(mut self, window_bits: i32) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the memory level.
    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: CompressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set a preset dictionary.
    pub fn with_dictionary(mut self, dictionary: impl Into<Vec<u8>>) -> Self {
        self.dictionary = Some(dictionary.into());
        self
    }

    /// Set the gzip header (also selects gzip framing).
    pub fn with_gzip_header(mut self, header: GzipHeader) -> Self {
        self.gzip_header = Some(header);
        self.with_wrap(Wrap::Gzip)
    }

    /// Change the framing, keeping the window size.
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        let bits = match self.window_bits {
            b if b < 0 => b.unsigned_abs(),
            b if b > 15 => (b - 16) as u32,
            b => b as u32,
        };
        self.window_bits = wrap.window_bits(bits);
        self
    }

    /// Framing selected by `window_bits`.
    pub fn wrap(&self) -> Wrap {
        match self.window_bits {
            b if b < 0 => Wrap::Raw,
            b if b > 15 => Wrap::Gzip,
            _ => Wrap::Zlib,
        }
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<()> {
        self.resolve().map(|_| ())
    }

    pub(crate) fn resolve(&self) -> Result<DeflateParams> {
        let level = match self.level {
            -1 => 6,
            0..=9 => self.level as u8,
            other => {
                return Err(OxizError::invalid_option(format!(
                    "compression level {other} out of range -1..=9"
                )));
            }
        };

        let (wrap, mut bits) = match self.window_bits {
            b if b < 0 => {
                if b < -15 {
                    return Err(OxizError::invalid_option(format!(
                        "raw window bits {b} out of range -15..=-8"
                    )));
                }
                (Wrap::Raw, -b)
            }
            b if b > 15 => (Wrap::Gzip, b - 16),
            b => (Wrap::Zlib, b),
        };
        if !(8..=15).contains(&bits) {
            return Err(OxizError::invalid_option(format!(
                "window bits {} out of range",
                self.window_bits
            )));
        }
        if bits == 8 {
            // A 256-byte window is only expressible in a zlib header, as 9.
            if wrap != Wrap::Zlib {
                return Err(OxizError::invalid_option(
                    "window bits 8 is only supported with zlib framing",
                ));
            }
            bits = 9;
        }

        if !(1..=9).contains(&self.mem_level) {
            return Err(OxizError::invalid_option(format!(
                "memory level {} out of range 1..=9",
                self.mem_level
            )));
        }
        if self.gzip_header.is_some() && wrap != Wrap::Gzip {
            return Err(OxizError::invalid_option(
                "a gzip header requires gzip framing",
            ));
        }
        if self.dictionary.is_some() && wrap == Wrap::Gzip {
            return Err(OxizError::invalid_option(
                "gzip streams cannot use a preset dictionary",
            ));
        }

        Ok(DeflateParams {
            level,
            wrap,
            w_bits: bits as u32,
            mem_level: u32::from(self.mem_level),
            strategy: self.strategy,
        })
    }
}

impl Default for DeflateOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Validated compressor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeflateParams {
    pub level: u8,
    pub wrap: Wrap,
    pub w_bits: u32,
    pub mem_level: u32,
    pub strategy: CompressionStrategy,
}

/// Decompressor options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflateOptions {
    /// Window bits: 8..=15 zlib, 0 for the size in the zlib header,
    /// -15..=-8 raw, +16 gzip only, +32 zlib or gzip.
    pub window_bits: i32,
    /// Dictionary to install when the stream asks for it (or up front for
    /// raw streams).
    pub dictionary: Option<Vec<u8>>,
}

impl InflateOptions {
    /// zlib framing, 32 KiB window.
    pub const DEFAULT: Self = Self {
        window_bits: 15,
        dictionary: None,
    };

    /// zlib framing.
    pub fn zlib() -> Self {
        Self::DEFAULT
    }

    /// gzip framing.
    pub fn gzip() -> Self {
        Self {
            window_bits: 31,
            ..Self::DEFAULT
        }
    }

    /// Raw DEFLATE.
    pub fn raw() -> Self {
        Self {
            window_bits: -15,
            ..Self::DEFAULT
        }
    }

    /// zlib or gzip, detected from the first bytes.
    pub fn auto() -> Self {
        Self {
            window_bits: 47,
            ..Self::DEFAULT
        }
    }

    /// Set zlib-style window bits.
    pub fn with_window_bits(mut self, window_bits: i32) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Set the dictionary.
    pub fn with_dictionary(mut self, dictionary: impl Into<Vec<u8>>) -> Self {
        self.dictionary = Some(dictionary.into());
        self
    }

    /// Framing selected by `window_bits`.
    pub fn wrap(&self) -> Wrap {
        resolve_inflate_bits(self.window_bits)
            .map(|(wrap, _)| wrap)
            .unwrap_or_default()
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        resolve_inflate_bits(self.window_bits).map(|_| ())
    }
}

impl Default for InflateOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Split zlib-style decompressor window bits into framing and window size.
/// A size of 0 means "take it from the zlib header".
pub(crate) fn resolve_inflate_bits(window_bits: i32) -> Result<(Wrap, u32)> {
    let (wrap, bits) = if window_bits < 0 {
        if window_bits < -15 {
            return Err(OxizError::invalid_option(format!(
                "raw window bits {window_bits} out of range -15..=-8"
            )));
        }
        (Wrap::Raw, -window_bits)
    } else {
        let wrap = match (window_bits >> 4) + 5 {
            5 => Wrap::Zlib,
            6 => Wrap::Gzip,
            _ => Wrap::Auto,
        };
        let bits = if window_bits < 48 {
            window_bits & 15
        } else {
            window_bits
        };
        (wrap, bits)
    };

    if bits != 0 && !(8..=15).contains(&bits) {
        return Err(OxizError::invalid_option(format!(
            "window bits {window_bits} out of range"
        )));
    }
    if bits == 0 && wrap == Wrap::Raw {
        return Err(OxizError::invalid_option(
            "raw streams need an explicit window size",
        ));
    }
    Ok((wrap, bits as u32))
}
