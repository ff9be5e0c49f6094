//! Command implementations for OxiZlib CLI.

pub mod completions;
pub mod compress;
pub mod decompress;
pub mod info;
pub mod test;

pub use completions::cmd_completions;
pub use compress::{CompressArgs, cmd_compress};
pub use decompress::{DecompressArgs, cmd_decompress};
pub use info::cmd_info;
pub use test::cmd_test;

use clap::ValueEnum;
use oxizlib_deflate::gzip::GZIP_MAGIC;
use oxizlib_deflate::{CompressionStrategy, InflateOptions};
use serde::Serialize;
use std::fmt;

/// Stream framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// gzip member (RFC 1952)
    Gzip,
    /// zlib stream (RFC 1950)
    Zlib,
    /// Raw DEFLATE data (RFC 1951)
    Raw,
}

impl Framing {
    /// Conventional file suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Framing::Gzip => "gz",
            Framing::Zlib => "zz",
            Framing::Raw => "deflate",
        }
    }

    /// zlib-style window bits selecting this framing.
    pub fn window_bits(self, bits: u8) -> i32 {
        let bits = i32::from(bits);
        match self {
            Framing::Gzip => bits + 16,
            Framing::Zlib => bits,
            Framing::Raw => -bits,
        }
    }

    /// Guess the framing from the first bytes of a stream.
    ///
    /// Anything that is neither a gzip magic nor a valid zlib header is
    /// taken to be raw DEFLATE.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [a, b, ..] if [*a, *b] == GZIP_MAGIC => Framing::Gzip,
            [cmf, flg, ..]
                if cmf & 0x0F == 8
                    && cmf >> 4 <= 7
                    && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0 =>
            {
                Framing::Zlib
            }
            _ => Framing::Raw,
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Framing::Gzip => "gzip",
            Framing::Zlib => "zlib",
            Framing::Raw => "raw deflate",
        };
        f.write_str(name)
    }
}

/// Decompressor options for an explicit framing, or zlib/gzip detection.
pub fn inflate_options(framing: Option<Framing>, window_bits: u8) -> InflateOptions {
    match framing {
        Some(framing) => InflateOptions::default().with_window_bits(framing.window_bits(window_bits)),
        None => InflateOptions::auto(),
    }
}

/// Match strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum StrategyArg {
    /// Normal LZ77 plus Huffman coding
    #[default]
    Default,
    /// Favor Huffman coding for filtered data
    Filtered,
    /// Huffman coding only
    Huffman,
    /// Run-length matches only
    Rle,
    /// Static Huffman codes only
    Fixed,
}

impl From<StrategyArg> for CompressionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Default => CompressionStrategy::Default,
            StrategyArg::Filtered => CompressionStrategy::Filtered,
            StrategyArg::Huffman => CompressionStrategy::HuffmanOnly,
            StrategyArg::Rle => CompressionStrategy::Rle,
            StrategyArg::Fixed => CompressionStrategy::Fixed,
        }
    }
}
