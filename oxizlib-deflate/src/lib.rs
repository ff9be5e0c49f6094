//! # OxiZlib Deflate
//!
//! Pure Rust streaming DEFLATE (RFC 1951) with zlib (RFC 1950) and gzip
//! (RFC 1952) framing, producing the same bytes as zlib for the same
//! settings.
//!
//! ## Features
//!
//! - **Compression**: [`Deflater`]
//!   - Levels 0-9 with zlib's per-level matcher tuning
//!   - Stored, fixed and dynamic Huffman blocks, whichever is smallest
//!   - Filtered, Huffman-only, RLE and fixed-code strategies
//!   - Partial, sync, full and block flushes; preset dictionaries
//! - **Decompression**: [`Inflater`]
//!   - Resumable at any input or output byte boundary
//!   - zlib, gzip, raw, or automatic zlib/gzip detection
//!   - gzip header capture, dictionaries, resynchronization after damage
//! - **One-shot helpers** in [`zlib`] for data that is already in memory
//!
//! ## Example
//!
//! ```rust
//! use oxizlib_deflate::{zlib_compress, zlib_decompress};
//!
//! let original = b"Hello, Hello, Hello, World!";
//! let compressed = zlib_compress(original, 6).unwrap();
//! let decompressed = zlib_decompress(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Streaming
//!
//! ```rust
//! use oxizlib_deflate::{Deflater, Inflater};
//! use oxizlib_core::{FlushMode, Status};
//!
//! let mut deflater = Deflater::gzip(9);
//! let mut compressed = vec![0u8; 256];
//! let (_, n, _) = deflater.deflate(b"part one, ", &mut compressed, FlushMode::Sync).unwrap();
//! let (_, m, status) = deflater
//!     .deflate(b"part two", &mut compressed[n..], FlushMode::Finish)
//!     .unwrap();
//! assert_eq!(status, Status::StreamEnd);
//!
//! let mut inflater = Inflater::gzip();
//! let mut out = [0u8; 64];
//! let (_, produced, status) = inflater
//!     .inflate(&compressed[..n + m], &mut out, FlushMode::None)
//!     .unwrap();
//! assert_eq!(status, Status::StreamEnd);
//! assert_eq!(&out[..produced], b"part one, part two");
//! ```
//!
//! ## Compression Levels
//!
//! - Level 0: Stored blocks only
//! - Level 1-3: Greedy matching
//! - Level 4-9: Lazy matching, longer chains as the level rises
//! - Level 6 is the default (`-1` in [`DeflateOptions::level`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod decode_table;
pub mod deflate;
pub mod gzip;
pub mod huffman;
pub mod inflate;
mod inflate_fast;
pub mod lz77;
pub mod strategy;
pub mod tables;
pub mod zlib;

// Re-exports
pub use block::DataType;
pub use config::{CompressionStrategy, DeflateOptions, InflateOptions, LevelConfig, Wrap};
pub use deflate::{Deflater, compress_bound};
pub use gzip::GzipHeader;
pub use inflate::{Inflater, Mode};
pub use strategy::BlockStrategy;
pub use zlib::{
    compress, decompress, deflate, gzip_compress, gzip_compress_with_header, gzip_decompress,
    gzip_decompress_with_header, inflate, zlib_compress, zlib_compress_with_dict,
    zlib_decompress, zlib_decompress_with_dict, zlib_requires_dictionary,
};
