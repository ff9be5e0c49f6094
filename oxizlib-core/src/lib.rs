//! # OxiZlib Core
//!
//! Core components shared by the OxiZlib compressor and decompressor.
//!
//! - [`adler`]: Adler-32 checksum (zlib framing)
//! - [`crc`]: CRC-32 checksum (gzip framing)
//! - [`bitstream`]: LSB-first bit writer and decoder bit accumulator
//! - [`ringbuffer`]: Circular history window for back-references
//! - [`stream`]: Per-call buffer cursors and per-stream context
//! - [`traits`]: Streaming traits, flush modes and status codes
//! - [`error`]: Error type and zlib return codes
//!
//! ## Example
//!
//! ```rust
//! use oxizlib_core::adler::Adler32;
//! use oxizlib_core::crc::Crc32;
//!
//! assert_eq!(Adler32::checksum(b"Hello"), 0x058C01F5);
//! assert_eq!(Crc32::compute(b"Hello, World!"), 0xEC4AC3D0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adler;
pub mod bitstream;
pub mod crc;
pub mod error;
pub mod ringbuffer;
pub mod stream;
pub mod traits;

pub use adler::Adler32;
pub use bitstream::{BitAccumulator, BitWriter};
pub use crc::Crc32;
pub use error::{OxizError, Result, ReturnCode};
pub use ringbuffer::HistoryWindow;
pub use stream::{ChecksumKind, StreamBuffers, StreamContext};
pub use traits::{CompressionLevel, Compressor, Decompressor, FlushMode, Status};
