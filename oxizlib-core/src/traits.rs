//! Streaming traits and the flush/status vocabulary shared by the
//! compressor and the decompressor.

use crate::error::{OxizError, Result};

/// Non-error outcome of a streaming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made; call again with more input or output space.
    Ok,
    /// The stream is complete.
    StreamEnd,
    /// Decoding stopped at a zlib DICTID; supply the dictionary and resume.
    NeedDict,
}

impl Status {
    /// zlib integer code (0, 1 or 2).
    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::StreamEnd => 1,
            Self::NeedDict => 2,
        }
    }
}

/// Flush mode for a compression or decompression call.
///
/// The numeric values match zlib's `Z_NO_FLUSH` .. `Z_BLOCK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FlushMode {
    /// Buffer data for best compression.
    #[default]
    None = 0,
    /// Emit pending bits, padding with an empty static block when needed.
    Partial = 1,
    /// Byte-align with an empty stored block, keeping history.
    Sync = 2,
    /// Sync flush and forget history.
    Full = 3,
    /// Finish the stream and write the trailer.
    Finish = 4,
    /// Stop at a block boundary without alignment.
    Block = 5,
}

impl FlushMode {
    /// zlib integer value.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for FlushMode {
    type Error = OxizError;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Partial,
            2 => Self::Sync,
            3 => Self::Full,
            4 => Self::Finish,
            5 => Self::Block,
            other => return Err(OxizError::stream(format!("invalid flush value {other}"))),
        })
    }
}

/// Compression level (0-9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompressionLevel(u8);

impl CompressionLevel {
    /// No compression (stored blocks only).
    pub const NONE: Self = Self(0);
    /// Fastest compression.
    pub const FAST: Self = Self(1);
    /// zlib default (6).
    pub const DEFAULT: Self = Self(6);
    /// Best compression.
    pub const BEST: Self = Self(9);

    /// Create a level, clamping to 0-9.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Parse a zlib-style level where -1 selects the default.
    pub fn from_i32(level: i32) -> Result<Self> {
        match level {
            -1 => Ok(Self::DEFAULT),
            0..=9 => Ok(Self(level as u8)),
            other => Err(OxizError::invalid_option(format!(
                "compression level {other} out of range -1..=9"
            ))),
        }
    }

    /// Numeric level.
    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A streaming compressor.
pub trait Compressor {
    /// Compress from `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`.
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)>;

    /// Reset to a fresh stream with the same configuration.
    fn reset(&mut self);

    /// Whether the trailer has been fully emitted.
    fn is_finished(&self) -> bool;

    /// Compress all of `input` and finish the stream.
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, FlushMode::Finish)?;
            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            if status == Status::StreamEnd {
                break;
            }
            if consumed == 0 && produced == 0 {
                return Err(OxizError::Buf);
            }
        }

        Ok(output)
    }
}

/// A streaming decompressor.
pub trait Decompressor {
    /// Decompress from `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`.
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)>;

    /// Reset to a fresh stream with the same configuration.
    fn reset(&mut self);

    /// Whether the end of the stream has been reached.
    fn is_finished(&self) -> bool;

    /// Adler-32 of the preset dictionary the stream asked for, if any.
    fn dictionary_id(&self) -> Option<u32> {
        None
    }

    /// Decompress a complete stream.
    ///
    /// Fails with [`OxizError::NeedDict`] if a preset dictionary is required
    /// and with [`OxizError::Buf`] if the input ends early.
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) =
                self.decompress(&input[input_pos..], &mut buffer, FlushMode::None)?;
            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                Status::StreamEnd => break,
                Status::NeedDict => {
                    return Err(OxizError::need_dict(self.dictionary_id().unwrap_or(0)));
                }
                Status::Ok => {
                    if consumed == 0 && produced == 0 {
                        return Err(OxizError::Buf);
                    }
                }
            }
        }

        Ok(output)
    }
}
