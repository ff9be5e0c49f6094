//! Error types for OxiZlib operations.
//!
//! The variants follow the zlib return-code taxonomy: usage errors
//! (`Stream`), progress errors (`Buf`), corrupt input (`Data`), allocation
//! failures (`Mem`) and the dictionary request (`NeedDict`). Every error can
//! be mapped back to its classic integer code with [`OxizError::code`].

use std::io;
use thiserror::Error;

/// zlib-compatible return codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    /// Progress was made.
    Ok = 0,
    /// The end of the stream was reached.
    StreamEnd = 1,
    /// A preset dictionary is needed to continue.
    NeedDict = 2,
    /// A file/I/O error in an outer layer.
    Errno = -1,
    /// The stream state or a parameter is inconsistent.
    StreamError = -2,
    /// The input data is corrupt.
    DataError = -3,
    /// Not enough memory.
    MemError = -4,
    /// No progress was possible.
    BufError = -5,
}

impl ReturnCode {
    /// The zlib message text associated with the code.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "",
            Self::StreamEnd => "stream end",
            Self::NeedDict => "need dictionary",
            Self::Errno => "file error",
            Self::StreamError => "stream error",
            Self::DataError => "data error",
            Self::MemError => "insufficient memory",
            Self::BufError => "buffer error",
        }
    }

    /// Map an integer code back to a `ReturnCode`.
    pub fn from_i32(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Ok,
            1 => Self::StreamEnd,
            2 => Self::NeedDict,
            -1 => Self::Errno,
            -2 => Self::StreamError,
            -3 => Self::DataError,
            -4 => Self::MemError,
            -5 => Self::BufError,
            _ => return None,
        })
    }
}

/// The main error type for OxiZlib operations.
#[derive(Debug, Error)]
pub enum OxizError {
    /// I/O error from an underlying reader/writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream was used out of protocol order or with bad arguments.
    #[error("stream error: {message}")]
    Stream {
        /// Description of the misuse.
        message: String,
    },

    /// The compressed input is corrupt.
    #[error("data error: {message}")]
    Data {
        /// zlib-style description of the corruption.
        message: String,
    },

    /// Allocation of the stream state or window failed.
    #[error("insufficient memory")]
    Mem,

    /// No progress was possible (no input and no output space).
    #[error("buffer error")]
    Buf,

    /// A preset dictionary is required to continue decoding.
    #[error("need dictionary (adler32 {adler:#010x})")]
    NeedDict {
        /// Adler-32 checksum of the required dictionary.
        adler: u32,
    },

    /// A configuration value is out of range.
    #[error("invalid option: {message}")]
    InvalidOption {
        /// Which option was rejected and why.
        message: String,
    },
}

/// Result type alias for OxiZlib operations.
pub type Result<T> = std::result::Result<T, OxizError>;

impl OxizError {
    /// Create a stream (usage) error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a data (corruption) error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create an invalid option error.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }

    /// Create a need-dictionary error.
    pub fn need_dict(adler: u32) -> Self {
        Self::NeedDict { adler }
    }

    /// The zlib return code this error corresponds to.
    pub fn code(&self) -> ReturnCode {
        match self {
            Self::Io(_) => ReturnCode::Errno,
            Self::Stream { .. } | Self::InvalidOption { .. } => ReturnCode::StreamError,
            Self::Data { .. } => ReturnCode::DataError,
            Self::Mem => ReturnCode::MemError,
            Self::Buf => ReturnCode::BufError,
            Self::NeedDict { .. } => ReturnCode::NeedDict,
        }
    }

    /// Whether the stream that produced this error can still make progress.
    ///
    /// Only [`OxizError::Buf`] is recoverable by calling again with more
    /// input or output space.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Buf)
    }
}

impl From<OxizError> for io::Error {
    fn from(err: OxizError) -> Self {
        match err {
            OxizError::Io(e) => e,
            OxizError::Data { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            OxizError::Stream { .. } | OxizError::InvalidOption { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            other => io::Error::other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OxizError::data("incorrect header check");
        assert_eq!(err.to_string(), "data error: incorrect header check");

        let err = OxizError::need_dict(0x1234_5678);
        assert!(err.to_string().contains("0x12345678"));

        assert_eq!(OxizError::Buf.to_string(), "buffer error");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(OxizError::stream("x").code() as i32, -2);
        assert_eq!(OxizError::data("x").code() as i32, -3);
        assert_eq!(OxizError::Mem.code() as i32, -4);
        assert_eq!(OxizError::Buf.code() as i32, -5);
        assert_eq!(OxizError::need_dict(1).code() as i32, 2);
        assert!(OxizError::Buf.is_recoverable());
        assert!(!OxizError::data("x").is_recoverable());
    }

    #[test]
    fn test_return_code_messages() {
        assert_eq!(ReturnCode::StreamEnd.message(), "stream end");
        assert_eq!(ReturnCode::DataError.message(), "data error");
        assert_eq!(ReturnCode::from_i32(-5), Some(ReturnCode::BufError));
        assert_eq!(ReturnCode::from_i32(42), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: OxizError = io_err.into();
        assert!(matches!(err, OxizError::Io(_)));

        let back: io::Error = OxizError::data("bad").into();
        assert_eq!(back.kind(), io::ErrorKind::InvalidData);
    }
}
