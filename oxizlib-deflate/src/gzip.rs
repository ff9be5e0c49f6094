//! gzip (RFC 1952) member header.
//!
//! The same struct serves both directions: the compressor writes the fields
//! it is given, the decompressor fills one in while it parses a member
//! header. Name and comment are raw bytes; RFC 1952 specifies ISO 8859-1 and
//! decoding them is left to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

/// gzip magic bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compression method: DEFLATE.
pub const CM_DEFLATE: u8 = 8;

/// Fixed header length (magic through OS).
pub const GZIP_HEADER_LEN: usize = 10;

/// Longest extra, name or comment field captured while parsing.
pub const MAX_FIELD_LEN: usize = 64 * 1024;

/// gzip header flags.
pub mod flags {
    /// Text file.
    pub const FTEXT: u8 = 0x01;
    /// Header CRC present.
    pub const FHCRC: u8 = 0x02;
    /// Extra field present.
    pub const FEXTRA: u8 = 0x04;
    /// Original filename present.
    pub const FNAME: u8 = 0x08;
    /// Comment present.
    pub const FCOMMENT: u8 = 0x10;
    /// Reserved bits; a header with any of these set is rejected.
    pub const RESERVED: u8 = 0xE0;
}

/// Operating system codes for the OS byte.
pub mod os {
    /// FAT filesystem (MS-DOS, OS/2, NT/Win32).
    pub const FAT: u8 = 0;
    /// Unix.
    pub const UNIX: u8 = 3;
    /// NTFS (Windows).
    pub const NTFS: u8 = 11;
    /// Macintosh (Darwin).
    pub const MACOS: u8 = 19;
    /// Unknown.
    pub const UNKNOWN: u8 = 255;

    /// OS code for the platform this crate was built for.
    pub const fn current() -> u8 {
        if cfg!(windows) {
            10
        } else if cfg!(target_os = "macos") {
            MACOS
        } else if cfg!(unix) {
            UNIX
        } else {
            UNKNOWN
        }
    }
}

/// gzip member header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipHeader {
    /// FTEXT: the data is probably text.
    pub text: bool,
    /// Modification time (Unix timestamp, 0 if unknown).
    pub mtime: u32,
    /// Extra flags. Ignored when writing; the compressor derives it from the level.
    pub xfl: u8,
    /// Operating system code.
    pub os: u8,
    /// FEXTRA payload.
    pub extra: Option<Vec<u8>>,
    /// Original file name, without the terminating zero.
    pub name: Option<Vec<u8>>,
    /// File comment, without the terminating zero.
    pub comment: Option<Vec<u8>>,
    /// Whether a header CRC-16 is (or should be) present.
    pub hcrc: bool,
    /// Set by the decompressor once the whole header has been parsed.
    pub done: bool,
}

impl Default for GzipHeader {
    fn default() -> Self {
        Self {
            text: false,
            mtime: 0,
            xfl: 0,
            os: os::current(),
            extra: None,
            name: None,
            comment: None,
            hcrc: false,
            done: false,
        }
    }
}

impl GzipHeader {
    /// Create a header with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a header carrying the original file name.
    pub fn with_name(name: impl Into<Vec<u8>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the extra field.
    pub fn with_extra(mut self, extra: impl Into<Vec<u8>>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Set the modification time.
    pub fn with_mtime(mut self, mtime: u32) -> Self {
        self.mtime = mtime;
        self
    }

    /// Set the modification time to now.
    pub fn with_mtime_now(mut self) -> Self {
        self.mtime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        self
    }

    /// Mark the content as text.
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Request a header CRC.
    pub fn with_hcrc(mut self, hcrc: bool) -> Self {
        self.hcrc = hcrc;
        self
    }

    /// FLG byte for this header.
    pub fn flags(&self) -> u8 {
        let mut flg = 0;
        if self.text {
            flg |= flags::FTEXT;
        }
        if self.hcrc {
            flg |= flags::FHCRC;
        }
        if self.extra.is_some() {
            flg |= flags::FEXTRA;
        }
        if self.name.is_some() {
            flg |= flags::FNAME;
        }
        if self.comment.is_some() {
            flg |= flags::FCOMMENT;
        }
        flg
    }

    /// Bytes this header occupies when written.
    pub fn encoded_len(&self) -> usize {
        let mut len = GZIP_HEADER_LEN;
        if let Some(extra) = &self.extra {
            len += 2 + extra.len().min(usize::from(u16::MAX));
        }
        if let Some(name) = &self.name {
            len += zero_terminated(name).len() + 1;
        }
        if let Some(comment) = &self.comment {
            len += zero_terminated(comment).len() + 1;
        }
        if self.hcrc {
            len += 2;
        }
        len
    }
}

/// The part of `field` before any embedded zero byte.
pub(crate) fn zero_terminated(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}
