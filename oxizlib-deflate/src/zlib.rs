//! One-shot compression and decompression.
//!
//! These wrap [`Deflater`] and [`Inflater`] for callers holding the whole
//! input in memory. Compression pushes the input in a single call with
//! [`FlushMode::Finish`] into a buffer sized by [`Deflater::bound`];
//! decompression grows its output until the stream ends.
//!
//! ```text
//! zlib:  +---+---+=[DICTID]=+==========+---+---+---+---+
//!        |CMF|FLG|          |  blocks  |ADLER32 (BE)   |
//!        +---+---+==========+==========+---+---+---+---+
//!
//! gzip:  +---+---+---+---+---+---+---+---+---+---+===============+==========+-------+-------+
//!        |ID1|ID2|CM |FLG|     MTIME     |XFL|OS | optional ...  |  blocks  | CRC32 | ISIZE |
//!        +---+---+---+---+---+---+---+---+---+---+===============+==========+-------+-------+
//! ```
//!
//! Any outcome other than a finished stream becomes an error carrying the
//! stream's message.

use crate::block::DataType;
use crate::config::{DeflateOptions, InflateOptions};
use crate::deflate::Deflater;
use crate::gzip::GzipHeader;
use crate::inflate::Inflater;
use oxizlib_core::error::{OxizError, Result};
use oxizlib_core::traits::{FlushMode, Status};

/// Largest useful preset dictionary (one 32 KiB window).
pub const MAX_DICTIONARY_SIZE: usize = 32 * 1024;

/// Compress `input` with the given options.
pub fn compress(input: &[u8], options: &DeflateOptions) -> Result<Vec<u8>> {
    let mut deflater = Deflater::with_options(options)?;
    finish(&mut deflater, input)
}

/// Decompress a complete stream with the given options.
///
/// Bytes after the end of the stream are ignored.
pub fn decompress(input: &[u8], options: &InflateOptions) -> Result<Vec<u8>> {
    let mut inflater = Inflater::with_options(options)?;
    drain(&mut inflater, input)
}

/// Compress to the zlib format.
pub fn zlib_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    finish(&mut Deflater::new(level), input)
}

/// Decompress zlib data.
pub fn zlib_decompress(input: &[u8]) -> Result<Vec<u8>> {
    drain(&mut Inflater::new(), input)
}

/// Compress to the zlib format with a preset dictionary.
pub fn zlib_compress_with_dict(input: &[u8], level: u8, dictionary: &[u8]) -> Result<Vec<u8>> {
    let mut deflater = Deflater::new(level);
    deflater.set_dictionary(dictionary)?;
    finish(&mut deflater, input)
}

/// Decompress zlib data that was compressed with a preset dictionary.
///
/// A stream that names a different dictionary fails with
/// [`OxizError::Data`].
pub fn zlib_decompress_with_dict(input: &[u8], dictionary: &[u8]) -> Result<Vec<u8>> {
    let options = InflateOptions::zlib().with_dictionary(dictionary);
    decompress(input, &options)
}

/// The dictionary id a zlib stream asks for, if its header sets FDICT.
pub fn zlib_requires_dictionary(input: &[u8]) -> Option<u32> {
    match input {
        [cmf, flg, id @ ..]
            if ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0
                && flg & 0x20 != 0
                && id.len() >= 4 =>
        {
            Some(u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
        }
        _ => None,
    }
}

/// Compress to the gzip format with a minimal header.
///
/// The header's FTEXT flag is set when the input looks like text.
pub fn gzip_compress(input: &[u8], level: u8) -> Result<Vec<u8>> {
    let header = GzipHeader::new().with_text(DataType::detect(input) == DataType::Text);
    gzip_compress_with_header(input, level, header)
}

/// Compress to the gzip format with the given header.
pub fn gzip_compress_with_header(input: &[u8], level: u8, header: GzipHeader) -> Result<Vec<u8>> {
    let options = DeflateOptions::gzip(i32::from(level)).with_gzip_header(header);
    compress(input, &options)
}

/// Decompress a gzip member.
pub fn gzip_decompress(input: &[u8]) -> Result<Vec<u8>> {
    drain(&mut Inflater::gzip(), input)
}

/// Decompress a gzip member and return its header as well.
pub fn gzip_decompress_with_header(input: &[u8]) -> Result<(Vec<u8>, GzipHeader)> {
    let mut inflater = Inflater::gzip();
    let output = drain(&mut inflater, input)?;
    let header = inflater
        .header()
        .cloned()
        .ok_or_else(|| OxizError::data("missing gzip header"))?;
    Ok((output, header))
}

/// Compress to raw DEFLATE.
pub fn deflate(input: &[u8], level: u8) -> Result<Vec<u8>> {
    finish(&mut Deflater::raw(level), input)
}

/// Decompress raw DEFLATE.
pub fn inflate(input: &[u8]) -> Result<Vec<u8>> {
    drain(&mut Inflater::raw(), input)
}

fn finish(deflater: &mut Deflater, input: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; deflater.bound(input.len())];
    let (consumed, produced, status) = deflater.deflate(input, &mut output, FlushMode::Finish)?;
    if status != Status::StreamEnd || consumed != input.len() {
        return Err(OxizError::Buf);
    }
    output.truncate(produced);
    tracing::debug!(
        input = input.len(),
        output = produced,
        "one-shot compression complete"
    );
    Ok(output)
}

fn drain(inflater: &mut Inflater, input: &[u8]) -> Result<Vec<u8>> {
    let mut output = vec![0u8; input.len().saturating_mul(4).clamp(1024, 1 << 24)];
    let mut in_pos = 0;
    let mut out_pos = 0;

    loop {
        if out_pos == output.len() {
            output.resize(output.len() * 2, 0);
        }
        let (consumed, produced, status) = match inflater.inflate(
            &input[in_pos..],
            &mut output[out_pos..],
            FlushMode::Finish,
        ) {
            Err(OxizError::Buf) if in_pos == input.len() => {
                return Err(OxizError::data("unexpected end of stream"));
            }
            other => other?,
        };
        in_pos += consumed;
        out_pos += produced;

        match status {
            Status::StreamEnd => break,
            Status::NeedDict => {
                return Err(OxizError::need_dict(inflater.checksum()));
            }
            Status::Ok if in_pos == input.len() && out_pos < output.len() => {
                return Err(OxizError::data("unexpected end of stream"));
            }
            Status::Ok => {}
        }
    }

    output.truncate(out_pos);
    Ok(output)
}
