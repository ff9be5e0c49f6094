//! Utility functions for the CLI.

use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use oxizlib_core::{FlushMode, OxizError, Status};
use oxizlib_deflate::{Deflater, Inflater};
use std::fs::File;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

/// Streaming buffer size for both directions.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Create a byte progress bar with standard styling.
pub fn create_progress_bar(len: Option<u64>, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = match len {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::no_length(),
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
            .expect("progress bar template is valid")
            .progress_chars("█▓▒░ "),
    );
    pb
}

/// Open a file, or stdin for "-". Returns the reader and its length when known.
pub fn open_input(path: &Path) -> io::Result<(Box<dyn Read>, Option<u64>)> {
    if path.as_os_str() == "-" {
        return Ok((Box::new(io::stdin().lock()), None));
    }
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    Ok((Box::new(io::BufReader::new(file)), Some(len)))
}

/// Ask before replacing an existing file.
///
/// Without a terminal to ask on, an existing file is an error unless
/// `force` is set.
pub fn confirm_overwrite(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if force || !path.exists() {
        return Ok(());
    }
    if !io::stdin().is_terminal() {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    let overwrite = Confirm::new()
        .with_prompt(format!("{} already exists. Overwrite?", path.display()))
        .default(false)
        .interact()?;
    if overwrite {
        Ok(())
    } else {
        Err(format!("{} not overwritten", path.display()).into())
    }
}

/// Append `.suffix` to a file name.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Strip a known compressed suffix, or append `.out` when there is none.
pub fn strip_suffix(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz" | "z" | "zz" | "zlib" | "deflate") => path.with_extension(""),
        Some("tgz") => path.with_extension("tar"),
        _ => with_suffix(path, "out"),
    }
}

/// Decode a gzip header string, which RFC 1952 defines as ISO 8859-1.
pub fn latin1_decode(bytes: &[u8]) -> String {
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Encode a string for a gzip header. `None` when it has characters
/// outside ISO 8859-1 or an embedded NUL.
pub fn latin1_encode(text: &str) -> Option<Vec<u8>> {
    let (bytes, _, had_errors) = encoding_rs::WINDOWS_1252.encode(text);
    if had_errors || bytes.contains(&0) {
        return None;
    }
    Some(bytes.into_owned())
}

/// Percentage saved by compression.
pub fn space_savings(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        0.0
    } else {
        (1.0 - compressed as f64 / original as f64) * 100.0
    }
}

/// Compress everything `reader` yields into `writer`, finishing the stream.
///
/// Returns the number of bytes read and written.
pub fn compress_stream<R: Read, W: Write>(
    deflater: &mut Deflater,
    reader: &mut R,
    writer: &mut W,
) -> Result<(u64, u64), Box<dyn std::error::Error>> {
    let mut input_buf = vec![0u8; CHUNK_SIZE];
    let mut output_buf = vec![0u8; CHUNK_SIZE];
    let mut read = 0u64;
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut input_buf)?;
        read += n as u64;
        let flush = if n == 0 {
            FlushMode::Finish
        } else {
            FlushMode::None
        };

        let mut input = &input_buf[..n];
        loop {
            let (consumed, produced, status) = match deflater.deflate(input, &mut output_buf, flush)
            {
                Ok(result) => result,
                // Nothing left to do until more input arrives
                Err(OxizError::Buf) => break,
                Err(e) => return Err(e.into()),
            };
            writer.write_all(&output_buf[..produced])?;
            written += produced as u64;
            input = &input[consumed..];

            if status == Status::StreamEnd {
                writer.flush()?;
                return Ok((read, written));
            }
            if input.is_empty() && produced < output_buf.len() && flush != FlushMode::Finish {
                break;
            }
        }
    }
}

/// Outcome of [`decompress_stream`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeSummary {
    /// Compressed bytes consumed by the stream.
    pub consumed: u64,
    /// Decompressed bytes written.
    pub produced: u64,
    /// Bytes read past the end of the stream.
    pub trailing: u64,
}

/// Decompress one stream from `reader` into `writer`.
///
/// A preset dictionary request is answered with `dictionary` when given.
pub fn decompress_stream<R: Read, W: Write>(
    inflater: &mut Inflater,
    reader: &mut R,
    writer: &mut W,
    dictionary: Option<&[u8]>,
) -> Result<DecodeSummary, Box<dyn std::error::Error>> {
    let mut input_buf = vec![0u8; CHUNK_SIZE];
    let mut output_buf = vec![0u8; CHUNK_SIZE];
    let mut summary = DecodeSummary::default();

    loop {
        let n = reader.read(&mut input_buf)?;
        if n == 0 {
            return Err(OxizError::data("unexpected end of stream").into());
        }

        let mut input = &input_buf[..n];
        loop {
            let (consumed, produced, status) =
                match inflater.inflate(input, &mut output_buf, FlushMode::None) {
                    Ok(result) => result,
                    Err(OxizError::Buf) => break,
                    Err(e) => return Err(e.into()),
                };
            writer.write_all(&output_buf[..produced])?;
            summary.consumed += consumed as u64;
            summary.produced += produced as u64;
            input = &input[consumed..];

            match status {
                Status::StreamEnd => {
                    summary.trailing = input.len() as u64 + io::copy(reader, &mut io::sink())?;
                    writer.flush()?;
                    return Ok(summary);
                }
                Status::NeedDict => match dictionary {
                    Some(dictionary) => {
                        tracing::debug!(len = dictionary.len(), "installing preset dictionary");
                        inflater.set_dictionary(dictionary)?;
                    }
                    None => return Err(OxizError::need_dict(inflater.checksum()).into()),
                },
                Status::Ok => {}
            }
            if input.is_empty() && produced < output_buf.len() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxizlib_deflate::{DeflateOptions, GzipHeader, InflateOptions};

    #[test]
    fn test_suffixes() {
        assert_eq!(with_suffix(Path::new("a/b.txt"), "gz"), PathBuf::from("a/b.txt.gz"));
        assert_eq!(strip_suffix(Path::new("b.txt.gz")), PathBuf::from("b.txt"));
        assert_eq!(strip_suffix(Path::new("b.deflate")), PathBuf::from("b"));
        assert_eq!(strip_suffix(Path::new("b.tgz")), PathBuf::from("b.tar"));
        assert_eq!(strip_suffix(Path::new("b.bin")), PathBuf::from("b.bin.out"));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(latin1_decode(b"caf\xE9.txt"), "café.txt");
        assert_eq!(latin1_encode("café.txt").as_deref(), Some(&b"caf\xE9.txt"[..]));
        assert_eq!(latin1_encode("日本.txt"), None);
    }

    #[test]
    fn test_stream_roundtrip() {
        let input: Vec<u8> = b"streaming through the cli helpers\n".repeat(5000);
        let options = DeflateOptions::gzip(6).with_gzip_header(GzipHeader::with_name("t.txt"));
        let mut deflater = Deflater::with_options(&options).unwrap();
        let mut compressed = Vec::new();
        let (read, written) =
            compress_stream(&mut deflater, &mut input.as_slice(), &mut compressed).unwrap();
        assert_eq!(read, input.len() as u64);
        assert_eq!(written, compressed.len() as u64);

        compressed.extend_from_slice(b"junk");
        let mut inflater = Inflater::gzip();
        let mut output = Vec::new();
        let summary =
            decompress_stream(&mut inflater, &mut compressed.as_slice(), &mut output, None).unwrap();
        assert_eq!(output, input);
        assert_eq!(summary.trailing, 4);
        assert_eq!(summary.consumed, compressed.len() as u64 - 4);
        assert_eq!(inflater.header().and_then(|h| h.name.clone()), Some(b"t.txt".to_vec()));
    }

    #[test]
    fn test_empty_input() {
        let mut compressed = Vec::new();
        compress_stream(&mut Deflater::new(6), &mut io::empty(), &mut compressed).unwrap();
        assert_eq!(compressed, [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = oxizlib_deflate::zlib_compress(&[7u8; 1000], 6).unwrap();
        let mut inflater = Inflater::new();
        let err = decompress_stream(
            &mut inflater,
            &mut &compressed[..compressed.len() - 2],
            &mut io::sink(),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unexpected end of stream"));
    }

    #[test]
    fn test_dictionary_request() {
        let dictionary = b"a shared preset dictionary".to_vec();
        let options = DeflateOptions::zlib(6).with_dictionary(dictionary.clone());
        let compressed = oxizlib_deflate::compress(b"a shared preset", &options).unwrap();

        let mut inflater = Inflater::with_options(&InflateOptions::zlib()).unwrap();
        let err = decompress_stream(&mut inflater, &mut compressed.as_slice(), &mut io::sink(), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("need dictionary"));

        let mut inflater = Inflater::new();
        let mut output = Vec::new();
        decompress_stream(
            &mut inflater,
            &mut compressed.as_slice(),
            &mut output,
            Some(&dictionary),
        )
        .unwrap();
        assert_eq!(output, b"a shared preset");
    }
}
