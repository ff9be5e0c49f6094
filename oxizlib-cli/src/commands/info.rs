//! Info command implementation.

use super::{Framing, inflate_options};
use crate::utils::{decompress_stream, latin1_decode, space_savings};
use oxizlib_deflate::{GzipHeader, Inflater};
use serde::Serialize;
use std::io;
use std::path::Path;

/// JSON output for stream information.
#[derive(Debug, Serialize)]
struct StreamInfo {
    file: String,
    framing: Framing,
    compressed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    uncompressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<u32>,
    trailing_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    zlib: Option<ZlibInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gzip: Option<GzipInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Fields of a zlib header.
#[derive(Debug, Serialize)]
struct ZlibInfo {
    window_size: u32,
    level: &'static str,
    preset_dictionary: bool,
}

/// Fields of a gzip header.
#[derive(Debug, Serialize)]
struct GzipInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    mtime: u32,
    os: &'static str,
    text: bool,
    xfl: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_len: Option<usize>,
    header_crc: bool,
}

impl GzipInfo {
    fn from_header(header: &GzipHeader) -> Self {
        Self {
            name: header.name.as_deref().map(latin1_decode),
            comment: header.comment.as_deref().map(latin1_decode),
            mtime: header.mtime,
            os: os_name(header.os),
            text: header.text,
            xfl: header.xfl,
            extra_len: header.extra.as_ref().map(Vec::len),
            header_crc: header.hcrc,
        }
    }
}

pub fn cmd_info(file: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(file)?;
    let info = inspect(file, &data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Stream Information");
    println!("==================");
    println!("File: {}", info.file);
    println!("Format: {}", info.framing);
    println!("Compressed size: {} bytes", info.compressed_size);
    if let Some(size) = info.uncompressed_size {
        println!("Uncompressed size: {} bytes", size);
    }
    if let Some(savings) = info.savings {
        println!("Space savings: {:.1}%", savings);
    }
    if let Some(checksum) = info.checksum {
        let kind = if info.framing == Framing::Gzip {
            "CRC-32"
        } else {
            "Adler-32"
        };
        println!("{}: {:08x}", kind, checksum);
    }
    if info.trailing_bytes > 0 {
        println!("Trailing data: {} bytes", info.trailing_bytes);
    }

    if let Some(zlib) = &info.zlib {
        println!();
        println!("zlib Header:");
        println!("  Window size: {} bytes", zlib.window_size);
        println!("  Compression level: {}", zlib.level);
        println!("  Preset dictionary: {}", if zlib.preset_dictionary { "yes" } else { "no" });
    }

    if let Some(gzip) = &info.gzip {
        println!();
        println!("GZIP Header:");
        if let Some(name) = &gzip.name {
            println!("  Original filename: {}", name);
        }
        if let Some(comment) = &gzip.comment {
            println!("  Comment: {}", comment);
        }
        if gzip.mtime > 0 {
            println!("  Modification time: {} (Unix timestamp)", gzip.mtime);
        }
        println!("  Operating system: {}", gzip.os);
        println!("  Text: {}", if gzip.text { "yes" } else { "no" });
        if let Some(len) = gzip.extra_len {
            println!("  Extra field: {} bytes", len);
        }
        if gzip.header_crc {
            println!("  Header CRC: present");
        }
    }

    if let Some(error) = &info.error {
        println!();
        println!("Error: {}", error);
    }

    Ok(())
}

/// Decode `data` and collect what its headers and trailer say.
fn inspect(file: &Path, data: &[u8]) -> Result<StreamInfo, Box<dyn std::error::Error>> {
    let framing = Framing::sniff(data);
    let mut inflater = Inflater::with_options(&inflate_options(Some(framing), 15))?;
    let decoded = decompress_stream(&mut inflater, &mut &data[..], &mut io::sink(), None);

    let zlib = (framing == Framing::Zlib).then(|| ZlibInfo {
        window_size: 1 << ((data[0] >> 4) + 8),
        level: match data[1] >> 6 {
            0 => "fastest",
            1 => "fast",
            2 => "default",
            _ => "maximum",
        },
        preset_dictionary: data[1] & 0x20 != 0,
    });
    let gzip = inflater.header().map(GzipInfo::from_header);

    let mut info = StreamInfo {
        file: file.display().to_string(),
        framing,
        compressed_size: data.len() as u64,
        uncompressed_size: None,
        savings: None,
        checksum: None,
        trailing_bytes: 0,
        zlib,
        gzip,
        error: None,
    };

    match decoded {
        Ok(summary) => {
            info.uncompressed_size = Some(summary.produced);
            info.savings = Some(space_savings(summary.produced, summary.consumed));
            info.trailing_bytes = summary.trailing;
            if framing != Framing::Raw {
                info.checksum = Some(inflater.checksum());
            }
        }
        Err(e) => info.error = Some(e.to_string()),
    }

    Ok(info)
}

/// Operating system named by the gzip OS byte.
fn os_name(os: u8) -> &'static str {
    match os {
        0 => "FAT",
        1 => "Amiga",
        2 => "VMS",
        3 => "Unix",
        4 => "VM/CMS",
        5 => "Atari TOS",
        6 => "HPFS",
        7 => "Macintosh",
        8 => "Z-System",
        9 => "CP/M",
        10 => "TOPS-20",
        11 => "NTFS",
        12 => "QDOS",
        13 => "Acorn RISCOS",
        19 => "macOS",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxizlib_deflate::{DeflateOptions, compress, gzip_compress, zlib_compress};

    #[test]
    fn test_inspect_zlib() {
        let input = b"zlib info ".repeat(300);
        let data = zlib_compress(&input, 9).unwrap();
        let info = inspect(Path::new("x.zz"), &data).unwrap();
        assert_eq!(info.framing, Framing::Zlib);
        assert_eq!(info.uncompressed_size, Some(input.len() as u64));
        assert_eq!(info.checksum, Some(oxizlib_core::Adler32::checksum(&input)));
        let zlib = info.zlib.unwrap();
        assert_eq!(zlib.window_size, 32768);
        assert_eq!(zlib.level, "maximum");
        assert!(!zlib.preset_dictionary);
        assert!(info.gzip.is_none());
    }

    #[test]
    fn test_inspect_gzip_header() {
        let header = GzipHeader::with_name(&b"na\xEFve.txt"[..])
            .with_comment("hello")
            .with_mtime(1_700_000_000);
        let data = compress(b"gzip info", &DeflateOptions::gzip(6).with_gzip_header(header)).unwrap();
        let info = inspect(Path::new("x.gz"), &data).unwrap();
        let gzip = info.gzip.unwrap();
        assert_eq!(gzip.name.as_deref(), Some("naïve.txt"));
        assert_eq!(gzip.comment.as_deref(), Some("hello"));
        assert_eq!(gzip.mtime, 1_700_000_000);
        assert_eq!(info.uncompressed_size, Some(9));
    }

    #[test]
    fn test_inspect_reports_dictionary_requirement() {
        let options = DeflateOptions::zlib(6).with_dictionary(&b"dictionary"[..]);
        let data = compress(b"dictionary words", &options).unwrap();
        let info = inspect(Path::new("x.zz"), &data).unwrap();
        assert!(info.zlib.unwrap().preset_dictionary);
        assert!(info.uncompressed_size.is_none());
        assert!(info.error.unwrap().starts_with("need dictionary"));
    }

    #[test]
    fn test_json_shape() {
        let data = gzip_compress(b"json", 6).unwrap();
        let info = inspect(Path::new("x.gz"), &data).unwrap();
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["framing"], "gzip");
        assert_eq!(value["uncompressed_size"], 4);
        assert!(value.get("zlib").is_none());
        assert!(value.get("error").is_none());
    }
}
