//! Test command implementation.

use super::{Framing, inflate_options};
use crate::utils::{DecodeSummary, decompress_stream};
use oxizlib_deflate::Inflater;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

pub fn cmd_test(
    files: &[PathBuf],
    format: Option<Framing>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut ok_count = 0usize;
    let mut error_count = 0usize;
    let mut errors: Vec<(String, String)> = Vec::new();

    for path in files {
        let name = path.display().to_string();
        match test_file(path, format) {
            Ok((framing, summary)) => {
                ok_count += 1;
                if verbose {
                    println!(
                        "  OK: {} ({}, {} -> {} bytes)",
                        name, framing, summary.consumed, summary.produced
                    );
                }
                if summary.trailing > 0 {
                    println!(
                        "  Warning: {}: {} trailing bytes ignored",
                        name, summary.trailing
                    );
                }
            }
            Err(e) => {
                error_count += 1;
                if verbose {
                    println!("  FAILED: {} - {}", name, e);
                }
                errors.push((name, e.to_string()));
            }
        }
    }

    println!();
    println!("Test results:");
    println!("  Total files: {}", files.len());
    println!("  OK: {}", ok_count);
    println!("  Failed: {}", error_count);

    if !errors.is_empty() && !verbose {
        println!();
        println!("Errors:");
        for (name, err) in &errors {
            println!("  {}: {}", name, err);
        }
    }

    if error_count > 0 {
        std::process::exit(2);
    }

    println!();
    println!("All files OK");
    Ok(())
}

/// Decode a whole file, discarding the output.
fn test_file(
    path: &Path,
    format: Option<Framing>,
) -> Result<(Framing, DecodeSummary), Box<dyn std::error::Error>> {
    let mut reader = BufReader::new(File::open(path)?);
    let framing = match format {
        Some(framing) => framing,
        None => Framing::sniff(reader.fill_buf()?),
    };
    let mut inflater = Inflater::with_options(&inflate_options(Some(framing), 15))?;
    let summary = decompress_stream(&mut inflater, &mut reader, &mut io::sink(), None)?;
    Ok((framing, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxizlib_deflate::{deflate, gzip_compress, zlib_compress};

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("oxizlib-test-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_file_detects_framing() {
        let input = b"integrity check ".repeat(100);
        let cases = [
            ("a.gz", gzip_compress(&input, 6).unwrap(), Framing::Gzip),
            ("a.zz", zlib_compress(&input, 6).unwrap(), Framing::Zlib),
            ("a.deflate", deflate(&input, 6).unwrap(), Framing::Raw),
        ];
        for (name, data, expected) in cases {
            let path = temp_file(name, &data);
            let (framing, summary) = test_file(&path, None).unwrap();
            assert_eq!(framing, expected);
            assert_eq!(summary.produced, input.len() as u64);
            std::fs::remove_file(&path).unwrap();
        }
    }

    #[test]
    fn test_file_reports_corruption() {
        let mut data = zlib_compress(&b"abc".repeat(50), 6).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        let path = temp_file("bad.zz", &data);
        let err = test_file(&path, Some(Framing::Zlib)).unwrap_err();
        assert_eq!(err.to_string(), "data error: incorrect data check");
        std::fs::remove_file(&path).unwrap();
    }
}
