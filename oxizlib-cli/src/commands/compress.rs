//! Compress command implementation.

use super::{Framing, StrategyArg};
use crate::utils::{
    compress_stream, confirm_overwrite, create_progress_bar, latin1_encode, open_input,
    space_savings, with_suffix,
};
use oxizlib_deflate::{Deflater, DeflateOptions, GzipHeader};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Options for compressing a file.
pub struct CompressArgs<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub framing: Framing,
    pub level: u8,
    pub strategy: StrategyArg,
    pub window_bits: u8,
    pub mem_level: u8,
    pub dictionary: Option<&'a Path>,
    pub no_name: bool,
    pub stdout: bool,
    pub force: bool,
    pub progress: bool,
    pub verbose: bool,
}

pub fn cmd_compress(args: &CompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let from_stdin = args.input.as_os_str() == "-";
    let to_stdout = args.stdout || (from_stdin && args.output.is_none());

    let mut options = DeflateOptions::zlib(i32::from(args.level))
        .with_window_bits(args.framing.window_bits(args.window_bits))
        .with_mem_level(args.mem_level)
        .with_strategy(args.strategy.into());

    if let Some(path) = args.dictionary {
        if args.framing == Framing::Gzip {
            return Err("gzip streams cannot carry a preset dictionary".into());
        }
        options = options.with_dictionary(std::fs::read(path)?);
    }

    if args.framing == Framing::Gzip {
        options = options.with_gzip_header(gzip_header_for(args.input, args.no_name || from_stdin));
    }

    let mut deflater = Deflater::with_options(&options)?;

    let (reader, len) = open_input(args.input)?;
    let pb = create_progress_bar(len, args.progress && !to_stdout);
    let mut reader = pb.wrap_read(reader);

    let (read, written) = if to_stdout {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        compress_stream(&mut deflater, &mut reader, &mut writer)?
    } else {
        let output = match args.output {
            Some(path) => path.to_path_buf(),
            None => with_suffix(args.input, args.framing.suffix()),
        };
        confirm_overwrite(&output, args.force)?;
        let mut writer = BufWriter::new(File::create(&output)?);
        let counts = compress_stream(&mut deflater, &mut reader, &mut writer)?;
        writer.flush()?;
        if args.verbose {
            eprintln!("  -> {}", output.display());
        }
        counts
    };
    pb.finish_and_clear();

    tracing::info!(
        framing = %args.framing,
        level = args.level,
        read,
        written,
        "compressed"
    );

    if args.verbose {
        eprintln!(
            "{}: {} -> {} bytes ({:.1}% saved, {})",
            args.input.display(),
            read,
            written,
            space_savings(read, written),
            args.framing
        );
    }

    Ok(())
}

/// gzip header carrying the input's name and modification time.
fn gzip_header_for(input: &Path, no_name: bool) -> GzipHeader {
    if no_name {
        return GzipHeader::new();
    }

    let mut header = match input
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(latin1_encode)
    {
        Some(name) => GzipHeader::with_name(name),
        None => {
            tracing::debug!(path = %input.display(), "file name not representable in a gzip header");
            GzipHeader::new()
        }
    };

    let mtime = std::fs::metadata(input)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| u32::try_from(d.as_secs()).ok());
    if let Some(mtime) = mtime {
        header = header.with_mtime(mtime);
    }
    header
}
