//! Decompress command implementation.

use super::{Framing, inflate_options};
use crate::utils::{
    DecodeSummary, confirm_overwrite, create_progress_bar, decompress_stream, latin1_decode,
    open_input, space_savings, strip_suffix,
};
use filetime::FileTime;
use oxizlib_deflate::{GzipHeader, Inflater};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Options for decompressing a file.
pub struct DecompressArgs<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub framing: Option<Framing>,
    pub window_bits: u8,
    pub dictionary: Option<&'a Path>,
    pub no_name: bool,
    pub stdout: bool,
    pub force: bool,
    pub progress: bool,
    pub verbose: bool,
}

pub fn cmd_decompress(args: &DecompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let from_stdin = args.input.as_os_str() == "-";
    let to_stdout = args.stdout || (from_stdin && args.output.is_none());

    let dictionary = args.dictionary.map(std::fs::read).transpose()?;
    let mut inflater = Inflater::with_options(&inflate_options(args.framing, args.window_bits))?;

    let (reader, len) = open_input(args.input)?;
    let pb = create_progress_bar(len, args.progress && !to_stdout);
    let mut reader = pb.wrap_read(reader);

    let summary = if to_stdout {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        decompress_stream(&mut inflater, &mut reader, &mut writer, dictionary.as_deref())?
    } else {
        // Decode into a temporary name first: the gzip header may rename the output
        let provisional = match args.output {
            Some(path) => path.to_path_buf(),
            None => strip_suffix(args.input),
        };
        let partial = partial_path(&provisional);
        let result = decode_to_file(&partial, &mut inflater, &mut reader, dictionary.as_deref());
        let summary = match result {
            Ok(summary) => summary,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
        };

        let header = inflater.header().filter(|_| !args.no_name);
        let output = match (args.output, header) {
            (None, Some(header)) => original_name(args.input, header).unwrap_or(provisional),
            _ => provisional,
        };
        if let Err(e) = confirm_overwrite(&output, args.force) {
            let _ = std::fs::remove_file(&partial);
            return Err(e);
        }
        std::fs::rename(&partial, &output)?;

        if let Some(header) = header.filter(|h| h.mtime != 0) {
            let mtime = FileTime::from_unix_time(i64::from(header.mtime), 0);
            filetime::set_file_mtime(&output, mtime)?;
            tracing::debug!(mtime = header.mtime, path = %output.display(), "restored mtime");
        }
        if args.verbose {
            eprintln!("  -> {}", output.display());
        }
        summary
    };
    pb.finish_and_clear();

    if summary.trailing > 0 {
        tracing::warn!(bytes = summary.trailing, "ignoring trailing data after the stream");
    }
    tracing::info!(
        consumed = summary.consumed,
        produced = summary.produced,
        "decompressed"
    );

    if args.verbose {
        eprintln!(
            "{}: {} -> {} bytes ({:.1}% saved)",
            args.input.display(),
            summary.consumed,
            summary.produced,
            space_savings(summary.produced, summary.consumed)
        );
    }

    Ok(())
}

fn decode_to_file<R: Read>(
    path: &Path,
    inflater: &mut Inflater,
    reader: &mut R,
    dictionary: Option<&[u8]>,
) -> Result<DecodeSummary, Box<dyn std::error::Error>> {
    let mut writer = BufWriter::new(File::create(path)?);
    let summary = decompress_stream(inflater, reader, &mut writer, dictionary)?;
    writer.flush()?;
    Ok(summary)
}

/// Hidden sibling file the output is written to before it is renamed.
fn partial_path(output: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    if let Some(file_name) = output.file_name() {
        name.push(file_name);
    }
    name.push(".oxizlib-partial");
    output.with_file_name(name)
}

/// The name stored in a gzip header, placed next to the input.
///
/// Only the final path component is used, so a header cannot direct the
/// output into another directory.
fn original_name(input: &Path, header: &GzipHeader) -> Option<PathBuf> {
    let name = latin1_decode(header.name.as_deref()?);
    let file_name = Path::new(&name).file_name()?;
    Some(input.with_file_name(file_name))
}
