//! OxiZlib CLI - zlib, gzip and raw DEFLATE streams from the command line
//!
//! A Pure Rust front end for the streaming `Deflater` and `Inflater`.

mod commands;
mod utils;

use clap::{CommandFactory, Parser, Subcommand};
use commands::{
    CompressArgs, DecompressArgs, Framing, StrategyArg, cmd_completions, cmd_compress,
    cmd_decompress, cmd_info, cmd_test,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxizlib")]
#[command(
    author,
    version,
    about = "The Oxidized zlib - Pure Rust DEFLATE compression utility"
)]
#[command(long_about = "
OxiZlib compresses and decompresses zlib, gzip and raw DEFLATE streams.

Examples:
  oxizlib compress notes.txt
  oxizlib compress -f zlib -l 9 notes.txt
  oxizlib compress --stdout notes.txt > notes.txt.gz
  oxizlib decompress notes.txt.gz
  oxizlib decompress -f raw data.deflate -o data.bin
  oxizlib test a.gz b.zz
  oxizlib info --json notes.txt.gz
  oxizlib completions bash
")]
struct Cli {
    /// Log level for diagnostics on stderr (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// Input file ("-" for stdin)
        input: PathBuf,

        /// Output file (defaults to the input name plus the format suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stream framing
        #[arg(short, long, value_enum, default_value = "gzip")]
        format: Framing,

        /// Compression level (0 = store, 9 = best)
        #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
        level: u8,

        /// Match strategy
        #[arg(short, long, value_enum, default_value = "default")]
        strategy: StrategyArg,

        /// Base-two logarithm of the window size
        #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(9..=15))]
        window_bits: u8,

        /// Memory level for the match finder (1-9)
        #[arg(short, long, default_value_t = 8, value_parser = clap::value_parser!(u8).range(1..=9))]
        mem_level: u8,

        /// Preset dictionary file (zlib and raw only)
        #[arg(short = 'D', long)]
        dictionary: Option<PathBuf>,

        /// Do not store the original name and mtime in a gzip header
        #[arg(short = 'n', long)]
        no_name: bool,

        /// Write to stdout
        #[arg(short = 'c', long)]
        stdout: bool,

        /// Overwrite the output without asking
        #[arg(short = 'F', long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// Input file ("-" for stdin)
        input: PathBuf,

        /// Output file (defaults to the input name without its suffix)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stream framing (zlib or gzip detected from the header if not given)
        #[arg(short, long, value_enum)]
        format: Option<Framing>,

        /// Base-two logarithm of the window size for raw streams
        #[arg(short, long, default_value_t = 15, value_parser = clap::value_parser!(u8).range(8..=15))]
        window_bits: u8,

        /// Preset dictionary file
        #[arg(short = 'D', long)]
        dictionary: Option<PathBuf>,

        /// Do not restore the gzip name and mtime
        #[arg(short = 'n', long)]
        no_name: bool,

        /// Write to stdout
        #[arg(short = 'c', long)]
        stdout: bool,

        /// Overwrite the output without asking
        #[arg(short = 'F', long)]
        force: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Test stream integrity
    #[command(alias = "t")]
    Test {
        /// Files to test
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Stream framing (zlib or gzip detected from the header if not given)
        #[arg(short, long, value_enum)]
        format: Option<Framing>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a compressed file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            format,
            level,
            strategy,
            window_bits,
            mem_level,
            dictionary,
            no_name,
            stdout,
            force,
            progress,
            verbose,
        } => cmd_compress(&CompressArgs {
            input: &input,
            output: output.as_deref(),
            framing: format,
            level,
            strategy,
            window_bits,
            mem_level,
            dictionary: dictionary.as_deref(),
            no_name,
            stdout,
            force,
            progress,
            verbose,
        }),
        Commands::Decompress {
            input,
            output,
            format,
            window_bits,
            dictionary,
            no_name,
            stdout,
            force,
            progress,
            verbose,
        } => cmd_decompress(&DecompressArgs {
            input: &input,
            output: output.as_deref(),
            framing: format,
            window_bits,
            dictionary: dictionary.as_deref(),
            no_name,
            stdout,
            force,
            progress,
            verbose,
        }),
        Commands::Test {
            files,
            format,
            verbose,
        } => cmd_test(&files, format, verbose),
        Commands::Info { file, json } => cmd_info(&file, json),
        Commands::Completions { shell } => cmd_completions(shell, &mut Cli::command()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
