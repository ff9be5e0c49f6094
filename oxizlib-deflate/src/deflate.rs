//! Streaming DEFLATE compression.
//!
//! [`Deflater`] consumes input in arbitrary pieces and writes as much
//! compressed output as the caller's buffer allows. Output that does not fit
//! stays queued inside the compressor and goes out on the next call.
//!
//! A stream moves through four phases:
//!
//! 1. header: the zlib or gzip header (nothing for raw streams);
//! 2. busy: blocks produced by the routine chosen for the level and strategy;
//! 3. finish: the last block has been started, the trailer follows;
//! 4. done: the trailer is queued; [`Status::StreamEnd`] once it is out.
//!
//! # Example
//!
//! ```rust
//! use oxizlib_deflate::{Deflater, Inflater};
//! use oxizlib_core::{Compressor, Decompressor};
//!
//! let mut deflater = Deflater::new(6);
//! let compressed = deflater.compress_all(b"Hello, Hello, Hello, World!").unwrap();
//! assert_eq!(&compressed[..2], &[0x78, 0x9C]);
//!
//! let decompressed = Inflater::new().decompress_all(&compressed).unwrap();
//! assert_eq!(decompressed, b"Hello, Hello, Hello, World!");
//! ```

use crate::block::{BlockEncoder, DataType};
use crate::config::{CompressionStrategy, DeflateOptions, DeflateParams, LevelConfig, Wrap};
use crate::gzip::{CM_DEFLATE, GZIP_HEADER_LEN, GZIP_MAGIC, GzipHeader, os, zero_terminated};
use crate::lz77::MatchFinder;
use crate::strategy::{BlockState, BlockStrategy, Compress};
use crate::tables::MIN_MATCH;
use oxizlib_core::crc::Crc32;
use oxizlib_core::error::{OxizError, Result};
use oxizlib_core::stream::{ChecksumKind, StreamBuffers, StreamContext};
use oxizlib_core::traits::{Compressor, FlushMode, Status};

/// FDICT bit of the zlib FLG byte.
const PRESET_DICT: u16 = 0x20;

/// `last_flush` before the first call.
const NOT_STARTED: i32 = -2;

/// `last_flush` after a call that filled the output: the next call may
/// repeat the flush without a buffer error.
const OUTPUT_FULL: i32 = -1;

/// Order flush values by strength, with `Block` between `None` and
/// `Partial`.
fn flush_rank(flush: i32) -> i32 {
    flush * 2 - if flush > 4 { 9 } else { 0 }
}

/// Stream phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Header not written yet.
    Init,
    /// Producing blocks.
    Busy,
    /// The last block is started; only trailer and pending output remain.
    Finish,
}

/// Streaming DEFLATE compressor with zlib, gzip or raw framing.
#[derive(Debug, Clone)]
pub struct Deflater {
    mf: MatchFinder,
    enc: BlockEncoder,
    ctx: StreamContext,
    wrap: Wrap,
    level: u8,
    strategy: CompressionStrategy,
    func: BlockStrategy,
    phase: Phase,
    last_flush: i32,
    trailer_written: bool,
    gzip_header: Option<GzipHeader>,
}

impl Deflater {
    /// Create a zlib compressor at `level` (0-9, clamped).
    pub fn new(level: u8) -> Self {
        Self::from_params(Self::default_params(level, Wrap::Zlib))
    }

    /// Create a raw DEFLATE compressor at `level`.
    pub fn raw(level: u8) -> Self {
        Self::from_params(Self::default_params(level, Wrap::Raw))
    }

    /// Create a gzip compressor at `level` with a default header.
    pub fn gzip(level: u8) -> Self {
        Self::from_params(Self::default_params(level, Wrap::Gzip))
    }

    /// Create a compressor from options.
    ///
    /// Fails with [`OxizError::InvalidOption`] when an option is out of
    /// range or the combination is unsupported.
    pub fn with_options(options: &DeflateOptions) -> Result<Self> {
        let mut deflater = Self::from_params(options.resolve()?);
        deflater.gzip_header = options.gzip_header.clone();
        if let Some(dictionary) = &options.dictionary {
            deflater.set_dictionary(dictionary)?;
        }
        Ok(deflater)
    }

    fn default_params(level: u8, wrap: Wrap) -> DeflateParams {
        DeflateParams {
            level: level.min(9),
            wrap,
            w_bits: 15,
            mem_level: 8,
            strategy: CompressionStrategy::Default,
        }
    }

    fn from_params(params: DeflateParams) -> Self {
        let lit_bufsize = 1usize << (params.mem_level + 6);
        let mut mf = MatchFinder::new(params.w_bits, params.mem_level);
        mf.reset(&LevelConfig::for_level(params.level));
        let kind = match params.wrap {
            Wrap::Zlib => ChecksumKind::Adler32,
            Wrap::Gzip => ChecksumKind::Crc32,
            Wrap::Raw | Wrap::Auto => ChecksumKind::None,
        };

        tracing::debug!(
            level = params.level,
            w_bits = params.w_bits,
            mem_level = params.mem_level,
            strategy = ?params.strategy,
            wrap = ?params.wrap,
            "deflater created"
        );

        Self {
            mf,
            enc: BlockEncoder::new(lit_bufsize, params.level, params.strategy),
            ctx: StreamContext::new(kind),
            wrap: params.wrap,
            level: params.level,
            strategy: params.strategy,
            func: BlockStrategy::select(params.level, params.strategy),
            phase: Phase::Init,
            last_flush: NOT_STARTED,
            trailer_written: false,
            gzip_header: None,
        }
    }

    /// Compression level.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Compression strategy.
    pub fn strategy(&self) -> CompressionStrategy {
        self.strategy
    }

    /// Stream framing.
    pub fn wrap(&self) -> Wrap {
        self.wrap
    }

    /// Total input consumed since the last reset.
    pub fn total_in(&self) -> u64 {
        self.ctx.total_in
    }

    /// Total output produced since the last reset.
    pub fn total_out(&self) -> u64 {
        self.ctx.total_out
    }

    /// Running checksum of the input (Adler-32 or CRC-32; 0 for raw).
    pub fn checksum(&self) -> u32 {
        self.ctx.checksum()
    }

    /// Message of the last error, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.ctx.message()
    }

    /// Best guess at the input type, made when the first block is closed.
    pub fn data_type(&self) -> DataType {
        self.enc.data_type()
    }

    /// Bytes and bits produced but not yet handed out.
    pub fn pending(&self) -> (usize, u32) {
        let bits = self.enc.writer.pending_bits();
        (self.enc.pending_bytes() + (bits / 8) as usize, bits % 8)
    }

    /// Compress `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`. [`Status::StreamEnd`] means
    /// the trailer has been written completely. A call that cannot make any
    /// progress fails with [`OxizError::Buf`], which is not fatal.
    pub fn deflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)> {
        let mut bufs = StreamBuffers::new(input, output);
        let result = self.run(&mut bufs, flush);

        let (consumed, produced) = (bufs.in_pos(), bufs.out_pos());
        self.ctx.total_in += consumed as u64;
        self.ctx.total_out += produced as u64;

        match result {
            Ok(status) => Ok((consumed, produced, status)),
            Err(err) => {
                self.ctx.set_message(err.code().message());
                Err(err)
            }
        }
    }

    fn run(&mut self, bufs: &mut StreamBuffers<'_>, flush: FlushMode) -> Result<Status> {
        if self.phase == Phase::Finish && flush != FlushMode::Finish {
            return Err(OxizError::stream("only Finish may follow Finish"));
        }
        if self.phase == Phase::Finish && bufs.avail_in() != 0 {
            return Err(OxizError::stream("input supplied after Finish"));
        }
        if bufs.avail_out() == 0 {
            return Err(OxizError::Buf);
        }

        let old_flush = self.last_flush;
        self.last_flush = flush.as_i32();

        if self.enc.pending_bytes() != 0 {
            self.enc.flush_pending(bufs);
            if bufs.avail_out() == 0 {
                self.last_flush = OUTPUT_FULL;
                return Ok(Status::Ok);
            }
        } else if bufs.avail_in() == 0
            && flush_rank(flush.as_i32()) <= flush_rank(old_flush)
            && flush != FlushMode::Finish
        {
            return Err(OxizError::Buf);
        }

        if self.phase == Phase::Init {
            match self.wrap {
                Wrap::Zlib => self.write_zlib_header(),
                Wrap::Gzip => self.write_gzip_header(),
                Wrap::Raw | Wrap::Auto => {}
            }
            self.phase = Phase::Busy;
            self.enc.flush_pending(bufs);
            if self.enc.pending_bytes() != 0 {
                self.last_flush = OUTPUT_FULL;
                return Ok(Status::Ok);
            }
        }

        if bufs.avail_in() != 0
            || self.mf.lookahead != 0
            || (flush != FlushMode::None && self.phase != Phase::Finish)
        {
            let state = {
                let mut c = Compress {
                    mf: &mut self.mf,
                    enc: &mut self.enc,
                    bufs: &mut *bufs,
                    ctx: &mut self.ctx,
                };
                self.func.run(&mut c, flush)
            };

            if matches!(state, BlockState::FinishStarted | BlockState::FinishDone) {
                self.phase = Phase::Finish;
            }
            if matches!(state, BlockState::NeedMore | BlockState::FinishStarted) {
                if bufs.avail_out() == 0 {
                    self.last_flush = OUTPUT_FULL;
                }
                return Ok(Status::Ok);
            }
            if state == BlockState::BlockDone {
                self.finish_flush(flush);
                self.enc.flush_pending(bufs);
                if bufs.avail_out() == 0 {
                    self.last_flush = OUTPUT_FULL;
                    return Ok(Status::Ok);
                }
            }
        }

        if flush != FlushMode::Finish {
            return Ok(Status::Ok);
        }
        if self.wrap == Wrap::Raw || self.trailer_written {
            return Ok(if self.enc.pending_bytes() == 0 {
                Status::StreamEnd
            } else {
                Status::Ok
            });
        }

        self.write_trailer(bufs);
        self.enc.flush_pending(bufs);
        Ok(if self.enc.pending_bytes() == 0 {
            Status::StreamEnd
        } else {
            Status::Ok
        })
    }

    /// Emit the marker a completed flush calls for.
    fn finish_flush(&mut self, flush: FlushMode) {
        match flush {
            FlushMode::Partial => self.enc.align(),
            FlushMode::Block => {}
            _ => {
                self.enc.stored_block(&[], false);
                if flush == FlushMode::Full {
                    self.mf.clear_hash();
                    if self.mf.lookahead == 0 {
                        self.mf.strstart = 0;
                        self.mf.block_start = 0;
                        self.mf.insert = 0;
                    }
                }
            }
        }
        tracing::trace!(?flush, strstart = self.mf.strstart, "flush completed");
    }

    fn uses_fast_codes(&self) -> bool {
        matches!(
            self.strategy,
            CompressionStrategy::HuffmanOnly | CompressionStrategy::Rle | CompressionStrategy::Fixed
        ) || self.level < 2
    }

    fn write_zlib_header(&mut self) {
        let mut header = (u16::from(CM_DEFLATE) + ((self.mf.w_bits() as u16 - 8) << 4)) << 8;
        let level_flags: u16 = if self.uses_fast_codes() {
            0
        } else if self.level < 6 {
            1
        } else if self.level == 6 {
            2
        } else {
            3
        };
        header |= level_flags << 6;
        if self.mf.strstart != 0 {
            header |= PRESET_DICT;
        }
        header += 31 - (header % 31);

        self.enc.writer.queue_bytes(&header.to_be_bytes());
        if self.mf.strstart != 0 {
            self.enc.writer.queue_bytes(&self.ctx.checksum().to_be_bytes());
        }
        self.ctx.reset_checksum();
        tracing::debug!(header = format_args!("{header:#06x}"), "zlib header written");
    }

    fn write_gzip_header(&mut self) {
        let xfl = if self.level == 9 {
            2
        } else if self.uses_fast_codes() {
            4
        } else {
            0
        };

        let mut head = Vec::with_capacity(GZIP_HEADER_LEN);
        head.extend_from_slice(&GZIP_MAGIC);
        head.push(CM_DEFLATE);
        match &self.gzip_header {
            None => {
                head.extend_from_slice(&[0, 0, 0, 0, 0]);
                head.push(xfl);
                head.push(os::current());
            }
            Some(header) => {
                head.push(header.flags());
                head.extend_from_slice(&header.mtime.to_le_bytes());
                head.push(xfl);
                head.push(header.os);
                if let Some(extra) = &header.extra {
                    let extra = &extra[..extra.len().min(usize::from(u16::MAX))];
                    head.extend_from_slice(&(extra.len() as u16).to_le_bytes());
                    head.extend_from_slice(extra);
                }
                if let Some(name) = &header.name {
                    head.extend_from_slice(zero_terminated(name));
                    head.push(0);
                }
                if let Some(comment) = &header.comment {
                    head.extend_from_slice(zero_terminated(comment));
                    head.push(0);
                }
                if header.hcrc {
                    let crc = Crc32::compute(&head);
                    head.extend_from_slice(&(crc as u16).to_le_bytes());
                }
            }
        }

        self.enc.writer.queue_bytes(&head);
        self.ctx.reset_checksum();
        tracing::debug!(len = head.len(), "gzip header written");
    }

    fn write_trailer(&mut self, bufs: &StreamBuffers<'_>) {
        let checksum = self.ctx.checksum();
        match self.wrap {
            Wrap::Gzip => {
                let isize = (self.ctx.total_in + bufs.in_pos() as u64) as u32;
                self.enc.writer.write_u32_lsb(checksum);
                self.enc.writer.write_u32_lsb(isize);
            }
            _ => self.enc.writer.write_u32_msb(checksum),
        }
        self.trailer_written = true;
        tracing::trace!(checksum, "trailer written");
    }

    /// Change level and strategy mid-stream.
    ///
    /// When the block routine changes after compression has started, the
    /// data compressed so far is first closed with a [`FlushMode::Block`]
    /// flush into `output`. Returns the bytes written there. Fails with
    /// [`OxizError::Buf`] if that output did not have room for all of it;
    /// the change is not applied then.
    pub fn params(
        &mut self,
        level: i32,
        strategy: CompressionStrategy,
        output: &mut [u8],
    ) -> Result<usize> {
        let level = match level {
            -1 => 6,
            0..=9 => level as u8,
            other => {
                return Err(OxizError::stream(format!(
                    "compression level {other} out of range -1..=9"
                )));
            }
        };

        let mut produced = 0;
        let func = BlockStrategy::select(level, strategy);
        if (strategy != self.strategy || func != self.func) && self.last_flush != NOT_STARTED {
            match self.deflate(&[], output, FlushMode::Block) {
                Ok((_, n, _)) => produced = n,
                Err(OxizError::Buf) => {}
                Err(err) => return Err(err),
            }
            let unflushed = (self.mf.strstart as isize - self.mf.block_start) as usize
                + self.mf.lookahead;
            if unflushed != 0 || self.enc.pending_bytes() != 0 {
                return Err(OxizError::Buf);
            }
        }

        if self.level != level {
            if self.level == 0 {
                self.mf.clear_hash();
            }
            self.level = level;
            self.mf.set_config(&LevelConfig::for_level(level));
            self.enc.level = level;
        }
        if func != self.func {
            self.mf.match_length = MIN_MATCH - 1;
            self.mf.prev_length = MIN_MATCH - 1;
        }
        self.strategy = strategy;
        self.enc.strategy = strategy;
        self.func = func;
        tracing::debug!(level, ?strategy, ?func, "parameters changed");
        Ok(produced)
    }

    /// Override the matcher parameters of the current level.
    pub fn tune(&mut self, good_length: u16, max_lazy: u16, nice_length: u16, max_chain: u16) {
        self.mf.good_match = usize::from(good_length);
        self.mf.max_lazy_match = usize::from(max_lazy);
        self.mf.nice_match = usize::from(nice_length);
        self.mf.max_chain_length = usize::from(max_chain);
    }

    /// Worst-case compressed size of `source_len` bytes with this
    /// compressor's framing and settings, when compressed in one call.
    pub fn bound(&self, source_len: usize) -> usize {
        let n = source_len;
        let fixed_len = n + (n >> 3) + (n >> 8) + (n >> 9) + 4;
        let store_len = n + (n >> 5) + (n >> 7) + (n >> 11) + 7;

        let wrap_len = match self.wrap {
            Wrap::Raw | Wrap::Auto => 0,
            Wrap::Zlib => 6 + if self.mf.strstart != 0 { 4 } else { 0 },
            Wrap::Gzip => match &self.gzip_header {
                Some(header) => header.encoded_len() + 8,
                None => 18,
            },
        };

        if self.mf.w_bits() != 15 || self.mf.hash_bits() != 15 {
            let body = if self.mf.w_bits() <= self.mf.hash_bits() && self.level > 0 {
                fixed_len
            } else {
                store_len
            };
            return body + wrap_len;
        }
        n + (n >> 12) + (n >> 14) + (n >> 25) + 7 + wrap_len
    }

    /// Insert `bits` bits of `value` ahead of the next compressed data.
    pub fn prime(&mut self, bits: u32, value: u32) -> Result<()> {
        if bits > 16 {
            return Err(OxizError::stream(format!("cannot prime {bits} bits")));
        }
        self.enc.writer.write_bits(value, bits);
        Ok(())
    }

    /// Install a preset dictionary.
    ///
    /// zlib streams accept one only before the first call; raw streams
    /// whenever no input is waiting. gzip streams never do.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let allowed = match self.wrap {
            Wrap::Gzip | Wrap::Auto => false,
            Wrap::Zlib => self.phase == Phase::Init,
            Wrap::Raw => true,
        };
        if !allowed || self.mf.lookahead != 0 {
            return Err(OxizError::stream("dictionary not allowed at this point"));
        }

        if self.wrap == Wrap::Zlib {
            self.ctx.update_checksum(dictionary);
        }
        self.mf.load_dictionary(dictionary, self.wrap == Wrap::Raw);
        tracing::debug!(len = dictionary.len(), "dictionary installed");
        Ok(())
    }

    /// The most recent window contents, up to the window size.
    pub fn get_dictionary(&self) -> &[u8] {
        self.mf.dictionary()
    }

    /// Supply the gzip header to write. Must precede the first call.
    pub fn set_header(&mut self, header: GzipHeader) -> Result<()> {
        if self.wrap != Wrap::Gzip || self.phase != Phase::Init {
            return Err(OxizError::stream(
                "a gzip header can only be set on a fresh gzip stream",
            ));
        }
        self.gzip_header = Some(header);
        Ok(())
    }

    /// Start a new stream, keeping the window allocation and settings.
    ///
    /// The matcher state is left alone; use [`Deflater::reset`] for a clean
    /// start.
    pub fn reset_keep(&mut self) {
        self.ctx.reset();
        self.enc.reset();
        self.phase = Phase::Init;
        self.last_flush = NOT_STARTED;
        self.trailer_written = false;
    }

    /// Start a new stream with the same settings.
    pub fn reset(&mut self) {
        self.reset_keep();
        self.mf.reset(&LevelConfig::for_level(self.level));
    }

    /// Release the compressor.
    ///
    /// Fails with a data error if the stream was left between blocks
    /// without being finished; the compressor is dropped either way.
    pub fn end(self) -> Result<()> {
        if self.phase == Phase::Busy {
            return Err(OxizError::data("stream discarded before it was finished"));
        }
        Ok(())
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for Deflater {
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)> {
        self.deflate(input, output, flush)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.phase == Phase::Finish
            && (self.trailer_written || self.wrap == Wrap::Raw)
            && self.enc.pending_bytes() == 0
    }
}

/// Worst-case zlib-compressed size of `source_len` bytes with default
/// settings.
pub fn compress_bound(source_len: usize) -> usize {
    let n = source_len;
    n + (n >> 12) + (n >> 14) + (n >> 25) + 13
}
