//! Streaming DEFLATE decompression.
//!
//! [`Inflater`] is a resumable state machine: every call decodes as much
//! as the input and output allow, then returns with its position recorded
//! in [`Mode`]. Splitting the input or output at any byte boundary gives the
//! same result as a single call.
//!
//! Header modes fall through to each other within one call; a call only
//! returns early when it runs out of input or output space, asks for a
//! dictionary, reaches the end of the stream, or finds corrupt data.
//!
//! # Example
//!
//! ```rust
//! use oxizlib_deflate::{Deflater, Inflater};
//! use oxizlib_core::{Compressor, Decompressor, FlushMode, Status};
//!
//! let compressed = Deflater::gzip(6).compress_all(b"streaming").unwrap();
//!
//! let mut inflater = Inflater::auto();
//! let mut out = [0u8; 64];
//! let mut produced = 0;
//! for byte in compressed.chunks(1) {
//!     let (_, n, _) = inflater.decompress(byte, &mut out[produced..], FlushMode::None).unwrap();
//!     produced += n;
//! }
//! assert!(inflater.is_finished());
//! assert_eq!(&out[..produced], b"streaming");
//! ```

use crate::config::{InflateOptions, Wrap, resolve_inflate_bits};
use crate::decode_table::{
    Code, CodeType, ENOUGH_DISTS, ENOUGH_LENS, OP_END_OF_BLOCK, OP_INVALID, inflate_table,
};
use crate::gzip::{CM_DEFLATE, GzipHeader, MAX_FIELD_LEN, flags};
use crate::inflate_fast::{
    DecodeTables, FAST_MIN_INPUT, FAST_MIN_OUTPUT, FastExit, copy_from_window, inflate_fast,
};
use crate::tables::{BL_ORDER, FIXED_DISTBITS, FIXED_LENBITS, fixed_decode_tables};
use oxizlib_core::adler::Adler32;
use oxizlib_core::bitstream::BitAccumulator;
use oxizlib_core::crc::Crc32;
use oxizlib_core::error::{OxizError, Result};
use oxizlib_core::ringbuffer::HistoryWindow;
use oxizlib_core::stream::{ChecksumKind, StreamBuffers, StreamContext};
use oxizlib_core::traits::{Decompressor, FlushMode, Status};

/// Decoder position.
///
/// The order matters: modes before [`Mode::Check`] are still producing
/// data, modes from [`Mode::Bad`] on are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// Waiting for the zlib or gzip header.
    Head,
    /// gzip: method and flags.
    Flags,
    /// gzip: modification time.
    Time,
    /// gzip: extra flags and operating system.
    Os,
    /// gzip: extra field length.
    ExLen,
    /// gzip: extra field bytes.
    Extra,
    /// gzip: file name.
    Name,
    /// gzip: comment.
    Comment,
    /// gzip: header CRC.
    HCrc,
    /// zlib: dictionary id.
    DictId,
    /// zlib: waiting for the dictionary.
    Dict,
    /// Between blocks; stops here for [`FlushMode::Block`].
    Type,
    /// Reading a block header.
    TypeDo,
    /// Stored block lengths.
    Stored,
    /// Copying a stored block.
    CopyBlock,
    /// Dynamic block table sizes.
    Table,
    /// Code length code lengths.
    LenLens,
    /// Literal/length and distance code lengths.
    CodeLens,
    /// Literal/length code.
    Len,
    /// Length extra bits.
    LenExt,
    /// Distance code.
    Dist,
    /// Distance extra bits.
    DistExt,
    /// Copying a match.
    Match,
    /// Writing a literal.
    Lit,
    /// Reading the checksum trailer.
    Check,
    /// gzip: reading the length trailer.
    Length,
    /// Stream complete.
    Done,
    /// Corrupt data; the stream cannot continue.
    Bad,
    /// Out of memory; the stream cannot continue.
    Mem,
    /// Searching for a flush point after [`Inflater::sync`] failed.
    Sync,
}

/// Stream framing seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// No header parsed yet.
    Unknown,
    Zlib,
    /// gzip, with its FLG byte.
    Gzip(u8),
}

/// What a single mode step asks the driver to do.
enum Flow {
    Next,
    Leave(Result<Status>),
}

/// Return from the step when the input runs dry.
macro_rules! need {
    ($cond:expr) => {
        if !$cond {
            return Flow::Leave(Ok(Status::Ok));
        }
    };
}

/// Streaming DEFLATE decompressor with zlib, gzip or raw framing.
#[derive(Debug, Clone)]
pub struct Inflater {
    mode: Mode,
    /// Configured framing; `Raw` after a sync on a headerless stream.
    wrap: Wrap,
    framing: Framing,
    /// Whether trailer checksums are verified.
    validate: bool,
    /// Configured window bits, 0 to take them from the zlib header.
    wbits: u32,
    window: HistoryWindow,
    acc: BitAccumulator,
    ctx: StreamContext,
    /// Uncompressed bytes for the gzip length check.
    total: u64,
    /// Output position up to which the checksum is current.
    out_mark: usize,

    last: bool,
    havedict: bool,
    dict_id: Option<u32>,
    dictionary: Option<Vec<u8>>,

    /// Stored block bytes left, or match length.
    length: usize,
    offset: usize,
    extra: u32,

    fixed: bool,
    lenbits: u32,
    distbits: u32,
    ncode: usize,
    nlen: usize,
    ndist: usize,
    have: usize,
    lens: [u16; 320],
    lens_table: Vec<Code>,
    dist_table: Vec<Code>,

    head: Option<GzipHeader>,
    hcrc: Crc32,
    sync_got: usize,
}

impl Inflater {
    /// Create a zlib decompressor with a 32 KiB window.
    pub fn new() -> Self {
        Self::from_bits(Wrap::Zlib, 15)
    }

    /// Create a raw DEFLATE decompressor with a 32 KiB window.
    pub fn raw() -> Self {
        Self::from_bits(Wrap::Raw, 15)
    }

    /// Create a gzip decompressor.
    pub fn gzip() -> Self {
        Self::from_bits(Wrap::Gzip, 15)
    }

    /// Create a decompressor accepting zlib or gzip.
    pub fn auto() -> Self {
        Self::from_bits(Wrap::Auto, 15)
    }

    /// Create a decompressor from options.
    ///
    /// A dictionary in the options is installed right away for raw streams
    /// and applied automatically when a zlib stream asks for it.
    pub fn with_options(options: &InflateOptions) -> Result<Self> {
        let (wrap, bits) = resolve_inflate_bits(options.window_bits)?;
        let mut inflater = Self::from_bits(wrap, bits);
        inflater.dictionary = options.dictionary.clone();
        if wrap == Wrap::Raw {
            if let Some(dictionary) = options.dictionary.clone() {
                inflater.set_dictionary(&dictionary)?;
            }
        }
        Ok(inflater)
    }

    fn from_bits(wrap: Wrap, wbits: u32) -> Self {
        let mut inflater = Self {
            mode: Mode::Head,
            wrap,
            framing: Framing::Unknown,
            validate: wrap != Wrap::Raw,
            wbits,
            window: HistoryWindow::new(wbits),
            acc: BitAccumulator::new(),
            ctx: StreamContext::new(ChecksumKind::None),
            total: 0,
            out_mark: 0,
            last: false,
            havedict: false,
            dict_id: None,
            dictionary: None,
            length: 0,
            offset: 0,
            extra: 0,
            fixed: false,
            lenbits: 0,
            distbits: 0,
            ncode: 0,
            nlen: 0,
            ndist: 0,
            have: 0,
            lens: [0; 320],
            lens_table: vec![Code::default(); ENOUGH_LENS],
            dist_table: vec![Code::default(); ENOUGH_DISTS],
            head: None,
            hcrc: Crc32::new(),
            sync_got: 0,
        };
        inflater.reset_keep();
        inflater
    }

    /// Current decoder mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Total input consumed since the last reset.
    pub fn total_in(&self) -> u64 {
        self.ctx.total_in
    }

    /// Total output produced since the last reset.
    pub fn total_out(&self) -> u64 {
        self.ctx.total_out
    }

    /// Running checksum of the output so far. While the stream waits for a
    /// dictionary this is the dictionary id instead.
    pub fn checksum(&self) -> u32 {
        match (self.mode, self.dict_id) {
            (Mode::Dict, Some(id)) => id,
            _ => self.ctx.checksum(),
        }
    }

    /// Message of the last error, if any.
    pub fn message(&self) -> Option<&'static str> {
        self.ctx.message()
    }

    /// The gzip header, as far as it has been parsed.
    pub fn header(&self) -> Option<&GzipHeader> {
        self.head.as_ref()
    }

    /// Decompress `input` into `output`.
    ///
    /// Returns `(consumed, produced, status)`. With [`FlushMode::Block`] the
    /// call also returns at each block boundary. A call that makes no
    /// progress at all fails with [`OxizError::Buf`], which is not fatal;
    /// corrupt data fails with [`OxizError::Data`] and ends the stream.
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)> {
        if self.mode == Mode::Sync {
            return Err(OxizError::stream("no flush point found; call sync again"));
        }
        if self.mode == Mode::Mem {
            return Err(OxizError::Mem);
        }

        let mut bufs = StreamBuffers::new(input, output);
        if self.mode == Mode::Type {
            self.mode = Mode::TypeDo;
        }
        self.out_mark = 0;

        let ret = loop {
            if let Flow::Leave(ret) = self.step(&mut bufs, flush) {
                break ret;
            }
        };

        let (consumed, produced) = (bufs.in_pos(), bufs.out_pos());
        if self.window.is_allocated()
            || (produced != 0
                && self.mode < Mode::Bad
                && (self.mode < Mode::Check || flush != FlushMode::Finish))
        {
            if let Err(err) = self.window.update(bufs.written_since(0)) {
                self.mode = Mode::Mem;
                return Err(err);
            }
        }
        self.checkpoint(&bufs);
        self.ctx.total_in += consumed as u64;
        self.ctx.total_out += produced as u64;

        match ret {
            Ok(Status::Ok) if consumed == 0 && produced == 0 => Err(OxizError::Buf),
            Ok(status) => Ok((consumed, produced, status)),
            Err(err) => Err(err),
        }
    }

    /// Fold the output written since the last checkpoint into the checksum
    /// and the gzip length.
    fn checkpoint(&mut self, bufs: &StreamBuffers<'_>) {
        let fresh = bufs.written_since(self.out_mark);
        self.total += fresh.len() as u64;
        if self.validate {
            self.ctx.update_checksum(fresh);
        }
        self.out_mark = bufs.out_pos();
    }

    fn bad(&mut self, msg: &'static str) -> Flow {
        tracing::debug!(msg, mode = ?self.mode, total_in = self.ctx.total_in, "stream is corrupt");
        self.ctx.set_message(msg);
        self.mode = Mode::Bad;
        Flow::Next
    }

    /// Run the current mode once.
    fn step(&mut self, bufs: &mut StreamBuffers<'_>, flush: FlushMode) -> Flow {
        match self.mode {
            Mode::Head => self.head_mode(bufs),
            Mode::Flags => {
                need!(self.acc.need_bits(bufs, 16));
                let flg = (self.acc.bits(16) >> 8) as u8;
                if self.acc.bits(8) as u8 != CM_DEFLATE {
                    return self.bad("unknown compression method");
                }
                if flg & flags::RESERVED != 0 {
                    return self.bad("unknown header flags set");
                }
                self.framing = Framing::Gzip(flg);
                if let Some(head) = &mut self.head {
                    head.text = flg & flags::FTEXT != 0;
                    head.hcrc = flg & flags::FHCRC != 0;
                }
                self.header_crc_bits(16);
                self.acc.clear();
                self.mode = Mode::Time;
                Flow::Next
            }
            Mode::Time => {
                need!(self.acc.need_bits(bufs, 32));
                if let Some(head) = &mut self.head {
                    head.mtime = self.acc.bits(32);
                }
                self.header_crc_bits(32);
                self.acc.clear();
                self.mode = Mode::Os;
                Flow::Next
            }
            Mode::Os => {
                need!(self.acc.need_bits(bufs, 16));
                if let Some(head) = &mut self.head {
                    head.xfl = self.acc.bits(8) as u8;
                    head.os = (self.acc.bits(16) >> 8) as u8;
                }
                self.header_crc_bits(16);
                self.acc.clear();
                self.mode = Mode::ExLen;
                Flow::Next
            }
            Mode::ExLen => {
                if self.gzip_flag(flags::FEXTRA) {
                    need!(self.acc.need_bits(bufs, 16));
                    self.length = self.acc.bits(16) as usize;
                    if let Some(head) = &mut self.head {
                        head.extra = Some(Vec::with_capacity(self.length.min(MAX_FIELD_LEN)));
                    }
                    self.header_crc_bits(16);
                    self.acc.clear();
                }
                self.mode = Mode::Extra;
                Flow::Next
            }
            Mode::Extra => {
                if self.gzip_flag(flags::FEXTRA) {
                    let input = bufs.input();
                    let n = self.length.min(input.len());
                    if let Some(head) = &mut self.head {
                        capture(&mut head.extra, &input[..n]);
                    }
                    self.hcrc.update(&input[..n]);
                    bufs.advance_input(n);
                    self.length -= n;
                    need!(self.length == 0);
                }
                self.mode = Mode::Name;
                Flow::Next
            }
            Mode::Name => {
                if self.gzip_flag(flags::FNAME) {
                    need!(self.header_string(bufs, |head| &mut head.name));
                }
                self.mode = Mode::Comment;
                Flow::Next
            }
            Mode::Comment => {
                if self.gzip_flag(flags::FCOMMENT) {
                    need!(self.header_string(bufs, |head| &mut head.comment));
                }
                self.mode = Mode::HCrc;
                Flow::Next
            }
            Mode::HCrc => {
                if self.gzip_flag(flags::FHCRC) {
                    need!(self.acc.need_bits(bufs, 16));
                    if self.validate && self.acc.bits(16) != self.hcrc.value() & 0xFFFF {
                        return self.bad("header crc mismatch");
                    }
                    self.acc.clear();
                }
                if let Some(head) = &mut self.head {
                    head.done = true;
                }
                tracing::debug!(header = ?self.head, "gzip header parsed");
                self.ctx.reset_checksum();
                self.mode = Mode::Type;
                Flow::Next
            }
            Mode::DictId => {
                need!(self.acc.need_bits(bufs, 32));
                let id = self.acc.bits(32).swap_bytes();
                self.dict_id = Some(id);
                self.acc.clear();
                self.mode = Mode::Dict;
                Flow::Next
            }
            Mode::Dict => {
                if !self.havedict {
                    match self.dictionary.take() {
                        Some(dictionary) => {
                            let applied = self.set_dictionary(&dictionary);
                            self.dictionary = Some(dictionary);
                            if let Err(err) = applied {
                                return Flow::Leave(Err(err));
                            }
                        }
                        None => return Flow::Leave(Ok(Status::NeedDict)),
                    }
                }
                self.ctx.reset_checksum();
                self.mode = Mode::Type;
                Flow::Next
            }
            Mode::Type => {
                if flush == FlushMode::Block {
                    return Flow::Leave(Ok(Status::Ok));
                }
                self.mode = Mode::TypeDo;
                Flow::Next
            }
            Mode::TypeDo => self.block_header(bufs),
            Mode::Stored => {
                self.acc.byte_align();
                need!(self.acc.need_bits(bufs, 32));
                let len = self.acc.bits(16);
                let nlen = self.acc.bits(32) >> 16;
                if len != nlen ^ 0xFFFF {
                    return self.bad("invalid stored block lengths");
                }
                self.length = len as usize;
                self.acc.clear();
                tracing::trace!(len, "stored block");
                self.mode = Mode::CopyBlock;
                Flow::Next
            }
            Mode::CopyBlock => {
                if self.length > 0 {
                    let n = self.length.min(bufs.avail_in()).min(bufs.avail_out());
                    need!(n > 0);
                    let input = bufs.input();
                    bufs.write_output(&input[..n]);
                    bufs.advance_input(n);
                    self.length -= n;
                    return Flow::Next;
                }
                self.mode = Mode::Type;
                Flow::Next
            }
            Mode::Table => {
                need!(self.acc.need_bits(bufs, 14));
                self.nlen = self.acc.bits(5) as usize + 257;
                self.acc.drop_bits(5);
                self.ndist = self.acc.bits(5) as usize + 1;
                self.acc.drop_bits(5);
                self.ncode = self.acc.bits(4) as usize + 4;
                self.acc.drop_bits(4);
                if self.nlen > 286 || self.ndist > 30 {
                    return self.bad("too many length or distance symbols");
                }
                self.have = 0;
                self.mode = Mode::LenLens;
                Flow::Next
            }
            Mode::LenLens => {
                while self.have < self.ncode {
                    need!(self.acc.need_bits(bufs, 3));
                    self.lens[BL_ORDER[self.have]] = self.acc.bits(3) as u16;
                    self.acc.drop_bits(3);
                    self.have += 1;
                }
                while self.have < 19 {
                    self.lens[BL_ORDER[self.have]] = 0;
                    self.have += 1;
                }
                match inflate_table(CodeType::Codes, &self.lens[..19], &mut self.lens_table, 7) {
                    Ok((_, bits)) => self.lenbits = bits,
                    Err(_) => return self.bad("invalid code lengths set"),
                }
                self.fixed = false;
                self.have = 0;
                self.mode = Mode::CodeLens;
                Flow::Next
            }
            Mode::CodeLens => self.code_lengths(bufs),
            Mode::Len => self.length_code(bufs),
            Mode::LenExt => {
                if self.extra > 0 {
                    need!(self.acc.need_bits(bufs, self.extra));
                    self.length += self.acc.bits(self.extra) as usize;
                    self.acc.drop_bits(self.extra);
                }
                self.mode = Mode::Dist;
                Flow::Next
            }
            Mode::Dist => {
                let (_, distcode) = active_tables(self.fixed, &self.lens_table, &self.dist_table);
                let here = match decode(&mut self.acc, bufs, distcode, self.distbits) {
                    Some(here) => here,
                    None => return Flow::Leave(Ok(Status::Ok)),
                };
                if here.op & OP_INVALID != 0 {
                    return self.bad("invalid distance code");
                }
                self.offset = usize::from(here.val);
                self.extra = u32::from(here.op & 15);
                self.mode = Mode::DistExt;
                Flow::Next
            }
            Mode::DistExt => {
                if self.extra > 0 {
                    need!(self.acc.need_bits(bufs, self.extra));
                    self.offset += self.acc.bits(self.extra) as usize;
                    self.acc.drop_bits(self.extra);
                }
                self.mode = Mode::Match;
                Flow::Next
            }
            Mode::Match => self.copy_match(bufs),
            Mode::Lit => {
                need!(bufs.avail_out() > 0);
                bufs.push_output(self.length as u8);
                self.mode = Mode::Len;
                Flow::Next
            }
            Mode::Check => {
                if self.framing != Framing::Unknown || self.wrap != Wrap::Raw {
                    need!(self.acc.need_bits(bufs, 32));
                    self.checkpoint(bufs);
                    let stored = match self.framing {
                        Framing::Gzip(_) => self.acc.bits(32),
                        _ => self.acc.bits(32).swap_bytes(),
                    };
                    if self.validate && stored != self.ctx.checksum() {
                        return self.bad("incorrect data check");
                    }
                    self.acc.clear();
                }
                self.mode = Mode::Length;
                Flow::Next
            }
            Mode::Length => {
                if matches!(self.framing, Framing::Gzip(_)) && self.wrap != Wrap::Raw {
                    need!(self.acc.need_bits(bufs, 32));
                    if self.validate && self.acc.bits(32) != self.total as u32 {
                        return self.bad("incorrect length check");
                    }
                    self.acc.clear();
                }
                tracing::debug!(total = self.total, "stream complete");
                self.mode = Mode::Done;
                Flow::Next
            }
            Mode::Done => Flow::Leave(Ok(Status::StreamEnd)),
            Mode::Bad => Flow::Leave(Err(OxizError::data(
                self.ctx.message().unwrap_or("invalid stream"),
            ))),
            Mode::Mem => Flow::Leave(Err(OxizError::Mem)),
            Mode::Sync => Flow::Leave(Err(OxizError::stream("no flush point found"))),
        }
    }

    fn head_mode(&mut self, bufs: &mut StreamBuffers<'_>) -> Flow {
        if self.wrap == Wrap::Raw {
            self.mode = Mode::TypeDo;
            return Flow::Next;
        }
        need!(self.acc.need_bits(bufs, 16));
        let hold = self.acc.bits(16);

        let gzip_allowed = matches!(self.wrap, Wrap::Gzip | Wrap::Auto);
        if gzip_allowed && hold == 0x8B1F {
            if self.wbits == 0 {
                self.wbits = 15;
                self.window.set_bits(15);
            }
            self.ctx.set_kind(ChecksumKind::Crc32);
            self.hcrc = Crc32::new();
            self.header_crc_bits(16);
            self.head = Some(GzipHeader {
                os: 0,
                ..GzipHeader::default()
            });
            self.acc.clear();
            self.mode = Mode::Flags;
            return Flow::Next;
        }

        let zlib_allowed = matches!(self.wrap, Wrap::Zlib | Wrap::Auto);
        let cmf = self.acc.bits(8);
        let flg = hold >> 8;
        if !zlib_allowed || ((cmf << 8) + flg) % 31 != 0 {
            return self.bad("incorrect header check");
        }
        if cmf & 0x0F != u32::from(CM_DEFLATE) {
            return self.bad("unknown compression method");
        }
        let len = (cmf >> 4) + 8;
        if self.wbits == 0 {
            self.wbits = len;
            self.window.set_bits(len);
        }
        if len > 15 || len > self.wbits {
            return self.bad("invalid window size");
        }

        self.framing = Framing::Zlib;
        self.ctx.set_kind(ChecksumKind::Adler32);
        self.acc.clear();
        let fdict = flg & 0x20 != 0;
        tracing::debug!(window_bits = len, fdict, "zlib header parsed");
        self.mode = if fdict { Mode::DictId } else { Mode::Type };
        Flow::Next
    }

    fn block_header(&mut self, bufs: &mut StreamBuffers<'_>) -> Flow {
        if self.last {
            self.acc.byte_align();
            self.mode = Mode::Check;
            return Flow::Next;
        }
        need!(self.acc.need_bits(bufs, 3));
        self.last = self.acc.bits(1) == 1;
        self.acc.drop_bits(1);
        let kind = self.acc.bits(2);
        self.acc.drop_bits(2);
        tracing::trace!(kind, last = self.last, "block header");
        match kind {
            0 => self.mode = Mode::Stored,
            1 => {
                self.fixed = true;
                self.lenbits = FIXED_LENBITS;
                self.distbits = FIXED_DISTBITS;
                self.mode = Mode::Len;
            }
            2 => self.mode = Mode::Table,
            _ => return self.bad("invalid block type"),
        }
        Flow::Next
    }

    fn code_lengths(&mut self, bufs: &mut StreamBuffers<'_>) -> Flow {
        let total = self.nlen + self.ndist;
        while self.have < total {
            // The code stays in the accumulator until its repeat bits are in
            let (here, used) = match peek_code(&mut self.acc, bufs, &self.lens_table, self.lenbits)
            {
                Some(found) => found,
                None => return Flow::Leave(Ok(Status::Ok)),
            };
            if here.val < 16 {
                self.acc.drop_bits(used);
                self.lens[self.have] = here.val;
                self.have += 1;
                continue;
            }

            let (len, copy) = match here.val {
                16 => {
                    need!(self.acc.need_bits(bufs, used + 2));
                    self.acc.drop_bits(used);
                    if self.have == 0 {
                        return self.bad("invalid bit length repeat");
                    }
                    let copy = 3 + self.acc.bits(2) as usize;
                    self.acc.drop_bits(2);
                    (self.lens[self.have - 1], copy)
                }
                17 => {
                    need!(self.acc.need_bits(bufs, used + 3));
                    self.acc.drop_bits(used);
                    let copy = 3 + self.acc.bits(3) as usize;
                    self.acc.drop_bits(3);
                    (0, copy)
                }
                _ => {
                    need!(self.acc.need_bits(bufs, used + 7));
                    self.acc.drop_bits(used);
                    let copy = 11 + self.acc.bits(7) as usize;
                    self.acc.drop_bits(7);
                    (0, copy)
                }
            };
            if self.have + copy > total {
                return self.bad("invalid bit length repeat");
            }
            self.lens[self.have..self.have + copy].fill(len);
            self.have += copy;
        }

        if self.lens[256] == 0 {
            return self.bad("invalid code -- missing end-of-block");
        }
        match inflate_table(CodeType::Lens, &self.lens[..self.nlen], &mut self.lens_table, 9) {
            Ok((_, bits)) => self.lenbits = bits,
            Err(_) => return self.bad("invalid literal/lengths set"),
        }
        let dist_lens = &self.lens[self.nlen..total];
        match inflate_table(CodeType::Dists, dist_lens, &mut self.dist_table, 6) {
            Ok((_, bits)) => self.distbits = bits,
            Err(_) => return self.bad("invalid distances set"),
        }
        tracing::trace!(nlen = self.nlen, ndist = self.ndist, "dynamic tables built");
        self.mode = Mode::Len;
        Flow::Next
    }

    fn length_code(&mut self, bufs: &mut StreamBuffers<'_>) -> Flow {
        if bufs.avail_in() >= FAST_MIN_INPUT && bufs.avail_out() >= FAST_MIN_OUTPUT {
            let (lencode, distcode) = active_tables(self.fixed, &self.lens_table, &self.dist_table);
            let tables = DecodeTables {
                lencode,
                lenbits: self.lenbits,
                distcode,
                distbits: self.distbits,
            };
            match inflate_fast(bufs, &mut self.acc, &tables, &self.window) {
                FastExit::Continue => {}
                FastExit::EndOfBlock => self.mode = Mode::Type,
                FastExit::Bad(msg) => return self.bad(msg),
            }
            return Flow::Next;
        }

        let (lencode, _) = active_tables(self.fixed, &self.lens_table, &self.dist_table);
        let here = match decode(&mut self.acc, bufs, lencode, self.lenbits) {
            Some(here) => here,
            None => return Flow::Leave(Ok(Status::Ok)),
        };
        self.length = usize::from(here.val);
        if here.op == 0 {
            self.mode = Mode::Lit;
        } else if here.op & OP_END_OF_BLOCK != 0 {
            self.mode = Mode::Type;
        } else if here.op & OP_INVALID != 0 {
            return self.bad("invalid literal/length code");
        } else {
            self.extra = u32::from(here.op & 15);
            self.mode = Mode::LenExt;
        }
        Flow::Next
    }

    fn copy_match(&mut self, bufs: &mut StreamBuffers<'_>) -> Flow {
        need!(bufs.avail_out() > 0);
        let produced = bufs.out_pos();
        if self.offset > produced {
            let back = self.offset - produced;
            if back > self.window.have() {
                return self.bad("invalid distance too far back");
            }
            let len = self.length.min(bufs.avail_out());
            let n = copy_from_window(&self.window, back, bufs.output_mut(), len);
            bufs.advance_output(n);
            self.length -= n;
        } else {
            let n = self.length.min(bufs.avail_out());
            bufs.copy_within_output(self.offset, n);
            self.length -= n;
        }
        if self.length == 0 {
            self.mode = Mode::Len;
        }
        Flow::Next
    }

    fn gzip_flag(&self, flag: u8) -> bool {
        matches!(self.framing, Framing::Gzip(flg) if flg & flag != 0)
    }

    /// Fold the low `n` bits of the register, as little-endian bytes, into
    /// the header CRC.
    fn header_crc_bits(&mut self, n: u32) {
        let bytes = self.acc.hold().to_le_bytes();
        self.hcrc.update(&bytes[..(n / 8) as usize]);
    }

    /// Read a zero-terminated header string. Returns `false` if the input
    /// ran out before the terminator.
    fn header_string(
        &mut self,
        bufs: &mut StreamBuffers<'_>,
        field: impl Fn(&mut GzipHeader) -> &mut Option<Vec<u8>>,
    ) -> bool {
        let input = bufs.input();
        if input.is_empty() {
            return false;
        }
        let (taken, text, complete) = match input.iter().position(|&b| b == 0) {
            Some(end) => (end + 1, &input[..end], true),
            None => (input.len(), input, false),
        };
        if let Some(head) = &mut self.head {
            capture(field(head), text);
        }
        self.hcrc.update(&input[..taken]);
        bufs.advance_input(taken);
        complete
    }

    /// Install a dictionary.
    ///
    /// Raw streams accept one at any time. zlib streams accept one only
    /// after [`Status::NeedDict`], and only the dictionary whose Adler-32
    /// matches the id in the header; anything else is a data error.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.wrap != Wrap::Raw && self.mode != Mode::Dict {
            return Err(OxizError::stream("the stream is not waiting for a dictionary"));
        }
        if self.mode == Mode::Dict {
            let id = Adler32::checksum(dictionary);
            if Some(id) != self.dict_id {
                return Err(OxizError::data("incorrect dictionary"));
            }
        }
        if let Err(err) = self.window.preload_dictionary(dictionary) {
            self.mode = Mode::Mem;
            return Err(err);
        }
        self.havedict = true;
        tracing::debug!(len = dictionary.len(), "dictionary installed");
        Ok(())
    }

    /// The current history window, oldest byte first.
    pub fn get_dictionary(&self) -> Vec<u8> {
        let (older, newer) = self.window.contents();
        let mut dictionary = Vec::with_capacity(older.len() + newer.len());
        dictionary.extend_from_slice(older);
        dictionary.extend_from_slice(newer);
        dictionary
    }

    /// Skip input up to the next full flush point (an empty stored block,
    /// `00 00 FF FF`).
    ///
    /// Returns the bytes consumed and whether the point was found. When it
    /// was, decoding resumes at the next block; the checksum is no longer
    /// verified since data was lost. When it was not, call again with more
    /// input.
    pub fn sync(&mut self, input: &[u8]) -> Result<(usize, bool)> {
        if input.is_empty() && self.acc.count() < 8 {
            return Err(OxizError::Buf);
        }

        if self.mode != Mode::Sync {
            self.mode = Mode::Sync;
            self.acc.byte_align();
            let mut held = [0u8; 8];
            let mut len = 0;
            while self.acc.count() >= 8 {
                held[len] = self.acc.bits(8) as u8;
                self.acc.drop_bits(8);
                len += 1;
            }
            self.sync_got = 0;
            sync_search(&mut self.sync_got, &held[..len]);
        }

        let consumed = sync_search(&mut self.sync_got, input);
        self.ctx.total_in += consumed as u64;
        if self.sync_got != 4 {
            return Ok((consumed, false));
        }

        if self.framing == Framing::Unknown {
            self.wrap = Wrap::Raw;
        } else {
            self.validate = false;
        }
        let (framing, total_in, total_out) = (self.framing, self.ctx.total_in, self.ctx.total_out);
        self.reset();
        self.framing = framing;
        self.ctx.total_in = total_in;
        self.ctx.total_out = total_out;
        self.mode = Mode::Type;
        tracing::debug!(total_in, "resynchronized at flush point");
        Ok((consumed, true))
    }

    /// Whether decoding stopped right after a stored block header with no
    /// bits pending, i.e. at a point where a stream could be restarted.
    pub fn is_at_sync_point(&self) -> bool {
        self.mode == Mode::Stored && self.acc.count() == 0
    }

    /// Start a new stream, keeping the window storage.
    pub fn reset_keep(&mut self) {
        self.ctx.reset();
        self.ctx.set_kind(ChecksumKind::None);
        self.total = 0;
        self.mode = Mode::Head;
        self.framing = Framing::Unknown;
        self.last = false;
        self.havedict = false;
        self.dict_id = None;
        self.head = None;
        self.acc.clear();
        self.fixed = false;
        self.length = 0;
        self.sync_got = 0;
    }

    /// Start a new stream with the same configuration.
    pub fn reset(&mut self) {
        self.reset_keep();
        self.window.clear();
        self.validate = self.wrap != Wrap::Raw;
    }

    /// Start a new stream with different window bits (same encoding as
    /// [`InflateOptions::window_bits`]).
    pub fn reset_with_window_bits(&mut self, window_bits: i32) -> Result<()> {
        let (wrap, bits) = resolve_inflate_bits(window_bits)?;
        self.wrap = wrap;
        self.wbits = bits;
        self.window.set_bits(bits);
        self.reset();
        Ok(())
    }

    /// Release the decompressor.
    pub fn end(self) -> Result<()> {
        Ok(())
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, Status)> {
        self.inflate(input, output, flush)
    }

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.mode == Mode::Done
    }

    fn dictionary_id(&self) -> Option<u32> {
        self.dict_id
    }
}

/// The fixed tables, or the ones built for the current dynamic block.
fn active_tables<'t>(fixed: bool, lens: &'t [Code], dists: &'t [Code]) -> (&'t [Code], &'t [Code]) {
    if fixed {
        let tables = fixed_decode_tables();
        (&tables.lencode, &tables.distcode)
    } else {
        (lens, dists)
    }
}

/// Look up the next code in `table`, pulling input until it is complete.
/// Consumes the code's bits. Returns `None` if the input ran out.
fn decode(
    acc: &mut BitAccumulator,
    bufs: &mut StreamBuffers<'_>,
    table: &[Code],
    root: u32,
) -> Option<Code> {
    let (here, used) = peek_code(acc, bufs, table, root)?;
    acc.drop_bits(used);
    Some(here)
}

/// Like [`decode`], but leaves the code in the accumulator. Returns the code
/// and the number of bits it occupies.
fn peek_code(
    acc: &mut BitAccumulator,
    bufs: &mut StreamBuffers<'_>,
    table: &[Code],
    root: u32,
) -> Option<(Code, u32)> {
    let here = loop {
        let here = table[acc.bits(root) as usize];
        if u32::from(here.bits) <= acc.count() {
            break here;
        }
        if !acc.pull_byte(bufs) {
            return None;
        }
    };
    if here.op == 0 || here.op & 0xF0 != 0 {
        return Some((here, u32::from(here.bits)));
    }

    // Second-level table
    let last = here;
    let last_bits = u32::from(last.bits);
    let here = loop {
        let index = usize::from(last.val)
            + (acc.bits(last_bits + u32::from(last.op)) >> last_bits) as usize;
        let here = table[index];
        if last_bits + u32::from(here.bits) <= acc.count() {
            break here;
        }
        if !acc.pull_byte(bufs) {
            return None;
        }
    };
    Some((here, last_bits + u32::from(here.bits)))
}

/// Count toward the `00 00 FF FF` pattern. `got` carries the match length
/// across calls. Returns the bytes examined.
fn sync_search(got: &mut usize, buf: &[u8]) -> usize {
    let mut next = 0;
    while next < buf.len() && *got < 4 {
        let want = if *got < 2 { 0 } else { 0xFF };
        if buf[next] == want {
            *got += 1;
        } else if buf[next] != 0 {
            *got = 0;
        } else {
            *got = 4 - *got;
        }
        next += 1;
    }
    next
}

/// Append to a captured header field, up to [`MAX_FIELD_LEN`] bytes.
fn capture(field: &mut Option<Vec<u8>>, bytes: &[u8]) {
    let field = field.get_or_insert_with(Vec::new);
    let room = MAX_FIELD_LEN.saturating_sub(field.len());
    field.extend_from_slice(&bytes[..bytes.len().min(room)]);
}
