//! Shared helpers for the integration tests.
#![allow(dead_code)]

use oxizlib_core::{FlushMode, OxizError, Status};
use oxizlib_deflate::{Deflater, Inflater};

/// Pseudo-random bytes from a fixed-seed LCG.
pub fn random_bytes(size: usize, seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = seed;
    for _ in 0..size {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        data.push((state >> 33) as u8);
    }
    data
}

/// Text with plenty of repeats at varying distances.
pub fn text_like(size: usize) -> Vec<u8> {
    let words = [
        "alpha ", "beta ", "gamma ", "delta ", "epsilon ", "zeta ", "eta ", "theta ",
        "iota ", "kappa ", "lambda ", "mu\n",
    ];
    let mut data = Vec::with_capacity(size);
    let mut state = 99u32;
    while data.len() < size {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        data.extend_from_slice(words[(state >> 16) as usize % words.len()].as_bytes());
    }
    data.truncate(size);
    data
}

/// Compress `data` feeding `in_chunk` bytes per call into an `out_chunk`
/// byte output buffer, finishing once the input is used up.
pub fn stream_compress(
    deflater: &mut Deflater,
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> Vec<u8> {
    let mut result = Vec::new();
    let mut out = vec![0u8; out_chunk];
    let mut pos: usize = 0;
    loop {
        let end = pos.saturating_add(in_chunk).min(data.len());
        let flush = if end == data.len() {
            FlushMode::Finish
        } else {
            FlushMode::None
        };
        let (consumed, produced, status) = deflater
            .deflate(&data[pos..end], &mut out, flush)
            .unwrap_or_else(|err| panic!("deflate failed at {pos}: {err}"));
        pos += consumed;
        result.extend_from_slice(&out[..produced]);
        if status == Status::StreamEnd {
            return result;
        }
    }
}

/// Decompress `data` feeding `in_chunk` bytes per call into an `out_chunk`
/// byte output buffer, until the end of the stream.
pub fn stream_decompress(
    inflater: &mut Inflater,
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> Result<Vec<u8>, OxizError> {
    let mut result = Vec::new();
    let mut out = vec![0u8; out_chunk];
    let mut pos: usize = 0;
    loop {
        let end = pos.saturating_add(in_chunk).min(data.len());
        let (consumed, produced, status) = inflater.inflate(&data[pos..end], &mut out, FlushMode::None)?;
        pos += consumed;
        result.extend_from_slice(&out[..produced]);
        if status == Status::StreamEnd {
            return Ok(result);
        }
    }
}
