//! Incremental use: arbitrary chunking, flush points and mid-stream changes.

mod common;

use common::{random_bytes, stream_compress, stream_decompress, text_like};
use oxizlib_core::{FlushMode, OxizError, Status};
use oxizlib_deflate::{
    CompressionStrategy, Deflater, DeflateOptions, InflateOptions, Inflater, zlib_compress,
    zlib_decompress,
};

#[test]
fn test_compress_chunking_matches_one_shot() {
    let input = text_like(100_000);
    for level in [1u8, 6, 9] {
        let one_shot = zlib_compress(&input, level).unwrap();
        for (in_chunk, out_chunk) in [(1, 65536), (100, 65536), (7919, 65536), (4096, 1), (1000, 37)] {
            let streamed = stream_compress(&mut Deflater::new(level), &input, in_chunk, out_chunk);
            assert_eq!(streamed, one_shot, "level {level} chunks {in_chunk}/{out_chunk}");
        }
    }
}

#[test]
fn test_stored_level_chunking_roundtrips() {
    // Level 0 block boundaries follow the buffers, so only the content must match
    let input = random_bytes(200_000, 11);
    for (in_chunk, out_chunk) in [(1, 65536), (70_000, 1000), (usize::MAX, 13)] {
        let streamed = stream_compress(&mut Deflater::new(0), &input, in_chunk, out_chunk);
        assert_eq!(zlib_decompress(&streamed).unwrap(), input);
    }
}

#[test]
fn test_decompress_chunking() {
    let input = text_like(120_000);
    let compressed = zlib_compress(&input, 6).unwrap();
    for (in_chunk, out_chunk) in [(1, 1), (2, 3), (17, 4096), (65536, 1), (usize::MAX, 258)] {
        let mut inflater = Inflater::new();
        let output = stream_decompress(&mut inflater, &compressed, in_chunk, out_chunk).unwrap();
        assert_eq!(output, input, "chunks {in_chunk}/{out_chunk}");
        assert_eq!(inflater.total_in(), compressed.len() as u64);
        assert_eq!(inflater.total_out(), input.len() as u64);
    }
}

#[test]
fn test_dynamic_header_split_anywhere() {
    // A single dynamic block whose table header is cut at every byte
    let input = text_like(10_000);
    let compressed = zlib_compress(&input, 9).unwrap();
    assert_eq!(compressed[2] & 0b111, 0b101);
    for split in 1..compressed.len().min(160) {
        let mut inflater = Inflater::new();
        let mut out = vec![0u8; input.len() + 1];
        let (consumed, first, _) =
            inflater.inflate(&compressed[..split], &mut out, FlushMode::None).unwrap();
        assert_eq!(consumed, split);
        let (_, second, status) = inflater
            .inflate(&compressed[split..], &mut out[first..], FlushMode::None)
            .unwrap();
        assert_eq!(status, Status::StreamEnd, "split {split}");
        assert_eq!(&out[..first + second], &input[..], "split {split}");
    }
}

#[test]
fn test_dynamic_blocks_one_byte_at_a_time() {
    let input = text_like(50_000);
    let compressed = zlib_compress(&input, 9).unwrap();
    for out_chunk in [1, 4096] {
        let mut inflater = Inflater::new();
        let output = stream_decompress(&mut inflater, &compressed, 1, out_chunk).unwrap();
        assert_eq!(output, input, "output chunk {out_chunk}");
    }
}

#[test]
fn test_sync_flush_makes_data_available() {
    let mut deflater = Deflater::new(6);
    let mut inflater = Inflater::new();
    let mut compressed = vec![0u8; 4096];
    let mut decoded = vec![0u8; 4096];

    let messages: [&[u8]; 3] = [b"first message, ", b"second message, ", b"third"];
    let mut seen = Vec::new();
    for (i, message) in messages.into_iter().enumerate() {
        let flush = if i == 2 { FlushMode::Finish } else { FlushMode::Sync };
        let (consumed, produced, _) = deflater.deflate(message, &mut compressed, flush).unwrap();
        assert_eq!(consumed, message.len());
        if flush == FlushMode::Sync {
            assert_eq!(&compressed[produced - 4..produced], &[0x00, 0x00, 0xFF, 0xFF]);
        }

        // Everything compressed so far decodes without waiting for more input
        let (used, n, _) = inflater
            .inflate(&compressed[..produced], &mut decoded, FlushMode::Sync)
            .unwrap();
        assert_eq!(used, produced);
        seen.extend_from_slice(&decoded[..n]);
        assert!(seen.ends_with(message));
    }
    assert_eq!(inflater.mode(), oxizlib_deflate::Mode::Done);
    assert_eq!(seen, b"first message, second message, third");
}

#[test]
fn test_partial_flush() {
    let mut deflater = Deflater::new(6);
    let mut compressed = vec![0u8; 4096];
    let (_, a, _) = deflater.deflate(b"some text", &mut compressed, FlushMode::Partial).unwrap();
    let (_, b, status) = deflater
        .deflate(b" and more text", &mut compressed[a..], FlushMode::Finish)
        .unwrap();
    assert_eq!(status, Status::StreamEnd);
    compressed.truncate(a + b);
    assert_eq!(zlib_decompress(&compressed).unwrap(), b"some text and more text");
}

#[test]
fn test_full_flush_allows_restart() {
    let first = text_like(20_000);
    let second = text_like(3000);
    let mut deflater = Deflater::raw(6);
    let mut compressed = vec![0u8; 65536];
    let (_, a, _) = deflater.deflate(&first, &mut compressed, FlushMode::Full).unwrap();
    let (_, b, _) = deflater.deflate(&second, &mut compressed[a..], FlushMode::Finish).unwrap();

    // The second part decodes on its own: no references cross the flush
    let tail = oxizlib_deflate::inflate(&compressed[a..a + b]).unwrap();
    assert_eq!(tail, second);
}

#[test]
fn test_params_mid_stream() {
    let parts = [text_like(30_000), random_bytes(20_000, 5), text_like(30_000)];
    let mut deflater = Deflater::new(1);
    let mut compressed = Vec::new();
    let mut out = vec![0u8; 200_000];

    let (_, n, _) = deflater.deflate(&parts[0], &mut out, FlushMode::None).unwrap();
    compressed.extend_from_slice(&out[..n]);

    let n = deflater.params(0, CompressionStrategy::Default, &mut out).unwrap();
    compressed.extend_from_slice(&out[..n]);
    assert_eq!(deflater.level(), 0);
    let (_, n, _) = deflater.deflate(&parts[1], &mut out, FlushMode::None).unwrap();
    compressed.extend_from_slice(&out[..n]);

    let n = deflater.params(9, CompressionStrategy::Filtered, &mut out).unwrap();
    compressed.extend_from_slice(&out[..n]);
    let (_, n, status) = deflater.deflate(&parts[2], &mut out, FlushMode::Finish).unwrap();
    compressed.extend_from_slice(&out[..n]);
    assert_eq!(status, Status::StreamEnd);

    assert_eq!(zlib_decompress(&compressed).unwrap(), parts.concat());
}

#[test]
fn test_params_rejects_bad_level() {
    let mut deflater = Deflater::new(6);
    let mut out = [0u8; 64];
    let err = deflater.params(10, CompressionStrategy::Default, &mut out).unwrap_err();
    assert!(matches!(err, OxizError::Stream { .. }));
}

#[test]
fn test_tune() {
    let input = text_like(50_000);
    let mut deflater = Deflater::new(6);
    deflater.tune(4, 4, 8, 4);
    let tuned = stream_compress(&mut deflater, &input, usize::MAX, 1 << 20);
    assert_eq!(zlib_decompress(&tuned).unwrap(), input);
    assert_ne!(tuned, zlib_compress(&input, 6).unwrap());
}

#[test]
fn test_pending_reports_buffered_output() {
    let mut deflater = Deflater::new(6);
    let mut out = [0u8; 3];
    let (consumed, produced, _) = deflater.deflate(b"abc", &mut out, FlushMode::Full).unwrap();
    assert_eq!((consumed, produced), (3, 3));
    let (bytes, bits) = deflater.pending();
    assert!(bytes > 0);
    assert_eq!(bits, 0);

    // An interrupted flush is completed by repeating it
    let mut rest = [0u8; 64];
    let (_, n, _) = deflater.deflate(&[], &mut rest, FlushMode::Full).unwrap();
    assert!(n >= bytes);
    assert_eq!(&rest[n - 4..n], &[0x00, 0x00, 0xFF, 0xFF]);
    assert_eq!(deflater.pending(), (0, 0));

    let mut stream = out.to_vec();
    stream.extend_from_slice(&rest[..n]);
    let mut tail = [0u8; 64];
    let (_, m, status) = deflater.deflate(&[], &mut tail, FlushMode::Finish).unwrap();
    assert_eq!(status, Status::StreamEnd);
    stream.extend_from_slice(&tail[..m]);
    assert_eq!(zlib_decompress(&stream).unwrap(), b"abc");
}

#[test]
fn test_buf_error_is_recoverable() {
    let mut deflater = Deflater::new(6);
    let mut out = [0u8; 0];
    assert!(matches!(
        deflater.deflate(b"data", &mut out, FlushMode::None),
        Err(OxizError::Buf)
    ));
    let compressed = stream_compress(&mut deflater, b"data", usize::MAX, 64);
    assert_eq!(zlib_decompress(&compressed).unwrap(), b"data");
}

#[test]
fn test_input_after_finish_is_rejected() {
    let mut deflater = Deflater::new(6);
    let mut out = vec![0u8; 64];
    let (_, _, status) = deflater.deflate(b"done", &mut out, FlushMode::Finish).unwrap();
    assert_eq!(status, Status::StreamEnd);
    let err = deflater.deflate(b"more", &mut out, FlushMode::Finish).unwrap_err();
    assert!(matches!(err, OxizError::Stream { .. }));
    let err = deflater.deflate(&[], &mut out, FlushMode::None).unwrap_err();
    assert!(matches!(err, OxizError::Stream { .. }));
}

#[test]
fn test_streaming_dictionary() {
    let dictionary = text_like(4000);
    let input = text_like(6000);
    let options = DeflateOptions::zlib(6).with_dictionary(dictionary.clone());
    let mut deflater = Deflater::with_options(&options).unwrap();
    let compressed = stream_compress(&mut deflater, &input, 333, 100);
    let plain = zlib_compress(&input, 6).unwrap();
    assert!(compressed.len() < plain.len());

    let options = InflateOptions::zlib().with_dictionary(dictionary);
    let mut inflater = Inflater::with_options(&options).unwrap();
    let output = stream_decompress(&mut inflater, &compressed, 5, 77).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_reset_keep_reuses_compressor() {
    let input = text_like(10_000);
    let mut deflater = Deflater::new(6);
    let first = stream_compress(&mut deflater, &input, usize::MAX, 1 << 16);
    deflater.reset();
    let second = stream_compress(&mut deflater, &input, usize::MAX, 1 << 16);
    assert_eq!(first, second);

    let mut inflater = Inflater::new();
    assert_eq!(stream_decompress(&mut inflater, &first, 999, 999).unwrap(), input);
    inflater.reset_keep();
    assert_eq!(stream_decompress(&mut inflater, &second, 999, 999).unwrap(), input);
}
