//! Damaged input never panics: it decodes to something or fails cleanly.

mod common;

use common::{random_bytes, stream_decompress, text_like};
use oxizlib_core::OxizError;
use oxizlib_deflate::{
    Inflater, gzip_compress, gzip_decompress, inflate, zlib_compress, zlib_decompress,
};

fn is_clean_failure(err: &OxizError) -> bool {
    matches!(err, OxizError::Data { .. } | OxizError::Buf | OxizError::NeedDict { .. })
}

#[test]
fn test_every_single_bit_flip() {
    let input = text_like(600);
    let compressed = zlib_compress(&input, 6).unwrap();
    for pos in 0..compressed.len() {
        for bit in 0..8 {
            let mut damaged = compressed.clone();
            damaged[pos] ^= 1 << bit;
            match zlib_decompress(&damaged) {
                // The Adler-32 catches anything that still parses
                Ok(output) => assert_eq!(output, input, "flip {pos}:{bit} slipped through"),
                Err(err) => assert!(is_clean_failure(&err), "flip {pos}:{bit}: {err:?}"),
            }
        }
    }
}

#[test]
fn test_every_truncation() {
    let input = text_like(2000);
    let compressed = gzip_compress(&input, 9).unwrap();
    for len in 0..compressed.len() {
        let err = gzip_decompress(&compressed[..len]).unwrap_err();
        assert!(is_clean_failure(&err), "length {len}: {err:?}");
    }
}

#[test]
fn test_truncation_while_streaming() {
    let compressed = zlib_compress(&text_like(5000), 6).unwrap();
    let truncated = &compressed[..compressed.len() - 10];
    let mut inflater = Inflater::new();
    let err = stream_decompress(&mut inflater, truncated, 7, 50).unwrap_err();
    assert!(matches!(err, OxizError::Buf));
}

#[test]
fn test_random_garbage() {
    for seed in 0..200 {
        let garbage = random_bytes(512, seed);
        if let Err(err) = inflate(&garbage) {
            assert!(is_clean_failure(&err), "seed {seed}: {err:?}");
        }
        let err = zlib_decompress(&garbage).unwrap_err();
        assert!(is_clean_failure(&err), "seed {seed}: {err:?}");
    }
}

#[test]
fn test_data_error_is_terminal() {
    let mut damaged = zlib_compress(b"terminal", 6).unwrap();
    damaged[0] = 0x79;
    let mut inflater = Inflater::new();
    let mut out = [0u8; 64];
    assert!(inflater.inflate(&damaged, &mut out, oxizlib_core::FlushMode::None).is_err());
    let valid = zlib_compress(b"valid", 6).unwrap();
    let err = inflater.inflate(&valid, &mut out, oxizlib_core::FlushMode::None).unwrap_err();
    assert!(matches!(err, OxizError::Data { .. }));
    assert_eq!(inflater.message(), Some("incorrect header check"));
}

#[test]
fn test_invalid_dynamic_tables() {
    // Dynamic block with HLIT = 31, i.e. 288 literal/length codes
    let data = [0x05 | (0x1F << 3), 0x00, 0x00];
    let err = inflate(&data).unwrap_err();
    assert_eq!(err.to_string(), "data error: too many length or distance symbols");
}

#[test]
fn test_missing_end_of_block() {
    // Final dynamic block: 257 literal/length codes, 1 distance code, and
    // code length codes 16, 17, 18 and 0 all of length 2
    let mut bits: Vec<(u32, u32)> = vec![(1, 1), (2, 2), (0, 5), (0, 5), (0, 4)];
    for _ in 0..4 {
        bits.push((2, 3));
    }
    let mut writer = oxizlib_core::BitWriter::new();
    for (value, count) in bits {
        writer.write_bits(value, count);
    }
    // Canonical codes 00, 01, 10, 11 for 0, 16, 17, 18, written bit-reversed
    let code = |sym: u32| match sym {
        0 => 0b00,
        16 => 0b10,
        17 => 0b01,
        _ => 0b11,
    };
    // 138 + 119 + 1 zero lengths, so end-of-block gets none
    writer.write_bits(code(18), 2);
    writer.write_bits(127, 7);
    writer.write_bits(code(18), 2);
    writer.write_bits(119 - 11, 7);
    writer.write_bits(code(0), 2);
    writer.align_to_byte();
    let mut data = vec![0u8; 64];
    let n = writer.drain_into(&mut data);
    data.truncate(n);

    let err = inflate(&data).unwrap_err();
    assert_eq!(err.to_string(), "data error: invalid code -- missing end-of-block");
}
