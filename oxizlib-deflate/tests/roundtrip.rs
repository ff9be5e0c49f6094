//! Round trips across levels, framings, window sizes and strategies.

mod common;

use common::{random_bytes, text_like};
use oxizlib_core::{Adler32, Compressor, Crc32, Decompressor};
use oxizlib_deflate::{
    CompressionStrategy, Deflater, DeflateOptions, GzipHeader, InflateOptions, Inflater,
    compress, compress_bound, decompress, gzip_compress, gzip_decompress,
    gzip_decompress_with_header, zlib_compress, zlib_decompress,
};

#[test]
fn test_hello_level_6() {
    let input = b"Hello, Hello, Hello, World!";
    let compressed = zlib_compress(input, 6).unwrap();
    assert_eq!(&compressed[..2], &[0x78, 0x9C]);
    // The repeats are matched
    assert!(compressed.len() < input.len() + 6);
    let n = compressed.len();
    assert_eq!(
        u32::from_be_bytes([compressed[n - 4], compressed[n - 3], compressed[n - 2], compressed[n - 1]]),
        Adler32::checksum(input)
    );
    assert_eq!(zlib_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_empty_zlib() {
    let compressed = zlib_compress(b"", 6).unwrap();
    assert_eq!(compressed, [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
    assert_eq!(zlib_decompress(&compressed).unwrap(), b"");
}

#[test]
fn test_empty_every_framing() {
    for options in [DeflateOptions::zlib(6), DeflateOptions::gzip(6), DeflateOptions::raw(6)] {
        let compressed = compress(b"", &options).unwrap();
        let inflate = InflateOptions::default().with_window_bits(options.window_bits);
        assert_eq!(decompress(&compressed, &inflate).unwrap(), b"");
    }
}

#[test]
fn test_megabyte_random_level_9() {
    let input = random_bytes(1_000_000, 0xDEAD_BEEF);
    let compressed = zlib_compress(&input, 9).unwrap();
    assert!(compressed.len() <= compress_bound(input.len()));
    // Incompressible data goes out as stored blocks
    assert!(compressed.len() < input.len() + input.len() / 1000 + 64);
    assert_eq!(zlib_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_gzip_name_roundtrip() {
    let header = GzipHeader::with_name("report.csv").with_mtime(1_600_000_000);
    let options = DeflateOptions::gzip(6).with_gzip_header(header);
    let compressed = compress(b"a,b,c\n1,2,3\n", &options).unwrap();

    let (output, parsed) = gzip_decompress_with_header(&compressed).unwrap();
    assert_eq!(output, b"a,b,c\n1,2,3\n");
    assert_eq!(parsed.name.as_deref(), Some(&b"report.csv"[..]));
    assert_eq!(parsed.mtime, 1_600_000_000);
    assert!(parsed.done);
}

#[test]
fn test_gzip_trailer() {
    let input = text_like(10_000);
    let compressed = gzip_compress(&input, 6).unwrap();
    let n = compressed.len();
    let crc = u32::from_le_bytes([compressed[n - 8], compressed[n - 7], compressed[n - 6], compressed[n - 5]]);
    let isize = u32::from_le_bytes([compressed[n - 4], compressed[n - 3], compressed[n - 2], compressed[n - 1]]);
    assert_eq!(crc, Crc32::compute(&input));
    assert_eq!(isize, input.len() as u32);
    assert_eq!(gzip_decompress(&compressed).unwrap(), input);
}

#[test]
fn test_all_levels_all_framings() {
    let input = text_like(60_000);
    for level in 0..=9 {
        for options in [
            DeflateOptions::zlib(level),
            DeflateOptions::gzip(level),
            DeflateOptions::raw(level),
        ] {
            let compressed = compress(&input, &options).unwrap();
            let inflate = InflateOptions::default().with_window_bits(options.window_bits);
            assert_eq!(
                decompress(&compressed, &inflate).unwrap(),
                input,
                "level {level} window bits {}",
                options.window_bits
            );
        }
    }
}

#[test]
fn test_higher_levels_compress_better() {
    let input = text_like(100_000);
    let stored = zlib_compress(&input, 0).unwrap().len();
    let fast = zlib_compress(&input, 1).unwrap().len();
    let best = zlib_compress(&input, 9).unwrap().len();
    assert!(stored > input.len());
    assert!(fast < stored / 2);
    assert!(best <= fast);
}

#[test]
fn test_window_bits() {
    let input = text_like(80_000);
    for bits in 9..=15 {
        let options = DeflateOptions::zlib(6).with_window_bits(bits);
        let compressed = compress(&input, &options).unwrap();
        assert_eq!(compressed[0] >> 4, (bits - 8) as u8, "CINFO for {bits}");

        let exact = InflateOptions::zlib().with_window_bits(bits);
        assert_eq!(decompress(&compressed, &exact).unwrap(), input);
        let from_header = InflateOptions::zlib().with_window_bits(0);
        assert_eq!(decompress(&compressed, &from_header).unwrap(), input);

        let raw = compress(&input, &DeflateOptions::raw(6).with_window_bits(-bits)).unwrap();
        let output = decompress(&raw, &InflateOptions::raw().with_window_bits(-bits)).unwrap();
        assert_eq!(output, input);
    }
}

#[test]
fn test_mem_levels() {
    let input = text_like(50_000);
    for mem_level in 1..=9 {
        let options = DeflateOptions::zlib(6).with_mem_level(mem_level);
        let compressed = compress(&input, &options).unwrap();
        assert_eq!(zlib_decompress(&compressed).unwrap(), input, "mem level {mem_level}");
    }
}

#[test]
fn test_strategies() {
    let mut input = text_like(30_000);
    input.extend(std::iter::repeat_n(0u8, 5000));
    input.extend(random_bytes(5000, 3));
    for strategy in [
        CompressionStrategy::Default,
        CompressionStrategy::Filtered,
        CompressionStrategy::HuffmanOnly,
        CompressionStrategy::Rle,
        CompressionStrategy::Fixed,
    ] {
        for level in [1, 6, 9] {
            let options = DeflateOptions::zlib(level).with_strategy(strategy);
            let compressed = compress(&input, &options).unwrap();
            assert_eq!(zlib_decompress(&compressed).unwrap(), input, "{strategy:?} level {level}");
        }
    }
}

#[test]
fn test_auto_detect_inflate() {
    let input = text_like(5000);
    for compressed in [zlib_compress(&input, 6).unwrap(), gzip_compress(&input, 6).unwrap()] {
        assert_eq!(decompress(&compressed, &InflateOptions::auto()).unwrap(), input);
    }
}

#[test]
fn test_trait_objects() {
    let input = text_like(20_000);
    let mut compressors: Vec<Box<dyn Compressor>> =
        vec![Box::new(Deflater::new(6)), Box::new(Deflater::gzip(1))];
    let mut decompressors: Vec<Box<dyn Decompressor>> =
        vec![Box::new(Inflater::new()), Box::new(Inflater::gzip())];

    for (compressor, decompressor) in compressors.iter_mut().zip(decompressors.iter_mut()) {
        let compressed = compressor.compress_all(&input).unwrap();
        assert!(compressor.is_finished());
        assert_eq!(decompressor.decompress_all(&compressed).unwrap(), input);
        assert!(decompressor.is_finished());

        compressor.reset();
        decompressor.reset();
        let again = compressor.compress_all(&input).unwrap();
        assert_eq!(again, compressed);
        assert_eq!(decompressor.decompress_all(&again).unwrap(), input);
    }
}

#[test]
fn test_deterministic_output() {
    let input = text_like(40_000);
    assert_eq!(zlib_compress(&input, 6).unwrap(), zlib_compress(&input, 6).unwrap());
}
