//! Adler-32 checksum (RFC 1950).
//!
//! Two 16-bit accumulators modulo 65521. `s1` is the running byte sum
//! (initialised to 1) and `s2` the running sum of `s1` values. The reduction
//! is deferred for up to [`NMAX`] bytes, the largest run for which `s2`
//! cannot overflow a `u32`.

/// Largest prime smaller than 65536.
const BASE: u32 = 65521;

/// Largest n such that 255n(n+1)/2 + (n+1)(BASE-1) <= 2^32-1.
pub const NMAX: usize = 5552;

/// Adler-32 accumulator.
///
/// # Example
///
/// ```
/// use oxizlib_core::adler::Adler32;
///
/// let mut adler = Adler32::new();
/// adler.update(b"Hello");
/// assert_eq!(adler.value(), 0x058C01F5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    /// Create a new accumulator with the initial value 1.
    pub fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Resume from a previously produced checksum value.
    pub fn from_value(value: u32) -> Self {
        Self {
            s1: value & 0xFFFF,
            s2: value >> 16,
        }
    }

    /// Reset to the initial value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        let mut chunks = data.chunks_exact(NMAX);
        for chunk in &mut chunks {
            for &byte in chunk {
                s1 += u32::from(byte);
                s2 += s1;
            }
            s1 %= BASE;
            s2 %= BASE;
        }

        for &byte in chunks.remainder() {
            s1 += u32::from(byte);
            s2 += s1;
        }

        self.s1 = s1 % BASE;
        self.s2 = s2 % BASE;
    }

    /// Current checksum, `(s2 << 16) | s1`.
    #[inline]
    pub fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    /// Compute the checksum of `data` in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        let mut adler = Self::new();
        adler.update(data);
        adler.value()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}
