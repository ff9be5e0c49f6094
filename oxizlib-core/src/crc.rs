//! CRC-32 (ISO 3309) as used by the gzip trailer and the FHCRC header field.
//!
//! The 256-entry table is generated at compile time. Inputs of 16 bytes or
//! more go through a slicing-by-8 variant that consumes 8 bytes per step.

/// Reflected CRC-32 polynomial.
const POLY: u32 = 0xEDB88320;

/// CRC-32 slicing-by-8 lookup tables. `CRC32_TABLES[0]` is the classic
/// byte-at-a-time table.
const CRC32_TABLES: [[u32; 256]; 8] = {
    let mut tables = [[0u32; 256]; 8];

    let mut i = 0usize;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        tables[0][i] = crc;
        i += 1;
    }

    let mut t = 1;
    while t < 8 {
        let mut i = 0usize;
        while i < 256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
            i += 1;
        }
        t += 1;
    }

    tables
};

/// CRC-32 calculator.
///
/// - Polynomial: 0x04C11DB7 (reflected: 0xEDB88320)
/// - Initial value: 0xFFFFFFFF
/// - Final XOR: 0xFFFFFFFF
///
/// # Example
///
/// ```
/// use oxizlib_core::crc::Crc32;
///
/// let mut crc = Crc32::new();
/// crc.update(b"Hello, World!");
/// assert_eq!(crc.value(), 0xEC4AC3D0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc32 {
    // Stored pre-inverted
    crc: u32,
}

impl Crc32 {
    /// Create a new CRC-32 calculator (value 0).
    pub fn new() -> Self {
        Self { crc: 0xFFFFFFFF }
    }

    /// Resume from a previously produced CRC value.
    pub fn from_value(value: u32) -> Self {
        Self { crc: !value }
    }

    /// Reset the CRC to its initial state.
    pub fn reset(&mut self) {
        self.crc = 0xFFFFFFFF;
    }

    /// Update the CRC with more data.
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        if data.len() >= 16 {
            self.update_slice8(data);
        } else {
            self.update_bytewise(data);
        }
    }

    #[inline]
    fn update_bytewise(&mut self, data: &[u8]) {
        let table = &CRC32_TABLES[0];
        for &byte in data {
            let index = ((self.crc ^ u32::from(byte)) & 0xFF) as usize;
            self.crc = table[index] ^ (self.crc >> 8);
        }
    }

    fn update_slice8(&mut self, data: &[u8]) {
        let t = &CRC32_TABLES;
        let mut crc = self.crc;

        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let lo = crc ^ u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let hi = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);

            crc = t[7][(lo & 0xFF) as usize]
                ^ t[6][((lo >> 8) & 0xFF) as usize]
                ^ t[5][((lo >> 16) & 0xFF) as usize]
                ^ t[4][(lo >> 24) as usize]
                ^ t[3][(hi & 0xFF) as usize]
                ^ t[2][((hi >> 8) & 0xFF) as usize]
                ^ t[1][((hi >> 16) & 0xFF) as usize]
                ^ t[0][(hi >> 24) as usize];
        }

        self.crc = crc;
        self.update_bytewise(chunks.remainder());
    }

    /// Current CRC value (post-inverted).
    #[inline]
    pub fn value(&self) -> u32 {
        !self.crc
    }

    /// Compute the CRC-32 of `data` in one shot.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
