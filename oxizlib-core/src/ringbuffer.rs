//! Circular history window for the decompressor.
//!
//! Matches may refer back up to 32 KiB into data that was produced by an
//! earlier call and has already been handed to the caller. The window keeps
//! the most recent `1 << wbits` bytes of output for that purpose. Storage is
//! allocated on first use so that streams which finish in a single call never
//! pay for it.

use crate::error::{OxizError, Result};

/// Lazily allocated circular window of recent output.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    buffer: Vec<u8>,
    /// log2 of the window size.
    wbits: u32,
    /// Valid bytes in the window.
    have: usize,
    /// Write position.
    next: usize,
}

impl HistoryWindow {
    /// Create an empty window of `1 << wbits` bytes (no allocation yet).
    pub fn new(wbits: u32) -> Self {
        Self {
            buffer: Vec::new(),
            wbits,
            have: 0,
            next: 0,
        }
    }

    /// Window size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        1usize << self.wbits
    }

    /// log2 of the window size.
    pub fn bits(&self) -> u32 {
        self.wbits
    }

    /// Change the window size. Drops the storage if the size differs.
    pub fn set_bits(&mut self, wbits: u32) {
        if wbits != self.wbits {
            self.buffer = Vec::new();
            self.wbits = wbits;
        }
        self.clear();
    }

    /// Number of valid history bytes.
    #[inline]
    pub fn have(&self) -> usize {
        self.have
    }

    /// Whether storage has been allocated.
    pub fn is_allocated(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Forget all history but keep the storage.
    pub fn clear(&mut self) {
        self.have = 0;
        self.next = 0;
    }

    fn ensure_allocated(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            let size = self.size();
            let mut buffer = Vec::new();
            buffer.try_reserve_exact(size).map_err(|_| OxizError::Mem)?;
            buffer.resize(size, 0);
            self.buffer = buffer;
            self.have = 0;
            self.next = 0;
        }
        Ok(())
    }

    /// Record `out`, the bytes just produced, as the newest history.
    pub fn update(&mut self, out: &[u8]) -> Result<()> {
        self.ensure_allocated()?;
        let wsize = self.size();

        if out.len() >= wsize {
            self.buffer.copy_from_slice(&out[out.len() - wsize..]);
            self.next = 0;
            self.have = wsize;
            return Ok(());
        }

        let first = (wsize - self.next).min(out.len());
        self.buffer[self.next..self.next + first].copy_from_slice(&out[..first]);
        let rest = out.len() - first;
        if rest > 0 {
            // Wrapped around
            self.buffer[..rest].copy_from_slice(&out[first..]);
            self.next = rest;
            self.have = wsize;
        } else {
            self.next += first;
            if self.next == wsize {
                self.next = 0;
            }
            if self.have < wsize {
                self.have += first;
            }
        }
        Ok(())
    }

    /// Install a preset dictionary as history.
    pub fn preload_dictionary(&mut self, dict: &[u8]) -> Result<()> {
        self.update(dict)
    }

    /// Bytes starting `dist` back from the newest byte, as up to two spans
    /// in age order. The caller guarantees `1 <= dist <= have`.
    #[inline]
    pub fn history_spans(&self, dist: usize) -> (&[u8], &[u8]) {
        debug_assert!(dist >= 1 && dist <= self.have);
        if dist > self.next {
            let start = self.size() - (dist - self.next);
            (&self.buffer[start..], &self.buffer[..self.next])
        } else {
            (&self.buffer[self.next - dist..self.next], &[])
        }
    }

    /// Full history in age order, as up to two spans.
    pub fn contents(&self) -> (&[u8], &[u8]) {
        if self.have == 0 {
            return (&[], &[]);
        }
        (&self.buffer[self.next..self.have], &self.buffer[..self.next])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(spans: (&[u8], &[u8])) -> Vec<u8> {
        let mut v = spans.0.to_vec();
        v.extend_from_slice(spans.1);
        v
    }

    #[test]
    fn test_lazy_allocation() {
        let mut window = HistoryWindow::new(9);
        assert!(!window.is_allocated());
        window.update(b"abc").unwrap();
        assert!(window.is_allocated());
        assert_eq!(window.size(), 512);
        assert_eq!(window.have(), 3);
        assert_eq!(flatten(window.history_spans(2)), b"bc");
    }

    #[test]
    fn test_wraparound() {
        let mut window = HistoryWindow::new(9);
        let first: Vec<u8> = (0..400u32).map(|i| i as u8).collect();
        let second: Vec<u8> = (400..600u32).map(|i| i as u8).collect();
        window.update(&first).unwrap();
        window.update(&second).unwrap();

        assert_eq!(window.have(), 512);
        let all: Vec<u8> = (88..600u32).map(|i| i as u8).collect();
        assert_eq!(flatten(window.contents()), all);

        // Spans crossing the physical end of the buffer
        let (a, b) = window.history_spans(150);
        assert!(!a.is_empty() && !b.is_empty());
        assert_eq!(flatten((a, b)), all[all.len() - 150..]);
    }

    #[test]
    fn test_large_update_keeps_tail() {
        let mut window = HistoryWindow::new(9);
        let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
        window.update(&data).unwrap();
        assert_eq!(flatten(window.contents()), &data[data.len() - 512..]);
    }

    #[test]
    fn test_dictionary_and_clear() {
        let mut window = HistoryWindow::new(10);
        window.preload_dictionary(b"dictionary").unwrap();
        assert_eq!(flatten(window.contents()), b"dictionary");
        window.clear();
        assert_eq!(window.have(), 0);
        assert_eq!(flatten(window.contents()), b"");
        window.set_bits(12);
        assert!(!window.is_allocated());
        assert_eq!(window.size(), 4096);
    }
}
