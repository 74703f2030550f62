use std::convert::TryInto;

use zerocopy::{AsBytes, FromBytes};

use crate::{NUM_SECTORS, SECTOR_SIZE};

const MAP_WORDS: usize = NUM_SECTORS / 64;

/// Free-sector map for the whole disk, one bit per sector. With 1024 sectors
/// the map is 128 bytes, so it persists as exactly one sector-sized block.
///
/// The map is the single authority on sector occupancy: every sector named by
/// a live [`crate::FileHeader`] chain must be set here, and releasing a bit
/// that is not set aborts rather than papering over a double free.
#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy)]
pub struct SectorMap {
    words: [u64; MAP_WORDS],
}

impl SectorMap {
    pub fn new() -> Self {
        Self {
            words: [0; MAP_WORDS],
        }
    }

    /// Rebuilds a map from a sector-sized buffer previously produced by
    /// `serialize`. Passing a slice of any other size panics.
    pub fn parse(buf: &[u8]) -> Self {
        assert_eq!(
            buf.len(),
            SECTOR_SIZE,
            "sector map must parse from exactly one sector"
        );
        let mut words = [0u64; MAP_WORDS];
        for (i, chunk) in buf.chunks_exact(8).enumerate() {
            words[i] = u64::from_ne_bytes(chunk.try_into().unwrap());
        }
        Self { words }
    }

    pub fn serialize(&self) -> &[u8] {
        self.as_bytes()
    }

    /// Returns whether the sector is currently claimed.
    pub fn test(&self, sector: usize) -> bool {
        assert!(sector < NUM_SECTORS);
        self.words[sector / 64] & (1u64 << (sector % 64)) != 0
    }

    /// Claims the lowest free sector and returns its index, or `None` when
    /// the disk is full.
    pub fn find_and_set(&mut self) -> Option<usize> {
        for sector in 0..NUM_SECTORS {
            if !self.test(sector) {
                self.words[sector / 64] |= 1u64 << (sector % 64);
                return Some(sector);
            }
        }
        None
    }

    /// Releases a claimed sector. Releasing a sector that was never claimed
    /// means the map and some header have come apart, which is fatal.
    pub fn clear(&mut self, sector: usize) {
        assert!(
            self.test(sector),
            "released sector {} was not marked as claimed",
            sector
        );
        self.words[sector / 64] &= !(1u64 << (sector % 64));
    }

    /// Number of sectors still free.
    pub fn num_clear(&self) -> usize {
        self.words.iter().map(|w| w.count_zeros() as usize).sum()
    }
}
