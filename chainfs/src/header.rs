use std::convert::TryInto;
use std::io::Write;

use log::debug;

use crate::alloc::SectorMap;
use crate::io::SectorStorage;
use crate::{FsError, MAX_FILE_SIZE, NUM_DIRECT, SECTOR_SIZE};

/// On-disk sentinel for an empty direct-block slot or an absent continuation.
const NO_SECTOR: i32 = -1;

/// Fixed offsets of the header fields within one sector. The four regions
/// pack with no padding and fill the sector exactly.
const LEN_OFFSET: usize = 0;
const COUNT_OFFSET: usize = 4;
const TABLE_OFFSET: usize = 8;
const NEXT_OFFSET: usize = TABLE_OFFSET + 4 * NUM_DIRECT;

/// One sector's worth of file metadata: how many bytes of file data this
/// block covers, which physical sectors hold them, and an optional link to a
/// continuation header when the file outgrows one block's table.
///
/// A header comes to life in one of two ways: [`FileHeader::allocate`] claims
/// fresh sectors for a new file, or [`FileHeader::fetch_from`] reloads an
/// existing chain from disk. The sector holding the *root* header is owned by
/// the caller on both sides: the caller claims it before `allocate` and
/// releases it after [`FileHeader::deallocate`]. Continuation header sectors
/// are internal to the chain; `allocate` claims them and `deallocate`
/// releases them, so the two calls are exact inverses on the map.
pub struct FileHeader {
    /// Bytes of file data covered by this block alone, not the whole chain.
    byte_length: u32,
    /// Direct blocks in use, always `ceil(byte_length / SECTOR_SIZE)`.
    sector_count: u32,
    /// Local block index to physical sector. Slots past `sector_count` hold
    /// `NO_SECTOR`.
    direct: [i32; NUM_DIRECT],
    next: Option<Box<FileHeader>>,
    next_sector: Option<u32>,
}

fn div_round_up(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            byte_length: 0,
            sector_count: 0,
            direct: [NO_SECTOR; NUM_DIRECT],
            next: None,
            next_sector: None,
        }
    }

    /// Claims data sectors for a new file of `file_size` bytes, chaining
    /// continuation headers as needed.
    ///
    /// The requirement of the *whole* chain (every link's data sectors plus
    /// one sector per continuation header) is checked against the map before
    /// anything is claimed, so a failing call leaves the map untouched.
    pub fn allocate(&mut self, free_map: &mut SectorMap, file_size: u32) -> Result<(), FsError> {
        let needed = Self::sectors_required(file_size);
        let free = free_map.num_clear() as u64;
        if free < needed {
            return Err(FsError::InsufficientSpace { needed, free });
        }
        debug!(
            "allocating {} bytes across {} sectors (headers included)",
            file_size, needed
        );
        self.allocate_chain(free_map, file_size);
        Ok(())
    }

    /// Sectors the whole chain for `file_size` bytes will consume: data
    /// sectors for every link plus one per continuation header block. The
    /// root header's own sector is not counted; the caller claims that one.
    /// Widened to u64 so a request near `u32::MAX` reports exhaustion
    /// instead of wrapping.
    fn sectors_required(file_size: u32) -> u64 {
        let data = (u64::from(file_size) + SECTOR_SIZE as u64 - 1) / SECTOR_SIZE as u64;
        let links =
            ((u64::from(file_size) + u64::from(MAX_FILE_SIZE) - 1) / u64::from(MAX_FILE_SIZE))
                .max(1)
                - 1;
        data + links
    }

    fn allocate_chain(&mut self, free_map: &mut SectorMap, file_size: u32) {
        self.byte_length = file_size.min(MAX_FILE_SIZE);
        self.sector_count = div_round_up(self.byte_length, SECTOR_SIZE as u32);

        for slot in self.direct.iter_mut().take(self.sector_count as usize) {
            // The whole chain's requirement passed the free-space check, so
            // a failed claim here means map and header have come apart.
            let sector = free_map
                .find_and_set()
                .expect("sector claim failed after a passing free-space check");
            *slot = sector as i32;
        }

        let remaining = file_size - self.byte_length;
        if remaining > 0 {
            let header_sector = free_map
                .find_and_set()
                .expect("sector claim failed after a passing free-space check");
            let mut next = Box::new(FileHeader::new());
            next.allocate_chain(free_map, remaining);
            self.next_sector = Some(header_sector as u32);
            self.next = Some(next);
        }
    }

    /// Releases every sector the chain claimed in [`FileHeader::allocate`]:
    /// continuations first, tail before head, then this block's own data
    /// sectors. Each release asserts the sector was actually claimed. The
    /// in-memory fields are left stale; the header must not be used again
    /// without a fresh `allocate` or `fetch_from`.
    pub fn deallocate(&mut self, free_map: &mut SectorMap) {
        if let (Some(next), Some(next_sector)) = (self.next.as_mut(), self.next_sector) {
            next.deallocate(free_map);
            free_map.clear(next_sector as usize);
        }
        for &slot in self.direct.iter().take(self.sector_count as usize) {
            free_map.clear(slot as usize);
        }
        debug!(
            "released {} data sectors covering {} bytes",
            self.sector_count, self.byte_length
        );
    }

    /// Reloads the chain from disk starting at `sector`, following
    /// continuation links. The block is trusted as written; there is no
    /// checksum, so a corrupt sector reconstructs garbage.
    pub fn fetch_from<T: SectorStorage>(
        &mut self,
        dev: &mut T,
        sector: u32,
    ) -> Result<(), FsError> {
        let mut buf = [0u8; SECTOR_SIZE];
        dev.read_sector(sector as usize, &mut buf)?;
        self.parse_from(&buf);

        if let Some(next_sector) = self.next_sector {
            let mut next = Box::new(FileHeader::new());
            next.fetch_from(dev, next_sector)?;
            self.next = Some(next);
        }
        Ok(())
    }

    /// Writes the chain back to disk, this block at `sector` and each
    /// continuation at its recorded sector, root first. A crash partway
    /// through leaves earlier blocks durable and later ones stale; nothing
    /// here makes the chain write atomic.
    pub fn write_back<T: SectorStorage>(&self, dev: &mut T, sector: u32) -> Result<(), FsError> {
        let mut buf = self.serialize();
        dev.write_sector(sector as usize, &mut buf)?;

        if let (Some(next), Some(next_sector)) = (self.next.as_ref(), self.next_sector) {
            next.write_back(dev, next_sector)?;
        }
        Ok(())
    }

    /// Translates a byte offset within the whole file to the physical sector
    /// holding it. Offsets at or past the end of the represented data return
    /// `None`; callers get no richer out-of-range signal than that.
    pub fn byte_to_sector(&self, offset: u32) -> Option<u32> {
        if offset < self.byte_length {
            return Some(self.direct[offset as usize / SECTOR_SIZE] as u32);
        }
        // A block with a continuation always covers MAX_FILE_SIZE bytes
        // itself, so the remainder indexes the rest of the chain.
        self.next.as_ref()?.byte_to_sector(offset - MAX_FILE_SIZE)
    }

    /// Total bytes of file data across the whole chain.
    pub fn file_length(&self) -> u32 {
        self.byte_length + self.next.as_ref().map_or(0, |next| next.file_length())
    }

    /// Diagnostic dump of the header fields and the decoded contents of each
    /// data sector, continuations included. Non-printable bytes are rendered
    /// as escaped hex.
    pub fn print<T: SectorStorage, W: Write>(
        &self,
        dev: &mut T,
        out: &mut W,
    ) -> Result<(), FsError> {
        writeln!(
            out,
            "File header contents. Segment size: {} bytes. File blocks:",
            self.byte_length
        )?;
        for &sector in self.direct.iter().take(self.sector_count as usize) {
            write!(out, "{} ", sector)?;
        }
        writeln!(out, "\nFile contents:")?;

        let mut data = [0u8; SECTOR_SIZE];
        let mut remaining = self.byte_length as usize;
        for &sector in self.direct.iter().take(self.sector_count as usize) {
            dev.read_sector(sector as usize, &mut data)?;
            for &byte in &data[..remaining.min(SECTOR_SIZE)] {
                if (0x20..=0x7e).contains(&byte) {
                    write!(out, "{}", byte as char)?;
                } else {
                    write!(out, "\\{:x}", byte)?;
                }
            }
            remaining -= remaining.min(SECTOR_SIZE);
            writeln!(out)?;
        }

        if let Some(next) = self.next.as_ref() {
            next.print(dev, out)?;
        }
        Ok(())
    }

    /// Encodes this block's fields at their fixed offsets. Continuations
    /// serialize themselves; the chain link is just the sector number here.
    fn serialize(&self) -> [u8; SECTOR_SIZE] {
        let mut buf = [0u8; SECTOR_SIZE];
        buf[LEN_OFFSET..LEN_OFFSET + 4].copy_from_slice(&(self.byte_length as i32).to_ne_bytes());
        buf[COUNT_OFFSET..COUNT_OFFSET + 4]
            .copy_from_slice(&(self.sector_count as i32).to_ne_bytes());
        for (i, &slot) in self.direct.iter().enumerate() {
            let at = TABLE_OFFSET + 4 * i;
            buf[at..at + 4].copy_from_slice(&slot.to_ne_bytes());
        }
        let link = self.next_sector.map_or(NO_SECTOR, |s| s as i32);
        buf[NEXT_OFFSET..NEXT_OFFSET + 4].copy_from_slice(&link.to_ne_bytes());
        buf
    }

    fn parse_from(&mut self, buf: &[u8]) {
        let read_i32 =
            |at: usize| i32::from_ne_bytes(buf[at..at + 4].try_into().unwrap());

        self.byte_length = read_i32(LEN_OFFSET) as u32;
        self.sector_count = read_i32(COUNT_OFFSET) as u32;
        for (i, slot) in self.direct.iter_mut().enumerate() {
            *slot = read_i32(TABLE_OFFSET + 4 * i);
        }
        let link = read_i32(NEXT_OFFSET);
        self.next_sector = if link == NO_SECTOR {
            None
        } else {
            Some(link as u32)
        };
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}
