mod alloc;
mod header;
pub mod io;

pub use crate::alloc::SectorMap;
pub use crate::header::FileHeader;

use thiserror::Error;

/// Size of one physical disk sector in bytes, the unit of all device I/O.
pub const SECTOR_SIZE: usize = 128;

/// Number of direct block slots in one header block, chosen so the header
/// (length word, sector count word, table, continuation word) is exactly one
/// sector.
pub const NUM_DIRECT: usize = (SECTOR_SIZE - 3 * 4) / 4;

/// The most file data one header block can map. Files larger than this chain
/// additional header blocks.
pub const MAX_FILE_SIZE: u32 = (NUM_DIRECT * SECTOR_SIZE) as u32;

/// Total sectors on the disk, and the number of bits tracked by [`SectorMap`].
pub const NUM_SECTORS: usize = 1024;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("not enough free sectors: need {needed}, have {free}")]
    InsufficientSpace { needed: u64, free: u64 },
    #[error("sector device error")]
    Device(#[from] std::io::Error),
}
