mod diskemu;
mod sector;

pub use diskemu::{FileSectorEmulator, FileSectorEmulatorBuilder};
pub use sector::{SectorNumber, SectorStorage};
