use std::path::Path;

/// The sector number to access, ranging from 0 (the first sector) to n - 1
/// (the last sector) where n is the number of sectors on the device.
pub type SectorNumber = usize;

/// Synchronous raw sector device. Reads and writes move whole sectors only;
/// a call either completes or fails, there are no partial transfers surfaced
/// through this interface.
pub trait SectorStorage {
    /// Opens a disk at the specified path. This method does not validate the
    /// stored sectors, it is up to clients to ensure disks are appropriately
    /// initialized.
    fn open_disk<P: AsRef<Path>>(path: P, nsectors: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;
    /// Reads the sector into the provided buffer.
    ///
    /// # Errors
    ///
    /// Attempting to read a sector out of range will return an error.
    fn read_sector(&mut self, sectornr: SectorNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes the provided buffer into the specified sector.
    ///
    /// # Errors
    ///
    /// Attempting to write a sector out of range will return an error.
    fn write_sector(&mut self, sectornr: SectorNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory. This is useful if it must be
    /// guaranteed the writes actually occurred, for instance, if being
    /// re-read from disk.
    fn sync_disk(&mut self) -> std::io::Result<()>;
}
