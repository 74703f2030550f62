use std::fs::{File, OpenOptions};
use std::io::prelude::*;
use std::io::{BufWriter, ErrorKind, SeekFrom};
use std::path::Path;

use crate::io::{SectorNumber, SectorStorage};
use crate::SECTOR_SIZE;

/// Emulates a raw sector device in userspace using a file as backing
/// storage. This is only meant to be used for file system development and
/// testing.
pub struct FileSectorEmulator {
    /// The file must be a fixed-size file some exact multiple of the size of
    /// a sector.
    fd: File,
    /// The total number of sectors available on the emulated device.
    sector_count: usize,
}

impl FileSectorEmulator {
    /// Returns ownership of the underlying file descriptor to the caller.
    pub fn into_file(self) -> File {
        self.fd
    }
}

impl SectorStorage for FileSectorEmulator {
    fn open_disk<P: AsRef<Path>>(dest: P, nsectors: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized,
    {
        // Return an error if the file does not exist rather than create one.
        let file = OpenOptions::new().read(true).write(true).open(dest)?;
        Ok(FileSectorEmulator {
            fd: file,
            sector_count: nsectors,
        })
    }

    fn read_sector(&mut self, sectornr: SectorNumber, buf: &mut [u8]) -> std::io::Result<()> {
        if sectornr > (self.sector_count - 1) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "sector out of range",
            ));
        }

        if buf.len() < SECTOR_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read sector",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((sectornr * SECTOR_SIZE) as u64))?;

        let fd = &mut self.fd;
        // Limit the read to just the sector specified.
        let mut fixed_reader = fd.take(SECTOR_SIZE as u64);
        let bytes_read = fixed_reader.read(&mut buf[..SECTOR_SIZE])?;
        debug_assert!(bytes_read == SECTOR_SIZE);
        Ok(())
    }

    /// This method truncates writes that exceed the sector size.
    fn write_sector(&mut self, sectornr: SectorNumber, buf: &mut [u8]) -> std::io::Result<()> {
        if sectornr > (self.sector_count - 1) {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "sector out of range",
            ));
        }
        self.fd
            .seek(SeekFrom::Start((sectornr * SECTOR_SIZE) as u64))?;

        let max = if SECTOR_SIZE < buf.len() {
            SECTOR_SIZE
        } else {
            buf.len()
        };
        let bytes_written = self.fd.write(&buf[0..max])?;
        debug_assert!(bytes_written == max);
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.fd.sync_all()?;
        Ok(())
    }
}

pub struct FileSectorEmulatorBuilder {
    fd: File,
    sector_count: usize,
    clear_medium: bool,
}

impl From<File> for FileSectorEmulatorBuilder {
    fn from(fd: File) -> Self {
        FileSectorEmulatorBuilder {
            fd,
            // A better default here might be the size of the file rounded
            // down to the nearest sector.
            sector_count: 0,
            clear_medium: true,
        }
    }
}

impl FileSectorEmulatorBuilder {
    /// Sets the number of desired sectors on the emulated device.
    pub fn with_sector_count(mut self, sectors: usize) -> Self {
        self.sector_count = sectors;
        self
    }

    /// Whether to zero the backing file on build. Disable when reopening an
    /// already-initialized disk image.
    pub fn clear_medium(mut self, clear: bool) -> Self {
        self.clear_medium = clear;
        self
    }

    /// This builder assumes ownership of the file descriptor used and does
    /// destructive things to prepare the file for use. Additionally,
    /// ownership of the file is transferred to the emulator meaning this
    /// builder can only be used to create one emulator.
    pub fn build(mut self) -> std::io::Result<FileSectorEmulator> {
        debug_assert!(self.sector_count > 0);
        if self.clear_medium {
            self.zero_sectors()?;
        }
        Ok(FileSectorEmulator {
            fd: self.fd,
            sector_count: self.sector_count,
        })
    }

    fn zero_sectors(&mut self) -> std::io::Result<()> {
        let mut bfd = BufWriter::new(&self.fd);
        // Zero out the emulated disk, buffering each write to prevent
        // excessive syscalls.
        for _ in 0..self.sector_count {
            bfd.write_all(vec![0x00; SECTOR_SIZE].as_slice())?;
        }
        bfd.flush()?;
        Ok(())
    }
}
