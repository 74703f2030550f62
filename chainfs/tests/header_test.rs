use chainfs::io::{FileSectorEmulator, FileSectorEmulatorBuilder, SectorStorage};
use chainfs::{FileHeader, FsError, SectorMap, MAX_FILE_SIZE, NUM_SECTORS, SECTOR_SIZE};
use tempfile::NamedTempFile;

fn create_test_device() -> FileSectorEmulator {
    let dev = tempfile::tempfile().unwrap();
    FileSectorEmulatorBuilder::from(dev)
        .with_sector_count(NUM_SECTORS)
        .build()
        .expect("Could not initialize disk emulator.")
}

#[test]
fn write_back_then_fetch_reproduces_the_chain() {
    let mut dev = create_test_device();
    let mut map = SectorMap::new();
    let root = map.find_and_set().unwrap() as u32;

    let mut hdr = FileHeader::new();
    hdr.allocate(&mut map, 2 * MAX_FILE_SIZE + 200).unwrap();
    // Persisting is read-only on the chain; a frozen binding suffices.
    let hdr = hdr;
    hdr.write_back(&mut dev, root).unwrap();
    dev.sync_disk().unwrap();

    let mut read_back = FileHeader::new();
    read_back.fetch_from(&mut dev, root).unwrap();

    assert_eq!(read_back.file_length(), hdr.file_length());
    // Every mapped block resolves to the same physical sector as before.
    let blocks = (hdr.file_length() + SECTOR_SIZE as u32 - 1) / SECTOR_SIZE as u32;
    for block in 0..blocks {
        let offset = block * SECTOR_SIZE as u32;
        assert_eq!(read_back.byte_to_sector(offset), hdr.byte_to_sector(offset));
    }
    assert_eq!(read_back.byte_to_sector(hdr.file_length()), None);
}

#[test]
fn chain_survives_disk_reopen() {
    let disk = NamedTempFile::new().unwrap();
    let mut dev = FileSectorEmulatorBuilder::from(disk.reopen().unwrap())
        .with_sector_count(NUM_SECTORS)
        .build()
        .unwrap();

    let mut map = SectorMap::new();
    let root = map.find_and_set().unwrap() as u32;
    let mut hdr = FileHeader::new();
    hdr.allocate(&mut map, MAX_FILE_SIZE + 88).unwrap();
    hdr.write_back(&mut dev, root).unwrap();
    dev.sync_disk().unwrap();

    let mut dev = FileSectorEmulatorBuilder::from(disk.reopen().unwrap())
        .with_sector_count(NUM_SECTORS)
        // Don't reset the initialized disk.
        .clear_medium(false)
        .build()
        .unwrap();
    let mut read_back = FileHeader::new();
    read_back.fetch_from(&mut dev, root).unwrap();

    assert_eq!(read_back.file_length(), MAX_FILE_SIZE + 88);
    assert_eq!(
        read_back.byte_to_sector(MAX_FILE_SIZE),
        hdr.byte_to_sector(MAX_FILE_SIZE)
    );
}

#[test]
fn print_renders_sector_contents_with_escapes() {
    let mut dev = create_test_device();
    let mut map = SectorMap::new();
    let mut hdr = FileHeader::new();
    hdr.allocate(&mut map, 5).unwrap();

    let data_sector = hdr.byte_to_sector(0).unwrap() as usize;
    let mut content = vec![0u8; SECTOR_SIZE];
    content[..5].copy_from_slice(&[b'a', b'b', 0x01, b'c', b'd']);
    dev.write_sector(data_sector, &mut content).unwrap();

    let mut out = Vec::new();
    hdr.print(&mut dev, &mut out).unwrap();
    let rendered = String::from_utf8(out).unwrap();

    assert!(rendered.contains("Segment size: 5 bytes"));
    // Printable bytes pass through, the 0x01 renders as escaped hex.
    assert!(rendered.contains("ab\\1cd"));
}

#[test]
fn out_of_range_header_sector_surfaces_device_error() {
    let dev = tempfile::tempfile().unwrap();
    let mut dev = FileSectorEmulatorBuilder::from(dev)
        .with_sector_count(4)
        .build()
        .unwrap();

    let mut map = SectorMap::new();
    let mut hdr = FileHeader::new();
    hdr.allocate(&mut map, 200).unwrap();

    match hdr.write_back(&mut dev, 9) {
        Err(FsError::Device(_)) => (),
        other => panic!("expected a device error, got {:?}", other),
    }
}
