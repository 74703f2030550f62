use chainfs::io::{FileSectorEmulatorBuilder, SectorStorage};
use chainfs::{FileHeader, SectorMap, NUM_SECTORS, SECTOR_SIZE};

pub fn main() {
    let tmp = tempfile::tempfile().unwrap();
    let mut dev = FileSectorEmulatorBuilder::from(tmp)
        .with_sector_count(NUM_SECTORS)
        .build()
        .expect("Could not initialize disk emulator.");

    let mut map = SectorMap::new();
    let root = map.find_and_set().unwrap() as u32;

    let greeting = b"Hello from a chained file header!";
    let mut header = FileHeader::new();
    header
        .allocate(&mut map, greeting.len() as u32)
        .expect("should allocate");

    let mut sector = vec![0u8; SECTOR_SIZE];
    sector[..greeting.len()].copy_from_slice(greeting);
    let data_sector = header.byte_to_sector(0).unwrap() as usize;
    dev.write_sector(data_sector, &mut sector).unwrap();
    header.write_back(&mut dev, root).unwrap();

    let mut reloaded = FileHeader::new();
    reloaded.fetch_from(&mut dev, root).unwrap();
    reloaded.print(&mut dev, &mut std::io::stdout()).unwrap();
}
