use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

// NB. addresses are u16 as per a small AVR-style EEPROM; the controller only
//     ever touches the first three bytes

/// the value a never-written EEPROM cell reads back as
pub const ERASED: u8 = 0xff;

/// default store size, matching the part the units ship with
pub const DEFAULT_STORE_SIZE: u16 = 1024;

/// Represents non-volatile, byte-addressable storage that survives power loss.
pub trait SelectionStore {
    /// read one byte. out-of-range addresses read as erased
    fn read(&self, addr: u16) -> u8;

    /// write one byte
    fn write(&mut self, addr: u16, value: u8) -> Result<()>;

    /// how many bytes the store holds
    fn size(&self) -> u16;

    /// write only if the stored byte differs, to spare the cell
    fn update(&mut self, addr: u16, value: u8) -> Result<()> {
        if self.read(addr) != value {
            self.write(addr, value)?;
        }
        Ok(())
    }
}

fn check_addr(addr: u16, size: u16) -> Result<usize> {
    if addr >= size {
        return Err(Error::AddressOutOfRange { addr, size });
    }
    Ok(addr as usize)
}

/// EEPROM held in RAM; starts erased. also counts writes, which is handy for
/// checking wear behaviour
pub struct RamStore {
    bytes: Box<[u8]>,
    writes: usize,
}

impl RamStore {
    pub fn new(size: u16) -> Self {
        RamStore {
            bytes: vec![ERASED; size as usize].into_boxed_slice(),
            writes: 0,
        }
    }

    /// pre-load the first bytes, e.g. a previously persisted selection
    pub fn with_contents(size: u16, contents: &[u8]) -> Self {
        let mut store = Self::new(size);
        let len = contents.len().min(store.bytes.len());
        store.bytes[..len].copy_from_slice(&contents[..len]);
        store
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Default for RamStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_SIZE)
    }
}

impl SelectionStore for RamStore {
    fn read(&self, addr: u16) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        let a = check_addr(addr, self.size())?;
        self.bytes[a] = value;
        self.writes += 1;
        Ok(())
    }

    fn size(&self) -> u16 {
        self.bytes.len() as u16
    }
}

/// EEPROM image in a file, so the bench keeps its selection between runs.
/// the whole image is cached; writes go straight through to disk
pub struct FileStore {
    file: File,
    cache: RamStore,
}

impl FileStore {
    /// open an existing image, or create an erased one of `size` bytes. an
    /// image shorter than `size` is padded with erased bytes
    pub fn open(path: impl AsRef<Path>, size: u16) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        let cache = RamStore::with_contents(size, &contents);
        if contents.len() < size as usize {
            file.seek(SeekFrom::Start(contents.len() as u64))?;
            file.write_all(&vec![ERASED; size as usize - contents.len()])?;
            file.sync_data()?;
        }
        Ok(FileStore { file, cache })
    }
}

impl SelectionStore for FileStore {
    fn read(&self, addr: u16) -> u8 {
        self.cache.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        check_addr(addr, self.size())?;
        self.file.seek(SeekFrom::Start(addr as u64))?;
        self.file.write_all(&[value])?;
        self.file.sync_data()?;
        self.cache.write(addr, value)
    }

    fn size(&self) -> u16 {
        self.cache.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_store_erased() {
        let s = RamStore::new(16);
        assert_eq!(s.size(), 16);
        for addr in 0..16 {
            assert_eq!(s.read(addr), ERASED);
        }
    }

    #[test]
    fn test_ram_store_write_read() -> Result<()> {
        let mut s = RamStore::default();
        s.write(2, 0x01)?;
        assert_eq!(s.read(2), 0x01);
        assert_eq!(s.writes(), 1);
        Ok(())
    }

    #[test]
    fn test_ram_store_out_of_range() {
        let mut s = RamStore::new(4);
        assert_eq!(s.read(4), ERASED);
        let err = s.write(4, 0).unwrap_err();
        assert!(matches!(err, Error::AddressOutOfRange { addr: 4, size: 4 }));
    }

    #[test]
    fn test_with_contents() {
        let s = RamStore::with_contents(4, &[5, 1, 0, 9, 9, 9]);
        assert_eq!((s.read(0), s.read(1), s.read(2), s.read(3)), (5, 1, 0, 9));
        assert_eq!(s.size(), 4);
    }

    #[test]
    fn test_update_skips_unchanged() -> Result<()> {
        let mut s = RamStore::with_contents(8, &[3]);
        s.update(0, 3)?;
        assert_eq!(s.writes(), 0);
        s.update(0, 4)?;
        assert_eq!(s.writes(), 1);
        assert_eq!(s.read(0), 4);
        Ok(())
    }

    #[test]
    fn test_file_store_created_erased() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("eeprom.bin");
        let s = FileStore::open(&path, 32)?;
        assert_eq!(s.read(0), ERASED);
        assert_eq!(std::fs::metadata(&path)?.len(), 32);
        Ok(())
    }

    #[test]
    fn test_file_store_survives_reopen() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("eeprom.bin");
        {
            let mut s = FileStore::open(&path, 32)?;
            s.write(0, 5)?;
            s.write(1, 1)?;
        }
        let s = FileStore::open(&path, 32)?;
        assert_eq!((s.read(0), s.read(1), s.read(2)), (5, 1, ERASED));
        Ok(())
    }

    #[test]
    fn test_file_store_pads_short_image() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("eeprom.bin");
        std::fs::write(&path, [7u8, 0])?;
        let s = FileStore::open(&path, 8)?;
        assert_eq!((s.read(0), s.read(1), s.read(2)), (7, 0, ERASED));
        assert_eq!(std::fs::metadata(&path)?.len(), 8);
        Ok(())
    }

    #[test]
    fn test_file_store_out_of_range() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut s = FileStore::open(dir.path().join("eeprom.bin"), 4)?;
        assert!(matches!(
            s.write(9, 1),
            Err(Error::AddressOutOfRange { addr: 9, size: 4 })
        ));
        Ok(())
    }
}
