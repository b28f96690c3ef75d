//! The process image being debugged
//!
//! `ProcessImage` owns the raw bytes of a loaded core file and the currently published
//! `RegionTable`. Readers take an `Arc` snapshot of the table; installing a new table is a
//! single pointer swap under the write lock, so a reader never sees a half-built table.
pub mod region;

pub use region::*;

use object::read::elf::ElfFile64;
use object::{Endianness, Object, ObjectSegment};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::interface::ImageError;

/// What the mapping registrar needs from the image layer
pub trait ImageRegions {
    /// Whether a core image is loaded
    fn is_loaded(&self) -> bool;

    /// Snapshot of the currently published region table
    fn regions(&self) -> Arc<RegionTable>;

    /// Publishes `table` as the region table readers see from now on
    fn install(&self, table: RegionTable);
}

#[derive(Debug)]
struct CoreFile {
    path: PathBuf,
    data: Vec<u8>,
}

#[derive(Debug)]
pub struct ProcessImage {
    core: RwLock<Option<Arc<CoreFile>>>,
    table: RwLock<Arc<RegionTable>>,
}

impl Default for ProcessImage {
    fn default() -> Self {
        ProcessImage::empty()
    }
}

impl ProcessImage {
    /// An image with no core loaded. `mmapfile` refuses to run against it.
    pub fn empty() -> Self {
        ProcessImage {
            core: RwLock::new(None),
            table: RwLock::new(Arc::new(RegionTable::new())),
        }
    }

    /// Loads an ELF core file
    pub fn open(path: &Path) -> Result<Self, ImageError> {
        let image = ProcessImage::empty();
        image.load(path)?;
        Ok(image)
    }

    /// An image made of `regions`, read from `data` where they are `Core` backed
    pub fn from_parts(path: PathBuf, data: Vec<u8>, regions: Vec<Region>) -> Self {
        ProcessImage {
            core: RwLock::new(Some(Arc::new(CoreFile { path, data }))),
            table: RwLock::new(Arc::new(RegionTable::from_core(regions))),
        }
    }

    /// Replaces whatever is loaded with the core at `path`, dropping every region added
    /// for the previous core.
    pub fn load(&self, path: &Path) -> Result<(), ImageError> {
        let data = std::fs::read(path).map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let regions = core_regions(path, &data)?;
        log::info!("loaded core {} with {} regions", path.display(), regions.len());

        let table = RegionTable::from_core(regions);
        *self.core.write() = Some(Arc::new(CoreFile {
            path: path.to_path_buf(),
            data,
        }));
        *self.table.write() = Arc::new(table);
        Ok(())
    }

    pub fn core_path(&self) -> Option<PathBuf> {
        self.core.read().as_ref().map(|core| core.path.clone())
    }

    /// Reads `len` bytes at `addr` through the current region table
    pub fn read_memory(&self, addr: u64, len: usize) -> Option<Vec<u8>> {
        let core = self.core.read().clone()?;
        let table = self.regions();
        table.read(&core.data, addr, len)
    }
}

impl ImageRegions for ProcessImage {
    fn is_loaded(&self) -> bool {
        self.core.read().is_some()
    }

    fn regions(&self) -> Arc<RegionTable> {
        Arc::clone(&self.table.read())
    }

    fn install(&self, table: RegionTable) {
        let table = Arc::new(table);
        *self.table.write() = table;
    }
}

/// Derives the authoritative region list from the `PT_LOAD` segments of an ELF core.
///
/// The part of a segment with file contents becomes a `VmData` region, the rest (pages the
/// kernel left out of the dump, typically read-only file mappings) an `Unbacked` one.
fn core_regions(path: &Path, data: &[u8]) -> Result<Vec<Region>, ImageError> {
    let elf = ElfFile64::<Endianness>::parse(data).map_err(|e| ImageError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut regions = Vec::new();
    for (i, segment) in elf.segments().enumerate() {
        let vaddr = segment.address();
        let memsz = segment.size();
        let (file_offset, filesz) = segment.file_range();
        let filesz = filesz.min(memsz);

        if filesz > 0 {
            regions.push(Region::new(
                vaddr,
                filesz,
                format!("load{}", i),
                RegionClass::VmData,
                RegionContents::Core { file_offset },
            ));
        }
        if memsz > filesz {
            regions.push(Region::new(
                vaddr.saturating_add(filesz),
                memsz - filesz,
                format!("load{}.missing", i),
                RegionClass::Unbacked,
                RegionContents::Absent,
            ));
        }
    }
    Ok(regions)
}
