//! Region table data structure and structure-related operations
//!
//! A `RegionTable` is the ordered, append-only list of every region the debugger knows about
//! for the loaded image: memory captured in the core, pages the core left out, and files that
//! `mmapfile` mapped in afterwards. Next to the ordered list it keeps a `nodit` interval index
//! over the readable regions so memory reads can find their backing by address.
//!
//! Tables are never mutated once published. Adding a region builds a new table.
use nodit::interval::ii;
use nodit::{Interval, NoditMap};
use std::collections::TryReserveError;
use std::fmt;
use std::sync::Arc;

use crate::interface::HostMapping;

/// Used to identify what backs a region
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RegionClass {
    VmData,     // bytes captured in the core file
    Unbacked,   // present in the process, contents left out of the core
    MappedFile, // file mapped in by `mmapfile`
}

impl RegionClass {
    /// Whether a region of this class already accounts for its address range.
    /// `Unbacked` ranges are exactly what `mmapfile` is meant to fill.
    pub fn occupies_address_space(self) -> bool {
        matches!(self, RegionClass::VmData | RegionClass::MappedFile)
    }
}

impl fmt::Display for RegionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionClass::VmData => "vmdata",
            RegionClass::Unbacked => "unbacked",
            RegionClass::MappedFile => "mmap",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub enum RegionContents {
    Core { file_offset: u64 },
    Host(Arc<HostMapping>),
    Absent,
}

/// A contiguous virtual-address range `[start, start + len)` of the debugged process
#[derive(Clone, Debug)]
pub struct Region {
    pub start: u64,
    pub len: u64,
    pub name: String,
    pub class: RegionClass,
    pub contents: RegionContents,
}

impl Region {
    pub fn new(start: u64, len: u64, name: String, class: RegionClass, contents: RegionContents) -> Self {
        Region { start, len, name, class, contents }
    }

    /// One past the last address, saturating at the top of the address space
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.len)
    }

    /// Whether `[start, start + len)` shares at least one address with this region
    pub fn intersects(&self, start: u64, len: u64) -> bool {
        let end = start.saturating_add(len);
        start < self.end() && self.start < end
    }

    fn interval(&self) -> Option<Interval<u64>> {
        if self.len == 0 {
            return None;
        }
        let last = self.start.checked_add(self.len - 1)?;
        Some(ii(self.start, last))
    }

    fn is_readable(&self) -> bool {
        !matches!(self.contents, RegionContents::Absent)
    }
}

#[derive(Clone, Debug)]
pub struct RegionTable {
    regions: Vec<Region>,
    index: NoditMap<u64, Interval<u64>, usize>, // readable regions, keyed by address
}

/// Why a new table could not be built
#[derive(Debug)]
pub enum TableError {
    Alloc(TryReserveError),
    Conflict { start: u64, end: u64 },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::Alloc(e) => write!(f, "{}", e),
            TableError::Conflict { start, end } => {
                write!(f, "range {:#x}-{:#x} already indexed", start, end)
            }
        }
    }
}

impl RegionTable {
    pub fn new() -> Self {
        RegionTable {
            regions: Vec::new(),
            index: NoditMap::new(),
        }
    }

    /// Builds the table for a freshly loaded core. Readable regions that collide with an
    /// earlier one stay listed but are left out of the address index.
    pub fn from_core(regions: Vec<Region>) -> Self {
        let mut index = NoditMap::new();
        for (i, region) in regions.iter().enumerate() {
            if !region.is_readable() {
                continue;
            }
            let Some(interval) = region.interval() else {
                continue;
            };
            if index.insert_strict(interval, i).is_err() {
                log::warn!(
                    "core region {} at {:#x}-{:#x} overlaps another region, not readable",
                    region.name,
                    region.start,
                    region.end()
                );
            }
        }
        RegionTable { regions, index }
    }

    /// Builds a new table holding every region of `self` followed by `region`.
    /// `self` is left untouched whatever the outcome.
    pub fn with_region(&self, region: Region) -> Result<RegionTable, TableError> {
        let mut regions = Vec::new();
        regions
            .try_reserve_exact(self.regions.len() + 1)
            .map_err(TableError::Alloc)?;
        regions.extend(self.regions.iter().cloned());

        let mut index = self.index.clone();
        if region.is_readable() {
            if let Some(interval) = region.interval() {
                if index.insert_strict(interval, regions.len()).is_err() {
                    return Err(TableError::Conflict {
                        start: region.start,
                        end: region.end(),
                    });
                }
            }
        }
        regions.push(region);

        Ok(RegionTable { regions, index })
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Region> {
        self.regions.iter()
    }

    /// Regions that already account for their address range, in table order
    pub fn occupied(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(|region| region.class.occupies_address_space())
    }

    /// The readable region containing `addr`
    pub fn find(&self, addr: u64) -> Option<&Region> {
        self.index.get_at_point(addr).map(|&i| &self.regions[i])
    }

    /// Copies `len` bytes starting at `addr`, walking as many regions as needed.
    /// Returns `None` if any byte of the range is not backed.
    pub fn read(&self, core_data: &[u8], addr: u64, len: usize) -> Option<Vec<u8>> {
        // grows with the backed bytes found, never with the requested length
        let mut out = Vec::new();
        let mut cur = addr;
        while out.len() < len {
            let region = self.find(cur)?;
            let skip = cur - region.start;
            let avail = usize::try_from(region.len - skip).unwrap_or(usize::MAX);
            let want = (len - out.len()).min(avail);
            let skip = usize::try_from(skip).ok()?;

            match &region.contents {
                RegionContents::Core { file_offset } => {
                    let from = usize::try_from(*file_offset).ok()?.checked_add(skip)?;
                    out.extend_from_slice(core_data.get(from..from.checked_add(want)?)?);
                }
                RegionContents::Host(mapping) => {
                    out.extend_from_slice(mapping.as_slice().get(skip..skip + want)?);
                }
                RegionContents::Absent => return None,
            }
            cur = cur.checked_add(want as u64)?;
        }
        Some(out)
    }
}
