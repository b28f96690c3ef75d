//! The `mmapfile` command
//!
//! Adds the contents of memory-mapped files that are missing from a core dump. Files mapped
//! read-only with MAP_SHARED or MAP_PRIVATE are usually left out of the core; this maps the
//! file back at the address it had in the dumped process and registers the range as a new
//! region so memory reads can go through it.
//!
//! ```text
//! mmapfile <FILENAME> <MAP-ADDRESS / SYMBOL NAME> <FILE-OFFSET> <LENGTH>
//! ```
//!
//! The sequence is: validate arguments, resolve the file, check the range against the
//! regions already accounted for, map, then publish a rebuilt region table. Nothing is
//! published unless every step succeeds. Mappings are never undone.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::MMAP_SECTION_PREFIX;
use crate::eval::AddressEvaluator;
use crate::image::{ImageRegions, Region, RegionClass, RegionContents, RegionTable};
use crate::interface::{parse_literal, split_args, MapBacking, MmapError};
use crate::resolver::{resolve, ResolvedFile};

/// Tag for the next generated section name. Starts at 1, only ever grows.
static NEXT_SECTION_TAG: AtomicU64 = AtomicU64::new(1);

/// Validated arguments of one `mmapfile` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRequest {
    pub designator: String,
    pub addr: u64,
    pub offset: u64,
    pub len: u64,
}

impl MappingRequest {
    /// Builds a request from exactly four tokens. Length and offset are checked before the
    /// address is evaluated, so a zero length is reported whatever the other arguments are.
    pub fn from_tokens(tokens: &[&str], eval: &dyn AddressEvaluator) -> Result<Self, MmapError> {
        let [designator, addr_expr, offset, len] = tokens else {
            return Err(MmapError::Usage);
        };

        let len = parse_literal(len)?;
        if len == 0 {
            return Err(MmapError::ZeroLength);
        }
        let offset = parse_literal(offset)?;

        let addr = eval
            .evaluate(addr_expr)
            .map_err(|reason| MmapError::BadAddress {
                expr: addr_expr.to_string(),
                reason,
            })?;

        Ok(MappingRequest {
            designator: designator.to_string(),
            addr,
            offset,
            len,
        })
    }

    /// One past the last mapped address
    pub fn end(&self) -> u64 {
        self.addr.saturating_add(self.len)
    }

    fn overlap(&self, source: Option<std::io::Error>) -> MmapError {
        MmapError::Overlap {
            file: self.designator.clone(),
            addr: self.addr,
            source,
        }
    }
}

/// A successfully registered mapping
#[derive(Debug, Clone)]
pub struct MappedFile {
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
    pub label: String,
}

impl fmt::Display for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "File {} is now mapped\nfrom address {:X} to {:X}.",
            self.path.display(),
            self.start,
            self.end
        )
    }
}

/// Runs `mmapfile` with its raw argument string against `image`
pub fn mmap_command(
    args: &str,
    image: &dyn ImageRegions,
    eval: &dyn AddressEvaluator,
    mapper: &dyn MapBacking,
    search_path: Option<&str>,
) -> Result<MappedFile, MmapError> {
    let tokens = split_args(args);
    if tokens.len() != 4 {
        return Err(MmapError::Usage);
    }

    // No point mapping anything if no core is being debugged
    if !image.is_loaded() {
        return Err(MmapError::NoImageLoaded);
    }

    let request = MappingRequest::from_tokens(&tokens, eval)?;
    let resolved = resolve(search_path, &request.designator)?;
    register_mapping(&request, resolved, image, mapper)
}

/// Checks `request` against the published regions, maps `resolved` and publishes a table
/// with the new region appended.
pub fn register_mapping(
    request: &MappingRequest,
    resolved: ResolvedFile,
    image: &dyn ImageRegions,
    mapper: &dyn MapBacking,
) -> Result<MappedFile, MmapError> {
    let table = image.regions();
    check_overlap(&table, request)?;

    let mapping = mapper
        .map_readonly(&resolved.file, request.addr, request.len, request.offset)
        .map_err(|e| {
            log::debug!(
                "mapping {} at {:#x} refused: {}",
                request.designator,
                request.addr,
                e
            );
            request.overlap(Some(e))
        })?;

    // the mapping keeps the pages, the descriptor is no longer needed
    let path = resolved.display_path().to_path_buf();
    drop(resolved);

    let label = unique_label(&table, &path);
    let region = Region::new(
        request.addr,
        request.len,
        label.clone(),
        RegionClass::MappedFile,
        RegionContents::Host(Arc::new(mapping)),
    );

    let rebuilt = table
        .with_region(region)
        .map_err(|e| MmapError::ResourceExhaustion {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    image.install(rebuilt);

    log::info!(
        "{}: {:#x}-{:#x} from offset {:#x}",
        label,
        request.addr,
        request.end(),
        request.offset
    );

    Ok(MappedFile {
        path,
        start: request.addr,
        end: request.end(),
        label,
    })
}

/// Rejects a request whose range shares an address with any region that already accounts
/// for its range. Every such region is visited.
pub fn check_overlap(table: &RegionTable, request: &MappingRequest) -> Result<(), MmapError> {
    for region in table.occupied() {
        if region.intersects(request.addr, request.len) {
            log::debug!(
                "{:#x}-{:#x} overlaps {} at {:#x}-{:#x}",
                request.addr,
                request.end(),
                region.name,
                region.start,
                region.end()
            );
            return Err(request.overlap(None));
        }
    }
    Ok(())
}

/// `mmap_section.<N> (Mapped to <path>)`, with `<N>` not used by any region in `table`
fn unique_label(table: &RegionTable, path: &Path) -> String {
    loop {
        let tag = NEXT_SECTION_TAG.fetch_add(1, Ordering::Relaxed);
        let section = format!("{}.{}", MMAP_SECTION_PREFIX, tag);
        let taken = table
            .iter()
            .any(|region| region.name.split(' ').next() == Some(section.as_str()));
        if !taken {
            return format!("{} (Mapped to {})", section, path.display());
        }
    }
}
