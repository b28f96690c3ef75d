// coremap unit test suite
//
// The mapping registrar is exercised through `MapBacking` stand-ins so tests can use small,
// unaligned addresses like 0x1000 that could never be mapped for real in the test process.
// The real fixed mapper is covered by the integration tests under tests/.
//
// Tests that change the working directory or the environment are #[serial].


use std::cell::RefCell;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::image::{ProcessImage, Region, RegionClass, RegionContents};
use crate::interface::{HostMapping, MapBacking};

/// Copies the requested file range into leaked heap memory instead of mapping it.
/// Bytes past the end of the file read as zero. Records every call.
#[derive(Default)]
pub struct CopyingMapper {
    pub calls: RefCell<Vec<(u64, u64, u64)>>,
}

impl MapBacking for CopyingMapper {
    fn map_readonly(
        &self,
        file: &File,
        addr: u64,
        len: u64,
        offset: u64,
    ) -> io::Result<HostMapping> {
        self.calls.borrow_mut().push((addr, len, offset));

        let mut buf = vec![0u8; len as usize];
        let mut done = 0;
        while done < buf.len() {
            let n = file.read_at(&mut buf[done..], offset + done as u64)?;
            if n == 0 {
                break;
            }
            done += n;
        }

        let buf: &'static [u8] = Box::leak(buf.into_boxed_slice());
        Ok(unsafe { HostMapping::from_raw(buf.as_ptr() as usize, buf.len()) })
    }
}

/// Refuses every mapping, like a kernel rejecting the fixed address
pub struct FailingMapper;

impl MapBacking for FailingMapper {
    fn map_readonly(&self, _: &File, _: u64, _: u64, _: u64) -> io::Result<HostMapping> {
        Err(io::Error::from_raw_os_error(libc::EINVAL))
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A loaded image with the given regions and no core bytes
pub fn test_image(regions: Vec<Region>) -> ProcessImage {
    ProcessImage::from_parts(PathBuf::from("core.test"), Vec::new(), regions)
}

pub fn vmdata(start: u64, len: u64) -> Region {
    Region::new(
        start,
        len,
        format!("vmdata@{:#x}", start),
        RegionClass::VmData,
        RegionContents::Core { file_offset: 0 },
    )
}

pub fn unbacked(start: u64, len: u64) -> Region {
    Region::new(
        start,
        len,
        format!("missing@{:#x}", start),
        RegionClass::Unbacked,
        RegionContents::Absent,
    )
}

/// Writes `contents` to `dir/name`, creating parent directories
pub fn scratch_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// `len` bytes where byte `i` is `i % 251`, so every offset reads differently
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
