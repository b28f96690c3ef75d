//! Maps real files at fixed addresses in the test process.
//!
//! Free addresses are found by letting the kernel place an anonymous reservation and
//! releasing it again right before the mapping.
use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;

use coremap::eval::SymbolEvaluator;
use coremap::image::{ImageRegions, ProcessImage};
use coremap::interface::{FixedMapper, MmapError};
use coremap::mmapfile::mmap_command;

fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

/// Address of `len` bytes the kernel considered free. Released again unless `keep`.
fn reserve(len: usize, keep: bool) -> usize {
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    assert_ne!(addr, libc::MAP_FAILED);
    if !keep {
        unsafe { libc::munmap(addr, len) };
    }
    addr as usize
}

fn loaded_image() -> ProcessImage {
    ProcessImage::from_parts(PathBuf::from("core.fixed"), Vec::new(), Vec::new())
}

fn backing_file(dir: &TempDir, len: usize) -> (PathBuf, Vec<u8>) {
    let bytes: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
    let path = dir.path().join("backing.bin");
    std::fs::write(&path, &bytes).unwrap();
    (path, bytes)
}

#[test]
#[serial]
fn file_is_mapped_at_requested_address() {
    let _ = env_logger::builder().is_test(true).try_init();
    let page = page_size();
    let dir = TempDir::new().unwrap();
    let (path, bytes) = backing_file(&dir, 2 * page);
    let image = loaded_image();
    let eval = SymbolEvaluator::new();

    let addr = reserve(page, false);
    let args = format!("{} {:#x} {:#x} {:#x}", path.display(), addr, page, page);
    let mapped = mmap_command(&args, &image, &eval, &FixedMapper, None).unwrap();

    assert_eq!(mapped.start, addr as u64);
    assert_eq!(mapped.end, (addr + page) as u64);
    assert_eq!(image.read_memory(addr as u64, 16).unwrap(), bytes[page..page + 16]);

    // the pages are really at that address in this process
    let direct = unsafe { std::slice::from_raw_parts(addr as *const u8, 16) };
    assert_eq!(direct, &bytes[page..page + 16]);

    let err = mmap_command(&args, &image, &eval, &FixedMapper, None).unwrap_err();
    assert!(matches!(err, MmapError::Overlap { source: None, .. }));
    assert_eq!(image.regions().len(), 1);
}

#[test]
#[serial]
fn busy_host_address_is_refused() {
    let page = page_size();
    let dir = TempDir::new().unwrap();
    let (path, _) = backing_file(&dir, page);
    let image = loaded_image();
    let eval = SymbolEvaluator::new();

    // nothing in the image claims this range, but the host already has it mapped
    let addr = reserve(page, true);
    let args = format!("{} {:#x} 0 {:#x}", path.display(), addr, page);
    let err = mmap_command(&args, &image, &eval, &FixedMapper, None).unwrap_err();

    match err {
        MmapError::Overlap { source, .. } => assert!(source.is_some()),
        other => panic!("expected overlap, got {:?}", other),
    }
    assert!(image.regions().is_empty());

    unsafe { libc::munmap(addr as *mut libc::c_void, page) };
}

#[test]
#[serial]
fn unaligned_offset_is_refused_by_the_kernel() {
    let page = page_size();
    let dir = TempDir::new().unwrap();
    let (path, _) = backing_file(&dir, 2 * page);
    let image = loaded_image();

    let addr = reserve(page, false);
    let args = format!("{} {:#x} 1 16", path.display(), addr);
    let err = mmap_command(&args, &image, &SymbolEvaluator::new(), &FixedMapper, None).unwrap_err();

    match err {
        MmapError::Overlap { source: Some(e), .. } => {
            assert_eq!(e.raw_os_error(), Some(libc::EINVAL))
        }
        other => panic!("expected refused mapping, got {:?}", other),
    }
    assert!(image.regions().is_empty());
}
