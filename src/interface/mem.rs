use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

use crate::constants::{MAP_FAILED, MAP_FIXED_NOREPLACE, MAP_SHARED, PROT_READ};

/// Host memory that backs a mapped-file region.
///
/// The pages stay mapped for the rest of the session: regions are never removed, so there is
/// no unmap on drop.
#[derive(Debug, PartialEq, Eq)]
pub struct HostMapping {
    pub host_addr: usize,
    pub len: usize,
}

impl HostMapping {
    /// Builds a mapping record from the address returned by `mmap`.
    ///
    /// # Safety
    /// `host_addr` must point to `len` readable bytes that stay mapped for the life of the
    /// process.
    pub unsafe fn from_raw(host_addr: usize, len: usize) -> Self {
        HostMapping { host_addr, len }
    }

    pub fn as_slice(&self) -> &[u8] {
        // the constructor contract keeps these pages readable and mapped
        unsafe { std::slice::from_raw_parts(self.host_addr as *const u8, self.len) }
    }
}

/// The mapping primitive used by the registrar. Implementations map `len` bytes of `file`
/// starting at `offset` read-only for the debugger, on behalf of target address `addr`.
pub trait MapBacking {
    fn map_readonly(&self, file: &File, addr: u64, len: u64, offset: u64)
        -> io::Result<HostMapping>;
}

/// Maps the file at exactly the requested address in our own address space, shared and
/// read-only. Existing host mappings are never replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedMapper;

impl MapBacking for FixedMapper {
    fn map_readonly(
        &self,
        file: &File,
        addr: u64,
        len: u64,
        offset: u64,
    ) -> io::Result<HostMapping> {
        let len = usize::try_from(len).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
        let offset = libc::off_t::try_from(offset)
            .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

        log::debug!(
            "mmap(addr={:#x}, len={:#x}, PROT_READ, MAP_SHARED|MAP_FIXED, fd={}, off={:#x})",
            addr,
            len,
            file.as_raw_fd(),
            offset
        );
        let result = unsafe {
            libc::mmap(
                addr as *mut libc::c_void,
                len,
                PROT_READ,
                MAP_SHARED | MAP_FIXED_NOREPLACE,
                file.as_raw_fd(),
                offset,
            )
        };
        if result == MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        // kernels without MAP_FIXED_NOREPLACE take the address as a hint
        if result as u64 != addr {
            unsafe { libc::munmap(result, len) };
            return Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("MAP_FIXED not fixed: wanted {:#x}, got {:#x}", addr, result as u64),
            ));
        }

        Ok(unsafe { HostMapping::from_raw(result as usize, len) })
    }
}
