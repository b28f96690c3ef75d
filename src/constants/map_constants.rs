pub const PROT_READ: i32 = 0x1; /* Page can be read.  */

pub const MAP_SHARED: i32 = 0x01; /* Share changes.  */
pub const MAP_FIXED: i32 = 0x10; /* Interpret addr exactly.  */

/* Linux refuses instead of replacing an existing mapping */
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAP_FIXED_NOREPLACE: i32 = libc::MAP_FIXED_NOREPLACE;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAP_FIXED_NOREPLACE: i32 = MAP_FIXED;

pub const MAP_FAILED: *mut std::ffi::c_void = (-1isize) as *mut std::ffi::c_void;

/* prefix of the generated label for every mapped-file region */
pub const MMAP_SECTION_PREFIX: &str = "mmap_section";

pub const MMAPFILE_USAGE: &str =
    "mmapfile <FILENAME> <MAP-ADDRESS / SYMBOL NAME> <FILE-OFFSET> <LENGTH>";

pub const MMAPFILE_HELP: &str = "\
Add contents of memory mapped files missing from core dump.

Usage:
mmapfile <FILENAME> <MAP-ADDRESS / SYMBOL NAME> <FILE-OFFSET> <LENGTH>
Command is used (mostly while debugging a core) if the core file sections do not contain
memory mapped regions under the vmdata section.
This happens if files are mmap-ed with MAP_PRIVATE/MAP_SHARED and RO permissions.
Using this command, the user can access data from
the mmap-ed files, which are missing from the core file.";
