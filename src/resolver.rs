//! Path resolution for `mmapfile`
//!
//! Turns the file designator typed by the user plus a search path into an open, read-only
//! file and its canonical path. The designator is first tried as given, relative to the
//! current working directory. Failing that, it is normalized and tried under every search
//! path directory in order; the first one that opens wins.
//!
//! Search path tokens:
//!     `$cwd`  - the current working directory at the time of the call
//!     `$cdir` - never searched, there is no directory to expand it to here
//!     `~...`  - tilde expanded to a home directory
//!     other   - used as is
use std::env;
use std::ffi::{CStr, CString, OsStr, OsString};
use std::fs::{self, File};
use std::os::unix::ffi::OsStrExt;
use std::path::{is_separator, Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::constants::{
    CDIR_TOKEN, CWD_TOKEN, DEFAULT_SEARCH_PATH, DOS_BASED_FILE_SYSTEM, PATH_LIST_SEPARATOR,
    SEARCH_PATH_VAR, TILDE,
};
use crate::interface::MmapError;

/// A file found by `resolve`
#[derive(Debug)]
pub struct ResolvedFile {
    pub file: File,
    /// The path that was opened, as built during the search
    pub opened_path: PathBuf,
    /// Absolute path with the directory part canonicalized, if that could be worked out
    pub canonical: Option<PathBuf>,
}

impl ResolvedFile {
    /// The path to show the user: canonical when known, as opened otherwise
    pub fn display_path(&self) -> &Path {
        self.canonical.as_deref().unwrap_or(&self.opened_path)
    }
}

/// One directory entry of a search path, classified for expansion
#[derive(Debug, PartialEq, Eq)]
enum SearchToken<'a> {
    Cwd,
    CompilationDir,
    Tilde(&'a str),
    Dir(&'a str),
}

impl<'a> SearchToken<'a> {
    fn classify(token: &'a str) -> Self {
        if token == CWD_TOKEN {
            SearchToken::Cwd
        } else if token.contains(TILDE) {
            SearchToken::Tilde(token)
        } else if token == CDIR_TOKEN {
            SearchToken::CompilationDir
        } else {
            SearchToken::Dir(token)
        }
    }

    /// The directory this token stands for, or `None` when it is not searched
    fn expand(&self) -> Option<OsString> {
        match self {
            SearchToken::Cwd => match env::current_dir() {
                Ok(cwd) => Some(cwd.into_os_string()),
                Err(e) => {
                    log::warn!("cannot expand {}: {}", CWD_TOKEN, e);
                    None
                }
            },
            SearchToken::Tilde(token) => Some(tilde_expand(token)),
            // skipped on purpose; a directory really named `$cdir` is reachable as `./$cdir`
            SearchToken::CompilationDir => {
                log::debug!("skipping {} in search path", CDIR_TOKEN);
                None
            }
            // an empty entry means the current directory, as in a shell PATH
            SearchToken::Dir("") => Some(OsString::from(".")),
            SearchToken::Dir(dir) => Some(OsString::from(dir)),
        }
    }
}

/// Resolves `designator` using the search path in the `PATH` environment variable
pub fn resolve_with_env(designator: &str) -> Result<ResolvedFile, MmapError> {
    let search_path = env::var(SEARCH_PATH_VAR).ok();
    resolve(search_path.as_deref(), designator)
}

/// Opens `designator` read-only, searching `search_path` when it does not open as given.
/// `None` searches the current directory only.
pub fn resolve(search_path: Option<&str>, designator: &str) -> Result<ResolvedFile, MmapError> {
    // An empty name can never exist, and some stat implementations misbehave on it
    if designator.is_empty() {
        return Err(MmapError::FileNotFound {
            file: designator.to_string(),
        });
    }

    let opened = match open_readonly(Path::new(designator)) {
        Some(file) => Some((file, PathBuf::from(designator))),
        None => search(
            search_path.unwrap_or(DEFAULT_SEARCH_PATH),
            normalize_designator(designator, DOS_BASED_FILE_SYSTEM),
        ),
    };

    let (file, opened_path) = opened.ok_or_else(|| MmapError::FileNotFound {
        file: designator.to_string(),
    })?;
    let canonical = canonical_path(&opened_path);
    log::debug!(
        "resolved {} to {} (canonical {:?})",
        designator,
        opened_path.display(),
        canonical
    );

    Ok(ResolvedFile {
        file,
        opened_path,
        canonical,
    })
}

fn search(search_path: &str, name: &str) -> Option<(File, PathBuf)> {
    for token in search_path.split(PATH_LIST_SEPARATOR) {
        let Some(dir) = SearchToken::classify(token).expand() else {
            continue;
        };

        let candidate = join_candidate(&dir, name);
        log::debug!("trying {}", candidate.display());
        if let Some(file) = open_readonly(&candidate) {
            return Some((file, candidate));
        }
    }
    None
}

/// `dir` without trailing separators, one separator, then `name`
fn join_candidate(dir: &OsStr, name: &str) -> PathBuf {
    let mut bytes = dir.as_bytes();
    while let Some((&last, rest)) = bytes.split_last() {
        if !is_separator(last as char) {
            break;
        }
        bytes = rest;
    }

    let mut candidate = OsString::from(OsStr::from_bytes(bytes));
    candidate.push(MAIN_SEPARATOR_STR);
    candidate.push(name);
    PathBuf::from(candidate)
}

fn open_readonly(path: &Path) -> Option<File> {
    let file = File::open(path).ok()?;
    // directories open fine read-only but can never be mapped
    match file.metadata() {
        Ok(meta) if !meta.is_dir() => Some(file),
        _ => None,
    }
}

/// Strips a drive letter (DOS file systems only), leading separators and leading `./`
/// sequences so the name can be appended to a search directory.
pub fn normalize_designator(designator: &str, dos_based: bool) -> &str {
    let mut name = designator;

    // d:/foo -> /foo, d:foo -> foo
    if dos_based {
        name = strip_drive_spec(name);
    }

    // /foo -> foo
    name = name.trim_start_matches(is_separator);

    // ./foo -> foo
    while let Some(rest) = name.strip_prefix('.').and_then(|r| r.strip_prefix(is_separator)) {
        name = rest;
    }

    name
}

fn strip_drive_spec(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        &name[2..]
    } else {
        name
    }
}

/// Expands a leading `~` or `~user`. Anything else, including an unknown user, is returned
/// unchanged.
pub fn tilde_expand(token: &str) -> OsString {
    let Some(rest) = token.strip_prefix(TILDE) else {
        return OsString::from(token);
    };

    let (user, tail) = match rest.find(is_separator) {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, ""),
    };
    let user = if user.is_empty() { None } else { Some(user) };

    match home_dir(user) {
        Some(home) => {
            let mut expanded = home.into_os_string();
            expanded.push(tail);
            expanded
        }
        None => OsString::from(token),
    }
}

/// Home directory of `user`, or of the current user (`$HOME` first, then the password
/// database).
fn home_dir(user: Option<&str>) -> Option<PathBuf> {
    let Some(name) = user else {
        return dirs::home_dir();
    };

    let cname = CString::new(name).ok()?;
    let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
    let mut buf = vec![0 as libc::c_char; 16 * 1024];
    let mut result: *mut libc::passwd = std::ptr::null_mut();

    let rc = unsafe {
        libc::getpwnam_r(cname.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
    };
    if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
        log::debug!("no home directory for user {}", name);
        return None;
    }

    let dir = unsafe { CStr::from_ptr(pwd.pw_dir) };
    Some(PathBuf::from(OsStr::from_bytes(dir.to_bytes())))
}

/// Absolute form of `opened` with every directory component resolved. The last component is
/// kept as named, so a symbolic link is reported under the name the user gave it.
fn canonical_path(opened: &Path) -> Option<PathBuf> {
    let absolute = if opened.is_absolute() {
        opened.to_path_buf()
    } else {
        env::current_dir().ok()?.join(opened)
    };

    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent).ok().map(|dir| dir.join(name)),
        _ => fs::canonicalize(&absolute).ok(),
    }
}
