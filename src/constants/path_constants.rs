/// Environment variable the search path is read from at call time
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Search path used when `SEARCH_PATH_VAR` is not set
pub const DEFAULT_SEARCH_PATH: &str = ".";

/// Search token that expands to the live current working directory
pub const CWD_TOKEN: &str = "$cwd";

/// Search token naming the compilation directory. We never know it here, so it is skipped.
pub const CDIR_TOKEN: &str = "$cdir";

pub const TILDE: char = '~';

/// DOS-style paths carry a drive letter (`d:/foo`, `d:foo`)
pub const DOS_BASED_FILE_SYSTEM: bool = cfg!(windows);

/// Separates directories in a search path
pub const PATH_LIST_SEPARATOR: char = if cfg!(windows) { ';' } else { ':' };
