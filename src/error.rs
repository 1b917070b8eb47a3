//! Crate-wide error taxonomy.
//!
//! Every fallible call site goes through the [`err_at`] macro, which tags
//! the error with `file!():line!()` context and folds it into one of the
//! kinds below. Kinds mirror the taxonomy the rest of the crate reasons
//! about: opening failures, on-disk corruption, a reader whose revision has
//! been reclaimed by a later commit, plain I/O failure, and bad arguments.

use std::{fmt, io, result};

/// Result alias used throughout the crate.
pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Table could not be opened: missing/unreadable files, both base
    /// files corrupt, or the requested revision does not exist.
    DatabaseOpeningError(String),
    /// On-disk structure violates an invariant: bad header fields,
    /// directory out of order, tree deeper than `BTREE_CURSOR_LEVELS`,
    /// item bytes overrunning the block, and similar.
    DatabaseCorruptError(String),
    /// A read cursor encountered a block whose revision is newer than the
    /// revision it opened against; the snapshot it was reading has been
    /// reclaimed by an intervening commit.
    DatabaseModifiedError(String),
    /// I/O failure: short read/write, seek failure, fsync failure.
    DatabaseError(String),
    /// Caller supplied a bad argument: oversize key, tag needing more than
    /// 65535 components, non-increasing commit revision, empty key on
    /// delete.
    InvalidArgumentError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DatabaseOpeningError(msg) => write!(f, "DatabaseOpeningError: {}", msg),
            Error::DatabaseCorruptError(msg) => write!(f, "DatabaseCorruptError: {}", msg),
            Error::DatabaseModifiedError(msg) => write!(f, "DatabaseModifiedError: {}", msg),
            Error::DatabaseError(msg) => write!(f, "DatabaseError: {}", msg),
            Error::InvalidArgumentError(msg) => write!(f, "InvalidArgumentError: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::DatabaseError(err.to_string())
    }
}

/// Build an [`Error`] of the named kind, tagged with call-site location.
///
/// ```ignore
/// err_at!(IOError, fs::File::open(path))?;
/// err_at!(Fatal, msg: "dir-end {} beyond block-size {}", dir_end, bs);
/// ```
///
/// The first form wraps a `Result<T, E>` whose error implements
/// `Display`, converting it to `Result<T, Error>`. The second form builds
/// an `Err(Error)` directly from a format string, for call sites that
/// detect the problem themselves rather than receiving it from a nested
/// call.
#[macro_export]
macro_rules! err_at {
    (DatabaseOpeningError, $expr:expr) => {
        $expr.map_err(|e| {
            $crate::error::Error::DatabaseOpeningError(format!("{}:{} {}", file!(), line!(), e))
        })
    };
    (DatabaseCorruptError, $expr:expr) => {
        $expr.map_err(|e| {
            $crate::error::Error::DatabaseCorruptError(format!("{}:{} {}", file!(), line!(), e))
        })
    };
    (DatabaseModifiedError, $expr:expr) => {
        $expr.map_err(|e| {
            $crate::error::Error::DatabaseModifiedError(format!("{}:{} {}", file!(), line!(), e))
        })
    };
    (IOError, $expr:expr) => {
        $expr.map_err(|e| {
            $crate::error::Error::DatabaseError(format!("{}:{} {}", file!(), line!(), e))
        })
    };
    (InvalidArgumentError, $expr:expr) => {
        $expr.map_err(|e| {
            $crate::error::Error::InvalidArgumentError(format!("{}:{} {}", file!(), line!(), e))
        })
    };
    (DatabaseOpeningError, msg: $fmt:expr $(, $arg:expr)*) => {
        Err($crate::error::Error::DatabaseOpeningError(
            format!("{}:{} {}", file!(), line!(), format!($fmt $(, $arg)*))
        ))
    };
    (DatabaseCorruptError, msg: $fmt:expr $(, $arg:expr)*) => {
        Err($crate::error::Error::DatabaseCorruptError(
            format!("{}:{} {}", file!(), line!(), format!($fmt $(, $arg)*))
        ))
    };
    (DatabaseModifiedError, msg: $fmt:expr $(, $arg:expr)*) => {
        Err($crate::error::Error::DatabaseModifiedError(
            format!("{}:{} {}", file!(), line!(), format!($fmt $(, $arg)*))
        ))
    };
    (IOError, msg: $fmt:expr $(, $arg:expr)*) => {
        Err($crate::error::Error::DatabaseError(
            format!("{}:{} {}", file!(), line!(), format!($fmt $(, $arg)*))
        ))
    };
    (InvalidArgumentError, msg: $fmt:expr $(, $arg:expr)*) => {
        Err($crate::error::Error::InvalidArgumentError(
            format!("{}:{} {}", file!(), line!(), format!($fmt $(, $arg)*))
        ))
    };
}
