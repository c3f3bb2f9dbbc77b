//! # zipmode
//!
//! Audit and fix the POSIX permissions recorded in a ZIP/JAR archive's
//! central directory, without decompressing anything.
//!
//! The crate is built around a small declarative binary-record engine:
//! a [`RecordSchema`] describes a record's field layout, and two decoders
//! resolve fields either from an in-memory block or one at a time against
//! a random-access source. The ZIP layer instantiates schemas for the
//! five well-known PKZIP records and walks the central directory from the
//! end of the archive, reporting every Unix-authored entry's permission
//! bits to a caller-supplied fix operation.
//!
//! Sources are anything implementing [`ReadAt`]: a local file, an HTTP
//! server honoring Range requests, or an in-memory slice. Only the
//! archive's trailer and central directory are ever read, which makes a
//! permission audit of a large remote archive a few small reads.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use zipmode::{LocalFileReader, PermissionFixer};
//!
//! fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(LocalFileReader::new(Path::new("archive.zip"))?);
//!
//!     let fixer = PermissionFixer::new(reader);
//!     let fixed = fixer.fix_entries(|name, permissions| {
//!         println!("{permissions} {name}");
//!         Ok(())
//!     })?;
//!     eprintln!("{fixed} unix entries");
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod record;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use record::{BufferRecord, Endianness, Field, FieldType, RecordReader, RecordSchema};
pub use zip::{
    CentralDirectoryHeader, EndOfCentralDirectory, PermissionFixer, Platform, PosixPermissions,
    ZipReader,
};
