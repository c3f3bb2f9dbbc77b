//! ZIP central-directory reading and the permission-fix pass.
//!
//! This module applies the generic record engine in [`crate::record`] to
//! the PKZIP central-directory structures, discovering each entry's
//! platform and POSIX permission bits without decompressing anything.
//!
//! ## Architecture
//!
//! The module is organized into three main components:
//!
//! - [`records`]: schemas for the five well-known ZIP records and typed
//!   wrappers over their decoded instances
//! - [`permissions`]: the POSIX permission bit mapping stored in an
//!   entry's external file attributes
//! - [`fixer`]: the central-directory walker driving a caller-supplied
//!   permission-fix operation
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The walk reads the EOCD first (scanning backward from the end of the
//! file), resolves the Zip64 chain if one is present, then follows the
//! Central Directory headers. Entry data is never touched, which keeps
//! the pass cheap even over HTTP Range sources.
//!
//! ## Limitations
//!
//! - No multi-disk archive support (disk-number fields are read, not honored)
//! - Entry payloads are never decompressed and CRCs are never checked
//! - The archive itself is never modified; fixes are delegated to the
//!   caller's callback

mod fixer;
mod permissions;
mod records;

pub use fixer::{PermissionFixer, ZipReader};
pub use permissions::PosixPermissions;
pub use records::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader, Platform,
    Zip64EndOfCentralDirectory, Zip64EndOfCentralDirectoryLocator,
};
