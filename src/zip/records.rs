//! Record layouts for the five well-known PKZIP structures.
//!
//! Field tables follow APPNOTE.TXT; every multi-byte integer is
//! little-endian. Schemas are process-wide statics, built (and validated)
//! once on first use.

use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::record::{BufferRecord, Field, FieldType, RecordSchema};
use crate::zip::permissions::PosixPermissions;

/// Host system an entry's external file attributes are compatible with,
/// from the upper byte of "version made by" (APPNOTE 4.4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MsDosOs2,
    Amiga,
    OpenVms,
    Unix,
    VmCms,
    AtariSt,
    Os2Hpfs,
    Macintosh,
    ZSystem,
    CpM,
    WindowsNtfs,
    Mvs,
    Vse,
    AcornRisc,
    Vfat,
    AlternateMvs,
    BeOs,
    Tandem,
    Os400,
    Osx,
    Unknown,
}

impl Platform {
    pub fn from_value(value: u8) -> Self {
        match value {
            0 => Platform::MsDosOs2,
            1 => Platform::Amiga,
            2 => Platform::OpenVms,
            3 => Platform::Unix,
            4 => Platform::VmCms,
            5 => Platform::AtariSt,
            6 => Platform::Os2Hpfs,
            7 => Platform::Macintosh,
            8 => Platform::ZSystem,
            9 => Platform::CpM,
            10 => Platform::WindowsNtfs,
            11 => Platform::Mvs,
            12 => Platform::Vse,
            13 => Platform::AcornRisc,
            14 => Platform::Vfat,
            15 => Platform::AlternateMvs,
            16 => Platform::BeOs,
            17 => Platform::Tandem,
            18 => Platform::Os400,
            19 => Platform::Osx,
            _ => Platform::Unknown,
        }
    }
}

/// Local file header fields (APPNOTE 4.3.7).
///
/// Only the signature and the first fixed field are declared: the walker
/// probes this record to tell an empty or corrupted archive from a
/// non-ZIP file, and never decodes the rest.
pub mod local_file_header {
    use super::*;

    pub const SIGNATURE_VALUE: u32 = 0x04034B50;
    pub const SIGNATURE: Field = Field::le(FieldType::UInt32, "local file header signature");
    pub const VERSION_NEEDED: Field = Field::le(FieldType::UInt16, "version needed to extract");

    pub static DEFINITION: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("Local File Header")
            .field(SIGNATURE)
            .field(VERSION_NEEDED)
            .signature(SIGNATURE, SIGNATURE_VALUE)
            .build()
            .expect("well-formed schema")
    });
}

/// Central directory header fields (APPNOTE 4.3.12).
pub mod central_directory_header {
    use super::*;

    pub const SIGNATURE_VALUE: u32 = 0x02014B50;
    pub const SIGNATURE: Field = Field::le(FieldType::UInt32, "central file header signature");
    pub const VERSION_MADE_BY: Field = Field::le(FieldType::UInt16, "version made by");
    pub const VERSION_NEEDED: Field = Field::le(FieldType::UInt16, "version needed to extract");
    pub const GP_BIT_FLAG: Field = Field::le(FieldType::UInt16, "general purpose bit flag");
    pub const COMPRESSION_METHOD: Field = Field::le(FieldType::UInt16, "compression method");
    pub const MOD_TIME: Field = Field::le(FieldType::UInt16, "last mod file time");
    pub const MOD_DATE: Field = Field::le(FieldType::UInt16, "last mod file date");
    pub const CRC32: Field = Field::le(FieldType::UInt32, "crc-32");
    pub const COMPRESSED_SIZE: Field = Field::le(FieldType::UInt32, "compressed size");
    pub const UNCOMPRESSED_SIZE: Field = Field::le(FieldType::UInt32, "uncompressed size");
    pub const FILE_NAME_LENGTH: Field = Field::le(FieldType::UInt16, "file name length");
    pub const EXTRA_FIELD_LENGTH: Field = Field::le(FieldType::UInt16, "extra field length");
    pub const FILE_COMMENT_LENGTH: Field = Field::le(FieldType::UInt16, "file comment length");
    pub const DISK_NUMBER_START: Field = Field::le(FieldType::UInt16, "disk number start");
    pub const INTERNAL_ATTRIBUTES: Field = Field::le(FieldType::UInt16, "internal file attributes");
    pub const EXTERNAL_ATTRIBUTES: Field = Field::le(FieldType::UInt32, "external file attributes");
    pub const LOCAL_HEADER_OFFSET: Field =
        Field::le(FieldType::UInt32, "relative offset of local header");
    pub const FILE_NAME: Field = Field::le(FieldType::Variable, "file name");
    pub const EXTRA_FIELD: Field = Field::le(FieldType::Variable, "extra field");
    pub const FILE_COMMENT: Field = Field::le(FieldType::Variable, "file comment");

    pub static DEFINITION: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("Central Directory Header")
            .field(SIGNATURE)
            .field(VERSION_MADE_BY)
            .field(VERSION_NEEDED)
            .field(GP_BIT_FLAG)
            .field(COMPRESSION_METHOD)
            .field(MOD_TIME)
            .field(MOD_DATE)
            .field(CRC32)
            .field(COMPRESSED_SIZE)
            .field(UNCOMPRESSED_SIZE)
            .field(FILE_NAME_LENGTH)
            .field(EXTRA_FIELD_LENGTH)
            .field(FILE_COMMENT_LENGTH)
            .field(DISK_NUMBER_START)
            .field(INTERNAL_ATTRIBUTES)
            .field(EXTERNAL_ATTRIBUTES)
            .field(LOCAL_HEADER_OFFSET)
            .variable_field(FILE_NAME, FILE_NAME_LENGTH)
            .variable_field(EXTRA_FIELD, EXTRA_FIELD_LENGTH)
            .variable_field(FILE_COMMENT, FILE_COMMENT_LENGTH)
            .signature(SIGNATURE, SIGNATURE_VALUE)
            .build()
            .expect("well-formed schema")
    });
}

/// End of central directory fields (APPNOTE 4.3.16).
pub mod end_of_central_directory {
    use super::*;

    pub const SIGNATURE_VALUE: u32 = 0x06054B50;
    pub const SIGNATURE: Field = Field::le(FieldType::UInt32, "end of central dir signature");
    pub const DISK_NUMBER: Field = Field::le(FieldType::UInt16, "number of this disk");
    pub const CD_START_DISK: Field = Field::le(
        FieldType::UInt16,
        "number of the disk with the start of the central directory",
    );
    pub const ENTRIES_THIS_DISK: Field = Field::le(
        FieldType::UInt16,
        "total number of entries in the central directory on this disk",
    );
    pub const ENTRIES_TOTAL: Field = Field::le(
        FieldType::UInt16,
        "total number of entries in the central directory",
    );
    pub const CD_SIZE: Field = Field::le(FieldType::UInt32, "size of the central directory");
    pub const CD_OFFSET: Field = Field::le(
        FieldType::UInt32,
        "offset of start of central directory with respect to the starting disk number",
    );
    pub const COMMENT_LENGTH: Field = Field::le(FieldType::UInt16, ".ZIP file comment length");
    pub const COMMENT: Field = Field::le(FieldType::Variable, ".ZIP file comment");

    pub static DEFINITION: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("End of Central Directory")
            .field(SIGNATURE)
            .field(DISK_NUMBER)
            .field(CD_START_DISK)
            .field(ENTRIES_THIS_DISK)
            .field(ENTRIES_TOTAL)
            .field(CD_SIZE)
            .field(CD_OFFSET)
            .field(COMMENT_LENGTH)
            .variable_field(COMMENT, COMMENT_LENGTH)
            .signature(SIGNATURE, SIGNATURE_VALUE)
            .build()
            .expect("well-formed schema")
    });
}

/// Zip64 end of central directory locator fields (APPNOTE 4.3.15).
pub mod zip64_locator {
    use super::*;

    pub const SIGNATURE_VALUE: u32 = 0x07064B50;
    pub const SIGNATURE: Field = Field::le(
        FieldType::UInt32,
        "zip64 end of central dir locator signature",
    );
    pub const CD_START_DISK: Field = Field::le(
        FieldType::UInt32,
        "number of the disk with the start of the zip64 end of central directory",
    );
    pub const ZIP64_EOCD_OFFSET: Field = Field::le(
        FieldType::UInt64,
        "relative offset of the zip64 end of central directory record",
    );
    pub const TOTAL_DISKS: Field = Field::le(FieldType::UInt32, "total number of disks");

    pub static DEFINITION: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("Zip64 End of Central Directory Locator")
            .field(SIGNATURE)
            .field(CD_START_DISK)
            .field(ZIP64_EOCD_OFFSET)
            .field(TOTAL_DISKS)
            .signature(SIGNATURE, SIGNATURE_VALUE)
            .build()
            .expect("well-formed schema")
    });
}

/// Zip64 end of central directory fields (APPNOTE 4.3.14).
pub mod zip64_end_of_central_directory {
    use super::*;

    pub const SIGNATURE_VALUE: u32 = 0x06064B50;
    pub const SIGNATURE: Field = Field::le(FieldType::UInt32, "zip64 end of central dir signature");
    pub const RECORD_SIZE: Field = Field::le(
        FieldType::UInt64,
        "size of zip64 end of central directory record",
    );
    pub const VERSION_MADE_BY: Field = Field::le(FieldType::UInt16, "version made by");
    pub const VERSION_NEEDED: Field = Field::le(FieldType::UInt16, "version needed to extract");
    pub const DISK_NUMBER: Field = Field::le(FieldType::UInt32, "number of this disk");
    pub const CD_START_DISK: Field = Field::le(
        FieldType::UInt32,
        "number of the disk with the start of the central directory",
    );
    pub const ENTRIES_THIS_DISK: Field = Field::le(
        FieldType::UInt64,
        "total number of entries in the central directory on this disk",
    );
    pub const ENTRIES_TOTAL: Field = Field::le(
        FieldType::UInt64,
        "total number of entries in the central directory",
    );
    pub const CD_SIZE: Field = Field::le(FieldType::UInt64, "size of the central directory");
    pub const CD_OFFSET: Field = Field::le(
        FieldType::UInt64,
        "offset of start of central directory with respect to the starting disk number",
    );

    pub static DEFINITION: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("Zip64 End of Central Directory")
            .field(SIGNATURE)
            .field(RECORD_SIZE)
            .field(VERSION_MADE_BY)
            .field(VERSION_NEEDED)
            .field(DISK_NUMBER)
            .field(CD_START_DISK)
            .field(ENTRIES_THIS_DISK)
            .field(ENTRIES_TOTAL)
            .field(CD_SIZE)
            .field(CD_OFFSET)
            .signature(SIGNATURE, SIGNATURE_VALUE)
            .build()
            .expect("well-formed schema")
    });
}

/// A decoded local file header. Only ever probed for presence.
#[derive(Debug)]
pub struct LocalFileHeader {
    #[allow(dead_code)]
    record: BufferRecord<'static>,
}

impl LocalFileHeader {
    pub(crate) fn new(record: BufferRecord<'static>) -> Self {
        Self { record }
    }

    pub fn schema() -> &'static RecordSchema {
        &local_file_header::DEFINITION
    }
}

/// A decoded central directory header: one per-entry metadata record.
#[derive(Debug)]
pub struct CentralDirectoryHeader {
    record: BufferRecord<'static>,
}

impl CentralDirectoryHeader {
    pub(crate) fn new(record: BufferRecord<'static>) -> Self {
        Self { record }
    }

    pub fn schema() -> &'static RecordSchema {
        &central_directory_header::DEFINITION
    }

    pub fn version_made_by(&self) -> Result<u16> {
        self.record.uint16(&central_directory_header::VERSION_MADE_BY)
    }

    /// The host system the external file attributes are compatible with:
    /// the upper byte of "version made by".
    pub fn platform(&self) -> Result<Platform> {
        Ok(Platform::from_value((self.version_made_by()? >> 8) as u8))
    }

    pub fn external_file_attributes(&self) -> Result<u32> {
        self.record
            .uint32(&central_directory_header::EXTERNAL_ATTRIBUTES)
    }

    /// POSIX permissions stored in bits 16-24 of the external file
    /// attributes. Only Unix-authored entries carry them; any other
    /// platform yields the empty set.
    pub fn posix_permissions(&self) -> Result<PosixPermissions> {
        if self.platform()? == Platform::Unix {
            let mode = (self.external_file_attributes()? >> 16) & 0x1FF;
            Ok(PosixPermissions::from_bits_truncate(mode as u16))
        } else {
            Ok(PosixPermissions::empty())
        }
    }

    pub fn filename(&self) -> Result<String> {
        self.record.string_utf8(&central_directory_header::FILE_NAME)
    }

    pub fn total_size(&self) -> Result<u64> {
        self.record.total_size()
    }
}

/// The decoded trailer record giving the count and location of the
/// central directory.
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    record: BufferRecord<'static>,
}

impl EndOfCentralDirectory {
    pub(crate) fn new(record: BufferRecord<'static>) -> Self {
        Self { record }
    }

    pub fn schema() -> &'static RecordSchema {
        &end_of_central_directory::DEFINITION
    }

    /// Offset of the first central directory header. `0xFFFFFFFF` is the
    /// Zip64 escape value; the walker resolves the real offset through
    /// the Zip64 chain in that case.
    pub fn cd_offset(&self) -> Result<u32> {
        self.record.uint32(&end_of_central_directory::CD_OFFSET)
    }

    pub fn entries_total(&self) -> Result<u16> {
        self.record
            .uint16(&end_of_central_directory::ENTRIES_TOTAL)
    }

    pub fn total_size(&self) -> Result<u64> {
        self.record.total_size()
    }
}

/// Decoded Zip64 end of central directory locator.
#[derive(Debug)]
pub struct Zip64EndOfCentralDirectoryLocator {
    record: BufferRecord<'static>,
}

impl Zip64EndOfCentralDirectoryLocator {
    pub(crate) fn new(record: BufferRecord<'static>) -> Self {
        Self { record }
    }

    pub fn schema() -> &'static RecordSchema {
        &zip64_locator::DEFINITION
    }

    /// Absolute position of the Zip64 end of central directory record.
    pub fn zip64_eocd_offset(&self) -> Result<u64> {
        let offset = self.record.uint64(&zip64_locator::ZIP64_EOCD_OFFSET)?;
        if offset > i64::MAX as u64 {
            return Err(Error::Uint64TooLarge {
                field: zip64_locator::ZIP64_EOCD_OFFSET.name(),
            });
        }
        Ok(offset)
    }
}

/// Decoded Zip64 end of central directory record.
#[derive(Debug)]
pub struct Zip64EndOfCentralDirectory {
    record: BufferRecord<'static>,
}

impl Zip64EndOfCentralDirectory {
    pub(crate) fn new(record: BufferRecord<'static>) -> Self {
        Self { record }
    }

    pub fn schema() -> &'static RecordSchema {
        &zip64_end_of_central_directory::DEFINITION
    }

    /// Offset of the first central directory header; supersedes the
    /// classic record's 32-bit offset.
    pub fn cd_offset(&self) -> Result<u64> {
        let offset = self
            .record
            .uint64(&zip64_end_of_central_directory::CD_OFFSET)?;
        if offset > i64::MAX as u64 {
            return Err(Error::Uint64TooLarge {
                field: zip64_end_of_central_directory::CD_OFFSET.name(),
            });
        }
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_record_sizes_match_the_format() {
        assert_eq!(LocalFileHeader::schema().fixed_size().unwrap(), 6);
        assert_eq!(Zip64EndOfCentralDirectoryLocator::schema().fixed_size().unwrap(), 20);
        assert_eq!(Zip64EndOfCentralDirectory::schema().fixed_size().unwrap(), 56);
        assert_eq!(EndOfCentralDirectory::schema().min_size(), 22);
        assert_eq!(CentralDirectoryHeader::schema().min_size(), 46);
    }

    #[test]
    fn platform_mapping_is_closed() {
        assert_eq!(Platform::from_value(0), Platform::MsDosOs2);
        assert_eq!(Platform::from_value(3), Platform::Unix);
        assert_eq!(Platform::from_value(10), Platform::WindowsNtfs);
        assert_eq!(Platform::from_value(19), Platform::Osx);
        assert_eq!(Platform::from_value(20), Platform::Unknown);
        assert_eq!(Platform::from_value(255), Platform::Unknown);
    }

    fn cdh_bytes(version_made_by: u16, external_attributes: u32, name: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&central_directory_header::SIGNATURE_VALUE.to_le_bytes());
        bytes.extend_from_slice(&version_made_by.to_le_bytes());
        bytes.extend_from_slice(&20u16.to_le_bytes()); // version needed
        bytes.extend_from_slice(&[0u8; 8]); // flags, method, time, date
        bytes.extend_from_slice(&[0u8; 12]); // crc-32, sizes
        bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // extra length
        bytes.extend_from_slice(&0u16.to_le_bytes()); // comment length
        bytes.extend_from_slice(&[0u8; 4]); // disk start, internal attrs
        bytes.extend_from_slice(&external_attributes.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        bytes.extend_from_slice(name);
        bytes
    }

    #[test]
    fn central_directory_header_accessors() {
        let unix = 3u16 << 8 | 20;
        let record = BufferRecord::new(
            CentralDirectoryHeader::schema(),
            cdh_bytes(unix, 0o644 << 16, b"lib/libfoo.so"),
        );
        let header = CentralDirectoryHeader::new(record);

        assert_eq!(header.platform().unwrap(), Platform::Unix);
        assert_eq!(header.filename().unwrap(), "lib/libfoo.so");
        assert_eq!(header.posix_permissions().unwrap().mode(), 0o644);
        assert_eq!(header.total_size().unwrap(), 46 + 13);
    }

    #[test]
    fn non_unix_entries_have_no_permissions() {
        let record = BufferRecord::new(
            CentralDirectoryHeader::schema(),
            cdh_bytes(20, 0o777 << 16, b"README"),
        );
        let header = CentralDirectoryHeader::new(record);

        assert_eq!(header.platform().unwrap(), Platform::MsDosOs2);
        assert!(header.posix_permissions().unwrap().is_empty());
    }

    #[test]
    fn file_name_offset_is_the_fixed_preamble() {
        let record = BufferRecord::new(
            CentralDirectoryHeader::schema(),
            cdh_bytes(20, 0, b"a"),
        );
        assert_eq!(
            record
                .field_offset(&central_directory_header::FILE_NAME)
                .unwrap(),
            46
        );
    }
}
