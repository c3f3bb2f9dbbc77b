//! Central-directory walk and the permission-fix pass.
//!
//! ZIP archives are read from the end:
//! 1. Scan backward for the End of Central Directory (EOCD) record; its
//!    trailing comment (0-65535 bytes) means it has no fixed position.
//! 2. If a Zip64 locator precedes the EOCD, follow it to the Zip64 EOCD
//!    and take the 64-bit central directory offset from there.
//! 3. Walk the central directory headers one after another; each header's
//!    resolved size gives the position of the next.
//!
//! Every probe reads just the candidate record's signature field before
//! materializing the record, so the walk touches only a tiny fraction of
//! the archive. This keeps it cheap over any [`ReadAt`] source, including
//! HTTP Range readers.

use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::record::{BufferRecord, RecordReader, RecordSchema};
use crate::zip::permissions::PosixPermissions;
use crate::zip::records::{
    CentralDirectoryHeader, EndOfCentralDirectory, LocalFileHeader, Platform,
    Zip64EndOfCentralDirectory, Zip64EndOfCentralDirectoryLocator,
};

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This bounds the backward search for an EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Probes the five well-known ZIP records at arbitrary positions of a
/// random-access source.
///
/// A probe decodes the record's signature field first; a mismatch means
/// "no such record here" and returns `None` rather than an error, which
/// is how the walker detects the end of the central directory.
pub struct ZipReader<R: ReadAt> {
    /// The underlying data source
    source: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipReader<R> {
    pub fn new(source: Arc<R>) -> Self {
        let size = source.size();
        Self { source, size }
    }

    pub fn zip_size(&self) -> u64 {
        self.size
    }

    /// Checks whether the archive has a local file header at `position`.
    /// Probed at offset 0 to tell a corrupted archive from a non-ZIP file.
    pub fn read_local_file_header(&self, position: u64) -> Result<Option<LocalFileHeader>> {
        Ok(self
            .probe(LocalFileHeader::schema(), position)?
            .map(LocalFileHeader::new))
    }

    pub fn read_central_directory_header(
        &self,
        position: u64,
    ) -> Result<Option<CentralDirectoryHeader>> {
        Ok(self
            .probe(CentralDirectoryHeader::schema(), position)?
            .map(CentralDirectoryHeader::new))
    }

    pub fn read_end_of_central_directory(
        &self,
        position: u64,
    ) -> Result<Option<EndOfCentralDirectory>> {
        Ok(self
            .probe(EndOfCentralDirectory::schema(), position)?
            .map(EndOfCentralDirectory::new))
    }

    pub fn read_zip64_locator(
        &self,
        position: u64,
    ) -> Result<Option<Zip64EndOfCentralDirectoryLocator>> {
        Ok(self
            .probe(Zip64EndOfCentralDirectoryLocator::schema(), position)?
            .map(Zip64EndOfCentralDirectoryLocator::new))
    }

    pub fn read_zip64_end_of_central_directory(
        &self,
        position: u64,
    ) -> Result<Option<Zip64EndOfCentralDirectory>> {
        Ok(self
            .probe(Zip64EndOfCentralDirectory::schema(), position)?
            .map(Zip64EndOfCentralDirectory::new))
    }

    /// Attempt to decode an instance of `schema` at `position`.
    ///
    /// All ZIP record signatures are uint32. When the signature does not
    /// match, nothing else is read and no error is raised.
    fn probe(
        &self,
        schema: &'static RecordSchema,
        position: u64,
    ) -> Result<Option<BufferRecord<'static>>> {
        let reader = RecordReader::new(self.source.as_ref());
        if let Some((field, expected)) = schema.signature() {
            if reader.uint32(field, schema, position)? != expected {
                return Ok(None);
            }
        }
        let bytes = reader.read_record(schema, position)?;
        Ok(Some(BufferRecord::new(schema, bytes)))
    }
}

/// Walks an archive's central directory and reports every Unix-authored
/// entry's POSIX permissions to a caller-supplied fix operation.
///
/// The walk itself never modifies the archive; the callback decides how
/// to realize the fix (apply the permissions to an extracted file,
/// rewrite the entry's attributes elsewhere, or just record them).
///
/// ## Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use zipmode::{LocalFileReader, PermissionFixer};
///
/// fn main() -> anyhow::Result<()> {
///     let reader = Arc::new(LocalFileReader::new(Path::new("app.jar"))?);
///     let fixer = PermissionFixer::new(reader);
///     fixer.fix_entries(|name, permissions| {
///         println!("{permissions} {name}");
///         Ok(())
///     })?;
///     Ok(())
/// }
/// ```
pub struct PermissionFixer<R: ReadAt> {
    reader: ZipReader<R>,
}

impl<R: ReadAt> PermissionFixer<R> {
    pub fn new(source: Arc<R>) -> Self {
        Self {
            reader: ZipReader::new(source),
        }
    }

    /// Walk the central directory and invoke `fix` once per Unix entry.
    ///
    /// Headers are visited in directory order; the walk ends normally at
    /// the first position holding no central directory header signature.
    ///
    /// # Returns
    ///
    /// The number of entries passed to `fix`.
    ///
    /// # Errors
    ///
    /// Fails if no end of central directory record can be located
    /// (distinguishing a non-ZIP input from a corrupted archive), if the
    /// Zip64 chain is dangling, on any I/O or decode failure, and on the
    /// first `fix` failure. No partial retry: an aborted walk means the
    /// audit did not cover the archive.
    pub fn fix_entries<F>(&self, mut fix: F) -> Result<usize>
    where
        F: FnMut(&str, PosixPermissions) -> io::Result<()>,
    {
        let mut position = self.first_central_directory_position()?;
        let mut fixed = 0;

        while let Some(header) = self.reader.read_central_directory_header(position)? {
            if header.platform()? == Platform::Unix {
                let name = header.filename()?;
                let permissions = header.posix_permissions()?;
                debug!(entry = %name, permissions = %permissions, "unix entry");
                if let Err(source) = fix(&name, permissions) {
                    return Err(Error::Fix {
                        entry: name,
                        source,
                    });
                }
                fixed += 1;
            }
            position = position
                .checked_add(header.total_size()?)
                .ok_or(Error::ArithmeticOverflow {
                    schema: CentralDirectoryHeader::schema().name(),
                })?;
        }

        Ok(fixed)
    }

    /// Position of the first central directory header, resolved through
    /// the Zip64 chain when one is present.
    fn first_central_directory_position(&self) -> Result<u64> {
        let (end_of_central_directory, position) = self.find_end_of_central_directory()?;
        let locator_size = Zip64EndOfCentralDirectoryLocator::schema().fixed_size()?;

        // A Zip64 locator is only probed when there is room for one before
        // the EOCD. Known approximation: a pathological archive could place
        // unrelated data there, or a Zip64 archive could start so close to
        // offset 0 that this never probes; kept for compatibility with the
        // classic layout.
        if position > locator_size {
            self.zip64_central_directory_position(&end_of_central_directory, position)
        } else {
            Ok(u64::from(end_of_central_directory.cd_offset()?))
        }
    }

    fn zip64_central_directory_position(
        &self,
        end_of_central_directory: &EndOfCentralDirectory,
        eocd_position: u64,
    ) -> Result<u64> {
        let locator_size = Zip64EndOfCentralDirectoryLocator::schema().fixed_size()?;
        let locator_position = eocd_position - locator_size;

        match self.reader.read_zip64_locator(locator_position)? {
            Some(locator) => {
                let zip64_position = locator.zip64_eocd_offset()?;
                debug!(position = zip64_position, "following zip64 locator");
                match self
                    .reader
                    .read_zip64_end_of_central_directory(zip64_position)?
                {
                    Some(zip64) => zip64.cd_offset(),
                    None => Err(Error::Zip64EocdNotFound {
                        position: zip64_position,
                    }),
                }
            }
            None => Ok(u64::from(end_of_central_directory.cd_offset()?)),
        }
    }

    /// Scan backward for the EOCD record.
    ///
    /// Candidate positions run from `zip_size - 22` down to
    /// `max(0, zip_size - 22 - 65535)`. A candidate is accepted when its
    /// signature matches and its declared comment length accounts exactly
    /// for the remaining bytes to end-of-file; that second condition is
    /// what rejects signature byte sequences that happen to occur inside
    /// the real EOCD's comment.
    fn find_end_of_central_directory(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let zip_size = self.reader.zip_size();
        let min_size = EndOfCentralDirectory::schema().min_size();

        if zip_size >= min_size {
            let last_candidate = zip_size - min_size;
            let first_candidate = last_candidate.saturating_sub(MAX_COMMENT_SIZE);

            for position in (first_candidate..=last_candidate).rev() {
                match self.reader.read_end_of_central_directory(position) {
                    Ok(Some(record)) => {
                        let end = position.checked_add(record.total_size()?).ok_or(
                            Error::ArithmeticOverflow {
                                schema: EndOfCentralDirectory::schema().name(),
                            },
                        )?;
                        if end == zip_size {
                            debug!(position, "end of central directory record found");
                            return Ok((record, position));
                        }
                    }
                    Ok(None) => {}
                    // A candidate whose declared comment overruns the file
                    // is a false signature match, not a truncated archive.
                    Err(Error::ShortRead { .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        // No EOCD anywhere. A local file header at offset 0 means this was
        // a ZIP archive once; anything else was never one.
        let local_header_size = LocalFileHeader::schema().fixed_size()?;
        if zip_size >= local_header_size && self.reader.read_local_file_header(0)?.is_some() {
            Err(Error::CorruptedZip)
        } else {
            Err(Error::NotZipFile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::records::{
        central_directory_header, end_of_central_directory, local_file_header,
        zip64_end_of_central_directory, zip64_locator,
    };

    const UNIX_MADE_BY: u16 = 3 << 8 | 20;
    const MSDOS_MADE_BY: u16 = 20;

    fn central_directory_header_bytes(
        version_made_by: u16,
        external_attributes: u32,
        name: &[u8],
    ) -> Vec<u8> {
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

    fn end_of_central_directory_bytes(cd_offset: u32, entries: u16, comment: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&end_of_central_directory::SIGNATURE_VALUE.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // this disk
        bytes.extend_from_slice(&0u16.to_le_bytes()); // cd start disk
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&entries.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // cd size
        bytes.extend_from_slice(&cd_offset.to_le_bytes());
        bytes.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        bytes.extend_from_slice(comment);
        bytes
    }

    /// Central directory at offset 0 followed by the trailer; local file
    /// data is irrelevant to the walk and omitted.
    fn archive(entries: &[(u16, u32, &str)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (made_by, attributes, name) in entries {
            bytes.extend(central_directory_header_bytes(
                *made_by,
                *attributes,
                name.as_bytes(),
            ));
        }
        bytes.extend(end_of_central_directory_bytes(0, entries.len() as u16, b""));
        bytes
    }

    fn collect_fixes(source: Vec<u8>) -> Result<Vec<(String, u32)>> {
        let fixer = PermissionFixer::new(Arc::new(source));
        let mut fixes = Vec::new();
        fixer.fix_entries(|name, permissions| {
            fixes.push((name.to_string(), permissions.mode()));
            Ok(())
        })?;
        Ok(fixes)
    }

    #[test]
    fn fixes_unix_entries_and_skips_other_platforms() {
        let source = archive(&[
            (UNIX_MADE_BY, 0o644 << 16, "a"),
            (MSDOS_MADE_BY, 0o777 << 16, "b.txt"),
        ]);

        let fixes = collect_fixes(source).unwrap();
        assert_eq!(fixes, vec![("a".to_string(), 0o644)]);
    }

    #[test]
    fn walk_is_idempotent() {
        let source = archive(&[
            (UNIX_MADE_BY, 0o755 << 16, "bin/tool"),
            (UNIX_MADE_BY, 0o600 << 16, "etc/secret"),
            (MSDOS_MADE_BY, 0, "readme"),
        ]);

        let first = collect_fixes(source.clone()).unwrap();
        let second = collect_fixes(source).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                ("bin/tool".to_string(), 0o755),
                ("etc/secret".to_string(), 0o600),
            ]
        );
    }

    #[test]
    fn empty_archive_is_success_with_zero_fixes() {
        let source = archive(&[]);
        assert_eq!(collect_fixes(source).unwrap(), vec![]);
    }

    #[test]
    fn probing_a_mismatched_signature_is_not_an_error() {
        let source = archive(&[]);
        let reader = ZipReader::new(Arc::new(source));
        assert!(reader.read_central_directory_header(0).unwrap().is_none());
        assert!(reader.read_zip64_locator(0).unwrap().is_none());
        assert!(reader.read_end_of_central_directory(0).unwrap().is_some());
    }

    #[test]
    fn reports_not_a_zip_without_local_file_header() {
        let source = vec![0xAA; 100];
        assert!(matches!(collect_fixes(source), Err(Error::NotZipFile)));
    }

    #[test]
    fn reports_corrupted_when_only_local_file_header_exists() {
        let mut source = Vec::new();
        source.extend_from_slice(&local_file_header::SIGNATURE_VALUE.to_le_bytes());
        source.extend_from_slice(&20u16.to_le_bytes());
        source.extend_from_slice(&[0u8; 64]);
        assert!(matches!(collect_fixes(source), Err(Error::CorruptedZip)));
    }

    #[test]
    fn callback_failure_aborts_the_walk() {
        let source = archive(&[
            (UNIX_MADE_BY, 0o644 << 16, "first"),
            (UNIX_MADE_BY, 0o644 << 16, "second"),
        ]);

        let fixer = PermissionFixer::new(Arc::new(source));
        let mut seen = 0;
        let err = fixer
            .fix_entries(|_, _| {
                seen += 1;
                Err(io::Error::other("disk full"))
            })
            .unwrap_err();

        assert!(matches!(err, Error::Fix { ref entry, .. } if entry.as_str() == "first"));
        assert_eq!(seen, 1);
    }

    #[test]
    fn finds_eocd_behind_a_maximum_length_comment_with_decoy_signatures() {
        let mut comment = vec![b'x'; MAX_COMMENT_SIZE as usize];
        // A decoy EOCD whose declared comment length stays in bounds but
        // does not account for the remaining bytes to end-of-file.
        let decoy = end_of_central_directory_bytes(0xDEAD_BEEF, 9, b"");
        comment[30_000..30_000 + decoy.len()].copy_from_slice(&decoy);
        // A decoy close to the end whose declared comment length overruns
        // the file entirely.
        let overrun = end_of_central_directory_bytes(0, 9, b"");
        let tail = comment.len() - 40;
        comment[tail..tail + overrun.len()].copy_from_slice(&overrun);
        comment[tail + 20] = 0xFF;
        comment[tail + 21] = 0xFF;

        let mut source = Vec::new();
        source.extend(central_directory_header_bytes(
            UNIX_MADE_BY,
            0o640 << 16,
            b"data",
        ));
        source.extend(end_of_central_directory_bytes(0, 1, &comment));

        let fixes = collect_fixes(source).unwrap();
        assert_eq!(fixes, vec![("data".to_string(), 0o640)]);
    }

    fn zip64_archive(cd_offset_in_classic: u32) -> Vec<u8> {
        let mut source = Vec::new();
        source.extend(central_directory_header_bytes(
            UNIX_MADE_BY,
            0o755 << 16,
            b"huge",
        ));

        let zip64_position = source.len() as u64;
        source.extend_from_slice(&zip64_end_of_central_directory::SIGNATURE_VALUE.to_le_bytes());
        source.extend_from_slice(&44u64.to_le_bytes()); // record size
        source.extend_from_slice(&UNIX_MADE_BY.to_le_bytes());
        source.extend_from_slice(&45u16.to_le_bytes()); // version needed
        source.extend_from_slice(&0u32.to_le_bytes()); // this disk
        source.extend_from_slice(&0u32.to_le_bytes()); // cd start disk
        source.extend_from_slice(&1u64.to_le_bytes()); // entries this disk
        source.extend_from_slice(&1u64.to_le_bytes()); // entries total
        source.extend_from_slice(&0u64.to_le_bytes()); // cd size
        source.extend_from_slice(&0u64.to_le_bytes()); // cd offset

        source.extend_from_slice(&zip64_locator::SIGNATURE_VALUE.to_le_bytes());
        source.extend_from_slice(&0u32.to_le_bytes()); // cd start disk
        source.extend_from_slice(&zip64_position.to_le_bytes());
        source.extend_from_slice(&1u32.to_le_bytes()); // total disks

        source.extend(end_of_central_directory_bytes(cd_offset_in_classic, 1, b""));
        source
    }

    #[test]
    fn zip64_escape_value_resolves_through_the_chain() {
        let fixes = collect_fixes(zip64_archive(0xFFFFFFFF)).unwrap();
        assert_eq!(fixes, vec![("huge".to_string(), 0o755)]);
    }

    #[test]
    fn dangling_zip64_locator_is_an_error() {
        let mut source = zip64_archive(0xFFFFFFFF);
        // Corrupt the Zip64 EOCD signature; the locator now points at
        // bytes that decode as nothing.
        let zip64_position = 46 + 4;
        source[zip64_position] = 0x00;
        assert!(matches!(
            collect_fixes(source),
            Err(Error::Zip64EocdNotFound { .. })
        ));
    }

    #[test]
    fn classic_offset_is_used_when_no_locator_precedes_the_eocd() {
        let source = archive(&[(UNIX_MADE_BY, 0o600 << 16, "only")]);
        let fixes = collect_fixes(source).unwrap();
        assert_eq!(fixes, vec![("only".to_string(), 0o600)]);
    }
}
