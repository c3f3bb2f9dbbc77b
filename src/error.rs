//! Error types for record decoding and archive walking.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while decoding records or walking an archive.
///
/// A signature mismatch while probing is not an error (the probe returns
/// `None` instead); everything here aborts the operation that raised it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Fewer bytes were available at `position` than the record required.
    #[error("short read at position {position}: expected {expected} bytes, read {read}")]
    ShortRead {
        position: u64,
        expected: u64,
        read: u64,
    },

    /// The buffer backing a record is smaller than the record's resolved size.
    #[error("record `{schema}` needs {needed} bytes but the buffer holds {available}")]
    OutOfBounds {
        schema: &'static str,
        needed: u64,
        available: u64,
    },

    /// Offset or size accumulation overflowed. Length fields come from
    /// untrusted archives, so this must never wrap silently.
    #[error("arithmetic overflow while sizing record `{schema}`")]
    ArithmeticOverflow { schema: &'static str },

    /// A uint64 length or offset exceeds `i64::MAX`.
    #[error("cannot handle uint64 value of field `{field}` larger than i64::MAX")]
    Uint64TooLarge { field: &'static str },

    /// A typed accessor was called on a field of a different type.
    #[error("field `{field}` is not {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// A variable field's size-defining field has a type the resolver
    /// cannot interpret as a length.
    #[error("unsupported size-defining field type for `{field}`")]
    UnsupportedLengthType { field: &'static str },

    #[error("field `{field}` is not part of record `{schema}`")]
    UnknownField {
        field: &'static str,
        schema: &'static str,
    },

    /// A schema violated a construction invariant.
    #[error("invalid record schema `{schema}`: {reason}")]
    Schema {
        schema: &'static str,
        reason: String,
    },

    /// No end of central directory record and no local file header at
    /// offset 0: the input is not a ZIP archive at all.
    #[error("not a ZIP archive")]
    NotZipFile,

    /// The archive starts with a local file header but no end of central
    /// directory record could be located.
    #[error("corrupted ZIP archive: end of central directory record not found")]
    CorruptedZip,

    /// A Zip64 locator was present but no Zip64 end of central directory
    /// record could be decoded at the position it points to.
    #[error("cannot find Zip64 end of central directory record at position {position}")]
    Zip64EocdNotFound { position: u64 },

    /// The caller-supplied permission fix failed for one entry. The walk
    /// stops here; skipping entries silently would defeat an audit pass.
    #[error("failed to fix entry `{entry}`")]
    Fix {
        entry: String,
        #[source]
        source: io::Error,
    },
}
