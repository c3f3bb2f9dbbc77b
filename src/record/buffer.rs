use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::record::field::{Endianness, Field, FieldType};
use crate::record::schema::RecordSchema;

/// A record decoded from an in-memory byte block.
///
/// The block must hold at least as many bytes as the record's resolved
/// size; this is not checked up front because the size itself depends on
/// length fields decoded from the block. Out-of-bounds field access
/// fails with [`Error::OutOfBounds`].
///
/// All offset and size arithmetic is checked: length fields come from
/// untrusted archives and must not be allowed to wrap an offset around.
#[derive(Debug)]
pub struct BufferRecord<'s> {
    schema: &'s RecordSchema,
    buffer: Vec<u8>,
}

impl<'s> BufferRecord<'s> {
    pub fn new(schema: &'s RecordSchema, buffer: Vec<u8>) -> Self {
        Self { schema, buffer }
    }

    pub fn schema(&self) -> &'s RecordSchema {
        self.schema
    }

    pub fn uint16(&self, field: &Field) -> Result<u16> {
        if field.field_type() != FieldType::UInt16 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint16",
            });
        }
        let bytes = self.field_bytes(field, 2)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u16(bytes),
            Endianness::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn uint32(&self, field: &Field) -> Result<u32> {
        if field.field_type() != FieldType::UInt32 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint32",
            });
        }
        let bytes = self.field_bytes(field, 4)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u32(bytes),
            Endianness::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn uint64(&self, field: &Field) -> Result<u64> {
        if field.field_type() != FieldType::UInt64 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint64",
            });
        }
        let bytes = self.field_bytes(field, 8)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u64(bytes),
            Endianness::Big => BigEndian::read_u64(bytes),
        })
    }

    /// Raw bytes of a variable-length field.
    pub fn bytes(&self, field: &Field) -> Result<&[u8]> {
        if field.field_type() != FieldType::Variable {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "variable",
            });
        }
        let size = self.field_size(field)?;
        self.field_bytes(field, size)
    }

    /// A variable-length field decoded as UTF-8, with invalid sequences
    /// replaced (ZIP filenames are not guaranteed to be valid UTF-8).
    pub fn string_utf8(&self, field: &Field) -> Result<String> {
        Ok(String::from_utf8_lossy(self.bytes(field)?).into_owned())
    }

    /// Byte offset of `field` from the start of the record: the sum of
    /// the resolved sizes of every preceding field.
    pub fn field_offset(&self, field: &Field) -> Result<u64> {
        let index = self.schema.index_of(field)?;
        let mut offset = 0u64;
        for preceding in &self.schema.fields()[..index] {
            offset = offset
                .checked_add(self.field_size(preceding)?)
                .ok_or(Error::ArithmeticOverflow {
                    schema: self.schema.name(),
                })?;
        }
        Ok(offset)
    }

    /// Total resolved size of the record; 0 for an empty schema.
    pub fn total_size(&self) -> Result<u64> {
        let mut size = 0u64;
        for field in self.schema.fields() {
            size = size
                .checked_add(self.field_size(field)?)
                .ok_or(Error::ArithmeticOverflow {
                    schema: self.schema.name(),
                })?;
        }
        Ok(size)
    }

    /// Resolved size of one field. Variable fields require decoding their
    /// size-defining field, which the schema ordering invariant guarantees
    /// to be fully resolvable from earlier fields.
    fn field_size(&self, field: &Field) -> Result<u64> {
        if let Some(size) = field.field_type().size() {
            return Ok(size);
        }
        let length_field = self.schema.field_defining_size_of(field)?;
        match length_field.field_type() {
            FieldType::UInt16 => Ok(u64::from(self.uint16(length_field)?)),
            FieldType::UInt32 => Ok(u64::from(self.uint32(length_field)?)),
            FieldType::UInt64 => {
                let value = self.uint64(length_field)?;
                if value > i64::MAX as u64 {
                    return Err(Error::Uint64TooLarge {
                        field: length_field.name(),
                    });
                }
                Ok(value)
            }
            FieldType::Variable => Err(Error::UnsupportedLengthType {
                field: length_field.name(),
            }),
        }
    }

    fn field_bytes(&self, field: &Field, size: u64) -> Result<&[u8]> {
        let offset = self.field_offset(field)?;
        let end = offset
            .checked_add(size)
            .ok_or(Error::ArithmeticOverflow {
                schema: self.schema.name(),
            })?;
        if end > self.buffer.len() as u64 {
            return Err(Error::OutOfBounds {
                schema: self.schema.name(),
                needed: end,
                available: self.buffer.len() as u64,
            });
        }
        Ok(&self.buffer[offset as usize..end as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    const MAGIC: Field = Field::le(FieldType::UInt32, "magic");
    const COUNT: Field = Field::le(FieldType::UInt16, "count");
    const NAME_LEN: Field = Field::le(FieldType::UInt16, "name length");
    const NAME: Field = Field::le(FieldType::Variable, "name");
    const TAIL: Field = Field::le(FieldType::UInt32, "tail");

    static SCHEMA: LazyLock<RecordSchema> = LazyLock::new(|| {
        RecordSchema::builder("sample")
            .field(MAGIC)
            .field(COUNT)
            .field(NAME_LEN)
            .variable_field(NAME, NAME_LEN)
            .field(TAIL)
            .build()
            .unwrap()
    });

    fn sample() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xCAFEBABEu32.to_le_bytes());
        buf.extend_from_slice(&7u16.to_le_bytes());
        buf.extend_from_slice(&3u16.to_le_bytes());
        buf.extend_from_slice(b"abc");
        buf.extend_from_slice(&42u32.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_typed_fields() {
        let record = BufferRecord::new(&SCHEMA, sample());
        assert_eq!(record.uint32(&MAGIC).unwrap(), 0xCAFEBABE);
        assert_eq!(record.uint16(&COUNT).unwrap(), 7);
        assert_eq!(record.string_utf8(&NAME).unwrap(), "abc");
        assert_eq!(record.uint32(&TAIL).unwrap(), 42);
    }

    #[test]
    fn offsets_sum_preceding_sizes() {
        let record = BufferRecord::new(&SCHEMA, sample());
        assert_eq!(record.field_offset(&MAGIC).unwrap(), 0);
        assert_eq!(record.field_offset(&COUNT).unwrap(), 4);
        assert_eq!(record.field_offset(&NAME_LEN).unwrap(), 6);
        assert_eq!(record.field_offset(&NAME).unwrap(), 8);
        assert_eq!(record.field_offset(&TAIL).unwrap(), 11);
        assert_eq!(record.total_size().unwrap(), 15);
    }

    #[test]
    fn type_mismatch_fails_fast() {
        let record = BufferRecord::new(&SCHEMA, sample());
        assert!(matches!(
            record.uint16(&MAGIC),
            Err(Error::FieldType { field: "magic", .. })
        ));
        assert!(matches!(record.uint64(&COUNT), Err(Error::FieldType { .. })));
        assert!(matches!(record.bytes(&TAIL), Err(Error::FieldType { .. })));
    }

    #[test]
    fn short_buffer_is_out_of_bounds() {
        let mut bytes = sample();
        bytes.truncate(9);
        let record = BufferRecord::new(&SCHEMA, bytes);
        assert!(matches!(record.uint32(&TAIL), Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn empty_schema_has_zero_size() {
        static EMPTY: LazyLock<RecordSchema> =
            LazyLock::new(|| RecordSchema::builder("empty").build().unwrap());
        let record = BufferRecord::new(&EMPTY, Vec::new());
        assert_eq!(record.total_size().unwrap(), 0);
    }

    #[test]
    fn oversized_uint64_length_is_rejected() {
        const BIG_LEN: Field = Field::le(FieldType::UInt64, "big length");
        const BLOB: Field = Field::le(FieldType::Variable, "blob");
        static BIG: LazyLock<RecordSchema> = LazyLock::new(|| {
            RecordSchema::builder("big")
                .field(BIG_LEN)
                .variable_field(BLOB, BIG_LEN)
                .build()
                .unwrap()
        });

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(i64::MAX as u64 + 1).to_le_bytes());
        let record = BufferRecord::new(&BIG, bytes);
        assert!(matches!(
            record.total_size(),
            Err(Error::Uint64TooLarge { field: "big length" })
        ));
    }

    #[test]
    fn cumulative_size_overflow_is_an_error() {
        const LEN_A: Field = Field::le(FieldType::UInt64, "length a");
        const LEN_B: Field = Field::le(FieldType::UInt64, "length b");
        const BLOB_A: Field = Field::le(FieldType::Variable, "blob a");
        const BLOB_B: Field = Field::le(FieldType::Variable, "blob b");
        static HUGE: LazyLock<RecordSchema> = LazyLock::new(|| {
            RecordSchema::builder("huge")
                .field(LEN_A)
                .field(LEN_B)
                .variable_field(BLOB_A, LEN_A)
                .variable_field(BLOB_B, LEN_B)
                .build()
                .unwrap()
        });

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(i64::MAX as u64).to_le_bytes());
        bytes.extend_from_slice(&(i64::MAX as u64).to_le_bytes());
        let record = BufferRecord::new(&HUGE, bytes);
        assert!(matches!(
            record.total_size(),
            Err(Error::ArithmeticOverflow { schema: "huge" })
        ));
    }
}
