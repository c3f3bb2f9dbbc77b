use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::record::field::{Endianness, Field, FieldType};
use crate::record::schema::RecordSchema;

/// Reads single fields of a record directly from a random-access source.
///
/// Useful for peeking a few fields of a huge file without materializing
/// the whole record: resolving a field reads only the bytes of the
/// size-defining fields preceding it, a handful of bytes each.
///
/// ## Usage
///
/// The archive walker probes candidate offsets with this reader (one
/// signature read per probe) and only materializes the full record via
/// [`read_record`](Self::read_record) once the signature matches.
#[derive(Debug)]
pub struct RecordReader<'a, R: ReadAt + ?Sized> {
    source: &'a R,
}

impl<'a, R: ReadAt + ?Sized> RecordReader<'a, R> {
    pub fn new(source: &'a R) -> Self {
        Self { source }
    }

    /// Materialize the bytes of one whole record starting at `position`.
    ///
    /// The record's total length is resolved field by field (reading only
    /// the size-defining fields from the source), then the full record is
    /// fetched with exactly one bounded read.
    ///
    /// # Errors
    ///
    /// Fails if the source holds fewer bytes than the resolved length, or
    /// if offset arithmetic overflows.
    pub fn read_record(&self, schema: &RecordSchema, position: u64) -> Result<Vec<u8>> {
        let mut length = 0u64;
        for field in schema.fields() {
            length = length
                .checked_add(self.field_size(field, schema, position)?)
                .ok_or(Error::ArithmeticOverflow {
                    schema: schema.name(),
                })?;
        }
        self.read_exact(position, length, schema.name())
    }

    /// Read one uint16 field of the record starting at `position`.
    pub fn uint16(&self, field: &Field, schema: &RecordSchema, position: u64) -> Result<u16> {
        if field.field_type() != FieldType::UInt16 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint16",
            });
        }
        let bytes = self.field_bytes(field, schema, position, 2)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u16(&bytes),
            Endianness::Big => BigEndian::read_u16(&bytes),
        })
    }

    /// Read one uint32 field of the record starting at `position`.
    pub fn uint32(&self, field: &Field, schema: &RecordSchema, position: u64) -> Result<u32> {
        if field.field_type() != FieldType::UInt32 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint32",
            });
        }
        let bytes = self.field_bytes(field, schema, position, 4)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u32(&bytes),
            Endianness::Big => BigEndian::read_u32(&bytes),
        })
    }

    /// Read one uint64 field of the record starting at `position`.
    pub fn uint64(&self, field: &Field, schema: &RecordSchema, position: u64) -> Result<u64> {
        if field.field_type() != FieldType::UInt64 {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "uint64",
            });
        }
        let bytes = self.field_bytes(field, schema, position, 8)?;
        Ok(match field.byte_order() {
            Endianness::Little => LittleEndian::read_u64(&bytes),
            Endianness::Big => BigEndian::read_u64(&bytes),
        })
    }

    fn field_bytes(
        &self,
        field: &Field,
        schema: &RecordSchema,
        position: u64,
        size: u64,
    ) -> Result<Vec<u8>> {
        let field_position = position
            .checked_add(self.field_offset(field, schema, position)?)
            .ok_or(Error::ArithmeticOverflow {
                schema: schema.name(),
            })?;
        self.read_exact(field_position, size, schema.name())
    }

    /// Offset of `field` within the record at `position`: the sum of the
    /// resolved sizes of every preceding field, pulling each size-defining
    /// field's value directly from the source.
    pub fn field_offset(&self, field: &Field, schema: &RecordSchema, position: u64) -> Result<u64> {
        let index = schema.index_of(field)?;
        let mut offset = 0u64;
        for preceding in &schema.fields()[..index] {
            offset = offset
                .checked_add(self.field_size(preceding, schema, position)?)
                .ok_or(Error::ArithmeticOverflow {
                    schema: schema.name(),
                })?;
        }
        Ok(offset)
    }

    fn field_size(&self, field: &Field, schema: &RecordSchema, position: u64) -> Result<u64> {
        if let Some(size) = field.field_type().size() {
            return Ok(size);
        }
        let length_field = schema.field_defining_size_of(field)?;
        match length_field.field_type() {
            FieldType::UInt16 => Ok(u64::from(self.uint16(length_field, schema, position)?)),
            FieldType::UInt32 => Ok(u64::from(self.uint32(length_field, schema, position)?)),
            FieldType::UInt64 => {
                let value = self.uint64(length_field, schema, position)?;
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

    fn read_exact(&self, position: u64, length: u64, schema: &'static str) -> Result<Vec<u8>> {
        let capacity =
            usize::try_from(length).map_err(|_| Error::ArithmeticOverflow { schema })?;
        let mut buf = vec![0u8; capacity];
        let read = self.source.read_at(position, &mut buf)?;
        if read != capacity {
            return Err(Error::ShortRead {
                position,
                expected: length,
                read: read as u64,
            });
        }
        Ok(buf)
    }
}
