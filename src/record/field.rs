/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Wire type of a field.
///
/// Fixed types carry a static byte length; `Variable` fields get their
/// length from a size-defining field elsewhere in the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    UInt16,
    UInt32,
    UInt64,
    Variable,
}

impl FieldType {
    /// Static byte length, or `None` for `Variable`.
    pub const fn size(self) -> Option<u64> {
        match self {
            FieldType::UInt16 => Some(2),
            FieldType::UInt32 => Some(4),
            FieldType::UInt64 => Some(8),
            FieldType::Variable => None,
        }
    }
}

/// Immutable descriptor of one field in a binary record.
///
/// The name is a diagnostic label, usually the one the format
/// specification uses. Constructible in `const` context so record
/// layouts can be declared as `static` tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    name: &'static str,
    field_type: FieldType,
    byte_order: Endianness,
}

impl Field {
    pub const fn new(field_type: FieldType, name: &'static str, byte_order: Endianness) -> Self {
        Self {
            name,
            field_type,
            byte_order,
        }
    }

    /// A little-endian field, the common case for PKZIP records.
    pub const fn le(field_type: FieldType, name: &'static str) -> Self {
        Self::new(field_type, name, Endianness::Little)
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub const fn byte_order(&self) -> Endianness {
        self.byte_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_type_sizes() {
        assert_eq!(FieldType::UInt16.size(), Some(2));
        assert_eq!(FieldType::UInt32.size(), Some(4));
        assert_eq!(FieldType::UInt64.size(), Some(8));
        assert_eq!(FieldType::Variable.size(), None);
    }

    #[test]
    fn le_constructor() {
        const F: Field = Field::le(FieldType::UInt32, "crc-32");
        assert_eq!(F.name(), "crc-32");
        assert_eq!(F.field_type(), FieldType::UInt32);
        assert_eq!(F.byte_order(), Endianness::Little);
    }
}
