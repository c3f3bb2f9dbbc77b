use crate::error::{Error, Result};
use crate::record::field::{Field, FieldType};

/// Declarative layout of one binary record.
///
/// A schema is an ordered list of fields (order defines the byte layout),
/// an optional signature field with its expected magic value, and a
/// mapping from every variable-length field to the fixed field that
/// stores its byte length.
///
/// Schemas are pure descriptions: no I/O, no allocation beyond the field
/// list itself. All consistency checks happen once, in
/// [`Builder::build`]; the decoders can then assume a well-formed layout.
#[derive(Debug)]
pub struct RecordSchema {
    name: &'static str,
    fields: Vec<Field>,
    // for each variable field, (its index, index of its size-defining field)
    size_definitions: Vec<(usize, usize)>,
    signature: Option<(usize, u32)>,
}

impl RecordSchema {
    pub fn builder(name: &'static str) -> Builder {
        Builder {
            name,
            fields: Vec::new(),
            size_definitions: Vec::new(),
            signature: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The signature field and the magic value it must hold, if any.
    pub fn signature(&self) -> Option<(&Field, u32)> {
        self.signature
            .map(|(index, value)| (&self.fields[index], value))
    }

    /// The fixed field holding the byte length of the given variable field.
    pub fn field_defining_size_of(&self, field: &Field) -> Result<&Field> {
        if field.field_type() != FieldType::Variable {
            return Err(Error::FieldType {
                field: field.name(),
                expected: "variable",
            });
        }
        let index = self.index_of(field)?;
        self.size_definitions
            .iter()
            .find(|(variable, _)| *variable == index)
            .map(|&(_, size_def)| &self.fields[size_def])
            .ok_or(Error::UnknownField {
                field: field.name(),
                schema: self.name,
            })
    }

    /// Total size of a schema with no variable fields.
    ///
    /// Fails for schemas whose size depends on decoded length fields.
    pub fn fixed_size(&self) -> Result<u64> {
        let mut size = 0u64;
        for field in &self.fields {
            let field_size = field.field_type().size().ok_or(Error::Schema {
                schema: self.name,
                reason: format!("size of `{}` is not fixed", field.name()),
            })?;
            size = size
                .checked_add(field_size)
                .ok_or(Error::ArithmeticOverflow { schema: self.name })?;
        }
        Ok(size)
    }

    /// Sum of the fixed-size fields only: the smallest number of bytes an
    /// instance of this record can occupy.
    pub fn min_size(&self) -> u64 {
        self.fields
            .iter()
            .filter_map(|f| f.field_type().size())
            .sum()
    }

    pub(crate) fn index_of(&self, field: &Field) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or(Error::UnknownField {
                field: field.name(),
                schema: self.name,
            })
    }
}

/// Builds a [`RecordSchema`], rejecting inconsistent layouts.
///
/// This is the only place schemas are validated; it runs once at startup
/// for the built-in ZIP schemas.
pub struct Builder {
    name: &'static str,
    fields: Vec<Field>,
    size_definitions: Vec<(Field, Field)>,
    signature: Option<(Field, u32)>,
}

impl Builder {
    /// Append a fixed-size field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a variable-length field whose byte length is stored in
    /// `size_definition`, a fixed field appearing earlier in the record.
    pub fn variable_field(mut self, field: Field, size_definition: Field) -> Self {
        self.fields.push(field);
        self.size_definitions.push((field, size_definition));
        self
    }

    /// Declare `field` (which must be one of the schema's fields) as the
    /// record's signature, expected to hold the magic value `value`.
    pub fn signature(mut self, field: Field, value: u32) -> Self {
        self.signature = Some((field, value));
        self
    }

    pub fn build(self) -> Result<RecordSchema> {
        let index_of = |field: &Field| self.fields.iter().position(|f| f == field);

        for field in &self.fields {
            if field.field_type() == FieldType::Variable
                && !self.size_definitions.iter().any(|(v, _)| v == field)
            {
                return Err(self.invalid(format!(
                    "variable field `{}` has no size-defining field",
                    field.name()
                )));
            }
        }

        let mut size_definitions = Vec::with_capacity(self.size_definitions.len());
        for (variable, size_def) in &self.size_definitions {
            let Some(variable_index) = index_of(variable) else {
                return Err(self.invalid(format!(
                    "variable field `{}` is not part of the record",
                    variable.name()
                )));
            };
            let Some(size_def_index) = index_of(size_def) else {
                return Err(self.invalid(format!(
                    "size-defining field `{}` is not part of the record",
                    size_def.name()
                )));
            };
            if variable.field_type() != FieldType::Variable {
                return Err(self.invalid(format!(
                    "field `{}` has a size-defining field but is not variable",
                    variable.name()
                )));
            }
            if size_def.field_type() == FieldType::Variable {
                return Err(self.invalid(format!(
                    "size-defining field `{}` must have a fixed type",
                    size_def.name()
                )));
            }
            if size_def_index >= variable_index {
                return Err(self.invalid(format!(
                    "size-defining field `{}` must appear before `{}`",
                    size_def.name(),
                    variable.name()
                )));
            }
            size_definitions.push((variable_index, size_def_index));
        }

        let signature = match self.signature {
            Some((field, value)) => {
                let Some(index) = index_of(&field) else {
                    return Err(self.invalid(format!(
                        "signature field `{}` is not part of the record",
                        field.name()
                    )));
                };
                Some((index, value))
            }
            None => None,
        };

        Ok(RecordSchema {
            name: self.name,
            fields: self.fields,
            size_definitions,
            signature,
        })
    }

    fn invalid(&self, reason: String) -> Error {
        Error::Schema {
            schema: self.name,
            reason,
        }
    }
}
