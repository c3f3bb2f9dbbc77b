//! Declarative binary-record descriptions and their decoders.
//!
//! A [`RecordSchema`] describes the layout of one binary record: an
//! ordered list of named, typed fields, each fixed-size or
//! variable-length, with byte order and, for variable fields, a
//! reference to the fixed field that holds their length.
//!
//! Two decoders consume a schema:
//!
//! - [`BufferRecord`]: decodes fields out of an already-materialized
//!   byte block
//! - [`RecordReader`]: resolves one field at a time against a
//!   random-access source, reading only the bytes it needs
//!
//! The engine is generic; the ZIP record layouts built on top of it live
//! in [`crate::zip`].

mod buffer;
mod field;
mod reader;
mod schema;

pub use buffer::BufferRecord;
pub use field::{Endianness, Field, FieldType};
pub use reader::RecordReader;
pub use schema::{Builder, RecordSchema};
