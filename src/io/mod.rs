mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use std::io;

/// Trait for random access reading from a data source.
///
/// This is the only capability the record engine requires from the
/// file/OS layer. Reads are synchronous and blocking; a source is
/// exclusively owned by one archive walk for its duration.
pub trait ReadAt {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes read, which is smaller than the buffer
    /// only when the source ends before the buffer is filled.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Get the total size of the data source.
    fn size(&self) -> u64;
}

/// In-memory byte sources, used to walk an archive that is already loaded.
impl ReadAt for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}
