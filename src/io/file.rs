use std::fs::File;
use std::io::{self, ErrorKind};

/// A sequentially-readable, positioned byte source. The scanner is
/// single-threaded and synchronous, so unlike the host project's own
/// `FileExt` this has no async half: reads block the calling thread, which
/// is exactly what its cooperative scheduling model expects.
pub trait Channel {
    /// Size of the underlying segment, in bytes.
    fn len(&self) -> io::Result<u64>;

    /// Read up to `buf.len()` bytes starting at `offset`. Returns the number
    /// of bytes actually read; `0` means EOF.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Read exactly `buf.len()` bytes, or fail with `UnexpectedEof`.
    fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        let mut read = 0;
        while read != buf.len() {
            let n = self.read_at(&mut buf[read..], offset + read as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "unexpected end of file",
                ));
            }
            read += n;
        }
        Ok(())
    }
}

impl Channel for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Ok(nix::sys::uio::pread(self, buf, offset as i64)?)
    }
}
