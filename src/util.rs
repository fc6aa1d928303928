//! Block-sized reads and a seek adapter for streams that can only be read.

use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

use crate::header::Block;

/// Outcome of [`read_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRead {
    /// The whole block was filled.
    Full,
    /// The stream ended right at the block boundary.
    EndOfStream,
    /// The stream ended after this many bytes of the block.
    Truncated(usize),
}

/// Reads one full block, possibly performing multiple reads to do so (and retrying on EINTR).
///
/// Unlike `Read::read_exact()`, this tells a "clean" EOF, where the stream ends before any byte
/// of the block, apart from a truncated block. Errors from the underlying reader are returned
/// directly.
pub fn read_block(reader: &mut impl Read, block: &mut Block) -> io::Result<BlockRead> {
    let mut filled = 0;

    while filled < block.len() {
        match reader.read(&mut block[filled..]) {
            Ok(0) if filled == 0 => return Ok(BlockRead::EndOfStream),
            Ok(0) => return Ok(BlockRead::Truncated(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(BlockRead::Full)
}

/// Adapts a plain reader (a pipe, stdin) so it can be walked like a file.
///
/// Only forward relative seeks are supported; they are performed by reading and discarding.
/// Seeking past the end of the stream is an `UnexpectedEof` error, since there's nothing to
/// position onto.
#[derive(Debug)]
pub struct ForwardOnly<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> ForwardOnly<R> {
    /// Wrap a reader, counting positions from wherever it currently is.
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    /// Unwrap the reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ForwardOnly<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read> Seek for ForwardOnly<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let distance = match pos {
            SeekFrom::Current(n) => u64::try_from(n).ok(),
            SeekFrom::Start(n) => n.checked_sub(self.pos),
            SeekFrom::End(_) => None,
        }
        .ok_or_else(|| {
            io::Error::new(
                ErrorKind::Unsupported,
                "stream can only be skipped forward",
            )
        })?;

        let skipped = io::copy(&mut (&mut self.inner).take(distance), &mut io::sink())?;
        self.pos += skipped;
        if skipped < distance {
            return Err(ErrorKind::UnexpectedEof.into());
        }
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}
