//! Writing an archive index as text.
//!
//! Each entry becomes one line of the form `<name> <data_offset> <size>`.
//! Names are written as raw bytes, so a name containing spaces or newlines
//! makes the line ambiguous.

use std::io::{self, Read, Seek, Write};

use log::info;
use thiserror::Error;

use crate::walker::{ArchiveWalker, EntryRecord, WalkError};

/// Errors from [`write_index`].
#[derive(Debug, Error)]
pub enum IndexError {
    /// Walking the archive failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// Writing the index failed.
    #[error("failed to write index")]
    Output(#[source] io::Error),
}

/// Totals for a completed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    /// Number of records written.
    pub entries: u64,
    /// Archive offset where the walk stopped.
    pub end_offset: u64,
}

/// Write a single index line for `record`.
pub fn write_record(out: &mut impl Write, record: &EntryRecord) -> io::Result<()> {
    out.write_all(&record.name)?;
    writeln!(out, " {} {}", record.data_offset, record.size)
}

/// Walk the whole archive, writing one line per entry to `out`.
///
/// Lines for entries found before a walk error are still written and
/// flushed before the error is returned.
pub fn write_index<R, W>(
    walker: &mut ArchiveWalker<R>,
    out: &mut W,
) -> Result<IndexSummary, IndexError>
where
    R: Read + Seek,
    W: Write,
{
    let mut entries = 0;

    let walked = loop {
        match walker.next_entry() {
            Ok(Some(record)) => {
                write_record(out, &record).map_err(IndexError::Output)?;
                entries += 1;
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    out.flush().map_err(IndexError::Output)?;
    walked?;

    let summary = IndexSummary {
        entries,
        end_offset: walker.offset(),
    };
    info!(
        "indexed {} entries, archive ends at offset {}",
        summary.entries, summary.end_offset
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::header::EntryType;
    use crate::walker::WalkerConfig;

    use super::*;

    fn raw_header(name: &str, size: &str) -> Vec<u8> {
        let mut block = vec![0u8; 512];
        block[..name.len()].copy_from_slice(name.as_bytes());
        block[124..124 + size.len()].copy_from_slice(size.as_bytes());
        block[156] = b'0';
        block
    }

    #[test]
    fn test_write_record() {
        let record = EntryRecord {
            name: b"dir/file name.txt".to_vec(),
            data_offset: 1536,
            size: 42,
            entry_type: EntryType::Regular,
        };
        let mut out = Vec::new();
        write_record(&mut out, &record).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "dir/file name.txt 1536 42\n");
    }

    #[test]
    fn test_write_record_non_utf8() {
        let record = EntryRecord {
            name: vec![b'a', 0xff, b'b'],
            data_offset: 512,
            size: 0,
            entry_type: EntryType::Regular,
        };
        let mut out = Vec::new();
        write_record(&mut out, &record).unwrap();
        assert_eq!(out, b"a\xffb 512 0\n".to_vec());
    }

    #[test]
    fn test_write_index() {
        let mut data = raw_header("a.txt", "00000000005");
        data.extend([b'a'; 512]);
        data.extend(raw_header("b.txt", "00000001001"));
        data.extend([b'b'; 1024]);
        data.extend(raw_header("empty", ""));
        data.extend([0u8; 1024]);

        let mut walker = ArchiveWalker::with_defaults(Cursor::new(data));
        let mut out = Vec::new();
        let summary = write_index(&mut walker, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a.txt 512 5\nb.txt 1536 513\nempty 3072 0\n"
        );
        assert_eq!(
            summary,
            IndexSummary {
                entries: 3,
                end_offset: 3584,
            }
        );
    }

    #[test]
    fn test_write_index_keeps_lines_before_error() {
        let mut data = raw_header("good", "00000000000");
        data.extend(raw_header("bad", "xyz"));

        let mut walker = ArchiveWalker::new(Cursor::new(data), WalkerConfig::default());
        let mut out = Vec::new();
        let err = write_index(&mut walker, &mut out).unwrap_err();

        assert!(matches!(
            err,
            IndexError::Walk(WalkError::MalformedEntrySize { offset: 512, .. })
        ));
        assert_eq!(String::from_utf8(out).unwrap(), "good 512 0\n");
    }

    #[test]
    fn test_write_index_output_error() {
        struct Closed;
        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut data = raw_header("a", "0");
        data.extend([0u8; 1024]);

        let mut walker = ArchiveWalker::with_defaults(Cursor::new(data));
        let err = write_index(&mut walker, &mut Closed).unwrap_err();
        match err {
            IndexError::Output(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {other:?}"),
        }
    }
}
