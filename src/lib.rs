//! Index the entries of a tar archive without extracting them.
//!
//! For every entry the walker reports the resolved name (honouring GNU long
//! names and the ustar `prefix` field), the byte offset where its data
//! starts and its declared size. Data regions are skipped with seeks, so
//! indexing a large archive reads little more than its headers.
//!
//! The [`walker`] module contains the traversal, [`header`] the block
//! layout and field decoding, and [`index`] the text output used by the
//! `tarindex` binary.

pub mod header;
pub mod index;
pub mod util;
pub mod walker;

pub use index::{write_index, IndexError, IndexSummary};
pub use walker::{ArchiveWalker, EntryRecord, WalkError, WalkerConfig};
