//! Zerocopy views over raw 512-byte tar header blocks.
//!
//! Only the fields needed to index an archive are interpreted:
//!
//! | Offset | Size | Field     | Description                              |
//! |--------|------|-----------|------------------------------------------|
//! | 0      | 100  | name      | File path (null-terminated if < 100)     |
//! | 124    | 12   | size      | File size in octal ASCII                 |
//! | 148    | 8    | checksum  | Header checksum in octal ASCII           |
//! | 156    | 1    | typeflag  | Entry type (see [`EntryType`])           |
//! | 257    | 6    | magic     | "ustar\0" (POSIX) or "ustar " (GNU)      |
//! | 345    | 155  | prefix    | Path prefix for long names (UStar only)  |
//!
//! The remaining fields are laid out in [`UstarHeader`] so that the struct
//! covers the whole block, but nothing here reads them.

use std::{borrow::Cow, fmt};

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of a tar block in bytes. Headers and data regions are aligned to it.
pub const BLOCK_SIZE: usize = 512;

/// One raw tar block.
pub type Block = [u8; BLOCK_SIZE];

/// Magic string for GNU tar format headers ("ustar ").
pub const GNU_MAGIC: &[u8; 6] = b"ustar ";

/// Errors that can occur when decoding header fields.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// A numeric field holds no octal digits, or its value overflows.
    #[error("invalid octal field: {:?}", String::from_utf8_lossy(.0))]
    InvalidOctal(Vec<u8>),

    /// The header checksum does not match the computed value.
    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch {
        /// The checksum value stored in the header.
        expected: u64,
        /// The checksum computed from the header bytes.
        computed: u64,
    },
}

/// Result type for header decoding.
pub type Result<T> = std::result::Result<T, HeaderError>;

/// UStar (POSIX.1-2001) header layout.
///
/// See the module-level table for the fields that are actually consumed.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UstarHeader {
    /// File path name (null-terminated if shorter than 100 bytes).
    pub name: [u8; 100],
    /// File mode in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// File size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time as Unix timestamp in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Link target name for hard/symbolic links.
    pub linkname: [u8; 100],
    /// Magic string identifying the format.
    pub magic: [u8; 6],
    /// Format version.
    pub version: [u8; 2],
    /// Owner user name.
    pub uname: [u8; 32],
    /// Owner group name.
    pub gname: [u8; 32],
    /// Device major number in octal ASCII.
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII.
    pub devminor: [u8; 8],
    /// Path prefix for names longer than 100 bytes.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

const _: () = assert!(std::mem::size_of::<UstarHeader>() == BLOCK_SIZE);

/// Tar entry type, decoded from the typeflag byte.
///
/// Only [`EntryType::GnuLongName`] changes how an archive is walked; every
/// other type is indexed like a regular entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (type '0' or '\0' for old tar compatibility).
    Regular,
    /// Hard link (type '1').
    Link,
    /// Symbolic link (type '2').
    Symlink,
    /// Character device (type '3').
    Char,
    /// Block device (type '4').
    Block,
    /// Directory (type '5').
    Directory,
    /// FIFO (type '6').
    Fifo,
    /// Contiguous file (type '7').
    Continuous,
    /// GNU tar long name extension (type 'L').
    GnuLongName,
    /// GNU tar long link extension (type 'K').
    GnuLongLink,
    /// PAX extended header (type 'x').
    XHeader,
    /// PAX global extended header (type 'g').
    XGlobalHeader,
    /// Anything else.
    Other(u8),
}

impl EntryType {
    /// Parse an entry type from a raw typeflag byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::Link,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Continuous,
            b'L' => EntryType::GnuLongName,
            b'K' => EntryType::GnuLongLink,
            b'x' => EntryType::XHeader,
            b'g' => EntryType::XGlobalHeader,
            other => EntryType::Other(other),
        }
    }
}

impl From<u8> for EntryType {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

/// A tar header block with named field accessors.
#[derive(FromBytes, Immutable, KnownLayout)]
#[repr(transparent)]
pub struct Header {
    fields: UstarHeader,
}

impl Header {
    /// View a raw block as a header.
    #[must_use]
    pub fn from_block(block: &Block) -> &Header {
        zerocopy::transmute_ref!(block)
    }

    /// Get the underlying block.
    #[must_use]
    pub fn as_block(&self) -> &Block {
        zerocopy::transmute_ref!(&self.fields)
    }

    /// Get the named fields.
    #[must_use]
    pub fn fields(&self) -> &UstarHeader {
        &self.fields
    }

    /// Get the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.fields.typeflag)
    }

    /// Get the declared size of the entry's data region.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::InvalidOctal`] if the size field holds no digits.
    pub fn entry_size(&self) -> Result<u64> {
        parse_numeric(&self.fields.size)
    }

    /// Get the name field, without trailing NULs.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        truncate_null(&self.fields.name)
    }

    /// Get the UStar prefix field, without trailing NULs.
    ///
    /// GNU-format headers store access and change times in these bytes, so
    /// they never have a prefix.
    #[must_use]
    pub fn prefix_bytes(&self) -> &[u8] {
        if self.is_gnu() {
            return &[];
        }
        truncate_null(&self.fields.prefix)
    }

    /// Get the path stored in the header: `prefix/name` when a prefix is
    /// present, else just `name`.
    #[must_use]
    pub fn path_bytes(&self) -> Cow<'_, [u8]> {
        let name = self.name_bytes();
        match self.prefix_bytes() {
            [] => Cow::Borrowed(name),
            prefix => {
                let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
                path.extend_from_slice(prefix);
                path.push(b'/');
                path.extend_from_slice(name);
                Cow::Owned(path)
            }
        }
    }

    /// Check if this header uses the GNU tar magic.
    #[must_use]
    pub fn is_gnu(&self) -> bool {
        self.fields.magic == *GNU_MAGIC
    }

    /// Verify the header checksum.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError::ChecksumMismatch`] if the checksum is invalid,
    /// or [`HeaderError::InvalidOctal`] if the stored checksum cannot be parsed.
    pub fn verify_checksum(&self) -> Result<()> {
        let expected = parse_octal(&self.fields.checksum)?;
        let computed = self.compute_checksum();
        if expected == computed {
            Ok(())
        } else {
            Err(HeaderError::ChecksumMismatch { expected, computed })
        }
    }

    /// Compute the header checksum: the unsigned sum of all header bytes,
    /// with the checksum field itself counted as spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        self.as_block()
            .iter()
            .enumerate()
            .map(|(i, &byte)| {
                if (148..156).contains(&i) {
                    u64::from(b' ')
                } else {
                    u64::from(byte)
                }
            })
            .sum()
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("path", &String::from_utf8_lossy(&self.path_bytes()))
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size().ok())
            .field("is_gnu", &self.is_gnu())
            .finish()
    }
}

/// Check if a block is all zeros. Two in a row mark the end of an archive.
#[must_use]
pub fn is_zero(block: &Block) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Parse an octal ASCII field into a u64, the way `strtol` reads it.
///
/// Leading whitespace and an optional sign are skipped and the run of octal
/// digits that follows is parsed; whatever comes after the run is ignored.
/// A field made only of whitespace and NULs is 0. For example:
/// - `"0000644\0"` -> 420
/// - `"\t +123 "` -> 83
/// - `"\0\0\0\0"` -> 0
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if a non-blank field has no digits
/// where they should start, if the value overflows, or if it is negative.
pub fn parse_octal(bytes: &[u8]) -> Result<u64> {
    let invalid = || HeaderError::InvalidOctal(bytes.to_vec());

    let start = bytes
        .iter()
        .position(|&b| !is_c_space(b))
        .unwrap_or(bytes.len());
    let (negative, rest) = match &bytes[start..] {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        rest => (false, rest),
    };
    let digits = rest
        .iter()
        .position(|b| !(b'0'..=b'7').contains(b))
        .unwrap_or(rest.len());

    if digits == 0 {
        if bytes.iter().all(|&b| b == b'\0' || is_c_space(b)) {
            return Ok(0);
        }
        return Err(invalid());
    }

    let mut value: u64 = 0;
    for &byte in &rest[..digits] {
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(invalid)?;
    }

    // sizes can't be negative; "-0" is still zero
    if negative && value != 0 {
        return Err(invalid());
    }
    Ok(value)
}

/// Whitespace as C's `isspace` sees it, including vertical tab.
fn is_c_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

/// Parse a numeric field that may be octal ASCII or GNU base-256 encoded.
///
/// GNU tar uses base-256 for values that don't fit in octal: when the high
/// bit of the first byte is set, the remaining bits are a big-endian binary
/// number.
///
/// # Errors
///
/// Returns [`HeaderError::InvalidOctal`] if octal parsing fails or a
/// base-256 value overflows.
pub fn parse_numeric(bytes: &[u8]) -> Result<u64> {
    match bytes.first() {
        Some(first) if first & 0x80 != 0 => {
            let mut value: u64 = 0;
            for (i, &byte) in bytes.iter().enumerate() {
                let b = if i == 0 { byte & 0x7f } else { byte };
                value = value
                    .checked_mul(256)
                    .and_then(|v| v.checked_add(u64::from(b)))
                    .ok_or_else(|| HeaderError::InvalidOctal(bytes.to_vec()))?;
            }
            Ok(value)
        }
        _ => parse_octal(bytes),
    }
}

/// Truncate a byte slice at the first null byte.
///
/// ```
/// use tarindex::header::truncate_null;
///
/// assert_eq!(truncate_null(b"hello\0world"), b"hello");
/// assert_eq!(truncate_null(b"no null here"), b"no null here");
/// assert_eq!(truncate_null(b"\0empty"), b"");
/// ```
#[must_use]
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(f: impl FnOnce(&mut UstarHeader)) -> Block {
        let mut block = [0u8; BLOCK_SIZE];
        f(UstarHeader::mut_from_bytes(&mut block).unwrap());
        block
    }

    #[test]
    fn test_field_offsets() {
        let block = block_with(|h| {
            h.size[0] = b'1';
            h.typeflag = b'L';
            h.magic[0] = b'u';
            h.prefix[0] = b'p';
        });
        assert_eq!(block[124], b'1');
        assert_eq!(block[156], b'L');
        assert_eq!(block[257], b'u');
        assert_eq!(block[345], b'p');
    }

    #[test]
    fn test_parse_octal() {
        assert_eq!(parse_octal(b"0000644\0").unwrap(), 0o644);
        assert_eq!(parse_octal(b"     123 ").unwrap(), 0o123);
        assert_eq!(parse_octal(b"00000001000\0").unwrap(), 512);
        assert_eq!(parse_octal(b"777").unwrap(), 0o777);
    }

    #[test]
    fn test_parse_octal_blank() {
        assert_eq!(parse_octal(b"").unwrap(), 0);
        assert_eq!(parse_octal(&[0u8; 12]).unwrap(), 0);
        assert_eq!(parse_octal(b"            ").unwrap(), 0);
        assert_eq!(parse_octal(b"   \0\0 \0").unwrap(), 0);
    }

    #[test]
    fn test_parse_octal_trailing_garbage() {
        assert_eq!(parse_octal(b"12xyz").unwrap(), 0o12);
        assert_eq!(parse_octal(b"0017 9").unwrap(), 0o17);
        assert_eq!(parse_octal(b"128").unwrap(), 0o12);
    }

    #[test]
    fn test_parse_octal_like_strtol() {
        assert_eq!(parse_octal(b"\t12").unwrap(), 0o12);
        assert_eq!(parse_octal(b"\n\r\x0b\x0c 7\0").unwrap(), 7);
        assert_eq!(parse_octal(b"+12").unwrap(), 0o12);
        assert_eq!(parse_octal(b"  +0000644 ").unwrap(), 0o644);
        assert_eq!(parse_octal(b"-0").unwrap(), 0);
        assert_eq!(parse_octal(b"\t\t\0\0").unwrap(), 0);
        assert!(parse_octal(b"+").is_err());
        assert!(parse_octal(b"+ 12").is_err());
        assert!(parse_octal(b"-1").is_err());
    }

    #[test]
    fn test_parse_octal_invalid() {
        assert!(parse_octal(b"xyz").is_err());
        assert!(parse_octal(b"99999999999\0").is_err());
        assert!(parse_octal(b"-12").is_err());
        assert!(parse_octal(b"\0123").is_err());
    }

    #[test]
    fn test_parse_octal_overflow() {
        assert!(parse_octal(b"7777777777777777777777777").is_err());
        assert_eq!(
            parse_octal(b"1777777777777777777777").unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_parse_numeric_base256() {
        // 8 GiB doesn't fit in 11 octal digits
        let mut field = [0u8; 12];
        field[0] = 0x80;
        field[4..].copy_from_slice(&(8u64 << 30).to_be_bytes());
        assert_eq!(parse_numeric(&field).unwrap(), 8 << 30);

        assert_eq!(parse_numeric(b"0000644\0").unwrap(), 0o644);
        assert_eq!(parse_numeric(b"").unwrap(), 0);
    }

    #[test]
    fn test_parse_numeric_base256_overflow() {
        let mut field = [0xffu8; 12];
        field[0] = 0x80;
        assert!(parse_numeric(&field).is_err());
    }

    #[test]
    fn test_truncate_null() {
        assert_eq!(truncate_null(b"abc\0def"), b"abc");
        assert_eq!(truncate_null(b"abc"), b"abc");
        assert_eq!(truncate_null(b""), b"");
    }

    #[test]
    fn test_is_zero() {
        let mut block = [0u8; BLOCK_SIZE];
        assert!(is_zero(&block));
        block[511] = 1;
        assert!(!is_zero(&block));
        block[511] = 0;
        block[0] = b' ';
        assert!(!is_zero(&block));
    }

    #[test]
    fn test_entry_type() {
        assert_eq!(EntryType::from_byte(b'0'), EntryType::Regular);
        assert_eq!(EntryType::from_byte(b'\0'), EntryType::Regular);
        assert_eq!(EntryType::from_byte(b'5'), EntryType::Directory);
        assert_eq!(EntryType::from_byte(b'L'), EntryType::GnuLongName);
        assert_eq!(EntryType::from_byte(b'K'), EntryType::GnuLongLink);
        assert_eq!(EntryType::from(b'x'), EntryType::XHeader);
        assert_eq!(EntryType::from_byte(b'Z'), EntryType::Other(b'Z'));
    }

    #[test]
    fn test_path_with_prefix() {
        let block = block_with(|h| {
            h.name[..8].copy_from_slice(b"bin/tool");
            h.prefix[..9].copy_from_slice(b"usr/local");
            h.magic.copy_from_slice(b"ustar\0");
        });
        let header = Header::from_block(&block);
        assert_eq!(header.name_bytes(), b"bin/tool");
        assert_eq!(header.prefix_bytes(), b"usr/local");
        assert_eq!(header.path_bytes().as_ref(), b"usr/local/bin/tool");
    }

    #[test]
    fn test_path_without_magic_still_uses_prefix() {
        let block = block_with(|h| {
            h.name[..4].copy_from_slice(b"file");
            h.prefix[..3].copy_from_slice(b"dir");
        });
        let header = Header::from_block(&block);
        assert_eq!(header.path_bytes().as_ref(), b"dir/file");
    }

    #[test]
    fn test_gnu_header_ignores_prefix_bytes() {
        let block = block_with(|h| {
            h.name[..4].copy_from_slice(b"file");
            h.magic.copy_from_slice(GNU_MAGIC);
            // atime in a GNU header
            h.prefix[..11].copy_from_slice(b"14540404040");
        });
        let header = Header::from_block(&block);
        assert!(header.is_gnu());
        assert_eq!(header.prefix_bytes(), b"");
        assert_eq!(header.path_bytes().as_ref(), b"file");
    }

    #[test]
    fn test_name_exactly_100_bytes() {
        let block = block_with(|h| h.name.fill(b'a'));
        let header = Header::from_block(&block);
        assert_eq!(header.name_bytes().len(), 100);
    }

    #[test]
    fn test_checksum() {
        let mut block = block_with(|h| {
            h.name[..5].copy_from_slice(b"hello");
            h.size.copy_from_slice(b"00000000012\0");
            h.typeflag = b'0';
        });
        let sum = Header::from_block(&block).compute_checksum();
        let field = format!("{sum:06o}\0 ");
        block[148..156].copy_from_slice(field.as_bytes());

        let header = Header::from_block(&block);
        assert_eq!(header.compute_checksum(), sum);
        header.verify_checksum().unwrap();

        block[0] = b'j';
        match Header::from_block(&block).verify_checksum() {
            Err(HeaderError::ChecksumMismatch { expected, computed }) => {
                assert_eq!(expected, sum);
                assert_eq!(computed, sum + u64::from(b'j') - u64::from(b'h'));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip_block() {
        let block = block_with(|h| h.typeflag = b'5');
        let header = Header::from_block(&block);
        assert_eq!(header.as_block(), &block);
        assert_eq!(header.fields().typeflag, b'5');
        assert_eq!(header.entry_type(), EntryType::Directory);
    }

    #[test]
    fn test_entry_size() {
        let block = block_with(|h| h.size.copy_from_slice(b"00000001750\0"));
        assert_eq!(Header::from_block(&block).entry_size().unwrap(), 1000);

        let block = block_with(|h| h.size.copy_from_slice(b"garbage\0\0\0\0\0"));
        assert!(matches!(
            Header::from_block(&block).entry_size(),
            Err(HeaderError::InvalidOctal(_))
        ));
    }
}
