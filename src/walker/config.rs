//! Configuration for walking an archive.

/// Default upper bound on the length of a GNU long name, in bytes.
pub const DEFAULT_MAX_LONG_NAME_LEN: u64 = 1023;

/// Settings that control how strictly an archive is walked.
///
/// # Example
///
/// ```
/// use tarindex::walker::WalkerConfig;
///
/// let config = WalkerConfig {
///     require_end_marker: true,
///     ..Default::default()
/// };
/// assert_eq!(config.max_long_name_len, 1023);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Maximum declared size of a GNU long name ('L') entry.
    ///
    /// Long-name data is buffered in memory, so this bounds the allocation a
    /// corrupt or hostile archive can cause. Larger (or zero) sizes fail with
    /// [`WalkError::MalformedLongNameSize`].
    ///
    /// Default: 1023 bytes.
    ///
    /// [`WalkError::MalformedLongNameSize`]: super::WalkError::MalformedLongNameSize
    pub max_long_name_len: u64,

    /// Whether the stream must end with the two-zero-block end marker.
    ///
    /// By default a clean end of stream at a header boundary is accepted.
    /// When set, it fails with [`WalkError::MissingEndMarker`] instead.
    ///
    /// Default: false.
    ///
    /// [`WalkError::MissingEndMarker`]: super::WalkError::MissingEndMarker
    pub require_end_marker: bool,

    /// Whether to verify each header's checksum.
    ///
    /// Default: false.
    pub verify_checksums: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_long_name_len: DEFAULT_MAX_LONG_NAME_LEN,
            require_end_marker: false,
            verify_checksums: false,
        }
    }
}

impl WalkerConfig {
    /// Create a new `WalkerConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for archives that must be well-formed: the end marker is
    /// required and header checksums are verified.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_long_name_len: DEFAULT_MAX_LONG_NAME_LEN,
            require_end_marker: true,
            verify_checksums: true,
        }
    }

    /// Settings for trusted archives with very long names.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_long_name_len: 64 * 1024,
            require_end_marker: false,
            verify_checksums: false,
        }
    }
}
