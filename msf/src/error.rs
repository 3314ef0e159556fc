//! Error taxonomy for MSF container decoding (spec.md §7, the subset that applies below the
//! PDB-specific layer).

/// Errors that can occur while opening or reading an MSF (PDB7) container.
#[derive(thiserror::Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum MsfError {
    /// The superblock's first 32 bytes do not match the PDB7 signature, and do not match the
    /// legacy PDB 2.00 signature either.
    #[error("MSF superblock signature does not match PDB7")]
    BadSignature,

    /// The superblock matches the legacy PDB 2.00 ("JG") signature. That format is recognised
    /// only for this error report; it is not decoded.
    #[error("file is a legacy PDB 2.00 (\"JG\") container, which is not supported")]
    UnsupportedVersion,

    /// A read against the underlying file came up short of what the container format requires.
    #[error("unexpected end of file while reading MSF container")]
    Truncated,

    /// `page_size == 0`, `page_size` is not a power of two, or a size computation overflowed.
    #[error("MSF superblock is internally inconsistent")]
    BadContainer,

    /// The root directory (stream table) is malformed: a page-index region overruns the root
    /// stream, or a page index exceeds `num_file_pages`.
    #[error("MSF root directory is corrupt")]
    CorruptDirectory,

    /// A stream index was out of range for this container.
    #[error("invalid stream index {0}")]
    BadStream(u32),
}

/// Convenience alias for results returned by this crate.
pub type MsfResult<T> = Result<T, MsfError>;
