//! Error taxonomy for PDB decoding (spec.md §7).

/// A cause nested inside a [`PdbError::BadStream`].
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum StreamErrorCause {
    /// Container-level error surfaced while reading a dependent stream.
    #[error(transparent)]
    Msf(#[from] msf::MsfError),
    /// A type or field record could not be decoded (spec's `BadLeaf`).
    #[error("malformed type or field record")]
    BadLeaf,
}

/// Errors that can occur while opening or reading a PDB file.
///
/// Mirrors spec.md §7's tagged error taxonomy. Container-level variants abort the whole parse;
/// `BadStream` and `MissingStream` are the only variants raised once the container itself is open.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum PdbError {
    /// MSF superblock signature does not match PDB7.
    #[error("MSF superblock signature does not match PDB7")]
    BadSignature,
    /// Recognised but unsupported container version (legacy PDB 2.00).
    #[error("unsupported PDB version")]
    UnsupportedVersion,
    /// Short read against the underlying buffer.
    #[error("unexpected end of file")]
    Truncated,
    /// Superblock is internally inconsistent (`page_size < 1`, overflow, etc).
    #[error("MSF container is internally inconsistent")]
    BadContainer,
    /// Stream-table overrun or corrupt root directory.
    #[error("MSF root directory is corrupt")]
    CorruptDirectory,
    /// A sub-parser failed while decoding the given stream.
    #[error("stream {0} is malformed: {1}")]
    BadStream(u32, StreamErrorCause),
    /// An expected stream (e.g. TPI) is absent when a dependent operation is invoked.
    #[error("required stream is missing: {0}")]
    MissingStream(&'static str),
}

impl From<msf::MsfError> for PdbError {
    fn from(e: msf::MsfError) -> Self {
        match e {
            msf::MsfError::BadSignature => PdbError::BadSignature,
            msf::MsfError::UnsupportedVersion => PdbError::UnsupportedVersion,
            msf::MsfError::Truncated => PdbError::Truncated,
            msf::MsfError::BadContainer => PdbError::BadContainer,
            msf::MsfError::CorruptDirectory => PdbError::CorruptDirectory,
            msf::MsfError::BadStream(i) => PdbError::BadStream(i, StreamErrorCause::Msf(e)),
        }
    }
}

/// Convenience alias for results returned by this crate's public API.
pub type PdbResult<T> = Result<T, PdbError>;
