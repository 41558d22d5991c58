//! Error types that can be emitted from this library

use std::{fmt, path::PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// invalid parameter
    #[error("invalid parameter")]
    InvalidParameter,

    /// invalid file name: {0}
    #[error("invalid file name: {0}")]
    #[diagnostic(help("names may not contain control characters, < > : \" | ? *, reserved device names or components ending in '.'"))]
    InvalidFilename(String),

    /// index out of range: {0}
    #[error("index out of range: {0}")]
    InvalidIndex(usize),

    /// file not found
    #[error("file not found")]
    NotFound,

    /// unable to open file {0}
    #[error("unable to open file {}", .0.display())]
    CannotOpen(PathBuf),

    /// folder is empty
    #[error("folder is empty")]
    EmptyFolder,

    /// invalid mrs file or invalid encryption
    #[error("invalid mrs file or invalid encryption")]
    InvalidArchive,

    /// invalid encryption
    #[error("invalid encryption")]
    InvalidEncryption,

    /// unable to decompress file
    #[error("unable to decompress file")]
    CannotDecompress,

    /// archive exceeds the format's 32-bit limits
    #[error("archive exceeds the format's 32-bit limits")]
    ArchiveTooLarge,

    /// duplicate file name: {0}
    #[error("duplicate file name: {0}")]
    Duplicate(String),

    /// archive is empty
    #[error("archive is empty")]
    Empty,

    /// unable to save file {0}
    #[error("unable to save file {}", .0.display())]
    CannotSave(PathBuf),
}

impl Error {
    /// The kind of this error, without its payload
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::IOError(_) | Error::BinRWError(_) => ErrorCode::Io,
            Error::InvalidParameter => ErrorCode::InvalidParameter,
            Error::InvalidFilename(_) => ErrorCode::InvalidFilename,
            Error::InvalidIndex(_) => ErrorCode::InvalidIndex,
            Error::NotFound => ErrorCode::NotFound,
            Error::CannotOpen(_) => ErrorCode::CannotOpen,
            Error::EmptyFolder => ErrorCode::EmptyFolder,
            Error::InvalidArchive => ErrorCode::InvalidArchive,
            Error::InvalidEncryption => ErrorCode::InvalidEncryption,
            Error::CannotDecompress => ErrorCode::CannotDecompress,
            Error::ArchiveTooLarge => ErrorCode::ArchiveTooLarge,
            Error::Duplicate(_) => ErrorCode::Duplicate,
            Error::Empty => ErrorCode::Empty,
            Error::CannotSave(_) => ErrorCode::CannotSave,
        }
    }
}

/// Payload-free error discriminant, reported through save progress events
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Io,
    InvalidParameter,
    InvalidFilename,
    InvalidIndex,
    NotFound,
    CannotOpen,
    EmptyFolder,
    InvalidArchive,
    InvalidEncryption,
    CannotDecompress,
    ArchiveTooLarge,
    Duplicate,
    Empty,
    CannotSave,
}

impl ErrorCode {
    /// Static message for this error kind
    pub const fn message(self) -> &'static str {
        match self {
            ErrorCode::Io => "i/o error",
            ErrorCode::InvalidParameter => "invalid parameter",
            ErrorCode::InvalidFilename => "invalid file name",
            ErrorCode::InvalidIndex => "index out of range",
            ErrorCode::NotFound => "file not found",
            ErrorCode::CannotOpen => "unable to open file",
            ErrorCode::EmptyFolder => "folder is empty",
            ErrorCode::InvalidArchive => "invalid mrs file or invalid encryption",
            ErrorCode::InvalidEncryption => "invalid encryption",
            ErrorCode::CannotDecompress => "unable to decompress file",
            ErrorCode::ArchiveTooLarge => "archive exceeds the format's 32-bit limits",
            ErrorCode::Duplicate => "duplicate file name",
            ErrorCode::Empty => "archive is empty",
            ErrorCode::CannotSave => "unable to save file",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
