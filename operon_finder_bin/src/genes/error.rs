use std::fmt::{self, Debug, Display};

pub enum Error {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    Npy(ndarray_npy::ReadNpyError),
    #[cfg(feature = "hdf5")]
    Hdf5(hdf5::Error),
    MissingArtifact(String),
    SchemaMismatch(String, String),
    MismatchedDimensions(usize, usize),
    MismatchedDataSize(usize, usize),
    InvalidValue(String),
    DuplicateValue(String),
    InvalidModel(String),
    MissingFeature(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => Display::fmt(err, f),
            Error::Csv(err) => Display::fmt(err, f),
            Error::Json(err) => Display::fmt(err, f),
            Error::Npy(err) => Display::fmt(err, f),
            #[cfg(feature = "hdf5")]
            Error::Hdf5(err) => Display::fmt(err, f),
            Error::MissingArtifact(msg) => write!(f, "Missing Artifact: {}", msg),
            Error::SchemaMismatch(table, column) => write!(
                f,
                "Schema Mismatch: {} has no column '{}'",
                table, column
            ),
            Error::MismatchedDimensions(found, expected) => write!(
                f,
                "Mismatched Dimensions Found {}, expected {}",
                found, expected
            ),
            Error::MismatchedDataSize(found, expected) => write!(
                f,
                "Mismatched Data Size: Found {}, expected {}",
                found, expected
            ),
            Error::InvalidValue(msg) => write!(f, "Invalid Value: {}", msg),
            Error::DuplicateValue(msg) => write!(f, "Duplicate Value: {}", msg),
            Error::InvalidModel(msg) => write!(f, "Invalid Model: {}", msg),
            Error::MissingFeature(row) => {
                write!(f, "Missing Feature: row {} has a non-finite value", row)
            }
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Self::Io(io_error)
    }
}

impl From<csv::Error> for Error {
    fn from(csv_error: csv::Error) -> Self {
        Self::Csv(csv_error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(json_error: serde_json::Error) -> Self {
        Self::Json(json_error)
    }
}

impl From<ndarray_npy::ReadNpyError> for Error {
    fn from(npy_error: ndarray_npy::ReadNpyError) -> Self {
        Self::Npy(npy_error)
    }
}

#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for Error {
    fn from(hdf5_error: hdf5::Error) -> Self {
        Self::Hdf5(hdf5_error)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self::InvalidValue(msg.to_string())
    }
}
