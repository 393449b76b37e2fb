use thiserror::Error;

use crate::value::ValueKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MismatchError {
    #[error("expected {expected}, got {found}")]
    Value {
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("CA certificate list element {index} is a {found}, expected certificate")]
    ListElement { index: usize, found: ValueKind },
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Cryptographic error stack: {0}")]
    CryptoStack(#[from] openssl::error::ErrorStack),
    #[error("Type mismatch: {0}")]
    TypeMismatch(MismatchError),
    #[error("Resource exhaustion while {0}")]
    ResourceExhaustion(&'static str),
    #[error("Inconsistent values were used for '{0}'")]
    InconsistentValue(&'static str),
}
