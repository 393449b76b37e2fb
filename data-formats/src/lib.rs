mod errors;
pub use errors::{Error, MismatchError, Result};

pub mod constants;

mod sys;

pub mod backend;
pub use backend::{CryptoBackend, OpensslBackend};

pub mod certificate;
pub use certificate::Certificate;

pub mod privatekey;
pub use privatekey::PrivateKey;

pub mod value;
pub use value::{Field, Value, ValueKind};

pub mod bundle;
pub use bundle::{Bundle, ExportOptions};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
