use std::convert::TryFrom;
use std::fmt;

use num_derive::FromPrimitive;

use crate::{
    certificate::Certificate,
    errors::{Error, MismatchError, Result},
    privatekey::PrivateKey,
};

/// The settable parts of a [`Bundle`](crate::Bundle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum Field {
    Certificate = 0,
    PrivateKey = 1,
    CaCertificates = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ValueKind {
    Certificate = 0,
    PrivateKey = 1,
    CaCertificateList = 2,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Certificate => "certificate",
            ValueKind::PrivateKey => "private key",
            ValueKind::CaCertificateList => "CA certificate list",
        })
    }
}

/// A dynamically typed object handed over by a host caller.
///
/// List elements are themselves untyped, so a host can hand in a mixed
/// sequence; the bundle rejects it as a whole.
#[derive(Debug, Clone)]
pub enum Value {
    Certificate(Certificate),
    PrivateKey(PrivateKey),
    CaCertificateList(Vec<Value>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Certificate(_) => ValueKind::Certificate,
            Value::PrivateKey(_) => ValueKind::PrivateKey,
            Value::CaCertificateList(_) => ValueKind::CaCertificateList,
        }
    }

    fn mismatch(&self, expected: ValueKind) -> Error {
        Error::TypeMismatch(MismatchError::Value {
            expected,
            found: self.kind(),
        })
    }
}

impl From<Certificate> for Value {
    fn from(cert: Certificate) -> Self {
        Value::Certificate(cert)
    }
}

impl From<PrivateKey> for Value {
    fn from(key: PrivateKey) -> Self {
        Value::PrivateKey(key)
    }
}

impl From<Vec<Certificate>> for Value {
    fn from(certs: Vec<Certificate>) -> Self {
        Value::CaCertificateList(certs.into_iter().map(Value::Certificate).collect())
    }
}

impl TryFrom<Value> for Certificate {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Certificate(cert) => Ok(cert),
            other => Err(other.mismatch(ValueKind::Certificate)),
        }
    }
}

impl TryFrom<Value> for PrivateKey {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::PrivateKey(key) => Ok(key),
            other => Err(other.mismatch(ValueKind::PrivateKey)),
        }
    }
}

impl TryFrom<Value> for Vec<Certificate> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        let items = match value {
            Value::CaCertificateList(items) => items,
            other => return Err(other.mismatch(ValueKind::CaCertificateList)),
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Certificate(cert) => Ok(cert),
                other => Err(Error::TypeMismatch(MismatchError::ListElement {
                    index,
                    found: other.kind(),
                })),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::{Value, ValueKind};
    use crate::test_helpers::{generate_key, self_signed};
    use crate::errors::{Error, MismatchError};
    use crate::{Certificate, PrivateKey};

    #[test]
    fn test_list_conversion_reports_first_bad_element() {
        let key = generate_key().unwrap();
        let cert = Certificate::from_native(self_signed("ca", &key).unwrap());
        let list = Value::CaCertificateList(vec![
            Value::Certificate(cert.clone()),
            Value::Certificate(cert),
            Value::PrivateKey(PrivateKey::from_native(key)),
        ]);

        match Vec::<Certificate>::try_from(list) {
            Err(Error::TypeMismatch(MismatchError::ListElement { index, found })) => {
                assert_eq!(index, 2);
                assert_eq!(found, ValueKind::PrivateKey);
            }
            other => panic!("Received: {:?}", other),
        }
    }

    #[test]
    fn test_scalar_mismatch() {
        let key = PrivateKey::from_native(generate_key().unwrap());

        match Certificate::try_from(Value::from(key)) {
            Err(Error::TypeMismatch(MismatchError::Value { expected, found })) => {
                assert_eq!(expected, ValueKind::Certificate);
                assert_eq!(found, ValueKind::PrivateKey);
            }
            other => panic!("Received: {:?}", other),
        }
    }

    #[test]
    fn test_mismatch_message() {
        let err = Error::TypeMismatch(MismatchError::ListElement {
            index: 1,
            found: ValueKind::PrivateKey,
        });
        assert_eq!(
            err.to_string(),
            "Type mismatch: CA certificate list element 1 is a private key, expected certificate"
        );
    }
}
