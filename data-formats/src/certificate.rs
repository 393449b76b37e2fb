use std::fmt;
use std::sync::Arc;

use openssl::{
    hash::MessageDigest,
    x509::{X509NameRef, X509Ref, X509},
};

use crate::errors::Result;

/// Shared handle to an X.509 certificate.
///
/// Cloning hands out another reference to the same native certificate, so a
/// certificate can sit in several bundles and in the caller's hands at once.
#[derive(Clone)]
pub struct Certificate {
    x509: Arc<X509>,
}

impl Certificate {
    /// Wraps a native certificate, taking ownership of it.
    pub fn from_native(x509: X509) -> Self {
        Certificate {
            x509: Arc::new(x509),
        }
    }

    /// Wraps a native certificate owned elsewhere by taking a new reference on it.
    pub fn from_native_ref(x509: &X509Ref) -> Self {
        Certificate::from_native(x509.to_owned())
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Certificate::from_native(X509::from_der(der)?))
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Certificate::from_native(X509::from_pem(pem)?))
    }

    /// Picks PEM or DER by looking for a PEM armor line.
    pub fn from_pem_or_der(data: &[u8]) -> Result<Self> {
        if is_pem(data) {
            Certificate::from_pem(data)
        } else {
            Certificate::from_der(data)
        }
    }

    /// Parses every certificate in a PEM bundle, in file order.
    pub fn stack_from_pem(pem: &[u8]) -> Result<Vec<Self>> {
        Ok(X509::stack_from_pem(pem)?
            .into_iter()
            .map(Certificate::from_native)
            .collect())
    }

    pub fn native(&self) -> &X509Ref {
        &self.x509
    }

    pub fn to_der(&self) -> Result<Vec<u8>> {
        Ok(self.x509.to_der()?)
    }

    pub fn to_pem(&self) -> Result<Vec<u8>> {
        Ok(self.x509.to_pem()?)
    }

    pub fn subject(&self) -> String {
        name_to_string(self.x509.subject_name())
    }

    pub fn issuer(&self) -> String {
        name_to_string(self.x509.issuer_name())
    }

    /// Hex encoded SHA-256 digest of the DER encoding.
    pub fn fingerprint(&self) -> Result<String> {
        let digest = self.x509.digest(MessageDigest::sha256())?;
        Ok(hex::encode(&*digest))
    }

    /// Whether both handles refer to the very same native certificate.
    pub fn ptr_eq(&self, other: &Certificate) -> bool {
        Arc::ptr_eq(&self.x509, &other.x509)
    }

    /// Whether both certificates have the same DER encoding.
    pub fn encoding_eq(&self, other: &Certificate) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(true);
        }
        Ok(self.to_der()? == other.to_der()?)
    }
}

impl From<X509> for Certificate {
    fn from(x509: X509) -> Self {
        Certificate::from_native(x509)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Certificate({})", self.subject())
    }
}

const PEM_PREFIX: &[u8] = b"-----BEGIN";

pub(crate) fn is_pem(data: &[u8]) -> bool {
    data.iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(false, |start| data[start..].starts_with(PEM_PREFIX))
}

fn name_to_string(name: &X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let field = entry.object().nid().short_name().unwrap_or("?");
            match std::str::from_utf8(entry.data().as_slice()) {
                Ok(value) => format!("{}={}", field, value),
                Err(_) => format!("{}=<unprintable>", field),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::{generate_key, self_signed};
    use super::Certificate;

    #[test]
    fn test_pem_and_der_agree() {
        let key = generate_key().unwrap();
        let cert = Certificate::from_native(self_signed("pem-der", &key).unwrap());

        let from_pem = Certificate::from_pem(&cert.to_pem().unwrap()).unwrap();
        let from_der = Certificate::from_der(&cert.to_der().unwrap()).unwrap();

        assert!(from_pem.encoding_eq(&from_der).unwrap());
        assert!(!from_pem.ptr_eq(&from_der));
        assert_eq!(from_pem.subject(), "CN=pem-der");
        assert_eq!(from_pem.issuer(), "CN=pem-der");
    }

    #[test]
    fn test_from_pem_or_der() {
        let key = generate_key().unwrap();
        let cert = Certificate::from_native(self_signed("either", &key).unwrap());

        let mut pem = b"\n  ".to_vec();
        pem.extend(cert.to_pem().unwrap());
        let from_pem = Certificate::from_pem_or_der(&pem).unwrap();
        let from_der = Certificate::from_pem_or_der(&cert.to_der().unwrap()).unwrap();

        assert!(from_pem.encoding_eq(&cert).unwrap());
        assert!(from_der.encoding_eq(&cert).unwrap());
        assert!(Certificate::from_pem_or_der(b"-----BEGIN nonsense").is_err());
        assert!(Certificate::from_pem_or_der(b"").is_err());
    }

    #[test]
    fn test_clone_shares_native_handle() {
        let key = generate_key().unwrap();
        let cert = Certificate::from_native(self_signed("shared", &key).unwrap());
        let other = cert.clone();

        assert!(cert.ptr_eq(&other));
        drop(cert);
        assert_eq!(other.subject(), "CN=shared");
    }

    #[test]
    fn test_stack_from_pem_keeps_order() {
        let first =
            Certificate::from_native(self_signed("first", &generate_key().unwrap()).unwrap());
        let second =
            Certificate::from_native(self_signed("second", &generate_key().unwrap()).unwrap());

        let mut pem = first.to_pem().unwrap();
        pem.extend(second.to_pem().unwrap());

        let parsed = Certificate::stack_from_pem(&pem).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].subject(), "CN=first");
        assert_eq!(parsed[1].subject(), "CN=second");
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        let key = generate_key().unwrap();
        let cert = Certificate::from_native(self_signed("fingerprint", &key).unwrap());
        let fingerprint = cert.fingerprint().unwrap();

        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Certificate::from_der(b"not a certificate").is_err());
        assert!(Certificate::from_pem(b"not a certificate").is_err());
    }
}
