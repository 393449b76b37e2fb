use std::fmt;
use std::sync::Arc;

use openssl::pkey::{self, PKey, PKeyRef, Private};

use crate::{
    certificate::{is_pem, Certificate},
    errors::Result,
};

/// Shared handle to a private key.
#[derive(Clone)]
pub struct PrivateKey {
    pkey: Arc<PKey<Private>>,
}

impl PrivateKey {
    /// Wraps a native key, taking ownership of it.
    pub fn from_native(pkey: PKey<Private>) -> Self {
        PrivateKey {
            pkey: Arc::new(pkey),
        }
    }

    /// Wraps a native key owned elsewhere by taking a new reference on it.
    pub fn from_native_ref(pkey: &PKeyRef<Private>) -> Self {
        PrivateKey::from_native(pkey.to_owned())
    }

    /// Accepts both PKCS#8 and traditional DER encodings.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(PrivateKey::from_native(PKey::private_key_from_der(der)?))
    }

    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(PrivateKey::from_native(PKey::private_key_from_pem(pem)?))
    }

    /// Picks PEM or DER by looking for a PEM armor line.
    pub fn from_pem_or_der(data: &[u8]) -> Result<Self> {
        if is_pem(data) {
            PrivateKey::from_pem(data)
        } else {
            PrivateKey::from_der(data)
        }
    }

    pub fn native(&self) -> &PKeyRef<Private> {
        &self.pkey
    }

    pub fn to_der_pkcs8(&self) -> Result<Vec<u8>> {
        Ok(self.pkey.private_key_to_pkcs8()?)
    }

    pub fn to_pem_pkcs8(&self) -> Result<Vec<u8>> {
        Ok(self.pkey.private_key_to_pem_pkcs8()?)
    }

    pub fn key_type(&self) -> &'static str {
        match self.pkey.id() {
            pkey::Id::RSA => "RSA",
            pkey::Id::EC => "EC",
            pkey::Id::DSA => "DSA",
            pkey::Id::DH => "DH",
            pkey::Id::ED25519 => "Ed25519",
            pkey::Id::ED448 => "Ed448",
            _ => "unknown",
        }
    }

    pub fn bits(&self) -> u32 {
        self.pkey.bits()
    }

    pub fn ptr_eq(&self, other: &PrivateKey) -> bool {
        Arc::ptr_eq(&self.pkey, &other.pkey)
    }

    /// Whether both keys have the same PKCS#8 encoding.
    pub fn encoding_eq(&self, other: &PrivateKey) -> Result<bool> {
        if self.ptr_eq(other) {
            return Ok(true);
        }
        Ok(self.to_der_pkcs8()? == other.to_der_pkcs8()?)
    }

    /// Whether `certificate` carries the public half of this key.
    pub fn matches_certificate(&self, certificate: &Certificate) -> Result<bool> {
        let public = certificate.native().public_key()?;
        Ok(public.public_eq(self.native()))
    }
}

impl From<PKey<Private>> for PrivateKey {
    fn from(pkey: PKey<Private>) -> Self {
        PrivateKey::from_native(pkey)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, {} bits)", self.key_type(), self.bits())
    }
}
