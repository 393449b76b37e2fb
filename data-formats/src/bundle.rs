use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;

use openssl::stack::Stack;

use crate::{
    backend::{CreateParams, CryptoBackend, OpensslBackend},
    certificate::Certificate,
    constants::{ARCHIVE_PBE, DEFAULT_ITER, DEFAULT_MAC_ITER, KEY_TYPE_UNSPECIFIED},
    errors::{Error, Result},
    privatekey::PrivateKey,
    value::{Field, Value},
};

/// Settings for [`Bundle::export`].
#[derive(Clone)]
pub struct ExportOptions {
    passphrase: Option<String>,
    friendly_name: Option<String>,
    iterations: i32,
    mac_iterations: i32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            passphrase: None,
            friendly_name: None,
            iterations: DEFAULT_ITER,
            mac_iterations: DEFAULT_MAC_ITER,
        }
    }
}

impl fmt::Debug for ExportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportOptions")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<secret>"))
            .field("friendly_name", &self.friendly_name)
            .field("iterations", &self.iterations)
            .field("mac_iterations", &self.mac_iterations)
            .finish()
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passphrase(mut self, passphrase: &str) -> Self {
        self.passphrase = Some(passphrase.to_string());
        self
    }

    pub fn friendly_name(mut self, friendly_name: &str) -> Self {
        self.friendly_name = Some(friendly_name.to_string());
        self
    }

    pub fn iterations(mut self, iterations: i32) -> Self {
        self.iterations = iterations;
        self
    }

    /// [`NO_MAC`](crate::constants::NO_MAC) leaves the MAC out entirely.
    pub fn mac_iterations(mut self, mac_iterations: i32) -> Self {
        self.mac_iterations = mac_iterations;
        self
    }
}

/// In-memory view of a PKCS#12 archive: an optional certificate, an optional
/// private key and an optional ordered list of CA certificates.
///
/// All three parts are shared handles; the bundle never has exclusive
/// ownership of them. A CA list that is absent is not the same as an empty
/// one, although both export identically.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    certificate: Option<Certificate>,
    private_key: Option<PrivateKey>,
    ca_certificates: Option<Arc<[Certificate]>>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a bundle from an already decoded archive.
    ///
    /// Without an archive the result is the same as [`Bundle::new`].
    pub fn from_archive<B: CryptoBackend>(
        backend: &B,
        archive: Option<&B::Archive>,
        passphrase: Option<&str>,
    ) -> Result<Self> {
        let archive = match archive {
            None => return Ok(Bundle::new()),
            Some(archive) => archive,
        };

        let extracted = backend.extract_archive(archive, passphrase)?;

        Ok(Bundle {
            certificate: extracted.certificate.map(Certificate::from_native),
            private_key: extracted.private_key.map(PrivateKey::from_native),
            ca_certificates: Some(
                extracted
                    .ca_certificates
                    .into_iter()
                    .map(Certificate::from_native)
                    .collect(),
            ),
        })
    }

    pub fn from_der(der: &[u8], passphrase: Option<&str>) -> Result<Self> {
        Bundle::from_der_with(&OpensslBackend, der, passphrase)
    }

    pub fn from_der_with<B: CryptoBackend>(
        backend: &B,
        der: &[u8],
        passphrase: Option<&str>,
    ) -> Result<Self> {
        let archive = backend.parse_archive(der)?;
        Bundle::from_archive(backend, Some(&archive), passphrase)
    }

    pub fn certificate(&self) -> Option<Certificate> {
        self.certificate.clone()
    }

    pub fn private_key(&self) -> Option<PrivateKey> {
        self.private_key.clone()
    }

    pub fn ca_certificates(&self) -> Option<Arc<[Certificate]>> {
        self.ca_certificates.clone()
    }

    pub fn set_certificate(&mut self, certificate: Option<Certificate>) {
        self.certificate = certificate;
    }

    pub fn set_private_key(&mut self, private_key: Option<PrivateKey>) {
        self.private_key = private_key;
    }

    pub fn set_ca_certificates<I>(&mut self, ca_certificates: Option<I>)
    where
        I: IntoIterator<Item = Certificate>,
    {
        self.ca_certificates = ca_certificates.map(|certs| certs.into_iter().collect());
    }

    pub fn clear_ca_certificates(&mut self) {
        self.ca_certificates = None;
    }

    /// Returns a field as an untyped host value.
    pub fn get(&self, field: Field) -> Option<Value> {
        match field {
            Field::Certificate => self.certificate().map(Value::Certificate),
            Field::PrivateKey => self.private_key().map(Value::PrivateKey),
            Field::CaCertificates => self.ca_certificates.as_ref().map(|certs| {
                Value::CaCertificateList(certs.iter().cloned().map(Value::Certificate).collect())
            }),
        }
    }

    /// Replaces a field with an untyped host value, or clears it on `None`.
    ///
    /// The value is fully checked before anything is stored: on a type
    /// mismatch the bundle is left exactly as it was.
    pub fn set(&mut self, field: Field, value: Option<Value>) -> Result<()> {
        match field {
            Field::Certificate => {
                let certificate = value.map(Certificate::try_from).transpose()?;
                self.set_certificate(certificate);
            }
            Field::PrivateKey => {
                let private_key = value.map(PrivateKey::try_from).transpose()?;
                self.set_private_key(private_key);
            }
            Field::CaCertificates => {
                let ca_certificates = value.map(Vec::<Certificate>::try_from).transpose()?;
                self.set_ca_certificates(ca_certificates);
            }
        }
        Ok(())
    }

    /// Serializes the bundle into a DER encoded PKCS#12 archive.
    pub fn export(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        self.export_with(&OpensslBackend, options)
    }

    pub fn export_with<B: CryptoBackend>(
        &self,
        backend: &B,
        options: &ExportOptions,
    ) -> Result<Vec<u8>> {
        // The backend always wants a stack, even an empty one
        let mut ca_stack =
            Stack::new().map_err(|_| Error::ResourceExhaustion("allocating CA certificate stack"))?;
        for cert in self.ca_certificates.iter().flat_map(|certs| certs.iter()) {
            ca_stack
                .push(cert.native().to_owned())
                .map_err(|_| Error::ResourceExhaustion("growing CA certificate stack"))?;
        }

        log::debug!(
            "Exporting bundle: certificate: {:?}, private key: {:?}, CA certificates: {}, iterations: {}, MAC iterations: {}",
            self.certificate,
            self.private_key,
            ca_stack.len(),
            options.iterations,
            options.mac_iterations
        );

        let params = CreateParams {
            passphrase: options.passphrase.as_deref(),
            friendly_name: options.friendly_name.as_deref(),
            private_key: self.private_key.as_ref().map(PrivateKey::native),
            certificate: self.certificate.as_ref().map(Certificate::native),
            ca_certificates: &ca_stack,
            key_algorithm: ARCHIVE_PBE,
            cert_algorithm: ARCHIVE_PBE,
            iterations: options.iterations,
            mac_iterations: options.mac_iterations,
            key_type: KEY_TYPE_UNSPECIFIED,
        };

        let archive = backend.create_archive(&params)?;
        backend.encode_archive(&archive)
    }
}
