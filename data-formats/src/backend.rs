use std::ffi::CString;
use std::ptr;

use foreign_types::{ForeignType, ForeignTypeRef};
use libc::{c_char, c_int};
use openssl::{
    error::ErrorStack,
    nid::Nid,
    pkcs12::{Pkcs12, Pkcs12Ref},
    pkey::{PKey, PKeyRef, Private},
    stack::StackRef,
    x509::{X509Ref, X509},
};

use crate::{
    errors::{Error, Result},
    sys,
};

const EMPTY: &[u8] = b"\0";

/// Native objects pulled out of an archive. Ownership passes to the caller.
#[derive(Default)]
pub struct Extracted {
    pub certificate: Option<X509>,
    pub private_key: Option<PKey<Private>>,
    pub ca_certificates: Vec<X509>,
}

/// Everything the backend needs to assemble a new archive.
pub struct CreateParams<'a> {
    pub passphrase: Option<&'a str>,
    pub friendly_name: Option<&'a str>,
    pub private_key: Option<&'a PKeyRef<Private>>,
    pub certificate: Option<&'a X509Ref>,
    pub ca_certificates: &'a StackRef<X509>,
    pub key_algorithm: Nid,
    pub cert_algorithm: Nid,
    pub iterations: i32,
    pub mac_iterations: i32,
    pub key_type: i32,
}

/// The cryptography library doing the actual PKCS#12 work.
pub trait CryptoBackend {
    type Archive;

    fn parse_archive(&self, der: &[u8]) -> Result<Self::Archive>;

    fn extract_archive(
        &self,
        archive: &Self::Archive,
        passphrase: Option<&str>,
    ) -> Result<Extracted>;

    fn create_archive(&self, params: &CreateParams<'_>) -> Result<Self::Archive>;

    fn encode_archive(&self, archive: &Self::Archive) -> Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslBackend;

impl OpensslBackend {
    pub fn has_mac(&self, archive: &Pkcs12Ref) -> bool {
        unsafe { sys::PKCS12_mac_present(archive.as_ptr()) == 1 }
    }

    /// Checks the archive MAC. Archives without a MAC never verify.
    ///
    /// Without a passphrase both the absent and the empty password are tried,
    /// the same way the parser does.
    pub fn verify_mac(&self, archive: &Pkcs12Ref, passphrase: Option<&str>) -> Result<bool> {
        if !self.has_mac(archive) {
            return Ok(false);
        }

        let passphrase = c_string(passphrase, "passphrase")?;
        let verified = unsafe {
            match &passphrase {
                Some(pass) => sys::PKCS12_verify_mac(archive.as_ptr(), pass.as_ptr(), -1) == 1,
                None => {
                    sys::PKCS12_verify_mac(archive.as_ptr(), ptr::null(), 0) == 1
                        || sys::PKCS12_verify_mac(archive.as_ptr(), EMPTY.as_ptr() as *const c_char, 0)
                            == 1
                }
            }
        };

        if !verified {
            log::debug!("MAC verification failed: {}", ErrorStack::get());
        }
        Ok(verified)
    }
}

impl OpensslBackend {
    /// Returns a copy of a MAC-less archive with a single-iteration MAC over
    /// its unchanged contents. An absent passphrase keys the MAC with the
    /// absent password, which the parser tries first.
    fn seal_copy(&self, archive: &Pkcs12Ref, passphrase: Option<&str>) -> Result<Pkcs12> {
        let copy = Pkcs12::from_der(&archive.to_der()?)?;
        let passphrase = c_string(passphrase, "passphrase")?;
        let (pass, passlen) = match &passphrase {
            Some(pass) => (pass.as_ptr(), -1),
            None => (ptr::null(), 0),
        };

        unsafe {
            cvt(sys::PKCS12_set_mac(
                copy.as_ptr(),
                pass,
                passlen,
                ptr::null_mut(),
                0,
                1,
                ptr::null(),
            ))?;
        }
        Ok(copy)
    }
}

impl CryptoBackend for OpensslBackend {
    type Archive = Pkcs12;

    fn parse_archive(&self, der: &[u8]) -> Result<Pkcs12> {
        Ok(Pkcs12::from_der(der)?)
    }

    fn extract_archive(&self, archive: &Pkcs12, passphrase: Option<&str>) -> Result<Extracted> {
        if passphrase.map_or(false, |pass| pass.contains('\0')) {
            return Err(Error::InconsistentValue("passphrase"));
        }

        let parsed = if self.has_mac(archive) {
            archive.parse2(passphrase.unwrap_or(""))?
        } else {
            // The parser insists on verifying a MAC whenever a passphrase is
            // given, so seal a private copy with one under the same passphrase
            log::debug!("Archive has no MAC, adding one to a copy before parsing");
            let sealed = self.seal_copy(archive, passphrase)?;
            sealed.parse2(passphrase.unwrap_or(""))?
        };
        let ca_certificates: Vec<X509> = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();

        log::trace!(
            "Extracted archive: certificate: {}, private key: {}, CA certificates: {}",
            parsed.cert.is_some(),
            parsed.pkey.is_some(),
            ca_certificates.len()
        );

        Ok(Extracted {
            certificate: parsed.cert,
            private_key: parsed.pkey,
            ca_certificates,
        })
    }

    fn create_archive(&self, params: &CreateParams<'_>) -> Result<Pkcs12> {
        let passphrase = c_string(params.passphrase, "passphrase")?;
        let friendly_name = c_string(params.friendly_name, "friendly name")?;

        let pass = passphrase.as_ref().map_or(ptr::null(), |p| p.as_ptr());
        let name = friendly_name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        let pkey = params.private_key.map_or(ptr::null_mut(), |k| k.as_ptr());
        let cert = params.certificate.map_or(ptr::null_mut(), |c| c.as_ptr());

        unsafe {
            let p12 = cvt_p(openssl_sys::PKCS12_create(
                pass as *mut c_char,
                name as *mut c_char,
                pkey,
                cert,
                params.ca_certificates.as_ptr(),
                params.key_algorithm.as_raw(),
                params.cert_algorithm.as_raw(),
                params.iterations,
                params.mac_iterations,
                params.key_type,
            ))?;
            Ok(Pkcs12::from_ptr(p12))
        }
    }

    fn encode_archive(&self, archive: &Pkcs12) -> Result<Vec<u8>> {
        Ok(archive.to_der()?)
    }
}

fn cvt(r: c_int) -> std::result::Result<c_int, ErrorStack> {
    if r <= 0 {
        Err(ErrorStack::get())
    } else {
        Ok(r)
    }
}

fn cvt_p<T>(r: *mut T) -> std::result::Result<*mut T, ErrorStack> {
    if r.is_null() {
        Err(ErrorStack::get())
    } else {
        Ok(r)
    }
}

fn c_string(value: Option<&str>, what: &'static str) -> Result<Option<CString>> {
    value
        .map(|v| CString::new(v).map_err(|_| Error::InconsistentValue(what)))
        .transpose()
}
