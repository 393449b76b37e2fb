#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_uchar};
use openssl_sys::{EVP_MD, PKCS12};

#[link(name = "crypto")]
extern "C" {
    pub fn PKCS12_mac_present(p12: *const PKCS12) -> c_int;
    pub fn PKCS12_verify_mac(p12: *mut PKCS12, pass: *const c_char, passlen: c_int) -> c_int;
    pub fn PKCS12_set_mac(
        p12: *mut PKCS12,
        pass: *const c_char,
        passlen: c_int,
        salt: *mut c_uchar,
        saltlen: c_int,
        iter: c_int,
        md_type: *const EVP_MD,
    ) -> c_int;
}
