use libc::{c_char, c_void, size_t};
use std::{ptr::null_mut, slice};

use num_traits::FromPrimitive;

use p12_data_formats::{Bundle, ExportOptions, Field, Value};

use super::{clear_last_error, data_into_raw, optional_str, set_last_error};

pub struct P12Bundle(Bundle);

#[no_mangle]
/// Creates a new bundle with no certificate, private key or CA certificates
///
/// Return value:
/// Pointer to a P12Bundle, to be freed with `p12_bundle_free`
pub extern "C" fn p12_bundle_new() -> *mut P12Bundle {
    clear_last_error();

    Box::into_raw(Box::new(P12Bundle(Bundle::new())))
}

#[no_mangle]
/// Creates a new bundle from a DER encoded PKCS#12 archive
///
/// `passphrase` may be NULL when the archive is not protected.
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a P12Bundle on success, to be freed with `p12_bundle_free`
pub extern "C" fn p12_bundle_from_data(
    data: *const c_void,
    len: size_t,
    passphrase: *const c_char,
) -> *mut P12Bundle {
    clear_last_error();

    if data.is_null() {
        set_last_error("p12_bundle_from_data: data is null");
        return null_mut();
    }
    let data = unsafe { slice::from_raw_parts(data as *const u8, len) };
    let passphrase = match unsafe { optional_str(passphrase, "passphrase") } {
        Ok(passphrase) => passphrase,
        Err(e) => {
            set_last_error(e);
            return null_mut();
        }
    };

    match Bundle::from_der(data, passphrase) {
        Ok(bundle) => Box::into_raw(Box::new(P12Bundle(bundle))),
        Err(e) => {
            set_last_error(e);
            null_mut()
        }
    }
}

#[no_mangle]
/// Frees a P12Bundle
///
/// Values previously returned by `p12_bundle_get` stay valid.
pub extern "C" fn p12_bundle_free(bundle: *mut P12Bundle) {
    clear_last_error();

    if bundle.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(bundle));
    }
}

#[no_mangle]
/// Returns one field of a bundle
///
/// `field` is 0 for the certificate, 1 for the private key and 2 for the CA
/// certificate list.
///
/// Return value:
/// NULL if the field is absent (no last error) or on error (last error is set)
/// Pointer to a Value on success, to be freed with `p12_value_free`
pub extern "C" fn p12_bundle_get(bundle: *const P12Bundle, field: u32) -> *mut Value {
    clear_last_error();

    if bundle.is_null() {
        set_last_error("p12_bundle_get: bundle is null");
        return null_mut();
    }
    let field = match Field::from_u32(field) {
        Some(field) => field,
        None => {
            set_last_error(format!("p12_bundle_get: invalid field {}", field));
            return null_mut();
        }
    };
    let bundle = unsafe { &(*bundle).0 };

    match bundle.get(field) {
        None => null_mut(),
        Some(value) => Box::into_raw(Box::new(value)),
    }
}

#[no_mangle]
/// Replaces one field of a bundle
///
/// A NULL `value` clears the field. The value is copied; the caller keeps
/// ownership of `value`. On a type mismatch the bundle is left unchanged.
///
/// Return value:
/// -1 on error (last error is set)
/// 0 on success
pub extern "C" fn p12_bundle_set(bundle: *mut P12Bundle, field: u32, value: *const Value) -> i32 {
    clear_last_error();

    if bundle.is_null() {
        set_last_error("p12_bundle_set: bundle is null");
        return -1;
    }
    let field = match Field::from_u32(field) {
        Some(field) => field,
        None => {
            set_last_error(format!("p12_bundle_set: invalid field {}", field));
            return -1;
        }
    };
    let value = if value.is_null() {
        None
    } else {
        Some(unsafe { &*value }.clone())
    };
    let bundle = unsafe { &mut (*bundle).0 };

    match bundle.set(field, value) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

#[no_mangle]
/// Serializes a bundle into a DER encoded PKCS#12 archive
///
/// `passphrase` and `friendly_name` may be NULL. A `maciter` of
/// `p12_no_mac()` leaves out the MAC.
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a buffer of `*out_len` bytes, to be freed with `p12_data_free`
pub extern "C" fn p12_bundle_export(
    bundle: *const P12Bundle,
    passphrase: *const c_char,
    friendly_name: *const c_char,
    iter: i32,
    maciter: i32,
    out_len: *mut size_t,
) -> *mut u8 {
    clear_last_error();

    if bundle.is_null() {
        set_last_error("p12_bundle_export: bundle is null");
        return null_mut();
    }
    if out_len.is_null() {
        set_last_error("p12_bundle_export: out_len is null");
        return null_mut();
    }
    let bundle = unsafe { &(*bundle).0 };

    let mut options = ExportOptions::new().iterations(iter).mac_iterations(maciter);
    match unsafe { optional_str(passphrase, "passphrase") } {
        Ok(None) => {}
        Ok(Some(passphrase)) => options = options.passphrase(passphrase),
        Err(e) => {
            set_last_error(e);
            return null_mut();
        }
    }
    match unsafe { optional_str(friendly_name, "friendly name") } {
        Ok(None) => {}
        Ok(Some(friendly_name)) => options = options.friendly_name(friendly_name),
        Err(e) => {
            set_last_error(e);
            return null_mut();
        }
    }

    match bundle.export(&options) {
        Ok(der) => data_into_raw(der, out_len),
        Err(e) => {
            set_last_error(e);
            null_mut()
        }
    }
}
