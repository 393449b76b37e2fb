use libc::{c_char, size_t};
use std::{
    ffi::CString,
    ptr::{null, null_mut},
    slice,
};

use p12_data_formats::{Certificate, PrivateKey, Value};

use super::{clear_last_error, data_into_raw, set_last_error};

unsafe fn input_slice<'a>(data: *const std::ffi::c_void, len: size_t) -> &'a [u8] {
    slice::from_raw_parts(data as *const u8, len)
}

#[no_mangle]
/// Creates a certificate value from PEM or DER data
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a Value on success, to be freed with `p12_value_free`
pub extern "C" fn p12_certificate_from_data(
    data: *const std::ffi::c_void,
    len: size_t,
) -> *mut Value {
    clear_last_error();

    if data.is_null() {
        set_last_error("p12_certificate_from_data: data is null");
        return null_mut();
    }
    let data = unsafe { input_slice(data, len) };
    match Certificate::from_pem_or_der(data) {
        Ok(cert) => Box::into_raw(Box::new(Value::Certificate(cert))),
        Err(e) => {
            set_last_error(e);
            null_mut()
        }
    }
}

#[no_mangle]
/// Creates a private key value from PEM or DER data
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a Value on success, to be freed with `p12_value_free`
pub extern "C" fn p12_private_key_from_data(
    data: *const std::ffi::c_void,
    len: size_t,
) -> *mut Value {
    clear_last_error();

    if data.is_null() {
        set_last_error("p12_private_key_from_data: data is null");
        return null_mut();
    }
    let data = unsafe { input_slice(data, len) };
    match PrivateKey::from_pem_or_der(data) {
        Ok(key) => Box::into_raw(Box::new(Value::PrivateKey(key))),
        Err(e) => {
            set_last_error(e);
            null_mut()
        }
    }
}

#[no_mangle]
/// Creates a new, empty list value
///
/// Lists accept any value; only assigning a list to a bundle checks that every
/// element is a certificate.
pub extern "C" fn p12_value_list_new() -> *mut Value {
    clear_last_error();

    Box::into_raw(Box::new(Value::CaCertificateList(Vec::new())))
}

#[no_mangle]
/// Appends a copy of a value to a list value
///
/// Return value:
/// -1 on error (last error is set)
/// 0 on success
pub extern "C" fn p12_value_list_push(list: *mut Value, item: *const Value) -> i32 {
    clear_last_error();

    if list.is_null() || item.is_null() {
        set_last_error("p12_value_list_push: list or item is null");
        return -1;
    }
    let item = unsafe { &*item }.clone();
    match unsafe { &mut *list } {
        Value::CaCertificateList(items) => {
            items.push(item);
            0
        }
        other => {
            set_last_error(format!("p12_value_list_push: value is a {}", other.kind()));
            -1
        }
    }
}

#[no_mangle]
/// Returns the number of elements in a list value
///
/// Return value:
/// -1 on error (last error is set)
/// length on success
pub extern "C" fn p12_value_list_len(list: *const Value) -> i64 {
    clear_last_error();

    if list.is_null() {
        set_last_error("p12_value_list_len: list is null");
        return -1;
    }
    match unsafe { &*list } {
        Value::CaCertificateList(items) => items.len() as i64,
        other => {
            set_last_error(format!("p12_value_list_len: value is a {}", other.kind()));
            -1
        }
    }
}

#[no_mangle]
/// Returns a new reference to a single element of a list value
///
/// Return value:
/// NULL if index is out of bounds or on error (last error is set)
/// Pointer to a Value on success, to be freed with `p12_value_free`
pub extern "C" fn p12_value_list_get(list: *const Value, index: u64) -> *mut Value {
    clear_last_error();

    if list.is_null() {
        set_last_error("p12_value_list_get: list is null");
        return null_mut();
    }
    match unsafe { &*list } {
        Value::CaCertificateList(items) => items
            .get(index as usize)
            .map_or(null_mut(), |item| Box::into_raw(Box::new(item.clone()))),
        other => {
            set_last_error(format!("p12_value_list_get: value is a {}", other.kind()));
            null_mut()
        }
    }
}

#[no_mangle]
/// Returns the kind of a value
///
/// Return value:
/// -1 on error
/// 0 for a certificate, 1 for a private key, 2 for a list
pub extern "C" fn p12_value_kind(value: *const Value) -> i32 {
    clear_last_error();

    if value.is_null() {
        return -1;
    }
    unsafe { &*value }.kind() as i32
}

#[no_mangle]
/// Returns the DER encoding of a certificate, or the PKCS#8 DER encoding of a
/// private key
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a buffer of `*out_len` bytes, to be freed with `p12_data_free`
pub extern "C" fn p12_value_to_der(value: *const Value, out_len: *mut size_t) -> *mut u8 {
    clear_last_error();

    if value.is_null() {
        set_last_error("p12_value_to_der: value is null");
        return null_mut();
    }
    let encoded = match unsafe { &*value } {
        Value::Certificate(cert) => cert.to_der(),
        Value::PrivateKey(key) => key.to_der_pkcs8(),
        Value::CaCertificateList(_) => {
            set_last_error("p12_value_to_der: lists have no DER encoding");
            return null_mut();
        }
    };
    match encoded {
        Ok(der) => data_into_raw(der, out_len),
        Err(e) => {
            set_last_error(e);
            null_mut()
        }
    }
}

#[no_mangle]
/// Returns the subject of a certificate value
///
/// Return value:
/// NULL on error (last error is set)
/// Pointer to a string on success
///
/// Note: The returned string ownership is transferred to the caller, and should
/// be freed with `p12_free_string`
pub extern "C" fn p12_certificate_get_subject(value: *const Value) -> *const c_char {
    clear_last_error();

    if value.is_null() {
        set_last_error("p12_certificate_get_subject: value is null");
        return null();
    }
    match unsafe { &*value } {
        Value::Certificate(cert) => match CString::new(cert.subject()) {
            Err(e) => {
                set_last_error(e);
                null()
            }
            Ok(cstr) => cstr.into_raw(),
        },
        other => {
            set_last_error(format!(
                "p12_certificate_get_subject: value is a {}",
                other.kind()
            ));
            null()
        }
    }
}

#[no_mangle]
/// Frees a Value
pub extern "C" fn p12_value_free(value: *mut Value) {
    clear_last_error();

    if value.is_null() {
        return;
    }
    unsafe {
        drop(Box::from_raw(value));
    }
}
