use std::ffi::CStr;

pub use p12_data_formats::test_helpers::{generate_key, self_signed};

use crate::{p12_free_string, p12_get_last_error};

pub fn take_last_error() -> Option<String> {
    let err = p12_get_last_error();
    if err.is_null() {
        return None;
    }
    let message = unsafe { CStr::from_ptr(err) }
        .to_string_lossy()
        .into_owned();
    unsafe { p12_free_string(err) };
    Some(message)
}
