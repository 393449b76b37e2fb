use libc::{c_char, size_t};
use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::ptr::{self, null_mut};

#[cfg(test)]
mod test_common;

mod bundle;
mod value;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

fn clear_last_error() {
    LAST_ERROR.with(|last| *last.borrow_mut() = None);
}

fn set_last_error<T>(err: T)
where
    T: ToString,
{
    let err = err.to_string();
    log::debug!("Setting last error: {}", err);
    LAST_ERROR.with(|last| *last.borrow_mut() = Some(err));
}

/// Reads an optional NUL terminated UTF-8 argument
///
/// # Safety
///
/// `s` must be NULL or point to a valid NUL terminated string
unsafe fn optional_str<'a>(s: *const c_char, what: &str) -> Result<Option<&'a str>, String> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s)
        .to_str()
        .map(Some)
        .map_err(|e| format!("{} is not valid UTF-8: {}", what, e))
}

/// Hands a byte buffer over to the caller, who frees it with `p12_data_free`
fn data_into_raw(data: Vec<u8>, out_len: *mut size_t) -> *mut u8 {
    if out_len.is_null() {
        set_last_error("out_len is null");
        return null_mut();
    }
    let data = data.into_boxed_slice();
    unsafe {
        *out_len = data.len();
    }
    Box::into_raw(data) as *mut u8
}

/// Free a string returned by libp12-data functions
#[no_mangle]
#[allow(clippy::missing_safety_doc)]
pub unsafe extern "C" fn p12_free_string(s: *mut c_char) {
    clear_last_error();

    if s.is_null() {
        return;
    }
    drop(CString::from_raw(s));
}

/// Free a byte buffer returned by libp12-data functions
#[no_mangle]
#[allow(clippy::missing_safety_doc)]
pub unsafe extern "C" fn p12_data_free(data: *mut u8, len: size_t) {
    clear_last_error();

    if data.is_null() {
        return;
    }
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)));
}

/// Returns a string describing the last error that occurred on this thread
///
/// Note: The returned string ownership is transferred to the caller, and should
/// be freed with `p12_free_string`
#[no_mangle]
pub extern "C" fn p12_get_last_error() -> *mut c_char {
    LAST_ERROR.with(|last| match &*last.borrow() {
        None => null_mut(),
        Some(e) => match CString::new(e.replace('\0', "")) {
            Ok(cstr) => cstr.into_raw(),
            Err(_) => null_mut(),
        },
    })
}

#[no_mangle]
/// Returns the key derivation iteration count used when none is chosen
pub extern "C" fn p12_default_iter() -> i32 {
    p12_data_formats::constants::DEFAULT_ITER
}

#[no_mangle]
/// Returns the MAC iteration count that disables the MAC on export
pub extern "C" fn p12_no_mac() -> i32 {
    p12_data_formats::constants::NO_MAC
}
