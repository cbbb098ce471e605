//! Memory allocation utilities for FFI functions.
//!
//! Arrays handed to C are allocated with `malloc` and released by the
//! matching `demand_free_*` functions.

use crate::types::{DemandError, ErrorCode};
use std::ptr;

// Memory allocation - use libc on native, std::alloc on WASM
#[cfg(not(target_family = "wasm"))]
use libc::{free, malloc};

#[cfg(target_family = "wasm")]
unsafe fn malloc(size: usize) -> *mut core::ffi::c_void {
    use std::alloc::{alloc, Layout};
    match Layout::from_size_align(size, 8) {
        Ok(layout) => alloc(layout) as *mut core::ffi::c_void,
        Err(_) => ptr::null_mut(),
    }
}

#[cfg(target_family = "wasm")]
unsafe fn free(ptr: *mut core::ffi::c_void) {
    use std::alloc::{dealloc, Layout};
    if !ptr.is_null() {
        if let Ok(layout) = Layout::from_size_align(1, 8) {
            dealloc(ptr as *mut u8, layout);
        }
    }
}

/// Allocate and copy an array, setting error on failure.
///
/// Empty input yields a null pointer.
///
/// # Safety
/// out_ptr must be a valid pointer; out_error must be valid or null.
/// Returns true on success, false on allocation failure.
pub unsafe fn alloc_and_copy_array<T: Copy>(
    items: &[T],
    out_ptr: *mut *mut T,
    out_error: *mut DemandError,
) -> bool {
    if items.is_empty() {
        *out_ptr = ptr::null_mut();
        return true;
    }

    let ptr = malloc(std::mem::size_of_val(items)) as *mut T;
    if ptr.is_null() {
        if !out_error.is_null() {
            (*out_error).set_error(ErrorCode::AllocationError, "Memory allocation failed");
        }
        return false;
    }

    ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len());
    *out_ptr = ptr;
    true
}

/// Free a C pointer using platform-appropriate free function.
///
/// # Safety
/// ptr must be either null or a valid pointer allocated by malloc.
#[inline]
pub unsafe fn free_ptr(ptr: *mut core::ffi::c_void) {
    if !ptr.is_null() {
        free(ptr);
    }
}

/// Macro to free multiple struct fields.
///
/// Usage:
/// ```ignore
/// free_fields!(result, field1, field2, field3);
/// ```
#[macro_export]
macro_rules! free_fields {
    ($result:expr, $($field:ident),+ $(,)?) => {{
        $(
            if !$result.$field.is_null() {
                $crate::allocation::free_ptr($result.$field as *mut core::ffi::c_void);
                $result.$field = std::ptr::null_mut();
            }
        )+
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawObservationC;

    #[test]
    fn test_alloc_and_copy_doubles() {
        unsafe {
            let values = vec![1.0, 2.0, 3.0];
            let mut out: *mut f64 = ptr::null_mut();
            assert!(alloc_and_copy_array(&values, &mut out, ptr::null_mut()));
            assert!(!out.is_null());
            assert_eq!(*out, 1.0);
            assert_eq!(*out.add(2), 3.0);
            free_ptr(out as *mut core::ffi::c_void);
        }
    }

    #[test]
    fn test_alloc_and_copy_records() {
        unsafe {
            let rows = vec![
                RawObservationC {
                    timestamp_micros: 10,
                    demand: 5.0,
                    ..Default::default()
                };
                4
            ];
            let mut out: *mut RawObservationC = ptr::null_mut();
            assert!(alloc_and_copy_array(&rows, &mut out, ptr::null_mut()));
            assert_eq!((*out.add(3)).demand, 5.0);
            free_ptr(out as *mut core::ffi::c_void);
        }
    }

    #[test]
    fn test_empty_is_null() {
        unsafe {
            let mut out: *mut f64 = ptr::NonNull::dangling().as_ptr();
            assert!(alloc_and_copy_array::<f64>(&[], &mut out, ptr::null_mut()));
            assert!(out.is_null());
        }
    }
}
