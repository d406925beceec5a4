//! C-compatible ABI bridge for dynamically loaded pipeline stages.
//!
//! A stage meant to be loaded at runtime (via `libloading`, see the
//! `analyzer` binary) compiles to a `cdylib` and exports exactly the five
//! operations of spec §6 plus two diagnostics, `stage_name` and
//! `stage_free_string`. This crate supplies the raw-pointer/ownership
//! plumbing so a stage author only has to provide a pure
//! `fn(&str) -> Option<String>` and a display name; see [`export_stage`].
//!
//! # Ownership across the boundary
//!
//! Every ABI operation that can fail returns `*mut c_char`: null on success,
//! or an owned, nul-terminated, heap-allocated reason string on failure. The
//! caller (the `analyzer` driver, or an upstream stage invoking this one as
//! its downstream) must release that string with [`free_string`] - each
//! stage also exports `stage_free_string` so the release happens through the
//! same allocator that produced the string, never the caller's own.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use pipeloom_core::PipelineError;

/// A downstream neighbour's `place_work`, as called across the ABI boundary.
///
/// Takes a borrowed, nul-terminated UTF-8 string (the stage copies it before
/// returning, per spec §6) and returns null on success or an owned error
/// reason the caller must free.
pub type SubmitFn = extern "C" fn(*const c_char) -> *mut c_char;

/// A stage's `stage_free_string` export, as called across the ABI boundary.
///
/// `attach` must route a downstream error-reason string back through *this*
/// function rather than the caller's own [`free_string`]: each stage may be
/// a separately loaded library, and the same-allocator discipline the rest
/// of this module follows requires a string to be released by whichever
/// library's allocator produced it.
pub type FreeStringFn = extern "C" fn(*mut c_char);

/// Borrows `ptr` as `&str`, rejecting a null pointer or invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a valid, nul-terminated C string that
/// outlives the returned reference.
pub unsafe fn str_from_raw<'a>(ptr: *const c_char) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err("null string pointer".to_string());
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|err| format!("invalid UTF-8 across ABI boundary: {err}"))
}

/// Leaks `s` as an owned, nul-terminated C string; the caller must release it
/// with [`free_string`].
pub fn into_raw(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        // An embedded NUL can't happen for pipeline text in practice, but a
        // reason string must never be dropped silently.
        Err(_) => CString::new("<string contained an embedded NUL>")
            .expect("literal has no NUL")
            .into_raw(),
    }
}

/// Releases a C string previously produced by [`into_raw`] (directly, or via
/// a stage's `stage_free_string` export).
///
/// # Safety
///
/// `ptr` must be null or have been produced by [`into_raw`] from the same
/// allocator, and must not be freed more than once.
pub unsafe fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Converts a core [`Result`] to the ABI's null-on-success convention.
pub fn result_to_raw(result: Result<(), PipelineError>) -> *mut c_char {
    match result {
        Ok(()) => std::ptr::null_mut(),
        Err(err) => into_raw(err.to_string()),
    }
}

/// Generates the five ABI exports (`stage_init`, `stage_place_work`,
/// `stage_attach`, `stage_wait_finished`, `stage_fini`) plus `stage_name` and
/// `stage_free_string` for a stage cdylib.
///
/// `$display_name` is the stage's diagnostic name (used for both the worker
/// thread name and `stage_name`'s return value); `$transform` is a path to a
/// `fn(&str) -> Option<String>`. The invoking crate binds exactly one
/// [`pipeloom_core::Stage`] to a process-global slot, matching the "one
/// stage per loaded object" convention described in spec §9.
#[macro_export]
macro_rules! export_stage {
    ($display_name:literal, $transform:path) => {
        static __PIPELOOM_STAGE: ::std::sync::OnceLock<::pipeloom_core::Stage> =
            ::std::sync::OnceLock::new();

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_name() -> *const ::std::os::raw::c_char {
            concat!($display_name, "\0").as_ptr().cast()
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_init(
            capacity: ::std::os::raw::c_int,
        ) -> *mut ::std::os::raw::c_char {
            if capacity <= 0 {
                return $crate::into_raw("queue capacity must be positive".to_string());
            }
            if __PIPELOOM_STAGE.get().is_some() {
                return $crate::into_raw("stage already initialized".to_string());
            }
            let stage = match ::pipeloom_core::Stage::spawn(
                $display_name,
                $transform,
                capacity as usize,
            ) {
                Ok(stage) => stage,
                Err(err) => return $crate::into_raw(err.to_string()),
            };
            // `set` cannot fail: the `get` check above holds under the
            // single-threaded init discipline the driver (§4.7) follows.
            let _ = __PIPELOOM_STAGE.set(stage);
            ::std::ptr::null_mut()
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_place_work(
            item: *const ::std::os::raw::c_char,
        ) -> *mut ::std::os::raw::c_char {
            let Some(stage) = __PIPELOOM_STAGE.get() else {
                return $crate::into_raw("stage not initialized".to_string());
            };
            let item = match unsafe { $crate::str_from_raw(item) } {
                Ok(s) => s.to_string(),
                Err(reason) => return $crate::into_raw(reason),
            };
            $crate::result_to_raw(stage.place_work(item))
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_attach(
            submit: $crate::SubmitFn,
            free_string: $crate::FreeStringFn,
        ) {
            let Some(stage) = __PIPELOOM_STAGE.get() else {
                ::log::error!("stage_attach called before stage_init");
                return;
            };
            let attach_result = stage.attach(move |item: String| {
                let c_item = ::std::ffi::CString::new(item).map_err(|_| {
                    ::pipeloom_core::PipelineError::InvalidArgument(
                        "item contained an embedded NUL".into(),
                    )
                })?;
                let reason = submit(c_item.as_ptr());
                if reason.is_null() {
                    return Ok(());
                }
                let message = unsafe { $crate::str_from_raw(reason) }
                    .unwrap_or("<unreadable downstream error>")
                    .to_string();
                free_string(reason);
                Err(::pipeloom_core::PipelineError::InvalidArgument(message))
            });
            if let Err(err) = attach_result {
                ::log::error!("stage_attach failed: {err}");
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_wait_finished() -> *mut ::std::os::raw::c_char {
            match __PIPELOOM_STAGE.get() {
                Some(stage) => {
                    stage.wait_finished();
                    ::std::ptr::null_mut()
                }
                None => $crate::into_raw("stage not initialized".to_string()),
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_fini() -> *mut ::std::os::raw::c_char {
            match __PIPELOOM_STAGE.get() {
                Some(stage) => {
                    stage.fini();
                    ::std::ptr::null_mut()
                }
                None => $crate::into_raw("stage not initialized".to_string()),
            }
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn stage_free_string(ptr: *mut ::std::os::raw::c_char) {
            unsafe { $crate::free_string(ptr) };
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn str_from_raw_rejects_null() {
        assert!(unsafe { str_from_raw(ptr::null()) }.is_err());
    }

    #[test]
    fn into_raw_round_trips_through_free_string() {
        let raw = into_raw("hello".to_string());
        let borrowed = unsafe { str_from_raw(raw) }.unwrap();
        assert_eq!(borrowed, "hello");
        unsafe { free_string(raw) };
    }

    #[test]
    fn result_to_raw_is_null_on_success() {
        assert!(result_to_raw(Ok(())).is_null());
    }

    #[test]
    fn result_to_raw_carries_the_reason_on_failure() {
        let raw = result_to_raw(Err(PipelineError::Closed));
        assert!(!raw.is_null());
        let message = unsafe { str_from_raw(raw) }.unwrap().to_string();
        assert_eq!(message, "closed");
        unsafe { free_string(raw) };
    }
}
