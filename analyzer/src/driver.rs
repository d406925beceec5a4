//! Dynamic loading and wiring of stage cdylibs.
//!
//! Each stage is a dynamically loaded library exporting the seven symbols
//! defined by `pipeloom_abi::export_stage!`. This module resolves them once,
//! at load time, and keeps the raw function pointers alongside the
//! [`libloading::Library`] that must outlive every call through them.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::path::Path;

use libloading::Library;
use pipeloom_abi::{FreeStringFn, SubmitFn};

use crate::error::DriverError;

type NameFn = extern "C" fn() -> *const c_char;
type InitFn = extern "C" fn(c_int) -> *mut c_char;
type PlaceWorkFn = extern "C" fn(*const c_char) -> *mut c_char;
type AttachFn = extern "C" fn(SubmitFn, FreeStringFn);
type WaitFinishedFn = extern "C" fn() -> *mut c_char;
type FiniFn = extern "C" fn() -> *mut c_char;

/// A stage cdylib, loaded and its ABI symbols resolved.
///
/// The library is kept alive for as long as this value exists; every
/// function pointer below points into its mapped memory.
pub struct LoadedStage {
    requested_name: String,
    _library: Library,
    name_fn: NameFn,
    init_fn: InitFn,
    place_work_fn: PlaceWorkFn,
    attach_fn: AttachFn,
    wait_finished_fn: WaitFinishedFn,
    fini_fn: FiniFn,
    free_string_fn: FreeStringFn,
}

impl LoadedStage {
    /// Loads `{DLL_PREFIX}pipeloom_stage_{name}{DLL_SUFFIX}` from `dir` and
    /// resolves its ABI exports.
    ///
    /// # Safety
    ///
    /// Loading an arbitrary shared library runs its initializers; the caller
    /// is trusted to only name stages it means to execute.
    pub fn load(name: &str, dir: &Path) -> Result<Self, DriverError> {
        let file_name = format!(
            "{}pipeloom_stage_{}{}",
            std::env::consts::DLL_PREFIX,
            name,
            std::env::consts::DLL_SUFFIX
        );
        let path = dir.join(file_name);
        let path_display = path.display().to_string();

        let library = unsafe { Library::new(&path) }.map_err(|source| DriverError::Load {
            path: path_display.clone(),
            source,
        })?;

        macro_rules! resolve {
            ($symbol:literal) => {{
                let symbol = unsafe { library.get($symbol) }.map_err(|source| {
                    DriverError::MissingSymbol {
                        path: path_display.clone(),
                        symbol: std::str::from_utf8($symbol).unwrap_or("<non-utf8>"),
                        source,
                    }
                })?;
                *symbol
            }};
        }

        let name_fn: NameFn = resolve!(b"stage_name\0");
        let init_fn: InitFn = resolve!(b"stage_init\0");
        let place_work_fn: PlaceWorkFn = resolve!(b"stage_place_work\0");
        let attach_fn: AttachFn = resolve!(b"stage_attach\0");
        let wait_finished_fn: WaitFinishedFn = resolve!(b"stage_wait_finished\0");
        let fini_fn: FiniFn = resolve!(b"stage_fini\0");
        let free_string_fn: FreeStringFn = resolve!(b"stage_free_string\0");

        Ok(Self {
            requested_name: name.to_string(),
            _library: library,
            name_fn,
            init_fn,
            place_work_fn,
            attach_fn,
            wait_finished_fn,
            fini_fn,
            free_string_fn,
        })
    }

    /// The name the stage reports about itself, falling back to the name it
    /// was requested under if the string crossing the boundary isn't valid
    /// UTF-8 (which would itself indicate a misbehaving stage).
    pub fn reported_name(&self) -> String {
        let raw = (self.name_fn)();
        if raw.is_null() {
            return self.requested_name.clone();
        }
        unsafe { pipeloom_abi::str_from_raw(raw) }
            .map(str::to_string)
            .unwrap_or_else(|_| self.requested_name.clone())
    }

    pub fn init(&self, capacity: usize) -> Result<(), DriverError> {
        let capacity: c_int = capacity.try_into().map_err(|_| {
            DriverError::Config(format!(
                "queue capacity {capacity} does not fit a C int for stage `{}`",
                self.requested_name
            ))
        })?;
        self.check((self.init_fn)(capacity), "init")
    }

    pub fn place_work(&self, item: &str) -> Result<(), DriverError> {
        let c_item = CString::new(item).map_err(|source| DriverError::Encoding {
            stage: self.requested_name.clone(),
            source,
        })?;
        self.check((self.place_work_fn)(c_item.as_ptr()), "place_work")
    }

    /// Hands `downstream`'s `place_work` and `stage_free_string` exports to
    /// this stage so it forwards its output there and, on a reported error,
    /// releases the reason string through the same library's allocator that
    /// produced it rather than its own.
    pub fn attach(&self, downstream_place_work: SubmitFn, downstream_free_string: FreeStringFn) {
        (self.attach_fn)(downstream_place_work, downstream_free_string);
    }

    /// This stage's raw `place_work` entry point, suitable as another
    /// stage's `attach` argument.
    pub fn place_work_ptr(&self) -> SubmitFn {
        self.place_work_fn
    }

    /// This stage's raw `stage_free_string` entry point, suitable as
    /// another stage's `attach` argument.
    pub fn free_string_ptr(&self) -> FreeStringFn {
        self.free_string_fn
    }

    pub fn wait_finished(&self) -> Result<(), DriverError> {
        self.check((self.wait_finished_fn)(), "wait_finished")
    }

    pub fn fini(&self) -> Result<(), DriverError> {
        self.check((self.fini_fn)(), "fini")
    }

    fn check(&self, reason: *mut c_char, operation: &'static str) -> Result<(), DriverError> {
        if reason.is_null() {
            return Ok(());
        }
        let message = unsafe { pipeloom_abi::str_from_raw(reason) }
            .unwrap_or("<unreadable error>")
            .to_string();
        (self.free_string_fn)(reason);
        Err(DriverError::StageReported {
            stage: self.requested_name.clone(),
            operation,
            reason: message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeloom_abi::str_from_raw;
    use std::sync::Mutex;

    static CAPTURED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    extern "C" fn capture(item: *const c_char) -> *mut c_char {
        match unsafe { str_from_raw(item) } {
            Ok(s) => {
                CAPTURED.lock().unwrap().push(s.to_string());
                std::ptr::null_mut()
            }
            Err(reason) => pipeloom_abi::into_raw(reason),
        }
    }

    extern "C" fn capture_free_string(ptr: *mut c_char) {
        unsafe { pipeloom_abi::free_string(ptr) };
    }

    /// Mirrors `main.rs`'s `default_stage_dir`: the `pipeloom-stage-uppercase`
    /// dev-dependency below only exists to make cargo build that crate's
    /// cdylib alongside this test target, the same workspace `target/{debug,
    /// release}` directory `analyzer` itself loads stages from at runtime.
    /// `CARGO_CDYLIB_FILE_*` is an artifact-dependency env var that Cargo
    /// never defines for a plain path dependency, so it cannot be used here.
    fn uppercase_stage_dir() -> std::path::PathBuf {
        let profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        };
        std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("target")
            .join(profile)
    }

    #[test]
    fn loads_initializes_and_drives_the_uppercase_stage_end_to_end() {
        CAPTURED.lock().unwrap().clear();
        let dir = uppercase_stage_dir();
        let stage = LoadedStage::load("uppercase", &dir).expect("uppercase cdylib loads");
        assert_eq!(stage.reported_name(), "uppercase");

        stage.init(8).expect("init succeeds");
        stage.attach(capture, capture_free_string);
        stage.place_work("hello").expect("place_work succeeds");
        stage
            .place_work(pipeloom_core::SENTINEL)
            .expect("sentinel is accepted");
        stage.wait_finished().expect("wait_finished succeeds");
        stage.fini().expect("fini succeeds");

        assert_eq!(
            *CAPTURED.lock().unwrap(),
            vec!["HELLO".to_string(), pipeloom_core::SENTINEL.to_string()]
        );
    }

    #[test]
    fn missing_library_is_reported_as_a_load_error() {
        let err = LoadedStage::load("does-not-exist", &uppercase_stage_dir()).unwrap_err();
        assert!(matches!(err, DriverError::Load { .. }));
    }
}
