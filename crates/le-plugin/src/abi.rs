//! Plugin ABI (§6.3): the function pointers a plugin's dynamic library must
//! (or may) export, and the loader that resolves them.
//!
//! Grounded on the native-loader shape in the pack's `FrozenTear-sootmix`
//! example (`src/plugins/native.rs`): `libloading::Library` kept alive for
//! the record's lifetime, entry points resolved by symbol name at load time,
//! optional symbols tolerated as absent rather than failing the load.

use std::ffi::{c_char, c_void};
use std::path::Path;

use libloading::{Library, Symbol};

use crate::PluginError;

pub type ErrorCode = i32;

pub type InitializeFn =
    unsafe extern "C" fn(context: *mut c_void, config: *const c_void) -> ErrorCode;
pub type ProcessFn = unsafe extern "C" fn(
    context: *mut c_void,
    in_samples: *const f32,
    out_samples: *mut f32,
    n: usize,
) -> ErrorCode;
pub type FinalizeFn = unsafe extern "C" fn(context: *mut c_void) -> ErrorCode;
pub type SetParameterFn = unsafe extern "C" fn(context: *mut c_void, id: u32, value: f64) -> ErrorCode;
pub type GetParameterFn =
    unsafe extern "C" fn(context: *mut c_void, id: u32, out_value: *mut f64) -> ErrorCode;
pub type ResetFn = unsafe extern "C" fn(context: *mut c_void) -> ErrorCode;
pub type SuspendFn = unsafe extern "C" fn(context: *mut c_void) -> ErrorCode;
pub type ResumeFn = unsafe extern "C" fn(context: *mut c_void) -> ErrorCode;
pub type GetInfoFn = unsafe extern "C" fn(context: *mut c_void, key: *const c_char) -> *const c_char;
pub type GetLatencyFn = unsafe extern "C" fn(context: *mut c_void) -> u32;
pub type GetTailTimeFn = unsafe extern "C" fn(context: *mut c_void) -> u32;

/// The resolved vtable for one loaded plugin. The three required entry
/// points are plain fields; everything §6.3 lists as optional is an
/// `Option`.
pub struct PluginAbi {
    pub initialize: InitializeFn,
    pub process: ProcessFn,
    pub finalize: FinalizeFn,
    pub set_parameter: Option<SetParameterFn>,
    pub get_parameter: Option<GetParameterFn>,
    pub reset: Option<ResetFn>,
    pub suspend: Option<SuspendFn>,
    pub resume: Option<ResumeFn>,
    pub get_info: Option<GetInfoFn>,
    pub get_latency: Option<GetLatencyFn>,
    pub get_tail_time: Option<GetTailTimeFn>,
}

/// A loaded dynamic library kept alive for as long as the plugin record
/// needs its function pointers to remain valid.
pub struct PluginLibrary {
    _library: Library,
    pub abi: PluginAbi,
}

macro_rules! required_symbol {
    ($library:expr, $name:expr) => {
        *unsafe { $library.get($name) }
            .map_err(|_| PluginError::MissingSymbol(String::from_utf8_lossy($name).trim_end_matches('\0').to_string()))?
    };
}

macro_rules! optional_symbol {
    ($library:expr, $name:expr) => {
        unsafe { $library.get($name) }.ok().map(|s: Symbol<'_, _>| *s)
    };
}

impl PluginLibrary {
    /// Load a plugin's dynamic library and resolve its ABI entry points.
    ///
    /// # Safety
    /// The caller is asserting the file at `path` is a trusted plugin
    /// binary; loading and calling into arbitrary code is inherently unsafe.
    pub unsafe fn load(path: &Path) -> Result<Self, PluginError> {
        let library = unsafe { Library::new(path) }
            .map_err(|e| PluginError::Libloading(e.to_string()))?;

        let initialize: InitializeFn = required_symbol!(library, b"initialize\0");
        let process: ProcessFn = required_symbol!(library, b"process\0");
        let finalize: FinalizeFn = required_symbol!(library, b"finalize\0");

        let set_parameter: Option<SetParameterFn> = optional_symbol!(library, b"set_parameter\0");
        let get_parameter: Option<GetParameterFn> = optional_symbol!(library, b"get_parameter\0");
        let reset: Option<ResetFn> = optional_symbol!(library, b"reset\0");
        let suspend: Option<SuspendFn> = optional_symbol!(library, b"suspend\0");
        let resume: Option<ResumeFn> = optional_symbol!(library, b"resume\0");
        let get_info: Option<GetInfoFn> = optional_symbol!(library, b"get_info\0");
        let get_latency: Option<GetLatencyFn> = optional_symbol!(library, b"get_latency\0");
        let get_tail_time: Option<GetTailTimeFn> = optional_symbol!(library, b"get_tail_time\0");

        Ok(Self {
            _library: library,
            abi: PluginAbi {
                initialize,
                process,
                finalize,
                set_parameter,
                get_parameter,
                reset,
                suspend,
                resume,
                get_info,
                get_latency,
                get_tail_time,
            },
        })
    }
}

/// SHA-256 checksum of the plugin binary, hex-encoded, for the metadata
/// block's `checksum` field (§6.3, validated at scan time per §4.9).
pub fn compute_checksum(path: &Path) -> Result<String, PluginError> {
    use sha2::{Digest, Sha256};
    let bytes = std::fs::read(path).map_err(|e| PluginError::Core(le_core::CoreError::FileIo(e)))?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}
