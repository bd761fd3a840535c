//! ONNX Runtime shared library discovery.
//!
//! With the `load-dynamic` feature the runtime is loaded at startup instead of
//! being linked. The library is searched in this order:
//!
//! 1. `ORT_DYLIB_PATH`, if it points to an existing file
//! 2. `lib/` next to the executable
//! 3. `lib/` in the working directory
//!
//! On Windows the DLL is expected directly next to the executable or in the
//! working directory. When nothing is found, ort falls back to the system
//! library search path.

use crate::error::Result;
use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
const LIBRARY_NAME: &str = "libonnxruntime.so";
#[cfg(target_os = "macos")]
const LIBRARY_NAME: &str = "libonnxruntime.dylib";
#[cfg(target_os = "windows")]
const LIBRARY_NAME: &str = "onnxruntime.dll";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const LIBRARY_NAME: &str = "libonnxruntime.so";

/// Locate a bundled ONNX Runtime library.
#[must_use]
pub fn find_ort_library() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ORT_DYLIB_PATH") {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Some(path);
        }
    }

    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().ok();

    [exe_dir, cwd]
        .into_iter()
        .flatten()
        .find_map(|base| find_in_dir(&base))
}

/// Look for the library in `base/lib` (or `base` on Windows), accepting
/// versioned names such as `libonnxruntime.so.1.22.0`.
fn find_in_dir(base: &Path) -> Option<PathBuf> {
    let dir = if cfg!(target_os = "windows") {
        base.to_path_buf()
    } else {
        base.join("lib")
    };

    let exact = dir.join(LIBRARY_NAME);
    if exact.is_file() {
        return Some(exact);
    }

    std::fs::read_dir(&dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .find(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(LIBRARY_NAME))
        })
}

/// Initialize ONNX Runtime before the first model is loaded.
///
/// Only does work with the `load-dynamic` feature; a linked runtime needs no
/// initialization.
///
/// # Errors
///
/// Returns [`crate::Error::RuntimeInit`] if a library was found but failed
/// to load.
pub fn init_runtime() -> Result<()> {
    #[cfg(feature = "load-dynamic")]
    if let Some(path) = find_ort_library() {
        log::info!("loading ONNX Runtime from {}", path.display());
        ort::init_from(path.display().to_string())
            .commit()
            .map_err(|e| crate::error::Error::RuntimeInit(e.to_string()))?;
        return Ok(());
    }

    log::debug!("using ONNX Runtime from the default search path");
    Ok(())
}
