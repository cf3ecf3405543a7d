// libmpv loader
// Opens the engine library at runtime and resolves the client API entry points.

use crate::raw::MpvApi;
use mpv_bridge_core::{MpvError, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Environment variable naming an explicit library path, tried before the platform defaults
pub const LIBRARY_PATH_ENV: &str = "MPV_LIBRARY_PATH";

static LIBRARY: OnceCell<Arc<MpvLibrary>> = OnceCell::new();

/// Where to look for libmpv
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySource {
    /// File name or absolute path handed to the dynamic loader
    Path(String),
    /// The running executable, for statically linked builds
    ProcessImage,
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LibrarySource::Path(path) => f.write_str(path),
            LibrarySource::ProcessImage => f.write_str("<process image>"),
        }
    }
}

/// Platform defaults, in lookup order
pub fn platform_candidates() -> Vec<LibrarySource> {
    let names: &[&str] = if cfg!(target_os = "android") {
        &["libmpv.so"]
    } else if cfg!(target_os = "ios") {
        &[]
    } else if cfg!(target_os = "macos") {
        &[
            "libmpv.2.dylib",
            "libmpv.dylib",
            "/opt/homebrew/lib/libmpv.dylib",
            "/usr/local/lib/libmpv.dylib",
        ]
    } else {
        &["libmpv.so.2", "libmpv.so.1", "libmpv.so"]
    };

    let mut candidates: Vec<LibrarySource> = names
        .iter()
        .map(|name| LibrarySource::Path(name.to_string()))
        .collect();
    if cfg!(target_os = "ios") {
        candidates.push(LibrarySource::ProcessImage);
    }
    candidates
}

/// Candidate list with an optional override placed first
pub fn candidates_with(override_path: Option<String>) -> Vec<LibrarySource> {
    let mut candidates = Vec::new();
    if let Some(path) = override_path.filter(|p| !p.trim().is_empty()) {
        candidates.push(LibrarySource::Path(path));
    }
    for candidate in platform_candidates() {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// Candidates honouring `MPV_LIBRARY_PATH`
pub fn default_candidates() -> Vec<LibrarySource> {
    candidates_with(std::env::var(LIBRARY_PATH_ENV).ok())
}

/// An opened libmpv with its resolved entry points
pub struct MpvLibrary {
    api: MpvApi,
    source: LibrarySource,
    #[cfg(unix)]
    handle: *mut std::os::raw::c_void,
}

// The dlopen handle is only used again by dlclose in Drop, and the
// entry points are plain function pointers into a thread-safe C API
unsafe impl Send for MpvLibrary {}
unsafe impl Sync for MpvLibrary {}

impl MpvLibrary {
    /// Load the process-wide library once. Later calls return the same instance.
    pub fn init() -> Result<Arc<MpvLibrary>> {
        LIBRARY
            .get_or_try_init(|| {
                let library = MpvLibrary::open(&default_candidates())?;
                log::info!("libmpv loaded from {}", library.source());
                Ok(Arc::new(library))
            })
            .cloned()
    }

    /// The process-wide library, if `init` has succeeded
    pub fn get() -> Option<Arc<MpvLibrary>> {
        LIBRARY.get().cloned()
    }

    /// Try each candidate in order and keep the first that opens with every symbol present
    #[cfg(unix)]
    pub fn open(candidates: &[LibrarySource]) -> Result<MpvLibrary> {
        let mut failures = Vec::new();

        for candidate in candidates {
            match unix::open(candidate) {
                Ok((handle, api)) => {
                    log::debug!("opened libmpv candidate {}", candidate);
                    return Ok(MpvLibrary {
                        api,
                        source: candidate.clone(),
                        handle,
                    });
                }
                Err(reason) => {
                    log::debug!("libmpv candidate {} rejected: {}", candidate, reason);
                    failures.push(format!("{} ({})", candidate, reason));
                }
            }
        }

        Err(MpvError::EngineUnavailable(if failures.is_empty() {
            "no libmpv candidates to try".to_string()
        } else {
            format!("could not load libmpv, tried: {}", failures.join(", "))
        }))
    }

    #[cfg(not(unix))]
    pub fn open(_candidates: &[LibrarySource]) -> Result<MpvLibrary> {
        Err(MpvError::EngineUnavailable(
            "runtime loading of libmpv is not supported on this platform".to_string(),
        ))
    }

    /// Library over entry points that did not come from `dlopen`
    #[cfg(test)]
    pub(crate) fn from_api(api: MpvApi) -> MpvLibrary {
        MpvLibrary {
            api,
            source: LibrarySource::ProcessImage,
            #[cfg(unix)]
            handle: std::ptr::null_mut(),
        }
    }

    pub fn source(&self) -> &LibrarySource {
        &self.source
    }

    pub(crate) fn api(&self) -> &MpvApi {
        &self.api
    }
}

impl fmt::Debug for MpvLibrary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MpvLibrary")
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(unix)]
impl Drop for MpvLibrary {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                libc::dlclose(self.handle);
            }
        }
    }
}

#[cfg(unix)]
mod unix {
    use super::LibrarySource;
    use crate::raw::MpvApi;
    use std::ffi::{CStr, CString};
    use std::os::raw::{c_char, c_void};

    fn last_error() -> String {
        let err = unsafe { libc::dlerror() };
        if err.is_null() {
            "unknown dlopen error".to_string()
        } else {
            unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
        }
    }

    /// Resolve one symbol into a function pointer of the field's type
    macro_rules! resolve {
        ($handle:expr, $name:literal) => {{
            let ptr = libc::dlsym($handle, concat!($name, "\0").as_ptr() as *const c_char);
            if ptr.is_null() {
                libc::dlclose($handle);
                return Err(format!("missing symbol {}", $name));
            }
            std::mem::transmute::<*mut c_void, _>(ptr)
        }};
    }

    pub(super) fn open(source: &LibrarySource) -> Result<(*mut c_void, MpvApi), String> {
        let handle = match source {
            LibrarySource::Path(path) => {
                let path = CString::new(path.as_str())
                    .map_err(|_| "path contains NUL".to_string())?;
                unsafe { libc::dlopen(path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) }
            }
            LibrarySource::ProcessImage => unsafe {
                libc::dlopen(std::ptr::null(), libc::RTLD_NOW)
            },
        };
        if handle.is_null() {
            return Err(last_error());
        }

        let api = unsafe {
            MpvApi {
                create: resolve!(handle, "mpv_create"),
                initialize: resolve!(handle, "mpv_initialize"),
                set_option_string: resolve!(handle, "mpv_set_option_string"),
                command_string: resolve!(handle, "mpv_command_string"),
                set_property_string: resolve!(handle, "mpv_set_property_string"),
                set_property: resolve!(handle, "mpv_set_property"),
                get_property_string: resolve!(handle, "mpv_get_property_string"),
                observe_property: resolve!(handle, "mpv_observe_property"),
                unobserve_property: resolve!(handle, "mpv_unobserve_property"),
                wait_event: resolve!(handle, "mpv_wait_event"),
                wakeup: resolve!(handle, "mpv_wakeup"),
                free: resolve!(handle, "mpv_free"),
                terminate_destroy: resolve!(handle, "mpv_terminate_destroy"),
            }
        };
        Ok((handle, api))
    }
}
