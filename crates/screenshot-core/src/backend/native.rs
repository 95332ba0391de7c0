//! Shared-library backends loaded with `libloading`
//!
//! [`NativeLoader`] opens a candidate artifact; [`NativeBackend`] keeps the
//! library handle alive for the rest of the process and turns exported
//! symbols into [`BoundCall`]s by interpreting them with the function type
//! of the requested capability.

use std::ffi::OsStr;
use std::sync::Arc;

use libloading::Library;

use super::abi::{self, CallSink, CaptureByIdFn, CapturePrimaryFn, ListScreensFn};
use super::locator::{ArtifactLoader, BackendCandidate, CandidateTarget};
use super::{BackendModule, BoundCall, CapabilityKind};

/// A backend backed by a loaded shared library
#[derive(Debug)]
pub struct NativeBackend {
    library:  Arc<Library>,
    location: String,
}

impl NativeBackend {
    /// Opens the shared library at `target`
    ///
    /// A bare file name is resolved through the platform loader's search
    /// path; anything containing a separator is opened as a path.
    ///
    /// # Safety
    ///
    /// Loading a library runs its initializers. The library must be a
    /// screenshot_rs backend honoring the contract in [`abi`].
    pub unsafe fn open(target: impl AsRef<OsStr>, location: String) -> Result<Self, String> {
        let library = unsafe { Library::new(target.as_ref()) }.map_err(|e| e.to_string())?;
        Ok(Self {
            library: Arc::new(library),
            location,
        })
    }

    fn lookup<T: Copy>(&self, name: &str) -> Option<T> {
        // The symbol type is dictated by the capability being probed.
        let symbol = unsafe { self.library.get::<T>(name.as_bytes()) }.ok()?;
        Some(*symbol)
    }
}

impl BackendModule for NativeBackend {
    fn location(&self) -> &str {
        &self.location
    }

    fn symbol(&self, kind: CapabilityKind, name: &str) -> Option<BoundCall> {
        // Each closure holds the library so the function pointer stays valid.
        let library = Arc::clone(&self.library);
        let bound = match kind {
            CapabilityKind::CapturePrimary => {
                let func = self.lookup::<CapturePrimaryFn>(name)?;
                BoundCall::CapturePrimary(Arc::new(move || {
                    let _library = &library;
                    let mut sink = CallSink::new();
                    let status =
                        unsafe { func(sink.as_ctx(), abi::collect_image, abi::collect_error) };
                    sink.into_image(status)
                }))
            }
            CapabilityKind::CaptureById => {
                let func = self.lookup::<CaptureByIdFn>(name)?;
                BoundCall::CaptureById(Arc::new(move |screen_id: u32| {
                    let _library = &library;
                    let mut sink = CallSink::new();
                    let status = unsafe {
                        func(screen_id, sink.as_ctx(), abi::collect_image, abi::collect_error)
                    };
                    sink.into_image(status)
                }))
            }
            CapabilityKind::ListScreens => {
                let func = self.lookup::<ListScreensFn>(name)?;
                BoundCall::ListScreens(Arc::new(move || {
                    let _library = &library;
                    let mut sink = CallSink::new();
                    let status =
                        unsafe { func(sink.as_ctx(), abi::collect_screen, abi::collect_error) };
                    sink.into_screens(status)
                }))
            }
        };
        Some(bound)
    }
}

/// [`ArtifactLoader`] that opens candidates as shared libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactLoader for NativeLoader {
    fn load(&self, candidate: &BackendCandidate) -> Result<Arc<dyn BackendModule>, String> {
        let location = candidate.location_hint();
        let backend = match &candidate.target {
            CandidateTarget::LibraryName(name) => unsafe { NativeBackend::open(name, location) }?,
            CandidateTarget::Path(path) => {
                if !path.is_file() {
                    return Err(format!("{} does not exist", path.display()));
                }
                unsafe { NativeBackend::open(path, location) }?
            }
        };
        Ok(Arc::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::locator::LoadStrategy;

    #[test]
    fn test_missing_path_is_reported_with_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot_rs.so");
        let candidate = BackendCandidate {
            strategy: LoadStrategy::LocalBuildArtifact,
            target:   CandidateTarget::Path(path.clone()),
        };

        let err = NativeLoader::new().load(&candidate).unwrap_err();
        assert!(err.contains("does not exist"));
        assert!(err.contains(&path.display().to_string()));
    }

    #[test]
    fn test_non_library_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot_rs.so");
        std::fs::write(&path, b"definitely not a shared library").unwrap();
        let candidate = BackendCandidate {
            strategy: LoadStrategy::LocalBuildArtifact,
            target:   CandidateTarget::Path(path),
        };

        let err = NativeLoader::new().load(&candidate).unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_unknown_library_name_fails_to_load() {
        let candidate = BackendCandidate {
            strategy: LoadStrategy::EmbeddedConventionLoader,
            target:   CandidateTarget::LibraryName(
                "libscreenshot_rs_definitely_absent_8c1f.so".to_string(),
            ),
        };

        assert!(NativeLoader::new().load(&candidate).is_err());
    }
}
