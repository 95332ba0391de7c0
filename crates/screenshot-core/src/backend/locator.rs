//! Backend artifact resolution with ordered fallback
//!
//! The locator turns a [`PlatformDescriptor`] and a search root into an
//! ordered list of [`BackendCandidate`]s and loads the first one that works:
//!
//! | Order | Strategy | Target |
//! |-------|----------|--------|
//! | 1 | [`LoadStrategy::EmbeddedConventionLoader`] | `libscreenshot_rs.so` via the OS loader search path |
//! | 2 | [`LoadStrategy::PlatformSpecificArtifact`] | `<root>/screenshot_rs.<os>-<arch>.<ext>` |
//! | 3 | [`LoadStrategy::LocalBuildArtifact`] | `<root>/screenshot_rs.<ext>` |
//!
//! Candidate 2 is only produced when both the OS and the architecture are
//! supported. An unsupported OS fails with
//! [`CaptureError::UnsupportedPlatform`] before any candidate is attempted.
//! When every candidate fails, the individual reasons are collected into
//! [`CaptureError::BackendNotFound`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::BackendModule;
use super::native::NativeLoader;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::model::PlatformDescriptor;
use crate::util::detect;

/// How a candidate locates its artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStrategy {
    /// Prebuilt library found by name through the OS loader's search path
    EmbeddedConventionLoader,
    /// `<base>.<os>-<arch>.<ext>` in the search root
    PlatformSpecificArtifact,
    /// `<base>.<ext>` in the search root
    LocalBuildArtifact,
}

impl LoadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStrategy::EmbeddedConventionLoader => "embedded-convention-loader",
            LoadStrategy::PlatformSpecificArtifact => "platform-specific-artifact",
            LoadStrategy::LocalBuildArtifact => "local-build-artifact",
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a candidate asks the loader to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateTarget {
    /// Bare file name resolved by the OS loader
    LibraryName(String),
    /// Explicit file path
    Path(PathBuf),
}

/// One attempt the locator will make
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCandidate {
    pub strategy: LoadStrategy,
    pub target:   CandidateTarget,
}

impl BackendCandidate {
    /// Human-readable location, used only for diagnostics
    pub fn location_hint(&self) -> String {
        match &self.target {
            CandidateTarget::LibraryName(name) => name.clone(),
            CandidateTarget::Path(path) => path.display().to_string(),
        }
    }
}

impl fmt::Display for BackendCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.strategy, self.location_hint())
    }
}

/// Why one candidate could not be loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub strategy:      LoadStrategy,
    pub location_hint: String,
    /// The loader's message, verbatim
    pub reason:        String,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.strategy, self.location_hint, self.reason)
    }
}

/// Opens a candidate artifact
///
/// Implementations must not retry internally; the locator owns ordering and
/// error aggregation.
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, candidate: &BackendCandidate) -> Result<Arc<dyn BackendModule>, String>;
}

/// File naming used to build candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNaming {
    /// Library name looked up by the convention loader, without prefix or
    /// extension
    pub library_name:  String,
    /// Base name of artifacts placed in the search root
    pub artifact_base: String,
}

type CandidateBuilder = fn(&BackendLocator) -> Option<BackendCandidate>;

/// Candidate builders in preference order
const CANDIDATE_BUILDERS: [CandidateBuilder; 3] = [
    BackendLocator::convention_candidate,
    BackendLocator::platform_candidate,
    BackendLocator::local_build_candidate,
];

/// Resolves and loads the backend for one platform and search root
pub struct BackendLocator {
    platform:    PlatformDescriptor,
    search_root: PathBuf,
    naming:      ArtifactNaming,
    loader:      Arc<dyn ArtifactLoader>,
}

impl BackendLocator {
    /// Creates a locator for the running platform that loads shared libraries
    pub fn new(config: &CaptureConfig) -> Self {
        Self::with_loader(detect::describe(), config, Arc::new(NativeLoader::new()))
    }

    /// Creates a locator with an explicit platform and loader
    pub fn with_loader(
        platform: PlatformDescriptor,
        config: &CaptureConfig,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        Self {
            platform,
            search_root: config.search_root.clone(),
            naming: ArtifactNaming {
                library_name:  config.library_name.clone(),
                artifact_base: config.artifact_base.clone(),
            },
            loader,
        }
    }

    pub fn platform(&self) -> PlatformDescriptor {
        self.platform
    }

    pub fn search_root(&self) -> &std::path::Path {
        &self.search_root
    }

    /// Builds the ordered candidate list for this platform
    ///
    /// Fails with [`CaptureError::UnsupportedPlatform`] for an unsupported OS.
    pub fn candidates(&self) -> CaptureResult<Vec<BackendCandidate>> {
        if !self.platform.os.is_supported() {
            return Err(CaptureError::UnsupportedPlatform {
                platform: self.platform,
            });
        }
        if !self.platform.arch.is_supported() {
            tracing::warn!(
                "Architecture {} is unsupported; skipping the platform-specific artifact",
                self.platform.arch
            );
        }

        Ok(CANDIDATE_BUILDERS
            .iter()
            .filter_map(|build| build(self))
            .collect())
    }

    /// Loads the first candidate that succeeds
    ///
    /// Candidates are attempted strictly in order. When all of them fail the
    /// error carries every individual reason.
    pub fn resolve(&self) -> CaptureResult<Arc<dyn BackendModule>> {
        let candidates = self.candidates().inspect_err(|e| {
            tracing::error!("{}", e);
        })?;

        let mut failures = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            tracing::debug!("Trying backend candidate {}", candidate);
            match self.loader.load(candidate) {
                Ok(backend) => {
                    tracing::info!(
                        "Loaded native backend from {} ({})",
                        backend.location(),
                        candidate.strategy
                    );
                    return Ok(backend);
                }
                Err(reason) => {
                    tracing::warn!("Backend candidate {} failed: {}", candidate, reason);
                    failures.push(CandidateFailure {
                        strategy: candidate.strategy,
                        location_hint: candidate.location_hint(),
                        reason,
                    });
                }
            }
        }

        let error = CaptureError::BackendNotFound { failures };
        tracing::error!("{}", error);
        Err(error)
    }

    fn convention_candidate(&self) -> Option<BackendCandidate> {
        let name = self.platform.os.library_filename(&self.naming.library_name)?;
        Some(BackendCandidate {
            strategy: LoadStrategy::EmbeddedConventionLoader,
            target:   CandidateTarget::LibraryName(name),
        })
    }

    fn platform_candidate(&self) -> Option<BackendCandidate> {
        if !self.platform.is_fully_supported() {
            return None;
        }
        let ext = self.platform.os.library_extension()?;
        let file = format!(
            "{}.{}-{}.{}",
            self.naming.artifact_base, self.platform.os, self.platform.arch, ext
        );
        Some(BackendCandidate {
            strategy: LoadStrategy::PlatformSpecificArtifact,
            target:   CandidateTarget::Path(self.search_root.join(file)),
        })
    }

    fn local_build_candidate(&self) -> Option<BackendCandidate> {
        let ext = self.platform.os.library_extension()?;
        let file = format!("{}.{}", self.naming.artifact_base, ext);
        Some(BackendCandidate {
            strategy: LoadStrategy::LocalBuildArtifact,
            target:   CandidateTarget::Path(self.search_root.join(file)),
        })
    }
}

impl fmt::Debug for BackendLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendLocator")
            .field("platform", &self.platform)
            .field("search_root", &self.search_root)
            .field("naming", &self.naming)
            .finish()
    }
}
