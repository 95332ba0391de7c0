//! Error types for backend resolution and screenshot capture
//!
//! This module defines the error taxonomy with user-facing messages and
//! actionable remediation hints. Errors fall into two classes:
//!
//! - **Resolution errors** ([`CaptureError::UnsupportedPlatform`],
//!   [`CaptureError::BackendNotFound`], [`CaptureError::MissingCapability`],
//!   [`CaptureError::ResolutionAborted`]) are diagnosed once, memoized and
//!   require operator action such as installing a toolchain or rebuilding the
//!   backend.
//! - **Call-time errors** ([`CaptureError::CaptureFailed`],
//!   [`CaptureError::ListFailed`]) are local to one call, keep the backend's
//!   message verbatim and are safe to retry.
//!
//! `CaptureError` is `Clone` so a memoized resolution failure can be handed
//! to every caller.

use crate::backend::locator::CandidateFailure;
use crate::model::PlatformDescriptor;

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Guidance appended to every [`CaptureError::BackendNotFound`] message
pub const BACKEND_GUIDANCE: &str = "Please ensure a prebuilt screenshot_rs backend for your \
                                    platform is installed, or build one from source: install the \
                                    Rust toolchain (https://rustup.rs) and run `cargo build \
                                    --release -p screenshot-backend`, then copy the library next \
                                    to the executable or point SCREENSHOT_RS_BACKEND_DIR at it.";

/// Error type for backend resolution and capture operations
///
/// Each variant includes detailed context and provides remediation hints
/// through the `remediation_hint()` method.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CaptureError {
    /// The operating system is outside the supported set
    #[error("Screenshot capture is not supported on this platform ({platform})")]
    UnsupportedPlatform {
        /// Descriptor of the rejected platform
        platform: PlatformDescriptor,
    },

    /// Every backend candidate failed to load
    #[error(
        "Failed to load the screenshot_rs native backend after {} attempt(s): {}. {}",
        .failures.len(),
        render_failures(.failures),
        BACKEND_GUIDANCE
    )]
    BackendNotFound {
        /// One entry per attempted candidate, in attempt order
        failures: Vec<CandidateFailure>,
    },

    /// The backend loaded but lacks a required function under either name
    #[error("Native backend does not export {name}/{alternate}")]
    MissingCapability {
        /// Call-style name of the missing capability
        name:      &'static str,
        /// Declaration-style name that was also probed
        alternate: &'static str,
    },

    /// The blocking resolution task did not complete
    #[error("Backend resolution aborted: {reason}")]
    ResolutionAborted {
        /// Why the task ended
        reason: String,
    },

    /// A capture call failed or returned a malformed result
    #[error("{reason}")]
    CaptureFailed {
        /// The backend's message, verbatim
        reason: String,
    },

    /// A list-screens call failed
    #[error("{reason}")]
    ListFailed {
        /// The backend's message, verbatim
        reason: String,
    },
}

fn render_failures(failures: &[CandidateFailure]) -> String {
    if failures.is_empty() {
        return "no candidates were available".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl CaptureError {
    /// Whether this error was produced while resolving the backend
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            CaptureError::UnsupportedPlatform { .. }
                | CaptureError::BackendNotFound { .. }
                | CaptureError::MissingCapability { .. }
                | CaptureError::ResolutionAborted { .. }
        )
    }

    /// Whether retrying the same call may succeed
    ///
    /// Resolution failures are terminal for the process; only call-time
    /// failures are retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CaptureError::CaptureFailed { .. } | CaptureError::ListFailed { .. })
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use screenshot_core::error::CaptureError;
    ///
    /// let error = CaptureError::MissingCapability {
    ///     name:      "listScreens",
    ///     alternate: "list_screens",
    /// };
    ///
    /// assert!(error.remediation_hint().contains("Rebuild"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::UnsupportedPlatform { .. } => {
                "screenshot_rs backends are only built for macOS, Linux and Windows on x64 or \
                 arm64. Run on a supported platform."
            }
            CaptureError::BackendNotFound { .. } => {
                "Install the Rust toolchain from https://rustup.rs, run `cargo build --release -p \
                 screenshot-backend` and copy the resulting library next to the executable as \
                 screenshot_rs.<ext>, or set SCREENSHOT_RS_BACKEND_DIR to the directory holding \
                 it. Run `screenshot-cli doctor` to see every location that was tried."
            }
            CaptureError::MissingCapability { .. } => {
                "The native backend was built from a different version than this library. \
                 Rebuild or reinstall the backend so both come from the same release."
            }
            CaptureError::ResolutionAborted { .. } => {
                "The native backend crashed while loading. Rebuild it and retry in a new process."
            }
            CaptureError::CaptureFailed { .. } => {
                "Retry the capture. On macOS grant Screen Recording permission in System \
                 Settings > Privacy & Security > Screen Recording. When capturing by id, use an \
                 id from the latest list_screens result."
            }
            CaptureError::ListFailed { .. } => {
                "Retry the enumeration. Ensure a display server is running and accessible from \
                 this session."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::locator::LoadStrategy;
    use crate::model::{Arch, Os};

    fn failure(strategy: LoadStrategy, location: &str, reason: &str) -> CandidateFailure {
        CandidateFailure {
            strategy,
            location_hint: location.to_string(),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_unsupported_platform_message() {
        let error = CaptureError::UnsupportedPlatform {
            platform: PlatformDescriptor::new(Os::Unsupported, Arch::X64),
        };

        let msg = error.to_string();
        assert!(msg.contains("not supported"));
        assert!(msg.contains("unsupported-x64"));
        assert!(error.remediation_hint().contains("macOS, Linux and Windows"));
    }

    #[test]
    fn test_backend_not_found_lists_every_reason() {
        let error = CaptureError::BackendNotFound {
            failures: vec![
                failure(LoadStrategy::EmbeddedConventionLoader, "libscreenshot_rs.so", "reason one"),
                failure(LoadStrategy::PlatformSpecificArtifact, "/opt/a.so", "reason two"),
                failure(LoadStrategy::LocalBuildArtifact, "/opt/b.so", "reason three"),
            ],
        };

        let msg = error.to_string();
        assert!(msg.contains("3 attempt(s)"));
        assert!(msg.contains("reason one"));
        assert!(msg.contains("reason two"));
        assert!(msg.contains("reason three"));
        assert!(msg.contains("cargo build --release"));
    }

    #[test]
    fn test_backend_not_found_without_candidates() {
        let error = CaptureError::BackendNotFound { failures: vec![] };
        assert!(error.to_string().contains("no candidates were available"));
    }

    #[test]
    fn test_missing_capability_names_both_spellings() {
        let error = CaptureError::MissingCapability {
            name:      "captureScreenshotByScreenId",
            alternate: "capture_screenshot_by_screen_id",
        };

        let msg = error.to_string();
        assert!(msg.contains("captureScreenshotByScreenId"));
        assert!(msg.contains("capture_screenshot_by_screen_id"));
    }

    #[test]
    fn test_call_time_errors_keep_backend_message() {
        let error = CaptureError::CaptureFailed {
            reason: "Screen not found".to_string(),
        };
        assert_eq!(error.to_string(), "Screen not found");

        let error = CaptureError::ListFailed {
            reason: "Failed to enumerate screens: boom".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to enumerate screens: boom");
    }

    #[test]
    fn test_error_classification() {
        let resolution = CaptureError::BackendNotFound { failures: vec![] };
        assert!(resolution.is_resolution_error());
        assert!(!resolution.is_retryable());

        let call = CaptureError::CaptureFailed {
            reason: "blank".to_string(),
        };
        assert!(!call.is_resolution_error());
        assert!(call.is_retryable());

        let aborted = CaptureError::ResolutionAborted {
            reason: "panicked".to_string(),
        };
        assert!(aborted.is_resolution_error());
    }

    #[test]
    fn test_capture_failed_remediation() {
        let error = CaptureError::CaptureFailed {
            reason: "Captured image is blank".to_string(),
        };

        let hint = error.remediation_hint();
        assert!(hint.contains("Screen Recording"));
        assert!(hint.contains("list_screens"));
    }

    #[test]
    fn test_error_debug_format() {
        let error = CaptureError::ListFailed {
            reason: "x".to_string(),
        };

        let debug = format!("{:?}", error);
        assert!(debug.contains("ListFailed"));
    }
}
