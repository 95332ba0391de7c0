//! screenshot-core: Cross-platform screenshot capture over a native backend
//!
//! Capture itself happens in a dynamically loaded backend library. This crate
//! finds a backend suitable for the running platform, adapts whatever
//! naming convention it was built with into a typed operation table, and
//! exposes that table as async operations.
//!
//! # Modules
//!
//! - [`util::detect`] - Describe the running platform
//! - [`backend`] - Candidate resolution, dynamic loading and capability probing
//! - [`capture`] - Async façade with memoized resolution
//! - [`config`] - Defaults and environment overrides
//!
//! The free functions below use a process-wide [`ScreenCapture`] configured
//! from the environment on first use.

use std::sync::OnceLock;

pub mod backend;
pub mod capture;
pub mod config;
pub mod error;
pub mod model;
pub mod util;

pub use capture::ScreenCapture;
pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult};
pub use model::{ImageArtifact, PlatformDescriptor, ScreenInfo};

static DEFAULT_CAPTURE: OnceLock<ScreenCapture> = OnceLock::new();

/// Process-wide capture façade, configured from the environment once
pub fn default_capture() -> &'static ScreenCapture {
    DEFAULT_CAPTURE.get_or_init(|| ScreenCapture::new(CaptureConfig::from_env()))
}

/// Captures the primary display as PNG
pub async fn capture_primary() -> CaptureResult<ImageArtifact> {
    default_capture().capture_primary().await
}

/// Captures the display with `screen_id` as PNG
pub async fn capture_by_screen_id(screen_id: u32) -> CaptureResult<ImageArtifact> {
    default_capture().capture_by_screen_id(screen_id).await
}

/// Enumerates the displays the backend can capture
pub async fn list_screens() -> CaptureResult<Vec<ScreenInfo>> {
    default_capture().list_screens().await
}
