//! Async capture façade over a lazily resolved backend
//!
//! [`ScreenCapture`] resolves the native backend on first use, adapts it into
//! [`CaptureOperations`] and keeps the outcome for its whole lifetime:
//!
//! - Concurrent first callers share a single resolution. It runs on its own
//!   task, so a caller dropped mid-resolution does not abandon it.
//! - A failed resolution is returned to every later caller without another
//!   load attempt. Native load failures are not transient.
//! - After resolution, each call runs independently and yields its own result.
//!
//! ```rust,ignore
//! use screenshot_core::capture::ScreenCapture;
//! use screenshot_core::config::CaptureConfig;
//!
//! let capture = ScreenCapture::new(CaptureConfig::from_env());
//! for screen in capture.list_screens().await? {
//!     let image = capture.capture_by_screen_id(screen.id).await?;
//!     image.save(format!("screenshot_by_id_{}.png", screen.id))?;
//! }
//! ```

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::backend::{BackendLocator, CaptureOperations, adapt};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::model::{ImageArtifact, ScreenInfo};

type Resolution = Result<Arc<CaptureOperations>, CaptureError>;

/// Screenshot capture bound to one backend locator
pub struct ScreenCapture {
    locator:         Arc<BackendLocator>,
    serialize_calls: bool,
    resolution:      Arc<OnceCell<Resolution>>,
}

impl ScreenCapture {
    /// Creates a façade that loads shared-library backends per `config`
    pub fn new(config: CaptureConfig) -> Self {
        let locator = BackendLocator::new(&config);
        Self::with_locator(locator, config.serialize_calls)
    }

    /// Creates a façade around an existing locator
    pub fn with_locator(locator: BackendLocator, serialize_calls: bool) -> Self {
        Self {
            locator: Arc::new(locator),
            serialize_calls,
            resolution: Arc::new(OnceCell::new()),
        }
    }

    pub fn locator(&self) -> &BackendLocator {
        &self.locator
    }

    /// Whether resolution has already run, successfully or not
    pub fn is_resolved(&self) -> bool {
        self.resolution.initialized()
    }

    /// Resolved operation table, resolving on first use
    pub async fn operations(&self) -> CaptureResult<Arc<CaptureOperations>> {
        if let Some(resolution) = self.resolution.get() {
            return resolution.clone();
        }

        let cell = Arc::clone(&self.resolution);
        let locator = Arc::clone(&self.locator);
        let serialize_calls = self.serialize_calls;
        let task = tokio::spawn(async move {
            cell.get_or_init(|| resolve(locator, serialize_calls))
                .await
                .clone()
        });

        task.await.unwrap_or_else(|join_error| {
            tracing::error!("Backend resolution task failed: {}", join_error);
            Err(CaptureError::ResolutionAborted {
                reason: join_error.to_string(),
            })
        })
    }

    /// Captures the primary display as PNG
    pub async fn capture_primary(&self) -> CaptureResult<ImageArtifact> {
        let operations = self.operations().await?;
        let bytes = operations
            .capture_primary()
            .await
            .map_err(|reason| CaptureError::CaptureFailed { reason })?;
        tracing::debug!("Captured primary display ({} bytes)", bytes.len());
        Ok(ImageArtifact::png(bytes))
    }

    /// Captures the display with `screen_id` as PNG
    ///
    /// Ids come from [`list_screens`](Self::list_screens) and are only
    /// meaningful within that enumeration.
    pub async fn capture_by_screen_id(&self, screen_id: u32) -> CaptureResult<ImageArtifact> {
        let operations = self.operations().await?;
        let bytes = operations
            .capture_by_id(screen_id)
            .await
            .map_err(|reason| CaptureError::CaptureFailed { reason })?;
        tracing::debug!("Captured screen {} ({} bytes)", screen_id, bytes.len());
        Ok(ImageArtifact::png(bytes))
    }

    /// Enumerates displays exactly as the backend reports them
    pub async fn list_screens(&self) -> CaptureResult<Vec<ScreenInfo>> {
        let operations = self.operations().await?;
        operations
            .list_screens()
            .await
            .map_err(|reason| CaptureError::ListFailed { reason })
    }
}

async fn resolve(locator: Arc<BackendLocator>, serialize_calls: bool) -> Resolution {
    // Loading a library blocks on the filesystem and runs initializers.
    let outcome = tokio::task::spawn_blocking(move || {
        let backend = locator.resolve()?;
        adapt(backend, serialize_calls)
    })
    .await;

    match outcome {
        Ok(Ok(operations)) => Ok(Arc::new(operations)),
        Ok(Err(e)) => {
            tracing::error!("Backend resolution failed: {}", e);
            Err(e)
        }
        Err(join_error) => {
            tracing::error!("Backend resolution task failed: {}", join_error);
            Err(CaptureError::ResolutionAborted {
                reason: join_error.to_string(),
            })
        }
    }
}

impl std::fmt::Debug for ScreenCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenCapture")
            .field("locator", &self.locator)
            .field("serialize_calls", &self.serialize_calls)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
