//! Shared test utilities for integration tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use screenshot_core::backend::{BackendLocator, LoadStrategy, MockBackend, MockLoader};
use screenshot_core::capture::ScreenCapture;
use screenshot_core::config::CaptureConfig;
use screenshot_core::model::PlatformDescriptor;
use screenshot_core::util::detect::describe_from;

/// A supported platform that exercises every candidate strategy
pub fn linux_x64() -> PlatformDescriptor {
    describe_from("linux", "x86_64")
}

/// Loader whose only working candidate is the local build artifact
pub fn local_build_only(backend: MockBackend) -> Arc<MockLoader> {
    Arc::new(MockLoader::new().with_backend(LoadStrategy::LocalBuildArtifact, backend))
}

/// Façade over a mock loader rooted at `root`
pub fn mock_capture(
    platform: PlatformDescriptor,
    root: &Path,
    loader: Arc<MockLoader>,
    serialize_calls: bool,
) -> ScreenCapture {
    let config = CaptureConfig::default()
        .with_search_root(root)
        .with_serialize_calls(serialize_calls);
    let locator = BackendLocator::with_loader(platform, &config, loader);
    ScreenCapture::with_locator(locator, config.serialize_calls)
}
