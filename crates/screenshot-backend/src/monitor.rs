//! [`DisplaySource`] over `xcap` monitors

use image::RgbaImage;
use screenshot_core::model::ScreenInfo;
use xcap::Monitor;

use crate::capture::{BackendError, DisplaySource};

/// Connected monitors as reported by `xcap`
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapSource;

impl DisplaySource for XcapSource {
    type Display = Monitor;

    fn displays(&self) -> Result<Vec<Monitor>, BackendError> {
        Monitor::all().map_err(|e| {
            tracing::error!("xcap failed to enumerate monitors: {}", e);
            BackendError::Enumerate(e.to_string())
        })
    }

    fn describe(&self, monitor: &Monitor) -> Result<ScreenInfo, BackendError> {
        Ok(ScreenInfo {
            id:           monitor.id().map_err(enumerate)?,
            x:            monitor.x().map_err(enumerate)?,
            y:            monitor.y().map_err(enumerate)?,
            width:        monitor.width().map_err(enumerate)?,
            height:       monitor.height().map_err(enumerate)?,
            rotation:     monitor.rotation().map_err(enumerate)?.round() as i32,
            scale_factor: f64::from(monitor.scale_factor().map_err(enumerate)?),
            // Some platforms report fractional rates such as 59.94.
            frequency:    monitor.frequency().map_err(enumerate)?.round() as u32,
            is_primary:   monitor.is_primary().map_err(enumerate)?,
        })
    }

    fn capture(&self, monitor: &Monitor) -> Result<RgbaImage, BackendError> {
        let image = monitor.capture_image().map_err(|e| {
            tracing::error!("xcap monitor capture failed: {}", e);
            BackendError::Capture(e.to_string())
        })?;
        tracing::debug!("Captured {}x{} frame", image.width(), image.height());
        Ok(image)
    }
}

fn enumerate(e: impl std::fmt::Display) -> BackendError {
    BackendError::Enumerate(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture;

    #[test]
    #[ignore = "Requires a display server and capture permission"]
    fn test_live_list_and_capture() {
        let screens = capture::list_screens(&XcapSource).unwrap();
        assert!(!screens.is_empty());

        let png = capture::capture_by_id(&XcapSource, screens[0].id).unwrap();
        assert!(png.starts_with(&screenshot_core::model::PNG_SIGNATURE));
    }
}
