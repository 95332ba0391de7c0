//! Display capture and PNG encoding
//!
//! The operations here are written against [`DisplaySource`] so that the
//! selection, validation and encoding rules can be exercised without a real
//! display server. [`crate::monitor::XcapSource`] is the production source.
//!
//! # Rules
//!
//! - Capture is refused up front when the OS reports no screen-recording
//!   permission (macOS only; other platforms always pass).
//! - Primary capture uses the display flagged primary, else the first one.
//! - An all-zero RGBA buffer is rejected: macOS hands back blank frames when
//!   permission was revoked after the preflight check.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use screenshot_core::model::ScreenInfo;

/// Failures reported back through the error callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error(
        "Screen recording permission not granted. Enable it in System Settings > Privacy & \
         Security > Screen Recording."
    )]
    PermissionDenied,

    #[error("Failed to enumerate screens: {0}")]
    Enumerate(String),

    #[error("No screens found")]
    NoScreens,

    #[error("Screen not found")]
    ScreenNotFound,

    #[error("Failed to capture screen: {0}")]
    Capture(String),

    #[error("Captured image is blank. This is likely due to missing Screen Recording permission.")]
    BlankImage,

    #[error("Failed to encode PNG: {0}")]
    Encode(String),

    #[error("Native backend panicked: {0}")]
    Panicked(String),
}

/// A set of capturable displays
pub trait DisplaySource {
    type Display;

    /// Enumerates displays in the platform's order
    fn displays(&self) -> Result<Vec<Self::Display>, BackendError>;

    /// Geometry and metadata of `display`
    fn describe(&self, display: &Self::Display) -> Result<ScreenInfo, BackendError>;

    /// Grabs the current contents of `display`
    fn capture(&self, display: &Self::Display) -> Result<RgbaImage, BackendError>;
}

#[cfg(target_os = "macos")]
#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn CGPreflightScreenCaptureAccess() -> bool;
}

#[cfg(target_os = "macos")]
fn has_screen_capture_permission() -> bool {
    unsafe { CGPreflightScreenCaptureAccess() }
}

#[cfg(not(target_os = "macos"))]
fn has_screen_capture_permission() -> bool {
    true
}

fn ensure_permission() -> Result<(), BackendError> {
    if has_screen_capture_permission() {
        Ok(())
    } else {
        tracing::warn!("Screen recording permission not granted");
        Err(BackendError::PermissionDenied)
    }
}

/// Captures the primary display and returns PNG bytes
pub fn capture_primary<S: DisplaySource>(source: &S) -> Result<Vec<u8>, BackendError> {
    ensure_permission()?;

    let displays = source.displays()?;
    let infos = displays
        .iter()
        .map(|display| source.describe(display))
        .collect::<Result<Vec<_>, _>>()?;
    let index = primary_index(&infos).ok_or(BackendError::NoScreens)?;

    tracing::debug!("Capturing primary display {}", infos[index]);
    encode_capture(source.capture(&displays[index])?)
}

/// Captures the display whose id is `screen_id` and returns PNG bytes
pub fn capture_by_id<S: DisplaySource>(
    source: &S,
    screen_id: u32,
) -> Result<Vec<u8>, BackendError> {
    ensure_permission()?;

    for display in source.displays()? {
        let info = source.describe(&display)?;
        if info.id == screen_id {
            tracing::debug!("Capturing display {}", info);
            return encode_capture(source.capture(&display)?);
        }
    }
    Err(BackendError::ScreenNotFound)
}

/// Describes every display in enumeration order
pub fn list_screens<S: DisplaySource>(source: &S) -> Result<Vec<ScreenInfo>, BackendError> {
    source
        .displays()?
        .iter()
        .map(|display| source.describe(display))
        .collect()
}

/// Index of the display flagged primary, else the first one
pub fn primary_index(screens: &[ScreenInfo]) -> Option<usize> {
    screens
        .iter()
        .position(|screen| screen.is_primary)
        .or_else(|| (!screens.is_empty()).then_some(0))
}

pub fn is_blank(rgba: &[u8]) -> bool {
    rgba.iter().all(|&byte| byte == 0)
}

fn encode_capture(image: RgbaImage) -> Result<Vec<u8>, BackendError> {
    if is_blank(image.as_raw()) {
        return Err(BackendError::BlankImage);
    }
    encode_png(&image)
}

/// Encodes an RGBA8 image as PNG
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use screenshot_core::model::PNG_SIGNATURE;

    use super::*;

    struct FakeDisplay {
        info:  ScreenInfo,
        pixel: [u8; 4],
    }

    #[derive(Default)]
    struct FakeSource {
        displays:  Vec<(u32, bool, [u8; 4])>,
        fail_list: bool,
    }

    impl FakeSource {
        fn with_display(mut self, id: u32, is_primary: bool, pixel: [u8; 4]) -> Self {
            self.displays.push((id, is_primary, pixel));
            self
        }
    }

    impl DisplaySource for FakeSource {
        type Display = FakeDisplay;

        fn displays(&self) -> Result<Vec<FakeDisplay>, BackendError> {
            if self.fail_list {
                return Err(BackendError::Enumerate("no display server".to_string()));
            }
            Ok(self
                .displays
                .iter()
                .map(|&(id, is_primary, pixel)| FakeDisplay {
                    info: screen(id, is_primary),
                    pixel,
                })
                .collect())
        }

        fn describe(&self, display: &FakeDisplay) -> Result<ScreenInfo, BackendError> {
            Ok(display.info.clone())
        }

        fn capture(&self, display: &FakeDisplay) -> Result<RgbaImage, BackendError> {
            Ok(RgbaImage::from_pixel(4, 2, Rgba(display.pixel)))
        }
    }

    fn screen(id: u32, is_primary: bool) -> ScreenInfo {
        ScreenInfo {
            id,
            x:            0,
            y:            0,
            width:        4,
            height:       2,
            rotation:     0,
            scale_factor: 1.0,
            frequency:    60,
            is_primary,
        }
    }

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory_with_format(png, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn test_primary_index_prefers_flagged_display() {
        let screens = vec![screen(1, false), screen(2, true)];
        assert_eq!(primary_index(&screens), Some(1));
    }

    #[test]
    fn test_primary_index_falls_back_to_first() {
        let screens = vec![screen(5, false), screen(6, false)];
        assert_eq!(primary_index(&screens), Some(0));
        assert_eq!(primary_index(&[]), None);
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&[0, 0, 0, 0]));
        assert!(is_blank(&[]));
        assert!(!is_blank(&[0, 0, 1, 0]));
    }

    #[test]
    fn test_capture_primary_encodes_png() {
        let source = FakeSource::default()
            .with_display(1, false, [10, 20, 30, 255])
            .with_display(2, true, [200, 100, 50, 255]);

        let png = capture_primary(&source).unwrap();
        assert!(png.starts_with(&PNG_SIGNATURE));

        let decoded = decode(&png);
        assert_eq!(decoded.dimensions(), (4, 2));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([200, 100, 50, 255]));
    }

    #[test]
    fn test_capture_primary_without_displays() {
        let source = FakeSource::default();
        assert_eq!(capture_primary(&source), Err(BackendError::NoScreens));
    }

    #[test]
    fn test_capture_by_id() {
        let source = FakeSource::default()
            .with_display(3, true, [1, 1, 1, 255])
            .with_display(9, false, [9, 9, 9, 255]);

        let png = capture_by_id(&source, 9).unwrap();
        assert_eq!(decode(&png).get_pixel(1, 1), &Rgba([9, 9, 9, 255]));

        assert_eq!(capture_by_id(&source, 4), Err(BackendError::ScreenNotFound));
    }

    #[test]
    fn test_blank_capture_is_rejected() {
        let source = FakeSource::default().with_display(1, true, [0, 0, 0, 0]);

        let err = capture_primary(&source).unwrap_err();
        assert_eq!(err, BackendError::BlankImage);
        assert!(err.to_string().contains("Screen Recording permission"));
    }

    #[test]
    fn test_list_screens_keeps_order() {
        let source = FakeSource::default()
            .with_display(7, false, [1, 2, 3, 4])
            .with_display(3, true, [1, 2, 3, 4]);

        let ids: Vec<u32> = list_screens(&source).unwrap().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![7, 3]);
    }

    #[test]
    fn test_enumeration_failure_message() {
        let source = FakeSource {
            fail_list: true,
            ..Default::default()
        };

        let err = list_screens(&source).unwrap_err();
        assert_eq!(err.to_string(), "Failed to enumerate screens: no display server");
    }
}
