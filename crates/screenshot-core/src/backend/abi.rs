//! C ABI shared by backend artifacts and the loader
//!
//! Backends never hand owned memory across the boundary. Every exported
//! function receives an opaque `ctx` pointer and callbacks; the backend calls
//! back with borrowed data that is only valid for the duration of the
//! callback, and the caller copies what it needs.
//!
//! ```text
//! captureScreenshot(ctx, on_image, on_error) -> status
//! captureScreenshotByScreenId(screen_id, ctx, on_image, on_error) -> status
//! listScreens(ctx, on_screen, on_error) -> status
//! ```
//!
//! A status of [`STATUS_OK`] means success; anything else is a failure whose
//! message, if any, was delivered through `on_error` as UTF-8.

use std::ffi::c_void;
use std::slice;

use crate::model::ScreenInfo;

/// Call completed
pub const STATUS_OK: i32 = 0;

/// Call failed; the message went through the error callback
pub const STATUS_ERROR: i32 = 1;

/// Receives a borrowed byte buffer (image data or a UTF-8 error message)
pub type BytesCallback = unsafe extern "C" fn(ctx: *mut c_void, data: *const u8, len: usize);

/// Receives one borrowed screen record
pub type ScreenCallback = unsafe extern "C" fn(ctx: *mut c_void, info: *const RawScreenInfo);

/// `captureScreenshot` / `capture_screenshot`
pub type CapturePrimaryFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    on_image: BytesCallback,
    on_error: BytesCallback,
) -> i32;

/// `captureScreenshotByScreenId` / `capture_screenshot_by_screen_id`
pub type CaptureByIdFn = unsafe extern "C" fn(
    screen_id: u32,
    ctx: *mut c_void,
    on_image: BytesCallback,
    on_error: BytesCallback,
) -> i32;

/// `listScreens` / `list_screens`
pub type ListScreensFn = unsafe extern "C" fn(
    ctx: *mut c_void,
    on_screen: ScreenCallback,
    on_error: BytesCallback,
) -> i32;

/// Screen record as laid out across the ABI
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawScreenInfo {
    pub id:           u32,
    pub x:            i32,
    pub y:            i32,
    pub width:        u32,
    pub height:       u32,
    pub rotation:     i32,
    pub scale_factor: f64,
    pub frequency:    u32,
    pub is_primary:   bool,
}

impl From<RawScreenInfo> for ScreenInfo {
    fn from(raw: RawScreenInfo) -> Self {
        Self {
            id:           raw.id,
            x:            raw.x,
            y:            raw.y,
            width:        raw.width,
            height:       raw.height,
            rotation:     raw.rotation,
            scale_factor: raw.scale_factor,
            frequency:    raw.frequency,
            is_primary:   raw.is_primary,
        }
    }
}

impl From<&ScreenInfo> for RawScreenInfo {
    fn from(info: &ScreenInfo) -> Self {
        Self {
            id:           info.id,
            x:            info.x,
            y:            info.y,
            width:        info.width,
            height:       info.height,
            rotation:     info.rotation,
            scale_factor: info.scale_factor,
            frequency:    info.frequency,
            is_primary:   info.is_primary,
        }
    }
}

/// Caller-side accumulator handed to the backend as `ctx`
#[derive(Debug, Default)]
pub struct CallSink {
    image:   Option<Vec<u8>>,
    screens: Vec<ScreenInfo>,
    error:   Option<String>,
}

impl CallSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer to pass as the `ctx` argument
    pub fn as_ctx(&mut self) -> *mut c_void {
        (self as *mut CallSink).cast()
    }

    /// Interprets a capture call's status and collected output
    pub fn into_image(self, status: i32) -> Result<Vec<u8>, String> {
        if status != STATUS_OK {
            return Err(self.failure_message(status));
        }
        match self.image {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err("Native backend returned no image data".to_string()),
        }
    }

    /// Interprets a list call's status and collected output
    pub fn into_screens(self, status: i32) -> Result<Vec<ScreenInfo>, String> {
        if status != STATUS_OK {
            return Err(self.failure_message(status));
        }
        Ok(self.screens)
    }

    fn failure_message(&self, status: i32) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("Native backend call failed with status {status}"))
    }
}

/// [`BytesCallback`] storing image bytes into a [`CallSink`]
///
/// # Safety
///
/// `ctx` must come from [`CallSink::as_ctx`]; `data` must be valid for `len`
/// bytes or null.
pub unsafe extern "C" fn collect_image(ctx: *mut c_void, data: *const u8, len: usize) {
    let sink = unsafe { &mut *ctx.cast::<CallSink>() };
    sink.image = Some(unsafe { borrow_bytes(data, len) }.to_vec());
}

/// [`BytesCallback`] storing an error message into a [`CallSink`]
///
/// # Safety
///
/// Same contract as [`collect_image`].
pub unsafe extern "C" fn collect_error(ctx: *mut c_void, data: *const u8, len: usize) {
    let sink = unsafe { &mut *ctx.cast::<CallSink>() };
    let message = String::from_utf8_lossy(unsafe { borrow_bytes(data, len) }).into_owned();
    sink.error = Some(message);
}

/// [`ScreenCallback`] appending one screen to a [`CallSink`]
///
/// # Safety
///
/// `ctx` must come from [`CallSink::as_ctx`]; `info` must point to a valid
/// record or be null.
pub unsafe extern "C" fn collect_screen(ctx: *mut c_void, info: *const RawScreenInfo) {
    if info.is_null() {
        return;
    }
    let sink = unsafe { &mut *ctx.cast::<CallSink>() };
    sink.screens.push(ScreenInfo::from(unsafe { *info }));
}

unsafe fn borrow_bytes<'a>(data: *const u8, len: usize) -> &'a [u8] {
    if data.is_null() || len == 0 {
        &[]
    } else {
        unsafe { slice::from_raw_parts(data, len) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn echo_capture(
        ctx: *mut c_void,
        on_image: BytesCallback,
        _on_error: BytesCallback,
    ) -> i32 {
        let png = [0x89u8, b'P', b'N', b'G'];
        unsafe { on_image(ctx, png.as_ptr(), png.len()) };
        STATUS_OK
    }

    unsafe extern "C" fn failing_capture(
        screen_id: u32,
        ctx: *mut c_void,
        _on_image: BytesCallback,
        on_error: BytesCallback,
    ) -> i32 {
        let message = format!("Screen {screen_id} not found");
        unsafe { on_error(ctx, message.as_ptr(), message.len()) };
        STATUS_ERROR
    }

    unsafe extern "C" fn silent_capture(
        _ctx: *mut c_void,
        _on_image: BytesCallback,
        _on_error: BytesCallback,
    ) -> i32 {
        STATUS_OK
    }

    unsafe extern "C" fn two_screens(
        ctx: *mut c_void,
        on_screen: ScreenCallback,
        _on_error: BytesCallback,
    ) -> i32 {
        for id in [3u32, 1] {
            let record = RawScreenInfo {
                id,
                x: -(id as i32) * 100,
                y: 0,
                width: 640,
                height: 480,
                rotation: 0,
                scale_factor: 1.5,
                frequency: 75,
                is_primary: id == 1,
            };
            unsafe { on_screen(ctx, &record) };
        }
        unsafe { on_screen(ctx, std::ptr::null()) };
        STATUS_OK
    }

    #[test]
    fn test_sink_collects_image() {
        let mut sink = CallSink::new();
        let status = unsafe { echo_capture(sink.as_ctx(), collect_image, collect_error) };
        assert_eq!(sink.into_image(status).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_sink_reports_backend_message() {
        let mut sink = CallSink::new();
        let status = unsafe { failing_capture(42, sink.as_ctx(), collect_image, collect_error) };
        assert_eq!(sink.into_image(status).unwrap_err(), "Screen 42 not found");
    }

    #[test]
    fn test_sink_rejects_missing_image() {
        let mut sink = CallSink::new();
        let status = unsafe { silent_capture(sink.as_ctx(), collect_image, collect_error) };
        let err = sink.into_image(status).unwrap_err();
        assert!(err.contains("no image data"));
    }

    #[test]
    fn test_sink_status_without_message() {
        let sink = CallSink::new();
        let err = sink.into_image(7).unwrap_err();
        assert!(err.contains("status 7"));
    }

    #[test]
    fn test_sink_collects_screens_in_backend_order() {
        let mut sink = CallSink::new();
        let status = unsafe { two_screens(sink.as_ctx(), collect_screen, collect_error) };
        let screens = sink.into_screens(status).unwrap();

        assert_eq!(screens.len(), 2);
        assert_eq!(screens[0].id, 3);
        assert_eq!(screens[0].x, -300);
        assert_eq!(screens[1].id, 1);
        assert!(screens[1].is_primary);
        assert_eq!(screens[1].scale_factor, 1.5);
    }

    #[test]
    fn test_raw_screen_info_conversion() {
        let info = ScreenInfo {
            id:           9,
            x:            10,
            y:            -20,
            width:        100,
            height:       200,
            rotation:     270,
            scale_factor: 1.25,
            frequency:    144,
            is_primary:   false,
        };

        let raw = RawScreenInfo::from(&info);
        assert_eq!(ScreenInfo::from(raw), info);
    }
}
