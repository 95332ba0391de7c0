//! screenshot_rs: reference native backend
//!
//! Built as a shared library exporting the call-style capture functions that
//! `screenshot_core::backend` probes for. The calling convention is described
//! in [`screenshot_core::backend::abi`]:
//!
//! | Export | Result |
//! |--------|--------|
//! | `captureScreenshot` | PNG of the primary display |
//! | `captureScreenshotByScreenId` | PNG of the display with the given id |
//! | `listScreens` | One screen record per display |
//!
//! No panic crosses the boundary; it is reported through the error callback.

use std::any::Any;
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use screenshot_core::backend::abi::{
    BytesCallback, RawScreenInfo, STATUS_ERROR, STATUS_OK, ScreenCallback,
};
use screenshot_core::model::ScreenInfo;

pub mod capture;
pub mod monitor;

use capture::BackendError;
use monitor::XcapSource;

/// Captures the primary display
///
/// # Safety
///
/// The callbacks must be valid for `ctx`. They are invoked synchronously
/// before this function returns.
#[unsafe(export_name = "captureScreenshot")]
pub unsafe extern "C" fn capture_screenshot(
    ctx: *mut c_void,
    on_image: BytesCallback,
    on_error: BytesCallback,
) -> i32 {
    let outcome = guarded(|| capture::capture_primary(&XcapSource));
    unsafe { deliver_image(outcome, ctx, on_image, on_error) }
}

/// Captures the display with `screen_id`
///
/// # Safety
///
/// Same contract as [`capture_screenshot`].
#[unsafe(export_name = "captureScreenshotByScreenId")]
pub unsafe extern "C" fn capture_screenshot_by_screen_id(
    screen_id: u32,
    ctx: *mut c_void,
    on_image: BytesCallback,
    on_error: BytesCallback,
) -> i32 {
    let outcome = guarded(|| capture::capture_by_id(&XcapSource, screen_id));
    unsafe { deliver_image(outcome, ctx, on_image, on_error) }
}

/// Enumerates connected displays
///
/// # Safety
///
/// Same contract as [`capture_screenshot`].
#[unsafe(export_name = "listScreens")]
pub unsafe extern "C" fn list_screens(
    ctx: *mut c_void,
    on_screen: ScreenCallback,
    on_error: BytesCallback,
) -> i32 {
    let outcome = guarded(|| capture::list_screens(&XcapSource));
    unsafe { deliver_screens(outcome, ctx, on_screen, on_error) }
}

fn guarded<T>(call: impl FnOnce() -> Result<T, BackendError>) -> Result<T, BackendError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(BackendError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

unsafe fn deliver_image(
    outcome: Result<Vec<u8>, BackendError>,
    ctx: *mut c_void,
    on_image: BytesCallback,
    on_error: BytesCallback,
) -> i32 {
    match outcome {
        Ok(png) => {
            unsafe { on_image(ctx, png.as_ptr(), png.len()) };
            STATUS_OK
        }
        Err(e) => unsafe { deliver_error(&e, ctx, on_error) },
    }
}

unsafe fn deliver_screens(
    outcome: Result<Vec<ScreenInfo>, BackendError>,
    ctx: *mut c_void,
    on_screen: ScreenCallback,
    on_error: BytesCallback,
) -> i32 {
    match outcome {
        Ok(screens) => {
            for screen in &screens {
                let record = RawScreenInfo::from(screen);
                unsafe { on_screen(ctx, &record) };
            }
            STATUS_OK
        }
        Err(e) => unsafe { deliver_error(&e, ctx, on_error) },
    }
}

unsafe fn deliver_error(error: &BackendError, ctx: *mut c_void, on_error: BytesCallback) -> i32 {
    tracing::debug!("Backend call failed: {}", error);
    let message = error.to_string();
    unsafe { on_error(ctx, message.as_ptr(), message.len()) };
    STATUS_ERROR
}
