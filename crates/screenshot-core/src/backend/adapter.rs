//! Capability probing and the typed operation table
//!
//! Backends are produced by a separate build pipeline whose naming convention
//! may not match this library's. Every required capability is therefore
//! accepted under two names, a call-style name and a declaration-style name:
//!
//! | Capability | Call-style | Declaration-style |
//! |------------|------------|-------------------|
//! | [`CapabilityKind::CapturePrimary`] | `captureScreenshot` | `capture_screenshot` |
//! | [`CapabilityKind::CaptureById`] | `captureScreenshotByScreenId` | `capture_screenshot_by_screen_id` |
//! | [`CapabilityKind::ListScreens`] | `listScreens` | `list_screens` |
//!
//! [`adapt`] probes each capability once, in table order, and fails on the
//! first one missing under both names. It never returns a partial table.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::{
    BackendCallResult, BackendModule, BoundCall, CaptureByIdCall, CapturePrimaryCall,
    ListScreensCall,
};
use crate::error::{CaptureError, CaptureResult};
use crate::model::ScreenInfo;

/// A named operation a backend may or may not expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    CapturePrimary,
    CaptureById,
    ListScreens,
}

impl CapabilityKind {
    /// Required capabilities in probe order
    pub const REQUIRED: [CapabilityKind; 3] = [
        CapabilityKind::CapturePrimary,
        CapabilityKind::CaptureById,
        CapabilityKind::ListScreens,
    ];

    /// Call-style symbol name, probed first
    pub fn call_name(&self) -> &'static str {
        match self {
            CapabilityKind::CapturePrimary => "captureScreenshot",
            CapabilityKind::CaptureById => "captureScreenshotByScreenId",
            CapabilityKind::ListScreens => "listScreens",
        }
    }

    /// Declaration-style symbol name, probed second
    pub fn declaration_name(&self) -> &'static str {
        match self {
            CapabilityKind::CapturePrimary => "capture_screenshot",
            CapabilityKind::CaptureById => "capture_screenshot_by_screen_id",
            CapabilityKind::ListScreens => "list_screens",
        }
    }

    /// Both accepted names in probe order
    pub fn names(&self) -> [&'static str; 2] {
        [self.call_name(), self.declaration_name()]
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.call_name())
    }
}

/// Strongly typed operations bound from a backend
///
/// Built once by [`adapt`]; names are never re-probed per call. Blocking
/// backend calls run on tokio's blocking pool. When a call gate is present,
/// at most one backend call is in flight at a time.
pub struct CaptureOperations {
    backend:         Arc<dyn BackendModule>,
    capture_primary: CapturePrimaryCall,
    capture_by_id:   CaptureByIdCall,
    list_screens:    ListScreensCall,
    bound_names:     [&'static str; 3],
    gate:            Option<Arc<Semaphore>>,
}

/// Probes `backend` for every required capability
///
/// With `serialize_calls` set, backend calls are funneled through a
/// single-permit gate.
pub fn adapt(
    backend: Arc<dyn BackendModule>,
    serialize_calls: bool,
) -> CaptureResult<CaptureOperations> {
    let (primary_name, capture_primary) = bind_capability(
        backend.as_ref(),
        CapabilityKind::CapturePrimary,
        BoundCall::into_capture_primary,
    )?;
    let (by_id_name, capture_by_id) = bind_capability(
        backend.as_ref(),
        CapabilityKind::CaptureById,
        BoundCall::into_capture_by_id,
    )?;
    let (list_name, list_screens) = bind_capability(
        backend.as_ref(),
        CapabilityKind::ListScreens,
        BoundCall::into_list_screens,
    )?;

    tracing::debug!(
        "Adapted backend {}: {}, {}, {}",
        backend.location(),
        primary_name,
        by_id_name,
        list_name
    );

    Ok(CaptureOperations {
        backend,
        capture_primary,
        capture_by_id,
        list_screens,
        bound_names: [primary_name, by_id_name, list_name],
        gate: serialize_calls.then(|| Arc::new(Semaphore::new(1))),
    })
}

/// Binds the first accepted name for `kind`, typed by `extract`
fn bind_capability<T>(
    backend: &dyn BackendModule,
    kind: CapabilityKind,
    extract: fn(BoundCall) -> Option<T>,
) -> CaptureResult<(&'static str, T)> {
    for name in kind.names() {
        let Some(call) = backend.symbol(kind, name) else {
            tracing::debug!("Backend does not export {}", name);
            continue;
        };
        let bound_kind = call.kind();
        match extract(call) {
            Some(typed) => return Ok((name, typed)),
            None => tracing::warn!("Symbol {} resolved to {:?}, expected {:?}", name, bound_kind, kind),
        }
    }
    Err(missing(kind))
}

fn missing(kind: CapabilityKind) -> CaptureError {
    CaptureError::MissingCapability {
        name:      kind.call_name(),
        alternate: kind.declaration_name(),
    }
}

impl CaptureOperations {
    /// The backend these operations were bound from
    pub fn backend(&self) -> &Arc<dyn BackendModule> {
        &self.backend
    }

    /// Symbol names that were bound, in [`CapabilityKind::REQUIRED`] order
    pub fn bound_names(&self) -> [&'static str; 3] {
        self.bound_names
    }

    /// Whether backend calls are serialized
    pub fn is_serialized(&self) -> bool {
        self.gate.is_some()
    }

    /// Captures the primary display, returning raw PNG bytes
    pub async fn capture_primary(&self) -> BackendCallResult<Vec<u8>> {
        let call = Arc::clone(&self.capture_primary);
        self.run(move || call()).await
    }

    /// Captures the display with `screen_id`, returning raw PNG bytes
    pub async fn capture_by_id(&self, screen_id: u32) -> BackendCallResult<Vec<u8>> {
        let call = Arc::clone(&self.capture_by_id);
        self.run(move || call(screen_id)).await
    }

    /// Enumerates displays in backend order
    pub async fn list_screens(&self) -> BackendCallResult<Vec<ScreenInfo>> {
        let call = Arc::clone(&self.list_screens);
        self.run(move || call()).await
    }

    async fn run<T, F>(&self, call: F) -> BackendCallResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> BackendCallResult<T> + Send + 'static,
    {
        let permit = match &self.gate {
            Some(gate) => Some(
                Arc::clone(gate)
                    .acquire_owned()
                    .await
                    .map_err(|e| format!("Backend call gate closed: {e}"))?,
            ),
            None => None,
        };

        tokio::task::spawn_blocking(move || {
            // Released when the blocking call returns, even if the caller
            // stopped waiting.
            let _permit = permit;
            call()
        })
        .await
        .map_err(|e| format!("Native backend call aborted: {e}"))?
    }
}

impl fmt::Debug for CaptureOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOperations")
            .field("location", &self.backend.location())
            .field("bound_names", &self.bound_names)
            .field("serialized", &self.gate.is_some())
            .finish()
    }
}
