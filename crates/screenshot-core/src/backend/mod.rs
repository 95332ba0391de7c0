//! Native backend loading and capability adaptation
//!
//! A backend is a dynamically loaded unit that exposes zero or more capture
//! functions under possibly inconsistent names. This module turns that loose
//! shape into a strongly typed operation table in three steps:
//!
//! 1. [`locator::BackendLocator`] builds an ordered list of candidates for
//!    the current platform and loads the first one that works.
//! 2. The loaded [`BackendModule`] answers symbol probes lazily.
//! 3. [`adapter::adapt`] probes each required capability once, under both
//!    accepted names, and produces [`adapter::CaptureOperations`].
//!
//! # Backend Shapes
//!
//! | Module | Source |
//! |--------|--------|
//! | [`native::NativeBackend`] | Shared library loaded with `libloading` |
//! | [`mock::MockBackend`] | In-process test double |

use std::fmt;
use std::sync::Arc;

use crate::model::ScreenInfo;

pub mod abi;
pub mod adapter;
pub mod locator;
pub mod mock;
pub mod native;

pub use adapter::{CapabilityKind, CaptureOperations, adapt};
pub use locator::{
    ArtifactLoader, ArtifactNaming, BackendCandidate, BackendLocator, CandidateFailure,
    CandidateTarget, LoadStrategy,
};
pub use mock::{MockBackend, MockLoader};
pub use native::{NativeBackend, NativeLoader};

/// Outcome of a raw backend call: the value or the backend's message
pub type BackendCallResult<T> = Result<T, String>;

/// Bound "capture primary display" function
pub type CapturePrimaryCall = Arc<dyn Fn() -> BackendCallResult<Vec<u8>> + Send + Sync>;

/// Bound "capture display by id" function
pub type CaptureByIdCall = Arc<dyn Fn(u32) -> BackendCallResult<Vec<u8>> + Send + Sync>;

/// Bound "list screens" function
pub type ListScreensCall = Arc<dyn Fn() -> BackendCallResult<Vec<ScreenInfo>> + Send + Sync>;

/// A function resolved from a backend, tagged with the capability it serves
#[derive(Clone)]
pub enum BoundCall {
    CapturePrimary(CapturePrimaryCall),
    CaptureById(CaptureByIdCall),
    ListScreens(ListScreensCall),
}

impl BoundCall {
    /// The capability this call implements
    pub fn kind(&self) -> CapabilityKind {
        match self {
            BoundCall::CapturePrimary(_) => CapabilityKind::CapturePrimary,
            BoundCall::CaptureById(_) => CapabilityKind::CaptureById,
            BoundCall::ListScreens(_) => CapabilityKind::ListScreens,
        }
    }

    pub fn into_capture_primary(self) -> Option<CapturePrimaryCall> {
        match self {
            BoundCall::CapturePrimary(call) => Some(call),
            _ => None,
        }
    }

    pub fn into_capture_by_id(self) -> Option<CaptureByIdCall> {
        match self {
            BoundCall::CaptureById(call) => Some(call),
            _ => None,
        }
    }

    pub fn into_list_screens(self) -> Option<ListScreensCall> {
        match self {
            BoundCall::ListScreens(call) => Some(call),
            _ => None,
        }
    }
}

impl fmt::Debug for BoundCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundCall({:?})", self.kind())
    }
}

/// A successfully loaded backend
///
/// Implementations are shared read-only by every caller after resolution and
/// must stay loaded for as long as any [`BoundCall`] they returned is alive.
pub trait BackendModule: Send + Sync {
    /// Where the backend was loaded from, for diagnostics
    fn location(&self) -> &str;

    /// Probes for a function named `name` implementing `kind`
    ///
    /// Returns `None` when the backend does not export that name. The caller
    /// decides which type the symbol is interpreted as through `kind`.
    fn symbol(&self, kind: CapabilityKind, name: &str) -> Option<BoundCall>;
}

impl fmt::Debug for dyn BackendModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendModule")
            .field("location", &self.location())
            .finish()
    }
}
