//! In-process test doubles for backends and loaders
//!
//! [`MockBackend`] stands in for a loaded shared library: it exports a
//! configurable set of symbol names, serves synthetic PNG payloads and a
//! fixed screen list, and counts how it is called. [`MockLoader`] stands in
//! for the dynamic loader: it returns scripted outcomes per
//! [`LoadStrategy`] and counts load attempts.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use screenshot_core::backend::{BackendLocator, LoadStrategy, MockBackend, MockLoader};
//! use screenshot_core::config::CaptureConfig;
//! use screenshot_core::util::detect::describe_from;
//!
//! let loader = Arc::new(
//!     MockLoader::new().with_backend(LoadStrategy::LocalBuildArtifact, MockBackend::new()),
//! );
//! let locator = BackendLocator::with_loader(
//!     describe_from("linux", "x86_64"),
//!     &CaptureConfig::default(),
//!     loader.clone(),
//! );
//!
//! assert!(locator.resolve().is_ok());
//! assert_eq!(loader.attempts(), 3);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::locator::{ArtifactLoader, BackendCandidate, LoadStrategy};
use super::{BackendCallResult, BackendModule, BoundCall, CapabilityKind};
use crate::model::{PNG_SIGNATURE, ScreenInfo};

/// Mock backend for testing
///
/// By default it exports every capability under its call-style name and
/// reports two screens: id 1 (primary, 1920x1080) and id 2 (2560x1440, to
/// the right of the primary).
#[derive(Debug)]
pub struct MockBackend {
    exports:       Vec<String>,
    screens:       Vec<ScreenInfo>,
    delay:         Option<Duration>,
    image:         Option<Vec<u8>>,
    capture_error: Option<String>,
    list_error:    Option<String>,
    probed:        Mutex<Vec<String>>,
    counters:      Arc<CallCounters>,
}

#[derive(Debug, Default)]
struct CallCounters {
    calls:         AtomicUsize,
    in_flight:     AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallCounters {
    fn track<T>(&self, delay: Option<Duration>, call: impl FnOnce() -> T) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        let result = call();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        result
    }
}

impl MockBackend {
    /// Creates a mock exporting all call-style names
    pub fn new() -> Self {
        Self::with_exports(&CapabilityKind::REQUIRED.map(|kind| kind.call_name()))
    }

    /// Creates a mock exporting exactly `names`
    pub fn with_exports(names: &[&str]) -> Self {
        Self {
            exports:       names.iter().map(|name| name.to_string()).collect(),
            screens:       Self::default_screens(),
            delay:         None,
            image:         None,
            capture_error: None,
            list_error:    None,
            probed:        Mutex::new(Vec::new()),
            counters:      Arc::new(CallCounters::default()),
        }
    }

    /// Replaces the reported screens
    pub fn with_screens(mut self, screens: Vec<ScreenInfo>) -> Self {
        self.screens = screens;
        self
    }

    /// Makes every backend call block for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serves `bytes` from every successful capture instead of [`Self::png_for`]
    pub fn with_image(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.image = Some(bytes.into());
        self
    }

    /// Makes every capture call fail with `message`
    pub fn with_capture_error(mut self, message: impl Into<String>) -> Self {
        self.capture_error = Some(message.into());
        self
    }

    /// Makes every list call fail with `message`
    pub fn with_list_error(mut self, message: impl Into<String>) -> Self {
        self.list_error = Some(message.into());
        self
    }

    /// Names probed through [`BackendModule::symbol`], in order
    pub fn probed_names(&self) -> Vec<String> {
        self.probed.lock().clone()
    }

    /// Completed backend calls
    pub fn calls(&self) -> usize {
        self.counters.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running backend calls observed
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    /// Synthetic PNG payload served for `screen_id`
    pub fn png_for(screen_id: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"MOCK");
        bytes.extend_from_slice(&screen_id.to_be_bytes());
        bytes
    }

    fn default_screens() -> Vec<ScreenInfo> {
        vec![
            ScreenInfo {
                id:           1,
                x:            0,
                y:            0,
                width:        1920,
                height:       1080,
                rotation:     0,
                scale_factor: 1.0,
                frequency:    60,
                is_primary:   true,
            },
            ScreenInfo {
                id:           2,
                x:            1920,
                y:            0,
                width:        2560,
                height:       1440,
                rotation:     0,
                scale_factor: 2.0,
                frequency:    144,
                is_primary:   false,
            },
        ]
    }

    fn primary_id(screens: &[ScreenInfo]) -> BackendCallResult<u32> {
        screens
            .iter()
            .find(|s| s.is_primary)
            .or_else(|| screens.first())
            .map(|s| s.id)
            .ok_or_else(|| "No screens found".to_string())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendModule for MockBackend {
    fn location(&self) -> &str {
        "mock"
    }

    fn symbol(&self, kind: CapabilityKind, name: &str) -> Option<BoundCall> {
        self.probed.lock().push(name.to_string());
        if !self.exports.iter().any(|export| export == name) {
            return None;
        }

        let counters = Arc::clone(&self.counters);
        let delay = self.delay;
        let screens = self.screens.clone();

        let bound = match kind {
            CapabilityKind::CapturePrimary => {
                let error = self.capture_error.clone();
                let image = self.image.clone();
                BoundCall::CapturePrimary(Arc::new(move || {
                    counters.track(delay, || match &error {
                        Some(message) => Err(message.clone()),
                        None => Self::primary_id(&screens)
                            .map(|id| image.clone().unwrap_or_else(|| Self::png_for(id))),
                    })
                }))
            }
            CapabilityKind::CaptureById => {
                let error = self.capture_error.clone();
                let image = self.image.clone();
                BoundCall::CaptureById(Arc::new(move |screen_id: u32| {
                    counters.track(delay, || {
                        if let Some(message) = &error {
                            return Err(message.clone());
                        }
                        screens
                            .iter()
                            .find(|s| s.id == screen_id)
                            .map(|s| image.clone().unwrap_or_else(|| Self::png_for(s.id)))
                            .ok_or_else(|| "Screen not found".to_string())
                    })
                }))
            }
            CapabilityKind::ListScreens => {
                let error = self.list_error.clone();
                BoundCall::ListScreens(Arc::new(move || {
                    counters.track(delay, || match &error {
                        Some(message) => Err(message.clone()),
                        None => Ok(screens.clone()),
                    })
                }))
            }
        };
        Some(bound)
    }
}

/// Mock artifact loader with scripted per-strategy outcomes
///
/// Strategies without a scripted outcome fail with a "no artifact" reason.
#[derive(Default)]
pub struct MockLoader {
    outcomes:  HashMap<LoadStrategy, Result<Arc<MockBackend>, String>>,
    delay:     Option<Duration>,
    attempts:  AtomicUsize,
    attempted: Mutex<Vec<LoadStrategy>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates of `strategy` load `backend`
    pub fn with_backend(
        mut self,
        strategy: LoadStrategy,
        backend: impl Into<Arc<MockBackend>>,
    ) -> Self {
        self.outcomes.insert(strategy, Ok(backend.into()));
        self
    }

    /// Candidates of `strategy` fail with `reason`
    pub fn with_failure(mut self, strategy: LoadStrategy, reason: impl Into<String>) -> Self {
        self.outcomes.insert(strategy, Err(reason.into()));
        self
    }

    /// Makes every load attempt block for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of load attempts so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Strategies attempted, in order
    pub fn attempted_strategies(&self) -> Vec<LoadStrategy> {
        self.attempted.lock().clone()
    }
}

impl ArtifactLoader for MockLoader {
    fn load(&self, candidate: &BackendCandidate) -> Result<Arc<dyn BackendModule>, String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.attempted.lock().push(candidate.strategy);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        match self.outcomes.get(&candidate.strategy) {
            Some(Ok(backend)) => Ok(Arc::clone(backend) as Arc<dyn BackendModule>),
            Some(Err(reason)) => Err(reason.clone()),
            None => Err(format!("mock: no artifact at {}", candidate.location_hint())),
        }
    }
}
