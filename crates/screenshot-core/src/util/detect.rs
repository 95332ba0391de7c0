//! Platform detection for backend artifact selection
//!
//! This module maps the raw operating system and CPU architecture identifiers
//! of the running process onto a [`PlatformDescriptor`]. Identifiers outside
//! the fixed supported set map to `Unsupported`; detection itself never fails.
//! Whether an unsupported platform is fatal is decided by the backend locator.

use std::env::consts;

use crate::model::{Arch, Os, PlatformDescriptor};

/// Describes the platform this process is running on
///
/// Deterministic and side-effect free: it only reads the compile-time
/// constants of the standard library.
///
/// # Examples
///
/// ```
/// use screenshot_core::util::detect::describe;
///
/// let platform = describe();
/// println!("Running on: {}", platform);
/// ```
pub fn describe() -> PlatformDescriptor {
    describe_from(consts::OS, consts::ARCH)
}

/// Maps raw OS and architecture identifiers onto a [`PlatformDescriptor`]
///
/// Accepts both Rust target names (`macos`, `x86_64`, `aarch64`) and the
/// Node.js-style names used by prebuilt binary packages (`darwin`, `win32`,
/// `x64`, `arm64`).
pub fn describe_from(os: &str, arch: &str) -> PlatformDescriptor {
    PlatformDescriptor::new(map_os(os), map_arch(arch))
}

fn map_os(raw: &str) -> Os {
    match raw.trim().to_ascii_lowercase().as_str() {
        "macos" | "darwin" => Os::Darwin,
        "linux" => Os::Linux,
        "windows" | "win32" => Os::Windows,
        _ => Os::Unsupported,
    }
}

fn map_arch(raw: &str) -> Arch {
    match raw.trim().to_ascii_lowercase().as_str() {
        "x86_64" | "x64" | "amd64" => Arch::X64,
        "aarch64" | "arm64" => Arch::Arm64,
        _ => Arch::Unsupported,
    }
}
