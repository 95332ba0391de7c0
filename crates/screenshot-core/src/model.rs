//! Data models and type definitions for screenshot-core
//!
//! This module defines the core types used throughout the library:
//! - Platform descriptor types (operating system and CPU architecture)
//! - Screen metadata returned by enumeration
//! - Image artifacts returned by capture operations

use std::fmt;
use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Media type attached to every captured image
pub const MEDIA_TYPE_PNG: &str = "image/png";

/// The eight-byte signature every PNG stream starts with
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Normalized operating system of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// macOS
    Darwin,
    /// Linux (any libc)
    Linux,
    /// Windows
    Windows,
    /// Anything outside the fixed supported set
    Unsupported,
}

impl Os {
    /// Returns the operating system as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
            Os::Unsupported => "unsupported",
        }
    }

    /// Whether backend artifacts can exist for this operating system
    pub fn is_supported(&self) -> bool {
        !matches!(self, Os::Unsupported)
    }

    /// File extension of a dynamically loadable library on this OS
    pub fn library_extension(&self) -> Option<&'static str> {
        match self {
            Os::Darwin => Some("dylib"),
            Os::Linux => Some("so"),
            Os::Windows => Some("dll"),
            Os::Unsupported => None,
        }
    }

    /// File name prefix the platform's toolchains put on shared libraries
    pub fn library_prefix(&self) -> &'static str {
        match self {
            Os::Darwin | Os::Linux => "lib",
            Os::Windows | Os::Unsupported => "",
        }
    }

    /// Conventional shared library file name for `name`, e.g.
    /// `libscreenshot_rs.so` on Linux or `screenshot_rs.dll` on Windows.
    pub fn library_filename(&self, name: &str) -> Option<String> {
        self.library_extension()
            .map(|ext| format!("{}{}.{}", self.library_prefix(), name, ext))
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized CPU architecture of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86_64 / amd64
    X64,
    /// aarch64
    Arm64,
    /// Anything outside the fixed supported set
    Unsupported,
}

impl Arch {
    /// Returns the architecture as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
            Arch::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Arch::Unsupported)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized (OS, architecture) pair used to pick backend artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PlatformDescriptor {
    pub os:   Os,
    pub arch: Arch,
}

impl PlatformDescriptor {
    /// Creates a new PlatformDescriptor instance
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Both axes are inside the supported set
    pub fn is_fully_supported(&self) -> bool {
        self.os.is_supported() && self.arch.is_supported()
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Geometry and metadata of one connected display
///
/// The `id` is assigned by the backend and is only meaningful within the
/// enumeration call that produced it. Ordering of a screen list is whatever
/// the backend returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScreenInfo {
    /// Backend-assigned display identifier
    pub id:           u32,
    /// Left edge in virtual desktop coordinates
    pub x:            i32,
    /// Top edge in virtual desktop coordinates
    pub y:            i32,
    /// Width in pixels
    pub width:        u32,
    /// Height in pixels
    pub height:       u32,
    /// Rotation in degrees (0, 90, 180 or 270)
    pub rotation:     i32,
    /// Backing-store to logical pixel ratio
    pub scale_factor: f64,
    /// Refresh rate in Hz, 0 if unknown
    pub frequency:    u32,
    /// Whether the OS designates this display as the main one
    pub is_primary:   bool,
}

impl fmt::Display for ScreenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}x{} at ({}, {}) scale {} rot {} {}Hz{}",
            self.id,
            self.width,
            self.height,
            self.x,
            self.y,
            self.scale_factor,
            self.rotation,
            self.frequency,
            if self.is_primary { " [primary]" } else { "" }
        )
    }
}

/// A captured screenshot: PNG bytes tagged with their media type
///
/// The bytes are passed through from the backend untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    bytes: Vec<u8>,
}

impl ImageArtifact {
    /// Wraps raw PNG bytes produced by a backend
    pub fn png(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Always [`MEDIA_TYPE_PNG`]
    pub fn media_type(&self) -> &'static str {
        MEDIA_TYPE_PNG
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the payload starts with the PNG signature
    pub fn has_png_signature(&self) -> bool {
        self.bytes.starts_with(&PNG_SIGNATURE)
    }

    /// Encodes the image as a `data:` URL
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type(), BASE64.encode(&self.bytes))
    }

    /// Writes the PNG bytes to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

impl fmt::Debug for ImageArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageArtifact")
            .field("media_type", &self.media_type())
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_screen() -> ScreenInfo {
        ScreenInfo {
            id:           7,
            x:            -1920,
            y:            0,
            width:        1920,
            height:       1080,
            rotation:     90,
            scale_factor: 2.0,
            frequency:    60,
            is_primary:   true,
        }
    }

    #[test]
    fn test_os_serialization() {
        assert_eq!(serde_json::to_string(&Os::Darwin).unwrap(), r#""darwin""#);
        assert_eq!(serde_json::to_string(&Os::Linux).unwrap(), r#""linux""#);
        assert_eq!(serde_json::to_string(&Os::Windows).unwrap(), r#""windows""#);
        assert_eq!(serde_json::to_string(&Os::Unsupported).unwrap(), r#""unsupported""#);
    }

    #[test]
    fn test_arch_as_str() {
        assert_eq!(Arch::X64.as_str(), "x64");
        assert_eq!(Arch::Arm64.as_str(), "arm64");
        assert_eq!(Arch::Unsupported.as_str(), "unsupported");
    }

    #[test]
    fn test_library_filename_per_os() {
        assert_eq!(
            Os::Linux.library_filename("screenshot_rs").as_deref(),
            Some("libscreenshot_rs.so")
        );
        assert_eq!(
            Os::Darwin.library_filename("screenshot_rs").as_deref(),
            Some("libscreenshot_rs.dylib")
        );
        assert_eq!(
            Os::Windows.library_filename("screenshot_rs").as_deref(),
            Some("screenshot_rs.dll")
        );
        assert_eq!(Os::Unsupported.library_filename("screenshot_rs"), None);
    }

    #[test]
    fn test_platform_descriptor_display() {
        let descriptor = PlatformDescriptor::new(Os::Darwin, Arch::Arm64);
        assert_eq!(descriptor.to_string(), "darwin-arm64");
        assert!(descriptor.is_fully_supported());

        let partial = PlatformDescriptor::new(Os::Linux, Arch::Unsupported);
        assert!(!partial.is_fully_supported());
    }

    #[test]
    fn test_screen_info_uses_camel_case() {
        let json = serde_json::to_value(sample_screen()).unwrap();
        assert_eq!(json["scaleFactor"], 2.0);
        assert_eq!(json["isPrimary"], true);
        assert_eq!(json["x"], -1920);
        assert!(json.get("scale_factor").is_none());
    }

    #[test]
    fn test_screen_info_deserialization() {
        let json = r#"{"id":1,"x":0,"y":0,"width":800,"height":600,"rotation":0,
                       "scaleFactor":1.0,"frequency":0,"isPrimary":false}"#;
        let info: ScreenInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.width, 800);
        assert_eq!(info.frequency, 0);
        assert!(!info.is_primary);
    }

    #[test]
    fn test_screen_info_display_marks_primary() {
        let text = sample_screen().to_string();
        assert!(text.starts_with("#7 1920x1080"));
        assert!(text.contains("[primary]"));
    }

    #[test]
    fn test_artifact_media_type_is_fixed() {
        let artifact = ImageArtifact::png(b"not really a png".to_vec());
        assert_eq!(artifact.media_type(), "image/png");
        assert!(!artifact.has_png_signature());

        let empty = ImageArtifact::png(Vec::new());
        assert_eq!(empty.media_type(), MEDIA_TYPE_PNG);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_artifact_data_url() {
        let artifact = ImageArtifact::png(PNG_SIGNATURE.to_vec());
        assert!(artifact.has_png_signature());
        assert_eq!(artifact.to_data_url(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_artifact_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        let artifact = ImageArtifact::png(PNG_SIGNATURE.to_vec());

        artifact.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), PNG_SIGNATURE.to_vec());
    }

    #[test]
    fn test_artifact_debug_hides_bytes() {
        let artifact = ImageArtifact::png(vec![1, 2, 3]);
        let debug = format!("{:?}", artifact);
        assert!(debug.contains("image/png"));
        assert!(debug.contains("len: 3"));
    }

    #[test]
    fn test_json_schema_generation() {
        let _screen_schema = schemars::schema_for!(ScreenInfo);
        let _platform_schema = schemars::schema_for!(PlatformDescriptor);
    }
}
