//! Build-request model and canonical package spec.
//!
//! A [`BuildRequest`] is the raw branding/build document a vendor submits
//! (typically JSON). The validator in [`validate`] normalizes it into a
//! [`PackageSpec`], the read-only configuration every downstream pipeline
//! component consumes.

mod validate;

pub use validate::validate;

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use url::Url;

/// Raw branding and build parameters for one package build.
///
/// Field values are unchecked here; only the validator turns a request into
/// a [`PackageSpec`].
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRequest {
    /// Display name shown under the launcher icon.
    pub app_name: String,

    /// Reverse-DNS package identifier, e.g. `com.vendor.store`.
    pub package_id: String,

    /// Human-readable version string, e.g. "2.4.0".
    pub version_name: String,

    /// Monotonically increasing build number per `package_id`.
    pub version_code: u32,

    /// Brand primary color as a `#RRGGBB` hex triplet.
    pub primary_color: String,

    /// Brand secondary/accent color as a `#RRGGBB` hex triplet.
    pub secondary_color: String,

    /// Absolute URL the packaged app's content host loads.
    pub api_base_url: String,

    /// Identifier of the store this build belongs to.
    pub store_id: String,

    /// Display name of the store, for provenance.
    pub store_name: String,
}

/// An opaque RGB color parsed from a `#RRGGBB` triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Packs the color into 0xAARRGGBB form with a fully opaque alpha.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Canonical, validated build configuration.
///
/// Constructed only by [`validate`]; consumed once per build and never
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct PackageSpec {
    app_name: String,
    package_id: String,
    version_name: String,
    version_code: u32,
    primary_color: Rgb,
    secondary_color: Rgb,
    api_base_url: Url,
    store_id: String,
    store_name: String,
}

impl PackageSpec {
    /// Returns the display name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the package identifier.
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Returns the human-readable version string.
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    /// Returns the build number.
    pub fn version_code(&self) -> u32 {
        self.version_code
    }

    /// Returns the brand primary color.
    pub fn primary_color(&self) -> Rgb {
        self.primary_color
    }

    /// Returns the brand secondary color.
    pub fn secondary_color(&self) -> Rgb {
        self.secondary_color
    }

    /// Returns the URL the packaged content host loads.
    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    /// Returns the owning store's identifier.
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Returns the owning store's display name.
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Fully qualified class name of the branded host activity.
    pub fn activity_class(&self) -> String {
        format!("{}.StoreActivity", self.package_id)
    }

    pub(super) fn new(
        app_name: String,
        package_id: String,
        version_name: String,
        version_code: u32,
        primary_color: Rgb,
        secondary_color: Rgb,
        api_base_url: Url,
        store_id: String,
        store_name: String,
    ) -> Self {
        Self {
            app_name,
            package_id,
            version_name,
            version_code,
            primary_color,
            secondary_color,
            api_base_url,
            store_id,
            store_name,
        }
    }
}

/// Version-code history lookup, owned by the surrounding platform.
///
/// The storefront service records the last published `version_code` per
/// `package_id`; this subsystem only consults it. Implementations must
/// serialize lookups for the same `package_id` with respect to recording,
/// so the monotonic version-code invariant holds across concurrent builds.
pub trait VersionHistory: Send + Sync {
    /// Last successfully published version code for `package_id`, if any.
    fn last_version_code(&self, package_id: &str) -> Option<u32>;
}

/// In-memory [`VersionHistory`] backed by a mutex-guarded map.
///
/// Suitable for tests and one-shot CLI builds where the real build-history
/// store is not available.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    codes: Mutex<HashMap<String, u32>>,
}

impl InMemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` as the last published version for `package_id`.
    pub fn record(&self, package_id: &str, code: u32) {
        let mut codes = self.codes.lock().expect("history lock poisoned");
        codes.insert(package_id.to_string(), code);
    }
}

impl VersionHistory for InMemoryHistory {
    fn last_version_code(&self, package_id: &str) -> Option<u32> {
        let codes = self.codes.lock().expect("history lock poisoned");
        codes.get(package_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_packs_opaque() {
        let c = Rgb { r: 0x12, g: 0x34, b: 0x56 };
        assert_eq!(c.to_argb(), 0xFF12_3456);
        assert_eq!(c.to_string(), "#123456");
    }

    #[test]
    fn history_records_and_looks_up() {
        let history = InMemoryHistory::new();
        assert_eq!(history.last_version_code("com.acme.shop"), None);
        history.record("com.acme.shop", 7);
        assert_eq!(history.last_version_code("com.acme.shop"), Some(7));
    }
}
