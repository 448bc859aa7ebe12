//! Binary resource encoding.
//!
//! Encodes the package manifest, resource table, layout, and launcher icon
//! into the binary forms the archive carries, and collects them into a
//! [`ResourceSet`] whose completeness is checked before archiving.

pub mod chunk;
pub mod icons;
pub mod layout;
pub mod manifest;
pub mod table;

pub use layout::LayoutResource;
pub use manifest::BinaryManifest;
pub use table::ResourceTable;

use crate::bundler::error::EncodingError;
use crate::bundler::spec::PackageSpec;

/// Archive entry name of the binary manifest.
pub const MANIFEST_ENTRY: &str = "manifest.bin";

/// Archive entry name of the resource table.
pub const RESOURCE_TABLE_ENTRY: &str = "resources.bin";

/// Archive entry name of the storefront layout.
pub const LAYOUT_ENTRY: &str = "res/layout/storefront.bin";

/// Archive entry name of the launcher icon.
pub const ICON_ENTRY: &str = "res/icon/launcher.png";

/// Entries every installable package must carry, beyond the code stub.
pub const REQUIRED_ENTRIES: &[&str] = &[
    MANIFEST_ENTRY,
    RESOURCE_TABLE_ENTRY,
    LAYOUT_ENTRY,
    ICON_ENTRY,
];

/// An ordered collection of named binary resource blobs.
#[derive(Debug, Default)]
pub struct ResourceSet {
    entries: Vec<(String, Vec<u8>)>,
}

impl ResourceSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes all resources for a validated spec.
    pub fn from_spec(spec: &PackageSpec) -> Result<Self, EncodingError> {
        let mut set = Self::new();
        set.insert(MANIFEST_ENTRY, BinaryManifest::from_spec(spec).encode()?)?;
        set.insert(RESOURCE_TABLE_ENTRY, ResourceTable::from_spec(spec).encode()?)?;
        set.insert(LAYOUT_ENTRY, LayoutResource::from_spec(spec).encode()?)?;
        set.insert(ICON_ENTRY, icons::render_launcher_icon(spec.primary_color())?)?;
        set.verify_complete(REQUIRED_ENTRIES)?;
        Ok(set)
    }

    /// Registers a named blob; names must be unique.
    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), EncodingError> {
        if self.entries.iter().any(|(n, _)| n == name) {
            return Err(EncodingError::DuplicateResource {
                name: name.to_string(),
            });
        }
        self.entries.push((name.to_string(), bytes));
        Ok(())
    }

    /// Returns the blob registered under `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
    }

    /// Number of registered blobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no blobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks that every name in `required` is present.
    pub fn verify_complete(&self, required: &[&str]) -> Result<(), EncodingError> {
        for name in required {
            if self.get(name).is_none() {
                return Err(EncodingError::MissingResource {
                    name: (*name).to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::spec::{validate, BuildRequest, InMemoryHistory};

    fn spec() -> PackageSpec {
        let request = BuildRequest {
            app_name: "Acme Shop".to_string(),
            package_id: "com.acme.shop".to_string(),
            version_name: "1.0.0".to_string(),
            version_code: 1,
            primary_color: "#3366FF".to_string(),
            secondary_color: "#FF9900".to_string(),
            api_base_url: "https://shop.acme.example/app".to_string(),
            store_id: "store-42".to_string(),
            store_name: "Acme".to_string(),
        };
        validate(&request, &InMemoryHistory::new()).expect("valid request")
    }

    #[test]
    fn from_spec_produces_every_required_entry() {
        let set = ResourceSet::from_spec(&spec()).expect("encode");
        assert_eq!(set.len(), REQUIRED_ENTRIES.len());
        for name in REQUIRED_ENTRIES {
            assert!(set.get(name).is_some(), "{name}");
        }

        let manifest = BinaryManifest::decode(set.get(MANIFEST_ENTRY).expect("manifest"))
            .expect("decodable manifest");
        assert_eq!(manifest.package_id, "com.acme.shop");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut set = ResourceSet::new();
        set.insert("a.bin", vec![1]).expect("first");
        assert!(matches!(
            set.insert("a.bin", vec![2]),
            Err(EncodingError::DuplicateResource { .. })
        ));
    }

    #[test]
    fn missing_required_entry_is_reported() {
        let set = ResourceSet::new();
        assert!(matches!(
            set.verify_complete(&[MANIFEST_ENTRY]),
            Err(EncodingError::MissingResource { .. })
        ));
    }
}
