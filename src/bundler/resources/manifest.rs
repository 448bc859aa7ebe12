//! Binary package manifest.
//!
//! The manifest chunk identifies the package, its version, the platform
//! levels it supports, the capabilities it declares, and the single branded
//! activity entry point. All strings live in a nested pool; attributes map
//! fixed ids to pool indices or literals.

use super::chunk::{self, AttrValue, ChunkType, StringPool};
use crate::bundler::error::EncodingError;
use crate::bundler::spec::PackageSpec;
use bytes::{Buf, BufMut, BytesMut};

/// Lowest platform level the packaged app installs on.
pub const MIN_PLATFORM_LEVEL: u32 = 23;

/// Platform level the packaged app targets.
pub const TARGET_PLATFORM_LEVEL: u32 = 34;

/// Capability name for outbound network access.
pub const CAP_NETWORK: &str = "network";

const ATTR_PACKAGE_ID: u32 = 0x0001;
const ATTR_VERSION_CODE: u32 = 0x0002;
const ATTR_VERSION_NAME: u32 = 0x0003;
const ATTR_MIN_PLATFORM: u32 = 0x0004;
const ATTR_TARGET_PLATFORM: u32 = 0x0005;
const ATTR_APP_LABEL: u32 = 0x0006;
const ATTR_ACTIVITY: u32 = 0x0007;
const ATTR_CAPABILITY: u32 = 0x0008;

/// Decoded form of the manifest chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryManifest {
    /// Package identifier.
    pub package_id: String,
    /// Build number.
    pub version_code: u32,
    /// Human-readable version.
    pub version_name: String,
    /// Minimum supported platform level.
    pub min_platform: u32,
    /// Targeted platform level.
    pub target_platform: u32,
    /// Display label.
    pub app_label: String,
    /// Fully qualified entry-point activity class.
    pub activity: String,
    /// Declared capabilities, in declaration order.
    pub capabilities: Vec<String>,
}

impl BinaryManifest {
    /// Builds the manifest for a validated spec.
    pub fn from_spec(spec: &PackageSpec) -> Self {
        Self {
            package_id: spec.package_id().to_string(),
            version_code: spec.version_code(),
            version_name: spec.version_name().to_string(),
            min_platform: MIN_PLATFORM_LEVEL,
            target_platform: TARGET_PLATFORM_LEVEL,
            app_label: spec.app_name().to_string(),
            activity: spec.activity_class(),
            capabilities: vec![CAP_NETWORK.to_string()],
        }
    }

    /// Encodes the manifest as one self-contained chunk.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let mut pool = StringPool::new();
        let mut attrs: Vec<(u32, AttrValue)> = Vec::new();

        attrs.push((ATTR_PACKAGE_ID, AttrValue::Str(pool.intern(&self.package_id)?)));
        attrs.push((ATTR_VERSION_CODE, AttrValue::Int(self.version_code)));
        attrs.push((ATTR_VERSION_NAME, AttrValue::Str(pool.intern(&self.version_name)?)));
        attrs.push((ATTR_MIN_PLATFORM, AttrValue::Int(self.min_platform)));
        attrs.push((ATTR_TARGET_PLATFORM, AttrValue::Int(self.target_platform)));
        attrs.push((ATTR_APP_LABEL, AttrValue::Str(pool.intern(&self.app_label)?)));
        attrs.push((ATTR_ACTIVITY, AttrValue::Str(pool.intern(&self.activity)?)));
        for cap in &self.capabilities {
            attrs.push((ATTR_CAPABILITY, AttrValue::Str(pool.intern(cap)?)));
        }

        let mut payload = BytesMut::new();
        pool.encode(&mut payload)?;
        payload.put_u32_le(attrs.len() as u32);
        for (id, value) in attrs {
            payload.put_u32_le(id);
            value.encode(&mut payload);
        }

        let mut out = BytesMut::new();
        chunk::write_chunk(&mut out, ChunkType::Manifest, &payload)?;
        Ok(out.to_vec())
    }

    /// Decodes a manifest chunk, rejecting unknown attributes, dangling
    /// string indices, and missing or repeated required attributes.
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut input = bytes;
        let mut payload = chunk::expect_chunk(&mut input, ChunkType::Manifest)?;
        let pool = StringPool::decode(&mut payload)?;

        if payload.len() < 4 {
            return Err(EncodingError::Truncated {
                what: "manifest attribute count",
                needed: 4,
                remaining: payload.len(),
            });
        }
        let count = payload.get_u32_le() as usize;

        let mut package_id = None;
        let mut version_code = None;
        let mut version_name = None;
        let mut min_platform = None;
        let mut target_platform = None;
        let mut app_label = None;
        let mut activity = None;
        let mut capabilities = Vec::new();

        for _ in 0..count {
            if payload.len() < 4 {
                return Err(EncodingError::Truncated {
                    what: "manifest attribute",
                    needed: 4,
                    remaining: payload.len(),
                });
            }
            let id = payload.get_u32_le();
            let value = AttrValue::decode(&mut payload, &pool)?;
            match (id, value) {
                (ATTR_PACKAGE_ID, AttrValue::Str(idx)) => {
                    set_once(&mut package_id, pool.get(idx)?.to_string(), "package_id")?;
                }
                (ATTR_VERSION_CODE, AttrValue::Int(v)) => {
                    set_once(&mut version_code, v, "version_code")?;
                }
                (ATTR_VERSION_NAME, AttrValue::Str(idx)) => {
                    set_once(&mut version_name, pool.get(idx)?.to_string(), "version_name")?;
                }
                (ATTR_MIN_PLATFORM, AttrValue::Int(v)) => {
                    set_once(&mut min_platform, v, "min_platform")?;
                }
                (ATTR_TARGET_PLATFORM, AttrValue::Int(v)) => {
                    set_once(&mut target_platform, v, "target_platform")?;
                }
                (ATTR_APP_LABEL, AttrValue::Str(idx)) => {
                    set_once(&mut app_label, pool.get(idx)?.to_string(), "app_label")?;
                }
                (ATTR_ACTIVITY, AttrValue::Str(idx)) => {
                    set_once(&mut activity, pool.get(idx)?.to_string(), "activity")?;
                }
                (ATTR_CAPABILITY, AttrValue::Str(idx)) => {
                    capabilities.push(pool.get(idx)?.to_string());
                }
                (id, _) => return Err(EncodingError::UnknownAttribute { id }),
            }
        }

        Ok(Self {
            package_id: require(package_id, "package_id")?,
            version_code: require(version_code, "version_code")?,
            version_name: require(version_name, "version_name")?,
            min_platform: require(min_platform, "min_platform")?,
            target_platform: require(target_platform, "target_platform")?,
            app_label: require(app_label, "app_label")?,
            activity: require(activity, "activity")?,
            capabilities,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &'static str) -> Result<(), EncodingError> {
    if slot.is_some() {
        return Err(EncodingError::BadAttribute {
            name,
            problem: "appears more than once",
        });
    }
    *slot = Some(value);
    Ok(())
}

fn require<T>(slot: Option<T>, name: &'static str) -> Result<T, EncodingError> {
    slot.ok_or(EncodingError::BadAttribute {
        name,
        problem: "is missing",
    })
}
