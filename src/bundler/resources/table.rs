//! Binary resource table.
//!
//! One package block holding a string pool of resource names and values,
//! followed by typed blocks: brand colors, branding strings, and the theme
//! style that binds style attributes to the color resources. Every entry
//! resolves to a primitive value or a pool index.

use super::chunk::{self, ChunkType, StringPool};
use crate::bundler::error::EncodingError;
use crate::bundler::spec::PackageSpec;
use bytes::{Buf, BufMut, BytesMut};

const CATEGORY_COLOR: u8 = 0;
const CATEGORY_STRING: u8 = 1;
const CATEGORY_STYLE: u8 = 2;

/// Decoded form of the resource-table chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTable {
    /// Owning package identifier.
    pub package: String,
    /// Named ARGB colors.
    pub colors: Vec<(String, u32)>,
    /// Named string values.
    pub strings: Vec<(String, String)>,
    /// Named styles; each item maps a style attribute to a color resource
    /// name declared in `colors`.
    pub styles: Vec<(String, Vec<(String, String)>)>,
}

impl ResourceTable {
    /// Builds the branding resource table for a validated spec.
    pub fn from_spec(spec: &PackageSpec) -> Self {
        Self {
            package: spec.package_id().to_string(),
            colors: vec![
                ("brand_primary".to_string(), spec.primary_color().to_argb()),
                ("brand_secondary".to_string(), spec.secondary_color().to_argb()),
            ],
            strings: vec![
                ("app_name".to_string(), spec.app_name().to_string()),
                ("api_base_url".to_string(), spec.api_base_url().to_string()),
                ("store_id".to_string(), spec.store_id().to_string()),
                ("store_name".to_string(), spec.store_name().to_string()),
            ],
            styles: vec![(
                "Theme.Storefront".to_string(),
                vec![
                    ("colorPrimary".to_string(), "brand_primary".to_string()),
                    ("colorAccent".to_string(), "brand_secondary".to_string()),
                ],
            )],
        }
    }

    /// Encodes the table as one self-contained chunk.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let mut pool = StringPool::new();
        let package_idx = pool.intern(&self.package)?;

        // Intern in block order so a decode/encode cycle reproduces the
        // pool exactly.
        let mut color_entries = Vec::with_capacity(self.colors.len());
        for (name, argb) in &self.colors {
            color_entries.push((pool.intern(name)?, *argb));
        }
        let mut string_entries = Vec::with_capacity(self.strings.len());
        for (name, value) in &self.strings {
            string_entries.push((pool.intern(name)?, pool.intern(value)?));
        }
        let mut style_entries = Vec::with_capacity(self.styles.len());
        for (name, items) in &self.styles {
            let name_idx = pool.intern(name)?;
            let mut item_idx = Vec::with_capacity(items.len());
            for (attr, reference) in items {
                item_idx.push((pool.intern(attr)?, pool.intern(reference)?));
            }
            style_entries.push((name_idx, item_idx));
        }

        let mut payload = BytesMut::new();
        pool.encode(&mut payload)?;
        payload.put_u16_le(package_idx);
        payload.put_u8(3); // color, string, style blocks

        let mut block = BytesMut::new();
        block.put_u8(CATEGORY_COLOR);
        block.put_u32_le(color_entries.len() as u32);
        for (name_idx, argb) in color_entries {
            block.put_u16_le(name_idx);
            block.put_u32_le(argb);
        }
        chunk::write_chunk(&mut payload, ChunkType::TypeBlock, &block)?;

        let mut block = BytesMut::new();
        block.put_u8(CATEGORY_STRING);
        block.put_u32_le(string_entries.len() as u32);
        for (name_idx, value_idx) in string_entries {
            block.put_u16_le(name_idx);
            block.put_u16_le(value_idx);
        }
        chunk::write_chunk(&mut payload, ChunkType::TypeBlock, &block)?;

        let mut block = BytesMut::new();
        block.put_u8(CATEGORY_STYLE);
        block.put_u32_le(style_entries.len() as u32);
        for (name_idx, items) in style_entries {
            block.put_u16_le(name_idx);
            block.put_u16_le(items.len() as u16);
            for (attr_idx, ref_idx) in items {
                block.put_u16_le(attr_idx);
                block.put_u16_le(ref_idx);
            }
        }
        chunk::write_chunk(&mut payload, ChunkType::TypeBlock, &block)?;

        let mut out = BytesMut::new();
        chunk::write_chunk(&mut out, ChunkType::ResourceTable, &payload)?;
        Ok(out.to_vec())
    }

    /// Decodes a resource-table chunk.
    ///
    /// Requires at least one color block and one string block, and that
    /// every style item reference names a declared color resource.
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut input = bytes;
        let mut payload = chunk::expect_chunk(&mut input, ChunkType::ResourceTable)?;
        let pool = StringPool::decode(&mut payload)?;

        if payload.len() < 3 {
            return Err(EncodingError::Truncated {
                what: "resource table header",
                needed: 3,
                remaining: payload.len(),
            });
        }
        let package = pool.get(payload.get_u16_le())?.to_string();
        let block_count = payload.get_u8();

        let mut colors = Vec::new();
        let mut strings = Vec::new();
        let mut styles = Vec::new();

        for _ in 0..block_count {
            let mut block = chunk::expect_chunk(&mut payload, ChunkType::TypeBlock)?;
            if block.len() < 5 {
                return Err(EncodingError::Truncated {
                    what: "type block header",
                    needed: 5,
                    remaining: block.len(),
                });
            }
            let category = block.get_u8();
            let entry_count = block.get_u32_le() as usize;
            match category {
                CATEGORY_COLOR => {
                    for _ in 0..entry_count {
                        require_len(block.len(), 6, "color entry")?;
                        let name = pool.get(block.get_u16_le())?.to_string();
                        colors.push((name, block.get_u32_le()));
                    }
                }
                CATEGORY_STRING => {
                    for _ in 0..entry_count {
                        require_len(block.len(), 4, "string entry")?;
                        let name = pool.get(block.get_u16_le())?.to_string();
                        let value = pool.get(block.get_u16_le())?.to_string();
                        strings.push((name, value));
                    }
                }
                CATEGORY_STYLE => {
                    for _ in 0..entry_count {
                        require_len(block.len(), 4, "style entry")?;
                        let name = pool.get(block.get_u16_le())?.to_string();
                        let item_count = block.get_u16_le() as usize;
                        let mut items = Vec::with_capacity(item_count);
                        for _ in 0..item_count {
                            require_len(block.len(), 4, "style item")?;
                            let attr = pool.get(block.get_u16_le())?.to_string();
                            let reference = pool.get(block.get_u16_le())?.to_string();
                            items.push((attr, reference));
                        }
                        styles.push((name, items));
                    }
                }
                tag => return Err(EncodingError::UnknownChunkTag { tag: u16::from(tag) }),
            }
        }

        if colors.is_empty() {
            return Err(EncodingError::MissingResource {
                name: "color block".to_string(),
            });
        }
        if strings.is_empty() {
            return Err(EncodingError::MissingResource {
                name: "string block".to_string(),
            });
        }
        for (_, items) in &styles {
            for (_, reference) in items {
                if !colors.iter().any(|(name, _)| name == reference) {
                    return Err(EncodingError::MissingResource {
                        name: reference.clone(),
                    });
                }
            }
        }

        Ok(Self {
            package,
            colors,
            strings,
            styles,
        })
    }
}

fn require_len(have: usize, needed: usize, what: &'static str) -> Result<(), EncodingError> {
    if have < needed {
        return Err(EncodingError::Truncated {
            what,
            needed,
            remaining: have,
        });
    }
    Ok(())
}
