//! Serialized layout view tree.
//!
//! The storefront app has a single screen: a full-size frame hosting a
//! content web view bound to the store's API base URL. The tree is encoded
//! depth-first inside one layout chunk, with element names and attribute
//! strings pooled.

use super::chunk::{self, ChunkType, StringPool};
use crate::bundler::error::EncodingError;
use crate::bundler::spec::PackageSpec;
use bytes::{Buf, BufMut, BytesMut};

/// Dimension value meaning "fill the parent".
pub const MATCH_PARENT: &str = "match_parent";

/// One node in the view tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    /// Element (view class) name.
    pub element: String,
    /// Attribute key/value pairs, in declaration order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<LayoutNode>,
}

/// Decoded form of the layout chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutResource {
    /// Tree root.
    pub root: LayoutNode,
}

impl LayoutResource {
    /// Builds the single-screen storefront layout for a validated spec.
    pub fn from_spec(spec: &PackageSpec) -> Self {
        Self {
            root: LayoutNode {
                element: "FrameHost".to_string(),
                attributes: vec![
                    ("width".to_string(), MATCH_PARENT.to_string()),
                    ("height".to_string(), MATCH_PARENT.to_string()),
                ],
                children: vec![LayoutNode {
                    element: "ContentWebView".to_string(),
                    attributes: vec![
                        ("width".to_string(), MATCH_PARENT.to_string()),
                        ("height".to_string(), MATCH_PARENT.to_string()),
                        ("url".to_string(), spec.api_base_url().to_string()),
                        ("scripting".to_string(), "enabled".to_string()),
                    ],
                    children: Vec::new(),
                }],
            },
        }
    }

    /// Encodes the tree as one self-contained chunk.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        let mut pool = StringPool::new();
        let mut tree = BytesMut::new();
        encode_node(&self.root, &mut pool, &mut tree)?;

        let mut payload = BytesMut::new();
        pool.encode(&mut payload)?;
        payload.put_slice(&tree);

        let mut out = BytesMut::new();
        chunk::write_chunk(&mut out, ChunkType::Layout, &payload)?;
        Ok(out.to_vec())
    }

    /// Decodes a layout chunk.
    pub fn decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let mut input = bytes;
        let mut payload = chunk::expect_chunk(&mut input, ChunkType::Layout)?;
        let pool = StringPool::decode(&mut payload)?;
        let root = decode_node(&mut payload, &pool)?;
        if !payload.is_empty() {
            return Err(EncodingError::Truncated {
                what: "layout tree",
                needed: 0,
                remaining: payload.len(),
            });
        }
        Ok(Self { root })
    }
}

fn encode_node(
    node: &LayoutNode,
    pool: &mut StringPool,
    out: &mut BytesMut,
) -> Result<(), EncodingError> {
    out.put_u16_le(pool.intern(&node.element)?);
    out.put_u16_le(node.attributes.len() as u16);
    for (key, value) in &node.attributes {
        out.put_u16_le(pool.intern(key)?);
        out.put_u16_le(pool.intern(value)?);
    }
    out.put_u16_le(node.children.len() as u16);
    for child in &node.children {
        encode_node(child, pool, out)?;
    }
    Ok(())
}

fn decode_node(input: &mut &[u8], pool: &StringPool) -> Result<LayoutNode, EncodingError> {
    if input.len() < 4 {
        return Err(EncodingError::Truncated {
            what: "layout node header",
            needed: 4,
            remaining: input.len(),
        });
    }
    let element = pool.get(input.get_u16_le())?.to_string();
    let attr_count = input.get_u16_le() as usize;

    let mut attributes = Vec::with_capacity(attr_count);
    for _ in 0..attr_count {
        if input.len() < 4 {
            return Err(EncodingError::Truncated {
                what: "layout attribute",
                needed: 4,
                remaining: input.len(),
            });
        }
        let key = pool.get(input.get_u16_le())?.to_string();
        let value = pool.get(input.get_u16_le())?.to_string();
        attributes.push((key, value));
    }

    if input.len() < 2 {
        return Err(EncodingError::Truncated {
            what: "layout child count",
            needed: 2,
            remaining: input.len(),
        });
    }
    let child_count = input.get_u16_le() as usize;
    let mut children = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        children.push(decode_node(input, pool)?);
    }

    Ok(LayoutNode {
        element,
        attributes,
        children,
    })
}
