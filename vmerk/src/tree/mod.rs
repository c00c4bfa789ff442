// MIT LICENSE
//
// Copyright (c) 2021 Dash Core Group
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Tree nodes

mod encoding;
mod hash;

use vmerk_costs::CostContext;

pub use hash::{value_hash, CryptoHash, HASH_LENGTH, NULL_HASH};

use crate::{error::Error, Version};

/// A node of the versioned Merkle AVL tree.
///
/// Values live in leaves only. An inner node's key is the smallest key of its
/// right subtree. Children are referenced by digest; the in-memory child
/// nodes are never owned by their parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub(crate) key: Vec<u8>,
    pub(crate) value: Vec<u8>,
    pub(crate) version: Version,
    pub(crate) height: u8,
    pub(crate) size: u64,
    pub(crate) hash: CryptoHash,
    pub(crate) left_hash: Option<CryptoHash>,
    pub(crate) right_hash: Option<CryptoHash>,
}

impl Node {
    /// Creates a leaf and computes its hash.
    pub fn new_leaf(key: Vec<u8>, value: Vec<u8>, version: Version) -> CostContext<Self> {
        Self::from_parts(key, value, version, 0, 1, None, None)
    }

    /// Creates an inner node over two existing children and computes its
    /// hash. Height and size are derived from the children.
    pub fn new_inner(
        key: Vec<u8>,
        version: Version,
        left: &Node,
        right: &Node,
    ) -> CostContext<Self> {
        Self::from_parts(
            key,
            Vec::new(),
            version,
            left.height.max(right.height) + 1,
            left.size + right.size,
            Some(left.hash),
            Some(right.hash),
        )
    }

    /// Assembles a node from raw fields and computes its hash. No structural
    /// checks are done here; see [`Node::validate`].
    pub fn from_parts(
        key: Vec<u8>,
        value: Vec<u8>,
        version: Version,
        height: u8,
        size: u64,
        left_hash: Option<CryptoHash>,
        right_hash: Option<CryptoHash>,
    ) -> CostContext<Self> {
        let mut node = Node {
            key,
            value,
            version,
            height,
            size,
            hash: Default::default(),
            left_hash,
            right_hash,
        };
        node.compute_hash().map(|hash| {
            node.hash = hash;
            node
        })
    }

    /// Checks the node's self-consistency. An empty key is accepted only when
    /// `allow_empty_key` is set.
    pub fn validate(&self, allow_empty_key: bool) -> Result<(), Error> {
        if self.key.is_empty() && !allow_empty_key {
            return Err(Error::ValidationFailed("key cannot be empty"));
        }
        if self.version < 0 {
            return Err(Error::ValidationFailed("version cannot be negative"));
        }
        if self.size < 1 {
            return Err(Error::ValidationFailed("size must be at least 1"));
        }
        if self.is_leaf() {
            if self.left_hash.is_some() || self.right_hash.is_some() {
                return Err(Error::ValidationFailed("leaf node cannot have children"));
            }
            if self.size != 1 {
                return Err(Error::ValidationFailed("leaf nodes must have size 1"));
            }
        } else {
            if !self.value.is_empty() {
                return Err(Error::ValidationFailed("value must be empty for non-leaf node"));
            }
            if self.left_hash.is_none() && self.right_hash.is_none() {
                return Err(Error::ValidationFailed("inner node must have children"));
            }
        }
        Ok(())
    }

    /// Key of the node
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Value of the node, empty for inner nodes
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Version the node was last written at
    pub fn version(&self) -> Version {
        self.version
    }

    /// Height of the subtree rooted here, 0 for leaves
    pub fn height(&self) -> u8 {
        self.height
    }

    /// Number of leaves in the subtree rooted here
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Content hash of the node
    pub fn hash(&self) -> &CryptoHash {
        &self.hash
    }

    /// Digest of the left child, if any
    pub fn left_hash(&self) -> Option<&CryptoHash> {
        self.left_hash.as_ref()
    }

    /// Digest of the right child, if any
    pub fn right_hash(&self) -> Option<&CryptoHash> {
        self.right_hash.as_ref()
    }

    /// Get the left (`true`) or right (`false`) child digest
    pub fn child_hash(&self, left: bool) -> Option<&CryptoHash> {
        if left {
            self.left_hash()
        } else {
            self.right_hash()
        }
    }

    /// True for height 0
    pub fn is_leaf(&self) -> bool {
        self.height == 0
    }
}
