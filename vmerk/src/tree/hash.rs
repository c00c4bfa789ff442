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

//! Node digests

use integer_encoding::VarInt;
use vmerk_costs::{CostContext, CostsExt, OperationCost};

use super::Node;

/// The length of a `Hash` (in bytes).
pub const HASH_LENGTH: usize = 32;

/// A zero-filled `Hash`.
pub const NULL_HASH: CryptoHash = [0; HASH_LENGTH];

/// A cryptographic hash digest.
pub type CryptoHash = [u8; HASH_LENGTH];

/// Number of 64-byte blocks the hasher compressed.
fn block_count(hasher: &blake3::Hasher) -> u32 {
    (1 + hasher.count().saturating_sub(1) / 64) as u32
}

/// Hashes a value
pub fn value_hash(value: &[u8]) -> CostContext<CryptoHash> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(value.len().encode_var_vec().as_slice());
    hasher.update(value);

    let hashes = block_count(&hasher);
    let hash: CryptoHash = *hasher.finalize().as_bytes();
    hash.wrap_with_cost(OperationCost::with_hash_node_calls(hashes))
}

fn update_child(hasher: &mut blake3::Hasher, child: Option<&CryptoHash>) {
    match child {
        Some(hash) => {
            hasher.update(&[1]);
            hasher.update(hash);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

impl Node {
    /// Computes the content hash of the node from its own fields and the
    /// digests of its children.
    ///
    /// The preimage is varint(height), varint(size), varint(version),
    /// length-prefixed key, then each child digest behind a presence byte.
    /// Leaves append the hash of their value; inner nodes never commit to a
    /// value.
    pub(crate) fn compute_hash(&self) -> CostContext<CryptoHash> {
        let mut cost = OperationCost::default();
        let mut hasher = blake3::Hasher::new();

        hasher.update(u64::from(self.height).encode_var_vec().as_slice());
        hasher.update(self.size.encode_var_vec().as_slice());
        hasher.update(self.version.encode_var_vec().as_slice());
        hasher.update(self.key.len().encode_var_vec().as_slice());
        hasher.update(&self.key);
        update_child(&mut hasher, self.left_hash.as_ref());
        update_child(&mut hasher, self.right_hash.as_ref());

        if self.is_leaf() {
            let value_hash = value_hash(&self.value).unwrap_add_cost(&mut cost);
            hasher.update(&value_hash);
        }

        cost.hash_node_calls += block_count(&hasher);
        let hash: CryptoHash = *hasher.finalize().as_bytes();
        hash.wrap_with_cost(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_hash_is_length_prefixed() {
        let hash = value_hash(b"value");
        assert_eq!(hash.cost.hash_node_calls, 1);

        let mut hasher = blake3::Hasher::new();
        hasher.update(&[5]);
        hasher.update(b"value");
        assert_eq!(hash.unwrap(), *hasher.finalize().as_bytes());
    }

    #[test]
    fn inner_hash_ignores_value() {
        let left = Node::new_leaf(b"a".to_vec(), b"1".to_vec(), 1).unwrap();
        let right = Node::new_leaf(b"b".to_vec(), b"2".to_vec(), 1).unwrap();
        let inner = Node::new_inner(b"b".to_vec(), 1, &left, &right).unwrap();

        let mut with_value = inner.clone();
        with_value.value = b"ignored".to_vec();
        assert_eq!(with_value.compute_hash().unwrap(), inner.hash);
    }

    #[test]
    fn leaf_hash_commits_to_every_field() {
        let base = Node::new_leaf(b"k".to_vec(), b"v".to_vec(), 3).unwrap();

        let other_value = Node::new_leaf(b"k".to_vec(), b"w".to_vec(), 3).unwrap();
        let other_key = Node::new_leaf(b"j".to_vec(), b"v".to_vec(), 3).unwrap();
        let other_version = Node::new_leaf(b"k".to_vec(), b"v".to_vec(), 4).unwrap();

        assert_ne!(base.hash, other_value.hash);
        assert_ne!(base.hash, other_key.hash);
        assert_ne!(base.hash, other_version.hash);
        assert_ne!(base.hash, NULL_HASH);
    }

    #[test]
    fn missing_child_differs_from_null_child() {
        let leaf = Node::new_leaf(b"a".to_vec(), b"1".to_vec(), 1).unwrap();
        let one_child = Node::from_parts(
            b"a".to_vec(),
            Vec::new(),
            1,
            1,
            1,
            Some(leaf.hash),
            None,
        )
        .unwrap();
        let null_sibling = Node::from_parts(
            b"a".to_vec(),
            Vec::new(),
            1,
            1,
            1,
            Some(leaf.hash),
            Some(NULL_HASH),
        )
        .unwrap();
        assert_ne!(one_child.hash, null_sibling.hash);
    }
}
