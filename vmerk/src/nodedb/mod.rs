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

//! Node database
//!
//! Nodes are stored under `b'n' ++ hash` and every committed version gets a
//! root pointer under `b'r' ++ version.to_be_bytes()`. The pointer value is
//! the root digest, or empty for a version whose tree holds no keys.

use std::{cell::Cell, collections::BTreeSet};

use vmerk_costs::{
    cost_return_on_error, cost_return_on_error_no_add, CostResult, CostsExt, OperationCost,
};
use vmerk_storage::{Batch, RawIterator, StorageContext};

use crate::{
    error::Error,
    tree::{CryptoHash, Node, HASH_LENGTH},
    Version,
};

const NODE_KEY_PREFIX: u8 = b'n';
const ROOT_KEY_PREFIX: u8 = b'r';
const ROOT_KEY_LENGTH: usize = 1 + std::mem::size_of::<Version>();

/// Persists nodes and per-version root pointers in a storage context.
pub struct NodeDb<S> {
    storage: S,
    latest_version: Cell<Version>,
    sync_writes: bool,
}

/// Storage key of the node with digest `hash`.
pub fn node_key(hash: &CryptoHash) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + HASH_LENGTH);
    key.push(NODE_KEY_PREFIX);
    key.extend_from_slice(hash);
    key
}

/// Storage key of the root pointer of `version`. Big-endian so that root
/// keys sort by version.
pub fn root_key(version: Version) -> Vec<u8> {
    let mut key = Vec::with_capacity(ROOT_KEY_LENGTH);
    key.push(ROOT_KEY_PREFIX);
    key.extend_from_slice(&version.to_be_bytes());
    key
}

fn parse_root_key(key: &[u8]) -> Result<Version, Error> {
    if key.len() != ROOT_KEY_LENGTH {
        return Err(Error::CorruptedData(format!(
            "root key {} has wrong length",
            hex::encode(key)
        )));
    }
    let mut bytes = [0; ROOT_KEY_LENGTH - 1];
    bytes.copy_from_slice(&key[1..]);
    Ok(Version::from_be_bytes(bytes))
}

impl<S> NodeDb<S> {
    /// Highest version committed to this database, 0 if none.
    pub fn latest_version(&self) -> Version {
        self.latest_version.get()
    }

    /// Moves the latest version marker forward. Older versions are ignored.
    pub fn update_latest_version(&self, version: Version) {
        if version > self.latest_version.get() {
            self.latest_version.set(version);
        }
    }

    /// Whether batch commits are flushed to durable media.
    pub fn sync_writes(&self) -> bool {
        self.sync_writes
    }

    /// Underlying storage context
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<'db, S> NodeDb<S>
where
    S: StorageContext<'db>,
{
    /// Opens the node database and recovers the latest version marker from
    /// the stored root pointers.
    pub fn open(storage: S, sync_writes: bool) -> CostResult<Self, Error> {
        let mut cost = OperationCost::default();
        let ndb = NodeDb {
            storage,
            latest_version: Cell::new(0),
            sync_writes,
        };
        let versions = cost_return_on_error!(&mut cost, ndb.versions());
        if let Some(latest) = versions.last() {
            ndb.latest_version.set(*latest);
        }
        Ok(ndb).wrap_with_cost(cost)
    }

    /// Starts a batch. Nothing is written until it is committed.
    pub fn new_batch(&self) -> S::Batch {
        self.storage.new_batch()
    }

    /// Buffers the encoded node under its node key.
    pub fn put_node(&self, batch: &mut S::Batch, node: &Node) {
        batch.put(node_key(node.hash()), &node.encode());
    }

    /// Buffers the root pointer of `version`. `None` records an empty tree.
    pub fn put_root(&self, batch: &mut S::Batch, version: Version, root_hash: Option<&CryptoHash>) {
        let value: &[u8] = match root_hash {
            Some(hash) => hash,
            None => &[],
        };
        batch.put(root_key(version), value);
    }

    /// Applies the batch atomically.
    pub fn commit_batch(&self, batch: S::Batch) -> CostResult<(), Error> {
        self.storage
            .commit_batch(batch, self.sync_writes)
            .map_err(Error::StorageError)
    }

    /// Loads a node by digest.
    pub fn get_node(&self, hash: &CryptoHash) -> CostResult<Option<Node>, Error> {
        let mut cost = OperationCost::default();
        let bytes = cost_return_on_error!(
            &mut cost,
            self.storage.get(node_key(hash)).map_err(Error::StorageError)
        );
        let Some(bytes) = bytes else {
            return Ok(None).wrap_with_cost(cost);
        };
        let node = cost_return_on_error_no_add!(&cost, Node::decode_raw(&bytes));
        if node.hash() != hash {
            return Err(Error::CorruptedData(format!(
                "node {} hashes to {}",
                hex::encode(hash),
                hex::encode(node.hash())
            )))
            .wrap_with_cost(cost);
        }
        Ok(Some(node)).wrap_with_cost(cost)
    }

    /// Loads a node that a parent or a root pointer refers to.
    pub fn get_existing_node(&self, hash: &CryptoHash) -> CostResult<Node, Error> {
        self.get_node(hash)
            .map_ok(|node| node.ok_or_else(|| Error::NodeNotFound(hex::encode(hash))))
            .flatten()
    }

    /// Reads the root pointer of `version`.
    ///
    /// Returns `None` if the version was never committed and `Some(None)` if
    /// it was committed with an empty tree.
    pub fn get_root(&self, version: Version) -> CostResult<Option<Option<CryptoHash>>, Error> {
        self.storage
            .get(root_key(version))
            .map_err(Error::StorageError)
            .map_ok(|value| -> Result<Option<Option<CryptoHash>>, Error> {
                match value {
                    None => Ok(None),
                    Some(bytes) if bytes.is_empty() => Ok(Some(None)),
                    Some(bytes) => CryptoHash::try_from(bytes.as_slice())
                        .map(|hash| Some(Some(hash)))
                        .map_err(|_| {
                            Error::CorruptedData(format!(
                                "root pointer of version {} has {} bytes",
                                version,
                                bytes.len()
                            ))
                        }),
                }
            })
            .flatten()
    }

    /// Every version with a root pointer, in ascending order.
    pub fn versions(&self) -> CostResult<BTreeSet<Version>, Error> {
        let mut cost = OperationCost::default();
        let mut versions = BTreeSet::new();
        let mut iter = self.storage.raw_iter();
        iter.seek([ROOT_KEY_PREFIX]).unwrap_add_cost(&mut cost);
        while iter.valid().unwrap_add_cost(&mut cost) {
            let version = match iter.key().unwrap_add_cost(&mut cost) {
                Some(key) if key.first() == Some(&ROOT_KEY_PREFIX) => parse_root_key(key),
                _ => break,
            };
            versions.insert(cost_return_on_error_no_add!(&cost, version));
            iter.next().unwrap_add_cost(&mut cost);
        }
        Ok(versions).wrap_with_cost(cost)
    }
}
