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

//! Test utils

mod failing_storage;

use std::collections::BTreeMap;

pub use failing_storage::FailingStorageContext;
use rand::prelude::*;
use vmerk_costs::{cost_return_on_error, CostContext, CostResult, CostsExt, OperationCost};
use vmerk_storage::StorageContext;

use crate::{
    error::Error,
    nodedb::NodeDb,
    tree::{CryptoHash, Node},
    Version,
};

/// Key, value and the version the leaf was written at
pub type KeyValue = (Vec<u8>, Vec<u8>, Version);

/// Shorthand for a [`KeyValue`]
pub fn kv(key: &[u8], value: &[u8], version: Version) -> KeyValue {
    (key.to_vec(), value.to_vec(), version)
}

/// Sequential key
pub const fn seq_key(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

/// `count` leaves with sequential keys and fixed values, all at `version`
pub fn make_kvs_seq(count: u64, version: Version) -> Vec<KeyValue> {
    (0..count)
        .map(|n| (seq_key(n).to_vec(), vec![123; 60], version))
        .collect()
}

/// `count` leaves with random distinct keys, sorted, written at random
/// versions up to `max_version`
pub fn make_kvs_rand(count: usize, seed: u64, max_version: Version) -> Vec<KeyValue> {
    let mut rng: SmallRng = SeedableRng::seed_from_u64(seed);
    let mut leaves = BTreeMap::new();
    while leaves.len() < count {
        let key = seq_key(rng.gen::<u64>()).to_vec();
        let value = vec![rng.gen::<u8>(); rng.gen_range(1..64)];
        let version = rng.gen_range(0..=max_version);
        leaves.insert(key, (value, version));
    }
    leaves
        .into_iter()
        .map(|(key, (value, version))| (key, value, version))
        .collect()
}

/// Persists a balanced tree over the sorted `kvs` as `version`, without
/// going through the importer, and returns its root hash.
///
/// Inner nodes take the first key of their right subtree and are written at
/// `version`. An empty `kvs` records an empty version.
pub fn build_tree<'db, S>(
    storage: S,
    version: Version,
    kvs: &[KeyValue],
) -> CostResult<Option<CryptoHash>, Error>
where
    S: StorageContext<'db>,
{
    let mut cost = OperationCost::default();
    let ndb = cost_return_on_error!(&mut cost, NodeDb::open(storage, false));
    let mut batch = ndb.new_batch();

    let root = if kvs.is_empty() {
        None
    } else {
        Some(build_subtree(&ndb, &mut batch, version, kvs).unwrap_add_cost(&mut cost))
    };
    let root_hash = root.as_ref().map(|root| *root.hash());
    ndb.put_root(&mut batch, version, root_hash.as_ref());
    cost_return_on_error!(&mut cost, ndb.commit_batch(batch));

    Ok(root_hash).wrap_with_cost(cost)
}

fn build_subtree<'db, S>(
    ndb: &NodeDb<S>,
    batch: &mut S::Batch,
    version: Version,
    kvs: &[KeyValue],
) -> CostContext<Node>
where
    S: StorageContext<'db>,
{
    let mut cost = OperationCost::default();
    let node = if let [(key, value, leaf_version)] = kvs {
        Node::new_leaf(key.clone(), value.clone(), *leaf_version).unwrap_add_cost(&mut cost)
    } else {
        let mid = (kvs.len() + 1) / 2;
        let left = build_subtree(ndb, batch, version, &kvs[..mid]).unwrap_add_cost(&mut cost);
        let right = build_subtree(ndb, batch, version, &kvs[mid..]).unwrap_add_cost(&mut cost);
        Node::new_inner(kvs[mid].0.clone(), version, &left, &right).unwrap_add_cost(&mut cost)
    };
    ndb.put_node(batch, &node);
    node.wrap_with_cost(cost)
}
