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

//! Read-only view of one committed version

use std::{borrow::Cow, rc::Rc};

use vmerk_costs::{cost_return_on_error, CostResult, CostsExt, OperationCost};
use vmerk_storage::StorageContext;

use crate::{
    error::Error,
    export::Exporter,
    nodedb::NodeDb,
    tree::{CryptoHash, Node},
    Version,
};

/// A committed version of the tree. Nodes below the root are loaded from the
/// node database on demand.
pub struct ImmutableTree<S> {
    pub(crate) ndb: Rc<NodeDb<S>>,
    pub(crate) root: Option<Node>,
    pub(crate) version: Version,
}

impl<S> Clone for ImmutableTree<S> {
    fn clone(&self) -> Self {
        ImmutableTree {
            ndb: Rc::clone(&self.ndb),
            root: self.root.clone(),
            version: self.version,
        }
    }
}

impl<S> ImmutableTree<S> {
    pub(crate) fn new(ndb: Rc<NodeDb<S>>, root: Option<Node>, version: Version) -> Self {
        ImmutableTree { ndb, root, version }
    }

    /// Version this view was committed at
    pub fn version(&self) -> Version {
        self.version
    }

    /// Root digest, `None` for an empty tree
    pub fn root_hash(&self) -> Option<CryptoHash> {
        self.root.as_ref().map(|root| *root.hash())
    }

    /// Root node
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Number of keys
    pub fn size(&self) -> u64 {
        self.root.as_ref().map_or(0, Node::size)
    }

    /// Height of the root, 0 for an empty tree
    pub fn height(&self) -> u8 {
        self.root.as_ref().map_or(0, Node::height)
    }

    /// True if the version holds no keys
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

impl<'db, S> ImmutableTree<S>
where
    S: StorageContext<'db>,
{
    /// Gets the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        get_from(&self.ndb, self.root.as_ref(), key)
    }

    /// Streams the version in depth-first post-order.
    pub fn export(&self) -> Exporter<'_, S> {
        Exporter::new(self)
    }
}

/// Descends from `root` to the leaf that would hold `key`.
pub(crate) fn get_from<'db, S>(
    ndb: &NodeDb<S>,
    root: Option<&Node>,
    key: &[u8],
) -> CostResult<Option<Vec<u8>>, Error>
where
    S: StorageContext<'db>,
{
    let mut cost = OperationCost::default();
    let Some(root) = root else {
        return Ok(None).wrap_with_cost(cost);
    };

    let mut node = Cow::Borrowed(root);
    while !node.is_leaf() {
        // inner keys are the smallest key of the right subtree; a node with
        // a single child routes every key to it
        let child = match (node.left_hash(), node.right_hash()) {
            (Some(left), Some(right)) => {
                if key < node.key() {
                    *left
                } else {
                    *right
                }
            }
            (Some(only), None) | (None, Some(only)) => *only,
            (None, None) => return Ok(None).wrap_with_cost(cost),
        };
        node = Cow::Owned(cost_return_on_error!(
            &mut cost,
            ndb.get_existing_node(&child)
        ));
    }

    let value = (node.key() == key).then(|| node.value().to_vec());
    Ok(value).wrap_with_cost(cost)
}
