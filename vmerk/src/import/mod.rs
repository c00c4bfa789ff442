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

//! Bulk import of a post-order export stream
//!
//! Records carry no child references. Each new node adopts as children the
//! subtree roots on top of the stack whose heights are below its own: the
//! top two become left and right, a single one becomes the left child. The
//! node is then hashed, checked and buffered in the write batch before the
//! stack changes, so a rejected record leaves the importer as it was.

#[cfg(test)]
mod tests;

use std::mem;

use tracing::{debug, info, warn};
use vmerk_costs::{
    cost_return_on_error, cost_return_on_error_no_add, CostResult, CostsExt, OperationCost,
};
use vmerk_storage::{Batch, StorageContext};

use crate::{
    error::Error,
    export::ExportNode,
    mutable_tree::MutableTree,
    tree::{CryptoHash, Node},
    Version,
};

/// Storage for the nodes on the import stack. Slots of nodes adopted as
/// children are recycled.
#[derive(Default)]
struct NodeArena {
    slots: Vec<Node>,
    free: Vec<usize>,
}

impl NodeArena {
    fn with_capacity(capacity: usize) -> Self {
        NodeArena {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    fn insert(&mut self, node: Node) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = node;
                index
            }
            None => {
                self.slots.push(node);
                self.slots.len() - 1
            }
        }
    }

    fn get(&self, index: usize) -> &Node {
        &self.slots[index]
    }

    fn remove(&mut self, index: usize) -> Node {
        self.free.push(index);
        mem::take(&mut self.slots[index])
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

/// Rebuilds one version of a [`MutableTree`] from a depth-first post-order
/// stream of [`ExportNode`]s.
///
/// Nothing reaches storage before [`Importer::commit`]. The importer is
/// single use: after a commit or [`Importer::close`] every further call
/// fails with [`Error::NoImportInProgress`].
pub struct Importer<'t, 'db, S>
where
    S: StorageContext<'db>,
{
    tree: Option<&'t mut MutableTree<S>>,
    version: Version,
    batch: Option<<S as StorageContext<'db>>::Batch>,
    arena: NodeArena,
    // arena indices of subtree roots not yet adopted by a parent
    stack: Vec<usize>,
    nodes_added: u64,
}

impl<'t, 'db, S> Importer<'t, 'db, S>
where
    S: StorageContext<'db>,
{
    pub(crate) fn new(tree: &'t mut MutableTree<S>, version: Version) -> Self {
        let capacity = tree.options().import_stack_capacity;
        let batch = tree.ndb().new_batch();
        debug!(version, "starting import");
        Importer {
            tree: Some(tree),
            version,
            batch: Some(batch),
            arena: NodeArena::with_capacity(capacity),
            stack: Vec::with_capacity(capacity),
            nodes_added: 0,
        }
    }

    /// Target version of the import
    pub fn version(&self) -> Version {
        self.version
    }

    /// Number of subtrees not yet adopted by a parent
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Number of writes buffered for the commit
    pub fn pending_writes(&self) -> usize {
        self.batch.as_ref().map_or(0, |batch| batch.len())
    }

    /// Number of nodes accepted so far
    pub fn nodes_added(&self) -> u64 {
        self.nodes_added
    }

    /// True once the importer was committed or closed
    pub fn is_closed(&self) -> bool {
        self.tree.is_none()
    }

    /// Adds the next node of the stream.
    ///
    /// Nodes must arrive in the order the exporter emitted them. On error
    /// neither the stack nor the write batch is modified.
    pub fn add(&mut self, node: ExportNode) -> CostResult<(), Error> {
        let mut cost = OperationCost::default();
        let (Some(tree), Some(batch)) = (self.tree.as_deref(), self.batch.as_mut()) else {
            return Err(Error::NoImportInProgress).wrap_with_cost(cost);
        };
        if node.version < 0 {
            return Err(Error::InvalidArgument(format!(
                "node version cannot be negative, got {}",
                node.version
            )))
            .wrap_with_cost(cost);
        }
        if node.version > self.version {
            return Err(Error::VersionExceeded {
                node_version: node.version,
                import_version: self.version,
            })
            .wrap_with_cost(cost);
        }

        let height_at =
            |depth: usize| self.arena.get(self.stack[self.stack.len() - depth]).height();
        let adopted = match self.stack.len() {
            len if len >= 2 && height_at(2) < node.height && height_at(1) < node.height => 2,
            len if len >= 1 && height_at(1) < node.height => 1,
            _ => 0,
        };
        let children = &self.stack[self.stack.len() - adopted..];
        let child = |i: usize| children.get(i).map(|&index| self.arena.get(index));

        let size = if node.height == 0 {
            1
        } else {
            children.iter().map(|&index| self.arena.get(index).size()).sum()
        };
        let left_hash: Option<CryptoHash> = child(0).map(|left| *left.hash());
        let right_hash: Option<CryptoHash> = child(1).map(|right| *right.hash());

        let new_node = Node::from_parts(
            node.key,
            node.value,
            node.version,
            node.height,
            size,
            left_hash,
            right_hash,
        )
        .unwrap_add_cost(&mut cost);

        let allow_empty_key = self.stack.is_empty() && adopted == 0;
        cost_return_on_error_no_add!(&cost, new_node.validate(allow_empty_key));
        // an empty key is only valid on the sole root
        if children
            .iter()
            .any(|&index| self.arena.get(index).key().is_empty())
        {
            return Err(Error::ValidationFailed("key cannot be empty")).wrap_with_cost(cost);
        }

        tree.ndb().put_node(batch, &new_node);

        for _ in 0..adopted {
            if let Some(index) = self.stack.pop() {
                self.arena.remove(index);
            }
        }
        let index = self.arena.insert(new_node);
        self.stack.push(index);
        self.nodes_added += 1;

        Ok(()).wrap_with_cost(cost)
    }

    /// Writes the imported version and makes it the working version of the
    /// tree.
    ///
    /// The stream must have produced exactly one subtree, or none for an
    /// empty version. The nodes and the root pointer are written in one
    /// atomic batch. The importer is closed on success; after a failure it
    /// must be discarded.
    pub fn commit(&mut self) -> CostResult<(), Error> {
        let mut cost = OperationCost::default();
        let (Some(tree), Some(batch)) = (self.tree.as_deref_mut(), self.batch.as_mut()) else {
            return Err(Error::NoImportInProgress).wrap_with_cost(cost);
        };

        let root_hash = match self.stack.as_slice() {
            [] => None,
            [root] => Some(*self.arena.get(*root).hash()),
            subtrees => {
                warn!(
                    version = self.version,
                    subtrees = subtrees.len(),
                    "import stream did not form a single tree"
                );
                return Err(Error::StructuralError(subtrees.len())).wrap_with_cost(cost);
            }
        };

        tree.ndb().put_root(batch, self.version, root_hash.as_ref());
        let Some(batch) = self.batch.take() else {
            return Err(Error::NoImportInProgress).wrap_with_cost(cost);
        };
        debug!(
            version = self.version,
            writes = batch.len(),
            "flushing import batch"
        );
        cost_return_on_error!(&mut cost, tree.ndb().commit_batch(batch));

        tree.ndb().update_latest_version(self.version);
        cost_return_on_error!(&mut cost, tree.apply_imported_version(self.version));

        info!(
            version = self.version,
            nodes = self.nodes_added,
            root_hash = %root_hash.map(hex::encode).unwrap_or_default(),
            "imported version"
        );
        self.close();
        Ok(()).wrap_with_cost(cost)
    }

    /// Discards buffered writes and releases the tree. Safe to call any
    /// number of times, including after [`Importer::commit`].
    pub fn close(&mut self) {
        self.batch = None;
        self.tree = None;
        self.stack.clear();
        self.arena.clear();
    }
}
