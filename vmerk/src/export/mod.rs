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

//! Depth-first post-order export of a committed version
//!
//! Every node is emitted after both of its subtrees, left before right. The
//! records carry no child references: a reader recovers the shape from the
//! heights and the order alone.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use vmerk_costs::OperationCost;
use vmerk_storage::StorageContext;

use crate::{error::Error, mutable_tree::ImmutableTree, tree::Node, Version};

/// One exported node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExportNode {
    /// Node key
    pub key: Vec<u8>,
    /// Value of a leaf, empty for inner nodes
    pub value: Vec<u8>,
    /// Version the node was written at
    pub version: Version,
    /// Subtree height, 0 for leaves
    pub height: u8,
}

impl From<&Node> for ExportNode {
    fn from(node: &Node) -> Self {
        ExportNode {
            key: node.key().to_vec(),
            value: node.value().to_vec(),
            version: node.version(),
            height: node.height(),
        }
    }
}

/// Iterator over the nodes of an [`ImmutableTree`] in depth-first
/// post-order. Nodes are fetched lazily; iteration stops after the first
/// error.
pub struct Exporter<'a, S> {
    tree: &'a ImmutableTree<S>,
    // (node, children already pushed)
    stack: Vec<(Node, bool)>,
    cost: OperationCost,
    failed: bool,
}

impl<'a, S> Exporter<'a, S> {
    pub(crate) fn new(tree: &'a ImmutableTree<S>) -> Self {
        let stack = tree.root().map(|root| vec![(root.clone(), false)]).unwrap_or_default();
        Exporter {
            tree,
            stack,
            cost: OperationCost::default(),
            failed: false,
        }
    }

    /// Cost accumulated by the nodes exported so far
    pub fn cost(&self) -> &OperationCost {
        &self.cost
    }
}

impl<'a, 'db, S> Exporter<'a, S>
where
    S: StorageContext<'db>,
{
    fn expand(&mut self, node: Node) -> Result<(), Error> {
        let left = node.left_hash().copied();
        let right = node.right_hash().copied();
        self.stack.push((node, true));
        // pushed right first so the left subtree is emitted first
        for hash in [right, left].into_iter().flatten() {
            let child = self
                .tree
                .ndb
                .get_existing_node(&hash)
                .unwrap_add_cost(&mut self.cost)?;
            self.stack.push((child, false));
        }
        Ok(())
    }
}

impl<'a, 'db, S> Iterator for Exporter<'a, S>
where
    S: StorageContext<'db>,
{
    type Item = Result<ExportNode, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some((node, expanded)) = self.stack.pop() {
            if expanded || node.is_leaf() {
                return Some(Ok(ExportNode::from(&node)));
            }
            if let Err(e) = self.expand(node) {
                self.failed = true;
                self.stack.clear();
                return Some(Err(e));
            }
        }
        None
    }
}
