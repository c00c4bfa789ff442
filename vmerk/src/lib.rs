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

//! Versioned Merkle AVL tree with bulk snapshot import.
//!
//! Each version of the tree is a set of content-addressed nodes plus one
//! root pointer. [`MutableTree::import`] rebuilds a version from a
//! depth-first post-order stream of [`ExportNode`]s, such as the one produced
//! by [`ImmutableTree::export`], without replaying the mutations that created
//! it.

#![warn(missing_docs)]

/// Error and Result types.
mod error;
/// Post-order export of a stored version.
pub mod export;
/// Bulk import of an export stream.
pub mod import;
/// Tree handles.
mod mutable_tree;
/// Node persistence.
pub mod nodedb;
/// Various helpers useful for tests or benchmarks.
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
/// The core tree data structure.
pub mod tree;

pub use error::{Error, Result};
pub use export::{ExportNode, Exporter};
pub use import::Importer;
pub use mutable_tree::{ImmutableTree, MutableTree, TreeOptions};
pub use tree::{CryptoHash, Node, HASH_LENGTH};
#[cfg(feature = "rocksdb_storage")]
pub use vmerk_storage::rocksdb_storage;

/// Tree version number. Committed versions are non-negative; 0 means no
/// version has been committed yet.
pub type Version = i64;
