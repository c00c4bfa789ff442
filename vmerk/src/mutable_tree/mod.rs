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

//! Tree handles

mod immutable;
mod options;

use std::{collections::BTreeSet, rc::Rc};

use immutable::get_from;
pub use immutable::ImmutableTree;
pub use options::TreeOptions;
use vmerk_costs::{cost_return_on_error, CostResult, CostsExt, OperationCost};
use vmerk_storage::StorageContext;

use crate::{
    error::Error,
    import::Importer,
    nodedb::NodeDb,
    tree::{CryptoHash, Node},
    Version,
};

/// The working tree: the current root, the set of committed versions and the
/// last saved snapshot.
pub struct MutableTree<S> {
    ndb: Rc<NodeDb<S>>,
    root: Option<Node>,
    version: Version,
    versions: BTreeSet<Version>,
    last_saved: Option<ImmutableTree<S>>,
    options: TreeOptions,
}

impl<S> MutableTree<S> {
    /// True if the working tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Version of the working tree
    pub fn version(&self) -> Version {
        self.version
    }

    /// Committed versions, ascending
    pub fn versions(&self) -> &BTreeSet<Version> {
        &self.versions
    }

    /// Checks if `version` was committed
    pub fn version_exists(&self, version: Version) -> bool {
        self.versions.contains(&version)
    }

    /// Highest version committed to the node database
    pub fn latest_version(&self) -> Version {
        self.ndb.latest_version()
    }

    /// Root digest of the working tree
    pub fn root_hash(&self) -> Option<CryptoHash> {
        self.root.as_ref().map(|root| *root.hash())
    }

    /// Root node of the working tree
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    /// Number of keys in the working tree
    pub fn size(&self) -> u64 {
        self.root.as_ref().map_or(0, Node::size)
    }

    /// Most recently saved non-empty version
    pub fn last_saved(&self) -> Option<&ImmutableTree<S>> {
        self.last_saved.as_ref()
    }

    /// Options the tree was opened with
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub(crate) fn ndb(&self) -> &NodeDb<S> {
        &self.ndb
    }
}

impl<'db, S> MutableTree<S>
where
    S: StorageContext<'db>,
{
    /// Opens the tree stored in `storage` with default options.
    pub fn open(storage: S) -> CostResult<Self, Error> {
        Self::open_with_options(storage, TreeOptions::default())
    }

    /// Opens the tree stored in `storage`, loading the version registry and
    /// the root of the latest version.
    pub fn open_with_options(storage: S, options: TreeOptions) -> CostResult<Self, Error> {
        let mut cost = OperationCost::default();
        let ndb = cost_return_on_error!(&mut cost, NodeDb::open(storage, options.sync_writes));
        let versions = cost_return_on_error!(&mut cost, ndb.versions());

        let mut tree = MutableTree {
            ndb: Rc::new(ndb),
            root: None,
            version: 0,
            versions: BTreeSet::new(),
            last_saved: None,
            options,
        };

        if let Some(latest) = versions.last().copied() {
            cost_return_on_error!(&mut cost, tree.load_version(latest));
        }
        tree.versions = versions;

        Ok(tree).wrap_with_cost(cost)
    }

    /// Gets the value stored under `key` in the working tree.
    pub fn get(&self, key: &[u8]) -> CostResult<Option<Vec<u8>>, Error> {
        get_from(&self.ndb, self.root.as_ref(), key)
    }

    /// Read-only view of a committed version.
    pub fn get_immutable(&self, version: Version) -> CostResult<ImmutableTree<S>, Error> {
        let mut cost = OperationCost::default();
        if !self.version_exists(version) {
            return Err(Error::InvalidArgument(format!(
                "version {} does not exist",
                version
            )))
            .wrap_with_cost(cost);
        }
        let root = cost_return_on_error!(&mut cost, self.load_root(version));
        Ok(ImmutableTree::new(Rc::clone(&self.ndb), root, version)).wrap_with_cost(cost)
    }

    /// Starts a bulk import of `version` into this tree.
    ///
    /// The tree must never have committed a version and must hold no keys.
    /// The returned [`Importer`] borrows the tree until it is committed or
    /// dropped.
    pub fn import(&mut self, version: Version) -> Result<Importer<'_, 'db, S>, Error> {
        if version < 0 {
            return Err(Error::InvalidArgument(format!(
                "import version cannot be negative, got {}",
                version
            )));
        }
        let latest = self.latest_version();
        if latest > 0 {
            return Err(Error::InvalidState(format!(
                "found database at version {}, must be 0",
                latest
            )));
        }
        if !self.is_empty() {
            return Err(Error::NotEmpty);
        }
        Ok(Importer::new(self, version))
    }

    /// Makes a version whose nodes and root pointer were already committed
    /// the working version of the tree.
    ///
    /// The root is read back from storage. On error the tree is unchanged.
    pub fn apply_imported_version(&mut self, version: Version) -> CostResult<(), Error> {
        let latest = self.latest_version();
        if version > latest {
            return Err(Error::InvalidArgument(format!(
                "version {} is newer than the latest committed version {}",
                version, latest
            )))
            .wrap_with_cost(Default::default());
        }
        self.load_version(version).map_ok(|()| {
            self.versions.insert(version);
        })
    }

    /// Reads the root of `version` back from storage. `None` is an empty
    /// tree.
    fn load_root(&self, version: Version) -> CostResult<Option<Node>, Error> {
        let mut cost = OperationCost::default();
        let root_hash = match cost_return_on_error!(&mut cost, self.ndb.get_root(version)) {
            Some(root_hash) => root_hash,
            None => {
                return Err(Error::InvalidArgument(format!(
                    "version {} has no root pointer",
                    version
                )))
                .wrap_with_cost(cost)
            }
        };
        let root = match root_hash {
            Some(hash) => Some(cost_return_on_error!(
                &mut cost,
                self.ndb.get_existing_node(&hash)
            )),
            None => None,
        };
        Ok(root).wrap_with_cost(cost)
    }

    fn load_version(&mut self, version: Version) -> CostResult<(), Error> {
        self.load_root(version).map_ok(|root| {
            if root.is_some() {
                self.last_saved = Some(ImmutableTree::new(
                    Rc::clone(&self.ndb),
                    root.clone(),
                    version,
                ));
            }
            self.root = root;
            self.version = version;
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use vmerk_storage::rocksdb_storage::test_utils::TempStorage;

    use super::*;
    use crate::test_utils::{build_tree, kv};

    #[test]
    fn open_empty_tree() {
        let storage = TempStorage::new();
        let tree = MutableTree::open(storage.get_storage_context([b"tree".as_ref()]))
            .unwrap()
            .expect("cannot open tree");
        assert!(tree.is_empty());
        assert_eq!(tree.version(), 0);
        assert_eq!(tree.latest_version(), 0);
        assert!(tree.versions().is_empty());
        assert!(tree.last_saved().is_none());
        assert_eq!(tree.root_hash(), None);
        assert_eq!(tree.get(b"a").unwrap().expect("get failed"), None);
    }

    #[test]
    fn open_loads_latest_version() {
        let storage = TempStorage::new();
        let context = || storage.get_storage_context([b"tree".as_ref()]);
        let kvs = vec![kv(b"a", b"1", 1), kv(b"b", b"2", 2), kv(b"c", b"3", 2)];
        let root = build_tree(context(), 2, &kvs).unwrap().expect("cannot build tree");

        let tree = MutableTree::open(context()).unwrap().expect("cannot open tree");
        assert_eq!(tree.version(), 2);
        assert_eq!(tree.latest_version(), 2);
        assert!(tree.version_exists(2));
        assert!(!tree.version_exists(1));
        assert_eq!(tree.root_hash(), root);
        assert_eq!(tree.size(), 3);
        assert_eq!(
            tree.last_saved().map(ImmutableTree::version),
            Some(2)
        );

        assert_eq!(tree.get(b"a").unwrap().expect("get failed"), Some(b"1".to_vec()));
        assert_eq!(tree.get(b"c").unwrap().expect("get failed"), Some(b"3".to_vec()));
        assert_eq!(tree.get(b"bb").unwrap().expect("get failed"), None);
        assert_eq!(tree.get(b"0").unwrap().expect("get failed"), None);
    }

    #[test]
    fn import_requires_fresh_tree() {
        let storage = TempStorage::new();
        let context = || storage.get_storage_context([b"tree".as_ref()]);

        let mut fresh = MutableTree::open(context()).unwrap().expect("cannot open tree");
        assert_matches!(fresh.import(-1), Err(Error::InvalidArgument(_)));

        build_tree(context(), 3, &[kv(b"a", b"1", 1)])
            .unwrap()
            .expect("cannot build tree");
        let mut tree = MutableTree::open(context()).unwrap().expect("cannot open tree");
        assert_matches!(tree.import(4), Err(Error::InvalidState(_)));
    }

    #[test]
    fn import_rejects_tree_with_data_at_version_zero() {
        let storage = TempStorage::new();
        let context = || storage.get_storage_context([b"tree".as_ref()]);
        build_tree(context(), 0, &[kv(b"a", b"1", 0)])
            .unwrap()
            .expect("cannot build tree");

        let mut tree = MutableTree::open(context()).unwrap().expect("cannot open tree");
        assert_eq!(tree.latest_version(), 0);
        assert!(!tree.is_empty());
        assert_matches!(tree.import(1), Err(Error::NotEmpty));
    }

    #[test]
    fn get_immutable_of_unknown_version_fails() {
        let storage = TempStorage::new();
        let context = || storage.get_storage_context([b"tree".as_ref()]);
        build_tree(context(), 1, &[kv(b"a", b"1", 1)])
            .unwrap()
            .expect("cannot build tree");

        let tree = MutableTree::open(context()).unwrap().expect("cannot open tree");
        let snapshot = tree.get_immutable(1).unwrap().expect("version 1 exists");
        assert_eq!(snapshot.size(), 1);
        assert_eq!(snapshot.height(), 0);
        assert_eq!(snapshot.root_hash(), tree.root_hash());
        assert_matches!(tree.get_immutable(2).unwrap(), Err(Error::InvalidArgument(_)));
    }

    #[test]
    fn apply_imported_version_rejects_future_version() {
        let storage = TempStorage::new();
        let mut tree = MutableTree::open(storage.get_storage_context([b"tree".as_ref()]))
            .unwrap()
            .expect("cannot open tree");
        assert_matches!(
            tree.apply_imported_version(1).unwrap(),
            Err(Error::InvalidArgument(_))
        );
        assert!(tree.versions().is_empty());
        assert_eq!(tree.version(), 0);
    }
}
