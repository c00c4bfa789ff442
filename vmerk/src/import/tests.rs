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

use assert_matches::assert_matches;
use vmerk_storage::{
    rocksdb_storage::{test_utils::TempStorage, PrefixedRocksDbStorageContext},
    RawIterator, StorageContext,
};

use super::*;
use crate::{
    nodedb::NodeDb,
    test_utils::{build_tree, make_kvs_rand, make_kvs_seq, FailingStorageContext, KeyValue},
};

fn record(key: &[u8], value: &[u8], version: Version, height: u8) -> ExportNode {
    ExportNode {
        key: key.to_vec(),
        value: value.to_vec(),
        version,
        height,
    }
}

fn open_tree(storage: &TempStorage, name: &[u8]) -> MutableTree<PrefixedRocksDbStorageContext<'_>> {
    MutableTree::open(storage.get_storage_context([name]))
        .unwrap()
        .expect("cannot open tree")
}

fn import_all<'db, S: StorageContext<'db>>(
    tree: &mut MutableTree<S>,
    version: Version,
    stream: Vec<ExportNode>,
) {
    let mut importer = tree.import(version).expect("cannot start import");
    for node in stream {
        importer.add(node).unwrap().expect("cannot add node");
    }
    importer.commit().unwrap().expect("cannot commit import");
}

fn export_version(storage: &TempStorage, name: &[u8], version: Version) -> Vec<ExportNode> {
    let tree = open_tree(storage, name);
    let snapshot = tree.get_immutable(version).unwrap().expect("version missing");
    let stream = snapshot
        .export()
        .collect::<Result<Vec<_>, _>>()
        .expect("export failed");
    stream
}

fn round_trip(kvs: &[KeyValue], version: Version) {
    let storage = TempStorage::new();
    let source_hash = build_tree(storage.get_storage_context([b"source".as_ref()]), version, kvs)
        .unwrap()
        .expect("cannot build tree");
    let stream = export_version(&storage, b"source", version);
    assert_eq!(stream.len(), 2 * kvs.len() - 1);

    let mut tree = open_tree(&storage, b"dest");
    import_all(&mut tree, version, stream);

    assert_eq!(tree.root_hash(), source_hash);
    assert_eq!(tree.size(), kvs.len() as u64);
    assert_eq!(tree.version(), version);
    assert_eq!(tree.latest_version(), version);
    for (key, value, _) in kvs {
        assert_eq!(
            tree.get(key).unwrap().expect("get failed").as_ref(),
            Some(value)
        );
    }
}

#[test]
fn import_scenario() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    {
        let mut importer = tree.import(5).expect("cannot start import");
        importer
            .add(record(b"a", b"1", 3, 0))
            .unwrap()
            .expect("cannot add a");
        importer
            .add(record(b"b", b"2", 5, 0))
            .unwrap()
            .expect("cannot add b");
        assert_eq!(importer.stack_len(), 2);
        importer
            .add(record(b"m", b"", 5, 1))
            .unwrap()
            .expect("cannot add m");
        assert_eq!(importer.stack_len(), 1);
        assert_eq!(importer.pending_writes(), 3);
        assert_eq!(importer.nodes_added(), 3);
        importer.commit().unwrap().expect("cannot commit import");
        assert!(importer.is_closed());
    }

    let root = tree.root().expect("tree should have a root").clone();
    assert_eq!(root.key(), b"m");
    assert_eq!(root.size(), 2);
    assert_eq!(root.height(), 1);
    assert_eq!(root.version(), 5);

    let left = root.left_hash().expect("root should have a left child");
    let right = root.right_hash().expect("root should have a right child");
    let left = tree.ndb().get_existing_node(left).unwrap().expect("left missing");
    let right = tree.ndb().get_existing_node(right).unwrap().expect("right missing");
    assert_eq!(left.key(), b"a");
    assert_eq!(left.version(), 3);
    assert_eq!(right.key(), b"b");
    assert_eq!(right.value(), b"2");

    assert_eq!(
        tree.ndb().get_root(5).unwrap().expect("root read failed"),
        Some(Some(*root.hash()))
    );
    assert_eq!(tree.latest_version(), 5);
    assert_eq!(tree.version(), 5);
    assert!(tree.version_exists(5));
    assert_eq!(
        tree.last_saved().and_then(|saved| saved.root_hash()),
        Some(*root.hash())
    );
}

#[test]
fn import_infers_structure_from_heights() {
    let a = Node::new_leaf(b"a".to_vec(), b"1".to_vec(), 1).unwrap();
    let b = Node::new_leaf(b"b".to_vec(), b"2".to_vec(), 1).unwrap();
    let c = Node::new_leaf(b"c".to_vec(), b"3".to_vec(), 1).unwrap();
    let bc = Node::new_inner(b"c".to_vec(), 2, &b, &c).unwrap();
    let expected = Node::new_inner(b"b".to_vec(), 2, &a, &bc).unwrap();

    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    import_all(
        &mut tree,
        2,
        vec![
            record(b"a", b"1", 1, 0),
            record(b"b", b"2", 1, 0),
            record(b"c", b"3", 1, 0),
            record(b"c", b"", 2, 1),
            record(b"b", b"", 2, 2),
        ],
    );

    assert_eq!(tree.root_hash(), Some(*expected.hash()));
    assert_eq!(tree.size(), 3);
    assert_eq!(tree.root().map(Node::height), Some(2));
    assert_eq!(tree.get(b"a").unwrap().expect("get failed"), Some(b"1".to_vec()));
    assert_eq!(tree.get(b"b").unwrap().expect("get failed"), Some(b"2".to_vec()));
    assert_eq!(tree.get(b"c").unwrap().expect("get failed"), Some(b"3".to_vec()));
}

#[test]
fn import_single_child_node() {
    let a = Node::new_leaf(b"a".to_vec(), b"1".to_vec(), 1).unwrap();
    let expected = Node::from_parts(b"a".to_vec(), Vec::new(), 1, 1, 1, Some(a.hash), None)
        .unwrap();

    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    import_all(
        &mut tree,
        1,
        vec![record(b"a", b"1", 1, 0), record(b"a", b"", 1, 1)],
    );
    assert_eq!(tree.root_hash(), Some(*expected.hash()));
    assert_eq!(tree.size(), 1);
    assert_eq!(tree.get(b"a").unwrap().expect("get failed"), Some(b"1".to_vec()));
    assert_eq!(tree.get(b"b").unwrap().expect("get failed"), None);
}

#[test]
fn round_trip_small_trees() {
    for count in 1..=9 {
        round_trip(&make_kvs_seq(count, 4), 4);
    }
}

#[test]
fn round_trip_random_tree() {
    round_trip(&make_kvs_rand(300, 7, 12), 12);
}

#[test]
fn round_trip_empty_tree() {
    let storage = TempStorage::new();
    build_tree(storage.get_storage_context([b"source".as_ref()]), 3, &[])
        .unwrap()
        .expect("cannot build tree");
    let stream = export_version(&storage, b"source", 3);
    assert!(stream.is_empty());

    {
        let mut tree = open_tree(&storage, b"dest");
        import_all(&mut tree, 3, stream);
        assert!(tree.is_empty());
        assert_eq!(tree.root_hash(), None);
        assert_eq!(tree.version(), 3);
        assert_eq!(tree.latest_version(), 3);
        assert!(tree.version_exists(3));
        assert!(tree.last_saved().is_none());
    }

    let reopened = open_tree(&storage, b"dest");
    assert!(reopened.is_empty());
    assert_eq!(reopened.latest_version(), 3);
    assert!(reopened.version_exists(3));
}

#[test]
fn imported_version_survives_reopen() {
    let storage = TempStorage::new();
    let kvs = make_kvs_rand(50, 3, 9);
    let hash = build_tree(storage.get_storage_context([b"source".as_ref()]), 9, &kvs)
        .unwrap()
        .expect("cannot build tree");
    let stream = export_version(&storage, b"source", 9);

    {
        let mut tree = open_tree(&storage, b"dest");
        import_all(&mut tree, 9, stream);
    }

    let mut tree = open_tree(&storage, b"dest");
    assert_eq!(tree.root_hash(), hash);
    assert_eq!(tree.version(), 9);
    assert_eq!(tree.versions().iter().copied().collect::<Vec<_>>(), vec![9]);
    assert_eq!(
        tree.last_saved().map(crate::ImmutableTree::version),
        Some(9)
    );
    assert_matches!(tree.import(10), Err(Error::InvalidState(_)));
}

#[test]
fn failed_commit_writes_nothing() {
    let storage = TempStorage::new();
    let context = || storage.get_storage_context([b"tree".as_ref()]);
    let mut tree = MutableTree::open(FailingStorageContext::new(context()))
        .unwrap()
        .expect("cannot open tree");
    {
        let mut importer = tree.import(5).expect("cannot start import");
        for node in [
            record(b"a", b"1", 3, 0),
            record(b"b", b"2", 5, 0),
            record(b"b", b"", 5, 1),
        ] {
            importer.add(node).unwrap().expect("cannot add node");
        }
        assert_matches!(
            importer.commit().unwrap(),
            Err(Error::StorageError(vmerk_storage::Error::BackendError(_)))
        );
        assert_matches!(importer.commit().unwrap(), Err(Error::NoImportInProgress));
        importer.close();
    }

    assert!(tree.is_empty());
    assert_eq!(tree.latest_version(), 0);
    assert!(tree.versions().is_empty());

    let mut iter = context().raw_iter();
    iter.seek_to_first().unwrap();
    assert!(!iter.valid().unwrap());

    let ndb = NodeDb::open(context(), true).unwrap().expect("cannot open node db");
    assert_eq!(ndb.get_root(5).unwrap().expect("root read failed"), None);
}

#[test]
fn commit_rejects_disconnected_stream() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    {
        let mut importer = tree.import(2).expect("cannot start import");
        importer
            .add(record(b"a", b"1", 1, 0))
            .unwrap()
            .expect("cannot add a");
        importer
            .add(record(b"b", b"2", 2, 0))
            .unwrap()
            .expect("cannot add b");
        assert_matches!(importer.commit().unwrap(), Err(Error::StructuralError(2)));

        importer
            .add(record(b"c", b"3", 2, 0))
            .unwrap()
            .expect("cannot add c");
        assert_matches!(importer.commit().unwrap(), Err(Error::StructuralError(3)));
    }

    assert_eq!(tree.latest_version(), 0);
    assert!(tree.versions().is_empty());
    assert!(tree.is_empty());
    assert_eq!(
        tree.ndb().get_root(2).unwrap().expect("root read failed"),
        None
    );
}

#[test]
fn add_rejects_version_above_target() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    let mut importer = tree.import(4).expect("cannot start import");
    importer
        .add(record(b"a", b"1", 4, 0))
        .unwrap()
        .expect("cannot add a");

    assert_matches!(
        importer.add(record(b"b", b"2", 5, 0)).unwrap(),
        Err(Error::VersionExceeded {
            node_version: 5,
            import_version: 4
        })
    );
    assert_eq!(importer.stack_len(), 1);
    assert_eq!(importer.pending_writes(), 1);
    assert_eq!(importer.nodes_added(), 1);

    assert_matches!(
        importer.add(record(b"b", b"2", -1, 0)).unwrap(),
        Err(Error::InvalidArgument(_))
    );
    assert_eq!(importer.stack_len(), 1);
}

#[test]
fn add_rejects_inconsistent_nodes() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    let mut importer = tree.import(1).expect("cannot start import");

    // nothing on the stack to adopt
    assert_matches!(
        importer.add(record(b"a", b"", 1, 1)).unwrap(),
        Err(Error::ValidationFailed(_))
    );
    assert_eq!(importer.stack_len(), 0);
    assert_eq!(importer.pending_writes(), 0);

    importer
        .add(record(b"a", b"1", 1, 0))
        .unwrap()
        .expect("cannot add a");

    assert_matches!(
        importer.add(record(b"", b"2", 1, 0)).unwrap(),
        Err(Error::ValidationFailed(_))
    );
    assert_matches!(
        importer.add(record(b"b", b"value", 1, 1)).unwrap(),
        Err(Error::ValidationFailed(_))
    );
    assert_eq!(importer.stack_len(), 1);
    assert_eq!(importer.pending_writes(), 1);
}

#[test]
fn empty_key_allowed_for_sole_root() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    import_all(&mut tree, 1, vec![record(b"", b"value", 1, 0)]);
    assert_eq!(tree.size(), 1);
    assert_eq!(tree.get(b"").unwrap().expect("get failed"), Some(b"value".to_vec()));
}

#[test]
fn empty_key_rejected_below_root() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    {
        let mut importer = tree.import(1).expect("cannot start import");
        importer
            .add(record(b"", b"1", 1, 0))
            .unwrap()
            .expect("cannot add empty key leaf");
        importer
            .add(record(b"b", b"2", 1, 0))
            .unwrap()
            .expect("cannot add b");

        assert_matches!(
            importer.add(record(b"b", b"", 1, 1)).unwrap(),
            Err(Error::ValidationFailed(_))
        );
        assert_eq!(importer.stack_len(), 2);
        assert_eq!(importer.pending_writes(), 2);
        assert_matches!(importer.commit().unwrap(), Err(Error::StructuralError(2)));
    }
    assert_eq!(tree.latest_version(), 0);
    assert!(tree.is_empty());
}

#[test]
fn empty_key_rejected_as_single_child() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    let mut importer = tree.import(1).expect("cannot start import");
    importer
        .add(record(b"", b"1", 1, 0))
        .unwrap()
        .expect("cannot add empty key leaf");
    assert_matches!(
        importer.add(record(b"a", b"", 1, 1)).unwrap(),
        Err(Error::ValidationFailed(_))
    );
    assert_eq!(importer.stack_len(), 1);
}

#[test]
fn close_is_idempotent() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    {
        let mut importer = tree.import(1).expect("cannot start import");
        importer
            .add(record(b"a", b"1", 1, 0))
            .unwrap()
            .expect("cannot add a");
        importer.close();
        importer.close();
        assert!(importer.is_closed());
        assert_eq!(importer.pending_writes(), 0);
        assert_matches!(
            importer.add(record(b"b", b"2", 1, 0)).unwrap(),
            Err(Error::NoImportInProgress)
        );
        assert_matches!(importer.commit().unwrap(), Err(Error::NoImportInProgress));
    }
    assert_eq!(tree.latest_version(), 0);
    assert!(tree.is_empty());

    {
        let mut importer = tree.import(1).expect("cannot start import");
        importer
            .add(record(b"a", b"1", 1, 0))
            .unwrap()
            .expect("cannot add a");
        importer.commit().unwrap().expect("cannot commit import");
        importer.close();
        importer.close();
        assert_matches!(importer.commit().unwrap(), Err(Error::NoImportInProgress));
    }
    assert_eq!(tree.latest_version(), 1);
}

#[test]
fn import_reports_costs() {
    let storage = TempStorage::new();
    let mut tree = open_tree(&storage, b"tree");
    let mut importer = tree.import(1).expect("cannot start import");

    let added = importer.add(record(b"a", b"1", 1, 0));
    assert!(added.cost().hash_node_calls >= 2);
    assert_eq!(added.cost().seek_count, 0);
    added.unwrap().expect("cannot add a");

    let committed = importer.commit();
    assert!(committed.cost().storage_written_bytes > 0);
    committed.unwrap().expect("cannot commit import");
}
