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

//! Storage context without a transaction, writing through atomic batches.

use rocksdb::{DBRawIteratorWithThreadMode, WriteOptions, DB};
use vmerk_costs::{CostResult, CostsExt, OperationCost};

use super::{make_prefixed_key, PrefixedRocksDbBatch, PrefixedRocksDbRawIterator};
use crate::{rocksdb_storage::SubtreePrefix, Batch, Error, Error::RocksDBError, StorageContext};

/// Storage context with a prefix applied to be used for a single tree.
pub struct PrefixedRocksDbStorageContext<'db> {
    storage: &'db DB,
    prefix: SubtreePrefix,
}

impl<'db> PrefixedRocksDbStorageContext<'db> {
    /// Create a new prefixed storage context instance
    pub fn new(storage: &'db DB, prefix: SubtreePrefix) -> Self {
        PrefixedRocksDbStorageContext { storage, prefix }
    }

    /// Prefix applied to every key of this context
    pub fn prefix(&self) -> &SubtreePrefix {
        &self.prefix
    }
}

impl<'db> StorageContext<'db> for PrefixedRocksDbStorageContext<'db> {
    type Batch = PrefixedRocksDbBatch;
    type RawIterator = PrefixedRocksDbRawIterator<DBRawIteratorWithThreadMode<'db, DB>>;

    fn get<K: AsRef<[u8]>>(&self, key: K) -> CostResult<Option<Vec<u8>>, Error> {
        self.storage
            .get(make_prefixed_key(&self.prefix, key))
            .map_err(RocksDBError)
            .wrap_fn_cost(|value| OperationCost {
                seek_count: 1,
                storage_loaded_bytes: value
                    .as_ref()
                    .ok()
                    .and_then(Option::as_ref)
                    .map(|x| x.len() as u64)
                    .unwrap_or(0),
                ..Default::default()
            })
    }

    fn new_batch(&self) -> Self::Batch {
        PrefixedRocksDbBatch::new(self.prefix)
    }

    fn commit_batch(&self, batch: Self::Batch, sync: bool) -> CostResult<(), Error> {
        let cost = OperationCost {
            seek_count: batch.len() as u32,
            storage_written_bytes: batch.written_bytes(),
            ..Default::default()
        };

        let mut write_options = WriteOptions::default();
        write_options.set_sync(sync);

        self.storage
            .write_opt(batch.batch, &write_options)
            .map_err(RocksDBError)
            .wrap_with_cost(cost)
    }

    fn raw_iter(&self) -> Self::RawIterator {
        PrefixedRocksDbRawIterator {
            prefix: self.prefix,
            raw_iterator: self.storage.raw_iterator(),
        }
    }
}
