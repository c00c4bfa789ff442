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

//! Prefixed raw iterator implementation for RocksDB backend.

use rocksdb::{DBAccess, DBRawIteratorWithThreadMode};
use vmerk_costs::{CostContext, CostsExt, OperationCost};

use super::make_prefixed_key;
use crate::{rocksdb_storage::SubtreePrefix, RawIterator};

/// Raw iterator over prefixed storage. Keys outside of the prefix are
/// reported as invalid and keys inside it are returned without the prefix.
pub struct PrefixedRocksDbRawIterator<I> {
    pub(super) prefix: SubtreePrefix,
    pub(super) raw_iterator: I,
}

impl<'a, D: DBAccess> RawIterator for PrefixedRocksDbRawIterator<DBRawIteratorWithThreadMode<'a, D>> {
    fn seek_to_first(&mut self) -> CostContext<()> {
        self.raw_iterator.seek(self.prefix);
        ().wrap_with_cost(OperationCost::with_seek_count(1))
    }

    fn seek<K: AsRef<[u8]>>(&mut self, key: K) -> CostContext<()> {
        self.raw_iterator.seek(make_prefixed_key(&self.prefix, key));
        ().wrap_with_cost(OperationCost::with_seek_count(1))
    }

    fn next(&mut self) -> CostContext<()> {
        self.raw_iterator.next();
        ().wrap_with_cost(OperationCost::with_seek_count(1))
    }

    fn value(&self) -> CostContext<Option<&[u8]>> {
        let mut cost = OperationCost::default();

        let value = if self.valid().unwrap_add_cost(&mut cost) {
            self.raw_iterator.value().inspect(|v| {
                cost.storage_loaded_bytes += v.len() as u64;
            })
        } else {
            None
        };

        value.wrap_with_cost(cost)
    }

    fn key(&self) -> CostContext<Option<&[u8]>> {
        let mut cost = OperationCost::default();

        let key = match self.raw_iterator.key() {
            Some(k) if k.starts_with(&self.prefix) => {
                cost.storage_loaded_bytes += k.len() as u64;
                Some(k.split_at(self.prefix.len()).1)
            }
            _ => None,
        };

        key.wrap_with_cost(cost)
    }

    fn valid(&self) -> CostContext<bool> {
        self.raw_iterator
            .key()
            .map(|k| k.starts_with(&self.prefix))
            .unwrap_or(false)
            .wrap_with_cost(OperationCost::default())
    }
}
