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

//! Storage context that refuses to commit

use vmerk_costs::{CostResult, CostsExt};
use vmerk_storage::{Error, StorageContext};

/// Wraps a storage context and fails every batch commit, dropping the batch
/// unwritten. Reads go to the wrapped context.
pub struct FailingStorageContext<S> {
    inner: S,
}

impl<S> FailingStorageContext<S> {
    /// Wraps `inner`
    pub fn new(inner: S) -> Self {
        FailingStorageContext { inner }
    }
}

impl<'db, S> StorageContext<'db> for FailingStorageContext<S>
where
    S: StorageContext<'db>,
{
    type Batch = S::Batch;
    type RawIterator = S::RawIterator;

    fn get<K: AsRef<[u8]>>(&self, key: K) -> CostResult<Option<Vec<u8>>, Error> {
        self.inner.get(key)
    }

    fn new_batch(&self) -> Self::Batch {
        self.inner.new_batch()
    }

    fn commit_batch(&self, _batch: Self::Batch, _sync: bool) -> CostResult<(), Error> {
        Err(Error::BackendError("batch commit rejected".to_owned()))
            .wrap_with_cost(Default::default())
    }

    fn raw_iter(&self) -> Self::RawIterator {
        self.inner.raw_iter()
    }
}
