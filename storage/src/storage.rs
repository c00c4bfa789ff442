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

//! Storage traits

use vmerk_costs::{CostContext, CostResult};

use crate::Error;

/// Storage context.
/// Provides the operations the tree needs from an ordered key-value store,
/// scoped to a single tree (for example by a key prefix).
pub trait StorageContext<'db> {
    /// Storage batch type
    type Batch: Batch;

    /// Storage raw iterator type (to iterate over storage without
    /// supplying a key)
    type RawIterator: RawIterator;

    /// Get entry by `key` from data storage
    fn get<K: AsRef<[u8]>>(&self, key: K) -> CostResult<Option<Vec<u8>>, Error>;

    /// Initialize a new batch. Nothing reaches storage until the batch is
    /// passed to [`StorageContext::commit_batch`]; dropping it discards every
    /// buffered operation.
    fn new_batch(&self) -> Self::Batch;

    /// Applies every operation of `batch` atomically: either all of them
    /// become visible or none do. With `sync` set the write is flushed to
    /// durable media before returning.
    fn commit_batch(&self, batch: Self::Batch, sync: bool) -> CostResult<(), Error>;

    /// Get raw iterator over storage
    fn raw_iter(&self) -> Self::RawIterator;
}

/// Database batch.
pub trait Batch {
    /// Appends a put operation to the batch.
    fn put<K: AsRef<[u8]>>(&mut self, key: K, value: &[u8]);

    /// Appends a delete operation to the batch.
    fn delete<K: AsRef<[u8]>>(&mut self, key: K);

    /// Number of buffered operations.
    fn len(&self) -> usize;

    /// Batch emptiness predicate
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Allows to iterate over database record inside of storage context.
pub trait RawIterator {
    /// Move iterator to first valid record.
    fn seek_to_first(&mut self) -> CostContext<()>;

    /// Move iterator forward until `key` is hit.
    fn seek<K: AsRef<[u8]>>(&mut self, key: K) -> CostContext<()>;

    /// Move iterator to next record.
    fn next(&mut self) -> CostContext<()>;

    /// Return value of key-value pair where raw iterator points at.
    fn value(&self) -> CostContext<Option<&[u8]>>;

    /// Return key of key-value pair where raw iterator points at.
    fn key(&self) -> CostContext<Option<&[u8]>>;

    /// Check if raw iterator points into a valid record
    fn valid(&self) -> CostContext<bool>;
}
