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

//! Prefixed write batch for the RocksDB backend.

use rocksdb::WriteBatch;

use super::make_prefixed_key;
use crate::{rocksdb_storage::SubtreePrefix, Batch};

/// Wrapper to RocksDB batch applying the context prefix to every key.
pub struct PrefixedRocksDbBatch {
    pub(super) prefix: SubtreePrefix,
    pub(super) batch: WriteBatch,
    pub(super) written_bytes: u64,
}

impl PrefixedRocksDbBatch {
    pub(super) fn new(prefix: SubtreePrefix) -> Self {
        Self {
            prefix,
            batch: WriteBatch::default(),
            written_bytes: 0,
        }
    }

    /// Bytes (prefixed keys plus values) queued so far.
    pub fn written_bytes(&self) -> u64 {
        self.written_bytes
    }
}

impl Batch for PrefixedRocksDbBatch {
    fn put<K: AsRef<[u8]>>(&mut self, key: K, value: &[u8]) {
        let prefixed_key = make_prefixed_key(&self.prefix, key);
        self.written_bytes += (prefixed_key.len() + value.len()) as u64;
        self.batch.put(prefixed_key, value);
    }

    fn delete<K: AsRef<[u8]>>(&mut self, key: K) {
        self.batch.delete(make_prefixed_key(&self.prefix, key));
    }

    fn len(&self) -> usize {
        self.batch.len()
    }
}
