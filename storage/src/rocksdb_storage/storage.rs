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

//! Implementation for a storage abstraction over RocksDB.

use std::path::Path;

use lazy_static::lazy_static;
use rocksdb::DB;

use super::PrefixedRocksDbStorageContext;
use crate::{Error, Error::RocksDBError};

/// Prefix isolating the keys of one tree inside a shared database.
pub type SubtreePrefix = [u8; blake3::OUT_LEN];

lazy_static! {
    static ref DEFAULT_OPTS: rocksdb::Options = default_db_opts();
}

/// RocksDB options used when opening a storage.
pub fn default_db_opts() -> rocksdb::Options {
    let mut opts = rocksdb::Options::default();
    opts.create_if_missing(true);
    opts.increase_parallelism(num_cpus::get() as i32);
    opts.set_allow_mmap_writes(true);
    opts.set_allow_mmap_reads(true);
    opts.set_atomic_flush(true);
    opts
}

/// Storage which uses RocksDB as its backend.
pub struct RocksDbStorage {
    db: DB,
}

impl RocksDbStorage {
    /// Create RocksDb storage with default parameters using `path`.
    pub fn default_rocksdb_with_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let db = DB::open(&DEFAULT_OPTS, &path).map_err(RocksDBError)?;
        Ok(RocksDbStorage { db })
    }

    /// A helper method to build a prefix to rocksdb keys or identify a tree
    /// by its path.
    pub fn build_prefix<'a, P>(path: P) -> SubtreePrefix
    where
        P: IntoIterator<Item = &'a [u8]>,
    {
        let mut segments_count: usize = 0;
        let mut res = Vec::new();
        let mut lengths = Vec::new();

        for segment in path {
            segments_count += 1;
            res.extend_from_slice(segment);
            lengths.extend(segment.len().to_ne_bytes());
        }

        res.extend(segments_count.to_ne_bytes());
        res.extend(lengths);
        *blake3::hash(&res).as_bytes()
    }

    /// Make a storage context for the tree identified by `path`.
    pub fn get_storage_context<'a, P>(&self, path: P) -> PrefixedRocksDbStorageContext<'_>
    where
        P: IntoIterator<Item = &'a [u8]>,
    {
        PrefixedRocksDbStorageContext::new(&self.db, Self::build_prefix(path))
    }
}
