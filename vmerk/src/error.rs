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

//! Errors

use crate::Version;

/// Errors raised by the tree, its importer and the node database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Caller errors
    /// Argument out of range
    #[error("invalid argument error {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the tree's current state
    #[error("invalid state error {0}")]
    InvalidState(String),

    /// Import requested on a tree holding data
    #[error("tree must be empty")]
    NotEmpty,

    /// Importer already committed or closed
    #[error("no import in progress")]
    NoImportInProgress,

    /// Record written at a version after the import target
    #[error("node version {node_version} can't be greater than import version {import_version}")]
    VersionExceeded {
        /// Version of the rejected record
        node_version: Version,
        /// Target version of the import
        import_version: Version,
    },

    // Stream errors
    /// Node is not self-consistent
    #[error("validation failed error {0}")]
    ValidationFailed(&'static str),

    /// Stream did not describe a single tree
    #[error("invalid node structure, {0} subtrees left on the import stack")]
    StructuralError(usize),

    // Database errors
    /// Stored bytes could not be interpreted
    #[error("corrupted data error {0}")]
    CorruptedData(String),

    /// Referenced node is missing from storage
    #[error("node not found error {0}")]
    NodeNotFound(String),

    /// Backend failure
    #[error("storage error {0}")]
    StorageError(vmerk_storage::Error),

    /// Node encoding failure
    #[error("ed error: {0}")]
    EdError(ed::Error),
}

impl From<vmerk_storage::Error> for Error {
    fn from(value: vmerk_storage::Error) -> Self {
        Error::StorageError(value)
    }
}

/// Result with the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
