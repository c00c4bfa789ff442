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

//! Storage encoding of nodes

use std::io::{Read, Write};

use ed::{Decode, Encode, Terminated};
use integer_encoding::{VarInt, VarIntReader, VarIntWriter};

use super::{CryptoHash, Node, HASH_LENGTH};
use crate::error::Error;

impl Node {
    /// Serializes the node for the node database.
    #[inline]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut bytes);
        bytes
    }

    /// Deserializes a node and recomputes its hash.
    pub fn decode_raw(bytes: &[u8]) -> Result<Self, Error> {
        Node::decode(bytes).map_err(Error::EdError)
    }

    fn encoded_len(&self) -> usize {
        let mut len = u64::from(self.height).required_space()
            + self.size.required_space()
            + self.version.required_space()
            + self.key.len().required_space()
            + self.key.len();
        if self.is_leaf() {
            len += self.value.len().required_space() + self.value.len();
        } else {
            len += child_len(&self.left_hash) + child_len(&self.right_hash);
        }
        len
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        // writing into a `Vec` cannot fail
        let _ = Encode::encode_into(self, out);
    }
}

fn child_len(child: &Option<CryptoHash>) -> usize {
    match child {
        Some(_) => 1 + HASH_LENGTH,
        None => 1,
    }
}

fn write_child<W: Write>(out: &mut W, child: &Option<CryptoHash>) -> ed::Result<()> {
    match child {
        Some(hash) => {
            out.write_all(&[1])?;
            out.write_all(hash)?;
        }
        None => out.write_all(&[0])?,
    }
    Ok(())
}

fn read_child<R: Read>(input: &mut R) -> ed::Result<Option<CryptoHash>> {
    let mut flag = [0];
    input.read_exact(&mut flag)?;
    match flag[0] {
        0 => Ok(None),
        1 => {
            let mut hash = CryptoHash::default();
            input.read_exact(&mut hash)?;
            Ok(Some(hash))
        }
        byte => Err(ed::Error::UnexpectedByte(byte)),
    }
}

fn read_bytes<R: Read>(input: &mut R) -> ed::Result<Vec<u8>> {
    let length: usize = input.read_varint()?;
    let mut bytes = vec![0; length];
    input.read_exact(&mut bytes)?;
    Ok(bytes)
}

impl Encode for Node {
    #[inline]
    fn encode_into<W: Write>(&self, out: &mut W) -> ed::Result<()> {
        out.write_varint(u64::from(self.height))?;
        out.write_varint(self.size)?;
        out.write_varint(self.version)?;
        out.write_varint(self.key.len())?;
        out.write_all(&self.key)?;

        if self.is_leaf() {
            out.write_varint(self.value.len())?;
            out.write_all(&self.value)?;
        } else {
            write_child(out, &self.left_hash)?;
            write_child(out, &self.right_hash)?;
        }
        Ok(())
    }

    #[inline]
    fn encoding_length(&self) -> ed::Result<usize> {
        Ok(self.encoded_len())
    }
}

impl Decode for Node {
    #[inline]
    fn decode<R: Read>(input: R) -> ed::Result<Self> {
        let mut node = Node::default();
        Self::decode_into(&mut node, input)?;
        Ok(node)
    }

    #[inline]
    fn decode_into<R: Read>(&mut self, mut input: R) -> ed::Result<()> {
        let height: u64 = input.read_varint()?;
        self.height = u8::try_from(height).map_err(|_| ed::Error::UnexpectedByte(u8::MAX))?;
        self.size = input.read_varint()?;
        self.version = input.read_varint()?;
        self.key = read_bytes(&mut input)?;

        if self.height == 0 {
            self.value = read_bytes(&mut input)?;
            self.left_hash = None;
            self.right_hash = None;
        } else {
            self.value.clear();
            self.left_hash = read_child(&mut input)?;
            self.right_hash = read_child(&mut input)?;
        }

        self.hash = self.compute_hash().unwrap();
        Ok(())
    }
}

impl Terminated for Node {}
