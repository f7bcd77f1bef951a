// Copyright 2020 The Keel Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hash Function
//!
//! Primary hash function used in the protocol
//!

use std::fmt;

use blake2_rfc::blake2b::Blake2b;

use crate::ser::{self, AsFixedBytes, Readable, Reader, Writeable, Writer};
use crate::util;

/// A hash to uniquely (or close enough) identify one of the main blockchain
/// constructs. Used pervasively for block headers and the roots they commit
/// to. Ordering is lexicographic over the bytes, which for a big-endian
/// interpretation is also numeric ordering.
#[derive(Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

/// The "zero" hash, no known preimage.
pub const ZERO_HASH: Hash = Hash([0; 32]);

impl Hash {
	/// Creates a new hash from a byte slice, padding with zeroes past its
	/// end if fewer than 32 bytes are provided.
	pub fn from_vec(v: &[u8]) -> Hash {
		let mut a = [0; 32];
		let copy_len = v.len().min(32);
		a[..copy_len].copy_from_slice(&v[..copy_len]);
		Hash(a)
	}

	/// Converts the hash to a byte vector
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Converts the hash to a byte slice
	pub fn to_slice(&self) -> &[u8] {
		&self.0
	}

	/// Convert the hash to a hex string
	pub fn to_hex(&self) -> String {
		util::to_hex(&self.0)
	}
}

impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

impl AsFixedBytes for Hash {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl Writeable for Hash {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		writer.write_fixed_bytes(self)
	}
}

impl Readable for Hash {
	fn read(reader: &mut dyn Reader) -> Result<Hash, ser::Error> {
		let v = reader.read_32_bytes()?;
		Ok(Hash::from_vec(&v))
	}
}

/// Serializer that outputs a blake2b-256 digest of anything written to it.
pub struct HashWriter {
	state: Blake2b,
}

impl HashWriter {
	/// Consume the `HashWriter`, outputting its current hash into a 32-byte
	/// array.
	pub fn finalize(self, output: &mut [u8]) {
		output.copy_from_slice(self.state.finalize().as_bytes());
	}
}

impl Default for HashWriter {
	fn default() -> HashWriter {
		HashWriter {
			state: Blake2b::new(32),
		}
	}
}

impl Writer for HashWriter {
	fn write_u8(&mut self, n: u8) -> Result<(), ser::Error> {
		self.state.update(&[n]);
		Ok(())
	}
	fn write_u16(&mut self, n: u16) -> Result<(), ser::Error> {
		self.state.update(&n.to_le_bytes());
		Ok(())
	}
	fn write_u32(&mut self, n: u32) -> Result<(), ser::Error> {
		self.state.update(&n.to_le_bytes());
		Ok(())
	}
	fn write_u64(&mut self, n: u64) -> Result<(), ser::Error> {
		self.state.update(&n.to_le_bytes());
		Ok(())
	}
	fn write_fixed_bytes(&mut self, bytes: &dyn AsFixedBytes) -> Result<(), ser::Error> {
		self.state.update(bytes.as_fixed_bytes());
		Ok(())
	}
}

/// A trait for types that have a canonical hash
pub trait Hashed {
	/// Obtain the hash of the object
	fn hash(&self) -> Hash;
}

/// Implementing this trait on a type opts it into the default blake2b
/// hashing of its canonical binary encoding.
pub trait DefaultHashable: Writeable {}

impl<D: DefaultHashable> Hashed for D {
	fn hash(&self) -> Hash {
		let mut hasher = HashWriter::default();
		// hashing into a HashWriter never fails
		Writeable::write(self, &mut hasher).unwrap();
		let mut ret = [0; 32];
		hasher.finalize(&mut ret);
		Hash(ret)
	}
}
