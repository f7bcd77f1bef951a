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

//! Block headers and their wire encoding.

use crate::core::hash::{DefaultHashable, Hash, ZERO_HASH};
use crate::pow;
use crate::ser::{self, Readable, Reader, Writeable, Writer};

/// Size in bytes of an encoded block header.
pub const HEADER_SIZE: usize = 300;

/// A block header committing to the block's proof of work, its parent and
/// the various roots of the authenticated structures it seals. The chain
/// engine only interprets `prev_block`, `time`, `bits` and `name_root`;
/// every other field is carried and committed to verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
	/// Protocol version of the block
	pub version: u32,
	/// Hash of the block previous to this one
	pub prev_block: Hash,
	/// Root of the transaction merkle tree
	pub merkle_root: Hash,
	/// Root of the witness tree
	pub witness_root: Hash,
	/// Root of the committed name tree as of the last commitment interval
	pub tree_root: Hash,
	/// Root of the compact block filter
	pub filter_root: Hash,
	/// Reserved commitment, zero until assigned a meaning
	pub reserved_root: Hash,
	/// Timestamp, seconds since the unix epoch
	pub time: u64,
	/// Compact proof-of-work target for this block
	pub bits: u32,
	/// Proof-of-work nonce
	pub nonce: u32,
	/// Extra nonce space for miners that exhaust `nonce`
	pub extra_nonce: [u8; 24],
	/// Miner commitment mask
	pub mask: [u8; 32],
	/// Root of the name-commitment set this header makes resolvable
	pub name_root: Hash,
}

impl Default for BlockHeader {
	fn default() -> BlockHeader {
		BlockHeader {
			version: 0,
			prev_block: ZERO_HASH,
			merkle_root: ZERO_HASH,
			witness_root: ZERO_HASH,
			tree_root: ZERO_HASH,
			filter_root: ZERO_HASH,
			reserved_root: ZERO_HASH,
			time: 0,
			bits: 0,
			nonce: 0,
			extra_nonce: [0; 24],
			mask: [0; 32],
			name_root: ZERO_HASH,
		}
	}
}

impl DefaultHashable for BlockHeader {}

/// The binary definition of a header is consensus material, it is the exact
/// data the proof-of-work hash commits to.
impl Writeable for BlockHeader {
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), ser::Error> {
		ser_multiwrite!(
			writer,
			[write_u32, self.version],
			[write_fixed_bytes, &self.prev_block],
			[write_fixed_bytes, &self.merkle_root],
			[write_fixed_bytes, &self.witness_root],
			[write_fixed_bytes, &self.tree_root],
			[write_fixed_bytes, &self.filter_root],
			[write_fixed_bytes, &self.reserved_root],
			[write_u64, self.time],
			[write_u32, self.bits],
			[write_u32, self.nonce],
			[write_fixed_bytes, &self.extra_nonce],
			[write_fixed_bytes, &self.mask],
			[write_fixed_bytes, &self.name_root]
		);
		Ok(())
	}
}

impl Readable for BlockHeader {
	fn read(reader: &mut dyn Reader) -> Result<BlockHeader, ser::Error> {
		let version = reader.read_u32()?;
		let (prev_block, merkle_root, witness_root, tree_root, filter_root, reserved_root) = ser_multiread!(
			reader,
			read_32_bytes,
			read_32_bytes,
			read_32_bytes,
			read_32_bytes,
			read_32_bytes,
			read_32_bytes
		);
		let (time, bits, nonce) = ser_multiread!(reader, read_u64, read_u32, read_u32);

		let mut extra_nonce = [0u8; 24];
		extra_nonce.copy_from_slice(&reader.read_fixed_bytes(24)?);
		let mut mask = [0u8; 32];
		mask.copy_from_slice(&reader.read_32_bytes()?);
		let name_root = Hash::from_vec(&reader.read_32_bytes()?);

		Ok(BlockHeader {
			version,
			prev_block: Hash::from_vec(&prev_block),
			merkle_root: Hash::from_vec(&merkle_root),
			witness_root: Hash::from_vec(&witness_root),
			tree_root: Hash::from_vec(&tree_root),
			filter_root: Hash::from_vec(&filter_root),
			reserved_root: Hash::from_vec(&reserved_root),
			time,
			bits,
			nonce,
			extra_nonce,
			mask,
			name_root,
		})
	}
}

impl BlockHeader {
	/// Checks the header's proof of work against the target its own `bits`
	/// encode.
	pub fn verify_pow(&self) -> Result<(), pow::Error> {
		pow::verify(self)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::hash::Hashed;
	use crate::ser::{deserialize, ser_vec};

	fn sample_header() -> BlockHeader {
		BlockHeader {
			version: 2,
			prev_block: Hash([3; 32]),
			merkle_root: Hash([4; 32]),
			witness_root: Hash([5; 32]),
			tree_root: Hash([6; 32]),
			filter_root: Hash([7; 32]),
			reserved_root: Hash([8; 32]),
			time: 1_580_745_680,
			bits: 0x207f_ffff,
			nonce: 42,
			extra_nonce: [9; 24],
			mask: [10; 32],
			name_root: Hash([11; 32]),
		}
	}

	#[test]
	fn header_codec_round_trip() {
		let header = sample_header();
		let encoded = ser_vec(&header).unwrap();
		assert_eq!(encoded.len(), HEADER_SIZE);
		let decoded: BlockHeader = deserialize(&mut &encoded[..]).unwrap();
		assert_eq!(decoded, header);
		assert_eq!(decoded.hash(), header.hash());
	}

	#[test]
	fn header_hash_commits_to_nonce() {
		let header = sample_header();
		let mut other = header.clone();
		other.nonce += 1;
		assert_ne!(header.hash(), other.hash());
	}

	#[test]
	fn truncated_header_fails_decode() {
		let encoded = ser_vec(&sample_header()).unwrap();
		let res: Result<BlockHeader, _> = deserialize(&mut &encoded[..HEADER_SIZE - 1]);
		assert!(res.is_err());
	}

	#[test]
	fn pow_accepts_easy_target() {
		let mut header = sample_header();
		// an easy target still needs a nonce search, half of all hashes miss
		while header.verify_pow().is_err() {
			header.nonce += 1;
		}
		assert!(header.verify_pow().is_ok());
	}

	#[test]
	fn pow_rejects_hard_target() {
		let mut header = sample_header();
		// nothing should hash under a three-byte target
		header.bits = 0x0300_ffff;
		for nonce in 0..16 {
			header.nonce = nonce;
			assert_eq!(header.verify_pow(), Err(pow::Error::BadPow));
		}
	}

	#[test]
	fn pow_rejects_invalid_bits() {
		let mut header = sample_header();
		header.bits = 0;
		assert_eq!(header.verify_pow(), Err(pow::Error::BadBits));
	}
}
