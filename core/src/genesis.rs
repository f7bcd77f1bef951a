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

//! Definition of the genesis header for the various chains. The genesis
//! header is trusted as mined, its proof of work is never re-checked.

use crate::core::block::BlockHeader;
use crate::core::hash::{Hash, ZERO_HASH};
use crate::global::{self, ChainTypes};

/// Genesis header of the currently configured chain type.
pub fn genesis() -> BlockHeader {
	match global::chain_type() {
		ChainTypes::AutomatedTesting => genesis_dev(),
		ChainTypes::Regtest => genesis_reg(),
		ChainTypes::Testnet => genesis_test(),
		ChainTypes::Mainnet => genesis_main(),
	}
}

/// Genesis header for the automated testing chain.
pub fn genesis_dev() -> BlockHeader {
	BlockHeader {
		time: 1_580_745_080,
		bits: 0x1f07_ffff,
		..Default::default()
	}
}

/// Genesis header for the local regression testing chain.
pub fn genesis_reg() -> BlockHeader {
	BlockHeader {
		time: 1_580_745_080,
		bits: 0x207f_ffff,
		..Default::default()
	}
}

/// Genesis header for the public test network.
pub fn genesis_test() -> BlockHeader {
	BlockHeader {
		version: 0,
		prev_block: ZERO_HASH,
		merkle_root: Hash([
			0x8e, 0x4c, 0x9f, 0x66, 0x21, 0xd1, 0xa9, 0x0f, 0x1f, 0x38, 0x4c, 0x2e, 0x35, 0x3c,
			0x35, 0x7c, 0x9b, 0x7b, 0x3a, 0x4e, 0x5f, 0x0c, 0x55, 0x60, 0x8a, 0x7d, 0x11, 0x37,
			0x3a, 0x40, 0x27, 0x81,
		]),
		witness_root: ZERO_HASH,
		tree_root: ZERO_HASH,
		filter_root: ZERO_HASH,
		reserved_root: ZERO_HASH,
		time: 1_573_568_940,
		bits: 0x1d00_ffff,
		nonce: 0x0000_5b20,
		extra_nonce: [0; 24],
		mask: [0; 32],
		name_root: ZERO_HASH,
	}
}

/// Genesis header for the main network.
pub fn genesis_main() -> BlockHeader {
	BlockHeader {
		version: 0,
		prev_block: ZERO_HASH,
		merkle_root: Hash([
			0x72, 0x9e, 0xf8, 0x53, 0x52, 0x32, 0x5c, 0x27, 0x3c, 0xe2, 0xb9, 0x8a, 0x9c, 0x7f,
			0xc9, 0x3c, 0x9f, 0x04, 0x6c, 0x57, 0x16, 0x2b, 0xd9, 0x5a, 0x5c, 0xd9, 0xda, 0x86,
			0x2a, 0x64, 0xc9, 0x12,
		]),
		witness_root: ZERO_HASH,
		tree_root: ZERO_HASH,
		filter_root: ZERO_HASH,
		reserved_root: ZERO_HASH,
		time: 1_580_745_080,
		bits: 0x1c00_ffff,
		nonce: 0x0821_8d3e,
		extra_nonce: [0; 24],
		mask: [0; 32],
		name_root: ZERO_HASH,
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::hash::Hashed;
	use crate::ser::{deserialize, ser_vec};

	#[test]
	fn genesis_bits_match_network_initial_bits() {
		global::set_chain_type(ChainTypes::Regtest);
		assert_eq!(genesis().bits, global::initial_bits());
		assert_eq!(genesis_main().bits, 0x1c00_ffff);
		assert_eq!(genesis_test().bits, 0x1d00_ffff);
	}

	#[test]
	fn genesis_encodes_deterministically() {
		let g = genesis_main();
		let bytes = ser_vec(&g).unwrap();
		let decoded: BlockHeader = deserialize(&mut &bytes[..]).unwrap();
		assert_eq!(decoded.hash(), g.hash());
	}
}
