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

//! Base types that the header chain pipeline requires.

use crate::core::core::hash::Hash;
use crate::core::core::target::Work;
use crate::core::core::BlockHeader;

/// A header the chain has taken ownership of, together with everything the
/// engine computed about it on acceptance. Immutable once built; reorgs
/// shuffle which entries the height index points at, never the entries
/// themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderEntry {
	/// The header itself
	pub header: BlockHeader,
	/// Memoized hash of the header
	pub hash: Hash,
	/// Height the header was connected at
	pub height: u32,
	/// Cumulative chainwork up to and including this header
	pub work: Work,
}

/// The tip of the chain, a convenience summary of the highest-work header.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tip {
	/// Height of the tip (max height of the chain)
	pub height: u32,
	/// Last header pushed to the chain
	pub last_block_h: Hash,
	/// Header previous to last
	pub prev_block_h: Hash,
	/// Total work accumulated on the chain
	pub total_work: Work,
}

impl Tip {
	/// Summarizes a header entry as a tip.
	pub fn from_entry(entry: &HeaderEntry) -> Tip {
		Tip {
			height: entry.height,
			last_block_h: entry.hash,
			prev_block_h: entry.header.prev_block,
			total_work: entry.work,
		}
	}
}
