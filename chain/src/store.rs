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

//! In-memory indices backing the header chain.
//!
//! The `hashes` map owns every accepted header entry; the `heights` map is
//! a borrowing index over it holding only the current main chain, keyed by
//! the owner's hash. The same split applies to the orphan pool, where
//! `orphans` owns and `prevs` indexes by the missing parent. Insertion goes
//! owner first, removal owner last, so a reader between mutations never
//! sees a dangling index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::consensus;
use crate::core::core::hash::Hash;
use crate::core::core::BlockHeader;
use crate::types::HeaderEntry;

/// The four header indices: main/side chain owner and height index, plus
/// the orphan pool and its parent index.
pub struct HeaderIndex {
	hashes: HashMap<Hash, Arc<HeaderEntry>>,
	heights: HashMap<u32, Hash>,
	orphans: HashMap<Hash, BlockHeader>,
	prevs: HashMap<Hash, Hash>,
}

impl HeaderIndex {
	/// A new, empty set of indices.
	pub fn new() -> HeaderIndex {
		HeaderIndex {
			hashes: HashMap::new(),
			heights: HashMap::new(),
			orphans: HashMap::new(),
			prevs: HashMap::new(),
		}
	}

	/// Whether a header has been accepted, main chain or side chain.
	pub fn has(&self, hash: &Hash) -> bool {
		self.hashes.contains_key(hash)
	}

	/// An accepted header entry by hash.
	pub fn get(&self, hash: &Hash) -> Option<Arc<HeaderEntry>> {
		self.hashes.get(hash).cloned()
	}

	/// The main chain entry at the given height.
	pub fn get_by_height(&self, height: u32) -> Option<Arc<HeaderEntry>> {
		self.heights.get(&height).and_then(|h| self.get(h))
	}

	/// Takes ownership of an accepted entry. Always precedes `connect` for
	/// the same entry.
	pub fn insert(&mut self, entry: Arc<HeaderEntry>) {
		self.hashes.insert(entry.hash, entry);
	}

	/// Maps a main chain height to an entry the store already owns.
	pub fn connect(&mut self, entry: &HeaderEntry) {
		debug_assert!(self.hashes.contains_key(&entry.hash));
		self.heights.insert(entry.height, entry.hash);
	}

	/// Unmaps a main chain height. The entry stays owned as a side chain
	/// header.
	pub fn disconnect(&mut self, height: u32) {
		self.heights.remove(&height);
	}

	/// Number of heights currently mapped to the main chain.
	pub fn main_len(&self) -> usize {
		self.heights.len()
	}

	/// Whether a header is pooled as an orphan.
	pub fn has_orphan(&self, hash: &Hash) -> bool {
		self.orphans.contains_key(hash)
	}

	/// A pooled orphan header by hash.
	pub fn get_orphan(&self, hash: &Hash) -> Option<BlockHeader> {
		self.orphans.get(hash).cloned()
	}

	/// Number of orphans currently pooled.
	pub fn orphan_count(&self) -> usize {
		self.orphans.len()
	}

	/// Pools an orphan, indexed by the parent hash it's waiting on. When
	/// two orphans wait on the same parent the later arrival wins the
	/// index. A pool past its cap is flushed wholesale first.
	pub fn add_orphan(&mut self, hash: Hash, header: BlockHeader) {
		if self.orphans.len() > consensus::MAX_ORPHANS {
			warn!("store: clearing orphans: {}", self.orphans.len());
			self.prevs.clear();
			self.orphans.clear();
		}
		let parent = header.prev_block;
		self.orphans.insert(hash, header);
		self.prevs.insert(parent, hash);
	}

	/// Detaches and returns the orphan waiting on the given parent, if any.
	pub fn resolve_orphan(&mut self, parent: &Hash) -> Option<BlockHeader> {
		let hash = self.prevs.remove(parent)?;
		self.orphans.remove(&hash)
	}

	/// Iterator over an entry's ancestry, most recent first, inclusive of
	/// the starting entry.
	pub fn ancestors(&self, from: Arc<HeaderEntry>) -> AncestorIter<'_> {
		AncestorIter {
			store: self,
			next: Some(from),
		}
	}
}

/// Iterator down a header's ancestry through the owner index. Stops when a
/// parent is unknown, which for connected entries means genesis was passed.
pub struct AncestorIter<'a> {
	store: &'a HeaderIndex,
	next: Option<Arc<HeaderEntry>>,
}

impl<'a> Iterator for AncestorIter<'a> {
	type Item = Arc<HeaderEntry>;

	fn next(&mut self) -> Option<Arc<HeaderEntry>> {
		let current = self.next.take()?;
		self.next = self.store.get(&current.header.prev_block);
		Some(current)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::core::core::hash::Hashed;
	use crate::core::core::target::Work;

	fn entry(height: u32, prev: Hash) -> Arc<HeaderEntry> {
		let mut header = BlockHeader::default();
		header.prev_block = prev;
		header.time = 1000 + u64::from(height);
		let hash = header.hash();
		Arc::new(HeaderEntry {
			header,
			hash,
			height,
			work: Work::from_num(u64::from(height) + 1),
		})
	}

	#[test]
	fn owner_and_height_index() {
		let mut store = HeaderIndex::new();
		let genesis = entry(0, Hash([0; 32]));
		let child = entry(1, genesis.hash);

		store.insert(genesis.clone());
		store.connect(&genesis);
		store.insert(child.clone());
		store.connect(&child);

		assert!(store.has(&child.hash));
		assert_eq!(store.get_by_height(1).unwrap().hash, child.hash);
		assert_eq!(store.main_len(), 2);

		// disconnecting drops the height mapping but not ownership
		store.disconnect(1);
		assert!(store.get_by_height(1).is_none());
		assert!(store.has(&child.hash));
	}

	#[test]
	fn orphan_pool_round_trip() {
		let mut store = HeaderIndex::new();
		let parent_hash = Hash([7; 32]);
		let mut orphan = BlockHeader::default();
		orphan.prev_block = parent_hash;
		let orphan_hash = orphan.hash();

		store.add_orphan(orphan_hash, orphan);
		assert!(store.has_orphan(&orphan_hash));
		assert_eq!(store.orphan_count(), 1);

		let resolved = store.resolve_orphan(&parent_hash).unwrap();
		assert_eq!(resolved.hash(), orphan_hash);
		assert_eq!(store.orphan_count(), 0);
		assert!(store.resolve_orphan(&parent_hash).is_none());
	}

	#[test]
	fn ancestor_iteration() {
		let mut store = HeaderIndex::new();
		let genesis = entry(0, Hash([0; 32]));
		let middle = entry(1, genesis.hash);
		let top = entry(2, middle.hash);
		for e in &[&genesis, &middle, &top] {
			store.insert(Arc::clone(e));
		}

		let heights: Vec<u32> = store.ancestors(top).map(|e| e.height).collect();
		assert_eq!(heights, vec![2, 1, 0]);
	}
}
