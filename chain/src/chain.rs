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

//! Facade and handler for the rest of the header chain implementation and
//! mostly the acceptance pipeline.

use std::sync::Arc;

use crate::core::consensus;
use crate::core::core::hash::{Hash, Hashed};
use crate::core::core::target::{self, ZERO_WORK};
use crate::core::core::BlockHeader;
use crate::core::genesis;
use crate::core::global;
use crate::error::Error;
use crate::pipe::{self, HeaderContext};
use crate::store::HeaderIndex;
use crate::time::TimeSource;
use crate::types::{HeaderEntry, Tip};

/// Facade to the header chain: owns the indices and the tip pointer, runs
/// candidate headers through the acceptance pipeline, cascades orphan
/// resolution and answers queries. The engine is single-owner; an embedding
/// that reads concurrently must synchronize externally against `add`.
pub struct Chain {
	store: HeaderIndex,
	tip: Arc<HeaderEntry>,
	genesis: Arc<HeaderEntry>,
	synced: bool,
	time: Arc<dyn TimeSource>,
}

impl Chain {
	/// Initializes the chain by installing the genesis header of the
	/// currently configured network at height zero.
	pub fn init(time: Arc<dyn TimeSource>) -> Result<Chain, Error> {
		let header = genesis::genesis();
		let work = target::cumulative_work(&ZERO_WORK, header.bits)
			.map_err(|e| crate::error::ErrorKind::Other(format!("genesis bits: {}", e)))?;
		let hash = header.hash();
		let entry = Arc::new(HeaderEntry {
			header,
			hash,
			height: 0,
			work,
		});

		let mut store = HeaderIndex::new();
		store.insert(entry.clone());
		store.connect(&entry);

		let mut chain = Chain {
			store,
			tip: entry.clone(),
			genesis: entry,
			synced: false,
			time,
		};

		info!("chain: initialized at {}", chain.genesis.hash);
		chain.maybe_sync();
		Ok(chain)
	}

	/// Attempt to add a new header to the chain. Returns the new chain tip
	/// if it extended or took over the main chain, `None` if it was stored
	/// on an alternate chain. A header whose parent isn't known yet comes
	/// back as `ErrorKind::Orphan`: it is held in the pool, not rejected.
	///
	/// After a successful insertion, any pooled orphans waiting on the new
	/// header are spliced in as well, cascading until the pool has no
	/// descendant left. A failure mid-cascade surfaces that error; earlier
	/// insertions stand.
	pub fn add(&mut self, header: &BlockHeader) -> Result<Option<Tip>, Error> {
		let result = {
			let mut ctx = HeaderContext {
				store: &mut self.store,
				tip: &mut self.tip,
				time: self.time.as_ref(),
			};
			pipe::process_header(header, &mut ctx)?
		};
		let mut tip_moved = result.is_some();

		// Resolve any orphans the new header reconnected.
		let mut parent_hash = header.hash();
		while let Some(orphan) = self.store.resolve_orphan(&parent_hash) {
			let orphan_hash = orphan.hash();
			let prev = self
				.store
				.get(&parent_hash)
				.expect("freshly inserted parent missing from store");

			let resolved = {
				let mut ctx = HeaderContext {
					store: &mut self.store,
					tip: &mut self.tip,
					time: self.time.as_ref(),
				};
				pipe::insert(orphan, orphan_hash, prev, &mut ctx)?
			};

			info!("chain: resolved orphan {}", orphan_hash);
			tip_moved = tip_moved || resolved.is_some();
			parent_hash = orphan_hash;
		}

		if tip_moved {
			self.maybe_sync();
			Ok(Some(Tip::from_entry(&self.tip)))
		} else {
			Ok(None)
		}
	}

	/// Whether the header is known to the main or side chain store.
	pub fn has(&self, hash: &Hash) -> bool {
		self.store.has(hash)
	}

	/// An accepted header entry by hash, main chain or side chain.
	pub fn get(&self, hash: &Hash) -> Option<Arc<HeaderEntry>> {
		self.store.get(hash)
	}

	/// The main chain header entry at the given height.
	pub fn get_by_height(&self, height: u32) -> Option<Arc<HeaderEntry>> {
		self.store.get_by_height(height)
	}

	/// Whether the header sits in the orphan pool.
	pub fn has_orphan(&self, hash: &Hash) -> bool {
		self.store.has_orphan(hash)
	}

	/// A pooled orphan header by hash.
	pub fn get_orphan(&self, hash: &Hash) -> Option<BlockHeader> {
		self.store.get_orphan(hash)
	}

	/// Number of orphans currently pooled.
	pub fn orphan_count(&self) -> usize {
		self.store.orphan_count()
	}

	/// The ancestor of the given entry at the requested height, walked
	/// through the parent links. The height must not exceed the entry's.
	pub fn get_ancestor(&self, entry: &Arc<HeaderEntry>, height: u32) -> Arc<HeaderEntry> {
		assert!(height <= entry.height);

		let mut current = entry.clone();
		while current.height != height {
			current = self
				.store
				.get(&current.header.prev_block)
				.expect("ancestor walk ran off the store");
		}
		current
	}

	/// Whether the chain considers itself caught up with the network.
	/// Sticky once set.
	pub fn synced(&self) -> bool {
		self.synced
	}

	/// The entry carrying the most cumulative work.
	pub fn tip(&self) -> Arc<HeaderEntry> {
		self.tip.clone()
	}

	/// Convenience summary of the tip.
	pub fn head(&self) -> Tip {
		Tip::from_entry(&self.tip)
	}

	/// Current main chain height.
	pub fn height(&self) -> u32 {
		self.tip.height
	}

	/// The most recent name-commitment root that has accumulated enough
	/// proof of work on top of it for resolvers to rely on. Before that
	/// point the previous interval's commitment is served instead.
	pub fn safe_root(&self) -> Hash {
		let interval = global::tree_interval();
		let mut m = self.tip.height % interval;
		if m >= consensus::SAFE_ROOT_CONFIRMATIONS {
			m = 0;
		}

		let height = self.tip.height - m;
		let entry = self
			.store
			.get_by_height(height)
			.expect("main chain height missing from store");

		debug!("chain: using safe height {} for resolution", height);
		entry.header.name_root
	}

	/// Builds a block locator for peer synchronization: the last ten
	/// heights densely, then a stride doubling every step, with genesis
	/// always the final entry.
	pub fn locator(&self) -> Vec<Hash> {
		let mut hashes = vec![self.tip.hash];
		let mut height = i64::from(self.tip.height);
		let mut step: i64 = 1;

		while height > 0 {
			height -= step;
			if height < 0 {
				height = 0;
			}

			if hashes.len() > 10 {
				step *= 2;
			}

			if hashes.len() == consensus::MAX_LOCATOR_HASHES - 1 {
				height = 0;
			}

			let entry = self
				.store
				.get_by_height(height as u32)
				.expect("main chain height missing from store");
			hashes.push(entry.hash);
		}
		hashes
	}

	/// The difficulty bits required of a header arriving at `time` on top
	/// of `prev`. Exposed so miners and tests can build valid headers.
	pub fn next_target(&self, time: i64, prev: &Arc<HeaderEntry>) -> u32 {
		pipe::next_target(&self.store, time, prev)
	}

	/// Flips the chain to synced once it has caught up: past the network
	/// launch (before it, there is nothing to sync), past the last
	/// checkpoint if those are in force, with a reasonably fresh tip that
	/// clears the minimum chainwork.
	fn maybe_sync(&mut self) {
		if self.synced {
			return;
		}

		let now = self.time.now();
		if now < global::launch_date() {
			info!("chain: chain is fully synced");
			self.synced = true;
			return;
		}

		if global::use_checkpoints() && self.tip.height < global::last_checkpoint() {
			return;
		}

		if (self.tip.header.time as i64) < now - global::max_tip_age() {
			return;
		}

		if self.tip.work < global::minimum_chainwork() {
			return;
		}

		info!("chain: chain is fully synced");
		self.synced = true;
	}
}
