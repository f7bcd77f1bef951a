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

//! Implementation of the header acceptance (or refusal) pipeline.
//!
//! Checks are ordered cheapest first to keep the DoS surface small: clock
//! sanity, duplicate lookups and proof of work all run before anything
//! walks the chain. Contextual validation (median time, difficulty bits)
//! runs once the parent is known, and a header that proves more cumulative
//! work than the current tip takes over the height index, reorganizing
//! across a fork when needed.

use std::sync::Arc;

use num_bigint::BigUint;

use crate::core::consensus;
use crate::core::core::hash::{Hash, Hashed};
use crate::core::core::target;
use crate::core::core::BlockHeader;
use crate::core::global;
use crate::error::{Error, ErrorKind};
use crate::store::HeaderIndex;
use crate::time::TimeSource;
use crate::types::HeaderEntry;

/// Contextual information required to process a new header: the indices,
/// the current tip and the network-adjusted clock.
pub struct HeaderContext<'a> {
	/// Header indices, owned by the chain
	pub store: &'a mut HeaderIndex,
	/// Entry carrying the most cumulative work
	pub tip: &'a mut Arc<HeaderEntry>,
	/// Network-adjusted clock
	pub time: &'a dyn TimeSource,
}

/// Runs a candidate header through the full acceptance pipeline. Returns
/// the new tip entry when the header took over the chain, `None` when it
/// was stored on an alternate chain, and `ErrorKind::Orphan` when it was
/// pooled pending its parent.
pub fn process_header(
	header: &BlockHeader,
	ctx: &mut HeaderContext<'_>,
) -> Result<Option<Arc<HeaderEntry>>, Error> {
	// The chain owns its headers; work on a clone of the caller's.
	let header = header.clone();
	let hash = header.hash();

	debug!("pipe: adding header {} to the chain", hash);

	check_header_time(&header, &hash, ctx)?;
	check_known(&hash, ctx)?;
	header.verify_pow().map_err(|e| {
		debug!("pipe: header {} rejected: pow error: {}", hash, e);
		Error::from(e)
	})?;

	let prev = match ctx.store.get(&header.prev_block) {
		Some(prev) => prev,
		None => {
			debug!("pipe: header {} stored as orphan", hash);
			ctx.store.add_orphan(hash, header);
			return Err(ErrorKind::Orphan.into());
		}
	};

	insert(header, hash, prev, ctx)
}

/// Contextual validation and the actual splice of a header whose parent is
/// known. Shared between the pipeline entry point and orphan resolution.
pub(crate) fn insert(
	header: BlockHeader,
	hash: Hash,
	prev: Arc<HeaderEntry>,
	ctx: &mut HeaderContext<'_>,
) -> Result<Option<Arc<HeaderEntry>>, Error> {
	let mtp = median_time_past(ctx.store, &prev);
	if header.time as i64 <= mtp {
		debug!("pipe: header {} rejected: time-too-old", hash);
		return Err(ErrorKind::TimeTooOld.into());
	}

	let required = next_target(ctx.store, header.time as i64, &prev);
	if header.bits != required {
		debug!(
			"pipe: header {} rejected: bad-diffbits: {:x} != {:x}",
			hash, header.bits, required
		);
		return Err(ErrorKind::BadDiffBits.into());
	}

	let height = prev.height + 1;
	let work = target::cumulative_work(&prev.work, header.bits)
		.map_err(|_| Error::from(ErrorKind::BadDiffBits))?;
	let entry = Arc::new(HeaderEntry {
		header,
		hash,
		height,
		work,
	});

	if entry.work <= ctx.tip.work {
		ctx.store.insert(entry.clone());
		debug!("pipe: header {} stored on alternate chain", entry.hash);
		return Ok(None);
	}

	if entry.header.prev_block != ctx.tip.hash {
		info!("pipe: reorganizing to {} at {}", entry.hash, entry.height);
		reorganize(ctx.store, ctx.tip, &entry);
	}

	ctx.store.insert(entry.clone());
	ctx.store.connect(&entry);
	*ctx.tip = entry.clone();

	debug!(
		"pipe: header {} added to main chain, new height {}",
		entry.hash, entry.height
	);
	Ok(Some(entry))
}

fn check_header_time(
	header: &BlockHeader,
	hash: &Hash,
	ctx: &HeaderContext<'_>,
) -> Result<(), Error> {
	if header.time as i64 > ctx.time.now() + consensus::MAX_FUTURE_BLOCK_TIME {
		debug!("pipe: header {} rejected: time-too-new", hash);
		return Err(ErrorKind::TimeTooNew.into());
	}
	Ok(())
}

fn check_known(hash: &Hash, ctx: &HeaderContext<'_>) -> Result<(), Error> {
	if ctx.store.has(hash) {
		debug!("pipe: header {} rejected: duplicate", hash);
		return Err(ErrorKind::Duplicate.into());
	}
	if ctx.store.has_orphan(hash) {
		debug!("pipe: header {} rejected: duplicate-orphan", hash);
		return Err(ErrorKind::DuplicateOrphan.into());
	}
	Ok(())
}

/// Median of the timestamps of up to the last 11 ancestors, inclusive of
/// `prev`. A new header's timestamp must land strictly past this.
pub fn median_time_past(store: &HeaderIndex, prev: &Arc<HeaderEntry>) -> i64 {
	let mut times: Vec<i64> = store
		.ancestors(prev.clone())
		.take(consensus::MEDIAN_TIME_SPAN)
		.map(|e| e.header.time as i64)
		.collect();
	times.sort();
	times[times.len() >> 1]
}

/// The difficulty bits required of a header arriving at `time` on top of
/// `prev`.
pub fn next_target(store: &HeaderIndex, time: i64, prev: &Arc<HeaderEntry>) -> u32 {
	if global::no_retargeting() {
		return global::initial_bits();
	}

	if global::target_reset() {
		// Testnet falls back to the initial difficulty when blocks stall,
		// so a lone miner can always get the chain moving again.
		if time > prev.header.time as i64 + global::target_spacing() * 4 {
			return global::initial_bits();
		}
	}

	retarget(store, prev)
}

/// Average-target retarget over the trailing window, weighted by the damped
/// ratio of observed to ideal timespan.
fn retarget(store: &HeaderIndex, prev: &Arc<HeaderEntry>) -> u32 {
	let bits = global::initial_bits();
	let window = global::target_window();
	let timespan = global::target_timespan();

	let mut iter = store.ancestors(prev.clone());
	let mut sum = BigUint::from(0u32);
	for entry in iter.by_ref().take(window as usize) {
		let diff = target::target_from_bits(entry.header.bits)
			.expect("stored header carries invalid bits");
		sum += BigUint::from_bytes_be(&diff);
	}

	// The cursor now sits one header below the window; a short walk means
	// the chain is younger than a full window.
	let first = match iter.next() {
		Some(first) => first,
		None => return bits,
	};
	if first.height < 1 {
		return bits;
	}

	let avg = sum / window;

	let start = median_time_past(store, &first);
	let end = median_time_past(store, prev);
	let actual = consensus::damp_timespan(
		end - start,
		timespan,
		global::min_actual(),
		global::max_actual(),
	);

	let new_target = avg * BigUint::from(actual as u64) / BigUint::from(timespan as u64);

	let limit = target::target_from_bits(global::limit_bits())
		.expect("network limit bits are invalid");
	if new_target > BigUint::from_bytes_be(&limit) {
		return bits;
	}

	target::bits_from_bignum(&new_target)
}

/// Walks both chains back to the common ancestor of the current tip and a
/// competitor. Both are descendants of genesis, so only a corrupted store
/// can fail the walk, and that is fatal.
fn find_fork(
	store: &HeaderIndex,
	tip: &Arc<HeaderEntry>,
	competitor: &Arc<HeaderEntry>,
) -> Arc<HeaderEntry> {
	let mut a = tip.clone();
	let mut b = competitor.clone();

	while a.hash != b.hash {
		if a.height > b.height {
			a = store
				.get(&a.header.prev_block)
				.expect("fork walk ran off the main chain");
		} else if b.height > a.height {
			b = store
				.get(&b.header.prev_block)
				.expect("fork walk ran off the fork chain");
		} else {
			a = store
				.get(&a.header.prev_block)
				.expect("fork walk ran off the main chain");
			b = store
				.get(&b.header.prev_block)
				.expect("fork walk ran off the fork chain");
		}
	}
	a
}

/// Switches the height index over to the branch ending in `competitor`:
/// unmaps the old branch from the fork point up, then maps the new branch
/// up to but not including the competitor itself, which the caller connects
/// together with the tip swap so the two stay atomic.
fn reorganize(store: &mut HeaderIndex, tip: &Arc<HeaderEntry>, competitor: &Arc<HeaderEntry>) {
	let fork = find_fork(store, tip, competitor);

	debug!(
		"pipe: reorganize: fork point {} at height {}",
		fork.hash, fork.height
	);

	// Disconnect the old branch, tip first down to the fork (exclusive).
	// The entries stay in the owner map as side chain headers.
	let mut entry = tip.clone();
	while entry.hash != fork.hash {
		store.disconnect(entry.height);
		entry = store
			.get(&entry.header.prev_block)
			.expect("main chain entry missing during disconnect");
	}

	// Collect the new branch from the competitor's parent down to the fork
	// (exclusive), then connect it lowest first.
	let mut connect = vec![];
	let mut entry = store
		.get(&competitor.header.prev_block)
		.expect("competitor parent missing during reorganization");
	while entry.hash != fork.hash {
		connect.push(entry.clone());
		entry = store
			.get(&entry.header.prev_block)
			.expect("fork chain entry missing during connect");
	}
	for entry in connect.iter().rev() {
		store.connect(entry);
	}
}
