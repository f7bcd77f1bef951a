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

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use rand::{thread_rng, Rng};

use keel_chain::{Chain, ErrorKind, HeaderEntry, TimeSource};
use keel_core::core::hash::Hashed;
use keel_core::core::target::cumulative_work;
use keel_core::core::{BlockHeader, Hash};
use keel_core::genesis;
use keel_core::global::{self, ChainTypes};

/// Adjustable clock for driving the chain in tests.
struct Oracle(AtomicI64);

impl Oracle {
	fn new(t: i64) -> Arc<Oracle> {
		Arc::new(Oracle(AtomicI64::new(t)))
	}
	fn set(&self, t: i64) {
		self.0.store(t, Ordering::SeqCst);
	}
}

impl TimeSource for Oracle {
	fn now(&self) -> i64 {
		self.0.load(Ordering::SeqCst)
	}
}

fn setup() -> (Chain, Arc<Oracle>) {
	keel_util::init_test_logger();
	global::set_chain_type(ChainTypes::Regtest);
	let clock = Oracle::new(genesis::genesis_reg().time as i64 + 1);
	let chain = Chain::init(clock.clone()).unwrap();
	(chain, clock)
}

fn solve(header: &mut BlockHeader) {
	while header.verify_pow().is_err() {
		header.nonce += 1;
	}
}

/// A solved header on top of `prev`, carrying the bits the chain requires
/// and a name root derived from its height so safe-root checks can tell
/// headers apart.
fn header_on(chain: &Chain, prev: &Arc<HeaderEntry>, time: u64) -> BlockHeader {
	let mut header = BlockHeader::default();
	header.prev_block = prev.hash;
	header.time = time;
	header.bits = chain.next_target(time as i64, prev);
	header.name_root = Hash([(prev.height + 1) as u8; 32]);
	solve(&mut header);
	header
}

fn next_header(chain: &Chain, prev: &Arc<HeaderEntry>) -> BlockHeader {
	header_on(chain, prev, prev.header.time + 600)
}

/// Extends the main chain by `n` headers, walking the clock along.
fn extend(chain: &mut Chain, clock: &Oracle, n: u32) {
	for _ in 0..n {
		let header = next_header(chain, &chain.tip());
		clock.set(header.time as i64 + 1);
		chain.add(&header).unwrap();
	}
}

#[test]
fn scenario_linear_extension() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	// regtest sits before its launch date, so it is born synced
	let synced_after_init = chain.synced();
	assert!(synced_after_init);

	let h1 = next_header(&chain, &genesis);
	let tip = chain.add(&h1).unwrap().unwrap();

	assert_eq!(tip.height, 1);
	assert_eq!(tip.last_block_h, h1.hash());
	assert_eq!(tip.prev_block_h, genesis.hash);
	assert_eq!(chain.height(), 1);
	assert_eq!(chain.locator(), vec![h1.hash(), genesis.hash]);
	assert_eq!(chain.synced(), synced_after_init);
}

#[test]
fn scenario_orphan_resolution() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	let h1 = next_header(&chain, &genesis);
	let mut h2 = BlockHeader::default();
	h2.prev_block = h1.hash();
	h2.time = h1.time + 600;
	h2.bits = global::initial_bits();
	solve(&mut h2);

	// child arrives before its parent, held in the pool
	let err = chain.add(&h2).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::Orphan);
	assert!(chain.has_orphan(&h2.hash()));
	assert_eq!(chain.get_orphan(&h2.hash()).unwrap(), h2);
	assert_eq!(chain.height(), 0);

	// parent arrival cascades the orphan in
	let tip = chain.add(&h1).unwrap().unwrap();
	assert_eq!(tip.height, 2);
	assert_eq!(tip.last_block_h, h2.hash());
	assert_eq!(chain.orphan_count(), 0);
	assert!(chain.has(&h1.hash()));
	assert!(chain.has(&h2.hash()));
}

#[test]
fn scenario_bad_pow_rejected() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	let mut h1 = next_header(&chain, &genesis);
	// walk the nonce to a hash above the target
	while h1.verify_pow().is_ok() {
		h1.nonce += 1;
	}

	let err = chain.add(&h1).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::BadPow(keel_core::pow::Error::BadPow));
	assert!(err.is_bad_header());
	assert!(!chain.has(&h1.hash()));
	assert_eq!(chain.height(), 0);
	assert_eq!(chain.orphan_count(), 0);
}

#[test]
fn scenario_fork_and_reorg() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	// main chain G -> H1 -> H2
	let h1 = next_header(&chain, &genesis);
	chain.add(&h1).unwrap();
	let h2 = next_header(&chain, &chain.tip());
	chain.add(&h2).unwrap();

	// fork off genesis with less work: stored aside, main chain untouched
	let h1f = header_on(&chain, &genesis, genesis.header.time + 601);
	assert!(chain.add(&h1f).unwrap().is_none());
	let h1f_entry = chain.get(&h1f.hash()).unwrap();
	assert_eq!(h1f_entry.header, h1f);
	assert_eq!(chain.get_by_height(1).unwrap().hash, h1.hash());
	assert_eq!(chain.head().last_block_h, h2.hash());

	// extend the fork past the main chain's work
	let h2f = header_on(&chain, &h1f_entry, h1f.time + 600);
	assert!(chain.add(&h2f).unwrap().is_none());
	let h2f_entry = chain.get(&h2f.hash()).unwrap();
	let h3f = header_on(&chain, &h2f_entry, h2f.time + 600);
	let tip = chain.add(&h3f).unwrap().unwrap();

	// the height index flipped to the fork
	assert_eq!(tip.height, 3);
	assert_eq!(tip.last_block_h, h3f.hash());
	assert_eq!(chain.get_by_height(1).unwrap().hash, h1f.hash());
	assert_eq!(chain.get_by_height(2).unwrap().hash, h2f.hash());
	assert_eq!(chain.get_by_height(3).unwrap().hash, h3f.hash());
	assert!(chain.get_by_height(4).is_none());

	// the losing branch is still owned as side chain headers
	assert!(chain.has(&h1.hash()));
	assert!(chain.has(&h2.hash()));

	// chainwork bookkeeping held up through the reorg
	let tip_entry = chain.tip();
	assert_eq!(
		tip_entry.work,
		cumulative_work(&h2f_entry.work, h3f.bits).unwrap()
	);
	assert!(tip_entry.work > chain.get(&h2.hash()).unwrap().work);
}

#[test]
fn duplicate_headers_rejected() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	let h1 = next_header(&chain, &genesis);
	chain.add(&h1).unwrap();
	assert_eq!(chain.add(&h1).unwrap_err().kind(), ErrorKind::Duplicate);

	// same again for a pooled orphan
	let mut orphan = BlockHeader::default();
	orphan.prev_block = Hash([42; 32]);
	orphan.time = genesis.header.time;
	orphan.bits = global::initial_bits();
	solve(&mut orphan);

	assert_eq!(chain.add(&orphan).unwrap_err().kind(), ErrorKind::Orphan);
	assert_eq!(
		chain.add(&orphan).unwrap_err().kind(),
		ErrorKind::DuplicateOrphan
	);
}

#[test]
fn time_too_new_rejected() {
	let (mut chain, clock) = setup();
	let genesis = chain.tip();

	let header = header_on(&chain, &genesis, (clock.now() + 2 * 60 * 60 + 1) as u64);
	let err = chain.add(&header).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::TimeTooNew);
	assert!(!chain.has(&header.hash()));
}

#[test]
fn time_too_old_rejected() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	let h1 = next_header(&chain, &genesis);
	chain.add(&h1).unwrap();

	// the median of (genesis, h1) is h1's own timestamp
	let h2 = header_on(&chain, &chain.tip(), h1.time);
	assert_eq!(chain.add(&h2).unwrap_err().kind(), ErrorKind::TimeTooOld);

	// one second past the median is accepted
	let h2 = header_on(&chain, &chain.tip(), h1.time + 1);
	assert!(chain.add(&h2).unwrap().is_some());
}

#[test]
fn wrong_bits_rejected() {
	let (mut chain, _clock) = setup();
	let genesis = chain.tip();

	let mut header = BlockHeader::default();
	header.prev_block = genesis.hash;
	header.time = genesis.header.time + 600;
	// an easier-than-required target is still a valid one
	header.bits = 0x207f_fffe;
	solve(&mut header);

	let err = chain.add(&header).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::BadDiffBits);
	assert!(!chain.has(&header.hash()));
}

#[test]
fn ancestor_walk() {
	let (mut chain, clock) = setup();
	extend(&mut chain, &clock, 10);

	let tip = chain.tip();
	assert_eq!(chain.get_ancestor(&tip, 10).hash, tip.hash);
	for height in (0..=10).rev() {
		let ancestor = chain.get_ancestor(&tip, height);
		assert_eq!(ancestor.height, height);
		assert_eq!(ancestor.hash, chain.get_by_height(height).unwrap().hash);
	}
}

#[test]
fn locator_strides_double_past_ten() {
	let (mut chain, clock) = setup();
	extend(&mut chain, &clock, 25);

	let expected_heights: Vec<u32> =
		vec![25, 24, 23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 12, 8, 0];
	let expected: Vec<Hash> = expected_heights
		.iter()
		.map(|h| chain.get_by_height(*h).unwrap().hash)
		.collect();

	assert_eq!(chain.locator(), expected);
}

#[test]
fn safe_root_lags_the_tip() {
	let (mut chain, clock) = setup();
	let genesis_root = chain.tip().header.name_root;

	// fewer than twelve blocks into the interval: last commitment wins
	extend(&mut chain, &clock, 5);
	assert_eq!(chain.safe_root(), genesis_root);

	// twelve confirmations in, the current interval root is safe
	extend(&mut chain, &clock, 8);
	assert_eq!(chain.height(), 13);
	assert_eq!(chain.safe_root(), Hash([13; 32]));

	// early in the next interval the height-36 commitment is served
	extend(&mut chain, &clock, 27);
	assert_eq!(chain.height(), 40);
	assert_eq!(chain.safe_root(), Hash([36; 32]));
}

#[test]
fn insertion_order_is_irrelevant() {
	let (mut chain_a, clock_a) = setup();

	// grow a reference chain, keeping the headers
	let mut headers = vec![];
	for _ in 0..5 {
		let header = next_header(&chain_a, &chain_a.tip());
		clock_a.set(header.time as i64 + 1);
		chain_a.add(&header).unwrap();
		headers.push(header);
	}

	// feed the same headers to a fresh chain in reverse arrival order
	let clock_b = Oracle::new(clock_a.now());
	let mut chain_b = Chain::init(clock_b.clone()).unwrap();
	for header in headers.iter().skip(1).rev() {
		assert_eq!(chain_b.add(header).unwrap_err().kind(), ErrorKind::Orphan);
	}
	let tip = chain_b.add(&headers[0]).unwrap().unwrap();

	assert_eq!(tip, chain_a.head());
	assert_eq!(chain_b.orphan_count(), 0);
	for height in 0..=5 {
		assert_eq!(
			chain_b.get_by_height(height).unwrap().hash,
			chain_a.get_by_height(height).unwrap().hash
		);
	}
	assert!(chain_b.get_by_height(6).is_none());
	for header in &headers {
		assert!(chain_b.has(&header.hash()));
	}
}

#[test]
fn orphan_pool_flushes_over_cap() {
	let (mut chain, _clock) = setup();
	let genesis_time = chain.tip().header.time;
	let mut rng = thread_rng();

	let orphan = |rng: &mut rand::rngs::ThreadRng| {
		let mut header = BlockHeader::default();
		header.prev_block = Hash(rng.gen::<[u8; 32]>());
		header.time = genesis_time;
		header.bits = global::initial_bits();
		solve(&mut header);
		header
	};

	for _ in 0..10_001 {
		let header = orphan(&mut rng);
		assert_eq!(chain.add(&header).unwrap_err().kind(), ErrorKind::Orphan);
	}
	assert_eq!(chain.orphan_count(), 10_001);

	// the next arrival blows the whole pool away before being pooled
	let header = orphan(&mut rng);
	assert_eq!(chain.add(&header).unwrap_err().kind(), ErrorKind::Orphan);
	assert_eq!(chain.orphan_count(), 1);
	assert!(chain.has_orphan(&header.hash()));
}
