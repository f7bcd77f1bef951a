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

//! Per-network consensus parameters, selected once at startup and shared
//! across all modules without having to pass them all over the place.
//! These are inputs to the build, not runtime configuration.

use std::sync::RwLock;

use crate::core::target::Work;

/// Compact bits of the easiest target the test chains accept.
pub const TESTING_LIMIT_BITS: u32 = 0x207f_ffff;

/// Initial bits for the automated testing chain, low enough that a header
/// solves in a few hundred attempts.
pub const AUTOMATED_TESTING_INITIAL_BITS: u32 = 0x1f07_ffff;

/// Retarget window of the automated testing chain, small enough that tests
/// can walk past it.
pub const AUTOMATED_TESTING_TARGET_WINDOW: u32 = 16;

/// Block spacing of the automated testing chain, in seconds.
pub const AUTOMATED_TESTING_TARGET_SPACING: i64 = 60;

/// Chainwork threshold for the automated testing chain, three easy blocks'
/// worth so sync detection is observable.
const AUTOMATED_TESTING_MINIMUM_CHAINWORK: [u8; 32] = [
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	0x60, 0x00,
];

const TESTNET_MINIMUM_CHAINWORK: [u8; 32] = [
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	0x10, 0x00, 0x00,
];

const MAINNET_MINIMUM_CHAINWORK: [u8; 32] = [
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x02,
	0x24, 0xf4, 0x2b, 0xd6,
];

/// Regtest sits permanently before its launch date, so a fresh chain
/// reports itself synced and local test setups resolve immediately.
const REGTEST_LAUNCH_DATE: i64 = 4_102_444_800;

/// Types of chain a server can run with, dictates the genesis header and
/// and the consensus parameters in force.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChainTypes {
	/// For CI testing
	AutomatedTesting,
	/// For local regression testing, no retargeting
	Regtest,
	/// Public test network
	Testnet,
	/// Main production network
	Mainnet,
}

impl Default for ChainTypes {
	fn default() -> ChainTypes {
		ChainTypes::Mainnet
	}
}

lazy_static! {
	/// The chain parameters in effect for this process
	pub static ref CHAIN_TYPE: RwLock<ChainTypes> = RwLock::new(ChainTypes::Mainnet);
}

/// Set the chain type. Tests call this first thing; servers set it from
/// their build profile.
pub fn set_chain_type(new_type: ChainTypes) {
	let mut param_ref = CHAIN_TYPE.write().unwrap();
	*param_ref = new_type;
}

/// The chain type currently in effect
pub fn chain_type() -> ChainTypes {
	*CHAIN_TYPE.read().unwrap()
}

/// Compact bits assigned to the genesis block and used whenever the
/// retarget cannot see a full window.
pub fn initial_bits() -> u32 {
	match chain_type() {
		ChainTypes::AutomatedTesting => AUTOMATED_TESTING_INITIAL_BITS,
		ChainTypes::Regtest => TESTING_LIMIT_BITS,
		ChainTypes::Testnet => 0x1d00_ffff,
		ChainTypes::Mainnet => 0x1c00_ffff,
	}
}

/// Compact encoding of the easiest target the network allows. Retargets
/// beyond this fall back to the initial bits.
pub fn limit_bits() -> u32 {
	match chain_type() {
		ChainTypes::AutomatedTesting | ChainTypes::Regtest => TESTING_LIMIT_BITS,
		ChainTypes::Testnet => 0x2007_ffff,
		ChainTypes::Mainnet => 0x1d00_ffff,
	}
}

/// Cumulative chainwork under which the chain refuses to consider itself
/// synced.
pub fn minimum_chainwork() -> Work {
	match chain_type() {
		ChainTypes::AutomatedTesting => Work(AUTOMATED_TESTING_MINIMUM_CHAINWORK),
		ChainTypes::Regtest => Work([0; 32]),
		ChainTypes::Testnet => Work(TESTNET_MINIMUM_CHAINWORK),
		ChainTypes::Mainnet => Work(MAINNET_MINIMUM_CHAINWORK),
	}
}

/// Number of headers in the retarget window.
pub fn target_window() -> u32 {
	match chain_type() {
		ChainTypes::AutomatedTesting => AUTOMATED_TESTING_TARGET_WINDOW,
		_ => 144,
	}
}

/// Ideal seconds between blocks.
pub fn target_spacing() -> i64 {
	match chain_type() {
		ChainTypes::AutomatedTesting => AUTOMATED_TESTING_TARGET_SPACING,
		_ => 600,
	}
}

/// Ideal seconds covered by a full retarget window.
pub fn target_timespan() -> i64 {
	i64::from(target_window()) * target_spacing()
}

/// Lower clamp on the damped window timespan.
pub fn min_actual() -> i64 {
	target_timespan() >> 2
}

/// Upper clamp on the damped window timespan.
pub fn max_actual() -> i64 {
	target_timespan() << 2
}

/// Blocks between commitments of the name set into the tree.
pub fn tree_interval() -> u32 {
	match chain_type() {
		ChainTypes::AutomatedTesting | ChainTypes::Regtest => 36,
		_ => 72,
	}
}

/// Launch date of the network, seconds since the unix epoch. A clock
/// before this means we're on a pre-launch test setup.
pub fn launch_date() -> i64 {
	match chain_type() {
		ChainTypes::AutomatedTesting => 1_580_745_080,
		ChainTypes::Regtest => REGTEST_LAUNCH_DATE,
		ChainTypes::Testnet => 1_573_568_940,
		ChainTypes::Mainnet => 1_580_745_080,
	}
}

/// Maximum age of the tip, in seconds, for the chain to call itself synced.
pub fn max_tip_age() -> i64 {
	match chain_type() {
		ChainTypes::AutomatedTesting => 12 * 60 * 60,
		_ => 24 * 60 * 60,
	}
}

/// Whether sync detection waits for the last checkpoint height.
pub fn use_checkpoints() -> bool {
	chain_type() == ChainTypes::Mainnet
}

/// Height of the last checkpoint.
pub fn last_checkpoint() -> u32 {
	match chain_type() {
		ChainTypes::Mainnet => 105_000,
		_ => 0,
	}
}

/// Whether difficulty retargeting is disabled, every block carrying the
/// initial bits.
pub fn no_retargeting() -> bool {
	chain_type() == ChainTypes::Regtest
}

/// Whether difficulty resets to the initial bits when blocks stall, the
/// testnet escape hatch against a difficulty spiral.
pub fn target_reset() -> bool {
	chain_type() == ChainTypes::Testnet
}
