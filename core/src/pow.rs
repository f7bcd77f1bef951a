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

//! Proof-of-work verification for block headers. The proof hash is the
//! blake2b-256 digest of the full encoded header; a header proves its work
//! by that digest, read as a 256-bit big-endian integer, not exceeding the
//! target its `bits` field encodes.

use crate::core::block::BlockHeader;
use crate::core::hash::Hashed;
use crate::core::target;

/// Errors out of the proof-of-work check.
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum Error {
	/// The header's compact bits don't expand into a valid target
	#[fail(display = "invalid difficulty bits")]
	BadBits,
	/// The header hash exceeds the target its bits encode
	#[fail(display = "proof of work hash exceeds target")]
	BadPow,
}

/// Validates the proof of work of a block header.
pub fn verify(header: &BlockHeader) -> Result<(), Error> {
	let target = target::target_from_bits(header.bits).map_err(|_| Error::BadBits)?;
	if header.hash().0 > target {
		return Err(Error::BadPow);
	}
	Ok(())
}
