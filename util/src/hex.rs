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

//! Minimal hex encoding. Hashes and chainwork values render themselves
//! through this for display and logging; nothing in the engine parses hex
//! back in, so only the encoding direction exists.

use std::fmt::Write;

/// Encode the provided bytes into a lowercase hex string
pub fn to_hex(bytes: &[u8]) -> String {
	let mut s = String::with_capacity(bytes.len() * 2);
	for byte in bytes {
		write!(&mut s, "{:02x}", byte).expect("Unable to write");
	}
	s
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_to_hex() {
		assert_eq!(to_hex(&[0, 0, 0, 0]), "00000000");
		assert_eq!(to_hex(&[10, 11, 12, 13]), "0a0b0c0d");
		assert_eq!(to_hex(&[0, 0, 0, 255]), "000000ff");
		assert_eq!(to_hex(&[]), "");
	}
}
