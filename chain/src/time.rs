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

//! Time sources for the chain. Header validation needs a wall clock that
//! roughly agrees with the rest of the network, so alongside the plain
//! system clock we keep one adjusted by the median of peer-reported clock
//! offsets, with a bound on how far peers can drag it.

use std::sync::RwLock;

use chrono::Utc;

/// Number of peer offset samples kept. Past this the clock is considered
/// settled and further samples are ignored.
const MAX_TIME_SAMPLES: usize = 200;

/// Offsets whose median exceeds this many seconds are distrusted and the
/// clock falls back to local time.
const MAX_TIME_ADJUSTMENT: i64 = 70 * 60;

/// Minimum number of samples before any adjustment is applied.
const MIN_TIME_SAMPLES: usize = 5;

/// Provides the current time in seconds since the unix epoch. Must never
/// block; the chain calls it inline while validating.
pub trait TimeSource {
	/// Seconds since the unix epoch.
	fn now(&self) -> i64;
}

/// The plain system wall clock.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
	fn now(&self) -> i64 {
		Utc::now().timestamp()
	}
}

struct NetTimeInner {
	samples: Vec<i64>,
	offset: i64,
}

/// Wall clock adjusted by the median of peer clock offsets. The peer layer
/// feeds one sample per connected peer; the chain only ever reads.
pub struct NetTime {
	inner: RwLock<NetTimeInner>,
}

impl NetTime {
	/// A network time source with no samples, reading local time until
	/// peers report in.
	pub fn new() -> NetTime {
		NetTime {
			inner: RwLock::new(NetTimeInner {
				samples: vec![],
				offset: 0,
			}),
		}
	}

	/// Records a peer's reported time. The median offset is recomputed on
	/// odd sample counts so it always sits on an actual sample.
	pub fn observe(&self, peer_time: i64) {
		let local = Utc::now().timestamp();
		let mut inner = self.inner.write().unwrap();
		if inner.samples.len() >= MAX_TIME_SAMPLES {
			return;
		}
		inner.samples.push(peer_time - local);

		if inner.samples.len() >= MIN_TIME_SAMPLES && inner.samples.len() % 2 == 1 {
			let mut sorted = inner.samples.clone();
			sorted.sort();
			let median = sorted[sorted.len() / 2];
			inner.offset = if median.abs() < MAX_TIME_ADJUSTMENT {
				median
			} else {
				0
			};
		}
	}

	/// The offset currently applied to local time.
	pub fn offset(&self) -> i64 {
		self.inner.read().unwrap().offset
	}
}

impl TimeSource for NetTime {
	fn now(&self) -> i64 {
		Utc::now().timestamp() + self.offset()
	}
}
