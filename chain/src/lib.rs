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

//! The header chain itself, validates and accepts new headers, resolves
//! orphans once their ancestry connects and handles reorganizations across
//! forks.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate serde_derive;

use keel_core as core;

mod chain;
pub mod error;
pub mod pipe;
pub mod store;
pub mod time;
pub mod types;

// Re-export the base interface

pub use crate::chain::Chain;
pub use crate::error::{Error, ErrorKind};
pub use crate::time::{NetTime, SystemTimeSource, TimeSource};
pub use crate::types::{HeaderEntry, Tip};
