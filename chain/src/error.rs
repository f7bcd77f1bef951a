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

//! Error types for the chain

use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};

use crate::core::pow;
use crate::core::ser;

/// Error definition
#[derive(Debug)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Chain error definitions
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// The header's parent isn't known yet; the header is held in the
	/// orphan pool rather than rejected
	#[fail(display = "Orphan")]
	Orphan,
	/// Header already accepted into the main or side chain store
	#[fail(display = "Duplicate Header")]
	Duplicate,
	/// Header already held in the orphan pool
	#[fail(display = "Duplicate Orphan")]
	DuplicateOrphan,
	/// Header timestamp too far ahead of the network-adjusted clock
	#[fail(display = "Header Time Too New")]
	TimeTooNew,
	/// Header timestamp not past the median time of its ancestors
	#[fail(display = "Header Time Too Old")]
	TimeTooOld,
	/// The proof of work is invalid
	#[fail(display = "Invalid PoW: {}", _0)]
	BadPow(pow::Error),
	/// Difficulty bits differ from the retarget's required value
	#[fail(display = "Bad Difficulty Bits")]
	BadDiffBits,
	/// Error serializing or deserializing a header
	#[fail(display = "Serialization Error: {}", _0)]
	SerErr(ser::Error),
	/// Anything else
	#[fail(display = "Other Error: {}", _0)]
	Other(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		Display::fmt(&self.inner, f)
	}
}

impl Error {
	/// get kind
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
	/// get cause
	pub fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}
	/// get backtrace
	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}

	/// Whether the error is due to a header that was intrinsically wrong,
	/// as opposed to one we simply can't place yet.
	pub fn is_bad_header(&self) -> bool {
		match self.kind() {
			ErrorKind::Orphan
			| ErrorKind::Duplicate
			| ErrorKind::DuplicateOrphan
			| ErrorKind::Other(_) => false,
			_ => true,
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner }
	}
}

impl From<pow::Error> for Error {
	fn from(error: pow::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::BadPow(error)),
		}
	}
}

impl From<ser::Error> for Error {
	fn from(error: ser::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::SerErr(error)),
		}
	}
}
