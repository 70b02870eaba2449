// Copyright 2025 Chainflip Labs GmbH
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
//
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors surfaced by the cryptographic engine.
///
/// `Insufficient` is special: during access-tree reconstruction it is
/// intercepted at OR/THRESHOLD join points and treated as "try the next
/// branch". Everywhere else it propagates to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
	/// The caller passed an impossible configuration (mismatched vector
	/// lengths, empty input where non-empty is required, etc.)
	#[error("bad argument: {0}")]
	BadArgument(&'static str),

	/// A serialised blob is structurally invalid
	#[error("format error: {0}")]
	Format(&'static str),

	/// A cryptographic check failed (hash mismatch, point not in subgroup,
	/// failed proof verification, gcd check, ...)
	#[error("crypto error: {0}")]
	Crypto(&'static str),

	/// Reconstruction cannot proceed because no quorum is available
	#[error("insufficient shares: {0}")]
	Insufficient(&'static str),

	#[error("operation not supported: {0}")]
	NotSupported(&'static str),

	#[error("not found: {0}")]
	NotFound(&'static str),

	#[error("out of range: {0}")]
	Range(&'static str),

	/// An internal invariant was violated. Unlike the other variants this
	/// indicates a bug rather than bad input; higher layers may choose to
	/// abort on it.
	#[error("logic error: {0}")]
	Logic(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub fn is_insufficient(&self) -> bool {
		matches!(self, Error::Insufficient(_))
	}
}

macro_rules! ensure_arg {
	($cond:expr, $msg:literal) => {
		if !$cond {
			return Err($crate::error::Error::BadArgument($msg))
		}
	};
}

macro_rules! ensure_crypto {
	($cond:expr, $msg:literal) => {
		if !$cond {
			return Err($crate::error::Error::Crypto($msg))
		}
	};
}

pub(crate) use {ensure_arg, ensure_crypto};
