//! Generic driver for the Fischlin transform.
//!
//! A sigma protocol with transcript (commitment, challenge, response) is
//! repeated rho times; for each repetition the prover scans challenges
//! e' = 0, 1, ... until the 32-bit transcript hash has b zero low bits,
//! advancing the working response incrementally between candidates. If no
//! challenge within 2^t candidates works, the whole proof restarts with
//! fresh commitments. Repetition, hash rejection and the bounded challenge
//! space together give straight-line knowledge extraction without hashing
//! the full transcript per candidate.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// (rho, b, t): repetitions, zero-prefix bits per repetition, and the
/// log2 of the challenge search space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FischlinParams {
	pub rho: usize,
	pub b: u32,
	pub t: u32,
}

impl FischlinParams {
	pub const fn new(rho: usize, b: u32, t: u32) -> Self {
		FischlinParams { rho, b, t }
	}

	pub fn e_max(&self) -> u32 {
		assert!(self.t < 32);
		1 << self.t
	}

	pub fn b_mask(&self) -> u32 {
		assert!(self.b < 32);
		(1 << self.b) - 1
	}
}

/// Per-proof callbacks. The driver owns the iteration; the prover owns
/// the sigma-protocol state.
pub trait FischlinProver {
	/// Sample fresh per-repetition randomness and compute all commitments
	/// (also called on a restart).
	fn initialize(&mut self);
	/// Set the working response to the randomness of repetition i
	/// (the response for challenge e' = 0).
	fn response_begin(&mut self, i: usize);
	/// 32-bit transcript hash of (common transcript, i, e', working z).
	fn hash(&mut self, i: usize, e: u32) -> u32;
	/// Record (e, z) as the accepted pair for repetition i.
	fn save(&mut self, i: usize, e: u32);
	/// Advance the working response to the one for challenge `next_e`.
	fn response_next(&mut self, next_e: u32);
}

/// Run the prover side. The corresponding verification is defined by each
/// proof separately, which leaves room for proof-specific batching.
pub fn fischlin_prove<P: FischlinProver>(params: &FischlinParams, prover: &mut P) {
	let e_max = params.e_max();
	let b_mask = params.b_mask();

	'restart: loop {
		prover.initialize();

		for i in 0..params.rho {
			prover.response_begin(i);

			let mut found = false;
			for e in 0..e_max {
				if prover.hash(i, e) & b_mask == 0 {
					prover.save(i, e);
					found = true;
					break
				}
				prover.response_next(e + 1);
			}

			if !found {
				// Exhausted the challenge space for this repetition;
				// restart the whole proof with fresh commitments
				continue 'restart
			}
		}
		return
	}
}

/// The 32-bit transcript hash: SHA-256 over the common hash, the
/// repetition index, the (possibly signed) challenge and the encoded
/// response values, truncated to the first four bytes.
pub fn hash32(common_hash: &[u8], i: u32, e: i32, zs: &[&[u8]]) -> u32 {
	let mut hasher = Sha256::new();
	hasher.update(common_hash);
	hasher.update(i.to_be_bytes());
	hasher.update(e.to_be_bytes());
	for z in zs {
		hasher.update(z);
	}
	let digest = hasher.finalize();
	u32::from_be_bytes(digest[..4].try_into().expect("sized slice"))
}
