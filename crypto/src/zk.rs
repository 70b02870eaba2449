//! Zero-knowledge proofs.
//!
//! The UC-secure DL-family proofs are driven by the Fischlin transform in
//! [`fischlin`]; the remaining proofs are classical three-move sigma
//! protocols made non-interactive with the random oracle. Every proof
//! binds a session id and an auxiliary counter; verifiers reject if either
//! differs from the prover's.

pub mod batch_dl;
pub mod dh;
pub mod dl;
pub mod elgamal_com;
pub mod fischlin;
pub mod paillier;
pub mod pedersen;
pub mod unknown_order;

/// Computational security parameter in bits.
pub const SEC_P_COM: usize = 128;
/// Statistical security parameter in bits.
pub const SEC_P_STAT: usize = 64;

/// Status label for auxiliary public-key checks (e.g. Paillier key
/// validity) so that callers composing several proofs over the same key
/// can avoid re-verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckStatus {
	/// The key has not been checked; the verifier performs the check.
	Unverified,
	/// The key was already verified elsewhere; skip the check.
	Verified,
	/// The caller explicitly accepts the key without verification.
	Skip,
}

impl CheckStatus {
	pub fn needs_check(self) -> bool {
		matches!(self, CheckStatus::Unverified)
	}
}

use crate::curve::{ECPoint, ECScalar};
use crate::Rng;

/// A short (64-bit) random scalar used for batched linear verification.
pub(crate) fn short_sigma<P: ECPoint>(rng: &mut Rng) -> P::Scalar {
	use rand::RngCore;
	let mut bytes = [0u8; 8];
	rng.fill_bytes(&mut bytes);
	P::Scalar::from_bytes_mod_order(&bytes)
}

/// Signed challenge to scalar conversion (batch-DL uses challenges
/// symmetric around zero).
pub(crate) fn signed_to_scalar<P: ECPoint>(e: i32) -> P::Scalar {
	if e >= 0 {
		P::Scalar::from(e as u32)
	} else {
		-P::Scalar::from((-(e as i64)) as u32)
	}
}
