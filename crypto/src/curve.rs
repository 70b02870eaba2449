//! Uniform interface over the supported elliptic curves.
//!
//! Short-Weierstrass curves (secp256k1, P-256, P-384, P-521) dispatch
//! through the RustCrypto arithmetic backends; Ed25519 uses a dedicated
//! twisted-Edwards implementation. Every point that crosses a trust
//! boundary is validated in order: curve tag, encoding, on-curve, subgroup.

#[macro_use]
mod macros;

pub mod ed25519;
pub mod p256;
pub mod p384;
pub mod p521;
pub mod secp256k1;

use std::fmt::Debug;

use num_bigint::BigUint;

use crate::{
	arith::Modulus,
	error::{Error, Result},
	hashing::{drbg::DrbgAesCtr, ro::Ro},
	Rng,
};

/// Registry codes used in serialised form. Short-Weierstrass curves use
/// their standard NIDs; Ed25519 uses a synthetic code.
pub const CURVE_CODE_SECP256K1: u16 = 714;
pub const CURVE_CODE_P256: u16 = 415;
pub const CURVE_CODE_P384: u16 = 715;
pub const CURVE_CODE_P521: u16 = 716;
pub const CURVE_CODE_ED25519: u16 = 0xffff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveKind {
	ShortWeierstrass,
	TwistedEdwards,
}

pub trait ECScalar:
	Clone
	+ Debug
	+ Default
	+ PartialEq
	+ Eq
	+ Sized
	+ Send
	+ Sync
	+ 'static
	+ serde::Serialize
	+ for<'de> serde::Deserialize<'de>
	+ crate::hashing::ro::RoEncode
	+ crate::encoding::Encodable
	+ zeroize::Zeroize
	+ std::ops::Add<Output = Self>
	+ for<'a> std::ops::Add<&'a Self, Output = Self>
	+ std::ops::Sub<Output = Self>
	+ for<'a> std::ops::Sub<&'a Self, Output = Self>
	+ std::ops::Mul<Output = Self>
	+ for<'a> std::ops::Mul<&'a Self, Output = Self>
	+ std::ops::Neg<Output = Self>
	+ std::iter::Sum
	+ From<u32>
{
	/// Canonical encoding size in bytes.
	const SIZE: usize;

	fn random(rng: &mut Rng) -> Self;
	fn zero() -> Self;
	fn invert(&self) -> Option<Self>;

	/// Canonical fixed-width encoding (big-endian for short-Weierstrass
	/// curves, the standard little-endian form for Ed25519).
	fn to_bytes(&self) -> Vec<u8>;
	/// Rejects non-canonical encodings (values at or above the order).
	fn from_bytes(bytes: &[u8]) -> Result<Self>;

	fn to_biguint(&self) -> BigUint;
	fn from_biguint(value: &BigUint) -> Result<Self>;
	fn from_biguint_mod_order(value: &BigUint) -> Self;

	/// Big-endian bytes of any width, reduced modulo the order.
	fn from_bytes_mod_order(bytes: &[u8]) -> Self {
		Self::from_biguint_mod_order(&BigUint::from_bytes_be(bytes))
	}

	fn is_zero(&self) -> bool {
		self == &Self::zero()
	}
}

pub trait ECPoint:
	Clone
	+ Copy
	+ Debug
	+ Default
	+ PartialEq
	+ Eq
	+ Send
	+ Sync
	+ 'static
	+ serde::Serialize
	+ for<'de> serde::Deserialize<'de>
	+ crate::hashing::ro::RoEncode
	+ crate::encoding::Encodable
	+ std::ops::Add<Output = Self>
	+ std::ops::Sub<Output = Self>
	+ std::ops::Neg<Output = Self>
	+ std::iter::Sum
{
	type Scalar: ECScalar;

	const KIND: CurveKind;
	const CODE: u16;
	const NAME: &'static str;
	/// Compressed encoding size in bytes.
	const COMPRESSED_SIZE: usize;

	/// The group order as a modulus context (shared, precomputed).
	fn order() -> &'static Modulus;

	fn generator() -> Self;
	fn infinity() -> Self;
	fn is_infinity(&self) -> bool;

	/// s * G through the precomputed generator table, constant time.
	fn from_scalar(scalar: &Self::Scalar) -> Self;

	/// Constant-time scalar multiplication.
	fn mul(&self, scalar: &Self::Scalar) -> Self;

	/// g_scalar * G + p_scalar * P, constant time.
	fn mul_add(g_scalar: &Self::Scalar, point: &Self, p_scalar: &Self::Scalar) -> Self {
		Self::from_scalar(g_scalar) + point.mul(p_scalar)
	}

	/// Variable-time g_scalar * G + p_scalar * P for public inputs
	/// (Shamir's trick where the backend provides it).
	fn mul_add_vartime(g_scalar: &Self::Scalar, point: &Self, p_scalar: &Self::Scalar) -> Self {
		Self::mul_add(g_scalar, point, p_scalar)
	}

	/// Compressed encoding; the point at infinity (where representable) is
	/// the all-zero string.
	fn to_bytes(&self) -> Vec<u8>;

	/// Full wire validation: encoding, on-curve, prime-order subgroup.
	fn from_bytes(bytes: &[u8]) -> Result<Self>;

	/// Attempt to interpret oracle output as a point; used by
	/// hash-to-point rejection sampling. Twisted-Edwards implementations
	/// clear the cofactor before returning.
	fn decode_candidate(bytes: &[u8]) -> Option<Self>;
}

/// Hash-to-point by rejection sampling: clone the oracle state, append a
/// counter and retry until the output decodes. Deterministic in the input,
/// variable time.
pub fn hash_to_point<P: ECPoint>(ro: &Ro) -> P {
	for counter in 0u32.. {
		let candidate = ro.clone().feed(&counter).bits(P::COMPRESSED_SIZE * 8);
		if let Some(point) = P::decode_candidate(&candidate) {
			return point
		}
	}
	unreachable!("rejection sampling terminates")
}

/// A uniformly random scalar drawn from a seeded DRBG (64-bit margin).
pub fn scalar_from_drbg<P: ECPoint>(drbg: &mut DrbgAesCtr) -> P::Scalar {
	let value = drbg.gen_biguint_below(P::order());
	P::Scalar::from_biguint(&value).expect("reduced below the order")
}

/// A uniformly random subgroup element r * G drawn from a seeded DRBG.
pub fn point_from_drbg<P: ECPoint>(drbg: &mut DrbgAesCtr) -> P {
	P::from_scalar(&scalar_from_drbg::<P>(drbg))
}

/// Reduce random-oracle output to a scalar.
pub fn scalar_from_ro<P: ECPoint>(ro: Ro) -> P::Scalar {
	let value = ro.number_mod(P::order());
	P::Scalar::from_biguint(&value).expect("reduced below the order")
}

/// The fixed party-identifier derivation: a scalar obtained by hashing the
/// party name. All threshold access-structure nodes rely on this mapping,
/// so it must not change.
pub fn pid_from_name<P: ECPoint>(name: &str) -> P::Scalar {
	scalar_from_ro::<P>(Ro::new().feed("party-id").feed(name))
}

pub(crate) fn encode_point<P: ECPoint>(point: &P, writer: &mut crate::encoding::ByteWriter) {
	writer.write_u16(P::CODE);
	writer.write_raw(&point.to_bytes());
}

pub(crate) fn decode_point<P: ECPoint>(reader: &mut crate::encoding::ByteReader) -> Result<P> {
	let code = reader.read_u16()?;
	if code != P::CODE {
		return Err(Error::Format("curve code mismatch"))
	}
	let bytes = reader.read_raw(P::COMPRESSED_SIZE)?;
	P::from_bytes(&bytes)
}
