//! Ed25519 backend: a dedicated twisted-Edwards implementation over
//! curve25519-dalek with precomputed generator tables.
//!
//! Unlike the short-Weierstrass curves the group has cofactor 8, so wire
//! decoding checks torsion-freeness explicitly and hash-to-point clears the
//! cofactor by multiplying by 8.

use curve25519_dalek::{
	edwards::{CompressedEdwardsY, EdwardsPoint},
	traits::Identity,
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
	arith::Modulus,
	curve::{CurveKind, ECPoint, ECScalar},
	encoding::{ByteReader, ByteWriter, Encodable},
	error::{Error, Result},
	hashing::ro::{RoEncode, RoState},
	Rng,
};

type SK = curve25519_dalek::scalar::Scalar;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scalar(SK);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point(EdwardsPoint);

lazy_static::lazy_static! {
	static ref ORDER: Modulus = Modulus::new_dense(
		BigUint::parse_bytes(
			b"1000000000000000000000000000000014DEF9DEA2F79CD65812631A5CF5D3ED",
			16,
		)
		.expect("valid order constant"),
	)
	.expect("group order is odd");
}

/// X.509 SubjectPublicKeyInfo prefix for an Ed25519 public key (RFC 8410).
pub const X509_PUBLIC_KEY_PREFIX: [u8; 12] =
	[0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00];

/// PKCS#8 PrivateKeyInfo prefix for an Ed25519 private key (RFC 8410).
pub const PKCS8_PRIVATE_KEY_PREFIX: [u8; 16] = [
	0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04,
	0x20,
];

pub fn x509_wrap_public(point: &Point) -> Vec<u8> {
	let mut out = X509_PUBLIC_KEY_PREFIX.to_vec();
	out.extend_from_slice(&ECPoint::to_bytes(point));
	out
}

pub fn x509_unwrap_public(der: &[u8]) -> Result<Point> {
	if der.len() != X509_PUBLIC_KEY_PREFIX.len() + 32 ||
		der[..X509_PUBLIC_KEY_PREFIX.len()] != X509_PUBLIC_KEY_PREFIX
	{
		return Err(Error::Format("not an Ed25519 X.509 public key"))
	}
	ECPoint::from_bytes(&der[X509_PUBLIC_KEY_PREFIX.len()..])
}

pub fn pkcs8_wrap_private(key: &[u8; 32]) -> Vec<u8> {
	let mut out = PKCS8_PRIVATE_KEY_PREFIX.to_vec();
	out.extend_from_slice(key);
	out
}

pub fn pkcs8_unwrap_private(der: &[u8]) -> Result<[u8; 32]> {
	if der.len() != PKCS8_PRIVATE_KEY_PREFIX.len() + 32 ||
		der[..PKCS8_PRIVATE_KEY_PREFIX.len()] != PKCS8_PRIVATE_KEY_PREFIX
	{
		return Err(Error::Format("not an Ed25519 PKCS#8 private key"))
	}
	Ok(der[PKCS8_PRIVATE_KEY_PREFIX.len()..].try_into().expect("sized"))
}

mod scalar_impls {
	use super::*;

	impl ECScalar for Scalar {
		const SIZE: usize = 32;

		fn random(rng: &mut Rng) -> Self {
			use rand::RngCore;
			let mut wide = [0u8; 64];
			rng.fill_bytes(&mut wide);
			Scalar(SK::from_bytes_mod_order_wide(&wide))
		}

		fn zero() -> Self {
			Scalar(SK::ZERO)
		}

		fn invert(&self) -> Option<Self> {
			if self.0 == SK::ZERO {
				None
			} else {
				Some(Scalar(self.0.invert()))
			}
		}

		fn to_bytes(&self) -> Vec<u8> {
			self.0.to_bytes().to_vec()
		}

		fn from_bytes(bytes: &[u8]) -> Result<Self> {
			let bytes: [u8; 32] =
				bytes.try_into().map_err(|_| Error::Format("bad scalar size"))?;
			Option::<SK>::from(SK::from_canonical_bytes(bytes))
				.map(Scalar)
				.ok_or(Error::Format("non-canonical scalar"))
		}

		fn to_biguint(&self) -> BigUint {
			BigUint::from_bytes_le(&self.0.to_bytes())
		}

		fn from_biguint(value: &BigUint) -> Result<Self> {
			if value >= Point::order().value() {
				return Err(Error::BadArgument("value exceeds the group order"))
			}
			let mut bytes = [0u8; 32];
			let le = value.to_bytes_le();
			bytes[..le.len()].copy_from_slice(&le);
			Self::from_bytes(&bytes)
		}

		fn from_biguint_mod_order(value: &BigUint) -> Self {
			let reduced = Point::order().reduce_vartime(value);
			Self::from_biguint(&reduced).expect("reduced below the order")
		}

		/// Big-endian input of any width, matching the short-Weierstrass
		/// convention for cross-curve helpers.
		fn from_bytes_mod_order(bytes: &[u8]) -> Self {
			Self::from_biguint_mod_order(&BigUint::from_bytes_be(bytes))
		}
	}

	impl Default for Scalar {
		fn default() -> Self {
			<Self as ECScalar>::zero()
		}
	}

	impl From<u32> for Scalar {
		fn from(x: u32) -> Self {
			Scalar(SK::from(x))
		}
	}

	impl zeroize::Zeroize for Scalar {
		fn zeroize(&mut self) {
			use zeroize::Zeroize;
			self.0.zeroize();
		}
	}

	impl Drop for Scalar {
		fn drop(&mut self) {
			use zeroize::Zeroize;
			self.zeroize();
		}
	}

	impl zeroize::ZeroizeOnDrop for Scalar {}

	impl std::ops::Add for Scalar {
		type Output = Scalar;
		fn add(self, rhs: Self) -> Scalar {
			Scalar(self.0 + rhs.0)
		}
	}

	impl<'a> std::ops::Add<&'a Scalar> for Scalar {
		type Output = Scalar;
		fn add(self, rhs: &'a Scalar) -> Scalar {
			Scalar(self.0 + rhs.0)
		}
	}

	impl std::ops::Sub for Scalar {
		type Output = Scalar;
		fn sub(self, rhs: Self) -> Scalar {
			Scalar(self.0 - rhs.0)
		}
	}

	impl<'a> std::ops::Sub<&'a Scalar> for Scalar {
		type Output = Scalar;
		fn sub(self, rhs: &'a Scalar) -> Scalar {
			Scalar(self.0 - rhs.0)
		}
	}

	impl std::ops::Mul for Scalar {
		type Output = Scalar;
		fn mul(self, rhs: Self) -> Scalar {
			Scalar(self.0 * rhs.0)
		}
	}

	impl<'a> std::ops::Mul<&'a Scalar> for Scalar {
		type Output = Scalar;
		fn mul(self, rhs: &'a Scalar) -> Scalar {
			Scalar(self.0 * rhs.0)
		}
	}

	impl std::ops::Neg for Scalar {
		type Output = Scalar;
		fn neg(self) -> Scalar {
			Scalar(-self.0)
		}
	}

	impl std::iter::Sum for Scalar {
		fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
			iter.fold(<Self as ECScalar>::zero(), |a, b| a + b)
		}
	}

	impl Serialize for Scalar {
		fn serialize<S: serde::Serializer>(
			&self,
			serializer: S,
		) -> std::result::Result<S::Ok, S::Error> {
			self.to_bytes().serialize(serializer)
		}
	}

	impl<'de> Deserialize<'de> for Scalar {
		fn deserialize<D: serde::Deserializer<'de>>(
			deserializer: D,
		) -> std::result::Result<Self, D::Error> {
			let bytes = Vec::<u8>::deserialize(deserializer)?;
			Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
		}
	}

	impl RoEncode for Scalar {
		fn ro_encode(&self, state: &mut RoState) {
			state.update_sized(&self.to_bytes());
		}
	}

	impl Encodable for Scalar {
		fn encode(&self, writer: &mut ByteWriter) {
			writer.write_raw(&self.to_bytes());
		}

		fn decode(reader: &mut ByteReader) -> Result<Self> {
			let bytes = reader.read_raw(<Self as ECScalar>::SIZE)?;
			Self::from_bytes(&bytes)
		}
	}
}

mod point_impls {
	use super::*;

	impl ECPoint for Point {
		type Scalar = Scalar;

		const KIND: CurveKind = CurveKind::TwistedEdwards;
		const CODE: u16 = crate::curve::CURVE_CODE_ED25519;
		const NAME: &'static str = "Ed25519";
		const COMPRESSED_SIZE: usize = 32;

		fn order() -> &'static Modulus {
			&ORDER
		}

		fn generator() -> Self {
			Point(curve25519_dalek::constants::ED25519_BASEPOINT_POINT)
		}

		fn infinity() -> Self {
			Point(EdwardsPoint::identity())
		}

		fn is_infinity(&self) -> bool {
			self.0 == EdwardsPoint::identity()
		}

		fn from_scalar(scalar: &Scalar) -> Self {
			Point(EdwardsPoint::mul_base(&scalar.0))
		}

		fn mul(&self, scalar: &Scalar) -> Self {
			Point(self.0 * scalar.0)
		}

		fn mul_add(g_scalar: &Scalar, point: &Self, p_scalar: &Scalar) -> Self {
			Point(EdwardsPoint::mul_base(&g_scalar.0) + point.0 * p_scalar.0)
		}

		fn mul_add_vartime(g_scalar: &Scalar, point: &Self, p_scalar: &Scalar) -> Self {
			Point(EdwardsPoint::vartime_double_scalar_mul_basepoint(
				&p_scalar.0,
				&point.0,
				&g_scalar.0,
			))
		}

		fn to_bytes(&self) -> Vec<u8> {
			self.0.compress().to_bytes().to_vec()
		}

		fn from_bytes(bytes: &[u8]) -> Result<Self> {
			let bytes: [u8; 32] =
				bytes.try_into().map_err(|_| Error::Format("bad point size"))?;
			let point = CompressedEdwardsY(bytes)
				.decompress()
				.ok_or(Error::Crypto("point not on the curve"))?;
			if !point.is_torsion_free() {
				return Err(Error::Crypto("point not in the prime-order subgroup"))
			}
			Ok(Point(point))
		}

		fn decode_candidate(bytes: &[u8]) -> Option<Self> {
			debug_assert_eq!(bytes.len(), Self::COMPRESSED_SIZE);
			let bytes: [u8; 32] = bytes.try_into().ok()?;
			let point = CompressedEdwardsY(bytes).decompress()?;
			// Clear the cofactor; reject the (astronomically unlikely)
			// small-torsion candidates that collapse to the identity
			let cleared = point.mul_by_cofactor();
			if cleared == EdwardsPoint::identity() {
				return None
			}
			Some(Point(cleared))
		}
	}

	derive_shared_point_impls!();

	impl Serialize for Point {
		fn serialize<S: serde::Serializer>(
			&self,
			serializer: S,
		) -> std::result::Result<S::Ok, S::Error> {
			<Self as ECPoint>::to_bytes(self).serialize(serializer)
		}
	}

	impl<'de> Deserialize<'de> for Point {
		fn deserialize<D: serde::Deserializer<'de>>(
			deserializer: D,
		) -> std::result::Result<Self, D::Error> {
			let bytes = Vec::<u8>::deserialize(deserializer)?;
			<Self as ECPoint>::from_bytes(&bytes).map_err(serde::de::Error::custom)
		}
	}

	impl RoEncode for Point {
		fn ro_encode(&self, state: &mut RoState) {
			state.update_sized(&<Self as ECPoint>::to_bytes(self));
		}
	}

	impl Encodable for Point {
		fn encode(&self, writer: &mut ByteWriter) {
			crate::curve::encode_point(self, writer);
		}

		fn decode(reader: &mut ByteReader) -> Result<Self> {
			crate::curve::decode_point(reader)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generator_encodes_to_the_standard_constant() {
		// The 32-byte little-endian Ed25519 base point
		assert_eq!(
			hex::encode(ECPoint::to_bytes(&Point::generator())),
			"5866666666666666666666666666666666666666666666666666666666666666"
		);
	}

	#[test]
	fn torsion_points_are_rejected_on_the_wire() {
		// A small-order point: the canonical encoding of a torsion element
		// (order 4), on the curve but outside the prime-order subgroup
		let torsion =
			hex::decode("c7176a703d4dd84fba3c0b760d10670f2a2053fa2c39ccc64ec7fd7792ac037a")
				.unwrap();
		assert!(matches!(
			<Point as ECPoint>::from_bytes(&torsion),
			Err(Error::Crypto(_))
		));
	}

	#[test]
	fn key_material_wrapping_round_trips() {
		let point = Point::generator();
		let der = x509_wrap_public(&point);
		assert_eq!(x509_unwrap_public(&der).unwrap(), point);
		assert!(x509_unwrap_public(&der[1..]).is_err());

		let key = [9u8; 32];
		let der = pkcs8_wrap_private(&key);
		assert_eq!(pkcs8_unwrap_private(&der).unwrap(), key);
	}
}
