//! Macro generating a curve backend over a RustCrypto short-Weierstrass
//! arithmetic crate. All four such curves share the exact same API surface,
//! so the per-curve modules are single invocations of this macro.

/// Operator plumbing shared by every point type: the group operations
/// delegate to the inner representation, infinity is the additive identity.
macro_rules! derive_shared_point_impls {
	() => {
		impl Default for Point {
			fn default() -> Self {
				<Self as ECPoint>::infinity()
			}
		}

		impl std::ops::Add for Point {
			type Output = Point;
			fn add(self, rhs: Self) -> Point {
				Point(self.0 + rhs.0)
			}
		}

		impl std::ops::Sub for Point {
			type Output = Point;
			fn sub(self, rhs: Self) -> Point {
				Point(self.0 - rhs.0)
			}
		}

		impl std::ops::Neg for Point {
			type Output = Point;
			fn neg(self) -> Point {
				Point(-self.0)
			}
		}

		impl<B: std::borrow::Borrow<Scalar>> std::ops::Mul<B> for Point {
			type Output = Point;
			fn mul(self, scalar: B) -> Point {
				Point(self.0 * scalar.borrow().0)
			}
		}

		impl std::iter::Sum for Point {
			fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
				iter.fold(<Self as ECPoint>::infinity(), |a, b| a + b)
			}
		}
	};
}

macro_rules! weierstrass_curve {
	(
		$pkg:ident,
		$name:literal,
		$code:expr,
		$compressed_size:expr,
		$scalar_size:expr,
		$field_bits:expr,
		$order_hex:literal
	) => {
		use elliptic_curve::{
			ff::{Field, PrimeField},
			ops::MulByGenerator,
			sec1::{FromEncodedPoint, ToEncodedPoint},
			Group,
		};
		use num_bigint::BigUint;
		use serde::{Deserialize, Serialize};

		use $crate::{
			arith::Modulus,
			curve::{CurveKind, ECPoint, ECScalar},
			encoding::{ByteReader, ByteWriter, Encodable},
			error::{Error, Result},
			hashing::ro::{RoEncode, RoState},
			Rng,
		};

		type ScalarInner = $pkg::Scalar;
		type PointInner = $pkg::ProjectivePoint;

		#[derive(Clone, Debug, PartialEq, Eq)]
		pub struct Scalar(ScalarInner);

		#[derive(Clone, Copy, Debug, PartialEq, Eq)]
		pub struct Point(PointInner);

		lazy_static::lazy_static! {
			static ref ORDER: Modulus = Modulus::new_dense(
				BigUint::parse_bytes($order_hex.as_bytes(), 16).expect("valid order constant"),
			)
			.expect("group order is odd");
		}

		mod scalar_impls {
			use super::*;

			impl ECScalar for Scalar {
				const SIZE: usize = $scalar_size;

				fn random(rng: &mut Rng) -> Self {
					Scalar(ScalarInner::random(&mut *rng))
				}

				fn zero() -> Self {
					Scalar(ScalarInner::ZERO)
				}

				fn invert(&self) -> Option<Self> {
					Option::<ScalarInner>::from(self.0.invert()).map(Scalar)
				}

				fn to_bytes(&self) -> Vec<u8> {
					self.0.to_repr().to_vec()
				}

				fn from_bytes(bytes: &[u8]) -> Result<Self> {
					if bytes.len() != Self::SIZE {
						return Err(Error::Format("bad scalar size"))
					}
					let repr = $pkg::FieldBytes::clone_from_slice(bytes);
					Option::<ScalarInner>::from(ScalarInner::from_repr(repr))
						.map(Scalar)
						.ok_or(Error::Format("non-canonical scalar"))
				}

				fn to_biguint(&self) -> BigUint {
					BigUint::from_bytes_be(&self.to_bytes())
				}

				fn from_biguint(value: &BigUint) -> Result<Self> {
					if value >= Point::order().value() {
						return Err(Error::BadArgument("value exceeds the group order"))
					}
					let mut bytes = vec![0u8; Self::SIZE];
					let value_bytes = value.to_bytes_be();
					bytes[Self::SIZE - value_bytes.len()..].copy_from_slice(&value_bytes);
					Self::from_bytes(&bytes)
				}

				fn from_biguint_mod_order(value: &BigUint) -> Self {
					let reduced = Point::order().reduce_vartime(value);
					Self::from_biguint(&reduced).expect("reduced below the order")
				}
			}

			impl Default for Scalar {
				fn default() -> Self {
					<Self as ECScalar>::zero()
				}
			}

			impl From<u32> for Scalar {
				fn from(x: u32) -> Self {
					Scalar(ScalarInner::from_u128(x as u128))
				}
			}

			impl zeroize::Zeroize for Scalar {
				fn zeroize(&mut self) {
					use core::sync::atomic;
					unsafe { std::ptr::write_volatile(&mut self.0, ScalarInner::ZERO) };
					atomic::compiler_fence(atomic::Ordering::SeqCst);
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
					let bytes = reader.read_raw(Self::SIZE)?;
					Self::from_bytes(&bytes)
				}
			}
		}

		mod point_impls {
			use super::*;

			impl ECPoint for Point {
				type Scalar = Scalar;

				const KIND: CurveKind = CurveKind::ShortWeierstrass;
				const CODE: u16 = $code;
				const NAME: &'static str = $name;
				const COMPRESSED_SIZE: usize = $compressed_size;

				fn order() -> &'static Modulus {
					&ORDER
				}

				fn generator() -> Self {
					Point(PointInner::generator())
				}

				fn infinity() -> Self {
					Point(PointInner::identity())
				}

				fn is_infinity(&self) -> bool {
					bool::from(self.0.is_identity())
				}

				fn from_scalar(scalar: &Scalar) -> Self {
					Point(PointInner::mul_by_generator(&scalar.0))
				}

				fn mul(&self, scalar: &Scalar) -> Self {
					Point(self.0 * scalar.0)
				}

				fn to_bytes(&self) -> Vec<u8> {
					if self.is_infinity() {
						// The SEC1 compressed form has no infinity encoding;
						// the all-zero string is the sentinel.
						vec![0u8; Self::COMPRESSED_SIZE]
					} else {
						self.0.to_affine().to_encoded_point(true).as_bytes().to_vec()
					}
				}

				fn from_bytes(bytes: &[u8]) -> Result<Self> {
					if bytes.len() != Self::COMPRESSED_SIZE {
						return Err(Error::Format("bad point size"))
					}
					if bytes.iter().all(|&b| b == 0) {
						return Ok(Self::infinity())
					}
					if bytes[0] != 0x02 && bytes[0] != 0x03 {
						return Err(Error::Format("not a compressed point"))
					}
					let encoded = $pkg::EncodedPoint::from_bytes(bytes)
						.map_err(|_| Error::Format("invalid point encoding"))?;
					// On a prime-order curve the subgroup check is implied
					// by the on-curve check.
					Option::<$pkg::AffinePoint>::from($pkg::AffinePoint::from_encoded_point(
						&encoded,
					))
					.map(|affine| Point(PointInner::from(affine)))
					.ok_or(Error::Crypto("point not on the curve"))
				}

				fn decode_candidate(bytes: &[u8]) -> Option<Self> {
					debug_assert_eq!(bytes.len(), Self::COMPRESSED_SIZE);
					let mut candidate = bytes.to_vec();
					// Clear x-coordinate bits beyond the field size, keep
					// the low bit of the original first byte as the parity
					candidate[1] &= 0xffu8 >> ((8 - ($field_bits % 8)) % 8);
					candidate[0] = 0x02 | (bytes[0] & 1);
					let encoded = $pkg::EncodedPoint::from_bytes(&candidate).ok()?;
					Option::<$pkg::AffinePoint>::from($pkg::AffinePoint::from_encoded_point(
						&encoded,
					))
					.map(|affine| Point(PointInner::from(affine)))
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
					$crate::curve::encode_point(self, writer);
				}

				fn decode(reader: &mut ByteReader) -> Result<Self> {
					$crate::curve::decode_point(reader)
				}
			}
		}
	};
}
