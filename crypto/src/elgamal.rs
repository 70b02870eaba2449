//! Additively homomorphic EC-ElGamal commitments.
//!
//! A commitment to m under public point Q with randomness r is the pair
//! (r·G, m·G + r·Q). Operations on the plaintext correspond to
//! componentwise point operations on the pair.

use serde::{Deserialize, Serialize};

use crate::{
	curve::{ECPoint, ECScalar},
	encoding::{ByteReader, ByteWriter, Encodable},
	error::Result,
	hashing::ro::{RoEncode, RoState},
	Rng,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ElgamalCom<P: ECPoint> {
	pub l: P,
	pub r: P,
}

impl<P: ECPoint> ElgamalCom<P> {
	pub fn new(l: P, r: P) -> Self {
		ElgamalCom { l, r }
	}

	/// Commit to m with explicit randomness.
	pub fn commit(pub_key: &P, m: &P::Scalar, r: &P::Scalar) -> Self {
		ElgamalCom {
			l: P::from_scalar(r),
			r: P::mul_add(m, pub_key, r),
		}
	}

	/// Commit with fresh randomness; the randomness is returned so the
	/// caller can prove statements about it later.
	pub fn random_commit(pub_key: &P, m: &P::Scalar, rng: &mut Rng) -> (Self, P::Scalar) {
		let r = P::Scalar::random(rng);
		(Self::commit(pub_key, m, &r), r)
	}

	/// Local key generation for the commitment scheme: (Q, d) with Q = d·G.
	pub fn local_keygen(rng: &mut Rng) -> (P, P::Scalar) {
		let d = P::Scalar::random(rng);
		(P::from_scalar(&d), d)
	}

	/// Add (r'·G, r'·Q): fresh randomness, same plaintext.
	pub fn rerand(&self, pub_key: &P, r: &P::Scalar) -> Self {
		ElgamalCom {
			l: self.l + P::from_scalar(r),
			r: self.r + pub_key.mul(r),
		}
	}

	pub fn randomize(&mut self, pub_key: &P, rng: &mut Rng) -> P::Scalar {
		let r = P::Scalar::random(rng);
		*self = self.rerand(pub_key, &r);
		r
	}

	/// Multiply the committed plaintext (and randomness) by s.
	pub fn mul_scalar(&self, s: &P::Scalar) -> Self {
		ElgamalCom { l: self.l.mul(s), r: self.r.mul(s) }
	}

	/// Add a public scalar to the plaintext.
	pub fn add_scalar(&self, s: &P::Scalar) -> Self {
		ElgamalCom { l: self.l, r: self.r + P::from_scalar(s) }
	}

	pub fn sub_scalar(&self, s: &P::Scalar) -> Self {
		ElgamalCom { l: self.l, r: self.r - P::from_scalar(s) }
	}

	/// With the private key d (Q = d·G), a commitment to zero satisfies
	/// d·L = R.
	pub fn check_zero(&self, prv_key: &P::Scalar) -> bool {
		self.l.mul(prv_key) == self.r
	}

	/// Plaintext equality of two commitments under the same key.
	pub fn check_equal(e1: &Self, e2: &Self, prv_key: &P::Scalar) -> bool {
		(*e1 - *e2).check_zero(prv_key)
	}

	/// Both components on curve and in the subgroup (wire validation is
	/// already done point-wise; this is for aggregate checks).
	pub fn validate(&self) -> Result<()> {
		P::from_bytes(&self.l.to_bytes())?;
		P::from_bytes(&self.r.to_bytes())?;
		Ok(())
	}
}

impl<P: ECPoint> std::ops::Add for ElgamalCom<P> {
	type Output = Self;
	fn add(self, rhs: Self) -> Self {
		ElgamalCom { l: self.l + rhs.l, r: self.r + rhs.r }
	}
}

impl<P: ECPoint> std::ops::Sub for ElgamalCom<P> {
	type Output = Self;
	fn sub(self, rhs: Self) -> Self {
		ElgamalCom { l: self.l - rhs.l, r: self.r - rhs.r }
	}
}

impl<P: ECPoint> std::ops::Neg for ElgamalCom<P> {
	type Output = Self;
	fn neg(self) -> Self {
		ElgamalCom { l: -self.l, r: -self.r }
	}
}

impl<P: ECPoint> RoEncode for ElgamalCom<P> {
	fn ro_encode(&self, state: &mut RoState) {
		self.l.ro_encode(state);
		self.r.ro_encode(state);
	}
}

impl<P: ECPoint> Encodable for ElgamalCom<P> {
	fn encode(&self, writer: &mut ByteWriter) {
		self.l.encode(writer);
		self.r.encode(writer);
	}

	fn decode(reader: &mut ByteReader) -> Result<Self> {
		let l = P::decode(reader)?;
		let r = P::decode(reader)?;
		Ok(ElgamalCom { l, r })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::secp256k1::Point;
	use rand::SeedableRng;

	type Com = ElgamalCom<Point>;
	type Scalar = <Point as ECPoint>::Scalar;

	#[test]
	fn homomorphic_addition_and_scaling() {
		let mut rng = Rng::from_seed([50; 32]);
		let (pub_key, prv_key) = Com::local_keygen(&mut rng);

		let m1 = Scalar::random(&mut rng);
		let m2 = Scalar::random(&mut rng);
		let (c1, _) = Com::random_commit(&pub_key, &m1, &mut rng);
		let (c2, _) = Com::random_commit(&pub_key, &m2, &mut rng);

		// com(m1) + com(m2) commits to m1 + m2
		let sum = c1 + c2;
		let (expected, _) = Com::random_commit(&pub_key, &(m1.clone() + m2.clone()), &mut rng);
		assert!(Com::check_equal(&sum, &expected, &prv_key));

		// Scaling the commitment scales the plaintext
		let s = Scalar::from(3u32);
		let scaled = c1.mul_scalar(&s);
		let (expected, _) = Com::random_commit(&pub_key, &(m1.clone() * s), &mut rng);
		assert!(Com::check_equal(&scaled, &expected, &prv_key));

		// Different plaintexts do not compare equal
		assert!(!Com::check_equal(&c1, &c2, &prv_key));
	}

	#[test]
	fn rerandomisation_preserves_the_plaintext() {
		let mut rng = Rng::from_seed([51; 32]);
		let (pub_key, prv_key) = Com::local_keygen(&mut rng);
		let m = Scalar::random(&mut rng);
		let (mut com, _) = Com::random_commit(&pub_key, &m, &mut rng);
		let original = com;
		com.randomize(&pub_key, &mut rng);
		assert_ne!(com, original);
		assert!(Com::check_equal(&com, &original, &prv_key));
	}

	#[test]
	fn scalar_plaintext_shifts() {
		let mut rng = Rng::from_seed([52; 32]);
		let (pub_key, prv_key) = Com::local_keygen(&mut rng);
		let m = Scalar::random(&mut rng);
		let s = Scalar::random(&mut rng);
		let (com, _) = Com::random_commit(&pub_key, &m, &mut rng);

		let shifted = com.add_scalar(&s);
		let (expected, _) =
			Com::random_commit(&pub_key, &(m.clone() + s.clone()), &mut rng);
		assert!(Com::check_equal(&shifted, &expected, &prv_key));
		assert!(Com::check_equal(&shifted.sub_scalar(&s), &com, &prv_key));
	}

	#[test]
	fn zero_commitment_check() {
		let mut rng = Rng::from_seed([53; 32]);
		let (pub_key, prv_key) = Com::local_keygen(&mut rng);
		let (zero_com, _) = Com::random_commit(&pub_key, &Scalar::zero(), &mut rng);
		assert!(zero_com.check_zero(&prv_key));

		let (other, _) = Com::random_commit(&pub_key, &Scalar::from(1u32), &mut rng);
		assert!(!other.check_zero(&prv_key));
	}

	#[test]
	fn encoding_round_trip() {
		let mut rng = Rng::from_seed([54; 32]);
		let (pub_key, _) = Com::local_keygen(&mut rng);
		let (com, _) = Com::random_commit(&pub_key, &Scalar::from(7u32), &mut rng);
		assert_eq!(Com::from_encoded(&com.to_encoded()).unwrap(), com);
	}
}
