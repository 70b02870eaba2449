//! Classical three-move proof of a Diffie-Hellman tuple: knowledge of w
//! with A = w * G and B = w * Q.

use serde::{Deserialize, Serialize};

use crate::{
	curve::{scalar_from_ro, ECPoint, ECScalar},
	error::{ensure_crypto, Result},
	hashing::ro::Ro,
	Rng,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DhProof<P: ECPoint> {
	e: P::Scalar,
	z: P::Scalar,
}

fn challenge<P: ECPoint>(
	q: &P,
	a: &P,
	b: &P,
	x: &P,
	y: &P,
	sid: &[u8],
	aux: u64,
) -> P::Scalar {
	scalar_from_ro::<P>(
		Ro::new()
			.feed(&P::generator())
			.feed(q)
			.feed(a)
			.feed(b)
			.feed(x)
			.feed(y)
			.feed(sid)
			.feed(&aux),
	)
}

impl<P: ECPoint> DhProof<P> {
	pub fn prove(q: &P, a: &P, b: &P, w: &P::Scalar, sid: &[u8], aux: u64, rng: &mut Rng) -> Self {
		let r = P::Scalar::random(rng);
		let x = P::from_scalar(&r);
		let y = q.mul(&r);

		let e = challenge(q, a, b, &x, &y, sid, aux);
		let z = r + e.clone() * w;
		DhProof { e, z }
	}

	pub fn verify(&self, q: &P, a: &P, b: &P, sid: &[u8], aux: u64) -> Result<()> {
		// X = z G - e A, Y = z Q - e B
		let x = P::mul_add_vartime(&self.z, a, &(-self.e.clone()));
		let y = q.mul(&self.z) - b.mul(&self.e);

		let expected = challenge(q, a, b, &x, &y, sid, aux);
		ensure_crypto!(expected == self.e, "challenge mismatch");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::{p256, secp256k1};
	use rand::SeedableRng;

	fn round_trip<P: ECPoint>() {
		let mut rng = Rng::from_seed([100; 32]);
		let q = P::from_scalar(&P::Scalar::random(&mut rng));
		let w = P::Scalar::random(&mut rng);
		let a = P::from_scalar(&w);
		let b = q.mul(&w);

		let proof = DhProof::prove(&q, &a, &b, &w, b"sid", 3, &mut rng);
		proof.verify(&q, &a, &b, b"sid", 3).unwrap();

		assert!(proof.verify(&q, &a, &b, b"sid2", 3).is_err());
		assert!(proof.verify(&q, &a, &b, b"sid", 4).is_err());
		assert!(proof.verify(&q, &b, &a, b"sid", 3).is_err());

		// A non-DH tuple has no valid proof
		let c = b + P::generator();
		assert!(proof.verify(&q, &a, &c, b"sid", 3).is_err());
	}

	#[test]
	fn prove_and_verify() {
		round_trip::<secp256k1::Point>();
		round_trip::<p256::Point>();
	}
}
