//! Proof of knowledge of a discrete log in a group of unknown order:
//! given a, b and an RSA-style modulus N, prove knowledge of a bounded w
//! with b = a^w mod N. Challenges are single bits, repeated to the
//! computational security level, because large challenges are not sound
//! without knowing the group order.

use num_bigint::{BigUint, RandBigInt};
use serde::{Deserialize, Serialize};

use crate::{
	arith::Modulus,
	error::{ensure_crypto, Result},
	hashing::ro::{bit_of, Ro},
	zk::{SEC_P_COM, SEC_P_STAT},
	Rng,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnknownOrderDlProof {
	e: Vec<u8>,
	z: Vec<BigUint>,
}

fn challenge_bits(
	a: &BigUint,
	b: &BigUint,
	n: &Modulus,
	l: u32,
	r: &[BigUint],
	sid: &[u8],
	aux: u64,
) -> Vec<u8> {
	Ro::new()
		.feed(a)
		.feed(b)
		.feed(n.value())
		.feed(&l)
		.feed(r)
		.feed(sid)
		.feed(&aux)
		.bits(SEC_P_COM)
}

impl UnknownOrderDlProof {
	/// `l` bounds the witness bit length; responses mask it with the
	/// statistical margin.
	pub fn prove(
		a: &BigUint,
		b: &BigUint,
		n: &Modulus,
		l: u32,
		w: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		assert!(w.bits() <= l as u64, "witness exceeds the stated bound");
		let gcd_test = n.mul_vartime(a, b);
		assert!(n.coprime_vartime(&gcd_test), "inputs share a factor with N");

		let r_size = l as u64 + SEC_P_STAT as u64 + 1;
		let mut z: Vec<BigUint> =
			(0..SEC_P_COM).map(|_| rng.gen_biguint(r_size)).collect();
		let r: Vec<BigUint> =
			z.iter().map(|zi| n.pow(&n.reduce_vartime(a), zi)).collect();

		let e = challenge_bits(a, b, n, l, &r, sid, aux);

		for (i, zi) in z.iter_mut().enumerate() {
			if bit_of(&e, i) {
				*zi += w;
			}
		}

		UnknownOrderDlProof { e, z }
	}

	pub fn verify(
		&self,
		a: &BigUint,
		b: &BigUint,
		n: &Modulus,
		l: u32,
		sid: &[u8],
		aux: u64,
	) -> Result<()> {
		ensure_crypto!(self.z.len() == SEC_P_COM, "wrong response count");
		ensure_crypto!(self.e.len() == SEC_P_COM / 8, "wrong challenge size");

		let b_inv = n.inv_vartime(b)?;
		let a_reduced = n.reduce_vartime(a);
		let mut r_product = n.mul_vartime(a, b);

		let r: Vec<BigUint> = self
			.z
			.iter()
			.enumerate()
			.map(|(i, zi)| {
				let mut ri = n.pow_vartime(&a_reduced, zi);
				if bit_of(&self.e, i) {
					ri = n.mul_vartime(&ri, &b_inv);
				}
				r_product = n.mul_vartime(&r_product, &ri);
				ri
			})
			.collect();

		let expected = challenge_bits(a, b, n, l, &r, sid, aux);
		ensure_crypto!(expected == self.e, "challenge mismatch");
		ensure_crypto!(n.coprime_vartime(&r_product), "product shares a factor with N");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::arith::prime;
	use rand::SeedableRng;

	#[test]
	fn prove_and_verify() {
		let mut rng = Rng::from_seed([120; 32]);
		let p = prime::generate_prime(128, &mut rng);
		let q = prime::generate_prime(128, &mut rng);
		let n = Modulus::new_dense(&p * &q).unwrap();

		let a = n.rand(&mut rng);
		let l = 64;
		let w = rng.gen_biguint(l as u64);
		let b = n.pow_vartime(&a, &w);

		let proof = UnknownOrderDlProof::prove(&a, &b, &n, l, &w, b"sid", 9, &mut rng);
		proof.verify(&a, &b, &n, l, b"sid", 9).unwrap();

		assert!(proof.verify(&a, &b, &n, l, b"sid2", 9).is_err());
		assert!(proof.verify(&a, &b, &n, l, b"sid", 10).is_err());
		assert!(proof.verify(&b, &a, &n, l, b"sid", 9).is_err());

		let mut bad = proof;
		bad.z[0] += 1u32;
		assert!(bad.verify(&a, &b, &n, l, b"sid", 9).is_err());
	}
}
