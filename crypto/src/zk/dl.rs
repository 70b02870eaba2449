//! UC-secure proof of knowledge of a discrete log (Fischlin transform).

use serde::{Deserialize, Serialize};

use crate::{
	curve::{ECPoint, ECScalar},
	error::{ensure_crypto, Result},
	hashing::ro::Ro,
	zk::{
		fischlin::{fischlin_prove, hash32, FischlinParams, FischlinProver},
		short_sigma, SEC_P_COM,
	},
	Rng,
};

pub const UC_DL_PARAMS: FischlinParams = FischlinParams::new(32, 4, 9);

/// Proof of knowledge of w with Q = w * G.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UcDlProof<P: ECPoint> {
	a: Vec<P>,
	e: Vec<u32>,
	z: Vec<P::Scalar>,
}

fn common_hash<P: ECPoint>(q: &P, a: &[P], sid: &[u8], aux: u64) -> Vec<u8> {
	Ro::new()
		.feed(&P::generator())
		.feed(q)
		.feed(a)
		.feed(sid)
		.feed(&aux)
		.bits(2 * SEC_P_COM)
}

struct DlProver<'a, P: ECPoint> {
	q: &'a P,
	w: &'a P::Scalar,
	sid: &'a [u8],
	aux: u64,
	rng: &'a mut Rng,
	r: Vec<P::Scalar>,
	a: Vec<P>,
	e: Vec<u32>,
	z: Vec<P::Scalar>,
	z_tag: P::Scalar,
	common_hash: Vec<u8>,
}

impl<P: ECPoint> FischlinProver for DlProver<'_, P> {
	fn initialize(&mut self) {
		let rho = UC_DL_PARAMS.rho;
		self.r = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		self.a = self.r.iter().map(|r| P::from_scalar(r)).collect();
		self.e = vec![0; rho];
		self.z = vec![P::Scalar::zero(); rho];
		self.common_hash = common_hash(self.q, &self.a, self.sid, self.aux);
	}

	fn response_begin(&mut self, i: usize) {
		self.z_tag = self.r[i].clone();
	}

	fn hash(&mut self, i: usize, e: u32) -> u32 {
		hash32(&self.common_hash, i as u32, e as i32, &[&self.z_tag.to_bytes()])
	}

	fn save(&mut self, i: usize, e: u32) {
		self.e[i] = e;
		self.z[i] = self.z_tag.clone();
	}

	fn response_next(&mut self, _next_e: u32) {
		// z' for the next challenge adds the witness once more
		self.z_tag = self.z_tag.clone() + self.w;
	}
}

impl<P: ECPoint> UcDlProof<P> {
	pub fn prove(q: &P, w: &P::Scalar, sid: &[u8], aux: u64, rng: &mut Rng) -> Self {
		let mut prover = DlProver {
			q,
			w,
			sid,
			aux,
			rng,
			r: Vec::new(),
			a: Vec::new(),
			e: Vec::new(),
			z: Vec::new(),
			z_tag: P::Scalar::zero(),
			common_hash: Vec::new(),
		};
		fischlin_prove(&UC_DL_PARAMS, &mut prover);
		UcDlProof { a: prover.a, e: prover.e, z: prover.z }
	}

	/// Verification checks every repetition's zero hash prefix and one
	/// batched linear relation with verifier-chosen short scalars:
	/// sum sigma_i A_i == (sum sigma_i z_i) G - (sum sigma_i e_i) Q.
	pub fn verify(&self, q: &P, sid: &[u8], aux: u64, rng: &mut Rng) -> Result<()> {
		let params = &UC_DL_PARAMS;
		let rho = params.rho;
		ensure_crypto!((params.b as usize) * rho >= SEC_P_COM, "parameters too weak");
		ensure_crypto!(self.a.len() == rho, "wrong commitment count");
		ensure_crypto!(self.e.len() == rho, "wrong challenge count");
		ensure_crypto!(self.z.len() == rho, "wrong response count");

		let common_hash = common_hash(q, &self.a, sid, aux);
		let b_mask = params.b_mask();

		let mut z_sum = P::Scalar::zero();
		let mut e_sum = P::Scalar::zero();
		let mut a_sum = P::infinity();

		for i in 0..rho {
			ensure_crypto!(self.e[i] < params.e_max(), "challenge out of range");

			let sigma = short_sigma::<P>(rng);
			z_sum = z_sum + sigma.clone() * &self.z[i];
			e_sum = e_sum + sigma.clone() * &P::Scalar::from(self.e[i]);
			a_sum = a_sum + self.a[i].mul(&sigma);

			let h = hash32(&common_hash, i as u32, self.e[i] as i32, &[&self.z[i].to_bytes()]);
			ensure_crypto!(h & b_mask == 0, "hash prefix not zero");
		}

		// A_sum == z_sum * G - e_sum * Q
		let expected = P::mul_add_vartime(&z_sum, q, &(-e_sum));
		ensure_crypto!(a_sum == expected, "batched linear relation failed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::{ed25519, secp256k1};
	use rand::SeedableRng;

	fn round_trip<P: ECPoint>() {
		let mut rng = Rng::from_seed([80; 32]);
		let w = P::Scalar::random(&mut rng);
		let q = P::from_scalar(&w);

		let proof = UcDlProof::prove(&q, &w, b"sid", 1, &mut rng);
		proof.verify(&q, b"sid", 1, &mut rng).unwrap();

		// Binding: session id and aux must match
		assert!(proof.verify(&q, b"other sid", 1, &mut rng).is_err());
		assert!(proof.verify(&q, b"sid", 2, &mut rng).is_err());

		// Wrong statement
		let other = P::from_scalar(&P::Scalar::random(&mut rng));
		assert!(proof.verify(&other, b"sid", 1, &mut rng).is_err());
	}

	#[test]
	fn prove_and_verify() {
		round_trip::<secp256k1::Point>();
		round_trip::<ed25519::Point>();
	}

	#[test]
	fn mutated_proofs_fail() {
		let mut rng = Rng::from_seed([81; 32]);
		type P = secp256k1::Point;
		type S = <P as ECPoint>::Scalar;

		let w = S::random(&mut rng);
		let q = P::from_scalar(&w);
		let proof = UcDlProof::prove(&q, &w, b"sid", 0, &mut rng);

		// Tamper with a commitment
		let mut bad = proof.clone();
		bad.a[0] = bad.a[0] + P::generator();
		assert!(bad.verify(&q, b"sid", 0, &mut rng).is_err());

		// Tamper with a challenge
		let mut bad = proof.clone();
		bad.e[3] ^= 1;
		assert!(bad.verify(&q, b"sid", 0, &mut rng).is_err());

		// Tamper with a response
		let mut bad = proof.clone();
		bad.z[7] = bad.z[7].clone() + S::from(1);
		assert!(bad.verify(&q, b"sid", 0, &mut rng).is_err());

		// Truncated proof
		let mut bad = proof;
		bad.z.pop();
		assert!(bad.verify(&q, b"sid", 0, &mut rng).is_err());
	}
}
