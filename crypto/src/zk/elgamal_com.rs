//! Proofs about EC-ElGamal commitments: knowledge of an opening (UC),
//! plaintext equality with a public share, and commitment multiplication
//! with a public or private scalar.

use serde::{Deserialize, Serialize};

use crate::{
	curve::{scalar_from_ro, ECPoint, ECScalar},
	elgamal::ElgamalCom,
	error::{ensure_crypto, Result},
	hashing::ro::Ro,
	zk::{
		dh::DhProof,
		fischlin::{fischlin_prove, hash32, FischlinParams, FischlinProver},
		short_sigma, SEC_P_COM,
	},
	Rng,
};

pub const UC_ELGAMAL_COM_PARAMS: FischlinParams = FischlinParams::new(32, 4, 9);

/// UC proof of knowledge of (x, r) with (L, R) = (r G, x G + r Q).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UcElgamalComProof<P: ECPoint> {
	ab: Vec<ElgamalCom<P>>,
	e: Vec<u32>,
	z1: Vec<P::Scalar>,
	z2: Vec<P::Scalar>,
}

fn com_common_hash<P: ECPoint>(
	q: &P,
	uv: &ElgamalCom<P>,
	ab: &[ElgamalCom<P>],
	sid: &[u8],
	aux: u64,
) -> Vec<u8> {
	Ro::new()
		.feed(&P::generator())
		.feed(q)
		.feed(uv)
		.feed(ab)
		.feed(sid)
		.feed(&aux)
		.bits(2 * SEC_P_COM)
}

struct UcElgamalComProver<'a, P: ECPoint> {
	q: &'a P,
	uv: &'a ElgamalCom<P>,
	x: &'a P::Scalar,
	r: &'a P::Scalar,
	sid: &'a [u8],
	aux: u64,
	rng: &'a mut Rng,
	r1: Vec<P::Scalar>,
	r2: Vec<P::Scalar>,
	ab: Vec<ElgamalCom<P>>,
	e: Vec<u32>,
	z1: Vec<P::Scalar>,
	z2: Vec<P::Scalar>,
	z1_tag: P::Scalar,
	z2_tag: P::Scalar,
	common_hash: Vec<u8>,
}

impl<P: ECPoint> FischlinProver for UcElgamalComProver<'_, P> {
	fn initialize(&mut self) {
		let rho = UC_ELGAMAL_COM_PARAMS.rho;
		self.r1 = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		self.r2 = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		self.ab = self
			.r1
			.iter()
			.zip(&self.r2)
			.map(|(r1, r2)| ElgamalCom::commit(self.q, r1, r2))
			.collect();
		self.e = vec![0; rho];
		self.z1 = vec![P::Scalar::zero(); rho];
		self.z2 = vec![P::Scalar::zero(); rho];
		self.common_hash = com_common_hash(self.q, self.uv, &self.ab, self.sid, self.aux);
	}

	fn response_begin(&mut self, i: usize) {
		self.z1_tag = self.r1[i].clone();
		self.z2_tag = self.r2[i].clone();
	}

	fn hash(&mut self, i: usize, e: u32) -> u32 {
		hash32(
			&self.common_hash,
			i as u32,
			e as i32,
			&[&self.z1_tag.to_bytes(), &self.z2_tag.to_bytes()],
		)
	}

	fn save(&mut self, i: usize, e: u32) {
		self.e[i] = e;
		self.z1[i] = self.z1_tag.clone();
		self.z2[i] = self.z2_tag.clone();
	}

	fn response_next(&mut self, _next_e: u32) {
		self.z1_tag = self.z1_tag.clone() + self.x;
		self.z2_tag = self.z2_tag.clone() + self.r;
	}
}

impl<P: ECPoint> UcElgamalComProof<P> {
	pub fn prove(
		q: &P,
		uv: &ElgamalCom<P>,
		x: &P::Scalar,
		r: &P::Scalar,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let mut prover = UcElgamalComProver {
			q,
			uv,
			x,
			r,
			sid,
			aux,
			rng,
			r1: Vec::new(),
			r2: Vec::new(),
			ab: Vec::new(),
			e: Vec::new(),
			z1: Vec::new(),
			z2: Vec::new(),
			z1_tag: P::Scalar::zero(),
			z2_tag: P::Scalar::zero(),
			common_hash: Vec::new(),
		};
		fischlin_prove(&UC_ELGAMAL_COM_PARAMS, &mut prover);
		UcElgamalComProof { ab: prover.ab, e: prover.e, z1: prover.z1, z2: prover.z2 }
	}

	pub fn verify(
		&self,
		q: &P,
		uv: &ElgamalCom<P>,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Result<()> {
		let params = &UC_ELGAMAL_COM_PARAMS;
		let rho = params.rho;
		ensure_crypto!((params.b as usize) * rho >= SEC_P_COM, "parameters too weak");
		ensure_crypto!(self.ab.len() == rho, "wrong commitment count");
		ensure_crypto!(self.e.len() == rho, "wrong challenge count");
		ensure_crypto!(self.z1.len() == rho, "wrong response count");
		ensure_crypto!(self.z2.len() == rho, "wrong response count");

		let common_hash = com_common_hash(q, uv, &self.ab, sid, aux);
		let b_mask = params.b_mask();

		let mut z1_sum = P::Scalar::zero();
		let mut z2_sum = P::Scalar::zero();
		let mut e_sum = P::Scalar::zero();
		let mut a_sum = P::infinity();
		let mut b_sum = P::infinity();

		for i in 0..rho {
			ensure_crypto!(self.e[i] < params.e_max(), "challenge out of range");
			let sigma = short_sigma::<P>(rng);
			z1_sum = z1_sum + sigma.clone() * &self.z1[i];
			z2_sum = z2_sum + sigma.clone() * &self.z2[i];
			e_sum = e_sum + sigma.clone() * &P::Scalar::from(self.e[i]);
			a_sum = a_sum + self.ab[i].l.mul(&sigma);
			b_sum = b_sum + self.ab[i].r.mul(&sigma);

			let h = hash32(
				&common_hash,
				i as u32,
				self.e[i] as i32,
				&[&self.z1[i].to_bytes(), &self.z2[i].to_bytes()],
			);
			ensure_crypto!(h & b_mask == 0, "hash prefix not zero");
		}

		// A_sum == z2_sum G - e_sum L; B_sum == z2_sum Q + z1_sum G - e_sum R
		let a_expected = P::mul_add_vartime(&z2_sum, &uv.l, &(-e_sum.clone()));
		ensure_crypto!(a_sum == a_expected, "first component check failed");
		let b_expected = P::from_scalar(&z1_sum) + q.mul(&z2_sum) - uv.r.mul(&e_sum);
		ensure_crypto!(b_sum == b_expected, "second component check failed");
		Ok(())
	}
}

/// Proof that the plaintext of an ElGamal commitment equals the public
/// point A: reduces to a DH proof on (L, R - A).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ElgamalComPubShareEqualProof<P: ECPoint> {
	dh: DhProof<P>,
}

impl<P: ECPoint> ElgamalComPubShareEqualProof<P> {
	pub fn prove(
		q: &P,
		a: &P,
		com: &ElgamalCom<P>,
		r: &P::Scalar,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let r_minus_a = com.r - *a;
		ElgamalComPubShareEqualProof {
			dh: DhProof::prove(q, &com.l, &r_minus_a, r, sid, aux, rng),
		}
	}

	pub fn verify(&self, q: &P, a: &P, com: &ElgamalCom<P>, sid: &[u8], aux: u64) -> Result<()> {
		self.dh.verify(q, &com.l, &(com.r - *a), sid, aux)
	}
}

/// Proof that commitment C commits to a * b given commitments A (to a) and
/// B (to b), where the prover knows (b, r_B, r_C).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ElgamalComMultProof<P: ECPoint> {
	e: P::Scalar,
	z1: P::Scalar,
	z2: P::Scalar,
	z3: P::Scalar,
}

fn mult_challenge<P: ECPoint>(
	q: &P,
	r_com: &ElgamalCom<P>,
	a_tag: &ElgamalCom<P>,
	a: &ElgamalCom<P>,
	b: &ElgamalCom<P>,
	c: &ElgamalCom<P>,
	sid: &[u8],
	aux: u64,
) -> P::Scalar {
	scalar_from_ro::<P>(
		Ro::new()
			.feed(q)
			.feed(r_com)
			.feed(a_tag)
			.feed(a)
			.feed(b)
			.feed(c)
			.feed(sid)
			.feed(&aux),
	)
}

impl<P: ECPoint> ElgamalComMultProof<P> {
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		q: &P,
		a: &ElgamalCom<P>,
		b: &ElgamalCom<P>,
		c: &ElgamalCom<P>,
		r_b: &P::Scalar,
		r_c: &P::Scalar,
		b_scalar: &P::Scalar,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let r1 = P::Scalar::random(rng);
		let r2 = P::Scalar::random(rng);
		let r3 = P::Scalar::random(rng);

		let r_com = ElgamalCom::commit(q, &r1, &r2);
		let a_tag = a.mul_scalar(&r1).rerand(q, &r3);

		let e = mult_challenge(q, &r_com, &a_tag, a, b, c, sid, aux);
		let z1 = r1 + e.clone() * b_scalar;
		let z2 = r2 + e.clone() * r_b;
		let z3 = r3 + e.clone() * r_c;
		ElgamalComMultProof { e, z1, z2, z3 }
	}

	pub fn verify(
		&self,
		q: &P,
		a: &ElgamalCom<P>,
		b: &ElgamalCom<P>,
		c: &ElgamalCom<P>,
		sid: &[u8],
		aux: u64,
	) -> Result<()> {
		let r_com = ElgamalCom::commit(q, &self.z1, &self.z2) - b.mul_scalar(&self.e);
		let a_tag = a.mul_scalar(&self.z1).rerand(q, &self.z3) - c.mul_scalar(&self.e);
		let expected = mult_challenge(q, &r_com, &a_tag, a, b, c, sid, aux);
		ensure_crypto!(expected == self.e, "challenge mismatch");
		Ok(())
	}
}

/// UC variant of the multiplication proof where the prover knows the
/// scalar and C's randomness but not A's randomness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UcElgamalComMultPrivateScalarProof<P: ECPoint> {
	a1_tag: Vec<P>,
	a2_tag: Vec<P>,
	e: Vec<u32>,
	z1: Vec<P::Scalar>,
	z2: Vec<P::Scalar>,
}

fn mult_private_common_hash<P: ECPoint>(
	q: &P,
	a: &ElgamalCom<P>,
	b: &ElgamalCom<P>,
	a1_tag: &[P],
	a2_tag: &[P],
	sid: &[u8],
	aux: u64,
) -> Vec<u8> {
	Ro::new()
		.feed(q)
		.feed(a)
		.feed(b)
		.feed(a1_tag)
		.feed(a2_tag)
		.feed(sid)
		.feed(&aux)
		.bits(2 * SEC_P_COM)
}

struct MultPrivateScalarProver<'a, P: ECPoint> {
	q: &'a P,
	a: &'a ElgamalCom<P>,
	b: &'a ElgamalCom<P>,
	c_scalar: &'a P::Scalar,
	r: &'a P::Scalar,
	sid: &'a [u8],
	aux: u64,
	rng: &'a mut Rng,
	r1: Vec<P::Scalar>,
	r2: Vec<P::Scalar>,
	a1_tag: Vec<P>,
	a2_tag: Vec<P>,
	e: Vec<u32>,
	z1: Vec<P::Scalar>,
	z2: Vec<P::Scalar>,
	z1_tag: P::Scalar,
	z2_tag: P::Scalar,
	common_hash: Vec<u8>,
}

impl<P: ECPoint> FischlinProver for MultPrivateScalarProver<'_, P> {
	fn initialize(&mut self) {
		let rho = UC_ELGAMAL_COM_PARAMS.rho;
		self.r1 = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		self.r2 = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		// A1' = r1 A1 + r2 G; A2' = r1 A2 + r2 Q
		self.a1_tag = self
			.r1
			.iter()
			.zip(&self.r2)
			.map(|(r1, r2)| P::mul_add(r2, &self.a.l, r1))
			.collect();
		self.a2_tag = self
			.r1
			.iter()
			.zip(&self.r2)
			.map(|(r1, r2)| self.a.r.mul(r1) + self.q.mul(r2))
			.collect();
		self.e = vec![0; rho];
		self.z1 = vec![P::Scalar::zero(); rho];
		self.z2 = vec![P::Scalar::zero(); rho];
		self.common_hash = mult_private_common_hash(
			self.q,
			self.a,
			self.b,
			&self.a1_tag,
			&self.a2_tag,
			self.sid,
			self.aux,
		);
	}

	fn response_begin(&mut self, i: usize) {
		self.z1_tag = self.r1[i].clone();
		self.z2_tag = self.r2[i].clone();
	}

	fn hash(&mut self, i: usize, e: u32) -> u32 {
		hash32(
			&self.common_hash,
			i as u32,
			e as i32,
			&[&self.z1_tag.to_bytes(), &self.z2_tag.to_bytes()],
		)
	}

	fn save(&mut self, i: usize, e: u32) {
		self.e[i] = e;
		self.z1[i] = self.z1_tag.clone();
		self.z2[i] = self.z2_tag.clone();
	}

	fn response_next(&mut self, _next_e: u32) {
		self.z1_tag = self.z1_tag.clone() + self.c_scalar;
		self.z2_tag = self.z2_tag.clone() + self.r;
	}
}

impl<P: ECPoint> UcElgamalComMultPrivateScalarProof<P> {
	/// B must equal c * A rerandomised with r.
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		q: &P,
		a: &ElgamalCom<P>,
		b: &ElgamalCom<P>,
		r: &P::Scalar,
		c_scalar: &P::Scalar,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let mut prover = MultPrivateScalarProver {
			q,
			a,
			b,
			c_scalar,
			r,
			sid,
			aux,
			rng,
			r1: Vec::new(),
			r2: Vec::new(),
			a1_tag: Vec::new(),
			a2_tag: Vec::new(),
			e: Vec::new(),
			z1: Vec::new(),
			z2: Vec::new(),
			z1_tag: P::Scalar::zero(),
			z2_tag: P::Scalar::zero(),
			common_hash: Vec::new(),
		};
		fischlin_prove(&UC_ELGAMAL_COM_PARAMS, &mut prover);
		UcElgamalComMultPrivateScalarProof {
			a1_tag: prover.a1_tag,
			a2_tag: prover.a2_tag,
			e: prover.e,
			z1: prover.z1,
			z2: prover.z2,
		}
	}

	pub fn verify(
		&self,
		q: &P,
		a: &ElgamalCom<P>,
		b: &ElgamalCom<P>,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Result<()> {
		let params = &UC_ELGAMAL_COM_PARAMS;
		let rho = params.rho;
		ensure_crypto!((params.b as usize) * rho >= SEC_P_COM, "parameters too weak");
		ensure_crypto!(self.a1_tag.len() == rho, "wrong commitment count");
		ensure_crypto!(self.a2_tag.len() == rho, "wrong commitment count");
		ensure_crypto!(self.e.len() == rho, "wrong challenge count");
		ensure_crypto!(self.z1.len() == rho, "wrong response count");
		ensure_crypto!(self.z2.len() == rho, "wrong response count");

		let common_hash =
			mult_private_common_hash(q, a, b, &self.a1_tag, &self.a2_tag, sid, aux);
		let b_mask = params.b_mask();

		let mut z1_sum = P::Scalar::zero();
		let mut z2_sum = P::Scalar::zero();
		let mut e_sum = P::Scalar::zero();
		let mut a1_sum = P::infinity();
		let mut a2_sum = P::infinity();

		for i in 0..rho {
			ensure_crypto!(self.e[i] < params.e_max(), "challenge out of range");
			let sigma = short_sigma::<P>(rng);
			z1_sum = z1_sum + sigma.clone() * &self.z1[i];
			z2_sum = z2_sum + sigma.clone() * &self.z2[i];
			e_sum = e_sum + sigma.clone() * &P::Scalar::from(self.e[i]);
			a1_sum = a1_sum + self.a1_tag[i].mul(&sigma);
			a2_sum = a2_sum + self.a2_tag[i].mul(&sigma);

			let h = hash32(
				&common_hash,
				i as u32,
				self.e[i] as i32,
				&[&self.z1[i].to_bytes(), &self.z2[i].to_bytes()],
			);
			ensure_crypto!(h & b_mask == 0, "hash prefix not zero");
		}

		// A1_sum == z1_sum A1 + z2_sum G - e_sum B1
		let a1_expected =
			a.l.mul(&z1_sum) + P::from_scalar(&z2_sum) - b.l.mul(&e_sum);
		ensure_crypto!(a1_sum == a1_expected, "first component check failed");
		// A2_sum == z1_sum A2 + z2_sum Q - e_sum B2
		let a2_expected = a.r.mul(&z1_sum) + q.mul(&z2_sum) - b.r.mul(&e_sum);
		ensure_crypto!(a2_sum == a2_expected, "second component check failed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::secp256k1::Point;
	use rand::SeedableRng;

	type Scalar = <Point as ECPoint>::Scalar;
	type Com = ElgamalCom<Point>;

	#[test]
	fn uc_opening_proof() {
		let mut rng = Rng::from_seed([110; 32]);
		let (q, _) = Com::local_keygen(&mut rng);
		let x = Scalar::random(&mut rng);
		let (uv, r) = Com::random_commit(&q, &x, &mut rng);

		let proof = UcElgamalComProof::prove(&q, &uv, &x, &r, b"sid", 0, &mut rng);
		proof.verify(&q, &uv, b"sid", 0, &mut rng).unwrap();
		assert!(proof.verify(&q, &uv, b"sid2", 0, &mut rng).is_err());

		let (other, _) = Com::random_commit(&q, &Scalar::random(&mut rng), &mut rng);
		assert!(proof.verify(&q, &other, b"sid", 0, &mut rng).is_err());

		let mut bad = proof;
		bad.z1[0] = bad.z1[0].clone() + Scalar::from(1);
		assert!(bad.verify(&q, &uv, b"sid", 0, &mut rng).is_err());
	}

	#[test]
	fn pub_share_equality_proof() {
		let mut rng = Rng::from_seed([111; 32]);
		let (q, _) = Com::local_keygen(&mut rng);
		let m = Scalar::random(&mut rng);
		let a = Point::from_scalar(&m);
		let (com, r) = Com::random_commit(&q, &m, &mut rng);

		let proof = ElgamalComPubShareEqualProof::prove(&q, &a, &com, &r, b"sid", 5, &mut rng);
		proof.verify(&q, &a, &com, b"sid", 5).unwrap();

		// A commitment to a different value fails against the same A
		let (wrong, r2) =
			Com::random_commit(&q, &Scalar::random(&mut rng), &mut rng);
		let bad_proof =
			ElgamalComPubShareEqualProof::prove(&q, &a, &wrong, &r2, b"sid", 5, &mut rng);
		assert!(bad_proof.verify(&q, &a, &wrong, b"sid", 5).is_err());
	}

	#[test]
	fn multiplication_proof() {
		let mut rng = Rng::from_seed([112; 32]);
		let (q, _) = Com::local_keygen(&mut rng);

		let a_scalar = Scalar::random(&mut rng);
		let b_scalar = Scalar::random(&mut rng);
		let (a, _) = Com::random_commit(&q, &a_scalar, &mut rng);
		let (b, r_b) = Com::random_commit(&q, &b_scalar, &mut rng);

		// C = b * A, rerandomised
		let r_c = Scalar::random(&mut rng);
		let c = a.mul_scalar(&b_scalar).rerand(&q, &r_c);

		let proof =
			ElgamalComMultProof::prove(&q, &a, &b, &c, &r_b, &r_c, &b_scalar, b"sid", 0, &mut rng);
		proof.verify(&q, &a, &b, &c, b"sid", 0).unwrap();

		// C that does not commit to a*b fails
		let bad_c = c.add_scalar(&Scalar::from(1));
		assert!(proof.verify(&q, &a, &b, &bad_c, b"sid", 0).is_err());
	}

	#[test]
	fn multiplication_with_private_scalar() {
		let mut rng = Rng::from_seed([113; 32]);
		let (q, _) = Com::local_keygen(&mut rng);

		let a_scalar = Scalar::random(&mut rng);
		let (a, _) = Com::random_commit(&q, &a_scalar, &mut rng);

		let c_scalar = Scalar::random(&mut rng);
		let r = Scalar::random(&mut rng);
		let b = a.mul_scalar(&c_scalar).rerand(&q, &r);

		let proof = UcElgamalComMultPrivateScalarProof::prove(
			&q, &a, &b, &r, &c_scalar, b"sid", 0, &mut rng,
		);
		proof.verify(&q, &a, &b, b"sid", 0, &mut rng).unwrap();

		let bad_b = b.add_scalar(&Scalar::from(1));
		assert!(proof.verify(&q, &a, &bad_b, b"sid", 0, &mut rng).is_err());
	}
}
