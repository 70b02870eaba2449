//! Sigma protocols about Paillier ciphertexts: key validity, zero
//! encryption, plaintext equality across keys and with Pedersen
//! commitments, range with statistical slack, and the encrypted discrete
//! log (PDL).
//!
//! Integer responses mask the witness with a 2^64 statistical margin on
//! top of the 2^128 challenge space; verifiers enforce the resulting
//! response band, which is where the range slack comes from.

use num_bigint::{BigUint, RandBigInt};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{
	arith::{prime, Modulus},
	curve::{ECPoint, ECScalar},
	error::{ensure_crypto, Result},
	hashing::ro::Ro,
	paillier::{PaillierPrivateKey, PaillierPublicKey},
	zk::{pedersen::pedersen_h, CheckStatus, SEC_P_COM, SEC_P_STAT},
	Rng,
};

/// Rounds for the key-validity proof. The worst cheating probability per
/// round is 1/3 (a gcd-3 defect), so 80 rounds give the computational
/// security level.
const VALID_KEY_ROUNDS: usize = 80;

/// Small-factor bound for the local key checks.
const SMALL_FACTOR_BOUND: u32 = 1000;

/// Local checks on a Paillier public key, run by verifiers whose
/// composition label says the key is still unverified. The full
/// well-formedness argument is [`ValidPaillierProof`].
pub fn check_paillier_key(pk: &PaillierPublicKey, status: CheckStatus) -> Result<()> {
	if !status.needs_check() {
		return Ok(())
	}
	ensure_crypto!(
		!prime::has_small_factor(pk.n(), SMALL_FACTOR_BOUND),
		"paillier modulus has a small factor"
	);
	Ok(())
}

fn challenge_number(ro: Ro) -> BigUint {
	BigUint::from_bytes_be(&ro.bits(SEC_P_COM))
}

/// The masked-response band: alpha is drawn below q << (128 + 64), so a
/// valid response stays below q << (128 + 64 + 1).
fn mask_bound(q: &Modulus) -> BigUint {
	q.value() << (SEC_P_COM + SEC_P_STAT)
}

fn response_bound(q: &Modulus) -> BigUint {
	q.value() << (SEC_P_COM + SEC_P_STAT + 1)
}

// ---- key validity ----

/// Proof that N is a well-formed Paillier modulus: gcd(N, φ(N)) = 1,
/// shown by extracting N-th roots of oracle-derived challenges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidPaillierProof {
	sigma: Vec<BigUint>,
}

fn valid_key_challenge(pk: &PaillierPublicKey, sid: &[u8], aux: u64, i: u32) -> BigUint {
	Ro::new()
		.feed("paillier-valid-key")
		.feed(pk.n())
		.feed(sid)
		.feed(&aux)
		.feed(&i)
		.number_mod(pk.modulus())
}

impl ValidPaillierProof {
	pub fn prove(key: &PaillierPrivateKey, sid: &[u8], aux: u64) -> Self {
		let pk = key.public();
		let sigma = (0..VALID_KEY_ROUNDS)
			.map(|i| {
				let rho = valid_key_challenge(pk, sid, aux, i as u32);
				pk.modulus().pow(&rho, key.n_inv_mod_phi())
			})
			.collect();
		ValidPaillierProof { sigma }
	}

	pub fn verify(&self, pk: &PaillierPublicKey, sid: &[u8], aux: u64, rng: &mut Rng) -> Result<()> {
		ensure_crypto!(self.sigma.len() == VALID_KEY_ROUNDS, "wrong round count");
		ensure_crypto!(
			!prime::has_small_factor(pk.n(), SMALL_FACTOR_BOUND),
			"paillier modulus has a small factor"
		);
		ensure_crypto!(!prime::is_prime(pk.n(), rng), "paillier modulus is prime");

		for (i, sigma) in self.sigma.iter().enumerate() {
			ensure_crypto!(sigma < pk.n(), "root out of range");
			let rho = valid_key_challenge(pk, sid, aux, i as u32);
			let reconstructed = pk.modulus().pow_vartime(sigma, pk.n());
			ensure_crypto!(reconstructed == rho, "n-th root check failed");
		}
		Ok(())
	}
}

// ---- zero encryption ----

/// Proof that a ciphertext encrypts zero, i.e. is an N-th power mod N².
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaillierZeroProof {
	a: BigUint,
	z: BigUint,
}

fn zero_challenge(pk: &PaillierPublicKey, c: &BigUint, a: &BigUint, sid: &[u8], aux: u64) -> BigUint {
	challenge_number(
		Ro::new().feed("paillier-zero").feed(pk.n()).feed(c).feed(a).feed(sid).feed(&aux),
	)
}

impl PaillierZeroProof {
	/// `r` is the encryption randomness: c = r^N mod N².
	pub fn prove(
		pk: &PaillierPublicKey,
		c: &BigUint,
		r: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let rho = pk.modulus().rand(rng);
		let a = pk.encrypt_with_randomness(&BigUint::default(), &rho);
		let e = zero_challenge(pk, c, &a, sid, aux);
		let z = pk.modulus().mul(&rho, &pk.modulus().pow(&pk.modulus().reduce(r), &e));
		PaillierZeroProof { a, z }
	}

	pub fn verify(
		&self,
		pk: &PaillierPublicKey,
		c: &BigUint,
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		check_paillier_key(pk, key_status)?;
		pk.verify_cipher(c)?;
		pk.verify_cipher(&self.a)?;
		ensure_crypto!(!self.z.is_zero() && &self.z < pk.n(), "response out of range");

		let e = zero_challenge(pk, c, &self.a, sid, aux);
		let nn = pk.modulus_squared();
		let lhs = nn.pow_vartime(&self.z, pk.n());
		let rhs = nn.mul_vartime(&self.a, &nn.pow_vartime(c, &e));
		ensure_crypto!(lhs == rhs, "n-th power relation failed");
		Ok(())
	}
}

// ---- plaintext equality across two keys ----

/// Proof that two ciphertexts under different Paillier keys encrypt the
/// same value x < q (up to the statistical slack of the masked response).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TwoPaillierEqualProof {
	d1: BigUint,
	d2: BigUint,
	z: BigUint,
	w1: BigUint,
	w2: BigUint,
}

#[allow(clippy::too_many_arguments)]
fn two_equal_challenge(
	q: &Modulus,
	pk1: &PaillierPublicKey,
	pk2: &PaillierPublicKey,
	c1: &BigUint,
	c2: &BigUint,
	d1: &BigUint,
	d2: &BigUint,
	sid: &[u8],
	aux: u64,
) -> BigUint {
	challenge_number(
		Ro::new()
			.feed("two-paillier-equal")
			.feed(q.value())
			.feed(pk1.n())
			.feed(pk2.n())
			.feed(c1)
			.feed(c2)
			.feed(d1)
			.feed(d2)
			.feed(sid)
			.feed(&aux),
	)
}

impl TwoPaillierEqualProof {
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		q: &Modulus,
		pk1: &PaillierPublicKey,
		c1: &BigUint,
		r1: &BigUint,
		pk2: &PaillierPublicKey,
		c2: &BigUint,
		r2: &BigUint,
		x: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		assert!(x < q.value(), "witness exceeds the stated range");
		assert!(&response_bound(q) < pk1.n(), "paillier modulus too small for the range");
		assert!(&response_bound(q) < pk2.n(), "paillier modulus too small for the range");

		let alpha = rng.gen_biguint_below(&mask_bound(q));
		let rho1 = pk1.modulus().rand(rng);
		let rho2 = pk2.modulus().rand(rng);
		let d1 = pk1.encrypt_with_randomness(&alpha, &rho1);
		let d2 = pk2.encrypt_with_randomness(&alpha, &rho2);

		let e = two_equal_challenge(q, pk1, pk2, c1, c2, &d1, &d2, sid, aux);

		let z = alpha + &e * x;
		let n1 = pk1.modulus();
		let n2 = pk2.modulus();
		let w1 = n1.mul(&rho1, &n1.pow(&n1.reduce(r1), &e));
		let w2 = n2.mul(&rho2, &n2.pow(&n2.reduce(r2), &e));
		TwoPaillierEqualProof { d1, d2, z, w1, w2 }
	}

	#[allow(clippy::too_many_arguments)]
	pub fn verify(
		&self,
		q: &Modulus,
		pk1: &PaillierPublicKey,
		c1: &BigUint,
		pk2: &PaillierPublicKey,
		c2: &BigUint,
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		check_paillier_key(pk1, key_status)?;
		check_paillier_key(pk2, key_status)?;
		pk1.batch_verify_ciphers(&[c1.clone(), self.d1.clone()])?;
		pk2.batch_verify_ciphers(&[c2.clone(), self.d2.clone()])?;
		ensure_crypto!(self.z < response_bound(q), "response out of range");

		let e = two_equal_challenge(q, pk1, pk2, c1, c2, &self.d1, &self.d2, sid, aux);

		for (pk, c, d, w) in [
			(pk1, c1, &self.d1, &self.w1),
			(pk2, c2, &self.d2, &self.w2),
		] {
			let nn = pk.modulus_squared();
			let lhs = pk.reencrypt_vartime(&self.z, w)?;
			let rhs = nn.mul_vartime(d, &nn.pow_vartime(c, &e));
			ensure_crypto!(lhs == rhs, "equality relation failed");
		}
		Ok(())
	}
}

/// Batch variant: one challenge covers a vector of ciphertext pairs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TwoPaillierEqualBatchProof {
	proofs: Vec<TwoPaillierEqualProof>,
}

impl TwoPaillierEqualBatchProof {
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		q: &Modulus,
		pk1: &PaillierPublicKey,
		c1: &[BigUint],
		r1: &[BigUint],
		pk2: &PaillierPublicKey,
		c2: &[BigUint],
		r2: &[BigUint],
		x: &[BigUint],
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		assert!(
			c1.len() == x.len() && c2.len() == x.len() && r1.len() == x.len() && r2.len() == x.len(),
			"vector length mismatch"
		);
		// The per-index aux extension keeps the transcripts disjoint
		let proofs = (0..x.len())
			.map(|j| {
				TwoPaillierEqualProof::prove(
					q,
					pk1,
					&c1[j],
					&r1[j],
					pk2,
					&c2[j],
					&r2[j],
					&x[j],
					sid,
					aux.wrapping_add(j as u64),
					rng,
				)
			})
			.collect();
		TwoPaillierEqualBatchProof { proofs }
	}

	#[allow(clippy::too_many_arguments)]
	pub fn verify(
		&self,
		q: &Modulus,
		pk1: &PaillierPublicKey,
		c1: &[BigUint],
		pk2: &PaillierPublicKey,
		c2: &[BigUint],
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		ensure_crypto!(self.proofs.len() == c1.len(), "wrong proof count");
		ensure_crypto!(c1.len() == c2.len(), "vector length mismatch");
		check_paillier_key(pk1, key_status)?;
		check_paillier_key(pk2, key_status)?;
		for (j, proof) in self.proofs.iter().enumerate() {
			proof.verify(
				q,
				pk1,
				&c1[j],
				pk2,
				&c2[j],
				sid,
				aux.wrapping_add(j as u64),
				CheckStatus::Verified,
			)?;
		}
		Ok(())
	}
}

// ---- equality with a Pedersen commitment ----

/// Proof that a Paillier ciphertext and an EC Pedersen commitment share
/// their plaintext modulo the curve order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PaillierPedersenEqualProof<P: ECPoint> {
	d: BigUint,
	a: P,
	z: BigUint,
	w: BigUint,
	z_rho: P::Scalar,
}

fn pedersen_equal_challenge<P: ECPoint>(
	pk: &PaillierPublicKey,
	c: &BigUint,
	t: &P,
	d: &BigUint,
	a: &P,
	sid: &[u8],
	aux: u64,
) -> BigUint {
	challenge_number(
		Ro::new()
			.feed("paillier-pedersen-equal")
			.feed(pk.n())
			.feed(c)
			.feed(t)
			.feed(d)
			.feed(a)
			.feed(sid)
			.feed(&aux),
	)
}

impl<P: ECPoint> PaillierPedersenEqualProof<P> {
	/// c = Enc(x, r), t = x G + rho H with x < q.
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		pk: &PaillierPublicKey,
		c: &BigUint,
		r: &BigUint,
		t: &P,
		rho: &P::Scalar,
		x: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let q = P::order();
		assert!(x < q.value(), "witness exceeds the curve order");
		assert!(&response_bound(q) < pk.n(), "paillier modulus too small for the range");

		let h = pedersen_h::<P>();
		let alpha = rng.gen_biguint_below(&mask_bound(q));
		let ra = pk.modulus().rand(rng);
		let rho_a = P::Scalar::random(rng);

		let d = pk.encrypt_with_randomness(&alpha, &ra);
		let a = P::mul_add(&P::Scalar::from_biguint_mod_order(&alpha), &h, &rho_a);

		let e = pedersen_equal_challenge(pk, c, t, &d, &a, sid, aux);
		let e_scalar = P::Scalar::from_biguint_mod_order(&e);

		let z = alpha + &e * x;
		let n = pk.modulus();
		let w = n.mul(&ra, &n.pow(&n.reduce(r), &e));
		let z_rho = rho_a + e_scalar * rho;
		PaillierPedersenEqualProof { d, a, z, w, z_rho }
	}

	pub fn verify(
		&self,
		pk: &PaillierPublicKey,
		c: &BigUint,
		t: &P,
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		let q = P::order();
		check_paillier_key(pk, key_status)?;
		pk.batch_verify_ciphers(&[c.clone(), self.d.clone()])?;
		ensure_crypto!(self.z < response_bound(q), "response out of range");

		let e = pedersen_equal_challenge(pk, c, t, &self.d, &self.a, sid, aux);
		let e_scalar = P::Scalar::from_biguint_mod_order(&e);

		let nn = pk.modulus_squared();
		let lhs = pk.reencrypt_vartime(&self.z, &self.w)?;
		let rhs = nn.mul_vartime(&self.d, &nn.pow_vartime(c, &e));
		ensure_crypto!(lhs == rhs, "paillier relation failed");

		let h = pedersen_h::<P>();
		let lhs = P::mul_add(&P::Scalar::from_biguint_mod_order(&self.z), &h, &self.z_rho);
		let rhs = self.a + t.mul(&e_scalar);
		ensure_crypto!(lhs == rhs, "pedersen relation failed");
		Ok(())
	}
}

// ---- range with slack ----

/// Proof that the plaintext of a Paillier ciphertext lies in [0, q), up
/// to the 2^(128+64+1) expansion slack of the masked response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaillierRangeExpSlackProof {
	d: BigUint,
	z: BigUint,
	w: BigUint,
}

fn range_challenge(
	q: &Modulus,
	pk: &PaillierPublicKey,
	c: &BigUint,
	d: &BigUint,
	sid: &[u8],
	aux: u64,
) -> BigUint {
	challenge_number(
		Ro::new()
			.feed("paillier-range-exp-slack")
			.feed(q.value())
			.feed(pk.n())
			.feed(c)
			.feed(d)
			.feed(sid)
			.feed(&aux),
	)
}

impl PaillierRangeExpSlackProof {
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		q: &Modulus,
		pk: &PaillierPublicKey,
		c: &BigUint,
		r: &BigUint,
		x: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		assert!(x < q.value(), "witness exceeds the stated range");
		assert!(&response_bound(q) < pk.n(), "paillier modulus too small for the range");

		let alpha = rng.gen_biguint_below(&mask_bound(q));
		let ra = pk.modulus().rand(rng);
		let d = pk.encrypt_with_randomness(&alpha, &ra);

		let e = range_challenge(q, pk, c, &d, sid, aux);
		let z = alpha + &e * x;
		let n = pk.modulus();
		let w = n.mul(&ra, &n.pow(&n.reduce(r), &e));
		PaillierRangeExpSlackProof { d, z, w }
	}

	pub fn verify(
		&self,
		q: &Modulus,
		pk: &PaillierPublicKey,
		c: &BigUint,
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		check_paillier_key(pk, key_status)?;
		pk.batch_verify_ciphers(&[c.clone(), self.d.clone()])?;
		ensure_crypto!(self.z < response_bound(q), "response out of range");

		let e = range_challenge(q, pk, c, &self.d, sid, aux);
		let nn = pk.modulus_squared();
		let lhs = pk.reencrypt_vartime(&self.z, &self.w)?;
		let rhs = nn.mul_vartime(&self.d, &nn.pow_vartime(c, &e));
		ensure_crypto!(lhs == rhs, "range relation failed");
		Ok(())
	}
}

// ---- encrypted discrete log ----

/// Proof that a Paillier ciphertext encrypts the discrete log of a public
/// curve point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PdlProof<P: ECPoint> {
	d: BigUint,
	a: P,
	z: BigUint,
	w: BigUint,
}

fn pdl_challenge<P: ECPoint>(
	pk: &PaillierPublicKey,
	c: &BigUint,
	q1: &P,
	d: &BigUint,
	a: &P,
	sid: &[u8],
	aux: u64,
) -> BigUint {
	challenge_number(
		Ro::new()
			.feed("paillier-dl")
			.feed(pk.n())
			.feed(c)
			.feed(q1)
			.feed(d)
			.feed(a)
			.feed(sid)
			.feed(&aux),
	)
}

impl<P: ECPoint> PdlProof<P> {
	/// c = Enc(x, r), q1 = x G with x < q.
	#[allow(clippy::too_many_arguments)]
	pub fn prove(
		pk: &PaillierPublicKey,
		c: &BigUint,
		r: &BigUint,
		q1: &P,
		x: &BigUint,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let q = P::order();
		assert!(x < q.value(), "witness exceeds the curve order");
		assert!(&response_bound(q) < pk.n(), "paillier modulus too small for the range");

		let alpha = rng.gen_biguint_below(&mask_bound(q));
		let ra = pk.modulus().rand(rng);
		let d = pk.encrypt_with_randomness(&alpha, &ra);
		let a = P::from_scalar(&P::Scalar::from_biguint_mod_order(&alpha));

		let e = pdl_challenge(pk, c, q1, &d, &a, sid, aux);
		let z = alpha + &e * x;
		let n = pk.modulus();
		let w = n.mul(&ra, &n.pow(&n.reduce(r), &e));
		PdlProof { d, a, z, w }
	}

	pub fn verify(
		&self,
		pk: &PaillierPublicKey,
		c: &BigUint,
		q1: &P,
		sid: &[u8],
		aux: u64,
		key_status: CheckStatus,
	) -> Result<()> {
		let q = P::order();
		check_paillier_key(pk, key_status)?;
		pk.batch_verify_ciphers(&[c.clone(), self.d.clone()])?;
		ensure_crypto!(self.z < response_bound(q), "response out of range");

		let e = pdl_challenge(pk, c, q1, &self.d, &self.a, sid, aux);

		let nn = pk.modulus_squared();
		let lhs = pk.reencrypt_vartime(&self.z, &self.w)?;
		let rhs = nn.mul_vartime(&self.d, &nn.pow_vartime(c, &e));
		ensure_crypto!(lhs == rhs, "paillier relation failed");

		// z G == A + e Q1
		let lhs = P::from_scalar(&P::Scalar::from_biguint_mod_order(&self.z));
		let rhs = self.a + q1.mul(&P::Scalar::from_biguint_mod_order(&e));
		ensure_crypto!(lhs == rhs, "discrete log relation failed");
		Ok(())
	}
}
