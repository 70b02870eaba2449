//! Range proofs for Pedersen commitments over an elliptic curve.
//!
//! A commitment C = x G + r H (H a random-oracle-derived second generator)
//! is proven to hold x in [0, q) up to statistical slack: each of the 128
//! repetitions masks x with an integer alpha of q * 2^64 width, the
//! challenge is one bit, and the integer response is range-checked by the
//! verifier. Binary challenges are required because the exponent relation
//! only binds over the integers.

use num_bigint::{BigUint, RandBigInt};
use serde::{Deserialize, Serialize};

use crate::{
	curve::{hash_to_point, ECPoint, ECScalar},
	error::{ensure_arg, ensure_crypto, Result},
	hashing::ro::{bit_of, Ro},
	zk::{SEC_P_COM, SEC_P_STAT},
	Rng,
};

/// The standard second generator for Pedersen commitments over P. Nothing
/// links its discrete log to the caller.
pub fn pedersen_h<P: ECPoint>() -> P {
	hash_to_point::<P>(&Ro::new().feed("Pedersen-H").feed(&(P::CODE as u32)))
}

pub fn pedersen_commit<P: ECPoint>(x: &P::Scalar, r: &P::Scalar, h: &P) -> P {
	P::mul_add(x, h, r)
}

/// One masked repetition: the commitment to (alpha, rho) and the integer
/// and scalar responses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct RangePedersenProof<P: ECPoint> {
	a: Vec<P>,
	e: Vec<u8>,
	z: Vec<BigUint>,
	z_rho: Vec<P::Scalar>,
}

fn alpha_bound<P: ECPoint>() -> BigUint {
	P::order().value() << SEC_P_STAT
}

fn range_challenge<P: ECPoint>(c: &[P], a: &[P], sid: &[u8], aux: u64) -> Vec<u8> {
	Ro::new().feed(c).feed(a).feed(sid).feed(&aux).bits(SEC_P_COM)
}

impl<P: ECPoint> RangePedersenProof<P> {
	pub fn prove(
		c: &P,
		x: &P::Scalar,
		r: &P::Scalar,
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Self {
		let h = pedersen_h::<P>();
		let bound = alpha_bound::<P>();

		let alphas: Vec<BigUint> =
			(0..SEC_P_COM).map(|_| rng.gen_biguint_below(&bound)).collect();
		let rhos: Vec<P::Scalar> =
			(0..SEC_P_COM).map(|_| P::Scalar::random(rng)).collect();
		let a: Vec<P> = alphas
			.iter()
			.zip(&rhos)
			.map(|(alpha, rho)| {
				pedersen_commit(&P::Scalar::from_biguint_mod_order(alpha), rho, &h)
			})
			.collect();

		let e = range_challenge(std::slice::from_ref(c), &a, sid, aux);

		let x_int = x.to_biguint();
		let mut z = alphas;
		let mut z_rho = rhos;
		for i in 0..SEC_P_COM {
			if bit_of(&e, i) {
				z[i] += &x_int;
				z_rho[i] = z_rho[i].clone() + r;
			}
		}

		RangePedersenProof { a, e, z, z_rho }
	}

	pub fn verify(&self, c: &P, sid: &[u8], aux: u64) -> Result<()> {
		verify_rows(
			std::slice::from_ref(c),
			&self.a,
			&self.e,
			&self.z,
			&self.z_rho,
			|_row| c,
			sid,
			aux,
		)
	}
}

/// Batch variant: one challenge string covers a vector of commitments;
/// repetition i masks commitment i mod m.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BatchRangePedersenProof<P: ECPoint> {
	a: Vec<P>,
	e: Vec<u8>,
	z: Vec<BigUint>,
	z_rho: Vec<P::Scalar>,
}

impl<P: ECPoint> BatchRangePedersenProof<P> {
	pub fn prove(
		c: &[P],
		x: &[P::Scalar],
		r: &[P::Scalar],
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Result<Self> {
		ensure_arg!(!c.is_empty(), "empty commitment vector");
		ensure_arg!(c.len() == x.len() && c.len() == r.len(), "length mismatch");

		let h = pedersen_h::<P>();
		let bound = alpha_bound::<P>();
		let m = c.len();

		let alphas: Vec<BigUint> =
			(0..SEC_P_COM).map(|_| rng.gen_biguint_below(&bound)).collect();
		let rhos: Vec<P::Scalar> =
			(0..SEC_P_COM).map(|_| P::Scalar::random(rng)).collect();
		let a: Vec<P> = alphas
			.iter()
			.zip(&rhos)
			.map(|(alpha, rho)| {
				pedersen_commit(&P::Scalar::from_biguint_mod_order(alpha), rho, &h)
			})
			.collect();

		let e = range_challenge(c, &a, sid, aux);

		let mut z = alphas;
		let mut z_rho = rhos;
		for i in 0..SEC_P_COM {
			if bit_of(&e, i) {
				let j = i % m;
				z[i] += &x[j].to_biguint();
				z_rho[i] = z_rho[i].clone() + &r[j];
			}
		}

		Ok(BatchRangePedersenProof { a, e, z, z_rho })
	}

	pub fn verify(&self, c: &[P], sid: &[u8], aux: u64) -> Result<()> {
		ensure_arg!(!c.is_empty(), "empty commitment vector");
		let m = c.len();
		verify_rows(c, &self.a, &self.e, &self.z, &self.z_rho, |row| &c[row % m], sid, aux)
	}
}

#[allow(clippy::too_many_arguments)]
fn verify_rows<'a, P: ECPoint>(
	statement: &[P],
	a: &[P],
	e: &[u8],
	z: &[BigUint],
	z_rho: &[P::Scalar],
	commitment_for_row: impl Fn(usize) -> &'a P,
	sid: &[u8],
	aux: u64,
) -> Result<()>
where
	P: 'a,
{
	ensure_crypto!(a.len() == SEC_P_COM, "wrong commitment count");
	ensure_crypto!(e.len() == SEC_P_COM / 8, "wrong challenge size");
	ensure_crypto!(z.len() == SEC_P_COM, "wrong response count");
	ensure_crypto!(z_rho.len() == SEC_P_COM, "wrong response count");

	let h = pedersen_h::<P>();
	let expected = range_challenge(statement, a, sid, aux);
	ensure_crypto!(expected == e, "challenge mismatch");

	// Responses must stay within the masked band; this is where the range
	// (up to the 2^64 slack) is enforced
	let z_bound = alpha_bound::<P>() + P::order().value();

	for i in 0..SEC_P_COM {
		ensure_crypto!(z[i] < z_bound, "response out of range");

		let lhs = pedersen_commit(
			&P::Scalar::from_biguint_mod_order(&z[i]),
			&z_rho[i],
			&h,
		);
		let mut rhs = a[i];
		if bit_of(e, i) {
			rhs = rhs + *commitment_for_row(i);
		}
		ensure_crypto!(lhs == rhs, "row relation failed");
	}
	Ok(())
}
