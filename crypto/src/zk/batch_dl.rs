//! UC-secure batch proof of knowledge of discrete logs (Fischlin
//! transform with a finite-difference response table).
//!
//! The response for challenge e is z = r + p(e) with p(e) = sum_j w_j
//! e^(j+1). Instead of re-evaluating the degree-n polynomial for each of
//! the up to 2^t candidate challenges, the prover seeds the values for
//! |e| <= (n+1)/2 directly (split into even and odd parts so each Horner
//! evaluation runs over e²), builds the forward-difference triangle, and
//! then materialises each further value with n additions.

use serde::{Deserialize, Serialize};

use crate::{
	curve::{ECPoint, ECScalar},
	error::{ensure_arg, ensure_crypto, Result},
	hashing::ro::Ro,
	sharing::lagrange::{horner_poly, horner_poly_exponent},
	zk::{
		fischlin::{fischlin_prove, hash32, FischlinParams, FischlinProver},
		signed_to_scalar, SEC_P_COM,
	},
	Rng,
};

/// Parameters adapt to the batch size, keeping rho * (b - log2(n)) >= 128.
pub fn batch_params(n: usize) -> FischlinParams {
	let log2_n = ceil_log2(n);
	let (rho, b) = if n <= 28 { (43, 3 + log2_n) } else { (64, 2 + log2_n) };
	FischlinParams::new(rho, b, b + 5)
}

fn ceil_log2(n: usize) -> u32 {
	assert!(n > 0);
	usize::BITS - (n - 1).leading_zeros()
}

/// Proof of knowledge of w_0..w_{n-1} with Q_j = w_j * G.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct UcBatchDlProof<P: ECPoint> {
	params: FischlinParams,
	r: Vec<P>,
	e: Vec<i32>,
	z: Vec<P::Scalar>,
}

fn common_hash<P: ECPoint>(q: &[P], r: &[P], sid: &[u8], aux: u64) -> Vec<u8> {
	Ro::new()
		.feed(&P::generator())
		.feed(q)
		.feed(r)
		.feed(sid)
		.feed(&aux)
		.bits(2 * SEC_P_COM)
}

/// sum[e] and the difference table, indexed by a signed offset.
struct ResponseTable<S: ECScalar> {
	n: usize,
	n_half: i64,
	/// p(e) for e in [-n_half, computed_up_to]
	sum: Vec<S>,
	/// Highest e with a computed sum entry
	k: i64,
	/// Full forward-difference vector at e = k
	last: Vec<S>,
	scratch: Vec<S>,
}

impl<S: ECScalar> ResponseTable<S> {
	fn build(witnesses: &[S], e_max: u32) -> Self {
		let n = witnesses.len();
		let n_half = ((n + 1) / 2) as i64;

		// Split into even and odd powers: p(e) = alpha(e²) + e * beta(e²)
		let mut pw0 = vec![S::zero()];
		let mut pw1 = Vec::new();
		for (j, w) in witnesses.iter().enumerate() {
			if j % 2 == 0 {
				pw1.push(w.clone());
			} else {
				pw0.push(w.clone());
			}
		}

		let rows = (2 * n_half + 2) as usize;
		let mut matrix = vec![vec![S::zero(); n + 1]; rows];
		let offset = n_half;
		let mut sum = vec![S::zero(); e_max as usize + 1];

		let row = |j: i64| (j + offset) as usize;

		for e in 0..=n_half {
			let e_square = S::from((e * e) as u32);
			let alpha = horner_poly(&pw0, &e_square);
			let beta = horner_poly(&pw1, &e_square);
			let e_scalar = S::from(e as u32);

			let positive = alpha.clone() + beta.clone() * &e_scalar;
			let negative = alpha - beta * &e_scalar;
			sum[row(e)] = positive.clone();
			sum[row(-e)] = negative.clone();
			matrix[row(e)][0] = positive;
			matrix[row(-e)][0] = negative;
		}

		// Forward-difference triangle over the seeded band
		for i in 1..=n {
			for j in (-n_half..=(n_half - i as i64)).rev() {
				matrix[row(j)][i] =
					matrix[row(j + 1)][i - 1].clone() - &matrix[row(j)][i - 1];
			}
		}

		// Propagate full difference vectors up to j = n_half (the n-th
		// difference of a degree-n polynomial is constant)
		matrix[row(-n_half + 1)][n] = matrix[row(-n_half)][n].clone();
		for j in (-n_half + 2)..=n_half {
			matrix[row(j)][n] = matrix[row(j - 1)][n].clone();
			let start = (n_half - j + 1).max(0) as usize;
			for i in (start..n).rev() {
				matrix[row(j)][i] =
					matrix[row(j - 1)][i].clone() + &matrix[row(j - 1)][i + 1];
			}
		}

		let last = matrix[row(n_half)].clone();
		ResponseTable {
			n,
			n_half,
			sum,
			k: n_half,
			last,
			scratch: vec![S::zero(); n + 1],
		}
	}

	/// p(e) for a signed challenge; extends the table one step when the
	/// challenge walks past the computed range.
	fn value(&mut self, e: i64) -> &S {
		if e > self.k {
			debug_assert_eq!(e, self.k + 1);
			self.scratch[self.n] = self.last[self.n].clone();
			for i in (0..self.n).rev() {
				self.scratch[i] = self.last[i].clone() + &self.last[i + 1];
			}
			std::mem::swap(&mut self.last, &mut self.scratch);
			self.k += 1;
			self.sum[(e + self.n_half) as usize] = self.last[0].clone();
		}
		&self.sum[(e + self.n_half) as usize]
	}
}

struct BatchDlProver<'a, P: ECPoint> {
	q: &'a [P],
	sid: &'a [u8],
	aux: u64,
	rng: &'a mut Rng,
	params: FischlinParams,
	n_half: i64,
	table: ResponseTable<P::Scalar>,
	r: Vec<P::Scalar>,
	r_points: Vec<P>,
	e: Vec<i32>,
	z: Vec<P::Scalar>,
	ri: P::Scalar,
	z_tag: P::Scalar,
	common_hash: Vec<u8>,
}

impl<P: ECPoint> FischlinProver for BatchDlProver<'_, P> {
	fn initialize(&mut self) {
		let rho = self.params.rho;
		self.r = (0..rho).map(|_| P::Scalar::random(self.rng)).collect();
		self.r_points = self.r.iter().map(|r| P::from_scalar(r)).collect();
		self.e = vec![0; rho];
		self.z = vec![P::Scalar::zero(); rho];
		self.common_hash = common_hash(self.q, &self.r_points, self.sid, self.aux);
		// The witnesses do not change on a restart, so the response table
		// survives it
	}

	fn response_begin(&mut self, i: usize) {
		self.ri = self.r[i].clone();
		let first = self.table.value(-self.n_half).clone();
		self.z_tag = self.ri.clone() + first;
	}

	fn hash(&mut self, i: usize, e: u32) -> u32 {
		let ei = e as i64 - self.n_half;
		hash32(&self.common_hash, i as u32, ei as i32, &[&self.z_tag.to_bytes()])
	}

	fn save(&mut self, i: usize, e: u32) {
		let ei = e as i64 - self.n_half;
		self.e[i] = ei as i32;
		self.z[i] = self.z_tag.clone();
	}

	fn response_next(&mut self, next_e: u32) {
		let ei = next_e as i64 - self.n_half;
		let value = self.table.value(ei).clone();
		self.z_tag = self.ri.clone() + value;
	}
}

impl<P: ECPoint> UcBatchDlProof<P> {
	pub fn prove(
		q: &[P],
		witnesses: &[P::Scalar],
		sid: &[u8],
		aux: u64,
		rng: &mut Rng,
	) -> Result<Self> {
		ensure_arg!(!witnesses.is_empty(), "empty witness vector");
		ensure_arg!(q.len() == witnesses.len(), "statement/witness length mismatch");

		let params = batch_params(witnesses.len());
		let n_half = ((witnesses.len() + 1) / 2) as i64;
		let table = ResponseTable::build(witnesses, params.e_max());

		let mut prover = BatchDlProver {
			q,
			sid,
			aux,
			rng,
			params,
			n_half,
			table,
			r: Vec::new(),
			r_points: Vec::new(),
			e: Vec::new(),
			z: Vec::new(),
			ri: P::Scalar::zero(),
			z_tag: P::Scalar::zero(),
			common_hash: Vec::new(),
		};
		fischlin_prove(&params, &mut prover);

		Ok(UcBatchDlProof { params, r: prover.r_points, e: prover.e, z: prover.z })
	}

	pub fn verify(&self, q: &[P], sid: &[u8], aux: u64) -> Result<()> {
		let n = q.len();
		ensure_arg!(n > 0, "empty statement vector");
		let params = batch_params(n);
		ensure_crypto!(self.params == params, "unexpected parameters");
		let rho = params.rho;
		ensure_crypto!(
			rho as u32 * (params.b - ceil_log2(n)) >= SEC_P_COM as u32,
			"parameters too weak"
		);
		ensure_crypto!(self.r.len() == rho, "wrong commitment count");
		ensure_crypto!(self.e.len() == rho, "wrong challenge count");
		ensure_crypto!(self.z.len() == rho, "wrong response count");

		let common_hash = common_hash(q, &self.r, sid, aux);
		let b_mask = params.b_mask();

		// PQ(x) = sum_j Q_j x^(j+1), evaluated by Horner in the exponent
		let mut pq = Vec::with_capacity(n + 1);
		pq.push(P::infinity());
		pq.extend_from_slice(q);

		for i in 0..rho {
			let ei = signed_to_scalar::<P>(self.e[i]);
			let r_test = P::from_scalar(&self.z[i]) - horner_poly_exponent(&pq, &ei);
			ensure_crypto!(self.r[i] == r_test, "commitment does not match");

			let h = hash32(&common_hash, i as u32, self.e[i], &[&self.z[i].to_bytes()]);
			ensure_crypto!(h & b_mask == 0, "hash prefix not zero");
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::secp256k1::Point;
	use rand::SeedableRng;

	type Scalar = <Point as ECPoint>::Scalar;

	#[test]
	fn response_table_matches_direct_evaluation() {
		let mut rng = Rng::from_seed([90; 32]);
		for n in [1usize, 2, 3, 5, 8] {
			let witnesses: Vec<Scalar> =
				(0..n).map(|_| Scalar::random(&mut rng)).collect();
			let mut table = ResponseTable::build(&witnesses, 64);
			let n_half = table.n_half;

			// p(e) = sum_j w_j e^(j+1), checked over the whole scan range
			for e in -n_half..=(40 - n_half) {
				let direct = {
					let e_scalar = signed_to_scalar::<Point>(e as i32);
					let mut acc = Scalar::zero();
					let mut power = e_scalar.clone();
					for w in &witnesses {
						acc = acc + w.clone() * &power;
						power = power * &e_scalar;
					}
					acc
				};
				assert_eq!(table.value(e), &direct, "n={n} e={e}");
			}
		}
	}

	#[test]
	fn adaptive_parameters() {
		assert_eq!(batch_params(1), FischlinParams::new(43, 3, 8));
		assert_eq!(batch_params(16), FischlinParams::new(43, 7, 12));
		assert_eq!(batch_params(28), FischlinParams::new(43, 8, 13));
		assert_eq!(batch_params(29), FischlinParams::new(64, 7, 12));
	}

	#[test]
	fn prove_and_verify_small_batches() {
		let mut rng = Rng::from_seed([91; 32]);
		for n in [1usize, 2, 5] {
			let witnesses: Vec<Scalar> =
				(0..n).map(|_| Scalar::random(&mut rng)).collect();
			let q: Vec<Point> = witnesses.iter().map(Point::from_scalar).collect();

			let proof =
				UcBatchDlProof::prove(&q, &witnesses, b"sid", 7, &mut rng).unwrap();
			proof.verify(&q, b"sid", 7).unwrap();

			assert!(proof.verify(&q, b"bad sid", 7).is_err());
			assert!(proof.verify(&q, b"sid", 8).is_err());

			let mut bad_statement = q.clone();
			bad_statement[0] = bad_statement[0] + Point::generator();
			assert!(proof.verify(&bad_statement, b"sid", 7).is_err());
		}
	}

	#[test]
	fn mutated_proofs_fail() {
		let mut rng = Rng::from_seed([92; 32]);
		let witnesses: Vec<Scalar> = (0..3).map(|_| Scalar::random(&mut rng)).collect();
		let q: Vec<Point> = witnesses.iter().map(Point::from_scalar).collect();
		let proof = UcBatchDlProof::prove(&q, &witnesses, b"sid", 0, &mut rng).unwrap();

		let mut bad = proof.clone();
		bad.z[0] = bad.z[0].clone() + Scalar::from(1);
		assert!(bad.verify(&q, b"sid", 0).is_err());

		let mut bad = proof.clone();
		bad.e[1] += 1;
		assert!(bad.verify(&q, b"sid", 0).is_err());

		let mut bad = proof;
		bad.r[2] = bad.r[2] + Point::generator();
		assert!(bad.verify(&q, b"sid", 0).is_err());
	}
}
