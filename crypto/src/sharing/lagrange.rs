//! Lagrange basis computation and interpolation, in the scalar field and
//! in the exponent.
//!
//! The basis accumulates the numerator and denominator separately and
//! performs exactly one field inversion at the end; the underlying field
//! operations are constant time in the curve backends.

use crate::{
	curve::{ECPoint, ECScalar},
	error::{ensure_arg, Result},
};

/// λ = Π_{j≠i} (x* - x_j) / (x_i - x_j) for the party with identifier
/// `current` within `pids`. Occurrences of `current` itself are skipped,
/// so the denominator is a product of non-zero factors.
pub fn lagrange_basis<S: ECScalar>(x: &S, pids: &[S], current: &S) -> S {
	let mut numerator = S::from(1);
	let mut denominator = S::from(1);

	for pid in pids {
		assert!(!pid.is_zero(), "party identifiers must be non-zero");
		if pid == current {
			continue
		}
		numerator = numerator * (x.clone() - pid);
		denominator = denominator * (current.clone() - pid);
	}

	numerator * denominator.invert().expect("denominator factors are non-zero")
}

/// Interpolate at x* from a subset of shares; `all_pids` is the full
/// identifier set the basis is computed against (it may be larger than the
/// subset holding shares).
pub fn lagrange_partial_interpolate<S: ECScalar>(
	x: &S,
	shares: &[S],
	pids_for_shares: &[S],
	all_pids: &[S],
) -> Result<S> {
	ensure_arg!(shares.len() == pids_for_shares.len(), "shares/pids length mismatch");
	ensure_arg!(all_pids.len() >= shares.len(), "all_pids smaller than the share set");

	let mut secret = S::zero();
	for (share, pid) in shares.iter().zip(pids_for_shares) {
		let lambda = lagrange_basis(x, all_pids, pid);
		secret = secret + lambda * share;
	}
	Ok(secret)
}

pub fn lagrange_interpolate<S: ECScalar>(x: &S, shares: &[S], pids: &[S]) -> Result<S> {
	ensure_arg!(shares.len() == pids.len(), "shares/pids length mismatch");
	lagrange_partial_interpolate(x, shares, pids, pids)
}

pub fn lagrange_partial_interpolate_exponent<P: ECPoint>(
	x: &P::Scalar,
	shares: &[P],
	pids_for_shares: &[P::Scalar],
	all_pids: &[P::Scalar],
) -> Result<P> {
	ensure_arg!(shares.len() == pids_for_shares.len(), "shares/pids length mismatch");
	ensure_arg!(all_pids.len() >= shares.len(), "all_pids smaller than the share set");
	ensure_arg!(!shares.is_empty(), "empty share set");

	let mut result = P::infinity();
	for (share, pid) in shares.iter().zip(pids_for_shares) {
		let lambda = lagrange_basis(x, all_pids, pid);
		result = result + share.mul(&lambda);
	}
	Ok(result)
}

pub fn lagrange_interpolate_exponent<P: ECPoint>(
	x: &P::Scalar,
	shares: &[P],
	pids: &[P::Scalar],
) -> Result<P> {
	ensure_arg!(shares.len() == pids.len(), "shares/pids length mismatch");
	lagrange_partial_interpolate_exponent(x, shares, pids, pids)
}

/// Evaluate a polynomial given by its coefficients (constant term first)
/// at x, by Horner's rule.
pub fn horner_poly<S: ECScalar>(coefficients: &[S], x: &S) -> S {
	let mut acc = coefficients.last().expect("non-empty coefficients").clone();
	for coefficient in coefficients.iter().rev().skip(1) {
		acc = acc * x + coefficient;
	}
	acc
}

/// Horner evaluation in the exponent: coefficients are points.
pub fn horner_poly_exponent<P: ECPoint>(coefficients: &[P], x: &P::Scalar) -> P {
	let mut acc = *coefficients.last().expect("non-empty coefficients");
	for coefficient in coefficients.iter().rev().skip(1) {
		acc = *coefficient + acc.mul(x);
	}
	acc
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{curve::secp256k1::Point, Rng};
	use rand::SeedableRng;

	type Scalar = <Point as ECPoint>::Scalar;

	#[test]
	fn basis_is_one_for_a_single_party() {
		let pids = vec![Scalar::from(1)];
		let lambda = lagrange_basis(&Scalar::zero(), &pids, &Scalar::from(1));
		assert_eq!(lambda, Scalar::from(1));
	}

	#[test]
	fn interpolation_recovers_the_polynomial() {
		let mut rng = Rng::from_seed([60; 32]);
		// f(x) = secret + c1 x + c2 x²
		let secret = Scalar::random(&mut rng);
		let coefficients =
			vec![secret.clone(), Scalar::random(&mut rng), Scalar::random(&mut rng)];

		let pids: Vec<Scalar> = (1..=5u32).map(Scalar::from).collect();
		let shares: Vec<Scalar> =
			pids.iter().map(|pid| horner_poly(&coefficients, pid)).collect();

		// Any three shares suffice for a degree-2 polynomial
		let secret_back = lagrange_interpolate(
			&Scalar::zero(),
			&shares[..3],
			&pids[..3],
		)
		.unwrap();
		assert_eq!(secret_back, secret);

		// Interpolating at a party identifier returns that share
		let at_4 =
			lagrange_interpolate(&pids[3], &shares[1..4], &pids[1..4]).unwrap();
		assert_eq!(at_4, shares[3]);
	}

	#[test]
	fn interpolation_in_the_exponent_matches() {
		let mut rng = Rng::from_seed([61; 32]);
		let coefficients = vec![
			Scalar::random(&mut rng),
			Scalar::random(&mut rng),
		];
		let pids: Vec<Scalar> = (1..=3u32).map(Scalar::from).collect();
		let shares: Vec<Scalar> =
			pids.iter().map(|pid| horner_poly(&coefficients, pid)).collect();
		let pub_shares: Vec<Point> = shares.iter().map(|s| Point::from_scalar(s)).collect();

		let in_exponent = lagrange_interpolate_exponent(
			&Scalar::zero(),
			&pub_shares[..2],
			&pids[..2],
		)
		.unwrap();
		assert_eq!(in_exponent, Point::from_scalar(&coefficients[0]));
	}

	#[test]
	fn partial_interpolation_against_a_larger_universe() {
		let mut rng = Rng::from_seed([62; 32]);
		let coefficients = vec![Scalar::random(&mut rng), Scalar::random(&mut rng)];
		let all_pids: Vec<Scalar> = (1..=4u32).map(Scalar::from).collect();
		let shares: Vec<Scalar> =
			all_pids.iter().map(|pid| horner_poly(&coefficients, pid)).collect();

		// Interpolating with bases computed against the full universe is a
		// partial evaluation: summing every share recovers the secret
		let partial_a = lagrange_partial_interpolate(
			&Scalar::zero(),
			&shares[..2],
			&all_pids[..2],
			&all_pids,
		)
		.unwrap();
		let partial_b = lagrange_partial_interpolate(
			&Scalar::zero(),
			&shares[2..],
			&all_pids[2..],
			&all_pids,
		)
		.unwrap();
		assert_eq!(partial_a + partial_b, coefficients[0]);
	}
}
