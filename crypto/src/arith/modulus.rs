//! An odd modulus with precomputed Barrett and Montgomery parameters.
//!
//! This replaces the thread-local "modular scope" of classical bignum
//! libraries with an explicit context object: callers construct a `Modulus`
//! once and route every reduction through it. Constant-time operations
//! require operands already reduced below the modulus and run in time
//! independent of their values; explicitly named `_vartime` siblings exist
//! for public-input work (mostly verifiers).

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};

use crate::{
	error::{Error, Result},
	Rng,
};

use super::{
	limbs::{
		add_words, cnd_add_words, cnd_neg_words, cnd_sub_words, cnd_swap_words, from_limbs,
		mask_from_bool, masked_select, mul_words, partial_mul_words, shr1_words, sub_words,
		to_limbs, Limb,
	},
	montgomery::MontgomeryCtx,
};

/// Inversion algorithm selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvAlgo {
	/// Stein's constant-right-shift: exactly 2 * words * 64 rounds.
	ConstantRightShift,
	/// Invert a uniformly masked value in variable time; the running time
	/// depends only on the modulus. Requires a multiplicatively dense
	/// modulus.
	RandomMasking,
}

#[derive(Clone, Debug)]
pub struct Modulus {
	m: BigUint,
	bits: u64,
	k: usize,
	limbs: Vec<Limb>,
	/// Barrett parameter µ = ⌊b^(2k) / m⌋, always exactly k + 1 limbs.
	mu: Vec<Limb>,
	mont: MontgomeryCtx,
	/// Whether a uniformly random element is invertible with overwhelming
	/// probability (true for RSA/Paillier moduli and primes), making the
	/// random-masking inverse applicable.
	multiplicative_dense: bool,
}

impl PartialEq for Modulus {
	fn eq(&self, other: &Self) -> bool {
		self.m == other.m
	}
}
impl Eq for Modulus {}

impl Modulus {
	pub fn new(m: BigUint) -> Result<Self> {
		Self::create(m, false)
	}

	/// A modulus known to be multiplicatively dense (primes, RSA moduli).
	pub fn new_dense(m: BigUint) -> Result<Self> {
		Self::create(m, true)
	}

	fn create(m: BigUint, multiplicative_dense: bool) -> Result<Self> {
		if m.is_zero() || !m.is_odd() {
			return Err(Error::BadArgument("modulus must be odd and non-zero"))
		}
		if m.is_one() {
			return Err(Error::BadArgument("modulus must exceed one"))
		}

		let bits = m.bits();
		let k = ((bits as usize) + 63) / 64;
		let limbs = to_limbs(&m, k);
		let mu_value = (BigUint::one() << (2 * k * 64)) / &m;
		let mu = to_limbs(&mu_value, k + 1);
		let mont = MontgomeryCtx::new(&m);

		Ok(Modulus { m, bits, k, limbs, mu, mont, multiplicative_dense })
	}

	pub fn value(&self) -> &BigUint {
		&self.m
	}

	pub fn bits(&self) -> u64 {
		self.bits
	}

	/// Size of a canonically encoded element in bytes.
	pub fn byte_len(&self) -> usize {
		(self.bits as usize + 7) / 8
	}

	pub fn is_multiplicative_dense(&self) -> bool {
		self.multiplicative_dense
	}

	fn check(&self, a: &BigUint) {
		assert!(a < &self.m, "operand out of range for constant-time operations");
	}

	// ---- constant-time operations ----

	pub fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
		self.check(a);
		self.check(b);
		let a = to_limbs(a, self.k);
		let b = to_limbs(b, self.k);
		let mut r = vec![0u64; self.k];
		let carry = add_words(&mut r, &a, &b);
		let mut reduced = vec![0u64; self.k];
		let borrow = sub_words(&mut reduced, &r, &self.limbs);
		let keep = mask_from_bool(carry == 0 && borrow == 1);
		for i in 0..self.k {
			r[i] = masked_select(keep, r[i], reduced[i]);
		}
		from_limbs(&r)
	}

	pub fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
		self.check(a);
		self.check(b);
		let a = to_limbs(a, self.k);
		let b = to_limbs(b, self.k);
		let mut r = vec![0u64; self.k];
		let borrow = sub_words(&mut r, &a, &b);
		cnd_add_words(&mut r, borrow == 1, &self.limbs);
		from_limbs(&r)
	}

	pub fn neg(&self, a: &BigUint) -> BigUint {
		self.check(a);
		let a = to_limbs(a, self.k);
		let mut r = vec![0u64; self.k];
		sub_words(&mut r, &self.limbs, &a);
		// Map the a == 0 case (r == m) back to zero
		let mut reduced = vec![0u64; self.k];
		let borrow = sub_words(&mut reduced, &r, &self.limbs);
		let keep = mask_from_bool(borrow == 1);
		for i in 0..self.k {
			r[i] = masked_select(keep, r[i], reduced[i]);
		}
		from_limbs(&r)
	}

	pub fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
		self.check(a);
		self.check(b);
		let a = to_limbs(a, self.k);
		let b = to_limbs(b, self.k);
		let mut product = vec![0u64; 2 * self.k];
		mul_words(&mut product, &a, &b);
		from_limbs(&self.barrett_reduce(&product))
	}

	pub fn div(&self, a: &BigUint, b: &BigUint) -> BigUint {
		self.mul(a, &self.inv(b))
	}

	/// Barrett reduction of an arbitrary non-negative input. Inputs wider
	/// than 2k words are first folded modulo m².
	pub fn reduce(&self, x: &BigUint) -> BigUint {
		let x_limbs = x.to_u64_digits();
		if x_limbs.len() > 2 * self.k {
			let m_square =
				Modulus::create(&self.m * &self.m, false).expect("odd square is a valid modulus");
			let folded = m_square.reduce(x);
			return self.reduce(&folded)
		}
		let mut padded = x_limbs;
		padded.resize(2 * self.k, 0);
		from_limbs(&self.barrett_reduce(&padded))
	}

	/// Core Barrett step over a fixed 2k-limb input, constant time.
	fn barrett_reduce(&self, x: &[Limb]) -> Vec<Limb> {
		let k = self.k;
		debug_assert_eq!(x.len(), 2 * k);

		// q1 = x / b^(k-1)
		let q1 = &x[k - 1..];
		// q2 = q1 * µ
		let mut q2 = vec![0u64; q1.len() + self.mu.len()];
		mul_words(&mut q2, q1, &self.mu);
		// q3 = q2 / b^(k+1)
		let q3 = &q2[k + 1..];

		// r1 = x mod b^(k+1)
		let mut r1 = x[..k + 1].to_vec();
		// r2 = partial_mul_(k+1)(q3, m)
		let mut r2 = vec![0u64; k + 1];
		partial_mul_words(&mut r2, q3, &self.limbs);

		let mut diff = vec![0u64; k + 1];
		sub_words(&mut diff, &r1, &r2);
		r1.copy_from_slice(&diff);

		// Two conditional subtractions of m bring the value below m
		let top = r1[k];
		let mut t = vec![0u64; k];
		let borrow = sub_words(&mut t, &r1[..k], &self.limbs);
		let keep = mask_from_bool(borrow == 1 && top == 0);
		for i in 0..k {
			r1[i] = masked_select(keep, r1[i], t[i]);
		}

		let borrow = sub_words(&mut t, &r1[..k], &self.limbs);
		let keep = mask_from_bool(borrow == 1);
		let mut out = vec![0u64; k];
		for i in 0..k {
			out[i] = masked_select(keep, r1[i], t[i]);
		}
		out
	}

	/// Constant-time x^e for 0 <= x < m (windowed Montgomery ladder).
	pub fn pow(&self, x: &BigUint, e: &BigUint) -> BigUint {
		self.check(x);
		self.mont.pow(x, e, &self.m)
	}

	/// Modular inverse; selects the algorithm explicitly. Inverting zero is
	/// an invariant violation and aborts.
	pub fn invert(&self, a: &BigUint, algo: InvAlgo, rng: &mut Rng) -> BigUint {
		match algo {
			InvAlgo::ConstantRightShift => self.inv(a),
			InvAlgo::RandomMasking => self.inv_masked(a, rng),
		}
	}

	/// Stein's constant-right-shift inverse, Algorithm 5 of
	/// <https://inria.hal.science/hal-01506572>: exactly 2 * k * 64 rounds.
	/// The input must be coprime with the modulus.
	pub fn inv(&self, a: &BigUint) -> BigUint {
		assert!(!a.is_zero(), "inverse of zero");
		self.check(a);
		let k = self.k;
		let m = &self.limbs;

		let mut a = to_limbs(a, k);
		let mut b = m.clone();
		let mut u = vec![0u64; k];
		u[0] = 1;
		let mut v = vec![0u64; k];

		// (m + 1) / 2, computed while u still holds one
		let mut mp1o2 = vec![0u64; k];
		add_words(&mut mp1o2, m, &u);
		shr1_words(&mut mp1o2);

		for _ in 0..(2 * k * 64) {
			let a_is_odd = a[0] & 1 == 1;
			let underflow = cnd_sub_words(&mut a, a_is_odd, &b) == 1; // if a odd:      a -= b
			cnd_add_words(&mut b, underflow, &a); //                     if underflow:  b += a
			cnd_neg_words(&mut a, underflow); //                         if underflow:  a = -a
			cnd_swap_words(underflow, &mut u, &mut v); //                if underflow:  u <-> v
			shr1_words(&mut a); //                                       a /= 2
			let borrow = cnd_sub_words(&mut u, a_is_odd, &v) == 1; //    if a odd:      u -= v
			cnd_add_words(&mut u, borrow, m); //                         if borrow:     u += m
			let u_is_odd = u[0] & 1 == 1;
			shr1_words(&mut u); //                                       u /= 2
			cnd_add_words(&mut u, u_is_odd, &mp1o2); //                  if u was odd:  u += (m+1)/2
		}

		from_limbs(&v)
	}

	/// Invert (a * r) for uniform r in variable time, then unmask. The
	/// running time depends only on the modulus, not on a.
	pub fn inv_masked(&self, a: &BigUint, rng: &mut Rng) -> BigUint {
		assert!(
			self.multiplicative_dense,
			"random-masking inverse requires a multiplicatively dense modulus"
		);
		assert!(!a.is_zero(), "inverse of zero");
		let mask = self.rand(rng);
		let masked = self.mul(a, &mask);
		let masked_inv = self
			.inv_vartime(&masked)
			.expect("masked value is invertible for a dense modulus");
		self.mul(&masked_inv, &mask)
	}

	/// Uniform element with a 128-bit rejection margin, reduced through a
	/// single Montgomery reduction so the sampling is constant time.
	pub fn rand(&self, rng: &mut Rng) -> BigUint {
		use rand::RngCore;
		if self.k < 3 {
			// The margin plus the modulus width must stay below m * R for
			// the Montgomery reduction; for narrow moduli sample plainly.
			return rng.gen_biguint_below(&self.m)
		}
		let mut bytes = vec![0u8; (self.bits as usize + 128) / 8];
		rng.fill_bytes(&mut bytes);
		let wide = to_limbs(&BigUint::from_bytes_be(&bytes), 2 * self.k);
		from_limbs(&self.mont.reduce(&wide))
	}

	// ---- variable-time operations (public inputs only) ----

	pub fn reduce_vartime(&self, x: &BigUint) -> BigUint {
		x % &self.m
	}

	pub fn mul_vartime(&self, a: &BigUint, b: &BigUint) -> BigUint {
		(a * b) % &self.m
	}

	pub fn pow_vartime(&self, x: &BigUint, e: &BigUint) -> BigUint {
		x.modpow(e, &self.m)
	}

	pub fn inv_vartime(&self, a: &BigUint) -> Result<BigUint> {
		inv_mod_vartime(a, &self.m)
	}

	/// gcd(a, m) == 1, computed without branching on a.
	pub fn coprime(&self, a: &BigUint) -> bool {
		let a_mod = self.reduce(a);
		if a_mod.is_zero() {
			return false
		}
		let a_inv = self.inv(&a_mod);
		self.mul(&a_inv, &a_mod).is_one()
	}

	pub fn coprime_vartime(&self, a: &BigUint) -> bool {
		a.gcd(&self.m).is_one()
	}
}

/// Extended-Euclid modular inverse for arbitrary (not necessarily odd)
/// moduli; variable time. Used at key-generation time, e.g. N⁻¹ mod φ(N).
pub fn inv_mod_vartime(a: &BigUint, m: &BigUint) -> Result<BigUint> {
	if m.is_zero() {
		return Err(Error::BadArgument("zero modulus"))
	}
	let a = BigInt::from_biguint(Sign::Plus, a % m);
	let m_int = BigInt::from_biguint(Sign::Plus, m.clone());
	let ext = a.extended_gcd(&m_int);
	if !ext.gcd.is_one() {
		return Err(Error::Crypto("value is not invertible"))
	}
	let mut x = ext.x % &m_int;
	if x.sign() == Sign::Minus {
		x += &m_int;
	}
	Ok(x.to_biguint().expect("normalised to non-negative"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn test_modulus(rng: &mut Rng, bits: u64) -> Modulus {
		let m = rng.gen_biguint(bits) | BigUint::one() | (BigUint::one() << (bits - 1));
		Modulus::new_dense(m).unwrap()
	}

	#[test]
	fn rejects_even_modulus() {
		assert!(Modulus::new(BigUint::from(100u32)).is_err());
		assert!(Modulus::new(BigUint::zero()).is_err());
		assert!(Modulus::new(BigUint::one()).is_err());
	}

	#[test]
	fn constant_time_ops_match_vartime() {
		let mut rng = Rng::from_seed([5; 32]);
		for bits in [192u64, 256, 521, 1024] {
			let modulus = test_modulus(&mut rng, bits);
			let m = modulus.value().clone();
			for _ in 0..20 {
				let a = rng.gen_biguint_below(&m);
				let b = rng.gen_biguint_below(&m);

				assert_eq!(modulus.add(&a, &b), (&a + &b) % &m);
				assert_eq!(modulus.sub(&a, &b), ((&a + &m) - &b) % &m);
				assert_eq!(modulus.neg(&a), (&m - &a) % &m);
				assert_eq!(modulus.mul(&a, &b), (&a * &b) % &m);
			}
		}
	}

	#[test]
	fn barrett_handles_wide_inputs() {
		let mut rng = Rng::from_seed([6; 32]);
		let modulus = test_modulus(&mut rng, 256);
		let m = modulus.value().clone();
		// Wider than 2k words forces the m² pre-fold
		let x = rng.gen_biguint(2000);
		assert_eq!(modulus.reduce(&x), &x % &m);
	}

	#[test]
	fn pow_matches_modpow() {
		let mut rng = Rng::from_seed([7; 32]);
		let modulus = test_modulus(&mut rng, 384);
		let m = modulus.value().clone();
		for _ in 0..5 {
			let x = rng.gen_biguint_below(&m);
			let e = rng.gen_biguint(300);
			assert_eq!(modulus.pow(&x, &e), x.modpow(&e, &m));
		}
	}

	#[test]
	fn inverse_then_multiply_yields_one() {
		let mut rng = Rng::from_seed([8; 32]);
		// A prime modulus so every non-zero element is invertible
		let p = crate::arith::prime::generate_prime(192, &mut rng);
		let modulus = Modulus::new_dense(p).unwrap();
		for _ in 0..10 {
			let a = modulus.rand(&mut rng);
			if a.is_zero() {
				continue
			}
			let scr = modulus.inv(&a);
			let masked = modulus.inv_masked(&a, &mut rng);
			let vartime = modulus.inv_vartime(&a).unwrap();
			assert_eq!(scr, vartime);
			assert_eq!(masked, vartime);
			assert!(modulus.mul(&a, &scr).is_one());
		}
	}

	#[test]
	fn rand_is_below_modulus() {
		let mut rng = Rng::from_seed([9; 32]);
		let modulus = test_modulus(&mut rng, 256);
		for _ in 0..50 {
			assert!(&modulus.rand(&mut rng) < modulus.value());
		}
	}

	#[test]
	fn coprime_detects_common_factors() {
		let mut rng = Rng::from_seed([10; 32]);
		let p = crate::arith::prime::generate_prime(128, &mut rng);
		let q = crate::arith::prime::generate_prime(128, &mut rng);
		let n = Modulus::new_dense(&p * &q).unwrap();
		assert!(!n.coprime(&p));
		assert!(!n.coprime_vartime(&q));
		assert!(n.coprime(&BigUint::from(65537u32)));
	}
}
