//! Montgomery multiplication context for constant-time exponentiation.

use num_bigint::BigUint;
use num_traits::One;

use super::limbs::{
	ct_table_select, from_limbs, mask_from_bool, masked_select, sub_words, to_limbs, Limb,
};

const WINDOW_BITS: usize = 4;
const TABLE_SIZE: usize = 1 << WINDOW_BITS;

/// Precomputed data for arithmetic modulo an odd m in Montgomery form with
/// R = 2^(64k).
#[derive(Clone, Debug)]
pub(crate) struct MontgomeryCtx {
	pub k: usize,
	/// Modulus limbs
	n: Vec<Limb>,
	/// -m^(-1) mod 2^64
	n0: Limb,
	/// R mod m (the Montgomery representation of one)
	one: Vec<Limb>,
	/// R^2 mod m
	rr: Vec<Limb>,
}

/// m^(-1) mod 2^64 by Newton iteration; m must be odd.
fn inv_mod_word(m: Limb) -> Limb {
	debug_assert!(m & 1 == 1);
	let mut x = m;
	for _ in 0..5 {
		x = x.wrapping_mul(2u64.wrapping_sub(m.wrapping_mul(x)));
	}
	debug_assert!(m.wrapping_mul(x) == 1);
	x
}

impl MontgomeryCtx {
	pub fn new(m: &BigUint) -> Self {
		let k = ((m.bits() as usize) + 63) / 64;
		let n = to_limbs(m, k);
		let n0 = inv_mod_word(n[0]).wrapping_neg();

		let r = BigUint::one() << (64 * k);
		let one = to_limbs(&(&r % m), k);
		let rr = to_limbs(&((&r * &r) % m), k);

		MontgomeryCtx { k, n, n0, one, rr }
	}

	/// REDC of a double-width value t (2k limbs, t < m * R):
	/// returns t * R^(-1) mod m.
	pub fn reduce(&self, t: &[Limb]) -> Vec<Limb> {
		let k = self.k;
		debug_assert_eq!(t.len(), 2 * k);

		let mut acc = t.to_vec();
		acc.push(0); // extra limb for the running carry

		for i in 0..k {
			let u = acc[i].wrapping_mul(self.n0);
			let mut carry = 0u64;
			for j in 0..k {
				let s = (u as u128) * (self.n[j] as u128) + (acc[i + j] as u128) + (carry as u128);
				acc[i + j] = s as u64;
				carry = (s >> 64) as u64;
			}
			// Propagate the carry through the remaining limbs
			for limb in acc.iter_mut().skip(i + k) {
				let (s, c) = limb.overflowing_add(carry);
				*limb = s;
				carry = c as u64;
				// Keep going even once the carry is zero so that the
				// iteration count does not depend on the values.
			}
		}

		let extra = acc[2 * k];
		let r = &acc[k..2 * k];
		let mut reduced = vec![0u64; k];
		let borrow = sub_words(&mut reduced, r, &self.n);
		// Keep r unless it overflowed k limbs or is >= n
		let keep = mask_from_bool(extra == 0 && borrow == 1);
		let mut out = vec![0u64; k];
		for i in 0..k {
			out[i] = masked_select(keep, r[i], reduced[i]);
		}
		out
	}

	/// a * b * R^(-1) mod m for a, b < m.
	pub fn mul(&self, a: &[Limb], b: &[Limb]) -> Vec<Limb> {
		let k = self.k;
		let mut t = vec![0u64; 2 * k];
		super::limbs::mul_words(&mut t, a, b);
		self.reduce(&t)
	}

	pub fn to_mont(&self, a: &[Limb]) -> Vec<Limb> {
		self.mul(a, &self.rr)
	}

	pub fn from_mont(&self, a: &[Limb]) -> Vec<Limb> {
		let mut t = a.to_vec();
		t.resize(2 * self.k, 0);
		self.reduce(&t)
	}

	pub fn one_mont(&self) -> Vec<Limb> {
		self.one.clone()
	}

	/// x^e mod m in constant time: fixed 4-bit windows over the whole
	/// exponent width, masked table lookups, no early exit.
	pub fn pow(&self, x: &BigUint, e: &BigUint, m: &BigUint) -> BigUint {
		let k = self.k;
		let x_limbs = to_limbs(&(x % m), k);

		let mut table: Vec<Vec<Limb>> = Vec::with_capacity(TABLE_SIZE);
		table.push(self.one_mont());
		let x_mont = self.to_mont(&x_limbs);
		for i in 1..TABLE_SIZE {
			let prev = table[i - 1].clone();
			table.push(self.mul(&prev, &x_mont));
		}

		let e_limbs = e.to_u64_digits();
		let e_bits = e_limbs.len() * 64;
		let windows = (e_bits + WINDOW_BITS - 1) / WINDOW_BITS;

		let mut acc = self.one_mont();
		for w in (0..windows).rev() {
			for _ in 0..WINDOW_BITS {
				acc = self.mul(&acc, &acc);
			}
			let bit_index = w * WINDOW_BITS;
			let limb = bit_index / 64;
			let shift = bit_index % 64;
			let mut window = (e_limbs[limb] >> shift) as usize;
			// A 4-bit window never straddles a limb boundary (64 % 4 == 0)
			window &= TABLE_SIZE - 1;
			let selected = ct_table_select(&table, window);
			acc = self.mul(&acc, &selected);
		}

		from_limbs(&self.from_mont(&acc))
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use num_bigint::RandBigInt;
	use rand::SeedableRng;

	#[test]
	fn pow_matches_modpow() {
		let mut rng = rand::rngs::StdRng::from_seed([3; 32]);
		for _ in 0..10 {
			let m = rng.gen_biguint(256) | BigUint::one();
			if m.bits() < 65 {
				continue
			}
			let ctx = MontgomeryCtx::new(&m);
			let x = rng.gen_biguint_below(&m);
			let e = rng.gen_biguint(200);
			assert_eq!(ctx.pow(&x, &e, &m), x.modpow(&e, &m));
		}
	}

	#[test]
	fn mont_round_trip() {
		let mut rng = rand::rngs::StdRng::from_seed([4; 32]);
		let m = rng.gen_biguint(512) | BigUint::one();
		let ctx = MontgomeryCtx::new(&m);
		let x = rng.gen_biguint_below(&m);
		let limbs = to_limbs(&x, ctx.k);
		let mont = ctx.to_mont(&limbs);
		assert_eq!(from_limbs(&ctx.from_mont(&mont)), x);
	}
}
