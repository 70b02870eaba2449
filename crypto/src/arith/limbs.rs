//! Constant-time helpers over little-endian 64-bit limb arrays.
//!
//! These are the word-level building blocks for Barrett reduction,
//! Montgomery multiplication and the constant-right-shift inverse. All
//! routines run in time independent of the data (only the lengths matter).

use num_bigint::BigUint;

pub(crate) type Limb = u64;

/// All-ones mask if `flag`, zero otherwise. The black box keeps the
/// compiler from specialising on a known flag value.
#[inline]
pub(crate) fn mask_from_bool(flag: bool) -> Limb {
	core::hint::black_box(0u64.wrapping_sub(flag as u64))
}

/// `if mask { a } else { b }`, branchless. `mask` must be all-ones or zero.
#[inline]
pub(crate) fn masked_select(mask: Limb, a: Limb, b: Limb) -> Limb {
	(a & mask) | (b & !mask)
}

pub(crate) fn to_limbs(x: &BigUint, len: usize) -> Vec<Limb> {
	let mut limbs = x.to_u64_digits();
	assert!(limbs.len() <= len, "value does not fit the limb count");
	limbs.resize(len, 0);
	limbs
}

pub(crate) fn from_limbs(limbs: &[Limb]) -> BigUint {
	let mut bytes = Vec::with_capacity(limbs.len() * 8);
	for limb in limbs {
		bytes.extend_from_slice(&limb.to_le_bytes());
	}
	BigUint::from_bytes_le(&bytes)
}

/// r = a + b, returns the carry. All slices must have equal length.
pub(crate) fn add_words(r: &mut [Limb], a: &[Limb], b: &[Limb]) -> Limb {
	let mut carry = 0u64;
	for i in 0..r.len() {
		let (s1, c1) = a[i].overflowing_add(b[i]);
		let (s2, c2) = s1.overflowing_add(carry);
		r[i] = s2;
		carry = (c1 as u64) + (c2 as u64);
	}
	carry
}

/// r = a - b, returns the borrow.
pub(crate) fn sub_words(r: &mut [Limb], a: &[Limb], b: &[Limb]) -> Limb {
	let mut borrow = 0u64;
	for i in 0..r.len() {
		let (d1, b1) = a[i].overflowing_sub(b[i]);
		let (d2, b2) = d1.overflowing_sub(borrow);
		r[i] = d2;
		borrow = (b1 as u64) + (b2 as u64);
	}
	borrow
}

/// if flag { r += a }, returns the carry of the (always executed) addition.
pub(crate) fn cnd_add_words(r: &mut [Limb], flag: bool, a: &[Limb]) -> Limb {
	let mask = mask_from_bool(flag);
	let mut carry = 0u64;
	for i in 0..r.len() {
		let (s1, c1) = r[i].overflowing_add(a[i] & mask);
		let (s2, c2) = s1.overflowing_add(carry);
		r[i] = s2;
		carry = (c1 as u64) + (c2 as u64);
	}
	carry
}

/// if flag { r -= a }, returns the borrow.
pub(crate) fn cnd_sub_words(r: &mut [Limb], flag: bool, a: &[Limb]) -> Limb {
	let mask = mask_from_bool(flag);
	let mut borrow = 0u64;
	for i in 0..r.len() {
		let (d1, b1) = r[i].overflowing_sub(a[i] & mask);
		let (d2, b2) = d1.overflowing_sub(borrow);
		r[i] = d2;
		borrow = (b1 as u64) + (b2 as u64);
	}
	borrow
}

/// if flag { r = -r } (two's complement negate), returns the final carry.
pub(crate) fn cnd_neg_words(r: &mut [Limb], flag: bool) -> Limb {
	let mask = mask_from_bool(flag);
	for limb in r.iter_mut() {
		*limb ^= mask;
	}
	let mut carry = flag as u64;
	for limb in r.iter_mut() {
		let (s, c) = limb.overflowing_add(carry);
		*limb = s;
		carry = c as u64;
	}
	carry
}

/// if flag { swap(a, b) }
pub(crate) fn cnd_swap_words(flag: bool, a: &mut [Limb], b: &mut [Limb]) {
	let mask = mask_from_bool(flag);
	for i in 0..a.len() {
		let delta = (a[i] ^ b[i]) & mask;
		a[i] ^= delta;
		b[i] ^= delta;
	}
}

/// r >>= 1 across the whole array.
pub(crate) fn shr1_words(r: &mut [Limb]) {
	let mut carry = 0u64;
	for i in (0..r.len()).rev() {
		let next_carry = r[i] << 63;
		r[i] = (r[i] >> 1) | carry;
		carry = next_carry;
	}
}

/// Schoolbook full product; r must have length a.len() + b.len().
pub(crate) fn mul_words(r: &mut [Limb], a: &[Limb], b: &[Limb]) {
	assert_eq!(r.len(), a.len() + b.len());
	r.fill(0);
	for (j, &bj) in b.iter().enumerate() {
		let mut carry = 0u64;
		for (i, &ai) in a.iter().enumerate() {
			let t = (ai as u128) * (bj as u128) + (r[i + j] as u128) + (carry as u128);
			r[i + j] = t as u64;
			carry = (t >> 64) as u64;
		}
		r[j + a.len()] = carry;
	}
}

/// Truncated schoolbook product: only the lowest `r.len()` limbs of u * v
/// are produced. Used by the Barrett step r2 = partial_mul(q3, M).
pub(crate) fn partial_mul_words(r: &mut [Limb], u: &[Limb], v: &[Limb]) {
	let result_len = r.len();
	r.fill(0);
	for (j, &vj) in v.iter().enumerate() {
		if j >= result_len {
			break
		}
		let mut carry = 0u64;
		let m = u.len().min(result_len - j);
		for i in 0..m {
			let t = (u[i] as u128) * (vj as u128) + (r[i + j] as u128) + (carry as u128);
			r[i + j] = t as u64;
			carry = (t >> 64) as u64;
		}
		if j + u.len() < result_len {
			r[j + u.len()] = carry;
		}
	}
}

/// Constant-time table lookup: returns table[index] scanning every entry.
pub(crate) fn ct_table_select(table: &[Vec<Limb>], index: usize) -> Vec<Limb> {
	let mut out = vec![0u64; table[0].len()];
	for (j, entry) in table.iter().enumerate() {
		let mask = mask_from_bool(j == index);
		for (o, &e) in out.iter_mut().zip(entry.iter()) {
			*o |= e & mask;
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use num_bigint::BigUint;
	use rand::{Rng, SeedableRng};

	#[test]
	fn mul_words_matches_bigint() {
		let mut rng = rand::rngs::StdRng::from_seed([1; 32]);
		for _ in 0..50 {
			let a: Vec<u64> = (0..4).map(|_| rng.gen()).collect();
			let b: Vec<u64> = (0..4).map(|_| rng.gen()).collect();
			let mut r = vec![0u64; 8];
			mul_words(&mut r, &a, &b);
			assert_eq!(from_limbs(&r), from_limbs(&a) * from_limbs(&b));
		}
	}

	#[test]
	fn partial_mul_truncates() {
		let mut rng = rand::rngs::StdRng::from_seed([2; 32]);
		for _ in 0..50 {
			let a: Vec<u64> = (0..5).map(|_| rng.gen()).collect();
			let b: Vec<u64> = (0..4).map(|_| rng.gen()).collect();
			let mut full = vec![0u64; 9];
			mul_words(&mut full, &a, &b);
			let mut partial = vec![0u64; 5];
			partial_mul_words(&mut partial, &a, &b);
			assert_eq!(&partial[..], &full[..5]);
		}
	}

	#[test]
	fn conditional_ops() {
		let a = [3u64, 7, 11];
		let b = [1u64, 2, 3];

		let mut r = a;
		cnd_sub_words(&mut r, false, &b);
		assert_eq!(r, a);
		cnd_sub_words(&mut r, true, &b);
		assert_eq!(r, [2, 5, 8]);

		let mut x = a;
		let mut y = b;
		cnd_swap_words(false, &mut x, &mut y);
		assert_eq!((x, y), (a, b));
		cnd_swap_words(true, &mut x, &mut y);
		assert_eq!((x, y), (b, a));
	}

	#[test]
	fn shr1_is_division_by_two() {
		let value = BigUint::parse_bytes(b"123456789123456789123456789", 10).unwrap();
		let mut limbs = to_limbs(&value, 4);
		shr1_words(&mut limbs);
		assert_eq!(from_limbs(&limbs), value / 2u32);
	}
}
