//! Deterministic random bit generator: AES-128 in counter mode over a zero
//! stream. A 32-byte seed is split into key and initial counter; any other
//! seed size is absorbed through SHA-256. Supports unbounded output,
//! 128-bit blocks and big-integer sampling with a 64-bit statistical
//! margin. Implements `RngCore` so it can drive randomised algorithms
//! (e.g. deterministic re-derivation inside verifiable encryption).

use aes::{
	cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit},
	Aes128,
};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

use crate::{arith::Modulus, hashing::sha256};

/// Extra bits sampled beyond the modulus size before reducing, making the
/// modular bias statistically negligible.
pub const STAT_MARGIN_BITS: u64 = 64;

pub struct DrbgAesCtr {
	cipher: Aes128,
	counter: [u8; 16],
	/// Unconsumed tail of the last keystream block
	pending: [u8; 16],
	pending_len: usize,
}

impl DrbgAesCtr {
	/// A 32-byte seed is used directly as key || counter; anything else is
	/// first mixed through the reseed path.
	pub fn new(seed: &[u8]) -> Self {
		if seed.len() == 32 {
			Self::from_key_counter(
				seed[..16].try_into().expect("sized"),
				seed[16..].try_into().expect("sized"),
			)
		} else {
			let mut drbg = Self::from_key_counter([0; 16], [0; 16]);
			drbg.reseed(seed);
			drbg
		}
	}

	fn from_key_counter(key: [u8; 16], counter: [u8; 16]) -> Self {
		DrbgAesCtr {
			cipher: Aes128::new(GenericArray::from_slice(&key)),
			counter,
			pending: [0; 16],
			pending_len: 0,
		}
	}

	/// Mix fresh entropy into the state: hash the next keystream block
	/// together with the input and restart from the result.
	pub fn reseed(&mut self, input: &[u8]) {
		let old = self.gen_block();
		let hash = sha256(&[&old, input]);
		*self = Self::from_key_counter(
			hash[..16].try_into().expect("sized"),
			hash[16..].try_into().expect("sized"),
		);
	}

	fn gen_block(&mut self) -> [u8; 16] {
		let mut block = GenericArray::clone_from_slice(&self.counter);
		self.cipher.encrypt_block(&mut block);
		// Big-endian increment across the whole counter block
		for byte in self.counter.iter_mut().rev() {
			let (v, overflow) = byte.overflowing_add(1);
			*byte = v;
			if !overflow {
				break
			}
		}
		block.into()
	}

	pub fn gen_bytes(&mut self, n: usize) -> Vec<u8> {
		let mut out = vec![0u8; n];
		self.fill_bytes(&mut out);
		out
	}

	pub fn gen_bytes16(&mut self) -> [u8; 16] {
		let mut out = [0u8; 16];
		self.fill_bytes(&mut out);
		out
	}

	/// A number of exactly the requested bit width (excess top bits of the
	/// generated bytes are cleared).
	pub fn gen_biguint_bits(&mut self, bits: u64) -> BigUint {
		let n = ((bits + 7) / 8) as usize;
		let mut bytes = self.gen_bytes(n);
		let excess = (8 - (bits % 8) as u32) % 8;
		if !bytes.is_empty() {
			bytes[0] &= 0xffu8 >> excess;
		}
		BigUint::from_bytes_be(&bytes)
	}

	/// Uniform below the modulus, with the 64-bit statistical margin.
	pub fn gen_biguint_below(&mut self, modulus: &Modulus) -> BigUint {
		let wide = self.gen_biguint_bits(modulus.bits() + STAT_MARGIN_BITS);
		modulus.reduce_vartime(&wide)
	}
}

impl RngCore for DrbgAesCtr {
	fn next_u32(&mut self) -> u32 {
		let mut bytes = [0u8; 4];
		self.fill_bytes(&mut bytes);
		u32::from_be_bytes(bytes)
	}

	fn next_u64(&mut self) -> u64 {
		let mut bytes = [0u8; 8];
		self.fill_bytes(&mut bytes);
		u64::from_be_bytes(bytes)
	}

	fn fill_bytes(&mut self, dest: &mut [u8]) {
		let mut filled = 0;
		while filled < dest.len() {
			if self.pending_len == 0 {
				self.pending = self.gen_block();
				self.pending_len = 16;
			}
			let take = self.pending_len.min(dest.len() - filled);
			let start = 16 - self.pending_len;
			dest[filled..filled + take].copy_from_slice(&self.pending[start..start + take]);
			self.pending_len -= take;
			filled += take;
		}
	}

	fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
		self.fill_bytes(dest);
		Ok(())
	}
}

impl CryptoRng for DrbgAesCtr {}

#[cfg(test)]
mod tests {
	use super::*;
	use num_traits::One;

	#[test]
	fn deterministic_for_equal_seeds() {
		let seed = [42u8; 32];
		let mut a = DrbgAesCtr::new(&seed);
		let mut b = DrbgAesCtr::new(&seed);
		assert_eq!(a.gen_bytes(100), b.gen_bytes(100));
	}

	#[test]
	fn chunked_reads_match_bulk_reads() {
		let seed = [7u8; 32];
		let mut bulk = DrbgAesCtr::new(&seed);
		let expected = bulk.gen_bytes(50);

		let mut chunked = DrbgAesCtr::new(&seed);
		let mut out = Vec::new();
		for n in [1usize, 2, 3, 4, 10, 30] {
			out.extend(chunked.gen_bytes(n));
		}
		assert_eq!(out, expected);
	}

	#[test]
	fn short_seed_goes_through_reseed() {
		let mut a = DrbgAesCtr::new(b"seed");
		let mut b = DrbgAesCtr::new(b"seed");
		let mut c = DrbgAesCtr::new(b"another");
		let x = a.gen_bytes(32);
		assert_eq!(x, b.gen_bytes(32));
		assert_ne!(x, c.gen_bytes(32));
	}

	#[test]
	fn sampled_numbers_are_in_range() {
		use num_bigint::BigUint;
		let modulus =
			Modulus::new((BigUint::one() << 255u32) - BigUint::from(19u32)).unwrap();
		let mut drbg = DrbgAesCtr::new(&[1u8; 32]);
		for _ in 0..20 {
			assert!(&drbg.gen_biguint_below(&modulus) < modulus.value());
		}
	}

	#[test]
	fn bit_width_is_respected() {
		let mut drbg = DrbgAesCtr::new(&[2u8; 32]);
		for bits in [1u64, 7, 8, 9, 64, 100, 255] {
			assert!(drbg.gen_biguint_bits(bits).bits() <= bits);
		}
	}
}
