//! Random-oracle layer: an HMAC-SHA-256 state under a hardwired key, fed
//! with length-prefixed encodings of the inputs, finalised into byte
//! strings, numbers modulo a given modulus, or curve points (the latter via
//! `curve::hash_to_point`). Seeds are always inputs to the keyed HMAC,
//! never the key itself.

use hmac::Mac;
use num_bigint::BigUint;

use crate::{
	arith::Modulus,
	hashing::{drbg::DrbgAesCtr, HmacSha256},
};

/// Hardwired random-oracle key (16 bytes).
const RO_KEY: &[u8; 16] = b"mpc-crypto/ro-v1";

/// Types that can be absorbed into the random-oracle transcript. Encodings
/// are length-prefixed so that adjacent fields cannot be re-partitioned.
pub trait RoEncode {
	fn ro_encode(&self, state: &mut RoState);
}

pub struct RoState {
	mac: HmacSha256,
}

impl Clone for RoState {
	fn clone(&self) -> Self {
		RoState { mac: self.mac.clone() }
	}
}

impl RoState {
	pub fn update_len(&mut self, len: usize) {
		self.mac.update(&(len as u32).to_be_bytes());
	}

	pub fn update(&mut self, bytes: &[u8]) {
		self.mac.update(bytes);
	}

	pub fn update_sized(&mut self, bytes: &[u8]) {
		self.update_len(bytes.len());
		self.update(bytes);
	}
}

/// Bare bytes are absorbed raw; framing comes from the containing slice
/// or array encoding, so `&[u8]` still hashes as one length-prefixed blob.
impl RoEncode for u8 {
	fn ro_encode(&self, state: &mut RoState) {
		state.update(&[*self]);
	}
}

impl<const N: usize> RoEncode for [u8; N] {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_sized(self);
	}
}

impl RoEncode for str {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_sized(self.as_bytes());
	}
}

impl RoEncode for u32 {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_len(4);
		state.update(&self.to_be_bytes());
	}
}

impl RoEncode for u64 {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_len(8);
		state.update(&self.to_be_bytes());
	}
}

impl RoEncode for i32 {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_len(4);
		state.update(&self.to_be_bytes());
	}
}

impl RoEncode for BigUint {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_sized(&self.to_bytes_be());
	}
}

impl<T: RoEncode> RoEncode for [T] {
	fn ro_encode(&self, state: &mut RoState) {
		state.update_len(self.len());
		for item in self {
			item.ro_encode(state);
		}
	}
}

impl<T: RoEncode> RoEncode for Vec<T> {
	fn ro_encode(&self, state: &mut RoState) {
		self.as_slice().ro_encode(state);
	}
}

impl<T: RoEncode + ?Sized> RoEncode for &T {
	fn ro_encode(&self, state: &mut RoState) {
		(**self).ro_encode(state);
	}
}

/// Builder for one oracle invocation.
pub struct Ro {
	state: RoState,
}

impl Clone for Ro {
	fn clone(&self) -> Self {
		Ro { state: self.state.clone() }
	}
}

impl Default for Ro {
	fn default() -> Self {
		Self::new()
	}
}

impl Ro {
	pub fn new() -> Self {
		let mac = HmacSha256::new_from_slice(RO_KEY).expect("hmac accepts any key size");
		Ro { state: RoState { mac } }
	}

	pub fn feed<T: RoEncode + ?Sized>(mut self, value: &T) -> Self {
		value.ro_encode(&mut self.state);
		self
	}

	/// Append raw bytes without a length prefix; used for session-id and
	/// party-id binding where the caller controls framing.
	pub fn feed_raw(mut self, bytes: &[u8]) -> Self {
		self.state.update(bytes);
		self
	}

	pub fn state_mut(&mut self) -> &mut RoState {
		&mut self.state
	}

	fn finalize(self) -> [u8; 32] {
		self.state.mac.finalize().into_bytes().into()
	}

	/// First ⌈bits/8⌉ bytes of the output; beyond 256 bits the digest seeds
	/// a DRBG and the stream is extended.
	pub fn bits(self, bits: usize) -> Vec<u8> {
		let digest = self.finalize();
		let bytes = (bits + 7) / 8;
		if bytes <= 32 {
			digest[..bytes].to_vec()
		} else {
			drbg_sample_string(&digest, bits)
		}
	}

	pub fn bits128(self) -> [u8; 16] {
		self.finalize()[..16].try_into().expect("sized")
	}

	pub fn bits256(self) -> [u8; 32] {
		self.finalize()
	}

	/// A number modulo m with the standard 64-bit statistical margin.
	pub fn number_mod(self, modulus: &Modulus) -> BigUint {
		drbg_sample_number(&self.finalize(), modulus)
	}

	/// l numbers modulo m, each independently sampled with the margin.
	pub fn numbers_mod(self, modulus: &Modulus, l: usize) -> Vec<BigUint> {
		let digest = self.finalize();
		let bits_per_value = modulus.bits() + super::drbg::STAT_MARGIN_BITS;
		let bytes_per_value = ((bits_per_value + 7) / 8) as usize;
		let mut drbg = DrbgAesCtr::new(&digest);
		let stream = drbg.gen_bytes(bytes_per_value * l);
		stream
			.chunks(bytes_per_value)
			.map(|chunk| modulus.reduce_vartime(&BigUint::from_bytes_be(chunk)))
			.collect()
	}
}

pub fn drbg_sample_string(seed: &[u8], bits: usize) -> Vec<u8> {
	let mut drbg = DrbgAesCtr::new(seed);
	drbg.gen_bytes((bits + 7) / 8)
}

pub fn drbg_sample_number(seed: &[u8], modulus: &Modulus) -> BigUint {
	let mut drbg = DrbgAesCtr::new(seed);
	drbg.gen_biguint_below(modulus)
}

/// Extract bit i (little-endian bit order within the byte string).
pub fn bit_of(bytes: &[u8], i: usize) -> bool {
	(bytes[i / 8] >> (i % 8)) & 1 == 1
}

#[cfg(test)]
mod tests {
	use super::*;
	use num_bigint::BigUint;
	use num_traits::One;

	#[test]
	fn framing_separates_adjacent_fields() {
		let a = Ro::new().feed(b"ab".as_slice()).feed(b"c".as_slice()).bits256();
		let b = Ro::new().feed(b"a".as_slice()).feed(b"bc".as_slice()).bits256();
		assert_ne!(a, b);
	}

	#[test]
	fn output_is_deterministic() {
		let a = Ro::new().feed(b"input".as_slice()).feed(&7u32).bits(512);
		let b = Ro::new().feed(b"input".as_slice()).feed(&7u32).bits(512);
		assert_eq!(a, b);
		assert_eq!(a.len(), 64);
	}

	#[test]
	fn long_outputs_extend_the_short_prefix() {
		let short = Ro::new().feed(b"x".as_slice()).bits(128);
		let full = Ro::new().feed(b"x".as_slice()).bits(256);
		assert_eq!(short, full[..16]);
	}

	#[test]
	fn numbers_are_reduced() {
		let modulus = Modulus::new((BigUint::one() << 127u32) - BigUint::one()).unwrap();
		let n = Ro::new().feed(b"n".as_slice()).number_mod(&modulus);
		assert!(&n < modulus.value());

		let many = Ro::new().feed(b"n".as_slice()).numbers_mod(&modulus, 5);
		assert_eq!(many.len(), 5);
		assert!(many.iter().all(|v| v < modulus.value()));
	}

	#[test]
	fn bit_extraction() {
		let bytes = [0b0000_0101u8, 0b1000_0000];
		assert!(bit_of(&bytes, 0));
		assert!(!bit_of(&bytes, 1));
		assert!(bit_of(&bytes, 2));
		assert!(bit_of(&bytes, 15));
	}
}
