//! Hashing, HMAC, key derivation, the AES-CTR DRBG and the random-oracle
//! layer built on top of them.

pub mod drbg;
pub mod ro;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use sha3::Sha3_256;

pub type HmacSha256 = Hmac<Sha256>;

pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
	let mut hasher = Sha256::new();
	for part in parts {
		hasher.update(part);
	}
	hasher.finalize().into()
}

pub fn sha512(parts: &[&[u8]]) -> [u8; 64] {
	let mut hasher = Sha512::new();
	for part in parts {
		hasher.update(part);
	}
	hasher.finalize().into()
}

pub fn sha3_256(parts: &[&[u8]]) -> [u8; 32] {
	let mut hasher = Sha3_256::new();
	for part in parts {
		hasher.update(part);
	}
	hasher.finalize().into()
}

pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
	let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key size");
	for part in parts {
		mac.update(part);
	}
	mac.finalize().into_bytes().into()
}

pub fn pbkdf2_sha256(password: &[u8], salt: &[u8], rounds: u32, out_len: usize) -> Vec<u8> {
	let mut out = vec![0u8; out_len];
	pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, &mut out);
	out
}

/// AES-256-GCM with the associated data authenticated alongside the
/// plaintext (the 16-byte tag is appended to the ciphertext).
pub fn aes_gcm_encrypt(key: &[u8; 32], iv: &[u8], aad: &[u8], plain: &[u8]) -> Vec<u8> {
	use aes_gcm::{
		aead::{Aead, Payload},
		Aes256Gcm, KeyInit, Nonce,
	};
	let cipher = Aes256Gcm::new(key.into());
	cipher
		.encrypt(Nonce::from_slice(iv), Payload { msg: plain, aad })
		.expect("gcm encryption is infallible for in-range inputs")
}

pub fn aes_gcm_decrypt(
	key: &[u8; 32],
	iv: &[u8],
	aad: &[u8],
	cipher_text: &[u8],
) -> crate::error::Result<Vec<u8>> {
	use aes_gcm::{
		aead::{Aead, Payload},
		Aes256Gcm, KeyInit, Nonce,
	};
	let cipher = Aes256Gcm::new(key.into());
	cipher
		.decrypt(Nonce::from_slice(iv), Payload { msg: cipher_text, aad })
		.map_err(|_| crate::error::Error::Crypto("authenticated decryption failed"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sha256_matches_known_vector() {
		// SHA-256("abc")
		assert_eq!(
			hex::encode(sha256(&[b"abc"])),
			"ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
		);
		// Split input must hash identically
		assert_eq!(sha256(&[b"ab", b"c"]), sha256(&[b"abc"]));
	}

	#[test]
	fn hmac_matches_rfc4231_case_2() {
		assert_eq!(
			hex::encode(hmac_sha256(b"Jefe", &[b"what do ya want for nothing?"])),
			"5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
		);
	}

	#[test]
	fn pbkdf2_matches_rfc7914_style_vector() {
		// RFC 7914 §11 test vector for PBKDF2-HMAC-SHA-256
		let out = pbkdf2_sha256(b"passwd", b"salt", 1, 64);
		assert_eq!(
			hex::encode(&out[..32]),
			"55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
		);
	}
}
