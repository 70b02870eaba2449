//! Recipient keys for verifiable encryption: RSA-KEM, ECIES over P-256,
//! or a hybrid of both (secure while either primitive stands).
//!
//! Encryption is driven by a DRBG so that a verifier can re-derive the
//! exact ciphertext from the revealed seed; the label is bound as
//! associated data throughout.

use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
	curve::{p256, scalar_from_drbg, ECPoint, ECScalar},
	encoding::{ByteReader, ByteWriter},
	error::{Error, Result},
	hashing::{aes_gcm_decrypt, aes_gcm_encrypt, drbg::DrbgAesCtr, ro::Ro},
	Rng,
};

const RSA_BITS: usize = 2048;
const GCM_IV_SIZE: usize = 12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecipientPublicKey {
	RsaKem(RsaPublicKey),
	Ecies(p256::Point),
	Hybrid { rsa: RsaPublicKey, ecies: p256::Point },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RecipientPrivateKey {
	RsaKem(RsaPrivateKey),
	Ecies(p256::Scalar),
	Hybrid { rsa: RsaPrivateKey, ecies: p256::Scalar },
}

fn derive_gcm_key(shared: &[u8], label: &[u8]) -> [u8; 32] {
	Ro::new().feed("pve-base-key").feed(shared).feed(label).bits256()
}

fn rsa_kem_encrypt(
	pk: &RsaPublicKey,
	label: &[u8],
	plain: &[u8],
	drbg: &mut DrbgAesCtr,
	writer: &mut ByteWriter,
) {
	let kek = drbg.gen_bytes(32);
	let wrapped = pk
		.encrypt(drbg, Oaep::new::<Sha256>(), &kek)
		.expect("oaep accepts a 32-byte payload");
	let iv = drbg.gen_bytes(GCM_IV_SIZE);
	let c = aes_gcm_encrypt(&derive_gcm_key(&kek, label), &iv, label, plain);
	writer.write_bytes(&wrapped);
	writer.write_bytes(&iv);
	writer.write_bytes(&c);
}

fn rsa_kem_decrypt(sk: &RsaPrivateKey, label: &[u8], reader: &mut ByteReader) -> Result<Vec<u8>> {
	let wrapped = reader.read_bytes()?;
	let iv = reader.read_bytes()?;
	let c = reader.read_bytes()?;
	let kek = sk
		.decrypt(Oaep::new::<Sha256>(), &wrapped)
		.map_err(|_| Error::Crypto("rsa kem unwrap failed"))?;
	aes_gcm_decrypt(&derive_gcm_key(&kek, label), &iv, label, &c)
}

fn ecies_encrypt(
	pk: &p256::Point,
	label: &[u8],
	plain: &[u8],
	drbg: &mut DrbgAesCtr,
	writer: &mut ByteWriter,
) {
	let eph = scalar_from_drbg::<p256::Point>(drbg);
	let eph_point = p256::Point::from_scalar(&eph);
	let shared = pk.mul(&eph);

	let iv = drbg.gen_bytes(GCM_IV_SIZE);
	let c = aes_gcm_encrypt(&derive_gcm_key(&shared.to_bytes(), label), &iv, label, plain);
	writer.write_bytes(&eph_point.to_bytes());
	writer.write_bytes(&iv);
	writer.write_bytes(&c);
}

fn ecies_decrypt(sk: &p256::Scalar, label: &[u8], reader: &mut ByteReader) -> Result<Vec<u8>> {
	let eph_point = p256::Point::from_bytes(&reader.read_bytes()?)?;
	let iv = reader.read_bytes()?;
	let c = reader.read_bytes()?;
	let shared = eph_point.mul(sk);
	aes_gcm_decrypt(&derive_gcm_key(&shared.to_bytes(), label), &iv, label, &c)
}

impl RecipientPublicKey {
	/// Deterministic encryption under a seed: the verifier of a PVE row
	/// recomputes this exact ciphertext from the revealed seed.
	pub fn encrypt_with_seed(&self, label: &[u8], plain: &[u8], seed: &[u8]) -> Vec<u8> {
		let mut drbg = DrbgAesCtr::new(seed);
		self.encrypt_with_drbg(label, plain, &mut drbg)
	}

	pub fn encrypt_with_drbg(
		&self,
		label: &[u8],
		plain: &[u8],
		drbg: &mut DrbgAesCtr,
	) -> Vec<u8> {
		let mut writer = ByteWriter::new();
		match self {
			RecipientPublicKey::RsaKem(pk) =>
				rsa_kem_encrypt(pk, label, plain, drbg, &mut writer),
			RecipientPublicKey::Ecies(pk) => ecies_encrypt(pk, label, plain, drbg, &mut writer),
			RecipientPublicKey::Hybrid { rsa, ecies } => {
				// Inner ECIES layer wrapped by the RSA KEM layer: breaking
				// the encryption requires breaking both
				let mut inner = ByteWriter::new();
				ecies_encrypt(ecies, label, plain, drbg, &mut inner);
				rsa_kem_encrypt(rsa, label, &inner.into_bytes(), drbg, &mut writer);
			},
		}
		writer.into_bytes()
	}
}

impl RecipientPrivateKey {
	pub fn generate_rsa(rng: &mut Rng) -> Self {
		RecipientPrivateKey::RsaKem(
			RsaPrivateKey::new(rng, RSA_BITS).expect("rsa key generation"),
		)
	}

	pub fn generate_ecies(rng: &mut Rng) -> Self {
		RecipientPrivateKey::Ecies(<p256::Point as ECPoint>::Scalar::random(rng))
	}

	pub fn generate_hybrid(rng: &mut Rng) -> Self {
		RecipientPrivateKey::Hybrid {
			rsa: RsaPrivateKey::new(rng, RSA_BITS).expect("rsa key generation"),
			ecies: <p256::Point as ECPoint>::Scalar::random(rng),
		}
	}

	pub fn public(&self) -> RecipientPublicKey {
		match self {
			RecipientPrivateKey::RsaKem(sk) => RecipientPublicKey::RsaKem(sk.to_public_key()),
			RecipientPrivateKey::Ecies(sk) =>
				RecipientPublicKey::Ecies(p256::Point::from_scalar(sk)),
			RecipientPrivateKey::Hybrid { rsa, ecies } => RecipientPublicKey::Hybrid {
				rsa: rsa.to_public_key(),
				ecies: p256::Point::from_scalar(ecies),
			},
		}
	}

	pub fn decrypt(&self, label: &[u8], cipher_text: &[u8]) -> Result<Vec<u8>> {
		let mut reader = ByteReader::new(cipher_text);
		let plain = match self {
			RecipientPrivateKey::RsaKem(sk) => rsa_kem_decrypt(sk, label, &mut reader)?,
			RecipientPrivateKey::Ecies(sk) => ecies_decrypt(sk, label, &mut reader)?,
			RecipientPrivateKey::Hybrid { rsa, ecies } => {
				let inner = rsa_kem_decrypt(rsa, label, &mut reader)?;
				let mut inner_reader = ByteReader::new(&inner);
				let plain = ecies_decrypt(ecies, label, &mut inner_reader)?;
				inner_reader.finish()?;
				plain
			},
		};
		reader.finish()?;
		Ok(plain)
	}
}
