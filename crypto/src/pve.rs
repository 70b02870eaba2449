//! Publicly verifiable encryption (PVE): a ciphertext binding a curve
//! scalar x to its public point Q = x G, decryptable by the recipient key
//! and verifiable by anyone.
//!
//! Each of the 128 rows splits x into x0 + x1, encrypts both halves under
//! the recipient key (all row randomness expanded from 16-byte seeds), and
//! reveals one half according to the challenge bit string derived from the
//! whole transcript. A cheating encryptor is caught per row with
//! probability one half.

pub mod batch;
pub mod quorum;
pub mod recipient;

use serde::{Deserialize, Serialize};

use crate::{
	curve::{scalar_from_drbg, ECPoint, ECScalar},
	error::{ensure_crypto, Error, Result},
	hashing::{drbg::DrbgAesCtr, ro::bit_of, ro::Ro, sha256},
	Rng,
};

pub use recipient::{RecipientPrivateKey, RecipientPublicKey};

/// Number of cut-and-choose rows; detection probability 1 - 2^-128.
pub const KAPPA: usize = 128;

/// Seed size for per-row randomness expansion.
pub const SEED_SIZE: usize = 16;

/// Seed size of the randomness handed to the base encryption scheme.
pub(crate) const RHO_SIZE: usize = 32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
struct PveRow<P: ECPoint> {
	/// Seed of the unrevealed half's randomness
	r: Vec<u8>,
	/// Ciphertext of the half that stays hidden
	c: Vec<u8>,
	/// Revealed x1 when the challenge bit is set
	x: Option<P::Scalar>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PveCiphertext<P: ECPoint> {
	q: P,
	label: Vec<u8>,
	/// Challenge bit string (κ bits)
	b: Vec<u8>,
	rows: Vec<PveRow<P>>,
}

/// The per-instance label folds in the public point so that rows cannot be
/// replayed across instances.
pub(crate) fn inner_label(label: &[u8], q_encoding: &[u8]) -> Vec<u8> {
	let mut out = label.to_vec();
	out.push(b'-');
	out.extend_from_slice(hex::encode(sha256(&[q_encoding])).as_bytes());
	out
}

fn challenge<P: ECPoint>(
	q: &P,
	label: &[u8],
	c0: &[Vec<u8>],
	c1: &[Vec<u8>],
	x0: &[P],
	x1: &[P],
) -> Vec<u8> {
	Ro::new()
		.feed(q)
		.feed(label)
		.feed(c0)
		.feed(c1)
		.feed(x0)
		.feed(x1)
		.bits(KAPPA)
}

impl<P: ECPoint> PveCiphertext<P> {
	pub fn encrypt(
		key: &RecipientPublicKey,
		label: &[u8],
		x: &P::Scalar,
		rng: &mut Rng,
	) -> Self {
		use rand::RngCore;

		let q = P::from_scalar(x);
		let inner = inner_label(label, &q.to_bytes());

		let mut r0 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut r1 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);
		let mut x1_values = Vec::with_capacity(KAPPA);

		for i in 0..KAPPA {
			rng.fill_bytes(&mut r0[i]);
			rng.fill_bytes(&mut r1[i]);

			let mut drbg0 = DrbgAesCtr::new(&r0[i]);
			let x0 = scalar_from_drbg::<P>(&mut drbg0);
			let rho0 = drbg0.gen_bytes(RHO_SIZE);

			let mut drbg1 = DrbgAesCtr::new(&r1[i]);
			let rho1 = drbg1.gen_bytes(RHO_SIZE);

			let x1 = x.clone() - &x0;

			c0.push(key.encrypt_with_seed(&inner, &x0.to_bytes(), &rho0));
			c1.push(key.encrypt_with_seed(&inner, &x1.to_bytes(), &rho1));

			let x0_point = P::from_scalar(&x0);
			x1_points.push(q - x0_point);
			x0_points.push(x0_point);
			x1_values.push(x1);
		}

		let b = challenge(&q, label, &c0, &c1, &x0_points, &x1_points);

		let rows = (0..KAPPA)
			.map(|i| {
				if bit_of(&b, i) {
					PveRow {
						r: r1[i].to_vec(),
						c: std::mem::take(&mut c0[i]),
						x: Some(x1_values[i].clone()),
					}
				} else {
					PveRow { r: r0[i].to_vec(), c: std::mem::take(&mut c1[i]), x: None }
				}
			})
			.collect();

		PveCiphertext { q, label: label.to_vec(), b, rows }
	}

	/// Public verification: reconstruct the hidden halves from the
	/// revealed seeds and check the challenge hash.
	pub fn verify(&self, key: &RecipientPublicKey, q: &P, label: &[u8]) -> Result<()> {
		ensure_crypto!(q == &self.q, "public point mismatch");
		ensure_crypto!(label == self.label, "label mismatch");
		ensure_crypto!(self.rows.len() == KAPPA, "wrong row count");
		ensure_crypto!(self.b.len() == KAPPA / 8, "wrong challenge size");
		let inner = inner_label(label, &q.to_bytes());

		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);

		for (i, row) in self.rows.iter().enumerate() {
			ensure_crypto!(row.r.len() == SEED_SIZE, "bad seed size");
			let bi = bit_of(&self.b, i);

			let mut drbg = DrbgAesCtr::new(&row.r);
			let xi = if bi {
				row.x.clone().ok_or(Error::Crypto("missing revealed value"))?
			} else {
				ensure_crypto!(row.x.is_none(), "unexpected revealed value");
				scalar_from_drbg::<P>(&mut drbg)
			};
			let rho = drbg.gen_bytes(RHO_SIZE);

			let xi_point = P::from_scalar(&xi);
			let other_point = *q - xi_point;
			let ci = key.encrypt_with_seed(&inner, &xi.to_bytes(), &rho);

			if bi {
				// The revealed half is x1: the recomputed data is the
				// "one" side, the transmitted ciphertext the "zero" side
				c0.push(row.c.clone());
				c1.push(ci);
				x0_points.push(other_point);
				x1_points.push(xi_point);
			} else {
				c0.push(ci);
				c1.push(row.c.clone());
				x0_points.push(xi_point);
				x1_points.push(other_point);
			}
		}

		let expected = challenge(q, label, &c0, &c1, &x0_points, &x1_points);
		ensure_crypto!(expected == self.b, "challenge mismatch");
		Ok(())
	}

	/// Recover x from one decrypted row; checks x G = Q.
	fn restore_from_decrypted(&self, row_index: usize, decrypted: &[u8]) -> Result<P::Scalar> {
		let row = &self.rows[row_index];
		let x_hidden = P::Scalar::from_bytes(decrypted)?;

		let x_revealed = if bit_of(&self.b, row_index) {
			row.x.clone().ok_or(Error::Crypto("missing revealed value"))?
		} else {
			let mut drbg = DrbgAesCtr::new(&row.r);
			scalar_from_drbg::<P>(&mut drbg)
		};

		let x = x_hidden + x_revealed;
		ensure_crypto!(P::from_scalar(&x) == self.q, "restored value does not match Q");
		Ok(x)
	}

	/// Decrypt with the recipient key; any single well-formed row
	/// suffices. Verification runs first unless explicitly skipped.
	pub fn decrypt(
		&self,
		key: &RecipientPrivateKey,
		label: &[u8],
		skip_verify: bool,
	) -> Result<P::Scalar> {
		if !skip_verify {
			self.verify(&key.public(), &self.q, label)?;
		}
		let inner = inner_label(label, &self.q.to_bytes());

		for i in 0..self.rows.len() {
			let Ok(decrypted) = key.decrypt(&inner, &self.rows[i].c) else { continue };
			if let Ok(x) = self.restore_from_decrypted(i, &decrypted) {
				return Ok(x)
			}
		}
		Err(Error::Crypto("no row could be decrypted"))
	}

	pub fn public_point(&self) -> &P {
		&self.q
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::p256::Point;
	use rand::SeedableRng;

	type Scalar = <Point as ECPoint>::Scalar;

	#[test]
	fn encrypt_verify_decrypt_with_ecies() {
		let mut rng = Rng::from_seed([170; 32]);
		let key = RecipientPrivateKey::generate_ecies(&mut rng);
		let x = Scalar::random(&mut rng);
		let q = Point::from_scalar(&x);

		let pve = PveCiphertext::encrypt(&key.public(), b"backup", &x, &mut rng);
		pve.verify(&key.public(), &q, b"backup").unwrap();
		assert_eq!(pve.decrypt(&key, b"backup", false).unwrap(), x);
	}

	#[test]
	fn verification_rejects_any_corruption() {
		let mut rng = Rng::from_seed([171; 32]);
		let key = RecipientPrivateKey::generate_ecies(&mut rng);
		let x = Scalar::random(&mut rng);
		let q = Point::from_scalar(&x);
		let pve = PveCiphertext::encrypt(&key.public(), b"l", &x, &mut rng);

		// Wrong statement point
		let other = Point::from_scalar(&Scalar::random(&mut rng));
		assert!(pve.verify(&key.public(), &other, b"l").is_err());
		// Wrong label
		assert!(pve.verify(&key.public(), &q, b"m").is_err());

		// Flipped challenge bit
		let mut bad = pve.clone();
		bad.b[0] ^= 1;
		assert!(matches!(bad.verify(&key.public(), &q, b"l"), Err(Error::Crypto(_))));

		// Corrupted row seed
		let mut bad = pve.clone();
		bad.rows[3].r[0] ^= 1;
		assert!(bad.verify(&key.public(), &q, b"l").is_err());

		// Corrupted row ciphertext
		let mut bad = pve.clone();
		let len = bad.rows[5].c.len();
		bad.rows[5].c[len - 1] ^= 1;
		assert!(bad.verify(&key.public(), &q, b"l").is_err());

		// Corrupted revealed value
		let mut bad = pve;
		for row in bad.rows.iter_mut() {
			if let Some(x) = &mut row.x {
				*x = x.clone() + Scalar::from(1);
				break
			}
		}
		assert!(bad.verify(&key.public(), &q, b"l").is_err());
	}

	#[test]
	fn decryption_under_the_wrong_key_fails() {
		let mut rng = Rng::from_seed([172; 32]);
		let key = RecipientPrivateKey::generate_ecies(&mut rng);
		let wrong = RecipientPrivateKey::generate_ecies(&mut rng);
		let x = Scalar::random(&mut rng);

		let pve = PveCiphertext::<Point>::encrypt(&key.public(), b"l", &x, &mut rng);
		assert!(pve.decrypt(&wrong, b"l", true).is_err());
	}
}
