//! Quorum PVE: verifiable encryption of scalars decryptable by any quorum
//! of an access structure.
//!
//! Each row derives a symmetric row key K, secret-shares it over the
//! access tree with every leaf share encrypted under that leaf's recipient
//! key, and wraps the row payload with AES-GCM keyed from K. All row
//! randomness (including the sharing) is expanded from the transmitted
//! seeds, so verification re-derives the entire row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
	curve::{scalar_from_drbg, ECPoint, ECScalar},
	error::{ensure_arg, ensure_crypto, Error, Result},
	hashing::{aes_gcm_decrypt, aes_gcm_encrypt, drbg::DrbgAesCtr, ro::bit_of, ro::Ro, sha256},
	pve::{
		batch::{expand_x0, scalars_from_bin, scalars_to_bin},
		RecipientPrivateKey, RecipientPublicKey, KAPPA, SEED_SIZE,
	},
	sharing::AccessStructure,
	Rng,
};

const GCM_IV_BITS: usize = 96;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct QuorumRow {
	/// 16 bytes (r1) when the bit is set, 32 bytes (r01 || r02) otherwise
	r: Vec<u8>,
	/// The hidden half's AES-GCM row ciphertext
	c: Vec<u8>,
	/// The hidden half's per-leaf share ciphertexts, in sorted leaf order
	quorum_c: Vec<Vec<u8>>,
	/// Concatenated x1 values when the bit is set
	x_bin: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PveQuorumCiphertext<P: ECPoint> {
	q: Vec<P>,
	/// L = SHA-256(label, Q): the row label binding the instance
	l: Vec<u8>,
	b: Vec<u8>,
	rows: Vec<QuorumRow>,
}

fn instance_label<P: ECPoint>(label: &[u8], q: &[P]) -> Vec<u8> {
	let mut parts: Vec<&[u8]> = vec![label];
	let encodings: Vec<Vec<u8>> = q.iter().map(|point| point.to_bytes()).collect();
	for encoding in &encodings {
		parts.push(encoding);
	}
	sha256(&parts).to_vec()
}

/// Encrypt `plain` under a fresh row key K shared across the tree: the
/// per-leaf ciphertexts and the AES-GCM wrapping, all derived from `seed`.
fn encrypt_row<P: ECPoint>(
	ac: &AccessStructure,
	leaf_keys: &BTreeMap<String, RecipientPublicKey>,
	l: &[u8],
	seed: &[u8],
	plain: &[u8],
) -> (Vec<u8>, Vec<Vec<u8>>) {
	let mut drbg = DrbgAesCtr::new(seed);
	let k = scalar_from_drbg::<P>(&mut drbg);
	let k_shares = ac.share_with_drbg::<P>(&k, &mut drbg);

	let quorum_c = leaf_keys
		.iter()
		.map(|(name, pub_key)| {
			let share = &k_shares[name];
			pub_key.encrypt_with_drbg(l, &share.to_bytes(), &mut drbg)
		})
		.collect();

	let (key, iv) = row_key_iv::<P>(&k, l);
	let c = aes_gcm_encrypt(&key, &iv, l, plain);
	(c, quorum_c)
}

/// Expand K into the AES key and GCM IV: the 32-byte prefix is the key,
/// the remainder the IV.
fn row_key_iv<P: ECPoint>(k: &P::Scalar, l: &[u8]) -> ([u8; 32], Vec<u8>) {
	let k_and_iv = Ro::new().feed(k.to_bytes().as_slice()).feed(l).bits(256 + GCM_IV_BITS);
	let key: [u8; 32] = k_and_iv[..32].try_into().expect("sized");
	(key, k_and_iv[32..].to_vec())
}

fn challenge<P: ECPoint>(
	q: &[P],
	label: &[u8],
	c0: &[Vec<u8>],
	c1: &[Vec<u8>],
	quorum_c0: &[Vec<Vec<u8>>],
	quorum_c1: &[Vec<Vec<u8>>],
	x0: &[Vec<P>],
	x1: &[Vec<P>],
) -> Vec<u8> {
	Ro::new()
		.feed(q)
		.feed(label)
		.feed(c0)
		.feed(c1)
		.feed(quorum_c0)
		.feed(quorum_c1)
		.feed(x0)
		.feed(x1)
		.bits(KAPPA)
}

struct RowHalves<P: ECPoint> {
	xi: Vec<P::Scalar>,
	c: Vec<u8>,
	quorum_c: Vec<Vec<u8>>,
}

/// Re-derive the "zero" half of a row from its seeds.
fn derive_row0<P: ECPoint>(
	ac: &AccessStructure,
	leaf_keys: &BTreeMap<String, RecipientPublicKey>,
	l: &[u8],
	r01: &[u8],
	r02: &[u8],
	n: usize,
) -> RowHalves<P> {
	let xi = expand_x0::<P>(r01, n);
	let (c, quorum_c) = encrypt_row::<P>(ac, leaf_keys, l, r02, r01);
	RowHalves { xi, c, quorum_c }
}

impl<P: ECPoint> PveQuorumCiphertext<P> {
	pub fn encrypt(
		ac: &AccessStructure,
		leaf_keys: &BTreeMap<String, RecipientPublicKey>,
		label: &[u8],
		x: &[P::Scalar],
		rng: &mut Rng,
	) -> Result<Self> {
		use rand::RngCore;
		ensure_arg!(!x.is_empty(), "empty plaintext vector");
		ensure_arg!(
			leaf_keys.keys().cloned().collect::<std::collections::BTreeSet<_>>() ==
				ac.leaf_names(),
			"leaf keys do not match the access structure"
		);
		let n = x.len();

		let q: Vec<P> = x.iter().map(P::from_scalar).collect();
		let l = instance_label(label, &q);

		let mut r01 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut r02 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut r1 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut quorum_c0 = Vec::with_capacity(KAPPA);
		let mut quorum_c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);
		let mut x1_bins = Vec::with_capacity(KAPPA);

		for i in 0..KAPPA {
			rng.fill_bytes(&mut r01[i]);
			rng.fill_bytes(&mut r02[i]);
			rng.fill_bytes(&mut r1[i]);

			let row0 = derive_row0::<P>(ac, leaf_keys, &l, &r01[i], &r02[i], n);

			let x1: Vec<P::Scalar> =
				x.iter().zip(&row0.xi).map(|(x, x0)| x.clone() - x0).collect();
			let x1_bin = scalars_to_bin::<P>(&x1);
			let (row1_c, row1_quorum) =
				encrypt_row::<P>(ac, leaf_keys, &l, &r1[i], &x1_bin);

			let x0_p: Vec<P> = row0.xi.iter().map(P::from_scalar).collect();
			let x1_p: Vec<P> =
				q.iter().zip(&x0_p).map(|(q, x0_p)| *q - *x0_p).collect();

			c0.push(row0.c);
			quorum_c0.push(row0.quorum_c);
			c1.push(row1_c);
			quorum_c1.push(row1_quorum);
			x0_points.push(x0_p);
			x1_points.push(x1_p);
			x1_bins.push(x1_bin);
		}

		let b = challenge(&q, label, &c0, &c1, &quorum_c0, &quorum_c1, &x0_points, &x1_points);

		let rows = (0..KAPPA)
			.map(|i| {
				if bit_of(&b, i) {
					QuorumRow {
						r: r1[i].to_vec(),
						c: std::mem::take(&mut c0[i]),
						quorum_c: std::mem::take(&mut quorum_c0[i]),
						x_bin: Some(std::mem::take(&mut x1_bins[i])),
					}
				} else {
					let mut r = r01[i].to_vec();
					r.extend_from_slice(&r02[i]);
					QuorumRow {
						r,
						c: std::mem::take(&mut c1[i]),
						quorum_c: std::mem::take(&mut quorum_c1[i]),
						x_bin: None,
					}
				}
			})
			.collect();

		Ok(PveQuorumCiphertext { q, l, b, rows })
	}

	pub fn verify(
		&self,
		ac: &AccessStructure,
		leaf_keys: &BTreeMap<String, RecipientPublicKey>,
		q: &[P],
		label: &[u8],
	) -> Result<()> {
		ensure_crypto!(q == self.q, "public points mismatch");
		ensure_crypto!(self.rows.len() == KAPPA, "wrong row count");
		ensure_crypto!(self.b.len() == KAPPA / 8, "wrong challenge size");
		let l = instance_label(label, q);
		ensure_crypto!(l == self.l, "label mismatch");
		let n = q.len();

		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut quorum_c0 = Vec::with_capacity(KAPPA);
		let mut quorum_c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);

		for (i, row) in self.rows.iter().enumerate() {
			let bi = bit_of(&self.b, i);

			let xi = if bi {
				ensure_crypto!(row.r.len() == SEED_SIZE, "bad seed size");
				let x_bin =
					row.x_bin.as_ref().ok_or(Error::Crypto("missing revealed values"))?;
				let xi = scalars_from_bin::<P>(x_bin, n)?;

				let (row1_c, row1_quorum) =
					encrypt_row::<P>(ac, leaf_keys, &l, &row.r, x_bin);
				c0.push(row.c.clone());
				quorum_c0.push(row.quorum_c.clone());
				c1.push(row1_c);
				quorum_c1.push(row1_quorum);
				xi
			} else {
				ensure_crypto!(row.r.len() == 2 * SEED_SIZE, "bad seed size");
				ensure_crypto!(row.x_bin.is_none(), "unexpected revealed values");
				let (r01, r02) = row.r.split_at(SEED_SIZE);
				let row0 = derive_row0::<P>(ac, leaf_keys, &l, r01, r02, n);

				c0.push(row0.c);
				quorum_c0.push(row0.quorum_c);
				c1.push(row.c.clone());
				quorum_c1.push(row.quorum_c.clone());
				row0.xi
			};

			let xi_p: Vec<P> = xi.iter().map(P::from_scalar).collect();
			let other_p: Vec<P> =
				q.iter().zip(&xi_p).map(|(q, xi_p)| *q - *xi_p).collect();
			if bi {
				x0_points.push(other_p);
				x1_points.push(xi_p);
			} else {
				x0_points.push(xi_p);
				x1_points.push(other_p);
			}
		}

		let expected =
			challenge(q, label, &c0, &c1, &quorum_c0, &quorum_c1, &x0_points, &x1_points);
		ensure_crypto!(expected == self.b, "challenge mismatch");
		Ok(())
	}

	/// Reconstruct the row key K from a quorum's decrypted leaf shares and
	/// restore the plaintext vector from one row.
	fn restore_row(
		&self,
		ac: &AccessStructure,
		row_index: usize,
		decrypted_shares: &BTreeMap<String, Vec<u8>>,
	) -> Result<Vec<P::Scalar>> {
		let n = self.q.len();
		let row = &self.rows[row_index];

		let mut shares = BTreeMap::new();
		for (name, bytes) in decrypted_shares {
			shares.insert(name.clone(), P::Scalar::from_bytes(bytes)?);
		}
		let k = ac.reconstruct::<P>(&shares)?;

		let (key, iv) = row_key_iv::<P>(&k, &self.l);
		let decrypted = aes_gcm_decrypt(&key, &iv, &self.l, &row.c)?;

		let bi = bit_of(&self.b, row_index);
		let (x0_seed, x1_bin): (&[u8], &[u8]) = if bi {
			let x_bin =
				row.x_bin.as_ref().ok_or(Error::Crypto("missing revealed values"))?;
			(&decrypted, x_bin)
		} else {
			(&row.r[..SEED_SIZE], &decrypted)
		};
		ensure_crypto!(x0_seed.len() == SEED_SIZE, "bad mask seed");

		let x0 = expand_x0::<P>(x0_seed, n);
		let x1 = scalars_from_bin::<P>(x1_bin, n)?;
		let x: Vec<P::Scalar> =
			x0.into_iter().zip(x1).map(|(x0, x1)| x0 + x1).collect();
		for (x, q) in x.iter().zip(&self.q) {
			ensure_crypto!(&P::from_scalar(x) == q, "restored value does not match Q");
		}
		Ok(x)
	}

	/// Decrypt using a quorum of leaf private keys.
	pub fn decrypt(
		&self,
		ac: &AccessStructure,
		quorum_keys: &BTreeMap<String, RecipientPrivateKey>,
		leaf_keys: &BTreeMap<String, RecipientPublicKey>,
		label: &[u8],
		skip_verify: bool,
	) -> Result<Vec<P::Scalar>> {
		if !skip_verify {
			self.verify(ac, leaf_keys, &self.q, label)?;
		}

		let sorted_leaves: Vec<String> = ac.leaf_names().into_iter().collect();

		for (row_index, row) in self.rows.iter().enumerate() {
			let mut decrypted_shares = BTreeMap::new();
			for (name, key) in quorum_keys {
				let Some(leaf_index) = sorted_leaves.iter().position(|leaf| leaf == name)
				else {
					continue
				};
				let Some(cipher) = row.quorum_c.get(leaf_index) else { continue };
				if let Ok(share) = key.decrypt(&self.l, cipher) {
					decrypted_shares.insert(name.clone(), share);
				}
			}

			if let Ok(x) = self.restore_row(ac, row_index, &decrypted_shares) {
				return Ok(x)
			}
		}
		Err(Error::Crypto("no row could be restored"))
	}

	pub fn public_points(&self) -> &[P] {
		&self.q
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{curve::secp256k1::Point, sharing::NodeSpec};
	use rand::SeedableRng;

	type Scalar = <Point as ECPoint>::Scalar;

	fn sample_setup(
		rng: &mut Rng,
	) -> (AccessStructure, BTreeMap<String, RecipientPrivateKey>, BTreeMap<String, RecipientPublicKey>)
	{
		let ac = AccessStructure::new(NodeSpec::and(
			"",
			vec![
				NodeSpec::leaf("alpha"),
				NodeSpec::threshold(
					"quorum",
					2,
					vec![NodeSpec::leaf("n1"), NodeSpec::leaf("n2"), NodeSpec::leaf("n3")],
				),
			],
		))
		.unwrap();

		let private: BTreeMap<String, RecipientPrivateKey> = ac
			.leaf_names()
			.into_iter()
			.map(|name| (name, RecipientPrivateKey::generate_ecies(rng)))
			.collect();
		let public = private.iter().map(|(name, key)| (name.clone(), key.public())).collect();
		(ac, private, public)
	}

	#[test]
	fn quorum_round_trip() {
		let mut rng = Rng::from_seed([190; 32]);
		let (ac, private, public) = sample_setup(&mut rng);

		let x: Vec<Scalar> = (0..2).map(|_| Scalar::random(&mut rng)).collect();
		let q: Vec<Point> = x.iter().map(Point::from_scalar).collect();

		let pve = PveQuorumCiphertext::encrypt(&ac, &public, b"vault", &x, &mut rng).unwrap();
		pve.verify(&ac, &public, &q, b"vault").unwrap();

		// A sufficient quorum decrypts
		let quorum: BTreeMap<String, RecipientPrivateKey> = private
			.iter()
			.filter(|(name, _)| ["alpha", "n1", "n3"].contains(&name.as_str()))
			.map(|(name, key)| (name.clone(), key.clone()))
			.collect();
		assert_eq!(pve.decrypt(&ac, &quorum, &public, b"vault", false).unwrap(), x);

		// An insufficient subset does not
		let insufficient: BTreeMap<String, RecipientPrivateKey> = private
			.iter()
			.filter(|(name, _)| ["alpha", "n1"].contains(&name.as_str()))
			.map(|(name, key)| (name.clone(), key.clone()))
			.collect();
		assert!(pve.decrypt(&ac, &insufficient, &public, b"vault", true).is_err());
	}

	#[test]
	fn corruption_is_detected() {
		let mut rng = Rng::from_seed([191; 32]);
		let (ac, _, public) = sample_setup(&mut rng);
		let x = vec![Scalar::random(&mut rng)];
		let q: Vec<Point> = x.iter().map(Point::from_scalar).collect();
		let pve = PveQuorumCiphertext::encrypt(&ac, &public, b"l", &x, &mut rng).unwrap();

		let mut bad = pve.clone();
		bad.b[0] ^= 1;
		assert!(bad.verify(&ac, &public, &q, b"l").is_err());

		let mut bad = pve.clone();
		bad.rows[2].quorum_c[1][0] ^= 1;
		assert!(bad.verify(&ac, &public, &q, b"l").is_err());

		let mut bad = pve;
		bad.rows[1].c[0] ^= 1;
		assert!(bad.verify(&ac, &public, &q, b"l").is_err());
	}
}
