//! Batch PVE: verifiable encryption of a vector of scalars.
//!
//! The zero halves of all rows are expanded from a short seed that is what
//! actually gets encrypted, so the ciphertext grows with the vector only
//! through the revealed x1 halves.

use serde::{Deserialize, Serialize};

use crate::{
	curve::{scalar_from_drbg, ECPoint, ECScalar},
	error::{ensure_arg, ensure_crypto, Error, Result},
	hashing::{drbg::DrbgAesCtr, ro::bit_of, ro::Ro},
	pve::{inner_label, RecipientPrivateKey, RecipientPublicKey, KAPPA, RHO_SIZE, SEED_SIZE},
	Rng,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct BatchRow {
	/// Revealed seed(s): 16 bytes when the bit is set (r1), 32 bytes
	/// otherwise (r01 || r02)
	r: Vec<u8>,
	/// The hidden half's ciphertext
	c: Vec<u8>,
	/// Concatenated fixed-width x1 values when the bit is set
	x_bin: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PveBatchCiphertext<P: ECPoint> {
	q: Vec<P>,
	label: Vec<u8>,
	b: Vec<u8>,
	rows: Vec<BatchRow>,
}

fn points_encoding<P: ECPoint>(points: &[P]) -> Vec<u8> {
	let mut out = Vec::new();
	for point in points {
		out.extend_from_slice(&point.to_bytes());
	}
	out
}

/// Expand the mask vector x0 from its seed: one scalar per batch entry,
/// each with the statistical margin.
pub(crate) fn expand_x0<P: ECPoint>(seed: &[u8], n: usize) -> Vec<P::Scalar> {
	let mut drbg = DrbgAesCtr::new(seed);
	(0..n).map(|_| scalar_from_drbg::<P>(&mut drbg)).collect()
}

pub(crate) fn scalars_to_bin<P: ECPoint>(values: &[P::Scalar]) -> Vec<u8> {
	let mut out = Vec::with_capacity(values.len() * P::Scalar::SIZE);
	for value in values {
		out.extend_from_slice(&value.to_bytes());
	}
	out
}

pub(crate) fn scalars_from_bin<P: ECPoint>(bin: &[u8], n: usize) -> Result<Vec<P::Scalar>> {
	if bin.len() != n * P::Scalar::SIZE {
		return Err(Error::Format("bad scalar vector size"))
	}
	bin.chunks(P::Scalar::SIZE).map(P::Scalar::from_bytes).collect()
}

fn challenge<P: ECPoint>(
	q: &[P],
	label: &[u8],
	c0: &[Vec<u8>],
	c1: &[Vec<u8>],
	x0: &[Vec<P>],
	x1: &[Vec<P>],
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

impl<P: ECPoint> PveBatchCiphertext<P> {
	pub fn encrypt(
		key: &RecipientPublicKey,
		label: &[u8],
		x: &[P::Scalar],
		rng: &mut Rng,
	) -> Result<Self> {
		use rand::RngCore;
		ensure_arg!(!x.is_empty(), "empty plaintext vector");
		let n = x.len();

		let q: Vec<P> = x.iter().map(P::from_scalar).collect();
		let inner = inner_label(label, &points_encoding(&q));

		let mut r01 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut r02 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut r1 = vec![[0u8; SEED_SIZE]; KAPPA];
		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);
		let mut x1_bins = Vec::with_capacity(KAPPA);

		for i in 0..KAPPA {
			rng.fill_bytes(&mut r01[i]);
			rng.fill_bytes(&mut r02[i]);
			rng.fill_bytes(&mut r1[i]);

			let x0 = expand_x0::<P>(&r01[i], n);
			let rho0 = DrbgAesCtr::new(&r02[i]).gen_bytes(RHO_SIZE);
			let rho1 = DrbgAesCtr::new(&r1[i]).gen_bytes(RHO_SIZE);

			let x1: Vec<P::Scalar> =
				x.iter().zip(&x0).map(|(x, x0)| x.clone() - x0).collect();
			let x1_bin = scalars_to_bin::<P>(&x1);

			// The zero half encrypts only the seed of the mask vector
			c0.push(key.encrypt_with_seed(&inner, &r01[i], &rho0));
			c1.push(key.encrypt_with_seed(&inner, &x1_bin, &rho1));

			let x0_p: Vec<P> = x0.iter().map(P::from_scalar).collect();
			let x1_p: Vec<P> =
				q.iter().zip(&x0_p).map(|(q, x0_p)| *q - *x0_p).collect();
			x0_points.push(x0_p);
			x1_points.push(x1_p);
			x1_bins.push(x1_bin);
		}

		let b = challenge(&q, label, &c0, &c1, &x0_points, &x1_points);

		let rows = (0..KAPPA)
			.map(|i| {
				if bit_of(&b, i) {
					BatchRow {
						r: r1[i].to_vec(),
						c: std::mem::take(&mut c0[i]),
						x_bin: Some(std::mem::take(&mut x1_bins[i])),
					}
				} else {
					let mut r = r01[i].to_vec();
					r.extend_from_slice(&r02[i]);
					BatchRow { r, c: std::mem::take(&mut c1[i]), x_bin: None }
				}
			})
			.collect();

		Ok(PveBatchCiphertext { q, label: label.to_vec(), b, rows })
	}

	pub fn verify(&self, key: &RecipientPublicKey, q: &[P], label: &[u8]) -> Result<()> {
		ensure_crypto!(q == self.q, "public points mismatch");
		ensure_crypto!(label == self.label, "label mismatch");
		ensure_crypto!(self.rows.len() == KAPPA, "wrong row count");
		ensure_crypto!(self.b.len() == KAPPA / 8, "wrong challenge size");
		let n = q.len();
		let inner = inner_label(label, &points_encoding(q));

		let mut c0 = Vec::with_capacity(KAPPA);
		let mut c1 = Vec::with_capacity(KAPPA);
		let mut x0_points = Vec::with_capacity(KAPPA);
		let mut x1_points = Vec::with_capacity(KAPPA);

		for (i, row) in self.rows.iter().enumerate() {
			let bi = bit_of(&self.b, i);

			let xi: Vec<P::Scalar> = if bi {
				ensure_crypto!(row.r.len() == SEED_SIZE, "bad seed size");
				let x_bin =
					row.x_bin.as_ref().ok_or(Error::Crypto("missing revealed values"))?;
				let xi = scalars_from_bin::<P>(x_bin, n)?;

				let rho1 = DrbgAesCtr::new(&row.r).gen_bytes(RHO_SIZE);
				c0.push(row.c.clone());
				c1.push(key.encrypt_with_seed(&inner, &scalars_to_bin::<P>(&xi), &rho1));
				xi
			} else {
				ensure_crypto!(row.r.len() == 2 * SEED_SIZE, "bad seed size");
				ensure_crypto!(row.x_bin.is_none(), "unexpected revealed values");
				let (r01, r02) = row.r.split_at(SEED_SIZE);
				let xi = expand_x0::<P>(r01, n);

				let rho0 = DrbgAesCtr::new(r02).gen_bytes(RHO_SIZE);
				c0.push(key.encrypt_with_seed(&inner, r01, &rho0));
				c1.push(row.c.clone());
				xi
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

		let expected = challenge(q, label, &c0, &c1, &x0_points, &x1_points);
		ensure_crypto!(expected == self.b, "challenge mismatch");
		Ok(())
	}

	fn restore_from_decrypted(&self, row_index: usize, decrypted: &[u8]) -> Result<Vec<P::Scalar>> {
		let n = self.q.len();
		let row = &self.rows[row_index];
		let bi = bit_of(&self.b, row_index);

		let (x0_seed, x1_bin): (&[u8], &[u8]) = if bi {
			let x_bin =
				row.x_bin.as_ref().ok_or(Error::Crypto("missing revealed values"))?;
			(decrypted, x_bin)
		} else {
			(&row.r[..SEED_SIZE], decrypted)
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

	pub fn decrypt(
		&self,
		key: &RecipientPrivateKey,
		label: &[u8],
		skip_verify: bool,
	) -> Result<Vec<P::Scalar>> {
		if !skip_verify {
			self.verify(&key.public(), &self.q, label)?;
		}
		let inner = inner_label(label, &points_encoding(&self.q));

		for i in 0..self.rows.len() {
			let Ok(decrypted) = key.decrypt(&inner, &self.rows[i].c) else { continue };
			if let Ok(x) = self.restore_from_decrypted(i, &decrypted) {
				return Ok(x)
			}
		}
		Err(Error::Crypto("no row could be decrypted"))
	}

	pub fn public_points(&self) -> &[P] {
		&self.q
	}
}
