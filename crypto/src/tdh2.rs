//! TDH2 threshold public-key encryption with publicly verifiable partial
//! decryptions (Shoup-Gennaro style).
//!
//! The public key carries a second generator Γ obtained by hashing Q to
//! the curve, so anyone can recompute it; the ciphertext embeds a DH-tuple
//! proof over (G, Γ) that makes validity publicly checkable, and each
//! partial decryption carries its own proof against the holder's public
//! share.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
	curve::{hash_to_point, scalar_from_ro, ECPoint, ECScalar},
	error::{ensure_crypto, Result},
	hashing::{aes_gcm_decrypt, aes_gcm_encrypt, ro::Ro},
	sharing::AccessStructure,
	Rng,
};

const GCM_IV_SIZE: usize = 12;

/// Γ = hash-to-curve("TDH2-Gamma", Q): a generator with unknown discrete
/// log relative to G, recomputable from the public key alone.
pub fn derive_gamma<P: ECPoint>(q: &P) -> P {
	hash_to_point(&Ro::new().feed("TDH2-Gamma").feed(q))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tdh2PublicKey<P: ECPoint> {
	pub q: P,
	pub gamma: P,
}

/// One party's share of the decryption key.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tdh2PrivateShare<P: ECPoint> {
	pub pid: u32,
	pub x: P::Scalar,
	pub pub_key: Tdh2PublicKey<P>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tdh2Ciphertext<P: ECPoint> {
	c: Vec<u8>,
	iv: Vec<u8>,
	r1: P,
	r2: P,
	e: P::Scalar,
	f: P::Scalar,
	label: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Tdh2PartialDecryption<P: ECPoint> {
	pub pid: u32,
	xi: P,
	ei: P::Scalar,
	fi: P::Scalar,
}

/// Generate a key and additively share it n-of-n; party i receives
/// pid = i + 1. Returns the public key, the shares and the public shares.
pub fn keygen_additive<P: ECPoint>(
	n: usize,
	rng: &mut Rng,
) -> (Tdh2PublicKey<P>, Vec<Tdh2PrivateShare<P>>, Vec<P>) {
	assert!(n > 0, "at least one share");
	let shares: Vec<P::Scalar> = (0..n).map(|_| P::Scalar::random(rng)).collect();
	let x: P::Scalar = shares.iter().cloned().sum();
	let q = P::from_scalar(&x);
	let pub_key = Tdh2PublicKey { gamma: derive_gamma(&q), q };

	let pub_shares = shares.iter().map(P::from_scalar).collect();
	let private_shares = shares
		.into_iter()
		.enumerate()
		.map(|(i, x)| Tdh2PrivateShare { pid: i as u32 + 1, x, pub_key: pub_key.clone() })
		.collect();
	(pub_key, private_shares, pub_shares)
}

/// Generate a key shared over an access structure. Returns the public key,
/// per-leaf private shares and per-leaf public shares.
#[allow(clippy::type_complexity)]
pub fn keygen_access_structure<P: ECPoint>(
	ac: &AccessStructure,
	rng: &mut Rng,
) -> (Tdh2PublicKey<P>, BTreeMap<String, Tdh2PrivateShare<P>>, BTreeMap<String, P>) {
	let x = P::Scalar::random(rng);
	let q = P::from_scalar(&x);
	let pub_key = Tdh2PublicKey { gamma: derive_gamma(&q), q };

	let shares = ac.share::<P>(&x, rng);
	let pub_shares =
		shares.iter().map(|(name, share)| (name.clone(), P::from_scalar(share))).collect();
	let private_shares = shares
		.into_iter()
		.map(|(name, x)| {
			(name, Tdh2PrivateShare { pid: 0, x, pub_key: pub_key.clone() })
		})
		.collect();
	(pub_key, private_shares, pub_shares)
}

fn symmetric_key<P: ECPoint>(v: &P) -> [u8; 32] {
	Ro::new().feed(v).bits256()
}

fn ciphertext_challenge<P: ECPoint>(
	c: &[u8],
	label: &[u8],
	r1: &P,
	w1: &P,
	r2: &P,
	w2: &P,
	iv: &[u8],
) -> P::Scalar {
	scalar_from_ro::<P>(
		Ro::new().feed(c).feed(label).feed(r1).feed(w1).feed(r2).feed(w2).feed(iv),
	)
}

impl<P: ECPoint> Tdh2PublicKey<P> {
	pub fn encrypt(&self, plain: &[u8], label: &[u8], rng: &mut Rng) -> Tdh2Ciphertext<P> {
		use rand::RngCore;
		let mut iv = vec![0u8; GCM_IV_SIZE];
		rng.fill_bytes(&mut iv);
		let r = P::Scalar::random(rng);
		let s = P::Scalar::random(rng);
		self.encrypt_with(plain, label, &r, &s, iv)
	}

	fn encrypt_with(
		&self,
		plain: &[u8],
		label: &[u8],
		r: &P::Scalar,
		s: &P::Scalar,
		iv: Vec<u8>,
	) -> Tdh2Ciphertext<P> {
		let p_point = self.q.mul(r);
		let key = symmetric_key(&p_point);
		let c = aes_gcm_encrypt(&key, &iv, label, plain);

		let r1 = P::from_scalar(r);
		let w1 = P::from_scalar(s);
		let r2 = self.gamma.mul(r);
		let w2 = self.gamma.mul(s);

		let e = ciphertext_challenge::<P>(&c, label, &r1, &w1, &r2, &w2, &iv);
		let f = s.clone() + e.clone() * r;

		Tdh2Ciphertext { c, iv, r1, r2, e, f, label: label.to_vec() }
	}
}

impl<P: ECPoint> Tdh2Ciphertext<P> {
	/// Publicly verify well-formedness against the public key and label.
	pub fn verify(&self, pub_key: &Tdh2PublicKey<P>, label: &[u8]) -> Result<()> {
		ensure_crypto!(self.label == label, "label mismatch");
		ensure_crypto!(
			pub_key.gamma == derive_gamma(&pub_key.q),
			"gamma does not match the public key"
		);

		// W1 = f G - e R1, W2 = f Γ - e R2
		let w1 = P::mul_add_vartime(&self.f, &self.r1, &(-self.e.clone()));
		let w2 = pub_key.gamma.mul(&self.f) - self.r2.mul(&self.e);

		let expected =
			ciphertext_challenge::<P>(&self.c, &self.label, &self.r1, &w1, &self.r2, &w2, &self.iv);
		ensure_crypto!(expected == self.e, "challenge mismatch");
		Ok(())
	}

	/// Decrypt once the combined value V = x R1 is known.
	fn decrypt_with_combined(&self, v: &P, label: &[u8]) -> Result<Vec<u8>> {
		let key = symmetric_key(v);
		aes_gcm_decrypt(&key, &self.iv, label, &self.c)
	}
}

impl<P: ECPoint> Tdh2PrivateShare<P> {
	/// Produce a verifiable partial decryption (verifies the ciphertext
	/// first).
	pub fn partial_decrypt(
		&self,
		ciphertext: &Tdh2Ciphertext<P>,
		label: &[u8],
		rng: &mut Rng,
	) -> Result<Tdh2PartialDecryption<P>> {
		ciphertext.verify(&self.pub_key, label)?;

		let xi = ciphertext.r1.mul(&self.x);
		let si = P::Scalar::random(rng);
		let yi = ciphertext.r1.mul(&si);
		let zi = P::from_scalar(&si);

		let ei = scalar_from_ro::<P>(Ro::new().feed(&xi).feed(&yi).feed(&zi));
		let fi = si + ei.clone() * &self.x;
		Ok(Tdh2PartialDecryption { pid: self.pid, xi, ei, fi })
	}
}

impl<P: ECPoint> Tdh2PartialDecryption<P> {
	/// Check this partial decryption against the holder's public share.
	pub fn check(&self, pub_share: &P, ciphertext: &Tdh2Ciphertext<P>) -> Result<()> {
		let yi = ciphertext.r1.mul(&self.fi) - self.xi.mul(&self.ei);
		let zi = P::mul_add_vartime(&self.fi, pub_share, &(-self.ei.clone()));

		let expected = scalar_from_ro::<P>(Ro::new().feed(&self.xi).feed(&yi).feed(&zi));
		ensure_crypto!(expected == self.ei, "partial decryption proof failed");
		Ok(())
	}
}

/// Combine n-of-n additive partial decryptions.
pub fn combine_additive<P: ECPoint>(
	pub_key: &Tdh2PublicKey<P>,
	pub_shares: &[P],
	label: &[u8],
	partial_decryptions: &[Tdh2PartialDecryption<P>],
	ciphertext: &Tdh2Ciphertext<P>,
) -> Result<Vec<u8>> {
	let n = pub_shares.len();
	ensure_crypto!(partial_decryptions.len() == n, "wrong number of partial decryptions");
	ciphertext.verify(pub_key, label)?;

	let mut v = P::infinity();
	for partial in partial_decryptions {
		ensure_crypto!(
			partial.pid >= 1 && partial.pid as usize <= n,
			"partial decryption pid out of range"
		);
		if let Err(err) = partial.check(&pub_shares[partial.pid as usize - 1], ciphertext) {
			warn!(pid = partial.pid, "invalid partial decryption");
			return Err(err)
		}
		v = v + partial.xi;
	}

	ciphertext.decrypt_with_combined(&v, label)
}

/// Combine partial decryptions from a quorum of an access structure.
pub fn combine_access_structure<P: ECPoint>(
	ac: &AccessStructure,
	pub_key: &Tdh2PublicKey<P>,
	pub_shares: &BTreeMap<String, P>,
	label: &[u8],
	partial_decryptions: &BTreeMap<String, Tdh2PartialDecryption<P>>,
	ciphertext: &Tdh2Ciphertext<P>,
) -> Result<Vec<u8>> {
	let names = partial_decryptions.keys().cloned().collect();
	ensure_crypto!(ac.enough_for_quorum(&names), "not enough partial decryptions");
	ciphertext.verify(pub_key, label)?;

	let mut vs = BTreeMap::new();
	for (name, partial) in partial_decryptions {
		let pub_share = pub_shares
			.get(name)
			.ok_or(crate::Error::BadArgument("unknown share holder"))?;
		if let Err(err) = partial.check(pub_share, ciphertext) {
			warn!(holder = name.as_str(), "invalid partial decryption");
			return Err(err)
		}
		vs.insert(name.clone(), partial.xi);
	}

	let v = ac.reconstruct_exponent::<P>(&vs)?;
	ciphertext.decrypt_with_combined(&v, label)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{curve::p256::Point, sharing::NodeSpec};
	use rand::SeedableRng;

	#[test]
	fn encrypt_verify_combine_additive() {
		let mut rng = Rng::from_seed([150; 32]);
		let (pub_key, shares, pub_shares) = keygen_additive::<Point>(3, &mut rng);

		let ct = pub_key.encrypt(b"attack at dawn", b"label", &mut rng);
		ct.verify(&pub_key, b"label").unwrap();
		assert!(ct.verify(&pub_key, b"other label").is_err());

		let partials: Vec<_> = shares
			.iter()
			.map(|share| share.partial_decrypt(&ct, b"label", &mut rng).unwrap())
			.collect();

		let plain =
			combine_additive(&pub_key, &pub_shares, b"label", &partials, &ct).unwrap();
		assert_eq!(plain, b"attack at dawn");
	}

	#[test]
	fn corrupted_partial_decryption_fails_the_combine() {
		let mut rng = Rng::from_seed([151; 32]);
		let (pub_key, shares, pub_shares) = keygen_additive::<Point>(3, &mut rng);
		let ct = pub_key.encrypt(b"m", b"l", &mut rng);

		let mut partials: Vec<_> = shares
			.iter()
			.map(|share| share.partial_decrypt(&ct, b"l", &mut rng).unwrap())
			.collect();

		// Corrupt one X_i; its proof no longer verifies
		partials[1].xi = partials[1].xi + Point::generator();
		assert!(combine_additive(&pub_key, &pub_shares, b"l", &partials, &ct).is_err());
	}

	#[test]
	fn mutated_ciphertext_fails_verification() {
		let mut rng = Rng::from_seed([152; 32]);
		let (pub_key, _, _) = keygen_additive::<Point>(2, &mut rng);
		let ct = pub_key.encrypt(b"m", b"l", &mut rng);

		let mut bad = ct.clone();
		bad.c[0] ^= 1;
		assert!(bad.verify(&pub_key, b"l").is_err());

		let mut bad = ct.clone();
		bad.f = bad.f.clone() + <Point as ECPoint>::Scalar::from(1);
		assert!(bad.verify(&pub_key, b"l").is_err());

		let mut bad = ct;
		bad.r2 = bad.r2 + Point::generator();
		assert!(bad.verify(&pub_key, b"l").is_err());
	}

	#[test]
	fn access_structure_combine() {
		let mut rng = Rng::from_seed([153; 32]);
		let ac = AccessStructure::new(NodeSpec::threshold(
			"",
			2,
			vec![NodeSpec::leaf("a"), NodeSpec::leaf("b"), NodeSpec::leaf("c")],
		))
		.unwrap();

		let (pub_key, shares, pub_shares) = keygen_access_structure::<Point>(&ac, &mut rng);
		let ct = pub_key.encrypt(b"quorum secret", b"l", &mut rng);

		// Two of three suffice
		let partials: BTreeMap<String, _> = ["a", "c"]
			.iter()
			.map(|name| {
				(
					name.to_string(),
					shares[*name].partial_decrypt(&ct, b"l", &mut rng).unwrap(),
				)
			})
			.collect();

		let plain = combine_access_structure(&ac, &pub_key, &pub_shares, b"l", &partials, &ct)
			.unwrap();
		assert_eq!(plain, b"quorum secret");

		// One is not enough
		let partials: BTreeMap<String, _> = partials.into_iter().take(1).collect();
		assert!(combine_access_structure(&ac, &pub_key, &pub_shares, b"l", &partials, &ct)
			.is_err());
	}
}
