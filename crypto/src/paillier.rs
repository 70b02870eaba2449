//! Paillier encryption with CRT-accelerated private-key operations and
//! re-randomisable homomorphic arithmetic.
//!
//! Private-key exponentiations split the work modulo p² and q² and
//! recombine, which is roughly a factor four faster than working modulo N²
//! directly. Two CRT tables are kept: one with exponents derived from φ(N)
//! (decryption) and one with exponents derived from N (encryption).

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::{
	arith::{inv_mod_vartime, prime, Modulus},
	encoding::{ByteReader, ByteWriter, Encodable},
	error::{ensure_arg, ensure_crypto, Error, Result},
	Rng,
};

/// Default modulus size in bits.
pub const PAILLIER_BITS: u64 = 2048;

/// Whether a homomorphic operation re-randomises its result with a fresh
/// r^N factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rerand {
	On,
	Off,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaillierPublicKey {
	n: Modulus,
	nn: Modulus,
}

/// CRT table for computing c^e mod N² where the exponent is reduced per
/// prime-square factor.
#[derive(Clone, Debug, PartialEq)]
struct CrtTable {
	/// p² as a modulus
	pp: Modulus,
	/// q² as a modulus
	qq: Modulus,
	/// exponent modulo p² - p
	dp: BigUint,
	/// exponent modulo q² - q
	dq: BigUint,
	/// (q²)⁻¹ mod p²
	qinv: BigUint,
}

impl CrtTable {
	fn new(p: &BigUint, q: &BigUint, exponent: &BigUint) -> Self {
		let p_sqr = p * p;
		let q_sqr = q * q;
		let pp = Modulus::new_dense(p_sqr.clone()).expect("odd prime square");
		let qq = Modulus::new_dense(q_sqr.clone()).expect("odd prime square");
		let qinv = pp.inv(&pp.reduce_vartime(&q_sqr));
		let dp = exponent % (&p_sqr - p);
		let dq = exponent % (&q_sqr - q);
		CrtTable { pp, qq, dp, dq, qinv }
	}

	/// c^e mod N² via the split exponents.
	fn compute_power(&self, c: &BigUint, nn: &Modulus) -> BigUint {
		let c_mod_p = self.pp.reduce(c);
		let c_mod_q = self.qq.reduce(c);

		let mp = self.pp.pow(&c_mod_p, &self.dp);
		let mq = self.qq.pow(&c_mod_q, &self.dq);

		// h = qinv * (mp - mq) mod p²; result = mq + h * q²
		let h = self.pp.mul(&self.qinv, &self.pp.sub(&mp, &self.pp.reduce(&mq)));
		nn.reduce(&(&mq + h * self.qq.value()))
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaillierPrivateKey {
	public: PaillierPublicKey,
	p: BigUint,
	q: BigUint,
	phi_n: BigUint,
	/// φ(N)⁻¹ mod N
	inv_phi_n: BigUint,
	/// N⁻¹ mod φ(N), used for randomness recovery
	n_inv_mod_phi: BigUint,
	crt_dec: CrtTable,
	crt_enc: CrtTable,
}

impl PaillierPublicKey {
	pub fn from_modulus(n: BigUint) -> Result<Self> {
		let nn = Modulus::new_dense(&n * &n)?;
		let n = Modulus::new_dense(n)?;
		Ok(PaillierPublicKey { n, nn })
	}

	pub fn n(&self) -> &BigUint {
		self.n.value()
	}

	pub fn modulus(&self) -> &Modulus {
		&self.n
	}

	pub fn modulus_squared(&self) -> &Modulus {
		&self.nn
	}

	/// Encrypt with caller-supplied randomness, which must be coprime to N.
	pub fn encrypt_with_randomness(&self, plaintext: &BigUint, r: &BigUint) -> BigUint {
		assert!(plaintext < self.n.value(), "plaintext out of range");
		assert!(self.n.coprime(r), "randomness shares a factor with N");
		let rn = self.nn.pow(&self.nn.reduce(r), self.n.value());
		self.mul_by_plaintext_term(&rn, plaintext)
	}

	pub fn encrypt(&self, plaintext: &BigUint, rng: &mut Rng) -> (BigUint, BigUint) {
		let r = self.n.rand(rng);
		let c = self.encrypt_with_randomness(plaintext, &r);
		(c, r)
	}

	/// cipher * (1 + plaintext * N) mod N²
	fn mul_by_plaintext_term(&self, cipher: &BigUint, plaintext: &BigUint) -> BigUint {
		let term = self.nn.reduce(&(plaintext * self.n.value() + BigUint::one()));
		self.nn.mul(cipher, &term)
	}

	pub fn rerand(&self, cipher: &BigUint, rng: &mut Rng) -> BigUint {
		let r = self.n.rand(rng);
		let rn = self.nn.pow(&self.nn.reduce(&r), self.n.value());
		self.nn.mul(cipher, &rn)
	}

	fn maybe_rerand(&self, cipher: BigUint, rerand: Rerand, rng: &mut Rng) -> BigUint {
		match rerand {
			Rerand::On => self.rerand(&cipher, rng),
			Rerand::Off => cipher,
		}
	}

	pub fn add_ciphers(
		&self,
		c1: &BigUint,
		c2: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		self.maybe_rerand(self.nn.mul(c1, c2), rerand, rng)
	}

	pub fn sub_ciphers(
		&self,
		c1: &BigUint,
		c2: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		let c2_inv = self.nn.inv(c2);
		self.maybe_rerand(self.nn.mul(c1, &c2_inv), rerand, rng)
	}

	pub fn mul_scalar(
		&self,
		cipher: &BigUint,
		scalar: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		self.maybe_rerand(self.nn.pow(cipher, scalar), rerand, rng)
	}

	pub fn add_scalar(
		&self,
		cipher: &BigUint,
		scalar: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		self.maybe_rerand(self.mul_by_plaintext_term(cipher, scalar), rerand, rng)
	}

	pub fn sub_scalar(
		&self,
		cipher: &BigUint,
		scalar: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		// cipher * (1 - scalar * N) mod N²
		let term = self.nn.sub(
			&BigUint::one(),
			&self.nn.reduce(&(scalar * self.n.value())),
		);
		self.maybe_rerand(self.nn.mul(cipher, &term), rerand, rng)
	}

	/// Enc(scalar) / cipher
	pub fn sub_cipher_scalar(
		&self,
		scalar: &BigUint,
		cipher: &BigUint,
		rerand: Rerand,
		rng: &mut Rng,
	) -> BigUint {
		let cipher_inv = self.nn.inv(cipher);
		self.maybe_rerand(self.mul_by_plaintext_term(&cipher_inv, scalar), rerand, rng)
	}

	/// Verifier-side re-encryption: variable time, and rejects malformed
	/// randomness with an error instead of asserting.
	pub fn reencrypt_vartime(&self, plaintext: &BigUint, r: &BigUint) -> Result<BigUint> {
		ensure_crypto!(plaintext < self.n.value(), "plaintext out of range");
		ensure_crypto!(!r.is_zero() && r < self.n.value(), "randomness out of range");
		ensure_crypto!(self.n.coprime_vartime(r), "randomness shares a factor with N");
		let rn = self.nn.pow_vartime(r, self.n.value());
		Ok(self.mul_by_plaintext_term(&rn, plaintext))
	}

	/// A valid ciphertext satisfies 0 < c < N² and gcd(c, N) = 1.
	pub fn verify_cipher(&self, cipher: &BigUint) -> Result<()> {
		ensure_crypto!(
			!cipher.is_zero() && cipher < self.nn.value(),
			"ciphertext out of range"
		);
		ensure_crypto!(self.n.coprime_vartime(cipher), "ciphertext shares a factor with N");
		Ok(())
	}

	/// Amortised validation: range-check each candidate, then take a single
	/// gcd over the product modulo N.
	pub fn batch_verify_ciphers(&self, ciphers: &[BigUint]) -> Result<()> {
		if ciphers.is_empty() {
			return Ok(())
		}
		for cipher in ciphers {
			ensure_crypto!(
				!cipher.is_zero() && cipher < self.nn.value(),
				"ciphertext out of range"
			);
		}
		let mut product = self.n.reduce_vartime(&ciphers[0]);
		for cipher in &ciphers[1..] {
			product = self.n.mul_vartime(&product, cipher);
		}
		ensure_crypto!(self.n.coprime_vartime(&product), "ciphertext shares a factor with N");
		Ok(())
	}
}

impl PaillierPrivateKey {
	/// Generate a fresh key from two safe primes of equal size.
	pub fn generate(rng: &mut Rng) -> Self {
		Self::generate_with_bits(PAILLIER_BITS, rng)
	}

	pub fn generate_with_bits(bits: u64, rng: &mut Rng) -> Self {
		let p = prime::generate_safe_prime(bits / 2, rng);
		let q = prime::generate_safe_prime(bits / 2, rng);
		Self::from_primes(p, q).expect("generated primes form a valid key")
	}

	pub fn from_primes(p: BigUint, q: BigUint) -> Result<Self> {
		ensure_arg!(p != q, "primes must be distinct");
		ensure_arg!(p.bits() == q.bits(), "primes must have equal size");

		// Keep p > q so the CRT recombination constant is well defined
		let (p, q) = if p > q { (p, q) } else { (q, p) };

		let n_value = &p * &q;
		let public = PaillierPublicKey::from_modulus(n_value.clone())?;

		let phi_n = (&p - BigUint::one()) * (&q - BigUint::one());
		let inv_phi_n = public.n.inv(&public.n.reduce_vartime(&phi_n));
		let n_inv_mod_phi = inv_mod_vartime(&n_value, &phi_n)?;

		let crt_dec = CrtTable::new(&p, &q, &phi_n);
		let crt_enc = CrtTable::new(&p, &q, &n_value);

		Ok(PaillierPrivateKey {
			public,
			p,
			q,
			phi_n,
			inv_phi_n,
			n_inv_mod_phi,
			crt_dec,
			crt_enc,
		})
	}

	pub fn public(&self) -> &PaillierPublicKey {
		&self.public
	}

	pub fn primes(&self) -> (&BigUint, &BigUint) {
		(&self.p, &self.q)
	}

	pub fn phi(&self) -> &BigUint {
		&self.phi_n
	}

	/// N⁻¹ mod φ(N); the decryption exponent for randomness recovery and
	/// the key-validity proof.
	pub(crate) fn n_inv_mod_phi(&self) -> &BigUint {
		&self.n_inv_mod_phi
	}

	/// CRT-accelerated encryption.
	pub fn encrypt_with_randomness(&self, plaintext: &BigUint, r: &BigUint) -> BigUint {
		assert!(plaintext < self.public.n.value(), "plaintext out of range");
		let rn = self.crt_enc.compute_power(r, &self.public.nn);
		self.public.mul_by_plaintext_term(&rn, plaintext)
	}

	pub fn encrypt(&self, plaintext: &BigUint, rng: &mut Rng) -> (BigUint, BigUint) {
		let r = self.public.n.rand(rng);
		let c = self.encrypt_with_randomness(plaintext, &r);
		(c, r)
	}

	/// m = L(c^φ(N) mod N²) * φ(N)⁻¹ mod N, with L(u) = (u - 1) / N.
	pub fn decrypt(&self, cipher: &BigUint) -> BigUint {
		let c_phi = self.crt_dec.compute_power(cipher, &self.public.nn);
		let l = (&c_phi - BigUint::one()) / self.public.n.value();
		self.public.n.mul(&self.public.n.reduce(&l), &self.inv_phi_n)
	}

	pub fn rerand(&self, cipher: &BigUint, rng: &mut Rng) -> BigUint {
		let r = self.public.n.rand(rng);
		let rn = self.crt_enc.compute_power(&r, &self.public.nn);
		self.public.nn.mul(cipher, &rn)
	}

	/// Recover the encryption randomness of a known plaintext:
	/// r = (c / (1 + m N))^(N⁻¹ mod φ(N)) mod N.
	pub fn get_cipher_randomness(&self, plaintext: &BigUint, cipher: &BigUint) -> BigUint {
		let term = self
			.public
			.nn
			.reduce(&(plaintext * self.public.n.value() + BigUint::one()));
		let c = self.public.nn.mul(cipher, &self.public.nn.inv(&term));
		self.public.n.pow(&self.public.n.reduce(&c), &self.n_inv_mod_phi)
	}
}

impl Encodable for PaillierPublicKey {
	fn encode(&self, writer: &mut ByteWriter) {
		writer.write_bigint(self.n.value());
	}

	fn decode(reader: &mut ByteReader) -> Result<Self> {
		let n = reader.read_bigint()?;
		Self::from_modulus(n).map_err(|_| Error::Format("invalid paillier modulus"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn test_key(rng: &mut Rng) -> PaillierPrivateKey {
		// Small primes keep the test fast; production keys use 2048 bits
		PaillierPrivateKey::generate_with_bits(512, rng)
	}

	#[test]
	fn encrypt_decrypt_round_trip() {
		let mut rng = Rng::from_seed([30; 32]);
		let key = test_key(&mut rng);
		for _ in 0..5 {
			let m = key.public().modulus().rand(&mut rng);
			let (c, _) = key.encrypt(&m, &mut rng);
			assert!(key.public().verify_cipher(&c).is_ok());
			assert_eq!(key.decrypt(&c), m);
		}
	}

	#[test]
	fn private_and_public_encryption_agree() {
		let mut rng = Rng::from_seed([31; 32]);
		let key = test_key(&mut rng);
		let m = BigUint::from(123456u32);
		let r = key.public().modulus().rand(&mut rng);
		assert_eq!(
			key.encrypt_with_randomness(&m, &r),
			key.public().encrypt_with_randomness(&m, &r)
		);
	}

	#[test]
	fn homomorphic_operations() {
		let mut rng = Rng::from_seed([32; 32]);
		let key = test_key(&mut rng);
		let n = key.public().n().clone();
		let pk = key.public().clone();

		let x = BigUint::from(1_000_000u32);
		let y = BigUint::from(77_777u32);
		let s = BigUint::from(5u32);

		let (cx, _) = key.encrypt(&x, &mut rng);
		let (cy, _) = key.encrypt(&y, &mut rng);

		let sum = pk.add_ciphers(&cx, &cy, Rerand::Off, &mut rng);
		assert_eq!(key.decrypt(&sum), (&x + &y) % &n);

		let diff = pk.sub_ciphers(&cx, &cy, Rerand::Off, &mut rng);
		assert_eq!(key.decrypt(&diff), (&x - &y) % &n);

		let scaled = pk.mul_scalar(&cx, &s, Rerand::On, &mut rng);
		assert_eq!(key.decrypt(&scaled), (&x * &s) % &n);

		let shifted = pk.add_scalar(&cx, &s, Rerand::Off, &mut rng);
		assert_eq!(key.decrypt(&shifted), (&x + &s) % &n);

		let unshifted = pk.sub_scalar(&cx, &s, Rerand::On, &mut rng);
		assert_eq!(key.decrypt(&unshifted), (&x - &s) % &n);

		let flipped = pk.sub_cipher_scalar(&s, &cy, Rerand::Off, &mut rng);
		assert_eq!(key.decrypt(&flipped), (&n + &s - &y) % &n);
	}

	#[test]
	fn rerandomisation_preserves_the_plaintext_and_changes_the_cipher() {
		let mut rng = Rng::from_seed([33; 32]);
		let key = test_key(&mut rng);
		let m = BigUint::from(42u32);
		let (c, _) = key.encrypt(&m, &mut rng);
		let c2 = key.public().rerand(&c, &mut rng);
		assert_ne!(c, c2);
		assert_eq!(key.decrypt(&c2), m);
	}

	#[test]
	fn cipher_validation() {
		let mut rng = Rng::from_seed([34; 32]);
		let key = test_key(&mut rng);
		let pk = key.public();

		assert!(pk.verify_cipher(&BigUint::zero()).is_err());
		assert!(pk.verify_cipher(pk.modulus_squared().value()).is_err());
		// A multiple of p shares a factor with N
		let bad = key.primes().0 * BigUint::from(7u32);
		assert!(pk.verify_cipher(&bad).is_err());

		let (good, _) = key.encrypt(&BigUint::from(1u32), &mut rng);
		assert!(pk.batch_verify_ciphers(&[good.clone(), good.clone()]).is_ok());
		assert!(pk.batch_verify_ciphers(&[good, bad]).is_err());
	}

	#[test]
	fn randomness_recovery() {
		let mut rng = Rng::from_seed([35; 32]);
		let key = test_key(&mut rng);
		let m = BigUint::from(31337u32);
		let (c, r) = key.encrypt(&m, &mut rng);
		assert_eq!(key.get_cipher_randomness(&m, &c), r);
	}

	#[test]
	fn key_encoding_round_trip() {
		let mut rng = Rng::from_seed([36; 32]);
		let key = test_key(&mut rng);
		let encoded = key.public().to_encoded();
		let decoded = PaillierPublicKey::from_encoded(&encoded).unwrap();
		assert_eq!(&decoded, key.public());
	}
}
