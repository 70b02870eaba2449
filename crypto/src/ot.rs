//! Oblivious transfer: the PVW base protocol over an elliptic curve and
//! the 256-row extension built on top of it.
//!
//! The combined protocol runs the base OT in the reverse direction (the
//! extension's sender plays base receiver for its 256 choice bits), then
//! stretches the transferred seeds into any number of transfers.

pub mod extension;
pub mod transpose;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
	arith::Modulus,
	curve::{hash_to_point, ECPoint, ECScalar},
	error::{ensure_arg, ensure_crypto, Result},
	hashing::ro::{bit_of, Ro},
	Rng,
};

use extension::{OtExtMsg1, OtExtMsg2, OtExtReceiver, OtExtSender, OT_EXT_KAPPA, OT_EXT_U};

// ---- bit-string helpers (LSB-first within each byte) ----

pub(crate) fn set_bit(bytes: &mut [u8], i: usize, value: bool) {
	let mask = 1u8 << (i % 8);
	if value {
		bytes[i / 8] |= mask;
	} else {
		bytes[i / 8] &= !mask;
	}
}

pub(crate) fn random_bits(count: usize, rng: &mut Rng) -> Vec<u8> {
	use rand::RngCore;
	let mut bytes = vec![0u8; (count + 7) / 8];
	rng.fill_bytes(&mut bytes);
	bytes
}

pub(crate) fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
	assert_eq!(a.len(), b.len(), "xor length mismatch");
	a.iter().zip(b).map(|(a, b)| a ^ b).collect()
}

pub(crate) fn xor_in_place(a: &mut [u8], b: &[u8]) {
	assert_eq!(a.len(), b.len(), "xor length mismatch");
	for (a, b) in a.iter_mut().zip(b) {
		*a ^= b;
	}
}

// ---- PVW base OT ----

/// The four generators of a base-OT session: (G, H0) for choice bit zero,
/// (G1, H1) for choice bit one, the latter three derived from the session
/// id by hash-to-curve.
fn session_generators<P: ECPoint>(sid: &[u8]) -> (P, P, P, P) {
	let derive = |counter: u32| hash_to_point::<P>(&Ro::new().feed("pvw-base-ot").feed(sid).feed(&counter));
	(P::generator(), derive(1), derive(2), derive(3))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BaseOtMsg1<P: ECPoint> {
	a: Vec<P>,
	b: Vec<P>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct BaseOtMsg2<P: ECPoint> {
	u0: Vec<P>,
	v0: Vec<Vec<u8>>,
	u1: Vec<P>,
	v1: Vec<Vec<u8>>,
}

pub struct BaseOtReceiver<P: ECPoint> {
	sid: Vec<u8>,
	choice_bits: Vec<bool>,
	r: Vec<P::Scalar>,
}

impl<P: ECPoint> BaseOtReceiver<P> {
	/// Receiver step: one (A, B) pair per choice bit, under the generator
	/// pair the bit selects.
	pub fn step1(sid: &[u8], choice_bits: &[bool], rng: &mut Rng) -> (Self, BaseOtMsg1<P>) {
		assert!(!sid.is_empty(), "empty session id");
		let (g0, h0, g1, h1) = session_generators::<P>(sid);

		let mut a = Vec::with_capacity(choice_bits.len());
		let mut b = Vec::with_capacity(choice_bits.len());
		let mut r = Vec::with_capacity(choice_bits.len());

		for &bit in choice_bits {
			let ri = P::Scalar::random(rng);
			let (g, h) = if bit { (&g1, &h1) } else { (&g0, &h0) };
			a.push(g.mul(&ri));
			b.push(h.mul(&ri));
			r.push(ri);
		}

		(
			BaseOtReceiver { sid: sid.to_vec(), choice_bits: choice_bits.to_vec(), r },
			BaseOtMsg1 { a, b },
		)
	}

	/// Unmask the chosen messages.
	pub fn output(&self, msg: &BaseOtMsg2<P>) -> Result<Vec<Vec<u8>>> {
		let m = self.choice_bits.len();
		ensure_crypto!(msg.u0.len() == m, "wrong U0 count");
		ensure_crypto!(msg.u1.len() == m, "wrong U1 count");
		ensure_crypto!(msg.v0.len() == m, "wrong V0 count");
		ensure_crypto!(msg.v1.len() == m, "wrong V1 count");

		let mut out = Vec::with_capacity(m);
		for i in 0..m {
			let (u, v) = if self.choice_bits[i] {
				(&msg.u1[i], &msg.v1[i])
			} else {
				(&msg.u0[i], &msg.v0[i])
			};
			let pad = Ro::new().feed(&u.mul(&self.r[i])).bits(v.len() * 8);
			out.push(xor_bytes(&pad, v));
		}
		Ok(out)
	}
}

/// Sender step: masks x0 with the zero-side generators and x1 with the
/// one-side generators; only the receiver's chosen side unmasks.
pub fn base_ot_sender_step2<P: ECPoint>(
	sid: &[u8],
	msg: &BaseOtMsg1<P>,
	x0: &[Vec<u8>],
	x1: &[Vec<u8>],
	rng: &mut Rng,
) -> Result<BaseOtMsg2<P>> {
	ensure_arg!(x0.len() == x1.len(), "input length mismatch");
	ensure_arg!(msg.a.len() == x0.len(), "wrong A count");
	ensure_arg!(msg.b.len() == x0.len(), "wrong B count");
	let (_, h0, g1, h1) = session_generators::<P>(sid);

	let m = x0.len();
	let mut u0 = Vec::with_capacity(m);
	let mut v0 = Vec::with_capacity(m);
	let mut u1 = Vec::with_capacity(m);
	let mut v1 = Vec::with_capacity(m);

	for i in 0..m {
		let a = &msg.a[i];
		let b = &msg.b[i];

		let s0 = P::Scalar::random(rng);
		let t0 = P::Scalar::random(rng);
		// U0 = s0 G + t0 H0
		u0.push(P::mul_add(&s0, &h0, &t0));
		let x = a.mul(&s0) + b.mul(&t0);
		v0.push(xor_bytes(&Ro::new().feed(&x).bits(x0[i].len() * 8), &x0[i]));

		let s1 = P::Scalar::random(rng);
		let t1 = P::Scalar::random(rng);
		// U1 = s1 G1 + t1 H1
		u1.push(g1.mul(&s1) + h1.mul(&t1));
		let x = a.mul(&s1) + b.mul(&t1);
		v1.push(xor_bytes(&Ro::new().feed(&x).bits(x1[i].len() * 8), &x1[i]));
	}

	Ok(BaseOtMsg2 { u0, v0, u1, v1 })
}

// ---- combined protocol: base OT feeding the extension ----

/// Sender side of the combined protocol (base-OT receiver for its 256
/// random choice bits, then extension sender).
pub struct OtSender<P: ECPoint> {
	s_bits: Vec<u8>,
	base: BaseOtReceiver<P>,
	sigma: Option<Vec<Vec<u8>>>,
	ext: Option<OtExtSender>,
}

/// Receiver side (base-OT sender for the seed pairs, then extension
/// receiver).
pub struct OtReceiver {
	ext: OtExtReceiver,
}

impl<P: ECPoint> OtSender<P> {
	pub fn step1(sid: &[u8], rng: &mut Rng) -> (Self, BaseOtMsg1<P>) {
		let s_bits = random_bits(OT_EXT_U, rng);
		let choice: Vec<bool> = (0..OT_EXT_U).map(|i| bit_of(&s_bits, i)).collect();
		let (base, msg) = BaseOtReceiver::step1(sid, &choice, rng);
		(OtSender { s_bits, base, sigma: None, ext: None }, msg)
	}

	fn sigma(&mut self, base_msg: &BaseOtMsg2<P>) -> Result<&[Vec<u8>]> {
		if self.sigma.is_none() {
			self.sigma = Some(self.base.output(base_msg)?);
		}
		Ok(self.sigma.as_ref().expect("just set"))
	}

	/// Chosen-input transfers.
	pub fn step3(
		&mut self,
		base_msg: &BaseOtMsg2<P>,
		ext_msg: &OtExtMsg1,
		x0: &[Vec<u8>],
		x1: &[Vec<u8>],
	) -> Result<OtExtMsg2> {
		let sigma = self.sigma(base_msg)?.to_vec();
		let (ext, msg) =
			OtExtSender::step2(&self.base.sid, &self.s_bits, &sigma, ext_msg, x0, x1)?;
		self.ext = Some(ext);
		Ok(msg)
	}

	/// Correlated transfers: x0 random, x1 = x0 + delta mod q. The derived
	/// pairs are available through [`Self::random_outputs`].
	pub fn step3_one_input_random(
		&mut self,
		base_msg: &BaseOtMsg2<P>,
		ext_msg: &OtExtMsg1,
		delta: &[BigUint],
		q: &Modulus,
	) -> Result<OtExtMsg2> {
		let sigma = self.sigma(base_msg)?.to_vec();
		let (ext, msg) = OtExtSender::step2_one_input_random(
			&self.base.sid,
			&self.s_bits,
			&sigma,
			ext_msg,
			delta,
			q,
		)?;
		self.ext = Some(ext);
		Ok(msg)
	}

	/// Fully random transfers.
	pub fn step3_sender_random(
		&mut self,
		base_msg: &BaseOtMsg2<P>,
		ext_msg: &OtExtMsg1,
		m: usize,
		l: usize,
	) -> Result<OtExtMsg2> {
		let sigma = self.sigma(base_msg)?.to_vec();
		let (ext, msg) = OtExtSender::step2_sender_random(
			&self.base.sid,
			&self.s_bits,
			&sigma,
			ext_msg,
			m,
			l,
		)?;
		self.ext = Some(ext);
		Ok(msg)
	}

	/// The derived message pairs in the random modes.
	pub fn random_outputs(&self) -> Option<(&[Vec<u8>], &[Vec<u8>])> {
		self.ext.as_ref().map(|ext| (ext.x0_random.as_slice(), ext.x1_random.as_slice()))
	}
}

impl OtReceiver {
	/// Answer the sender's base-OT message with seed pairs, and start the
	/// extension for the given choice bits.
	pub fn step2<P: ECPoint>(
		sid: &[u8],
		base_msg: &BaseOtMsg1<P>,
		choice_bits: &[bool],
		l: usize,
		rng: &mut Rng,
	) -> Result<(Self, BaseOtMsg2<P>, OtExtMsg1)> {
		let sigma0: Vec<Vec<u8>> =
			(0..OT_EXT_U).map(|_| random_bits(OT_EXT_KAPPA, rng)).collect();
		let sigma1: Vec<Vec<u8>> =
			(0..OT_EXT_U).map(|_| random_bits(OT_EXT_KAPPA, rng)).collect();

		let base_reply = base_ot_sender_step2::<P>(sid, base_msg, &sigma0, &sigma1, rng)?;
		let (ext, ext_msg) =
			OtExtReceiver::step1(sid, &sigma0, &sigma1, choice_bits, l, rng)?;

		Ok((OtReceiver { ext }, base_reply, ext_msg))
	}

	pub fn output(&self, msg: &OtExtMsg2) -> Result<Vec<Vec<u8>>> {
		self.ext.output(msg)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::curve::secp256k1::Point;
	use rand::{Rng as _, SeedableRng};

	#[test]
	fn base_ot_transfers_the_chosen_message() {
		let mut rng = Rng::from_seed([220; 32]);
		let choice = vec![false, true, true, false, true];
		let m = choice.len();

		let x0: Vec<Vec<u8>> =
			(0..m).map(|_| (0..16).map(|_| rng.gen()).collect()).collect();
		let x1: Vec<Vec<u8>> =
			(0..m).map(|_| (0..16).map(|_| rng.gen()).collect()).collect();

		let (receiver, msg1) = BaseOtReceiver::<Point>::step1(b"sid", &choice, &mut rng);
		let msg2 = base_ot_sender_step2::<Point>(b"sid", &msg1, &x0, &x1, &mut rng).unwrap();
		let out = receiver.output(&msg2).unwrap();

		for i in 0..m {
			let expected = if choice[i] { &x1[i] } else { &x0[i] };
			assert_eq!(&out[i], expected, "transfer {i}");
		}
	}

	#[test]
	fn combined_protocol_end_to_end() {
		let mut rng = Rng::from_seed([221; 32]);
		let m = 7;
		let l = 128;
		let choice: Vec<bool> = (0..m).map(|_| rng.gen()).collect();
		let x0: Vec<Vec<u8>> =
			(0..m).map(|_| (0..l / 8).map(|_| rng.gen()).collect()).collect();
		let x1: Vec<Vec<u8>> =
			(0..m).map(|_| (0..l / 8).map(|_| rng.gen()).collect()).collect();

		let (mut sender, base_msg1) = OtSender::<Point>::step1(b"session", &mut rng);
		let (receiver, base_msg2, ext_msg1) =
			OtReceiver::step2::<Point>(b"session", &base_msg1, &choice, l, &mut rng).unwrap();
		let ext_msg2 = sender.step3(&base_msg2, &ext_msg1, &x0, &x1).unwrap();
		let out = receiver.output(&ext_msg2).unwrap();

		for i in 0..m {
			let expected = if choice[i] { &x1[i] } else { &x0[i] };
			assert_eq!(&out[i], expected, "transfer {i}");
		}
	}

	#[test]
	fn combined_protocol_correlated_mode() {
		use num_bigint::BigUint;
		let mut rng = Rng::from_seed([222; 32]);
		let q = Point::order();
		let m = 4;
		let choice: Vec<bool> = (0..m).map(|_| rng.gen()).collect();
		let delta: Vec<BigUint> = (0..m).map(|_| q.rand(&mut rng)).collect();

		let (mut sender, base_msg1) = OtSender::<Point>::step1(b"session", &mut rng);
		let (receiver, base_msg2, ext_msg1) = OtReceiver::step2::<Point>(
			b"session",
			&base_msg1,
			&choice,
			q.byte_len() * 8,
			&mut rng,
		)
		.unwrap();
		let ext_msg2 =
			sender.step3_one_input_random(&base_msg2, &ext_msg1, &delta, q).unwrap();
		let out = receiver.output(&ext_msg2).unwrap();

		let (x0, x1) = sender.random_outputs().unwrap();
		for i in 0..m {
			let x0 = BigUint::from_bytes_be(&x0[i]);
			let x1 = BigUint::from_bytes_be(&x1[i]);
			assert_eq!(x1, q.reduce_vartime(&(&x0 + &delta[i])));
			let received = BigUint::from_bytes_be(&out[i]);
			assert_eq!(received, if choice[i] { x1 } else { x0 });
		}
	}
}
