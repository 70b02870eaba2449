//! OT extension: stretch 256 base oblivious transfers of short seeds into
//! many transfers of chosen, half-random or fully random messages, with a
//! correlation check against a malicious receiver.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
	arith::Modulus,
	error::{ensure_arg, ensure_crypto, Result},
	hashing::{
		ro::{bit_of, drbg_sample_string, Ro},
		sha256,
	},
	ot::{random_bits, set_bit, xor_bytes, xor_in_place},
	Rng,
};

use super::transpose::ot_matrix_transpose;

/// Number of base OTs (and matrix rows).
pub const OT_EXT_U: usize = 256;
/// Seed and check-value width in bits.
pub const OT_EXT_KAPPA: usize = 128;
/// Consistency checks per row.
const OT_EXT_D: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtExtMsg1 {
	/// The masked rows U_i = sigma'_0(i) ^ sigma'_1(i) ^ r
	u: Vec<Vec<u8>>,
	/// Check values, d per row
	v0: Vec<Vec<u8>>,
	v1: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OtExtMsg2 {
	/// Empty in the sender-one-input-random mode
	w0: Vec<Vec<u8>>,
	w1: Vec<Vec<u8>>,
}

pub struct OtExtReceiver {
	/// Message width in bits (a multiple of 8)
	l: usize,
	m: usize,
	r: Vec<u8>,
	t_columns: Vec<[u8; 32]>,
}

pub struct OtExtSender {
	l: usize,
	m: usize,
	/// Chosen-input mode keeps nothing; the random modes keep the derived
	/// messages
	pub x0_random: Vec<Vec<u8>>,
	pub x1_random: Vec<Vec<u8>>,
}

fn total_columns(m: usize) -> usize {
	// Round up so whole 256-column transposition blocks cover everything
	let needed = m + OT_EXT_KAPPA;
	(needed + 255) / 256 * 256
}

/// e = RO(sid, U) expanded to one byte per check: the partner row index.
fn check_indices(sid: &[u8], u: &[Vec<u8>]) -> Vec<u8> {
	Ro::new().feed(sid).feed(u).bits(8 * OT_EXT_U * OT_EXT_D)
}

fn hash_matrix_line(index: usize, line: &[u8; 32], l: usize) -> Vec<u8> {
	if l == 256 {
		// For 256-bit lines a plain hash is cheaper than the oracle
		sha256(&[&(index as u32).to_be_bytes(), line]).to_vec()
	} else {
		Ro::new().feed(&(index as u32)).feed(line).bits(l)
	}
}

impl OtExtReceiver {
	/// Receiver step: derive the T matrix from the base-OT seed pairs and
	/// the choice bits, and send the masked rows plus check values.
	pub fn step1(
		sid: &[u8],
		sigma0: &[Vec<u8>],
		sigma1: &[Vec<u8>],
		choice_bits: &[bool],
		l: usize,
		rng: &mut Rng,
	) -> Result<(Self, OtExtMsg1)> {
		ensure_arg!(sigma0.len() == OT_EXT_U, "wrong seed count");
		ensure_arg!(sigma1.len() == OT_EXT_U, "wrong seed count");
		ensure_arg!(!choice_bits.is_empty(), "no choice bits");

		let l = (l + 7) & !7;
		let m = choice_bits.len();
		let total = total_columns(m);

		// r = choice bits followed by random padding
		let mut r = random_bits(total, rng);
		for (i, &bit) in choice_bits.iter().enumerate() {
			set_bit(&mut r, i, bit);
		}

		let mut t_rows = Vec::with_capacity(OT_EXT_U);
		let mut u = Vec::with_capacity(OT_EXT_U);
		let mut sigma_tag0 = Vec::with_capacity(OT_EXT_U);

		for i in 0..OT_EXT_U {
			let st0 = drbg_sample_string(&sigma0[i], total);
			let st1 = drbg_sample_string(&sigma1[i], total);

			let mut ui = xor_bytes(&st0, &st1);
			xor_in_place(&mut ui, &r);
			u.push(ui);
			t_rows.push(st0.clone());
			sigma_tag0.push(st0);
		}

		let t_columns = ot_matrix_transpose(&t_rows, total);

		let e = check_indices(sid, &u);
		let mut v0 = Vec::with_capacity(OT_EXT_U * OT_EXT_D);
		let mut v1 = Vec::with_capacity(OT_EXT_U * OT_EXT_D);
		for alpha in 0..OT_EXT_U {
			for j in 0..OT_EXT_D {
				let beta = e[OT_EXT_D * alpha + j] as usize;
				let mixed = xor_bytes(&sigma_tag0[alpha], &sigma_tag0[beta]);
				v0.push(Ro::new().feed(&mixed).bits(OT_EXT_KAPPA));
				let mut mixed_r = mixed;
				xor_in_place(&mut mixed_r, &r);
				v1.push(Ro::new().feed(&mixed_r).bits(OT_EXT_KAPPA));
			}
		}

		Ok((OtExtReceiver { l, m, r, t_columns }, OtExtMsg1 { u, v0, v1 }))
	}

	/// Take the sender's masked messages and produce the chosen outputs.
	pub fn output(&self, msg: &OtExtMsg2) -> Result<Vec<Vec<u8>>> {
		let one_input_random = msg.w0.is_empty();
		if !one_input_random {
			ensure_crypto!(msg.w0.len() == self.m, "wrong w0 count");
		}
		ensure_crypto!(msg.w1.len() == self.m, "wrong w1 count");
		let l_bytes = self.l / 8;

		let mut out = Vec::with_capacity(self.m);
		for i in 0..self.m {
			let mut x = hash_matrix_line(i, &self.t_columns[i], self.l);
			let r_i = bit_of(&self.r, i);

			if one_input_random {
				if r_i {
					ensure_crypto!(msg.w1[i].len() == l_bytes, "w1 size mismatch");
					xor_in_place(&mut x, &msg.w1[i]);
				}
			} else {
				let w = if r_i { &msg.w1[i] } else { &msg.w0[i] };
				ensure_crypto!(w.len() == l_bytes, "w size mismatch");
				xor_in_place(&mut x, w);
			}
			out.push(x);
		}
		Ok(out)
	}
}

enum SenderInputs<'a> {
	Chosen { x0: &'a [Vec<u8>], x1: &'a [Vec<u8>] },
	OneInputRandom { delta: &'a [BigUint], q: &'a Modulus },
	Random { m: usize, l: usize },
}

impl OtExtSender {
	/// Both sender inputs chosen.
	pub fn step2(
		sid: &[u8],
		s_bits: &[u8],
		sigma: &[Vec<u8>],
		msg: &OtExtMsg1,
		x0: &[Vec<u8>],
		x1: &[Vec<u8>],
	) -> Result<(Self, OtExtMsg2)> {
		ensure_arg!(!x0.is_empty(), "no sender inputs");
		ensure_arg!(x0.len() == x1.len(), "input length mismatch");
		Self::step2_helper(sid, s_bits, sigma, msg, SenderInputs::Chosen { x0, x1 })
	}

	/// The sender's zero-side message is random; only the correlation
	/// delta (mod q) is chosen. The derived pairs are left in
	/// `x0_random` / `x1_random` as canonical byte encodings.
	pub fn step2_one_input_random(
		sid: &[u8],
		s_bits: &[u8],
		sigma: &[Vec<u8>],
		msg: &OtExtMsg1,
		delta: &[BigUint],
		q: &Modulus,
	) -> Result<(Self, OtExtMsg2)> {
		ensure_arg!(!delta.is_empty(), "no correlation values");
		Self::step2_helper(sid, s_bits, sigma, msg, SenderInputs::OneInputRandom { delta, q })
	}

	/// Both sender messages random; nothing about them is transmitted.
	pub fn step2_sender_random(
		sid: &[u8],
		s_bits: &[u8],
		sigma: &[Vec<u8>],
		msg: &OtExtMsg1,
		m: usize,
		l: usize,
	) -> Result<(Self, OtExtMsg2)> {
		Self::step2_helper(sid, s_bits, sigma, msg, SenderInputs::Random { m, l })
	}

	fn step2_helper(
		sid: &[u8],
		s_bits: &[u8],
		sigma: &[Vec<u8>],
		msg: &OtExtMsg1,
		inputs: SenderInputs,
	) -> Result<(Self, OtExtMsg2)> {
		ensure_arg!(s_bits.len() == OT_EXT_U / 8, "wrong choice bit count");
		ensure_arg!(sigma.len() == OT_EXT_U, "wrong seed count");
		ensure_crypto!(msg.u.len() == OT_EXT_U, "wrong row count");
		ensure_crypto!(msg.v0.len() == OT_EXT_U * OT_EXT_D, "wrong check count");
		ensure_crypto!(msg.v1.len() == OT_EXT_U * OT_EXT_D, "wrong check count");

		let (m, l) = match &inputs {
			SenderInputs::Chosen { x0, .. } => (x0.len(), x0[0].len() * 8),
			SenderInputs::OneInputRandom { delta, q } =>
				(delta.len(), q.byte_len() * 8),
			SenderInputs::Random { m, l } => (*m, (*l + 7) & !7),
		};
		let total = total_columns(m);
		let row_bytes = total / 8;

		let mut q_rows = Vec::with_capacity(OT_EXT_U);
		for i in 0..OT_EXT_U {
			ensure_crypto!(msg.u[i].len() == row_bytes, "row size mismatch");
			let mut st = drbg_sample_string(&sigma[i], total);
			if bit_of(s_bits, i) {
				xor_in_place(&mut st, &msg.u[i]);
			}
			q_rows.push(st);
		}

		// Correlation check: catches a receiver whose U rows are not all
		// built from the same r
		let e = check_indices(sid, &msg.u);
		for alpha in 0..OT_EXT_U {
			for j in 0..OT_EXT_D {
				let index = OT_EXT_D * alpha + j;
				let beta = e[index] as usize;
				let b = bit_of(s_bits, alpha) ^ bit_of(s_bits, beta);
				let expected = if b { &msg.v1[index] } else { &msg.v0[index] };

				let mixed = xor_bytes(&q_rows[alpha], &q_rows[beta]);
				let t = Ro::new().feed(&mixed).bits(OT_EXT_KAPPA);
				if &t != expected {
					tracing::warn!(alpha, beta, "OT extension consistency check failed");
					return Err(crate::Error::Crypto("correlation check failed"))
				}
			}
		}

		let q_columns = ot_matrix_transpose(&q_rows, total);
		let s_buf: [u8; 32] = s_bits.try_into().expect("sized");
		let l_bytes = l / 8;

		let mut w0 = Vec::new();
		let mut w1 = Vec::with_capacity(m);
		let mut x0_random = Vec::new();
		let mut x1_random = Vec::new();

		for i in 0..m {
			let w0_bin = hash_matrix_line(i, &q_columns[i], l);
			let mut line1 = q_columns[i];
			xor_in_place(&mut line1, &s_buf);
			let w1_bin = hash_matrix_line(i, &line1, l);

			match &inputs {
				SenderInputs::Chosen { x0, x1 } => {
					ensure_arg!(x0[i].len() == l_bytes, "x0 size mismatch");
					ensure_arg!(x1[i].len() == l_bytes, "x1 size mismatch");
					w0.push(xor_bytes(&w0_bin, &x0[i]));
					w1.push(xor_bytes(&w1_bin, &x1[i]));
				},
				SenderInputs::OneInputRandom { delta, q } => {
					// x0 stays the raw line hash (the receiver's zero-side
					// output is exactly that string); only x1 is reduced
					let x0_val = BigUint::from_bytes_be(&w0_bin);
					let x1_val =
						q.reduce_vartime(&(x0_val + q.reduce_vartime(&delta[i])));

					let mut x1_bin = vec![0u8; l_bytes];
					let raw = x1_val.to_bytes_be();
					x1_bin[l_bytes - raw.len()..].copy_from_slice(&raw);
					w1.push(xor_bytes(&w1_bin, &x1_bin));

					x0_random.push(w0_bin);
					x1_random.push(x1_bin);
				},
				SenderInputs::Random { .. } => {
					x0_random.push(w0_bin);
					x1_random.push(w1_bin);
					// Nothing is sent; the receiver's line hash is its
					// output directly
					w1.push(vec![0u8; l_bytes]);
				},
			}
		}

		// In the fully random mode the receiver needs no message at all;
		// zero masks keep the message shape uniform
		if matches!(inputs, SenderInputs::Random { .. }) {
			w0 = vec![vec![0u8; l_bytes]; m];
		}

		Ok((OtExtSender { l, m, x0_random, x1_random }, OtExtMsg2 { w0, w1 }))
	}

	pub fn message_bits(&self) -> usize {
		self.l
	}

	pub fn count(&self) -> usize {
		self.m
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Error;
	use rand::{Rng as _, SeedableRng};

	fn seeds(rng: &mut Rng) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
		let gen = |rng: &mut Rng| {
			(0..OT_EXT_U)
				.map(|_| (0..OT_EXT_KAPPA / 8).map(|_| rng.gen()).collect())
				.collect()
		};
		(gen(rng), gen(rng))
	}

	/// Simulate the base OT: the sender holds sigma_{s_i} for its choice
	/// bits s.
	fn base_ot_outputs(
		sigma0: &[Vec<u8>],
		sigma1: &[Vec<u8>],
		s_bits: &[u8],
	) -> Vec<Vec<u8>> {
		(0..OT_EXT_U)
			.map(|i| {
				if bit_of(s_bits, i) {
					sigma1[i].clone()
				} else {
					sigma0[i].clone()
				}
			})
			.collect()
	}

	#[test]
	fn chosen_input_extension() {
		let mut rng = Rng::from_seed([210; 32]);
		let (sigma0, sigma1) = seeds(&mut rng);
		let s_bits: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
		let sigma = base_ot_outputs(&sigma0, &sigma1, &s_bits);

		let m = 10;
		let l = 128;
		let choice: Vec<bool> = (0..m).map(|_| rng.gen()).collect();
		let x0: Vec<Vec<u8>> = (0..m).map(|_| (0..l / 8).map(|_| rng.gen()).collect()).collect();
		let x1: Vec<Vec<u8>> = (0..m).map(|_| (0..l / 8).map(|_| rng.gen()).collect()).collect();

		let (receiver, msg1) =
			OtExtReceiver::step1(b"sid", &sigma0, &sigma1, &choice, l, &mut rng).unwrap();
		let (_sender, msg2) =
			OtExtSender::step2(b"sid", &s_bits, &sigma, &msg1, &x0, &x1).unwrap();
		let out = receiver.output(&msg2).unwrap();

		for i in 0..m {
			let expected = if choice[i] { &x1[i] } else { &x0[i] };
			assert_eq!(&out[i], expected, "transfer {i}");
		}
	}

	#[test]
	fn sender_one_input_random_mode() {
		use num_traits::One;

		let mut rng = Rng::from_seed([211; 32]);
		let (sigma0, sigma1) = seeds(&mut rng);
		let s_bits: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
		let sigma = base_ot_outputs(&sigma0, &sigma1, &s_bits);

		let q = Modulus::new(
			(BigUint::one() << 255u32) - BigUint::from(19u32),
		)
		.unwrap();
		let m = 6;
		let choice: Vec<bool> = (0..m).map(|_| rng.gen()).collect();
		let delta: Vec<BigUint> = (0..m).map(|_| q.rand(&mut rng)).collect();

		let l = q.byte_len() * 8;
		let (receiver, msg1) =
			OtExtReceiver::step1(b"sid", &sigma0, &sigma1, &choice, l, &mut rng).unwrap();
		let (sender, msg2) =
			OtExtSender::step2_one_input_random(b"sid", &s_bits, &sigma, &msg1, &delta, &q)
				.unwrap();
		let out = receiver.output(&msg2).unwrap();

		for i in 0..m {
			let x0 = BigUint::from_bytes_be(&sender.x0_random[i]);
			let x1 = BigUint::from_bytes_be(&sender.x1_random[i]);
			assert_eq!(x1, q.reduce_vartime(&(&x0 + &delta[i])), "correlation {i}");

			let received = BigUint::from_bytes_be(&out[i]);
			assert_eq!(received, if choice[i] { x1 } else { x0 }, "transfer {i}");
		}
	}

	#[test]
	fn sender_random_mode() {
		let mut rng = Rng::from_seed([212; 32]);
		let (sigma0, sigma1) = seeds(&mut rng);
		let s_bits: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
		let sigma = base_ot_outputs(&sigma0, &sigma1, &s_bits);

		let m = 5;
		let l = 256;
		let choice: Vec<bool> = (0..m).map(|_| rng.gen()).collect();

		let (receiver, msg1) =
			OtExtReceiver::step1(b"sid", &sigma0, &sigma1, &choice, l, &mut rng).unwrap();
		let (sender, msg2) =
			OtExtSender::step2_sender_random(b"sid", &s_bits, &sigma, &msg1, m, l).unwrap();
		let out = receiver.output(&msg2).unwrap();

		for i in 0..m {
			let expected =
				if choice[i] { &sender.x1_random[i] } else { &sender.x0_random[i] };
			assert_eq!(&out[i], expected, "transfer {i}");
		}
	}

	#[test]
	fn inconsistent_rows_fail_the_check() {
		let mut rng = Rng::from_seed([213; 32]);
		let (sigma0, sigma1) = seeds(&mut rng);
		let s_bits: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
		let sigma = base_ot_outputs(&sigma0, &sigma1, &s_bits);

		let choice: Vec<bool> = (0..4).map(|_| rng.gen()).collect();
		let x: Vec<Vec<u8>> = (0..4).map(|_| vec![0u8; 16]).collect();

		let (_, mut msg1) =
			OtExtReceiver::step1(b"sid", &sigma0, &sigma1, &choice, 128, &mut rng).unwrap();
		// A malicious receiver flips a bit in one masked row
		msg1.u[17][0] ^= 1;
		assert!(matches!(
			OtExtSender::step2(b"sid", &s_bits, &sigma, &msg1, &x, &x),
			Err(Error::Crypto(_))
		));
	}
}
