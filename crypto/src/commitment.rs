//! Hiding and binding byte commitments bound to a committing party, an
//! optional receiver and a session context.
//!
//! The commitment message is HMAC-SHA-256 under the fixed random-oracle key
//! over (randomness, payload, SID, committer PID, optional receiver PID).
//! When no external SID is supplied a fresh 128-bit local SID is sampled
//! and embedded into the message; the caller is then responsible for never
//! reusing a commitment instance.

use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::{
	error::{ensure_crypto, Result},
	hashing::ro::Ro,
	Rng,
};

pub const HASH_SIZE: usize = 32;
pub const LOCAL_SID_SIZE: usize = 16;

/// Identifies who is committing, to whom, and under which session.
#[derive(Clone, Debug, Default)]
pub struct CommitmentId {
	/// Externally agreed session id; uniqueness is then enforced by the
	/// caller. When absent a local SID is sampled per commitment.
	pub sid: Option<Vec<u8>>,
	/// Committing party identifier (e.g. the encoded PID scalar).
	pub pid: Vec<u8>,
	/// Binds the commitment to a specific recipient when set.
	pub receiver_pid: Option<Vec<u8>>,
}

impl CommitmentId {
	pub fn new(pid: impl Into<Vec<u8>>) -> Self {
		CommitmentId { sid: None, pid: pid.into(), receiver_pid: None }
	}

	pub fn with_sid(mut self, sid: impl Into<Vec<u8>>) -> Self {
		self.sid = Some(sid.into());
		self
	}

	pub fn with_receiver(mut self, receiver_pid: impl Into<Vec<u8>>) -> Self {
		self.receiver_pid = Some(receiver_pid.into());
		self
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
	/// Opening randomness, revealed at decommit time.
	pub rand: [u8; 32],
	/// Commitment message: the hash, with the local SID appended when one
	/// was generated.
	pub msg: Vec<u8>,
}

fn commitment_hash(id: &CommitmentId, rand: &[u8; 32], local_sid: &[u8], payload: &[u8]) -> [u8; 32] {
	let mut ro = Ro::new().feed(rand).feed(payload);
	match &id.sid {
		Some(sid) => ro = ro.feed(sid.as_slice()),
		None => ro = ro.feed(local_sid),
	}
	ro = ro.feed(id.pid.as_slice());
	if let Some(receiver) = &id.receiver_pid {
		ro = ro.feed(receiver.as_slice());
	}
	ro.bits256()
}

impl Commitment {
	/// Commit to the given payload (the canonical encoding of the values
	/// being committed).
	pub fn generate(id: &CommitmentId, payload: &[u8], rng: &mut Rng) -> Self {
		let mut rand = [0u8; 32];
		rng.fill_bytes(&mut rand);
		Self::generate_with_rand(id, payload, rand, rng)
	}

	pub fn generate_with_rand(
		id: &CommitmentId,
		payload: &[u8],
		rand: [u8; 32],
		rng: &mut Rng,
	) -> Self {
		let mut local_sid = [0u8; LOCAL_SID_SIZE];
		if id.sid.is_none() {
			assert!(!id.pid.is_empty(), "a local sid requires a committer pid");
			rng.fill_bytes(&mut local_sid);
		}

		let hash = commitment_hash(id, &rand, &local_sid, payload);
		let mut msg = hash.to_vec();
		if id.sid.is_none() {
			msg.extend_from_slice(&local_sid);
		}
		Commitment { rand, msg }
	}

	/// Verify the opening of this commitment against the same identity and
	/// payload. With a local SID the message carries it; with an external
	/// SID the message is the bare hash.
	pub fn open(&self, id: &CommitmentId, payload: &[u8]) -> Result<()> {
		let (hash_part, local_sid): (&[u8], &[u8]) = if id.sid.is_some() {
			ensure_crypto!(self.msg.len() == HASH_SIZE, "bad commitment size");
			(&self.msg, &[])
		} else {
			ensure_crypto!(
				self.msg.len() == HASH_SIZE + LOCAL_SID_SIZE,
				"bad commitment size"
			);
			(&self.msg[..HASH_SIZE], &self.msg[HASH_SIZE..])
		};

		let expected = commitment_hash(id, &self.rand, local_sid, payload);
		ensure_crypto!(
			bool::from(expected.ct_eq(hash_part)),
			"commitment opening mismatch"
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn pid(x: u8) -> Vec<u8> {
		vec![x; 32]
	}

	#[test]
	fn open_succeeds_with_matching_binding() {
		let mut rng = Rng::from_seed([40; 32]);
		let id = CommitmentId::new(pid(1));
		let com = Commitment::generate(&id, b"payload", &mut rng);
		assert!(com.open(&id, b"payload").is_ok());
	}

	#[test]
	fn open_fails_on_any_mismatch() {
		let mut rng = Rng::from_seed([41; 32]);
		let id = CommitmentId::new(pid(1)).with_sid(b"session".to_vec());
		let com = Commitment::generate(&id, b"payload", &mut rng);
		assert!(com.open(&id, b"payload").is_ok());

		// Wrong payload
		assert!(com.open(&id, b"other payload").is_err());
		// Wrong committer
		assert!(com.open(&CommitmentId::new(pid(2)).with_sid(b"session".to_vec()), b"payload")
			.is_err());
		// Wrong session
		assert!(com.open(&CommitmentId::new(pid(1)).with_sid(b"other".to_vec()), b"payload")
			.is_err());
		// Tampered randomness
		let mut bad = com.clone();
		bad.rand[0] ^= 1;
		assert!(bad.open(&id, b"payload").is_err());
		// Tampered message
		let mut bad = com;
		bad.msg[0] ^= 1;
		assert!(bad.open(&id, b"payload").is_err());
	}

	#[test]
	fn local_sid_is_embedded_and_bound() {
		let mut rng = Rng::from_seed([42; 32]);
		let id = CommitmentId::new(pid(3));
		let com = Commitment::generate(&id, b"x", &mut rng);
		assert_eq!(com.msg.len(), HASH_SIZE + LOCAL_SID_SIZE);

		// Flipping a bit of the embedded sid breaks the opening
		let mut bad = com.clone();
		bad.msg[HASH_SIZE] ^= 1;
		assert!(bad.open(&id, b"x").is_err());
		assert!(com.open(&id, b"x").is_ok());
	}

	#[test]
	fn receiver_binding_is_enforced() {
		let mut rng = Rng::from_seed([43; 32]);
		let id = CommitmentId::new(pid(1)).with_receiver(pid(9));
		let com = Commitment::generate(&id, b"m", &mut rng);
		assert!(com.open(&id, b"m").is_ok());
		assert!(com.open(&CommitmentId::new(pid(1)).with_receiver(pid(8)), b"m").is_err());
		assert!(com.open(&CommitmentId::new(pid(1)), b"m").is_err());
	}
}
