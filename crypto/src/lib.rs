//! Threshold and multi-party cryptographic primitives: constant-time
//! modular arithmetic, a uniform elliptic-curve interface, Paillier
//! encryption, UC-secure zero-knowledge proofs (Fischlin transform),
//! secret sharing over monotone access trees, publicly verifiable
//! encryption, TDH2 threshold encryption and oblivious transfer.

pub mod error;

pub mod arith;
pub mod commitment;
pub mod curve;
pub mod elgamal;
pub mod encoding;
pub mod hashing;
pub mod ot;
pub mod paillier;
pub mod pve;
pub mod sharing;
pub mod tdh2;
pub mod zk;

pub use error::{Error, Result};

// Ideally, we want to use a concrete implementation (like ChaCha20) instead of StdRng
// to prevent it from potentially changing from under us
pub type Rng = rand::rngs::StdRng;
