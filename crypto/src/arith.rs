//! Arbitrary-precision modular arithmetic with constant-time code paths.

mod limbs;
mod montgomery;

pub mod modulus;
pub mod prime;

pub use modulus::{inv_mod_vartime, InvAlgo, Modulus};
