// Copyright 2025 Chainflip Labs GmbH
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! Cross-module scenarios exercising the protocol stack end to end.

use std::collections::BTreeMap;

use mpc_crypto::{
	curve::{ed25519, p256, secp256k1, ECPoint, ECScalar},
	encoding::Encodable,
	paillier::{PaillierPrivateKey, Rerand},
	pve::{PveCiphertext, RecipientPrivateKey},
	sharing::{AccessStructure, NodeSpec},
	zk::dl::UcDlProof,
	Error, Rng,
};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::SeedableRng;

#[test]
fn ed25519_generator_has_the_standard_encoding() {
	type Scalar = <ed25519::Point as ECPoint>::Scalar;

	let one = Scalar::from(1);
	let point = ed25519::Point::from_scalar(&one);
	assert_eq!(
		hex::encode(point.to_bytes()),
		"5866666666666666666666666666666666666666666666666666666666666666"
	);
}

#[test]
fn paillier_zero_plaintext_homomorphisms() {
	let mut rng = Rng::from_seed([1; 32]);

	// Production-size key: two 1024-bit primes
	let key = PaillierPrivateKey::generate_with_bits(2048, &mut rng);
	let pk = key.public();
	assert_eq!(key.primes().0.bits(), 1024);
	assert_eq!(key.primes().1.bits(), 1024);

	let zero = BigUint::zero();
	let (c, _) = key.encrypt(&zero, &mut rng);
	pk.verify_cipher(&c).unwrap();
	assert!(key.decrypt(&c).is_zero());

	let (c2, _) = key.encrypt(&zero, &mut rng);
	let sum = pk.add_ciphers(&c, &c2, Rerand::Off, &mut rng);
	assert!(key.decrypt(&sum).is_zero());

	let scaled = pk.mul_scalar(&c, &BigUint::from(5u32), Rerand::Off, &mut rng);
	assert!(key.decrypt(&scaled).is_zero());
}

#[test]
fn uc_dl_round_trip_and_wire_mutation() {
	type Point = secp256k1::Point;
	type Scalar = <Point as ECPoint>::Scalar;

	let mut rng = Rng::from_seed([2; 32]);
	let w = Scalar::random(&mut rng);
	let q = Point::from_scalar(&w);

	let proof = UcDlProof::prove(&q, &w, b"session", 0, &mut rng);
	proof.verify(&q, b"session", 0, &mut rng).unwrap();

	// Flip the low bit of the first commitment point on the wire (its
	// SEC1 tag byte, i.e. the y parity)
	let bytes = bincode::serialize(&proof).unwrap();
	let mut mutated = bytes.clone();
	mutated[16] ^= 1;
	match bincode::deserialize::<UcDlProof<Point>>(&mutated) {
		// Either the flipped point no longer decodes...
		Err(_) => {},
		// ...or it decodes to a different point and the proof fails
		Ok(bad) => assert!(bad.verify(&q, b"session", 0, &mut rng).is_err()),
	}

	// The untouched serialisation still verifies
	let restored: UcDlProof<Point> = bincode::deserialize(&bytes).unwrap();
	restored.verify(&q, b"session", 0, &mut rng).unwrap();
}

#[test]
fn access_tree_quorum_matrix() {
	type Point = secp256k1::Point;
	type Scalar = <Point as ECPoint>::Scalar;

	let mut rng = Rng::from_seed([3; 32]);

	let ac = AccessStructure::new(NodeSpec::and(
		"",
		vec![
			NodeSpec::leaf("leaf1"),
			NodeSpec::or("g2", vec![NodeSpec::leaf("leaf2a"), NodeSpec::leaf("leaf2b")]),
			NodeSpec::threshold(
				"g3",
				2,
				vec![NodeSpec::leaf("leaf3a"), NodeSpec::leaf("leaf3b"), NodeSpec::leaf("leaf3c")],
			),
		],
	))
	.unwrap();

	let x = Scalar::random(&mut rng);
	let shares = ac.share::<Point>(&x, &mut rng);

	let subset = |names: &[&str]| -> BTreeMap<String, Scalar> {
		names.iter().map(|&name| (name.to_string(), shares[name].clone())).collect()
	};

	assert_eq!(
		ac.reconstruct::<Point>(&subset(&["leaf1", "leaf2a", "leaf3a", "leaf3b"])).unwrap(),
		x
	);
	// Missing the AND branch
	assert!(matches!(
		ac.reconstruct::<Point>(&subset(&["leaf2a", "leaf3a", "leaf3b"])),
		Err(Error::Insufficient(_))
	));
	// Threshold not met
	assert!(matches!(
		ac.reconstruct::<Point>(&subset(&["leaf1", "leaf2a", "leaf3a"])),
		Err(Error::Insufficient(_))
	));
}

#[test]
fn pve_basic_with_rsa_recipient() {
	type Point = p256::Point;
	type Scalar = <Point as ECPoint>::Scalar;

	let mut rng = Rng::from_seed([4; 32]);
	let recipient = RecipientPrivateKey::generate_rsa(&mut rng);

	let x = Scalar::random(&mut rng);
	let q = Point::from_scalar(&x);

	let pve = PveCiphertext::encrypt(&recipient.public(), b"key-backup", &x, &mut rng);
	pve.verify(&recipient.public(), &q, b"key-backup").unwrap();
	assert_eq!(pve.decrypt(&recipient, b"key-backup", false).unwrap(), x);

	// Flip one bit of the challenge string on the wire. Serialised layout:
	// the point (8-byte length prefix + compressed bytes), the label, then
	// the challenge bytes.
	let mut raw = bincode::serialize(&pve).unwrap();
	let b_offset = (8 + <Point as ECPoint>::COMPRESSED_SIZE) + (8 + b"key-backup".len()) + 8;
	raw[b_offset] ^= 1;
	let bad: PveCiphertext<Point> = bincode::deserialize(&raw).unwrap();
	assert!(matches!(
		bad.verify(&recipient.public(), &q, b"key-backup"),
		Err(Error::Crypto(_))
	));
}

#[test]
fn serialisation_round_trips_and_rejects_truncation() {
	type Point = secp256k1::Point;
	type Scalar = <Point as ECPoint>::Scalar;

	let mut rng = Rng::from_seed([5; 32]);

	let k = Scalar::random(&mut rng);
	let point = Point::from_scalar(&k);

	// The tagged canonical codec validates curve code, encoding, curve and
	// subgroup membership on the way in
	let encoded = point.to_encoded();
	assert_eq!(Point::from_encoded(&encoded).unwrap(), point);
	for cut in 0..encoded.len() {
		assert!(Point::from_encoded(&encoded[..cut]).is_err());
	}

	let scalar_encoded = k.to_encoded();
	assert_eq!(Scalar::from_encoded(&scalar_encoded).unwrap(), k);
}
