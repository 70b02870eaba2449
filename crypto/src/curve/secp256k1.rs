//! secp256k1 backend (k256 arithmetic).

weierstrass_curve!(
	k256,
	"secp256k1",
	crate::curve::CURVE_CODE_SECP256K1,
	33,
	32,
	256,
	"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141"
);

#[test]
fn generator_matches_the_sec2_constant() {
	use crate::curve::ECPoint;

	assert_eq!(
		hex::encode(Point::generator().to_bytes()),
		"0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
	);
}

#[test]
fn ensure_serialization_is_consistent() {
	// Test against pre-computed values to ensure that
	// serialization does not change unintentionally
	use crate::curve::ECPoint;

	let point = Point::generator();
	let bytes = bincode::serialize(&point).unwrap();

	let mut expected = 33u64.to_le_bytes().to_vec();
	expected.extend(
		hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
			.unwrap(),
	);
	assert_eq!(bytes, expected);

	let recovered: Point = bincode::deserialize(&bytes).unwrap();
	assert_eq!(recovered, point);
}
