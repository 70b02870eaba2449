//! NIST P-521 backend.

weierstrass_curve!(
	p521,
	"P-521",
	crate::curve::CURVE_CODE_P521,
	67,
	66,
	521,
	"01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFA51868783BF2F966B7FCC0148F709A5D03BB5C9B8899C47AEBB6FB71E91386409"
);
