//! NIST P-256 backend.

weierstrass_curve!(
	p256,
	"P-256",
	crate::curve::CURVE_CODE_P256,
	33,
	32,
	256,
	"FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551"
);
