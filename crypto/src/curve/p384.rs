//! NIST P-384 backend.

weierstrass_curve!(
	p384,
	"P-384",
	crate::curve::CURVE_CODE_P384,
	49,
	48,
	384,
	"FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFC7634D81F4372DDF581A0DB248B0A77AECEC196ACCC52973"
);
