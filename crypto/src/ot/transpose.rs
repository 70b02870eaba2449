//! Bit-matrix transposition for the OT extension's 256-row intermediate
//! state: a portable 16x8-block kernel (the classic movemask construction
//! over two 64-bit lanes).

/// Transpose an nrows x ncols bit matrix; both dimensions must be
/// multiples of 8 and nrows a multiple of 16. Input and output are
/// row-major bit matrices (LSB-first within each byte row).
pub fn matrix_transpose(inp: &[u8], out: &mut [u8], nrows: usize, ncols: usize) {
	assert!(nrows % 16 == 0 && ncols % 8 == 0, "unsupported matrix shape");
	assert_eq!(inp.len(), nrows * ncols / 8);
	assert_eq!(out.len(), nrows * ncols / 8);

	let inp_byte = |x: usize, y: usize| inp[x * ncols / 8 + y / 8];

	for rr in (0..nrows).step_by(16) {
		for cc in (0..ncols).step_by(8) {
			// Load a 16x8 block into two 64-bit lanes
			let mut block = [0u8; 16];
			for (i, byte) in block.iter_mut().enumerate() {
				*byte = inp_byte(rr + i, cc);
			}
			let mut lo = u64::from_le_bytes(block[..8].try_into().expect("sized"));
			let mut hi = u64::from_le_bytes(block[8..].try_into().expect("sized"));

			// Peel off the per-byte MSBs, one output bit column at a time
			for i in (0..8).rev() {
				let mut mask: u16 = 0;
				for j in 0..8 {
					mask |= (((lo >> (8 * j + 7)) & 1) as u16) << j;
					mask |= (((hi >> (8 * j + 7)) & 1) as u16) << (j + 8);
				}
				let offset = (cc + i) * nrows / 8 + rr / 8;
				out[offset] = mask as u8;
				out[offset + 1] = (mask >> 8) as u8;

				lo <<= 1;
				hi <<= 1;
			}
		}
	}
}

/// Transpose the 256-row extension matrix (rows of `cols/8` bytes each)
/// into per-column 32-byte strings. `cols` must be a multiple of 256.
pub fn ot_matrix_transpose(rows: &[Vec<u8>], cols: usize) -> Vec<[u8; 32]> {
	assert_eq!(rows.len(), 256);
	assert!(cols % 256 == 0, "column count must be a multiple of 256");

	let mut columns = vec![[0u8; 32]; cols];
	let mut block_in = vec![0u8; 256 * 32];
	let mut block_out = vec![0u8; 256 * 32];

	for block in 0..cols / 256 {
		for (j, row) in rows.iter().enumerate() {
			block_in[j * 32..(j + 1) * 32]
				.copy_from_slice(&row[32 * block..32 * (block + 1)]);
		}
		matrix_transpose(&block_in, &mut block_out, 256, 256);
		for y in 0..256 {
			columns[block * 256 + y].copy_from_slice(&block_out[y * 32..(y + 1) * 32]);
		}
	}
	columns
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::{Rng as _, SeedableRng};

	fn get_bit(bytes: &[u8], i: usize) -> bool {
		(bytes[i / 8] >> (i % 8)) & 1 == 1
	}

	#[test]
	fn transpose_matches_naive() {
		let mut rng = crate::Rng::from_seed([200; 32]);
		let (nrows, ncols) = (32, 64);
		let inp: Vec<u8> = (0..nrows * ncols / 8).map(|_| rng.gen()).collect();
		let mut out = vec![0u8; nrows * ncols / 8];
		matrix_transpose(&inp, &mut out, nrows, ncols);

		for x in 0..nrows {
			for y in 0..ncols {
				let original = get_bit(&inp[x * ncols / 8..], y % 8 + (y / 8) * 8);
				let transposed = get_bit(&out[y * nrows / 8..], x);
				assert_eq!(original, transposed, "bit ({x}, {y})");
			}
		}
	}

	#[test]
	fn double_transpose_is_identity() {
		let mut rng = crate::Rng::from_seed([201; 32]);
		let inp: Vec<u8> = (0..256 * 32).map(|_| rng.gen()).collect();
		let mut once = vec![0u8; 256 * 32];
		let mut twice = vec![0u8; 256 * 32];
		matrix_transpose(&inp, &mut once, 256, 256);
		matrix_transpose(&once, &mut twice, 256, 256);
		assert_eq!(inp, twice);
	}

	#[test]
	fn row_column_consistency() {
		let mut rng = crate::Rng::from_seed([202; 32]);
		let cols = 512;
		let rows: Vec<Vec<u8>> =
			(0..256).map(|_| (0..cols / 8).map(|_| rng.gen()).collect()).collect();
		let columns = ot_matrix_transpose(&rows, cols);

		for (i, row) in rows.iter().enumerate() {
			for (y, column) in columns.iter().enumerate() {
				assert_eq!(get_bit(row, y), get_bit(column, i));
			}
		}
	}
}
