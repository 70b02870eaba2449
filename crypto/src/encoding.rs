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

//! Canonical binary codec used for wire formats and hash transcripts.
//!
//! Primitive integers are big-endian fixed width. Byte sequences carry a
//! self-describing length prefix of one to four bytes encoding the length in
//! 7/14/21/29 bits: the top bit of each header byte indicates that another
//! header byte follows. Deserialisers reject any length that exceeds the
//! remaining input.

use num_bigint::BigUint;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

const MAX_VARINT_LEN: u32 = (1 << 29) - 1;

/// An owned byte buffer whose contents are wiped on drop. Used for secret
/// material (DRBG seeds, decrypted plaintexts, commitment randomness).
#[derive(Clone, Debug, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretBuf(pub Vec<u8>);

impl SecretBuf {
	pub fn new(bytes: Vec<u8>) -> Self {
		SecretBuf(bytes)
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}
}

impl AsRef<[u8]> for SecretBuf {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

pub struct ByteWriter {
	out: Vec<u8>,
}

impl ByteWriter {
	pub fn new() -> Self {
		ByteWriter { out: Vec::new() }
	}

	pub fn write_u8(&mut self, v: u8) {
		self.out.push(v);
	}

	pub fn write_u16(&mut self, v: u16) {
		self.out.extend_from_slice(&v.to_be_bytes());
	}

	pub fn write_u32(&mut self, v: u32) {
		self.out.extend_from_slice(&v.to_be_bytes());
	}

	pub fn write_u64(&mut self, v: u64) {
		self.out.extend_from_slice(&v.to_be_bytes());
	}

	pub fn write_bool(&mut self, v: bool) {
		self.write_u8(v as u8);
	}

	/// Variable-length length prefix: 7 bits per header byte, top bit set
	/// on all but the last header byte.
	pub fn write_len(&mut self, len: usize) {
		assert!(len as u64 <= MAX_VARINT_LEN as u64, "length exceeds varint range");
		let len = len as u32;
		let mut groups = [0u8; 4];
		let mut count = 0;
		let mut v = len;
		loop {
			groups[count] = (v & 0x7f) as u8;
			count += 1;
			v >>= 7;
			if v == 0 {
				break
			}
		}
		for i in (1..count).rev() {
			self.out.push(groups[i] | 0x80);
		}
		self.out.push(groups[0]);
	}

	pub fn write_bytes(&mut self, bytes: &[u8]) {
		self.write_len(bytes.len());
		self.out.extend_from_slice(bytes);
	}

	/// Raw append without a length prefix (fixed-size fields).
	pub fn write_raw(&mut self, bytes: &[u8]) {
		self.out.extend_from_slice(bytes);
	}

	pub fn write_bigint(&mut self, v: &BigUint) {
		self.write_bytes(&v.to_bytes_be());
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.out
	}
}

pub struct ByteReader<'a> {
	input: &'a [u8],
	offset: usize,
}

impl<'a> ByteReader<'a> {
	pub fn new(input: &'a [u8]) -> Self {
		ByteReader { input, offset: 0 }
	}

	pub fn remaining(&self) -> usize {
		self.input.len() - self.offset
	}

	pub fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	fn take(&mut self, n: usize) -> Result<&'a [u8]> {
		if self.remaining() < n {
			return Err(Error::Format("truncated input"))
		}
		let out = &self.input[self.offset..self.offset + n];
		self.offset += n;
		Ok(out)
	}

	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.take(1)?[0])
	}

	pub fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.take(2)?.try_into().expect("sized slice")))
	}

	pub fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.take(4)?.try_into().expect("sized slice")))
	}

	pub fn read_u64(&mut self) -> Result<u64> {
		Ok(u64::from_be_bytes(self.take(8)?.try_into().expect("sized slice")))
	}

	pub fn read_bool(&mut self) -> Result<bool> {
		match self.read_u8()? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(Error::Format("invalid boolean")),
		}
	}

	pub fn read_len(&mut self) -> Result<usize> {
		let mut value: u32 = 0;
		for i in 0..4 {
			let byte = self.read_u8()?;
			value = (value << 7) | u32::from(byte & 0x7f);
			if byte & 0x80 == 0 {
				return Ok(value as usize)
			}
			if i == 3 {
				break
			}
		}
		Err(Error::Format("overlong length prefix"))
	}

	pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
		let len = self.read_len()?;
		if len > self.remaining() {
			return Err(Error::Format("length exceeds remaining input"))
		}
		Ok(self.take(len)?.to_vec())
	}

	pub fn read_raw(&mut self, n: usize) -> Result<Vec<u8>> {
		Ok(self.take(n)?.to_vec())
	}

	pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		Ok(self.take(N)?.try_into().expect("sized slice"))
	}

	pub fn read_bigint(&mut self) -> Result<BigUint> {
		Ok(BigUint::from_bytes_be(&self.read_bytes()?))
	}

	/// Fail unless the whole input has been consumed.
	pub fn finish(self) -> Result<()> {
		if self.remaining() != 0 {
			return Err(Error::Format("trailing bytes"))
		}
		Ok(())
	}
}

/// Binary round trip for cryptographic objects.
pub trait Encodable: Sized {
	fn encode(&self, writer: &mut ByteWriter);
	fn decode(reader: &mut ByteReader) -> Result<Self>;

	fn to_encoded(&self) -> Vec<u8> {
		let mut writer = ByteWriter::new();
		self.encode(&mut writer);
		writer.into_bytes()
	}

	fn from_encoded(bytes: &[u8]) -> Result<Self> {
		let mut reader = ByteReader::new(bytes);
		let value = Self::decode(&mut reader)?;
		reader.finish()?;
		Ok(value)
	}
}

/// Bytes encode raw; the enclosing `Vec` provides the length prefix, so
/// `Vec<u8>` keeps the usual length-prefixed layout.
impl Encodable for u8 {
	fn encode(&self, writer: &mut ByteWriter) {
		writer.write_u8(*self);
	}

	fn decode(reader: &mut ByteReader) -> Result<Self> {
		reader.read_u8()
	}
}

impl Encodable for BigUint {
	fn encode(&self, writer: &mut ByteWriter) {
		writer.write_bigint(self);
	}

	fn decode(reader: &mut ByteReader) -> Result<Self> {
		reader.read_bigint()
	}
}

impl<T: Encodable> Encodable for Vec<T> {
	fn encode(&self, writer: &mut ByteWriter) {
		writer.write_len(self.len());
		for item in self {
			item.encode(writer);
		}
	}

	fn decode(reader: &mut ByteReader) -> Result<Self> {
		let len = reader.read_len()?;
		// Each element consumes at least a byte, so this bounds allocation
		if len > reader.remaining() {
			return Err(Error::Format("length exceeds remaining input"))
		}
		(0..len).map(|_| T::decode(reader)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn varint_round_trip(len: usize, expected_header_size: usize) {
		let mut writer = ByteWriter::new();
		writer.write_len(len);
		let bytes = writer.into_bytes();
		assert_eq!(bytes.len(), expected_header_size);

		let mut reader = ByteReader::new(&bytes);
		assert_eq!(reader.read_len().unwrap(), len);
	}

	#[test]
	fn varint_lengths() {
		varint_round_trip(0, 1);
		varint_round_trip(127, 1);
		varint_round_trip(128, 2);
		varint_round_trip(16383, 2);
		varint_round_trip(16384, 3);
		varint_round_trip(2097151, 3);
		varint_round_trip(2097152, 4);
		varint_round_trip((1 << 29) - 1, 4);
	}

	#[test]
	fn bytes_round_trip() {
		let data = vec![1u8, 2, 3, 4, 5];
		let mut writer = ByteWriter::new();
		writer.write_bytes(&data);
		let encoded = writer.into_bytes();

		let mut reader = ByteReader::new(&encoded);
		assert_eq!(reader.read_bytes().unwrap(), data);
		assert!(reader.is_empty());
	}

	#[test]
	fn truncated_input_is_a_format_error() {
		let data = vec![1u8; 100];
		let mut writer = ByteWriter::new();
		writer.write_bytes(&data);
		let encoded = writer.into_bytes();

		for prefix_len in 0..encoded.len() {
			let mut reader = ByteReader::new(&encoded[..prefix_len]);
			assert!(matches!(reader.read_bytes(), Err(Error::Format(_))));
		}
	}

	#[test]
	fn length_exceeding_buffer_is_rejected() {
		// Header declares 100 bytes, only 3 present
		let mut writer = ByteWriter::new();
		writer.write_len(100);
		writer.write_raw(&[1, 2, 3]);
		let encoded = writer.into_bytes();

		let mut reader = ByteReader::new(&encoded);
		assert!(matches!(reader.read_bytes(), Err(Error::Format(_))));
	}

	#[test]
	fn bigint_round_trip() {
		let value = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();
		let mut writer = ByteWriter::new();
		writer.write_bigint(&value);
		let encoded = writer.into_bytes();

		let mut reader = ByteReader::new(&encoded);
		assert_eq!(reader.read_bigint().unwrap(), value);
	}
}
