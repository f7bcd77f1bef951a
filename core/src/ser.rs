// Copyright 2020 The Keel Developers
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

//! Serialization and deserialization layer specialized for binary encoding.
//! Ensures consistency and safety. Basically a minimal subset of
//! rustc_serialize customized for our need.
//!
//! To use it simply implement `Writeable` or `Readable` and then use the
//! `serialize` or `deserialize` functions on them as appropriate.

use std::io::{self, Read, Write};
use std::{error, fmt};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Refuse to read more than this many bytes in one fixed-size read. Headers
/// are 300 bytes, so anything bigger points at corrupted length data.
const MAX_READ_LEN: usize = 32_768;

/// Possible errors deriving from serializing or deserializing.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Error {
	/// Wraps an io error produced when reading or writing
	IOErr(String, io::ErrorKind),
	/// Data wasn't in a consumable format
	CorruptedData,
	/// When asked to read too much data
	TooLargeReadErr,
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::IOErr(format!("{}", e), e.kind())
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Error::IOErr(ref e, ref _k) => write!(f, "io error {}", e),
			Error::CorruptedData => f.write_str("corrupted data"),
			Error::TooLargeReadErr => f.write_str("too large read"),
		}
	}
}

impl error::Error for Error {}

/// Useful trait to implement on types that can be translated to byte slices
/// directly. Allows the use of `write_fixed_bytes` on them.
pub trait AsFixedBytes {
	/// The slice representation of self
	fn as_fixed_bytes(&self) -> &[u8];
}

impl AsFixedBytes for Vec<u8> {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8] {
	fn as_fixed_bytes(&self) -> &[u8] {
		self
	}
}

impl AsFixedBytes for [u8; 24] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

impl AsFixedBytes for [u8; 32] {
	fn as_fixed_bytes(&self) -> &[u8] {
		&self[..]
	}
}

/// Implementations defined how different numbers and binary structures are
/// written to an underlying stream or container (depending on implementation).
pub trait Writer {
	/// Writes a u8 as bytes
	fn write_u8(&mut self, n: u8) -> Result<(), Error>;
	/// Writes a u16 as bytes
	fn write_u16(&mut self, n: u16) -> Result<(), Error>;
	/// Writes a u32 as bytes
	fn write_u32(&mut self, n: u32) -> Result<(), Error>;
	/// Writes a u64 as bytes
	fn write_u64(&mut self, n: u64) -> Result<(), Error>;
	/// Writes a fixed number of bytes from something that can turn itself
	/// into a `&[u8]`. The reader is expected to know the actual length on
	/// read.
	fn write_fixed_bytes(&mut self, bytes: &dyn AsFixedBytes) -> Result<(), Error>;
}

/// Implementations defined how different numbers and binary structures are
/// read from an underlying stream or container (depending on implementation).
pub trait Reader {
	/// Read a u8 from the underlying Read
	fn read_u8(&mut self) -> Result<u8, Error>;
	/// Read a u16 from the underlying Read
	fn read_u16(&mut self) -> Result<u16, Error>;
	/// Read a u32 from the underlying Read
	fn read_u32(&mut self) -> Result<u32, Error>;
	/// Read a u64 from the underlying Read
	fn read_u64(&mut self) -> Result<u64, Error>;
	/// Read a fixed number of bytes from the underlying reader.
	fn read_fixed_bytes(&mut self, length: usize) -> Result<Vec<u8>, Error>;
	/// Convenience function to read 32 fixed bytes
	fn read_32_bytes(&mut self) -> Result<Vec<u8>, Error>;
}

/// Trait that every type that can be serialized as binary must implement.
/// Writes directly to a Writer, a utility type thinly wrapping an
/// underlying Write implementation.
pub trait Writeable {
	/// Write the data held by this Writeable to the provided writer
	fn write<W: Writer>(&self, writer: &mut W) -> Result<(), Error>;
}

/// Trait that every type that can be deserialized from binary must implement.
/// Reads directly to a Reader, a utility type thinly wrapping an
/// underlying Read implementation.
pub trait Readable: Sized {
	/// Reads the data necessary to this Readable from the provided reader
	fn read(reader: &mut dyn Reader) -> Result<Self, Error>;
}

/// Deserializes a Readable from any std::io::Read implementation.
pub fn deserialize<T: Readable>(source: &mut dyn Read) -> Result<T, Error> {
	let mut reader = BinReader { source };
	T::read(&mut reader)
}

/// Serializes a Writeable into any std::io::Write implementation.
pub fn serialize<W: Writeable>(sink: &mut dyn Write, thing: &W) -> Result<(), Error> {
	let mut writer = BinWriter { sink };
	thing.write(&mut writer)
}

/// Utility function to serialize a writeable directly in memory using a
/// Vec<u8>.
pub fn ser_vec<W: Writeable>(thing: &W) -> Result<Vec<u8>, Error> {
	let mut vec = vec![];
	serialize(&mut vec, thing)?;
	Ok(vec)
}

/// Utility wrapper for an underlying byte Reader. Defines higher level
/// methods to read numbers, byte vectors, hashes, etc.
pub struct BinReader<'a> {
	source: &'a mut dyn Read,
}

impl<'a> BinReader<'a> {
	/// Constructor for a new BinReader for the provided source
	pub fn new(source: &'a mut dyn Read) -> BinReader<'a> {
		BinReader { source }
	}
}

impl<'a> Reader for BinReader<'a> {
	fn read_u8(&mut self) -> Result<u8, Error> {
		self.source.read_u8().map_err(From::from)
	}
	fn read_u16(&mut self) -> Result<u16, Error> {
		self.source.read_u16::<LittleEndian>().map_err(From::from)
	}
	fn read_u32(&mut self) -> Result<u32, Error> {
		self.source.read_u32::<LittleEndian>().map_err(From::from)
	}
	fn read_u64(&mut self) -> Result<u64, Error> {
		self.source.read_u64::<LittleEndian>().map_err(From::from)
	}
	fn read_fixed_bytes(&mut self, length: usize) -> Result<Vec<u8>, Error> {
		if length > MAX_READ_LEN {
			return Err(Error::TooLargeReadErr);
		}
		let mut buf = vec![0; length];
		self.source
			.read_exact(&mut buf)
			.map(move |_| buf)
			.map_err(From::from)
	}
	fn read_32_bytes(&mut self) -> Result<Vec<u8>, Error> {
		self.read_fixed_bytes(32)
	}
}

/// Utility wrapper for an underlying byte Writer. Defines higher level
/// methods to write numbers, byte vectors, hashes, etc.
pub struct BinWriter<'a> {
	sink: &'a mut dyn Write,
}

impl<'a> BinWriter<'a> {
	/// Wraps a standard Write in a new BinWriter
	pub fn new(sink: &'a mut dyn Write) -> BinWriter<'a> {
		BinWriter { sink }
	}
}

impl<'a> Writer for BinWriter<'a> {
	fn write_u8(&mut self, n: u8) -> Result<(), Error> {
		self.sink.write_u8(n).map_err(From::from)
	}
	fn write_u16(&mut self, n: u16) -> Result<(), Error> {
		self.sink.write_u16::<LittleEndian>(n).map_err(From::from)
	}
	fn write_u32(&mut self, n: u32) -> Result<(), Error> {
		self.sink.write_u32::<LittleEndian>(n).map_err(From::from)
	}
	fn write_u64(&mut self, n: u64) -> Result<(), Error> {
		self.sink.write_u64::<LittleEndian>(n).map_err(From::from)
	}
	fn write_fixed_bytes(&mut self, bytes: &dyn AsFixedBytes) -> Result<(), Error> {
		self.sink
			.write_all(bytes.as_fixed_bytes())
			.map_err(From::from)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn ints_round_trip_little_endian() {
		let mut vec = vec![];
		{
			let mut writer = BinWriter::new(&mut vec);
			writer.write_u8(8).unwrap();
			writer.write_u16(16).unwrap();
			writer.write_u32(32).unwrap();
			writer.write_u64(64).unwrap();
		}
		// integers hit the wire least significant byte first
		assert_eq!(
			vec,
			vec![8, 16, 0, 32, 0, 0, 0, 64, 0, 0, 0, 0, 0, 0, 0]
		);

		let mut slice = &vec[..];
		let mut reader = BinReader::new(&mut slice);
		assert_eq!(reader.read_u8().unwrap(), 8);
		assert_eq!(reader.read_u16().unwrap(), 16);
		assert_eq!(reader.read_u32().unwrap(), 32);
		assert_eq!(reader.read_u64().unwrap(), 64);
	}

	#[test]
	fn truncated_read_errors() {
		let mut slice = &[1u8, 2, 3][..];
		let mut reader = BinReader::new(&mut slice);
		assert!(reader.read_u64().is_err());
	}
}
