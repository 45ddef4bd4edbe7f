
use std::io::{self, Write, Error, ErrorKind, Cursor};

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};

pub struct Packer {
	buff: Vec<u8>
}

pub struct Unpacker {
	buff: Vec<u8>,
	pos: usize,
}

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::InvalidData, msg) }

fn padding(n:usize) -> usize { (4 - n % 4) % 4 }

impl Packer {

	pub fn new() -> Self { Packer{ buff: Vec::new() } }

	pub fn reset(&mut self) { self.buff.clear(); }

	pub fn get_buf(&self) -> &[u8] { &self.buff }

	// Every packing method writes a multiple of four bytes, so alignment is preserved from one item to the next
	pub fn pack_u32(&mut self, x:u32) -> io::Result<()> { self.buff.write_u32::<BigEndian>(x) }
	pub fn pack_i32(&mut self, x:i32) -> io::Result<()> { self.buff.write_i32::<BigEndian>(x) }

	pub fn pack_bool(&mut self, b:bool) -> io::Result<()> { self.pack_i32(if b { 1 } else { 0 }) }

	pub fn pack_enum(&mut self, x:i32) -> io::Result<()> { self.pack_i32(x) }

	pub fn pack_variable_len_opaque(&mut self, data:&[u8]) -> io::Result<()> {
		if data.len() > u32::MAX as usize { return Err(err("Opaque data too long for XDR")); }
		self.pack_u32(data.len() as u32)?;
		self.buff.write_all(data)?;
		self.buff.extend(std::iter::repeat(0).take(padding(data.len())));
		Ok(())
	}

	pub fn pack_string(&mut self, s:&str) -> io::Result<()> {
		if !s.is_ascii() { return Err(err("XDR strings must be ASCII")); }
		self.pack_variable_len_opaque(s.as_bytes())
	}

}

impl Default for Packer {
	fn default() -> Self { Self::new() }
}

impl Unpacker {

	pub fn new() -> Self { Unpacker{ buff: Vec::new(), pos: 0 } }

	pub fn reset(&mut self, data:&[u8]) {
		self.buff.clear();
		self.buff.extend_from_slice(data);
		self.pos = 0;
	}

	pub fn remaining(&self) -> usize { self.buff.len() - self.pos }

	pub fn all_data_consumed(&self) -> bool { self.remaining() == 0 }

	fn take(&mut self, n:usize) -> io::Result<&[u8]> {
		if n > self.remaining() { return Err(Error::new(ErrorKind::UnexpectedEof, "Tried to read past the end of the XDR buffer")); }
		let start = self.pos;
		self.pos += n;
		Ok(&self.buff[start..self.pos])
	}

	pub fn unpack_u32(&mut self) -> io::Result<u32> { Cursor::new(self.take(4)?).read_u32::<BigEndian>() }
	pub fn unpack_i32(&mut self) -> io::Result<i32> { Cursor::new(self.take(4)?).read_i32::<BigEndian>() }

	// Whether an enum value is in range depends on the application, so at this level it's just an i32
	pub fn unpack_enum(&mut self) -> io::Result<i32> { self.unpack_i32() }

	pub fn unpack_bool(&mut self) -> io::Result<bool> {
		match self.unpack_i32()? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(err("Expected 0 or 1 for an XDR bool")),
		}
	}

	pub fn unpack_variable_len_opaque(&mut self) -> io::Result<Vec<u8>> {
		let n = self.unpack_u32()? as usize;
		let ans = self.take(n)?.to_vec();
		self.take(padding(n))?;
		Ok(ans)
	}

}

impl Default for Unpacker {
	fn default() -> Self { Self::new() }
}
