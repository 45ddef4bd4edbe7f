
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};
use log::trace;

use crate::error::{Result, rpc_err};
use crate::xdr;
use super::{xdr_pack, xdr_unpack, LAST_FRAGMENT, MAX_RECORD_SIZE};

pub struct TcpClient {
	pub stream: TcpStream,
	pub prog: u32,
	pub vers: u32,
	pub lastxid: u32,
	pub packer: xdr::Packer,
	pub unpacker: xdr::Unpacker,
}

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr: A, prog: u32, vers: u32) -> Result<Self> {
		let stream = TcpStream::connect(addr)?;
		stream.set_nodelay(true)?;
		Ok(Self{ stream, prog, vers, lastxid: 0, packer: xdr::Packer::new(), unpacker: xdr::Unpacker::new() })
	}

	pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
		self.stream.set_read_timeout(timeout)?;
		self.stream.set_write_timeout(timeout)?;
		Ok(())
	}

	// Bumps the xid and packs a call header; the caller packs the procedure arguments next
	pub fn start_call(&mut self, prc:u32) -> Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)?;
		Ok(())
	}

	// Sends whatever is in the packer as one record and loads the matching reply into the unpacker
	pub fn do_call(&mut self) -> Result<()> {
		let call:&[u8] = self.packer.get_buf();
		if call.len() as u64 >= LAST_FRAGMENT as u64 { return Err(rpc_err("Call too large for a single fragment")); }

		let mut send_bytes:Vec<u8> = Vec::with_capacity(call.len() + 4);
		send_bytes.write_u32::<BigEndian>(call.len() as u32 | LAST_FRAGMENT)?;
		send_bytes.extend_from_slice(call);
		self.stream.write_all(&send_bytes)?;

		loop {
			let reply = self.read_record()?;
			self.unpacker.reset(&reply);

			let (xid, _) = xdr_unpack::unpack_replyheader(&mut self.unpacker)?;
			if xid == self.lastxid {
				return Ok(());
			} else if xid < self.lastxid {
				// Stale reply to an earlier call
				trace!("Discarding reply with stale xid {} (expected {})", xid, self.lastxid);
				continue;
			} else {
				return Err(rpc_err("Received a reply with an xid that hasn't been sent yet"));
			}
		}
	}

	fn read_record(&mut self) -> Result<Vec<u8>> {
		let mut record:Vec<u8> = vec![];
		loop {
			let header:u32 = self.stream.read_u32::<BigEndian>()?;
			let n = (header & !LAST_FRAGMENT) as usize;

			let start = record.len();
			if n > MAX_RECORD_SIZE - start {
				return Err(rpc_err(&format!("Reply record exceeds {} bytes", MAX_RECORD_SIZE)));
			}
			record.resize(start + n, 0);
			self.stream.read_exact(&mut record[start..])?;

			if header & LAST_FRAGMENT != 0 { return Ok(record); }
		}
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::TcpListener;
	use std::thread;

	use crate::xdr::{Packer, Unpacker};

	fn read_call(stream:&mut TcpStream) -> Vec<u8> {
		let header = stream.read_u32::<BigEndian>().unwrap();
		assert!(header & LAST_FRAGMENT != 0);
		let mut body = vec![0; (header & !LAST_FRAGMENT) as usize];
		stream.read_exact(&mut body).unwrap();
		body
	}

	#[test]
	fn oversized_reply_is_rejected_before_allocating() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();

		let server = thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			read_call(&mut stream);
			// Claims a 2 GiB record and sends nothing else
			stream.write_u32::<BigEndian>(0x7fff_ffff | LAST_FRAGMENT).unwrap();
			stream
		});

		let mut client = TcpClient::connect(addr, 100000, 2).unwrap();
		client.start_call(3).unwrap();
		match client.do_call() {
			Err(crate::error::Error::Rpc(msg)) => assert!(msg.contains("exceeds"), "{}", msg),
			other => panic!("expected an RPC error, got {:?}", other),
		}
		drop(server.join().unwrap());
	}

	#[test]
	fn reply_split_over_fragments_is_reassembled_and_stale_replies_skipped() {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();

		let server = thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			let call = read_call(&mut stream);
			let mut u = Unpacker::new();
			u.reset(&call);
			let xid = u.unpack_u32().unwrap();

			// A stale reply first, then the real one split in two fragments
			let mut stale = Packer::new();
			xdr_pack::pack_replyheader(&mut stale, xid - 1).unwrap();
			stale.pack_u32(0).unwrap();
			let mut framed = vec![];
			framed.write_u32::<BigEndian>(stale.get_buf().len() as u32 | LAST_FRAGMENT).unwrap();
			framed.extend_from_slice(stale.get_buf());

			let mut reply = Packer::new();
			xdr_pack::pack_replyheader(&mut reply, xid).unwrap();
			reply.pack_u32(0xdead_beef).unwrap();
			let (a, b) = reply.get_buf().split_at(8);
			framed.write_u32::<BigEndian>(a.len() as u32).unwrap();
			framed.extend_from_slice(a);
			framed.write_u32::<BigEndian>(b.len() as u32 | LAST_FRAGMENT).unwrap();
			framed.extend_from_slice(b);
			stream.write_all(&framed).unwrap();
		});

		let mut client = TcpClient::connect(addr, 100000, 2).unwrap();
		client.lastxid = 10;
		client.start_call(3).unwrap();
		client.do_call().unwrap();
		assert_eq!(client.lastxid, 11);
		assert_eq!(client.unpacker.unpack_u32().unwrap(), 0xdead_beef);
		assert!(client.unpacker.all_data_consumed());

		server.join().unwrap();
	}
}
