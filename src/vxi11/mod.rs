
// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;
pub const DEFAULT_LOCK_TIMEOUT:u32 = 10000;
pub const DEFAULT_IO_TIMEOUT:Duration = Duration::from_secs(10);

// Extra time the socket waits beyond the instrument-side I/O timeout so the instrument's own
// timeout error arrives before the socket gives up
pub const SOCKET_TIMEOUT_MARGIN:Duration = Duration::from_secs(5);

pub const OPERATION_FLAGS_END_ONLY:i32 = 8;

// Reason bits in a device_read response
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

use std::time::Duration;

use log::{debug, trace, warn};

use crate::channel::{Channel, ReadChunk};
use crate::error::{Error, Result, rpc_err};
use crate::resource::Resource;
use crate::rpc::IPPROTO_TCP;
use crate::rpc::port_mapping::{TcpPortMapperClient, Mapping};
use crate::rpc::tcp_clients::TcpClient;

pub mod xdr_pack;

pub struct CoreClient {
	client: TcpClient,
	opt_link: Option<Link>,
	io_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
	pub link_id: i32,
	pub abort_port: u32,
	pub max_recv_size: u32,
}

fn millis(d:Duration) -> u32 {
	if d.as_millis() > u32::MAX as u128 { u32::MAX } else { d.as_millis() as u32 }
}

fn check(call:&'static str, error:i32) -> Result<()> {
	if error == 0 { Ok(()) } else { Err(Error::Device{ call, code: error }) }
}

impl CoreClient {

	fn get_link(&self) -> Result<Link> {
		self.opt_link.ok_or(Error::NotConnected)
	}

	// Asks the portmapper on host which port the core channel is on
	pub fn new(host:&str) -> Result<Self> {
		let mut pmap_client = TcpPortMapperClient::new(host)?;

		let mapping = Mapping {
			program: DEVICE_CORE_PROG,
			version: DEVICE_CORE_VERS,
			protocol: IPPROTO_TCP,
			port: 0,
		};

		let port = pmap_client.get_port(&mapping)?;
		Self::connect(host, port)
	}

	pub fn connect(host:&str, port:u16) -> Result<Self> {
		let client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS)?;
		let mut ans = CoreClient{ client, opt_link: None, io_timeout: DEFAULT_IO_TIMEOUT };
		ans.set_timeout(DEFAULT_IO_TIMEOUT)?;
		Ok(ans)
	}

	pub fn open(resource:&Resource) -> Result<Self> {
		let mut core = Self::new(&resource.host)?;
		core.create_link(&resource.device)?;
		Ok(core)
	}

	pub fn create_link(&mut self, device:&str) -> Result<()> {
		if self.opt_link.is_some() {
			return Err(rpc_err("Already connected to a link"));
		}

		self.client.start_call(CREATE_LINK)?;
		xdr_pack::pack_create_link_parms(&mut self.client.packer, CLIENT_ID, false, DEFAULT_LOCK_TIMEOUT, device)?;
		self.client.do_call()?;

		let error:i32         = self.client.unpacker.unpack_i32()?;
		let link_id:i32       = self.client.unpacker.unpack_i32()?;
		let abort_port:u32    = self.client.unpacker.unpack_u32()?;
		let max_recv_size:u32 = self.client.unpacker.unpack_u32()?;
		check("create_link", error)?;

		debug!("Created link {} to {} (max_recv_size={})", link_id, device, max_recv_size);
		self.opt_link = Some(Link{ link_id, abort_port, max_recv_size });
		Ok(())
	}

	// The instrument may accept fewer bytes than offered per call, and won't take more than max_recv_size,
	// so keep sending until everything is through. END goes only on the final piece.
	pub fn write_bytes(&mut self, data:&[u8]) -> Result<()> {
		let link = self.get_link()?;
		let max = usize::max(link.max_recv_size as usize, 1);
		let timeout = millis(self.io_timeout);

		let mut sent:usize = 0;
		while sent < data.len() || data.is_empty() {
			let end = usize::min(sent + max, data.len());
			let flags = if end == data.len() { OPERATION_FLAGS_END_ONLY } else { 0 };

			self.client.start_call(DEVICE_WRITE)?;
			xdr_pack::pack_device_write_parms(&mut self.client.packer, link.link_id, timeout, DEFAULT_LOCK_TIMEOUT, flags, &data[sent..end])?;
			self.client.do_call()?;

			let error:i32 = self.client.unpacker.unpack_i32()?;
			let size:u32  = self.client.unpacker.unpack_u32()?;
			check("device_write", error)?;

			if size as usize > end - sent {
				return Err(rpc_err("Instrument confirmed more bytes than were sent"));
			}
			if size == 0 && !data.is_empty() {
				return Err(rpc_err("Instrument accepted none of the bytes sent"));
			}
			sent += size as usize;
			if data.is_empty() { break; }
		}
		Ok(())
	}

	// One device_read call; returns the data and the reason bits
	fn device_read(&mut self, request_size:u32) -> Result<(Vec<u8>, i32)> {
		let link = self.get_link()?;
		let timeout = millis(self.io_timeout);

		self.client.start_call(DEVICE_READ)?;
		xdr_pack::pack_device_read_parms(&mut self.client.packer, link.link_id, request_size, timeout, DEFAULT_LOCK_TIMEOUT, 0, 0)?;
		self.client.do_call()?;

		let error:i32    = self.client.unpacker.unpack_i32()?;
		let reason:i32   = self.client.unpacker.unpack_i32()?;
		let data:Vec<u8> = self.client.unpacker.unpack_variable_len_opaque()?;
		check("device_read", error)?;

		if reason & !(REASON_REQCNT | REASON_CHR | REASON_END) != 0 {
			return Err(rpc_err("Reserved bits set in device_read reason"));
		}
		trace!("device_read returned {} bytes, reason={}", data.len(), reason);
		Ok((data, reason))
	}

	// Reads until the instrument flags END
	pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
		let mut ans:Vec<u8> = vec![];
		loop {
			let (mut data, reason) = self.device_read(u32::MAX)?;
			ans.append(&mut data);
			if reason & REASON_END != 0 { return Ok(ans); }
		}
	}

	pub fn destroy_link(&mut self) -> Result<()> {
		let link = match self.opt_link.take() {
			Some(link) => link,
			None => return Err(rpc_err("No link to destroy")),
		};

		self.client.start_call(DESTROY_LINK)?;
		xdr_pack::pack_device_link(&mut self.client.packer, link.link_id)?;
		self.client.do_call()?;

		let device_error:i32 = self.client.unpacker.unpack_i32()?;
		check("destroy_link", device_error)?;
		debug!("Destroyed link {}", link.link_id);
		Ok(())
	}

}

impl Channel for CoreClient {

	fn write(&mut self, cmd:&str) -> Result<()> {
		trace!("-> {}", cmd);
		self.write_bytes(cmd.as_bytes())
	}

	fn read_raw(&mut self) -> Result<Vec<u8>> { self.read_bytes() }

	fn read_chunk(&mut self, max:usize) -> Result<ReadChunk> {
		let request_size = if max > u32::MAX as usize { u32::MAX } else { max as u32 };
		let (data, reason) = self.device_read(request_size)?;
		Ok(ReadChunk{ data, end: reason & REASON_END != 0 })
	}

	fn timeout(&self) -> Duration { self.io_timeout }

	fn set_timeout(&mut self, timeout:Duration) -> Result<()> {
		self.client.set_timeout(Some(timeout + SOCKET_TIMEOUT_MARGIN))?;
		self.io_timeout = timeout;
		Ok(())
	}

}

impl Drop for CoreClient {

	fn drop(&mut self) {
		if self.opt_link.is_some() {
			if let Err(e) = self.destroy_link() {
				warn!("Unable to destroy link on drop: {}", e);
			}
		}
	}

}
