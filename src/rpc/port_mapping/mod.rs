
pub const PMAP_PROG:u32 = 100000;
pub const PMAP_VERS:u32 = 2;
pub const PMAP_PORT:u16 = 111;

pub const PMAPPROC_GETPORT:u32 = 3;     // (mapping) -> unsigned int

use log::debug;

use crate::error::{Result, rpc_err};

use super::xdr_pack;
use super::tcp_clients::TcpClient;

#[derive(Debug)]
pub struct Mapping {
	pub program: u32,
	pub version: u32,
	pub protocol: u32,			// IPPROTO_TCP; the UDP transport isn't supported
	pub port: u32,				// XDR encodes it as a u32 even though only 16 bits are meaningful
}

pub struct TcpPortMapperClient {
	pub host: String,
	tcp_client: TcpClient,
}

impl TcpPortMapperClient {

	pub fn new(host:&str) -> Result<Self> {
		Self::connect(host, PMAP_PORT)
	}

	pub fn connect(host:&str, port:u16) -> Result<Self> {
		let tcp_client = TcpClient::connect((host, port), PMAP_PROG, PMAP_VERS)?;
		Ok(Self{ host: host.to_owned(), tcp_client })
	}

	// Returns the port the program is registered on; zero means it isn't registered at all
	pub fn get_port(&mut self, m:&Mapping) -> Result<u16> {
		self.tcp_client.start_call(PMAPPROC_GETPORT)?;
		xdr_pack::pack_mapping(&mut self.tcp_client.packer, m.program, m.version, m.protocol, m.port)?;
		self.tcp_client.do_call()?;

		let ans:u32 = self.tcp_client.unpacker.unpack_u32()?;
		if !self.tcp_client.unpacker.all_data_consumed() {
			return Err(rpc_err("Data unexpectedly left over in unpacker after unpacking port"));
		}
		if ans == 0 || ans > u16::MAX as u32 {
			return Err(rpc_err(&format!("Program {:#x} version {} is not registered with the portmapper on {}", m.program, m.version, self.host)));
		}

		debug!("Portmapper on {} maps program {:#x} v{} to port {}", self.host, m.program, m.version, ans);
		Ok(ans as u16)
	}

}
