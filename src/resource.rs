// Only the VXI-11 form is understood: TCPIP[board]::<host>[::<device>][::INSTR]

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Error;

lazy_static! {
	static ref TCPIP_RE: Regex = Regex::new("(?i)^TCPIP(\\d*)::([^:]+)(?:::([^:]+))?(?:::INSTR)?$").unwrap();
}

pub const DEFAULT_DEVICE:&str = "inst0";

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
	pub board: u32,
	pub host: String,
	pub device: String,
}

impl Resource {

	// TCPIP0::<host>::inst0::INSTR
	pub fn tcpip(host:&str) -> Self {
		Resource{ board: 0, host: host.to_owned(), device: DEFAULT_DEVICE.to_owned() }
	}

}

impl FromStr for Resource {
	type Err = Error;

	fn from_str(s:&str) -> Result<Self, Error> {
		let caps = TCPIP_RE.captures(s.trim()).ok_or_else(|| Error::Resource(s.to_owned()))?;

		let board = match caps.get(1).map(|m| m.as_str()) {
			Some("") | None => 0,
			Some(n) => n.parse::<u32>().map_err(|_| Error::Resource(s.to_owned()))?,
		};
		let host = caps.get(2).map(|m| m.as_str().to_owned()).ok_or_else(|| Error::Resource(s.to_owned()))?;

		// "TCPIP0::host::INSTR" leaves the suffix in the device slot
		let device = match caps.get(3).map(|m| m.as_str()) {
			Some(d) if !d.eq_ignore_ascii_case("INSTR") => d.to_owned(),
			_ => DEFAULT_DEVICE.to_owned(),
		};

		Ok(Resource{ board, host, device })
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		write!(f, "TCPIP{}::{}::{}::INSTR", self.board, self.host, self.device)
	}
}
