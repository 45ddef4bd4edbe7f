
use crate::error::{Result, rpc_err};
use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SYSTEM_ERR, SUCCESS};

pub struct Auth {
	pub flavor: i32,
	pub body: Vec<u8>,
}

pub fn unpack_auth(unpacker:&mut Unpacker) -> Result<Auth> {
	let flavor:i32   = unpacker.unpack_enum()?;
	let body:Vec<u8> = unpacker.unpack_variable_len_opaque()?;
	Ok(Auth{ flavor, body })
}

// Leaves the unpacker positioned at the start of the procedure's results
pub fn unpack_replyheader(unpacker:&mut Unpacker) -> Result<(u32, Auth)> {
	let xid:u32 = unpacker.unpack_u32()?;

	if unpacker.unpack_enum()? != REPLY { return Err(rpc_err("Expected REPLY message type")); }

	match unpacker.unpack_enum()? {
		MSG_DENIED => {
			return match unpacker.unpack_enum()? {
				RPC_MISMATCH => {
					let low  = unpacker.unpack_u32()?;
					let high = unpacker.unpack_u32()?;
					Err(rpc_err(&format!("Message denied, server supports RPC versions {} to {}", low, high)))
				},
				AUTH_ERROR => {
					let stat = unpacker.unpack_u32()?;
					Err(rpc_err(&format!("Message denied due to authentication error {}", stat)))
				},
				_ => Err(rpc_err("Message denied for an unknown reason")),
			}
		},
		MSG_ACCEPTED => { },
		_ => return Err(rpc_err("Neither MSG_DENIED nor MSG_ACCEPTED in reply")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok((xid, verf)),
		PROG_UNAVAIL  => Err(rpc_err("Program unavailable")),
		PROG_MISMATCH => {
			let low  = unpacker.unpack_u32()?;
			let high = unpacker.unpack_u32()?;
			Err(rpc_err(&format!("Program mismatch, server supports versions {} to {}", low, high)))
		},
		PROC_UNAVAIL  => Err(rpc_err("Procedure unavailable")),
		GARBAGE_ARGS  => Err(rpc_err("Server could not decode the arguments")),
		SYSTEM_ERR    => Err(rpc_err("System error on the server")),
		_             => Err(rpc_err("Call failed for an unknown reason")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::xdr::Packer;
	use crate::rpc::xdr_pack::pack_replyheader;

	#[test]
	fn accepted_reply_yields_xid_and_leaves_results() {
		let mut p = Packer::new();
		pack_replyheader(&mut p, 42).unwrap();
		p.pack_u32(1024).unwrap();

		let mut u = Unpacker::new();
		u.reset(p.get_buf());
		let (xid, verf) = unpack_replyheader(&mut u).unwrap();
		assert_eq!(xid, 42);
		assert_eq!(verf.flavor, 0);
		assert_eq!(u.unpack_u32().unwrap(), 1024);
	}

	#[test]
	fn program_mismatch_is_reported() {
		let mut p = Packer::new();
		p.pack_u32(7).unwrap();
		p.pack_enum(REPLY).unwrap();
		p.pack_enum(MSG_ACCEPTED).unwrap();
		p.pack_enum(0).unwrap();
		p.pack_variable_len_opaque(&[]).unwrap();
		p.pack_enum(PROG_MISMATCH).unwrap();
		p.pack_u32(1).unwrap();
		p.pack_u32(1).unwrap();

		let mut u = Unpacker::new();
		u.reset(p.get_buf());
		let msg = unpack_replyheader(&mut u).err().unwrap().to_string();
		assert!(msg.contains("Program mismatch"), "{}", msg);
	}
}
