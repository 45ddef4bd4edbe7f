use std::io::{self, Error, ErrorKind};

use crate::xdr::Packer;

pub fn pack_device_link(packer:&mut Packer, link:i32) -> io::Result<()> {
	packer.pack_i32(link)
}

pub fn pack_create_link_parms(packer:&mut Packer, id:i32, lock_device:bool, lock_timeout:u32, device:&str) -> io::Result<()> {
	if !device.is_ascii() { return Err(Error::new(ErrorKind::InvalidInput, "Device name must be ASCII")); }
	packer.pack_i32(id)?;
	packer.pack_bool(lock_device)?;
	packer.pack_u32(lock_timeout)?;
	packer.pack_string(device)
}

pub fn pack_device_write_parms(packer:&mut Packer, link:i32, timeout:u32, lock_timeout:u32, flags:i32, data:&[u8]) -> io::Result<()> {
	packer.pack_i32(link)?;
	packer.pack_u32(timeout)?;
	packer.pack_u32(lock_timeout)?;
	packer.pack_i32(flags)?;
	packer.pack_variable_len_opaque(data)
}

pub fn pack_device_read_parms(packer:&mut Packer, link:i32, request_size:u32, timeout:u32, lock_timeout:u32, flags:i32, term_char:i32) -> io::Result<()> {
	packer.pack_i32(link)?;
	packer.pack_u32(request_size)?;
	packer.pack_u32(timeout)?;
	packer.pack_u32(lock_timeout)?;
	packer.pack_i32(flags)?;
	packer.pack_i32(term_char)
}

// The response packers below are what an instrument sends; the client only needs them to fake one in tests

pub fn pack_device_error(packer:&mut Packer, error:i32) -> io::Result<()> {
	packer.pack_i32(error)
}

pub fn pack_create_link_resp(packer:&mut Packer, error:i32, link:i32, abort_port:u32, max_recv_size:u32) -> io::Result<()> {
	packer.pack_i32(error)?;
	packer.pack_i32(link)?;
	packer.pack_u32(abort_port)?;
	packer.pack_u32(max_recv_size)
}

pub fn pack_device_write_resp(packer:&mut Packer, error:i32, size:u32) -> io::Result<()> {
	packer.pack_i32(error)?;
	packer.pack_u32(size)
}

pub fn pack_device_read_resp(packer:&mut Packer, error:i32, reason:i32, data:&[u8]) -> io::Result<()> {
	packer.pack_i32(error)?;
	packer.pack_i32(reason)?;
	packer.pack_variable_len_opaque(data)
}
